//! Reconciliation of entity descriptors with the live datasource schema.
//!
//! Backends read their catalog into [`TableInfo`]s, call [`diff`] and apply the
//! returned changes only when asked to add missing structures. Nothing here
//! ever drops or alters an existing column.

use crate::{EntityDef, FieldDef};
use std::{collections::BTreeMap, fmt::Display, sync::Arc};

/// Live column as reported by the datasource catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    /// Declared type, as the backend reports it.
    pub type_name: String,
    pub nullable: bool,
    pub primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableInfo {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns
            .iter()
            .find(|v| v.name.eq_ignore_ascii_case(name))
    }
}

/// Additive change that brings the live schema closer to the model.
#[derive(Debug, Clone)]
pub enum SchemaChange {
    CreateTable(Arc<EntityDef>),
    AddColumn(Arc<EntityDef>, FieldDef),
}

impl SchemaChange {
    pub fn entity(&self) -> &Arc<EntityDef> {
        match self {
            SchemaChange::CreateTable(entity) | SchemaChange::AddColumn(entity, ..) => entity,
        }
    }
}

impl Display for SchemaChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaChange::CreateTable(entity) => write!(
                f,
                "Created table \"{}\" for entity {}",
                entity.table, entity.name
            ),
            SchemaChange::AddColumn(entity, field) => write!(
                f,
                "Added column \"{}\" to table \"{}\" for field {}.{}",
                field.column_name, entity.table, entity.name, field.name
            ),
        }
    }
}

/// Compare `entities` against the live `tables`.
///
/// Appends one message per discrepancy and returns the additive changes that
/// would fix the missing parts. `column_type` renders the type the backend
/// would declare for a field; types are compared ignoring ASCII case and
/// whitespace. View entities are skipped.
pub fn diff<F>(
    entities: &BTreeMap<String, Arc<EntityDef>>,
    tables: &[TableInfo],
    column_type: F,
    messages: &mut Vec<String>,
) -> Vec<SchemaChange>
where
    F: Fn(&FieldDef) -> String,
{
    let mut changes = Vec::new();
    for entity in entities.values().filter(|v| !v.is_view()) {
        let Some(table) = tables
            .iter()
            .find(|v| v.name.eq_ignore_ascii_case(&entity.table))
        else {
            messages.push(format!(
                "Table \"{}\" for entity {} does not exist",
                entity.table, entity.name
            ));
            changes.push(SchemaChange::CreateTable(entity.clone()));
            continue;
        };
        for field in &entity.fields {
            let Some(column) = table.column(&field.column_name) else {
                messages.push(format!(
                    "Column \"{}\" of table \"{}\" for field {}.{} does not exist",
                    field.column_name, table.name, entity.name, field.name
                ));
                changes.push(SchemaChange::AddColumn(entity.clone(), field.clone()));
                continue;
            };
            let expected = column_type(field);
            if normalized(&expected) != normalized(&column.type_name) {
                messages.push(format!(
                    "Column \"{}\" of table \"{}\" has type {} but field {}.{} expects {}",
                    column.name, table.name, column.type_name, entity.name, field.name, expected
                ));
            }
            if column.nullable != field.nullable {
                messages.push(format!(
                    "Column \"{}\" of table \"{}\" is {} but field {}.{} is declared {}",
                    column.name,
                    table.name,
                    nullability(column.nullable),
                    entity.name,
                    field.name,
                    nullability(field.nullable)
                ));
            }
            if column.primary_key != field.primary_key {
                messages.push(format!(
                    "Column \"{}\" of table \"{}\" {} part of the primary key but field {}.{} {}",
                    column.name,
                    table.name,
                    if column.primary_key { "is" } else { "is not" },
                    entity.name,
                    field.name,
                    if field.primary_key { "is" } else { "is not" },
                ));
            }
        }
        for column in &table.columns {
            if !entity
                .fields
                .iter()
                .any(|f| f.column_name.eq_ignore_ascii_case(&column.name))
            {
                messages.push(format!(
                    "Column \"{}\" of table \"{}\" is not declared by entity {}",
                    column.name, table.name, entity.name
                ));
            }
        }
    }
    changes
}

fn normalized(type_name: &str) -> String {
    type_name
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

fn nullability(nullable: bool) -> &'static str {
    if nullable { "nullable" } else { "not null" }
}
