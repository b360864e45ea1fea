use crate::{FieldDef, RelationDef, ViewDef, column_name_of};
use std::borrow::Cow;

/// Immutable metadata describing an entity type.
///
/// Plain entities map to one table, view entities (`view` is `Some`) project
/// fields of other entities joined together and optionally grouped.
#[derive(Debug, Clone, Default)]
pub struct EntityDef {
    pub name: Cow<'static, str>,
    /// Physical table name (unused by views).
    pub table: Cow<'static, str>,
    pub fields: Vec<FieldDef>,
    pub relations: Vec<RelationDef>,
    pub view: Option<ViewDef>,
}

impl EntityDef {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        let name = name.into();
        Self {
            table: column_name_of(&name).into(),
            name,
            ..Default::default()
        }
    }

    pub fn table(mut self, table: impl Into<Cow<'static, str>>) -> Self {
        self.table = table.into();
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|v| v.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.get_field(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|v| v.name.as_ref())
    }

    pub fn primary_key_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|v| v.primary_key)
    }

    pub fn non_primary_key_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|v| !v.primary_key)
    }

    pub fn primary_key_len(&self) -> usize {
        self.primary_key_fields().count()
    }

    pub fn get_relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|v| v.name() == name)
    }

    pub fn is_view(&self) -> bool {
        self.view.is_some()
    }

    pub fn is_grouped(&self) -> bool {
        self.view.as_ref().is_some_and(ViewDef::is_grouped)
    }
}
