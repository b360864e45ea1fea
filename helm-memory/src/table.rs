use helm_core::{
    EntityDef, EntityValue, Error, FieldDef, Result, Value,
    schema::{ColumnInfo, TableInfo},
};
use std::{
    cmp::Ordering,
    collections::BTreeMap,
    sync::Arc,
};
use uuid::Uuid;

/// Stored record, column name to value.
pub(crate) type Row = BTreeMap<String, Value>;

/// Row address: the key columns, or a hidden row id for tables without a key.
#[derive(Debug, Clone)]
pub(crate) struct RowKey(pub(crate) Vec<Value>);

impl PartialEq for RowKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RowKey {}

impl PartialOrd for RowKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RowKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(l, r)| l.total_cmp(r))
            .find(|v| *v != Ordering::Equal)
            .unwrap_or_else(|| self.0.len().cmp(&other.0.len()))
    }
}

#[derive(Debug)]
pub(crate) struct Table {
    pub(crate) info: TableInfo,
    pub(crate) rows: BTreeMap<RowKey, Row>,
    sequence: i64,
    row_id: i64,
}

impl Table {
    pub(crate) fn create(entity: &EntityDef) -> Self {
        Self {
            info: TableInfo {
                name: entity.table.to_string(),
                columns: entity
                    .fields
                    .iter()
                    .map(|f| ColumnInfo {
                        name: f.column_name.to_string(),
                        type_name: f.value.type_name().into(),
                        nullable: f.nullable,
                        primary_key: f.primary_key,
                    })
                    .collect(),
            },
            rows: BTreeMap::new(),
            sequence: 0,
            row_id: 0,
        }
    }

    /// Append a column, existing rows take the default (or null).
    pub(crate) fn add_column(&mut self, field: &FieldDef) {
        self.info.columns.push(ColumnInfo {
            name: field.column_name.to_string(),
            type_name: field.value.type_name().into(),
            nullable: field.nullable || field.default.is_none(),
            primary_key: false,
        });
        let value = field.default.clone().unwrap_or_else(|| field.value.as_null());
        for row in self.rows.values_mut() {
            row.insert(field.column_name.to_string(), value.clone());
        }
    }

    /// Fail like a SQL engine would when `entity` references columns the table lacks.
    pub(crate) fn check(&self, entity: &EntityDef) -> Result<()> {
        match entity
            .fields
            .iter()
            .find(|f| self.info.column(&f.column_name).is_none())
        {
            Some(field) => {
                let error = Error::msg(format!(
                    "Table \"{}\" has no column \"{}\" (field {}.{})",
                    self.info.name, field.column_name, entity.name, field.name
                ));
                log::error!("{}", error);
                Err(error)
            }
            None => Ok(()),
        }
    }

    fn key_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.info.columns.iter().filter(|c| c.primary_key)
    }

    /// Key of `row`, `None` when the table has no key columns.
    pub(crate) fn key_of(&self, row: &Row) -> Option<RowKey> {
        let key = self
            .key_columns()
            .map(|c| row.get(&c.name).cloned().unwrap_or_default())
            .collect::<Vec<_>>();
        if key.is_empty() { None } else { Some(RowKey(key)) }
    }

    /// Key addressing the record identified by the key fields of `key`.
    pub(crate) fn key_of_value(&self, entity: &EntityDef, key: &EntityValue) -> RowKey {
        RowKey(
            self.key_columns()
                .map(|c| {
                    entity
                        .fields
                        .iter()
                        .find(|f| f.column_name == c.name)
                        .and_then(|f| key.get(f.name()))
                        .cloned()
                        .unwrap_or_default()
                })
                .collect(),
        )
    }

    /// Next generated value for an auto generated key field.
    pub(crate) fn generate(&mut self, entity: &EntityDef, field: &FieldDef) -> Result<Value> {
        let value = match &field.value {
            Value::Int32(..) | Value::Int64(..) => {
                self.sequence += 1;
                Value::Int64(Some(self.sequence))
            }
            Value::Uuid(..) => Value::Uuid(Some(Uuid::new_v4())),
            other => {
                let error = Error::invalid_input(format!(
                    "Cannot generate a {} value for {}.{}",
                    other.type_name(),
                    entity.name,
                    field.name
                ));
                log::error!("{}", error);
                return Err(error);
            }
        };
        value.coerce_to(&field.value).ok_or_else(|| {
            let error = Error::msg(format!(
                "Sequence of table \"{}\" overflows field {}.{}",
                self.info.name, entity.name, field.name
            ));
            log::error!("{}", error);
            error
        })
    }

    /// Record a user supplied integer key so generated ones never collide with it.
    pub(crate) fn observe(&mut self, row: &Row) {
        for column in self.info.columns.iter().filter(|c| c.primary_key) {
            if let Some(Value::Int32(Some(v))) = row.get(&column.name) {
                self.sequence = self.sequence.max(*v as i64);
            } else if let Some(Value::Int64(Some(v))) = row.get(&column.name) {
                self.sequence = self.sequence.max(*v);
            }
        }
    }

    /// Reject rows violating the not null columns.
    pub(crate) fn check_row(&self, row: &Row) -> Result<()> {
        if let Some(column) = self
            .info
            .columns
            .iter()
            .find(|c| !c.nullable && row.get(&c.name).is_none_or(Value::is_null))
        {
            let error = Error::ConstraintViolation(format!(
                "Column \"{}\" of table \"{}\" cannot be null",
                column.name, self.info.name
            ));
            log::error!("{}", error);
            return Err(error);
        }
        Ok(())
    }

    pub(crate) fn insert(&mut self, mut row: Row) -> Result<RowKey> {
        for column in &self.info.columns {
            row.entry(column.name.clone()).or_default();
        }
        self.check_row(&row)?;
        let key = match self.key_of(&row) {
            Some(key) => key,
            None => {
                self.row_id += 1;
                RowKey(vec![Value::Int64(Some(self.row_id))])
            }
        };
        if self.rows.contains_key(&key) {
            return Err(self.duplicate_key(&key));
        }
        self.observe(&row);
        self.rows.insert(key.clone(), row);
        Ok(key)
    }

    pub(crate) fn duplicate_key(&self, key: &RowKey) -> Error {
        let error = Error::ConstraintViolation(format!(
            "Duplicate key ({}) in table \"{}\"",
            key.0
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            self.info.name
        ));
        log::error!("{}", error);
        error
    }

    /// Row as a value of `entity`, every field populated.
    pub(crate) fn decode(&self, entity: &Arc<EntityDef>, row: &Row) -> Result<EntityValue> {
        let mut result = EntityValue::new(entity.clone());
        for field in &entity.fields {
            let value = row.get(field.column_name()).cloned().unwrap_or_default();
            let Some(value) = value.coerce_to(&field.value) else {
                let error = Error::msg(format!(
                    "Column \"{}\" of table \"{}\" holds {} which does not fit field {}.{} of type {}",
                    field.column_name,
                    self.info.name,
                    value,
                    entity.name,
                    field.name,
                    field.value.type_name()
                ));
                log::error!("{}", error);
                return Err(error);
            };
            result.insert_unchecked(field.name.to_string(), value);
        }
        Ok(result)
    }

    /// Row holding the populated fields of `value`.
    pub(crate) fn encode(value: &EntityValue) -> Row {
        value
            .entity()
            .fields
            .iter()
            .filter_map(|f| {
                value
                    .get(f.name())
                    .map(|v| (f.column_name.to_string(), v.clone()))
            })
            .collect()
    }
}
