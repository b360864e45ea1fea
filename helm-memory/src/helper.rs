use crate::{
    select::{
        Tables, compare_records, field_value, matching_keys, select, table_for, table_for_mut,
        table_key,
    },
    table::{RowKey, Table},
};
use async_trait::async_trait;
use helm_core::{
    Condition, Delegator, EntityDef, EntityHelper, EntityListIterator, EntityQuery, EntityValue,
    Error, FindOptions, OrderBy, PrimaryKey, RelationDef, Result, Value, coerce_fields_to_set,
    ensure_writable, partial_fields, prepare_create,
    schema::{self, SchemaChange},
    update_fields, validate_multi_relation,
};
use parking_lot::RwLock;
use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

/// Datasource living in process memory.
///
/// Tables are created through [`check_data_source`](EntityHelper::check_data_source)
/// with `add_missing` set, exactly like an empty database. Every mutation runs
/// under one write lock so bulk operations apply all or nothing.
#[derive(Debug)]
pub struct MemoryHelper {
    name: String,
    tables: RwLock<Tables>,
}

impl MemoryHelper {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: RwLock::new(BTreeMap::new()),
        }
    }

    /// Accepts `memory://<anything>`, the rest of the url is ignored.
    pub fn connect(name: impl Into<String>, url: &str) -> Result<Self> {
        if !url.starts_with("memory://") {
            let error = Error::invalid_input(format!(
                "Expected memory datasource url to start with `memory://`, got `{url}`"
            ));
            log::error!("{}", error);
            return Err(error);
        }
        Ok(Self::new(name))
    }

    fn lookup(&self, key: &PrimaryKey) -> Result<Option<EntityValue>> {
        let entity = key.entity();
        let tables = self.tables.read();
        let table = table_for(&tables, entity)?;
        table
            .rows
            .get(&table.key_of_value(entity, key))
            .map(|row| table.decode(entity, row))
            .transpose()
    }
}

#[async_trait]
impl EntityHelper for MemoryHelper {
    fn helper_name(&self) -> &str {
        &self.name
    }

    async fn create(&self, value: EntityValue) -> Result<EntityValue> {
        let mut value = prepare_create(value).inspect_err(|e| log::error!("{}", e))?;
        let entity = value.entity().clone();
        let mut tables = self.tables.write();
        let table = table_for_mut(&mut tables, &entity)?;
        for field in entity.primary_key_fields().filter(|f| f.auto_generated) {
            if !value.contains(field.name()) {
                let generated = table.generate(&entity, field)?;
                value.insert_unchecked(field.name.to_string(), generated);
            }
        }
        let key = table.insert(Table::encode(&value))?;
        log::trace!("{}: inserted {}", self.name, value);
        match table.rows.get(&key) {
            Some(row) => table.decode(&entity, row),
            None => Ok(value),
        }
    }

    async fn find_by_primary_key(&self, key: &PrimaryKey) -> Result<Option<EntityValue>> {
        self.lookup(key)
    }

    async fn find_by_primary_key_partial(
        &self,
        key: &PrimaryKey,
        fields: &BTreeSet<String>,
    ) -> Result<Option<EntityValue>> {
        let selected =
            partial_fields(key.entity(), fields).inspect_err(|e| log::error!("{}", e))?;
        Ok(self
            .lookup(key)?
            .map(|v| v.restricted(selected.iter().map(|f| f.name()))))
    }

    async fn find_all_by_primary_keys(&self, keys: &[PrimaryKey]) -> Result<Vec<EntityValue>> {
        let mut result = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.lookup(key)? {
                result.push(value);
            }
        }
        Ok(result)
    }

    async fn remove_by_primary_key(&self, key: &PrimaryKey) -> Result<u64> {
        let entity = key.entity();
        ensure_writable(entity).inspect_err(|e| log::error!("{}", e))?;
        let mut tables = self.tables.write();
        let table = table_for_mut(&mut tables, entity)?;
        let row_key = table.key_of_value(entity, key);
        Ok(table.rows.remove(&row_key).map_or(0, |_| 1))
    }

    async fn find_by_multi_relation(
        &self,
        value: &EntityValue,
        relation_one: &RelationDef,
        entity_one: &Arc<EntityDef>,
        relation_two: &RelationDef,
        entity_two: &Arc<EntityDef>,
        order_by: &[OrderBy],
    ) -> Result<Vec<EntityValue>> {
        validate_multi_relation(
            value,
            relation_one,
            entity_one,
            relation_two,
            entity_two,
            order_by,
        )
        .inspect_err(|e| log::error!("{}", e))?;
        let mut wanted = Vec::with_capacity(relation_one.key_maps.len());
        for key in &relation_one.key_maps {
            match value.get(&key.field) {
                Some(v) if !v.is_null() => wanted.push((&*key.rel_field, v)),
                _ => return Ok(Vec::new()),
            }
        }
        let equal = |l: &Value, r: &Value| l.compare(r) == Some(Ordering::Equal);
        let tables = self.tables.read();
        let one = table_for(&tables, entity_one)?;
        let two = table_for(&tables, entity_two)?;
        let mut result = Vec::new();
        for row in one.rows.values() {
            if !wanted
                .iter()
                .all(|(field, v)| equal(&field_value(entity_one, Some(row), field), v))
            {
                continue;
            }
            for related in two.rows.values() {
                let linked = relation_two.key_maps.iter().all(|key| {
                    equal(
                        &field_value(entity_one, Some(row), &key.field),
                        &field_value(entity_two, Some(related), &key.rel_field),
                    )
                });
                if linked {
                    result.push(two.decode(entity_two, related)?);
                }
            }
        }
        result.sort_by(|l, r| compare_records(l, r, order_by));
        Ok(result)
    }

    async fn find_list_iterator_by_condition(
        &self,
        delegator: &dyn Delegator,
        entity: &Arc<EntityDef>,
        where_condition: Option<&Condition>,
        having_condition: Option<&Condition>,
        fields_to_select: &[String],
        order_by: &[OrderBy],
        options: &FindOptions,
    ) -> Result<EntityListIterator> {
        let query = EntityQuery::new(
            delegator,
            entity,
            where_condition,
            having_condition,
            fields_to_select,
            order_by,
            options,
        )
        .inspect_err(|e| log::error!("{}", e))?;
        if options.for_update {
            log::debug!("{}: rows cannot be locked, for_update is ignored", self.name);
        }
        let values = select(&self.tables.read(), &query)?;
        Ok(EntityListIterator::from_values(entity.clone(), values))
    }

    async fn find_count_by_condition_fields(
        &self,
        delegator: &dyn Delegator,
        entity: &Arc<EntityDef>,
        where_condition: Option<&Condition>,
        having_condition: Option<&Condition>,
        select_fields: &[String],
        options: &FindOptions,
    ) -> Result<u64> {
        let query = EntityQuery::new(
            delegator,
            entity,
            where_condition,
            having_condition,
            select_fields,
            &[],
            options,
        )
        .inspect_err(|e| log::error!("{}", e))?;
        Ok(select(&self.tables.read(), &query)?.len() as u64)
    }

    async fn remove_by_condition(
        &self,
        delegator: &dyn Delegator,
        entity: &Arc<EntityDef>,
        condition: &Condition,
    ) -> Result<u64> {
        ensure_writable(entity).inspect_err(|e| log::error!("{}", e))?;
        let options = FindOptions::default();
        let query = EntityQuery::new(delegator, entity, Some(condition), None, &[], &[], &options)
            .inspect_err(|e| log::error!("{}", e))?;
        let mut tables = self.tables.write();
        let table = table_for_mut(&mut tables, entity)?;
        let keys = matching_keys(table, &query)?;
        for key in &keys {
            table.rows.remove(key);
        }
        log::trace!("{}: removed {} rows from {}", self.name, keys.len(), entity.name);
        Ok(keys.len() as u64)
    }

    async fn store_by_condition(
        &self,
        delegator: &dyn Delegator,
        entity: &Arc<EntityDef>,
        fields_to_set: &BTreeMap<String, Value>,
        condition: &Condition,
    ) -> Result<u64> {
        ensure_writable(entity).inspect_err(|e| log::error!("{}", e))?;
        let fields = coerce_fields_to_set(entity, fields_to_set)
            .inspect_err(|e| log::error!("{}", e))?;
        let options = FindOptions::default();
        let query = EntityQuery::new(delegator, entity, Some(condition), None, &[], &[], &options)
            .inspect_err(|e| log::error!("{}", e))?;
        let mut tables = self.tables.write();
        let table = table_for_mut(&mut tables, entity)?;
        let keys = matching_keys(table, &query)?;
        let mut changed = Vec::with_capacity(keys.len());
        for key in &keys {
            let Some(row) = table.rows.get(key) else {
                continue;
            };
            let mut row = row.clone();
            for (name, value) in &fields {
                if let Some(field) = entity.get_field(name) {
                    row.insert(field.column_name.to_string(), value.clone());
                }
            }
            table.check_row(&row)?;
            let new_key = table.key_of(&row).unwrap_or_else(|| key.clone());
            changed.push((new_key, row));
        }
        let matched = keys.iter().collect::<BTreeSet<&RowKey>>();
        let mut taken = BTreeSet::new();
        for (key, _) in &changed {
            if (!matched.contains(key) && table.rows.contains_key(key)) || !taken.insert(key) {
                return Err(table.duplicate_key(key));
            }
        }
        for key in &keys {
            table.rows.remove(key);
        }
        let count = changed.len() as u64;
        for (_, row) in &changed {
            table.observe(row);
        }
        table.rows.extend(changed);
        log::trace!("{}: updated {} rows of {}", self.name, count, entity.name);
        Ok(count)
    }

    async fn store(&self, value: &EntityValue) -> Result<u64> {
        let fields = update_fields(value).inspect_err(|e| log::error!("{}", e))?;
        let key = value.primary_key().inspect_err(|e| log::error!("{}", e))?;
        let entity = value.entity();
        let mut tables = self.tables.write();
        let table = table_for_mut(&mut tables, entity)?;
        let row_key = table.key_of_value(entity, &key);
        let Some(row) = table.rows.get(&row_key) else {
            return Ok(0);
        };
        if fields.is_empty() {
            return Ok(1);
        }
        let mut row = row.clone();
        for (field, value) in fields {
            row.insert(field.column_name.to_string(), value.clone());
        }
        table.check_row(&row)?;
        table.rows.insert(row_key, row);
        Ok(1)
    }

    async fn check_data_source(
        &self,
        entities: &BTreeMap<String, Arc<EntityDef>>,
        messages: &mut Vec<String>,
        add_missing: bool,
    ) -> Result<()> {
        let mut tables = self.tables.write();
        let live = tables.values().map(|t| t.info.clone()).collect::<Vec<_>>();
        let changes = schema::diff(
            entities,
            &live,
            |f| f.value.type_name().to_string(),
            messages,
        );
        if !add_missing {
            return Ok(());
        }
        for change in changes {
            match &change {
                SchemaChange::CreateTable(entity) => {
                    tables.insert(table_key(entity), Table::create(entity));
                }
                SchemaChange::AddColumn(entity, field) => {
                    if let Some(table) = tables.get_mut(&table_key(entity)) {
                        table.add_column(field);
                    }
                }
            }
            log::info!("{}: {}", self.name, change);
            messages.push(change.to_string());
        }
        Ok(())
    }
}
