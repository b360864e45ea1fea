use crate::{
    connection::{ConnectionPool, SqliteUrl},
    extract::{decode_row, map_error},
    sql_writer::SqliteSqlWriter,
};
use anyhow::Context as _;
use async_trait::async_trait;
use futures::StreamExt;
use helm_core::{
    Condition, Delegator, EntityDef, EntityHelper, EntityListIterator, EntityQuery, EntityValue,
    Error, FieldDef, FindOptions, OrderBy, PrimaryKey, RelationDef, Result, SqlWriter, Value,
    coerce_fields_to_set, ensure_writable, partial_fields, prepare_create,
    schema::{self, ColumnInfo, SchemaChange, TableInfo},
    update_fields, validate_multi_relation,
    writer::Context,
};
use rusqlite::{Connection, TransactionBehavior};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};
use tokio::{sync::oneshot, task::spawn_blocking};
use uuid::Uuid;

const DEFAULT_FETCH_SIZE: usize = 256;
/// Keys looked up by a single statement in batched lookups.
const KEYS_PER_QUERY: usize = 250;

/// Datasource backed by a SQLite database file.
///
/// Every operation checks a connection out of the pool and runs on the
/// blocking thread pool. Cursors keep their connection until closed.
pub struct SqliteHelper {
    name: String,
    pool: ConnectionPool,
    writer: SqliteSqlWriter,
    fetch_size: usize,
}

impl SqliteHelper {
    /// Open a pool of at most `pool_size` connections to `sqlite://<path>?<params>`.
    pub async fn connect(name: impl Into<String>, url: &str, pool_size: usize) -> Result<Self> {
        let name = name.into();
        let url = SqliteUrl::parse(url)?;
        log::debug!("{}: connecting to `{}`", name, url.path);
        let pool = ConnectionPool::connect(url, pool_size).await?;
        Ok(Self {
            name,
            pool,
            writer: SqliteSqlWriter::default(),
            fetch_size: DEFAULT_FETCH_SIZE,
        })
    }

    /// Rows a cursor buffers ahead of its consumer when the find options do not say.
    pub fn fetch_size(mut self, fetch_size: usize) -> Self {
        self.fetch_size = fetch_size.max(1);
        self
    }

    pub fn writer(&self) -> &SqliteSqlWriter {
        &self.writer
    }

    pub fn url(&self) -> &SqliteUrl {
        self.pool.url()
    }

    async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let mut connection = self.pool.acquire().await?;
        spawn_blocking(move || f(&mut connection))
            .await
            .context("The task running a sqlite statement failed")?
    }

    async fn execute(&self, sql: String) -> Result<u64> {
        log::debug!("{}: {}", self.name, helm_core::truncate_long!(sql));
        self.with_connection(move |connection| {
            connection
                .execute(&sql, [])
                .map(|v| v as u64)
                .map_err(|e| map_error(e, &sql))
        })
        .await
    }

    async fn fetch(
        &self,
        entity: &Arc<EntityDef>,
        fields: &[&FieldDef],
        sql: String,
    ) -> Result<Vec<EntityValue>> {
        log::debug!("{}: {}", self.name, helm_core::truncate_long!(sql));
        let entity = entity.clone();
        let fields = fields.iter().map(|&f| f.clone()).collect::<Vec<_>>();
        self.with_connection(move |connection| {
            let fields = fields.iter().collect::<Vec<_>>();
            fetch_all(connection, &sql, &entity, &fields)
        })
        .await
    }
}

fn fetch_all(
    connection: &Connection,
    sql: &str,
    entity: &Arc<EntityDef>,
    fields: &[&FieldDef],
) -> Result<Vec<EntityValue>> {
    let mut statement = connection.prepare(sql).map_err(|e| map_error(e, sql))?;
    let mut rows = statement.query([]).map_err(|e| map_error(e, sql))?;
    let mut result = Vec::new();
    while let Some(row) = rows.next().map_err(|e| map_error(e, sql))? {
        result.push(decode_row(entity, fields, row)?);
    }
    Ok(result)
}

/// Hand the rows of `sql` to the cursor channel until exhausted or the cursor goes away.
fn stream_rows(
    connection: &Connection,
    sql: &str,
    entity: &Arc<EntityDef>,
    fields: &[&FieldDef],
    ready: oneshot::Sender<Result<()>>,
    tx: flume::Sender<Result<EntityValue>>,
) {
    let mut statement = match connection.prepare(sql) {
        Ok(v) => v,
        Err(e) => {
            let _ = ready.send(Err(map_error(e, sql)));
            return;
        }
    };
    let mut rows = match statement.query([]) {
        Ok(v) => v,
        Err(e) => {
            let _ = ready.send(Err(map_error(e, sql)));
            return;
        }
    };
    if ready.send(Ok(())).is_err() {
        return;
    }
    loop {
        let item = match rows.next() {
            Ok(Some(row)) => decode_row(entity, fields, row),
            Ok(None) => break,
            Err(e) => Err(map_error(e, sql)),
        };
        let failed = item.is_err();
        if tx.send(item).is_err() {
            log::trace!("Cursor over {} closed before the end of the rows", entity.name);
            break;
        }
        if failed {
            break;
        }
    }
}

fn set_query_only(connection: &Connection, query_only: bool) -> Result<()> {
    connection
        .pragma_update(None, "query_only", query_only)
        .map_err(|e| map_error(e, "PRAGMA query_only"))
}

/// Next value of an integer key that the database does not generate by itself.
fn next_sequence(
    connection: &Connection,
    writer: &SqliteSqlWriter,
    entity: &EntityDef,
    field: &FieldDef,
) -> Result<Value> {
    let mut context = Context::default();
    let mut sql = String::from("SELECT COALESCE(MAX(");
    writer.write_identifier_quoted(&mut context, &mut sql, &field.column_name);
    sql.push_str("), 0) + 1 FROM ");
    writer.write_table_ref(&mut context, &mut sql, entity, "");
    sql.push(';');
    let next: i64 = connection
        .query_row(&sql, [], |row| row.get(0))
        .map_err(|e| map_error(e, &sql))?;
    Value::Int64(Some(next))
        .coerce_to(&field.value)
        .ok_or_else(|| {
            let error = Error::msg(format!(
                "Sequence of table \"{}\" overflows field {}.{}",
                entity.table, entity.name, field.name
            ));
            log::error!("{}", error);
            error
        })
}

fn read_schema(connection: &Connection) -> Result<Vec<TableInfo>> {
    const TABLES: &str =
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name;";
    let names = connection
        .prepare(TABLES)
        .and_then(|mut statement| {
            let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .map_err(|e| map_error(e, TABLES))?;
    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let sql = format!("PRAGMA table_info(\"{}\");", name.replace('"', "\"\""));
        let columns = connection
            .prepare(&sql)
            .and_then(|mut statement| {
                let rows = statement.query_map([], |row| {
                    Ok(ColumnInfo {
                        name: row.get(1)?,
                        type_name: row.get(2)?,
                        nullable: row.get::<_, i64>(3)? == 0,
                        primary_key: row.get::<_, i64>(5)? > 0,
                    })
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .map_err(|e| map_error(e, &sql))?;
        tables.push(TableInfo { name, columns });
    }
    Ok(tables)
}

#[async_trait]
impl EntityHelper for SqliteHelper {
    fn helper_name(&self) -> &str {
        &self.name
    }

    async fn create(&self, value: EntityValue) -> Result<EntityValue> {
        let mut value = prepare_create(value).inspect_err(|e| log::error!("{}", e))?;
        let entity = value.entity().clone();
        for field in entity.primary_key_fields().filter(|f| f.auto_generated) {
            if !value.contains(field.name()) && matches!(field.value, Value::Uuid(..)) {
                value.insert_unchecked(field.name.to_string(), Value::Uuid(Some(Uuid::new_v4())));
            }
        }
        let writer = self.writer;
        let name = self.name.clone();
        self.with_connection(move |connection| {
            let transaction = connection
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|e| map_error(e, "BEGIN IMMEDIATE"))?;
            let mut rowid_field = None;
            for field in entity.primary_key_fields().filter(|f| f.auto_generated) {
                if value.contains(field.name()) {
                    continue;
                }
                if entity.primary_key_len() == 1 {
                    // INTEGER PRIMARY KEY aliases the rowid
                    rowid_field = Some(field);
                } else {
                    let next = next_sequence(&transaction, &writer, &entity, field)?;
                    value.insert_unchecked(field.name.to_string(), next);
                }
            }
            let mut sql = String::new();
            writer.write_insert(&mut sql, &value);
            log::debug!("{}: {}", name, helm_core::truncate_long!(sql));
            transaction
                .execute(&sql, [])
                .map_err(|e| map_error(e, &sql))?;
            if let Some(field) = rowid_field {
                let rowid = Value::Int64(Some(transaction.last_insert_rowid()));
                let rowid = rowid.coerce_to(&field.value).unwrap_or(rowid);
                value.insert_unchecked(field.name.to_string(), rowid);
            }
            let stored = if entity.primary_key_len() > 0 {
                let key = value.primary_key()?;
                let fields = entity.fields.iter().collect::<Vec<_>>();
                let mut sql = String::new();
                writer.write_select_by_primary_key(&mut sql, &key, &fields);
                fetch_all(&transaction, &sql, &entity, &fields)?.pop()
            } else {
                None
            };
            transaction
                .commit()
                .map_err(|e| map_error(e, "COMMIT"))?;
            Ok(stored.unwrap_or(value))
        })
        .await
    }

    async fn find_by_primary_key(&self, key: &PrimaryKey) -> Result<Option<EntityValue>> {
        let entity = key.entity();
        let fields = entity.fields.iter().collect::<Vec<_>>();
        let mut sql = String::new();
        self.writer.write_select_by_primary_key(&mut sql, key, &fields);
        Ok(self.fetch(entity, &fields, sql).await?.pop())
    }

    async fn find_by_primary_key_partial(
        &self,
        key: &PrimaryKey,
        fields: &BTreeSet<String>,
    ) -> Result<Option<EntityValue>> {
        let entity = key.entity();
        let fields = partial_fields(entity, fields).inspect_err(|e| log::error!("{}", e))?;
        let mut sql = String::new();
        self.writer.write_select_by_primary_key(&mut sql, key, &fields);
        Ok(self.fetch(entity, &fields, sql).await?.pop())
    }

    async fn find_all_by_primary_keys(&self, keys: &[PrimaryKey]) -> Result<Vec<EntityValue>> {
        let mut grouped: BTreeMap<&str, (&Arc<EntityDef>, Vec<PrimaryKey>)> = BTreeMap::new();
        for key in keys {
            grouped
                .entry(key.entity_name())
                .or_insert_with(|| (key.entity(), Vec::new()))
                .1
                .push(key.clone());
        }
        let mut result = Vec::with_capacity(keys.len());
        for (entity, keys) in grouped.into_values() {
            let fields = entity.fields.iter().collect::<Vec<_>>();
            for chunk in keys.chunks(KEYS_PER_QUERY) {
                let mut sql = String::new();
                self.writer
                    .write_select_by_primary_keys(&mut sql, entity, &fields, chunk);
                result.extend(self.fetch(entity, &fields, sql).await?);
            }
        }
        Ok(result)
    }

    async fn remove_by_primary_key(&self, key: &PrimaryKey) -> Result<u64> {
        ensure_writable(key.entity()).inspect_err(|e| log::error!("{}", e))?;
        let mut sql = String::new();
        self.writer.write_delete_by_primary_key(&mut sql, key);
        self.execute(sql).await
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
        if relation_one
            .key_maps
            .iter()
            .any(|key| value.get(&key.field).is_none_or(Value::is_null))
        {
            return Ok(Vec::new());
        }
        let mut sql = String::new();
        self.writer.write_select_multi_relation(
            &mut sql,
            value,
            relation_one,
            entity_one,
            relation_two,
            entity_two,
            order_by,
        );
        let fields = entity_two.fields.iter().collect::<Vec<_>>();
        self.fetch(entity_two, &fields, sql).await
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
        let mut sql = String::new();
        self.writer.write_select(&mut sql, &query);
        log::debug!("{}: {}", self.name, helm_core::truncate_long!(sql));
        let fields = query.fields.iter().map(|&f| f.clone()).collect::<Vec<_>>();
        let capacity = options
            .fetch_size
            .map_or(self.fetch_size, |v| v as usize)
            .max(1);
        let read_only = options.read_only;
        let connection = self.pool.acquire().await?;
        let (tx, rx) = flume::bounded(capacity);
        let (ready_tx, ready_rx) = oneshot::channel();
        let producer_entity = entity.clone();
        spawn_blocking(move || {
            let fields = fields.iter().collect::<Vec<_>>();
            if read_only && let Err(e) = set_query_only(&connection, true) {
                let _ = ready_tx.send(Err(e));
                return;
            }
            stream_rows(&connection, &sql, &producer_entity, &fields, ready_tx, tx);
            if read_only {
                let _ = set_query_only(&connection, false);
            }
        });
        ready_rx
            .await
            .context("The cursor producer stopped before running the query")??;
        let name = self.name.clone();
        let entity_name = entity.name.to_string();
        Ok(
            EntityListIterator::new(entity.clone(), rx.into_stream().boxed()).on_release(
                move || log::trace!("{}: released the cursor over {}", name, entity_name),
            ),
        )
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
        let mut sql = String::new();
        self.writer.write_count(&mut sql, &query);
        log::debug!("{}: {}", self.name, helm_core::truncate_long!(sql));
        self.with_connection(move |connection| {
            connection
                .query_row(&sql, [], |row| row.get::<_, i64>(0))
                .map(|v| v.max(0) as u64)
                .map_err(|e| map_error(e, &sql))
        })
        .await
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
        let mut sql = String::new();
        self.writer.write_delete_by_condition(&mut sql, &query);
        self.execute(sql).await
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
        let mut sql = String::new();
        self.writer
            .write_update_by_condition(&mut sql, &query, &fields);
        self.execute(sql).await
    }

    async fn store(&self, value: &EntityValue) -> Result<u64> {
        let fields = update_fields(value).inspect_err(|e| log::error!("{}", e))?;
        let key = value.primary_key().inspect_err(|e| log::error!("{}", e))?;
        let mut sql = String::new();
        if fields.is_empty() {
            let entity = value.entity();
            let key_fields = entity.primary_key_fields().collect::<Vec<_>>();
            self.writer
                .write_select_by_primary_key(&mut sql, &key, &key_fields);
            return Ok(self.fetch(entity, &key_fields, sql).await?.len().min(1) as u64);
        }
        self.writer.write_update(&mut sql, value, &fields);
        self.execute(sql).await
    }

    async fn check_data_source(
        &self,
        entities: &BTreeMap<String, Arc<EntityDef>>,
        messages: &mut Vec<String>,
        add_missing: bool,
    ) -> Result<()> {
        let entities = entities.clone();
        let writer = self.writer;
        let name = self.name.clone();
        let reported = self
            .with_connection(move |connection| {
                let live = read_schema(connection)?;
                let mut messages = Vec::new();
                let changes = schema::diff(
                    &entities,
                    &live,
                    |field| {
                        let mut out = String::new();
                        writer.write_column_type(&mut Context::default(), &mut out, &field.value);
                        out
                    },
                    &mut messages,
                );
                if !add_missing {
                    return Ok(messages);
                }
                for change in changes {
                    let mut sql = String::new();
                    match &change {
                        SchemaChange::CreateTable(entity) => {
                            writer.write_create_table(&mut sql, entity)
                        }
                        SchemaChange::AddColumn(entity, field) => {
                            writer.write_add_column(&mut sql, entity, field)
                        }
                    }
                    connection
                        .execute_batch(&sql)
                        .map_err(|e| map_error(e, &sql))?;
                    log::info!("{}: {}", name, change);
                    messages.push(change.to_string());
                }
                Ok(messages)
            })
            .await?;
        messages.extend(reported);
        Ok(())
    }
}
