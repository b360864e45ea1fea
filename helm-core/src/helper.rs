use crate::{
    Condition, Delegator, EntityDef, EntityListIterator, EntityValue, FindOptions, OrderBy,
    PrimaryKey, RelationDef, Result, Value,
};
use async_trait::async_trait;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

/// The entity persistence port: one implementation per physical datasource.
///
/// A helper is stateless apart from its datasource binding and can be shared by
/// concurrent callers (`Arc<dyn EntityHelper>`). Every operation completes or
/// fails before its future resolves. Cursors returned by
/// [`find_list_iterator_by_condition`](Self::find_list_iterator_by_condition)
/// belong to the caller and must be closed.
#[async_trait]
pub trait EntityHelper: Send + Sync {
    /// Logical name of the datasource this helper is bound to.
    fn helper_name(&self) -> &str;

    /// Insert one record and return it as stored, generated key and defaults included.
    async fn create(&self, value: EntityValue) -> Result<EntityValue>;

    /// Insert every value in order. Not atomic: when an element fails the
    /// previous inserts stay applied unless the caller wraps a transaction.
    async fn create_all(&self, values: Vec<EntityValue>) -> Result<Vec<EntityValue>> {
        let mut result = Vec::with_capacity(values.len());
        for value in values {
            result.push(self.create(value).await?);
        }
        Ok(result)
    }

    /// Exact key lookup, `None` when nothing matches.
    async fn find_by_primary_key(&self, key: &PrimaryKey) -> Result<Option<EntityValue>>;

    /// Key lookup returning only `fields` (plus the key fields), all of them when `fields` is empty.
    async fn find_by_primary_key_partial(
        &self,
        key: &PrimaryKey,
        fields: &BTreeSet<String>,
    ) -> Result<Option<EntityValue>>;

    /// Batched lookup, order not guaranteed, missing keys are skipped.
    async fn find_all_by_primary_keys(&self, keys: &[PrimaryKey]) -> Result<Vec<EntityValue>>;

    /// Delete at most one record, returns the rows deleted.
    async fn remove_by_primary_key(&self, key: &PrimaryKey) -> Result<u64>;

    /// Two hop traversal: `value` -> `relation_one` -> `entity_one` -> `relation_two` -> `entity_two`.
    #[allow(clippy::too_many_arguments)]
    async fn find_by_multi_relation(
        &self,
        value: &EntityValue,
        relation_one: &RelationDef,
        entity_one: &Arc<EntityDef>,
        relation_two: &RelationDef,
        entity_two: &Arc<EntityDef>,
        order_by: &[OrderBy],
    ) -> Result<Vec<EntityValue>>;

    /// General query entry point, `where_condition` applies before grouping and
    /// `having_condition` after (grouped views only).
    #[allow(clippy::too_many_arguments)]
    async fn find_list_iterator_by_condition(
        &self,
        delegator: &dyn Delegator,
        entity: &Arc<EntityDef>,
        where_condition: Option<&Condition>,
        having_condition: Option<&Condition>,
        fields_to_select: &[String],
        order_by: &[OrderBy],
        options: &FindOptions,
    ) -> Result<EntityListIterator>;

    /// Rows the matching iterator would produce.
    async fn find_count_by_condition(
        &self,
        delegator: &dyn Delegator,
        entity: &Arc<EntityDef>,
        where_condition: Option<&Condition>,
        having_condition: Option<&Condition>,
        options: &FindOptions,
    ) -> Result<u64> {
        self.find_count_by_condition_fields(
            delegator,
            entity,
            where_condition,
            having_condition,
            &[],
            options,
        )
        .await
    }

    /// Count restricted to `select_fields`, which also drive the grouping of grouped views.
    #[allow(clippy::too_many_arguments)]
    async fn find_count_by_condition_fields(
        &self,
        delegator: &dyn Delegator,
        entity: &Arc<EntityDef>,
        where_condition: Option<&Condition>,
        having_condition: Option<&Condition>,
        select_fields: &[String],
        options: &FindOptions,
    ) -> Result<u64>;

    /// Bulk delete. Removing every row requires passing [`Condition::All`].
    async fn remove_by_condition(
        &self,
        delegator: &dyn Delegator,
        entity: &Arc<EntityDef>,
        condition: &Condition,
    ) -> Result<u64>;

    /// Bulk update of `fields_to_set` on every row matching `condition`.
    async fn store_by_condition(
        &self,
        delegator: &dyn Delegator,
        entity: &Arc<EntityDef>,
        fields_to_set: &BTreeMap<String, Value>,
        condition: &Condition,
    ) -> Result<u64>;

    /// Update the record addressed by the key fields of `value`, returns 1 or 0.
    async fn store(&self, value: &EntityValue) -> Result<u64>;

    /// Compare the live schema with `entities`, reporting every discrepancy in
    /// `messages`. Missing tables and columns are created only when `add_missing`.
    async fn check_data_source(
        &self,
        entities: &BTreeMap<String, Arc<EntityDef>>,
        messages: &mut Vec<String>,
        add_missing: bool,
    ) -> Result<()>;
}
