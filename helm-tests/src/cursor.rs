use crate::bulk::products;
use helm_core::{
    Condition, EntityDef, EntityHelper, EntityModel, FindOptions, OrderBy, Result,
};
use std::sync::Arc;

async fn drained(
    helper: &dyn EntityHelper,
    model: &EntityModel,
    entity: &Arc<EntityDef>,
    condition: Option<&Condition>,
    fields: &[String],
    order_by: &[OrderBy],
    options: &FindOptions,
) -> Result<Vec<String>> {
    let mut cursor = helper
        .find_list_iterator_by_condition(model, entity, condition, None, fields, order_by, options)
        .await?;
    let mut ids = Vec::new();
    while let Some(value) = cursor.next().await? {
        ids.push(value.get_as::<String>("productId")?.unwrap_or_default());
    }
    assert!(cursor.next().await?.is_none(), "An exhausted cursor stays exhausted");
    assert_eq!(cursor.fetched(), ids.len());
    cursor.close().await?;
    Ok(ids)
}

pub async fn cursors(helper: &dyn EntityHelper, model: &EntityModel) {
    let product = products(helper, model).await;
    let by_price = OrderBy::parse_list(["price DESC", "productId"]).unwrap();

    // Ordering, nulls last when descending
    let ids = drained(helper, model, &product, None, &[], &by_price, &FindOptions::default())
        .await
        .expect("Failed to read the products by price");
    assert_eq!(ids, ["P2", "P1", "P4", "P5", "P3"]);
    let nulls_first = OrderBy::parse_list(["price DESC NULLS FIRST"]).unwrap();
    let ids = drained(helper, model, &product, None, &[], &nulls_first, &FindOptions::default())
        .await
        .unwrap();
    assert_eq!(ids, ["P3", "P2", "P1", "P4", "P5"]);
    let ascending = [OrderBy::asc("price")];
    let ids = drained(helper, model, &product, None, &[], &ascending, &FindOptions::default())
        .await
        .unwrap();
    assert_eq!(ids.first().map(String::as_str), Some("P3"));

    // Paging
    let page = FindOptions::default().limit(2).offset(1);
    let ids = drained(helper, model, &product, None, &[], &by_price, &page)
        .await
        .unwrap();
    assert_eq!(ids, ["P1", "P4"]);
    let tail = FindOptions::default().offset(3);
    let ids = drained(helper, model, &product, None, &[], &by_price, &tail)
        .await
        .unwrap();
    assert_eq!(ids, ["P5", "P3"]);
    let capped = FindOptions::default().limit(3).max_rows(1);
    let ids = drained(helper, model, &product, None, &[], &by_price, &capped)
        .await
        .unwrap();
    assert_eq!(ids, ["P2"]);
    let options = FindOptions::default()
        .fetch_size(1)
        .read_only(false)
        .for_update(true);
    let ids = drained(helper, model, &product, None, &[], &by_price, &options)
        .await
        .unwrap();
    assert_eq!(ids.len(), 5);

    // Counting agrees with the cursor
    let conditions = [
        None,
        Some(Condition::gt("quantity", 2)),
        Some(Condition::is_null("active")),
        Some(Condition::eq("productId", "P9")),
    ];
    let options = [
        FindOptions::default(),
        FindOptions::default().limit(2),
        FindOptions::default().offset(4),
        FindOptions::default().distinct(true),
    ];
    for condition in &conditions {
        for options in &options {
            let rows = drained(
                helper,
                model,
                &product,
                condition.as_ref(),
                &[],
                &by_price,
                options,
            )
            .await
            .unwrap();
            let count = helper
                .find_count_by_condition(model, &product, condition.as_ref(), None, options)
                .await
                .unwrap();
            assert_eq!(
                count,
                rows.len() as u64,
                "Count and cursor disagree for {:?} with {:?}",
                condition,
                options
            );
        }
    }
    let fields = ["active".to_string()];
    let distinct = FindOptions::default().distinct(true);
    let rows = helper
        .find_list_iterator_by_condition(model, &product, None, None, &fields, &[], &distinct)
        .await
        .unwrap()
        .scoped(async |cursor| cursor.complete_list().await)
        .await
        .unwrap();
    assert_eq!(rows.len(), 3, "true, null and false");
    assert!(rows.iter().all(|v| v.len() == 1 && v.contains("active")));
    let count = helper
        .find_count_by_condition_fields(model, &product, None, None, &fields, &distinct)
        .await
        .unwrap();
    assert_eq!(count, 3);

    // Partial reads
    let mut cursor = helper
        .find_list_iterator_by_condition(
            model,
            &product,
            None,
            None,
            &["productId".to_string(), "name".to_string()],
            &by_price,
            &FindOptions::default(),
        )
        .await
        .unwrap();
    let rows = cursor.partial_list(1, 2).await.unwrap();
    assert_eq!(
        rows.iter()
            .map(|v| v.get_as::<String>("name").unwrap().unwrap())
            .collect::<Vec<_>>(),
        ["Widget", "Doohickey"]
    );
    assert!(rows.iter().all(|v| v.len() == 2));
    assert_eq!(cursor.fetched(), 3);
    let rest = cursor.complete_list().await.unwrap();
    assert_eq!(rest.len(), 2);
    assert!(cursor.partial_list(0, 10).await.unwrap().is_empty());
    assert!(!cursor.is_closed());
    cursor.close().await.expect("Failed to close the cursor");

    // A dropped cursor still gives its resource back
    let mut cursor = helper
        .find_list_iterator_by_condition(
            model,
            &product,
            None,
            None,
            &[],
            &by_price,
            &FindOptions::default().fetch_size(1),
        )
        .await
        .unwrap();
    assert!(cursor.next().await.unwrap().is_some());
    crate::silent_logs! {
        drop(cursor);
    }
    let count = helper
        .find_count_by_condition(model, &product, None, None, &FindOptions::default())
        .await
        .expect("The connection of the dropped cursor should be available again");
    assert_eq!(count, 5);

    // Scoped use closes on every path
    let result = helper
        .find_list_iterator_by_condition(
            model,
            &product,
            None,
            None,
            &[],
            &by_price,
            &FindOptions::default(),
        )
        .await
        .unwrap()
        .scoped(async |cursor| {
            cursor.next().await?;
            Err::<(), _>(helm_core::Error::msg("stop early"))
        })
        .await;
    assert!(result.is_err_and(|e| e.is_retryable()));
    assert_eq!(
        helper
            .find_count_by_condition(model, &product, None, None, &FindOptions::default())
            .await
            .unwrap(),
        5
    );
}
