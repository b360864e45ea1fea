use crate::model::price;
use helm_core::{
    ComparisonOp, Condition, EntityDef, EntityHelper, EntityModel, EntityValue, Error,
    FindOptions, OrderBy, Value,
};
use rust_decimal::Decimal;
use std::{collections::BTreeMap, sync::Arc};

pub(crate) async fn products(helper: &dyn EntityHelper, model: &EntityModel) -> Arc<EntityDef> {
    let product = model.get("Product").unwrap();
    helper
        .remove_by_condition(model, &product, &Condition::All)
        .await
        .expect("Failed to clear the Product table");
    let rows: [(&str, &str, i32, Option<Decimal>, Option<bool>); 5] = [
        ("P1", "Widget", 0, Some(price(999)), Some(true)),
        ("P2", "Gadget", 12, Some(price(1999)), Some(true)),
        ("P3", "Gizmo", 3, None, None),
        ("P4", "Doohickey", 7, Some(price(450)), Some(false)),
        ("P5", "widget mini", 1, Some(price(200)), Some(true)),
    ];
    for (id, name, quantity, cost, active) in rows {
        let mut value = EntityValue::new(product.clone());
        value
            .set("productId", id)
            .unwrap()
            .set("name", name)
            .unwrap()
            .set("quantity", quantity)
            .unwrap()
            .set("price", cost)
            .unwrap()
            .set("active", active)
            .unwrap();
        helper
            .create(value)
            .await
            .unwrap_or_else(|e| panic!("Failed to create {id}: {e}"));
    }
    product
}

async fn snapshot(
    helper: &dyn EntityHelper,
    model: &EntityModel,
    entity: &Arc<EntityDef>,
) -> Vec<EntityValue> {
    let order_by = [OrderBy::asc("productId")];
    helper
        .find_list_iterator_by_condition(
            model,
            entity,
            None,
            None,
            &[],
            &order_by,
            &FindOptions::default(),
        )
        .await
        .expect("Failed to open the cursor")
        .scoped(async |cursor| cursor.complete_list().await)
        .await
        .expect("Failed to read the rows")
}

pub async fn bulk(helper: &dyn EntityHelper, model: &EntityModel) {
    let product = products(helper, model).await;
    let options = FindOptions::default();
    let count = async |condition: Condition| {
        helper
            .find_count_by_condition(model, &product, Some(&condition), None, &options)
            .await
            .unwrap_or_else(|e| panic!("Failed to count {:?}: {e}", condition))
    };

    // Condition semantics
    assert_eq!(count(Condition::All).await, 5);
    assert_eq!(count(Condition::like("name", "W%")).await, 1);
    assert_eq!(count(Condition::like("name", "%idget%")).await, 2);
    assert_eq!(count(Condition::is_null("price")).await, 1);
    assert_eq!(count(Condition::eq("price", Value::Null)).await, 1);
    assert_eq!(count(Condition::ne("price", Value::Null)).await, 4);
    assert_eq!(count(Condition::not(Condition::is_null("price"))).await, 4);
    assert_eq!(
        count(Condition::in_list("productId", ["P1", "P3", "P9"])).await,
        2
    );
    assert_eq!(
        count(Condition::in_list("productId", Vec::<&str>::new())).await,
        0
    );
    assert_eq!(
        count(Condition::not(Condition::in_list(
            "productId",
            Vec::<&str>::new()
        )))
        .await,
        5
    );
    assert_eq!(count(Condition::between("quantity", 1, 7)).await, 3);
    // Unknown (null) comparisons never match
    assert_eq!(count(Condition::ne("active", true)).await, 1);
    assert_eq!(count(Condition::gt("price", price(1000))).await, 1);
    assert_eq!(count(Condition::gt("price", "10.00")).await, 1);
    assert_eq!(
        count(Condition::or([
            Condition::eq("quantity", 0),
            Condition::gt("price", price(1000)),
        ]))
        .await,
        2
    );
    assert_eq!(
        count(Condition::field_map([
            ("active", Value::from(true)),
            ("quantity", Value::from(0)),
        ]))
        .await,
        1
    );
    assert_eq!(count(Condition::and([])).await, 5);
    assert_eq!(count(Condition::or([])).await, 0);
    assert_eq!(
        count(Condition::fields(
            "quantity",
            ComparisonOp::GreaterEqual,
            "quantity"
        ))
        .await,
        5
    );

    // Bulk update is idempotent
    let deactivate = BTreeMap::from([("active".to_string(), Value::from(false))]);
    let low_stock = Condition::lt("quantity", 5);
    let first = helper
        .store_by_condition(model, &product, &deactivate, &low_stock)
        .await
        .expect("Failed the bulk update");
    assert_eq!(first, 3);
    let after_first = snapshot(helper, model, &product).await;
    let second = helper
        .store_by_condition(model, &product, &deactivate, &low_stock)
        .await
        .expect("Failed the bulk update");
    assert!(second <= first);
    assert_eq!(snapshot(helper, model, &product).await, after_first);
    assert_eq!(count(Condition::eq("active", false)).await, 4);
    let none = helper
        .store_by_condition(model, &product, &deactivate, &Condition::eq("productId", "P9"))
        .await
        .expect("A bulk update matching nothing is not an error");
    assert_eq!(none, 0);

    // A conflicting key update applies to no row at all
    let rename = BTreeMap::from([("productId".to_string(), Value::from("PX"))]);
    let result;
    crate::silent_logs! {
        result = helper
            .store_by_condition(model, &product, &rename, &Condition::gt("quantity", 2))
            .await;
    }
    assert!(
        matches!(result, Err(Error::ConstraintViolation(..))),
        "Two rows cannot take the same key, got {:?}",
        result
    );
    assert_eq!(snapshot(helper, model, &product).await, after_first);

    // Bulk delete
    let removed = helper
        .remove_by_condition(model, &product, &Condition::is_null("price"))
        .await
        .expect("Failed the bulk delete");
    assert_eq!(removed, 1);
    let removed = helper
        .remove_by_condition(model, &product, &Condition::eq("productId", "P9"))
        .await
        .expect("Deleting nothing is not an error");
    assert_eq!(removed, 0);
    assert_eq!(count(Condition::All).await, 4);
    let removed = helper
        .remove_by_condition(model, &product, &Condition::All)
        .await
        .expect("Failed to delete every row");
    assert_eq!(removed, 4);
    assert_eq!(count(Condition::All).await, 0);
    assert!(snapshot(helper, model, &product).await.is_empty());
}
