use helm_core::{
    Condition, EntityHelper, EntityModel, EntityValue, Error, FindOptions, OrderBy, PrimaryKey,
    Result, Value,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Debug,
};

fn assert_invalid_query<T: Debug>(result: Result<T>, what: &str) {
    match result {
        Err(Error::InvalidQuery(..)) => {}
        other => panic!("{what} should be an invalid query, got {:?}", other),
    }
}

fn assert_invalid_input<T: Debug>(result: Result<T>, what: &str) {
    match result {
        Err(e @ Error::InvalidInput(..)) => assert!(!e.is_retryable()),
        other => panic!("{what} should be invalid input, got {:?}", other),
    }
}

pub async fn validation(helper: &dyn EntityHelper, model: &EntityModel) {
    let product = model.get("Product").unwrap();
    let sales = model.get("ProductSales").unwrap();
    let options = FindOptions::default();

    let having = Condition::gt("quantity", 1);
    let result;
    crate::silent_logs! {
        result = helper
            .find_list_iterator_by_condition(
                model,
                &product,
                None,
                Some(&having),
                &[],
                &[],
                &options,
            )
            .await
            .map(|_| ());
    }
    assert_invalid_query(result, "A having condition on a non grouped entity");

    let result;
    crate::silent_logs! {
        result = helper
            .find_count_by_condition(model, &product, None, Some(&having), &options)
            .await;
    }
    assert_invalid_query(result, "Counting with a having condition on a non grouped entity");

    let unknown = Condition::eq("color", "red");
    let result;
    crate::silent_logs! {
        result = helper
            .find_list_iterator_by_condition(model, &product, Some(&unknown), None, &[], &[], &options)
            .await
            .map(|_| ());
    }
    assert_invalid_query(result, "A condition on an unknown field");

    let result;
    crate::silent_logs! {
        result = helper.remove_by_condition(model, &product, &unknown).await;
    }
    assert_invalid_query(result, "Removing by a condition on an unknown field");

    let mistyped = Condition::eq("quantity", "many");
    let result;
    crate::silent_logs! {
        result = helper
            .find_count_by_condition(model, &product, Some(&mistyped), None, &options)
            .await;
    }
    assert_invalid_query(result, "Comparing an integer field with text");

    let order_by = [OrderBy::asc("color")];
    let result;
    crate::silent_logs! {
        result = helper
            .find_list_iterator_by_condition(model, &product, None, None, &[], &order_by, &options)
            .await
            .map(|_| ());
    }
    assert_invalid_query(result, "Ordering by an unknown field");

    let fields = ["color".to_string()];
    let result;
    crate::silent_logs! {
        result = helper
            .find_list_iterator_by_condition(model, &product, None, None, &fields, &[], &options)
            .await
            .map(|_| ());
    }
    assert_invalid_query(result, "Selecting an unknown field");

    let key = PrimaryKey::new(&product, [("productId", "P1")]).unwrap();
    let result;
    crate::silent_logs! {
        result = helper
            .find_by_primary_key_partial(&key, &BTreeSet::from(["color".to_string()]))
            .await;
    }
    assert_invalid_query(result, "A partial lookup of an unknown field");

    let set = BTreeMap::from([("productName".to_string(), Value::from("x"))]);
    let result;
    crate::silent_logs! {
        result = helper
            .store_by_condition(model, &sales, &set, &Condition::All)
            .await;
    }
    assert_invalid_query(result, "Updating a view");

    let result;
    crate::silent_logs! {
        result = helper.remove_by_condition(model, &sales, &Condition::All).await;
    }
    assert_invalid_query(result, "Removing from a view");

    let mut row = EntityValue::new(sales.clone());
    row.set("productId", "P1").unwrap();
    row.set("productName", "Widget").unwrap();
    let result;
    crate::silent_logs! {
        result = helper.store(&row).await;
    }
    assert_invalid_query(result, "Storing a view row");

    // Malformed values
    let mut nameless = EntityValue::new(product.clone());
    nameless.set("productId", "P9").unwrap();
    let result;
    crate::silent_logs! {
        result = helper.create(nameless).await;
    }
    assert_invalid_input(result, "Creating a product without its name");

    let mut cleared = EntityValue::new(product.clone());
    cleared.set("productId", "P1").unwrap();
    cleared.set("name", Value::Varchar(None)).unwrap();
    let result;
    crate::silent_logs! {
        result = helper.store(&cleared).await;
    }
    assert_invalid_input(result, "Setting a not null field to null");

    let mut keyless = EntityValue::new(product.clone());
    keyless.set("name", "Keyless").unwrap();
    let result;
    crate::silent_logs! {
        result = helper.store(&keyless).await;
    }
    assert_invalid_input(result, "Storing a value without its key");

    let result;
    crate::silent_logs! {
        result = helper
            .store_by_condition(model, &product, &BTreeMap::new(), &Condition::All)
            .await;
    }
    assert_invalid_input(result, "A bulk update without fields");

    let nulled = BTreeMap::from([("name".to_string(), Value::Varchar(None))]);
    let result;
    crate::silent_logs! {
        result = helper
            .store_by_condition(model, &product, &nulled, &Condition::All)
            .await;
    }
    assert_invalid_input(result, "A bulk update nulling a not null field");

    // Nothing above reached the data
    let widget = helper
        .find_by_primary_key(&key)
        .await
        .unwrap()
        .expect("Product P1 should still exist");
    assert_eq!(widget.get_as::<String>("name").unwrap(), Some("WidgetX".into()));
    assert!(
        helper
            .find_by_primary_key(&PrimaryKey::new(&product, [("productId", "P9")]).unwrap())
            .await
            .unwrap()
            .is_none()
    );
}
