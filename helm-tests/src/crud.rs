use crate::model::price;
use helm_core::{
    Condition, EntityHelper, EntityModel, EntityValue, Error, PrimaryKey, Value,
};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use time::macros::{date, datetime};
use uuid::Uuid;

pub async fn crud(helper: &dyn EntityHelper, model: &EntityModel) {
    let product = model.get("Product").expect("Product is in the model");
    helper
        .remove_by_condition(model, &product, &Condition::All)
        .await
        .expect("Failed to clear the Product table");

    // Create then read back
    let widget = EntityValue::with(
        &product,
        [("productId", Value::from("P1")), ("name", "Widget".into())],
    )
    .expect("Valid Product value");
    let created = helper
        .create(widget)
        .await
        .expect("Failed to create product P1");
    assert_eq!(created.get_as::<i32>("quantity").unwrap(), Some(0));
    assert_eq!(created.get("description"), Some(&Value::Varchar(None)));
    let key = created.primary_key().expect("P1 has a primary key");
    let found = helper
        .find_by_primary_key(&key)
        .await
        .expect("Failed to find product P1")
        .expect("Product P1 should exist");
    assert_eq!(found, created);

    // Store a single field
    let mut update = EntityValue::new(product.clone());
    update.set("productId", "P1").unwrap();
    update.set("name", "WidgetX").unwrap();
    let updated = helper.store(&update).await.expect("Failed to store P1");
    assert_eq!(updated, 1);
    let found = helper
        .find_by_primary_key(&key)
        .await
        .expect("Failed to find product P1")
        .expect("Product P1 should exist");
    assert_eq!(found.get_as::<String>("productId").unwrap(), Some("P1".into()));
    assert_eq!(found.get_as::<String>("name").unwrap(), Some("WidgetX".into()));
    assert_eq!(found.get_as::<i32>("quantity").unwrap(), Some(0));

    // Store without non key fields only reports whether the record exists
    let only_key = key.clone().into_inner();
    assert_eq!(helper.store(&only_key).await.unwrap(), 1);
    let missing = PrimaryKey::new(&product, [("productId", "P404")]).unwrap();
    assert_eq!(helper.store(&missing.clone().into_inner()).await.unwrap(), 0);
    let mut ghost = missing.clone().into_inner();
    ghost.set("name", "Ghost").unwrap();
    assert_eq!(
        helper.store(&ghost).await.expect("Store on a missing record"),
        0,
        "Storing a record that does not exist is not an error"
    );
    assert!(
        helper
            .find_by_primary_key(&missing)
            .await
            .expect("Lookup of a missing key is not an error")
            .is_none()
    );

    // Duplicate key
    let duplicate = EntityValue::with(
        &product,
        [("productId", Value::from("P1")), ("name", "Again".into())],
    )
    .unwrap();
    let result = helper.create(duplicate).await;
    assert!(
        matches!(result, Err(Error::ConstraintViolation(..))),
        "Creating P1 twice should be a constraint violation, got {:?}",
        result
    );

    // Every supported type survives the round trip
    let mut gadget = EntityValue::new(product.clone());
    gadget
        .set("productId", "P2")
        .unwrap()
        .set("name", "Gadget 'deluxe'")
        .unwrap()
        .set("description", Value::Varchar(None))
        .unwrap()
        .set("price", price(1999))
        .unwrap()
        .set("quantity", 12)
        .unwrap()
        .set("introduced", date!(2024 - 02 - 29))
        .unwrap()
        .set("active", true)
        .unwrap();
    let gadget = helper.create(gadget).await.expect("Failed to create P2");
    let found = helper
        .find_by_primary_key(&gadget.primary_key().unwrap())
        .await
        .unwrap()
        .expect("Product P2 should exist");
    assert_eq!(found, gadget);
    assert_eq!(found.get_as::<Decimal>("price").unwrap(), Some(price(1999)));
    assert_eq!(found.get_as::<bool>("active").unwrap(), Some(true));
    assert_eq!(found.get("description"), Some(&Value::Varchar(None)));
    assert_eq!(
        found.get_as::<String>("name").unwrap(),
        Some("Gadget 'deluxe'".into())
    );

    // Partial lookup
    let fields = BTreeSet::from(["price".to_string()]);
    let partial = helper
        .find_by_primary_key_partial(&gadget.primary_key().unwrap(), &fields)
        .await
        .expect("Failed the partial lookup")
        .expect("Product P2 should exist");
    assert_eq!(partial.len(), 2);
    assert!(partial.contains("productId"));
    assert_eq!(partial.get_as::<Decimal>("price").unwrap(), Some(price(1999)));
    assert!(!partial.contains("name"));
    let partial = helper
        .find_by_primary_key_partial(&gadget.primary_key().unwrap(), &BTreeSet::new())
        .await
        .unwrap()
        .expect("Product P2 should exist");
    assert_eq!(partial, gadget);

    // Batched lookup
    assert!(
        helper
            .find_all_by_primary_keys(&[])
            .await
            .expect("Empty batched lookup")
            .is_empty()
    );
    let keys = [
        PrimaryKey::new(&product, [("productId", "P2")]).unwrap(),
        missing.clone(),
        key.clone(),
    ];
    let mut found = helper
        .find_all_by_primary_keys(&keys)
        .await
        .expect("Failed the batched lookup")
        .into_iter()
        .map(|v| v.get_as::<String>("productId").unwrap().unwrap())
        .collect::<Vec<_>>();
    found.sort();
    assert_eq!(found, ["P1", "P2"]);

    // Remove
    let p2 = gadget.primary_key().unwrap();
    assert_eq!(helper.remove_by_primary_key(&p2).await.unwrap(), 1);
    assert_eq!(helper.remove_by_primary_key(&p2).await.unwrap(), 0);
    assert!(helper.find_by_primary_key(&p2).await.unwrap().is_none());
    assert_eq!(helper.remove_by_primary_key(&missing).await.unwrap(), 0);

    // Create all keeps the input order
    let values = ["P7", "P5", "P6"]
        .into_iter()
        .map(|id| {
            EntityValue::with(
                &product,
                [("productId", Value::from(id)), ("name", format!("Item {id}").into())],
            )
            .unwrap()
        })
        .collect::<Vec<_>>();
    let created = helper
        .create_all(values)
        .await
        .expect("Failed to create the products");
    assert_eq!(
        created
            .iter()
            .map(|v| v.get_as::<String>("productId").unwrap().unwrap())
            .collect::<Vec<_>>(),
        ["P7", "P5", "P6"]
    );

    generated_keys(helper, model).await;
}

async fn generated_keys(helper: &dyn EntityHelper, model: &EntityModel) {
    let order_item = model.get("OrderItem").unwrap();
    let note = model.get("OrderItemNote").unwrap();
    let content = model.get("ProductContent").unwrap();
    for entity in [&order_item, &note, &content] {
        helper
            .remove_by_condition(model, entity, &Condition::All)
            .await
            .expect("Failed to clear the table");
    }

    // Single integer key
    let tracking = Uuid::parse_str("5e915574-bb30-4430-98cf-c5854f61fbbd").unwrap();
    let mut ids = Vec::new();
    for quantity in [3, 4] {
        let mut item = EntityValue::new(order_item.clone());
        item.set("productId", "P1")
            .unwrap()
            .set("quantity", quantity)
            .unwrap()
            .set("orderedAt", datetime!(2024-03-01 10:15:30.25))
            .unwrap()
            .set("trackingId", tracking)
            .unwrap();
        let created = helper.create(item).await.expect("Failed to create an order item");
        let id = created
            .get_as::<i64>("orderItemId")
            .unwrap()
            .expect("The order item id is generated");
        let found = helper
            .find_by_primary_key(&created.primary_key().unwrap())
            .await
            .unwrap()
            .expect("The created order item should exist");
        assert_eq!(found, created);
        assert_eq!(found.get_as::<Uuid>("trackingId").unwrap(), Some(tracking));
        ids.push(id);
    }
    assert_ne!(ids[0], ids[1]);

    // Generated part of a composite key
    let mut sequence = Vec::new();
    for text in ["first", "second"] {
        let mut value = EntityValue::new(note.clone());
        value
            .set("orderItemId", ids[0])
            .unwrap()
            .set("note", text)
            .unwrap();
        let created = helper.create(value).await.expect("Failed to create a note");
        sequence.push(
            created
                .get_as::<i32>("noteSeqId")
                .unwrap()
                .expect("The note sequence is generated"),
        );
    }
    assert!(sequence[1] > sequence[0]);

    // Generated uuid key, blob and float default
    let mut value = EntityValue::new(content.clone());
    value
        .set("productId", "P1")
        .unwrap()
        .set("data", vec![0u8, 1, 2, 254, 255])
        .unwrap();
    let created = helper.create(value).await.expect("Failed to create content");
    assert!(created.get_as::<Uuid>("contentId").unwrap().is_some());
    assert_eq!(created.get_as::<f64>("weight").unwrap(), Some(1.0));
    let found = helper
        .find_by_primary_key(&created.primary_key().unwrap())
        .await
        .unwrap()
        .expect("The created content should exist");
    assert_eq!(
        found.get_as::<Vec<u8>>("data").unwrap(),
        Some(vec![0u8, 1, 2, 254, 255])
    );
    assert_eq!(found, created);
}
