use crate::{bulk::products, model::price};
use helm_core::{
    Condition, EntityHelper, EntityModel, EntityValue, FindOptions, OrderBy, Value,
};
use rust_decimal::Decimal;
use time::macros::datetime;

/// Categories C1 and C2, members (C1, P1), (C1, P2), (C2, P2) and (C9, P4) where C9 does not exist.
pub(crate) async fn categories(helper: &dyn EntityHelper, model: &EntityModel) {
    let category = model.get("ProductCategory").unwrap();
    let member = model.get("ProductCategoryMember").unwrap();
    for entity in [&member, &category] {
        helper
            .remove_by_condition(model, entity, &Condition::All)
            .await
            .expect("Failed to clear the category tables");
    }
    for (id, name) in [("C1", "Tools"), ("C2", "Toys")] {
        let value = EntityValue::with(
            &category,
            [("productCategoryId", id), ("categoryName", name)],
        )
        .unwrap();
        helper.create(value).await.expect("Failed to create a category");
    }
    for (sequence, (category_id, product_id)) in [("C1", "P1"), ("C1", "P2"), ("C2", "P2"), ("C9", "P4")]
        .into_iter()
        .enumerate()
    {
        let value = EntityValue::with(
            &member,
            [
                ("productCategoryId", Value::from(category_id)),
                ("productId", product_id.into()),
                ("fromDate", datetime!(2024-01-01 00:00).into()),
                ("sequenceNum", (sequence as i64 * 10).into()),
            ],
        )
        .unwrap();
        helper
            .create(value)
            .await
            .expect("Failed to create a category member");
    }
}

pub async fn views(helper: &dyn EntityHelper, model: &EntityModel) {
    products(helper, model).await;
    categories(helper, model).await;
    let order_item = model.get("OrderItem").unwrap();
    helper
        .remove_by_condition(model, &order_item, &Condition::All)
        .await
        .unwrap();
    let orders: [(&str, i32, i64); 4] = [
        ("P1", 2, 999),
        ("P1", 3, 850),
        ("P2", 1, 1999),
        ("P4", 10, 450),
    ];
    for (product_id, quantity, cents) in orders {
        let value = EntityValue::with(
            &order_item,
            [
                ("productId", Value::from(product_id)),
                ("quantity", Value::from(quantity)),
                ("unitPrice", price(cents).into()),
            ],
        )
        .unwrap();
        helper.create(value).await.expect("Failed to create an order item");
    }

    // Grouped view
    let sales = model.get("ProductSales").unwrap();
    let options = FindOptions::default();
    let order_by = [OrderBy::asc("productId")];
    let rows = helper
        .find_list_iterator_by_condition(model, &sales, None, None, &[], &order_by, &options)
        .await
        .expect("Failed to read ProductSales")
        .scoped(async |cursor| cursor.complete_list().await)
        .await
        .unwrap();
    let summary = rows
        .iter()
        .map(|v| {
            (
                v.get_as::<String>("productId").unwrap().unwrap_or_default(),
                v.get_as::<String>("productName").unwrap().unwrap_or_default(),
                v.get_as::<i64>("totalQuantity").unwrap().unwrap_or_default(),
                v.get_as::<i64>("orderCount").unwrap().unwrap_or_default(),
                v.get_as::<Decimal>("maxPrice")
                    .unwrap()
                    .unwrap_or_default()
                    .round_dp(2),
            )
        })
        .collect::<Vec<_>>();
    assert_eq!(
        summary,
        [
            ("P1".to_string(), "Widget".to_string(), 5, 2, price(999)),
            ("P2".to_string(), "Gadget".to_string(), 1, 1, price(1999)),
            ("P4".to_string(), "Doohickey".to_string(), 10, 1, price(450)),
        ],
        "Products without orders are left out by the inner link"
    );
    assert_eq!(
        helper
            .find_count_by_condition(model, &sales, None, None, &options)
            .await
            .unwrap(),
        3
    );

    let having = Condition::gt("totalQuantity", 4);
    let by_total = OrderBy::parse_list(["totalQuantity DESC"]).unwrap();
    let rows = helper
        .find_list_iterator_by_condition(model, &sales, None, Some(&having), &[], &by_total, &options)
        .await
        .unwrap()
        .scoped(async |cursor| cursor.complete_list().await)
        .await
        .unwrap();
    assert_eq!(
        rows.iter()
            .map(|v| v.get_as::<String>("productId").unwrap().unwrap())
            .collect::<Vec<_>>(),
        ["P4", "P1"]
    );
    assert_eq!(
        helper
            .find_count_by_condition(model, &sales, None, Some(&having), &options)
            .await
            .unwrap(),
        2
    );

    let only_p1 = Condition::eq("productId", "P1");
    let rows = helper
        .find_list_iterator_by_condition(model, &sales, Some(&only_p1), None, &[], &[], &options)
        .await
        .unwrap()
        .scoped(async |cursor| cursor.complete_list().await)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_as::<i64>("totalQuantity").unwrap(), Some(5));

    // Fewer selected fields group by fewer columns
    let fields = ["productId".to_string(), "totalQuantity".to_string()];
    let rows = helper
        .find_list_iterator_by_condition(model, &sales, None, None, &fields, &order_by, &options)
        .await
        .unwrap()
        .scoped(async |cursor| cursor.complete_list().await)
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|v| v.len() == 2));
    let count = helper
        .find_count_by_condition_fields(model, &sales, None, None, &fields, &options)
        .await
        .unwrap();
    assert_eq!(count, rows.len() as u64);

    // Plain view with an optional link
    let categorized = model.get("ProductAndCategory").unwrap();
    let order_by = OrderBy::parse_list(["productId", "productCategoryId"]).unwrap();
    let rows = helper
        .find_list_iterator_by_condition(model, &categorized, None, None, &[], &order_by, &options)
        .await
        .expect("Failed to read ProductAndCategory")
        .scoped(async |cursor| cursor.complete_list().await)
        .await
        .unwrap();
    let pairs = rows
        .iter()
        .map(|v| {
            (
                v.get_as::<String>("productId").unwrap().unwrap_or_default(),
                v.get_as::<String>("categoryName").unwrap(),
            )
        })
        .collect::<Vec<_>>();
    assert_eq!(
        pairs,
        [
            ("P1".to_string(), Some("Tools".to_string())),
            ("P2".to_string(), Some("Tools".to_string())),
            ("P2".to_string(), Some("Toys".to_string())),
            ("P4".to_string(), None),
        ]
    );
    assert_eq!(
        rows[3].get_as::<String>("productName").unwrap(),
        Some("Doohickey".into())
    );
    let count = async |condition: Condition| {
        helper
            .find_count_by_condition(model, &categorized, Some(&condition), None, &options)
            .await
            .unwrap()
    };
    assert_eq!(count(Condition::is_null("categoryName")).await, 1);
    assert_eq!(count(Condition::eq("categoryName", "Tools")).await, 2);
    assert_eq!(count(Condition::gt("price", "10.00")).await, 2);
    assert_eq!(count(Condition::All).await, 4);
}
