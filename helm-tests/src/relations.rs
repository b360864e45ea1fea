use crate::{bulk::products, views::categories};
use helm_core::{EntityHelper, EntityModel, EntityValue, Error, OrderBy, Value};

pub async fn relations(helper: &dyn EntityHelper, model: &EntityModel) {
    let product = products(helper, model).await;
    categories(helper, model).await;
    let member = model.get("ProductCategoryMember").unwrap();
    let category = model.get("ProductCategory").unwrap();
    let to_members = product
        .get_relation("ProductCategoryMember")
        .expect("Product relates to its members")
        .clone();
    let to_category = member
        .get_relation("ProductCategory")
        .expect("Member relates to its category")
        .clone();
    let by_name = [OrderBy::desc("categoryName")];

    let names = async |product_id: Value| {
        let value = EntityValue::with(&product, [("productId", product_id)]).unwrap();
        helper
            .find_by_multi_relation(&value, &to_members, &member, &to_category, &category, &by_name)
            .await
            .expect("Failed to follow the relations")
            .iter()
            .map(|v| v.get_as::<String>("categoryName").unwrap().unwrap_or_default())
            .collect::<Vec<_>>()
    };
    assert_eq!(names("P2".into()).await, ["Toys", "Tools"]);
    assert_eq!(names("P1".into()).await, ["Tools"]);
    // Member of a category that does not exist
    assert!(names("P4".into()).await.is_empty());
    assert!(names("P3".into()).await.is_empty());
    assert!(names(Value::Varchar(None)).await.is_empty());

    let p2 = EntityValue::with(&product, [("productId", "P2")]).unwrap();
    let rows = helper
        .find_by_multi_relation(&p2, &to_members, &member, &to_category, &category, &[])
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|v| v.entity_name() == "ProductCategory"));

    // Relation not leading to the given entity
    let to_product = member.get_relation("Product").unwrap().clone();
    let result = helper
        .find_by_multi_relation(&p2, &to_members, &member, &to_product, &category, &by_name)
        .await;
    assert!(
        matches!(result, Err(Error::InvalidQuery(..))),
        "Expected InvalidQuery, got {:?}",
        result
    );
    let result = helper
        .find_by_multi_relation(
            &p2,
            &to_members,
            &member,
            &to_category,
            &category,
            &[OrderBy::asc("sequenceNum")],
        )
        .await;
    assert!(
        matches!(result, Err(Error::InvalidQuery(..))),
        "Expected InvalidQuery, got {:?}",
        result
    );
}
