use helm_core::{Aggregate, EntityDef, EntityModel, FieldDef, RelationDef, Value};
use rust_decimal::Decimal;
use time::{Date, PrimitiveDateTime};
use uuid::Uuid;

/// Catalog shared by the whole suite: a small product/order schema plus two views.
pub fn model() -> EntityModel {
    let mut model = EntityModel::new("tests");
    model.add(
        EntityDef::new("Product")
            .field(FieldDef::of::<String>("productId").primary_key())
            .field(FieldDef::of::<String>("name").not_null())
            .field(FieldDef::of::<String>("description"))
            .field(FieldDef::new("price", Value::Decimal(None, 18, 2)))
            .field(
                FieldDef::of::<i32>("quantity")
                    .not_null()
                    .default_value(0)
                    .comment("Units in stock"),
            )
            .field(FieldDef::of::<Date>("introduced"))
            .field(FieldDef::of::<bool>("active"))
            .relation(RelationDef::many("ProductCategoryMember").key_map("productId", "productId"))
            .relation(RelationDef::many("OrderItem").key_map("productId", "productId")),
    );
    model.add(
        EntityDef::new("ProductCategory")
            .field(FieldDef::of::<String>("productCategoryId").primary_key())
            .field(FieldDef::of::<String>("categoryName"))
            .relation(
                RelationDef::many("ProductCategoryMember")
                    .key_map("productCategoryId", "productCategoryId"),
            ),
    );
    model.add(
        EntityDef::new("ProductCategoryMember")
            .field(FieldDef::of::<String>("productCategoryId").primary_key())
            .field(FieldDef::of::<String>("productId").primary_key())
            .field(FieldDef::of::<PrimitiveDateTime>("fromDate"))
            .field(FieldDef::of::<i64>("sequenceNum"))
            .relation(RelationDef::one("Product").key_map("productId", "productId"))
            .relation(
                RelationDef::one("ProductCategory")
                    .key_map("productCategoryId", "productCategoryId"),
            ),
    );
    model.add(
        EntityDef::new("OrderItem")
            .field(FieldDef::of::<i64>("orderItemId").primary_key().auto_generated())
            .field(FieldDef::of::<String>("productId").not_null())
            .field(FieldDef::of::<i32>("quantity").not_null())
            .field(FieldDef::new("unitPrice", Value::Decimal(None, 18, 2)))
            .field(FieldDef::of::<PrimitiveDateTime>("orderedAt"))
            .field(FieldDef::of::<Uuid>("trackingId"))
            .relation(RelationDef::one("Product").key_map("productId", "productId")),
    );
    model.add(
        EntityDef::new("OrderItemNote")
            .field(FieldDef::of::<i64>("orderItemId").primary_key())
            .field(FieldDef::of::<i32>("noteSeqId").primary_key().auto_generated())
            .field(FieldDef::of::<String>("note")),
    );
    model.add(
        EntityDef::new("ProductContent")
            .field(FieldDef::of::<Uuid>("contentId").primary_key().auto_generated())
            .field(FieldDef::of::<String>("productId"))
            .field(FieldDef::of::<Vec<u8>>("data"))
            .field(FieldDef::of::<f64>("weight").default_value(1.0)),
    );
    let sales = model
        .view("ProductSales")
        .member("PR", "Product")
        .member("OI", "OrderItem")
        .link("PR", "OI", false, [("productId", "productId")])
        .group_by("PR", "productId", "productId")
        .group_by("PR", "productName", "name")
        .function("OI", "totalQuantity", "quantity", Aggregate::Sum)
        .function("OI", "orderCount", "orderItemId", Aggregate::Count)
        .function("OI", "maxPrice", "unitPrice", Aggregate::Max)
        .build()
        .expect("ProductSales view is well formed");
    model.add(sales);
    let categorized = model
        .view("ProductAndCategory")
        .member("PCM", "ProductCategoryMember")
        .member("PR", "Product")
        .member("PC", "ProductCategory")
        .link("PCM", "PR", false, [("productId", "productId")])
        .link("PCM", "PC", true, [("productCategoryId", "productCategoryId")])
        .alias("PCM", "productCategoryId", "productCategoryId")
        .alias("PR", "productId", "productId")
        .alias("PR", "productName", "name")
        .alias("PR", "price", "price")
        .alias("PC", "categoryName", "categoryName")
        .build()
        .expect("ProductAndCategory view is well formed");
    model.add(categorized);
    model
}

pub(crate) fn price(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
