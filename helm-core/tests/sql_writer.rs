#[cfg(test)]
mod tests {
    use helm_core::{
        Aggregate, ComparisonOp, Condition, EntityDef, EntityModel, EntityQuery, EntityValue,
        FieldDef, FindOptions, GenericSqlWriter, OrderBy, PrimaryKey, RelationDef, SqlWriter,
        Value, update_fields, writer::Context,
    };
    use indoc::indoc;
    use std::{collections::BTreeMap, sync::Arc};
    use time::macros::{date, datetime, time};
    use uuid::Uuid;

    const WRITER: GenericSqlWriter = GenericSqlWriter;

    struct Shop {
        model: EntityModel,
        product: Arc<EntityDef>,
        order_line: Arc<EntityDef>,
        member: Arc<EntityDef>,
        category: Arc<EntityDef>,
        sales: Arc<EntityDef>,
    }

    fn shop() -> Shop {
        let mut model = EntityModel::new("shop");
        let product = model.add(
            EntityDef::new("Product")
                .field(FieldDef::of::<String>("productId").primary_key())
                .field(FieldDef::of::<String>("name").not_null())
                .field(FieldDef::new("price", Value::Decimal(None, 10, 2)))
                .field(FieldDef::of::<i32>("quantity"))
                .relation(RelationDef::many("Member").key_map("productId", "productId")),
        );
        let order_line = model.add(
            EntityDef::new("OrderLine")
                .field(FieldDef::of::<i64>("orderId").primary_key())
                .field(FieldDef::of::<i32>("lineSeq").primary_key())
                .field(FieldDef::of::<String>("productId"))
                .field(FieldDef::of::<i32>("quantity").not_null().default_value(1)),
        );
        let member = model.add(
            EntityDef::new("Member")
                .field(FieldDef::of::<String>("categoryId").primary_key())
                .field(FieldDef::of::<String>("productId").primary_key())
                .relation(RelationDef::one("Category").key_map("categoryId", "categoryId")),
        );
        let category = model.add(
            EntityDef::new("Category")
                .field(FieldDef::of::<String>("categoryId").primary_key())
                .field(FieldDef::of::<String>("title")),
        );
        let sales = model
            .view("ProductSales")
            .member("P", "Product")
            .member("O", "OrderLine")
            .link("P", "O", true, [("productId", "productId")])
            .group_by("P", "productId", "productId")
            .function("O", "totalQuantity", "quantity", Aggregate::Sum)
            .build()
            .unwrap();
        let sales = model.add(sales);
        Shop {
            model,
            product,
            order_line,
            member,
            category,
            sales,
        }
    }

    #[test]
    fn literals() {
        let render = |value: Value| {
            let mut out = String::new();
            WRITER.write_value(&mut Context::default(), &mut out, &value);
            out
        };
        assert_eq!(render(Value::from("it's")), "'it''s'");
        assert_eq!(render(Value::Boolean(Some(true))), "true");
        assert_eq!(render(Value::Int32(None)), "NULL");
        assert_eq!(render(Value::Float64(Some(1.5))), "1.5");
        assert_eq!(
            render(Value::Float64(Some(f64::INFINITY))),
            "CAST('Infinity' AS DOUBLE)"
        );
        assert_eq!(render(Value::Blob(Some([0xCA, 0xFE].into()))), "'\\xCA\\xFE'");
        assert_eq!(render(Value::Date(Some(date!(2024 - 02 - 29)))), "'2024-02-29'");
        assert_eq!(render(Value::Time(Some(time!(8:05:00.000001)))), "'08:05:00.000001'");
        assert_eq!(
            render(Value::Timestamp(Some(datetime!(2024-03-01 10:15:30.25)))),
            "'2024-03-01 10:15:30.250000'"
        );
        let id = Uuid::nil();
        assert_eq!(
            render(Value::Uuid(Some(id))),
            "'00000000-0000-0000-0000-000000000000'"
        );
        let mut out = String::new();
        WRITER.write_identifier_quoted(&mut Context::default(), &mut out, "odd\"name");
        assert_eq!(out, "\"odd\"\"name\"");
    }

    #[test]
    fn create_table() {
        let shop = shop();
        let mut out = String::new();
        WRITER.write_create_table(&mut out, &shop.order_line);
        assert_eq!(
            out,
            indoc! {r#"
                CREATE TABLE "order_line" (
                "order_id" BIGINT NOT NULL,
                "line_seq" INTEGER NOT NULL,
                "product_id" VARCHAR,
                "quantity" INTEGER NOT NULL DEFAULT 1,
                PRIMARY KEY ("order_id", "line_seq"));
            "#}
            .trim()
        );
        let mut out = String::new();
        let field = shop.order_line.get_field("quantity").unwrap();
        WRITER.write_add_column(&mut out, &shop.order_line, field);
        assert_eq!(
            out,
            r#"ALTER TABLE "order_line" ADD COLUMN "quantity" INTEGER NOT NULL DEFAULT 1;"#
        );
    }

    #[test]
    fn select() {
        let shop = shop();
        let condition = Condition::and([
            Condition::eq("price", Value::Null),
            Condition::not(Condition::in_list("productId", ["A", "B"])),
            Condition::between("quantity", 1, 5),
            Condition::fields("quantity", ComparisonOp::Less, "price"),
        ]);
        let order_by = OrderBy::parse_list(["name NULLS LAST"]).unwrap();
        let fields = ["productId".to_string()];
        let options = FindOptions::default()
            .distinct(true)
            .offset(5)
            .for_update(true);
        let query = EntityQuery::new(
            &shop.model,
            &shop.product,
            Some(&condition),
            None,
            &fields,
            &order_by,
            &options,
        )
        .unwrap();
        let mut out = String::new();
        WRITER.write_select(&mut out, &query);
        assert_eq!(
            out,
            indoc! {r#"
                SELECT DISTINCT "product_id"
                FROM "product"
                WHERE "price" IS NULL AND NOT ("product_id" IN ('A', 'B')) AND "quantity" BETWEEN 1 AND 5 AND "quantity" < "price"
                ORDER BY "name" NULLS LAST
                OFFSET 5
                FOR UPDATE;
            "#}
            .trim()
        );
    }

    #[test]
    fn count() {
        let shop = shop();
        let options = FindOptions::default();
        let render = |condition: Condition| {
            let query = EntityQuery::new(
                &shop.model,
                &shop.product,
                Some(&condition),
                None,
                &[],
                &[],
                &options,
            )
            .unwrap();
            let mut out = String::new();
            WRITER.write_count(&mut out, &query);
            out
        };
        assert_eq!(
            render(Condition::or([
                Condition::like("name", "W%"),
                Condition::and([Condition::gt("price", "1.5"), Condition::is_null("quantity")]),
            ])),
            indoc! {r#"
                SELECT COUNT(*) FROM "product"
                WHERE "name" LIKE 'W%' OR ("price" > 1.5 AND "quantity" IS NULL);
            "#}
            .trim()
        );
        assert_eq!(
            render(Condition::in_list("productId", Vec::<String>::new())),
            "SELECT COUNT(*) FROM \"product\"\nWHERE false;"
        );
        assert_eq!(
            render(Condition::or([])),
            "SELECT COUNT(*) FROM \"product\"\nWHERE false;"
        );
        assert_eq!(render(Condition::All), "SELECT COUNT(*) FROM \"product\";");
    }

    #[test]
    fn grouped_view() {
        let shop = shop();
        let condition = Condition::eq("productId", "A");
        let having = Condition::gt("totalQuantity", 3);
        let order_by = [OrderBy::desc("totalQuantity")];
        let options = FindOptions::default().limit(10);
        let query = EntityQuery::new(
            &shop.model,
            &shop.sales,
            Some(&condition),
            Some(&having),
            &[],
            &order_by,
            &options,
        )
        .unwrap();
        let mut out = String::new();
        WRITER.write_select(&mut out, &query);
        assert_eq!(
            out,
            indoc! {r#"
                SELECT "P"."product_id" AS "productId", SUM("O"."quantity") AS "totalQuantity"
                FROM "product" "P"
                LEFT JOIN "order_line" "O" ON "P"."product_id" = "O"."product_id"
                WHERE "P"."product_id" = 'A'
                GROUP BY "P"."product_id"
                HAVING SUM("O"."quantity") > 3
                ORDER BY SUM("O"."quantity") DESC
                LIMIT 10;
            "#}
            .trim()
        );
        let mut out = String::new();
        let options = FindOptions::default();
        let query =
            EntityQuery::new(&shop.model, &shop.sales, None, None, &[], &[], &options).unwrap();
        WRITER.write_count(&mut out, &query);
        assert_eq!(
            out,
            indoc! {r#"
                SELECT COUNT(*) FROM (
                SELECT "P"."product_id" AS "productId", SUM("O"."quantity") AS "totalQuantity"
                FROM "product" "P"
                LEFT JOIN "order_line" "O" ON "P"."product_id" = "O"."product_id"
                GROUP BY "P"."product_id"
                ) AS "counted";
            "#}
            .trim()
        );
    }

    #[test]
    fn key_statements() {
        let shop = shop();
        let key = |order: i64, line: i32| {
            PrimaryKey::new(
                &shop.order_line,
                [("orderId", Value::from(order)), ("lineSeq", Value::from(line))],
            )
            .unwrap()
        };
        let fields = shop.order_line.fields.iter().collect::<Vec<_>>();
        let mut out = String::new();
        WRITER.write_select_by_primary_keys(&mut out, &shop.order_line, &fields, &[key(1, 2), key(1, 3)]);
        assert_eq!(
            out,
            indoc! {r#"
                SELECT "order_id", "line_seq", "product_id", "quantity"
                FROM "order_line"
                WHERE ("order_id" = 1 AND "line_seq" = 2) OR ("order_id" = 1 AND "line_seq" = 3);
            "#}
            .trim()
        );
        let products = ["A", "B"]
            .map(|id| PrimaryKey::new(&shop.product, [("productId", id)]).unwrap());
        let fields = shop.product.fields.iter().take(2).collect::<Vec<_>>();
        let mut out = String::new();
        WRITER.write_select_by_primary_keys(&mut out, &shop.product, &fields, &products);
        assert_eq!(
            out,
            indoc! {r#"
                SELECT "product_id", "name"
                FROM "product"
                WHERE "product_id" IN ('A', 'B');
            "#}
            .trim()
        );

        let mut value = key(1, 2).into_inner();
        value.set("quantity", 3).unwrap();
        let mut out = String::new();
        WRITER.write_update(&mut out, &value, &update_fields(&value).unwrap());
        assert_eq!(
            out,
            indoc! {r#"
                UPDATE "order_line" SET
                "quantity" = 3
                WHERE "order_id" = 1 AND "line_seq" = 2;
            "#}
            .trim()
        );
        let mut out = String::new();
        WRITER.write_delete_by_primary_key(&mut out, &key(1, 2));
        assert_eq!(
            out,
            "DELETE FROM \"order_line\"\nWHERE \"order_id\" = 1 AND \"line_seq\" = 2;"
        );
        let value = EntityValue::with(
            &shop.order_line,
            [("orderId", Value::from(4)), ("lineSeq", 1.into()), ("productId", "A".into())],
        )
        .unwrap();
        let mut out = String::new();
        WRITER.write_insert(&mut out, &value);
        assert_eq!(
            out,
            indoc! {r#"
                INSERT INTO "order_line" ("order_id", "line_seq", "product_id") VALUES
                (4, 1, 'A');
            "#}
            .trim()
        );
    }

    #[test]
    fn bulk_statements() {
        let shop = shop();
        let options = FindOptions::default();
        let condition = Condition::lt("quantity", 5);
        let query = EntityQuery::new(
            &shop.model,
            &shop.product,
            Some(&condition),
            None,
            &[],
            &[],
            &options,
        )
        .unwrap();
        let fields = BTreeMap::from([
            ("name".to_string(), Value::from("X")),
            ("quantity".to_string(), Value::Int32(Some(0))),
        ]);
        let mut out = String::new();
        WRITER.write_update_by_condition(&mut out, &query, &fields);
        assert_eq!(
            out,
            indoc! {r#"
                UPDATE "product" SET
                "name" = 'X',
                "quantity" = 0
                WHERE "quantity" < 5;
            "#}
            .trim()
        );
        let mut out = String::new();
        WRITER.write_delete_by_condition(&mut out, &query);
        assert_eq!(out, "DELETE FROM \"product\"\nWHERE \"quantity\" < 5;");
    }

    #[test]
    fn multi_relation() {
        let shop = shop();
        let value = EntityValue::with(&shop.product, [("productId", "A")]).unwrap();
        let mut out = String::new();
        WRITER.write_select_multi_relation(
            &mut out,
            &value,
            shop.product.get_relation("Member").unwrap(),
            &shop.member,
            shop.member.get_relation("Category").unwrap(),
            &shop.category,
            &[OrderBy::desc("title")],
        );
        assert_eq!(
            out,
            indoc! {r#"
                SELECT "R2"."category_id", "R2"."title"
                FROM "member" "R1"
                INNER JOIN "category" "R2" ON "R1"."category_id" = "R2"."category_id"
                WHERE "R1"."product_id" = 'A'
                ORDER BY "R2"."title" DESC;
            "#}
            .trim()
        );
    }
}
