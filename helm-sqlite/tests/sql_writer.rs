#[cfg(test)]
mod tests {
    use helm_core::{
        Condition, EntityDef, EntityModel, EntityQuery, EntityValue, FieldDef, FindOptions,
        OrderBy, SqlWriter, Value, writer::Context,
    };
    use helm_sqlite::SqliteSqlWriter;
    use indoc::indoc;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    const WRITER: SqliteSqlWriter = SqliteSqlWriter {};

    fn attachment() -> (EntityModel, Arc<EntityDef>) {
        let mut model = EntityModel::new("writer");
        let entity = model.add(
            EntityDef::new("Attachment")
                .field(FieldDef::of::<i64>("attachmentId").primary_key().auto_generated())
                .field(FieldDef::of::<Vec<u8>>("data").not_null())
                .field(FieldDef::new("size", Value::Decimal(None, 10, 2)))
                .field(FieldDef::of::<bool>("visible").default_value(true)),
        );
        (model, entity)
    }

    #[test]
    fn column_types() {
        let mut out = String::new();
        for value in [
            Value::Boolean(None),
            Value::Int32(None),
            Value::Int64(None),
            Value::Float64(None),
            Value::Decimal(None, 0, 0),
            Value::Varchar(None),
            Value::Blob(None),
            Value::Date(None),
            Value::Timestamp(None),
            Value::Uuid(None),
        ] {
            WRITER.write_column_type(&mut Context::default(), &mut out, &value);
            out.push(' ');
        }
        assert_eq!(
            out.trim_end(),
            "INTEGER INTEGER INTEGER REAL REAL TEXT BLOB TEXT TEXT TEXT"
        );
    }

    #[test]
    fn literals() {
        let render = |value: Value| {
            let mut out = String::new();
            WRITER.write_value(&mut Context::default(), &mut out, &value);
            out
        };
        assert_eq!(render(Value::Blob(Some([0xCA, 0xFE, 0x01].into()))), "X'CAFE01'");
        assert_eq!(render(Value::Float64(Some(f64::INFINITY))), "1.0e+10000");
        assert_eq!(render(Value::Float64(Some(f64::NEG_INFINITY))), "-1.0e+10000");
        assert_eq!(render(Value::Float64(Some(f64::NAN))), "NULL");
        assert_eq!(render(Value::from("it's")), "'it''s'");
    }

    #[test]
    fn create_and_insert() {
        let (_, entity) = attachment();
        let mut out = String::new();
        WRITER.write_create_table(&mut out, &entity);
        assert_eq!(
            out,
            indoc! {r#"
                CREATE TABLE "attachment" (
                "attachment_id" INTEGER NOT NULL PRIMARY KEY,
                "data" BLOB NOT NULL,
                "size" REAL(10,2),
                "visible" INTEGER DEFAULT true);
            "#}
            .trim()
        );
        let value = EntityValue::with(
            &entity,
            [
                ("attachmentId", Value::from(7i64)),
                ("data", Value::from(vec![0xCAu8, 0xFE])),
                ("visible", false.into()),
            ],
        )
        .unwrap();
        let mut out = String::new();
        WRITER.write_insert(&mut out, &value);
        assert_eq!(
            out,
            indoc! {r#"
                INSERT INTO "attachment" ("attachment_id", "data", "visible") VALUES
                (7, X'CAFE', false);
            "#}
            .trim()
        );
        let mut out = String::new();
        let field = entity.get_field("size").unwrap();
        WRITER.write_add_column(&mut out, &entity, field);
        assert_eq!(out, r#"ALTER TABLE "attachment" ADD COLUMN "size" REAL(10,2);"#);
    }

    #[test]
    fn offset_without_limit() {
        let (model, entity) = attachment();
        let condition = Condition::gt("size", Decimal::new(150, 2));
        let order_by = [OrderBy::desc("size")];
        let options = FindOptions::default().offset(10).for_update(true);
        let query = EntityQuery::new(
            &model,
            &entity,
            Some(&condition),
            None,
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
                SELECT "attachment_id", "data", "size", "visible"
                FROM "attachment"
                WHERE "size" > 1.50
                ORDER BY "size" DESC
                LIMIT -1 OFFSET 10;
            "#}
            .trim()
        );
        let fields = ["attachmentId".to_string()];
        let options = FindOptions::default().limit(5).max_rows(3);
        let query =
            EntityQuery::new(&model, &entity, None, None, &fields, &[], &options).unwrap();
        let mut out = String::new();
        WRITER.write_count(&mut out, &query);
        assert_eq!(
            out,
            indoc! {r#"
                SELECT COUNT(*) FROM (
                SELECT "attachment_id"
                FROM "attachment"
                LIMIT 3
                ) AS "counted";
            "#}
            .trim()
        );
    }
}
