#[cfg(test)]
mod tests {
    use helm_core::{
        Aggregate, EntityDef, EntityModel, EntityValue, Error, FieldDef, PrimaryKey, Value,
    };
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn shop() -> EntityModel {
        let mut model = EntityModel::new("shop");
        model.add(
            EntityDef::new("Customer")
                .field(FieldDef::of::<i64>("customerId").primary_key())
                .field(FieldDef::of::<String>("fullName").not_null())
                .field(FieldDef::of::<String>("email").column("mail_address")),
        );
        model.add(
            EntityDef::new("Invoice")
                .table("invoices")
                .field(FieldDef::of::<i64>("customerId").primary_key())
                .field(FieldDef::of::<i32>("invoiceNum").primary_key())
                .field(FieldDef::new("total", Value::Decimal(None, 12, 2)))
                .field(FieldDef::of::<f64>("weight"))
                .field(FieldDef::of::<String>("status")),
        );
        model
    }

    fn get(model: &EntityModel, name: &str) -> Arc<EntityDef> {
        model.get(name).expect("Entity is in the model")
    }

    #[test]
    fn descriptors() {
        let model = shop();
        let customer = get(&model, "Customer");
        assert_eq!(customer.table, "customer");
        assert_eq!(customer.get_field("fullName").unwrap().column_name(), "full_name");
        assert_eq!(customer.get_field("email").unwrap().column_name(), "mail_address");
        assert!(!customer.get_field("customerId").unwrap().nullable);
        assert!(customer.get_field("email").unwrap().nullable);
        let invoice = get(&model, "Invoice");
        assert_eq!(invoice.table, "invoices");
        assert_eq!(invoice.primary_key_len(), 2);
        assert_eq!(
            invoice.non_primary_key_fields().map(|f| f.name()).collect::<Vec<_>>(),
            ["total", "weight", "status"]
        );
        assert!(matches!(model.get("Nothing"), Err(Error::InvalidInput(..))));
    }

    #[test]
    fn entity_values() {
        let model = shop();
        let invoice = get(&model, "Invoice");
        let mut value = EntityValue::with(
            &invoice,
            [
                ("customerId", Value::from(1)),
                ("invoiceNum", Value::from("7")),
                ("total", Value::from("12.5")),
            ],
        )
        .expect("Values are converted to the field types");
        assert_eq!(value.get("customerId"), Some(&Value::Int64(Some(1))));
        assert_eq!(value.get("invoiceNum"), Some(&Value::Int32(Some(7))));
        assert_eq!(value.get_as::<Decimal>("total").unwrap(), Some(Decimal::new(1250, 2)));
        assert_eq!(value.get_as::<f64>("weight").unwrap(), None);
        assert!(!value.contains("weight"));
        assert!(matches!(
            value.set("weight", "heavy"),
            Err(Error::InvalidInput(..))
        ));
        assert!(matches!(
            value.set("discount", 5),
            Err(Error::InvalidInput(..))
        ));
        value.set("status", "open").unwrap().set("weight", 1.5).unwrap();
        assert_eq!(value.len(), 5);
        let restricted = value.restricted(["status"]);
        assert_eq!(
            restricted.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
            ["customerId", "invoiceNum", "status"]
        );
        assert_eq!(value.remove("status"), Some(Value::from("open")));
        assert_eq!(
            value.to_string(),
            "Invoice{customerId: 1, invoiceNum: 7, total: 12.5, weight: 1.5}"
        );
    }

    #[test]
    fn primary_keys() {
        let model = shop();
        let invoice = get(&model, "Invoice");
        let value = EntityValue::with(
            &invoice,
            [
                ("customerId", Value::from(1)),
                ("invoiceNum", 2.into()),
                ("status", "open".into()),
            ],
        )
        .unwrap();
        assert!(value.has_primary_key());
        let key = value.primary_key().expect("Both key fields are set");
        assert_eq!(key.len(), 2);
        assert_eq!(key.entity_name(), "Invoice");
        assert!(
            PrimaryKey::new(&invoice, [("customerId", 1)]).is_err(),
            "Partial keys are rejected"
        );
        assert!(
            PrimaryKey::new(
                &invoice,
                [
                    ("customerId", Value::from(1)),
                    ("invoiceNum", Value::Int32(None)),
                ]
            )
            .is_err(),
            "Null key fields are rejected"
        );
        assert!(
            PrimaryKey::new(
                &invoice,
                [
                    ("customerId", Value::from(1)),
                    ("invoiceNum", 2.into()),
                    ("status", "open".into()),
                ]
            )
            .is_err(),
            "Non key fields are rejected"
        );
        let keyless = Arc::new(EntityDef::new("Log").field(FieldDef::of::<String>("line")));
        assert!(
            EntityValue::with(&keyless, [("line", "x")])
                .unwrap()
                .primary_key()
                .is_err()
        );
    }

    #[test]
    fn views() {
        let mut model = shop();
        let totals = model
            .view("CustomerTotals")
            .member("C", "Customer")
            .member("I", "Invoice")
            .link("C", "I", true, [("customerId", "customerId")])
            .group_by("C", "customerId", "customerId")
            .function("I", "invoiceCount", "invoiceNum", Aggregate::Count)
            .function("I", "amount", "total", Aggregate::Sum)
            .function("I", "averageWeight", "weight", Aggregate::Avg)
            .function("I", "lastInvoice", "invoiceNum", Aggregate::Max)
            .function("I", "numbers", "invoiceNum", Aggregate::Sum)
            .build()
            .expect("Valid view");
        let types = totals
            .fields
            .iter()
            .map(|f| (f.name(), f.value.type_name()))
            .collect::<Vec<_>>();
        assert_eq!(
            types,
            [
                ("customerId", "BIGINT"),
                ("invoiceCount", "BIGINT"),
                ("amount", "DECIMAL"),
                ("averageWeight", "DOUBLE"),
                ("lastInvoice", "INTEGER"),
                ("numbers", "BIGINT"),
            ]
        );
        assert!(totals.is_view());
        assert!(totals.is_grouped());
        assert!(totals.fields.iter().all(|f| f.nullable && !f.primary_key));
        let totals = model.add(totals);
        assert!(
            EntityValue::with(&totals, [("customerId", 1)])
                .unwrap()
                .primary_key()
                .is_err(),
            "Views have no primary key"
        );

        let invalid = [
            model.view("Empty").build(),
            model
                .view("UnknownMember")
                .member("C", "Customer")
                .alias("X", "name", "fullName")
                .build(),
            model
                .view("UnknownField")
                .member("C", "Customer")
                .alias("C", "name", "nickname")
                .build(),
            model
                .view("BadLink")
                .member("C", "Customer")
                .member("I", "Invoice")
                .link("C", "I", false, [("customerId", "amount")])
                .alias("C", "name", "fullName")
                .build(),
            model
                .view("Disconnected")
                .member("C", "Customer")
                .member("I", "Invoice")
                .link("I", "C", false, [("customerId", "customerId")])
                .alias("C", "name", "fullName")
                .build(),
            model
                .view("SumOfText")
                .member("C", "Customer")
                .function("C", "names", "fullName", Aggregate::Sum)
                .build(),
        ];
        for result in invalid {
            assert!(
                matches!(result, Err(Error::InvalidInput(..))),
                "Expected an invalid view, got {:?}",
                result
            );
        }
    }
}
