#[cfg(test)]
mod tests {
    use helm_core::{
        Aggregate, ComparisonOp, Condition, EntityDef, EntityModel, EntityQuery, EntityValue,
        Error, FieldDef, FindOptions, OrderBy, Value, coerce_fields_to_set, partial_fields,
        prepare_create, update_fields, validate_condition,
    };
    use std::{
        collections::{BTreeMap, BTreeSet},
        sync::Arc,
    };

    fn catalog() -> (EntityModel, Arc<EntityDef>, Arc<EntityDef>) {
        let mut model = EntityModel::new("catalog");
        let book = model.add(
            EntityDef::new("Book")
                .field(FieldDef::of::<i64>("bookId").primary_key().auto_generated())
                .field(FieldDef::of::<String>("title").not_null())
                .field(FieldDef::of::<i32>("pages").not_null().default_value(100))
                .field(FieldDef::of::<String>("authorId")),
        );
        model.add(
            EntityDef::new("Author")
                .field(FieldDef::of::<String>("authorId").primary_key())
                .field(FieldDef::of::<String>("name")),
        );
        let view = model
            .view("AuthorPages")
            .member("A", "Author")
            .member("B", "Book")
            .link("A", "B", false, [("authorId", "authorId")])
            .group_by("A", "name", "name")
            .function("B", "totalPages", "pages", Aggregate::Sum)
            .build()
            .unwrap();
        let view = model.add(view);
        (model, book, view)
    }

    fn is_invalid_query<T: std::fmt::Debug>(result: helm_core::Result<T>) {
        assert!(
            matches!(result, Err(Error::InvalidQuery(..))),
            "Expected InvalidQuery, got {:?}",
            result
        );
    }

    #[test]
    fn conditions() {
        let (_, book, _) = catalog();
        let valid = [
            Condition::All,
            Condition::eq("title", "Dune"),
            Condition::eq("title", Value::Null),
            Condition::gt("pages", "300"),
            Condition::like("title", "D%"),
            Condition::in_list("bookId", [1, 2, 3]),
            Condition::in_list("bookId", Vec::<i64>::new()),
            Condition::between("pages", 10, 20),
            Condition::fields("pages", ComparisonOp::GreaterEqual, "bookId"),
            Condition::not(Condition::is_null("authorId")),
            Condition::and([]),
            Condition::or([Condition::is_not_null("title"), Condition::eq("pages", 1)]),
            Condition::field_map([("title", "Dune"), ("authorId", "A1")]),
        ];
        for condition in &valid {
            validate_condition(&book, condition)
                .unwrap_or_else(|e| panic!("{:?} should be valid: {}", condition, e));
        }
        let invalid = [
            Condition::eq("isbn", "1"),
            Condition::gt("pages", "many"),
            Condition::in_list("bookId", ["one"]),
            Condition::fields("pages", ComparisonOp::Equal, "isbn"),
            Condition::compare("pages", ComparisonOp::Between, 3),
            Condition::compare("title", ComparisonOp::Like, 3),
            Condition::and([Condition::All, Condition::not(Condition::is_null("isbn"))]),
        ];
        for condition in &invalid {
            is_invalid_query(validate_condition(&book, condition));
        }
        assert_eq!(
            Condition::and([Condition::eq("title", "x"), Condition::like("authorId", "A%")])
                .field_names(),
            BTreeSet::from(["title", "authorId"])
        );
    }

    #[test]
    fn queries() {
        let (model, book, view) = catalog();
        let options = FindOptions::default();
        let query = EntityQuery::new(&model, &book, None, None, &[], &[], &options).unwrap();
        assert_eq!(query.fields.len(), 4);
        assert!(!query.is_grouped());
        assert!(!query.counts_over_subquery());
        let having = Condition::gt("pages", 1);
        is_invalid_query(EntityQuery::new(&model, &book, None, Some(&having), &[], &[], &options));
        let order_by = [OrderBy::asc("isbn")];
        is_invalid_query(EntityQuery::new(&model, &book, None, None, &[], &order_by, &options));
        let fields = ["isbn".to_string()];
        is_invalid_query(EntityQuery::new(&model, &book, None, None, &fields, &[], &options));
        let paged = FindOptions::default().offset(3);
        let query = EntityQuery::new(&model, &book, None, None, &[], &[], &paged).unwrap();
        assert!(query.counts_over_subquery());

        let having = Condition::gt("totalPages", 100);
        let query = EntityQuery::new(&model, &view, None, Some(&having), &[], &[], &options)
            .expect("Having is allowed on grouped views");
        assert!(query.is_grouped());
        assert!(query.counts_over_subquery());
        assert_eq!(query.members.len(), 2);
        assert_eq!(
            query.group_by.iter().map(|f| f.name()).collect::<Vec<_>>(),
            ["name"]
        );
        let fields = ["totalPages".to_string()];
        let query = EntityQuery::new(&model, &view, None, None, &fields, &[], &options).unwrap();
        assert!(query.group_by.is_empty());

        let mut other = EntityModel::new("other");
        other.add(EntityDef::new("Author").field(FieldDef::of::<String>("authorId").primary_key()));
        is_invalid_query(EntityQuery::new(&other, &view, None, None, &[], &[], &options));
    }

    #[test]
    fn create_preparation() {
        let (_, book, view) = catalog();
        let prepared = prepare_create(EntityValue::with(&book, [("title", "Dune")]).unwrap())
            .expect("Generated key and defaults");
        assert_eq!(prepared.get("pages"), Some(&Value::Int32(Some(100))));
        assert!(!prepared.contains("bookId"));
        assert!(!prepared.contains("authorId"));
        let explicit = EntityValue::with(&book, [("title", Value::from("Dune")), ("pages", Value::Null)])
            .unwrap();
        assert!(
            matches!(prepare_create(explicit), Err(Error::InvalidInput(..))),
            "An explicit null does not take the default"
        );
        let untitled = EntityValue::with(&book, [("pages", 3)]).unwrap();
        assert!(matches!(prepare_create(untitled), Err(Error::InvalidInput(..))));
        let row = EntityValue::with(&view, [("name", "Frank")]).unwrap();
        is_invalid_query(prepare_create(row));
    }

    #[test]
    fn updates() {
        let (_, book, view) = catalog();
        let fields = partial_fields(&book, &BTreeSet::from(["pages".to_string()])).unwrap();
        assert_eq!(
            fields.iter().map(|f| f.name()).collect::<Vec<_>>(),
            ["bookId", "pages"]
        );
        assert_eq!(partial_fields(&book, &BTreeSet::new()).unwrap().len(), 4);
        is_invalid_query(partial_fields(&book, &BTreeSet::from(["isbn".to_string()])));

        let set = BTreeMap::from([("pages".to_string(), Value::from("12"))]);
        assert_eq!(
            coerce_fields_to_set(&book, &set).unwrap()["pages"],
            Value::Int32(Some(12))
        );
        for set in [
            BTreeMap::new(),
            BTreeMap::from([("isbn".to_string(), Value::from(1))]),
            BTreeMap::from([("title".to_string(), Value::Null)]),
            BTreeMap::from([("pages".to_string(), Value::from("lots"))]),
        ] {
            assert!(matches!(
                coerce_fields_to_set(&book, &set),
                Err(Error::InvalidInput(..))
            ));
        }

        let mut value = EntityValue::with(&book, [("bookId", Value::from(1)), ("title", "Dune".into())])
            .unwrap();
        assert_eq!(update_fields(&value).unwrap().len(), 1);
        value.set("title", Value::Null).unwrap();
        assert!(matches!(update_fields(&value), Err(Error::InvalidInput(..))));
        let row = EntityValue::with(&view, [("name", "Frank")]).unwrap();
        is_invalid_query(update_fields(&row));
    }
}
