use helm_core::{EntityDef, EntityHelper, EntityModel, EntityValue, FieldDef, PrimaryKey};

fn probe(extra: impl IntoIterator<Item = FieldDef>) -> EntityModel {
    let mut entity = EntityDef::new("SchemaProbe")
        .field(FieldDef::of::<String>("probeId").primary_key())
        .field(FieldDef::of::<String>("label"));
    for field in extra {
        entity = entity.field(field);
    }
    let mut model = EntityModel::new("probe");
    model.add(entity);
    model
}

async fn check(helper: &dyn EntityHelper, model: &EntityModel, add_missing: bool) -> Vec<String> {
    let mut messages = Vec::new();
    helper
        .check_data_source(model.entities(), &mut messages, add_missing)
        .await
        .expect("Failed to check the datasource");
    messages
}

fn mentions(messages: &[String], text: &str) -> usize {
    messages.iter().filter(|v| v.contains(text)).count()
}

pub async fn schema(helper: &dyn EntityHelper, model: &EntityModel) {
    let basic = probe([]);
    let extended = probe([
        FieldDef::of::<i32>("score").not_null().default_value(5),
        FieldDef::of::<String>("remark"),
    ]);
    let mismatched = probe([FieldDef::of::<String>("score").not_null().default_value("5")]);

    // Reporting only never changes anything
    let first = check(helper, &basic, false).await;
    assert_eq!(mentions(&first, "does not exist"), 1, "{:#?}", first);
    let second = check(helper, &basic, false).await;
    assert_eq!(first, second);

    let created = check(helper, &basic, true).await;
    assert_eq!(mentions(&created, "does not exist"), 1, "{:#?}", created);
    assert_eq!(mentions(&created, "Created table"), 1, "{:#?}", created);
    let clean = check(helper, &basic, false).await;
    assert!(clean.is_empty(), "{:#?}", clean);

    let entity = basic.get("SchemaProbe").unwrap();
    let row = EntityValue::with(&entity, [("probeId", "first"), ("label", "before")]).unwrap();
    helper.create(row).await.expect("Failed to create a probe");

    // Missing columns
    let missing = check(helper, &extended, false).await;
    assert_eq!(mentions(&missing, "does not exist"), 2, "{:#?}", missing);
    assert_eq!(check(helper, &extended, false).await, missing);
    let added = check(helper, &extended, true).await;
    assert_eq!(mentions(&added, "Added column"), 2, "{:#?}", added);
    let clean = check(helper, &extended, false).await;
    assert!(clean.is_empty(), "{:#?}", clean);
    let entity = extended.get("SchemaProbe").unwrap();
    let key = PrimaryKey::new(&entity, [("probeId", "first")]).unwrap();
    let found = helper
        .find_by_primary_key(&key)
        .await
        .expect("Failed to read the probe")
        .expect("The probe survives adding columns");
    assert_eq!(found.get_as::<i32>("score").unwrap(), Some(5));
    assert_eq!(found.get_as::<String>("remark").unwrap(), None);
    assert_eq!(found.get_as::<String>("label").unwrap(), Some("before".into()));

    // Extra columns are reported, never removed
    let extra = check(helper, &basic, true).await;
    assert_eq!(
        mentions(&extra, "is not declared by entity"),
        2,
        "{:#?}",
        extra
    );
    let clean = check(helper, &extended, false).await;
    assert!(clean.is_empty(), "{:#?}", clean);

    // Type mismatches are reported, never altered
    let wrong = check(helper, &mismatched, true).await;
    assert_eq!(mentions(&wrong, "has type"), 1, "{:#?}", wrong);
    let clean = check(helper, &extended, false).await;
    assert!(clean.is_empty(), "{:#?}", clean);
    let found = helper.find_by_primary_key(&key).await.unwrap().unwrap();
    assert_eq!(found.get_as::<i32>("score").unwrap(), Some(5));

    // The probe does not disturb the model tables
    let clean = check(helper, model, false).await;
    assert!(clean.is_empty(), "{:#?}", clean);
}
