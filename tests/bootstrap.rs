#[cfg(test)]
mod tests {
    use helm::{EntityHelper, EntityValue, Error, HelmConfig, PrimaryKey, connect_datasources};
    use helm_tests::{init_logs, model, silent_logs};
    use indoc::formatdoc;

    #[tokio::test]
    async fn bootstrap() {
        init_logs();
        let dir = tempfile::tempdir().expect("Could not create a temporary directory");
        let path = dir.path().join("main.sqlite");
        let config = HelmConfig::from_toml(&formatdoc! {r#"
            default_helper = "main"

            [[datasource]]
            name = "scratch"
            url = "memory://scratch"
            check_on_start = true
            add_missing_on_start = true

            [[datasource]]
            name = "main"
            url = "sqlite://{}?mode=rwc"
            pool_size = 2
            fetch_size = 16
            check_on_start = true
            add_missing_on_start = true

            [groups]
            OrderItem = "scratch"
        "#, path.display()})
        .expect("Valid configuration was rejected");
        let model = model();
        let registry = connect_datasources(&config, &model)
            .await
            .expect("Could not connect the datasources");
        assert!(path.exists(), "The sqlite database should have been created");
        assert_eq!(registry.names().collect::<Vec<_>>(), ["main", "scratch"]);
        assert_eq!(registry.default_helper(), Some("main"));

        let product_helper = registry
            .helper_for("Product")
            .expect("Product should use the default helper");
        assert_eq!(product_helper.helper_name(), "main");
        let item_helper = registry
            .helper_for("OrderItem")
            .expect("OrderItem is assigned to scratch");
        assert_eq!(item_helper.helper_name(), "scratch");

        // Both datasources got their tables
        for helper in registry.helpers() {
            let mut messages = Vec::new();
            helper
                .check_data_source(model.entities(), &mut messages, false)
                .await
                .expect("Could not check the datasource");
            assert!(
                messages.is_empty(),
                "{} should match the model, got: {:#?}",
                helper.helper_name(),
                messages
            );
        }

        let product = model.get("Product").expect("Product is not in the model");
        let created = product_helper
            .create(
                EntityValue::with(&product, [("productId", "P1"), ("name", "Widget")])
                    .expect("Invalid product"),
            )
            .await
            .expect("Could not create the product");
        assert_eq!(created.get_as::<i32>("quantity").expect("quantity"), Some(0));
        let key = PrimaryKey::new(&product, [("productId", "P1")]).expect("Invalid key");
        let scratch = registry.get("scratch").expect("scratch is registered");
        assert!(
            scratch
                .find_by_primary_key(&key)
                .await
                .expect("Lookup failed")
                .is_none(),
            "Datasources do not share records"
        );
        let found = product_helper
            .find_by_primary_key(&key)
            .await
            .expect("Lookup failed")
            .expect("P1 was just created");
        assert_eq!(
            found.get_as::<String>("name").expect("name"),
            Some("Widget".to_string())
        );
    }

    #[tokio::test]
    async fn check_without_adding() {
        init_logs();
        let config = HelmConfig::from_toml(indoc::indoc! {r#"
            [[datasource]]
            name = "scratch"
            url = "memory://scratch"
            check_on_start = true
        "#})
        .expect("Valid configuration was rejected");
        let model = model();
        let registry = connect_datasources(&config, &model)
            .await
            .expect("A datasource with missing tables still connects");
        assert_eq!(registry.default_helper(), Some("scratch"));
        let helper = registry.get("scratch").expect("scratch is registered");
        let mut messages = Vec::new();
        helper
            .check_data_source(model.entities(), &mut messages, false)
            .await
            .expect("Could not check the datasource");
        assert!(!messages.is_empty(), "Nothing should have been added");
    }

    #[tokio::test]
    async fn failures() {
        init_logs();
        let model = model();
        silent_logs! {
            let unknown_scheme = HelmConfig::from_toml(indoc::indoc! {r#"
                [[datasource]]
                name = "main"
                url = "postgres://localhost/main"
            "#})
            .expect("Valid configuration was rejected");
            let result = connect_datasources(&unknown_scheme, &model).await;
            assert!(matches!(result, Err(Error::InvalidInput(..))));

            let unknown_default = HelmConfig::from_toml(indoc::indoc! {r#"
                default_helper = "other"

                [[datasource]]
                name = "main"
                url = "memory://main"
            "#})
            .expect("Valid configuration was rejected");
            let result = connect_datasources(&unknown_default, &model).await;
            assert!(matches!(result, Err(Error::InvalidInput(..))));

            let unknown_group = HelmConfig::from_toml(indoc::indoc! {r#"
                [[datasource]]
                name = "main"
                url = "memory://main"

                [groups]
                Product = "other"
            "#})
            .expect("Valid configuration was rejected");
            let result = connect_datasources(&unknown_group, &model).await;
            assert!(matches!(result, Err(Error::InvalidInput(..))));

            let bad_sqlite = HelmConfig::from_toml(indoc::indoc! {r#"
                [[datasource]]
                name = "main"
                url = "sqlite://"
            "#})
            .expect("Valid configuration was rejected");
            let result = connect_datasources(&bad_sqlite, &model).await;
            assert!(result.is_err());
        };
    }
}
