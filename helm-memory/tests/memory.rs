#[cfg(test)]
mod tests {
    use helm_core::{EntityHelper, PrimaryKey};
    use helm_memory::MemoryHelper;
    use helm_tests::{execute_tests, init_logs, model, silent_logs};

    #[tokio::test]
    async fn memory() {
        init_logs();
        let helper = MemoryHelper::connect("memory", "memory://tests").expect("Could not connect");
        assert_eq!(helper.helper_name(), "memory");
        execute_tests(&helper).await;
    }

    #[tokio::test]
    async fn wrong_url() {
        silent_logs! {
            assert!(MemoryHelper::connect("memory", "sqlite://some_value").is_err());
        };
    }

    #[tokio::test]
    async fn empty_datasource() {
        init_logs();
        let helper = MemoryHelper::new("empty");
        let model = model();
        let mut messages = Vec::new();
        helper
            .check_data_source(model.entities(), &mut messages, false)
            .await
            .expect("Check of an empty datasource failed");
        let tables = model.entities().values().filter(|v| !v.is_view()).count();
        assert_eq!(messages.len(), tables);
        assert!(messages.iter().all(|v| v.ends_with("does not exist")));
        let product = model.get("Product").expect("Product is not in the model");
        let key = PrimaryKey::new(&product, [("productId", "P1")]).expect("Invalid key");
        let result = helper.find_by_primary_key(&key).await;
        assert!(
            result.is_err_and(|e| e.is_retryable()),
            "A missing table is a backend failure"
        );
    }
}
