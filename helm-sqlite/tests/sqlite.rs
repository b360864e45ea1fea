#[cfg(test)]
mod tests {
    use helm_core::{EntityHelper, EntityValue, PrimaryKey};
    use helm_sqlite::SqliteHelper;
    use helm_tests::{execute_tests, init_logs, model, prepare, silent_logs};
    use std::path::Path;

    fn url_of(path: &Path, mode: &str) -> String {
        format!("sqlite://{}?mode={}", path.display(), mode)
    }

    #[tokio::test]
    async fn sqlite() {
        init_logs();
        let directory = tempfile::tempdir().expect("Could not create a temporary directory");
        let path = directory.path().join("tests.sqlite");
        assert!(!path.exists(), "Database file should not exist before test");
        let helper = SqliteHelper::connect("sqlite", &url_of(&path, "rwc"), 4)
            .await
            .expect("Could not open the database");
        assert!(path.exists(), "Database file should be created after connection");
        assert_eq!(helper.helper_name(), "sqlite");
        execute_tests(&helper).await;
    }

    #[tokio::test]
    async fn in_memory() {
        init_logs();
        let helper = SqliteHelper::connect("sqlite", "sqlite://:memory:", 8)
            .await
            .expect("Could not open the in memory database")
            .fetch_size(2);
        assert!(helper.url().is_memory());
        execute_tests(&helper).await;
    }

    #[tokio::test]
    async fn wrong_url() {
        silent_logs! {
            assert!(
                SqliteHelper::connect("sqlite", "memory://some_value", 1)
                    .await
                    .is_err()
            );
            assert!(SqliteHelper::connect("sqlite", "sqlite://", 1).await.is_err());
        };
    }

    #[tokio::test]
    async fn read_only() {
        init_logs();
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("read_only.sqlite");
        silent_logs! {
            assert!(
                SqliteHelper::connect("ro", &url_of(&path, "ro"), 1)
                    .await
                    .is_err(),
                "Should not be able to open in read only a database that does not exist"
            );
        };
        let model = model();
        let product = model.get("Product").unwrap();
        {
            let writable = SqliteHelper::connect("rw", &url_of(&path, "rwc"), 1)
                .await
                .expect("Could not create the database");
            prepare(&writable, &model).await;
            let value = EntityValue::with(&product, [("productId", "P1"), ("name", "Widget")])
                .unwrap();
            writable.create(value).await.expect("Failed to create P1");
        }
        let helper = SqliteHelper::connect("ro", &url_of(&path, "ro"), 2)
            .await
            .expect("Could not open the database in read only");
        let key = PrimaryKey::new(&product, [("productId", "P1")]).unwrap();
        let found = helper
            .find_by_primary_key(&key)
            .await
            .expect("Reading a read only database works")
            .expect("P1 was created before");
        assert_eq!(found.get_as::<String>("name").unwrap(), Some("Widget".into()));
        let value = EntityValue::with(&product, [("productId", "P2"), ("name", "Gadget")]).unwrap();
        silent_logs! {
            let result = helper.create(value).await;
            assert!(
                result.is_err_and(|e| e.is_retryable()),
                "Writing a read only database is a backend failure"
            );
        };
        let mut messages = Vec::new();
        helper
            .check_data_source(model.entities(), &mut messages, false)
            .await
            .expect("Checking a read only database works");
        assert!(messages.is_empty(), "{:#?}", messages);
    }
}
