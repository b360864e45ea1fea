#[cfg(test)]
mod tests {
    use helm::{EntityHelper, Error, HelperRegistry, helm_memory::MemoryHelper};
    use helm_tests::init_logs;
    use std::sync::Arc;

    fn registry() -> HelperRegistry {
        let mut registry = HelperRegistry::new();
        registry
            .register(Arc::new(MemoryHelper::new("main")))
            .register(Arc::new(MemoryHelper::new("archive")));
        registry
    }

    #[test]
    fn routing() {
        init_logs();
        let mut registry = registry();
        assert_eq!(registry.default_helper(), Some("main"));
        assert_eq!(registry.names().collect::<Vec<_>>(), ["archive", "main"]);
        assert_eq!(
            registry.helper_for("Product").expect("default").helper_name(),
            "main"
        );
        registry
            .assign("OrderItem", "archive")
            .expect("archive is registered");
        assert_eq!(
            registry.helper_for("OrderItem").expect("assigned").helper_name(),
            "archive"
        );
        registry.set_default("archive").expect("archive is registered");
        assert_eq!(
            registry.helper_for("Product").expect("default").helper_name(),
            "archive"
        );
        assert_eq!(registry.get("main").expect("main").helper_name(), "main");
    }

    #[test]
    fn unknown() {
        let mut registry = registry();
        assert!(matches!(registry.get("other"), Err(Error::InvalidInput(..))));
        assert!(matches!(
            registry.assign("Product", "other"),
            Err(Error::InvalidInput(..))
        ));
        assert!(matches!(
            registry.set_default("other"),
            Err(Error::InvalidInput(..))
        ));
        assert_eq!(registry.default_helper(), Some("main"));

        let empty = HelperRegistry::new();
        assert!(matches!(
            empty.helper_for("Product"),
            Err(Error::InvalidInput(..))
        ));
        assert_eq!(empty.helpers().count(), 0);
    }
}
