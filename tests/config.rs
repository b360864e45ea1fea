#[cfg(test)]
mod tests {
    use helm::{DatasourceConfig, Error, HelmConfig};
    use helm_tests::{init_logs, silent_logs};
    use indoc::indoc;
    use std::fs;

    #[test]
    fn parse() {
        init_logs();
        let config = HelmConfig::from_toml(indoc! {r#"
            default_helper = "main"

            [[datasource]]
            name = "main"
            url = "sqlite://data/main.sqlite?mode=rwc"
            pool_size = 8
            fetch_size = 64
            check_on_start = true
            add_missing_on_start = true

            [[datasource]]
            name = "scratch"
            url = "memory://scratch"

            [groups]
            OrderItem = "scratch"
        "#})
        .expect("Valid configuration was rejected");
        assert_eq!(config.default_helper.as_deref(), Some("main"));
        assert_eq!(
            config.datasources,
            [
                DatasourceConfig {
                    name: "main".into(),
                    url: "sqlite://data/main.sqlite?mode=rwc".into(),
                    pool_size: 8,
                    fetch_size: Some(64),
                    check_on_start: true,
                    add_missing_on_start: true,
                },
                DatasourceConfig {
                    name: "scratch".into(),
                    url: "memory://scratch".into(),
                    pool_size: 4,
                    fetch_size: None,
                    check_on_start: false,
                    add_missing_on_start: false,
                },
            ]
        );
        assert_eq!(
            config.groups.get("OrderItem").map(String::as_str),
            Some("scratch")
        );
    }

    #[test]
    fn empty() {
        let config = HelmConfig::from_toml("").expect("Empty configuration was rejected");
        assert_eq!(config, HelmConfig::default());
    }

    #[test]
    fn invalid() {
        silent_logs! {
            let missing_url = HelmConfig::from_toml(indoc! {r#"
                [[datasource]]
                name = "main"
            "#});
            assert!(matches!(missing_url, Err(Error::InvalidInput(..))));

            let unknown_key = HelmConfig::from_toml(indoc! {r#"
                [[datasource]]
                name = "main"
                url = "memory://main"
                pool = 3
            "#});
            assert!(matches!(unknown_key, Err(Error::InvalidInput(..))));

            let wrong_type = HelmConfig::from_toml(r#"groups = "main""#);
            assert!(matches!(wrong_type, Err(Error::InvalidInput(..))));
        };
    }

    #[test]
    fn from_file() {
        init_logs();
        let dir = tempfile::tempdir().expect("Could not create a temporary directory");
        let path = dir.path().join("helm.toml");
        fs::write(
            &path,
            indoc! {r#"
                [[datasource]]
                name = "scratch"
                url = "memory://scratch"
            "#},
        )
        .expect("Could not write the configuration file");
        let config = HelmConfig::from_file(&path).expect("Could not read the configuration file");
        assert_eq!(config.datasources.len(), 1);
        assert_eq!(config.datasources[0].name, "scratch");
        silent_logs! {
            let missing = HelmConfig::from_file(dir.path().join("missing.toml"));
            assert!(missing.is_err_and(|e| e.is_retryable()));
        };
    }
}
