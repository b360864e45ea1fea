use crate::{EntityHelper, EntityModel, Error, HelperRegistry, Result};
use helm_core::{Context as _, logged};
use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path, sync::Arc};

const DEFAULT_POOL_SIZE: usize = 4;

/// Datasources to open at start up and how entities are routed to them.
///
/// ```toml
/// default_helper = "main"
///
/// [[datasource]]
/// name = "main"
/// url = "sqlite://data/main.sqlite?mode=rwc"
/// check_on_start = true
/// add_missing_on_start = true
///
/// [groups]
/// AuditLog = "scratch"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HelmConfig {
    #[serde(default)]
    pub default_helper: Option<String>,
    #[serde(default, rename = "datasource")]
    pub datasources: Vec<DatasourceConfig>,
    /// Entity name to datasource name.
    #[serde(default)]
    pub groups: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasourceConfig {
    pub name: String,
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default)]
    pub fetch_size: Option<usize>,
    #[serde(default)]
    pub check_on_start: bool,
    #[serde(default)]
    pub add_missing_on_start: bool,
}

fn default_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}

impl HelmConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text)
            .map_err(|e| logged!(Error::invalid_input(format!("Invalid helm configuration: {}", e))))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("While reading the configuration file {}", path.display()))
            .map_err(Error::from)
            .inspect_err(|e| log::error!("{:#}", e))?;
        Self::from_toml(&text)
    }
}

async fn connect_datasource(config: &DatasourceConfig) -> Result<Arc<dyn EntityHelper>> {
    let scheme = config.url.split_once("://").map(|(s, _)| s);
    match scheme {
        #[cfg(feature = "memory")]
        Some("memory") => Ok(Arc::new(helm_memory::MemoryHelper::connect(
            config.name.clone(),
            &config.url,
        )?)),
        #[cfg(feature = "sqlite")]
        Some("sqlite") => {
            let mut helper =
                helm_sqlite::SqliteHelper::connect(config.name.clone(), &config.url, config.pool_size)
                    .await?;
            if let Some(fetch_size) = config.fetch_size {
                helper = helper.fetch_size(fetch_size);
            }
            Ok(Arc::new(helper))
        }
        _ => Err(logged!(Error::invalid_input(format!(
            "Datasource {} has url `{}` with no backend available for it",
            config.name, config.url
        )))),
    }
}

/// Open every datasource of `config`, checking them against `model` when asked to.
pub async fn connect_datasources(
    config: &HelmConfig,
    model: &EntityModel,
) -> Result<HelperRegistry> {
    let mut registry = HelperRegistry::new();
    for datasource in &config.datasources {
        let helper = connect_datasource(datasource).await?;
        if datasource.check_on_start {
            let mut messages = Vec::new();
            helper
                .check_data_source(
                    model.entities(),
                    &mut messages,
                    datasource.add_missing_on_start,
                )
                .await?;
            for message in &messages {
                log::info!("{}: {}", datasource.name, message);
            }
        }
        log::debug!("Datasource {} is ready", datasource.name);
        registry.register(helper);
    }
    if let Some(name) = &config.default_helper {
        registry
            .set_default(name.as_str())
            .inspect_err(|e| log::error!("{}", e))?;
    }
    for (entity, helper) in &config.groups {
        if let Err(e) = model.get(entity) {
            log::warn!("Group assigns unknown entity: {}", e);
        }
        registry
            .assign(entity.as_str(), helper.as_str())
            .inspect_err(|e| log::error!("{}", e))?;
    }
    Ok(registry)
}
