use crate::{EntityHelper, Error, Result};
use std::{collections::BTreeMap, sync::Arc};

/// Helpers by datasource name plus the entity to datasource assignment.
///
/// Built once at start up and handed to whoever needs a helper.
#[derive(Clone, Default)]
pub struct HelperRegistry {
    helpers: BTreeMap<String, Arc<dyn EntityHelper>>,
    groups: BTreeMap<String, String>,
    default_helper: Option<String>,
}

impl HelperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a helper under its own name, the first one becomes the default.
    pub fn register(&mut self, helper: Arc<dyn EntityHelper>) -> &mut Self {
        let name = helper.helper_name().to_string();
        if self.default_helper.is_none() {
            self.default_helper = Some(name.clone());
        }
        if self.helpers.insert(name.clone(), helper).is_some() {
            log::warn!("Helper {} was registered twice, the last one wins", name);
        }
        self
    }

    pub fn set_default(&mut self, name: impl Into<String>) -> Result<&mut Self> {
        let name = name.into();
        self.ensure_known(&name)?;
        self.default_helper = Some(name);
        Ok(self)
    }

    /// Route `entity_name` to helper `helper_name`.
    pub fn assign(
        &mut self,
        entity_name: impl Into<String>,
        helper_name: impl Into<String>,
    ) -> Result<&mut Self> {
        let helper_name = helper_name.into();
        self.ensure_known(&helper_name)?;
        self.groups.insert(entity_name.into(), helper_name);
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn EntityHelper>> {
        self.helpers
            .get(name)
            .cloned()
            .ok_or_else(|| Error::invalid_input(format!("No helper named {name} is registered")))
    }

    /// Helper responsible for `entity_name`, the default one when not assigned.
    pub fn helper_for(&self, entity_name: &str) -> Result<Arc<dyn EntityHelper>> {
        match self.groups.get(entity_name).or(self.default_helper.as_ref()) {
            Some(name) => self.get(name),
            None => Err(Error::invalid_input(format!(
                "No helper is assigned to entity {entity_name} and there is no default helper"
            ))),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.helpers.keys().map(String::as_str)
    }

    pub fn helpers(&self) -> impl Iterator<Item = &Arc<dyn EntityHelper>> {
        self.helpers.values()
    }

    pub fn default_helper(&self) -> Option<&str> {
        self.default_helper.as_deref()
    }

    fn ensure_known(&self, name: &str) -> Result<()> {
        if self.helpers.contains_key(name) {
            Ok(())
        } else {
            Err(Error::invalid_input(format!(
                "No helper named {name} is registered"
            )))
        }
    }
}
