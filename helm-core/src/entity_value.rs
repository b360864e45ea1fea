use crate::{AsValue, EntityDef, Error, Result, Value};
use std::{
    collections::{BTreeMap, btree_map},
    fmt::{self, Display, Formatter},
    ops::Deref,
    sync::Arc,
};

/// Field values of one record, tagged with the entity they conform to.
///
/// A field missing from the map is "not populated", a field mapped to a typed
/// null is "populated with null". Values are coerced to the field type on
/// insertion so backends can rely on the variants.
#[derive(Debug, Clone)]
pub struct EntityValue {
    entity: Arc<EntityDef>,
    fields: BTreeMap<String, Value>,
}

impl EntityValue {
    pub fn new(entity: Arc<EntityDef>) -> Self {
        Self {
            entity,
            fields: BTreeMap::new(),
        }
    }

    /// Build a value from `(field, value)` pairs.
    pub fn with<I, K, V>(entity: &Arc<EntityDef>, fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut result = Self::new(entity.clone());
        for (k, v) in fields {
            result.set(k, v)?;
        }
        Ok(result)
    }

    pub fn entity(&self) -> &Arc<EntityDef> {
        &self.entity
    }

    pub fn entity_name(&self) -> &str {
        self.entity.name()
    }

    /// Set a field, coercing the value to the field type.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Result<&mut Self> {
        let field = field.into();
        let value = value.into();
        let Some(def) = self.entity.get_field(&field) else {
            return Err(Error::invalid_input(format!(
                "Entity {} has no field named `{}`",
                self.entity.name, field
            )));
        };
        let Some(value) = value.coerce_to(&def.value) else {
            return Err(Error::invalid_input(format!(
                "Field {}.{} expects {} but got {} value {}",
                self.entity.name,
                field,
                def.value.type_name(),
                value.type_name(),
                value
            )));
        };
        self.fields.insert(field, value);
        Ok(self)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_as<T: AsValue>(&self, field: &str) -> Result<Option<T>> {
        match self.fields.get(field) {
            Some(v) => Option::<T>::try_from_value(v.clone()),
            None => Ok(None),
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.fields.iter()
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// True when every key field is populated with a non-null value.
    pub fn has_primary_key(&self) -> bool {
        self.entity
            .primary_key_fields()
            .all(|f| self.fields.get(f.name()).is_some_and(|v| !v.is_null()))
    }

    /// Extract the key fields.
    pub fn primary_key(&self) -> Result<PrimaryKey> {
        let mut key = EntityValue::new(self.entity.clone());
        for field in self.entity.primary_key_fields() {
            if let Some(v) = self.fields.get(field.name()) {
                key.fields.insert(field.name.to_string(), v.clone());
            }
        }
        PrimaryKey::try_from(key)
    }

    /// Copy of this value restricted to `fields` plus the key fields.
    pub fn restricted<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> Self {
        let mut wanted: Vec<&str> = fields.into_iter().collect();
        wanted.extend(self.entity.primary_key_fields().map(|v| v.name.as_ref()));
        Self {
            entity: self.entity.clone(),
            fields: self
                .fields
                .iter()
                .filter(|(k, _)| wanted.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Insert without coercion, used by backends decoding already typed values.
    pub fn insert_unchecked(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }
}

impl PartialEq for EntityValue {
    fn eq(&self, other: &Self) -> bool {
        self.entity.name == other.entity.name && self.fields == other.fields
    }
}

impl Display for EntityValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.entity.name)?;
        for (i, (k, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}: {v}")?;
        }
        f.write_str("}")
    }
}

impl<'a> IntoIterator for &'a EntityValue {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;
    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Entity value holding exactly the primary key fields, all non-null.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryKey(EntityValue);

impl PrimaryKey {
    pub fn new<I, K, V>(entity: &Arc<EntityDef>, fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        EntityValue::with(entity, fields)?.try_into()
    }

    pub fn into_inner(self) -> EntityValue {
        self.0
    }
}

impl TryFrom<EntityValue> for PrimaryKey {
    type Error = Error;
    fn try_from(value: EntityValue) -> Result<Self> {
        let entity = value.entity();
        if entity.is_view() {
            return Err(Error::invalid_input(format!(
                "View entity {} has no primary key",
                entity.name
            )));
        }
        if entity.primary_key_len() == 0 {
            return Err(Error::invalid_input(format!(
                "Entity {} does not declare a primary key",
                entity.name
            )));
        }
        for field in entity.primary_key_fields() {
            if value.get(field.name()).is_none_or(Value::is_null) {
                return Err(Error::invalid_input(format!(
                    "Primary key of {} is missing field `{}`",
                    entity.name, field.name
                )));
            }
        }
        if let Some((name, _)) = value
            .iter()
            .find(|(k, _)| !entity.get_field(k).is_some_and(|f| f.primary_key))
        {
            return Err(Error::invalid_input(format!(
                "Field `{}` is not part of the primary key of {}",
                name, entity.name
            )));
        }
        Ok(PrimaryKey(value))
    }
}

impl Deref for PrimaryKey {
    type Target = EntityValue;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for PrimaryKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
