use crate::{
    Aggregate, EntityDef, Error, FieldDef, KeyMap, Result, Value, ViewAlias, ViewDef, ViewLink,
    ViewMember,
};
use std::{borrow::Cow, collections::BTreeMap, sync::Arc};

/// Cross-entity context handed to the port on condition based calls.
pub trait Delegator: Send + Sync {
    fn delegator_name(&self) -> &str;
    fn model_entity(&self, name: &str) -> Option<Arc<EntityDef>>;
}

/// Catalog of entity descriptors, built once at start up and passed around.
#[derive(Debug, Clone, Default)]
pub struct EntityModel {
    name: String,
    entities: BTreeMap<String, Arc<EntityDef>>,
}

impl EntityModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entities: BTreeMap::new(),
        }
    }

    /// Register a descriptor and return the shared handle.
    pub fn add(&mut self, entity: EntityDef) -> Arc<EntityDef> {
        let entity = Arc::new(entity);
        if self
            .entities
            .insert(entity.name.to_string(), entity.clone())
            .is_some()
        {
            log::warn!("Entity {} was redefined in model {}", entity.name, self.name);
        }
        entity
    }

    pub fn get(&self, name: &str) -> Result<Arc<EntityDef>> {
        self.entities.get(name).cloned().ok_or_else(|| {
            Error::invalid_input(format!("Entity {name} is not defined in model {}", self.name))
        })
    }

    pub fn entities(&self) -> &BTreeMap<String, Arc<EntityDef>> {
        &self.entities
    }

    /// Start describing a view entity over entities already in the model.
    pub fn view(&self, name: impl Into<Cow<'static, str>>) -> ViewBuilder<'_> {
        ViewBuilder {
            model: self,
            entity: EntityDef::new(name),
            view: ViewDef::default(),
        }
    }
}

impl Delegator for EntityModel {
    fn delegator_name(&self) -> &str {
        &self.name
    }

    fn model_entity(&self, name: &str) -> Option<Arc<EntityDef>> {
        self.entities.get(name).cloned()
    }
}

/// Builds a view entity, resolving alias types from the member entities.
pub struct ViewBuilder<'m> {
    model: &'m EntityModel,
    entity: EntityDef,
    view: ViewDef,
}

impl<'m> ViewBuilder<'m> {
    pub fn member(
        mut self,
        alias: impl Into<Cow<'static, str>>,
        entity_name: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.view.members.push(ViewMember {
            alias: alias.into(),
            entity_name: entity_name.into(),
        });
        self
    }

    /// Project `member_alias.field` as `name`.
    pub fn alias(
        self,
        member_alias: impl Into<Cow<'static, str>>,
        name: impl Into<Cow<'static, str>>,
        field: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.push_alias(member_alias.into(), name.into(), field.into(), false, None)
    }

    pub fn group_by(
        self,
        member_alias: impl Into<Cow<'static, str>>,
        name: impl Into<Cow<'static, str>>,
        field: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.push_alias(member_alias.into(), name.into(), field.into(), true, None)
    }

    pub fn function(
        self,
        member_alias: impl Into<Cow<'static, str>>,
        name: impl Into<Cow<'static, str>>,
        field: impl Into<Cow<'static, str>>,
        function: Aggregate,
    ) -> Self {
        self.push_alias(
            member_alias.into(),
            name.into(),
            field.into(),
            false,
            Some(function),
        )
    }

    /// Join `rel_alias` to `alias`, inner unless `optional`.
    pub fn link<I, F, R>(
        mut self,
        alias: impl Into<Cow<'static, str>>,
        rel_alias: impl Into<Cow<'static, str>>,
        optional: bool,
        key_maps: I,
    ) -> Self
    where
        I: IntoIterator<Item = (F, R)>,
        F: Into<Cow<'static, str>>,
        R: Into<Cow<'static, str>>,
    {
        self.view.links.push(ViewLink {
            alias: alias.into(),
            rel_alias: rel_alias.into(),
            optional,
            key_maps: key_maps
                .into_iter()
                .map(|(f, r)| KeyMap::new(f, r))
                .collect(),
        });
        self
    }

    fn push_alias(
        mut self,
        member_alias: Cow<'static, str>,
        name: Cow<'static, str>,
        field: Cow<'static, str>,
        group_by: bool,
        function: Option<Aggregate>,
    ) -> Self {
        self.view.aliases.push(ViewAlias {
            name,
            member_alias,
            field,
            group_by,
            function,
        });
        self
    }

    /// Validate the members and compute the view fields.
    pub fn build(mut self) -> Result<EntityDef> {
        let name = self.entity.name.clone();
        let invalid = |message: String| Error::invalid_input(format!("View {name}: {message}"));
        if self.view.members.is_empty() {
            return Err(invalid("has no member entities".into()));
        }
        let mut joined = vec![self.view.members[0].alias.clone()];
        for link in &self.view.links {
            for alias in [&link.alias, &link.rel_alias] {
                if self.view.member(alias).is_none() {
                    return Err(invalid(format!("link references unknown member `{alias}`")));
                }
            }
            if !joined.contains(&link.alias) || joined.contains(&link.rel_alias) {
                return Err(invalid(format!(
                    "link `{}` -> `{}` must start from a member already joined and bring in a new one",
                    link.alias, link.rel_alias
                )));
            }
            let entity_of = |alias: &str| {
                self.view
                    .member(alias)
                    .and_then(|m| self.model.model_entity(&m.entity_name))
            };
            let (Some(lhs), Some(rhs)) = (entity_of(&link.alias), entity_of(&link.rel_alias)) else {
                return Err(invalid(format!(
                    "link `{}` -> `{}` references an entity missing from model {}",
                    link.alias, link.rel_alias, self.model.name
                )));
            };
            if let Some(key) = link
                .key_maps
                .iter()
                .find(|k| !lhs.has_field(&k.field) || !rhs.has_field(&k.rel_field))
            {
                return Err(invalid(format!(
                    "link `{}` -> `{}` joins unknown fields {} = {}",
                    link.alias, link.rel_alias, key.field, key.rel_field
                )));
            }
            if link.key_maps.is_empty() {
                return Err(invalid(format!(
                    "link `{}` -> `{}` has no key map",
                    link.alias, link.rel_alias
                )));
            }
            joined.push(link.rel_alias.clone());
        }
        let mut fields = Vec::with_capacity(self.view.aliases.len());
        for alias in &self.view.aliases {
            let Some(member) = self.view.member(&alias.member_alias) else {
                return Err(invalid(format!(
                    "alias `{}` references unknown member `{}`",
                    alias.name, alias.member_alias
                )));
            };
            let entity = self
                .model
                .model_entity(&member.entity_name)
                .ok_or_else(|| invalid(format!("unknown member entity {}", member.entity_name)))?;
            let Some(source) = entity.get_field(&alias.field) else {
                return Err(invalid(format!(
                    "entity {} has no field `{}`",
                    entity.name, alias.field
                )));
            };
            let value = match alias.function {
                None | Some(Aggregate::Min) | Some(Aggregate::Max) => source.value.as_null(),
                Some(Aggregate::Count) | Some(Aggregate::CountDistinct) => Value::Int64(None),
                Some(Aggregate::Avg) => match &source.value {
                    Value::Decimal(_, prec, scale) => Value::Decimal(None, *prec, *scale),
                    _ => Value::Float64(None),
                },
                Some(Aggregate::Sum) => match &source.value {
                    Value::Int32(..) | Value::Int64(..) | Value::Boolean(..) => Value::Int64(None),
                    Value::Decimal(_, prec, scale) => Value::Decimal(None, *prec, *scale),
                    Value::Float64(..) => Value::Float64(None),
                    other => {
                        return Err(invalid(format!(
                            "cannot sum field `{}` of type {}",
                            alias.field,
                            other.type_name()
                        )));
                    }
                },
            };
            fields.push(FieldDef {
                name: alias.name.clone(),
                column_name: alias.name.clone(),
                value,
                nullable: true,
                ..Default::default()
            });
        }
        self.entity.fields = fields;
        self.entity.view = Some(self.view);
        Ok(self.entity)
    }
}
