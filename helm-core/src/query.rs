use crate::{
    Aggregate, ComparisonOp, Condition, Delegator, EntityDef, EntityValue, Error, FieldDef,
    FindOptions, Operand, OrderBy, RelationDef, Result, Value,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

/// View member resolved through the delegator.
#[derive(Debug, Clone)]
pub struct ResolvedMember {
    pub alias: String,
    pub entity: Arc<EntityDef>,
}

/// Where the value of a queried field comes from.
#[derive(Debug, Clone, Copy)]
pub enum FieldSource<'q> {
    /// Column of the entity table.
    Column(&'q FieldDef),
    /// Field of a view member, possibly aggregated.
    Member {
        alias: &'q str,
        field: &'q FieldDef,
        function: Option<Aggregate>,
    },
}

/// Validated inputs of a condition based select or count.
///
/// Both backends build one of these first so a given set of inputs is either
/// rejected the same way everywhere or planned the same way everywhere.
#[derive(Debug)]
pub struct EntityQuery<'a> {
    pub entity: &'a Arc<EntityDef>,
    /// View members in declaration order, empty for plain entities.
    pub members: Vec<ResolvedMember>,
    /// Selected fields, all of them when the caller passed none.
    pub fields: Vec<&'a FieldDef>,
    /// Non aggregated selected fields of a grouped view.
    pub group_by: Vec<&'a FieldDef>,
    pub where_condition: Option<&'a Condition>,
    pub having_condition: Option<&'a Condition>,
    pub order_by: &'a [OrderBy],
    pub options: &'a FindOptions,
}

impl<'a> EntityQuery<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        delegator: &dyn Delegator,
        entity: &'a Arc<EntityDef>,
        where_condition: Option<&'a Condition>,
        having_condition: Option<&'a Condition>,
        fields: &'a [String],
        order_by: &'a [OrderBy],
        options: &'a FindOptions,
    ) -> Result<Self> {
        let grouped = entity.is_grouped();
        if having_condition.is_some() && !grouped {
            return Err(Error::invalid_query(format!(
                "Entity {} is not grouped, a having condition is not allowed",
                entity.name
            )));
        }
        if let Some(condition) = where_condition {
            validate_condition(entity, condition)?;
        }
        if let Some(condition) = having_condition {
            validate_condition(entity, condition)?;
        }
        for order in order_by {
            if !entity.has_field(&order.field) {
                return Err(Error::invalid_query(format!(
                    "Cannot order by `{}`, entity {} has no such field",
                    order.field, entity.name
                )));
            }
        }
        let fields = if fields.is_empty() {
            entity.fields.iter().collect::<Vec<_>>()
        } else {
            fields
                .iter()
                .map(|name| {
                    entity.get_field(name).ok_or_else(|| {
                        Error::invalid_query(format!(
                            "Cannot select `{}`, entity {} has no such field",
                            name, entity.name
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?
        };
        let mut members = Vec::new();
        let mut group_by = Vec::new();
        if let Some(view) = &entity.view {
            for member in &view.members {
                let resolved = delegator.model_entity(&member.entity_name).ok_or_else(|| {
                    Error::invalid_query(format!(
                        "Delegator {} cannot resolve entity {} (member `{}` of view {})",
                        delegator.delegator_name(),
                        member.entity_name,
                        member.alias,
                        entity.name
                    ))
                })?;
                members.push(ResolvedMember {
                    alias: member.alias.to_string(),
                    entity: resolved,
                });
            }
            for alias in &view.aliases {
                let member = members.iter().find(|m| m.alias == alias.member_alias);
                if !member.is_some_and(|m| m.entity.has_field(&alias.field)) {
                    return Err(Error::invalid_query(format!(
                        "View {} alias `{}` references missing field {}.{}",
                        entity.name, alias.name, alias.member_alias, alias.field
                    )));
                }
            }
            if grouped {
                group_by = fields
                    .iter()
                    .filter(|f| view.alias(&f.name).is_some_and(|a| a.function.is_none()))
                    .copied()
                    .collect();
            }
        }
        Ok(Self {
            entity,
            members,
            fields,
            group_by,
            where_condition,
            having_condition,
            order_by,
            options,
        })
    }

    pub fn is_grouped(&self) -> bool {
        self.entity.is_grouped()
    }

    pub fn member(&self, alias: &str) -> Option<&Arc<EntityDef>> {
        self.members
            .iter()
            .find(|v| v.alias == alias)
            .map(|v| &v.entity)
    }

    /// Resolve a field of the queried entity to its physical source.
    pub fn source(&self, name: &str) -> Option<FieldSource<'_>> {
        let field = self.entity.get_field(name)?;
        let Some(view) = &self.entity.view else {
            return Some(FieldSource::Column(field));
        };
        let alias = view.alias(name)?;
        let member = self.member(&alias.member_alias)?;
        Some(FieldSource::Member {
            alias: &alias.member_alias,
            field: member.get_field(&alias.field)?,
            function: alias.function,
        })
    }

    /// Whether counting the rows needs the full select wrapped in a sub-select.
    pub fn counts_over_subquery(&self) -> bool {
        self.is_grouped()
            || self.options.distinct
            || self.options.row_cap().is_some()
            || self.options.offset.is_some()
    }
}

/// Reject conditions referencing unknown fields or carrying malformed operands.
pub fn validate_condition(entity: &EntityDef, condition: &Condition) -> Result<()> {
    if let Some(field) = condition
        .field_names()
        .into_iter()
        .find(|v| !entity.has_field(v))
    {
        return Err(Error::invalid_query(format!(
            "Condition references `{}` but entity {} has no such field",
            field, entity.name
        )));
    }
    validate_operands(entity, condition)
}

fn validate_operands(entity: &EntityDef, condition: &Condition) -> Result<()> {
    match condition {
        Condition::Compare { field, op, operand } => {
            let valid = match (op, operand) {
                (ComparisonOp::In | ComparisonOp::NotIn, Operand::List(..)) => true,
                (ComparisonOp::Between | ComparisonOp::NotBetween, Operand::List(v)) => {
                    v.len() == 2
                }
                (ComparisonOp::Like | ComparisonOp::NotLike, Operand::Value(Value::Varchar(Some(..)))) => {
                    true
                }
                (ComparisonOp::Like | ComparisonOp::NotLike, Operand::Field(..)) => true,
                (
                    ComparisonOp::In
                    | ComparisonOp::NotIn
                    | ComparisonOp::Between
                    | ComparisonOp::NotBetween
                    | ComparisonOp::Like
                    | ComparisonOp::NotLike,
                    _,
                ) => false,
                (_, Operand::List(..)) => false,
                _ => true,
            };
            if !valid {
                return Err(Error::invalid_query(format!(
                    "Malformed operand for `{field} {op}`"
                )));
            }
            let literals = match (op, operand) {
                (ComparisonOp::Like | ComparisonOp::NotLike, _) => &[][..],
                (_, Operand::Value(v)) => std::slice::from_ref(v),
                (_, Operand::List(v)) => v.as_slice(),
                (_, Operand::Field(..)) => &[][..],
            };
            let prototype = entity.get_field(field).map(|f| &f.value);
            match literals
                .iter()
                .find(|v| prototype.is_some_and(|p| v.coerce_to(p).is_none()))
            {
                Some(v) => Err(Error::invalid_query(format!(
                    "Cannot compare {}.{} of type {} with {} {}",
                    entity.name,
                    field,
                    prototype.map(Value::type_name).unwrap_or_default(),
                    v.type_name(),
                    v
                ))),
                None => Ok(()),
            }
        }
        Condition::Join { conditions, .. } => conditions
            .iter()
            .try_for_each(|v| validate_operands(entity, v)),
        Condition::Not(v) => validate_operands(entity, v),
        Condition::All | Condition::IsNull(..) | Condition::IsNotNull(..) => Ok(()),
    }
}

/// Validate and coerce a bulk update map.
pub fn coerce_fields_to_set(
    entity: &EntityDef,
    fields_to_set: &BTreeMap<String, Value>,
) -> Result<BTreeMap<String, Value>> {
    if fields_to_set.is_empty() {
        return Err(Error::invalid_input(format!(
            "No fields to set on {}",
            entity.name
        )));
    }
    fields_to_set
        .iter()
        .map(|(name, value)| {
            let Some(field) = entity.get_field(name) else {
                return Err(Error::invalid_input(format!(
                    "Entity {} has no field named `{}`",
                    entity.name, name
                )));
            };
            let Some(value) = value.coerce_to(&field.value) else {
                return Err(Error::invalid_input(format!(
                    "Field {}.{} expects {} but got {}",
                    entity.name,
                    name,
                    field.value.type_name(),
                    value.type_name()
                )));
            };
            if value.is_null() && !field.nullable {
                return Err(Error::invalid_input(format!(
                    "Field {}.{} cannot be set to null",
                    entity.name, name
                )));
            }
            Ok((name.clone(), value))
        })
        .collect()
}

/// Bulk mutations only target physical entities.
pub fn ensure_writable(entity: &EntityDef) -> Result<()> {
    if entity.is_view() {
        return Err(Error::invalid_query(format!(
            "View entity {} cannot be modified",
            entity.name
        )));
    }
    Ok(())
}

/// Check a value about to be inserted and fill in the declared defaults.
///
/// Key fields must be populated unless the backend generates them, non null
/// fields must end up with a value.
pub fn prepare_create(mut value: EntityValue) -> Result<EntityValue> {
    let entity = value.entity().clone();
    ensure_writable(&entity)?;
    for field in &entity.fields {
        let populated = value.get(field.name()).is_some_and(|v| !v.is_null());
        if populated {
            continue;
        }
        if !value.contains(field.name())
            && let Some(default) = &field.default
        {
            value.set(field.name.to_string(), default.clone())?;
            continue;
        }
        if field.primary_key && field.auto_generated {
            value.remove(field.name());
            continue;
        }
        if !field.nullable {
            return Err(Error::invalid_input(format!(
                "Field {}.{} is required but {}",
                entity.name,
                field.name,
                if value.contains(field.name()) {
                    "it is null"
                } else {
                    "it is not populated"
                }
            )));
        }
    }
    Ok(value)
}

/// Fields a partial key lookup returns: the key fields plus `fields`, in
/// declaration order. Every field when `fields` is empty.
pub fn partial_fields<'a>(
    entity: &'a EntityDef,
    fields: &BTreeSet<String>,
) -> Result<Vec<&'a FieldDef>> {
    if let Some(name) = fields.iter().find(|v| !entity.has_field(v)) {
        return Err(Error::invalid_query(format!(
            "Cannot select `{}`, entity {} has no such field",
            name, entity.name
        )));
    }
    Ok(entity
        .fields
        .iter()
        .filter(|f| fields.is_empty() || f.primary_key || fields.contains(f.name()))
        .collect())
}

/// Non key fields of `value` that a primary key update would write.
pub fn update_fields(value: &EntityValue) -> Result<Vec<(&FieldDef, &Value)>> {
    let entity = value.entity();
    ensure_writable(entity)?;
    entity
        .non_primary_key_fields()
        .filter_map(|f| value.get(f.name()).map(|v| (f, v)))
        .map(|(f, v)| {
            if v.is_null() && !f.nullable {
                Err(Error::invalid_input(format!(
                    "Field {}.{} cannot be set to null",
                    entity.name, f.name
                )))
            } else {
                Ok((f, v))
            }
        })
        .collect()
}

/// Check the inputs of a two hop relation traversal.
pub fn validate_multi_relation(
    value: &EntityValue,
    relation_one: &RelationDef,
    entity_one: &EntityDef,
    relation_two: &RelationDef,
    entity_two: &EntityDef,
    order_by: &[OrderBy],
) -> Result<()> {
    let hops = [
        (value.entity().as_ref(), relation_one, entity_one),
        (entity_one, relation_two, entity_two),
    ];
    for (from, relation, to) in hops {
        if relation.rel_entity_name != to.name {
            return Err(Error::invalid_query(format!(
                "Relation {} leads to {} not to {}",
                relation.name(),
                relation.rel_entity_name,
                to.name
            )));
        }
        if relation.key_maps.is_empty() {
            return Err(Error::invalid_query(format!(
                "Relation {} from {} has no key map",
                relation.name(),
                from.name
            )));
        }
        if let Some(key) = relation
            .key_maps
            .iter()
            .find(|k| !from.has_field(&k.field) || !to.has_field(&k.rel_field))
        {
            return Err(Error::invalid_query(format!(
                "Relation {} maps {}.{} to {}.{} but one of them does not exist",
                relation.name(),
                from.name,
                key.field,
                to.name,
                key.rel_field
            )));
        }
    }
    if let Some(order) = order_by.iter().find(|v| !entity_two.has_field(&v.field)) {
        return Err(Error::invalid_query(format!(
            "Cannot order by `{}`, entity {} has no such field",
            order.field, entity_two.name
        )));
    }
    Ok(())
}
