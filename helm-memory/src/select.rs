use crate::{
    evaluate::{aggregate, evaluate},
    table::{Row, RowKey, Table},
};
use helm_core::{
    EntityDef, EntityQuery, EntityValue, Error, FieldSource, Nulls, Order, OrderBy, Result, Value,
};
use std::{cmp::Ordering, collections::BTreeMap};

pub(crate) type Tables = BTreeMap<String, Table>;

pub(crate) fn table_key(entity: &EntityDef) -> String {
    entity.table.to_ascii_lowercase()
}

/// Table backing `entity`, checked to have every column the entity declares.
pub(crate) fn table_for<'t>(tables: &'t Tables, entity: &EntityDef) -> Result<&'t Table> {
    let Some(table) = tables.get(&table_key(entity)) else {
        let error = Error::msg(format!(
            "Table \"{}\" of entity {} does not exist",
            entity.table, entity.name
        ));
        log::error!("{}", error);
        return Err(error);
    };
    table.check(entity)?;
    Ok(table)
}

pub(crate) fn table_for_mut<'t>(tables: &'t mut Tables, entity: &EntityDef) -> Result<&'t mut Table> {
    let Some(table) = tables.get_mut(&table_key(entity)) else {
        let error = Error::msg(format!(
            "Table \"{}\" of entity {} does not exist",
            entity.table, entity.name
        ));
        log::error!("{}", error);
        return Err(error);
    };
    table.check(entity)?;
    Ok(table)
}

/// Value of field `name` of `entity` in `row`, null when the row is missing.
pub(crate) fn field_value(entity: &EntityDef, row: Option<&Row>, name: &str) -> Value {
    let Some(field) = entity.get_field(name) else {
        return Value::Null;
    };
    let value = row
        .and_then(|r| r.get(field.column_name()))
        .cloned()
        .unwrap_or_default();
    value.coerce_to(&field.value).unwrap_or(value)
}

/// Rows of a plain entity matching the where condition.
pub(crate) fn matching_keys(table: &Table, query: &EntityQuery) -> Result<Vec<RowKey>> {
    let mut result = Vec::new();
    for (key, row) in &table.rows {
        let value = table.decode(query.entity, row)?;
        if matches(query, &value) {
            result.push(key.clone());
        }
    }
    Ok(result)
}

fn matches(query: &EntityQuery, value: &EntityValue) -> bool {
    query.where_condition.is_none_or(|condition| {
        evaluate(query.entity, condition, &|name| {
            value.get(name).cloned().unwrap_or_default()
        }) == Some(true)
    })
}

/// Rows the query produces, in the order a cursor hands them out.
pub(crate) fn select(tables: &Tables, query: &EntityQuery) -> Result<Vec<EntityValue>> {
    let records = if query.entity.is_view() {
        select_view(tables, query)?
    } else {
        let table = table_for(tables, query.entity)?;
        let mut records = Vec::new();
        for row in table.rows.values() {
            let value = table.decode(query.entity, row)?;
            if matches(query, &value) {
                records.push(value);
            }
        }
        records
    };
    Ok(finish(records, query))
}

type Tuple<'t> = Vec<Option<&'t Row>>;

fn select_view(tables: &Tables, query: &EntityQuery) -> Result<Vec<EntityValue>> {
    let tuples = join(tables, query)?;
    let raw = |tuple: &Tuple, name: &str| -> Value {
        let prototype = query.entity.get_field(name).map(|f| &f.value);
        match query.source(name) {
            Some(FieldSource::Member { alias, field, .. }) => {
                let index = query.members.iter().position(|m| m.alias == alias);
                let (Some(index), Some(member)) = (index, query.member(alias)) else {
                    return Value::Null;
                };
                let value = field_value(member, tuple[index], &field.name);
                match prototype {
                    Some(p) if !query.is_grouped() => value.coerce_to(p).unwrap_or(value),
                    _ => value,
                }
            }
            _ => Value::Null,
        }
    };
    let tuples = tuples
        .into_iter()
        .filter(|tuple| {
            query.where_condition.is_none_or(|condition| {
                evaluate(query.entity, condition, &|name| raw(tuple, name)) == Some(true)
            })
        })
        .collect::<Vec<_>>();
    if !query.is_grouped() {
        return Ok(tuples
            .iter()
            .map(|tuple| {
                let mut value = EntityValue::new(query.entity.clone());
                for field in &query.entity.fields {
                    value.insert_unchecked(field.name.to_string(), raw(tuple, &field.name));
                }
                value
            })
            .collect());
    }
    let mut groups: BTreeMap<RowKey, Vec<&Tuple>> = BTreeMap::new();
    if query.group_by.is_empty() {
        groups.insert(RowKey(Vec::new()), tuples.iter().collect());
    } else {
        for tuple in &tuples {
            let key = RowKey(query.group_by.iter().map(|f| raw(tuple, &f.name)).collect());
            groups.entry(key).or_default().push(tuple);
        }
    }
    let view = query.entity.view.as_ref();
    let mut records = Vec::with_capacity(groups.len());
    for group in groups.values() {
        let mut value = EntityValue::new(query.entity.clone());
        for field in &query.entity.fields {
            let function = view.and_then(|v| v.alias(&field.name)).and_then(|a| a.function);
            let result = match function {
                Some(function) => aggregate(
                    function,
                    &group.iter().map(|t| raw(t, &field.name)).collect::<Vec<_>>(),
                    &field.value,
                ),
                None => group
                    .first()
                    .map(|t| raw(t, &field.name))
                    .unwrap_or_default(),
            };
            let result = result.coerce_to(&field.value).unwrap_or(result);
            value.insert_unchecked(field.name.to_string(), result);
        }
        let keep = query.having_condition.is_none_or(|condition| {
            evaluate(query.entity, condition, &|name| {
                value.get(name).cloned().unwrap_or_default()
            }) == Some(true)
        });
        if keep {
            records.push(value);
        }
    }
    Ok(records)
}

/// Members joined following the view links, then cross joined with the unlinked ones.
fn join<'t>(tables: &'t Tables, query: &EntityQuery) -> Result<Vec<Tuple<'t>>> {
    let Some(view) = &query.entity.view else {
        return Ok(Vec::new());
    };
    let members = &query.members;
    let Some(first) = members.first() else {
        return Ok(Vec::new());
    };
    let position = |alias: &str| members.iter().position(|m| m.alias == alias);
    let mut tuples: Vec<Tuple<'t>> = table_for(tables, &first.entity)?
        .rows
        .values()
        .map(|row| {
            let mut tuple = vec![None; members.len()];
            tuple[0] = Some(row);
            tuple
        })
        .collect();
    let mut joined = vec![0];
    for link in &view.links {
        let (Some(lhs), Some(rhs)) = (position(&link.alias), position(&link.rel_alias)) else {
            continue;
        };
        let table = table_for(tables, &members[rhs].entity)?;
        let mut next = Vec::with_capacity(tuples.len());
        for tuple in tuples {
            let mut matched = false;
            for row in table.rows.values() {
                let linked = link.key_maps.iter().all(|key| {
                    let left = field_value(&members[lhs].entity, tuple[lhs], &key.field);
                    let right = field_value(&members[rhs].entity, Some(row), &key.rel_field);
                    left.compare(&right) == Some(Ordering::Equal)
                });
                if linked {
                    let mut tuple = tuple.clone();
                    tuple[rhs] = Some(row);
                    next.push(tuple);
                    matched = true;
                }
            }
            if !matched && link.optional {
                next.push(tuple);
            }
        }
        tuples = next;
        joined.push(rhs);
    }
    for (index, member) in members.iter().enumerate() {
        if joined.contains(&index) {
            continue;
        }
        let table = table_for(tables, &member.entity)?;
        tuples = tuples
            .into_iter()
            .flat_map(|tuple| {
                table.rows.values().map(move |row| {
                    let mut tuple = tuple.clone();
                    tuple[index] = Some(row);
                    tuple
                })
            })
            .collect();
    }
    Ok(tuples)
}

/// Order, project, deduplicate and page the records.
fn finish(mut records: Vec<EntityValue>, query: &EntityQuery) -> Vec<EntityValue> {
    if !query.order_by.is_empty() {
        records.sort_by(|l, r| compare_records(l, r, query.order_by));
    }
    let mut result: Vec<EntityValue> = Vec::with_capacity(records.len());
    for record in records {
        let mut projected = EntityValue::new(query.entity.clone());
        for field in &query.fields {
            projected.insert_unchecked(
                field.name.to_string(),
                record.get(field.name()).cloned().unwrap_or_default(),
            );
        }
        if query.options.distinct && result.iter().any(|v| *v == projected) {
            continue;
        }
        result.push(projected);
    }
    let offset = query.options.offset.unwrap_or(0) as usize;
    let cap = query.options.row_cap().map_or(usize::MAX, |v| v as usize);
    result.into_iter().skip(offset).take(cap).collect()
}

/// Ordering the way SQLite sorts: nulls first ascending, last descending, unless stated.
pub(crate) fn compare_records(l: &EntityValue, r: &EntityValue, order_by: &[OrderBy]) -> Ordering {
    for order in order_by {
        let (lv, rv) = (
            l.get(&order.field).cloned().unwrap_or_default(),
            r.get(&order.field).cloned().unwrap_or_default(),
        );
        let descending = order.order == Order::DESC;
        let ordering = match (lv.is_null(), rv.is_null(), order.nulls) {
            (true, true, _) => Ordering::Equal,
            (true, false, Some(Nulls::First)) | (false, true, Some(Nulls::Last)) => Ordering::Less,
            (true, false, Some(Nulls::Last)) | (false, true, Some(Nulls::First)) => {
                Ordering::Greater
            }
            _ => {
                let ordering = lv.total_cmp(&rv);
                if descending { ordering.reverse() } else { ordering }
            }
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

