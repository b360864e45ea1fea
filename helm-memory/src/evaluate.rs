use helm_core::{Aggregate, ComparisonOp, Condition, EntityDef, JoinOp, Operand, Value};
use rust_decimal::Decimal;
use std::cmp::Ordering;

/// Evaluate `condition` with SQL three valued logic, `None` standing for unknown.
///
/// `resolve` returns the value of a field of `entity` for the record under test.
pub(crate) fn evaluate(
    entity: &EntityDef,
    condition: &Condition,
    resolve: &dyn Fn(&str) -> Value,
) -> Option<bool> {
    match condition {
        Condition::All => Some(true),
        Condition::Compare { field, op, operand } => {
            compare(entity, &resolve(field), *op, operand, field, resolve)
        }
        Condition::IsNull(field) => Some(resolve(field).is_null()),
        Condition::IsNotNull(field) => Some(!resolve(field).is_null()),
        Condition::Join { op, conditions } => {
            let mut unknown = false;
            for condition in conditions {
                match (op, evaluate(entity, condition, resolve)) {
                    (JoinOp::And, Some(false)) => return Some(false),
                    (JoinOp::Or, Some(true)) => return Some(true),
                    (_, None) => unknown = true,
                    _ => {}
                }
            }
            if unknown {
                None
            } else {
                Some(*op == JoinOp::And)
            }
        }
        Condition::Not(v) => evaluate(entity, v, resolve).map(|v| !v),
    }
}

fn compare(
    entity: &EntityDef,
    lhs: &Value,
    op: ComparisonOp,
    operand: &Operand,
    field: &str,
    resolve: &dyn Fn(&str) -> Value,
) -> Option<bool> {
    let prototype = entity
        .get_field(field)
        .map(|f| f.value.clone())
        .unwrap_or_default();
    let literal = |v: &Value| v.coerce_to(&prototype).unwrap_or_else(|| v.clone());
    match (op, operand) {
        (ComparisonOp::Equal, Operand::Value(v)) if v.is_null() => Some(lhs.is_null()),
        (ComparisonOp::NotEqual, Operand::Value(v)) if v.is_null() => Some(!lhs.is_null()),
        (ComparisonOp::In | ComparisonOp::NotIn, Operand::List(values)) => {
            let found = if values.is_empty() {
                Some(false)
            } else if lhs.is_null() {
                None
            } else {
                let mut unknown = false;
                let mut found = false;
                for v in values {
                    match lhs.compare(&literal(v)) {
                        Some(Ordering::Equal) => {
                            found = true;
                            break;
                        }
                        None => unknown = true,
                        _ => {}
                    }
                }
                if found {
                    Some(true)
                } else if unknown {
                    None
                } else {
                    Some(false)
                }
            };
            if op == ComparisonOp::In {
                found
            } else {
                found.map(|v| !v)
            }
        }
        (ComparisonOp::Between | ComparisonOp::NotBetween, Operand::List(values))
            if values.len() == 2 =>
        {
            let low = lhs.compare(&literal(&values[0])).map(|v| v != Ordering::Less);
            let high = lhs
                .compare(&literal(&values[1]))
                .map(|v| v != Ordering::Greater);
            let between = match (low, high) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            };
            if op == ComparisonOp::Between {
                between
            } else {
                between.map(|v| !v)
            }
        }
        (ComparisonOp::Like | ComparisonOp::NotLike, operand) => {
            let pattern = match operand {
                Operand::Value(v) => v.clone(),
                Operand::Field(other) => resolve(other),
                Operand::List(..) => return None,
            };
            let matched = like(&text_of(lhs)?, &text_of(&pattern)?);
            Some(if op == ComparisonOp::Like {
                matched
            } else {
                !matched
            })
        }
        (_, Operand::Value(v)) => ordering_matches(op, lhs.compare(&literal(v))?),
        (_, Operand::Field(other)) => ordering_matches(op, lhs.compare(&resolve(other))?),
        (_, Operand::List(..)) => None,
    }
}

fn ordering_matches(op: ComparisonOp, ordering: Ordering) -> Option<bool> {
    Some(match op {
        ComparisonOp::Equal => ordering == Ordering::Equal,
        ComparisonOp::NotEqual => ordering != Ordering::Equal,
        ComparisonOp::Less => ordering == Ordering::Less,
        ComparisonOp::Greater => ordering == Ordering::Greater,
        ComparisonOp::LessEqual => ordering != Ordering::Greater,
        ComparisonOp::GreaterEqual => ordering != Ordering::Less,
        _ => return None,
    })
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        v if v.is_null() => None,
        Value::Varchar(Some(v)) => Some(v.clone()),
        v => Some(v.to_string()),
    }
}

/// SQL `LIKE`: `%` matches any run of characters, `_` exactly one. Case sensitive.
pub(crate) fn like(value: &str, pattern: &str) -> bool {
    let value = value.chars().collect::<Vec<_>>();
    let pattern = pattern.chars().collect::<Vec<_>>();
    let (mut v, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while v < value.len() {
        match pattern.get(p) {
            Some('%') => {
                backtrack = Some((p, v));
                p += 1;
            }
            Some('_') => {
                v += 1;
                p += 1;
            }
            Some(c) if *c == value[v] => {
                v += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((bp, bv)) => {
                    p = bp + 1;
                    v = bv + 1;
                    backtrack = Some((bp, bv + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}

/// Fold `values` with `function`, the result has the type of `prototype`.
pub(crate) fn aggregate(function: Aggregate, values: &[Value], prototype: &Value) -> Value {
    let present = values.iter().filter(|v| !v.is_null()).collect::<Vec<_>>();
    let result = match function {
        Aggregate::Count => Value::Int64(Some(present.len() as i64)),
        Aggregate::CountDistinct => {
            let mut distinct: Vec<&Value> = Vec::with_capacity(present.len());
            for v in &present {
                if !distinct.iter().any(|d| d.total_cmp(v) == Ordering::Equal) {
                    distinct.push(v);
                }
            }
            Value::Int64(Some(distinct.len() as i64))
        }
        Aggregate::Min | Aggregate::Max => present
            .iter()
            .copied()
            .reduce(|acc, v| {
                let keep = match acc.compare(v) {
                    Some(Ordering::Greater) => function == Aggregate::Max,
                    Some(Ordering::Less) => function == Aggregate::Min,
                    _ => true,
                };
                if keep { acc } else { v }
            })
            .cloned()
            .unwrap_or_default(),
        Aggregate::Sum | Aggregate::Avg if present.is_empty() => Value::Null,
        Aggregate::Sum => match prototype {
            Value::Int64(..) => present
                .iter()
                .try_fold(0i64, |acc, v| acc.checked_add(i64::try_from(v.as_i128()?).ok()?))
                .map(|v| Value::Int64(Some(v)))
                .unwrap_or_default(),
            Value::Decimal(..) => Value::Decimal(
                present.iter().filter_map(|v| v.as_decimal()).reduce(|a, b| a + b),
                0,
                0,
            ),
            _ => Value::Float64(Some(present.iter().filter_map(|v| v.as_f64()).sum())),
        },
        Aggregate::Avg => match prototype {
            Value::Decimal(..) => Value::Decimal(
                present
                    .iter()
                    .filter_map(|v| v.as_decimal())
                    .reduce(|a, b| a + b)
                    .and_then(|v| v.checked_div(Decimal::from(present.len() as i64))),
                0,
                0,
            ),
            _ => Value::Float64(Some(
                present.iter().filter_map(|v| numeric(v)).sum::<f64>() / present.len() as f64,
            )),
        },
    };
    result.coerce_to(prototype).unwrap_or(result)
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Boolean(Some(v)) => Some(*v as u8 as f64),
        v => v.as_f64(),
    }
}
