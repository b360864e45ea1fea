use crate::Value;
use std::{
    collections::BTreeSet,
    fmt::{self, Display, Formatter},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Like,
    NotLike,
    In,
    NotIn,
    Between,
    NotBetween,
}

impl Display for ComparisonOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ComparisonOp::Equal => "=",
            ComparisonOp::NotEqual => "<>",
            ComparisonOp::Less => "<",
            ComparisonOp::Greater => ">",
            ComparisonOp::LessEqual => "<=",
            ComparisonOp::GreaterEqual => ">=",
            ComparisonOp::Like => "LIKE",
            ComparisonOp::NotLike => "NOT LIKE",
            ComparisonOp::In => "IN",
            ComparisonOp::NotIn => "NOT IN",
            ComparisonOp::Between => "BETWEEN",
            ComparisonOp::NotBetween => "NOT BETWEEN",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOp {
    And,
    Or,
}

/// Right hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Value),
    /// Used by `In`, `NotIn`, `Between` (exactly two items) and `NotBetween`.
    List(Vec<Value>),
    /// Another field of the same entity.
    Field(String),
}

/// Predicate tree evaluated against the fields of an entity.
///
/// Backends either translate it (SQL) or evaluate it (memory); the port
/// forwards it untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Matches every record. Must be passed explicitly to bulk operations.
    All,
    Compare {
        field: String,
        op: ComparisonOp,
        operand: Operand,
    },
    IsNull(String),
    IsNotNull(String),
    Join {
        op: JoinOp,
        conditions: Vec<Condition>,
    },
    Not(Box<Condition>),
}

impl Condition {
    pub fn compare(field: impl Into<String>, op: ComparisonOp, value: impl Into<Value>) -> Self {
        Condition::Compare {
            field: field.into(),
            op,
            operand: Operand::Value(value.into()),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, ComparisonOp::Equal, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, ComparisonOp::NotEqual, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, ComparisonOp::Less, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, ComparisonOp::Greater, value)
    }

    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, ComparisonOp::LessEqual, value)
    }

    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, ComparisonOp::GreaterEqual, value)
    }

    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::compare(field, ComparisonOp::Like, Value::Varchar(Some(pattern.into())))
    }

    pub fn in_list<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Condition::Compare {
            field: field.into(),
            op: ComparisonOp::In,
            operand: Operand::List(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn between(
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        Condition::Compare {
            field: field.into(),
            op: ComparisonOp::Between,
            operand: Operand::List(vec![low.into(), high.into()]),
        }
    }

    /// Compare two fields of the same record.
    pub fn fields(field: impl Into<String>, op: ComparisonOp, other: impl Into<String>) -> Self {
        Condition::Compare {
            field: field.into(),
            op,
            operand: Operand::Field(other.into()),
        }
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Condition::IsNull(field.into())
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Condition::IsNotNull(field.into())
    }

    pub fn and(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Condition::Join {
            op: JoinOp::And,
            conditions: conditions.into_iter().collect(),
        }
    }

    pub fn or(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Condition::Join {
            op: JoinOp::Or,
            conditions: conditions.into_iter().collect(),
        }
    }

    pub fn not(condition: Condition) -> Self {
        Condition::Not(Box::new(condition))
    }

    /// Conjunction of equalities, one per entry.
    pub fn field_map<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::and(fields.into_iter().map(|(k, v)| Self::eq(k, v)))
    }

    /// Every field name the tree references.
    pub fn field_names(&self) -> BTreeSet<&str> {
        let mut result = BTreeSet::new();
        self.collect_field_names(&mut result);
        result
    }

    fn collect_field_names<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Condition::All => {}
            Condition::Compare { field, operand, .. } => {
                out.insert(field);
                if let Operand::Field(other) = operand {
                    out.insert(other);
                }
            }
            Condition::IsNull(field) | Condition::IsNotNull(field) => {
                out.insert(field);
            }
            Condition::Join { conditions, .. } => {
                conditions.iter().for_each(|v| v.collect_field_names(out))
            }
            Condition::Not(v) => v.collect_field_names(out),
        }
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Condition::All => f.write_str("true"),
            Condition::Compare { field, op, operand } => {
                write!(f, "{field} {op} ")?;
                match operand {
                    Operand::Value(v) => write!(f, "{v}"),
                    Operand::Field(v) => f.write_str(v),
                    Operand::List(values) => {
                        f.write_str("(")?;
                        for (i, v) in values.iter().enumerate() {
                            if i > 0 {
                                f.write_str(", ")?;
                            }
                            write!(f, "{v}")?;
                        }
                        f.write_str(")")
                    }
                }
            }
            Condition::IsNull(field) => write!(f, "{field} IS NULL"),
            Condition::IsNotNull(field) => write!(f, "{field} IS NOT NULL"),
            Condition::Join { op, conditions } => {
                f.write_str("(")?;
                for (i, v) in conditions.iter().enumerate() {
                    if i > 0 {
                        f.write_str(match op {
                            JoinOp::And => " AND ",
                            JoinOp::Or => " OR ",
                        })?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str(")")
            }
            Condition::Not(v) => write!(f, "NOT {v}"),
        }
    }
}
