use crate::{DATE_FORMAT, TIME_FORMAT, TIMESTAMP_FORMAT};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use std::{
    cmp::Ordering,
    fmt::{self, Display, Formatter},
};
use time::{Date, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Dynamically typed field value.
///
/// Every variant wraps an `Option` so the same enum describes both a concrete
/// value and the type of a field (`Value::Varchar(None)` is the prototype of a
/// text field and also a typed null).
#[derive(Default, Debug, Clone)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    Float64(Option<f64>),
    Decimal(Option<Decimal>, /* prec: */ u8, /* scale: */ u8),
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
    Date(Option<Date>),
    Time(Option<Time>),
    Timestamp(Option<PrimitiveDateTime>),
    Uuid(Option<Uuid>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Int32(l), Self::Int32(r)) => l == r,
            (Self::Int64(l), Self::Int64(r)) => l == r,
            (Self::Float64(l), Self::Float64(r)) => l == r,
            (Self::Decimal(l, ..), Self::Decimal(r, ..)) => l == r,
            (Self::Varchar(l), Self::Varchar(r)) => l == r,
            (Self::Blob(l), Self::Blob(r)) => l == r,
            (Self::Date(l), Self::Date(r)) => l == r,
            (Self::Time(l), Self::Time(r)) => l == r,
            (Self::Timestamp(l), Self::Timestamp(r)) => l == r,
            (Self::Uuid(l), Self::Uuid(r)) => l == r,
            _ => self.is_null() && other.is_null(),
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Boolean(v) => v.is_none(),
            Value::Int32(v) => v.is_none(),
            Value::Int64(v) => v.is_none(),
            Value::Float64(v) => v.is_none(),
            Value::Decimal(v, ..) => v.is_none(),
            Value::Varchar(v) => v.is_none(),
            Value::Blob(v) => v.is_none(),
            Value::Date(v) => v.is_none(),
            Value::Time(v) => v.is_none(),
            Value::Timestamp(v) => v.is_none(),
            Value::Uuid(v) => v.is_none(),
        }
    }

    pub fn same_type(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Decimal(.., l_prec, l_scale), Self::Decimal(.., r_prec, r_scale)) => {
                l_prec == r_prec && l_scale == r_scale
            }
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }

    /// The typed null of the same variant.
    pub fn as_null(&self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Boolean(..) => Value::Boolean(None),
            Value::Int32(..) => Value::Int32(None),
            Value::Int64(..) => Value::Int64(None),
            Value::Float64(..) => Value::Float64(None),
            Value::Decimal(_, prec, scale) => Value::Decimal(None, *prec, *scale),
            Value::Varchar(..) => Value::Varchar(None),
            Value::Blob(..) => Value::Blob(None),
            Value::Date(..) => Value::Date(None),
            Value::Time(..) => Value::Time(None),
            Value::Timestamp(..) => Value::Timestamp(None),
            Value::Uuid(..) => Value::Uuid(None),
        }
    }

    /// Name of the logical type, used in schema reports and error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Boolean(..) => "BOOLEAN",
            Value::Int32(..) => "INTEGER",
            Value::Int64(..) => "BIGINT",
            Value::Float64(..) => "DOUBLE",
            Value::Decimal(..) => "DECIMAL",
            Value::Varchar(..) => "VARCHAR",
            Value::Blob(..) => "BLOB",
            Value::Date(..) => "DATE",
            Value::Time(..) => "TIME",
            Value::Timestamp(..) => "TIMESTAMP",
            Value::Uuid(..) => "UUID",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Int32(..) | Value::Int64(..) | Value::Float64(..) | Value::Decimal(..)
        )
    }

    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Boolean(Some(v)) => Some(*v as i128),
            Value::Int32(Some(v)) => Some(*v as i128),
            Value::Int64(Some(v)) => Some(*v as i128),
            Value::Float64(Some(v)) if v.fract() == 0.0 => Some(*v as i128),
            Value::Decimal(Some(v), ..) if v.fract().is_zero() => v.to_i128(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(Some(v)) => Some(*v as f64),
            Value::Int64(Some(v)) => Some(*v as f64),
            Value::Float64(Some(v)) => Some(*v),
            Value::Decimal(Some(v), ..) => v.to_f64(),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Int32(Some(v)) => Some(Decimal::from(*v)),
            Value::Int64(Some(v)) => Some(Decimal::from(*v)),
            Value::Float64(Some(v)) => Decimal::try_from(*v).ok(),
            Value::Decimal(Some(v), ..) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Varchar(Some(v)) => Some(v),
            _ => None,
        }
    }

    /// Convert to the type described by `prototype`.
    ///
    /// Null becomes the typed null of the prototype. Numbers convert when no
    /// information is lost, text parses into numbers, uuid, date, time,
    /// timestamp and (hex digits) blob. Returns `None` when the value cannot represent the prototype.
    pub fn coerce_to(&self, prototype: &Value) -> Option<Value> {
        if self.is_null() {
            return Some(prototype.as_null());
        }
        if let Value::Null = prototype {
            return Some(self.clone());
        }
        if core::mem::discriminant(self) == core::mem::discriminant(prototype) {
            return Some(match (self, prototype) {
                (Value::Decimal(Some(v), ..), Value::Decimal(_, prec, scale)) => {
                    Value::Decimal(Some(*v), *prec, *scale)
                }
                _ => self.clone(),
            });
        }
        let result = match prototype {
            Value::Boolean(..) => match self {
                Value::Int32(..) | Value::Int64(..) => {
                    Value::Boolean(Some(self.as_i128()? != 0))
                }
                Value::Varchar(Some(v)) => match v.as_str() {
                    "true" | "TRUE" | "Y" | "1" => Value::Boolean(Some(true)),
                    "false" | "FALSE" | "N" | "0" => Value::Boolean(Some(false)),
                    _ => return None,
                },
                _ => return None,
            },
            Value::Int32(..) => Value::Int32(Some(match self {
                Value::Varchar(Some(v)) => v.trim().parse().ok()?,
                _ => i32::try_from(self.as_i128()?).ok()?,
            })),
            Value::Int64(..) => Value::Int64(Some(match self {
                Value::Varchar(Some(v)) => v.trim().parse().ok()?,
                _ => i64::try_from(self.as_i128()?).ok()?,
            })),
            Value::Float64(..) => Value::Float64(Some(match self {
                Value::Varchar(Some(v)) => v.parse().ok()?,
                _ => self.as_f64()?,
            })),
            Value::Decimal(_, prec, scale) => {
                let value = match self {
                    Value::Varchar(Some(v)) => v.parse::<Decimal>().ok()?,
                    _ => self.as_decimal()?,
                };
                let value = if *scale > 0 {
                    value.round_dp(*scale as u32)
                } else {
                    value
                };
                Value::Decimal(Some(value), *prec, *scale)
            }
            Value::Varchar(..) => match self {
                Value::Uuid(Some(v)) => Value::Varchar(Some(v.to_string())),
                _ => return None,
            },
            Value::Blob(..) => match self {
                Value::Varchar(Some(v)) => {
                    let digits = v.strip_prefix("\\x").unwrap_or(v);
                    Value::Blob(Some(hex::decode(digits).ok()?.into()))
                }
                Value::Uuid(Some(v)) => Value::Blob(Some(v.as_bytes().as_slice().into())),
                _ => return None,
            },
            Value::Uuid(..) => match self {
                Value::Varchar(Some(v)) => Value::Uuid(Some(Uuid::parse_str(v).ok()?)),
                Value::Blob(Some(v)) => Value::Uuid(Some(Uuid::from_slice(v).ok()?)),
                _ => return None,
            },
            Value::Date(..) => {
                Value::Date(Some(Date::parse(self.as_str()?, DATE_FORMAT).ok()?))
            }
            Value::Time(..) => {
                Value::Time(Some(Time::parse(self.as_str()?, TIME_FORMAT).ok()?))
            }
            Value::Timestamp(..) => Value::Timestamp(Some(
                PrimitiveDateTime::parse(self.as_str()?, TIMESTAMP_FORMAT).ok()?,
            )),
            _ => return None,
        };
        Some(result)
    }

    /// SQL style comparison: `None` when either side is null or the types are unrelated.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        if self.is_null() || other.is_null() {
            return None;
        }
        if self.is_numeric() && other.is_numeric() {
            return match (self, other) {
                (Value::Int32(..) | Value::Int64(..), Value::Int32(..) | Value::Int64(..)) => {
                    Some(self.as_i128()?.cmp(&other.as_i128()?))
                }
                (Value::Float64(..), _) | (_, Value::Float64(..)) => {
                    self.as_f64()?.partial_cmp(&other.as_f64()?)
                }
                _ => Some(self.as_decimal()?.cmp(&other.as_decimal()?)),
            };
        }
        match (self, other) {
            (Value::Boolean(Some(l)), Value::Boolean(Some(r))) => Some(l.cmp(r)),
            (Value::Varchar(Some(l)), Value::Varchar(Some(r))) => Some(l.cmp(r)),
            (Value::Blob(Some(l)), Value::Blob(Some(r))) => Some(l.cmp(r)),
            (Value::Date(Some(l)), Value::Date(Some(r))) => Some(l.cmp(r)),
            (Value::Time(Some(l)), Value::Time(Some(r))) => Some(l.cmp(r)),
            (Value::Timestamp(Some(l)), Value::Timestamp(Some(r))) => Some(l.cmp(r)),
            (Value::Uuid(Some(l)), Value::Uuid(Some(r))) => Some(l.cmp(r)),
            (Value::Varchar(..), _) => self.coerce_to(other)?.compare(other),
            (_, Value::Varchar(..)) => self.compare(&other.coerce_to(self)?),
            (Value::Boolean(..), _) | (_, Value::Boolean(..)) => {
                self.as_i128()?.partial_cmp(&other.as_i128()?)
            }
            _ => None,
        }
    }

    /// Total order used to key rows, nulls first then grouped by variant.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        if let Some(ordering) = self.compare(other) {
            return ordering;
        }
        match (self, other) {
            (Value::Float64(Some(l)), Value::Float64(Some(r))) => l.total_cmp(r),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(..) => 1,
            Value::Int32(..) => 2,
            Value::Int64(..) => 3,
            Value::Float64(..) => 4,
            Value::Decimal(..) => 5,
            Value::Varchar(..) => 6,
            Value::Blob(..) => 7,
            Value::Date(..) => 8,
            Value::Time(..) => 9,
            Value::Timestamp(..) => 10,
            Value::Uuid(..) => 11,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            v if v.is_null() => f.write_str("null"),
            Value::Boolean(Some(v)) => write!(f, "{v}"),
            Value::Int32(Some(v)) => write!(f, "{v}"),
            Value::Int64(Some(v)) => write!(f, "{v}"),
            Value::Float64(Some(v)) => write!(f, "{v}"),
            Value::Decimal(Some(v), ..) => write!(f, "{v}"),
            Value::Varchar(Some(v)) => write!(f, "{v:?}"),
            Value::Blob(Some(v)) => write!(f, "<{} bytes>", v.len()),
            Value::Date(Some(v)) => match v.format(DATE_FORMAT) {
                Ok(v) => f.write_str(&v),
                Err(..) => Err(fmt::Error),
            },
            Value::Time(Some(v)) => match v.format(TIME_FORMAT) {
                Ok(v) => f.write_str(&v),
                Err(..) => Err(fmt::Error),
            },
            Value::Timestamp(Some(v)) => match v.format(TIMESTAMP_FORMAT) {
                Ok(v) => f.write_str(&v),
                Err(..) => Err(fmt::Error),
            },
            Value::Uuid(Some(v)) => write!(f, "{v}"),
            _ => f.write_str("null"),
        }
    }
}
