use crate::{Error, Result};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Backend default, ascending.
    #[default]
    Default,
    ASC,
    DESC,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nulls {
    First,
    Last,
}

/// One `ORDER BY` entry.
///
/// Parsed from `"field"`, `"field ASC"`, `"field DESC"`, `"-field"` or
/// `"+field"`, optionally followed by `NULLS FIRST` / `NULLS LAST`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub order: Order,
    pub nulls: Option<Nulls>,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: Order::ASC,
            nulls: None,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: Order::DESC,
            nulls: None,
        }
    }

    pub fn is_descending(&self) -> bool {
        self.order == Order::DESC
    }

    /// Parse a list of textual entries.
    pub fn parse_list<S: AsRef<str>>(values: impl IntoIterator<Item = S>) -> Result<Vec<OrderBy>> {
        values.into_iter().map(|v| v.as_ref().parse()).collect()
    }
}

impl FromStr for OrderBy {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let invalid = || Error::invalid_query(format!("Invalid order by entry `{value}`"));
        let mut words = value.split_whitespace();
        let Some(mut field) = words.next() else {
            return Err(invalid());
        };
        let mut order = Order::Default;
        if let Some(rest) = field.strip_prefix('-') {
            order = Order::DESC;
            field = rest;
        } else if let Some(rest) = field.strip_prefix('+') {
            order = Order::ASC;
            field = rest;
        }
        if field.is_empty() {
            return Err(invalid());
        }
        let mut nulls = None;
        let mut next = words.next();
        if let Some(word) = next {
            if word.eq_ignore_ascii_case("ASC") {
                order = Order::ASC;
                next = words.next();
            } else if word.eq_ignore_ascii_case("DESC") {
                order = Order::DESC;
                next = words.next();
            }
        }
        if let Some(word) = next {
            if !word.eq_ignore_ascii_case("NULLS") {
                return Err(invalid());
            }
            nulls = match words.next() {
                Some(v) if v.eq_ignore_ascii_case("FIRST") => Some(Nulls::First),
                Some(v) if v.eq_ignore_ascii_case("LAST") => Some(Nulls::Last),
                _ => return Err(invalid()),
            };
        }
        if words.next().is_some() {
            return Err(invalid());
        }
        Ok(OrderBy {
            field: field.to_string(),
            order,
            nulls,
        })
    }
}

impl Display for OrderBy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.field)?;
        match self.order {
            Order::Default => {}
            Order::ASC => f.write_str(" ASC")?,
            Order::DESC => f.write_str(" DESC")?,
        }
        match self.nulls {
            Some(Nulls::First) => f.write_str(" NULLS FIRST"),
            Some(Nulls::Last) => f.write_str(" NULLS LAST"),
            None => Ok(()),
        }
    }
}
