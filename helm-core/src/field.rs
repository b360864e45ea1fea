use crate::{AsValue, Value};
use std::borrow::Cow;

/// Declarative description of an entity field.
#[derive(Default, Debug, Clone)]
pub struct FieldDef {
    /// Logical name used by callers and conditions.
    pub name: Cow<'static, str>,
    /// Physical column name.
    pub column_name: Cow<'static, str>,
    /// `Value` prototype describing the field type.
    pub value: Value,
    /// Nullability flag.
    pub nullable: bool,
    /// Member of the primary key.
    pub primary_key: bool,
    /// The backend generates the value when it is missing on insert (only meaningful for key fields).
    pub auto_generated: bool,
    /// Value stored when the field is not populated on insert.
    pub default: Option<Value>,
    /// Optional human-readable comment.
    pub comment: Cow<'static, str>,
}

impl FieldDef {
    /// Nullable field whose column name is derived from `name` (camelCase to snake_case).
    pub fn new(name: impl Into<Cow<'static, str>>, value: Value) -> Self {
        let name = name.into();
        Self {
            column_name: column_name_of(&name).into(),
            name,
            value,
            nullable: true,
            ..Default::default()
        }
    }

    pub fn of<T: AsValue>(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, T::as_empty_value())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn auto_generated(mut self) -> Self {
        self.auto_generated = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn column(mut self, column_name: impl Into<Cow<'static, str>>) -> Self {
        self.column_name = column_name.into();
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<Cow<'static, str>>) -> Self {
        self.comment = comment.into();
        self
    }
}

/// `productId` -> `product_id`.
pub fn column_name_of(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    for (i, c) in name.char_indices() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
