use helm_core::{SqlWriter, Value, writer::Context};
use std::fmt::Write;

/// SQLite dialect: storage classes for column types, `X'..'` blobs, no row locks.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteSqlWriter {}

impl SqlWriter for SqliteSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn write_column_type(&self, _context: &mut Context, out: &mut String, value: &Value) {
        match value {
            Value::Boolean(..) => out.push_str("INTEGER"),
            Value::Int32(..) => out.push_str("INTEGER"),
            Value::Int64(..) => out.push_str("INTEGER"),
            Value::Float64(..) => out.push_str("REAL"),
            Value::Decimal(.., precision, scale) => {
                out.push_str("REAL");
                if (precision, scale) != (&0, &0) {
                    let _ = write!(out, "({},{})", precision, scale);
                }
            }
            Value::Varchar(..) => out.push_str("TEXT"),
            Value::Blob(..) => out.push_str("BLOB"),
            Value::Date(..) => out.push_str("TEXT"),
            Value::Time(..) => out.push_str("TEXT"),
            Value::Timestamp(..) => out.push_str("TEXT"),
            Value::Uuid(..) => out.push_str("TEXT"),
            Value::Null => log::error!("Value::Null does not describe a column type"),
        }
    }

    fn write_value_infinity(&self, _context: &mut Context, out: &mut String, negative: bool) {
        if negative {
            out.push('-');
        }
        out.push_str("1.0e+10000");
    }

    /// SQLite stores NaN as NULL anyway.
    fn write_value_nan(&self, context: &mut Context, out: &mut String) {
        self.write_value_none(context, out);
    }

    fn write_value_blob(&self, _context: &mut Context, out: &mut String, value: &[u8]) {
        out.push_str("X'");
        out.push_str(&hex::encode_upper(value));
        out.push('\'');
    }

    /// OFFSET needs a LIMIT in SQLite, -1 stands for no limit.
    fn write_limit_offset(
        &self,
        _context: &mut Context,
        out: &mut String,
        limit: Option<u32>,
        offset: Option<u32>,
    ) {
        match (limit, offset) {
            (None, None) => {}
            (limit, offset) => {
                out.push_str("\nLIMIT ");
                match limit {
                    Some(v) => drop(write!(out, "{}", v)),
                    None => out.push_str("-1"),
                }
                if let Some(offset) = offset {
                    let _ = write!(out, " OFFSET {}", offset);
                }
            }
        }
    }

    fn write_for_update(&self, _context: &mut Context, out: &mut String) {
        // Sqlite does not support row locks
        log::debug!(
            "Row locks are not supported by SQLite, FOR UPDATE is omitted from:\n{}",
            helm_core::truncate_long!(out)
        );
    }
}
