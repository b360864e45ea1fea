use helm_core::{EntityDef, EntityValue, Error, FieldDef, Result, Value, truncate_long};
use rusqlite::{ErrorCode, Row, types::ValueRef};
use std::sync::Arc;

pub(crate) fn extract_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Int64(Some(v)),
        ValueRef::Real(v) => Value::Float64(Some(v)),
        ValueRef::Text(v) => Value::Varchar(Some(String::from_utf8_lossy(v).into_owned())),
        ValueRef::Blob(v) => Value::Blob(Some(v.into())),
    }
}

/// Record of `entity` built from the columns of `row`, one per field in `fields` order.
pub(crate) fn decode_row(
    entity: &Arc<EntityDef>,
    fields: &[&FieldDef],
    row: &Row<'_>,
) -> Result<EntityValue> {
    let mut result = EntityValue::new(entity.clone());
    for (index, field) in fields.iter().enumerate() {
        let raw = extract_value(row.get_ref(index).map_err(|e| {
            let error = Error::from(anyhow::Error::new(e).context(format!(
                "While reading column {} of {}.{}",
                index, entity.name, field.name
            )));
            log::error!("{}", error);
            error
        })?);
        let value = match raw.coerce_to(&field.value) {
            Some(v) => v,
            None => {
                // Aggregates of views can produce a different storage class
                log::debug!(
                    "Value {} read for {}.{} does not convert to {}",
                    raw,
                    entity.name,
                    field.name,
                    field.value.type_name()
                );
                raw
            }
        };
        result.insert_unchecked(field.name.to_string(), value);
    }
    Ok(result)
}

/// Classify a driver error, constraint failures are reported as such, everything else is a backend failure.
pub(crate) fn map_error(error: rusqlite::Error, sql: &str) -> Error {
    let error = match error {
        rusqlite::Error::SqliteFailure(failure, message)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            Error::ConstraintViolation(format!(
                "{} while executing:\n{}",
                message.as_deref().unwrap_or("constraint failed"),
                truncate_long!(sql)
            ))
        }
        error => Error::from(
            anyhow::Error::new(error)
                .context(format!("While executing the query:\n{}", truncate_long!(sql))),
        ),
    };
    log::error!("{}", error);
    error
}
