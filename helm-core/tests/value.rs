#[cfg(test)]
mod tests {
    use helm_core::{AsValue, Value};
    use rust_decimal::Decimal;
    use std::cmp::Ordering;
    use time::macros::{date, datetime, time};
    use uuid::Uuid;

    #[test]
    fn coercion() {
        assert_eq!(
            Value::Int64(Some(7)).coerce_to(&Value::Int32(None)),
            Some(Value::Int32(Some(7)))
        );
        assert_eq!(
            Value::Int64(Some(i64::MAX)).coerce_to(&Value::Int32(None)),
            None,
            "Narrowing must not lose information"
        );
        assert_eq!(
            Value::from(" 12 ").coerce_to(&Value::Int32(None)),
            Some(Value::Int32(Some(12)))
        );
        assert_eq!(Value::from("many").coerce_to(&Value::Int32(None)), None);
        assert_eq!(
            Value::Float64(Some(2.0)).coerce_to(&Value::Int64(None)),
            Some(Value::Int64(Some(2)))
        );
        assert_eq!(Value::Float64(Some(2.5)).coerce_to(&Value::Int64(None)), None);
        assert_eq!(
            Value::Int64(Some(1)).coerce_to(&Value::Boolean(None)),
            Some(Value::Boolean(Some(true)))
        );
        assert_eq!(
            Value::from("10.004").coerce_to(&Value::Decimal(None, 10, 2)),
            Some(Value::Decimal(Some(Decimal::new(1000, 2)), 10, 2)),
            "Decimals are rounded to the declared scale"
        );
        assert_eq!(
            Value::from("2024-02-29").coerce_to(&Value::Date(None)),
            Some(Value::Date(Some(date!(2024 - 02 - 29))))
        );
        assert_eq!(
            Value::from("10:15:30.250000").coerce_to(&Value::Time(None)),
            Some(Value::Time(Some(time!(10:15:30.25))))
        );
        assert_eq!(
            Value::from("2024-03-01 10:15:30.250000").coerce_to(&Value::Timestamp(None)),
            Some(Value::Timestamp(Some(datetime!(2024-03-01 10:15:30.25))))
        );
        let id = Uuid::new_v4();
        assert_eq!(
            Value::from(id.to_string().as_str()).coerce_to(&Value::Uuid(None)),
            Some(Value::Uuid(Some(id)))
        );
        assert_eq!(
            Value::from("CAFE").coerce_to(&Value::Blob(None)),
            Some(Value::Blob(Some([0xCA, 0xFE].into())))
        );
        assert_eq!(Value::from("text").coerce_to(&Value::Date(None)), None);
    }

    #[test]
    fn nulls() {
        assert_eq!(
            Value::Null.coerce_to(&Value::Varchar(None)),
            Some(Value::Varchar(None))
        );
        assert_eq!(Value::Null, Value::Int32(None));
        assert_ne!(Value::Int32(Some(0)), Value::Int32(None));
        assert_eq!(Value::Int32(None).compare(&Value::Int32(None)), None);
        assert_eq!(Value::Int32(Some(1)).compare(&Value::Null), None);
        assert_eq!(
            Value::Null.total_cmp(&Value::Int32(Some(i32::MIN))),
            Ordering::Less
        );
        assert_eq!(Value::Null.to_string(), "null");
    }

    #[test]
    fn comparison() {
        assert_eq!(
            Value::Int32(Some(3)).compare(&Value::Int64(Some(3))),
            Some(Ordering::Equal)
        );
        assert_eq!(
            Value::Decimal(Some(Decimal::new(999, 2)), 18, 2).compare(&Value::Int32(Some(10))),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Float64(Some(0.5)).compare(&Value::Int32(Some(1))),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::from("b").compare(&Value::from("a")),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::from("5").compare(&Value::Int32(Some(12))),
            Some(Ordering::Less),
            "Text compared with a number is converted first"
        );
        assert_eq!(
            Value::Date(Some(date!(2024 - 01 - 01))).compare(&Value::Int32(Some(1))),
            None
        );
    }

    #[test]
    fn native_types() {
        assert_eq!(i32::try_from_value(Value::Int64(Some(5))).unwrap(), 5);
        assert!(i32::try_from_value(Value::from("five")).is_err());
        assert_eq!(
            Option::<String>::try_from_value(Value::Varchar(None)).unwrap(),
            None
        );
        assert_eq!(
            Decimal::try_from_value(Value::Float64(Some(1.5))).unwrap(),
            Decimal::new(15, 1)
        );
        assert_eq!(Value::from(vec![1u8, 2]), Value::Blob(Some([1, 2].into())));
        assert_eq!(
            Value::from(Some(3i64)),
            Value::Int64(Some(3))
        );
        assert_eq!(Value::from(None::<bool>), Value::Boolean(None));
        assert_eq!(
            Value::Date(Some(date!(2024 - 02 - 29))).to_string(),
            "2024-02-29"
        );
        assert_eq!(
            Value::Timestamp(Some(datetime!(2024-03-01 10:15:30.25))).to_string(),
            "2024-03-01 10:15:30.250000"
        );
    }
}
