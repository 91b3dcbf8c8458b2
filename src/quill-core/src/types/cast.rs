//! Cast legality between data types.

use super::DataType;

/// Whether a value of `from` can be cast to `to`.
pub fn can_cast(from: &DataType, to: &DataType) -> bool {
    if from == to {
        return true;
    }
    match (from, to) {
        (DataType::Null, _) => true,
        (_, DataType::String) => true,
        (DataType::String, DataType::Binary) => true,
        (DataType::String, t) if t.is_numeric() || t.is_datetime() => true,
        (DataType::String, DataType::Boolean) => true,

        (DataType::Boolean, t) if t.is_numeric() => true,
        (f, DataType::Boolean) if f.is_numeric() || f.is_datetime() => true,

        (f, t) if f.is_numeric() && t.is_numeric() => true,
        (f, t) if f.is_datetime() && t.is_datetime() => true,
        (f, DataType::Timestamp) if f.is_numeric() => true,
        (DataType::Timestamp, t) if t.is_numeric() => true,

        (
            DataType::Array {
                element: fe,
                contains_null: from_null,
            },
            DataType::Array {
                element: te,
                contains_null: to_null,
            },
        ) => can_cast(fe, te) && resolvable_nullability(*from_null || force_nullable(fe, te), *to_null),

        (DataType::Struct(ff), DataType::Struct(tf)) => {
            ff.len() == tf.len()
                && ff.iter().zip(tf).all(|(a, b)| {
                    can_cast(&a.data_type, &b.data_type)
                        && resolvable_nullability(
                            a.nullable || force_nullable(&a.data_type, &b.data_type),
                            b.nullable,
                        )
                })
        }

        _ => false,
    }
}

/// Nullable data can only flow into nullable slots.
pub const fn resolvable_nullability(from: bool, to: bool) -> bool {
    !from || to
}

/// Whether casting `from` to `to` may produce `NULL` for a non-null input.
pub fn force_nullable(from: &DataType, to: &DataType) -> bool {
    match (from, to) {
        (DataType::Null, _) => true,
        (DataType::String, DataType::String | DataType::Binary) => false,
        (DataType::String, _) => true,
        (f, t @ DataType::Decimal { .. }) if f.is_numeric() => !t.is_wider_than(f),
        (f, t) if f.is_floating() && (t.is_integral() || t.is_datetime()) => true,
        (DataType::Array { element: a, .. }, DataType::Array { element: b, .. }) => {
            force_nullable(a, b)
        }
        _ => false,
    }
}

/// Whether the conversion depends on the session time zone.
pub fn needs_time_zone(from: &DataType, to: &DataType) -> bool {
    match (from, to) {
        (DataType::String, DataType::Timestamp)
        | (DataType::Timestamp, DataType::String)
        | (DataType::Date, DataType::Timestamp)
        | (DataType::Timestamp, DataType::Date)
        | (DataType::Timestamp, DataType::TimestampNtz)
        | (DataType::TimestampNtz, DataType::Timestamp) => true,
        (DataType::Array { element: a, .. }, DataType::Array { element: b, .. }) => {
            needs_time_zone(a, b)
        }
        (DataType::Struct(a), DataType::Struct(b)) => a
            .iter()
            .zip(b)
            .any(|(x, y)| needs_time_zone(&x.data_type, &y.data_type)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_casts() {
        assert!(can_cast(&DataType::Integer, &DataType::Double));
        assert!(can_cast(&DataType::String, &DataType::Timestamp));
        assert!(can_cast(&DataType::Date, &DataType::String));
        assert!(!can_cast(&DataType::Binary, &DataType::Integer));
        assert!(!can_cast(&DataType::Date, &DataType::Integer));
        assert!(can_cast(&DataType::Null, &DataType::array(DataType::Long, false)));
    }

    #[test]
    fn test_array_nullability() {
        let nullable_ints = DataType::array(DataType::Integer, true);
        let non_null_longs = DataType::array(DataType::Long, false);
        assert!(!can_cast(&nullable_ints, &non_null_longs));
        assert!(can_cast(&DataType::array(DataType::Integer, false), &non_null_longs));
        // Parsing strings may fail, so the target must allow nulls.
        assert!(!can_cast(&DataType::array(DataType::String, false), &non_null_longs));
    }

    #[test]
    fn test_needs_time_zone() {
        assert!(needs_time_zone(&DataType::String, &DataType::Timestamp));
        assert!(needs_time_zone(&DataType::Date, &DataType::Timestamp));
        assert!(!needs_time_zone(&DataType::Date, &DataType::TimestampNtz));
        assert!(!needs_time_zone(&DataType::Integer, &DataType::Long));
    }

    #[test]
    fn test_force_nullable() {
        assert!(force_nullable(&DataType::String, &DataType::Integer));
        assert!(!force_nullable(&DataType::Integer, &DataType::Long));
        assert!(!force_nullable(&DataType::Integer, &DataType::Decimal { precision: 10, scale: 0 }));
        assert!(force_nullable(&DataType::Long, &DataType::Decimal { precision: 10, scale: 0 }));
    }
}
