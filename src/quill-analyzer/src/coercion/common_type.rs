//! Common types of two or more data types.

use quill_core::types::field_names_match;
use quill_core::{DataType, StructField};

/// The tightest type both inputs widen to without any loss of precision.
///
/// Never produces a decimal from two non-decimals and never promotes to
/// string. Struct fields pair up by name under `case_sensitive`.
pub fn find_tightest_common_type(
    t1: &DataType,
    t2: &DataType,
    case_sensitive: bool,
) -> Option<DataType> {
    match (t1, t2) {
        _ if t1 == t2 => Some(t1.clone()),
        (DataType::Null, t) | (t, DataType::Null) => Some(t.clone()),

        (t, d @ DataType::Decimal { .. }) | (d @ DataType::Decimal { .. }, t)
            if t.is_integral() && d.is_wider_than(t) =>
        {
            Some(d.clone())
        }

        (a, b) => match (a.numeric_rank(), b.numeric_rank()) {
            (Some(ra), Some(rb)) => Some(if ra >= rb { a.clone() } else { b.clone() }),
            _ => find_datetime_or_nested(a, b, case_sensitive, find_tightest_common_type),
        },
    }
}

fn find_datetime_or_nested(
    t1: &DataType,
    t2: &DataType,
    case_sensitive: bool,
    element: fn(&DataType, &DataType, bool) -> Option<DataType>,
) -> Option<DataType> {
    use DataType::{Date, Timestamp, TimestampNtz};
    match (t1, t2) {
        (Date, Timestamp) | (Timestamp, Date) => Some(Timestamp),
        (Timestamp, TimestampNtz) | (TimestampNtz, Timestamp) => Some(Timestamp),
        (Date, TimestampNtz) | (TimestampNtz, Date) => Some(TimestampNtz),

        (
            DataType::Array {
                element: e1,
                contains_null: n1,
            },
            DataType::Array {
                element: e2,
                contains_null: n2,
            },
        ) => element(e1, e2, case_sensitive).map(|e| DataType::array(e, *n1 || *n2)),

        (DataType::Struct(f1), DataType::Struct(f2))
            if f1.len() == f2.len()
                && f1
                    .iter()
                    .zip(f2)
                    .all(|(a, b)| field_names_match(&a.name, &b.name, case_sensitive)) =>
        {
            f1.iter()
                .zip(f2)
                .map(|(a, b)| {
                    element(&a.data_type, &b.data_type, case_sensitive)
                        .map(|t| StructField::new(a.name.clone(), t, a.nullable || b.nullable))
                })
                .collect::<Option<Vec<_>>>()
                .map(DataType::Struct)
        }
        _ => None,
    }
}

/// The decimal wide enough for both decimals.
fn wider_decimal(d1: &DataType, d2: &DataType) -> Option<DataType> {
    match (d1, d2) {
        (
            DataType::Decimal {
                precision: p1,
                scale: s1,
            },
            DataType::Decimal {
                precision: p2,
                scale: s2,
            },
        ) => {
            let scale = usize::from(*s1.max(s2));
            let range = usize::from(p1.saturating_sub(*s1).max(p2.saturating_sub(*s2)));
            Some(DataType::bounded_decimal(range + scale, scale))
        }
        _ => None,
    }
}

/// Like [`find_tightest_common_type`], additionally widening decimals (a
/// decimal and a floating type meet at `DOUBLE`) and promoting atomic types
/// to string when one side is a string.
pub fn find_wider_type_for_two(
    t1: &DataType,
    t2: &DataType,
    case_sensitive: bool,
) -> Option<DataType> {
    if let Some(t) = find_tightest_common_type(t1, t2, case_sensitive) {
        return Some(t);
    }
    match (t1, t2) {
        (DataType::Decimal { .. }, t) | (t, DataType::Decimal { .. }) if t.is_floating() => {
            Some(DataType::Double)
        }
        (d @ DataType::Decimal { .. }, t) | (t, d @ DataType::Decimal { .. })
            if t.is_numeric() =>
        {
            wider_decimal(d, &t.to_decimal()?)
        }
        (DataType::String, t) | (t, DataType::String)
            if t.is_atomic() && !matches!(t, DataType::Binary | DataType::Boolean) =>
        {
            Some(DataType::String)
        }
        _ => find_datetime_or_nested(t1, t2, case_sensitive, find_wider_type_for_two),
    }
}

/// Fold [`find_wider_type_for_two`] over `types`. `None` if any pair has no
/// common type. An empty input has no common type.
pub fn find_wider_common_type(types: &[DataType], case_sensitive: bool) -> Option<DataType> {
    let (first, rest) = types.split_first()?;
    rest.iter().try_fold(first.clone(), |acc, t| {
        find_wider_type_for_two(&acc, t, case_sensitive)
    })
}
