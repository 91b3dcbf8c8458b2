//! Implicit casts of an input to the type an expression expects.

use std::sync::Arc;

use quill_core::types::force_nullable;
use quill_core::{AbstractDataType, DataType};
use quill_logical::expr::{Expr, ExprKind, ExprRef};

/// The type `in_type` should be cast to so that `expected` accepts it, or
/// `None` if no implicit cast exists.
///
/// A collection picks its first alternative that works.
pub fn implicit_cast_type(in_type: &DataType, expected: &AbstractDataType) -> Option<DataType> {
    use AbstractDataType as A;

    if expected.accepts_type(in_type) {
        return Some(in_type.clone());
    }

    match (in_type, expected) {
        (_, A::Collection(types)) => types.iter().find_map(|t| implicit_cast_type(in_type, t)),

        (DataType::Null, target) => Some(target.default_concrete_type()),

        (DataType::String, A::AnyNumeric | A::AnyIntegral) => Some(expected.default_concrete_type()),

        (n, A::AnyDecimal) if n.is_numeric() => n.to_decimal(),
        (n, A::AnyIntegral) if n.is_numeric() => Some(DataType::Long),
        (n, A::Concrete(target)) if n.is_numeric() && target.is_numeric() => Some(target.clone()),

        (d, A::Concrete(target)) if d.is_datetime() && target.is_datetime() => Some(target.clone()),
        (d, A::AnyTimestamp) if d.is_datetime() => Some(DataType::Timestamp),

        (DataType::String, A::AnyDecimal | A::AnyDatetime | A::AnyTimestamp) => {
            Some(expected.default_concrete_type())
        }
        (DataType::String, A::Concrete(target))
            if target.is_numeric() || target.is_datetime() || *target == DataType::Binary =>
        {
            Some(target.clone())
        }

        (t, A::Concrete(DataType::String)) if t.is_atomic() => Some(DataType::String),

        (
            DataType::Array {
                element: from,
                contains_null: from_null,
            },
            A::Concrete(DataType::Array {
                element: to,
                contains_null: to_null,
            }),
        ) => {
            if *to_null {
                implicit_cast_type(from, &A::Concrete((**to).clone()))
                    .map(|e| DataType::array(e, true))
            } else if *from_null || force_nullable(from, to) {
                None
            } else {
                implicit_cast_type(from, &A::Concrete((**to).clone()))
                    .map(|e| DataType::array(e, false))
            }
        }

        _ => None,
    }
}

/// Wrap `e` in a cast to `data_type` unless it already has that type. The
/// cast carries the origin of `e`.
pub fn cast_if_needed(e: &ExprRef, data_type: &DataType) -> ExprRef {
    if e.data_type() == *data_type {
        Arc::clone(e)
    } else {
        Expr::new(ExprKind::Cast {
            child: Arc::clone(e),
            data_type: data_type.clone(),
            time_zone_id: None,
        })
        .into_ref()
        .at(e.origin.clone())
    }
}

/// Cast `e` so that `expected` accepts it, or `None` if impossible.
pub fn implicit_cast(e: &ExprRef, expected: &AbstractDataType) -> Option<ExprRef> {
    implicit_cast_type(&e.data_type(), expected).map(|t| cast_if_needed(e, &t))
}
