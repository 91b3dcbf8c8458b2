//! Per-shape coercions.
//!
//! Each function looks at a single expression node whose children are
//! resolved and returns the coerced replacement, or `None` when the node is
//! already well typed (or cannot be fixed by casting).

use std::sync::Arc;

use quill_core::{AbstractDataType, DataType, Value};
use quill_logical::expr::{ArithmeticOp, ComparisonOp, Expr, ExprKind, ExprRef, ReturnType};
use quill_logical::TreeNode;

use super::common_type::{find_tightest_common_type, find_wider_common_type, find_wider_type_for_two};
use super::implicit_cast::{cast_if_needed, implicit_cast};

/// A single coercion step over one expression node. The flag is the
/// session's case sensitivity, which decides whether struct fields differing
/// only in case line up.
pub type CoercionFn = fn(&ExprRef, bool) -> Option<ExprRef>;

fn rebuild(e: &ExprRef, kind: ExprKind) -> ExprRef {
    Expr::with_origin_of(kind, e.origin.clone()).into_ref()
}

fn all_same_type<'a>(exprs: impl IntoIterator<Item = &'a ExprRef>, case_sensitive: bool) -> bool {
    let types: Vec<DataType> = exprs.into_iter().map(|e| e.data_type()).collect();
    types.windows(2).all(|w| w[0].same_type(&w[1], case_sensitive))
}

fn numeric_or_null(t: &DataType) -> bool {
    t.is_numeric() || *t == DataType::Null
}

/// Common type for the two operands of a binary operator: the tightest one,
/// or a widened decimal when either side is a decimal.
fn binary_common_type(l: &DataType, r: &DataType, case_sensitive: bool) -> Option<DataType> {
    find_tightest_common_type(l, r, case_sensitive).or_else(|| {
        if (l.is_decimal() && numeric_or_null(r)) || (r.is_decimal() && numeric_or_null(l)) {
            find_wider_type_for_two(l, r, case_sensitive)
        } else {
            None
        }
    })
}

fn null_to_boolean(e: &ExprRef) -> ExprRef {
    if e.data_type() == DataType::Null {
        cast_if_needed(e, &DataType::Boolean)
    } else {
        Arc::clone(e)
    }
}

fn with_operands(e: &ExprRef, left: ExprRef, right: ExprRef) -> ExprRef {
    let kind = match &e.kind {
        ExprKind::BinaryArithmetic { op, .. } => ExprKind::BinaryArithmetic {
            op: *op,
            left,
            right,
        },
        ExprKind::BinaryComparison { op, .. } => ExprKind::BinaryComparison {
            op: *op,
            left,
            right,
        },
        ExprKind::BooleanBinary { op, .. } => ExprKind::BooleanBinary {
            op: *op,
            left,
            right,
        },
        other => other.clone(),
    };
    rebuild(e, kind)
}

/// Widen the value and list of `IN` to their common type.
pub fn in_conversion(e: &ExprRef, case_sensitive: bool) -> Option<ExprRef> {
    let ExprKind::In { value, list } = &e.kind else {
        return None;
    };
    if all_same_type(std::iter::once(value).chain(list), case_sensitive) {
        return None;
    }
    let types: Vec<DataType> = std::iter::once(value)
        .chain(list)
        .map(|x| x.data_type())
        .collect();
    let common = find_wider_common_type(&types, case_sensitive)?;
    Some(rebuild(
        e,
        ExprKind::In {
            value: cast_if_needed(value, &common),
            list: list.iter().map(|x| cast_if_needed(x, &common)).collect(),
        },
    ))
}

/// Lenient string handling: strings in arithmetic become doubles, and a
/// string compared with a datetime, number or boolean takes the other side's
/// type.
pub fn promote_strings(e: &ExprRef, _case_sensitive: bool) -> Option<ExprRef> {
    match &e.kind {
        ExprKind::BinaryArithmetic { left, right, .. } => {
            let (lt, rt) = (left.data_type(), right.data_type());
            if !lt.is_string() && !rt.is_string() {
                return None;
            }
            let promote = |x: &ExprRef, t: &DataType| {
                if t.is_string() {
                    cast_if_needed(x, &DataType::Double)
                } else {
                    Arc::clone(x)
                }
            };
            Some(with_operands(e, promote(left, &lt), promote(right, &rt)))
        }
        ExprKind::BinaryComparison { left, right, .. } => {
            let (lt, rt) = (left.data_type(), right.data_type());
            let target = match (&lt, &rt) {
                (DataType::String, DataType::String) => return None,
                (DataType::String, other) | (other, DataType::String) => match other {
                    DataType::Timestamp | DataType::TimestampNtz | DataType::Date => other.clone(),
                    DataType::Boolean => DataType::Boolean,
                    t if t.is_numeric() => DataType::Double,
                    _ => return None,
                },
                _ => return None,
            };
            Some(with_operands(
                e,
                cast_if_needed(left, &target),
                cast_if_needed(right, &target),
            ))
        }
        _ => None,
    }
}

/// `Some(true)` for a literal one, `Some(false)` for a literal zero.
fn one_or_zero(e: &ExprRef) -> Option<bool> {
    let ExprKind::Literal { value, .. } = &e.kind else {
        return None;
    };
    let n = match value {
        Value::Byte(v) => f64::from(*v),
        Value::Short(v) => f64::from(*v),
        Value::Integer(v) => f64::from(*v),
        Value::Long(v) => match *v {
            0 => 0.0,
            1 => 1.0,
            _ => return None,
        },
        Value::Float(v) => f64::from(*v),
        Value::Double(v) => *v,
        Value::Decimal {
            unscaled, scale, ..
        } => match (*unscaled, 10_i64.checked_pow(u32::from(*scale))) {
            (0, _) => 0.0,
            (u, Some(p)) if u == p => 1.0,
            _ => return None,
        },
        _ => return None,
    };
    if n == 1.0 {
        Some(true)
    } else if n == 0.0 {
        Some(false)
    } else {
        None
    }
}

/// Equality between a boolean and a number.
///
/// Against a literal one or zero the comparison collapses to the boolean
/// itself (or its negation); otherwise the boolean is cast to the numeric
/// type.
pub fn boolean_equality(e: &ExprRef, _case_sensitive: bool) -> Option<ExprRef> {
    let ExprKind::BinaryComparison { op, left, right } = &e.kind else {
        return None;
    };
    if !op.is_equality() {
        return None;
    }
    let (lt, rt) = (left.data_type(), right.data_type());
    let (boolean, number, number_type, boolean_left) = match (&lt, &rt) {
        (DataType::Boolean, t) if t.is_numeric() => (left, right, t, true),
        (t, DataType::Boolean) if t.is_numeric() => (right, left, t, false),
        _ => return None,
    };

    if let Some(is_one) = one_or_zero(number) {
        let test = if is_one {
            Arc::clone(boolean)
        } else {
            Arc::clone(boolean).not()
        };
        let out = match op {
            ComparisonOp::EqualNullSafe => Arc::clone(boolean).is_not_null().and(test),
            _ => test,
        };
        return Some(out.at(e.origin.clone()));
    }

    let cast = cast_if_needed(boolean, number_type);
    Some(if boolean_left {
        with_operands(e, cast, Arc::clone(number))
    } else {
        with_operands(e, Arc::clone(number), cast)
    })
}

/// Cast `concat` inputs to string unless they are all binary.
pub fn concat_coercion(e: &ExprRef, _case_sensitive: bool) -> Option<ExprRef> {
    let ExprKind::Concat { children } = &e.kind else {
        return None;
    };
    let types: Vec<DataType> = children.iter().map(|c| c.data_type()).collect();
    if types.is_empty()
        || types.iter().all(|t| *t == DataType::Binary)
        || types.iter().all(|t| t.is_string())
    {
        return None;
    }
    let string: AbstractDataType = DataType::String.into();
    let children = children
        .iter()
        .map(|c| implicit_cast(c, &string).unwrap_or_else(|| Arc::clone(c)))
        .collect();
    Some(rebuild(e, ExprKind::Concat { children }))
}

fn cast_operands_to(e: &ExprRef, op: ArithmeticOp, target: &DataType) -> Option<ExprRef> {
    let ExprKind::BinaryArithmetic {
        op: actual,
        left,
        right,
    } = &e.kind
    else {
        return None;
    };
    if *actual != op {
        return None;
    }
    let (lt, rt) = (left.data_type(), right.data_type());
    let plain = |t: &DataType| numeric_or_null(t) && !t.is_decimal();
    if !plain(&lt) || !plain(&rt) || (lt == *target && rt == *target) {
        return None;
    }
    Some(with_operands(
        e,
        cast_if_needed(left, target),
        cast_if_needed(right, target),
    ))
}

/// Fractional division of non-decimal numbers happens in `DOUBLE`.
pub fn division(e: &ExprRef, _case_sensitive: bool) -> Option<ExprRef> {
    cast_operands_to(e, ArithmeticOp::Divide, &DataType::Double)
}

/// Integral division of non-decimal numbers happens in `BIGINT`.
pub fn integral_division(e: &ExprRef, _case_sensitive: bool) -> Option<ExprRef> {
    cast_operands_to(e, ArithmeticOp::IntegralDivide, &DataType::Long)
}

/// Widen the branch values of `CASE WHEN` to a common type. `NULL`-typed
/// conditions become booleans.
pub fn case_when_coercion(e: &ExprRef, case_sensitive: bool) -> Option<ExprRef> {
    let ExprKind::CaseWhen {
        branches,
        else_value,
    } = &e.kind
    else {
        return None;
    };
    let values = branches.iter().map(|(_, v)| v).chain(else_value.iter());
    let null_conditions = branches
        .iter()
        .any(|(c, _)| c.data_type() == DataType::Null);
    if all_same_type(values.clone(), case_sensitive) && !null_conditions {
        return None;
    }
    let types: Vec<DataType> = values.map(|v| v.data_type()).collect();
    let common = find_wider_common_type(&types, case_sensitive);
    let value = |v: &ExprRef| match &common {
        Some(t) => cast_if_needed(v, t),
        None => Arc::clone(v),
    };
    let branches = branches
        .iter()
        .map(|(c, v)| (null_to_boolean(c), value(v)))
        .collect();
    let else_value = else_value.as_ref().map(value);
    let out = rebuild(
        e,
        ExprKind::CaseWhen {
            branches,
            else_value,
        },
    );
    (!out.fast_equals(e)).then_some(out)
}

/// Widen both branches of `IF` to a common type. A `NULL` predicate becomes
/// a boolean.
pub fn if_coercion(e: &ExprRef, case_sensitive: bool) -> Option<ExprRef> {
    let ExprKind::If {
        predicate,
        true_value,
        false_value,
    } = &e.kind
    else {
        return None;
    };
    let (tt, ft) = (true_value.data_type(), false_value.data_type());
    let predicate_is_null = predicate.data_type() == DataType::Null;
    let (true_value, false_value) = if tt.same_type(&ft, case_sensitive) {
        (Arc::clone(true_value), Arc::clone(false_value))
    } else {
        match find_wider_type_for_two(&tt, &ft, case_sensitive) {
            Some(t) => (cast_if_needed(true_value, &t), cast_if_needed(false_value, &t)),
            None if predicate_is_null => (Arc::clone(true_value), Arc::clone(false_value)),
            None => return None,
        }
    };
    let out = rebuild(
        e,
        ExprKind::If {
            predicate: null_to_boolean(predicate),
            true_value,
            false_value,
        },
    );
    (!out.fast_equals(e)).then_some(out)
}

/// Casts driven by the input types an expression declares.
pub fn implicit_type_casts(e: &ExprRef, case_sensitive: bool) -> Option<ExprRef> {
    let boolean: AbstractDataType = DataType::Boolean.into();
    match &e.kind {
        ExprKind::BinaryArithmetic { op, left, right } => {
            let (lt, rt) = (left.data_type(), right.data_type());
            let expected = op.input_type();
            if !lt.same_type(&rt, case_sensitive) {
                let common = binary_common_type(&lt, &rt, case_sensitive)?;
                if !expected.accepts_type(&common) {
                    return None;
                }
                return Some(with_operands(
                    e,
                    cast_if_needed(left, &common),
                    cast_if_needed(right, &common),
                ));
            }
            if expected.accepts_type(&lt) {
                return None;
            }
            let l = implicit_cast(left, &expected)?;
            let r = implicit_cast(right, &expected)?;
            Some(with_operands(e, l, r))
        }
        ExprKind::BinaryComparison { left, right, .. } => {
            let (lt, rt) = (left.data_type(), right.data_type());
            if lt.same_type(&rt, case_sensitive) {
                return None;
            }
            let common = binary_common_type(&lt, &rt, case_sensitive)?;
            Some(with_operands(
                e,
                cast_if_needed(left, &common),
                cast_if_needed(right, &common),
            ))
        }
        ExprKind::BooleanBinary { left, right, .. } => {
            if left.data_type() == DataType::Boolean && right.data_type() == DataType::Boolean {
                return None;
            }
            let l = implicit_cast(left, &boolean).unwrap_or_else(|| Arc::clone(left));
            let r = implicit_cast(right, &boolean).unwrap_or_else(|| Arc::clone(right));
            let out = with_operands(e, l, r);
            (!out.fast_equals(e)).then_some(out)
        }
        ExprKind::Not { child } => {
            if child.data_type() == DataType::Boolean {
                return None;
            }
            let child = implicit_cast(child, &boolean)?;
            Some(rebuild(e, ExprKind::Not { child }))
        }
        ExprKind::ScalarFunction {
            name,
            args,
            signature,
            time_zone_id,
        } => {
            let mut new_args = args.clone();
            if signature.return_type == ReturnType::CommonOfArgs
                && !all_same_type(args, case_sensitive)
            {
                let types: Vec<DataType> = args.iter().map(|a| a.data_type()).collect();
                if let Some(common) = find_wider_common_type(&types, case_sensitive) {
                    new_args = args.iter().map(|a| cast_if_needed(a, &common)).collect();
                }
            }
            let new_args: Vec<ExprRef> = new_args
                .into_iter()
                .enumerate()
                .map(|(i, a)| match signature.expected_type(i) {
                    Some(expected) => implicit_cast(&a, expected).unwrap_or(a),
                    None => a,
                })
                .collect();
            if new_args.iter().zip(args).all(|(a, b)| Arc::ptr_eq(a, b)) {
                return None;
            }
            Some(rebuild(
                e,
                ExprKind::ScalarFunction {
                    name: name.clone(),
                    args: new_args,
                    signature: signature.clone(),
                    time_zone_id: time_zone_id.clone(),
                },
            ))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use quill_logical::expr::{col_ref, lit, typed_null};

    use super::*;

    fn int(v: i32) -> ExprRef {
        lit(Value::Integer(v))
    }

    #[test]
    fn test_in_conversion_widens() {
        let x = col_ref("x", DataType::Integer);
        let e = x.in_list(vec![lit(Value::Double(1.5)), int(2)]);
        let out = in_conversion(&e, false).unwrap();
        let ExprKind::In { value, list } = &out.kind else {
            panic!("expected IN");
        };
        assert_eq!(value.data_type(), DataType::Double);
        assert!(list.iter().all(|x| x.data_type() == DataType::Double));
        assert!(in_conversion(&out, false).is_none());
    }

    #[test]
    fn test_promote_strings() {
        let s = col_ref("s", DataType::String);
        let sum = Arc::clone(&s).add(int(1));
        let out = promote_strings(&sum, false).unwrap();
        assert_eq!(out.sql(), "(CAST(s AS DOUBLE) + 1)");

        let cmp = Arc::clone(&s).eq(col_ref("d", DataType::Date));
        let out = promote_strings(&cmp, false).unwrap();
        assert_eq!(out.sql(), "(CAST(s AS DATE) = d)");

        let cmp = s.eq(col_ref("b", DataType::Boolean));
        assert_eq!(promote_strings(&cmp, false).unwrap().sql(), "(CAST(s AS BOOLEAN) = b)");
    }

    #[test]
    fn test_boolean_equality() {
        let b = col_ref("b", DataType::Boolean);
        assert_eq!(boolean_equality(&Arc::clone(&b).eq(int(1)), false).unwrap().sql(), "b");
        assert_eq!(boolean_equality(&Arc::clone(&b).eq(int(0)), false).unwrap().sql(), "(NOT b)");
        assert_eq!(
            boolean_equality(&int(0).eq_null_safe(Arc::clone(&b)), false).unwrap().sql(),
            "((b IS NOT NULL) AND (NOT b))"
        );
        let other = col_ref("n", DataType::Long);
        assert_eq!(
            boolean_equality(&b.eq(other), false).unwrap().sql(),
            "(CAST(b AS BIGINT) = n)"
        );
    }

    #[test]
    fn test_concat_coercion() {
        let e = Expr::concat(vec![lit(Value::String("a".into())), int(1)]);
        let out = concat_coercion(&e, false).unwrap();
        assert_eq!(out.sql(), "concat('a', CAST(1 AS STRING))");
        assert!(concat_coercion(&out, false).is_none());

        let bytes = Expr::concat(vec![col_ref("a", DataType::Binary), col_ref("b", DataType::Binary)]);
        assert!(concat_coercion(&bytes, false).is_none());
    }

    #[test]
    fn test_division() {
        let e = int(1).div(int(2));
        let out = division(&e, false).unwrap();
        assert_eq!(out.data_type(), DataType::Double);
        assert!(division(&out, false).is_none());

        let e = int(7).int_div(lit(Value::Short(2)));
        assert_eq!(integral_division(&e, false).unwrap().data_type(), DataType::Long);

        let dec = col_ref("d", DataType::bounded_decimal(5, 2));
        assert!(division(&dec.div(int(2)), false).is_none());
    }

    #[test]
    fn test_if_coercion() {
        let e = Expr::if_(col_ref("c", DataType::Boolean), int(1), lit(Value::Double(2.0)));
        let out = if_coercion(&e, false).unwrap();
        assert_eq!(out.data_type(), DataType::Double);
        assert!(if_coercion(&out, false).is_none());

        let e = Expr::if_(typed_null(DataType::Null), int(1), int(2));
        let out = if_coercion(&e, false).unwrap();
        let ExprKind::If { predicate, .. } = &out.kind else {
            panic!("expected IF");
        };
        assert_eq!(predicate.data_type(), DataType::Boolean);
    }

    #[test]
    fn test_case_when_coercion() {
        let c = col_ref("c", DataType::Boolean);
        let e = Expr::case_when(vec![(c, int(1))], Some(lit(Value::Long(2))));
        let out = case_when_coercion(&e, false).unwrap();
        assert_eq!(out.data_type(), DataType::Long);
        assert!(out.check_input_data_types(false).is_ok());
        assert!(case_when_coercion(&out, false).is_none());
    }

    #[test]
    fn test_implicit_casts_for_operators() {
        let x = col_ref("x", DataType::Integer);
        let y = col_ref("y", DataType::Long);
        let out = implicit_type_casts(&Arc::clone(&x).add(y), false).unwrap();
        assert_eq!(out.sql(), "(CAST(x AS BIGINT) + y)");

        let d = col_ref("d", DataType::bounded_decimal(5, 2));
        let out = implicit_type_casts(&Arc::clone(&x).gt(d), false).unwrap();
        assert_eq!(
            out.sql(),
            "(CAST(x AS DECIMAL(12,2)) > CAST(d AS DECIMAL(12,2)))"
        );

        let nulls = typed_null(DataType::Null).add(typed_null(DataType::Null));
        assert_eq!(implicit_type_casts(&nulls, false).unwrap().data_type(), DataType::Double);

        let dates = col_ref("a", DataType::Date).add(col_ref("b", DataType::Date));
        assert!(implicit_type_casts(&dates, false).is_none());
    }

    #[test]
    fn test_implicit_casts_for_functions() {
        use quill_logical::expr::FunctionSignature;

        let coalesce = Expr::new(ExprKind::ScalarFunction {
            name: "coalesce".to_string(),
            args: vec![int(1), lit(Value::Long(2))],
            signature: FunctionSignature::variadic(AbstractDataType::Any, ReturnType::CommonOfArgs),
            time_zone_id: None,
        })
        .into_ref();
        let out = implicit_type_casts(&coalesce, false).unwrap();
        assert_eq!(out.data_type(), DataType::Long);
        assert!(out.check_input_data_types(false).is_ok());

        let upper = Expr::new(ExprKind::ScalarFunction {
            name: "upper".to_string(),
            args: vec![int(1)],
            signature: FunctionSignature::exact(
                vec![DataType::String.into()],
                ReturnType::Fixed(DataType::String),
            ),
            time_zone_id: None,
        })
        .into_ref();
        assert_eq!(implicit_type_casts(&upper, false).unwrap().sql(), "upper(CAST(1 AS STRING))");
    }
}
