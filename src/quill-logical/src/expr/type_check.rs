//! Input type checks that resolved expressions declare for themselves.

use std::fmt;

use quill_core::{can_cast, AbstractDataType, DataType};

use super::{Expr, ExprKind, ExprRef, ReturnType};

/// Why an expression's inputs are not acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeCheckFailure {
    pub message: String,
}

impl TypeCheckFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for TypeCheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

type CheckResult = Result<(), TypeCheckFailure>;

fn require(expected: &AbstractDataType, e: &ExprRef, position: usize) -> CheckResult {
    let actual = e.data_type();
    if expected.accepts_type(&actual) {
        Ok(())
    } else {
        Err(TypeCheckFailure::new(format!(
            "parameter {position} requires the {} type, however \"{}\" has the type {actual}.",
            expected.simple_string(),
            e.sql()
        )))
    }
}

fn require_boolean_operand(e: &ExprRef) -> CheckResult {
    let actual = e.data_type();
    if actual == DataType::Boolean || actual == DataType::Null {
        Ok(())
    } else {
        Err(TypeCheckFailure::new(format!(
            "the binary operator requires the input type \"BOOLEAN\", not {actual}."
        )))
    }
}

fn require_same_types<'a>(
    what: &str,
    exprs: impl IntoIterator<Item = &'a ExprRef>,
    case_sensitive: bool,
) -> CheckResult {
    let types: Vec<DataType> = exprs.into_iter().map(|e| e.data_type()).collect();
    let Some(first) = types.first() else {
        return Ok(());
    };
    if types.iter().all(|t| t.same_type(first, case_sensitive)) {
        Ok(())
    } else {
        let listed = types
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Err(TypeCheckFailure::new(format!(
            "{what} should all be of the same type, but got [{listed}]."
        )))
    }
}

impl Expr {
    /// Check that the (resolved) inputs have types this expression accepts.
    ///
    /// Only meaningful once all children are resolved. `case_sensitive` decides
    /// whether struct fields differing only in case count as the same type.
    pub fn check_input_data_types(&self, case_sensitive: bool) -> CheckResult {
        match &self.kind {
            ExprKind::BinaryArithmetic { op, left, right } => {
                let (lt, rt) = (left.data_type(), right.data_type());
                if !lt.same_type(&rt, case_sensitive) {
                    return Err(TypeCheckFailure::new(format!(
                        "the left and right operands of the binary operator have incompatible types ({lt} and {rt})."
                    )));
                }
                let expected = op.input_type();
                if !expected.accepts_type(&lt) {
                    return Err(TypeCheckFailure::new(format!(
                        "the binary operator requires the input type {}, not {lt}.",
                        expected.simple_string()
                    )));
                }
                Ok(())
            }
            ExprKind::BinaryComparison { left, right, .. } => {
                let (lt, rt) = (left.data_type(), right.data_type());
                if lt.same_type(&rt, case_sensitive) {
                    Ok(())
                } else {
                    Err(TypeCheckFailure::new(format!(
                        "the left and right operands of the binary operator have incompatible types ({lt} and {rt})."
                    )))
                }
            }
            ExprKind::BooleanBinary { left, right, .. } => {
                require_boolean_operand(left)?;
                require_boolean_operand(right)
            }
            ExprKind::Not { child } => require(&DataType::Boolean.into(), child, 1),
            ExprKind::CaseWhen {
                branches,
                else_value,
            } => {
                for (i, (cond, _)) in branches.iter().enumerate() {
                    let t = cond.data_type();
                    if t != DataType::Boolean {
                        return Err(TypeCheckFailure::new(format!(
                            "WHEN expressions in CaseWhen should all be boolean type, but the {}th when expression's type is {t}.",
                            i + 1
                        )));
                    }
                }
                require_same_types(
                    "THEN and ELSE expressions",
                    branches.iter().map(|(_, v)| v).chain(else_value.iter()),
                    case_sensitive,
                )
            }
            ExprKind::If {
                predicate,
                true_value,
                false_value,
            } => {
                let pt = predicate.data_type();
                if pt != DataType::Boolean {
                    return Err(TypeCheckFailure::new(format!(
                        "the first argument of IF should be of type \"BOOLEAN\", but got {pt}."
                    )));
                }
                require_same_types(
                    "the second and third arguments of IF",
                    [true_value, false_value],
                    case_sensitive,
                )
            }
            ExprKind::In { value, list } => {
                require_same_types(
                "the input types of IN",
                std::iter::once(value).chain(list),
                case_sensitive,
            )
            }
            ExprKind::Concat { children } => {
                let string_or_binary = AbstractDataType::one_of([
                    DataType::String.into(),
                    DataType::Binary.into(),
                ]);
                for (i, c) in children.iter().enumerate() {
                    require(&string_or_binary, c, i + 1)?;
                }
                require_same_types("the inputs of concat", children, case_sensitive)
            }
            ExprKind::Cast {
                child, data_type, ..
            } => {
                let from = child.data_type();
                if can_cast(&from, data_type) {
                    Ok(())
                } else {
                    Err(TypeCheckFailure::new(format!(
                        "cannot cast {from} to {data_type}."
                    )))
                }
            }
            ExprKind::GetStructField { child, ordinal, .. } => match child.data_type() {
                DataType::Struct(fields) if *ordinal < fields.len() => Ok(()),
                other => Err(TypeCheckFailure::new(format!(
                    "field {ordinal} cannot be extracted from {other}."
                ))),
            },
            ExprKind::ScalarFunction {
                name,
                args,
                signature,
                ..
            } => {
                if !signature.accepts_arity(args.len()) {
                    return Err(TypeCheckFailure::new(format!(
                        "{name} does not accept {} arguments.",
                        args.len()
                    )));
                }
                for (i, arg) in args.iter().enumerate() {
                    if let Some(expected) = signature.expected_type(i) {
                        require(expected, arg, i + 1)?;
                    }
                }
                if signature.return_type == ReturnType::CommonOfArgs {
                    require_same_types(&format!("the inputs of {name}"), args, case_sensitive)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{col_ref, lit};
    use quill_core::Value;

    #[test]
    fn test_arithmetic_requires_matching_numeric_types() {
        let i = col_ref("i", DataType::Integer);
        let s = col_ref("s", DataType::String);
        assert!(i.clone().add(i.clone()).check_input_data_types(false).is_ok());

        let err = i.clone().add(s.clone()).check_input_data_types(false).unwrap_err();
        assert!(err.message.contains("incompatible types (\"INT\" and \"STRING\")"));

        let err = s.clone().add(s).check_input_data_types(false).unwrap_err();
        assert!(err.message.contains("requires the input type \"NUMERIC\""));
    }

    #[test]
    fn test_divide_requires_double_or_decimal() {
        let i = col_ref("i", DataType::Integer);
        assert!(i.clone().div(i).check_input_data_types(false).is_err());
        let d = col_ref("d", DataType::Double);
        assert!(d.clone().div(d).check_input_data_types(false).is_ok());
    }

    #[test]
    fn test_if_branches_must_agree() {
        let cond = lit(Value::Boolean(true));
        let e = Expr::if_(cond.clone(), lit(Value::Integer(1)), lit(Value::Double(2.0)));
        assert!(e.check_input_data_types(false).is_err());
        let e = Expr::if_(cond, lit(Value::Double(1.0)), lit(Value::Double(2.0)));
        assert!(e.check_input_data_types(false).is_ok());
    }

    #[test]
    fn test_case_when_conditions_must_be_boolean() {
        let e = Expr::case_when(
            vec![(lit(Value::Integer(1)), lit(Value::Integer(2)))],
            None,
        );
        let err = e.check_input_data_types(false).unwrap_err();
        assert!(err.message.contains("1th when expression's type is \"INT\""));
    }

    #[test]
    fn test_illegal_cast() {
        let e = col_ref("b", DataType::Binary).cast(DataType::Integer);
        assert!(e.check_input_data_types(false).is_err());
        assert!(!e.resolved());
    }

    #[test]
    fn test_struct_operands_follow_session_case() {
        use quill_core::StructField;

        let lower = DataType::Struct(vec![StructField::new("a", DataType::Integer, false)]);
        let upper = DataType::Struct(vec![StructField::new("A", DataType::Integer, false)]);
        let e = col_ref("l", lower).eq(col_ref("u", upper));
        assert!(e.check_input_data_types(false).is_ok());
        let err = e.check_input_data_types(true).unwrap_err();
        assert!(err.message.contains("incompatible types"));
    }
}
