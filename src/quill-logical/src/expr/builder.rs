//! Convenience constructors for expressions.

use std::sync::Arc;

use common_error::Origin;
use quill_core::{DataType, ExprId, Value};

use super::{
    ArithmeticOp, AttributeReference, BooleanOp, ComparisonOp, Expr, ExprKind, ExprRef,
};

/// Unresolved column reference; dots separate name parts.
pub fn col(name: &str) -> ExprRef {
    col_parts(name.split('.').map(str::to_string).collect())
}

/// Unresolved column reference from explicit name parts.
pub fn col_parts(name_parts: Vec<String>) -> ExprRef {
    Expr::new(ExprKind::UnresolvedAttribute { name_parts }).into_ref()
}

/// A resolved, nullable attribute with a fresh id.
pub fn col_ref(name: &str, data_type: DataType) -> ExprRef {
    AttributeReference::new(name, data_type, true).to_expr()
}

/// Literal typed after its value.
pub fn lit(value: Value) -> ExprRef {
    let data_type = value.data_type();
    Expr::new(ExprKind::Literal { value, data_type }).into_ref()
}

/// `NULL` literal of a given type.
pub fn typed_null(data_type: DataType) -> ExprRef {
    Expr::new(ExprKind::Literal {
        value: Value::Null,
        data_type,
    })
    .into_ref()
}

/// Unresolved function call; dots in `name` separate name parts.
pub fn func(name: &str, arguments: Vec<ExprRef>) -> ExprRef {
    Expr::new(ExprKind::UnresolvedFunction {
        name_parts: name.split('.').map(str::to_string).collect(),
        arguments,
        is_distinct: false,
    })
    .into_ref()
}

impl Expr {
    fn arithmetic(self: ExprRef, op: ArithmeticOp, other: ExprRef) -> ExprRef {
        Self::new(ExprKind::BinaryArithmetic {
            op,
            left: self,
            right: other,
        })
        .into_ref()
    }

    fn comparison(self: ExprRef, op: ComparisonOp, other: ExprRef) -> ExprRef {
        Self::new(ExprKind::BinaryComparison {
            op,
            left: self,
            right: other,
        })
        .into_ref()
    }

    fn boolean(self: ExprRef, op: BooleanOp, other: ExprRef) -> ExprRef {
        Self::new(ExprKind::BooleanBinary {
            op,
            left: self,
            right: other,
        })
        .into_ref()
    }

    pub fn add(self: ExprRef, other: ExprRef) -> ExprRef {
        self.arithmetic(ArithmeticOp::Add, other)
    }

    pub fn sub(self: ExprRef, other: ExprRef) -> ExprRef {
        self.arithmetic(ArithmeticOp::Subtract, other)
    }

    pub fn mul(self: ExprRef, other: ExprRef) -> ExprRef {
        self.arithmetic(ArithmeticOp::Multiply, other)
    }

    pub fn div(self: ExprRef, other: ExprRef) -> ExprRef {
        self.arithmetic(ArithmeticOp::Divide, other)
    }

    pub fn int_div(self: ExprRef, other: ExprRef) -> ExprRef {
        self.arithmetic(ArithmeticOp::IntegralDivide, other)
    }

    pub fn rem(self: ExprRef, other: ExprRef) -> ExprRef {
        self.arithmetic(ArithmeticOp::Remainder, other)
    }

    pub fn eq(self: ExprRef, other: ExprRef) -> ExprRef {
        self.comparison(ComparisonOp::EqualTo, other)
    }

    pub fn eq_null_safe(self: ExprRef, other: ExprRef) -> ExprRef {
        self.comparison(ComparisonOp::EqualNullSafe, other)
    }

    pub fn lt(self: ExprRef, other: ExprRef) -> ExprRef {
        self.comparison(ComparisonOp::LessThan, other)
    }

    pub fn lt_eq(self: ExprRef, other: ExprRef) -> ExprRef {
        self.comparison(ComparisonOp::LessThanOrEqual, other)
    }

    pub fn gt(self: ExprRef, other: ExprRef) -> ExprRef {
        self.comparison(ComparisonOp::GreaterThan, other)
    }

    pub fn gt_eq(self: ExprRef, other: ExprRef) -> ExprRef {
        self.comparison(ComparisonOp::GreaterThanOrEqual, other)
    }

    pub fn and(self: ExprRef, other: ExprRef) -> ExprRef {
        self.boolean(BooleanOp::And, other)
    }

    pub fn or(self: ExprRef, other: ExprRef) -> ExprRef {
        self.boolean(BooleanOp::Or, other)
    }

    pub fn not(self: ExprRef) -> ExprRef {
        Self::new(ExprKind::Not { child: self }).into_ref()
    }

    pub fn is_null(self: ExprRef) -> ExprRef {
        Self::new(ExprKind::IsNull { child: self }).into_ref()
    }

    pub fn is_not_null(self: ExprRef) -> ExprRef {
        Self::new(ExprKind::IsNotNull { child: self }).into_ref()
    }

    pub fn in_list(self: ExprRef, list: Vec<ExprRef>) -> ExprRef {
        Self::new(ExprKind::In { value: self, list }).into_ref()
    }

    /// Name this expression, introducing a fresh attribute id.
    pub fn alias(self: ExprRef, name: &str) -> ExprRef {
        Self::new(ExprKind::Alias {
            child: self,
            name: name.to_string(),
            expr_id: ExprId::new_id(),
            qualifier: Vec::new(),
        })
        .into_ref()
    }

    /// Cast without a time zone.
    pub fn cast(self: ExprRef, data_type: DataType) -> ExprRef {
        Self::new(ExprKind::Cast {
            child: self,
            data_type,
            time_zone_id: None,
        })
        .into_ref()
    }

    /// Mark a projection item as needing a generated name.
    pub fn unresolved_alias(self: ExprRef) -> ExprRef {
        Self::new(ExprKind::UnresolvedAlias { child: self }).into_ref()
    }

    /// Struct field access by position.
    pub fn get_field(self: ExprRef, ordinal: usize, name: Option<&str>) -> ExprRef {
        Self::new(ExprKind::GetStructField {
            child: self,
            ordinal,
            name: name.map(str::to_string),
        })
        .into_ref()
    }

    /// Attach a source position.
    pub fn at(self: ExprRef, origin: Origin) -> ExprRef {
        let mut expr = Arc::unwrap_or_clone(self);
        expr.origin = origin;
        expr.into_ref()
    }

    pub fn if_(predicate: ExprRef, true_value: ExprRef, false_value: ExprRef) -> ExprRef {
        Self::new(ExprKind::If {
            predicate,
            true_value,
            false_value,
        })
        .into_ref()
    }

    pub fn case_when(branches: Vec<(ExprRef, ExprRef)>, else_value: Option<ExprRef>) -> ExprRef {
        Self::new(ExprKind::CaseWhen {
            branches,
            else_value,
        })
        .into_ref()
    }

    pub fn concat(children: Vec<ExprRef>) -> ExprRef {
        Self::new(ExprKind::Concat { children }).into_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_col_splits_name_parts() {
        let e = col("t.a.b");
        match &e.kind {
            ExprKind::UnresolvedAttribute { name_parts } => {
                assert_eq!(name_parts, &["t", "a", "b"]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!e.resolved());
    }

    #[test]
    fn test_expression_building() {
        let x = col_ref("x", DataType::Integer);
        let e = x.clone().add(lit(Value::Integer(1))).gt(lit(Value::Integer(3)));
        assert_eq!(e.sql(), "((x + 1) > 3)");
        assert_eq!(e.data_type(), DataType::Boolean);
        assert!(e.resolved());

        let aliased = x.alias("y");
        assert_eq!(aliased.name(), Some("y"));
        assert_eq!(aliased.sql(), "x AS y");
    }

    #[test]
    fn test_origin_is_not_part_of_equality() {
        let a = lit(Value::Integer(1));
        let b = lit(Value::Integer(1)).at(Origin::at(1, 4));
        assert_eq!(a, b);
        assert_eq!(b.origin, Origin::at(1, 4));
    }

    #[test]
    fn test_operator_builders() {
        let x = col_ref("x", DataType::Long);
        let one = || lit(Value::Long(1));
        assert_eq!(x.clone().sub(one()).sql(), "(x - 1L)");
        assert_eq!(x.clone().rem(one()).sql(), "(x % 1L)");

        let low = x.clone().lt(one());
        let high = x.lt_eq(one());
        let either = low.or(high);
        assert_eq!(either.sql(), "((x < 1L) OR (x <= 1L))");
        assert_eq!(either.data_type(), DataType::Boolean);
    }

    #[test]
    fn test_struct_field_access() {
        use quill_core::StructField;

        let point = col_ref(
            "p",
            DataType::Struct(vec![
                StructField::new("x", DataType::Integer, false),
                StructField::new("y", DataType::Double, true),
            ]),
        );
        let named = Arc::clone(&point).get_field(1, Some("y"));
        assert_eq!(named.sql(), "p.y");
        assert_eq!(named.data_type(), DataType::Double);
        assert!(named.nullable());

        let positional = point.get_field(0, None);
        assert_eq!(positional.sql(), "p[0]");
        assert_eq!(positional.data_type(), DataType::Integer);
    }

    #[test]
    fn test_resolution_is_cached_per_node() {
        let d = col_ref("d", DataType::Date);
        let cast = d.cast(DataType::Timestamp);
        assert!(!cast.resolved());
        assert!(!cast.resolved());

        // A zone-stamped copy is a new node and decides afresh.
        let zoned = cast.with_time_zone("UTC");
        assert!(zoned.resolved());
        assert!(!cast.resolved());
    }
}
