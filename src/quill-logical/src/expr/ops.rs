//! Operators of built-in binary expressions.

use quill_core::AbstractDataType;
use quill_core::DataType;
use serde::{Deserialize, Serialize};

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithmeticOp {
    /// Addition (+)
    Add,
    /// Subtraction (-)
    Subtract,
    /// Multiplication (*)
    Multiply,
    /// Fractional division (/)
    Divide,
    /// Integral division (DIV), always producing a 64-bit integer.
    IntegralDivide,
    /// Remainder (%)
    Remainder,
}

impl ArithmeticOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::IntegralDivide => "div",
            Self::Remainder => "%",
        }
    }

    /// The operand type this operator accepts once both sides agree.
    pub fn input_type(self) -> AbstractDataType {
        match self {
            Self::Divide => AbstractDataType::one_of([
                DataType::Double.into(),
                AbstractDataType::AnyDecimal,
            ]),
            Self::IntegralDivide => AbstractDataType::one_of([
                DataType::Long.into(),
                AbstractDataType::AnyDecimal,
            ]),
            _ => AbstractDataType::AnyNumeric,
        }
    }

    /// Division by zero yields `NULL`.
    pub const fn may_produce_null(self) -> bool {
        matches!(self, Self::Divide | Self::IntegralDivide | Self::Remainder)
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    /// Equality (=)
    EqualTo,
    /// Null-safe equality (<=>)
    EqualNullSafe,
    /// Less than (<)
    LessThan,
    /// Less than or equal (<=)
    LessThanOrEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal (>=)
    GreaterThanOrEqual,
}

impl ComparisonOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::EqualTo => "=",
            Self::EqualNullSafe => "<=>",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
        }
    }

    pub const fn is_equality(self) -> bool {
        matches!(self, Self::EqualTo | Self::EqualNullSafe)
    }
}

/// Boolean connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BooleanOp {
    And,
    Or,
}

impl BooleanOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}
