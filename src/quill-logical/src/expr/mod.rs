//! Expression trees for logical plans.

mod builder;
#[allow(clippy::module_inception)]
mod expr;
mod function;
mod ops;
mod type_check;

pub use builder::{col, col_parts, col_ref, func, lit, typed_null};
pub use expr::{quote_identifier, to_sql_id, AttributeReference, Expr, ExprKind, ExprRef};
pub use function::{FunctionSignature, ReturnType};
pub use ops::{ArithmeticOp, BooleanOp, ComparisonOp};
pub use type_check::TypeCheckFailure;
