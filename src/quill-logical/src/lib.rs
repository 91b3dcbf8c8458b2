//! Logical trees for Quill.
//!
//! `quill-logical` holds the trees the analyzer works on:
//!
//! - **Tree substrate** ([`tree`]): immutable, `Arc`-shared nodes with
//!   identity-preserving rewrites.
//! - **Expressions** ([`expr`]): unresolved placeholders produced by a parser
//!   and the resolved forms that replace them.
//! - **Logical plans** ([`plan`]): relational operators with memoized
//!   resolution state and output schemas.
//! - **Name resolution** ([`resolver`]): binding multi-part names to the
//!   attributes a plan produces.
//!
//! # Example
//!
//! ```rust
//! use quill_core::{DataType, Value};
//! use quill_logical::expr::{lit, AttributeReference};
//! use quill_logical::PlanBuilder;
//!
//! let x = AttributeReference::new("x", DataType::Integer, false);
//! let plan = PlanBuilder::local(vec![x.clone()])
//!     .filter(x.to_expr().gt(lit(Value::Integer(0))))
//!     .project(vec![x.to_expr()])
//!     .build();
//!
//! assert!(plan.resolved());
//! println!("{}", plan.tree_string());
//! ```

pub mod expr;
pub mod plan;
pub mod resolver;
pub mod tree;

pub use plan::{JoinType, LogicalPlan, PlanBuilder, PlanKind, PlanRef};
pub use resolver::Resolver;
pub use tree::TreeNode;

pub use expr::{col, func, lit, Expr, ExprKind, ExprRef};
