//! Semantic analysis for Quill.
//!
//! The [`Analyzer`] takes the unresolved plan a parser produces and runs the
//! resolution rules to a fixed point: relations are looked up in a
//! [`RelationCatalog`], column names are bound to attributes, function calls
//! are bound through the [`FunctionRegistry`], projection items get names,
//! and the coercion rules insert casts. [`check_analysis`] then turns whatever
//! is left unresolved or ill-typed into a user-facing analysis error.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use common_config::QuillConfig;
//! use quill_analyzer::{Analyzer, FunctionRegistry, TempViewRegistry};
//! use quill_core::DataType;
//! use quill_logical::expr::{col, AttributeReference};
//! use quill_logical::{LogicalPlan, PlanBuilder};
//!
//! let views = TempViewRegistry::new(false);
//! let t = LogicalPlan::local_relation(vec![AttributeReference::new("x", DataType::Integer, false)]);
//! views.create("t", t, false).unwrap();
//!
//! let analyzer = Analyzer::new(
//!     Arc::new(views),
//!     Arc::new(FunctionRegistry::builtin()),
//!     QuillConfig::default(),
//! )
//! .unwrap();
//!
//! let plan = PlanBuilder::relation("t").project(vec![col("x")]).build();
//! let analyzed = analyzer.execute_and_check(plan).unwrap();
//! assert!(analyzed.analyzed());
//! ```

mod analyzer;
mod catalog;
mod check;
pub mod coercion;
mod registry;
pub mod rules;
mod validator;

pub use analyzer::{coercion_rule, Analyzer, RESOLUTION_BATCH};
pub use catalog::{RelationCatalog, TempViewRegistry};
pub use check::check_analysis;
pub use coercion::{type_coercion_rules, TypeCoercionRule};
pub use registry::{
    scalar_function, unresolved_routine, FunctionBuilder, FunctionInfo, FunctionRegistry,
    SEARCH_PATH,
};
pub use validator::PlanIntegrity;
