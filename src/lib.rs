//! Quill - semantic analysis core of a SQL query compiler
//!
//! Quill turns the unresolved logical plan a parser produces into a resolved,
//! type-checked plan: relations and columns are bound, functions are looked
//! up, implicit casts are inserted, and anything left over is reported as an
//! analysis error with a stable error class.

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

// Re-export core crates
pub use common_config as config;
pub use common_display as display;
pub use common_error as error;
pub use quill_analyzer as analyzer;
pub use quill_core as core;
pub use quill_logical as logical;
pub use quill_rules as rules;

/// Quill version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
