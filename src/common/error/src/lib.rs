//! Error types and result aliases for Quill.
//!
//! `QuillError` is the crate-wide error; semantic failures surfaced to users
//! travel inside it as [`AnalysisError`] values with a stable error class.

mod analysis;
mod error;

pub use analysis::{is_known_error_class, AnalysisError, Origin};
pub use error::{QuillError, QuillResult};
