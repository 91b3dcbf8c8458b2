//! Core error types for Quill.

use thiserror::Error;

use crate::analysis::{AnalysisError, Origin};

/// Result type alias using `QuillError`.
pub type QuillResult<T> = std::result::Result<T, QuillError>;

/// Core error type for Quill operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuillError {
    /// User-facing semantic error with a stable error class.
    #[error("{0}")]
    Analysis(Box<AnalysisError>),

    /// Internal error (bug in Quill). `context` carries plan trees or query
    /// fragments useful for diagnosis.
    #[error("InternalError: {message}{}", render_context(.context))]
    InternalError {
        message: String,
        context: Option<String>,
    },

    /// Invalid parameter provided.
    #[error("InvalidParameter: {0}")]
    InvalidParameter(String),

    /// A fixed-point batch did not converge within its iteration budget.
    #[error(
        "MaxIterationsExceeded: max iterations ({max_iterations}) reached for batch {batch}{}",
        render_setting(.setting, .max_iterations)
    )]
    MaxIterationsExceeded {
        batch: String,
        max_iterations: usize,
        setting: Option<String>,
    },

    /// A run-once batch changed the plan when re-applied to its own output.
    #[error("IdempotenceViolation: once strategy's idempotence is broken for batch {batch}")]
    IdempotenceViolation { batch: String },

    /// The plan-change validator rejected the output of a rule.
    #[error("PlanValidation: the structural integrity of the plan is broken after applying rule {rule} in batch {batch}: {message}")]
    PlanValidation {
        rule: String,
        batch: String,
        message: String,
    },
}

fn render_context(context: &Option<String>) -> String {
    match context {
        Some(ctx) if !ctx.is_empty() => format!("\n{ctx}"),
        _ => String::new(),
    }
}

fn render_setting(setting: &Option<String>, max_iterations: &usize) -> String {
    match setting {
        Some(key) => format!(
            ", please set '{key}' to a larger value than {max_iterations}"
        ),
        None => String::new(),
    }
}

impl QuillError {
    /// Create a new analysis error of the given class.
    pub fn analysis<C, I, K, V>(error_class: C, params: I, origin: Origin) -> Self
    where
        C: Into<String>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Analysis(Box::new(AnalysisError::new(error_class, params, origin)))
    }

    /// Create a new `InternalError` without context.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::InternalError {
            message: msg.into(),
            context: None,
        }
    }

    /// Create a new `InternalError` with diagnostic context attached.
    pub fn internal_with_context<S: Into<String>, C: Into<String>>(msg: S, context: C) -> Self {
        Self::InternalError {
            message: msg.into(),
            context: Some(context.into()),
        }
    }

    /// Create a new `InvalidParameter` error.
    pub fn invalid_parameter<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// The analysis error, if this is one.
    pub fn as_analysis(&self) -> Option<&AnalysisError> {
        match self {
            Self::Analysis(err) => Some(err),
            _ => None,
        }
    }

    /// The error class of an analysis error.
    pub fn error_class(&self) -> Option<&str> {
        self.as_analysis().map(|e| e.error_class.as_str())
    }

    /// Whether this is an internal error.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::InternalError { .. })
    }
}

impl From<AnalysisError> for QuillError {
    fn from(err: AnalysisError) -> Self {
        Self::Analysis(Box::new(err))
    }
}

/// Return early with an `InternalError`.
#[macro_export]
macro_rules! internal_err {
    ($($arg:tt)*) => {
        return Err($crate::QuillError::internal(format!($($arg)*)))
    };
}
