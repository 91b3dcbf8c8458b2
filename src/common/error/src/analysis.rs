//! Structured analysis errors and source positions.
//!
//! Analysis errors carry a stable error class (e.g. `UNRESOLVED_COLUMN`), a set
//! of named message parameters and the [`Origin`] of the offending node. The
//! human-readable message is rendered from an embedded error-class catalog.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Source position of a tree node, as recorded by the parser.
///
/// Origins are carried alongside nodes but never take part in node equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Origin {
    /// 1-based line of the first token.
    pub line: Option<usize>,
    /// 0-based column of the first token within its line.
    pub start_position: Option<usize>,
    /// Character offset of the first token within `sql_text`.
    pub start_index: Option<usize>,
    /// Character offset of the last token within `sql_text` (inclusive).
    pub stop_index: Option<usize>,
    /// The full query text the node was parsed from.
    pub sql_text: Option<String>,
}

impl Origin {
    /// An origin pointing at a line and column without query text.
    pub fn at(line: usize, start_position: usize) -> Self {
        Self {
            line: Some(line),
            start_position: Some(start_position),
            ..Self::default()
        }
    }

    /// Attach the query text and the character span of the fragment.
    pub fn with_fragment(mut self, sql_text: impl Into<String>, start: usize, stop: usize) -> Self {
        self.sql_text = Some(sql_text.into());
        self.start_index = Some(start);
        self.stop_index = Some(stop);
        self
    }

    /// Whether no position information is present.
    pub fn is_empty(&self) -> bool {
        self.line.is_none()
            && self.start_position.is_none()
            && self.start_index.is_none()
            && self.stop_index.is_none()
            && self.sql_text.is_none()
    }

    /// The query fragment covered by this origin, if the span is known.
    pub fn fragment(&self) -> Option<&str> {
        let text = self.sql_text.as_deref()?;
        let start = self.start_index?;
        let stop = self.stop_index?;
        if start > stop {
            return None;
        }
        let begin = text.char_indices().nth(start).map(|(i, _)| i)?;
        let end = text
            .char_indices()
            .nth(stop + 1)
            .map_or(text.len(), |(i, _)| i);
        text.get(begin..end)
    }

    /// A short summary of where in the query the error occurred.
    pub fn query_context(&self) -> String {
        let mut out = String::new();
        match (self.line, self.start_position) {
            (Some(line), Some(pos)) => out.push_str(&format!("== SQL (line {line}, position {}) ==", pos + 1)),
            (Some(line), None) => out.push_str(&format!("== SQL (line {line}) ==")),
            _ => {}
        }
        if let Some(fragment) = self.fragment() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(fragment);
        }
        out
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorClassInfo {
    message: String,
    #[serde(rename = "sqlState")]
    sql_state: Option<String>,
}

const ERROR_CLASSES_JSON: &str = include_str!("error_classes.json");

fn error_classes() -> &'static HashMap<String, ErrorClassInfo> {
    static CLASSES: OnceLock<HashMap<String, ErrorClassInfo>> = OnceLock::new();
    CLASSES.get_or_init(|| serde_json::from_str(ERROR_CLASSES_JSON).unwrap_or_default())
}

/// Whether the catalog knows the given error class.
pub fn is_known_error_class(error_class: &str) -> bool {
    error_classes().contains_key(error_class)
}

/// A user-facing semantic error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisError {
    /// Stable error class, optionally with a `.SUB_CLASS` suffix.
    pub error_class: String,
    /// Named message parameters, substituted into the catalog template.
    pub message_parameters: BTreeMap<String, String>,
    /// Position of the offending node.
    pub origin: Origin,
}

impl AnalysisError {
    /// Create a new analysis error.
    pub fn new<C, I, K, V>(error_class: C, params: I, origin: Origin) -> Self
    where
        C: Into<String>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            error_class: error_class.into(),
            message_parameters: params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            origin,
        }
    }

    /// Look up a message parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.message_parameters.get(name).map(String::as_str)
    }

    /// The SQLSTATE registered for this error class.
    pub fn sql_state(&self) -> Option<&'static str> {
        error_classes()
            .get(&self.error_class)
            .and_then(|info| info.sql_state.as_deref())
    }

    /// Render the message body without the class prefix.
    ///
    /// Unknown classes fall back to listing their parameters.
    pub fn message(&self) -> String {
        let Some(info) = error_classes().get(&self.error_class) else {
            return self
                .message_parameters
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(", ");
        };
        let mut message = info.message.clone();
        for (name, value) in &self.message_parameters {
            message = message.replace(&format!("<{name}>"), value);
        }
        message
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.error_class, self.message())?;
        match (self.origin.line, self.origin.start_position) {
            (Some(line), Some(pos)) => write!(f, "; line {line} pos {pos}")?,
            (Some(line), None) => write!(f, "; line {line}")?,
            _ => {}
        }
        if self.origin.fragment().is_some() {
            write!(f, "\n{}", self.origin.query_context())?;
        }
        Ok(())
    }
}

impl std::error::Error for AnalysisError {}
