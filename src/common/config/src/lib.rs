//! Configuration management for Quill.
//!
//! Provides session settings (ANSI mode, identifier case sensitivity, time
//! zone) and analyzer settings (iteration budget, strict checks, plan-change
//! validation and logging). Settings can be addressed by their string keys.

use common_error::{Origin, QuillError, QuillResult};
use serde::{Deserialize, Serialize};

/// Key for [`SessionConfig::ansi_enabled`].
pub const ANSI_ENABLED_KEY: &str = "quill.sql.ansi.enabled";
/// Key for [`SessionConfig::case_sensitive`].
pub const CASE_SENSITIVE_KEY: &str = "quill.sql.caseSensitive";
/// Key for [`SessionConfig::time_zone`].
pub const SESSION_TIME_ZONE_KEY: &str = "quill.sql.session.timeZone";
/// Key for [`AnalyzerConfig::max_iterations`].
pub const ANALYZER_MAX_ITERATIONS_KEY: &str = "quill.analyzer.maxIterations";
/// Key for [`AnalyzerConfig::strict_mode`].
pub const STRICT_MODE_KEY: &str = "quill.analyzer.strictMode";
/// Key for [`AnalyzerConfig::validate_plan_changes`].
pub const VALIDATE_PLAN_CHANGES_KEY: &str = "quill.analyzer.validatePlanChanges";
/// Key for [`AnalyzerConfig::log_plan_changes`].
pub const LOG_PLAN_CHANGES_KEY: &str = "quill.analyzer.logPlanChanges";

/// Global Quill configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuillConfig {
    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,
    /// Analyzer configuration.
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
}

/// Per-session SQL semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// ANSI mode disables the lenient string and boolean coercions.
    pub ansi_enabled: bool,
    /// Whether identifiers are matched case-sensitively.
    pub case_sensitive: bool,
    /// Zone id given to time-zone-aware expressions that lack one.
    pub time_zone: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ansi_enabled: false,
            case_sensitive: false,
            time_zone: "UTC".to_string(),
        }
    }
}

/// Rule scheduling settings used by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Iteration budget of fixed-point batches.
    pub max_iterations: usize,
    /// Strict mode turns non-convergence into an error and checks that
    /// run-once batches are idempotent.
    pub strict_mode: bool,
    /// Validate the plan after every effective rule application.
    pub validate_plan_changes: bool,
    /// Emit before/after plan trees at trace level for every effective rule.
    pub log_plan_changes: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            strict_mode: false,
            validate_plan_changes: false,
            log_plan_changes: false,
        }
    }
}

impl AnalyzerConfig {
    /// Create a new config with the given max iterations.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Enable or disable strict mode.
    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    /// Enable or disable plan-change validation.
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate_plan_changes = validate;
        self
    }
}

impl QuillConfig {
    /// Set a configuration value by key.
    pub fn set(&mut self, key: &str, value: &str) -> QuillResult<()> {
        match key {
            ANSI_ENABLED_KEY => self.session.ansi_enabled = parse_bool(key, value)?,
            CASE_SENSITIVE_KEY => self.session.case_sensitive = parse_bool(key, value)?,
            SESSION_TIME_ZONE_KEY => {
                validate_time_zone(value)?;
                self.session.time_zone = value.to_string();
            }
            ANALYZER_MAX_ITERATIONS_KEY => {
                let max = value.trim().parse::<usize>().map_err(|_| {
                    QuillError::invalid_parameter(format!(
                        "'{key}' expects a positive integer, got '{value}'"
                    ))
                })?;
                if max == 0 {
                    return Err(QuillError::invalid_parameter(format!(
                        "'{key}' must be at least 1"
                    )));
                }
                self.analyzer.max_iterations = max;
            }
            STRICT_MODE_KEY => self.analyzer.strict_mode = parse_bool(key, value)?,
            VALIDATE_PLAN_CHANGES_KEY => {
                self.analyzer.validate_plan_changes = parse_bool(key, value)?;
            }
            LOG_PLAN_CHANGES_KEY => self.analyzer.log_plan_changes = parse_bool(key, value)?,
            _ => {
                return Err(QuillError::invalid_parameter(format!(
                    "unknown configuration key '{key}'"
                )))
            }
        }
        Ok(())
    }

    /// Get a configuration value by key, rendered as a string.
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            ANSI_ENABLED_KEY => self.session.ansi_enabled.to_string(),
            CASE_SENSITIVE_KEY => self.session.case_sensitive.to_string(),
            SESSION_TIME_ZONE_KEY => self.session.time_zone.clone(),
            ANALYZER_MAX_ITERATIONS_KEY => self.analyzer.max_iterations.to_string(),
            STRICT_MODE_KEY => self.analyzer.strict_mode.to_string(),
            VALIDATE_PLAN_CHANGES_KEY => self.analyzer.validate_plan_changes.to_string(),
            LOG_PLAN_CHANGES_KEY => self.analyzer.log_plan_changes.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// All recognised keys.
    pub fn keys() -> &'static [&'static str] {
        &[
            ANSI_ENABLED_KEY,
            CASE_SENSITIVE_KEY,
            SESSION_TIME_ZONE_KEY,
            ANALYZER_MAX_ITERATIONS_KEY,
            STRICT_MODE_KEY,
            VALIDATE_PLAN_CHANGES_KEY,
            LOG_PLAN_CHANGES_KEY,
        ]
    }
}

fn parse_bool(key: &str, value: &str) -> QuillResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(QuillError::invalid_parameter(format!(
            "'{key}' expects a boolean, got '{value}'"
        ))),
    }
}

/// Check that a zone id is `UTC`, `Z`, a `+HH:MM`/`-HH:MM` offset, or a
/// region id of the form `Area/City`.
pub fn validate_time_zone(zone: &str) -> QuillResult<()> {
    if is_valid_time_zone(zone) {
        Ok(())
    } else {
        Err(QuillError::analysis(
            "INVALID_TIME_ZONE",
            [("timeZone", format!("'{zone}'"))],
            Origin::default(),
        ))
    }
}

fn is_valid_time_zone(zone: &str) -> bool {
    if zone == "UTC" || zone == "Z" || zone == "GMT" {
        return true;
    }
    if let Some(offset) = zone.strip_prefix('+').or_else(|| zone.strip_prefix('-')) {
        let Some((hh, mm)) = offset.split_once(':') else {
            return false;
        };
        let two_digits = |s: &str| s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit());
        return two_digits(hh)
            && two_digits(mm)
            && hh.parse::<u32>().is_ok_and(|h| h <= 18)
            && mm.parse::<u32>().is_ok_and(|m| m < 60);
    }
    let mut parts = zone.split('/');
    let region_part = |s: &str| {
        !s.is_empty()
            && s.chars().next().is_some_and(|c| c.is_ascii_uppercase())
            && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    };
    match (parts.next(), parts.next()) {
        (Some(area), Some(city)) => region_part(area) && region_part(city) && parts.all(region_part),
        _ => false,
    }
}
