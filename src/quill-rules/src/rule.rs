//! Rule trait and execution reports.

use std::fmt;

use common_error::{QuillError, QuillResult};
use quill_logical::PlanRef;

use crate::metrics::MeteringSnapshot;

/// Upper bound (exclusive) on rule ids.
pub const MAX_RULE_ID: u8 = 192;

/// Small dense id a rule may reserve for per-node applicability bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(u8);

impl RuleId {
    pub fn new(id: u8) -> QuillResult<Self> {
        if id < MAX_RULE_ID {
            Ok(Self(id))
        } else {
            Err(QuillError::invalid_parameter(format!(
                "rule id {id} is out of range 0..{MAX_RULE_ID}"
            )))
        }
    }

    pub const fn id(self) -> u8 {
        self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named, pure plan rewrite.
///
/// `apply` must not depend on anything but its input and the rule's own
/// configuration, and must return its input unchanged (the same `Arc`, or
/// at least a `fast_equals` plan) once there is nothing left to rewrite.
pub trait Rule: Send + Sync {
    /// Stable name used in metrics and logs.
    fn name(&self) -> &'static str;

    fn rule_id(&self) -> Option<RuleId> {
        None
    }

    fn apply(&self, plan: PlanRef) -> QuillResult<PlanRef>;
}

impl fmt::Debug for dyn Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A trace entry for a single effective rule application.
#[derive(Debug, Clone)]
pub struct RuleTrace {
    pub batch: String,
    pub rule_name: String,
    /// The plan before the rule was applied (as tree string).
    pub before: String,
    /// The plan after the rule was applied (as tree string).
    pub after: String,
}

impl RuleTrace {
    pub fn new(
        batch: impl Into<String>,
        rule_name: impl Into<String>,
        before: impl Into<String>,
        after: impl Into<String>,
    ) -> Self {
        Self {
            batch: batch.into(),
            rule_name: rule_name.into(),
            before: before.into(),
            after: after.into(),
        }
    }
}

/// The result of a tracked execution.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// The final plan.
    pub plan: PlanRef,
    /// Iterations run per batch, in batch order.
    pub iterations: Vec<(String, usize)>,
    /// Metering counters accumulated during this call.
    pub metrics: MeteringSnapshot,
    /// Plan changes, if tracing was enabled.
    pub trace: Vec<RuleTrace>,
}

impl ExecutionReport {
    /// Number of effective rule applications.
    pub fn rules_applied(&self) -> u64 {
        self.metrics.total_effective_runs()
    }

    /// Format the trace as a human-readable string.
    pub fn format_trace(&self) -> String {
        let mut output = String::new();
        let batches = self
            .iterations
            .iter()
            .map(|(b, n)| format!("{b}: {n}"))
            .collect::<Vec<_>>()
            .join(", ");
        output.push_str(&format!(
            "Execution completed ({batches}), {} rules applied\n",
            self.rules_applied()
        ));

        if self.trace.is_empty() {
            output.push_str("  (no trace available)\n");
        } else {
            for (i, entry) in self.trace.iter().enumerate() {
                output.push_str(&format!(
                    "\n--- Rule {} applied: {} ({}) ---\n",
                    i + 1,
                    entry.rule_name,
                    entry.batch
                ));
                output.push_str("Before:\n");
                output.push_str(&entry.before);
                output.push_str("After:\n");
                output.push_str(&entry.after);
            }
        }

        output
    }
}
