//! Rule scheduling for Quill plans.
//!
//! Provides the [`Rule`] abstraction, batches of rules with a [`Strategy`],
//! and the [`RuleExecutor`] that runs them to a fixed point while metering
//! every application.

mod executor;
mod metrics;
mod rule;

pub use executor::{Batch, PlanChangeValidator, RuleExecutor, Strategy};
pub use metrics::{MeteringSnapshot, QueryExecutionMetering, RuleMetrics};
pub use rule::{ExecutionReport, Rule, RuleId, RuleTrace, MAX_RULE_ID};
