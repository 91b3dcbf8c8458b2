//! Batch scheduler that runs rules over a plan until each batch settles.

use std::sync::Arc;
use std::time::Instant;

use common_config::AnalyzerConfig;
use common_error::{QuillError, QuillResult};
use log::{debug, log_enabled, trace, warn, Level};
use quill_logical::{PlanRef, TreeNode};

use crate::metrics::QueryExecutionMetering;
use crate::rule::{ExecutionReport, Rule, RuleTrace};

/// How often a batch runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// A single pass.
    Once,
    /// Repeat until the plan stops changing, at most `max_iterations` passes.
    FixedPoint {
        max_iterations: usize,
        /// Fail instead of warning when the budget runs out.
        error_on_exceed: bool,
        /// Setting a user can raise to allow more passes.
        max_iterations_setting: Option<String>,
    },
}

impl Strategy {
    pub fn fixed_point(max_iterations: usize) -> Self {
        Self::FixedPoint {
            max_iterations,
            error_on_exceed: false,
            max_iterations_setting: None,
        }
    }

    /// Fail with `MaxIterationsExceeded`, naming `setting`, when the budget
    /// runs out. No effect on `Once`.
    pub fn error_on_exceed(self, setting: Option<&str>) -> Self {
        match self {
            Self::Once => Self::Once,
            Self::FixedPoint { max_iterations, .. } => Self::FixedPoint {
                max_iterations,
                error_on_exceed: true,
                max_iterations_setting: setting.map(str::to_string),
            },
        }
    }

    pub const fn max_iterations(&self) -> usize {
        match self {
            Self::Once => 1,
            Self::FixedPoint { max_iterations, .. } => *max_iterations,
        }
    }
}

/// An ordered list of rules run under one strategy.
#[derive(Debug, Clone)]
pub struct Batch {
    pub name: String,
    pub strategy: Strategy,
    pub rules: Vec<Arc<dyn Rule>>,
}

impl Batch {
    pub fn new(name: impl Into<String>, strategy: Strategy, rules: Vec<Arc<dyn Rule>>) -> Self {
        Self {
            name: name.into(),
            strategy,
            rules,
        }
    }
}

/// Checks a plan change produced by a rule. Returns a description of what is
/// broken, or `None` if the change is acceptable.
pub trait PlanChangeValidator: Send + Sync {
    fn validate(&self, previous: &PlanRef, current: &PlanRef) -> Option<String>;
}

/// Runs batches of rules over a plan.
///
/// Every rule application is metered. In strict mode a `FixedPoint` batch
/// that does not converge is an error, and each `Once` batch is re-run on its
/// own output to check that it changes nothing.
pub struct RuleExecutor {
    batches: Vec<Batch>,
    config: AnalyzerConfig,
    metering: Arc<QueryExecutionMetering>,
    validator: Option<Arc<dyn PlanChangeValidator>>,
}

impl RuleExecutor {
    /// Create an executor metering into the process-wide instance.
    pub fn new(batches: Vec<Batch>) -> Self {
        Self {
            batches,
            config: AnalyzerConfig::default(),
            metering: QueryExecutionMetering::instance(),
            validator: None,
        }
    }

    pub fn with_config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_metering(mut self, metering: Arc<QueryExecutionMetering>) -> Self {
        self.metering = metering;
        self
    }

    /// Install a validator. It only runs when plan change validation is
    /// enabled in the configuration.
    pub fn with_validator(mut self, validator: Arc<dyn PlanChangeValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn metering(&self) -> &Arc<QueryExecutionMetering> {
        &self.metering
    }

    /// Run every batch in order and return the resulting plan.
    pub fn execute(&self, plan: PlanRef) -> QuillResult<PlanRef> {
        let mut run = Run::default();
        self.run(plan, &mut run)
    }

    /// Like [`RuleExecutor::execute`], also reporting per-batch iteration
    /// counts, the metrics of this call, and a trace of every plan change.
    pub fn execute_and_track(&self, plan: PlanRef) -> QuillResult<ExecutionReport> {
        let before = self.metering.snapshot();
        let mut run = Run {
            tracing: true,
            ..Run::default()
        };
        let plan = self.run(plan, &mut run)?;
        Ok(ExecutionReport {
            plan,
            iterations: run.iterations,
            metrics: self.metering.snapshot().diff(&before),
            trace: run.trace,
        })
    }

    fn validator(&self) -> Option<&Arc<dyn PlanChangeValidator>> {
        self.validator
            .as_ref()
            .filter(|_| self.config.validate_plan_changes)
    }

    fn run(&self, plan: PlanRef, run: &mut Run) -> QuillResult<PlanRef> {
        if let Some(validator) = self.validator() {
            if let Some(message) = validator.validate(&plan, &plan) {
                return Err(QuillError::internal(format!(
                    "the structural integrity of the input plan is broken: {message}"
                )));
            }
        }

        let mut current = plan;
        for batch in &self.batches {
            let batch_start = Arc::clone(&current);
            let max_iterations = batch.strategy.max_iterations();
            let mut iteration = 1;

            loop {
                let last = Arc::clone(&current);
                current = self.run_rules(batch, current, iteration, run)?;
                iteration += 1;

                if current.fast_equals(&last) {
                    debug!(
                        "Fixed point reached for batch {} after {} iterations.",
                        batch.name,
                        iteration - 1
                    );
                    break;
                }

                if iteration > max_iterations {
                    if let Strategy::FixedPoint {
                        error_on_exceed,
                        max_iterations_setting,
                        ..
                    } = &batch.strategy
                    {
                        if max_iterations > 1 {
                            if *error_on_exceed || self.config.strict_mode {
                                return Err(QuillError::MaxIterationsExceeded {
                                    batch: batch.name.clone(),
                                    max_iterations,
                                    setting: max_iterations_setting.clone(),
                                });
                            }
                            warn!(
                                "Max iterations ({max_iterations}) reached for batch {}",
                                batch.name
                            );
                        }
                    }
                    break;
                }
            }
            run.iterations.push((batch.name.clone(), iteration - 1));

            if self.config.strict_mode && batch.strategy == Strategy::Once {
                self.check_batch_idempotence(batch, &current)?;
            }

            if !batch_start.fast_equals(&current) {
                debug!("Batch {} changed the plan.", batch.name);
                if self.config.log_plan_changes && log_enabled!(Level::Trace) {
                    trace!(
                        "=== Result of Batch {} ===\n{}\n=== to ===\n{}",
                        batch.name,
                        batch_start.tree_string(),
                        current.tree_string()
                    );
                }
            } else {
                debug!("Batch {} has no effect.", batch.name);
            }
        }
        Ok(current)
    }

    fn run_rules(
        &self,
        batch: &Batch,
        plan: PlanRef,
        iteration: usize,
        run: &mut Run,
    ) -> QuillResult<PlanRef> {
        let mut current = plan;
        for rule in &batch.rules {
            let start = Instant::now();
            let result = rule.apply(Arc::clone(&current))?;
            let effective = !result.fast_equals(&current);
            self.metering.record(rule.name(), start.elapsed(), effective);

            if effective {
                debug!(
                    "Rule '{}' applied in batch {} iteration {}",
                    rule.name(),
                    batch.name,
                    iteration
                );
                if self.config.log_plan_changes && log_enabled!(Level::Trace) {
                    trace!(
                        "=== Applying Rule {} ===\n{}\n=== to ===\n{}",
                        rule.name(),
                        current.tree_string(),
                        result.tree_string()
                    );
                }
                if run.tracing {
                    run.trace.push(RuleTrace::new(
                        &batch.name,
                        rule.name(),
                        current.tree_string(),
                        result.tree_string(),
                    ));
                }
                if let Some(validator) = self.validator() {
                    if let Some(message) = validator.validate(&current, &result) {
                        return Err(QuillError::PlanValidation {
                            rule: rule.name().to_string(),
                            batch: batch.name.clone(),
                            message,
                        });
                    }
                }
            }
            current = result;
        }
        Ok(current)
    }

    fn check_batch_idempotence(&self, batch: &Batch, plan: &PlanRef) -> QuillResult<()> {
        let mut rerun = Arc::clone(plan);
        for rule in &batch.rules {
            rerun = rule.apply(rerun)?;
        }
        if rerun.fast_equals(plan) {
            Ok(())
        } else {
            Err(QuillError::IdempotenceViolation {
                batch: batch.name.clone(),
            })
        }
    }
}

/// Per-call bookkeeping.
#[derive(Default)]
struct Run {
    tracing: bool,
    iterations: Vec<(String, usize)>,
    trace: Vec<RuleTrace>,
}
