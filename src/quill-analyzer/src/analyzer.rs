//! The analyzer: resolution rules run to a fixed point, then the analysis
//! checks.

use std::sync::Arc;

use common_config::{validate_time_zone, QuillConfig, SessionConfig, ANALYZER_MAX_ITERATIONS_KEY};
use common_error::QuillResult;
use log::debug;
use quill_logical::PlanRef;
use quill_rules::{
    Batch, ExecutionReport, QueryExecutionMetering, Rule, RuleExecutor, RuleId, Strategy,
};

use crate::catalog::RelationCatalog;
use crate::check::check_analysis;
use crate::coercion::type_coercion_rules;
use crate::registry::FunctionRegistry;
use crate::rules::{
    ResolveAliases, ResolveFunctions, ResolveReferences, ResolveRelations, ResolveTimeZone,
};
use crate::validator::PlanIntegrity;

/// Name of the single batch the analyzer runs.
pub const RESOLUTION_BATCH: &str = "Resolution";

/// Turns a parsed, unresolved plan into a resolved and type-checked one.
///
/// # Rule order
///
/// All rules live in one fixed-point batch:
///
/// 1. `ResolveRelations`
/// 2. `ResolveReferences`
/// 3. `ResolveFunctions`
/// 4. `ResolveAliases`
/// 5. `ResolveTimeZone`
/// 6. The type coercion rules
///
/// Each rule only touches operators whose children are already resolved, so
/// resolution spreads upward one level per iteration at worst.
///
/// The analyzer is immutable once built and can be shared between threads.
pub struct Analyzer {
    executor: RuleExecutor,
    config: QuillConfig,
}

impl Analyzer {
    /// Build an analyzer over `catalog` and `functions`. Fails if the session
    /// time zone is not a valid zone id.
    pub fn new(
        catalog: Arc<dyn RelationCatalog>,
        functions: Arc<FunctionRegistry>,
        config: QuillConfig,
    ) -> QuillResult<Self> {
        validate_time_zone(&config.session.time_zone)?;

        let mut rules: Vec<Arc<dyn Rule>> = vec![
            Arc::new(ResolveRelations::new(catalog).with_rule_id(RuleId::new(0).ok())),
            Arc::new(
                ResolveReferences::new(config.session.case_sensitive)
                    .with_rule_id(RuleId::new(1).ok()),
            ),
            Arc::new(ResolveFunctions::new(functions).with_rule_id(RuleId::new(2).ok())),
            Arc::new(ResolveAliases::new().with_rule_id(RuleId::new(3).ok())),
            Arc::new(
                ResolveTimeZone::new(config.session.time_zone.clone())
                    .with_rule_id(RuleId::new(4).ok()),
            ),
        ];
        rules.extend(type_coercion_rules(&config.session));

        let strategy = Strategy::fixed_point(config.analyzer.max_iterations)
            .error_on_exceed(Some(ANALYZER_MAX_ITERATIONS_KEY));
        let executor = RuleExecutor::new(vec![Batch::new(RESOLUTION_BATCH, strategy, rules)])
            .with_config(config.analyzer.clone())
            .with_validator(Arc::new(PlanIntegrity));

        debug!(
            "Analyzer created: ansi={}, case_sensitive={}, time_zone={}, max_iterations={}",
            config.session.ansi_enabled,
            config.session.case_sensitive,
            config.session.time_zone,
            config.analyzer.max_iterations
        );
        Ok(Self { executor, config })
    }

    /// Meter rule applications into `metering` instead of the process-wide
    /// instance.
    pub fn with_metering(mut self, metering: Arc<QueryExecutionMetering>) -> Self {
        self.executor = self.executor.with_metering(metering);
        self
    }

    pub fn config(&self) -> &QuillConfig {
        &self.config
    }

    pub fn metering(&self) -> &Arc<QueryExecutionMetering> {
        self.executor.metering()
    }

    /// Names of the rules, in the order they run.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.executor
            .batches()
            .iter()
            .flat_map(|b| b.rules.iter().map(|r| r.name()))
            .collect()
    }

    /// Run the resolution batch. An already analyzed plan is returned as is.
    ///
    /// The result may still contain unresolved pieces; use
    /// [`Analyzer::execute_and_check`] to get a user-facing error for those.
    pub fn execute(&self, plan: PlanRef) -> QuillResult<PlanRef> {
        if plan.analyzed() {
            return Ok(plan);
        }
        self.executor.execute(plan)
    }

    /// Run the resolution batch and the analysis checks, marking the result
    /// analyzed.
    pub fn execute_and_check(&self, plan: PlanRef) -> QuillResult<PlanRef> {
        let analyzed = self.execute(plan)?;
        check_analysis(&analyzed, self.config.session.case_sensitive)?;
        Ok(analyzed)
    }

    /// Like [`Analyzer::execute_and_check`], also reporting iteration counts,
    /// metrics, and a trace of every plan change.
    pub fn execute_and_track(&self, plan: PlanRef) -> QuillResult<ExecutionReport> {
        let report = self.executor.execute_and_track(plan)?;
        check_analysis(&report.plan, self.config.session.case_sensitive)?;
        Ok(report)
    }
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("rules", &self.rule_names())
            .field("config", &self.config)
            .finish()
    }
}

/// A coercion rule by name, for callers assembling their own batches.
pub fn coercion_rule(name: &str, session: &SessionConfig) -> Option<Arc<dyn Rule>> {
    type_coercion_rules(session)
        .into_iter()
        .find(|r| r.name() == name)
}
