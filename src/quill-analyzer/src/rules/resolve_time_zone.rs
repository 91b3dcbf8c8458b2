//! Fill in the session time zone where an expression needs one.

use common_error::QuillResult;
use quill_logical::expr::ExprRef;
use quill_logical::PlanRef;
use quill_rules::{Rule, RuleId};

/// Stamps the session zone on time-zone-aware expressions that lack one.
pub struct ResolveTimeZone {
    time_zone: String,
    rule_id: Option<RuleId>,
}

impl ResolveTimeZone {
    pub fn new(time_zone: impl Into<String>) -> Self {
        Self {
            time_zone: time_zone.into(),
            rule_id: None,
        }
    }

    pub fn with_rule_id(mut self, rule_id: Option<RuleId>) -> Self {
        self.rule_id = rule_id;
        self
    }
}

impl Rule for ResolveTimeZone {
    fn name(&self) -> &'static str {
        "ResolveTimeZone"
    }

    fn rule_id(&self) -> Option<RuleId> {
        self.rule_id
    }

    fn apply(&self, plan: PlanRef) -> QuillResult<PlanRef> {
        Ok(plan.resolve_operators_up(&mut |node: PlanRef| {
            node.transform_expressions_up(&mut |e: ExprRef| {
                if e.needs_time_zone() {
                    e.with_time_zone(&self.time_zone).into_ref()
                } else {
                    e
                }
            })
        }))
    }
}
