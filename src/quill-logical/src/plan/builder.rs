//! Fluent construction of logical plans.

use common_error::Origin;

use super::{JoinType, LogicalPlan, PlanRef};
use crate::expr::{AttributeReference, ExprRef};

/// Builder for constructing logical plans fluently.
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    plan: PlanRef,
}

impl PlanBuilder {
    /// Start from a relation referenced by name; dots separate name parts.
    pub fn relation(name: &str) -> Self {
        Self {
            plan: LogicalPlan::unresolved_relation(name.split('.').map(str::to_string).collect()),
        }
    }

    /// Start from an in-memory relation.
    pub fn local(output: Vec<AttributeReference>) -> Self {
        Self {
            plan: LogicalPlan::local_relation(output),
        }
    }

    /// Start from a single empty row.
    pub fn one_row() -> Self {
        Self {
            plan: LogicalPlan::one_row_relation(),
        }
    }

    /// Continue from an existing plan.
    pub fn from_plan(plan: PlanRef) -> Self {
        Self { plan }
    }

    /// Add a filter.
    pub fn filter(self, condition: ExprRef) -> Self {
        Self {
            plan: LogicalPlan::filter(condition, self.plan),
        }
    }

    /// Add a project.
    pub fn project(self, project_list: Vec<ExprRef>) -> Self {
        Self {
            plan: LogicalPlan::project(project_list, self.plan),
        }
    }

    /// Name the current plan.
    pub fn alias(self, identifier: &str) -> Self {
        Self {
            plan: LogicalPlan::subquery_alias(identifier, self.plan),
        }
    }

    /// Join with `right`.
    pub fn join(self, right: PlanRef, join_type: JoinType, condition: Option<ExprRef>) -> Self {
        Self {
            plan: LogicalPlan::join(self.plan, right, join_type, condition),
        }
    }

    /// Attach a source position to the current top node.
    pub fn at(self, origin: Origin) -> Self {
        Self {
            plan: self.plan.at(origin),
        }
    }

    /// Build the final plan.
    pub fn build(self) -> PlanRef {
        self.plan
    }
}
