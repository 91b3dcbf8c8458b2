//! Name the unnamed items of a projection.

use common_error::QuillResult;
use quill_logical::expr::{ExprKind, ExprRef};
use quill_logical::{PlanKind, PlanRef};
use quill_rules::{Rule, RuleId};

/// Gives every resolved projection item a name: named expressions keep
/// theirs, a cast of a named expression borrows the name of what it casts,
/// and anything else is named after its SQL text.
#[derive(Debug, Default)]
pub struct ResolveAliases {
    rule_id: Option<RuleId>,
}

impl ResolveAliases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule_id(mut self, rule_id: Option<RuleId>) -> Self {
        self.rule_id = rule_id;
        self
    }
}

fn needs_alias(e: &ExprRef) -> bool {
    match &e.kind {
        ExprKind::UnresolvedAlias { child } => child.resolved(),
        _ => e.resolved() && !e.is_named(),
    }
}

fn alias_for(e: &ExprRef) -> ExprRef {
    if e.is_named() {
        return ExprRef::clone(e);
    }
    let name = match &e.kind {
        ExprKind::Cast { child, .. } if child.is_named() => {
            child.name().map(str::to_string).unwrap_or_else(|| e.sql())
        }
        _ => e.sql(),
    };
    ExprRef::clone(e).alias(&name)
}

fn assign_alias(e: ExprRef) -> ExprRef {
    if !needs_alias(&e) {
        return e;
    }
    let named = match &e.kind {
        ExprKind::UnresolvedAlias { child } => alias_for(child),
        _ => alias_for(&e),
    };
    named.at(e.origin.clone())
}

impl Rule for ResolveAliases {
    fn name(&self) -> &'static str {
        "ResolveAliases"
    }

    fn rule_id(&self) -> Option<RuleId> {
        self.rule_id
    }

    fn apply(&self, plan: PlanRef) -> QuillResult<PlanRef> {
        Ok(plan.resolve_operators_up(&mut |node: PlanRef| match node.kind() {
            PlanKind::Project {
                project_list,
                child,
            } if child.resolved() && project_list.iter().any(needs_alias) => {
                node.map_expressions(assign_alias)
            }
            _ => node,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quill_core::{DataType, Value};
    use quill_logical::expr::{col, lit, AttributeReference};
    use quill_logical::{LogicalPlan, PlanBuilder};

    use super::*;

    fn names(plan: &PlanRef) -> Vec<String> {
        plan.output().into_iter().map(|a| a.name).collect()
    }

    #[test]
    fn test_generated_names() {
        let x = AttributeReference::new("x", DataType::Integer, false);
        let plan = PlanBuilder::local(vec![x.clone()])
            .project(vec![
                x.to_expr().unresolved_alias(),
                x.to_expr().cast(DataType::Long).unresolved_alias(),
                x.to_expr().add(lit(Value::Integer(1))).unresolved_alias(),
                lit(Value::Integer(7)),
                x.to_expr().alias("kept"),
            ])
            .build();
        let out = ResolveAliases::new().apply(plan).unwrap();
        assert!(out.resolved());
        assert_eq!(names(&out), vec!["x", "x", "(x + 1)", "7", "kept"]);
    }

    #[test]
    fn test_named_item_passes_through_with_same_id() {
        let x = AttributeReference::new("x", DataType::Integer, false);
        let plan = PlanBuilder::local(vec![x.clone()])
            .project(vec![x.to_expr().unresolved_alias()])
            .build();
        let out = ResolveAliases::new().apply(plan).unwrap();
        assert_eq!(out.output()[0].expr_id, x.expr_id);
    }

    #[test]
    fn test_waits_for_resolution() {
        let plan = LogicalPlan::project(
            vec![col("x").unresolved_alias()],
            LogicalPlan::one_row_relation(),
        );
        let out = ResolveAliases::new().apply(Arc::clone(&plan)).unwrap();
        assert!(Arc::ptr_eq(&plan, &out));
    }
}
