//! Bind column names to the attributes produced by an operator's children.

use std::sync::Arc;

use common_error::QuillResult;
use quill_logical::expr::{ExprKind, ExprRef};
use quill_logical::resolver::{resolve_attribute, resolver};
use quill_logical::{PlanKind, PlanRef, Resolver, TreeNode};
use quill_rules::{Rule, RuleId};

/// Resolves unresolved attributes once every child of their operator is
/// resolved.
///
/// Names that match nothing are left in place so that later iterations (or
/// the analysis checks) can deal with them. Nested field accesses keep their
/// generated alias only when they make up a whole projection item.
pub struct ResolveReferences {
    resolver: Resolver,
    rule_id: Option<RuleId>,
}

impl ResolveReferences {
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            resolver: resolver(case_sensitive),
            rule_id: None,
        }
    }

    pub fn with_rule_id(mut self, rule_id: Option<RuleId>) -> Self {
        self.rule_id = rule_id;
        self
    }

    fn resolve_node(&self, node: PlanRef) -> QuillResult<PlanRef> {
        if !node.children_resolved() || node.expressions().iter().all(|e| e.resolved()) {
            return Ok(node);
        }
        let input = node.children_output();
        let in_projection = matches!(node.kind(), PlanKind::Project { .. });
        node.try_map_expressions(|top: ExprRef| -> QuillResult<ExprRef> {
            Arc::clone(&top).try_transform_down(&mut |e: ExprRef| -> QuillResult<ExprRef> {
                let ExprKind::UnresolvedAttribute { name_parts } = &e.kind else {
                    return Ok(e);
                };
                match resolve_attribute(name_parts, &input, self.resolver, &e.origin)? {
                    Some(resolved) if in_projection && Arc::ptr_eq(&e, &top) => Ok(resolved),
                    Some(resolved) => Ok(trim_alias(resolved)),
                    None => Ok(e),
                }
            })
        })
    }
}

fn trim_alias(e: ExprRef) -> ExprRef {
    match &e.kind {
        ExprKind::Alias { child, .. } => Arc::clone(child),
        _ => e,
    }
}

impl Rule for ResolveReferences {
    fn name(&self) -> &'static str {
        "ResolveReferences"
    }

    fn rule_id(&self) -> Option<RuleId> {
        self.rule_id
    }

    fn apply(&self, plan: PlanRef) -> QuillResult<PlanRef> {
        plan.try_resolve_operators_up(&mut |node: PlanRef| self.resolve_node(node))
    }
}

#[cfg(test)]
mod tests {
    use quill_core::{DataType, StructField, Value};
    use quill_logical::expr::{col, lit, AttributeReference};
    use quill_logical::{JoinType, LogicalPlan, PlanBuilder};

    use super::*;

    fn relation(name: &str, columns: &[(&str, DataType)]) -> PlanRef {
        let attrs = columns
            .iter()
            .map(|(n, t)| AttributeReference::new(*n, t.clone(), true))
            .collect();
        LogicalPlan::subquery_alias(name, LogicalPlan::local_relation(attrs))
    }

    #[test]
    fn test_projection_resolves() {
        let plan = PlanBuilder::from_plan(relation("t", &[("x", DataType::Integer)]))
            .project(vec![col("X")])
            .build();
        let out = ResolveReferences::new(false).apply(plan).unwrap();
        assert!(out.resolved());
        assert_eq!(out.output()[0].name, "x");
    }

    #[test]
    fn test_case_sensitive_lookup_misses() {
        let plan = PlanBuilder::from_plan(relation("t", &[("x", DataType::Integer)]))
            .project(vec![col("X")])
            .build();
        let out = ResolveReferences::new(true).apply(Arc::clone(&plan)).unwrap();
        assert!(Arc::ptr_eq(&plan, &out));
    }

    #[test]
    fn test_waits_for_children() {
        let plan = PlanBuilder::relation("t").filter(col("x")).build();
        let out = ResolveReferences::new(false).apply(Arc::clone(&plan)).unwrap();
        assert!(Arc::ptr_eq(&plan, &out));
    }

    #[test]
    fn test_join_ambiguity() {
        let join = LogicalPlan::join(
            relation("a", &[("id", DataType::Integer)]),
            relation("b", &[("id", DataType::Integer)]),
            JoinType::Inner,
            None,
        );
        let rule = ResolveReferences::new(false);

        let ambiguous = PlanBuilder::from_plan(Arc::clone(&join)).project(vec![col("id")]).build();
        let err = rule.apply(ambiguous).unwrap_err();
        assert_eq!(err.error_class(), Some("AMBIGUOUS_REFERENCE"));

        let qualified = PlanBuilder::from_plan(join).project(vec![col("a.id")]).build();
        let out = rule.apply(qualified).unwrap();
        assert!(out.resolved());
        assert_eq!(out.output()[0].qualifier, vec!["a".to_string()]);
    }

    #[test]
    fn test_nested_field_alias_is_kept_only_at_top_level() {
        let point = DataType::Struct(vec![
            StructField::new("x", DataType::Integer, false),
            StructField::new("y", DataType::Integer, false),
        ]);
        let child = relation("t", &[("p", point)]);
        let rule = ResolveReferences::new(false);

        let project = PlanBuilder::from_plan(Arc::clone(&child))
            .project(vec![col("p.y")])
            .build();
        let out = rule.apply(project).unwrap();
        assert_eq!(out.output()[0].name, "y");
        assert_eq!(out.output()[0].data_type, DataType::Integer);

        let filter = PlanBuilder::from_plan(child)
            .filter(col("p.x").gt(lit(Value::Integer(0))))
            .build();
        let out = rule.apply(filter).unwrap();
        let condition = &out.expressions()[0];
        assert!(!condition.exists(&mut |e| matches!(e.kind, ExprKind::Alias { .. })));
        assert_eq!(condition.sql(), "(p.x > 0)");
    }
}
