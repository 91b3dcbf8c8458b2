//! Logical plans.

mod builder;
#[allow(clippy::module_inception)]
mod plan;

pub use builder::PlanBuilder;
pub use plan::{JoinType, LogicalPlan, PlanKind, PlanRef};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quill_core::{DataType, Value};

    use super::*;
    use crate::expr::{col, col_ref, lit, AttributeReference, ExprKind};
    use crate::tree::TreeNode;

    fn people() -> (AttributeReference, AttributeReference, PlanRef) {
        let id = AttributeReference::new("id", DataType::Integer, false);
        let name = AttributeReference::new("name", DataType::String, true);
        let plan = LogicalPlan::local_relation(vec![id.clone(), name.clone()]);
        (id, name, plan)
    }

    #[test]
    fn test_plan_builder() {
        let plan = PlanBuilder::relation("db.people")
            .filter(col("age").gt(lit(Value::Integer(18))))
            .project(vec![col("name")])
            .build();

        assert_eq!(plan.node_count(), 3);
        assert!(!plan.resolved());
        match plan.children()[0].children()[0].kind() {
            PlanKind::UnresolvedRelation {
                multipart_identifier,
            } => assert_eq!(multipart_identifier, &["db", "people"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_resolved_plan() {
        let (id, _, rel) = people();
        let plan = PlanBuilder::from_plan(rel)
            .filter(id.to_expr().gt(lit(Value::Integer(1))))
            .build();
        assert!(plan.resolved());
        assert!(plan.missing_input().is_empty());
    }

    #[test]
    fn test_plan_explain() {
        let (id, _, rel) = people();
        let plan = PlanBuilder::from_plan(rel)
            .filter(id.to_expr().gt(lit(Value::Integer(1))))
            .project(vec![col("name")])
            .build();

        let explain = plan.tree_string();
        assert!(explain.starts_with("'Project ['name]\n"));
        assert!(explain.contains("└─ Filter (id#"));
        assert!(explain.contains("LocalRelation [id#"));
    }

    #[test]
    fn test_output_of_alias_and_project() {
        let (id, name, rel) = people();
        let aliased = LogicalPlan::subquery_alias("p", rel);
        let out = aliased.output();
        assert_eq!(out[0].qualifier, vec!["p".to_string()]);
        assert_eq!(out[0].expr_id, id.expr_id);

        let renamed = name.to_expr().alias("n");
        let project = LogicalPlan::project(vec![renamed.clone(), col("missing")], aliased);
        let out = project.output();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "n");
        assert_eq!(Some(out[0].clone()), renamed.to_attribute());
    }

    #[test]
    fn test_outer_join_output_is_nullable() {
        let (id, _, left) = people();
        let other = AttributeReference::new("k", DataType::Long, false);
        let right = LogicalPlan::local_relation(vec![other.clone()]);
        let join = LogicalPlan::join(left, right, JoinType::LeftOuter, None);
        let out = join.output();
        assert_eq!(out.len(), 3);
        assert!(!out[0].nullable);
        assert_eq!(out[0].expr_id, id.expr_id);
        assert!(out[2].nullable);
    }

    #[test]
    fn test_missing_input() {
        let (_, _, rel) = people();
        let stray = col_ref("stray", DataType::Integer);
        let plan = LogicalPlan::filter(stray.clone().is_null(), rel);
        let missing = plan.missing_input();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].name, "stray");
    }

    #[test]
    fn test_identity_rewrites_return_same_instance() {
        let (id, _, rel) = people();
        let plan = PlanBuilder::from_plan(rel)
            .filter(id.to_expr().gt(lit(Value::Integer(1))))
            .build();
        let out = Arc::clone(&plan).transform_up(&mut |p| p);
        assert!(Arc::ptr_eq(&plan, &out));
        let out = Arc::clone(&plan).transform_all_expressions_up(&mut |e| e);
        assert!(Arc::ptr_eq(&plan, &out));
        let out = Arc::clone(&plan).with_new_children(plan.children()).unwrap();
        assert!(Arc::ptr_eq(&plan, &out));
    }

    #[test]
    fn test_transform_expressions() {
        let (id, _, rel) = people();
        let plan = LogicalPlan::filter(id.to_expr().gt(lit(Value::Integer(1))), rel);
        let out = Arc::clone(&plan).transform_expressions_up(&mut |e| match &e.kind {
            ExprKind::Literal { .. } => lit(Value::Integer(2)),
            _ => e,
        });
        assert!(!Arc::ptr_eq(&plan, &out));
        assert_eq!(out.expressions()[0].sql(), "(id > 2)");
        // The child is shared.
        assert!(Arc::ptr_eq(&plan.children()[0], &out.children()[0]));
    }

    #[test]
    fn test_analyzed_subtrees_are_skipped() {
        let (_, _, rel) = people();
        let plan = LogicalPlan::filter(lit(Value::Boolean(true)), rel);
        plan.set_analyzed();
        assert!(plan.children()[0].analyzed());

        let mut visited = 0;
        let out = Arc::clone(&plan).resolve_operators_up(&mut |p| {
            visited += 1;
            p
        });
        assert_eq!(visited, 0);
        assert!(Arc::ptr_eq(&plan, &out));
    }

    #[test]
    fn test_equality_ignores_origin() {
        let a = LogicalPlan::one_row_relation();
        let b = LogicalPlan::one_row_relation().at(common_error::Origin::at(2, 0));
        assert_eq!(a, b);
    }

    #[test]
    fn test_unnamed_projection_is_unresolved() {
        let (id, _, rel) = people();
        let sum = id.to_expr().add(lit(Value::Integer(1)));
        assert!(sum.resolved());

        let unnamed = LogicalPlan::project(vec![id.to_expr(), Arc::clone(&sum)], Arc::clone(&rel));
        assert!(!unnamed.resolved());
        assert_eq!(unnamed.output().len(), 1);

        let named = LogicalPlan::project(vec![id.to_expr(), sum.alias("next")], rel);
        assert!(named.resolved());
        assert_eq!(named.output().len(), 2);
    }

    #[test]
    fn test_equality_of_shared_and_rebuilt_plans() {
        let (id, _, rel) = people();
        let build = |rel: PlanRef| {
            PlanBuilder::from_plan(rel)
                .filter(id.to_expr().gt(lit(Value::Integer(1))))
                .build()
        };
        let plan = build(Arc::clone(&rel));
        let shared = Arc::clone(&plan);
        assert_eq!(*plan, *shared);
        assert_eq!(*plan, *build(rel));
        assert_ne!(*plan, *plan.children()[0]);
    }
}
