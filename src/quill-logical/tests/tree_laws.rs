//! Property tests for the identity laws of the tree substrate.

use std::sync::Arc;

use proptest::prelude::*;
use quill_core::{DataType, Value};
use quill_logical::expr::{col_ref, lit, Expr, ExprKind, ExprRef};
use quill_logical::{LogicalPlan, PlanRef, TreeNode};

fn arb_leaf() -> impl Strategy<Value = ExprRef> {
    prop_oneof![
        any::<i32>().prop_map(|v| lit(Value::Integer(v))),
        any::<bool>().prop_map(|v| lit(Value::Boolean(v))),
        "[a-z]{1,4}".prop_map(|name| col_ref(&name, DataType::Integer)),
    ]
}

fn arb_expr() -> impl Strategy<Value = ExprRef> {
    arb_leaf().prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| l.add(r)),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| l.gt(r)),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| l.and(r)),
            inner.clone().prop_map(|e| e.not()),
            (inner.clone(), inner.clone(), inner.clone())
                .prop_map(|(p, t, f)| Expr::if_(p, t, f)),
            (inner.clone(), prop::collection::vec(inner, 0..3))
                .prop_map(|(v, list)| v.in_list(list)),
        ]
    })
}

fn arb_plan() -> impl Strategy<Value = PlanRef> {
    let leaf = Just(LogicalPlan::one_row_relation());
    leaf.prop_recursive(3, 8, 2, |inner| {
        prop_oneof![
            (arb_expr(), inner.clone()).prop_map(|(c, child)| LogicalPlan::filter(c, child)),
            (prop::collection::vec(arb_expr(), 1..3), inner.clone())
                .prop_map(|(list, child)| LogicalPlan::project(list, child)),
            (inner.clone(), inner).prop_map(|(l, r)| LogicalPlan::join(
                l,
                r,
                quill_logical::JoinType::Inner,
                None
            )),
        ]
    })
}

proptest! {
    #[test]
    fn prop_identity_transform_up_keeps_expr(e in arb_expr()) {
        let out = Arc::clone(&e).transform_up(&mut |n| n);
        prop_assert!(Arc::ptr_eq(&e, &out));
        prop_assert!(out.fast_equals(&e));
    }

    #[test]
    fn prop_identity_transform_down_keeps_expr(e in arb_expr()) {
        let out = Arc::clone(&e).transform_down(&mut |n| n);
        prop_assert!(Arc::ptr_eq(&e, &out));
    }

    #[test]
    fn prop_with_same_children_is_same_instance(e in arb_expr()) {
        let out = Arc::clone(&e).with_new_children(e.children()).unwrap();
        prop_assert!(Arc::ptr_eq(&e, &out));
    }

    #[test]
    fn prop_identity_plan_rewrites(plan in arb_plan()) {
        let out = Arc::clone(&plan).transform_up(&mut |p| p);
        prop_assert!(Arc::ptr_eq(&plan, &out));
        let out = Arc::clone(&plan).transform_all_expressions_up(&mut |e| e);
        prop_assert!(Arc::ptr_eq(&plan, &out));
        let out = Arc::clone(&plan).with_new_children(plan.children()).unwrap();
        prop_assert!(Arc::ptr_eq(&plan, &out));
    }

    #[test]
    fn prop_leaf_rewrite_preserves_shape(e in arb_expr()) {
        let before = e.node_count();
        let out = Arc::clone(&e).transform_up(&mut |n| match &n.kind {
            ExprKind::Literal { value: Value::Integer(v), .. } => {
                lit(Value::Integer(v.wrapping_add(1)))
            }
            _ => n,
        });
        prop_assert_eq!(out.node_count(), before);
    }

    #[test]
    fn prop_fresh_attributes_are_missing_input(plan in arb_plan()) {
        // Every generated attribute has a fresh id that no child produces.
        let mut ok = true;
        plan.foreach(&mut |p: &LogicalPlan| {
            let referenced: usize = p.expressions().iter().map(|e| e.references().len()).sum();
            ok &= p.missing_input().len() == referenced;
        });
        prop_assert!(ok);
    }
}
