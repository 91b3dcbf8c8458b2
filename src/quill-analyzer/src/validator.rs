//! Structural checks run after every effective rule application when plan
//! change validation is enabled.

use quill_logical::{LogicalPlan, PlanRef, TreeNode};
use quill_rules::PlanChangeValidator;

/// Rejects rule outputs that rename or re-id the columns of a resolved plan,
/// or that leave a resolved operator referring to attributes its children do
/// not produce.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlanIntegrity;

impl PlanIntegrity {
    fn output_schema(plan: &PlanRef) -> Vec<(String, u64)> {
        plan.output()
            .into_iter()
            .map(|a| (a.name, a.expr_id.id()))
            .collect()
    }
}

impl PlanChangeValidator for PlanIntegrity {
    fn validate(&self, previous: &PlanRef, current: &PlanRef) -> Option<String> {
        if previous.resolved() && current.resolved() {
            let (before, after) = (Self::output_schema(previous), Self::output_schema(current));
            if before != after {
                return Some(format!(
                    "the output of a resolved plan changed from {before:?} to {after:?}"
                ));
            }
        }

        let mut dangling = None;
        current.foreach(&mut |node: &LogicalPlan| {
            if dangling.is_some() || !node.resolved() {
                return;
            }
            let missing = node.missing_input();
            if !missing.is_empty() {
                let names = missing
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                dangling = Some(format!(
                    "{} refers to attributes missing from its input: {names}",
                    node.node_name()
                ));
            }
        });
        dangling
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use quill_core::DataType;
    use quill_logical::expr::AttributeReference;
    use quill_logical::PlanBuilder;

    use super::*;

    #[test]
    fn test_accepts_well_formed_change() {
        let x = AttributeReference::new("x", DataType::Integer, false);
        let before = PlanBuilder::local(vec![x.clone()]).build();
        let after = PlanBuilder::local(vec![x.clone()]).project(vec![x.to_expr()]).build();
        assert_eq!(PlanIntegrity.validate(&before, &after), None);
    }

    #[test]
    fn test_rejects_changed_output() {
        let x = AttributeReference::new("x", DataType::Integer, false);
        let y = AttributeReference::new("x", DataType::Integer, false);
        let before = LogicalPlan::local_relation(vec![x]);
        let after = LogicalPlan::local_relation(vec![y]);
        assert!(PlanIntegrity.validate(&before, &after).is_some());
    }

    #[test]
    fn test_rejects_dangling_reference() {
        let x = AttributeReference::new("x", DataType::Integer, false);
        let stray = AttributeReference::new("stray", DataType::Integer, false);
        let plan = PlanBuilder::local(vec![x]).project(vec![stray.to_expr()]).build();
        let message = PlanIntegrity.validate(&plan, &Arc::clone(&plan)).unwrap();
        assert!(message.contains("stray"));
    }
}
