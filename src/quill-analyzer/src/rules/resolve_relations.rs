//! Replace unresolved relations with the plans registered under their name.

use std::sync::Arc;

use common_error::QuillResult;
use quill_logical::expr::AttributeReference;
use quill_logical::{LogicalPlan, PlanKind, PlanRef, TreeNode};
use quill_rules::{Rule, RuleId};

use crate::catalog::RelationCatalog;

/// Looks up single-part relation names in a [`RelationCatalog`].
///
/// A match is wrapped in a subquery alias carrying the name, so columns can
/// be qualified with it. Multi-part names and unknown names are left alone;
/// the analysis checks report them.
pub struct ResolveRelations {
    catalog: Arc<dyn RelationCatalog>,
    rule_id: Option<RuleId>,
}

impl ResolveRelations {
    pub fn new(catalog: Arc<dyn RelationCatalog>) -> Self {
        Self {
            catalog,
            rule_id: None,
        }
    }

    pub fn with_rule_id(mut self, rule_id: Option<RuleId>) -> Self {
        self.rule_id = rule_id;
        self
    }

    fn lookup(&self, node: PlanRef) -> PlanRef {
        let PlanKind::UnresolvedRelation {
            multipart_identifier,
        } = node.kind()
        else {
            return node;
        };
        let [name] = multipart_identifier.as_slice() else {
            return node;
        };
        match self.catalog.lookup_relation(name) {
            Some(plan) => LogicalPlan::subquery_alias(name.clone(), new_instance(plan)),
            None => node,
        }
    }
}

/// A local relation referenced twice must not share attribute ids, or a
/// self-join could not tell its sides apart.
fn new_instance(plan: PlanRef) -> PlanRef {
    match plan.kind() {
        PlanKind::LocalRelation { output } => {
            let fresh = output
                .iter()
                .map(|a| AttributeReference::new(a.name.clone(), a.data_type.clone(), a.nullable))
                .collect();
            LogicalPlan::local_relation(fresh).at(plan.origin().clone())
        }
        _ => plan,
    }
}

impl Rule for ResolveRelations {
    fn name(&self) -> &'static str {
        "ResolveRelations"
    }

    fn rule_id(&self) -> Option<RuleId> {
        self.rule_id
    }

    fn apply(&self, plan: PlanRef) -> QuillResult<PlanRef> {
        Ok(plan.resolve_operators_up(&mut |node: PlanRef| self.lookup(node)))
    }
}

#[cfg(test)]
mod tests {
    use quill_core::DataType;
    use quill_logical::PlanBuilder;

    use super::*;
    use crate::catalog::TempViewRegistry;

    fn catalog() -> Arc<TempViewRegistry> {
        let views = TempViewRegistry::new(false);
        views
            .create(
                "t",
                LogicalPlan::local_relation(vec![AttributeReference::new("x", DataType::Integer, false)]),
                false,
            )
            .unwrap();
        Arc::new(views)
    }

    #[test]
    fn test_resolves_registered_relation() {
        let rule = ResolveRelations::new(catalog());
        let plan = PlanBuilder::relation("T").build();
        let out = rule.apply(plan).unwrap();
        assert!(out.resolved());
        assert_eq!(out.simple_string(), "SubqueryAlias T");
        let output = out.output();
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].qualifier, vec!["T".to_string()]);
    }

    #[test]
    fn test_unknown_and_multipart_names_stay_unresolved() {
        let rule = ResolveRelations::new(catalog());
        for name in ["missing", "db.t"] {
            let plan = PlanBuilder::relation(name).build();
            let out = rule.apply(Arc::clone(&plan)).unwrap();
            assert!(Arc::ptr_eq(&plan, &out));
        }
    }

    #[test]
    fn test_each_reference_gets_fresh_ids() {
        let rule = ResolveRelations::new(catalog());
        let a = rule.apply(PlanBuilder::relation("t").build()).unwrap();
        let b = rule.apply(PlanBuilder::relation("t").build()).unwrap();
        assert_ne!(a.output()[0].expr_id, b.output()[0].expr_id);
    }
}
