//! Bind unresolved function calls to registered functions.

use std::sync::Arc;

use common_error::QuillResult;
use quill_logical::expr::{ExprKind, ExprRef};
use quill_logical::PlanRef;
use quill_rules::{Rule, RuleId};

use crate::registry::{unresolved_routine, FunctionRegistry};

/// Replaces a call with the expression its function builds, once all of its
/// arguments are resolved. A call to a function that does not exist fails
/// right away with `UNRESOLVED_ROUTINE`.
pub struct ResolveFunctions {
    functions: Arc<FunctionRegistry>,
    rule_id: Option<RuleId>,
}

impl ResolveFunctions {
    pub fn new(functions: Arc<FunctionRegistry>) -> Self {
        Self {
            functions,
            rule_id: None,
        }
    }

    pub fn with_rule_id(mut self, rule_id: Option<RuleId>) -> Self {
        self.rule_id = rule_id;
        self
    }

    fn resolve_call(&self, e: ExprRef) -> QuillResult<ExprRef> {
        let ExprKind::UnresolvedFunction {
            name_parts,
            arguments,
            ..
        } = &e.kind
        else {
            return Ok(e);
        };
        let exists = name_parts
            .last()
            .is_some_and(|name| self.functions.function_exists(name));
        if !exists {
            return Err(unresolved_routine(name_parts, &e.origin));
        }
        if arguments.iter().all(|a| a.resolved()) {
            self.functions
                .lookup_function(name_parts, arguments.clone(), &e.origin)
        } else {
            Ok(e)
        }
    }
}

impl Rule for ResolveFunctions {
    fn name(&self) -> &'static str {
        "ResolveFunctions"
    }

    fn rule_id(&self) -> Option<RuleId> {
        self.rule_id
    }

    fn apply(&self, plan: PlanRef) -> QuillResult<PlanRef> {
        plan.try_resolve_operators_up(&mut |node: PlanRef| {
            node.try_transform_expressions_up(&mut |e: ExprRef| self.resolve_call(e))
        })
    }
}

#[cfg(test)]
mod tests {
    use common_error::Origin;
    use quill_core::{DataType, Value};
    use quill_logical::expr::{col, func, lit};
    use quill_logical::PlanBuilder;

    use super::*;

    fn rule() -> ResolveFunctions {
        ResolveFunctions::new(Arc::new(FunctionRegistry::builtin()))
    }

    #[test]
    fn test_nested_calls_resolve_in_one_pass() {
        let call = func("UPPER", vec![func("lower", vec![lit(Value::String("Ab".into()))])]);
        let plan = PlanBuilder::one_row().project(vec![call.unresolved_alias()]).build();
        let out = rule().apply(plan).unwrap();
        let item = &out.expressions()[0];
        let ExprKind::UnresolvedAlias { child } = &item.kind else {
            panic!("expected the alias placeholder to survive");
        };
        assert!(child.resolved());
        assert_eq!(child.sql(), "upper(lower('Ab'))");
        assert_eq!(child.data_type(), DataType::String);
    }

    #[test]
    fn test_waits_for_arguments() {
        let plan = PlanBuilder::relation("t")
            .project(vec![func("abs", vec![col("x")])])
            .build();
        let out = rule().apply(Arc::clone(&plan)).unwrap();
        assert!(Arc::ptr_eq(&plan, &out));
    }

    #[test]
    fn test_unknown_function_fails_immediately() {
        let call = func("frobnicate", vec![col("x")]).at(Origin::at(1, 8));
        let plan = PlanBuilder::relation("t").project(vec![call]).build();
        let err = rule().apply(plan).unwrap_err();
        let analysis = err.as_analysis().unwrap();
        assert_eq!(analysis.error_class, "UNRESOLVED_ROUTINE");
        assert_eq!(analysis.param("routineName"), Some("`frobnicate`"));
        assert_eq!(analysis.origin, Origin::at(1, 8));
    }
}
