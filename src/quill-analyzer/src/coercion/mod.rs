//! Type coercion: inserting casts so that every resolved expression receives
//! inputs of the types it accepts.
//!
//! The engine is split in three layers:
//! - [`common_type`]: the lattice of common types two or more inputs widen to
//! - [`implicit_cast`]: the cast an input needs to satisfy an abstract type
//! - [`rules`]: one coercion per expression shape
//!
//! Each shape coercion runs as its own [`Rule`] inside the resolution batch.
//! A rule only touches expressions whose children are resolved, so it composes
//! with name resolution running in the same fixed point.

pub mod common_type;
pub mod implicit_cast;
pub mod rules;

use std::collections::HashMap;
use std::sync::Arc;

use common_config::SessionConfig;
use common_error::QuillResult;
use quill_logical::expr::{ExprKind, ExprRef};
use quill_logical::PlanRef;
use quill_rules::{Rule, RuleId};

pub use common_type::{find_tightest_common_type, find_wider_common_type, find_wider_type_for_two};
pub use implicit_cast::{cast_if_needed, implicit_cast, implicit_cast_type};
use rules::CoercionFn;

/// Adapts a shape coercion to a plan rule.
pub struct TypeCoercionRule {
    name: &'static str,
    rule_id: Option<RuleId>,
    coerce: CoercionFn,
    case_sensitive: bool,
}

impl TypeCoercionRule {
    pub fn new(name: &'static str, coerce: CoercionFn) -> Self {
        Self {
            name,
            rule_id: None,
            coerce,
            case_sensitive: false,
        }
    }

    /// Compare struct field names case-sensitively when finding common types.
    pub fn with_case_sensitivity(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_rule_id(mut self, rule_id: Option<RuleId>) -> Self {
        self.rule_id = rule_id;
        self
    }

    fn coerce_node(&self, e: ExprRef) -> ExprRef {
        if !e.children_resolved() {
            return e;
        }
        (self.coerce)(&e, self.case_sensitive).unwrap_or(e)
    }
}

impl Rule for TypeCoercionRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn rule_id(&self) -> Option<RuleId> {
        self.rule_id
    }

    fn apply(&self, plan: PlanRef) -> QuillResult<PlanRef> {
        Ok(plan.resolve_operators_up(&mut |node: PlanRef| {
            propagate_types(node).transform_expressions_up(&mut |e| self.coerce_node(e))
        }))
    }
}

/// Rebind attribute references whose producer changed type or nullability.
///
/// A cast inserted below a node can change what its children output under an
/// unchanged id; references above must follow.
pub fn propagate_types(plan: PlanRef) -> PlanRef {
    if !plan.children_resolved() {
        return plan;
    }
    let produced: HashMap<_, _> = plan
        .children_output()
        .into_iter()
        .map(|a| (a.expr_id, a))
        .collect();
    plan.transform_expressions_up(&mut |e: ExprRef| match &e.kind {
        ExprKind::Attribute(a) => match produced.get(&a.expr_id) {
            Some(p) if p.data_type != a.data_type || p.nullable != a.nullable => a
                .clone()
                .with_data_type(p.data_type.clone())
                .with_nullability(p.nullable)
                .to_expr()
                .at(e.origin.clone()),
            _ => e,
        },
        _ => e,
    })
}

/// The coercion rules for `session`, in the order they run. ANSI mode drops
/// the lenient string promotion and boolean equality rewrites.
pub fn type_coercion_rules(session: &SessionConfig) -> Vec<Arc<dyn Rule>> {
    let mut steps: Vec<(&'static str, CoercionFn)> = Vec::new();
    steps.push(("InConversion", rules::in_conversion));
    if !session.ansi_enabled {
        steps.push(("PromoteStrings", rules::promote_strings));
        steps.push(("BooleanEquality", rules::boolean_equality));
    }
    let shaped: [(&'static str, CoercionFn); 6] = [
        ("ConcatCoercion", rules::concat_coercion),
        ("Division", rules::division),
        ("IntegralDivision", rules::integral_division),
        ("CaseWhenCoercion", rules::case_when_coercion),
        ("IfCoercion", rules::if_coercion),
        ("ImplicitTypeCasts", rules::implicit_type_casts),
    ];
    steps.extend(shaped);
    steps
        .into_iter()
        .map(|(name, coerce)| {
            let rule = TypeCoercionRule::new(name, coerce)
                .with_case_sensitivity(session.case_sensitive);
            Arc::new(rule) as Arc<dyn Rule>
        })
        .collect()
}
