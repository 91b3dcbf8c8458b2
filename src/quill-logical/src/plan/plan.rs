//! Logical plan nodes.

use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use common_display::{truncate_string, DisplayNode, DisplayTree};
use common_error::Origin;
use quill_core::ExprId;
use serde::{Deserialize, Serialize};

use crate::expr::{AttributeReference, ExprRef};
use crate::tree::{inherit_origin, TreeNode};

/// Shared handle to an immutable plan.
pub type PlanRef = Arc<LogicalPlan>;

/// Join flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Cross,
}

impl JoinType {
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Inner => "Inner",
            Self::LeftOuter => "LeftOuter",
            Self::RightOuter => "RightOuter",
            Self::FullOuter => "FullOuter",
            Self::Cross => "Cross",
        }
    }
}

/// The operator and arguments of a plan node.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanKind {
    /// Relation referenced by name, not yet looked up.
    UnresolvedRelation { multipart_identifier: Vec<String> },
    /// Names the output of `child`; its attributes become qualified by
    /// `identifier`.
    SubqueryAlias { identifier: String, child: PlanRef },
    /// In-memory relation with a fixed output.
    LocalRelation { output: Vec<AttributeReference> },
    /// Single row, no columns (`SELECT 1`).
    OneRowRelation,
    Project {
        project_list: Vec<ExprRef>,
        child: PlanRef,
    },
    Filter { condition: ExprRef, child: PlanRef },
    Join {
        left: PlanRef,
        right: PlanRef,
        join_type: JoinType,
        condition: Option<ExprRef>,
    },
}

/// A logical plan node.
///
/// `resolved` is computed on first use and never invalidated, which relies
/// on nodes never being mutated. `analyzed` is set once the plan has passed
/// analysis checks; analyzer traversals skip analyzed subtrees.
#[derive(Debug)]
pub struct LogicalPlan {
    kind: PlanKind,
    origin: Origin,
    resolved: OnceLock<bool>,
    analyzed: AtomicBool,
}

impl Clone for LogicalPlan {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            origin: self.origin.clone(),
            resolved: self.resolved.clone(),
            analyzed: AtomicBool::new(self.analyzed()),
        }
    }
}

// Origins and cached flags never take part in equality.
impl PartialEq for LogicalPlan {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || self.kind == other.kind
    }
}

impl LogicalPlan {
    pub fn new(kind: PlanKind) -> Self {
        Self::with_kind_and_origin(kind, Origin::default())
    }

    fn with_kind_and_origin(kind: PlanKind, origin: Origin) -> Self {
        Self {
            kind,
            origin,
            resolved: OnceLock::new(),
            analyzed: AtomicBool::new(false),
        }
    }

    pub fn into_ref(self) -> PlanRef {
        Arc::new(self)
    }

    pub fn kind(&self) -> &PlanKind {
        &self.kind
    }

    // =========================================================================
    // Constructors
    // =========================================================================

    pub fn unresolved_relation(multipart_identifier: Vec<String>) -> PlanRef {
        Self::new(PlanKind::UnresolvedRelation {
            multipart_identifier,
        })
        .into_ref()
    }

    pub fn local_relation(output: Vec<AttributeReference>) -> PlanRef {
        Self::new(PlanKind::LocalRelation { output }).into_ref()
    }

    pub fn one_row_relation() -> PlanRef {
        Self::new(PlanKind::OneRowRelation).into_ref()
    }

    pub fn subquery_alias(identifier: impl Into<String>, child: PlanRef) -> PlanRef {
        Self::new(PlanKind::SubqueryAlias {
            identifier: identifier.into(),
            child,
        })
        .into_ref()
    }

    pub fn project(project_list: Vec<ExprRef>, child: PlanRef) -> PlanRef {
        Self::new(PlanKind::Project {
            project_list,
            child,
        })
        .into_ref()
    }

    pub fn filter(condition: ExprRef, child: PlanRef) -> PlanRef {
        Self::new(PlanKind::Filter { condition, child }).into_ref()
    }

    pub fn join(
        left: PlanRef,
        right: PlanRef,
        join_type: JoinType,
        condition: Option<ExprRef>,
    ) -> PlanRef {
        Self::new(PlanKind::Join {
            left,
            right,
            join_type,
            condition,
        })
        .into_ref()
    }

    /// Attach a source position.
    pub fn at(self: PlanRef, origin: Origin) -> PlanRef {
        Arc::new(Arc::unwrap_or_clone(self).with_origin(origin))
    }

    // =========================================================================
    // Schema
    // =========================================================================

    /// Attributes this node produces.
    ///
    /// Unresolved projection items contribute nothing.
    pub fn output(&self) -> Vec<AttributeReference> {
        match &self.kind {
            PlanKind::UnresolvedRelation { .. } | PlanKind::OneRowRelation => Vec::new(),
            PlanKind::SubqueryAlias { identifier, child } => child
                .output()
                .into_iter()
                .map(|a| a.with_qualifier(vec![identifier.clone()]))
                .collect(),
            PlanKind::LocalRelation { output } => output.clone(),
            PlanKind::Project { project_list, .. } => {
                project_list.iter().filter_map(|e| e.to_attribute()).collect()
            }
            PlanKind::Filter { child, .. } => child.output(),
            PlanKind::Join {
                left,
                right,
                join_type,
                ..
            } => {
                let (left_nullable, right_nullable) = match join_type {
                    JoinType::LeftOuter => (false, true),
                    JoinType::RightOuter => (true, false),
                    JoinType::FullOuter => (true, true),
                    JoinType::Inner | JoinType::Cross => (false, false),
                };
                let widen = |attrs: Vec<AttributeReference>, force: bool| {
                    attrs.into_iter().map(move |a| {
                        let nullable = a.nullable || force;
                        a.with_nullability(nullable)
                    })
                };
                widen(left.output(), left_nullable)
                    .chain(widen(right.output(), right_nullable))
                    .collect()
            }
        }
    }

    /// Concatenated output of all children.
    pub fn children_output(&self) -> Vec<AttributeReference> {
        self.children().iter().flat_map(|c| c.output()).collect()
    }

    /// Ids of the attributes available to this node's expressions.
    pub fn input_set(&self) -> HashSet<ExprId> {
        self.children_output().iter().map(|a| a.expr_id).collect()
    }

    /// Attributes referenced by this node's expressions but not produced by
    /// any child.
    pub fn missing_input(&self) -> Vec<AttributeReference> {
        let input = self.input_set();
        self.expressions()
            .iter()
            .flat_map(|e| e.references())
            .filter(|a| !input.contains(&a.expr_id))
            .collect()
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Expressions held directly by this node, in order.
    pub fn expressions(&self) -> Vec<ExprRef> {
        match &self.kind {
            PlanKind::Project { project_list, .. } => project_list.clone(),
            PlanKind::Filter { condition, .. } => vec![Arc::clone(condition)],
            PlanKind::Join { condition, .. } => condition.iter().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Fallibly rewrite each expression of this node. Returns `self` if no
    /// expression changed.
    pub fn try_map_expressions<E, F>(self: Arc<Self>, mut f: F) -> Result<PlanRef, E>
    where
        F: FnMut(ExprRef) -> Result<ExprRef, E>,
    {
        let mut changed = false;
        let mut apply = |e: &ExprRef| -> Result<ExprRef, E> {
            let new = f(Arc::clone(e))?;
            changed |= !new.fast_equals(e);
            Ok(new)
        };
        let kind = match &self.kind {
            PlanKind::Project {
                project_list,
                child,
            } => Some(PlanKind::Project {
                project_list: project_list
                    .iter()
                    .map(&mut apply)
                    .collect::<Result<_, _>>()?,
                child: Arc::clone(child),
            }),
            PlanKind::Filter { condition, child } => Some(PlanKind::Filter {
                condition: apply(condition)?,
                child: Arc::clone(child),
            }),
            PlanKind::Join {
                left,
                right,
                join_type,
                condition,
            } => Some(PlanKind::Join {
                left: Arc::clone(left),
                right: Arc::clone(right),
                join_type: *join_type,
                condition: condition.as_ref().map(&mut apply).transpose()?,
            }),
            _ => None,
        };
        match kind {
            Some(kind) if changed => Ok(Arc::new(Self::with_kind_and_origin(
                kind,
                self.origin.clone(),
            ))),
            _ => Ok(self),
        }
    }

    /// Rewrite each expression of this node.
    pub fn map_expressions<F>(self: Arc<Self>, mut f: F) -> PlanRef
    where
        F: FnMut(ExprRef) -> ExprRef,
    {
        match self.try_map_expressions::<Infallible, _>(|e| Ok(f(e))) {
            Ok(plan) => plan,
            Err(never) => match never {},
        }
    }

    /// Rewrite the expressions of this node bottom-up.
    pub fn transform_expressions_up<F>(self: Arc<Self>, rule: &mut F) -> PlanRef
    where
        F: FnMut(ExprRef) -> ExprRef,
    {
        self.map_expressions(|e| e.transform_up(rule))
    }

    /// Fallible [`LogicalPlan::transform_expressions_up`].
    pub fn try_transform_expressions_up<E, F>(self: Arc<Self>, rule: &mut F) -> Result<PlanRef, E>
    where
        F: FnMut(ExprRef) -> Result<ExprRef, E>,
    {
        self.try_map_expressions(|e| e.try_transform_up(rule))
    }

    /// Rewrite every expression of every node, plans bottom-up and each
    /// node's expressions bottom-up.
    pub fn transform_all_expressions_up<F>(self: Arc<Self>, rule: &mut F) -> PlanRef
    where
        F: FnMut(ExprRef) -> ExprRef,
    {
        self.transform_up(&mut |plan: PlanRef| plan.transform_expressions_up(rule))
    }

    // =========================================================================
    // Analysis state
    // =========================================================================

    /// Post-order rewrite that leaves already-analyzed subtrees untouched.
    pub fn resolve_operators_up<F>(self: Arc<Self>, rule: &mut F) -> PlanRef
    where
        F: FnMut(PlanRef) -> PlanRef,
    {
        if self.analyzed() {
            return self;
        }
        let node = self.map_children(|child| child.resolve_operators_up(rule));
        let out = rule(Arc::clone(&node));
        inherit_origin(&node, out)
    }

    /// Fallible [`LogicalPlan::resolve_operators_up`].
    pub fn try_resolve_operators_up<E, F>(self: Arc<Self>, rule: &mut F) -> Result<PlanRef, E>
    where
        F: FnMut(PlanRef) -> Result<PlanRef, E>,
    {
        if self.analyzed() {
            return Ok(self);
        }
        let node = self.try_map_children(|child| child.try_resolve_operators_up(rule))?;
        let out = rule(Arc::clone(&node))?;
        Ok(inherit_origin(&node, out))
    }

    /// All expressions resolved and all children resolved. Memoized.
    ///
    /// A projection is resolved only once every item is named, so that its
    /// output covers the whole project list.
    pub fn resolved(&self) -> bool {
        *self.resolved.get_or_init(|| match &self.kind {
            PlanKind::UnresolvedRelation { .. } => false,
            PlanKind::Project { project_list, .. }
                if !project_list.iter().all(|e| e.is_named()) =>
            {
                false
            }
            _ => self.expressions().iter().all(|e| e.resolved()) && self.children_resolved(),
        })
    }

    pub fn children_resolved(&self) -> bool {
        self.children().iter().all(|c| c.resolved())
    }

    /// Whether this node has passed analysis.
    pub fn analyzed(&self) -> bool {
        self.analyzed.load(Ordering::Acquire)
    }

    /// Mark this plan and all of its descendants as analyzed. Idempotent.
    pub fn set_analyzed(&self) {
        if !self.analyzed.swap(true, Ordering::AcqRel) {
            for child in self.children() {
                child.set_analyzed();
            }
        }
    }

    // =========================================================================
    // Display
    // =========================================================================

    /// Operator name.
    pub fn node_name(&self) -> &'static str {
        match &self.kind {
            PlanKind::UnresolvedRelation { .. } => "UnresolvedRelation",
            PlanKind::SubqueryAlias { .. } => "SubqueryAlias",
            PlanKind::LocalRelation { .. } => "LocalRelation",
            PlanKind::OneRowRelation => "OneRowRelation",
            PlanKind::Project { .. } => "Project",
            PlanKind::Filter { .. } => "Filter",
            PlanKind::Join { .. } => "Join",
        }
    }

    /// One-line description of this node.
    pub fn simple_string(&self) -> String {
        let list = |items: Vec<String>| truncate_string(&items.join(", "), 400);
        let args = match &self.kind {
            PlanKind::UnresolvedRelation {
                multipart_identifier,
            } => format!("[{}]", multipart_identifier.join(", ")),
            PlanKind::SubqueryAlias { identifier, .. } => identifier.clone(),
            PlanKind::LocalRelation { output } => {
                format!("[{}]", list(output.iter().map(ToString::to_string).collect()))
            }
            PlanKind::OneRowRelation => String::new(),
            PlanKind::Project { project_list, .. } => {
                format!("[{}]", list(project_list.iter().map(ToString::to_string).collect()))
            }
            PlanKind::Filter { condition, .. } => condition.to_string(),
            PlanKind::Join {
                join_type,
                condition,
                ..
            } => match condition {
                Some(c) => format!("{}, {c}", join_type.sql()),
                None => join_type.sql().to_string(),
            },
        };
        let tick = if self.resolved() { "" } else { "'" };
        if args.is_empty() {
            format!("{tick}{}", self.node_name())
        } else {
            format!("{tick}{} {args}", self.node_name())
        }
    }

    /// Multi-line rendering of the whole plan.
    pub fn tree_string(&self) -> String {
        DisplayTree::new(self).to_string()
    }

    fn child_refs(&self) -> Vec<&PlanRef> {
        match &self.kind {
            PlanKind::UnresolvedRelation { .. }
            | PlanKind::LocalRelation { .. }
            | PlanKind::OneRowRelation => Vec::new(),
            PlanKind::SubqueryAlias { child, .. }
            | PlanKind::Project { child, .. }
            | PlanKind::Filter { child, .. } => vec![child],
            PlanKind::Join { left, right, .. } => vec![left, right],
        }
    }
}

impl DisplayNode for LogicalPlan {
    fn display_name(&self) -> String {
        self.simple_string()
    }

    fn display_children(&self) -> Vec<&dyn DisplayNode> {
        self.child_refs()
            .into_iter()
            .map(|c| c.as_ref() as &dyn DisplayNode)
            .collect()
    }
}

impl std::fmt::Display for LogicalPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", DisplayTree::new(self))
    }
}

impl TreeNode for LogicalPlan {
    fn children(&self) -> Vec<PlanRef> {
        self.child_refs().into_iter().cloned().collect()
    }

    fn rebuild_with_children(&self, children: Vec<PlanRef>) -> Self {
        let mut new = children.into_iter();
        // Arity is guaranteed by the caller; keep the old child if it is not.
        let mut take = |old: &PlanRef| new.next().unwrap_or_else(|| Arc::clone(old));
        let kind = match &self.kind {
            PlanKind::UnresolvedRelation { .. }
            | PlanKind::LocalRelation { .. }
            | PlanKind::OneRowRelation => self.kind.clone(),
            PlanKind::SubqueryAlias { identifier, child } => PlanKind::SubqueryAlias {
                identifier: identifier.clone(),
                child: take(child),
            },
            PlanKind::Project {
                project_list,
                child,
            } => PlanKind::Project {
                project_list: project_list.clone(),
                child: take(child),
            },
            PlanKind::Filter { condition, child } => PlanKind::Filter {
                condition: Arc::clone(condition),
                child: take(child),
            },
            PlanKind::Join {
                left,
                right,
                join_type,
                condition,
            } => PlanKind::Join {
                left: take(left),
                right: take(right),
                join_type: *join_type,
                condition: condition.clone(),
            },
        };
        Self::with_kind_and_origin(kind, self.origin.clone())
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }

    fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }
}
