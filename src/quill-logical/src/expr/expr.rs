//! Expression trees.

use std::fmt;
use std::sync::{Arc, OnceLock};

use common_error::Origin;
use quill_core::{can_cast, force_nullable, needs_time_zone, DataType, ExprId, Value};

use super::{ArithmeticOp, BooleanOp, ComparisonOp, FunctionSignature};
use crate::tree::TreeNode;

/// Shared handle to an immutable expression.
pub type ExprRef = Arc<Expr>;

/// A resolved reference to a column produced by some operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeReference {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub expr_id: ExprId,
    /// Relation names this attribute can be qualified with, outermost first.
    pub qualifier: Vec<String>,
}

impl AttributeReference {
    /// A new attribute with a fresh id.
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
            expr_id: ExprId::new_id(),
            qualifier: Vec::new(),
        }
    }

    pub fn with_qualifier(mut self, qualifier: Vec<String>) -> Self {
        self.qualifier = qualifier;
        self
    }

    pub fn with_nullability(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    /// This attribute as an expression.
    pub fn to_expr(&self) -> ExprRef {
        Arc::new(Expr::new(ExprKind::Attribute(self.clone())))
    }
}

impl fmt::Display for AttributeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.expr_id)
    }
}

/// The shape and arguments of an expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Column reference by (possibly qualified, possibly nested) name.
    UnresolvedAttribute { name_parts: Vec<String> },
    /// Function call not yet bound to an implementation.
    UnresolvedFunction {
        name_parts: Vec<String>,
        arguments: Vec<ExprRef>,
        is_distinct: bool,
    },
    /// Projection item still waiting for a generated name.
    UnresolvedAlias { child: ExprRef },

    /// Bound column reference.
    Attribute(AttributeReference),
    Literal { value: Value, data_type: DataType },
    /// Named expression introducing a new attribute.
    Alias {
        child: ExprRef,
        name: String,
        expr_id: ExprId,
        qualifier: Vec<String>,
    },
    Cast {
        child: ExprRef,
        data_type: DataType,
        time_zone_id: Option<String>,
    },
    BinaryArithmetic {
        op: ArithmeticOp,
        left: ExprRef,
        right: ExprRef,
    },
    BinaryComparison {
        op: ComparisonOp,
        left: ExprRef,
        right: ExprRef,
    },
    BooleanBinary {
        op: BooleanOp,
        left: ExprRef,
        right: ExprRef,
    },
    Not { child: ExprRef },
    IsNull { child: ExprRef },
    IsNotNull { child: ExprRef },
    /// `CASE WHEN c1 THEN v1 ... [ELSE e] END`
    CaseWhen {
        branches: Vec<(ExprRef, ExprRef)>,
        else_value: Option<ExprRef>,
    },
    If {
        predicate: ExprRef,
        true_value: ExprRef,
        false_value: ExprRef,
    },
    In { value: ExprRef, list: Vec<ExprRef> },
    Concat { children: Vec<ExprRef> },
    /// Field `ordinal` of a struct-typed child.
    GetStructField {
        child: ExprRef,
        ordinal: usize,
        name: Option<String>,
    },
    /// A resolved built-in function.
    ScalarFunction {
        name: String,
        args: Vec<ExprRef>,
        signature: FunctionSignature,
        time_zone_id: Option<String>,
    },
}

/// An expression node: its kind plus where it came from in the query text.
///
/// `resolved` is memoized on first use; `kind` must not be changed after
/// that.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub origin: Origin,
    resolved: OnceLock<bool>,
}

// Origins and cached flags never take part in equality.
impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || self.kind == other.kind
    }
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self::with_origin_of(kind, Origin::default())
    }

    /// A node of `kind` positioned at `origin`.
    pub fn with_origin_of(kind: ExprKind, origin: Origin) -> Self {
        Self {
            kind,
            origin,
            resolved: OnceLock::new(),
        }
    }

    pub fn into_ref(self) -> ExprRef {
        Arc::new(self)
    }

    /// Whether this node is one of the unresolved placeholder kinds.
    pub const fn is_unresolved_kind(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::UnresolvedAttribute { .. }
                | ExprKind::UnresolvedFunction { .. }
                | ExprKind::UnresolvedAlias { .. }
        )
    }

    pub fn children_resolved(&self) -> bool {
        self.children().iter().all(|c| c.resolved())
    }

    /// Bound to attributes and functions, with every child resolved.
    ///
    /// A cast additionally needs to be legal and, when the conversion depends
    /// on the session zone, to carry a zone id. Time-zone-aware functions
    /// likewise need a zone.
    pub fn resolved(&self) -> bool {
        *self.resolved.get_or_init(|| self.compute_resolved())
    }

    fn compute_resolved(&self) -> bool {
        match &self.kind {
            ExprKind::UnresolvedAttribute { .. }
            | ExprKind::UnresolvedFunction { .. }
            | ExprKind::UnresolvedAlias { .. } => false,
            ExprKind::Cast {
                child,
                data_type,
                time_zone_id,
            } => {
                child.resolved()
                    && can_cast(&child.data_type(), data_type)
                    && (time_zone_id.is_some() || !needs_time_zone(&child.data_type(), data_type))
            }
            ExprKind::ScalarFunction {
                signature,
                time_zone_id,
                ..
            } => self.children_resolved() && (!signature.time_zone_aware || time_zone_id.is_some()),
            _ => self.children_resolved(),
        }
    }

    /// Result type. Unresolved placeholders report `Null`.
    pub fn data_type(&self) -> DataType {
        match &self.kind {
            ExprKind::UnresolvedAttribute { .. }
            | ExprKind::UnresolvedFunction { .. }
            | ExprKind::UnresolvedAlias { .. } => DataType::Null,
            ExprKind::Attribute(a) => a.data_type.clone(),
            ExprKind::Literal { data_type, .. } | ExprKind::Cast { data_type, .. } => {
                data_type.clone()
            }
            ExprKind::Alias { child, .. } => child.data_type(),
            ExprKind::BinaryArithmetic { op, left, .. } => match op {
                ArithmeticOp::IntegralDivide => DataType::Long,
                _ => left.data_type(),
            },
            ExprKind::BinaryComparison { .. }
            | ExprKind::BooleanBinary { .. }
            | ExprKind::Not { .. }
            | ExprKind::IsNull { .. }
            | ExprKind::IsNotNull { .. }
            | ExprKind::In { .. } => DataType::Boolean,
            ExprKind::CaseWhen {
                branches,
                else_value,
            } => first_non_null_type(branches.iter().map(|(_, v)| v).chain(else_value.iter())),
            ExprKind::If {
                true_value,
                false_value,
                ..
            } => first_non_null_type([true_value, false_value]),
            ExprKind::Concat { children } => {
                if !children.is_empty()
                    && children.iter().all(|c| c.data_type() == DataType::Binary)
                {
                    DataType::Binary
                } else {
                    DataType::String
                }
            }
            ExprKind::GetStructField { child, ordinal, .. } => match child.data_type() {
                DataType::Struct(fields) => fields
                    .get(*ordinal)
                    .map_or(DataType::Null, |f| f.data_type.clone()),
                _ => DataType::Null,
            },
            ExprKind::ScalarFunction {
                args, signature, ..
            } => {
                let arg_types: Vec<_> = args.iter().map(|a| a.data_type()).collect();
                signature.result_type(&arg_types)
            }
        }
    }

    /// Whether evaluation may produce `NULL`.
    pub fn nullable(&self) -> bool {
        match &self.kind {
            ExprKind::UnresolvedAttribute { .. }
            | ExprKind::UnresolvedFunction { .. }
            | ExprKind::UnresolvedAlias { .. } => true,
            ExprKind::Attribute(a) => a.nullable,
            ExprKind::Literal { value, .. } => value.is_null(),
            ExprKind::Alias { child, .. } | ExprKind::Not { child } => child.nullable(),
            ExprKind::Cast {
                child, data_type, ..
            } => child.nullable() || force_nullable(&child.data_type(), data_type),
            ExprKind::BinaryArithmetic { op, left, right } => {
                op.may_produce_null() || left.nullable() || right.nullable()
            }
            ExprKind::BinaryComparison { op, left, right } => {
                *op != ComparisonOp::EqualNullSafe && (left.nullable() || right.nullable())
            }
            ExprKind::BooleanBinary { left, right, .. } => left.nullable() || right.nullable(),
            ExprKind::IsNull { .. } | ExprKind::IsNotNull { .. } => false,
            ExprKind::CaseWhen {
                branches,
                else_value,
            } => {
                branches.iter().any(|(_, v)| v.nullable())
                    || else_value.as_ref().map_or(true, |e| e.nullable())
            }
            ExprKind::If {
                true_value,
                false_value,
                ..
            } => true_value.nullable() || false_value.nullable(),
            ExprKind::In { value, list } => value.nullable() || list.iter().any(|e| e.nullable()),
            ExprKind::Concat { children } => children.iter().any(|c| c.nullable()),
            ExprKind::GetStructField { child, ordinal, .. } => {
                child.nullable()
                    || match child.data_type() {
                        DataType::Struct(fields) => fields.get(*ordinal).map_or(true, |f| f.nullable),
                        _ => true,
                    }
            }
            ExprKind::ScalarFunction {
                args, signature, ..
            } => !signature.null_intolerant || args.iter().any(|a| a.nullable()),
        }
    }

    /// Name of a named expression (attribute or alias).
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Attribute(a) => Some(&a.name),
            ExprKind::Alias { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Whether this is a named expression.
    pub fn is_named(&self) -> bool {
        self.name().is_some()
    }

    /// The attribute a resolved named expression exports.
    pub fn to_attribute(&self) -> Option<AttributeReference> {
        match &self.kind {
            ExprKind::Attribute(a) => Some(a.clone()),
            ExprKind::Alias {
                child,
                name,
                expr_id,
                qualifier,
            } if child.resolved() => Some(AttributeReference {
                name: name.clone(),
                data_type: child.data_type(),
                nullable: child.nullable(),
                expr_id: *expr_id,
                qualifier: qualifier.clone(),
            }),
            _ => None,
        }
    }

    /// Whether evaluation depends on a session time zone that is missing.
    pub fn needs_time_zone(&self) -> bool {
        match &self.kind {
            ExprKind::Cast {
                child,
                data_type,
                time_zone_id: None,
            } => needs_time_zone(&child.data_type(), data_type),
            ExprKind::ScalarFunction {
                signature,
                time_zone_id: None,
                ..
            } => signature.time_zone_aware,
            _ => false,
        }
    }

    /// Copy of this node with `zone` filled in, for time-zone-aware kinds.
    pub fn with_time_zone(&self, zone: &str) -> Self {
        let kind = match &self.kind {
            ExprKind::Cast {
                child, data_type, ..
            } => ExprKind::Cast {
                child: Arc::clone(child),
                data_type: data_type.clone(),
                time_zone_id: Some(zone.to_string()),
            },
            ExprKind::ScalarFunction {
                name,
                args,
                signature,
                ..
            } => ExprKind::ScalarFunction {
                name: name.clone(),
                args: args.clone(),
                signature: signature.clone(),
                time_zone_id: Some(zone.to_string()),
            },
            other => other.clone(),
        };
        Self::with_origin_of(kind, self.origin.clone())
    }

    /// Attributes referenced anywhere in this expression.
    pub fn references(&self) -> Vec<AttributeReference> {
        let mut refs = Vec::new();
        self.foreach(&mut |e| {
            if let ExprKind::Attribute(a) = &e.kind {
                refs.push(a.clone());
            }
        });
        refs
    }

    /// SQL text without attribute ids, used to name generated columns.
    pub fn sql(&self) -> String {
        self.render(true)
    }

    fn render(&self, pretty: bool) -> String {
        let r = |e: &ExprRef| e.render(pretty);
        let list = |es: &[ExprRef]| es.iter().map(r).collect::<Vec<_>>().join(", ");
        match &self.kind {
            ExprKind::UnresolvedAttribute { name_parts } => {
                let name = name_parts
                    .iter()
                    .map(|p| quote_identifier(p))
                    .collect::<Vec<_>>()
                    .join(".");
                if pretty {
                    name
                } else {
                    format!("'{name}")
                }
            }
            ExprKind::UnresolvedFunction {
                name_parts,
                arguments,
                is_distinct,
            } => {
                let distinct = if *is_distinct { "DISTINCT " } else { "" };
                let tick = if pretty { "" } else { "'" };
                format!("{tick}{}({distinct}{})", name_parts.join("."), list(arguments))
            }
            ExprKind::UnresolvedAlias { child } => {
                if pretty {
                    r(child)
                } else {
                    format!("unresolvedalias({})", r(child))
                }
            }
            ExprKind::Attribute(a) => {
                if pretty {
                    quote_identifier(&a.name)
                } else {
                    a.to_string()
                }
            }
            ExprKind::Literal { value, .. } => value.sql(),
            ExprKind::Alias {
                child,
                name,
                expr_id,
                ..
            } => {
                if pretty {
                    format!("{} AS {}", r(child), quote_identifier(name))
                } else {
                    format!("{} AS {name}{expr_id}", r(child))
                }
            }
            ExprKind::Cast {
                child, data_type, ..
            } => format!("CAST({} AS {})", r(child), data_type.sql()),
            ExprKind::BinaryArithmetic { op, left, right } => {
                format!("({} {} {})", r(left), op.symbol(), r(right))
            }
            ExprKind::BinaryComparison { op, left, right } => {
                format!("({} {} {})", r(left), op.symbol(), r(right))
            }
            ExprKind::BooleanBinary { op, left, right } => {
                format!("({} {} {})", r(left), op.symbol(), r(right))
            }
            ExprKind::Not { child } => format!("(NOT {})", r(child)),
            ExprKind::IsNull { child } => format!("({} IS NULL)", r(child)),
            ExprKind::IsNotNull { child } => format!("({} IS NOT NULL)", r(child)),
            ExprKind::CaseWhen {
                branches,
                else_value,
            } => {
                let mut out = "CASE".to_string();
                for (cond, value) in branches {
                    out.push_str(&format!(" WHEN {} THEN {}", r(cond), r(value)));
                }
                if let Some(e) = else_value {
                    out.push_str(&format!(" ELSE {}", r(e)));
                }
                out.push_str(" END");
                out
            }
            ExprKind::If {
                predicate,
                true_value,
                false_value,
            } => format!("(IF({}, {}, {}))", r(predicate), r(true_value), r(false_value)),
            ExprKind::In { value, list: items } => format!("({} IN ({}))", r(value), list(items)),
            ExprKind::Concat { children } => format!("concat({})", list(children)),
            ExprKind::GetStructField {
                child,
                ordinal,
                name,
            } => match name {
                Some(n) => format!("{}.{}", r(child), quote_identifier(n)),
                None => format!("{}[{ordinal}]", r(child)),
            },
            ExprKind::ScalarFunction { name, args, .. } => format!("{name}({})", list(args)),
        }
    }
}

fn first_non_null_type<'a>(exprs: impl IntoIterator<Item = &'a ExprRef>) -> DataType {
    exprs
        .into_iter()
        .map(|e| e.data_type())
        .find(|t| *t != DataType::Null)
        .unwrap_or(DataType::Null)
}

/// Backtick-quote an identifier unless it is a plain word.
pub fn quote_identifier(name: &str) -> String {
    let plain = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("`{}`", name.replace('`', "``"))
    }
}

/// Backtick-quote every part of a multi-part name.
pub fn to_sql_id(parts: &[String]) -> String {
    parts
        .iter()
        .map(|p| format!("`{}`", p.replace('`', "``")))
        .collect::<Vec<_>>()
        .join(".")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

impl TreeNode for Expr {
    fn children(&self) -> Vec<ExprRef> {
        match &self.kind {
            ExprKind::UnresolvedAttribute { .. }
            | ExprKind::Attribute(_)
            | ExprKind::Literal { .. } => Vec::new(),
            ExprKind::UnresolvedFunction { arguments, .. } => arguments.clone(),
            ExprKind::UnresolvedAlias { child }
            | ExprKind::Alias { child, .. }
            | ExprKind::Cast { child, .. }
            | ExprKind::Not { child }
            | ExprKind::IsNull { child }
            | ExprKind::IsNotNull { child }
            | ExprKind::GetStructField { child, .. } => vec![Arc::clone(child)],
            ExprKind::BinaryArithmetic { left, right, .. }
            | ExprKind::BinaryComparison { left, right, .. }
            | ExprKind::BooleanBinary { left, right, .. } => {
                vec![Arc::clone(left), Arc::clone(right)]
            }
            ExprKind::CaseWhen {
                branches,
                else_value,
            } => {
                let mut out: Vec<ExprRef> = branches
                    .iter()
                    .flat_map(|(c, v)| [Arc::clone(c), Arc::clone(v)])
                    .collect();
                out.extend(else_value.iter().cloned());
                out
            }
            ExprKind::If {
                predicate,
                true_value,
                false_value,
            } => vec![
                Arc::clone(predicate),
                Arc::clone(true_value),
                Arc::clone(false_value),
            ],
            ExprKind::In { value, list } => std::iter::once(Arc::clone(value))
                .chain(list.iter().cloned())
                .collect(),
            ExprKind::Concat { children } => children.clone(),
            ExprKind::ScalarFunction { args, .. } => args.clone(),
        }
    }

    fn rebuild_with_children(&self, children: Vec<ExprRef>) -> Self {
        let mut new = children.into_iter();
        // Arity is guaranteed by the caller; keep the old child if it is not.
        let mut take = |old: &ExprRef| new.next().unwrap_or_else(|| Arc::clone(old));
        let kind = match &self.kind {
            ExprKind::UnresolvedAttribute { .. }
            | ExprKind::Attribute(_)
            | ExprKind::Literal { .. } => self.kind.clone(),
            ExprKind::UnresolvedFunction {
                name_parts,
                arguments,
                is_distinct,
            } => ExprKind::UnresolvedFunction {
                name_parts: name_parts.clone(),
                arguments: arguments.iter().map(&mut take).collect(),
                is_distinct: *is_distinct,
            },
            ExprKind::UnresolvedAlias { child } => ExprKind::UnresolvedAlias { child: take(child) },
            ExprKind::Alias {
                child,
                name,
                expr_id,
                qualifier,
            } => ExprKind::Alias {
                child: take(child),
                name: name.clone(),
                expr_id: *expr_id,
                qualifier: qualifier.clone(),
            },
            ExprKind::Cast {
                child,
                data_type,
                time_zone_id,
            } => ExprKind::Cast {
                child: take(child),
                data_type: data_type.clone(),
                time_zone_id: time_zone_id.clone(),
            },
            ExprKind::BinaryArithmetic { op, left, right } => ExprKind::BinaryArithmetic {
                op: *op,
                left: take(left),
                right: take(right),
            },
            ExprKind::BinaryComparison { op, left, right } => ExprKind::BinaryComparison {
                op: *op,
                left: take(left),
                right: take(right),
            },
            ExprKind::BooleanBinary { op, left, right } => ExprKind::BooleanBinary {
                op: *op,
                left: take(left),
                right: take(right),
            },
            ExprKind::Not { child } => ExprKind::Not { child: take(child) },
            ExprKind::IsNull { child } => ExprKind::IsNull { child: take(child) },
            ExprKind::IsNotNull { child } => ExprKind::IsNotNull { child: take(child) },
            ExprKind::CaseWhen {
                branches,
                else_value,
            } => ExprKind::CaseWhen {
                branches: branches
                    .iter()
                    .map(|(c, v)| (take(c), take(v)))
                    .collect(),
                else_value: else_value.as_ref().map(&mut take),
            },
            ExprKind::If {
                predicate,
                true_value,
                false_value,
            } => ExprKind::If {
                predicate: take(predicate),
                true_value: take(true_value),
                false_value: take(false_value),
            },
            ExprKind::In { value, list } => ExprKind::In {
                value: take(value),
                list: list.iter().map(&mut take).collect(),
            },
            ExprKind::Concat { children } => ExprKind::Concat {
                children: children.iter().map(&mut take).collect(),
            },
            ExprKind::GetStructField {
                child,
                ordinal,
                name,
            } => ExprKind::GetStructField {
                child: take(child),
                ordinal: *ordinal,
                name: name.clone(),
            },
            ExprKind::ScalarFunction {
                name,
                args,
                signature,
                time_zone_id,
            } => ExprKind::ScalarFunction {
                name: name.clone(),
                args: args.iter().map(&mut take).collect(),
                signature: signature.clone(),
                time_zone_id: time_zone_id.clone(),
            },
        };
        Self::with_origin_of(kind, self.origin.clone())
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }

    fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }
}
