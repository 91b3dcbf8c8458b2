//! Final checks on an analyzed plan.
//!
//! Runs once after the resolution fixed point. The plan is walked bottom-up
//! and the first offending node is reported, so an error always points at the
//! innermost cause. A plan that passes is marked analyzed.

use common_error::{internal_err, Origin, QuillError, QuillResult};
use quill_core::DataType;
use quill_logical::expr::{to_sql_id, Expr, ExprKind};
use quill_logical::{LogicalPlan, PlanKind, TreeNode};

/// How many column names an `UNRESOLVED_COLUMN` error proposes.
const MAX_PROPOSALS: usize = 5;

/// Check `plan` and mark it analyzed. Already analyzed plans pass trivially.
///
/// `case_sensitive` is the session setting used when comparing struct types.
pub fn check_analysis(plan: &LogicalPlan, case_sensitive: bool) -> QuillResult<()> {
    if plan.analyzed() {
        return Ok(());
    }
    check_operators(plan, case_sensitive)?;
    if !plan.resolved() {
        return Err(QuillError::internal_with_context(
            "found an unresolved operator after analysis",
            plan.tree_string(),
        ));
    }
    plan.set_analyzed();
    Ok(())
}

fn check_operators(plan: &LogicalPlan, case_sensitive: bool) -> QuillResult<()> {
    if plan.analyzed() {
        return Ok(());
    }
    for child in plan.children() {
        check_operators(&child, case_sensitive)?;
    }
    check_operator(plan, case_sensitive)
}

fn origin_of(e: &Expr, plan: &LogicalPlan) -> Origin {
    if e.origin.is_empty() {
        plan.origin().clone()
    } else {
        e.origin.clone()
    }
}

fn check_operator(plan: &LogicalPlan, case_sensitive: bool) -> QuillResult<()> {
    if let PlanKind::UnresolvedRelation {
        multipart_identifier,
    } = plan.kind()
    {
        return Err(QuillError::analysis(
            "TABLE_OR_VIEW_NOT_FOUND",
            [("relationName", to_sql_id(multipart_identifier))],
            plan.origin().clone(),
        ));
    }

    for e in plan.expressions() {
        e.try_foreach_up(&mut |node: &Expr| check_expression(node, plan, case_sensitive))?;
    }

    match plan.kind() {
        PlanKind::Filter { condition, .. } if condition.data_type() != DataType::Boolean => {
            Err(QuillError::analysis(
                "DATATYPE_MISMATCH.FILTER_NOT_BOOLEAN",
                [
                    ("sqlExpr", format!("\"{}\"", condition.sql())),
                    ("type", condition.data_type().to_string()),
                ],
                origin_of(condition, plan),
            ))
        }
        PlanKind::Join {
            condition: Some(condition),
            ..
        } if condition.data_type() != DataType::Boolean => Err(QuillError::analysis(
            "JOIN_CONDITION_IS_NOT_BOOLEAN_TYPE",
            [
                ("joinCondition", format!("\"{}\"", condition.sql())),
                ("conditionType", condition.data_type().to_string()),
            ],
            origin_of(condition, plan),
        )),
        _ => Ok(()),
    }
}

fn check_expression(e: &Expr, plan: &LogicalPlan, case_sensitive: bool) -> QuillResult<()> {
    match &e.kind {
        ExprKind::UnresolvedAttribute { name_parts } => Err(QuillError::analysis(
            "UNRESOLVED_COLUMN",
            [
                ("objectName", to_sql_id(name_parts)),
                ("proposal", proposal(name_parts, plan)),
            ],
            origin_of(e, plan),
        )),
        _ if e.children_resolved() && !e.is_unresolved_kind() => {
            if let Err(failure) = e.check_input_data_types(case_sensitive) {
                return Err(QuillError::analysis(
                    "DATATYPE_MISMATCH",
                    [
                        ("sqlExpr", format!("\"{}\"", e.sql())),
                        ("message", failure.message),
                    ],
                    origin_of(e, plan),
                ));
            }
            if matches!(e.kind, ExprKind::Cast { .. }) && !e.resolved() {
                internal_err!("found an unresolved cast after analysis: {e}");
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Output columns of the children closest in spelling to `name_parts`.
fn proposal(name_parts: &[String], plan: &LogicalPlan) -> String {
    let target = name_parts.join(".").to_lowercase();
    let mut candidates: Vec<(usize, String)> = Vec::new();
    for a in plan.children_output() {
        let parts: Vec<String> = a.qualifier.iter().cloned().chain([a.name.clone()]).collect();
        let distance = levenshtein(&target, &parts.join(".").to_lowercase())
            .min(levenshtein(&target, &a.name.to_lowercase()));
        let id = to_sql_id(&parts);
        if candidates.iter().all(|(_, seen)| *seen != id) {
            candidates.push((distance, id));
        }
    }
    // Stable, so equally close names keep their output order.
    candidates.sort_by_key(|(distance, _)| *distance);
    candidates
        .into_iter()
        .take(MAX_PROPOSALS)
        .map(|(_, id)| id)
        .collect::<Vec<_>>()
        .join(", ")
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == *cb {
                diagonal
            } else {
                1 + diagonal.min(above).min(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common_error::Origin;
    use quill_core::Value;
    use quill_logical::expr::{col, lit, AttributeReference};
    use quill_logical::{JoinType, PlanBuilder, PlanRef};

    use super::*;

    fn relation(columns: &[(&str, DataType)]) -> PlanRef {
        let attrs = columns
            .iter()
            .map(|(n, t)| AttributeReference::new(*n, t.clone(), true))
            .collect();
        LogicalPlan::subquery_alias("t", LogicalPlan::local_relation(attrs))
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn test_missing_relation() {
        let plan = PlanBuilder::relation("missing").at(Origin::at(1, 14)).build();
        let err = check_analysis(&plan, false).unwrap_err();
        let analysis = err.as_analysis().unwrap();
        assert_eq!(analysis.error_class, "TABLE_OR_VIEW_NOT_FOUND");
        assert_eq!(analysis.param("relationName"), Some("`missing`"));
        assert_eq!(analysis.origin, Origin::at(1, 14));
    }

    #[test]
    fn test_unresolved_column_with_proposal() {
        let plan = PlanBuilder::from_plan(relation(&[("name", DataType::String), ("id", DataType::Integer)]))
            .project(vec![col("nmae").at(Origin::at(1, 7))])
            .build();
        let err = check_analysis(&plan, false).unwrap_err();
        let analysis = err.as_analysis().unwrap();
        assert_eq!(analysis.error_class, "UNRESOLVED_COLUMN");
        assert_eq!(analysis.param("objectName"), Some("`nmae`"));
        assert_eq!(analysis.param("proposal"), Some("`t`.`name`, `t`.`id`"));
        assert_eq!(analysis.origin, Origin::at(1, 7));
    }

    #[test]
    fn test_filter_not_boolean() {
        let x = AttributeReference::new("x", DataType::Integer, false);
        let plan = PlanBuilder::local(vec![x.clone()]).filter(x.to_expr()).build();
        let err = check_analysis(&plan, false).unwrap_err();
        let analysis = err.as_analysis().unwrap();
        assert_eq!(analysis.error_class, "DATATYPE_MISMATCH.FILTER_NOT_BOOLEAN");
        assert_eq!(analysis.param("sqlExpr"), Some("\"x\""));
        assert_eq!(analysis.param("type"), Some("\"INT\""));
    }

    #[test]
    fn test_join_condition_not_boolean() {
        let a = relation(&[("id", DataType::Integer)]);
        let b = relation(&[("n", DataType::Integer)]);
        let id = a.output()[0].to_expr();
        let plan = LogicalPlan::join(a, b, JoinType::Inner, Some(id));
        let err = check_analysis(&plan, false).unwrap_err();
        assert_eq!(err.error_class(), Some("JOIN_CONDITION_IS_NOT_BOOLEAN_TYPE"));
    }

    #[test]
    fn test_type_mismatch() {
        let d = AttributeReference::new("d", DataType::Date, false);
        let plan = PlanBuilder::local(vec![d.clone()])
            .project(vec![d.to_expr().add(lit(Value::Integer(1))).alias("z")])
            .build();
        let err = check_analysis(&plan, false).unwrap_err();
        let analysis = err.as_analysis().unwrap();
        assert_eq!(analysis.error_class, "DATATYPE_MISMATCH");
        assert_eq!(analysis.param("sqlExpr"), Some("\"(d + 1)\""));
    }

    #[test]
    fn test_cast_without_zone_is_internal() {
        let d = AttributeReference::new("d", DataType::Date, false);
        let plan = PlanBuilder::local(vec![d.clone()])
            .project(vec![d.to_expr().cast(DataType::Timestamp).alias("ts")])
            .build();
        let err = check_analysis(&plan, false).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn test_marks_analyzed() {
        let x = AttributeReference::new("x", DataType::Integer, false);
        let plan = PlanBuilder::local(vec![x.clone()])
            .filter(x.to_expr().gt(lit(Value::Integer(0))))
            .build();
        check_analysis(&plan, false).unwrap();
        assert!(plan.analyzed());
        assert!(plan.children().iter().all(|c| c.analyzed()));
        check_analysis(&Arc::clone(&plan), false).unwrap();
    }

    #[test]
    fn test_unnamed_projection_is_unresolved() {
        let x = AttributeReference::new("x", DataType::Integer, false);
        let plan = PlanBuilder::local(vec![x.clone()])
            .project(vec![x.to_expr().add(lit(Value::Integer(1)))])
            .build();
        let err = check_analysis(&plan, false).unwrap_err();
        assert!(err.is_internal());
        assert!(!plan.analyzed());
    }
}
