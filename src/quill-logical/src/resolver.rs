//! Binding multi-part names to attributes.
//!
//! A name such as `t.s.f` is matched against a list of candidate attributes:
//! first as `qualifier.name[.field...]`, then, if nothing matched with a
//! qualifier, as `name[.field...]`. Trailing segments left over after the
//! attribute name become struct field accesses.

use common_error::{Origin, QuillError, QuillResult};
use quill_core::{DataType, ExprId};

use crate::expr::{to_sql_id, AttributeReference, Expr, ExprKind, ExprRef};

/// Decides whether two identifiers name the same thing.
pub type Resolver = fn(&str, &str) -> bool;

pub fn case_sensitive_resolution(a: &str, b: &str) -> bool {
    a == b
}

pub fn case_insensitive_resolution(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

/// The resolver for a case sensitivity setting.
pub fn resolver(case_sensitive: bool) -> Resolver {
    if case_sensitive {
        case_sensitive_resolution
    } else {
        case_insensitive_resolution
    }
}

/// How many leading name parts a qualified match consumed, if any.
fn qualified_match(
    name_parts: &[String],
    attr: &AttributeReference,
    resolver: Resolver,
) -> Option<usize> {
    // Longest qualifier suffix first.
    (0..attr.qualifier.len()).find_map(|start| {
        let qualifier = &attr.qualifier[start..];
        let k = qualifier.len();
        let matches = name_parts.len() > k
            && qualifier
                .iter()
                .zip(name_parts)
                .all(|(q, part)| resolver(part, q))
            && resolver(&name_parts[k], &attr.name);
        matches.then_some(k + 1)
    })
}

/// Resolve `name_parts` against `input`.
///
/// Returns `Ok(None)` when nothing matches, the bound attribute on a unique
/// match, and an alias over a struct field access chain when trailing name
/// parts remain. More than one distinct candidate is an
/// `AMBIGUOUS_REFERENCE` error.
pub fn resolve_attribute(
    name_parts: &[String],
    input: &[AttributeReference],
    resolver: Resolver,
    origin: &Origin,
) -> QuillResult<Option<ExprRef>> {
    if name_parts.is_empty() {
        return Ok(None);
    }

    let mut candidates: Vec<(&AttributeReference, &[String])> = input
        .iter()
        .filter_map(|a| qualified_match(name_parts, a, resolver).map(|used| (a, &name_parts[used..])))
        .collect();
    if candidates.is_empty() {
        candidates = input
            .iter()
            .filter(|a| resolver(&name_parts[0], &a.name))
            .map(|a| (a, &name_parts[1..]))
            .collect();
    }

    let mut seen: Vec<ExprId> = Vec::new();
    candidates.retain(|(a, _)| {
        if seen.contains(&a.expr_id) {
            false
        } else {
            seen.push(a.expr_id);
            true
        }
    });

    match candidates.as_slice() {
        [] => Ok(None),
        [(attr, [])] => Ok(Some(attr.to_expr().at(origin.clone()))),
        [(attr, nested)] => {
            let mut current = attr.to_expr().at(origin.clone());
            for field in *nested {
                current = extract_field(current, field, resolver, origin)?;
            }
            let last = nested.last().map_or_else(String::new, Clone::clone);
            Ok(Some(current.alias(&last).at(origin.clone())))
        }
        many => {
            let mut names: Vec<String> = many
                .iter()
                .map(|(a, _)| {
                    let mut parts = a.qualifier.clone();
                    parts.push(a.name.clone());
                    to_sql_id(&parts)
                })
                .collect();
            names.sort();
            Err(QuillError::analysis(
                "AMBIGUOUS_REFERENCE",
                [
                    ("name", to_sql_id(name_parts)),
                    ("referenceNames", format!("[{}]", names.join(", "))),
                ],
                origin.clone(),
            ))
        }
    }
}

fn extract_field(
    base: ExprRef,
    field: &str,
    resolver: Resolver,
    origin: &Origin,
) -> QuillResult<ExprRef> {
    match base.data_type() {
        DataType::Struct(fields) => {
            let Some(ordinal) = fields.iter().position(|f| resolver(&f.name, field)) else {
                let listed = fields
                    .iter()
                    .map(|f| to_sql_id(std::slice::from_ref(&f.name)))
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(QuillError::analysis(
                    "FIELD_NOT_FOUND",
                    [
                        ("fieldName", to_sql_id(&[field.to_string()])),
                        ("fields", listed),
                    ],
                    origin.clone(),
                ));
            };
            let name = fields[ordinal].name.clone();
            Ok(Expr::new(ExprKind::GetStructField {
                child: base,
                ordinal,
                name: Some(name),
            })
            .into_ref()
            .at(origin.clone()))
        }
        other => Err(QuillError::analysis(
            "INVALID_EXTRACT_BASE_FIELD_TYPE",
            [
                ("base", format!("\"{}\"", base.sql())),
                ("other", other.to_string()),
            ],
            origin.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use quill_core::StructField;

    use super::*;

    fn parts(name: &str) -> Vec<String> {
        name.split('.').map(str::to_string).collect()
    }

    fn attr(name: &str, qualifier: &[&str], data_type: DataType) -> AttributeReference {
        AttributeReference::new(name, data_type, true)
            .with_qualifier(qualifier.iter().map(|q| q.to_string()).collect())
    }

    #[test]
    fn test_unique_match_binds() {
        let x = attr("x", &["t"], DataType::Integer);
        let input = vec![x.clone()];
        let r = resolver(false);
        let bound = resolve_attribute(&parts("X"), &input, r, &Origin::default())
            .unwrap()
            .unwrap();
        assert_eq!(bound.to_attribute(), Some(x.clone()));

        let bound = resolve_attribute(&parts("t.x"), &input, r, &Origin::default())
            .unwrap()
            .unwrap();
        assert_eq!(bound.to_attribute(), Some(x));
    }

    #[test]
    fn test_case_sensitive_miss() {
        let input = vec![attr("x", &[], DataType::Integer)];
        let out = resolve_attribute(&parts("X"), &input, resolver(true), &Origin::default()).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_ambiguous_without_qualifier() {
        let input = vec![
            attr("id", &["a"], DataType::Integer),
            attr("id", &["b"], DataType::Integer),
        ];
        let r = resolver(false);
        let err = resolve_attribute(&parts("id"), &input, r, &Origin::default()).unwrap_err();
        assert_eq!(err.error_class(), Some("AMBIGUOUS_REFERENCE"));
        let analysis = err.as_analysis().unwrap();
        assert_eq!(analysis.param("name"), Some("`id`"));
        assert_eq!(analysis.param("referenceNames"), Some("[`a`.`id`, `b`.`id`]"));

        let bound = resolve_attribute(&parts("a.id"), &input, r, &Origin::default())
            .unwrap()
            .unwrap();
        assert_eq!(bound.to_attribute().unwrap().qualifier, vec!["a".to_string()]);
    }

    #[test]
    fn test_nested_field_access() {
        let s = attr(
            "s",
            &["t"],
            DataType::Struct(vec![
                StructField::new("a", DataType::Integer, true),
                StructField::new("b", DataType::String, true),
            ]),
        );
        let input = vec![s];
        let r = resolver(false);
        let bound = resolve_attribute(&parts("t.s.b"), &input, r, &Origin::default())
            .unwrap()
            .unwrap();
        assert_eq!(bound.name(), Some("b"));
        assert_eq!(bound.data_type(), DataType::String);

        let err = resolve_attribute(&parts("s.c"), &input, r, &Origin::default()).unwrap_err();
        assert_eq!(err.error_class(), Some("FIELD_NOT_FOUND"));

        let err = resolve_attribute(&parts("s.a.z"), &input, r, &Origin::default()).unwrap_err();
        assert_eq!(err.error_class(), Some("INVALID_EXTRACT_BASE_FIELD_TYPE"));
    }

    #[test]
    fn test_no_match() {
        let input = vec![attr("x", &[], DataType::Integer)];
        let out = resolve_attribute(&parts("y"), &input, resolver(false), &Origin::default()).unwrap();
        assert!(out.is_none());
    }
}
