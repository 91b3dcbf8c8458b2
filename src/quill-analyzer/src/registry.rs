//! Function lookup by case-insensitive name.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use common_error::{Origin, QuillError, QuillResult};
use quill_core::{AbstractDataType, DataType};
use quill_logical::expr::{to_sql_id, Expr, ExprKind, ExprRef, FunctionSignature, ReturnType};

/// Builds a resolved expression from resolved arguments.
pub type FunctionBuilder =
    Arc<dyn Fn(Vec<ExprRef>, &Origin) -> QuillResult<ExprRef> + Send + Sync>;

/// Search path reported when a routine cannot be found.
pub const SEARCH_PATH: &str = "[`system`.`builtin`, `system`.`session`]";

/// A registered function: its metadata and builder.
#[derive(Clone)]
pub struct FunctionInfo {
    pub name: String,
    pub usage: String,
    pub builder: FunctionBuilder,
}

impl fmt::Debug for FunctionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionInfo")
            .field("name", &self.name)
            .field("usage", &self.usage)
            .finish_non_exhaustive()
    }
}

fn wrong_num_args(name: &str, expected: &str, actual: usize, origin: &Origin) -> QuillError {
    QuillError::analysis(
        "WRONG_NUM_ARGS",
        [
            ("functionName", to_sql_id(&[name.to_string()])),
            ("expectedNum", expected.to_string()),
            ("actualNum", actual.to_string()),
        ],
        origin.clone(),
    )
}

/// `UNRESOLVED_ROUTINE` for a function name that is not registered.
pub fn unresolved_routine(name_parts: &[String], origin: &Origin) -> QuillError {
    QuillError::analysis(
        "UNRESOLVED_ROUTINE",
        [
            ("routineName", to_sql_id(name_parts)),
            ("searchPath", SEARCH_PATH.to_string()),
        ],
        origin.clone(),
    )
}

/// Builder for a [`ExprKind::ScalarFunction`] with the given signature.
///
/// The builder rejects calls whose argument count the signature does not
/// accept; argument types are left to coercion and the analysis checks.
pub fn scalar_function(name: &str, signature: FunctionSignature) -> FunctionBuilder {
    let name = name.to_string();
    Arc::new(move |args: Vec<ExprRef>, origin: &Origin| {
        if !signature.accepts_arity(args.len()) {
            let expected = if signature.variadic.is_some() {
                format!(">= {}", signature.input_types.len())
            } else {
                signature.input_types.len().to_string()
            };
            return Err(wrong_num_args(&name, &expected, args.len(), origin));
        }
        Ok(Expr::new(ExprKind::ScalarFunction {
            name: name.clone(),
            args,
            signature: signature.clone(),
            time_zone_id: None,
        })
        .into_ref()
        .at(origin.clone()))
    })
}

/// Case-insensitive registry of functions, safe for concurrent use.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: RwLock<HashMap<String, FunctionInfo>>,
}

impl Clone for FunctionRegistry {
    fn clone(&self) -> Self {
        let functions = self
            .functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Self {
            functions: RwLock::new(functions),
        }
    }
}

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry seeded with the built-in functions.
    pub fn builtin() -> Self {
        use AbstractDataType::{AnyNumeric, AnyTimestamp};

        let registry = Self::new();
        let string: AbstractDataType = DataType::String.into();
        let fixed = ReturnType::Fixed;

        registry.register(
            "upper",
            "upper(str) - Returns `str` with all characters changed to uppercase.",
            scalar_function(
                "upper",
                FunctionSignature::exact(vec![string.clone()], fixed(DataType::String)),
            ),
        );
        registry.register(
            "lower",
            "lower(str) - Returns `str` with all characters changed to lowercase.",
            scalar_function(
                "lower",
                FunctionSignature::exact(vec![string.clone()], fixed(DataType::String)),
            ),
        );
        registry.register(
            "abs",
            "abs(expr) - Returns the absolute value of the numeric value.",
            scalar_function(
                "abs",
                FunctionSignature::exact(vec![AnyNumeric], ReturnType::SameAsArg(0)),
            ),
        );
        registry.register(
            "length",
            "length(expr) - Returns the character length of string data or number of bytes of binary data.",
            scalar_function(
                "length",
                FunctionSignature::exact(
                    vec![AbstractDataType::one_of([string, DataType::Binary.into()])],
                    fixed(DataType::Integer),
                ),
            ),
        );
        registry.register(
            "hour",
            "hour(timestamp) - Returns the hour component of the timestamp.",
            scalar_function(
                "hour",
                FunctionSignature::exact(vec![AnyTimestamp], fixed(DataType::Integer))
                    .with_time_zone(),
            ),
        );
        registry.register(
            "date_add",
            "date_add(start_date, num_days) - Returns the date that is `num_days` after `start_date`.",
            scalar_function(
                "date_add",
                FunctionSignature::exact(
                    vec![
                        DataType::Date.into(),
                        AbstractDataType::one_of([
                            DataType::Integer.into(),
                            DataType::Short.into(),
                            DataType::Byte.into(),
                        ]),
                    ],
                    fixed(DataType::Date),
                ),
            ),
        );

        let coalesce_signature =
            FunctionSignature::variadic(AbstractDataType::Any, ReturnType::CommonOfArgs);
        let build_coalesce = scalar_function("coalesce", coalesce_signature);
        registry.register(
            "coalesce",
            "coalesce(expr1, expr2, ...) - Returns the first non-null argument if exists. Otherwise, null.",
            Arc::new(move |args: Vec<ExprRef>, origin: &Origin| {
                if args.is_empty() {
                    return Err(wrong_num_args("coalesce", "> 0", 0, origin));
                }
                build_coalesce(args, origin)
            }),
        );
        registry.register(
            "concat",
            "concat(col1, col2, ..., colN) - Returns the concatenation of col1, col2, ..., colN.",
            Arc::new(|children: Vec<ExprRef>, origin: &Origin| {
                Ok(Expr::concat(children).at(origin.clone()))
            }),
        );

        registry
    }

    /// Register (or replace) a function. Returns whether a function of the
    /// same name was replaced.
    pub fn register(&self, name: &str, usage: &str, builder: FunctionBuilder) -> bool {
        let info = FunctionInfo {
            name: name.to_lowercase(),
            usage: usage.to_string(),
            builder,
        };
        self.functions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_lowercase(), info)
            .is_some()
    }

    /// Metadata of a function.
    pub fn lookup_info(&self, name: &str) -> Option<FunctionInfo> {
        self.functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&name.to_lowercase())
            .cloned()
    }

    pub fn function_exists(&self, name: &str) -> bool {
        self.lookup_info(name).is_some()
    }

    /// Build a call to the function named by the trailing segment of
    /// `name_parts`.
    pub fn lookup_function(
        &self,
        name_parts: &[String],
        args: Vec<ExprRef>,
        origin: &Origin,
    ) -> QuillResult<ExprRef> {
        let info = name_parts
            .last()
            .and_then(|name| self.lookup_info(name))
            .ok_or_else(|| unresolved_routine(name_parts, origin))?;
        (info.builder)(args, origin)
    }

    /// Remove a function. Returns whether it existed.
    pub fn drop_function(&self, name: &str) -> bool {
        self.functions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&name.to_lowercase())
            .is_some()
    }

    /// Registered names, sorted.
    pub fn list_functions(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn clear(&self) {
        self.functions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use quill_core::Value;
    use quill_logical::expr::lit;

    use super::*;

    fn parts(name: &str) -> Vec<String> {
        vec![name.to_string()]
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = FunctionRegistry::builtin();
        let e = registry
            .lookup_function(&parts("UPPER"), vec![lit(Value::String("a".into()))], &Origin::default())
            .unwrap();
        assert_eq!(e.sql(), "upper('a')");
        assert_eq!(e.data_type(), DataType::String);
        assert!(registry.function_exists("Upper"));
    }

    #[test]
    fn test_trailing_segment_is_used() {
        let registry = FunctionRegistry::builtin();
        let name = vec!["system".to_string(), "builtin".to_string(), "abs".to_string()];
        let e = registry
            .lookup_function(&name, vec![lit(Value::Integer(-1))], &Origin::default())
            .unwrap();
        assert_eq!(e.data_type(), DataType::Integer);
    }

    #[test]
    fn test_unknown_function() {
        let registry = FunctionRegistry::builtin();
        let err = registry
            .lookup_function(&parts("nope"), vec![], &Origin::at(1, 7))
            .unwrap_err();
        let analysis = err.as_analysis().unwrap();
        assert_eq!(analysis.error_class, "UNRESOLVED_ROUTINE");
        assert_eq!(analysis.param("routineName"), Some("`nope`"));
        assert_eq!(analysis.param("searchPath"), Some(SEARCH_PATH));
        assert_eq!(analysis.origin, Origin::at(1, 7));
    }

    #[test]
    fn test_wrong_number_of_arguments() {
        let registry = FunctionRegistry::builtin();
        let err = registry
            .lookup_function(&parts("upper"), vec![], &Origin::default())
            .unwrap_err();
        assert_eq!(err.error_class(), Some("WRONG_NUM_ARGS"));
        assert_eq!(err.as_analysis().unwrap().param("expectedNum"), Some("1"));

        let err = registry
            .lookup_function(&parts("coalesce"), vec![], &Origin::default())
            .unwrap_err();
        assert_eq!(err.error_class(), Some("WRONG_NUM_ARGS"));
    }

    #[test]
    fn test_register_drop_list_clone() {
        let registry = FunctionRegistry::new();
        assert!(!registry.register(
            "Twice",
            "",
            Arc::new(|args: Vec<ExprRef>, _: &Origin| {
                Ok(Expr::concat(vec![args[0].clone(), args[0].clone()]))
            }),
        ));
        assert_eq!(registry.list_functions(), vec!["twice".to_string()]);

        let copy = registry.clone();
        assert!(registry.drop_function("TWICE"));
        assert!(registry.list_functions().is_empty());
        assert!(copy.function_exists("twice"));
    }

    #[test]
    fn test_builtin_catalogue() {
        let names = FunctionRegistry::builtin().list_functions();
        for name in ["abs", "coalesce", "concat", "date_add", "hour", "length", "lower", "upper"] {
            assert!(names.contains(&name.to_string()), "missing {name}");
        }
    }
}
