//! Name to plan lookup for relations referenced in queries.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use common_error::{QuillError, QuillResult};
use quill_logical::PlanRef;

/// Resolves single-part relation names to plans.
pub trait RelationCatalog: Send + Sync {
    fn lookup_relation(&self, name: &str) -> Option<PlanRef>;
}

/// Session-local temporary views.
#[derive(Debug, Default)]
pub struct TempViewRegistry {
    views: RwLock<HashMap<String, PlanRef>>,
    case_sensitive: bool,
}

impl TempViewRegistry {
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            views: RwLock::new(HashMap::new()),
            case_sensitive,
        }
    }

    fn key(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }

    /// Register `plan` under `name`. Fails if the name is taken and
    /// `replace` is false.
    pub fn create(&self, name: &str, plan: PlanRef, replace: bool) -> QuillResult<()> {
        let key = self.key(name);
        let mut views = self.views.write().unwrap_or_else(PoisonError::into_inner);
        if !replace && views.contains_key(&key) {
            return Err(QuillError::invalid_parameter(format!(
                "temporary view '{name}' already exists"
            )));
        }
        views.insert(key, plan);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<PlanRef> {
        self.views
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&self.key(name))
            .cloned()
    }

    /// Remove a view. Returns whether it existed.
    pub fn drop_view(&self, name: &str) -> bool {
        self.views
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key(name))
            .is_some()
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .views
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl RelationCatalog for TempViewRegistry {
    fn lookup_relation(&self, name: &str) -> Option<PlanRef> {
        self.lookup(name)
    }
}

#[cfg(test)]
mod tests {
    use quill_core::DataType;
    use quill_logical::expr::AttributeReference;
    use quill_logical::LogicalPlan;

    use super::*;

    fn relation() -> PlanRef {
        LogicalPlan::local_relation(vec![AttributeReference::new("x", DataType::Integer, true)])
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let views = TempViewRegistry::new(false);
        views.create("People", relation(), false).unwrap();
        assert!(views.lookup("people").is_some());
        assert!(views.lookup_relation("PEOPLE").is_some());
        assert_eq!(views.list(), vec!["people".to_string()]);
    }

    #[test]
    fn test_case_sensitive_lookup() {
        let views = TempViewRegistry::new(true);
        views.create("People", relation(), false).unwrap();
        assert!(views.lookup("people").is_none());
        assert!(views.lookup("People").is_some());
    }

    #[test]
    fn test_create_and_drop() {
        let views = TempViewRegistry::new(false);
        views.create("t", relation(), false).unwrap();
        assert!(views.create("t", relation(), false).is_err());
        views.create("t", relation(), true).unwrap();
        assert!(views.drop_view("T"));
        assert!(!views.drop_view("t"));
        assert!(views.list().is_empty());
    }
}
