//! Process-unique identifiers for resolved attributes.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_EXPR_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of a named expression. Two attribute references denote the same
/// column iff their ids are equal, regardless of name or qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExprId(u64);

impl ExprId {
    /// Allocate a fresh id.
    pub fn new_id() -> Self {
        Self(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
