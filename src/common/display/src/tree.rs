//! Tree display utilities for query plans.

use std::fmt;

/// A node that can be rendered as part of a display tree.
pub trait DisplayNode {
    /// One-line description of this node (operator name and arguments).
    fn display_name(&self) -> String;

    /// Child nodes, in display order.
    fn display_children(&self) -> Vec<&dyn DisplayNode>;

    /// Optional marker appended after the name, e.g. `resolved` state.
    fn display_marker(&self) -> Option<String> {
        None
    }
}

/// Helper for displaying tree structures.
pub struct DisplayTree<'a> {
    root: &'a dyn DisplayNode,
}

impl<'a> DisplayTree<'a> {
    /// Create a new display tree.
    pub fn new(root: &'a dyn DisplayNode) -> Self {
        Self { root }
    }

    fn fmt_line(f: &mut fmt::Formatter<'_>, node: &dyn DisplayNode) -> fmt::Result {
        write!(f, "{}", node.display_name())?;
        if let Some(marker) = node.display_marker() {
            write!(f, " ({marker})")?;
        }
        writeln!(f)
    }

    fn fmt_node(
        f: &mut fmt::Formatter<'_>,
        node: &dyn DisplayNode,
        prefix: &str,
        is_last: bool,
    ) -> fmt::Result {
        let connector = if is_last { "└─ " } else { "├─ " };
        write!(f, "{prefix}{connector}")?;
        Self::fmt_line(f, node)?;

        let children = node.display_children();
        let child_prefix = format!("{prefix}{}", if is_last { "   " } else { "│  " });

        for (i, child) in children.iter().enumerate() {
            Self::fmt_node(f, *child, &child_prefix, i == children.len() - 1)?;
        }

        Ok(())
    }
}

impl fmt::Display for DisplayTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Self::fmt_line(f, self.root)?;

        let children = self.root.display_children();
        for (i, child) in children.iter().enumerate() {
            Self::fmt_node(f, *child, "", i == children.len() - 1)?;
        }

        Ok(())
    }
}
