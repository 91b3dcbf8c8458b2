//! Immutable tree substrate shared by expressions and plans.
//!
//! Nodes are held behind `Arc` and never mutated. Every rewrite builds new
//! nodes only along the path that actually changed; untouched subtrees are
//! shared with the input, and a rewrite that changes nothing hands back the
//! very same `Arc`. Change detection everywhere goes through
//! [`TreeNode::fast_equals`].

use std::sync::Arc;

use common_error::{Origin, QuillError, QuillResult};

/// A node of an immutable tree.
pub trait TreeNode: PartialEq + Clone + Sized {
    /// Direct children, in order. Empty for leaves.
    fn children(&self) -> Vec<Arc<Self>>;

    /// Build a node of the same kind and arguments with `children` in place
    /// of the current ones. `children.len()` always equals the current count.
    fn rebuild_with_children(&self, children: Vec<Arc<Self>>) -> Self;

    /// Source position this node was created from.
    fn origin(&self) -> &Origin;

    /// Replace the origin.
    fn with_origin(self, origin: Origin) -> Self;

    /// Reference identity first, structural equality second.
    fn fast_equals(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || self == other
    }

    /// Replace the children of this node.
    ///
    /// Returns `self` unchanged when there are no children or every new child
    /// `fast_equals` its counterpart.
    fn with_new_children(self: Arc<Self>, new_children: Vec<Arc<Self>>) -> QuillResult<Arc<Self>> {
        let old = self.children();
        if old.len() != new_children.len() {
            return Err(QuillError::internal(format!(
                "with_new_children expects {} children, got {}",
                old.len(),
                new_children.len()
            )));
        }
        if old.is_empty() || old.iter().zip(&new_children).all(|(a, b)| a.fast_equals(b)) {
            return Ok(self);
        }
        Ok(Arc::new(self.rebuild_with_children(new_children)))
    }

    /// Apply `f` to every child. Returns `self` if no child changed.
    fn map_children<F>(self: Arc<Self>, mut f: F) -> Arc<Self>
    where
        F: FnMut(Arc<Self>) -> Arc<Self>,
    {
        let old = self.children();
        if old.is_empty() {
            return self;
        }
        let mut changed = false;
        let new_children: Vec<_> = old
            .iter()
            .map(|child| {
                let new_child = f(Arc::clone(child));
                changed |= !new_child.fast_equals(child);
                new_child
            })
            .collect();
        if changed {
            Arc::new(self.rebuild_with_children(new_children))
        } else {
            self
        }
    }

    /// Fallible [`TreeNode::map_children`].
    fn try_map_children<E, F>(self: Arc<Self>, mut f: F) -> Result<Arc<Self>, E>
    where
        F: FnMut(Arc<Self>) -> Result<Arc<Self>, E>,
    {
        let old = self.children();
        if old.is_empty() {
            return Ok(self);
        }
        let mut changed = false;
        let mut new_children = Vec::with_capacity(old.len());
        for child in &old {
            let new_child = f(Arc::clone(child))?;
            changed |= !new_child.fast_equals(child);
            new_children.push(new_child);
        }
        if changed {
            Ok(Arc::new(self.rebuild_with_children(new_children)))
        } else {
            Ok(self)
        }
    }

    /// Post-order rewrite: children first, then `rule` exactly once on the
    /// (possibly rebuilt) node.
    fn transform_up<F>(self: Arc<Self>, rule: &mut F) -> Arc<Self>
    where
        F: FnMut(Arc<Self>) -> Arc<Self>,
    {
        let node = self.map_children(|child| child.transform_up(rule));
        let out = rule(Arc::clone(&node));
        inherit_origin(&node, out)
    }

    /// Pre-order rewrite: `rule` on this node first, then on the children of
    /// its result.
    fn transform_down<F>(self: Arc<Self>, rule: &mut F) -> Arc<Self>
    where
        F: FnMut(Arc<Self>) -> Arc<Self>,
    {
        let out = rule(Arc::clone(&self));
        let node = inherit_origin(&self, out);
        node.map_children(|child| child.transform_down(rule))
    }

    /// Fallible [`TreeNode::transform_up`].
    fn try_transform_up<E, F>(self: Arc<Self>, rule: &mut F) -> Result<Arc<Self>, E>
    where
        F: FnMut(Arc<Self>) -> Result<Arc<Self>, E>,
    {
        let node = self.try_map_children(|child| child.try_transform_up(rule))?;
        let out = rule(Arc::clone(&node))?;
        Ok(inherit_origin(&node, out))
    }

    /// Fallible [`TreeNode::transform_down`].
    fn try_transform_down<E, F>(self: Arc<Self>, rule: &mut F) -> Result<Arc<Self>, E>
    where
        F: FnMut(Arc<Self>) -> Result<Arc<Self>, E>,
    {
        let out = rule(Arc::clone(&self))?;
        let node = inherit_origin(&self, out);
        node.try_map_children(|child| child.try_transform_down(rule))
    }

    /// Whether `pred` holds for this node or any descendant.
    fn exists<F>(&self, pred: &mut F) -> bool
    where
        F: FnMut(&Self) -> bool,
    {
        pred(self) || self.children().iter().any(|c| c.exists(pred))
    }

    /// Visit every node in pre-order.
    fn foreach<F>(&self, f: &mut F)
    where
        F: FnMut(&Self),
    {
        f(self);
        for child in self.children() {
            child.foreach(f);
        }
    }

    /// Visit every node in post-order.
    fn foreach_up<F>(&self, f: &mut F)
    where
        F: FnMut(&Self),
    {
        for child in self.children() {
            child.foreach_up(f);
        }
        f(self);
    }

    /// Fallible post-order visit; stops at the first error.
    fn try_foreach_up<E, F>(&self, f: &mut F) -> Result<(), E>
    where
        F: FnMut(&Self) -> Result<(), E>,
    {
        for child in self.children() {
            child.try_foreach_up(f)?;
        }
        f(self)
    }

    /// Number of nodes in the tree.
    fn node_count(&self) -> usize {
        1 + self.children().iter().map(|c| c.node_count()).sum::<usize>()
    }
}

/// A node produced by a rule inherits the origin of the node it replaced,
/// unless it carries one of its own.
pub fn inherit_origin<T: TreeNode>(before: &Arc<T>, after: Arc<T>) -> Arc<T> {
    if Arc::ptr_eq(before, &after) || before.origin().is_empty() || !after.origin().is_empty() {
        return after;
    }
    Arc::new(Arc::unwrap_or_clone(after).with_origin(before.origin().clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Node {
        value: i32,
        children: Vec<Arc<Node>>,
        origin: Origin,
    }

    impl PartialEq for Node {
        fn eq(&self, other: &Self) -> bool {
            self.value == other.value && self.children == other.children
        }
    }

    impl TreeNode for Node {
        fn children(&self) -> Vec<Arc<Self>> {
            self.children.clone()
        }

        fn rebuild_with_children(&self, children: Vec<Arc<Self>>) -> Self {
            Self {
                value: self.value,
                children,
                origin: self.origin.clone(),
            }
        }

        fn origin(&self) -> &Origin {
            &self.origin
        }

        fn with_origin(mut self, origin: Origin) -> Self {
            self.origin = origin;
            self
        }
    }

    fn node(value: i32, children: Vec<Arc<Node>>) -> Arc<Node> {
        Arc::new(Node {
            value,
            children,
            origin: Origin::default(),
        })
    }

    fn sample() -> Arc<Node> {
        node(1, vec![node(2, vec![node(4, vec![])]), node(3, vec![])])
    }

    #[test]
    fn test_identity_transform_returns_same_instance() {
        let tree = sample();
        let out = Arc::clone(&tree).transform_up(&mut |n| n);
        assert!(Arc::ptr_eq(&tree, &out));
        let out = Arc::clone(&tree).transform_down(&mut |n| n);
        assert!(Arc::ptr_eq(&tree, &out));
    }

    #[test]
    fn test_with_new_children_short_circuits() {
        let tree = sample();
        let same = Arc::clone(&tree).with_new_children(tree.children()).unwrap();
        assert!(Arc::ptr_eq(&tree, &same));

        // Structurally equal but distinct children also short-circuit.
        let copies = vec![node(2, vec![node(4, vec![])]), node(3, vec![])];
        let same = Arc::clone(&tree).with_new_children(copies).unwrap();
        assert!(Arc::ptr_eq(&tree, &same));

        let changed = Arc::clone(&tree)
            .with_new_children(vec![node(9, vec![]), node(3, vec![])])
            .unwrap();
        assert!(!Arc::ptr_eq(&tree, &changed));
        assert_eq!(changed.children()[0].value, 9);
        // The untouched child is shared.
        assert!(Arc::ptr_eq(&tree.children()[1], &changed.children()[1]));
    }

    #[test]
    fn test_with_new_children_arity_mismatch() {
        let err = sample().with_new_children(vec![]).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn test_transform_up_is_post_order() {
        let mut visited = Vec::new();
        sample().transform_up(&mut |n| {
            visited.push(n.value);
            n
        });
        assert_eq!(visited, vec![4, 2, 3, 1]);
    }

    #[test]
    fn test_transform_down_is_pre_order() {
        let mut visited = Vec::new();
        sample().transform_down(&mut |n| {
            visited.push(n.value);
            n
        });
        assert_eq!(visited, vec![1, 2, 4, 3]);
    }

    #[test]
    fn test_transform_up_rewrites_and_inherits_origin() {
        let leaf = Arc::new(Node {
            value: 4,
            children: vec![],
            origin: Origin::at(3, 7),
        });
        let tree = node(1, vec![leaf]);
        let out = tree.transform_up(&mut |n| {
            if n.value == 4 {
                node(40, vec![])
            } else {
                n
            }
        });
        let rewritten = &out.children()[0];
        assert_eq!(rewritten.value, 40);
        assert_eq!(rewritten.origin(), &Origin::at(3, 7));
    }

    #[test]
    fn test_try_transform_stops_on_error() {
        let result: Result<Arc<Node>, String> = sample().try_transform_up(&mut |n| {
            if n.value == 2 {
                Err("boom".to_string())
            } else {
                Ok(n)
            }
        });
        assert_eq!(result.unwrap_err(), "boom");
    }

    #[test]
    fn test_queries() {
        let tree = sample();
        assert_eq!(tree.node_count(), 4);
        assert!(tree.exists(&mut |n| n.value == 4));
        assert!(!tree.exists(&mut |n| n.value == 5));
        let mut order = Vec::new();
        tree.foreach_up(&mut |n| order.push(n.value));
        assert_eq!(order, vec![4, 2, 3, 1]);
    }
}
