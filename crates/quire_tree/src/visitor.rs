//! Read-only depth-first traversal.
//!
//! # Example
//!
//! ```rust
//! use std::ops::ControlFlow;
//! use quire_tree::{Node, NodeType, VisitResult, Visitor};
//! use quire_tree::visitor::walk_node;
//!
//! struct Urls(Vec<String>);
//!
//! impl Visitor for Urls {
//!     fn enter(&mut self, node: &Node) -> VisitResult {
//!         if let Some(url) = &node.url {
//!             self.0.push(url.clone());
//!         }
//!         ControlFlow::Continue(())
//!     }
//! }
//!
//! let tree = Node::parent(NodeType::Root, vec![Node::link("a.md", vec![])]);
//! let mut urls = Urls(Vec::new());
//! let _ = walk_node(&mut urls, &tree);
//! assert_eq!(urls.0, vec!["a.md"]);
//! ```

use std::ops::ControlFlow;

use crate::Node;

/// Result of visiting a node. `Break` stops the whole traversal.
pub type VisitResult = ControlFlow<()>;

/// A visitor over a tree.
pub trait Visitor {
    /// Called before the children of `node` are visited.
    fn enter(&mut self, node: &Node) -> VisitResult;

    /// Called after the children of `node` were visited.
    fn leave(&mut self, _node: &Node) -> VisitResult {
        ControlFlow::Continue(())
    }
}

/// Visits `node` and then its descendants, in document order.
pub fn walk_node<V: Visitor + ?Sized>(visitor: &mut V, node: &Node) -> VisitResult {
    visitor.enter(node)?;
    walk_children(visitor, node)?;
    visitor.leave(node)
}

/// Visits the descendants of `node`, but not `node` itself.
pub fn walk_children<V: Visitor + ?Sized>(visitor: &mut V, node: &Node) -> VisitResult {
    for child in &node.children {
        walk_node(visitor, child)?;
    }
    ControlFlow::Continue(())
}
