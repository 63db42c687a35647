//! # quire_tree
//!
//! Syntax tree definitions for quire.
//!
//! The tree follows the unist/mdast shape: every node has a `type`, an
//! optional source `position`, and either `children` (parents) or a `value`
//! (literals). Nodes own their children, so a tree can be mutated by
//! transform plugins, replaced wholesale, or round-tripped through JSON for
//! the tree-in and tree-out modes.
//!
//! ## Example
//!
//! ```rust
//! use quire_tree::{Node, NodeType};
//!
//! let tree = Node::parent(
//!     NodeType::Root,
//!     vec![Node::parent(
//!         NodeType::Paragraph,
//!         vec![Node::literal(NodeType::Text, "Hello")],
//!     )],
//! );
//!
//! assert_eq!(tree.text_content(), "Hello");
//! ```

mod inspect;
mod node;
mod position;
pub mod visitor;

pub use inspect::inspect;
pub use node::{Node, NodeType};
pub use position::{Point, Position};

pub use visitor::{VisitResult, Visitor};
