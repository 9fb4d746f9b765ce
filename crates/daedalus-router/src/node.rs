//! Nodes of the resource tree.
//!
//! Nodes live in an arena owned by the tree and refer to each other by
//! [`NodeId`]. A node has literal children keyed by name and at most one
//! typed child, reached by a segment holding a value.

use std::fmt;
use std::sync::Arc;

use daedalus_core::{Primitive, TypeProperty};
use http::Method;
use indexmap::IndexMap;

use crate::invoker::Invoker;

/// Index of a node in the tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The root node.
    pub const ROOT: Self = Self(0);

    /// Arena position.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One segment of a node path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A literal name.
    Literal(String),
    /// A value of the given primitive.
    Typed(Primitive),
}

/// A node of the resource tree.
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) name: Option<String>,
    pub(crate) by_name: IndexMap<String, NodeId>,
    pub(crate) child: Option<NodeId>,
    pub(crate) child_type: Option<TypeProperty>,
    pub(crate) ty: Option<TypeProperty>,
    pub(crate) invokers: IndexMap<Method, Arc<Invoker>>,
    pub(crate) accessible: IndexMap<String, NodeId>,
    pub(crate) has_mandatory_slash: bool,
}

impl Node {
    /// Parent node; `None` for the root.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Literal name of the segment leading to this node.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Literal children.
    #[must_use]
    pub const fn by_name(&self) -> &IndexMap<String, NodeId> {
        &self.by_name
    }

    /// The typed child.
    #[must_use]
    pub const fn child(&self) -> Option<NodeId> {
        self.child
    }

    /// Property type of the segment leading to the typed child.
    #[must_use]
    pub const fn child_type(&self) -> Option<&TypeProperty> {
        self.child_type.as_ref()
    }

    /// Property type of the segment leading to this node, for typed nodes.
    #[must_use]
    pub const fn ty(&self) -> Option<&TypeProperty> {
        self.ty.as_ref()
    }

    /// Invokers by HTTP method.
    #[must_use]
    pub const fn invokers(&self) -> &IndexMap<Method, Arc<Invoker>> {
        &self.invokers
    }

    /// Invoker for a method.
    #[must_use]
    pub fn invoker(&self, method: &Method) -> Option<&Arc<Invoker>> {
        self.invokers.get(method)
    }

    /// Methods the node answers, sorted.
    #[must_use]
    pub fn allowed(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = self.invokers.keys().cloned().collect();
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        methods
    }

    /// Reachable GET resources by composed name, sorted by name.
    #[must_use]
    pub const fn accessible(&self) -> &IndexMap<String, NodeId> {
        &self.accessible
    }

    /// Whether a trailing slash must follow the segment of this node.
    #[must_use]
    pub const fn has_mandatory_slash(&self) -> bool {
        self.has_mandatory_slash
    }

    /// Whether the node has any children.
    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.by_name.is_empty() || self.child.is_some()
    }
}
