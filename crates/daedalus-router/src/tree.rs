//! The resource tree and its builder.
//!
//! The assembler places invokers into a [`TreeBuilder`], which creates the
//! nodes along each invoker path. Once every invoker is placed, the builder
//! computes the derived node data and freezes into a [`ResourceTree`]:
//!
//! ```text
//!                 (root) [GET]
//!                    │
//!              "User" [GET, POST]
//!                    │
//!               {User.Id} [GET, PUT, DELETE]
//!                    │
//!               "Article" [GET]
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use daedalus_codec::PathEncoder;
use daedalus_core::{Converter, Primitive, PropertyKind, TypeProperty, Value};
use http::Method;
use indexmap::IndexMap;

use crate::error::{MatchError, TreeError};
use crate::invoker::{Invoker, PathElement};
use crate::node::{Node, NodeId, Segment};
use crate::path::{split_extension, PathMatch};

/// Staged, mutable form of the resource tree.
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
    model_paths: IndexMap<String, NodeId>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    /// Creates a builder holding only the root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            model_paths: IndexMap::new(),
        }
    }

    /// Node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether only the root exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[0].invokers.is_empty()
    }

    /// Places an invoker at the end of its path, creating missing nodes.
    ///
    /// The path is checked before any node is created, so a rejected
    /// invoker leaves the tree untouched.
    pub fn place(&mut self, mut invoker: Invoker) -> Result<NodeId, TreeError> {
        let existing = self.check(&invoker)?;
        if let Some(id) = existing {
            if let Some(bound) = self.nodes[id.0].invokers.get(&invoker.http_method) {
                return Err(TreeError::DuplicateMethod {
                    method: invoker.http_method.to_string(),
                    path: path_text(&segments_of(&self.nodes, id)),
                    existing: bound.id.clone(),
                });
            }
        }

        let mut current = NodeId::ROOT;
        for element in &invoker.path {
            current = match element {
                PathElement::Name(name) => self.named_child(current, name),
                PathElement::Property { property, .. } | PathElement::Injected { property, .. } => {
                    self.typed_child(current, property)
                }
            };
        }

        invoker.node = Some(current);
        tracing::debug!(
            invoker = %invoker.id,
            method = %invoker.http_method,
            path = %path_text(&segments_of(&self.nodes, current)),
            "Placed invoker"
        );
        self.nodes[current.0]
            .invokers
            .insert(invoker.http_method.clone(), Arc::new(invoker));
        Ok(current)
    }

    /// The node an invoker would be placed on, when that node exists.
    pub fn locate(&self, invoker: &Invoker) -> Result<Option<NodeId>, TreeError> {
        self.check(invoker)
    }

    /// The invoker bound to a method of a node.
    #[must_use]
    pub fn bound(&self, node: NodeId, method: &Method) -> Option<&Arc<Invoker>> {
        self.nodes.get(node.0)?.invokers.get(method)
    }

    /// Removes the invoker bound to a method of a node.
    pub fn unbind(&mut self, node: NodeId, method: &Method) -> Option<Arc<Invoker>> {
        self.nodes.get_mut(node.0)?.invokers.shift_remove(method)
    }

    /// Walks the existing nodes along the invoker path.
    ///
    /// Returns the node the invoker would land on when it already exists.
    fn check(&self, invoker: &Invoker) -> Result<Option<NodeId>, TreeError> {
        let mut current = Some(NodeId::ROOT);
        for element in &invoker.path {
            match element {
                PathElement::Name(name) => {
                    current = match current {
                        Some(id) => {
                            let node = &self.nodes[id.0];
                            if let Some(child_type) = &node.child_type {
                                if child_type.primitive() == Primitive::Str {
                                    return Err(TreeError::StringWithNames {
                                        property: child_type.qualified_name(),
                                        path: path_text(&segments_of(&self.nodes, id)),
                                    });
                                }
                            }
                            node.by_name.get(name).copied()
                        }
                        None => None,
                    };
                }
                PathElement::Property { property, .. } | PathElement::Injected { property, .. } => {
                    if matches!(property.kind(), PropertyKind::List(_)) {
                        return Err(TreeError::NotPrimitive {
                            property: property.qualified_name(),
                        });
                    }
                    current = match current {
                        Some(id) => {
                            let node = &self.nodes[id.0];
                            let path = || path_text(&segments_of(&self.nodes, id));
                            if let Some(existing) = &node.child_type {
                                if existing.primitive() != property.primitive() {
                                    return Err(TreeError::TypeConflict {
                                        property: property.qualified_name(),
                                        existing: existing.qualified_name(),
                                        path: path(),
                                    });
                                }
                            }
                            if property.primitive() == Primitive::Str && !node.by_name.is_empty() {
                                return Err(TreeError::StringWithNames {
                                    property: property.qualified_name(),
                                    path: path(),
                                });
                            }
                            node.child
                        }
                        None => None,
                    };
                }
            }
        }
        Ok(current)
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn named_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        if let Some(id) = self.nodes[parent.0].by_name.get(name) {
            return *id;
        }
        let id = self.push(Node {
            parent: Some(parent),
            name: Some(name.to_string()),
            ..Node::default()
        });
        self.nodes[parent.0].by_name.insert(name.to_string(), id);
        id
    }

    fn typed_child(&mut self, parent: NodeId, property: &TypeProperty) -> NodeId {
        if let Some(id) = self.nodes[parent.0].child {
            return id;
        }
        let id = self.push(Node {
            parent: Some(parent),
            ty: Some(property.clone()),
            ..Node::default()
        });
        let node = &mut self.nodes[parent.0];
        node.child = Some(id);
        node.child_type = Some(property.clone());
        id
    }

    /// Marks nodes reached by a string or float segment that have children.
    pub fn mark_mandatory_slashes(&mut self) {
        for node in &mut self.nodes {
            let needs_slash = node
                .ty
                .as_ref()
                .is_some_and(|ty| ty.primitive().needs_slash());
            node.has_mandatory_slash = needs_slash && node.has_children();
        }
    }

    /// Records, per model, the node answering `GET` by the model id.
    ///
    /// The first node found wins.
    pub fn resolve_model_paths(&mut self) {
        for (index, node) in self.nodes.iter().enumerate() {
            let Some(invoker) = node.invokers.get(&Method::GET) else {
                continue;
            };
            if invoker.is_collection || !invoker.is_model() {
                continue;
            }
            let Some(target) = &invoker.target else {
                continue;
            };
            let mut typed = invoker.typed_elements();
            let by_id = match (typed.next(), typed.next()) {
                (Some(element), None) => element.property().is_some_and(|p| {
                    p.model().name() == target.name() && p.is_id()
                }),
                _ => false,
            };
            if by_id && !self.model_paths.contains_key(target.name()) {
                self.model_paths
                    .insert(target.name().to_string(), NodeId(index));
            }
        }
    }

    /// Computes the accessible GET resources of every node.
    ///
    /// Literal children are walked breadth first; names are concatenated
    /// and the result is sorted by name.
    pub fn compute_accessible(&mut self) {
        for index in 0..self.nodes.len() {
            let mut found: Vec<(String, NodeId)> = Vec::new();
            let mut queue: VecDeque<(String, NodeId)> = self.nodes[index]
                .by_name
                .iter()
                .map(|(name, id)| (name.clone(), *id))
                .collect();
            while let Some((name, id)) = queue.pop_front() {
                let node = &self.nodes[id.0];
                if node.invokers.contains_key(&Method::GET) {
                    found.push((name.clone(), id));
                }
                for (child_name, child) in &node.by_name {
                    queue.push_back((format!("{name}{child_name}"), *child));
                }
            }
            found.sort_by(|a, b| a.0.cmp(&b.0));
            self.nodes[index].accessible = found.into_iter().collect();
        }
    }

    /// Accessible resources of a node as `(name, path)` pairs.
    #[must_use]
    pub fn accessible_paths(&self, id: NodeId) -> Vec<(String, String)> {
        self.nodes.get(id.0).map_or_else(Vec::new, |node| {
            node.accessible
                .iter()
                .map(|(name, target)| (name.clone(), path_text(&segments_of(&self.nodes, *target))))
                .collect()
        })
    }

    /// Freezes the tree.
    #[must_use]
    pub fn build(self) -> ResourceTree {
        ResourceTree {
            nodes: self.nodes,
            model_paths: self.model_paths,
        }
    }
}

fn segments_of(nodes: &[Node], id: NodeId) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = id;
    while let Some(node) = nodes.get(current.0) {
        let Some(parent) = node.parent else {
            break;
        };
        match (&node.name, &node.ty) {
            (Some(name), _) => segments.push(Segment::Literal(name.clone())),
            (None, Some(ty)) => segments.push(Segment::Typed(ty.primitive())),
            (None, None) => {}
        }
        current = parent;
    }
    segments.reverse();
    segments
}

fn path_text(segments: &[Segment]) -> String {
    let parts: Vec<String> = segments
        .iter()
        .map(|segment| match segment {
            Segment::Literal(name) => name.clone(),
            Segment::Typed(primitive) => format!("{{{primitive}}}"),
        })
        .collect();
    format!("/{}", parts.join("/"))
}

/// The immutable resource tree.
///
/// # Example
///
/// ```
/// use daedalus_core::{Call, Primitive, Type, TypeModel, Value};
/// use daedalus_router::{Invoker, PathElement, TreeBuilder};
/// use http::Method;
///
/// let user = TypeModel::builder("User").id("Id", Primitive::Int).build();
/// let id = user.property_id().unwrap();
/// let call = Call::get("getById", |_| Ok(Value::Null))
///     .input("id", Type::Property(id.clone()))
///     .output(Type::Model(user));
///
/// let mut invoker = Invoker::from_call("UserService", &call);
/// invoker.path = vec![
///     PathElement::name("User"),
///     PathElement::Property { input: "id".into(), property: id },
/// ];
///
/// let mut builder = TreeBuilder::new();
/// builder.place(invoker).unwrap();
/// let tree = builder.build();
///
/// let matched = tree.match_uri("/User/42.json").unwrap();
/// assert_eq!(matched.values[0], Value::Int(42));
/// assert_eq!(matched.extension.as_deref(), Some("json"));
/// assert!(tree.lookup(&Method::GET, "/User/42").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct ResourceTree {
    nodes: Vec<Node>,
    model_paths: IndexMap<String, NodeId>,
}

impl ResourceTree {
    /// The root node.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.nodes[NodeId::ROOT.0]
    }

    /// Node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// All nodes with their ids, root first.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index), node))
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no invokers at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.iter().all(|node| node.invokers.is_empty())
    }

    /// Every invoker of the tree.
    pub fn invokers(&self) -> impl Iterator<Item = &Arc<Invoker>> {
        self.nodes.iter().flat_map(|node| node.invokers.values())
    }

    /// The segments leading to a node.
    #[must_use]
    pub fn segments(&self, id: NodeId) -> Vec<Segment> {
        segments_of(&self.nodes, id)
    }

    /// Readable path of a node, e.g. `/User/{int}`.
    #[must_use]
    pub fn path(&self, id: NodeId) -> String {
        path_text(&self.segments(id))
    }

    /// Node answering `GET` for a model id.
    #[must_use]
    pub fn model_node(&self, model: &str) -> Option<NodeId> {
        self.model_paths.get(model).copied()
    }

    /// Matches a request path to a node.
    ///
    /// Literal children take precedence over the typed child. A trailing
    /// `.ext` on the last segment selects a representation; a last segment
    /// made only of `.ext` selects it after a slash. Values of string and
    /// float segments are tried whole before an extension is split off.
    pub fn match_uri(&self, uri: &str) -> Result<PathMatch, MatchError> {
        let trimmed = uri.trim_start_matches('/');
        let mut raw: Vec<&str> = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('/').collect()
        };

        let mut closed = false;
        let mut extension = None;
        if raw.last() == Some(&"") {
            raw.pop();
            closed = true;
        } else if let Some(ext) = raw.last().and_then(|last| last.strip_prefix('.')) {
            extension = Some(ext.to_ascii_lowercase());
            raw.pop();
            closed = true;
        }

        let segments: Vec<String> = raw
            .iter()
            .map(|segment| {
                urlencoding::decode(segment)
                    .map_or_else(|_| (*segment).to_string(), |decoded| decoded.into_owned())
            })
            .collect();

        let mut current = NodeId::ROOT;
        let mut matched = PathMatch::new(current);
        for (k, segment) in segments.iter().enumerate() {
            let node = &self.nodes[current.0];
            let open = k + 1 == segments.len() && !closed;
            if segment.is_empty() {
                return Err(MatchError::not_found(uri, "empty path segment", Vec::new()));
            }

            if let Some(next) = node.by_name.get(segment.as_str()) {
                current = *next;
                continue;
            }
            if open {
                if let Some((name, ext)) = split_extension(segment) {
                    if let Some(next) = node.by_name.get(name) {
                        extension = Some(ext);
                        current = *next;
                        continue;
                    }
                }
            }

            let (Some(child), Some(property)) = (node.child, node.child_type.as_ref()) else {
                let prefix = segments[..k].join("/");
                let suggestions = node
                    .by_name
                    .keys()
                    .map(|name| format!("/{}", join_path(&prefix, name)))
                    .collect();
                return Err(MatchError::not_found(
                    uri,
                    format!("unexpected path item '{segment}'"),
                    suggestions,
                ));
            };

            let Some((value, ext)) = typed_value(segment, property.primitive(), open) else {
                return Err(MatchError::not_found(
                    uri,
                    format!("'{segment}' is not a valid {}", property.primitive()),
                    Vec::new(),
                ));
            };
            if open && self.nodes[child.0].has_mandatory_slash {
                let path = segments.join("/");
                return Err(MatchError::MissingSlash {
                    uri: uri.to_string(),
                    suggestions: vec![format!("/{path}/")],
                });
            }
            if ext.is_some() {
                extension = ext;
            }
            matched.values.push(value);
            current = child;
        }

        let node = &self.nodes[current.0];
        if node.invokers.is_empty() {
            let path = segments.join("/");
            let suggestions = node
                .by_name
                .keys()
                .map(|name| format!("/{}", join_path(&path, name)))
                .collect();
            return Err(MatchError::not_found(
                uri,
                "expected additional path items",
                suggestions,
            ));
        }

        matched.node = current;
        matched.extension = extension;
        Ok(matched)
    }

    /// Matches a path and picks the invoker for a method.
    #[must_use]
    pub fn lookup(&self, method: &Method, uri: &str) -> Option<Arc<Invoker>> {
        let matched = self.match_uri(uri).ok()?;
        self.nodes[matched.node.0].invokers.get(method).cloned()
    }

    /// Builds the URI of an invoker path from the values of its typed
    /// elements.
    ///
    /// Returns `None` when values are missing or cannot be converted.
    #[must_use]
    pub fn uri_for(&self, invoker: &Invoker, values: &[Value]) -> Option<String> {
        let mut values = values.iter();
        let mut parts = Vec::with_capacity(invoker.path.len());
        for element in &invoker.path {
            match element {
                PathElement::Name(name) => parts.push(name.clone()),
                PathElement::Property { .. } | PathElement::Injected { .. } => {
                    let text = Converter.as_string(values.next()?).ok()?;
                    parts.push(urlencoding::encode(&text).into_owned());
                }
            }
        }
        let mut uri = format!("/{}", parts.join("/"));
        let slash = invoker
            .node
            .and_then(|id| self.nodes.get(id.0))
            .is_some_and(Node::has_mandatory_slash);
        if slash {
            uri.push('/');
        }
        Some(uri)
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

fn typed_value(segment: &str, primitive: Primitive, open: bool) -> Option<(Value, Option<String>)> {
    let converter = Converter;
    if !open {
        return converter.as_value(segment, primitive).ok().map(|value| (value, None));
    }
    if primitive.needs_slash() {
        if let Ok(value) = converter.as_value(segment, primitive) {
            return Some((value, None));
        }
    }
    match split_extension(segment) {
        Some((text, ext)) => converter
            .as_value(text, primitive)
            .ok()
            .map(|value| (value, Some(ext))),
        None => converter.as_value(segment, primitive).ok().map(|value| (value, None)),
    }
}

impl PathEncoder for ResourceTree {
    fn model_path(&self, model: &str, id: &str) -> Option<String> {
        let node = self.model_node(model)?;
        let parts: Vec<String> = self
            .segments(node)
            .into_iter()
            .map(|segment| match segment {
                Segment::Literal(name) => name,
                Segment::Typed(_) => urlencoding::encode(id).into_owned(),
            })
            .collect();
        let mut path = format!("/{}", parts.join("/"));
        if self.nodes[node.0].has_mandatory_slash {
            path.push('/');
        }
        Some(path)
    }

    fn encode_uri(&self, uri: &str) -> String {
        if uri.starts_with('/') {
            uri.to_string()
        } else {
            format!("/{uri}")
        }
    }
}
