//! Request-node trees built from the `X-Filter` header.

use std::fmt;

use indexmap::IndexMap;

/// What to inline below one level of a response.
///
/// The root node stands for the main request: each child names a
/// reference of the response, keyed by its property name, and carries the
/// parameters of the sub-request that resolves it.
///
/// # Example
///
/// ```
/// use daedalus_assemblage::RequestNode;
///
/// let mut node = RequestNode::parse("Author, Author.Boss").unwrap();
/// node.distribute(vec![
///     ("limit".into(), "5".into()),
///     ("Author.Boss.desc".into(), "Name".into()),
///     ("Editor.x".into(), "1".into()),
/// ]);
///
/// assert_eq!(node.parameters, [("limit".into(), "5".into()), ("Editor.x".into(), "1".into())]);
/// let boss = node.find("Author.Boss").unwrap();
/// assert_eq!(boss.parameters, [("desc".into(), "Name".into())]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestNode {
    /// Sub-requests by property name, in header order.
    pub requests: IndexMap<String, RequestNode>,
    /// Parameters of the request this node stands for.
    pub parameters: Vec<(String, String)>,
}

impl RequestNode {
    /// Creates an empty node.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the comma separated dotted names of an `X-Filter` value.
    ///
    /// Returns `None` when the value names nothing.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let mut root = Self::new();
        for name in value.split(',').map(str::trim).filter(|name| !name.is_empty()) {
            root.add(name);
        }
        (!root.requests.is_empty()).then_some(root)
    }

    /// Adds the nodes of a dotted name.
    pub fn add(&mut self, dotted: &str) {
        let mut current = self;
        for part in dotted.split('.').filter(|part| !part.is_empty()) {
            current = current.requests.entry(part.to_string()).or_default();
        }
    }

    /// Routes each parameter to the deepest node its dotted name reaches.
    ///
    /// The remainder of the name, from the first part that is not a node,
    /// stays the parameter name on the node reached.
    pub fn distribute(&mut self, parameters: Vec<(String, String)>) {
        for (name, value) in parameters {
            let parts: Vec<&str> = name.split('.').collect();
            let mut current = &mut *self;
            let mut consumed = 0;
            while consumed + 1 < parts.len() && current.requests.contains_key(parts[consumed]) {
                current = &mut current.requests[parts[consumed]];
                consumed += 1;
            }
            current.parameters.push((parts[consumed..].join("."), value));
        }
    }

    /// The node at a dotted path, relative to this one.
    #[must_use]
    pub fn find(&self, dotted: &str) -> Option<&Self> {
        dotted
            .split('.')
            .try_fold(self, |node, part| node.requests.get(part))
    }

    /// Whether nothing is to be inlined below this node.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.requests.is_empty()
    }

    /// Dotted names of every leaf below this node, the form an `X-Filter`
    /// value takes.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for (name, node) in &self.requests {
            if node.is_leaf() {
                names.push(name.clone());
            } else {
                names.extend(node.names().into_iter().map(|nested| format!("{name}.{nested}")));
            }
        }
        names
    }
}

impl fmt::Display for RequestNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(name: &str, value: &str) -> (String, String) {
        (name.to_string(), value.to_string())
    }

    #[test]
    fn test_parse_builds_nested_nodes() {
        let node = RequestNode::parse("Author.Boss, Editor,Author").unwrap();
        assert_eq!(node.requests.keys().collect::<Vec<_>>(), ["Author", "Editor"]);
        assert!(node.find("Author.Boss").unwrap().is_leaf());
        assert!(node.find("Editor.Boss").is_none());
    }

    #[test]
    fn test_parse_empty_value() {
        assert_eq!(RequestNode::parse(""), None);
        assert_eq!(RequestNode::parse(" , ,"), None);
    }

    #[test]
    fn test_distribute_keeps_unknown_prefixes() {
        let mut node = RequestNode::parse("Author").unwrap();
        node.distribute(vec![
            pair("Author.limit", "1"),
            pair("Author.Boss.limit", "2"),
            pair("Author", "x"),
            pair("asc", "Name"),
        ]);
        assert_eq!(node.parameters, [pair("Author", "x"), pair("asc", "Name")]);
        assert_eq!(
            node.find("Author").unwrap().parameters,
            [pair("limit", "1"), pair("Boss.limit", "2")]
        );
    }

    #[test]
    fn test_names_round_trip_through_display() {
        let node = RequestNode::parse("Author.Boss, Editor").unwrap();
        assert_eq!(node.names(), ["Author.Boss", "Editor"]);
        assert_eq!(RequestNode::parse(&node.to_string()), Some(node));
    }
}
