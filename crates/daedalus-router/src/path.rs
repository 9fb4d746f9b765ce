//! Matched paths.

use daedalus_core::Value;
use smallvec::SmallVec;

use crate::node::NodeId;

/// Number of typed segments stored inline.
const INLINE_VALUES: usize = 4;

/// The outcome of matching a request URI.
#[derive(Debug, Clone, PartialEq)]
pub struct PathMatch {
    /// The matched node.
    pub node: NodeId,
    /// Values of the typed segments, in path order.
    pub values: SmallVec<[Value; INLINE_VALUES]>,
    /// Lower cased extension, without the dot.
    pub extension: Option<String>,
}

impl PathMatch {
    /// Creates a match without values.
    #[must_use]
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            values: SmallVec::new(),
            extension: None,
        }
    }
}

/// Splits `name.ext` at the last dot.
///
/// A leading or trailing dot does not make an extension.
pub(crate) fn split_extension(segment: &str) -> Option<(&str, String)> {
    let dot = segment.rfind('.')?;
    if dot == 0 || dot + 1 == segment.len() {
        return None;
    }
    Some((&segment[..dot], segment[dot + 1..].to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("42.JSON"), Some(("42", "json".to_string())));
        assert_eq!(split_extension("1.5.json"), Some(("1.5", "json".to_string())));
        assert_eq!(split_extension(".json"), None);
        assert_eq!(split_extension("User"), None);
        assert_eq!(split_extension("a."), None);
    }
}
