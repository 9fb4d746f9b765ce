//! Router errors.

use thiserror::Error;

/// Failure placing an invoker in the tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// A path property is not an atom.
    #[error("Path property '{property}' is not a primitive")]
    NotPrimitive {
        /// The qualified property name.
        property: String,
    },

    /// The node already has a typed child of another type.
    #[error("Path property '{property}' conflicts with '{existing}' at '{path}'")]
    TypeConflict {
        /// The rejected property.
        property: String,
        /// The property already leading to the typed child.
        existing: String,
        /// The node path.
        path: String,
    },

    /// A string valued segment cannot share its node with literal names.
    #[error("String property '{property}' cannot share '{path}' with named children")]
    StringWithNames {
        /// The string property.
        property: String,
        /// The node path.
        path: String,
    },

    /// Another invoker already answers the method on the node.
    #[error("Method {method} on '{path}' is already bound to {existing}")]
    DuplicateMethod {
        /// The HTTP method.
        method: String,
        /// The node path.
        path: String,
        /// Id of the invoker keeping the binding.
        existing: String,
    },
}

/// Failure matching a request URI.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// No node matches the URI.
    #[error("No resource for '{uri}': {reason}")]
    NotFound {
        /// The request URI.
        uri: String,
        /// What went wrong.
        reason: String,
        /// Paths that would have matched.
        suggestions: Vec<String>,
    },

    /// The URI ends on a value segment that requires a trailing slash.
    #[error("Unclear extension in '{uri}', a trailing slash is required")]
    MissingSlash {
        /// The request URI.
        uri: String,
        /// Paths that would have matched.
        suggestions: Vec<String>,
    },
}

impl MatchError {
    pub(crate) fn not_found(uri: &str, reason: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self::NotFound {
            uri: uri.to_string(),
            reason: reason.into(),
            suggestions,
        }
    }

    /// Paths suggested to the client.
    #[must_use]
    pub fn suggestions(&self) -> &[String] {
        match self {
            Self::NotFound { suggestions, .. } | Self::MissingSlash { suggestions, .. } => {
                suggestions
            }
        }
    }
}
