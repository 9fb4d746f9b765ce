//! Processor errors.

use thiserror::Error;

/// Errors raised while compiling an assembly.
///
/// These are configuration errors: an assembly that fails to compile
/// cannot be run.
#[derive(Error, Debug)]
pub enum AssemblyError {
    /// A required attribute is not defined by any upstream handler.
    #[error("Handler '{handler}' at {location} requires '{attribute}' which is not defined upstream")]
    Unsatisfied {
        /// The requiring handler.
        handler: &'static str,
        /// Where the handler was added.
        location: String,
        /// The missing attribute.
        attribute: String,
    },

    /// Two handlers disagree on the type of an attribute.
    #[error(
        "Handler '{handler}' at {location} declares '{attribute}' as {found} but it is already declared as {expected}"
    )]
    Conflict {
        /// The handler with the conflicting declaration.
        handler: &'static str,
        /// Where the handler was added.
        location: String,
        /// The attribute.
        attribute: String,
        /// The type of the first declaration.
        expected: &'static str,
        /// The conflicting type.
        found: &'static str,
    },

    /// A `before`/`after` anchor names a handler that is not part of the assembly.
    #[error("Anchor '{anchor}' for handler '{handler}' at {location} is not part of assembly '{assembly}'")]
    UnknownAnchor {
        /// The assembly.
        assembly: String,
        /// The anchored handler.
        handler: &'static str,
        /// Where the handler was added.
        location: String,
        /// The missing anchor.
        anchor: String,
    },

    /// A sub-assembly of a handler failed to compile.
    #[error("Branch '{branch}' of handler '{handler}' at {location} cannot be compiled: {source}")]
    Branch {
        /// The branch name.
        branch: &'static str,
        /// The owning handler.
        handler: &'static str,
        /// Where the handler was added.
        location: String,
        /// The underlying error.
        #[source]
        source: Box<AssemblyError>,
    },
}

/// Errors raised while running a processing.
#[derive(Error, Debug)]
pub enum ProcessorError {
    /// An attribute was read but never set.
    #[error("Attribute '{context}.{name}' is not present")]
    MissingAttribute {
        /// Context name.
        context: &'static str,
        /// Attribute name.
        name: &'static str,
    },

    /// An attribute holds a value of another type.
    #[error("Attribute '{context}.{name}' does not hold a {expected}")]
    TypeMismatch {
        /// Context name.
        context: &'static str,
        /// Attribute name.
        name: &'static str,
        /// The requested type.
        expected: &'static str,
    },

    /// A handler asked for a branch it did not declare.
    #[error("Handler has no branch named '{name}'")]
    UnknownBranch {
        /// The branch name.
        name: String,
    },

    /// A handler kept asking to retry.
    #[error("Handler '{handler}' exceeded {limit} retries")]
    RetryExhausted {
        /// The retrying handler.
        handler: &'static str,
        /// The retry limit.
        limit: usize,
    },

    /// A handler failed; wraps the failure with the handler location.
    #[error("Handler '{handler}' at {location} failed: {source}")]
    Handler {
        /// The failing handler.
        handler: &'static str,
        /// Where the handler was added.
        location: String,
        /// The failure.
        #[source]
        source: Box<ProcessorError>,
    },

    /// Free-form failure raised by handler code.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl ProcessorError {
    /// Creates a free-form failure.
    #[must_use]
    pub fn failed(message: impl std::fmt::Display) -> Self {
        Self::Failed(anyhow::anyhow!("{message}"))
    }

    /// Attaches the failing handler, unless already attached deeper down.
    #[must_use]
    pub fn in_handler(self, handler: &'static str, location: &str) -> Self {
        match self {
            wrapped @ Self::Handler { .. } => wrapped,
            other => Self::Handler {
                handler,
                location: location.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The error without handler wrappers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Handler { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_handler_wraps_once() {
        let error = ProcessorError::failed("boom")
            .in_handler("inner", "a.rs:1:1")
            .in_handler("outer", "b.rs:2:2");
        match &error {
            ProcessorError::Handler { handler, .. } => assert_eq!(*handler, "inner"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(error.root().to_string(), "boom");
    }
}
