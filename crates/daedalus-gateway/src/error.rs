//! Gateway errors.

use daedalus_processor::{AssemblyError, ProcessorError};
use thiserror::Error;

/// Errors raised while loading gateways or forwarding through them.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A `Pattern` or `Headers` entry is not a valid regex.
    #[error("invalid {field} pattern '{pattern}': {source}")]
    InvalidPattern {
        /// Record field holding the pattern.
        field: &'static str,
        /// The rejected pattern.
        pattern: String,
        /// Regex compiler diagnostic.
        #[source]
        source: regex::Error,
    },

    /// A `Methods` entry is not an HTTP method.
    #[error("invalid method '{0}'")]
    InvalidMethod(String),

    /// A `PutHeaders` entry is not `Name:Value`.
    #[error("invalid header '{0}', expected 'Name:Value'")]
    InvalidHeader(String),

    /// A template refers to a capture group the pattern does not have.
    #[error("template '{template}' refers to group {{{index}}} but only {groups} groups were captured")]
    MissingGroup {
        /// The navigate or filter template.
        template: String,
        /// The referenced group.
        index: usize,
        /// Number of captured groups.
        groups: usize,
    },

    /// A template has an unbalanced or non numeric placeholder.
    #[error("malformed template '{0}'")]
    MalformedTemplate(String),

    /// The gateway list is not valid JSON.
    #[error("invalid gateway list: {0}")]
    Json(#[from] serde_json::Error),

    /// The authorization listing rejected the authorization.
    #[error("invalid authorization")]
    InvalidAuthorization,

    /// The authorization listing could not be fetched.
    #[error("cannot fetch the authorized gateways, upstream answered {status}: {text}")]
    Listing {
        /// Upstream status.
        status: u16,
        /// Upstream text.
        text: String,
    },

    /// The gateway stages do not compile.
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

impl GatewayError {
    /// Builds an [`GatewayError::InvalidPattern`].
    pub fn invalid_pattern(field: &'static str, pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidPattern {
            field,
            pattern: pattern.into(),
            source,
        }
    }
}

impl From<GatewayError> for ProcessorError {
    fn from(error: GatewayError) -> Self {
        ProcessorError::failed(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_group_message() {
        let error = GatewayError::MissingGroup {
            template: "error/{2}".into(),
            index: 2,
            groups: 1,
        };
        assert_eq!(
            error.to_string(),
            "template 'error/{2}' refers to group {2} but only 1 groups were captured"
        );
    }

    #[test]
    fn test_invalid_pattern_keeps_source() {
        let source = regex::Regex::new("(").unwrap_err();
        let error = GatewayError::invalid_pattern("Pattern", "(", source);
        assert!(error.to_string().starts_with("invalid Pattern pattern '('"));
        assert!(std::error::Error::source(&error).is_some());
    }
}
