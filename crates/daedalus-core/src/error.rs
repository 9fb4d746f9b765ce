//! Error types for Daedalus services and conversions.
//!
//! Services fail with a [`ServiceError`]. Validation problems are reported
//! as an [`InputError`] carrying per-field messages; the dispatcher maps it
//! to a `400` response. Anything else becomes an internal error.
//!
//! The response side collects problems in an [`ErrorReport`], which the
//! error explainer renders into the body next to the code and status.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Primitive;

/// Result alias for service calls.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Structured validation failure raised by a service or a decoder.
///
/// # Example
///
/// ```
/// use daedalus_core::InputError;
///
/// let error = InputError::new()
///     .with_field("Name", "Cannot be empty")
///     .with_message("User rejected");
/// assert_eq!(error.fields()["Name"], vec!["Cannot be empty".to_string()]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputError {
    messages: Vec<String>,
    fields: IndexMap<String, Vec<String>>,
}

impl InputError {
    /// Creates an empty input error.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a message for a field.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.add_field(field, message);
        self
    }

    /// Adds a general message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }

    /// Adds a message for a field in place.
    pub fn add_field(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Adds a general message in place.
    pub fn add_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Moves all messages of `other` into this error.
    pub fn merge(&mut self, other: Self) {
        self.messages.extend(other.messages);
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
    }

    /// General messages.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Per-field messages.
    #[must_use]
    pub const fn fields(&self) -> &IndexMap<String, Vec<String>> {
        &self.fields
    }

    /// Returns `true` when nothing was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.fields.is_empty()
    }
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Input error")?;
        let mut separator = ": ";
        for message in &self.messages {
            write!(f, "{separator}{message}")?;
            separator = "; ";
        }
        for (field, messages) in &self.fields {
            write!(f, "{separator}{field}: {}", messages.join(", "))?;
            separator = "; ";
        }
        Ok(())
    }
}

impl std::error::Error for InputError {}

/// Failure of a service call.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The arguments were rejected.
    #[error(transparent)]
    Input(#[from] InputError),

    /// The call was wired or used incorrectly by the developer.
    #[error("Developer error: {0}")]
    Devel(String),

    /// Unexpected failure.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl ServiceError {
    /// Creates an input error for a single field.
    #[must_use]
    pub fn input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Input(InputError::new().with_field(field, message))
    }

    /// Creates a developer error.
    #[must_use]
    pub fn devel(message: impl Into<String>) -> Self {
        Self::Devel(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(source: anyhow::Error) -> Self {
        Self::Internal {
            message: source.to_string(),
            source: Some(source),
        }
    }
}

/// Failure converting between text and primitive values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// The text is not a valid value of the expected primitive.
    #[error("Invalid {expected} value '{value}'")]
    Invalid {
        /// The offending text.
        value: String,
        /// The expected primitive.
        expected: Primitive,
    },

    /// The value has no text form.
    #[error("Cannot convert a {kind} value to text")]
    Unsupported {
        /// Variant name of the value.
        kind: &'static str,
    },
}

/// Errors collected on a response, rendered by the error explainer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorReport {
    /// Human readable messages.
    pub messages: Vec<String>,
    /// Per-field messages.
    pub fields: IndexMap<String, Vec<String>>,
    /// Descriptions of the accepted parameters or content, for diagnostics.
    pub definitions: Vec<String>,
}

impl ErrorReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a message.
    pub fn add_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Adds a field message.
    pub fn add_field(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Adds a definition line, skipping duplicates.
    pub fn add_definition(&mut self, definition: impl Into<String>) {
        let definition = definition.into();
        if !self.definitions.contains(&definition) {
            self.definitions.push(definition);
        }
    }

    /// Merges an input error.
    pub fn add_input(&mut self, error: &InputError) {
        self.messages.extend(error.messages().iter().cloned());
        for (field, messages) in error.fields() {
            self.fields
                .entry(field.clone())
                .or_default()
                .extend(messages.iter().cloned());
        }
    }

    /// Returns `true` when nothing was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.fields.is_empty() && self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_display() {
        let error = InputError::new()
            .with_message("Rejected")
            .with_field("Name", "Too long")
            .with_field("Name", "Invalid");
        assert_eq!(error.to_string(), "Input error: Rejected; Name: Too long, Invalid");
    }

    #[test]
    fn test_input_error_merge() {
        let mut error = InputError::new().with_field("a", "x");
        error.merge(InputError::new().with_field("a", "y").with_message("m"));
        assert_eq!(error.fields()["a"].len(), 2);
        assert_eq!(error.messages(), ["m".to_string()]);
    }

    #[test]
    fn test_service_error_from_input() {
        let error: ServiceError = InputError::new().with_field("Id", "Unknown").into();
        assert!(matches!(error, ServiceError::Input(_)));
    }

    #[test]
    fn test_service_error_from_anyhow() {
        let error: ServiceError = anyhow::anyhow!("disk full").into();
        assert!(error.to_string().contains("disk full"));
    }

    #[test]
    fn test_report_deduplicates_definitions() {
        let mut report = ErrorReport::new();
        report.add_definition("limit: int");
        report.add_definition("limit: int");
        assert_eq!(report.definitions.len(), 1);
    }

    #[test]
    fn test_conversion_error_message() {
        let error = ConversionError::Invalid {
            value: "abc".into(),
            expected: Primitive::Int,
        };
        assert_eq!(error.to_string(), "Invalid int value 'abc'");
    }
}
