//! Dispatcher errors and the error body sent to clients.

use daedalus_core::Response;
use daedalus_processor::{AssemblyError, ProcessorError};
use http::header::ALLOW;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure building a dispatcher.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The stages do not form a valid processing.
    #[error("Dispatcher assembly is invalid: {0}")]
    Assembly(#[from] AssemblyError),

    /// The stages failed outside of any request.
    #[error(transparent)]
    Processing(#[from] ProcessorError),
}

/// The body of every unsuccessful response.
///
/// # Example
///
/// ```
/// use daedalus_core::{code, Response};
/// use daedalus_server::ErrorBody;
///
/// let mut response = Response::new(code::PATH_NOT_FOUND);
/// response.text = Some("No resource for '/Nope'".into());
/// let body = ErrorBody::from_response(&response);
/// assert_eq!(body.status, 404);
/// assert_eq!(body.code, "PATH_NOT_FOUND");
/// assert!(body.details.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// HTTP status.
    pub status: u16,
    /// Symbolic code.
    pub code: String,
    /// Human readable message.
    pub message: String,
    /// Structured details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

/// Structured part of an [`ErrorBody`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Messages not tied to a field.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
    /// Messages per field.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fields: IndexMap<String, Vec<String>>,
    /// What the resource accepts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub definitions: Vec<String>,
    /// Methods the resource answers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow: Vec<String>,
}

impl ErrorDetails {
    /// Whether there is nothing to report.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
            && self.fields.is_empty()
            && self.definitions.is_empty()
            && self.allow.is_empty()
    }
}

impl ErrorBody {
    /// Collects the error of a response.
    #[must_use]
    pub fn from_response(response: &Response) -> Self {
        let mut details = ErrorDetails::default();
        if let Some(report) = &response.errors {
            details.messages.clone_from(&report.messages);
            details.fields.clone_from(&report.fields);
            details.definitions.clone_from(&report.definitions);
        }
        if let Some(allow) = response.header(ALLOW.as_str()) {
            details.allow = allow
                .split(',')
                .map(str::trim)
                .filter(|method| !method.is_empty())
                .map(String::from)
                .collect();
        }
        Self {
            status: response.status,
            code: response.code.clone(),
            message: response.text.clone().unwrap_or_else(|| response.code.clone()),
            details: if details.is_empty() { None } else { Some(details) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_core::{code, ErrorReport};
    use http::HeaderValue;

    #[test]
    fn test_from_response_collects_fields_and_allow() {
        let mut response = Response::new(code::METHOD_NOT_AVAILABLE);
        response
            .headers
            .insert(ALLOW, HeaderValue::from_static("GET, PUT"));
        let mut report = ErrorReport::new();
        report.add_field("limit", "not an int");
        response.errors = Some(report);

        let body = ErrorBody::from_response(&response);
        assert_eq!(body.message, "METHOD_NOT_AVAILABLE");
        let details = body.details.unwrap();
        assert_eq!(details.allow, ["GET", "PUT"]);
        assert_eq!(details.fields["limit"], ["not an int"]);
    }

    #[test]
    fn test_empty_details_are_not_serialized() {
        let body = ErrorBody::from_response(&Response::new(code::INTERNAL_ERROR));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": 500, "code": "INTERNAL_ERROR", "message": "INTERNAL_ERROR"})
        );
    }
}
