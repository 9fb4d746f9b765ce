//! Test response wrapper.

use std::fmt;

use bytes::Bytes;
use daedalus_core::{Index, Response};
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::TestError;

/// A dispatched response with helper methods for assertions.
pub struct TestResponse {
    inner: Response,
}

impl TestResponse {
    /// Wraps a response.
    #[must_use]
    pub fn new(inner: Response) -> Self {
        Self { inner }
    }

    /// Returns the status as an [`http::StatusCode`].
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.inner.status_code()
    }

    /// Returns the status code as a u16.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.inner.status
    }

    /// Returns the symbolic code, e.g. `PATH_FOUND`.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.inner.code
    }

    /// Returns true if processing succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.inner.is_success
    }

    /// Returns the response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    /// Returns a header value as a string.
    #[must_use]
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.inner.header(name)
    }

    /// Returns the body indexes.
    #[must_use]
    pub fn indexes(&self) -> &[Index] {
        &self.inner.indexes
    }

    /// Returns the raw body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.inner.body
    }

    /// Returns the body as a string.
    ///
    /// Returns an error if the body is not valid UTF-8.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.inner.body.to_vec())
            .map_err(|e| TestError::BodyRead(format!("Invalid UTF-8: {e}")))
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.inner.body)?)
    }

    /// Deserializes the body as a JSON Value.
    pub fn json_value(&self) -> Result<serde_json::Value, TestError> {
        self.json()
    }

    /// Unwraps the dispatched response.
    #[must_use]
    pub fn into_inner(self) -> Response {
        self.inner
    }

    // Assertion methods

    /// Asserts that the status code equals the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    pub fn assert_status(&self, expected: u16) -> &Self {
        assert_eq!(
            self.inner.status, expected,
            "Expected status {}, got {} ({})",
            expected, self.inner.status, self.inner.body_text()
        );
        self
    }

    /// Asserts the symbolic code.
    ///
    /// # Panics
    ///
    /// Panics if the code doesn't match.
    pub fn assert_code(&self, expected: &str) -> &Self {
        assert_eq!(self.inner.code, expected, "Code mismatch");
        self
    }

    /// Asserts that processing succeeded.
    ///
    /// # Panics
    ///
    /// Panics if the response is not successful.
    pub fn assert_success(&self) -> &Self {
        assert!(self.inner.is_success, "Expected success, got {}", self.inner);
        self
    }

    /// Asserts that a header exists with the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the header doesn't exist or doesn't match.
    pub fn assert_header(&self, name: impl AsRef<str>, expected: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        let expected = expected.as_ref();
        let actual = self
            .header_str(name)
            .unwrap_or_else(|| panic!("Header '{name}' not found"));
        assert_eq!(actual, expected, "Header '{name}': expected '{expected}', got '{actual}'");
        self
    }

    /// Asserts that a header is absent.
    ///
    /// # Panics
    ///
    /// Panics if the header is present.
    pub fn assert_no_header(&self, name: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        assert!(self.inner.headers.get(name).is_none(), "Header '{name}' should be absent");
        self
    }

    /// Asserts that the body contains the expected substring.
    ///
    /// # Panics
    ///
    /// Panics if the body doesn't contain the substring.
    pub fn assert_body_contains(&self, expected: impl AsRef<str>) -> &Self {
        let expected = expected.as_ref();
        let body = self.inner.body_text();
        assert!(body.contains(expected), "Body should contain '{expected}', got: {body}");
        self
    }

    /// Asserts that a JSON field exists and equals the expected value.
    ///
    /// Paths are dotted, with numeric segments indexing arrays.
    ///
    /// # Panics
    ///
    /// Panics if the field doesn't exist or doesn't match.
    pub fn assert_json_field(&self, path: impl AsRef<str>, expected: &serde_json::Value) -> &Self {
        let path = path.as_ref();
        let json = match self.json_value() {
            Ok(json) => json,
            Err(error) => panic!("Body should be valid JSON: {error}"),
        };
        let actual = json_path(&json, path).unwrap_or_else(|| panic!("JSON path '{path}' not found in: {json}"));
        assert_eq!(actual, expected, "JSON field '{path}'");
        self
    }
}

impl From<Response> for TestResponse {
    fn from(inner: Response) -> Self {
        Self::new(inner)
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.inner.status)
            .field("code", &self.inner.code)
            .field("headers", &self.inner.headers)
            .field("body_len", &self.inner.body.len())
            .finish()
    }
}

fn json_path<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match segment.parse::<usize>() {
            Ok(index) => current.get(index),
            Err(_) => current.get(segment),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_core::code;
    use serde_json::json;

    fn create_response(body: &str) -> TestResponse {
        let mut response = Response::new(code::PATH_FOUND);
        response
            .headers
            .insert(http::header::CONTENT_TYPE, "application/json".parse().unwrap());
        response.body = Bytes::from(body.to_string());
        TestResponse::new(response)
    }

    #[test]
    fn test_accessors() {
        let response = create_response(r#"{"Name":"Ada"}"#);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.code(), "PATH_FOUND");
        assert!(response.is_success());
        assert_eq!(response.header_str("content-type"), Some("application/json"));
        assert_eq!(response.text().unwrap(), r#"{"Name":"Ada"}"#);
    }

    #[test]
    fn test_json() {
        #[derive(serde::Deserialize)]
        struct User {
            #[serde(rename = "Name")]
            name: String,
        }

        let response = create_response(r#"{"Name":"Ada"}"#);
        let user: User = response.json().unwrap();
        assert_eq!(user.name, "Ada");
        assert!(create_response("not json").json_value().is_err());
    }

    #[test]
    fn test_invalid_utf8() {
        let mut inner = Response::new(code::PATH_FOUND);
        inner.body = Bytes::from_static(&[0xff, 0xfe]);
        assert!(matches!(TestResponse::new(inner).text(), Err(TestError::BodyRead(_))));
    }

    #[test]
    fn test_assertions_chain() {
        create_response(r#"{"UserList":[{"Name":"Ada"}]}"#)
            .assert_status(200)
            .assert_code("PATH_FOUND")
            .assert_success()
            .assert_header("content-type", "application/json")
            .assert_no_header("content-index")
            .assert_body_contains("Ada")
            .assert_json_field("UserList.0.Name", &json!("Ada"));
    }

    #[test]
    #[should_panic(expected = "Expected status 404")]
    fn test_assert_status_fails() {
        create_response("{}").assert_status(404);
    }

    #[test]
    #[should_panic(expected = "not found")]
    fn test_assert_header_missing() {
        create_response("{}").assert_header("x-missing", "value");
    }
}
