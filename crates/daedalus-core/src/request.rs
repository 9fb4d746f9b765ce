//! Request and response records consumed and produced by the core.
//!
//! The host server parses the socket and hands over a [`Request`]; the core
//! answers with a fully buffered [`Response`]. Anything able to answer a
//! request implements [`Dispatch`], which lets the gateway and the
//! assemblage wrap the dispatcher or each other.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, StatusCode};
use serde::Serialize;

use crate::code::CodeHttp;
use crate::error::ErrorReport;
use crate::index::Index;

/// An incoming request.
#[derive(Debug, Clone)]
pub struct Request {
    /// Request method.
    pub method: Method,
    /// Path of the request, without scheme, host or query.
    pub uri: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Query parameters in order of appearance.
    pub parameters: Vec<(String, String)>,
    /// Request body.
    pub content: Option<Bytes>,
}

impl Request {
    /// Creates a request from a method and a target such as `/User?limit=5`.
    ///
    /// # Example
    ///
    /// ```
    /// use daedalus_core::Request;
    /// use http::Method;
    ///
    /// let request = Request::new(Method::GET, "/User?limit=5&name=a%20b");
    /// assert_eq!(request.uri, "/User");
    /// assert_eq!(request.parameters[1], ("name".to_string(), "a b".to_string()));
    /// ```
    #[must_use]
    pub fn new(method: Method, target: impl AsRef<str>) -> Self {
        let target = target.as_ref();
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        let parameters = query.map(parse_query).unwrap_or_default();
        Self {
            method,
            uri: if path.is_empty() { "/".to_string() } else { path.to_string() },
            headers: HeaderMap::new(),
            parameters,
            content: None,
        }
    }

    /// `GET` request.
    #[must_use]
    pub fn get(target: impl AsRef<str>) -> Self {
        Self::new(Method::GET, target)
    }

    /// `POST` request.
    #[must_use]
    pub fn post(target: impl AsRef<str>) -> Self {
        Self::new(Method::POST, target)
    }

    /// `PUT` request.
    #[must_use]
    pub fn put(target: impl AsRef<str>) -> Self {
        Self::new(Method::PUT, target)
    }

    /// `DELETE` request.
    #[must_use]
    pub fn delete(target: impl AsRef<str>) -> Self {
        Self::new(Method::DELETE, target)
    }

    /// Adds a header; invalid names or values are skipped with a warning.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => tracing::warn!(header = name, "Skipping invalid header"),
        }
        self
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    /// Sets the body and its content type.
    #[must_use]
    pub fn with_content(self, content: impl Into<Bytes>, content_type: &str) -> Self {
        let mut request = self.with_header(CONTENT_TYPE.as_str(), content_type);
        request.content = Some(content.into());
        request
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn with_json<T: Serialize>(self, body: &T) -> Self {
        match serde_json::to_vec(body) {
            Ok(bytes) => self.with_content(bytes, "application/json"),
            Err(error) => {
                tracing::warn!(%error, "Cannot serialize request body");
                self
            }
        }
    }

    /// First value of a header as text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Path plus encoded query string.
    #[must_use]
    pub fn target(&self) -> String {
        if self.parameters.is_empty() {
            return self.uri.clone();
        }
        match serde_urlencoded::to_string(&self.parameters) {
            Ok(query) => format!("{}?{}", self.uri, query),
            Err(_) => self.uri.clone(),
        }
    }
}

/// Parses a query string into ordered pairs.
#[must_use]
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(query).unwrap_or_else(|error| {
        tracing::debug!(%error, query, "Malformed query string");
        Vec::new()
    })
}

/// A complete response.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status.
    pub status: u16,
    /// Symbolic code.
    pub code: String,
    /// Whether processing succeeded.
    pub is_success: bool,
    /// Response headers.
    pub headers: HeaderMap,
    /// Human readable status message.
    pub text: Option<String>,
    /// Structured errors, when unsuccessful.
    pub errors: Option<ErrorReport>,
    /// Response body.
    pub body: Bytes,
    /// Index markers of the body.
    pub indexes: Vec<Index>,
}

impl Response {
    /// Creates an empty response for a code.
    #[must_use]
    pub fn new(code: CodeHttp) -> Self {
        Self {
            status: code.status(),
            code: code.code().to_string(),
            is_success: code.is_success(),
            headers: HeaderMap::new(),
            text: None,
            errors: None,
            body: Bytes::new(),
            indexes: Vec::new(),
        }
    }

    /// Sets the code, keeping everything else.
    pub fn set_code(&mut self, code: CodeHttp) {
        self.status = code.status();
        self.code = code.code().to_string();
        self.is_success = code.is_success();
    }

    /// The status as an [`http::StatusCode`].
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// First value of a header as text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Body as text, lossily decoded.
    #[must_use]
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Parses the body as JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Body length in bytes.
    #[must_use]
    pub fn length(&self) -> usize {
        self.body.len()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.code)?;
        if let Some(text) = &self.text {
            write!(f, " ({text})")?;
        }
        Ok(())
    }
}

/// Anything that answers requests.
pub trait Dispatch: Send + Sync {
    /// Processes one request.
    fn dispatch(&self, request: Request) -> Response;
}

impl<T: Dispatch + ?Sized> Dispatch for Arc<T> {
    fn dispatch(&self, request: Request) -> Response {
        (**self).dispatch(request)
    }
}

impl<T: Dispatch + ?Sized> Dispatch for Box<T> {
    fn dispatch(&self, request: Request) -> Response {
        (**self).dispatch(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{INSERT_SUCCESS, PATH_NOT_FOUND};

    #[test]
    fn test_request_without_query() {
        let request = Request::get("/User/42");
        assert_eq!(request.uri, "/User/42");
        assert!(request.parameters.is_empty());
    }

    #[test]
    fn test_request_empty_path() {
        assert_eq!(Request::get("?a=1").uri, "/");
    }

    #[test]
    fn test_request_target_round_trip() {
        let request = Request::get("/User").with_parameter("name", "a b");
        assert_eq!(request.target(), "/User?name=a+b");
        assert_eq!(Request::get(request.target()).parameters, request.parameters);
    }

    #[test]
    fn test_invalid_header_is_skipped() {
        let request = Request::get("/").with_header("bad header", "x");
        assert!(request.headers.is_empty());
    }

    #[test]
    fn test_json_content() {
        let request = Request::post("/User").with_json(&serde_json::json!({"Name": "Ada"}));
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert!(request.content.is_some());
    }

    #[test]
    fn test_response_codes() {
        let mut response = Response::new(INSERT_SUCCESS);
        assert_eq!(response.status_code(), StatusCode::CREATED);
        response.set_code(PATH_NOT_FOUND);
        assert!(!response.is_success);
        assert_eq!(response.to_string(), "404 PATH_NOT_FOUND");
    }
}
