//! Test client for in-memory dispatching.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use daedalus_core::{Dispatch, Request};
use http::Method;

use crate::response::TestResponse;

/// A test client dispatching requests in memory.
///
/// Any [`Dispatch`] can be tested: a dispatcher, an assemblage or a gateway.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use daedalus_core::{code, Dispatch, Request, Response};
/// use daedalus_test::TestClient;
///
/// struct Echo;
///
/// impl Dispatch for Echo {
///     fn dispatch(&self, request: Request) -> Response {
///         let mut response = Response::new(code::PATH_FOUND);
///         response.body = request.target().into();
///         response
///     }
/// }
///
/// let client = TestClient::new(Arc::new(Echo));
/// client.get("/User").query("limit", "5").send().assert_status(200);
/// ```
#[must_use]
#[derive(Clone)]
pub struct TestClient {
    dispatcher: Arc<dyn Dispatch>,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a client over a dispatcher.
    pub fn new(dispatcher: Arc<dyn Dispatch>) -> Self {
        Self {
            dispatcher,
            default_headers: Vec::new(),
        }
    }

    /// Adds a default header that will be included in all requests.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Creates a GET request builder.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Creates a POST request builder.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Creates a PUT request builder.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Creates a DELETE request builder.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Creates an OPTIONS request builder.
    pub fn options(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::OPTIONS, uri)
    }

    /// Creates a request builder with a custom method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, Request::new(method, uri))
    }

    /// Dispatches a prepared request.
    pub fn send(&self, request: Request) -> TestResponse {
        TestResponse::new(self.dispatcher.dispatch(request))
    }
}

impl fmt::Debug for TestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestClient")
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}

/// A request builder bound to a test client.
#[must_use]
#[derive(Debug)]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    request: Request,
}

impl<'a> TestClientRequest<'a> {
    fn new(client: &'a TestClient, request: Request) -> Self {
        let request = client
            .default_headers
            .iter()
            .fold(request, |request, (name, value)| request.with_header(name, value));
        Self { client, request }
    }

    /// Sets a header on the request.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.request = self.request.with_header(name.as_ref(), value.as_ref());
        self
    }

    /// Appends a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request = self.request.with_parameter(name, value);
        self
    }

    /// Sets the raw request body and its content type.
    pub fn body(mut self, body: impl Into<Bytes>, content_type: &str) -> Self {
        self.request = self.request.with_content(body, content_type);
        self
    }

    /// Sets the request body as JSON.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Self {
        self.request = self.request.with_json(value);
        self
    }

    /// Returns the request as it would be sent.
    #[must_use]
    pub fn build(self) -> Request {
        self.request
    }

    /// Sends the request and returns the response.
    pub fn send(self) -> TestResponse {
        self.client.send(self.request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_core::{code, Response};
    use serde_json::json;

    /// Answers with the method, target, headers and body it received.
    struct Echo;

    impl Dispatch for Echo {
        fn dispatch(&self, request: Request) -> Response {
            let headers: serde_json::Map<String, serde_json::Value> = request
                .headers
                .iter()
                .map(|(name, value)| (name.to_string(), json!(value.to_str().unwrap_or_default())))
                .collect();
            let body = json!({
                "method": request.method.as_str(),
                "target": request.target(),
                "headers": headers,
                "content": request.content.as_ref().map(|c| String::from_utf8_lossy(c).into_owned()),
            });
            let mut response = Response::new(code::PATH_FOUND);
            response.body = body.to_string().into();
            response
        }
    }

    fn client() -> TestClient {
        TestClient::new(Arc::new(Echo))
    }

    #[test]
    fn test_methods() {
        let client = client();
        for (builder, method) in [
            (client.get("/a"), "GET"),
            (client.post("/a"), "POST"),
            (client.put("/a"), "PUT"),
            (client.delete("/a"), "DELETE"),
            (client.options("/a"), "OPTIONS"),
        ] {
            builder.send().assert_json_field("method", &json!(method));
        }
    }

    #[test]
    fn test_query_is_appended() {
        client()
            .get("/User?desc=Name")
            .query("limit", "5")
            .send()
            .assert_json_field("target", &json!("/User?desc=Name&limit=5"));
    }

    #[test]
    fn test_headers() {
        let client = client().with_default_header("Accept-Language", "fr");
        client
            .get("/User")
            .header("X-Filter", "Author")
            .send()
            .assert_json_field("headers.accept-language", &json!("fr"))
            .assert_json_field("headers.x-filter", &json!("Author"));
    }

    #[test]
    fn test_json_body() {
        let response = client().post("/User").json(&json!({"Name": "Ada"})).send();
        response
            .assert_json_field("headers.content-type", &json!("application/json"))
            .assert_json_field("content", &json!(r#"{"Name":"Ada"}"#));
    }

    #[test]
    fn test_build_without_sending() {
        let request = client().put("/User/1").body("Name=Ada", "application/x-www-form-urlencoded").build();
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.content.as_deref(), Some(&b"Name=Ada"[..]));
    }
}
