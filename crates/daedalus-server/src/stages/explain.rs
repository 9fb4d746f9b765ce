//! Final rendering of the response headers and error bodies.

use std::fmt;
use std::sync::Arc;

use daedalus_core::code::INTERNAL_ERROR;
use daedalus_core::headers::{CONTENT_INDEX, X_REQUEST_ID};
use daedalus_core::{format_content_index, Response};
use daedalus_processor::{Chain, Contexts, Contract, Handler, ProcessorError};
use http::header::{HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_LENGTH, CONTENT_TYPE};
use http::HeaderMap;

use crate::context::{RENDERER, RESPONSE};
use crate::error::ErrorBody;
use crate::settings::ServerSettings;

/// Message of internal errors outside development mode.
pub const INTERNAL_MESSAGE: &str = "Internal server error";

const ERROR_CONTENT_TYPE: &str = "application/json";

/// Renders error bodies and sets the representation headers.
#[derive(Debug, Clone)]
pub struct Explain {
    settings: Arc<ServerSettings>,
}

impl Explain {
    /// Creates the stage.
    #[must_use]
    pub fn new(settings: Arc<ServerSettings>) -> Self {
        Self { settings }
    }
}

impl Handler for Explain {
    fn name(&self) -> &'static str {
        "explain"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&RESPONSE).optional(&RENDERER)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let content_type = ctx.find(&RENDERER).map(|renderer| renderer.content_type());
        finish(ctx.get_mut(&RESPONSE)?, &self.settings, content_type);
        Ok(())
    }
}

/// Completes a response: error body, `Content-Type`, `Content-Length`,
/// `Content-Index` and CORS origin.
pub fn finish(response: &mut Response, settings: &ServerSettings, content_type: Option<&str>) {
    let mut content_type = content_type.unwrap_or(&settings.default_content_type).to_string();
    if !response.is_success && response.body.is_empty() {
        match serde_json::to_vec(&ErrorBody::from_response(response)) {
            Ok(body) => {
                response.body = body.into();
                response.indexes.clear();
                content_type = ERROR_CONTENT_TYPE.to_string();
            }
            Err(error) => tracing::warn!(%error, "Cannot serialize error body"),
        }
    }

    if response.body.is_empty() {
        response.headers.remove(CONTENT_TYPE);
    } else {
        let value = format!("{content_type}; charset={}", settings.charset);
        insert(&mut response.headers, CONTENT_TYPE, &value);
    }
    let length = response.body.len().to_string();
    insert(&mut response.headers, CONTENT_LENGTH, &length);

    if response.indexes.is_empty() {
        response.headers.remove(CONTENT_INDEX);
    } else {
        let value = format_content_index(&response.indexes);
        insert(&mut response.headers, HeaderName::from_static(CONTENT_INDEX), &value);
    }
    if let Some(origin) = &settings.cors_allow_origin {
        insert(&mut response.headers, ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
}

/// Builds the 500 answer replacing a response after a failure.
///
/// The request id of the replaced response is kept. The failure text is
/// only exposed in development mode.
#[must_use]
pub fn internal_error(previous: &Response, error: &dyn fmt::Display, settings: &ServerSettings) -> Response {
    let mut response = Response::new(INTERNAL_ERROR);
    if let Some(id) = previous.headers.get(X_REQUEST_ID) {
        response.headers.insert(HeaderName::from_static(X_REQUEST_ID), id.clone());
    }
    response.text = Some(if settings.development {
        error.to_string()
    } else {
        INTERNAL_MESSAGE.to_string()
    });
    finish(&mut response, settings, None);
    response
}

/// Sets a header, skipping values that are not valid header text.
pub(crate) fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::warn!(header = %name, value, "Invalid header value dropped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_core::code;

    #[test]
    fn test_error_body_and_headers() {
        let settings = ServerSettings {
            cors_allow_origin: Some("*".into()),
            ..ServerSettings::default()
        };
        let mut response = Response::new(code::PATH_NOT_FOUND);
        response.text = Some("No resource".into());
        finish(&mut response, &settings, None);

        assert_eq!(response.header("content-type"), Some("application/json; charset=UTF-8"));
        assert_eq!(response.header("content-length"), Some(response.length().to_string().as_str()));
        assert_eq!(response.header("access-control-allow-origin"), Some("*"));
        let json = response.json().unwrap();
        assert_eq!(json["status"], 404);
        assert_eq!(json["message"], "No resource");
    }

    #[test]
    fn test_empty_success_has_zero_length() {
        let mut response = Response::new(code::DELETE_SUCCESS);
        finish(&mut response, &ServerSettings::default(), Some("application/json"));
        assert_eq!(response.header("content-length"), Some("0"));
        assert!(response.header("content-type").is_none());
    }

    #[test]
    fn test_internal_error_hides_text_in_production() {
        let previous = Response::new(code::PATH_FOUND);
        let response = internal_error(&previous, &"db down", &ServerSettings::default());
        assert_eq!(response.status, 500);
        assert_eq!(response.text.as_deref(), Some(INTERNAL_MESSAGE));

        let development = ServerSettings {
            development: true,
            ..ServerSettings::default()
        };
        let response = internal_error(&previous, &"db down", &development);
        assert_eq!(response.text.as_deref(), Some("db down"));
    }
}
