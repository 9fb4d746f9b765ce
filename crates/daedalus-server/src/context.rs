//! Attributes of the per-request contexts.
//!
//! The `request` context holds what is known about the request, the
//! `response` context what will be answered. Stages leave the response
//! alone once it is unsuccessful; only the explain stage renders it.

use std::sync::Arc;

use daedalus_codec::Renderer;
use daedalus_core::{Arguments, CodeHttp, ErrorReport, Request, RequestId, Response, Value};
use daedalus_processor::{Contexts, Key, ProcessorError};
use daedalus_router::{Invoker, PathMatch};
use http::Method;

/// The incoming request.
pub const REQUEST: Key<Request> = Key::new("request", "request");
/// Correlation id.
pub const REQUEST_ID: Key<RequestId> = Key::new("request", "id");
/// The effective method, after overrides.
pub const METHOD: Key<Method> = Key::new("request", "method");
/// The matched path.
pub const PATH: Key<PathMatch> = Key::new("request", "path");
/// The invoker answering the request.
pub const INVOKER: Key<Arc<Invoker>> = Key::new("request", "invoker");
/// Arguments of the call.
pub const ARGUMENTS: Key<Arguments> = Key::new("request", "arguments");
/// Preferred languages, best first.
pub const LOCALE: Key<Vec<String>> = Key::new("request", "locale");

/// The response being built.
pub const RESPONSE: Key<Response> = Key::new("response", "response");
/// The renderer chosen for the body.
pub const RENDERER: Key<Arc<dyn Renderer>> = Key::new("response", "renderer");
/// The value returned by the call.
pub const OUTPUT: Key<Value> = Key::new("response", "output");

/// Whether the response already failed.
#[must_use]
pub fn has_failed(ctx: &Contexts) -> bool {
    ctx.find(&RESPONSE).map_or(true, |response| !response.is_success)
}

/// The invoker to serve, unless the response already failed.
#[must_use]
pub fn active_invoker(ctx: &Contexts) -> Option<Arc<Invoker>> {
    if has_failed(ctx) {
        return None;
    }
    ctx.find(&INVOKER).cloned()
}

/// Marks the response as failed and returns its error report.
pub fn fail(
    ctx: &mut Contexts,
    code: CodeHttp,
    message: impl Into<String>,
) -> Result<&mut ErrorReport, ProcessorError> {
    let response = ctx.get_mut(&RESPONSE)?;
    let message = message.into();
    tracing::debug!(status = code.status(), code = code.code(), %message, "Request rejected");
    response.set_code(code);
    response.text = Some(message);
    Ok(response.errors.get_or_insert_with(ErrorReport::new))
}
