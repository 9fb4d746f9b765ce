//! Internal error handling and request ids.

use std::sync::Arc;

use daedalus_core::code::INTERNAL_ERROR;
use daedalus_core::headers::X_REQUEST_ID;
use daedalus_core::{RequestId, Response};
use daedalus_processor::{Chain, Contexts, Contract, Handler, ProcessorError};
use http::header::HeaderName;

use crate::context::{REQUEST, REQUEST_ID, RESPONSE};
use crate::settings::ServerSettings;
use crate::stages::explain::{insert, internal_error};

/// Turns any stage failure into a 500 answer.
///
/// Registered first so that its error hook runs last, after the hooks of
/// every later stage.
#[derive(Debug, Clone)]
pub struct InternalError {
    settings: Arc<ServerSettings>,
}

impl InternalError {
    /// Creates the stage.
    #[must_use]
    pub fn new(settings: Arc<ServerSettings>) -> Self {
        Self { settings }
    }
}

impl Handler for InternalError {
    fn name(&self) -> &'static str {
        "internal_error"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&RESPONSE)
    }

    fn process(&self, chain: &mut Chain, _ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let settings = Arc::clone(&self.settings);
        chain.on_error(move |ctx, error| {
            tracing::error!(%error, "Request processing failed");
            let previous = ctx.take(&RESPONSE).unwrap_or_else(|| Response::new(INTERNAL_ERROR));
            ctx.set(&RESPONSE, internal_error(&previous, error, &settings));
            true
        });
        Ok(())
    }
}

/// Reads or creates the request id and echoes it on the response.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdStage;

impl Handler for RequestIdStage {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .requires(&REQUEST)
            .requires(&RESPONSE)
            .defines(&REQUEST_ID)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let id = ctx
            .get(&REQUEST)?
            .header(X_REQUEST_ID)
            .and_then(RequestId::parse)
            .unwrap_or_default();
        tracing::trace!(request_id = %id, "Request id");
        insert(
            &mut ctx.get_mut(&RESPONSE)?.headers,
            HeaderName::from_static(X_REQUEST_ID),
            &id.to_string(),
        );
        ctx.set(&REQUEST_ID, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_core::{code, Request};
    use daedalus_processor::Assembly;

    #[test]
    fn test_request_id_is_echoed() {
        let processing = Arc::new(
            Assembly::new("ids")
                .add(RequestIdStage)
                .create(&[REQUEST.attribute(), RESPONSE.attribute()])
                .unwrap(),
        );
        let id = RequestId::new();
        let mut ctx = processing.contexts();
        ctx.set(&REQUEST, Request::get("/").with_header(X_REQUEST_ID, &id.to_string()));
        ctx.set(&RESPONSE, Response::new(code::PATH_FOUND));
        Chain::new(&processing).process(&mut ctx).unwrap();

        assert_eq!(ctx.get(&REQUEST_ID).unwrap(), &id);
        let echoed = ctx.get(&RESPONSE).unwrap().header(X_REQUEST_ID).map(String::from);
        assert_eq!(echoed, Some(id.to_string()));
    }

    #[test]
    fn test_failure_becomes_internal_error() {
        let processing = Arc::new(
            Assembly::new("failing")
                .add(InternalError::new(Arc::new(ServerSettings::default())))
                .add(daedalus_processor::FnHandler::new("boom", Contract::new(), |_, _| {
                    Err(ProcessorError::failed("boom"))
                }))
                .create(&[RESPONSE.attribute()])
                .unwrap(),
        );
        let mut ctx = processing.contexts();
        ctx.set(&RESPONSE, Response::new(code::PATH_FOUND));
        let outcome = Chain::new(&processing).process(&mut ctx).unwrap();

        assert_eq!(outcome, daedalus_processor::Outcome::Failed);
        assert_eq!(ctx.get(&RESPONSE).unwrap().status, 500);
    }
}
