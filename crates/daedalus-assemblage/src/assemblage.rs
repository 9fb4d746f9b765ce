//! The assembling dispatcher.

use std::fmt;
use std::sync::Arc;

use daedalus_core::code::{INTERNAL_ERROR, PATH_FOUND};
use daedalus_core::{Dispatch, Request, Response};
use daedalus_processor::{Assembly, Chain, Processing};
use daedalus_server::stages::{internal_error, InternalError};
use daedalus_server::ServerSettings;

use crate::context::{REQUEST, RESPONSE};
use crate::error::AssemblageError;
use crate::stages::{Inject, MainRequest, Nodes};

/// The assemblage stages in their fixed order.
#[must_use]
pub fn assemblage_assembly(inner: &Arc<dyn Dispatch>, settings: &Arc<ServerSettings>) -> Assembly {
    Assembly::new("assemblage")
        .add(InternalError::new(Arc::clone(settings)))
        .add(Nodes::new(settings.method_override))
        .add(MainRequest::new(Arc::clone(inner)))
        .add(Inject::new(Arc::clone(inner)))
}

/// Wraps a dispatcher and inlines the references its clients ask for.
///
/// Requests without `X-Filter` are passed through untouched.
#[derive(Clone)]
pub struct Assemblage {
    processing: Arc<Processing>,
    settings: Arc<ServerSettings>,
}

impl Assemblage {
    /// Assembles the responses of `inner` with default settings.
    pub fn new(inner: Arc<dyn Dispatch>) -> Result<Self, AssemblageError> {
        Self::with_settings(inner, ServerSettings::default())
    }

    /// Assembles the responses of `inner`.
    pub fn with_settings(inner: Arc<dyn Dispatch>, settings: ServerSettings) -> Result<Self, AssemblageError> {
        let settings = Arc::new(settings);
        let processing = assemblage_assembly(&inner, &settings).create(&[REQUEST.attribute(), RESPONSE.attribute()])?;
        tracing::debug!(report = %processing.report(), "Compiled assemblage");
        Ok(Self {
            processing: Arc::new(processing),
            settings,
        })
    }

    /// Names of the compiled stages.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.processing.step_names()
    }
}

impl fmt::Debug for Assemblage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assemblage")
            .field("stages", &self.processing.step_names())
            .finish_non_exhaustive()
    }
}

impl Dispatch for Assemblage {
    fn dispatch(&self, request: Request) -> Response {
        let span = tracing::debug_span!("assemblage", method = %request.method, uri = %request.uri);
        let _entered = span.enter();

        let mut ctx = self.processing.contexts();
        ctx.set(&REQUEST, request);
        ctx.set(&RESPONSE, Response::new(PATH_FOUND));
        let result = Chain::new(&self.processing).process(&mut ctx);
        let response = ctx.take(&RESPONSE).unwrap_or_else(|| Response::new(INTERNAL_ERROR));
        match result {
            Ok(_) => response,
            Err(error) => {
                tracing::error!(%error, "Unhandled assemblage failure");
                internal_error(&response, &error, &self.settings)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl Dispatch for Echo {
        fn dispatch(&self, request: Request) -> Response {
            let mut response = Response::new(PATH_FOUND);
            response.body = request.target().into();
            response
        }
    }

    #[test]
    fn test_stage_order() {
        let assemblage = Assemblage::new(Arc::new(Echo)).unwrap();
        assert_eq!(assemblage.stage_names(), ["internal_error", "node", "main", "inject"]);
    }

    #[test]
    fn test_pass_through_keeps_parameters() {
        let assemblage = Assemblage::new(Arc::new(Echo)).unwrap();
        let response = assemblage.dispatch(Request::get("/User?Author.limit=1"));
        assert_eq!(response.body_text(), "/User?Author.limit=1");
    }

    #[test]
    fn test_filter_takes_node_parameters() {
        let assemblage = Assemblage::new(Arc::new(Echo)).unwrap();
        let request = Request::get("/Article?Author.limit=1&limit=2").with_header("X-Filter", "Author");
        assert_eq!(assemblage.dispatch(request).body_text(), "/Article?limit=2");
    }

    #[test]
    fn test_overridden_delete_is_not_assembled() {
        let assemblage = Assemblage::new(Arc::new(Echo)).unwrap();
        let request = Request::get("/Article?Author.limit=1")
            .with_header("X-Filter", "Author")
            .with_header("X-HTTP-Method-Override", "DELETE");
        assert_eq!(assemblage.dispatch(request).body_text(), "/Article?Author.limit=1");
    }
}
