//! The dispatcher: requests in, responses out.

use std::fmt;
use std::sync::Arc;

use daedalus_codec::{JsonRenderer, Renderer};
use daedalus_core::code::{INTERNAL_ERROR, PATH_FOUND};
use daedalus_core::{Dispatch, Request, Response};
use daedalus_processor::{Assembly, Chain, Processing};
use daedalus_router::ResourceTree;

use crate::context::{REQUEST, RESPONSE};
use crate::error::DispatchError;
use crate::session::SessionProvider;
use crate::settings::ServerSettings;
use crate::stages::{
    internal_error, Content, Encoding, Explain, InternalError, Invoking, MethodOverride,
    MethodPick, Negotiation, Parameters, PathArguments, RequestIdStage, Transaction, UriMatch,
};

/// The dispatcher stages in their fixed order.
///
/// The `transaction` stage is only part of the assembly when a session
/// provider is given.
#[must_use]
pub fn dispatcher_assembly(
    tree: &Arc<ResourceTree>,
    settings: &Arc<ServerSettings>,
    renderers: Vec<Arc<dyn Renderer>>,
    sessions: Option<Arc<dyn SessionProvider>>,
) -> Assembly {
    let assembly = Assembly::new("dispatcher")
        .add(InternalError::new(Arc::clone(settings)))
        .add(RequestIdStage)
        .add(MethodOverride::new(settings.method_override))
        .add(UriMatch::new(Arc::clone(tree)))
        .add(Negotiation::new(
            renderers,
            settings.default_content_type.clone(),
            settings.charset.clone(),
        ))
        .add(MethodPick::new(Arc::clone(tree), settings.cors_allow_origin.is_some()))
        .add(PathArguments)
        .add(Parameters)
        .add(Content);
    let assembly = match sessions {
        Some(sessions) => assembly.add(Transaction::new(sessions, Arc::clone(settings))),
        None => assembly,
    };
    assembly
        .add(Invoking)
        .add(Encoding::new(Arc::clone(tree)))
        .add(Explain::new(Arc::clone(settings)))
}

/// Answers requests from a resource tree.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use daedalus_core::{Dispatch, Request};
/// use daedalus_router::TreeBuilder;
/// use daedalus_server::Dispatcher;
///
/// let tree = Arc::new(TreeBuilder::new().build());
/// let dispatcher = Dispatcher::builder(tree).build().unwrap();
/// let response = dispatcher.dispatch(Request::get("/Nothing"));
/// assert_eq!(response.status, 404);
/// assert_eq!(response.json().unwrap()["code"], "PATH_NOT_FOUND");
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    processing: Arc<Processing>,
    settings: Arc<ServerSettings>,
}

impl Dispatcher {
    /// Starts building a dispatcher over a tree.
    #[must_use]
    pub fn builder(tree: Arc<ResourceTree>) -> DispatcherBuilder {
        DispatcherBuilder {
            tree,
            settings: ServerSettings::default(),
            renderers: vec![Arc::new(JsonRenderer)],
            sessions: None,
            customize: Vec::new(),
        }
    }

    /// Compiles a customized assembly of stages.
    pub fn from_assembly(assembly: &Assembly, settings: Arc<ServerSettings>) -> Result<Self, DispatchError> {
        let processing = assembly.create(&[REQUEST.attribute(), RESPONSE.attribute()])?;
        tracing::debug!(report = %processing.report(), "Compiled dispatcher");
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

    /// The settings in use.
    #[must_use]
    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("stages", &self.processing.step_names())
            .finish_non_exhaustive()
    }
}

impl Dispatch for Dispatcher {
    fn dispatch(&self, request: Request) -> Response {
        let span = tracing::debug_span!("dispatch", method = %request.method, uri = %request.uri);
        let _entered = span.enter();

        let mut ctx = self.processing.contexts();
        ctx.set(&REQUEST, request);
        ctx.set(&RESPONSE, Response::new(PATH_FOUND));
        let result = Chain::new(&self.processing).process(&mut ctx);
        let response = ctx.take(&RESPONSE).unwrap_or_else(|| Response::new(INTERNAL_ERROR));
        let response = match result {
            Ok(_) => response,
            Err(error) => {
                tracing::error!(%error, "Unhandled dispatch failure");
                internal_error(&response, &error, &self.settings)
            }
        };
        tracing::debug!(status = response.status, code = %response.code, "Dispatched");
        response
    }
}

type Customize = Box<dyn FnOnce(Assembly) -> Assembly + Send>;

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    tree: Arc<ResourceTree>,
    settings: ServerSettings,
    renderers: Vec<Arc<dyn Renderer>>,
    sessions: Option<Arc<dyn SessionProvider>>,
    customize: Vec<Customize>,
}

impl DispatcherBuilder {
    /// Sets the settings.
    #[must_use]
    pub fn settings(mut self, settings: ServerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Adds a renderer after the JSON one.
    #[must_use]
    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderers.push(renderer);
        self
    }

    /// Wraps every call in a session of the provider.
    #[must_use]
    pub fn sessions(mut self, sessions: Arc<dyn SessionProvider>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Edits the assembly before it is compiled, e.g. to anchor extra
    /// stages with [`Assembly::add_before`].
    #[must_use]
    pub fn customize<F>(mut self, customize: F) -> Self
    where
        F: FnOnce(Assembly) -> Assembly + Send + 'static,
    {
        self.customize.push(Box::new(customize));
        self
    }

    /// Compiles the dispatcher.
    pub fn build(self) -> Result<Dispatcher, DispatchError> {
        let settings = Arc::new(self.settings);
        let mut assembly = dispatcher_assembly(&self.tree, &settings, self.renderers, self.sessions);
        for customize in self.customize {
            assembly = customize(assembly);
        }
        Dispatcher::from_assembly(&assembly, settings)
    }
}

impl fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("settings", &self.settings)
            .field("renderers", &self.renderers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_router::TreeBuilder;

    fn empty_tree() -> Arc<ResourceTree> {
        Arc::new(TreeBuilder::new().build())
    }

    #[test]
    fn test_stage_order() {
        let dispatcher = Dispatcher::builder(empty_tree()).build().unwrap();
        let stages = dispatcher.stage_names();
        assert_eq!(stages.first(), Some(&"internal_error"));
        assert_eq!(stages.last(), Some(&"explain"));
        assert_eq!(stages.len(), 12);
        assert!(!stages.contains(&"transaction"));
    }

    #[test]
    fn test_not_found_has_request_id_and_length() {
        let dispatcher = Dispatcher::builder(empty_tree()).build().unwrap();
        let response = dispatcher.dispatch(Request::get("/Missing"));
        assert_eq!(response.status, 404);
        assert!(response.header("x-request-id").is_some());
        assert_eq!(response.header("content-length"), Some(response.length().to_string().as_str()));
    }
}
