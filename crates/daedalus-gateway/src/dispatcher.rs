//! The gateway dispatcher.

use std::fmt;
use std::sync::Arc;

use daedalus_core::code::{INTERNAL_ERROR, PATH_FOUND};
use daedalus_core::{Dispatch, Request, Response};
use daedalus_processor::{Assembly, Chain, Processing};
use daedalus_server::stages::{internal_error, InternalError};
use daedalus_server::ServerSettings;

use crate::context::{REQUEST, RESPONSE};
use crate::error::GatewayError;
use crate::repository::SharedRepository;
use crate::authorized::{AuthorizedRepositories, AuthorizedSettings};
use crate::stages::{Authorized, ErrorPlacement, Filter, Forward, GatewayExplain, Obtain, Selector, Upstreams};

/// The gateway stages in their fixed order.
///
/// The `authorized` stage is only added with authorized repositories.
#[must_use]
pub fn gateway_assembly(
    repository: &Arc<SharedRepository>,
    authorized: Option<Arc<AuthorizedRepositories>>,
    upstreams: Upstreams,
    checker: Arc<dyn Dispatch>,
    filter_cache: bool,
    settings: &Arc<ServerSettings>,
) -> Assembly {
    let mut assembly = Assembly::new("gateway")
        .add(InternalError::new(Arc::clone(settings)))
        .add(Obtain::new(Arc::clone(repository)));
    if let Some(authorized) = authorized {
        assembly = assembly.add(Authorized::new(authorized));
    }
    assembly
        .add(Selector)
        .add(Filter::new(checker, filter_cache))
        .add(ErrorPlacement)
        .add(Forward::new(upstreams))
        .add(GatewayExplain::new(Arc::clone(settings)))
}

/// Answers requests by forwarding them through gateways.
#[derive(Clone)]
pub struct GatewayDispatcher {
    processing: Arc<Processing>,
    settings: Arc<ServerSettings>,
}

impl GatewayDispatcher {
    /// Starts building a gateway over a repository and its default
    /// upstream.
    #[must_use]
    pub fn builder(repository: Arc<SharedRepository>, upstream: Arc<dyn Dispatch>) -> GatewayDispatcherBuilder {
        GatewayDispatcherBuilder {
            repository,
            upstreams: Upstreams::new(Arc::clone(&upstream)),
            checker: upstream,
            filter_cache: true,
            authorized: None,
            settings: ServerSettings::default(),
        }
    }

    /// Names of the compiled stages.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.processing.step_names()
    }
}

impl fmt::Debug for GatewayDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayDispatcher")
            .field("stages", &self.processing.step_names())
            .finish_non_exhaustive()
    }
}

impl Dispatch for GatewayDispatcher {
    fn dispatch(&self, request: Request) -> Response {
        let span = tracing::debug_span!("gateway", method = %request.method, uri = %request.uri);
        let _entered = span.enter();

        let mut ctx = self.processing.contexts();
        ctx.set(&REQUEST, request);
        ctx.set(&RESPONSE, Response::new(PATH_FOUND));
        let result = Chain::new(&self.processing).process(&mut ctx);
        let response = ctx.take(&RESPONSE).unwrap_or_else(|| Response::new(INTERNAL_ERROR));
        match result {
            Ok(_) => response,
            Err(error) => {
                tracing::error!(%error, "Unhandled gateway failure");
                internal_error(&response, &error, &self.settings)
            }
        }
    }
}

/// Builder for [`GatewayDispatcher`].
pub struct GatewayDispatcherBuilder {
    repository: Arc<SharedRepository>,
    upstreams: Upstreams,
    checker: Arc<dyn Dispatch>,
    filter_cache: bool,
    authorized: Option<Arc<AuthorizedRepositories>>,
    settings: ServerSettings,
}

impl GatewayDispatcherBuilder {
    /// Sets the settings used for the gateway's own answers.
    #[must_use]
    pub fn settings(mut self, settings: ServerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Registers the upstream of gateways with a `Host`.
    #[must_use]
    pub fn host(mut self, host: impl AsRef<str>, upstream: Arc<dyn Dispatch>) -> Self {
        self.upstreams = self.upstreams.host(host, upstream);
        self
    }

    /// Answers filter requests with another dispatcher than the default
    /// upstream.
    #[must_use]
    pub fn checker(mut self, checker: Arc<dyn Dispatch>) -> Self {
        self.checker = checker;
        self
    }

    /// Enables or disables the filter answer cache.
    #[must_use]
    pub fn filter_cache(mut self, enabled: bool) -> Self {
        self.filter_cache = enabled;
        self
    }

    /// Searches the gateways listed by `listing` for the request
    /// authorization before the shared ones.
    #[must_use]
    pub fn authorized(mut self, settings: AuthorizedSettings, listing: Arc<dyn Dispatch>) -> Self {
        self.authorized = Some(Arc::new(AuthorizedRepositories::new(settings, listing)));
        self
    }

    /// Compiles the gateway.
    pub fn build(self) -> Result<GatewayDispatcher, GatewayError> {
        let settings = Arc::new(self.settings);
        let assembly = gateway_assembly(
            &self.repository,
            self.authorized,
            self.upstreams,
            self.checker,
            self.filter_cache,
            &settings,
        );
        let processing = assembly.create(&[REQUEST.attribute(), RESPONSE.attribute()])?;
        tracing::debug!(report = %processing.report(), "Compiled gateway");
        Ok(GatewayDispatcher {
            processing: Arc::new(processing),
            settings,
        })
    }
}

impl fmt::Debug for GatewayDispatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayDispatcherBuilder")
            .field("upstreams", &self.upstreams)
            .field("filter_cache", &self.filter_cache)
            .field("authorized", &self.authorized.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GatewayRecord, GatewayRepository};

    struct Echo;

    impl Dispatch for Echo {
        fn dispatch(&self, request: Request) -> Response {
            let mut response = Response::new(PATH_FOUND);
            response.body = request.target().into();
            response
        }
    }

    fn gateway(records: Vec<GatewayRecord>) -> GatewayDispatcher {
        let repository = Arc::new(SharedRepository::new(Arc::new(GatewayRepository::new(records).unwrap())));
        GatewayDispatcher::builder(repository, Arc::new(Echo)).build().unwrap()
    }

    #[test]
    fn test_stage_order() {
        let gateway = gateway(Vec::new());
        assert_eq!(
            gateway.stage_names(),
            ["internal_error", "repository", "selector", "filter", "error_placement", "forward", "explain"]
        );
    }

    #[test]
    fn test_authorized_stage_only_when_configured() {
        let repository = Arc::new(SharedRepository::new(Arc::new(GatewayRepository::default())));
        let gateway = GatewayDispatcher::builder(repository, Arc::new(Echo))
            .authorized(AuthorizedSettings::default(), Arc::new(Echo))
            .build()
            .unwrap();
        assert_eq!(gateway.stage_names()[2..4], ["authorized", "selector"]);
    }

    #[test]
    fn test_template_failure_is_internal() {
        let gateway = gateway(vec![GatewayRecord::new("^/x$").navigate("{1}")]);
        let response = gateway.dispatch(Request::get("/x"));
        assert_eq!(response.status, 500);
        assert_eq!(response.json().unwrap()["message"], "Internal server error");
    }
}
