//! Building the request-handling core at startup.

use std::fmt;
use std::sync::Arc;

use daedalus_assemblage::Assemblage;
use daedalus_assembler::{Assembler, Exclusion};
use daedalus_config::DaedalusConfig;
use daedalus_core::{Dispatch, Request, Response, Service};
use daedalus_gateway::{GatewayDispatcher, GatewayRepository, SharedRepository};
use daedalus_router::ResourceTree;
use daedalus_server::{Dispatcher, SessionProvider};

use crate::error::CoreError;

/// Assembles `services` and builds every dispatcher over the resulting
/// tree.
///
/// Calls that cannot be published are excluded and logged; they are
/// listed by [`Core::exclusions`]. Configuration and gateway errors are
/// fatal.
pub fn build_core(config: &DaedalusConfig, services: impl IntoIterator<Item = Service>) -> Result<Core, CoreError> {
    Core::builder(config.clone()).build(services)
}

/// The immutable request-handling core.
///
/// [`Dispatch`] on the core goes through the assemblage, then the
/// dispatcher. The [`gateway`](Core::gateway) forwards to the same path.
#[derive(Clone)]
pub struct Core {
    dispatch: Arc<dyn Dispatch>,
    gateway: Arc<GatewayDispatcher>,
    tree: Arc<ResourceTree>,
    exclusions: Arc<[Exclusion]>,
    gateways: Arc<SharedRepository>,
}

impl Core {
    /// Starts building a core from a configuration.
    #[must_use]
    pub fn builder(config: DaedalusConfig) -> CoreBuilder {
        CoreBuilder { config, sessions: None }
    }

    /// The assembling dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> Arc<dyn Dispatch> {
        Arc::clone(&self.dispatch)
    }

    /// The gateway in front of the dispatcher.
    #[must_use]
    pub fn gateway(&self) -> &GatewayDispatcher {
        &self.gateway
    }

    /// The published resources.
    #[must_use]
    pub fn tree(&self) -> &ResourceTree {
        &self.tree
    }

    /// Calls left out of the tree, with the reason.
    #[must_use]
    pub fn exclusions(&self) -> &[Exclusion] {
        &self.exclusions
    }

    /// The gateway records in use; reloading them takes effect on the
    /// next request.
    #[must_use]
    pub fn gateways(&self) -> &Arc<SharedRepository> {
        &self.gateways
    }
}

impl Dispatch for Core {
    fn dispatch(&self, request: Request) -> Response {
        self.dispatch.dispatch(request)
    }
}

impl fmt::Debug for Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Core")
            .field("nodes", &self.tree.len())
            .field("exclusions", &self.exclusions.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Core`].
#[must_use]
pub struct CoreBuilder {
    config: DaedalusConfig,
    sessions: Option<Arc<dyn SessionProvider>>,
}

impl CoreBuilder {
    /// Runs each request in a session of `sessions`.
    pub fn sessions(mut self, sessions: Arc<dyn SessionProvider>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Validates the configuration and builds the core.
    pub fn build(self, services: impl IntoIterator<Item = Service>) -> Result<Core, CoreError> {
        let config = self.config;
        config.validate()?;

        let resources = Assembler::new(config.assembler_settings())?.assemble(services)?;
        for exclusion in &resources.excluded {
            tracing::warn!(invoker = %exclusion.invoker, location = %exclusion.location, "Not published: {}", exclusion.reason);
        }
        let tree = Arc::new(resources.tree);

        let mut dispatcher = Dispatcher::builder(Arc::clone(&tree)).settings(config.server.clone());
        if let Some(sessions) = self.sessions {
            dispatcher = dispatcher.sessions(sessions);
        }
        let dispatcher = dispatcher.build()?;
        let dispatch: Arc<dyn Dispatch> =
            Arc::new(Assemblage::with_settings(Arc::new(dispatcher), config.server.clone())?);

        let repository = GatewayRepository::new(config.gateway.records(&tree))?;
        let records = repository.len();
        let gateways = Arc::new(SharedRepository::new(Arc::new(repository)));
        let mut gateway = GatewayDispatcher::builder(Arc::clone(&gateways), Arc::clone(&dispatch))
            .settings(config.server.clone())
            .filter_cache(config.gateway.filter_cache);
        if let Some(authorized) = &config.gateway.authorized {
            gateway = gateway.authorized(authorized.clone(), Arc::clone(&dispatch));
        }
        let gateway = gateway.build()?;

        tracing::info!(
            nodes = tree.len(),
            excluded = resources.excluded.len(),
            gateways = records,
            "Core ready"
        );
        Ok(Core {
            dispatch,
            gateway: Arc::new(gateway),
            tree,
            exclusions: resources.excluded.into(),
            gateways,
        })
    }
}

impl fmt::Debug for CoreBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreBuilder")
            .field("config", &self.config)
            .field("sessions", &self.sessions.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_core::{Call, Primitive, Type, TypeModel, Value};
    use daedalus_gateway::Repository;
    use http::Method;

    fn services() -> Vec<Service> {
        let user = TypeModel::builder("User").id("Id", Primitive::Int).build();
        vec![Service::new("UserService")
            .call(
                Call::get("get", |args| Ok(Value::object([("Id", args.get("id").cloned().unwrap_or_default())])))
                    .input("id", Type::Property(user.property_id().unwrap()))
                    .output(Type::Model(user)),
            )
            .call(Call::get("broken", |_| Ok(Value::Null)).input("raw", Type::dict(Primitive::Str, Type::Primitive(Primitive::Int))))]
    }

    #[test]
    fn test_build_core() {
        let core = build_core(&DaedalusConfig::default(), services()).unwrap();
        assert_eq!(core.exclusions().len(), 1);
        assert_eq!(core.exclusions()[0].invoker, "UserService.broken");
        assert!(core.tree().lookup(&Method::GET, "/User/1").is_some());
        assert_eq!(core.dispatch(Request::get("/User/1")).status, 200);
        assert_eq!(core.gateway().dispatch(Request::get("/User/1")).status, 200);
        assert_eq!(core.gateways().current().allows_for(None, Some("/User/1")), [Method::GET]);
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let mut config = DaedalusConfig::default();
        config.slicing.maximum_limit = Some(0);
        assert!(matches!(build_core(&config, services()), Err(CoreError::Config(_))));
    }
}
