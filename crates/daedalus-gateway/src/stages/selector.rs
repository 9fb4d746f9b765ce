//! Repository snapshot, authorized gateways and gateway selection.

use std::fmt;
use std::sync::Arc;

use daedalus_core::code::{BAD_GATEWAY, METHOD_NOT_AVAILABLE, PATH_NOT_FOUND, UNAUTHORIZED_ACCESS};
use daedalus_processor::{Chain, Contexts, Contract, Handler, ProcessorError};
use daedalus_server::context::{fail, has_failed};

use crate::context::{ALLOWS, MATCH, REPOSITORY, REQUEST, RESPONSE};
use crate::authorized::AuthorizedRepositories;
use crate::error::GatewayError;
use crate::repository::{JoinedRepository, Repository, SharedRepository};

/// Pins the repository serving the request.
pub struct Obtain {
    shared: Arc<SharedRepository>,
}

impl Obtain {
    /// Creates the stage.
    #[must_use]
    pub fn new(shared: Arc<SharedRepository>) -> Self {
        Self { shared }
    }
}

impl fmt::Debug for Obtain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Obtain").finish_non_exhaustive()
    }
}

impl Handler for Obtain {
    fn name(&self) -> &'static str {
        "repository"
    }

    fn contract(&self) -> Contract {
        Contract::new().defines(&REPOSITORY)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        ctx.set(&REPOSITORY, self.shared.current());
        Ok(())
    }
}

/// Puts the gateways of the request authorization before the shared ones.
///
/// A rejected authorization answers 401, through the error gateway for 401
/// when there is one; an unavailable listing answers 502.
pub struct Authorized {
    repositories: Arc<AuthorizedRepositories>,
}

impl Authorized {
    /// Creates the stage.
    #[must_use]
    pub fn new(repositories: Arc<AuthorizedRepositories>) -> Self {
        Self { repositories }
    }
}

impl fmt::Debug for Authorized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorized")
            .field("repositories", &self.repositories)
            .finish()
    }
}

impl Handler for Authorized {
    fn name(&self) -> &'static str {
        "authorized"
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .requires(&REQUEST)
            .requires(&RESPONSE)
            .requires(&REPOSITORY)
            .defines_if(&MATCH)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        if has_failed(ctx) {
            return Ok(());
        }
        let request = ctx.get(&REQUEST)?;
        let Some(authorization) = request.header(self.repositories.header()).map(String::from) else {
            return Ok(());
        };
        match self.repositories.obtain(&authorization) {
            Ok(granted) => {
                let current = Arc::clone(ctx.get(&REPOSITORY)?);
                let joined: Arc<dyn Repository> = Arc::new(JoinedRepository::new(granted).join(current));
                ctx.set(&REPOSITORY, joined);
            }
            Err(GatewayError::InvalidAuthorization) => {
                fail(ctx, UNAUTHORIZED_ACCESS, "Invalid authorization")?;
                let repository = Arc::clone(ctx.get(&REPOSITORY)?);
                let request = ctx.get(&REQUEST)?;
                let found = repository.find(
                    Some(&request.method),
                    Some(&request.headers),
                    Some(&request.uri),
                    Some(UNAUTHORIZED_ACCESS.status()),
                );
                if let Some(found) = found {
                    tracing::debug!(gateway = %found.gateway, "Error gateway selected");
                    ctx.set(&MATCH, found);
                }
            }
            Err(error) => {
                tracing::info!(%error, "Cannot fetch the authorized gateways");
                fail(ctx, BAD_GATEWAY, error.to_string())?;
            }
        }
        Ok(())
    }
}

/// Picks the gateway for the request.
///
/// Without a match the response becomes a 405 when other methods are
/// served on the path, else a 404, and an error gateway for that status
/// is looked up in its place.
#[derive(Debug, Clone, Copy, Default)]
pub struct Selector;

impl Handler for Selector {
    fn name(&self) -> &'static str {
        "selector"
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .requires(&REQUEST)
            .requires(&RESPONSE)
            .requires(&REPOSITORY)
            .defines_if(&MATCH)
            .defines_if(&ALLOWS)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        if has_failed(ctx) {
            return Ok(());
        }
        let repository = Arc::clone(ctx.get(&REPOSITORY)?);
        let request = ctx.get(&REQUEST)?;
        let (method, headers, uri) = (request.method.clone(), request.headers.clone(), request.uri.clone());

        if let Some(found) = repository.find(Some(&method), Some(&headers), Some(&uri), None) {
            tracing::debug!(gateway = %found.gateway, %uri, "Gateway selected");
            ctx.set(&MATCH, found);
            return Ok(());
        }

        let allows = repository.allows_for(Some(&headers), Some(&uri));
        let code = if allows.is_empty() {
            fail(ctx, PATH_NOT_FOUND, format!("No gateway for '{uri}'"))?;
            PATH_NOT_FOUND
        } else {
            fail(ctx, METHOD_NOT_AVAILABLE, format!("Method {method} is not available"))?;
            ctx.set(&ALLOWS, allows);
            METHOD_NOT_AVAILABLE
        };
        if let Some(found) = repository.find(Some(&method), Some(&headers), Some(&uri), Some(code.status())) {
            tracing::debug!(gateway = %found.gateway, status = code.status(), "Error gateway selected");
            ctx.set(&MATCH, found);
        }
        Ok(())
    }
}
