//! Assemblage stages.
//!
//! 1. `internal_error` - Failures become a 500
//! 2. [`Nodes`] - Request-node tree from `X-Filter`
//! 3. [`MainRequest`] - The response to assemble, ends the chain when
//!    there is nothing to assemble
//! 4. [`Inject`] - Reference blocks replaced by their content

use std::fmt;
use std::sync::Arc;

use daedalus_core::headers::{joined_values, X_FILTER, X_HTTP_METHOD_OVERRIDE};
use daedalus_core::Dispatch;
use daedalus_processor::{Chain, Contexts, Contract, Handler, ProcessorError};
use daedalus_server::stages::overridden;
use http::Method;

use crate::context::{NODE, REQUEST, RESPONSE};
use crate::node::RequestNode;
use crate::splice::assemble;

/// Parses `X-Filter` into the request-node tree.
///
/// Only requests that are effectively a `GET` are assembled; the main
/// request keeps the parameters that reach no node.
#[derive(Debug, Clone, Copy)]
pub struct Nodes {
    method_override: bool,
}

impl Nodes {
    /// Creates the stage; `method_override` honours
    /// `X-HTTP-Method-Override` when deciding the effective method.
    #[must_use]
    pub const fn new(method_override: bool) -> Self {
        Self { method_override }
    }
}

impl Handler for Nodes {
    fn name(&self) -> &'static str {
        "node"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&REQUEST).defines_if(&NODE)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let request = ctx.get_mut(&REQUEST)?;
        let mut method = request.method.clone();
        if self.method_override {
            if let Some(value) = request.header(X_HTTP_METHOD_OVERRIDE) {
                method = overridden(&request.method, value).unwrap_or(method);
            }
        }
        if method != Method::GET {
            return Ok(());
        }
        let Some(mut node) = joined_values(&request.headers, X_FILTER).and_then(|value| RequestNode::parse(&value))
        else {
            return Ok(());
        };

        node.distribute(std::mem::take(&mut request.parameters));
        request.parameters = node.parameters.clone();
        request.headers.remove(X_FILTER);
        tracing::debug!(filter = %node, "Assemblage requested");
        ctx.set(&NODE, node);
        Ok(())
    }
}

/// Obtains the main response from the inner dispatcher.
pub struct MainRequest {
    inner: Arc<dyn Dispatch>,
}

impl MainRequest {
    /// Creates the stage.
    #[must_use]
    pub fn new(inner: Arc<dyn Dispatch>) -> Self {
        Self { inner }
    }
}

impl fmt::Debug for MainRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainRequest").finish_non_exhaustive()
    }
}

impl Handler for MainRequest {
    fn name(&self) -> &'static str {
        "main"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&REQUEST).requires(&RESPONSE).optional(&NODE)
    }

    fn process(&self, chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let assembled = ctx.contains(&NODE);
        let request = ctx.get(&REQUEST)?.clone();
        let response = self.inner.dispatch(request);
        let proceed = assembled && response.is_success && !response.body.is_empty();
        ctx.set(&RESPONSE, response);
        if !proceed {
            chain.cancel();
        }
        Ok(())
    }
}

/// Replaces the reference blocks the tree names with their content.
pub struct Inject {
    inner: Arc<dyn Dispatch>,
}

impl Inject {
    /// Creates the stage.
    #[must_use]
    pub fn new(inner: Arc<dyn Dispatch>) -> Self {
        Self { inner }
    }
}

impl fmt::Debug for Inject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inject").finish_non_exhaustive()
    }
}

impl Handler for Inject {
    fn name(&self) -> &'static str {
        "inject"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&REQUEST).requires(&RESPONSE).optional(&NODE)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let Some(node) = ctx.take(&NODE) else {
            return Ok(());
        };
        let headers = ctx.get(&REQUEST)?.headers.clone();
        let response = ctx.get_mut(&RESPONSE)?;
        let injected = assemble(&*self.inner, response, &node, &headers);
        tracing::debug!(injected, length = response.body.len(), "Response assembled");
        Ok(())
    }
}
