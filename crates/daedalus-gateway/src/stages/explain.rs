//! Rendering of the answers the gateway makes itself.

use std::sync::Arc;

use daedalus_core::code::METHOD_NOT_AVAILABLE;
use daedalus_processor::{Chain, Contexts, Contract, Handler, ProcessorError};
use daedalus_server::stages::finish;
use daedalus_server::ServerSettings;
use http::header::ALLOW;
use http::{HeaderValue, Method};

use crate::context::{ALLOWS, RESPONSE};

/// Renders the gateway's own errors, with `Allow` on a 405.
#[derive(Debug, Clone)]
pub struct GatewayExplain {
    settings: Arc<ServerSettings>,
}

impl GatewayExplain {
    /// Creates the stage.
    #[must_use]
    pub fn new(settings: Arc<ServerSettings>) -> Self {
        Self { settings }
    }
}

impl Handler for GatewayExplain {
    fn name(&self) -> &'static str {
        "explain"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&RESPONSE).optional(&ALLOWS)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let allows = ctx.find(&ALLOWS).cloned();
        let response = ctx.get_mut(&RESPONSE)?;
        if let Some(allows) = allows.filter(|_| response.status == METHOD_NOT_AVAILABLE.status()) {
            let allow: Vec<&str> = allows.iter().map(Method::as_str).collect();
            if let Ok(value) = HeaderValue::from_str(&allow.join(", ")) {
                response.headers.insert(ALLOW, value);
            }
        }
        finish(response, &self.settings, None);
        Ok(())
    }
}
