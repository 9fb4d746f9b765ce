//! Effective method and invoker selection.

use std::sync::Arc;

use daedalus_core::code::{METHOD_NOT_AVAILABLE, PATH_FOUND};
use daedalus_core::headers::X_HTTP_METHOD_OVERRIDE;
use daedalus_processor::{Chain, Contexts, Contract, Handler, ProcessorError};
use daedalus_router::ResourceTree;
use http::header::{ACCESS_CONTROL_ALLOW_METHODS, ALLOW};
use http::Method;

use crate::context::{fail, has_failed, INVOKER, METHOD, PATH, REQUEST, RESPONSE};
use crate::stages::explain::insert;

/// The method a `X-HTTP-Method-Override` value stands for.
///
/// Only `DELETE` over `GET` and `PUT` over `POST` are honoured.
///
/// ```
/// use daedalus_server::stages::method::overridden;
/// use http::Method;
///
/// assert_eq!(overridden(&Method::GET, " delete "), Some(Method::DELETE));
/// assert_eq!(overridden(&Method::POST, "PUT"), Some(Method::PUT));
/// assert_eq!(overridden(&Method::GET, "PUT"), None);
/// ```
#[must_use]
pub fn overridden(method: &Method, value: &str) -> Option<Method> {
    let wanted = value.trim().to_ascii_uppercase();
    match (method.as_str(), wanted.as_str()) {
        ("GET", "DELETE") => Some(Method::DELETE),
        ("POST", "PUT") => Some(Method::PUT),
        _ => None,
    }
}

/// Resolves the effective method.
#[derive(Debug, Clone, Copy)]
pub struct MethodOverride {
    enabled: bool,
}

impl MethodOverride {
    /// Creates the stage; a disabled stage keeps the request method.
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Handler for MethodOverride {
    fn name(&self) -> &'static str {
        "method_override"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&REQUEST).defines(&METHOD)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let request = ctx.get(&REQUEST)?;
        let mut method = request.method.clone();
        if self.enabled {
            if let Some(value) = request.header(X_HTTP_METHOD_OVERRIDE) {
                match overridden(&method, value) {
                    Some(effective) => {
                        tracing::debug!(from = %method, to = %effective, "Method overridden");
                        method = effective;
                    }
                    None => tracing::debug!(%method, value, "Method override ignored"),
                }
            }
        }
        ctx.set(&METHOD, method);
        Ok(())
    }
}

/// Picks the invoker of the matched node for the effective method.
///
/// `OPTIONS` is answered here with the allowed methods; a method the node
/// does not answer is a 405 carrying `Allow`.
#[derive(Debug, Clone)]
pub struct MethodPick {
    tree: Arc<ResourceTree>,
    cors: bool,
}

impl MethodPick {
    /// Creates the stage.
    #[must_use]
    pub fn new(tree: Arc<ResourceTree>, cors: bool) -> Self {
        Self { tree, cors }
    }
}

impl Handler for MethodPick {
    fn name(&self) -> &'static str {
        "method"
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .requires(&METHOD)
            .requires(&RESPONSE)
            .optional(&PATH)
            .defines_if(&INVOKER)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        if has_failed(ctx) {
            return Ok(());
        }
        let Some(node) = ctx.find(&PATH).and_then(|path| self.tree.node(path.node)) else {
            return Ok(());
        };
        let method = ctx.get(&METHOD)?.clone();
        let allowed = node.allowed();
        let invoker = node.invoker(&method).cloned();
        let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");

        if method == Method::OPTIONS && invoker.is_none() {
            let response = ctx.get_mut(&RESPONSE)?;
            response.set_code(PATH_FOUND);
            let options = if allow.is_empty() {
                Method::OPTIONS.to_string()
            } else {
                format!("{allow}, OPTIONS")
            };
            insert(&mut response.headers, ALLOW, &options);
            if self.cors {
                insert(&mut response.headers, ACCESS_CONTROL_ALLOW_METHODS, &options);
            }
            tracing::trace!(allow = %options, "Answered options");
            return Ok(());
        }

        match invoker {
            Some(invoker) => {
                tracing::trace!(invoker = %invoker.id, "Invoker picked");
                ctx.set(&INVOKER, invoker);
            }
            None => {
                fail(ctx, METHOD_NOT_AVAILABLE, format!("Method {method} is not available"))?;
                insert(&mut ctx.get_mut(&RESPONSE)?.headers, ALLOW, &allow);
            }
        }
        Ok(())
    }
}
