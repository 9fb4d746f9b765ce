//! Service caller, HTTP method and target model stages.
//!
//! These stages turn every call of every service into an invoker, check
//! its hints, decide the HTTP method it answers and the model it is about.

use std::sync::Arc;

use daedalus_core::{CallMethod, Type, TypeModel, CALL_HINTS};
use daedalus_processor::{Chain, Contexts, Contract, Handler, ProcessorError};
use daedalus_router::Invoker;
use http::Method;

use crate::error::ExcludeReason;
use crate::register::{retain, EXCLUDED, INVOKERS, SERVICES};

/// Creates one invoker per declared call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceCaller;

impl Handler for ServiceCaller {
    fn name(&self) -> &'static str {
        "service_caller"
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .requires(&SERVICES)
            .defines(&INVOKERS)
            .defines(&EXCLUDED)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let invokers: Vec<Invoker> = ctx
            .get(&SERVICES)?
            .iter()
            .flat_map(|service| {
                service
                    .calls()
                    .iter()
                    .map(|call| Invoker::from_call(service.name(), call))
            })
            .collect();
        tracing::debug!(invokers = invokers.len(), "Created invokers");
        ctx.set(&INVOKERS, invokers);
        ctx.get_or_insert_with(&EXCLUDED, Vec::new)?;
        Ok(())
    }
}

/// Excludes calls carrying hints the assembler does not know.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateHints;

impl Handler for ValidateHints {
    fn name(&self) -> &'static str {
        "validate_hints"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&INVOKERS).requires(&EXCLUDED)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        retain(ctx, |invoker| {
            let unknown = invoker
                .hints
                .keys()
                .find(|hint| !CALL_HINTS.iter().any(|(known, _)| known == hint));
            match unknown {
                Some(hint) => Err(ExcludeReason::UnknownHint {
                    hint: hint.clone(),
                    known: CALL_HINTS.iter().map(|(known, _)| (*known).to_string()).collect(),
                }),
                None => Ok(()),
            }
        })
    }
}

/// Maps call methods onto HTTP methods.
///
/// | Call     | HTTP     |
/// |----------|----------|
/// | `GET`    | `GET`    |
/// | `DELETE` | `DELETE` |
/// | `INSERT` | `POST`   |
/// | `UPDATE` | `PUT`    |
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodHttp;

impl MethodHttp {
    /// The HTTP method of a call method.
    #[must_use]
    pub fn http_method(method: &CallMethod) -> Option<Method> {
        match method {
            CallMethod::Get => Some(Method::GET),
            CallMethod::Delete => Some(Method::DELETE),
            CallMethod::Insert => Some(Method::POST),
            CallMethod::Update => Some(Method::PUT),
            CallMethod::Other(_) => None,
        }
    }
}

impl Handler for MethodHttp {
    fn name(&self) -> &'static str {
        "method_http"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&INVOKERS).requires(&EXCLUDED)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        retain(ctx, |invoker| {
            let method = Self::http_method(&invoker.method).ok_or_else(|| ExcludeReason::InvalidMethod {
                method: invoker.method.name().to_string(),
            })?;
            invoker.http_method = method;
            Ok(())
        })
    }
}

/// Derives the model each invoker is about.
///
/// - `GET`: the output model, the owner of an output property, or the item
///   model of a collection output
/// - `DELETE`: the owner of the first mandatory property input
/// - `INSERT`: the output model or the owner of the output property
/// - `UPDATE`: the first mandatory model input
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetModel;

impl TargetModel {
    fn target(invoker: &Invoker) -> Option<(Arc<TypeModel>, bool)> {
        let mandatory = || invoker.inputs.iter().filter(|input| !input.has_default());
        match invoker.method {
            CallMethod::Get => match &invoker.output {
                Type::Collection(_, item) => item.model().map(|model| (Arc::clone(model), true)),
                Type::Model(_) | Type::Property(_) => {
                    invoker.output.model().map(|model| (Arc::clone(model), false))
                }
                _ => None,
            },
            CallMethod::Delete => mandatory().find_map(|input| match input.ty() {
                Type::Property(property) => Some((Arc::clone(property.model()), false)),
                _ => None,
            }),
            CallMethod::Insert => match &invoker.output {
                Type::Model(_) | Type::Property(_) => {
                    invoker.output.model().map(|model| (Arc::clone(model), false))
                }
                _ => None,
            },
            CallMethod::Update => mandatory().find_map(|input| match input.ty() {
                Type::Model(model) => Some((Arc::clone(model), false)),
                _ => None,
            }),
            CallMethod::Other(_) => None,
        }
    }
}

impl Handler for TargetModel {
    fn name(&self) -> &'static str {
        "target_model"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&INVOKERS).requires(&EXCLUDED)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        retain(ctx, |invoker| {
            let (target, is_collection) = Self::target(invoker).ok_or(ExcludeReason::NoTarget)?;
            invoker.target = Some(target);
            invoker.is_collection = is_collection;
            Ok(())
        })
    }
}
