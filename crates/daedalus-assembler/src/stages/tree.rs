//! Tree stages: placement, slashes, model paths, root resources.

use std::collections::BTreeSet;
use std::sync::Arc;

use daedalus_codec::create_encoder;
use daedalus_core::{Call, Primitive, Type, Value, CALL_HINTS};
use daedalus_processor::{Chain, Contexts, Contract, Handler, ProcessorError};
use daedalus_router::{Invoker, NodeId, TreeBuilder};
use http::Method;

use crate::error::ExcludeReason;
use crate::register::{exclude, suggest, Exclusion, BUILDER, EXCLUDED, INVOKERS, SUGGESTIONS, TREE};

/// Service name of the generated root resources call.
pub const ROOT_SERVICE: &str = "Root";

/// Invokers answering the same method of one node.
struct Conflict {
    node: NodeId,
    method: Method,
    invokers: Vec<Invoker>,
}

impl Conflict {
    /// Splits the invokers into the one to serve and the ones it replaces.
    ///
    /// An invoker is replaced when another one of the conflict names its
    /// service in a `replaceFor` hint. Exactly one invoker must remain.
    fn resolve(self) -> Result<(Invoker, Vec<Invoker>), Vec<Exclusion>> {
        let replaced: BTreeSet<String> = self
            .invokers
            .iter()
            .flat_map(|invoker| {
                invoker
                    .replaces
                    .iter()
                    .filter(move |service| **service != invoker.service)
                    .cloned()
            })
            .collect();
        let method = self.method.to_string();
        let path = self.invokers.first().map(Invoker::path_template).unwrap_or_default();
        let (mut kept, dropped): (Vec<Invoker>, Vec<Invoker>) = self
            .invokers
            .into_iter()
            .partition(|invoker| !replaced.contains(&invoker.service));

        if kept.len() == 1 {
            if let Some(invoker) = kept.pop() {
                return Ok((invoker, dropped));
            }
        }
        if kept.is_empty() {
            let exclusions = dropped
                .iter()
                .map(|invoker| {
                    Exclusion::new(
                        invoker,
                        ExcludeReason::CircularReplace {
                            method: method.clone(),
                            path: path.clone(),
                        },
                    )
                })
                .collect();
            return Err(exclusions);
        }
        let all: Vec<&Invoker> = kept.iter().chain(&dropped).collect();
        let exclusions = all
            .iter()
            .map(|invoker| {
                let others = all
                    .iter()
                    .filter(|other| other.id != invoker.id)
                    .map(|other| other.id.clone())
                    .collect();
                Exclusion::new(
                    invoker,
                    ExcludeReason::Conflict {
                        method: method.clone(),
                        path: path.clone(),
                        others,
                    },
                )
            })
            .collect();
        Err(exclusions)
    }
}

/// Places every invoker in a new tree.
///
/// Invokers answering the same method of the same node are set aside
/// until all others are placed. A `replaceFor` hint can settle such a
/// conflict; otherwise every invoker in it is excluded.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvokerNode;

impl InvokerNode {
    fn place(builder: &mut TreeBuilder, invoker: Invoker, excluded: &mut Vec<Exclusion>) {
        let (id, location) = (invoker.id.clone(), invoker.location.clone());
        if let Err(err) = builder.place(invoker) {
            excluded.push(Exclusion {
                invoker: id,
                location,
                reason: err.into(),
            });
        }
    }
}

impl Handler for InvokerNode {
    fn name(&self) -> &'static str {
        "invoker_node"
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .requires(&INVOKERS)
            .requires(&EXCLUDED)
            .defines(&BUILDER)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let invokers = std::mem::take(ctx.get_mut(&INVOKERS)?);
        let mut builder = TreeBuilder::new();
        let mut excluded = Vec::new();
        let mut conflicts: Vec<Conflict> = Vec::new();
        for invoker in invokers {
            let taken = match builder.locate(&invoker) {
                Ok(Some(node)) if builder.bound(node, &invoker.http_method).is_some() => Some(node),
                _ => None,
            };
            let Some(node) = taken else {
                Self::place(&mut builder, invoker, &mut excluded);
                continue;
            };
            let existing = conflicts
                .iter_mut()
                .find(|conflict| conflict.node == node && conflict.method == invoker.http_method);
            match existing {
                Some(conflict) => conflict.invokers.push(invoker),
                None => conflicts.push(Conflict {
                    node,
                    method: invoker.http_method.clone(),
                    invokers: vec![invoker],
                }),
            }
        }

        let mut unresolved = false;
        for mut conflict in conflicts {
            if let Some(bound) = builder.unbind(conflict.node, &conflict.method) {
                let bound = Arc::try_unwrap(bound).unwrap_or_else(|shared| (*shared).clone());
                conflict.invokers.insert(0, bound);
            }
            match conflict.resolve() {
                Ok((invoker, replaced)) => {
                    for other in &replaced {
                        tracing::info!(invoker = %other.id, by = %invoker.id, "Invoker replaced");
                    }
                    Self::place(&mut builder, invoker, &mut excluded);
                }
                Err(exclusions) => {
                    let locations: Vec<&str> = exclusions.iter().map(|e| e.location.as_str()).collect();
                    tracing::error!(
                        locations = %locations.join(", "),
                        "Cannot use invokers because they have the same web address"
                    );
                    unresolved = true;
                    excluded.extend(exclusions);
                }
            }
        }
        if unresolved {
            let hints: Vec<String> = CALL_HINTS
                .iter()
                .map(|(name, description)| format!("{name}: {description}"))
                .collect();
            tracing::error!(hints = %hints.join("; "), "Use one of the call hints to make the invokers available");
        }

        tracing::debug!(nodes = builder.len(), "Placed invokers");
        ctx.set(&BUILDER, builder);
        exclude(ctx, excluded)
    }
}

/// Marks nodes that must be closed by a slash.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathSlash;

impl Handler for PathSlash {
    fn name(&self) -> &'static str {
        "path_slash"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&BUILDER)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        ctx.get_mut(&BUILDER)?.mark_mandatory_slashes();
        Ok(())
    }
}

/// Records where each model is served by id.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathGetModel;

impl Handler for PathGetModel {
    fn name(&self) -> &'static str {
        "path_get_model"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&BUILDER)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        ctx.get_mut(&BUILDER)?.resolve_model_paths();
        Ok(())
    }
}

/// Computes the accessible resources of every node.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathAccessible;

impl Handler for PathAccessible {
    fn name(&self) -> &'static str {
        "accessible"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&BUILDER)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        ctx.get_mut(&BUILDER)?.compute_accessible();
        Ok(())
    }
}

/// Serves the accessible resources at the root.
///
/// `GET /` answers `{"User": {"href": "/User"}, ...}` unless some call
/// already answers it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RootResources;

impl RootResources {
    fn invoker(resources: Vec<(String, String)>) -> Invoker {
        let call = Call::get("resources", move |_| {
            Ok(Value::object(
                resources
                    .iter()
                    .map(|(name, path)| (name.clone(), Value::from(path.as_str()))),
            ))
        })
        .output(Type::dict(Primitive::Str, Type::Reference));
        let mut invoker = Invoker::from_call(ROOT_SERVICE, &call);
        invoker.http_method = Method::GET;
        invoker.target = None;
        invoker
    }
}

impl Handler for RootResources {
    fn name(&self) -> &'static str {
        "root_resources"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&BUILDER).defines_if(&SUGGESTIONS)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let builder = ctx.get_mut(&BUILDER)?;
        let resources = builder.accessible_paths(NodeId::ROOT);
        let mut invoker = Self::invoker(resources);
        invoker.encoder = create_encoder(&invoker.output, Some("Resources")).map_err(ProcessorError::failed)?;
        if let Err(err) = builder.place(invoker) {
            suggest(ctx, format!("Root resources are not served: {err}"))?;
        }
        Ok(())
    }
}

/// Freezes the tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct Freeze;

impl Handler for Freeze {
    fn name(&self) -> &'static str {
        "freeze"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&BUILDER).defines(&TREE)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let builder = ctx
            .take(&BUILDER)
            .ok_or_else(|| ProcessorError::failed("No tree builder to freeze"))?;
        let tree = builder.build();
        tracing::info!(nodes = tree.len(), invokers = tree.invokers().count(), "Resource tree ready");
        ctx.set(&TREE, tree);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_codec::{JsonRenderer, NoPaths};
    use daedalus_core::Arguments;

    #[test]
    fn test_root_resources_render_references() {
        let mut invoker = RootResources::invoker(vec![("User".into(), "/User".into())]);
        invoker.encoder = create_encoder(&invoker.output, Some("Resources")).unwrap();
        let value = (invoker.invoke)(&Arguments::new()).unwrap();
        let rendered = invoker
            .encoder
            .as_ref()
            .unwrap()
            .encode(&value, &JsonRenderer, &NoPaths)
            .unwrap();
        assert_eq!(rendered.body, br#"{"User":{"href":"/User"}}"#);
        assert!(invoker.path.is_empty());
    }
}
