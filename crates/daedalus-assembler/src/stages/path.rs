//! Path stages.
//!
//! The path of an invoker is derived in steps:
//!
//! 1. [`PathInput`]: every model property input adds the model name and a
//!    value segment, `User/{User.Id}`
//! 2. [`PathUpdate`]: updates of models with an id add the model name and
//!    the injected id
//! 3. [`PathTarget`]: the target model is appended or merged into the
//!    last literal
//! 4. [`PathDomain`]: the domain of the first model prefixes the path
//! 5. [`PathWebName`]: the web name of the call replaces the last literal

use std::sync::Arc;

use daedalus_core::{Input, Type, TypeModel, TypeProperty};
use daedalus_processor::{Chain, Contexts, Contract, Handler, ProcessorError};
use daedalus_router::{Invoker, PathElement};
use http::Method;

use crate::error::ExcludeReason;
use crate::register::{exclude, retain, suggest, Exclusion, EXCLUDED, INVOKERS, SUGGESTIONS};

fn is_word(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Whether some path element is about the model.
fn mentions(path: &[PathElement], model: &TypeModel) -> bool {
    path.iter().any(|element| match element {
        PathElement::Name(name) => name == model.name(),
        PathElement::Property { property, .. } | PathElement::Injected { property, .. } => {
            property.model().name() == model.name()
        }
    })
}

/// Appends the model name to the last literal, or adds a literal when the
/// path has none.
fn merge_into_last_name(path: &mut Vec<PathElement>, model: &TypeModel) {
    let last = path.iter_mut().rev().find_map(|element| match element {
        PathElement::Name(name) => Some(name),
        PathElement::Property { .. } | PathElement::Injected { .. } => None,
    });
    match last {
        Some(name) => name.push_str(model.name()),
        None => path.push(PathElement::name(model.name())),
    }
}

/// Index combinations of `k` out of `n`, in lexicographic order.
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    fn walk(start: usize, n: usize, k: usize, current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        for index in start..n {
            current.push(index);
            walk(index + 1, n, k, current, out);
            current.pop();
        }
    }
    let mut out = Vec::new();
    walk(0, n, k, &mut Vec::with_capacity(k), &mut out);
    out
}

fn push_property(path: &mut Vec<PathElement>, input: &Input, property: &TypeProperty) {
    path.push(PathElement::name(property.model().name()));
    path.push(PathElement::Property {
        input: input.name().to_string(),
        property: property.clone(),
    });
}

/// Binds model property inputs to path segments.
///
/// Optional property inputs produce one extra invoker per combination of
/// them; the variant ids get a `#n` suffix.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathInput;

impl PathInput {
    fn expand(invoker: Invoker) -> Result<Vec<Invoker>, (Invoker, ExcludeReason)> {
        let mut mandatory = Vec::new();
        let mut optional = Vec::new();
        let mut seen: Vec<&TypeProperty> = Vec::new();
        for input in &invoker.inputs {
            let Type::Property(property) = input.ty() else {
                continue;
            };
            if seen.contains(&property) {
                let reason = ExcludeReason::DuplicatePathInput {
                    property: property.qualified_name(),
                };
                return Err((invoker.clone(), reason));
            }
            seen.push(property);
            if input.has_default() {
                optional.push((input.clone(), property.clone()));
            } else {
                mandatory.push((input.clone(), property.clone()));
            }
        }

        let mut base = invoker.clone();
        for (input, _) in mandatory.iter().chain(&optional) {
            base.solved.insert(input.name().to_string());
        }
        let mut variants = Vec::new();
        for size in 1..=optional.len() {
            for combination in combinations(optional.len(), size) {
                let mut variant = base.clone();
                variant.id = format!("{}#{}", base.id, variants.len() + 1);
                let mut path = std::mem::take(&mut variant.path);
                for (input, property) in &mandatory {
                    push_property(&mut path, input, property);
                }
                for index in combination {
                    let (input, property) = &optional[index];
                    push_property(&mut path, input, property);
                }
                variant.path = path;
                variants.push(variant);
            }
        }
        for (input, property) in &mandatory {
            push_property(&mut base.path, input, property);
        }

        let mut all = Vec::with_capacity(variants.len() + 1);
        all.push(base);
        all.extend(variants);
        Ok(all)
    }
}

impl Handler for PathInput {
    fn name(&self) -> &'static str {
        "path_input"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&INVOKERS).requires(&EXCLUDED)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let invokers = std::mem::take(ctx.get_mut(&INVOKERS)?);
        let mut kept = Vec::with_capacity(invokers.len());
        let mut excluded = Vec::new();
        for invoker in invokers {
            match Self::expand(invoker) {
                Ok(expanded) => kept.extend(expanded),
                Err((invoker, reason)) => excluded.push(Exclusion::new(&invoker, reason)),
            }
        }
        *ctx.get_mut(&INVOKERS)? = kept;
        exclude(ctx, excluded)
    }
}

/// Adds the model name and the injected id to updates.
///
/// `PUT /User/42` with content `{"Name": "x"}` updates user 42: the id
/// segment lands in the id property of the model input.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathUpdate;

impl PathUpdate {
    fn model_input(invoker: &Invoker, target: &Arc<TypeModel>) -> Option<String> {
        invoker.inputs.iter().find_map(|input| match input.ty() {
            Type::Model(model) if model.name() == target.name() && !input.has_default() => {
                Some(input.name().to_string())
            }
            _ => None,
        })
    }
}

impl Handler for PathUpdate {
    fn name(&self) -> &'static str {
        "path_update"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&INVOKERS).requires(&EXCLUDED)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        retain(ctx, |invoker| {
            if invoker.http_method != Method::PUT {
                return Ok(());
            }
            let Some(target) = invoker.target.clone() else {
                return Ok(());
            };
            let Some(id) = target.property_id() else {
                return Ok(());
            };
            if mentions(&invoker.path, &target) {
                return Err(ExcludeReason::TargetIsInput {
                    model: target.name().to_string(),
                });
            }
            let Some(input) = Self::model_input(invoker, &target) else {
                return Ok(());
            };
            invoker.path.push(PathElement::name(target.name()));
            invoker.path.push(PathElement::Injected { input, property: id });
            Ok(())
        })
    }
}

/// Adjusts paths to the target model.
///
/// - `POST` and collection `GET`: a literal with the model name is appended
/// - `GET` of a single model and `PUT`: unless the path already mentions
///   the model, its name is appended to the last literal
#[derive(Debug, Clone, Copy, Default)]
pub struct PathTarget;

impl Handler for PathTarget {
    fn name(&self) -> &'static str {
        "path_target"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&INVOKERS)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        for invoker in ctx.get_mut(&INVOKERS)? {
            let Some(target) = invoker.target.clone() else {
                continue;
            };
            let method = invoker.http_method.clone();
            if method == Method::POST || (method == Method::GET && invoker.is_collection) {
                invoker.path.push(PathElement::name(target.name()));
            } else if (method == Method::GET || method == Method::PUT) && !mentions(&invoker.path, &target) {
                merge_into_last_name(&mut invoker.path, &target);
            }
        }
        Ok(())
    }
}

/// Prefixes paths with the domain of their first model.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathDomain;

impl PathDomain {
    fn first_model(invoker: &Invoker) -> Option<Arc<TypeModel>> {
        invoker
            .path
            .iter()
            .find_map(|element| element.property().map(|property| Arc::clone(property.model())))
            .or_else(|| invoker.target.clone())
    }
}

impl Handler for PathDomain {
    fn name(&self) -> &'static str {
        "path_domain"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&INVOKERS).requires(&EXCLUDED)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        retain(ctx, |invoker| {
            if invoker.path.is_empty() {
                return Ok(());
            }
            let Some(model) = Self::first_model(invoker) else {
                return Ok(());
            };
            let Some(domain) = model.domain() else {
                return Ok(());
            };
            let segments: Vec<&str> = domain.split('/').filter(|s| !s.is_empty()).collect();
            if segments.is_empty() || !segments.iter().all(|segment| is_word(segment)) {
                return Err(ExcludeReason::InvalidDomain {
                    model: model.name().to_string(),
                    domain: domain.to_string(),
                });
            }
            let prefix = segments.into_iter().map(PathElement::name);
            invoker.path.splice(0..0, prefix);
            Ok(())
        })
    }
}

/// Replaces the last literal with the web name of the call.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathWebName;

impl Handler for PathWebName {
    fn name(&self) -> &'static str {
        "path_web_name"
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .requires(&INVOKERS)
            .requires(&EXCLUDED)
            .defines_if(&SUGGESTIONS)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let mut unplaced = Vec::new();
        retain(ctx, |invoker| {
            let Some(web_name) = invoker.web_name.clone() else {
                return Ok(());
            };
            if !is_word(&web_name) {
                return Err(ExcludeReason::InvalidWebName { name: web_name });
            }
            let last = invoker.path.iter_mut().rev().find_map(|element| match element {
                PathElement::Name(name) => Some(name),
                PathElement::Property { .. } | PathElement::Injected { .. } => None,
            });
            match last {
                Some(name) => *name = web_name,
                None => unplaced.push(format!(
                    "Could not place web name '{web_name}' of {}, at {}",
                    invoker.id, invoker.location
                )),
            }
            Ok(())
        })?;
        for suggestion in unplaced {
            suggest(ctx, suggestion)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_core::{Call, Primitive, Value};

    fn user() -> Arc<TypeModel> {
        TypeModel::builder("User")
            .id("Id", Primitive::Int)
            .property("Name", Primitive::Str)
            .build()
    }

    #[test]
    fn test_combinations() {
        assert_eq!(combinations(3, 2), [vec![0, 1], vec![0, 2], vec![1, 2]]);
        assert_eq!(combinations(2, 0), [Vec::<usize>::new()]);
    }

    #[test]
    fn test_optional_inputs_expand() {
        let user = user();
        let call = Call::get("find", |_| Ok(Value::Null))
            .input("id", Type::Property(user.property_id().unwrap()))
            .input_with_default(
                "name",
                Type::Property(TypeProperty::new(&user, "Name").unwrap()),
                Value::Null,
            );
        let expanded = PathInput::expand(Invoker::from_call("S", &call)).unwrap();
        let templates: Vec<_> = expanded.iter().map(Invoker::path_template).collect();
        assert_eq!(templates, ["User/{User.Id}", "User/{User.Id}/User/{User.Name}"]);
        assert_eq!(expanded[1].id, "S.find#1");
        assert!(expanded.iter().all(|invoker| invoker.solved.contains("name")));
    }

    #[test]
    fn test_duplicate_property_input() {
        let user = user();
        let id = Type::Property(user.property_id().unwrap());
        let call = Call::get("pair", |_| Ok(Value::Null))
            .input("a", id.clone())
            .input("b", id);
        let (_, reason) = PathInput::expand(Invoker::from_call("S", &call)).unwrap_err();
        assert!(matches!(reason, ExcludeReason::DuplicatePathInput { .. }));
    }

    #[test]
    fn test_merge_into_last_name() {
        let user = user();
        let mut path = vec![
            PathElement::name("Article"),
            PathElement::Property {
                input: "id".into(),
                property: user.property_id().unwrap(),
            },
        ];
        merge_into_last_name(&mut path, &user);
        assert_eq!(path[0], PathElement::name("ArticleUser"));

        let mut empty = Vec::new();
        merge_into_last_name(&mut empty, &user);
        assert_eq!(empty, [PathElement::name("User")]);
    }
}
