//! Output encoding and definitions.

use std::collections::HashSet;

use daedalus_codec::{create_encoder, Category, Definition};
use daedalus_processor::{Chain, Contexts, Contract, Handler, ProcessorError};
use daedalus_router::{Invoker, PathElement};

use crate::error::ExcludeReason;
use crate::register::{retain, EXCLUDED, INVOKERS};

/// Compiles the output encoder of every invoker.
#[derive(Debug, Clone, Copy, Default)]
pub struct Encoding;

impl Handler for Encoding {
    fn name(&self) -> &'static str {
        "encoding"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&INVOKERS).requires(&EXCLUDED)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        retain(ctx, |invoker| {
            invoker.encoder = create_encoder(&invoker.output, None).map_err(ExcludeReason::Encoding)?;
            Ok(())
        })
    }
}

/// Collects what each invoker accepts: path values, parameters, then
/// content properties.
///
/// The first definition of a name in a category wins. Content definitions
/// skip the property injected from the path.
#[derive(Debug, Clone, Copy, Default)]
pub struct Definitions;

impl Definitions {
    pub(crate) fn collect(invoker: &Invoker) -> Vec<Definition> {
        let mut candidates = Vec::new();
        let mut injected = None;
        for element in &invoker.path {
            match element {
                PathElement::Name(_) => {}
                PathElement::Property { input, property } => candidates.push(Definition::new(
                    property.qualified_name(),
                    Category::Path,
                    property.primitive().name(),
                    input.clone(),
                )),
                PathElement::Injected { input, property } => {
                    injected = Some(property.name().to_string());
                    candidates.push(Definition::new(
                        property.qualified_name(),
                        Category::Path,
                        property.primitive().name(),
                        input.clone(),
                    ));
                }
            }
        }
        candidates.extend(invoker.decodings.iter().map(|decoding| decoding.definition().clone()));
        if let Some(content) = &invoker.content {
            candidates.extend(
                content
                    .definitions()
                    .iter()
                    .filter(|definition| injected.as_deref() != Some(definition.name.as_str()))
                    .cloned(),
            );
        }

        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|definition| seen.insert((definition.category, definition.name.clone())))
            .map(|mut definition| {
                definition.invoker = Some(invoker.id.clone());
                definition
            })
            .collect()
    }
}

impl Handler for Definitions {
    fn name(&self) -> &'static str {
        "definitions"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&INVOKERS)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        for invoker in ctx.get_mut(&INVOKERS)? {
            invoker.definitions = Self::collect(invoker);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use daedalus_codec::ContentDecoding;
    use daedalus_core::{Call, Primitive, Type, TypeModel, Value};

    #[test]
    fn test_update_definitions_skip_injected_id() {
        let user = TypeModel::builder("User")
            .id("Id", Primitive::Int)
            .property("Name", Primitive::Str)
            .build();
        let call = Call::update("change", |_| Ok(Value::Null)).input("user", Type::Model(Arc::clone(&user)));
        let mut invoker = Invoker::from_call("S", &call);
        invoker.path = vec![
            PathElement::name("User"),
            PathElement::Injected {
                input: "user".into(),
                property: user.property_id().unwrap(),
            },
        ];
        invoker.content = Some(ContentDecoding::new("user", Arc::clone(&user)));

        let definitions = Definitions::collect(&invoker);
        let names: Vec<_> = definitions
            .iter()
            .map(|d| (d.category.name(), d.name.as_str()))
            .collect();
        assert_eq!(names, [("path", "User.Id"), ("content", "Name")]);
        assert!(definitions.iter().all(|d| d.invoker.as_deref() == Some("S.change")));
    }

    #[test]
    fn test_encoder_for_output() {
        let user = TypeModel::builder("User").id("Id", Primitive::Int).build();
        let invoker = Invoker::from_call(
            "S",
            &Call::get("all", |_| Ok(Value::Null)).output(Type::iter(Type::Model(user))),
        );
        let encoder = create_encoder(&invoker.output, None).unwrap().unwrap();
        assert_eq!(encoder.name(), "UserList");
    }
}
