//! Status and body of a successful call.

use std::sync::Arc;

use daedalus_codec::PathEncoder;
use daedalus_core::code::{
    DELETE_SUCCESS, ENCODING_BAD, INSERT_SUCCESS, PATH_FOUND, PATH_NOT_FOUND, REDIRECT,
    UPDATE_SUCCESS,
};
use daedalus_core::{Converter, Type, Value};
use daedalus_processor::{Chain, Contexts, Contract, Handler, ProcessorError};
use daedalus_router::{Invoker, ResourceTree};
use http::header::LOCATION;
use http::Method;

use crate::context::{active_invoker, fail, INVOKER, OUTPUT, RENDERER, RESPONSE};
use crate::stages::explain::insert;

/// Sets the status from the call kind and renders the output.
///
/// | Call | Output | Answer |
/// |---|---|---|
/// | `DELETE` | `false` | 404 |
/// | `DELETE` | anything else | 204 |
/// | `GET` of one item | nothing | 404 |
/// | `GET` | reference | 302 with `Location` |
/// | `POST` | created id or model | 201 with `Location` |
/// | `PUT` | | 200 |
#[derive(Debug, Clone)]
pub struct Encoding {
    tree: Arc<ResourceTree>,
}

impl Encoding {
    /// Creates the stage.
    #[must_use]
    pub fn new(tree: Arc<ResourceTree>) -> Self {
        Self { tree }
    }

    /// Href of the model instance a call output designates.
    fn location(&self, invoker: &Invoker, output: &Value) -> Option<String> {
        let (model, id) = match &invoker.output {
            Type::Property(property) if property.is_id() => (property.model().name().to_string(), output),
            Type::Model(model) => (model.name().to_string(), output.get(model.id()?)?),
            _ => return None,
        };
        let id = Converter.as_string(id).ok()?;
        self.tree.model_path(&model, &id)
    }
}

impl Handler for Encoding {
    fn name(&self) -> &'static str {
        "encoding"
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .requires(&RESPONSE)
            .optional(&INVOKER)
            .optional(&OUTPUT)
            .optional(&RENDERER)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let Some(invoker) = active_invoker(ctx) else {
            return Ok(());
        };
        let output = ctx.take(&OUTPUT).unwrap_or_default();

        match invoker.http_method {
            Method::DELETE => {
                if output == Value::Bool(false) {
                    fail(ctx, PATH_NOT_FOUND, "Nothing to delete")?;
                } else {
                    ctx.get_mut(&RESPONSE)?.set_code(DELETE_SUCCESS);
                }
                return Ok(());
            }
            Method::POST => {
                let location = self.location(&invoker, &output);
                let response = ctx.get_mut(&RESPONSE)?;
                response.set_code(INSERT_SUCCESS);
                if let Some(location) = location {
                    insert(&mut response.headers, LOCATION, &location);
                }
            }
            Method::PUT => ctx.get_mut(&RESPONSE)?.set_code(UPDATE_SUCCESS),
            _ => {
                if output.is_null() && !invoker.is_collection {
                    fail(ctx, PATH_NOT_FOUND, "Resource not found")?;
                    return Ok(());
                }
                if matches!(invoker.output, Type::Reference) {
                    let response = ctx.get_mut(&RESPONSE)?;
                    response.set_code(REDIRECT);
                    if let Some(uri) = output.as_str() {
                        insert(&mut response.headers, LOCATION, &self.tree.encode_uri(uri));
                    }
                    return Ok(());
                }
                ctx.get_mut(&RESPONSE)?.set_code(PATH_FOUND);
            }
        }

        if output.is_null() {
            return Ok(());
        }
        let (Some(encoder), Some(renderer)) = (invoker.encoder.as_ref(), ctx.find(&RENDERER).cloned()) else {
            return Ok(());
        };
        match encoder.encode(&output, renderer.as_ref(), &*self.tree) {
            Ok(rendered) => {
                let response = ctx.get_mut(&RESPONSE)?;
                response.body = rendered.body.into();
                response.indexes = rendered.indexes;
            }
            Err(error) => {
                tracing::warn!(invoker = %invoker.id, %error, "Output cannot be encoded");
                fail(ctx, ENCODING_BAD, error.to_string())?;
            }
        }
        Ok(())
    }
}
