//! Argument decoding: path values, query parameters and content.

use daedalus_codec::Category;
use daedalus_core::code::{CONTENT_BAD, CONTENT_MISSING, PARAMETER_ILLEGAL};
use daedalus_core::{Arguments, ErrorReport};
use daedalus_processor::{Chain, Contexts, Contract, Handler, ProcessorError};
use daedalus_router::Invoker;
use http::header::CONTENT_TYPE;

use crate::context::{active_invoker, fail, ARGUMENTS, INVOKER, LOCALE, PATH, REQUEST};

/// Adds the definitions of one category to a report.
fn define(report: &mut ErrorReport, invoker: &Invoker, category: Category) {
    for definition in invoker.definitions.iter().filter(|d| d.category == category) {
        report.add_definition(definition.to_string());
    }
}

/// Places the values of the typed path segments.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathArguments;

impl Handler for PathArguments {
    fn name(&self) -> &'static str {
        "path_arguments"
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .optional(&INVOKER)
            .optional(&PATH)
            .optional(&LOCALE)
            .defines_if(&ARGUMENTS)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let Some(invoker) = active_invoker(ctx) else {
            return Ok(());
        };
        let mut arguments = Arguments::new();
        arguments.set_locale(ctx.find(&LOCALE).cloned().unwrap_or_default());
        if let Some(path) = ctx.find(&PATH) {
            for (element, value) in invoker.typed_elements().zip(path.values.iter()) {
                if let Some(slot) = arguments.slot(&element.target()) {
                    *slot = value.clone();
                }
            }
        }
        ctx.set(&ARGUMENTS, arguments);
        Ok(())
    }
}

/// Decodes the query parameters.
///
/// Every failure is collected; any failure answers 400 with the
/// parameters the invoker accepts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Parameters;

impl Handler for Parameters {
    fn name(&self) -> &'static str {
        "parameters"
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .requires(&REQUEST)
            .optional(&INVOKER)
            .optional(&ARGUMENTS)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let Some(invoker) = active_invoker(ctx) else {
            return Ok(());
        };
        let mut arguments = ctx.take(&ARGUMENTS).unwrap_or_default();
        let parameters = &ctx.get(&REQUEST)?.parameters;
        let mut failures: Vec<(String, String)> = invoker
            .decodings
            .decode_all(&mut arguments, parameters)
            .into_iter()
            .map(|error| (error.field().unwrap_or("parameters").to_string(), error.to_string()))
            .collect();
        for decoding in invoker.decodings.iter().filter(|d| d.is_mandatory()) {
            if !parameters.iter().any(|(name, _)| name == decoding.name()) {
                failures.push((decoding.name().to_string(), "Missing mandatory parameter".to_string()));
            }
        }
        ctx.set(&ARGUMENTS, arguments);

        if !failures.is_empty() {
            let report = fail(ctx, PARAMETER_ILLEGAL, "Illegal parameters")?;
            for (field, message) in failures {
                report.add_field(field, message);
            }
            define(report, &invoker, Category::Parameter);
        }
        Ok(())
    }
}

/// Decodes the request content into the content input.
#[derive(Debug, Clone, Copy, Default)]
pub struct Content;

impl Handler for Content {
    fn name(&self) -> &'static str {
        "content"
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .requires(&REQUEST)
            .optional(&INVOKER)
            .optional(&ARGUMENTS)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let Some(invoker) = active_invoker(ctx) else {
            return Ok(());
        };
        let Some(content) = &invoker.content else {
            return Ok(());
        };
        let request = ctx.get(&REQUEST)?;
        let body = request.content.clone().filter(|body| !body.is_empty());
        let content_type = request.header(CONTENT_TYPE.as_str()).map(String::from);

        let Some(body) = body else {
            if invoker.input(content.input()).is_some_and(|input| input.has_default()) {
                return Ok(());
            }
            let report = fail(ctx, CONTENT_MISSING, format!("Expected content for '{}'", content.input()))?;
            define(report, &invoker, Category::Content);
            return Ok(());
        };

        let mut arguments = ctx.take(&ARGUMENTS).unwrap_or_default();
        let decoded = content.decode(&mut arguments, &body, content_type.as_deref());
        ctx.set(&ARGUMENTS, arguments);
        if let Err(error) = decoded {
            let field = error.field().map(String::from);
            let report = fail(ctx, CONTENT_BAD, "Invalid content")?;
            match field {
                Some(field) => report.add_field(field, error.to_string()),
                None => report.add_message(error.to_string()),
            }
            define(report, &invoker, Category::Content);
        }
        Ok(())
    }
}
