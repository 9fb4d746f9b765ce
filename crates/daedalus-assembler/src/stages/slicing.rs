//! Slicing defaults and limits.

use std::sync::Arc;

use daedalus_core::{Arguments, Type, Value, OPTION_LIMIT, OPTION_WITH_TOTAL};
use daedalus_processor::{Chain, Contexts, Contract, Handler, ProcessorError};
use daedalus_router::Prepare;

use crate::register::{SliceSettings, INVOKERS, SETTINGS};

/// Applies the configured slicing to option inputs.
///
/// For every option input with a `limit`:
///
/// - no limit sent: the default limit, or the maximum when there is none
/// - a limit above the maximum: the maximum
///
/// For every option input with `withTotal`, the default is set only when
/// the client sent nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionSlice;

impl OptionSlice {
    fn limit(input: String, settings: SliceSettings) -> Prepare {
        Arc::new(move |arguments: &mut Arguments| {
            let path = [input.as_str(), OPTION_LIMIT];
            let sent = arguments.lookup(&path).and_then(Value::as_i64);
            let limit = match (sent, settings.maximum_limit) {
                (Some(limit), Some(maximum)) if limit > maximum => Some(maximum),
                (Some(_), _) => None,
                (None, maximum) => settings.default_limit.or(maximum),
            };
            if let Some(limit) = limit {
                if let Some(slot) = arguments.slot(&path) {
                    *slot = Value::Int(limit);
                }
            }
        })
    }

    fn with_total(input: String, default: bool) -> Prepare {
        Arc::new(move |arguments: &mut Arguments| {
            let path = [input.as_str(), OPTION_WITH_TOTAL];
            let unset = arguments.lookup(&path).map_or(true, Value::is_null);
            if unset {
                if let Some(slot) = arguments.slot(&path) {
                    *slot = Value::Bool(default);
                }
            }
        })
    }
}

impl Handler for OptionSlice {
    fn name(&self) -> &'static str {
        "option_slice"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&INVOKERS).requires(&SETTINGS)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let settings = ctx.get(&SETTINGS)?.slicing;
        for invoker in ctx.get_mut(&INVOKERS)? {
            let mut prepare = Vec::new();
            for input in &invoker.inputs {
                let Type::Option(option) = input.ty() else {
                    continue;
                };
                let limited = settings.maximum_limit.is_some() || settings.default_limit.is_some();
                if option.has(OPTION_LIMIT) && limited {
                    prepare.push(Self::limit(input.name().to_string(), settings));
                }
                if let (true, Some(default)) = (option.has(OPTION_WITH_TOTAL), settings.default_with_total) {
                    prepare.push(Self::with_total(input.name().to_string(), default));
                }
            }
            invoker.prepare.extend(prepare);
        }
        Ok(())
    }
}
