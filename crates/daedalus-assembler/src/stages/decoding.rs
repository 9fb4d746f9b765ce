//! Decoding stage.

use daedalus_codec::{decoder, decoder_assembly, CodecAssemblyError, Created};
use daedalus_processor::{Branch, Chain, Contexts, Contract, Handler, ProcessorError};
use daedalus_router::Invoker;

use crate::error::ExcludeReason;
use crate::register::{exclude, Exclusion, EXCLUDED, INVOKERS, SETTINGS};

/// Creates the parameter and content decodings of every input the path
/// does not already bind.
///
/// Each input runs through the decoder branch; an input no decoder knows
/// stays unsolved and is dealt with by the next stages.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoding;

impl Decoding {
    fn absorb(invoker: &mut Invoker, input: &str, created: Created) -> Result<(), ExcludeReason> {
        let failure = |source| ExcludeReason::Decoding {
            input: input.to_string(),
            source,
        };
        for decoding in created.decodings {
            invoker.decodings.insert(decoding).map_err(|duplicate| {
                failure(CodecAssemblyError::DuplicatePath {
                    path: duplicate.name().to_string(),
                })
            })?;
        }
        if let Some(content) = created.content {
            if let Some(existing) = &invoker.content {
                return Err(failure(CodecAssemblyError::AmbiguousContent {
                    first: existing.input().to_string(),
                    second: content.input().to_string(),
                }));
            }
            invoker.content = Some(content);
        }
        if created.solved {
            invoker.solved.insert(input.to_string());
        }
        Ok(())
    }
}

impl Handler for Decoding {
    fn name(&self) -> &'static str {
        "decoding"
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .requires(&INVOKERS)
            .requires(&EXCLUDED)
            .requires(&SETTINGS)
            .defines(&decoder::INPUT)
            .defines(&decoder::SETTINGS)
    }

    fn branches(&self) -> Vec<Branch> {
        vec![Branch::using("create", decoder_assembly(), &[decoder::CREATE])]
    }

    fn process(&self, chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let settings = ctx.get(&SETTINGS)?.decoding.clone();
        let invokers = std::mem::take(ctx.get_mut(&INVOKERS)?);
        let mut kept = Vec::with_capacity(invokers.len());
        let mut excluded = Vec::new();

        'invokers: for mut invoker in invokers {
            let pending: Vec<_> = invoker
                .inputs
                .iter()
                .filter(|input| !invoker.solved.contains(input.name()))
                .cloned()
                .collect();
            for input in pending {
                ctx.set(&decoder::INPUT, input.clone());
                ctx.set(&decoder::SETTINGS, settings.clone());
                chain.run_branch("create", ctx)?;
                let created = Created::take(ctx);
                if let Err(reason) = Self::absorb(&mut invoker, input.name(), created) {
                    excluded.push(Exclusion::new(&invoker, reason));
                    continue 'invokers;
                }
            }
            tracing::trace!(
                invoker = %invoker.id,
                decodings = invoker.decodings.len(),
                content = invoker.content.is_some(),
                "Created decodings"
            );
            kept.push(invoker);
        }

        ctx.take(&decoder::INPUT);
        ctx.take(&decoder::SETTINGS);
        *ctx.get_mut(&INVOKERS)? = kept;
        exclude(ctx, excluded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use daedalus_codec::{ContentDecoding, DecodeSettings, Decoders};
    use daedalus_core::{Call, Input, Primitive, Type, TypeModel, Value};

    fn created(input: Input) -> Created {
        Decoders::new(DecodeSettings::default()).unwrap().create(&input).unwrap()
    }

    #[test]
    fn test_absorb_marks_solved() {
        let mut invoker = Invoker::from_call(
            "S",
            &Call::get("find", |_| Ok(Value::Null)).input("name", Type::Primitive(Primitive::Str)),
        );
        let input = Input::new("name", Type::Primitive(Primitive::Str));
        Decoding::absorb(&mut invoker, "name", created(input)).unwrap();
        assert!(invoker.solved.contains("name"));
        assert!(invoker.decodings.get("name").is_some());
    }

    #[test]
    fn test_duplicate_parameter() {
        let mut invoker = Invoker::from_call("S", &Call::get("find", |_| Ok(Value::Null)));
        let input = Input::new("name", Type::Primitive(Primitive::Str));
        Decoding::absorb(&mut invoker, "name", created(input.clone())).unwrap();
        let err = Decoding::absorb(&mut invoker, "name", created(input)).unwrap_err();
        assert!(matches!(
            err,
            ExcludeReason::Decoding {
                source: CodecAssemblyError::DuplicatePath { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_second_content_is_ambiguous() {
        let user = TypeModel::builder("User").id("Id", Primitive::Int).build();
        let mut invoker = Invoker::from_call("S", &Call::insert("add", |_| Ok(Value::Null)));
        invoker.content = Some(ContentDecoding::new("first", Arc::clone(&user)));
        let err = Decoding::absorb(
            &mut invoker,
            "second",
            created(Input::new("second", Type::Model(user))),
        )
        .unwrap_err();
        assert!(err.to_string().contains("both decode the request content"));
    }
}
