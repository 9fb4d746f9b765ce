//! Unsolved input check.

use daedalus_processor::{Chain, Contexts, Contract, Handler, ProcessorError};

use crate::error::ExcludeReason;
use crate::register::{retain, suggest, EXCLUDED, INVOKERS, SUGGESTIONS};

/// Excludes invokers with inputs that nothing binds.
///
/// An unbound input with a default only gets a suggestion: the call works
/// but the client can never set the value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateSolved;

impl Handler for ValidateSolved {
    fn name(&self) -> &'static str {
        "validate_solved"
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .requires(&INVOKERS)
            .requires(&EXCLUDED)
            .defines_if(&SUGGESTIONS)
    }

    fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let mut hints = Vec::new();
        retain(ctx, |invoker| {
            let mut unsolved = Vec::new();
            for input in &invoker.inputs {
                if invoker.solved.contains(input.name()) {
                    continue;
                }
                if input.has_default() {
                    hints.push(format!(
                        "Input '{}' of {} is never bound and always takes its default, at {}",
                        input.name(),
                        invoker.id,
                        invoker.location
                    ));
                } else {
                    unsolved.push(input.name().to_string());
                }
            }
            if unsolved.is_empty() {
                Ok(())
            } else {
                Err(ExcludeReason::Unsolved { inputs: unsolved })
            }
        })?;
        for hint in hints {
            suggest(ctx, hint)?;
        }
        Ok(())
    }
}
