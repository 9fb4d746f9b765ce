//! Calling the service, inside an optional session.

use std::fmt;
use std::sync::Arc;

use daedalus_core::code::INPUT_ERROR;
use daedalus_core::ServiceError;
use daedalus_processor::{Chain, Contexts, Contract, Handler, Outcome, ProcessorError};

use crate::context::{active_invoker, fail, ARGUMENTS, INVOKER, OUTPUT, RESPONSE};
use crate::session::SessionProvider;
use crate::settings::ServerSettings;
use crate::stages::explain::internal_error;

/// Opens a session for the call and closes it once the request ends.
///
/// The session commits when processing completed with a successful
/// response and rolls back otherwise. A failed commit turns the response
/// into a 500.
pub struct Transaction {
    sessions: Arc<dyn SessionProvider>,
    settings: Arc<ServerSettings>,
}

impl Transaction {
    /// Creates the stage.
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionProvider>, settings: Arc<ServerSettings>) -> Self {
        Self { sessions, settings }
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction").finish_non_exhaustive()
    }
}

impl Handler for Transaction {
    fn name(&self) -> &'static str {
        "transaction"
    }

    fn contract(&self) -> Contract {
        Contract::new().requires(&RESPONSE).optional(&INVOKER)
    }

    fn process(&self, chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        if active_invoker(ctx).is_none() {
            return Ok(());
        }
        let session = self.sessions.begin().map_err(ProcessorError::failed)?;
        let settings = Arc::clone(&self.settings);
        chain.on_finalize(move |ctx, outcome| {
            let succeeded =
                outcome == Outcome::Completed && ctx.find(&RESPONSE).is_some_and(|r| r.is_success);
            if !succeeded {
                tracing::debug!(?outcome, "Rolling back session");
                session.rollback();
                return;
            }
            if let Err(error) = session.commit() {
                tracing::error!(%error, "Session commit failed");
                if let Some(response) = ctx.find_mut(&RESPONSE) {
                    *response = internal_error(response, &error, &settings);
                }
            }
        });
        Ok(())
    }
}

/// Invokes the call with the decoded arguments.
///
/// Input errors answer 400 with the per-field messages. A developer error
/// answers 400 as well and retries the stage, which then finds the failed
/// response and steps aside. Any other failure is internal.
#[derive(Debug, Clone, Copy, Default)]
pub struct Invoking;

impl Handler for Invoking {
    fn name(&self) -> &'static str {
        "invoking"
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .requires(&RESPONSE)
            .optional(&INVOKER)
            .optional(&ARGUMENTS)
            .defines_if(&OUTPUT)
    }

    fn process(&self, chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        let Some(invoker) = active_invoker(ctx) else {
            return Ok(());
        };
        let mut arguments = ctx.take(&ARGUMENTS).unwrap_or_default();
        invoker.prepare_arguments(&mut arguments);
        tracing::debug!(invoker = %invoker.id, arguments = arguments.len(), "Invoking");
        let result = (invoker.invoke)(&arguments);
        ctx.set(&ARGUMENTS, arguments);

        match result {
            Ok(output) => {
                ctx.set(&OUTPUT, output);
                Ok(())
            }
            Err(ServiceError::Input(error)) => {
                let report = fail(ctx, INPUT_ERROR, "Invalid input")?;
                report.add_input(&error);
                for definition in &invoker.definitions {
                    report.add_definition(definition.to_string());
                }
                Ok(())
            }
            Err(ServiceError::Devel(message)) => {
                tracing::warn!(invoker = %invoker.id, location = %invoker.location, %message, "Developer error");
                fail(ctx, INPUT_ERROR, message)?;
                chain.retry();
                Ok(())
            }
            Err(error) => Err(anyhow::Error::new(error).into()),
        }
    }
}
