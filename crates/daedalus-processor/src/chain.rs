//! Running a processing.
//!
//! A [`Chain`] walks the steps of a [`Processing`] over one [`Contexts`]
//! bag. Handlers receive the chain and may steer it: cancel the rest,
//! route to another processing, retry themselves, run one of their
//! branches, or register hooks that run once the chain ends.

use std::fmt;
use std::sync::Arc;

use crate::assembly::{CompiledBranch, Processing};
use crate::context::Contexts;
use crate::error::ProcessorError;
use crate::handler::BranchMode;

/// Upper bound of consecutive retries of one handler.
pub const MAX_RETRIES: usize = 8;

/// How a chain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every step ran.
    Completed,
    /// A handler cancelled the remaining steps.
    Cancelled,
    /// A handler failed and an error hook handled the failure.
    Failed,
}

type ErrorHook = Box<dyn FnOnce(&mut Contexts, &ProcessorError) -> bool + Send>;
type FinalizeHook = Box<dyn FnOnce(&mut Contexts, Outcome) + Send>;
type CallBack = Box<dyn FnOnce(&mut Contexts) + Send>;

/// Execution state of one processing run.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use daedalus_processor::{Assembly, Chain, Contract, FnHandler, Key, Outcome};
///
/// const HITS: Key<u32> = Key::new("demo", "hits");
///
/// let processing = Assembly::new("demo")
///     .add(FnHandler::new("count", Contract::new().defines(&HITS), |_, ctx| {
///         ctx.set(&HITS, 1);
///         Ok(())
///     }))
///     .add(FnHandler::new("stop", Contract::new(), |chain, _| {
///         chain.cancel();
///         Ok(())
///     }))
///     .create(&[])
///     .unwrap();
///
/// let processing = Arc::new(processing);
/// let mut ctx = processing.contexts();
/// let outcome = Chain::new(&processing).process(&mut ctx).unwrap();
/// assert_eq!(outcome, Outcome::Cancelled);
/// assert_eq!(ctx.find(&HITS), Some(&1));
/// ```
pub struct Chain {
    processing: Arc<Processing>,
    position: usize,
    cancelled: bool,
    routed: Option<Arc<Processing>>,
    retry: bool,
    retries: usize,
    on_error: Vec<ErrorHook>,
    on_finalize: Vec<FinalizeHook>,
    call_backs: Vec<CallBack>,
}

impl Chain {
    /// Creates a chain positioned before the first step.
    #[must_use]
    pub fn new(processing: &Arc<Processing>) -> Self {
        Self {
            processing: Arc::clone(processing),
            position: 0,
            cancelled: false,
            routed: None,
            retry: false,
            retries: 0,
            on_error: Vec::new(),
            on_finalize: Vec::new(),
            call_backs: Vec::new(),
        }
    }

    /// Runs the chain to its end and then the registered hooks.
    ///
    /// On success the call-backs run, most recent first. On failure the
    /// error hooks run, most recent first; if any of them reports the
    /// error as handled the run ends with [`Outcome::Failed`] instead of
    /// the error. Finalize hooks always run last, most recent first.
    pub fn process(mut self, ctx: &mut Contexts) -> Result<Outcome, ProcessorError> {
        let result = self.run(ctx);

        let result = match result {
            Ok(outcome) => {
                while let Some(call_back) = self.call_backs.pop() {
                    call_back(ctx);
                }
                Ok(outcome)
            }
            Err(error) => {
                tracing::debug!(
                    processing = %self.processing.name(),
                    error = %error,
                    "Processing failed"
                );
                let mut handled = false;
                while let Some(hook) = self.on_error.pop() {
                    handled |= hook(ctx, &error);
                }
                if handled {
                    Ok(Outcome::Failed)
                } else {
                    Err(error)
                }
            }
        };

        let outcome = match &result {
            Ok(outcome) => *outcome,
            Err(_) => Outcome::Failed,
        };
        while let Some(hook) = self.on_finalize.pop() {
            hook(ctx, outcome);
        }
        result
    }

    fn run(&mut self, ctx: &mut Contexts) -> Result<Outcome, ProcessorError> {
        loop {
            if self.cancelled {
                return Ok(Outcome::Cancelled);
            }
            let processing = Arc::clone(&self.processing);
            let Some(step) = processing.steps.get(self.position) else {
                return Ok(Outcome::Completed);
            };
            let handler = Arc::clone(&step.handler);

            tracing::trace!(
                processing = %processing.name(),
                handler = handler.name(),
                position = self.position,
                "Running handler"
            );
            handler
                .process(self, ctx)
                .map_err(|error| error.in_handler(handler.name(), &step.location))?;

            if let Some(target) = self.routed.take() {
                tracing::debug!(
                    from = %processing.name(),
                    to = %target.name(),
                    "Routing chain"
                );
                self.processing = target;
                self.position = 0;
                self.retries = 0;
                self.retry = false;
            } else if std::mem::take(&mut self.retry) {
                self.retries += 1;
                if self.retries > MAX_RETRIES {
                    return Err(ProcessorError::RetryExhausted {
                        handler: handler.name(),
                        limit: MAX_RETRIES,
                    });
                }
            } else {
                self.position += 1;
                self.retries = 0;
            }
        }
    }

    /// Skips every remaining step.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Whether [`Chain::cancel`] was called.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Replaces the remaining steps with another processing.
    pub fn route(&mut self, processing: Arc<Processing>) {
        self.routed = Some(processing);
    }

    /// Routes to a routing branch of the current handler.
    pub fn route_branch(&mut self, name: &str) -> Result<(), ProcessorError> {
        let processing = self.branch_processing(name)?;
        self.route(processing);
        Ok(())
    }

    /// Runs the current handler again once it returns.
    pub fn retry(&mut self) {
        self.retry = true;
    }

    /// Registers a hook run when the chain fails.
    ///
    /// The hook returns `true` when it handled the error.
    pub fn on_error<F>(&mut self, hook: F)
    where
        F: FnOnce(&mut Contexts, &ProcessorError) -> bool + Send + 'static,
    {
        self.on_error.push(Box::new(hook));
    }

    /// Registers a hook run once the chain ended, whatever the outcome.
    pub fn on_finalize<F>(&mut self, hook: F)
    where
        F: FnOnce(&mut Contexts, Outcome) + Send + 'static,
    {
        self.on_finalize.push(Box::new(hook));
    }

    /// Registers a hook run when the chain completed without error.
    pub fn call_back<F>(&mut self, hook: F)
    where
        F: FnOnce(&mut Contexts) + Send + 'static,
    {
        self.call_backs.push(Box::new(hook));
    }

    /// Runs a processing to completion over the same bag.
    pub fn branch(processing: &Arc<Processing>, ctx: &mut Contexts) -> Result<Outcome, ProcessorError> {
        Self::new(processing).process(ctx)
    }

    /// Runs one of the current handler's branches.
    ///
    /// A `using` branch runs over a bag holding only its contexts, which
    /// are merged back afterwards. Routing branches cannot be run, only
    /// routed to.
    pub fn run_branch(&mut self, name: &str, ctx: &mut Contexts) -> Result<Outcome, ProcessorError> {
        let branch = self.current_branch(name)?;
        match &branch.mode {
            BranchMode::Included => Self::branch(&branch.processing, ctx),
            BranchMode::Using(contexts) => {
                let mut sub = ctx.split_off(contexts);
                let result = Self::branch(&branch.processing, &mut sub);
                ctx.merge(sub);
                result
            }
            BranchMode::Routing => Err(ProcessorError::failed(format!(
                "Branch '{name}' is a routing branch and cannot be run in place"
            ))),
        }
    }

    /// The compiled processing of a branch of the current handler.
    pub fn branch_processing(&self, name: &str) -> Result<Arc<Processing>, ProcessorError> {
        Ok(Arc::clone(&self.current_branch(name)?.processing))
    }

    fn current_branch(&self, name: &str) -> Result<CompiledBranch, ProcessorError> {
        self.processing
            .steps
            .get(self.position)
            .and_then(|step| step.branches.iter().find(|branch| branch.name == name))
            .cloned()
            .ok_or_else(|| ProcessorError::UnknownBranch {
                name: name.to_string(),
            })
    }

    /// Where the current handler was added to its assembly.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.processing
            .steps
            .get(self.position)
            .map(|step| step.location.as_str())
    }

    /// Index of the current step.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// The processing being run.
    #[must_use]
    pub fn processing(&self) -> &Arc<Processing> {
        &self.processing
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("processing", &self.processing.name())
            .field("position", &self.position)
            .field("cancelled", &self.cancelled)
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}
