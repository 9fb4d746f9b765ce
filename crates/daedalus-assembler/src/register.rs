//! The register context shared by the assembler stages.
//!
//! Stages work on the whole set of invokers at once. An invoker a stage
//! cannot handle is moved out of the set into the exclusions, logged with
//! the location of its call declaration.

use std::fmt;

use daedalus_codec::DecodeSettings;
use daedalus_core::Service;
use daedalus_processor::{Contexts, Key, ProcessorError};
use daedalus_router::{Invoker, ResourceTree, TreeBuilder};

use crate::error::ExcludeReason;

/// Name of the register context.
pub const REGISTER: &str = "register";

/// The services to publish.
pub const SERVICES: Key<Vec<Service>> = Key::new(REGISTER, "services");
/// Assembler settings.
pub const SETTINGS: Key<AssemblerSettings> = Key::new(REGISTER, "settings");
/// Invokers still in assembly.
pub const INVOKERS: Key<Vec<Invoker>> = Key::new(REGISTER, "invokers");
/// Invokers left out, with the reason.
pub const EXCLUDED: Key<Vec<Exclusion>> = Key::new(REGISTER, "excluded");
/// Hints for call declarations that work but could be better.
pub const SUGGESTIONS: Key<Vec<String>> = Key::new(REGISTER, "suggestions");
/// The tree while invokers are placed.
pub const BUILDER: Key<TreeBuilder> = Key::new(REGISTER, "builder");
/// The frozen tree.
pub const TREE: Key<ResourceTree> = Key::new(REGISTER, "tree");

/// Limits applied to `Slice` options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SliceSettings {
    /// Upper bound of `limit`; larger values are clamped.
    pub maximum_limit: Option<i64>,
    /// `limit` used when the client sends none.
    pub default_limit: Option<i64>,
    /// `withTotal` used when the client sends none.
    pub default_with_total: Option<bool>,
}

/// Settings of the assembler stages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblerSettings {
    /// Slicing limits.
    pub slicing: SliceSettings,
    /// Parameter separators.
    pub decoding: DecodeSettings,
}

/// An invoker left out of the tree.
#[derive(Debug)]
pub struct Exclusion {
    /// Invoker id, `Service.call`.
    pub invoker: String,
    /// Where the call was declared.
    pub location: String,
    /// Why it was left out.
    pub reason: ExcludeReason,
}

impl Exclusion {
    /// Creates the exclusion of an invoker.
    pub fn new(invoker: &Invoker, reason: impl Into<ExcludeReason>) -> Self {
        Self {
            invoker: invoker.id.clone(),
            location: invoker.location.clone(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}, at {}", self.invoker, self.reason, self.location)
    }
}

/// Logs and records exclusions.
pub(crate) fn exclude(ctx: &mut Contexts, exclusions: Vec<Exclusion>) -> Result<(), ProcessorError> {
    if exclusions.is_empty() {
        return Ok(());
    }
    let excluded = ctx.get_or_insert_with(&EXCLUDED, Vec::new)?;
    for exclusion in exclusions {
        tracing::error!(
            invoker = %exclusion.invoker,
            location = %exclusion.location,
            reason = %exclusion.reason,
            "Cannot use invoker"
        );
        excluded.push(exclusion);
    }
    Ok(())
}

/// Logs and records a suggestion.
pub(crate) fn suggest(ctx: &mut Contexts, suggestion: String) -> Result<(), ProcessorError> {
    tracing::warn!(suggestion = %suggestion, "Assembler suggestion");
    ctx.get_or_insert_with(&SUGGESTIONS, Vec::new)?.push(suggestion);
    Ok(())
}

/// Runs `check` on every invoker, excluding those it rejects.
pub(crate) fn retain<F>(ctx: &mut Contexts, mut check: F) -> Result<(), ProcessorError>
where
    F: FnMut(&mut Invoker) -> Result<(), ExcludeReason>,
{
    let invokers = std::mem::take(ctx.get_mut(&INVOKERS)?);
    let mut kept = Vec::with_capacity(invokers.len());
    let mut excluded = Vec::new();
    for mut invoker in invokers {
        match check(&mut invoker) {
            Ok(()) => kept.push(invoker),
            Err(reason) => excluded.push(Exclusion::new(&invoker, reason)),
        }
    }
    *ctx.get_mut(&INVOKERS)? = kept;
    exclude(ctx, excluded)
}
