//! The handler trait.
//!
//! A handler is one stage of an assembly. It declares a [`Contract`] over
//! the contexts it touches and may declare sub-assemblies ([`Branch`]es)
//! that are compiled together with the parent.
//!
//! # Example
//!
//! ```
//! use daedalus_processor::{Chain, Contexts, Contract, Handler, Key, ProcessorError};
//!
//! const URI: Key<String> = Key::new("request", "uri");
//! const LENGTH: Key<usize> = Key::new("response", "length");
//!
//! struct Measure;
//!
//! impl Handler for Measure {
//!     fn name(&self) -> &'static str {
//!         "measure"
//!     }
//!
//!     fn contract(&self) -> Contract {
//!         Contract::new().requires(&URI).defines(&LENGTH)
//!     }
//!
//!     fn process(&self, _chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
//!         let length = ctx.get(&URI)?.len();
//!         ctx.set(&LENGTH, length);
//!         Ok(())
//!     }
//! }
//! ```

use crate::assembly::Assembly;
use crate::chain::Chain;
use crate::context::Contexts;
use crate::contract::Contract;
use crate::error::ProcessorError;

/// One stage of a processing.
pub trait Handler: Send + Sync + 'static {
    /// Returns the name of this stage, used for anchors and logging.
    fn name(&self) -> &'static str;

    /// Declares the attributes this stage touches.
    fn contract(&self) -> Contract;

    /// Declares sub-assemblies compiled together with this handler.
    fn branches(&self) -> Vec<Branch> {
        Vec::new()
    }

    /// Runs the stage.
    fn process(&self, chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError>;
}

/// How a sub-assembly relates to its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchMode {
    /// Runs over the parent bag; its definitions become visible to the
    /// handlers after the owner.
    Included,
    /// A processing the owner may route the rest of the chain to.
    Routing,
    /// Runs over a fresh bag holding only the named contexts.
    Using(Vec<&'static str>),
}

/// A named sub-assembly declared by a handler.
#[derive(Clone)]
pub struct Branch {
    name: &'static str,
    assembly: Assembly,
    mode: BranchMode,
}

impl Branch {
    /// A branch over the parent bag.
    #[must_use]
    pub fn included(name: &'static str, assembly: Assembly) -> Self {
        Self {
            name,
            assembly,
            mode: BranchMode::Included,
        }
    }

    /// A branch the chain can be routed to.
    #[must_use]
    pub fn routing(name: &'static str, assembly: Assembly) -> Self {
        Self {
            name,
            assembly,
            mode: BranchMode::Routing,
        }
    }

    /// A branch over a fresh bag seeded with the named contexts.
    #[must_use]
    pub fn using(name: &'static str, assembly: Assembly, contexts: &[&'static str]) -> Self {
        Self {
            name,
            assembly,
            mode: BranchMode::Using(contexts.to_vec()),
        }
    }

    /// Branch name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The sub-assembly.
    #[must_use]
    pub const fn assembly(&self) -> &Assembly {
        &self.assembly
    }

    /// The branch mode.
    #[must_use]
    pub const fn mode(&self) -> &BranchMode {
        &self.mode
    }
}

/// A handler built from a closure.
///
/// # Example
///
/// ```
/// use daedalus_processor::{Contract, FnHandler};
///
/// let noop = FnHandler::new("noop", Contract::new(), |_chain, _ctx| Ok(()));
/// ```
pub struct FnHandler<F> {
    name: &'static str,
    contract: Contract,
    func: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&mut Chain, &mut Contexts) -> Result<(), ProcessorError> + Send + Sync + 'static,
{
    /// Creates a closure-based handler.
    pub fn new(name: &'static str, contract: Contract, func: F) -> Self {
        Self {
            name,
            contract,
            func,
        }
    }
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(&mut Chain, &mut Contexts) -> Result<(), ProcessorError> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn contract(&self) -> Contract {
        self.contract.clone()
    }

    fn process(&self, chain: &mut Chain, ctx: &mut Contexts) -> Result<(), ProcessorError> {
        (self.func)(chain, ctx)
    }
}
