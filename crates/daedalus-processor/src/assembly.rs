//! Assemblies and their compiled processings.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::context::Contexts;
use crate::error::AssemblyError;
use crate::handler::{BranchMode, Handler};
use crate::key::Attribute;
use crate::resolver::{Resolved, Resolver};

#[derive(Clone)]
enum Placement {
    Last,
    Before(String),
    After(String),
}

#[derive(Clone)]
struct Entry {
    handler: Arc<dyn Handler>,
    location: &'static Location<'static>,
    placement: Placement,
}

/// An ordered list of handlers.
///
/// Handlers are appended, or anchored before/after an already added
/// handler by name. [`Assembly::create`] linearizes the anchors in
/// insertion order, resolves the contracts and compiles the branches.
///
/// # Example
///
/// ```
/// use daedalus_processor::{Assembly, Contract, FnHandler};
///
/// let assembly = Assembly::new("demo")
///     .add(FnHandler::new("second", Contract::new(), |_, _| Ok(())))
///     .add_before(FnHandler::new("first", Contract::new(), |_, _| Ok(())), "second");
///
/// let processing = assembly.create(&[]).unwrap();
/// assert_eq!(processing.step_names(), ["first", "second"]);
/// ```
#[derive(Clone)]
pub struct Assembly {
    name: String,
    entries: Vec<Entry>,
}

impl Assembly {
    /// Creates an empty assembly.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Appends a handler.
    #[track_caller]
    pub fn add<H: Handler>(self, handler: H) -> Self {
        self.push(Arc::new(handler), Placement::Last, Location::caller())
    }

    /// Appends a shared handler.
    #[track_caller]
    pub fn add_shared(self, handler: Arc<dyn Handler>) -> Self {
        self.push(handler, Placement::Last, Location::caller())
    }

    /// Inserts a handler right before the handler named `anchor`.
    #[track_caller]
    pub fn add_before<H: Handler>(self, handler: H, anchor: &str) -> Self {
        self.push(
            Arc::new(handler),
            Placement::Before(anchor.to_string()),
            Location::caller(),
        )
    }

    /// Inserts a handler right after the handler named `anchor`.
    #[track_caller]
    pub fn add_after<H: Handler>(self, handler: H, anchor: &str) -> Self {
        self.push(
            Arc::new(handler),
            Placement::After(anchor.to_string()),
            Location::caller(),
        )
    }

    fn push(
        mut self,
        handler: Arc<dyn Handler>,
        placement: Placement,
        location: &'static Location<'static>,
    ) -> Self {
        self.entries.push(Entry {
            handler,
            location,
            placement,
        });
        self
    }

    /// Assembly name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the assembly has no handler.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn linearize(&self) -> Result<Vec<Entry>, AssemblyError> {
        let mut ordered: Vec<Entry> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let index = match &entry.placement {
                Placement::Last => ordered.len(),
                Placement::Before(anchor) => self.anchor(&ordered, entry, anchor)?,
                Placement::After(anchor) => self.anchor(&ordered, entry, anchor)? + 1,
            };
            ordered.insert(index, entry.clone());
        }
        Ok(ordered)
    }

    fn anchor(&self, ordered: &[Entry], entry: &Entry, anchor: &str) -> Result<usize, AssemblyError> {
        ordered
            .iter()
            .position(|placed| placed.handler.name() == anchor)
            .ok_or_else(|| AssemblyError::UnknownAnchor {
                assembly: self.name.clone(),
                handler: entry.handler.name(),
                location: entry.location.to_string(),
                anchor: anchor.to_string(),
            })
    }

    /// Compiles the assembly.
    ///
    /// `provided` lists the attributes the caller sets before running the
    /// processing; every `requires` must be covered by them or by an
    /// upstream `defines`.
    pub fn create(&self, provided: &[Attribute]) -> Result<Processing, AssemblyError> {
        let mut resolver = Resolver::new(provided);
        let mut steps = Vec::with_capacity(self.entries.len());
        for entry in self.linearize()? {
            let name = entry.handler.name();
            let location = entry.location.to_string();
            let contract = entry.handler.contract();
            resolver.check(name, &location, &contract)?;
            resolver.declare(name, &contract);

            let mut branches = Vec::new();
            for branch in entry.handler.branches() {
                let available = match branch.mode() {
                    BranchMode::Using(contexts) => resolver.available(Some(contexts)),
                    BranchMode::Included | BranchMode::Routing => resolver.available(None),
                };
                let processing =
                    branch
                        .assembly()
                        .create(&available)
                        .map_err(|source| AssemblyError::Branch {
                            branch: branch.name(),
                            handler: name,
                            location: location.clone(),
                            source: Box::new(source),
                        })?;
                if *branch.mode() == BranchMode::Included {
                    resolver.absorb(processing.resolved());
                }
                branches.push(CompiledBranch {
                    name: branch.name(),
                    mode: branch.mode().clone(),
                    processing: Arc::new(processing),
                });
            }

            steps.push(Step {
                handler: entry.handler,
                location,
                branches,
            });
        }

        let processing = Processing {
            name: self.name.clone(),
            steps,
            resolved: Arc::new(resolver.finish()),
        };
        tracing::debug!(
            assembly = %processing.name,
            steps = ?processing.step_names(),
            "Compiled assembly"
        );
        Ok(processing)
    }
}

impl fmt::Debug for Assembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.entries.iter().map(|e| e.handler.name()).collect();
        f.debug_struct("Assembly")
            .field("name", &self.name)
            .field("handlers", &names)
            .finish()
    }
}

/// A compiled sub-assembly.
#[derive(Clone)]
pub(crate) struct CompiledBranch {
    pub(crate) name: &'static str,
    pub(crate) mode: BranchMode,
    pub(crate) processing: Arc<Processing>,
}

/// One compiled stage.
#[derive(Clone)]
pub(crate) struct Step {
    pub(crate) handler: Arc<dyn Handler>,
    pub(crate) location: String,
    pub(crate) branches: Vec<CompiledBranch>,
}

/// A compiled assembly, ready to be run by a [`Chain`].
///
/// [`Chain`]: crate::Chain
pub struct Processing {
    name: String,
    pub(crate) steps: Vec<Step>,
    resolved: Arc<Resolved>,
}

impl Processing {
    /// Name of the source assembly.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the processing has no step.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Handler names in execution order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.handler.name()).collect()
    }

    /// The merged contracts.
    #[must_use]
    pub fn resolved(&self) -> &Resolved {
        &self.resolved
    }

    /// Creates an empty bag bound to this processing's resolution.
    #[must_use]
    pub fn contexts(&self) -> Contexts {
        Contexts::bound(Arc::clone(&self.resolved))
    }

    /// Human readable description of steps and contexts.
    #[must_use]
    pub fn report(&self) -> String {
        let mut out = format!("Processing '{}':\n", self.name);
        for (index, step) in self.steps.iter().enumerate() {
            out.push_str(&format!(
                "{:>3}. {} ({})\n",
                index + 1,
                step.handler.name(),
                step.location
            ));
            for branch in &step.branches {
                out.push_str(&format!(
                    "     branch '{}' {:?}: {:?}\n",
                    branch.name,
                    branch.mode,
                    branch.processing.step_names()
                ));
            }
        }
        out.push_str(&self.resolved.report());
        out
    }
}

impl fmt::Debug for Processing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processing")
            .field("name", &self.name)
            .field("steps", &self.step_names())
            .finish_non_exhaustive()
    }
}
