//! Contract resolution.
//!
//! While an assembly compiles, the resolver walks its handlers in order and
//! merges their contracts into one resolved class per context. Required
//! attributes must be available at the point they are required: provided
//! by the caller, or defined by an earlier handler.

use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::contract::{AttributeKind, Contract};
use crate::error::AssemblyError;
use crate::key::Attribute;

/// Resolved usage of one attribute.
#[derive(Debug, Clone)]
pub struct ResolvedAttribute {
    /// The attribute.
    pub attribute: Attribute,
    /// Provided by the caller or defined by some handler.
    pub available: bool,
    /// Defined conditionally by some handler.
    pub conditional: bool,
    /// Handlers defining the attribute.
    pub defined_by: Vec<&'static str>,
    /// Handlers requiring the attribute.
    pub required_by: Vec<&'static str>,
    /// Handlers reading the attribute when present.
    pub optional_for: Vec<&'static str>,
}

/// The merged contracts of a compiled processing, per context.
#[derive(Debug, Clone, Default)]
pub struct Resolved {
    contexts: IndexMap<&'static str, IndexMap<&'static str, ResolvedAttribute>>,
}

impl Resolved {
    /// Whether the attribute takes part in the processing.
    #[must_use]
    pub fn contains(&self, context: &str, name: &str) -> bool {
        self.attribute(context, name).is_some()
    }

    /// Looks up a resolved attribute.
    #[must_use]
    pub fn attribute(&self, context: &str, name: &str) -> Option<&ResolvedAttribute> {
        self.contexts.get(context).and_then(|attrs| attrs.get(name))
    }

    /// Context names in order of first declaration.
    pub fn context_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.contexts.keys().copied()
    }

    /// Attributes of a context.
    pub fn attributes(&self, context: &str) -> impl Iterator<Item = &ResolvedAttribute> {
        self.contexts.get(context).into_iter().flat_map(IndexMap::values)
    }

    /// Human readable summary of the resolved contexts.
    #[must_use]
    pub fn report(&self) -> String {
        let mut out = String::new();
        for (context, attributes) in &self.contexts {
            let _ = writeln!(out, "{context}:");
            for attribute in attributes.values() {
                let state = if attribute.available {
                    "defined"
                } else if attribute.conditional {
                    "conditional"
                } else {
                    "undefined"
                };
                let _ = writeln!(
                    out,
                    "  {} ({}) {state}; defined by {:?}, required by {:?}, optional for {:?}",
                    attribute.attribute.name,
                    attribute.attribute.type_name,
                    attribute.defined_by,
                    attribute.required_by,
                    attribute.optional_for,
                );
            }
        }
        out
    }

    fn entry(&mut self, attribute: Attribute) -> &mut ResolvedAttribute {
        self.contexts
            .entry(attribute.context)
            .or_default()
            .entry(attribute.name)
            .or_insert_with(|| ResolvedAttribute {
                attribute,
                available: false,
                conditional: false,
                defined_by: Vec::new(),
                required_by: Vec::new(),
                optional_for: Vec::new(),
            })
    }
}

/// Incremental resolver used by assembly compilation.
#[derive(Debug, Default)]
pub(crate) struct Resolver {
    resolved: Resolved,
}

impl Resolver {
    pub(crate) fn new(provided: &[Attribute]) -> Self {
        let mut resolved = Resolved::default();
        for attribute in provided {
            resolved.entry(*attribute).available = true;
        }
        Self { resolved }
    }

    /// Validates a contract against what is available so far.
    pub(crate) fn check(
        &self,
        handler: &'static str,
        location: &str,
        contract: &Contract,
    ) -> Result<(), AssemblyError> {
        for declaration in contract.declarations() {
            let attribute = declaration.attribute;
            let known = self.resolved.attribute(attribute.context, attribute.name);
            if let Some(known) = known {
                if known.attribute.type_id != attribute.type_id {
                    return Err(AssemblyError::Conflict {
                        handler,
                        location: location.to_string(),
                        attribute: attribute.to_string(),
                        expected: known.attribute.type_name,
                        found: attribute.type_name,
                    });
                }
            }
            if declaration.kind == AttributeKind::Requires && !known.is_some_and(|k| k.available) {
                return Err(AssemblyError::Unsatisfied {
                    handler,
                    location: location.to_string(),
                    attribute: attribute.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Records a contract once it passed [`Resolver::check`].
    pub(crate) fn declare(&mut self, handler: &'static str, contract: &Contract) {
        for declaration in contract.declarations() {
            let entry = self.resolved.entry(declaration.attribute);
            match declaration.kind {
                AttributeKind::Defines => {
                    entry.available = true;
                    entry.defined_by.push(handler);
                }
                AttributeKind::DefinesIf => {
                    entry.conditional = true;
                    entry.defined_by.push(handler);
                }
                AttributeKind::Requires => entry.required_by.push(handler),
                AttributeKind::Optional => entry.optional_for.push(handler),
            }
        }
    }

    /// Attributes a sub-assembly may rely on, optionally restricted to
    /// some contexts.
    pub(crate) fn available(&self, contexts: Option<&[&'static str]>) -> Vec<Attribute> {
        self.resolved
            .contexts
            .iter()
            .filter(|(context, _)| contexts.map_or(true, |names| names.contains(*context)))
            .flat_map(|(_, attributes)| attributes.values())
            .filter(|resolved| resolved.available)
            .map(|resolved| resolved.attribute)
            .collect()
    }

    /// Merges the resolution of an included sub-assembly.
    pub(crate) fn absorb(&mut self, sub: &Resolved) {
        for attributes in sub.contexts.values() {
            for resolved in attributes.values() {
                let entry = self.resolved.entry(resolved.attribute);
                entry.available |= resolved.available;
                entry.conditional |= resolved.conditional;
                for handler in &resolved.defined_by {
                    if !entry.defined_by.contains(handler) {
                        entry.defined_by.push(handler);
                    }
                }
                for handler in &resolved.required_by {
                    if !entry.required_by.contains(handler) {
                        entry.required_by.push(handler);
                    }
                }
                for handler in &resolved.optional_for {
                    if !entry.optional_for.contains(handler) {
                        entry.optional_for.push(handler);
                    }
                }
            }
        }
    }

    pub(crate) fn finish(self) -> Resolved {
        self.resolved
    }
}
