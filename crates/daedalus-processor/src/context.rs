//! The per-run attribute bag.

use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ProcessorError;
use crate::key::Key;
use crate::resolver::Resolved;

type Slot = Box<dyn Any + Send + Sync>;

/// Attribute values of all contexts of one run, keyed by context and name.
///
/// Reading an attribute that was never set is an error; use
/// [`Contexts::find`] for attributes declared as optional.
///
/// # Example
///
/// ```
/// use daedalus_processor::{Contexts, Key};
///
/// const COUNT: Key<u32> = Key::new("test", "count");
///
/// let mut ctx = Contexts::new();
/// assert!(ctx.get(&COUNT).is_err());
/// ctx.set(&COUNT, 3);
/// *ctx.get_mut(&COUNT).unwrap() += 1;
/// assert_eq!(*ctx.get(&COUNT).unwrap(), 4);
/// ```
#[derive(Default)]
pub struct Contexts {
    values: HashMap<(&'static str, &'static str), Slot>,
    resolved: Option<Arc<Resolved>>,
}

impl Contexts {
    /// Creates an empty bag not bound to any processing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn bound(resolved: Arc<Resolved>) -> Self {
        Self {
            values: HashMap::new(),
            resolved: Some(resolved),
        }
    }

    /// Sets an attribute, returning the previous value of the same type.
    pub fn set<T: Send + Sync + 'static>(&mut self, key: &Key<T>, value: T) -> Option<T> {
        self.values
            .insert((key.context(), key.name()), Box::new(value))
            .and_then(|previous| previous.downcast::<T>().ok())
            .map(|previous| *previous)
    }

    /// Reads an attribute.
    pub fn get<T: 'static>(&self, key: &Key<T>) -> Result<&T, ProcessorError> {
        let slot = self
            .values
            .get(&(key.context(), key.name()))
            .ok_or_else(|| missing(key))?;
        slot.downcast_ref::<T>().ok_or_else(|| mismatch(key))
    }

    /// Reads an attribute mutably.
    pub fn get_mut<T: 'static>(&mut self, key: &Key<T>) -> Result<&mut T, ProcessorError> {
        let slot = self
            .values
            .get_mut(&(key.context(), key.name()))
            .ok_or_else(|| missing(key))?;
        slot.downcast_mut::<T>().ok_or_else(|| mismatch(key))
    }

    /// Reads an attribute if present.
    #[must_use]
    pub fn find<T: 'static>(&self, key: &Key<T>) -> Option<&T> {
        self.values
            .get(&(key.context(), key.name()))
            .and_then(|slot| slot.downcast_ref::<T>())
    }

    /// Reads an attribute mutably if present.
    pub fn find_mut<T: 'static>(&mut self, key: &Key<T>) -> Option<&mut T> {
        self.values
            .get_mut(&(key.context(), key.name()))
            .and_then(|slot| slot.downcast_mut::<T>())
    }

    /// Returns the attribute, inserting it first when absent.
    pub fn get_or_insert_with<T, F>(&mut self, key: &Key<T>, init: F) -> Result<&mut T, ProcessorError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let slot = match self.values.entry((key.context(), key.name())) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(Box::new(init())),
        };
        slot.downcast_mut::<T>().ok_or_else(|| mismatch(key))
    }

    /// Removes an attribute.
    pub fn take<T: 'static>(&mut self, key: &Key<T>) -> Option<T> {
        let id = (key.context(), key.name());
        if !self.values.get(&id).is_some_and(|slot| slot.is::<T>()) {
            return None;
        }
        self.values
            .remove(&id)
            .and_then(|slot| slot.downcast::<T>().ok())
            .map(|value| *value)
    }

    /// Whether the attribute is currently set.
    #[must_use]
    pub fn contains<T: 'static>(&self, key: &Key<T>) -> bool {
        self.find(key).is_some()
    }

    /// Whether any handler of the bound processing declares the attribute.
    ///
    /// Lets a handler test whether an optional collaborator takes part in
    /// the assembly at all.
    #[must_use]
    pub fn is_declared<T: 'static>(&self, key: &Key<T>) -> bool {
        self.resolved
            .as_ref()
            .is_some_and(|resolved| resolved.contains(key.context(), key.name()))
    }

    /// Moves the attributes of the named contexts into a new bag.
    #[must_use]
    pub fn split_off(&mut self, contexts: &[&str]) -> Self {
        let ids: Vec<_> = self
            .values
            .keys()
            .filter(|(context, _)| contexts.contains(context))
            .copied()
            .collect();
        let mut values = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(slot) = self.values.remove(&id) {
                values.insert(id, slot);
            }
        }
        Self {
            values,
            resolved: self.resolved.clone(),
        }
    }

    /// Moves all attributes of `other` into this bag.
    pub fn merge(&mut self, other: Self) {
        self.values.extend(other.values);
    }

    /// Names of the set attributes, sorted.
    #[must_use]
    pub fn attribute_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .values
            .keys()
            .map(|(context, name)| format!("{context}.{name}"))
            .collect();
        names.sort();
        names
    }
}

impl fmt::Debug for Contexts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contexts")
            .field("attributes", &self.attribute_names())
            .finish_non_exhaustive()
    }
}

fn missing<T>(key: &Key<T>) -> ProcessorError {
    ProcessorError::MissingAttribute {
        context: key.context(),
        name: key.name(),
    }
}

fn mismatch<T>(key: &Key<T>) -> ProcessorError {
    ProcessorError::TypeMismatch {
        context: key.context(),
        name: key.name(),
        expected: std::any::type_name::<T>(),
    }
}
