//! Typed attribute keys.

use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;

/// A typed key naming one attribute of one context.
///
/// Keys are usually declared as constants next to the handlers that use
/// them:
///
/// ```
/// use daedalus_processor::Key;
///
/// pub const URI: Key<String> = Key::new("request", "uri");
/// assert_eq!(URI.to_string(), "request.uri");
/// ```
pub struct Key<T> {
    context: &'static str,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    /// Creates a key.
    #[must_use]
    pub const fn new(context: &'static str, name: &'static str) -> Self {
        Self {
            context,
            name,
            _marker: PhantomData,
        }
    }

    /// Name of the context.
    #[must_use]
    pub const fn context(&self) -> &'static str {
        self.context
    }

    /// Name of the attribute.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T: 'static> Key<T> {
    /// Untyped descriptor of the attribute.
    #[must_use]
    pub fn attribute(&self) -> Attribute {
        Attribute {
            context: self.context,
            name: self.name,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({}.{})", self.context, self.name)
    }
}

impl<T> fmt::Display for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.context, self.name)
    }
}

/// Untyped attribute descriptor used by contracts and the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attribute {
    /// Name of the context.
    pub context: &'static str,
    /// Name of the attribute.
    pub name: &'static str,
    /// Identity of the value type.
    pub type_id: TypeId,
    /// Readable name of the value type.
    pub type_name: &'static str,
}

impl Attribute {
    /// The `(context, name)` identity of the attribute.
    #[must_use]
    pub const fn id(&self) -> (&'static str, &'static str) {
        (self.context, self.name)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.context, self.name)
    }
}
