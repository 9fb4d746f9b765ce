//! Handler contracts.
//!
//! A contract lists, per attribute, how a handler uses it. The resolver
//! merges the contracts of all handlers of an assembly and rejects the
//! assembly when a required attribute is never defined upstream.

use crate::key::{Attribute, Key};

/// How a handler uses an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// The handler sets the attribute.
    Defines,
    /// The handler sets the attribute only in some cases; it satisfies
    /// optional readers but not required ones.
    DefinesIf,
    /// The handler reads the attribute, which must be defined upstream.
    Requires,
    /// The handler reads the attribute when present.
    Optional,
}

impl AttributeKind {
    /// Lower case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Defines => "defines",
            Self::DefinesIf => "defines_if",
            Self::Requires => "requires",
            Self::Optional => "optional",
        }
    }
}

/// One line of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declaration {
    /// The attribute.
    pub attribute: Attribute,
    /// Its usage.
    pub kind: AttributeKind,
}

/// The attributes a handler touches.
///
/// # Example
///
/// ```
/// use daedalus_processor::{Contract, Key};
///
/// const URI: Key<String> = Key::new("request", "uri");
/// const FOUND: Key<bool> = Key::new("response", "found");
///
/// let contract = Contract::new().requires(&URI).defines(&FOUND);
/// assert_eq!(contract.declarations().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Contract {
    declarations: Vec<Declaration>,
}

impl Contract {
    /// Creates an empty contract.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn declare(mut self, attribute: Attribute, kind: AttributeKind) -> Self {
        self.declarations.push(Declaration { attribute, kind });
        self
    }

    /// Declares an attribute the handler sets.
    pub fn defines<T: 'static>(self, key: &Key<T>) -> Self {
        self.declare(key.attribute(), AttributeKind::Defines)
    }

    /// Declares an attribute the handler sets only sometimes.
    pub fn defines_if<T: 'static>(self, key: &Key<T>) -> Self {
        self.declare(key.attribute(), AttributeKind::DefinesIf)
    }

    /// Declares an attribute the handler needs.
    pub fn requires<T: 'static>(self, key: &Key<T>) -> Self {
        self.declare(key.attribute(), AttributeKind::Requires)
    }

    /// Declares an attribute the handler reads when present.
    pub fn optional<T: 'static>(self, key: &Key<T>) -> Self {
        self.declare(key.attribute(), AttributeKind::Optional)
    }

    /// All declarations in order.
    #[must_use]
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Whether the contract declares nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}
