//! Attributes of the assemblage contexts.

use daedalus_processor::Key;

use crate::node::RequestNode;

pub use daedalus_server::context::{REQUEST, RESPONSE};

/// What the client asked to inline, when anything.
pub const NODE: Key<RequestNode> = Key::new("assemblage", "node");
