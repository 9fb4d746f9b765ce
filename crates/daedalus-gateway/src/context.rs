//! Attributes of the gateway contexts.
//!
//! The gateway runs over the same `request` and `response` contexts as the
//! dispatcher ([`REQUEST`], [`RESPONSE`]) and adds its own attributes.

use std::sync::Arc;

use http::Method;

use daedalus_processor::Key;

use crate::repository::{Match, Repository};

pub use daedalus_server::context::{REQUEST, RESPONSE};

/// The repository snapshot serving the request.
pub const REPOSITORY: Key<Arc<dyn Repository>> = Key::new("request", "repository");
/// The gateway chosen for the request.
pub const MATCH: Key<Match> = Key::new("request", "match");
/// Methods available for the path, when the request method is not.
pub const ALLOWS: Key<Vec<Method>> = Key::new("response", "allows");

/// Cache identifier of filter answers.
pub const FILTER_CACHE: &str = "filters";
