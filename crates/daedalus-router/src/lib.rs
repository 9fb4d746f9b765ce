//! Resource tree router for Daedalus.
//!
//! This crate holds the tree the assembler builds from the registered
//! services and the dispatcher matches requests against. Every node is one
//! path segment; calls are bound to nodes as [`Invoker`]s, one per HTTP
//! method.
//!
//! # Features
//!
//! - **Arena Tree**: nodes refer to each other by [`NodeId`], the tree is
//!   immutable once built
//! - **Typed Segments**: a node has at most one child reached by a value,
//!   converted to the primitive of its property
//! - **Extensions**: `/User/3.json` selects a representation, literal names
//!   are tried before the typed child
//! - **Mandatory Slash**: string and float segments with children must be
//!   closed by `/`
//! - **Model Paths**: the tree knows where each model is served and builds
//!   `href` values for the encoders
//!
//! # Architecture
//!
//! ```text
//!                    (root) [GET]
//!                      │
//!              ┌───────┴────────┐
//!              │                │
//!           "User"          "Document"
//!         [GET,POST]            │
//!              │           {Document.Name}  (slash)
//!         {User.Id}          [GET]
//!      [GET,PUT,DELETE]         │
//!              │             "Part"
//!          "Article"          [GET]
//!            [GET]
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod invoker;
mod node;
mod path;
mod tree;

pub use error::{MatchError, TreeError};
pub use invoker::{Invoker, PathElement, Prepare};
pub use node::{Node, NodeId, Segment};
pub use path::PathMatch;
pub use tree::{ResourceTree, TreeBuilder};
