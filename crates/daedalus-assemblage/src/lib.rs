//! Server side composition for Daedalus.
//!
//! Clients name the references they want inlined in the `X-Filter`
//! header, as dotted property names. The [`Assemblage`] fetches the main
//! response from the dispatcher it wraps, resolves the named references
//! with sub-requests and splices their bodies over the reference blocks
//! the encoders indexed.
//!
//! # Features
//!
//! - **Request Nodes**: `X-Filter: Author, Author.Boss` becomes a
//!   [`RequestNode`] tree; `Author.limit=1` is a parameter of the `Author`
//!   sub-request
//! - **Buffered Splicing**: the main body is complete before any block is
//!   replaced
//! - **Indexes**: replaced blocks are reported as `injected` in
//!   `Content-Index` with their new offsets
//! - **Method Override**: only effective `GET` requests are assembled
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use daedalus_assemblage::Assemblage;
//! use daedalus_core::{code, Dispatch, Index, IndexKind, Request, Response};
//!
//! struct Store;
//!
//! impl Dispatch for Store {
//!     fn dispatch(&self, request: Request) -> Response {
//!         let mut response = Response::new(code::PATH_FOUND);
//!         if request.uri == "/User/3" {
//!             response.body = r#"{"Name":"Ada"}"#.into();
//!             return response;
//!         }
//!         response.body = r#"{"Author":{"href":"/User/3"}}"#.into();
//!         response.indexes.push(Index {
//!             kind: IndexKind::Reference,
//!             name: "Author".into(),
//!             start: 10,
//!             end: 28,
//!             reference: Some("/User/3".into()),
//!         });
//!         response
//!     }
//! }
//!
//! let assemblage = Assemblage::new(Arc::new(Store)).unwrap();
//! let response = assemblage.dispatch(Request::get("/Article/7").with_header("X-Filter", "Author"));
//! assert_eq!(response.body_text(), r#"{"Author":{"Name":"Ada"}}"#);
//! assert_eq!(response.header("content-index"), Some("injected:Author=10-24"));
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-assemblage/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod assemblage;
pub mod context;
mod error;
mod node;
mod splice;
pub mod stages;

pub use assemblage::{assemblage_assembly, Assemblage};
pub use error::{AssemblageError, Unavailable};
pub use node::RequestNode;
pub use splice::{assemble, fetch, refresh_headers, sub_request};
