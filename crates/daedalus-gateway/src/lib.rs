//! Pattern based gateway for Daedalus.
//!
//! A gateway record maps request paths, matched by regex, to an upstream
//! target. The [`GatewayDispatcher`] selects the first matching record,
//! checks its access filters, rewrites the request and forwards it to an
//! upstream [`Dispatch`](daedalus_core::Dispatch), usually the core
//! dispatcher.
//!
//! # Features
//!
//! - **Repositories**: first match wins; [`JoinedRepository`] chains
//!   repositories by priority and [`SharedRepository`] swaps a reloaded
//!   one in while serving
//! - **Error Gateways**: records with `Errors` serve 404, 405, 403 or
//!   upstream errors, receiving `status` and `allow` parameters
//! - **Authorized Gateways**: gateways listed per `Authorization` header,
//!   searched before the shared ones
//! - **Filters**: `AND` across entries, `OR` within `a|b`, answers cached
//!   per repository
//! - **Navigation**: `*` and `{n}` templates, query union and `PutHeaders`
//! - **Derived Records**: one pass-through record per resource of the
//!   tree, plus the `X-HTTP-Method-Override` records
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use daedalus_core::{code, Dispatch, Request, Response};
//! use daedalus_gateway::{GatewayDispatcher, GatewayRecord, GatewayRepository, SharedRepository};
//!
//! struct Upstream;
//!
//! impl Dispatch for Upstream {
//!     fn dispatch(&self, request: Request) -> Response {
//!         let mut response = Response::new(code::PATH_FOUND);
//!         response.body = request.target().into();
//!         response
//!     }
//! }
//!
//! let records = vec![GatewayRecord::new("^/api/(.*)$").methods(["GET"]).navigate("{1}")];
//! let repository = Arc::new(SharedRepository::new(Arc::new(GatewayRepository::new(records).unwrap())));
//! let gateway = GatewayDispatcher::builder(repository, Arc::new(Upstream)).build().unwrap();
//!
//! assert_eq!(gateway.dispatch(Request::get("/api/User?limit=2")).body_text(), "/User?limit=2");
//! assert_eq!(gateway.dispatch(Request::delete("/api/User")).status, 405);
//! assert_eq!(gateway.dispatch(Request::get("/other")).status, 404);
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-gateway/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod authorized;
pub mod context;
mod dispatcher;
mod error;
mod record;
mod repository;
pub mod stages;
mod synthesis;

pub use authorized::{AuthorizedRepositories, AuthorizedSettings, AUTHORIZATION_MARKER};
pub use dispatcher::{gateway_assembly, GatewayDispatcher, GatewayDispatcherBuilder};
pub use error::GatewayError;
pub use record::{format_template, header_lines, Gateway, GatewayRecord};
pub use repository::{Cache, GatewayRepository, JoinedRepository, Match, Repository, SharedRepository};
pub use stages::{rewrite, Upstreams};
pub use synthesis::{gateways_from_tree, with_method_overrides, GatewaySettings, METHOD_OVERRIDE_PATTERN};
