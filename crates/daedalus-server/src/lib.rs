//! Per-request dispatcher for Daedalus.
//!
//! The dispatcher serves a frozen [`ResourceTree`](daedalus_router::ResourceTree).
//! Each request runs through a compiled processing of stages over a
//! `request` and a `response` context: path match, method pick, argument
//! decoding, the call, output encoding and the explanation of errors.
//! The answer is always a complete [`Response`](daedalus_core::Response);
//! failures of the stages themselves become a 500.
//!
//! # Features
//!
//! - **Status Mapping**: 404, 405 with `Allow`, 400 for parameters and
//!   content, 406, 201 with `Location`, 204, 302 for references
//! - **Error Bodies**: every failure carries an [`ErrorBody`] with the
//!   per-field messages and what the resource accepts
//! - **Negotiation**: `Accept`, `Accept-Charset`, `Accept-Language` and
//!   path extensions
//! - **Method Override**: `X-HTTP-Method-Override` for `DELETE` over `GET`
//!   and `PUT` over `POST`
//! - **Sessions**: an optional [`SessionProvider`] commits on success and
//!   rolls back otherwise
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use daedalus_assembler::{Assembler, AssemblerSettings};
//! use daedalus_core::{Call, Dispatch, Primitive, Request, Service, Type, TypeModel, Value};
//! use daedalus_server::Dispatcher;
//!
//! let user = TypeModel::builder("User").id("Id", Primitive::Int).property("Name", Primitive::Str).build();
//! let service = Service::new("UserService").call(
//!     Call::get("get", |args| {
//!         Ok(Value::object([("Id", args.get("id").cloned().unwrap_or_default()), ("Name", Value::from("Ada"))]))
//!     })
//!     .input("id", Type::Property(user.property_id().unwrap()))
//!     .output(Type::Model(Arc::clone(&user))),
//! );
//! let resources = Assembler::new(AssemblerSettings::default()).unwrap().assemble(vec![service]).unwrap();
//! let dispatcher = Dispatcher::builder(Arc::new(resources.tree)).build().unwrap();
//!
//! let response = dispatcher.dispatch(Request::get("/User/42"));
//! assert_eq!(response.status, 200);
//! assert_eq!(response.json().unwrap()["href"], "/User/42");
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
mod dispatcher;
mod error;
mod session;
mod settings;
pub mod stages;

pub use dispatcher::{dispatcher_assembly, Dispatcher, DispatcherBuilder};
pub use error::{DispatchError, ErrorBody, ErrorDetails};
pub use session::{Session, SessionProvider};
pub use settings::{ServerSettings, DEFAULT_CHARSET, DEFAULT_CONTENT_TYPE};
