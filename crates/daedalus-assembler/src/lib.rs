//! Resource tree assembler for Daedalus.
//!
//! The assembler turns declared services into the immutable
//! [`ResourceTree`](daedalus_router::ResourceTree) the dispatcher serves.
//! It is itself a processing: a fixed list of stages over a shared
//! register context, compiled once and run once per set of services.
//!
//! # Features
//!
//! - **Derived Paths**: paths follow from the inputs and outputs of each
//!   call, `GET /User/{User.Id}` for a call taking a user id and returning
//!   a user
//! - **Optional Path Values**: optional property inputs publish one extra
//!   path per combination
//! - **Exclusions**: a call that cannot be published is left out with a
//!   reason and the location of its declaration; the others are served
//! - **Slicing**: `limit` and `withTotal` defaults and the maximum limit
//!   are applied before every call
//! - **Root Resources**: `GET /` lists what can be reached from the root
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use daedalus_assembler::{Assembler, AssemblerSettings};
//! use daedalus_core::{Call, Primitive, Service, Type, TypeModel, Value};
//! use http::Method;
//!
//! let user = TypeModel::builder("User").id("Id", Primitive::Int).build();
//! let service = Service::new("UserService")
//!     .call(Call::get("all", |_| Ok(Value::List(Vec::new()))).output(Type::iter(Type::Model(Arc::clone(&user)))))
//!     .call(Call::get("count", |_| Ok(Value::Int(0))).output(Type::Primitive(Primitive::Int)));
//!
//! let resources = Assembler::new(AssemblerSettings::default()).unwrap().assemble(vec![service]).unwrap();
//! assert!(resources.tree.lookup(&Method::GET, "/User").is_some());
//! // `count` is about no model
//! assert_eq!(resources.excluded.len(), 1);
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-assembler/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod assembler;
mod error;
mod register;
pub mod stages;

pub use assembler::{assembler_assembly, Assembler, Resources};
pub use error::{AssemblerError, ExcludeReason};
pub use register::{
    AssemblerSettings, Exclusion, SliceSettings, BUILDER, EXCLUDED, INVOKERS, REGISTER, SERVICES,
    SETTINGS, SUGGESTIONS, TREE,
};
