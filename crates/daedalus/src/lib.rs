//! # Daedalus
//!
//! **Service-driven REST core**
//!
//! Daedalus publishes plain typed service calls as REST resources. Nothing
//! is routed by hand: the assembler derives paths, parameters and
//! encoders from the call signatures, and the dispatcher serves the
//! resulting tree.
//!
//! - **Assembled Resources** – `get(id: User.Id) -> User` becomes `GET /User/{id}`
//! - **Processing Chains** – every stage declares what it requires and defines
//! - **Assemblage** – `X-Filter: Author` inlines referenced resources
//! - **Gateway** – regex records forward, filter and rewrite requests
//!
//! ## Quick Start
//!
//! ```
//! use daedalus::prelude::*;
//!
//! let user = TypeModel::builder("User")
//!     .id("Id", Primitive::Int)
//!     .property("Name", Primitive::Str)
//!     .build();
//! let users = Service::new("UserService").call(
//!     Call::get("get", |args| {
//!         let id = args.get("id").cloned().unwrap_or_default();
//!         Ok(Value::object([("Id", id), ("Name", Value::from("Ada"))]))
//!     })
//!     .input("id", Type::Property(user.property_id().unwrap()))
//!     .output(Type::Model(user)),
//! );
//!
//! let core = build_core(&DaedalusConfig::default(), vec![users]).unwrap();
//! let response = core.dispatch(Request::get("/User/42"));
//! assert_eq!(response.status, 200);
//! assert_eq!(response.json().unwrap()["href"], "/User/42");
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → Gateway → Assemblage → Dispatcher → Service call
//!                                      ↓
//! Response ← Content-Index ← Splice ← Encode
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod startup;
mod error;

pub use startup::{build_core, Core, CoreBuilder};
pub use error::CoreError;

// Re-export the member crates
pub use daedalus_assemblage as assemblage;
pub use daedalus_assembler as assembler;
pub use daedalus_codec as codec;
pub use daedalus_config as config;
pub use daedalus_core as types;
pub use daedalus_gateway as gateway;
pub use daedalus_processor as processor;
pub use daedalus_router as router;
pub use daedalus_server as server;
pub use daedalus_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use daedalus::prelude::*;
///
/// let config = DaedalusConfig::development();
/// assert!(config.server.development);
/// ```
pub mod prelude {
    pub use crate::{build_core, Core, CoreError};

    pub use daedalus_core::{
        Call, Dispatch, Part, Primitive, Request, Response, Service, ServiceError, Type, TypeModel,
        TypeOption, Value,
    };

    pub use daedalus_config::{ConfigLoader, DaedalusConfig};

    pub use daedalus_gateway::GatewayRecord;

    pub use daedalus_telemetry::{init_logging, LogConfig};
}
