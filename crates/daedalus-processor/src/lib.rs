//! # Daedalus Processor
//!
//! Typed context-passing pipeline used by every stage of the Daedalus
//! framework.
//!
//! An [`Assembly`] is an ordered list of [`Handler`]s. Each handler
//! declares a [`Contract`] over the attributes it reads and writes. The
//! assembly compiles into an immutable [`Processing`]; compilation fails
//! when some handler requires an attribute that nobody upstream defines.
//! A [`Chain`] then runs the processing over one [`Contexts`] bag.
//!
//! ```text
//! Assembly ──create()──▶ Processing ──Chain::process()──▶ Outcome
//!    │                        │
//!    └─ handlers + branches   └─ resolved contracts per context
//! ```
//!
//! ## Key Features
//!
//! - **Typed keys**: attributes are addressed through [`Key<T>`] constants
//! - **Checked wiring**: unsatisfied or conflicting contracts fail at compile time of the assembly
//! - **Ordering**: handlers can be anchored before or after another handler
//! - **Branches**: included, routing and `using` sub-assemblies compiled with the parent
//! - **Control**: cancel, route, bounded retry and error/finalize/success hooks
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use daedalus_processor::{Assembly, Chain, Contract, FnHandler, Key};
//!
//! const URI: Key<String> = Key::new("request", "uri");
//! const SEGMENTS: Key<usize> = Key::new("response", "segments");
//!
//! let processing = Assembly::new("count")
//!     .add(FnHandler::new(
//!         "segments",
//!         Contract::new().requires(&URI).defines(&SEGMENTS),
//!         |_, ctx| {
//!             let count = ctx.get(&URI)?.split('/').filter(|s| !s.is_empty()).count();
//!             ctx.set(&SEGMENTS, count);
//!             Ok(())
//!         },
//!     ))
//!     .create(&[URI.attribute()])
//!     .unwrap();
//!
//! let processing = Arc::new(processing);
//! let mut ctx = processing.contexts();
//! ctx.set(&URI, "/users/1".to_string());
//! Chain::new(&processing).process(&mut ctx).unwrap();
//! assert_eq!(ctx.find(&SEGMENTS), Some(&2));
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-processor/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod assembly;
mod chain;
mod context;
mod contract;
mod error;
mod handler;
mod key;
mod resolver;

pub use assembly::{Assembly, Processing};
pub use chain::{Chain, Outcome, MAX_RETRIES};
pub use context::Contexts;
pub use contract::{AttributeKind, Contract, Declaration};
pub use error::{AssemblyError, ProcessorError};
pub use handler::{Branch, BranchMode, FnHandler, Handler};
pub use key::{Attribute, Key};
pub use resolver::{Resolved, ResolvedAttribute};
