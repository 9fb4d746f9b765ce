//! Layered configuration for Daedalus.
//!
//! [`DaedalusConfig`] gathers the settings of every crate of the workspace:
//!
//! - `server` - [`ServerSettings`](daedalus_server::ServerSettings) of the dispatcher
//! - `slicing` - [`SlicingConfig`], limits of collection slices
//! - `decoding` - [`DecodingConfig`], parameter separators
//! - `gateway` - [`GatewaySettings`](daedalus_gateway::GatewaySettings), records and their sources
//! - `logging` - [`LogConfig`](daedalus_telemetry::LogConfig)
//!
//! # Example
//!
//! ```no_run
//! use daedalus_config::ConfigLoader;
//!
//! # fn main() -> Result<(), daedalus_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_file("daedalus.toml")?
//!     .with_env_prefix("DAEDALUS")
//!     .load()?;
//!
//! println!("Maximum slice: {:?}", config.slicing.maximum_limit);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! development = false
//! cors_allow_origin = "*"
//!
//! [slicing]
//! maximum_limit = 100
//! default_limit = 20
//!
//! [decoding]
//! separator = "."
//! list_separator = ","
//!
//! [gateway]
//! derive_from_tree = true
//!
//! [[gateway.gateways]]
//! Pattern = "^/api/(.*)$"
//! Navigate = "{1}"
//!
//! [gateway.authorized]
//! header = "Authorization"
//! idle_seconds = 60
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values are overridden with `PREFIX__SECTION__KEY` variables, for example
//! `DAEDALUS__SLICING__MAXIMUM_LIMIT=100` or
//! `DAEDALUS__LOGGING__FORMAT=compact`. The authorized gateways take a third
//! level, as in `DAEDALUS__GATEWAY__AUTHORIZED__IDLE_SECONDS=30`.

#![doc(html_root_url = "https://docs.rs/daedalus-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::DaedalusConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{DecodingConfig, SlicingConfig};
