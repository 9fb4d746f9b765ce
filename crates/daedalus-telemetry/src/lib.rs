//! Structured logging for Daedalus.
//!
//! The core crates only emit `tracing` events and spans: `dispatch`,
//! `gateway` and `assemblage` spans per request, exclusions at startup,
//! and internal failures. This crate installs the subscriber that writes
//! them, in JSON for production or human readable for development.
//!
//! # Example
//!
//! ```rust,ignore
//! use daedalus_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development()).expect("logging");
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
