//! Why a configuration could not be loaded.

use std::path::PathBuf;

use daedalus_gateway::GatewayError;
use thiserror::Error;

/// A configuration that cannot be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Nothing at the given path.
    #[error("no configuration at {}", path.display())]
    Missing {
        /// Requested path.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("cannot read configuration at {}", path.display())]
    Unreadable {
        /// Requested path.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// Neither `toml` nor `json`.
    #[error("configuration format '{0}' is neither toml nor json")]
    UnsupportedFormat(String),

    /// Malformed TOML, or an unknown section or key.
    #[error("malformed TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed JSON, or an unknown section or key.
    #[error("malformed JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// A setting out of its range.
    #[error("{setting} {reason}")]
    Setting {
        /// Dotted path of the setting, such as `slicing.default_limit`.
        setting: &'static str,
        /// What is wrong with its value.
        reason: String,
    },

    /// Gateway records that do not compile.
    #[error("gateways from {origin} are invalid: {source}")]
    Gateways {
        /// Setting or variable the records came from.
        origin: String,
        /// Failing record.
        #[source]
        source: GatewayError,
    },

    /// An override variable whose value does not fit its setting.
    #[error("{variable} {expected}")]
    Variable {
        /// Full variable name.
        variable: String,
        /// What the setting accepts.
        expected: String,
    },
}

impl ConfigError {
    pub(crate) fn setting(setting: &'static str, reason: impl Into<String>) -> Self {
        Self::Setting {
            setting,
            reason: reason.into(),
        }
    }

    pub(crate) fn variable(variable: &str, expected: impl Into<String>) -> Self {
        Self::Variable {
            variable: variable.to_string(),
            expected: expected.into(),
        }
    }
}
