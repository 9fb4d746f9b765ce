//! Main configuration types.

use daedalus_assembler::AssemblerSettings;
use daedalus_gateway::{GatewayRepository, GatewaySettings};
use daedalus_server::ServerSettings;
use daedalus_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, DecodingConfig, SlicingConfig};

/// Complete Daedalus configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from
/// files and environment variables.
///
/// # Example
///
/// ```
/// use daedalus_config::DaedalusConfig;
///
/// let config = DaedalusConfig::default();
/// assert_eq!(config.server.charset, "UTF-8");
/// assert_eq!(config.decoding.separator, ".");
/// assert!(config.gateway.derive_from_tree);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct DaedalusConfig {
    /// How the dispatcher answers.
    #[serde(default)]
    pub server: ServerSettings,

    /// Collection slicing limits.
    #[serde(default)]
    pub slicing: SlicingConfig,

    /// Parameter separators.
    #[serde(default)]
    pub decoding: DecodingConfig,

    /// Gateway records and their sources.
    #[serde(default)]
    pub gateway: GatewaySettings,

    /// Log output.
    #[serde(default)]
    pub logging: LogConfig,
}

impl DaedalusConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Setting` when a slicing limit is not positive,
    /// the default limit exceeds the maximum, or the separator is empty or
    /// equal to the list separator. Returns `ConfigError::Gateways` when a
    /// configured gateway does not compile.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(maximum) = self.slicing.maximum_limit {
            if maximum < 1 {
                return Err(ConfigError::setting(
                    "slicing.maximum_limit",
                    format!("must be positive, got {maximum}"),
                ));
            }
        }
        if let Some(default) = self.slicing.default_limit {
            if default < 1 {
                return Err(ConfigError::setting(
                    "slicing.default_limit",
                    format!("must be positive, got {default}"),
                ));
            }
            if let Some(maximum) = self.slicing.maximum_limit.filter(|maximum| default > *maximum) {
                return Err(ConfigError::setting(
                    "slicing.default_limit",
                    format!("{default} exceeds maximum_limit {maximum}"),
                ));
            }
        }

        if self.decoding.separator.is_empty() {
            return Err(ConfigError::setting("decoding.separator", "must not be empty"));
        }
        if self.decoding.separator == self.decoding.list_separator.to_string() {
            return Err(ConfigError::setting(
                "decoding.separator",
                format!("'{}' is also the list separator", self.decoding.separator),
            ));
        }

        GatewayRepository::new(self.gateway.gateways.clone())
            .map_err(|source| ConfigError::Gateways {
                origin: "gateway.gateways".to_string(),
                source,
            })?;

        Ok(())
    }

    /// Create a development configuration preset: internal error texts and
    /// human readable debug logs.
    ///
    /// # Example
    ///
    /// ```
    /// use daedalus_config::DaedalusConfig;
    ///
    /// let config = DaedalusConfig::development();
    /// assert!(config.server.development);
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.server.development = true;
        config.logging = LogConfig::development();
        config
    }

    /// Create a production configuration preset.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.server.development = false;
        config.logging = LogConfig::production();
        config
    }

    /// Settings of the resource assembler.
    #[must_use]
    pub fn assembler_settings(&self) -> AssemblerSettings {
        AssemblerSettings {
            slicing: self.slicing.into(),
            decoding: self.decoding.clone().into(),
        }
    }
}
