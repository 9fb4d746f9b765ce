//! Configuration sections owned by this crate.
//!
//! The `server`, `gateway` and `logging` sections reuse the settings types
//! of the crates they configure.

use daedalus_assembler::SliceSettings;
use daedalus_codec::DecodeSettings;
use serde::{Deserialize, Serialize};

/// Limits applied to collection slicing.
///
/// ```
/// use daedalus_config::SlicingConfig;
///
/// let config: SlicingConfig = toml::from_str("maximum_limit = 50").unwrap();
/// assert_eq!(config.maximum_limit, Some(50));
/// assert_eq!(config.default_limit, None);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlicingConfig {
    /// Upper bound of `limit`.
    pub maximum_limit: Option<i64>,
    /// `limit` applied when the client sends none.
    pub default_limit: Option<i64>,
    /// `withTotal` applied when the client sends none.
    pub default_with_total: Option<bool>,
}

impl From<SlicingConfig> for SliceSettings {
    fn from(config: SlicingConfig) -> Self {
        Self {
            maximum_limit: config.maximum_limit,
            default_limit: config.default_limit,
            default_with_total: config.default_with_total,
        }
    }
}

/// Separators of parameter names and list values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecodingConfig {
    /// Joins nested parameter names.
    pub separator: String,
    /// Splits list values.
    pub list_separator: char,
}

impl Default for DecodingConfig {
    fn default() -> Self {
        let settings = DecodeSettings::default();
        Self {
            separator: settings.separator,
            list_separator: settings.list_separator,
        }
    }
}

impl From<DecodingConfig> for DecodeSettings {
    fn from(config: DecodingConfig) -> Self {
        Self {
            separator: config.separator,
            list_separator: config.list_separator,
        }
    }
}
