//! Layered loading: a preset, then a file, then `PREFIX__SECTION__KEY`
//! variables. The result is validated once, in [`ConfigLoader::load`].

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use daedalus_gateway::{AuthorizedSettings, GatewayRecord};

use crate::{ConfigError, DaedalusConfig};

/// Syntax of a configuration source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn parse(self, content: &str) -> Result<DaedalusConfig, ConfigError> {
        Ok(match self {
            Self::Toml => toml::from_str(content)?,
            Self::Json => serde_json::from_str(content)?,
        })
    }
}

impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        if name.eq_ignore_ascii_case("toml") {
            Ok(Self::Toml)
        } else if name.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else {
            Err(ConfigError::UnsupportedFormat(name.to_string()))
        }
    }
}

/// Builds a [`DaedalusConfig`] from layered sources.
///
/// ```no_run
/// use daedalus_config::ConfigLoader;
///
/// # fn main() -> Result<(), daedalus_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("daedalus.toml")?
///     .with_dotenv()
///     .with_env_prefix("DAEDALUS")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: DaedalusConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// A loader holding the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets to the defaults.
    #[must_use]
    pub fn with_defaults(self) -> Self {
        self.preset(DaedalusConfig::default())
    }

    /// Resets to [`DaedalusConfig::development`].
    ///
    /// ```
    /// use daedalus_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert!(config.server.development);
    /// ```
    #[must_use]
    pub fn with_development(self) -> Self {
        self.preset(DaedalusConfig::development())
    }

    /// Resets to [`DaedalusConfig::production`].
    #[must_use]
    pub fn with_production(self) -> Self {
        self.preset(DaedalusConfig::production())
    }

    fn preset(mut self, config: DaedalusConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the configuration with a `.toml` or `.json` file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Missing`], [`ConfigError::Unreadable`],
    /// [`ConfigError::UnsupportedFormat`] for other extensions, or a parse
    /// error. Unknown sections and keys are parse errors.
    pub fn with_file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::Missing { path: path.to_path_buf() });
        }
        let format: Format = path.extension().and_then(|e| e.to_str()).unwrap_or_default().parse()?;
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let loader = self.preset(format.parse(&content)?);
        tracing::debug!(path = %path.display(), "Configuration file loaded");
        Ok(loader)
    }

    /// Like [`ConfigLoader::with_file`], skipped when the file is absent.
    ///
    /// # Errors
    ///
    /// Those of [`ConfigLoader::with_file`], except [`ConfigError::Missing`].
    pub fn with_optional_file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Replaces the configuration with `content` in `toml` or `json`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnsupportedFormat`] or a parse error.
    ///
    /// ```
    /// use daedalus_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[slicing]\nmaximum_limit = 50", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    /// assert_eq!(config.slicing.maximum_limit, Some(50));
    /// ```
    pub fn with_string(self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let config = format.parse::<Format>()?.parse(content)?;
        Ok(self.preset(config))
    }

    /// Reads `PREFIX__SECTION__KEY` variables on [`ConfigLoader::load`].
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Reads a `.env` file into the environment, when there is one.
    #[must_use]
    pub fn with_dotenv(self) -> Self {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Environment file loaded"),
            Err(error) if error.not_found() => {}
            Err(error) => tracing::warn!(%error, "Environment file ignored"),
        }
        self
    }

    /// Applies the variables and validates.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Variable`] for a variable its setting cannot take, or
    /// any error of [`DaedalusConfig::validate`].
    pub fn load(mut self) -> Result<DaedalusConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let mut vars: Vec<(String, String)> = env::vars().filter(|(key, _)| key.starts_with(&prefix)).collect();
            vars.sort();
            for (key, value) in vars {
                self.apply_env_var(&key, &value, &prefix)?;
            }
        }
        self.config.validate()?;
        Ok(self.config)
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(path) = key.strip_prefix(prefix).and_then(|k| k.strip_prefix("__")) else {
            return Ok(());
        };
        let config = &mut self.config;

        match path.split("__").collect::<Vec<_>>().as_slice() {
            ["SERVER", "DEVELOPMENT"] => config.server.development = boolean(key, value)?,
            ["SERVER", "DEFAULT_CONTENT_TYPE"] => config.server.default_content_type = value.to_string(),
            ["SERVER", "CHARSET"] => config.server.charset = value.to_string(),
            ["SERVER", "CORS_ALLOW_ORIGIN"] => config.server.cors_allow_origin = optional(value),
            ["SERVER", "METHOD_OVERRIDE"] => config.server.method_override = boolean(key, value)?,

            ["SLICING", "MAXIMUM_LIMIT"] => config.slicing.maximum_limit = optional_integer(key, value)?,
            ["SLICING", "DEFAULT_LIMIT"] => config.slicing.default_limit = optional_integer(key, value)?,
            ["SLICING", "DEFAULT_WITH_TOTAL"] => {
                config.slicing.default_with_total = optional(value).map(|value| boolean(key, &value)).transpose()?;
            }

            ["DECODING", "SEPARATOR"] => config.decoding.separator = value.to_string(),
            ["DECODING", "LIST_SEPARATOR"] => {
                let mut chars = value.chars();
                config.decoding.list_separator = match (chars.next(), chars.next()) {
                    (Some(separator), None) => separator,
                    _ => return Err(ConfigError::variable(key, "expects a single character")),
                };
            }

            ["GATEWAY", "GATEWAYS"] => {
                config.gateway.gateways =
                    GatewayRecord::list_from_json(value).map_err(|source| ConfigError::Gateways {
                        origin: key.to_string(),
                        source,
                    })?;
            }
            ["GATEWAY", "DERIVE_FROM_TREE"] => config.gateway.derive_from_tree = boolean(key, value)?,
            ["GATEWAY", "METHOD_OVERRIDE"] => config.gateway.method_override = boolean(key, value)?,
            ["GATEWAY", "FILTER_CACHE"] => config.gateway.filter_cache = boolean(key, value)?,
            ["GATEWAY", "AUTHORIZED", field] => {
                let authorized = config.gateway.authorized.get_or_insert_with(AuthorizedSettings::default);
                match *field {
                    "URI" => authorized.uri = value.to_string(),
                    "HEADER" => authorized.header = value.to_string(),
                    "IDLE_SECONDS" => {
                        authorized.idle_seconds = value
                            .parse()
                            .map_err(|_| ConfigError::variable(key, "expects a number of seconds"))?;
                    }
                    _ => tracing::warn!(var = key, "Unknown configuration variable ignored"),
                }
            }

            ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                config.logging.format = value
                    .parse()
                    .map_err(|_| ConfigError::variable(key, "expects 'json', 'pretty' or 'compact'"))?;
            }
            ["LOGGING", "INCLUDE_TARGET"] => config.logging.include_target = boolean(key, value)?,
            ["LOGGING", "INCLUDE_LOCATION"] => config.logging.include_location = boolean(key, value)?,
            ["LOGGING", "WITH_THREAD_IDS"] => config.logging.with_thread_ids = boolean(key, value)?,

            _ => tracing::warn!(var = key, "Unknown configuration variable ignored"),
        }
        Ok(())
    }
}

fn boolean(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::variable(key, "expects true or false")),
    }
}

/// Empty and `none` clear an optional value.
fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(value.to_string())
    }
}

fn optional_integer(key: &str, value: &str) -> Result<Option<i64>, ConfigError> {
    optional(value)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::variable(key, "expects an integer or 'none'"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_telemetry::LogFormat;

    fn overridden(vars: &[(&str, &str)]) -> Result<DaedalusConfig, ConfigError> {
        let mut loader = ConfigLoader::new();
        for (key, value) in vars {
            loader.apply_env_var(key, value, "TEST")?;
        }
        Ok(loader.config)
    }

    #[test]
    fn test_presets() {
        assert_eq!(ConfigLoader::new().load().unwrap(), DaedalusConfig::default());
        let production = ConfigLoader::new().with_production().load().unwrap();
        assert_eq!(production.logging.format, LogFormat::Json);
        assert!(!production.server.development);
    }

    #[test]
    fn test_json_string_keeps_other_defaults() {
        let json = r#"{"decoding": {"list_separator": ";"}, "gateway": {"filter_cache": false}}"#;
        let config = ConfigLoader::new().with_string(json, "JSON").unwrap().load().unwrap();
        assert_eq!(config.decoding.list_separator, ';');
        assert!(!config.gateway.filter_cache);
        assert!(config.gateway.derive_from_tree);
    }

    #[test]
    fn test_yaml_is_unsupported() {
        let error = ConfigLoader::new().with_string("", "yaml").unwrap_err();
        assert!(matches!(error, ConfigError::UnsupportedFormat(format) if format == "yaml"));
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        let error = ConfigLoader::new().with_string("[metrics]\nenabled = true", "toml").unwrap_err();
        assert!(matches!(error, ConfigError::Toml(_)));
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigLoader::new().with_file("/nonexistent/daedalus.toml");
        assert!(matches!(result, Err(ConfigError::Missing { .. })));
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/daedalus.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config, DaedalusConfig::default());
    }

    // Overrides go through apply_env_var: set_var is not available without
    // unsafe.

    #[test]
    fn test_slicing_variables() {
        let config = overridden(&[
            ("TEST__SLICING__MAXIMUM_LIMIT", "100"),
            ("TEST__SLICING__DEFAULT_WITH_TOTAL", "yes"),
        ])
        .unwrap();
        assert_eq!(config.slicing.maximum_limit, Some(100));
        assert_eq!(config.slicing.default_with_total, Some(true));

        let cleared = overridden(&[("TEST__SLICING__MAXIMUM_LIMIT", "100"), ("TEST__SLICING__MAXIMUM_LIMIT", "none")]);
        assert_eq!(cleared.unwrap().slicing.maximum_limit, None);
    }

    #[test]
    fn test_variable_of_the_wrong_kind() {
        let error = overridden(&[("TEST__SLICING__DEFAULT_LIMIT", "ten")]).unwrap_err();
        assert_eq!(error.to_string(), "TEST__SLICING__DEFAULT_LIMIT expects an integer or 'none'");
        assert!(overridden(&[("TEST__SERVER__DEVELOPMENT", "maybe")]).is_err());
        assert!(overridden(&[("TEST__LOGGING__FORMAT", "xml")]).is_err());
        assert!(overridden(&[("TEST__DECODING__LIST_SEPARATOR", ";;")]).is_err());
    }

    #[test]
    fn test_server_and_logging_variables() {
        let config = overridden(&[
            ("TEST__SERVER__DEVELOPMENT", "ON"),
            ("TEST__SERVER__CORS_ALLOW_ORIGIN", "*"),
            ("TEST__LOGGING__FORMAT", "compact"),
            ("TEST__DECODING__LIST_SEPARATOR", ";"),
        ])
        .unwrap();
        assert!(config.server.development);
        assert_eq!(config.server.cors_allow_origin.as_deref(), Some("*"));
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.decoding.list_separator, ';');
    }

    #[test]
    fn test_gateway_variables() {
        let list = r#"{"GatewayList": [{"Pattern": "^/api/(.*)$", "Navigate": "{1}"}]}"#;
        let config = overridden(&[
            ("TEST__GATEWAY__GATEWAYS", list),
            ("TEST__GATEWAY__AUTHORIZED__HEADER", "X-Token"),
            ("TEST__GATEWAY__AUTHORIZED__IDLE_SECONDS", "5"),
        ])
        .unwrap();
        assert_eq!(config.gateway.gateways[0].navigate.as_deref(), Some("{1}"));
        let authorized = config.gateway.authorized.unwrap();
        assert_eq!(authorized.header, "X-Token");
        assert_eq!(authorized.idle_seconds, 5);
        assert_eq!(authorized.uri, AuthorizedSettings::default().uri);

        let error = overridden(&[("TEST__GATEWAY__GATEWAYS", "[")]).unwrap_err();
        assert!(matches!(error, ConfigError::Gateways { origin, .. } if origin == "TEST__GATEWAY__GATEWAYS"));
    }

    #[test]
    fn test_unknown_variable_is_ignored() {
        let config = overridden(&[("TEST__METRICS__ENABLED", "true"), ("TESTING", "x")]).unwrap();
        assert_eq!(config, DaedalusConfig::default());
    }
}
