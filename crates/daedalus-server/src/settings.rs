//! Dispatcher settings.

use serde::{Deserialize, Serialize};

/// Default response content type.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Default response charset.
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// How the dispatcher answers.
///
/// # Example
///
/// ```
/// use daedalus_server::ServerSettings;
///
/// let settings = ServerSettings {
///     development: true,
///     ..ServerSettings::default()
/// };
/// assert_eq!(settings.charset, "UTF-8");
/// assert!(settings.method_override);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Keeps the text of internal errors in responses.
    pub development: bool,
    /// Content type used when the client expresses no preference.
    pub default_content_type: String,
    /// Charset announced in `Content-Type`.
    pub charset: String,
    /// Value of `Access-Control-Allow-Origin`, when CORS is enabled.
    pub cors_allow_origin: Option<String>,
    /// Honours `X-HTTP-Method-Override`.
    pub method_override: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            development: false,
            default_content_type: DEFAULT_CONTENT_TYPE.to_string(),
            charset: DEFAULT_CHARSET.to_string(),
            cors_allow_origin: None,
            method_override: true,
        }
    }
}
