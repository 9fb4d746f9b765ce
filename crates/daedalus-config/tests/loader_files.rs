//! Loading configuration files from disk.

use std::io::Write;

use daedalus_config::{ConfigError, ConfigLoader};
use daedalus_telemetry::LogFormat;
use tempfile::NamedTempFile;

fn file(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_toml_file() {
    let file = file(
        ".toml",
        r#"
        [server]
        development = true
        cors_allow_origin = "*"

        [slicing]
        maximum_limit = 100
        default_limit = 20

        [[gateway.gateways]]
        Pattern = "^/api/(.*)$"
        Methods = ["GET"]
        Navigate = "{1}"

        [logging]
        level = "debug"
        format = "compact"
        "#,
    );

    let config = ConfigLoader::new().with_defaults().with_file(file.path()).unwrap().load().unwrap();
    assert!(config.server.development);
    assert_eq!(config.server.charset, "UTF-8");
    assert_eq!(config.slicing.maximum_limit, Some(100));
    assert_eq!(config.gateway.gateways.len(), 1);
    assert_eq!(config.gateway.gateways[0].methods, ["GET"]);
    assert_eq!(config.logging.format, LogFormat::Compact);
    assert!(config.logging.include_target);
}

#[test]
fn test_json_file() {
    let file = file(".json", r#"{"decoding": {"separator": "_"}}"#);
    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
    assert_eq!(config.decoding.separator, "_");
    assert_eq!(config.assembler_settings().decoding.separator, "_");
}

#[test]
fn test_unsupported_extension() {
    let file = file(".yaml", "server: {}");
    let err = ConfigLoader::new().with_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat(extension) if extension == "yaml"));
}

#[test]
fn test_invalid_values_fail_on_load() {
    let file = file(".toml", "[slicing]\nmaximum_limit = 10\ndefault_limit = 50\n");
    let err = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap_err();
    assert!(matches!(err, ConfigError::Setting { setting: "slicing.default_limit", .. }));
}

#[test]
fn test_invalid_gateway_fails_on_load() {
    let file = file(".toml", "[[gateway.gateways]]\nPattern = \"^/api/(.*$\"\n");
    let err = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap_err();
    assert!(matches!(err, ConfigError::Gateways { ref origin, .. } if origin == "gateway.gateways"));
    assert!(err.to_string().contains("^/api/(.*$"));
}

#[test]
fn test_malformed_toml() {
    let file = file(".toml", "[slicing\nmaximum_limit = ");
    let err = ConfigLoader::new().with_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));
}

#[test]
fn test_authorized_section() {
    let file = file(".toml", "[gateway.authorized]\nheader = \"X-Token\"\n");
    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
    let authorized = config.gateway.authorized.unwrap();
    assert_eq!(authorized.header, "X-Token");
    assert_eq!(authorized.idle_seconds, 60);
}
