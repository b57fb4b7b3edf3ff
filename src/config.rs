//! Configuration loading and constants.
//!
//! Service settings come from the process environment only and are resolved
//! once at startup, then shared read-only with handlers. An optional TOML file
//! carries logging settings.
//! `AppConfig` is the root configuration struct containing all settings.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

// =============================================================================
// Environment Variables
// =============================================================================

/// Service identity in `name[:version]` form
pub const SERVICE_IDENTITY_VAR: &str = "SERVICE_IDENTITY";

/// Opaque host or container identifier
pub const HOST_IDENTIFIER_VAR: &str = "HOST_IDENTIFIER";

/// Listening port
pub const LISTEN_PORT_VAR: &str = "LISTEN_PORT";

/// Log output format (text or json)
pub const LOG_FORMAT_VAR: &str = "LOG_FORMAT";

// =============================================================================
// Response Constants
// =============================================================================

/// Version reported when the service identity carries no version
pub const UNVERSIONED: &str = "UNVERSIONED";

/// Body returned by the liveness probe
pub const HEALTHY_MESSAGE: &str = "Helloworld is healthy";

/// Identity and liveness answers must always come from the live instance
pub const CACHE_CONTROL_NO_STORE: &str = "no-store";

// =============================================================================
// Server Defaults
// =============================================================================

/// Bind address; the service always listens on all interfaces
pub const BIND_HOST: Ipv4Addr = Ipv4Addr::UNSPECIFIED;

/// How long in-flight requests may run after a shutdown signal
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "helloworld=info,tower_http=info";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP server configuration
    pub http: HttpServerConfig,
    /// Identity reported by `/hello`
    pub service: ServiceConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub port: u16,
}

impl HttpServerConfig {
    /// Socket address to bind: all interfaces on the configured port.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((BIND_HOST, self.port))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub identity: ServiceIdentity,
    pub host_identifier: Option<String>,
}

impl ServiceConfig {
    /// Host identifier as echoed to clients. Absent renders as empty.
    pub fn host_identifier(&self) -> &str {
        self.host_identifier.as_deref().unwrap_or("")
    }
}

/// A service identity of the form `name` or `name:version`.
///
/// Only a value that splits on `:` into exactly two parts carries a version.
/// `a:b:c` is treated as unversioned, with `a` as the name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceIdentity {
    pub name: String,
    pub version: Option<String>,
}

impl ServiceIdentity {
    pub fn parse(raw: &str) -> Self {
        let parts: Vec<&str> = raw.split(':').collect();
        match parts.as_slice() {
            [name, version] => Self {
                name: name.to_string(),
                version: Some(version.to_string()),
            },
            _ => Self {
                name: parts.first().copied().unwrap_or_default().to_string(),
                version: None,
            },
        }
    }

    /// Version string reported to clients
    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or(UNVERSIONED)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::Validation(format!(
                "unknown log format '{}', expected 'text' or 'json'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for LogFormat {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

/// On-disk configuration. Identity, host and port are read from the
/// environment only, so the file rejects any section but `[logging]`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    logging: LoggingConfig,
}

impl AppConfig {
    /// Resolve configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::resolve(FileConfig::default(), lookup)
    }

    /// Load an optional TOML file and overlay the process environment.
    ///
    /// Values that are not valid UTF-8 are kept, with invalid sequences replaced.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, env_lookup)
    }

    /// Load an optional TOML file and read service settings from `lookup`.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)?;
                toml::from_str(&contents)?
            }
            None => FileConfig::default(),
        };
        Self::resolve(file, lookup)
    }

    fn resolve<F>(file: FileConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup(LISTEN_PORT_VAR) {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort { value })?,
            None => return Err(ConfigError::MissingPort),
        };

        let raw_identity = lookup(SERVICE_IDENTITY_VAR).unwrap_or_default();
        let host_identifier = lookup(HOST_IDENTIFIER_VAR);

        let format = match lookup(LOG_FORMAT_VAR) {
            Some(value) => value.parse::<LogFormat>()?,
            None => file.logging.format,
        };

        Ok(Self {
            http: HttpServerConfig { port },
            service: ServiceConfig {
                identity: ServiceIdentity::parse(&raw_identity),
                host_identifier,
            },
            logging: LoggingConfig { format },
        })
    }
}

/// Read a process environment variable, keeping non-UTF-8 values.
fn env_lookup(key: &str) -> Option<String> {
    std::env::var_os(key).map(|value| value.to_string_lossy().into_owned())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("No listening port configured: set LISTEN_PORT")]
    MissingPort,
    #[error("Invalid port in LISTEN_PORT: '{value}' is not a number between 0 and 65535")]
    InvalidPort { value: String },
    #[error("Configuration error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_identity_with_version() {
        let identity = ServiceIdentity::parse("hello:1.2.3");
        assert_eq!(identity.name, "hello");
        assert_eq!(identity.version(), "1.2.3");
    }

    #[test]
    fn test_identity_without_version() {
        let identity = ServiceIdentity::parse("hello");
        assert_eq!(identity.name, "hello");
        assert_eq!(identity.version(), UNVERSIONED);
    }

    #[test]
    fn test_identity_empty() {
        assert_eq!(ServiceIdentity::parse("").version(), UNVERSIONED);
    }

    #[test]
    fn test_identity_multiple_colons_is_unversioned() {
        let identity = ServiceIdentity::parse("hello:1.0:extra");
        assert_eq!(identity.name, "hello");
        assert_eq!(identity.version(), UNVERSIONED);
    }

    #[test]
    fn test_identity_trailing_colon_has_empty_version() {
        assert_eq!(ServiceIdentity::parse("hello:").version(), "");
    }

    #[test]
    fn test_from_lookup_primary_names() {
        let config = AppConfig::from_lookup(vars(&[
            ("SERVICE_IDENTITY", "hello:v2"),
            ("HOST_IDENTIFIER", "pod-42"),
            ("LISTEN_PORT", "5000"),
        ]))
        .unwrap();

        assert_eq!(config.http.port, 5000);
        assert_eq!(config.service.identity.version(), "v2");
        assert_eq!(config.service.host_identifier(), "pod-42");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert_eq!(config.http.socket_addr().to_string(), "0.0.0.0:5000");
    }

    #[test]
    fn test_other_platform_variables_are_ignored() {
        let config = AppConfig::from_lookup(vars(&[
            ("A8_SERVICE", "hello:9"),
            ("HOSTNAME", "buildbox"),
            ("LISTEN_PORT", "8080"),
        ]))
        .unwrap();

        assert_eq!(config.service.identity.version(), UNVERSIONED);
        assert_eq!(config.service.host_identifier, None);
    }

    #[test]
    fn test_port_variable_does_not_replace_listen_port() {
        let err = AppConfig::from_lookup(vars(&[("PORT", "8080")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingPort));
    }

    #[test]
    fn test_empty_host_is_kept() {
        let config =
            AppConfig::from_lookup(vars(&[("LISTEN_PORT", "1"), ("HOST_IDENTIFIER", "")])).unwrap();
        assert_eq!(config.service.host_identifier.as_deref(), Some(""));
    }

    #[test]
    fn test_missing_host_renders_empty() {
        let config = AppConfig::from_lookup(vars(&[("LISTEN_PORT", "5000")])).unwrap();
        assert_eq!(config.service.host_identifier, None);
        assert_eq!(config.service.host_identifier(), "");
        assert_eq!(config.service.identity.version(), UNVERSIONED);
    }

    #[test]
    fn test_missing_port_is_an_error() {
        let err = AppConfig::from_lookup(vars(&[("SERVICE_IDENTITY", "hello:1")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingPort));
    }

    #[test]
    fn test_non_numeric_port_is_an_error() {
        let err = AppConfig::from_lookup(vars(&[("LISTEN_PORT", "http")])).unwrap_err();
        match err {
            ConfigError::InvalidPort { value } => {
                assert_eq!(value, "http");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range_port_is_an_error() {
        let err = AppConfig::from_lookup(vars(&[("LISTEN_PORT", "70000")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort { .. }));
    }

    #[test]
    fn test_log_format_from_env() {
        let config =
            AppConfig::from_lookup(vars(&[("LISTEN_PORT", "1"), ("LOG_FORMAT", "JSON")])).unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);

        let err = AppConfig::from_lookup(vars(&[("LISTEN_PORT", "1"), ("LOG_FORMAT", "xml")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_file_sets_log_format() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nformat = \"json\"").unwrap();

        let config =
            AppConfig::load_with(Some(file.path()), vars(&[("LISTEN_PORT", "7000")])).unwrap();
        assert_eq!(config.http.port, 7000);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_log_format_case_matches_between_file_and_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nformat = \"JSON\"").unwrap();

        let from_file =
            AppConfig::load_with(Some(file.path()), vars(&[("LISTEN_PORT", "1")])).unwrap();
        let from_env =
            AppConfig::from_lookup(vars(&[("LISTEN_PORT", "1"), ("LOG_FORMAT", "JSON")])).unwrap();
        assert_eq!(from_file.logging.format, LogFormat::Json);
        assert_eq!(from_env.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_env_log_format_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nformat = \"json\"").unwrap();

        let config = AppConfig::load_with(
            Some(file.path()),
            vars(&[("LISTEN_PORT", "7100"), ("LOG_FORMAT", "text")]),
        )
        .unwrap();
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_file_cannot_supply_port() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[http]\nport = 7000").unwrap();

        let err = AppConfig::load_with(Some(file.path()), vars(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_env_value_is_kept() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let key = "HELLOWORLD_TEST_NON_UTF8_HOST";
        std::env::set_var(key, OsStr::from_bytes(b"pod-\xff-1"));
        let value = env_lookup(key);
        std::env::remove_var(key);

        assert_eq!(value.as_deref(), Some("pod-\u{fffd}-1"));
        assert_eq!(env_lookup("HELLOWORLD_TEST_UNSET_VARIABLE"), None);
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load_with(
            Some(Path::new("/nonexistent/helloworld.toml")),
            vars(&[("LISTEN_PORT", "1")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nformat = \"xml\"").unwrap();

        let err =
            AppConfig::load_with(Some(file.path()), vars(&[("LISTEN_PORT", "1")])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
