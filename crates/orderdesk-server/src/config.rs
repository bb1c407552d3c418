//! Server configuration loading from file and environment variables.

use orderdesk_agent::{AgentConfig, LiveKitConfig};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// LiveKit credentials. Join tokens are disabled when unset.
    #[serde(default)]
    pub livekit: LiveKitConfig,

    /// Agent persona and voice pipeline settings.
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "orderdesk_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    5001
}

fn default_db_path() -> String {
    "conversations.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `ORDERDESK_HOST` overrides `server.host`
/// - `ORDERDESK_PORT` overrides `server.port`
/// - `ORDERDESK_DB_PATH` overrides `database.path`
/// - `ORDERDESK_LOG_LEVEL` overrides `logging.level`
/// - `ORDERDESK_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `LIVEKIT_URL`, `LIVEKIT_API_KEY`, `LIVEKIT_API_SECRET` override `livekit.*`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies overrides from `lookup`, which maps a variable name to its value.
pub fn apply_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("ORDERDESK_HOST") {
        match host.parse() {
            Ok(parsed) => config.server.host = parsed,
            Err(_) => tracing::warn!(value = %host, "ignoring invalid ORDERDESK_HOST"),
        }
    }
    if let Some(port) = lookup("ORDERDESK_PORT") {
        match port.parse() {
            Ok(parsed) => config.server.port = parsed,
            Err(_) => tracing::warn!(value = %port, "ignoring invalid ORDERDESK_PORT"),
        }
    }
    if let Some(db_path) = lookup("ORDERDESK_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = lookup("ORDERDESK_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("ORDERDESK_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(url) = lookup("LIVEKIT_URL") {
        config.livekit.url = url;
    }
    if let Some(key) = lookup("LIVEKIT_API_KEY") {
        config.livekit.api_key = key;
    }
    if let Some(secret) = lookup("LIVEKIT_API_SECRET") {
        config.livekit.api_secret = secret;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_match_the_conversation_api() {
        let config = Config::default();
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.database.path, "conversations.db");
        assert_eq!(config.logging.level, "info");
        assert!(!config.livekit.is_configured());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("absent.toml");
        let config = load_config(path.to_str()).expect("missing file is not an error");
        assert_eq!(config.database.pool_max_size, 8);
    }

    #[test]
    fn file_sections_are_parsed() {
        let mut file = tempfile::NamedTempFile::new().expect("should create temp file");
        writeln!(
            file,
            r#"
[server]
host = "0.0.0.0"
port = 8080

[database]
path = "/tmp/calls.db"
pool_max_size = 2

[livekit]
url = "wss://example.livekit.cloud"
api_key = "key"
api_secret = "secret"

[agent]
greeting = "お電話ありがとうございます"
"#
        )
        .expect("should write config");

        let path = file.path().to_str().expect("utf-8 path");
        let mut config: Config =
            toml::from_str(&std::fs::read_to_string(path).expect("should read back"))
                .expect("should parse");
        apply_overrides(&mut config, |_| None);

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.path, "/tmp/calls.db");
        assert_eq!(config.database.pool_max_size, 2);
        assert_eq!(config.database.busy_timeout_ms, 5_000);
        assert!(config.livekit.is_configured());
        assert_eq!(config.livekit.token_ttl_seconds, 3600);
        assert_eq!(config.agent.greeting, "お電話ありがとうございます");
        assert_eq!(config.agent.llm_model, "gpt-4o-mini");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().expect("should create temp file");
        writeln!(file, "[server\nport = ").expect("should write config");
        let err = load_config(file.path().to_str()).expect_err("should fail");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn overrides_replace_file_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("ORDERDESK_PORT", "6000"),
            ("ORDERDESK_DB_PATH", "override.db"),
            ("ORDERDESK_LOG_JSON", "1"),
            ("ORDERDESK_HOST", "not-an-ip"),
            ("LIVEKIT_URL", "ws://localhost:7880"),
            ("LIVEKIT_API_KEY", "devkey"),
            ("LIVEKIT_API_SECRET", "devsecret"),
        ]);
        let mut config = Config::default();
        apply_overrides(&mut config, |key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 6000);
        assert_eq!(config.server.host, default_host());
        assert_eq!(config.database.path, "override.db");
        assert!(config.logging.json);
        assert!(config.livekit.is_configured());
    }
}
