//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub log_format: LogFormat,
}

/// General application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Transport the relay speaks on its listening socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// Raw TCP, one UTF-8 line per message
    #[default]
    Tcp,
    /// WebSocket, one text frame per message
    WebSocket,
}

impl TransportKind {
    /// Port used when none is configured
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Tcp => 12345,
            Self::WebSocket => 8765,
        }
    }

    /// URL scheme clients use to reach this transport
    #[must_use]
    pub const fn scheme(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::WebSocket => "ws",
        }
    }
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tcp" | "raw" => Ok(Self::Tcp),
            "websocket" | "ws" => Ok(Self::WebSocket),
            other => Err(ConfigError::InvalidValue("RELAY_TRANSPORT", other.to_string())),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("tcp"),
            Self::WebSocket => f.write_str("websocket"),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Listening endpoint configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub transport: TransportKind,
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// Server config for `transport` on its default endpoint
    #[must_use]
    pub fn for_transport(transport: TransportKind) -> Self {
        Self {
            transport,
            host: default_host(),
            port: transport.default_port(),
        }
    }

    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Per-session behaviour
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound on a single write to one peer
    pub write_timeout_ms: u64,
    /// Close sessions that stay silent this long; unset means never
    pub idle_timeout_secs: Option<u64>,
    /// Longest accepted inbound frame, in bytes
    pub max_frame_len: usize,
    /// Stamp join/leave/chat lines with the local time
    pub timestamps: bool,
}

impl SessionConfig {
    #[must_use]
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    #[must_use]
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            write_timeout_ms: default_write_timeout_ms(),
            idle_timeout_secs: None,
            max_frame_len: default_max_frame_len(),
            timestamps: false,
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "chat-relay".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_write_timeout_ms() -> u64 {
    2000
}

fn default_max_frame_len() -> usize {
    4096
}

impl AppConfig {
    /// Configuration with every default, speaking `transport`
    #[must_use]
    pub fn defaults(transport: TransportKind) -> Self {
        Self {
            app: AppSettings {
                name: default_app_name(),
                env: default_env(),
            },
            server: ServerConfig::for_transport(transport),
            session: SessionConfig::default(),
            log_format: LogFormat::default(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a variable is set to a value that cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    ///
    /// # Errors
    /// Returns an error if a variable is set to a value that cannot be parsed
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let transport = match lookup("RELAY_TRANSPORT") {
            Some(raw) => raw.parse()?,
            None => TransportKind::default(),
        };

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: lookup("APP_ENV")
                    .and_then(|s| match s.to_lowercase().as_str() {
                        "production" => Some(Environment::Production),
                        "staging" => Some(Environment::Staging),
                        "development" => Some(Environment::Development),
                        _ => None,
                    })
                    .unwrap_or_default(),
            },
            server: ServerConfig {
                transport,
                host: lookup("RELAY_HOST").unwrap_or_else(default_host),
                port: parse_var(&lookup, "RELAY_PORT")?.unwrap_or(transport.default_port()),
            },
            session: SessionConfig {
                write_timeout_ms: parse_var(&lookup, "RELAY_WRITE_TIMEOUT_MS")?
                    .unwrap_or_else(default_write_timeout_ms),
                idle_timeout_secs: parse_var(&lookup, "RELAY_IDLE_TIMEOUT_SECS")?,
                max_frame_len: parse_var(&lookup, "RELAY_MAX_FRAME_LEN")?
                    .unwrap_or_else(default_max_frame_len),
                timestamps: parse_var(&lookup, "RELAY_TIMESTAMPS")?.unwrap_or(false),
            },
            log_format: match lookup("LOG_FORMAT").map(|s| s.to_lowercase()).as_deref() {
                None | Some("pretty") => LogFormat::Pretty,
                Some("json") => LogFormat::Json,
                Some(other) => {
                    return Err(ConfigError::InvalidValue("LOG_FORMAT", other.to_string()))
                }
            },
        })
    }
}

/// Parse an optional variable, rejecting values that are set but malformed
fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        None => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
