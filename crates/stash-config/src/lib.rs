//! Shared configuration for the `stash` client and `stashd` daemon.
//!
//! Both binaries must agree on the socket location, the runtime artefact
//! layout next to it, and the idle-timeout grammar, so the types live in one
//! crate. Configuration is resolved in layers: built-in defaults, then
//! environment variables, then explicit command-line overrides.

mod defaults;
mod idle;
mod logging;
mod runtime;
mod socket;

use std::env;

use thiserror::Error;

pub use idle::{IdleTimeout, IdleTimeoutParseError};
pub use logging::LogFormat;
pub use runtime::{RuntimePaths, RuntimePathsError};
pub use socket::{SocketPath, SocketPreparationError};

/// Environment variable naming the daemon socket path.
pub const SOCKET_ENV_VAR: &str = "STASH_SOCKET";
/// Environment variable holding the log filter expression.
pub const LOG_FILTER_ENV_VAR: &str = "STASH_LOG_FILTER";
/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV_VAR: &str = "STASH_LOG_FORMAT";
/// Environment variable holding the daemon idle timeout.
pub const IDLE_TIMEOUT_ENV_VAR: &str = "STASH_IDLE_TIMEOUT";

/// Resolved configuration shared by the client and daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path of the Unix socket the daemon listens on.
    pub socket: SocketPath,
    /// Filter expression consumed by `tracing_subscriber::EnvFilter`.
    pub log_filter: String,
    /// Output format for daemon logs.
    pub log_format: LogFormat,
    /// Inactivity window after which the daemon exits.
    pub idle_timeout: IdleTimeout,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket: defaults::default_socket_path(),
            log_filter: defaults::DEFAULT_LOG_FILTER.to_owned(),
            log_format: LogFormat::default(),
            idle_timeout: IdleTimeout::default(),
        }
    }
}

/// Command-line overrides applied on top of defaults and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Overrides the socket path.
    pub socket: Option<SocketPath>,
    /// Overrides the log filter expression.
    pub log_filter: Option<String>,
    /// Overrides the log format.
    pub log_format: Option<LogFormat>,
    /// Overrides the idle timeout.
    pub idle_timeout: Option<IdleTimeout>,
}

/// Errors raised while resolving configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The log format environment value did not parse.
    #[error("invalid {LOG_FORMAT_ENV_VAR} value '{value}'")]
    LogFormat { value: String },
    /// The idle timeout environment value did not parse.
    #[error("invalid {IDLE_TIMEOUT_ENV_VAR} value '{value}': {source}")]
    IdleTimeout {
        value: String,
        #[source]
        source: IdleTimeoutParseError,
    },
}

impl Config {
    /// Resolves configuration from defaults, the environment, and overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an environment variable is present but
    /// malformed; unset variables fall through to the defaults.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = env_string(SOCKET_ENV_VAR) {
            config.socket = SocketPath::new(value);
        }
        if let Some(value) = env_string(LOG_FILTER_ENV_VAR) {
            config.log_filter = value;
        }
        if let Some(value) = env_string(LOG_FORMAT_ENV_VAR) {
            config.log_format = value
                .parse()
                .map_err(|_| ConfigError::LogFormat { value })?;
        }
        if let Some(value) = env_string(IDLE_TIMEOUT_ENV_VAR) {
            config.idle_timeout = value
                .parse()
                .map_err(|source| ConfigError::IdleTimeout { value, source })?;
        }

        if let Some(socket) = &overrides.socket {
            config.socket = socket.clone();
        }
        if let Some(log_filter) = &overrides.log_filter {
            config.log_filter = log_filter.clone();
        }
        if let Some(log_format) = overrides.log_format {
            config.log_format = log_format;
        }
        if let Some(idle_timeout) = overrides.idle_timeout {
            config.idle_timeout = idle_timeout;
        }

        Ok(config)
    }

    /// Path of the daemon socket.
    #[must_use]
    pub fn socket(&self) -> &SocketPath {
        &self.socket
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Idle timeout for the daemon.
    #[must_use]
    pub fn idle_timeout(&self) -> IdleTimeout {
        self.idle_timeout
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
