//! Shared configuration for the Conveyor dispatcher and its command-line
//! front end.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, then a
//! configuration file (`--config-path` or `CONVEYOR_CONFIG_PATH`), then
//! `CONVEYOR_*` environment variables, then command-line flags.

use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;
mod settings;

pub use defaults::{
    DEFAULT_BACKEND_HOST, DEFAULT_BACKEND_PORT, DEFAULT_CONNECT_TIMEOUT, DEFAULT_IDLE_WAKEUP,
    DEFAULT_LOG_FILTER, default_backend_host, default_backend_port, default_connect_timeout_ms,
    default_connection_settings, default_idle_wakeup_ms, default_log_filter,
    default_log_filter_string, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use settings::{ConnectionSettings, SettingsParseError};

/// Resolved configuration shared by the library and the binary.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, OrthoConfig)]
#[ortho_config(prefix = "CONVEYOR")]
pub struct Config {
    /// Host name or address of the execution backend.
    #[serde(default = "default_backend_host")]
    pub backend_host: String,
    /// TCP port of the execution backend.
    #[serde(default = "default_backend_port")]
    pub backend_port: u16,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
    /// Upper bound on a single idle wait of the dispatch worker, in milliseconds.
    #[serde(default = "default_idle_wakeup_ms")]
    pub idle_wakeup_ms: u64,
    /// Upper bound on establishing a backend connection, in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// File receiving raw responses that fail to decode.
    #[serde(default)]
    pub response_dump_path: Option<Utf8PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_host: default_backend_host(),
            backend_port: default_backend_port(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            idle_wakeup_ms: default_idle_wakeup_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            response_dump_path: None,
        }
    }
}

impl Config {
    /// Backend address assembled from the host and port fields.
    #[must_use]
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings::new(self.backend_host.clone(), self.backend_port)
    }

    /// Filter expression for the tracing subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format for the tracing subscriber.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Idle wake-up interval of the dispatch worker.
    ///
    /// A zero value is raised to one millisecond so the worker never spins.
    #[must_use]
    pub fn idle_wakeup(&self) -> Duration {
        Duration::from_millis(self.idle_wakeup_ms.max(1))
    }

    /// Connect timeout for backend exchanges.
    ///
    /// A zero value is raised to one millisecond; `std` rejects zero timeouts.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.max(1))
    }

    /// Destination for undecodable responses, if capture is enabled.
    #[must_use]
    pub fn response_dump_path(&self) -> Option<&camino::Utf8Path> {
        self.response_dump_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_backend() {
        let config = Config::default();
        assert_eq!(
            config.connection_settings(),
            ConnectionSettings::new("127.0.0.1", DEFAULT_BACKEND_PORT)
        );
        assert_eq!(config.idle_wakeup(), DEFAULT_IDLE_WAKEUP);
        assert_eq!(config.connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
        assert!(config.response_dump_path().is_none());
    }

    #[test]
    fn zero_intervals_are_clamped() {
        let config = Config {
            idle_wakeup_ms: 0,
            connect_timeout_ms: 0,
            ..Config::default()
        };
        assert_eq!(config.idle_wakeup(), Duration::from_millis(1));
        assert_eq!(config.connect_timeout(), Duration::from_millis(1));
    }
}
