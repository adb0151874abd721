use std::time::Duration;

use crate::logging::LogFormat;
use crate::settings::ConnectionSettings;

/// Default backend host.
pub const DEFAULT_BACKEND_HOST: &str = "127.0.0.1";

/// Default backend TCP port.
pub const DEFAULT_BACKEND_PORT: u16 = 3852;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default upper bound on a single idle wait of the dispatch worker.
pub const DEFAULT_IDLE_WAKEUP: Duration = Duration::from_millis(1000);

/// Default bound on establishing a backend connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default backend address.
#[must_use]
pub fn default_connection_settings() -> ConnectionSettings {
    ConnectionSettings::new(DEFAULT_BACKEND_HOST, DEFAULT_BACKEND_PORT)
}

/// Owned backend host used where allocation is required (e.g. serde).
#[must_use]
pub fn default_backend_host() -> String {
    DEFAULT_BACKEND_HOST.to_owned()
}

/// Default backend port (serde helper).
#[must_use]
pub const fn default_backend_port() -> u16 {
    DEFAULT_BACKEND_PORT
}

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default idle wake-up interval in milliseconds (serde helper).
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "the default interval is a small compile-time constant"
)]
pub const fn default_idle_wakeup_ms() -> u64 {
    DEFAULT_IDLE_WAKEUP.as_millis() as u64
}

/// Default connect timeout in milliseconds (serde helper).
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "the default timeout is a small compile-time constant"
)]
pub const fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_millis() as u64
}
