use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Address of the remote execution backend.
///
/// Settings are read once per exchange attempt, so a value swapped in while a
/// request is in flight only affects the next request.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct ConnectionSettings {
    /// Host name or IP address of the backend.
    pub host: String,
    /// TCP port the backend listens on.
    pub port: u16,
}

impl ConnectionSettings {
    /// Builds settings for the given host and port.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host name or IP address of the backend.
    #[must_use]
    pub fn host(&self) -> &str {
        self.host.as_str()
    }

    /// TCP port of the backend.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ConnectionSettings {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "tcp://{}:{}", self.host, self.port)
    }
}

impl FromStr for ConnectionSettings {
    type Err = SettingsParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input)?;
        if url.scheme() != "tcp" {
            return Err(SettingsParseError::UnsupportedScheme(
                url.scheme().to_owned(),
            ));
        }
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| SettingsParseError::MissingHost(input.to_owned()))?;
        let port = url
            .port()
            .ok_or_else(|| SettingsParseError::MissingPort(input.to_owned()))?;
        Ok(Self::new(host.trim_start_matches('[').trim_end_matches(']'), port))
    }
}

/// Errors encountered while parsing [`ConnectionSettings`] from text.
#[derive(Debug, Error)]
pub enum SettingsParseError {
    /// Scheme was not `tcp`.
    #[error("unsupported backend scheme '{0}'")]
    UnsupportedScheme(String),
    /// Host name was missing.
    #[error("missing backend host in '{0}'")]
    MissingHost(String),
    /// Port was missing from the address.
    #[error("missing backend port in '{0}'")]
    MissingPort(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}
