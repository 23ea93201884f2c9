//! Client configuration loaded via OrthoConfig.
//!
//! Every value can come from a config file, `PORTAL_*` environment
//! variables or command-line overrides. Raw values are kept as loaded;
//! accessors apply defaults and validate.

use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::ReconnectPolicy;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api/v1/";
const DEFAULT_NOTIFICATIONS_URL: &str = "ws://localhost:8080/ws/notifications";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

fn default_session_file() -> PathBuf {
    std::env::temp_dir()
        .join("portal-session")
        .join("session.json")
}

/// A configured URL that does not parse or uses the wrong scheme.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {key} `{value}`: {reason}")]
pub struct InvalidUrl {
    /// Setting name.
    pub key: &'static str,
    /// Raw configured value.
    pub value: String,
    /// Parse or scheme failure.
    pub reason: String,
}

/// Settings for the session core and its adapters.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PORTAL")]
pub struct ClientSettings {
    /// Base URL of the REST API; identity endpoints resolve beneath it.
    pub api_base_url: Option<String>,
    /// WebSocket URL of the notification service.
    pub notifications_url: Option<String>,
    /// Location of the persisted session document.
    pub session_file: Option<PathBuf>,
    /// Timeout for identity requests and socket handshakes.
    pub request_timeout_ms: Option<u64>,
    /// Reconnects attempted after a dropped notification connection.
    pub reconnect_max_attempts: Option<u32>,
    /// Delay before the first reconnect.
    pub reconnect_initial_delay_ms: Option<u64>,
    /// Upper bound for any reconnect delay.
    pub reconnect_max_delay_ms: Option<u64>,
}

impl ClientSettings {
    /// Identity API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidUrl`] unless the value is an `http` or `https` URL.
    pub fn api_base_url(&self) -> Result<Url, InvalidUrl> {
        parse_url(
            "api_base_url",
            self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL),
            &["http", "https"],
        )
    }

    /// Notification socket URL.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidUrl`] unless the value is a `ws` or `wss` URL.
    pub fn notifications_url(&self) -> Result<Url, InvalidUrl> {
        parse_url(
            "notifications_url",
            self.notifications_url
                .as_deref()
                .unwrap_or(DEFAULT_NOTIFICATIONS_URL),
            &["ws", "wss"],
        )
    }

    /// Session file path, falling back to a directory under the system temp dir.
    pub fn session_file(&self) -> PathBuf {
        self.session_file
            .clone()
            .unwrap_or_else(default_session_file)
    }

    /// Request and handshake timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(
            self.request_timeout_ms
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
        )
    }

    /// Reconnect policy with unset values taken from [`ReconnectPolicy::default`].
    ///
    /// A maximum delay below the initial delay is raised to match it.
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        let defaults = ReconnectPolicy::default();
        let initial_delay = self
            .reconnect_initial_delay_ms
            .map_or(defaults.initial_delay, Duration::from_millis);
        let max_delay = self
            .reconnect_max_delay_ms
            .map_or(defaults.max_delay, Duration::from_millis);
        ReconnectPolicy {
            max_attempts: self.reconnect_max_attempts.unwrap_or(defaults.max_attempts),
            initial_delay,
            max_delay: max_delay.max(initial_delay),
        }
    }
}

fn parse_url(key: &'static str, value: &str, schemes: &[&str]) -> Result<Url, InvalidUrl> {
    let invalid = |reason: String| InvalidUrl {
        key,
        value: value.to_owned(),
        reason,
    };
    let url = Url::parse(value).map_err(|error| invalid(error.to_string()))?;
    if !schemes.contains(&url.scheme()) {
        return Err(invalid(format!(
            "scheme must be one of {}",
            schemes.join(", ")
        )));
    }
    Ok(url)
}
