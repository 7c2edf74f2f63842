//! Subscriber configuration: endpoints, credentials, topic list, and timing.

use std::time::Duration;

use url::Url;

use crate::Error;

pub const ENV_API_KEY: &str = "API_KEY";
pub const ENV_TOKEN_SERVER_URL: &str = "TOKEN_SERVER_URL";
pub const ENV_WEBSOCKET_SERVER_URL: &str = "WEBSOCKET_SERVER_URL";
pub const ENV_TOPIC_IDS: &str = "TOPIC_IDS";

/// Topic identifiers subscribed to when none are configured.
pub const DEFAULT_TOPIC_IDS: &[&str] = &["25", "22", "2442", "3812", "35006", "42685", "41289"];

pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
pub(crate) const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub(crate) const JOIN_TIMEOUT: Duration = Duration::from_secs(30);
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Timeouts and buffer sizes. Defaults suit production; tests shrink them.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingConfig {
    /// Timeout for the token request.
    pub http_timeout: Duration,
    /// Timeout for the websocket handshake.
    pub connect_timeout: Duration,
    /// Maximum wait for the join reply.
    pub join_timeout: Duration,
    /// Interval for `phoenix` heartbeats while streaming. `None` disables them.
    pub heartbeat_interval: Option<Duration>,
    /// Capacity of the event channel handed to the consumer.
    pub event_channel_capacity: usize,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            http_timeout: HTTP_TIMEOUT,
            connect_timeout: CONNECT_TIMEOUT,
            join_timeout: JOIN_TIMEOUT,
            heartbeat_interval: None,
            event_channel_capacity: EVENT_CHANNEL_CAPACITY,
        }
    }
}

/// Everything a session needs, built once at startup.
#[derive(Clone, PartialEq)]
pub struct SubscriberConfig {
    pub api_key: String,
    /// Base URL of the token service (e.g. `https://tokens.example.com`).
    pub token_server_url: String,
    /// Websocket endpoint (`ws://` or `wss://`).
    pub websocket_server_url: String,
    /// Topic identifiers sent in the subscribe frame, in order.
    pub topic_ids: Vec<String>,
    /// Fail the session when the join reply is not a recognizable `phx_reply`.
    pub strict_join: bool,
    pub timing: TimingConfig,
}

impl std::fmt::Debug for SubscriberConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberConfig")
            .field("api_key", &"<redacted>")
            .field("token_server_url", &self.token_server_url)
            .field("websocket_server_url", &self.websocket_server_url)
            .field("topic_ids", &self.topic_ids)
            .field("strict_join", &self.strict_join)
            .field("timing", &self.timing)
            .finish()
    }
}

impl SubscriberConfig {
    pub fn new(
        api_key: impl Into<String>,
        token_server_url: impl Into<String>,
        websocket_server_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            token_server_url: token_server_url.into(),
            websocket_server_url: websocket_server_url.into(),
            topic_ids: DEFAULT_TOPIC_IDS.iter().map(|s| s.to_string()).collect(),
            strict_join: false,
            timing: TimingConfig::default(),
        }
    }

    /// Build from the process environment and validate.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup and validate.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::Configuration(format!("{name} is required but not set")))
        };
        let mut config = Self::new(
            required(ENV_API_KEY)?,
            required(ENV_TOKEN_SERVER_URL)?,
            required(ENV_WEBSOCKET_SERVER_URL)?,
        );
        if let Some(ids) = lookup(ENV_TOPIC_IDS) {
            config.topic_ids = parse_topic_ids(&ids);
        }
        config.validate()?;
        Ok(config)
    }

    /// Check every value before any network call is made.
    pub fn validate(&self) -> Result<(), Error> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Configuration("api key is empty".to_string()));
        }
        check_url(&self.token_server_url, "token server url", &["http", "https"])?;
        check_url(&self.websocket_server_url, "websocket server url", &["ws", "wss"])?;
        if self.topic_ids.is_empty() {
            return Err(Error::Configuration("topic list is empty".to_string()));
        }
        if self.timing.heartbeat_interval.is_some_and(|d| d.is_zero()) {
            return Err(Error::Configuration(
                "heartbeat interval must be positive".to_string(),
            ));
        }
        if self.timing.event_channel_capacity == 0 {
            return Err(Error::Configuration(
                "event channel capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Split a comma-separated topic list, dropping blanks and keeping order.
pub fn parse_topic_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn check_url(raw: &str, label: &str, schemes: &[&str]) -> Result<(), Error> {
    let url = Url::parse(raw).map_err(|e| Error::Configuration(format!("{label} {raw:?}: {e}")))?;
    if !schemes.contains(&url.scheme()) {
        return Err(Error::Configuration(format!(
            "{label} must use one of {schemes:?}, got {}",
            url.scheme()
        )));
    }
    Ok(())
}
