use std::time::Duration;

use clap::Parser;
use phx_subscriber::config::{
    ENV_API_KEY, ENV_TOKEN_SERVER_URL, ENV_TOPIC_IDS, ENV_WEBSOCKET_SERVER_URL,
};
use phx_subscriber::{ReconnectPolicy, SubscriberConfig};

use crate::error::ListenResult;

const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 40;

#[derive(Parser, Debug)]
#[command(name = "phx-listen", version)]
/// Join a channel, subscribe to topic ids, and print every update to stdout
pub struct Cli {
    /// API key for the token request and the channel topic
    #[arg(long, env = ENV_API_KEY, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the token service
    #[arg(long, env = ENV_TOKEN_SERVER_URL)]
    pub token_server_url: Option<String>,

    /// Websocket endpoint of the channel server
    #[arg(long, env = ENV_WEBSOCKET_SERVER_URL)]
    pub websocket_server_url: Option<String>,

    /// Topic ids to subscribe to (repeat or comma-separate)
    #[arg(long = "topic", env = ENV_TOPIC_IDS, value_delimiter = ',')]
    pub topics: Vec<String>,

    /// Fail when the join reply is not a recognizable phx_reply
    #[arg(long)]
    pub strict_join: bool,

    /// Send heartbeats on this interval while streaming
    #[arg(long, value_name = "SECS")]
    pub heartbeat_secs: Option<u64>,

    /// Start a fresh session with backoff when one ends
    #[arg(long)]
    pub reconnect: bool,

    /// Consecutive failed sessions before giving up (0 = never)
    #[arg(long, default_value_t = DEFAULT_MAX_RECONNECT_ATTEMPTS, requires = "reconnect")]
    pub max_reconnect_attempts: u32,
}

impl Cli {
    pub fn reconnect_policy(&self) -> Option<ReconnectPolicy> {
        self.reconnect.then(|| ReconnectPolicy {
            max_attempts: self.max_reconnect_attempts,
            ..ReconnectPolicy::default()
        })
    }

    /// Resolve flags (with env fallbacks already applied by clap) into a
    /// validated config.
    pub fn to_config(&self) -> ListenResult<SubscriberConfig> {
        let topics = self.topics.join(",");
        let mut config = SubscriberConfig::from_lookup(|name| match name {
            ENV_API_KEY => self.api_key.clone(),
            ENV_TOKEN_SERVER_URL => self.token_server_url.clone(),
            ENV_WEBSOCKET_SERVER_URL => self.websocket_server_url.clone(),
            ENV_TOPIC_IDS if !self.topics.is_empty() => Some(topics.clone()),
            _ => None,
        })?;
        config.strict_join = self.strict_join;
        config.timing.heartbeat_interval = self.heartbeat_secs.map(Duration::from_secs);
        config.validate()?;
        Ok(config)
    }
}
