//! Optional outer loop that replaces a dead session with a fresh one.
//!
//! Each attempt fetches a new token and builds a new [`SubscriptionSession`];
//! sessions themselves never reconnect.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::SubscriberConfig;
use crate::session::SubscriptionSession;
use crate::token::TokenProvider;
use crate::transport::Connector;
use crate::types::{Error, Event, SessionEnd};

const INITIAL_RETRY_INTERVAL: Duration = Duration::from_secs(1);
const MAX_RETRY_INTERVAL: Duration = Duration::from_secs(15);
const RETRY_JITTER: Duration = Duration::from_secs(1);
const MAX_RETRY_ATTEMPTS: u32 = 40;

/// Bounded exponential backoff between sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Consecutive failed sessions tolerated before giving up. `0` means no limit.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Upper bound of the random delay added to each backoff.
    pub jitter: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRY_ATTEMPTS,
            initial_backoff: INITIAL_RETRY_INTERVAL,
            max_backoff: MAX_RETRY_INTERVAL,
            jitter: RETRY_JITTER,
        }
    }
}

impl ReconnectPolicy {
    /// Backoff before retry `attempt` (1-based), without jitter:
    /// 1s, 2s, 4s, 8s, 15s, 15s, ... with the defaults.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(30);
        self.initial_backoff
            .saturating_mul(1u32 << exp)
            .min(self.max_backoff)
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff(attempt) + jitter(self.jitter)
    }

    fn exhausted(&self, failures: u32) -> bool {
        self.max_attempts > 0 && failures > self.max_attempts
    }
}

/// Subsecond wall-clock nanos as a cheap source of non-deterministic jitter.
fn jitter(max: Duration) -> Duration {
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    if max_ms == 0 {
        return Duration::ZERO;
    }
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as u64;
    Duration::from_millis(nanos % max_ms)
}

/// Run sessions back to back until one ends in a way a new session cannot fix.
///
/// Stops on cancellation, on a dropped consumer, on a non-retriable error
/// (configuration, token rejection, join rejection), or once the policy runs
/// out of attempts. A session that got past the join resets the attempt count.
pub async fn run_with_reconnect<C: Connector>(
    config: &SubscriberConfig,
    connector: &C,
    policy: &ReconnectPolicy,
    events: &mpsc::Sender<Event>,
    cancel: &CancellationToken,
) -> Result<SessionEnd, Error> {
    config.validate()?;
    let tokens = TokenProvider::new(config.token_server_url.clone(), &config.timing)?;
    let mut failures: u32 = 0;

    loop {
        let mut session = SubscriptionSession::new(config);
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
            token = tokens.fetch(&config.api_key) => match token {
                Ok(token) => session.run(connector, &token, events, cancel).await,
                Err(e) => Err(e),
            },
        };

        match &outcome {
            Ok(SessionEnd::Cancelled | SessionEnd::ConsumerGone) => return outcome,
            Err(e) if !e.is_retriable() => return outcome,
            _ => {}
        }

        if session.has_joined() {
            failures = 0;
        }
        failures = failures.saturating_add(1);
        if policy.exhausted(failures) {
            // The final error goes back to the caller, which reports it.
            warn!(attempts = policy.max_attempts, "giving up reconnecting");
            return outcome;
        }
        match &outcome {
            Ok(SessionEnd::Closed { reason }) => {
                warn!(reason = reason.as_deref().unwrap_or(""), "server closed session");
            }
            Err(e) => warn!("session failed: {e}"),
            Ok(_) => {}
        }

        let delay = policy.delay_for_attempt(failures);
        info!(attempt = failures, ?delay, "reconnecting");
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
            () = tokio::time::sleep(delay) => {}
        }
    }
}
