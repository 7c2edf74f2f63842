//! Public entry point: [`subscribe`] and [`Subscription`].

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::SubscriberConfig;
use crate::session::SubscriptionSession;
use crate::token::TokenProvider;
use crate::transport::{Connector, WsConnector};
use crate::types::{Error, Event, SessionEnd};

/// Handle to a running session.
///
/// Call [`next`](Subscription::next) to receive events and
/// [`finish`](Subscription::finish) to learn how the session ended. Dropping
/// the handle cancels the session.
pub struct Subscription {
    rx: mpsc::Receiver<Event>,
    cancel: CancellationToken,
    task: Option<JoinHandle<Result<SessionEnd, Error>>>,
}

impl Subscription {
    /// Receive the next event. Returns `None` once the session has ended.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Ask the session to stop. Teardown happens in the background task.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this session when triggered.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the session to end and return its outcome.
    ///
    /// Pending events are discarded, so drain [`next`](Subscription::next)
    /// first if they matter.
    pub async fn finish(mut self) -> Result<SessionEnd, Error> {
        self.rx.close();
        let Some(task) = self.task.take() else {
            return Err(Error::Protocol("session already finished".to_string()));
        };
        task.await.map_err(|e| Error::Stream {
            message: format!("session task failed: {e}"),
            source: None,
        })?
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Fetch a token, connect, join, and subscribe in a background task.
///
/// Configuration and token errors are returned here, before any connection
/// is attempted. Everything after that surfaces through [`Subscription`].
pub async fn subscribe(config: SubscriberConfig) -> Result<Subscription, Error> {
    subscribe_with(config, WsConnector).await
}

/// [`subscribe`] with a custom transport.
pub async fn subscribe_with<C>(
    config: SubscriberConfig,
    connector: C,
) -> Result<Subscription, Error>
where
    C: Connector + 'static,
{
    config.validate()?;
    let tokens = TokenProvider::new(config.token_server_url.clone(), &config.timing)?;
    let token = tokens.fetch(&config.api_key).await?;

    let (event_tx, event_rx) = mpsc::channel::<Event>(config.timing.event_channel_capacity);
    let cancel = CancellationToken::new();
    let mut session = SubscriptionSession::new(&config);

    let task = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            // Failures are returned through `finish`; the caller reports them.
            let result = session.run(&connector, &token, &event_tx, &cancel).await;
            if let Ok(end) = &result {
                tracing::debug!(?end, "session task finished");
            }
            result
        }
    });

    Ok(Subscription {
        rx: event_rx,
        cancel,
        task: Some(task),
    })
}
