//! One connection end to end: connect, join, subscribe, stream.

use tokio::sync::mpsc;
use tokio::time::{Instant, Interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::Error;
use crate::config::{SubscriberConfig, TimingConfig};
use crate::protocol::{
    JoinAck, build_heartbeat_msg, build_join_msg, build_subscribe_msg, channel_topic,
    classify_join_reply, encode_msg, is_system_frame,
};
use crate::token::AccessToken;
use crate::transport::{Connector, Inbound, Transport};
use crate::types::{BoxError, Event, SessionEnd, Update};

/// Lifecycle of a [`SubscriptionSession`]. `Closed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Joining,
    AwaitingJoinAck,
    Subscribing,
    Streaming,
    Closed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }
}

enum Step {
    Frame(Result<Inbound, BoxError>),
    Heartbeat,
}

/// Owns one transport connection for its whole life. Not reusable: build a
/// new session (with a fresh token) to reconnect.
pub struct SubscriptionSession {
    topic: String,
    websocket_url: String,
    topic_ids: Vec<String>,
    strict_join: bool,
    timing: TimingConfig,
    state: SessionState,
    joined: bool,
}

impl SubscriptionSession {
    pub fn new(config: &SubscriberConfig) -> Self {
        Self {
            topic: channel_topic(&config.api_key),
            websocket_url: config.websocket_server_url.clone(),
            topic_ids: config.topic_ids.clone(),
            strict_join: config.strict_join,
            timing: config.timing.clone(),
            state: SessionState::Disconnected,
            joined: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the server accepted the join (or the session moved past it).
    pub fn has_joined(&self) -> bool {
        self.joined
    }

    /// Channel topic used for both join and subscribe.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Run the session until the server closes, an error occurs, the consumer
    /// drops `events`, or `cancel` fires.
    ///
    /// The transport is closed exactly once on every path after a successful
    /// connect.
    pub async fn run<C: Connector>(
        &mut self,
        connector: &C,
        token: &AccessToken,
        events: &mpsc::Sender<Event>,
        cancel: &CancellationToken,
    ) -> Result<SessionEnd, Error> {
        if self.state != SessionState::Disconnected {
            return Err(Error::Protocol(format!(
                "session already used (state {:?})",
                self.state
            )));
        }

        self.transition(SessionState::Connecting);
        let connect_timeout = self.timing.connect_timeout;
        let connected = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            r = tokio::time::timeout(connect_timeout, connector.connect(&self.websocket_url)) => Some(r),
        };
        let mut transport = match connected {
            None => {
                info!("cancelled while connecting");
                self.transition(SessionState::Closed);
                return Ok(SessionEnd::Cancelled);
            }
            Some(Err(_)) => {
                self.transition(SessionState::Failed);
                return Err(Error::Connection {
                    message: format!(
                        "connect to {} timed out after {connect_timeout:?}",
                        self.websocket_url
                    ),
                    source: None,
                });
            }
            Some(Ok(Err(e))) => {
                self.transition(SessionState::Failed);
                return Err(e);
            }
            Some(Ok(Ok(transport))) => transport,
        };
        info!(url = %self.websocket_url, "connected");

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!("session cancelled");
                Ok(SessionEnd::Cancelled)
            }
            r = self.drive(&mut transport, token, events) => r,
        };

        transport.close().await;
        self.transition(if result.is_ok() {
            SessionState::Closed
        } else {
            SessionState::Failed
        });
        result
    }

    async fn drive<T: Transport>(
        &mut self,
        transport: &mut T,
        token: &AccessToken,
        events: &mpsc::Sender<Event>,
    ) -> Result<SessionEnd, Error> {
        self.transition(SessionState::Joining);
        let join = encode_msg(&build_join_msg(&self.topic, token.as_str()))?;
        transport
            .send_text(join)
            .await
            .map_err(|e| lost_during_join("send join", e))?;

        self.transition(SessionState::AwaitingJoinAck);
        let join_timeout = self.timing.join_timeout;
        let ack = tokio::time::timeout(join_timeout, self.await_join_ack(transport))
            .await
            .map_err(|_| Error::Handshake(format!("no join reply within {join_timeout:?}")))??;

        let rejection = match &ack {
            JoinAck::Ok { .. } => {
                info!(topic = %self.topic, "channel joined");
                None
            }
            JoinAck::Rejected { reason } => Some(format!("join rejected: {reason}")),
            JoinAck::Unrecognized { raw } if self.strict_join => {
                Some(format!("unrecognized join reply: {raw}"))
            }
            JoinAck::Unrecognized { raw } => {
                warn!(reply = %raw, "join reply not recognized, continuing");
                None
            }
        };
        let consumer_gone = events.send(Event::Joined(ack)).await.is_err();
        if let Some(message) = rejection {
            return Err(Error::Protocol(message));
        }
        if consumer_gone {
            return Ok(SessionEnd::ConsumerGone);
        }

        self.joined = true;
        self.transition(SessionState::Subscribing);
        let subscribe = encode_msg(&build_subscribe_msg(&self.topic, &self.topic_ids))?;
        transport
            .send_text(subscribe)
            .await
            .map_err(|e| Error::stream(format!("send subscribe: {e}"), e))?;
        info!(topics = self.topic_ids.len(), "subscribed, listening for updates");

        self.transition(SessionState::Streaming);
        self.stream(transport, events).await
    }

    /// Take the first text frame after the join as its reply.
    async fn await_join_ack<T: Transport>(&self, transport: &mut T) -> Result<JoinAck, Error> {
        let raw = match transport
            .recv()
            .await
            .map_err(|e| lost_during_join("receive join reply", e))?
        {
            Inbound::Text(text) => text,
            Inbound::Binary(data) => String::from_utf8_lossy(&data).into_owned(),
            Inbound::Closed { reason } => {
                return Err(Error::Handshake(format!(
                    "connection closed before join reply ({})",
                    reason.as_deref().unwrap_or("no reason")
                )));
            }
        };
        debug!(reply = %raw, "join reply received");
        Ok(classify_join_reply(&raw, &self.topic))
    }

    async fn stream<T: Transport>(
        &mut self,
        transport: &mut T,
        events: &mpsc::Sender<Event>,
    ) -> Result<SessionEnd, Error> {
        let mut heartbeat = self
            .timing
            .heartbeat_interval
            .filter(|period| !period.is_zero())
            .map(|period| tokio::time::interval_at(Instant::now() + period, period));
        let mut heartbeat_seq: u64 = 0;
        let mut received: u64 = 0;

        loop {
            let step = tokio::select! {
                frame = transport.recv() => Step::Frame(frame),
                () = next_tick(heartbeat.as_mut()) => Step::Heartbeat,
            };

            let text = match step {
                Step::Heartbeat => {
                    heartbeat_seq += 1;
                    let frame = encode_msg(&build_heartbeat_msg(heartbeat_seq))?;
                    transport
                        .send_text(frame)
                        .await
                        .map_err(|e| Error::stream(format!("send heartbeat: {e}"), e))?;
                    trace!(seq = heartbeat_seq, "heartbeat sent");
                    continue;
                }
                Step::Frame(Ok(Inbound::Text(text))) => text,
                Step::Frame(Ok(Inbound::Binary(data))) => String::from_utf8(data)
                    .map_err(|e| Error::stream(format!("undecodable frame: {e}"), e))?,
                Step::Frame(Ok(Inbound::Closed { reason })) => {
                    info!(received, reason = reason.as_deref().unwrap_or(""), "connection closed");
                    return Ok(SessionEnd::Closed { reason });
                }
                Step::Frame(Err(e)) => {
                    return Err(Error::stream(format!("receive failed: {e}"), e));
                }
            };

            if heartbeat.is_some() && is_system_frame(&text) {
                trace!("heartbeat reply");
                continue;
            }

            received += 1;
            debug!(seq = received, bytes = text.len(), "update received");
            if events.send(Event::Update(Update::new(text))).await.is_err() {
                info!("event receiver dropped, stopping");
                return Ok(SessionEnd::ConsumerGone);
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = ?self.state, to = ?next, "session state");
        self.state = next;
    }
}

async fn next_tick(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn lost_during_join(what: &str, e: BoxError) -> Error {
    Error::Connection {
        message: format!("{what}: {e}"),
        source: Some(e),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::protocol::decode_msg;
    use crate::types::ErrorKind;

    const OK_REPLY: &str =
        r#"{"topic":"api:key-1","event":"phx_reply","payload":{"status":"ok","response":{}},"ref":""}"#;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Sent(String),
        Recv,
    }

    #[derive(Clone, Default)]
    struct Probe {
        ops: Arc<Mutex<Vec<Op>>>,
        closes: Arc<AtomicUsize>,
        connects: Arc<AtomicUsize>,
    }

    impl Probe {
        fn sent(&self) -> Vec<serde_json::Value> {
            self.ops
                .lock()
                .unwrap()
                .iter()
                .filter_map(|op| match op {
                    Op::Sent(text) => Some(serde_json::from_str(text).unwrap()),
                    Op::Recv => None,
                })
                .collect()
        }

        fn sent_events(&self) -> Vec<String> {
            self.sent()
                .iter()
                .map(|v| v["event"].as_str().unwrap().to_string())
                .collect()
        }

        fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    /// Scripted transport. Returns `pending` once the script runs out and
    /// refuses to send a subscribe frame before a reply to the join was read.
    struct MockTransport {
        script: VecDeque<Result<Inbound, String>>,
        probe: Probe,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send_text(&mut self, text: String) -> Result<(), BoxError> {
            let msg = decode_msg(&text)?;
            let mut ops = self.probe.ops.lock().unwrap();
            if msg.event == "subscribe" {
                let join_at = ops.iter().position(
                    |op| matches!(op, Op::Sent(t) if t.contains("\"phx_join\"")),
                );
                let replied = join_at.is_some_and(|i| ops[i..].contains(&Op::Recv));
                if !replied {
                    return Err("subscribe sent before join reply".into());
                }
            }
            ops.push(Op::Sent(text));
            Ok(())
        }

        async fn recv(&mut self) -> Result<Inbound, BoxError> {
            match self.script.pop_front() {
                Some(next) => {
                    self.probe.ops.lock().unwrap().push(Op::Recv);
                    next.map_err(Into::into)
                }
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) {
            self.probe.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct MockConnector {
        transport: Mutex<Option<MockTransport>>,
        probe: Probe,
    }

    impl MockConnector {
        fn new(script: Vec<Result<Inbound, String>>) -> Self {
            let probe = Probe::default();
            Self {
                transport: Mutex::new(Some(MockTransport {
                    script: script.into(),
                    probe: probe.clone(),
                })),
                probe,
            }
        }

        fn refusing() -> Self {
            Self {
                transport: Mutex::new(None),
                probe: Probe::default(),
            }
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        type Transport = MockTransport;

        async fn connect(&self, url: &str) -> Result<MockTransport, Error> {
            self.probe.connects.fetch_add(1, Ordering::SeqCst);
            self.transport
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| Error::connection(format!("connect to {url}"), "refused"))
        }
    }

    fn text(s: &str) -> Result<Inbound, String> {
        Ok(Inbound::Text(s.to_string()))
    }

    fn closed() -> Result<Inbound, String> {
        Ok(Inbound::Closed { reason: None })
    }

    fn config() -> SubscriberConfig {
        SubscriberConfig::new("key-1", "http://127.0.0.1:1", "ws://127.0.0.1:1/socket")
    }

    async fn run_with(
        config: &SubscriberConfig,
        connector: &MockConnector,
    ) -> (SubscriptionSession, Result<SessionEnd, Error>, Vec<Event>) {
        let mut session = SubscriptionSession::new(config);
        let (tx, mut rx) = mpsc::channel(32);
        let cancel = CancellationToken::new();
        let result = session
            .run(connector, &AccessToken::new("abc123"), &tx, &cancel)
            .await;
        drop(tx);
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (session, result, events)
    }

    #[tokio::test]
    async fn joins_subscribes_and_streams_until_close() {
        let connector = MockConnector::new(vec![
            text(OK_REPLY),
            text(r#"{"n":1}"#),
            text(r#"{"n":2}"#),
            text(r#"{"n":3}"#),
            closed(),
        ]);
        let (session, result, events) = run_with(&config(), &connector).await;

        assert_eq!(result.unwrap(), SessionEnd::Closed { reason: None });
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(connector.probe.closes(), 1);
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], Event::Joined(ack) if ack.is_ok()));
        for (i, event) in events[1..].iter().enumerate() {
            assert_eq!(
                event,
                &Event::Update(Update::new(format!(r#"{{"n":{}}}"#, i + 1)))
            );
        }
    }

    #[tokio::test]
    async fn join_frame_carries_token_and_empty_ref() {
        let connector = MockConnector::new(vec![text(OK_REPLY), closed()]);
        run_with(&config(), &connector).await.1.unwrap();

        let sent = connector.probe.sent();
        assert_eq!(
            sent[0],
            serde_json::json!({
                "topic": "api:key-1",
                "event": "phx_join",
                "payload": {"access_token": "abc123"},
                "ref": ""
            })
        );
    }

    #[tokio::test]
    async fn subscribe_waits_for_join_reply() {
        let connector = MockConnector::new(vec![text(OK_REPLY), closed()]);
        run_with(&config(), &connector).await.1.unwrap();

        let ops = connector.probe.ops.lock().unwrap().clone();
        assert!(matches!(&ops[0], Op::Sent(t) if t.contains("phx_join")));
        assert_eq!(ops[1], Op::Recv);
        assert!(matches!(&ops[2], Op::Sent(t) if t.contains("subscribe")));
    }

    #[tokio::test]
    async fn topic_identical_across_join_and_subscribe() {
        let mut config = config();
        config.api_key = "we\"ird key/ü?&=".to_string();
        let connector = MockConnector::new(vec![text("ack"), closed()]);
        run_with(&config, &connector).await.1.unwrap();

        let sent = connector.probe.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0]["topic"], "api:we\"ird key/ü?&=");
        assert_eq!(sent[0]["topic"], sent[1]["topic"]);
    }

    #[tokio::test]
    async fn subscribe_sends_configured_list_once() {
        let mut config = config();
        config.topic_ids = vec!["9".into(), "1".into(), "9".into(), "4".into()];
        let connector = MockConnector::new(vec![text(OK_REPLY), closed()]);
        run_with(&config, &connector).await.1.unwrap();

        assert_eq!(connector.probe.sent_events(), vec!["phx_join", "subscribe"]);
        let sent = connector.probe.sent();
        assert_eq!(sent[1]["payload"]["list"], serde_json::json!(["9", "1", "9", "4"]));
    }

    #[tokio::test]
    async fn rejected_join_fails_without_subscribing() {
        let reply = r#"{"topic":"api:key-1","event":"phx_reply","payload":{"status":"error","response":{"reason":"unauthorized"}},"ref":""}"#;
        let connector = MockConnector::new(vec![text(reply)]);
        let (session, result, events) = run_with(&config(), &connector).await;

        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.to_string().contains("unauthorized"), "{err}");
        assert!(!err.is_retriable());
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(connector.probe.sent_events(), vec!["phx_join"]);
        assert_eq!(connector.probe.closes(), 1);
        assert!(matches!(&events[..], [Event::Joined(JoinAck::Rejected { .. })]));
    }

    #[tokio::test]
    async fn unrecognized_reply_is_tolerated_by_default() {
        let connector = MockConnector::new(vec![text("welcome"), text("u1"), closed()]);
        let (_, result, events) = run_with(&config(), &connector).await;

        assert!(result.is_ok());
        assert_eq!(
            events[0],
            Event::Joined(JoinAck::Unrecognized {
                raw: "welcome".into()
            })
        );
        assert_eq!(events[1], Event::Update(Update::new("u1")));
    }

    #[tokio::test]
    async fn strict_join_rejects_unrecognized_reply() {
        let mut config = config();
        config.strict_join = true;
        let connector = MockConnector::new(vec![text("welcome")]);
        let (_, result, _) = run_with(&config, &connector).await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Protocol);
        assert_eq!(connector.probe.sent_events(), vec!["phx_join"]);
    }

    #[tokio::test]
    async fn close_before_join_reply_is_protocol_error() {
        let connector = MockConnector::new(vec![closed()]);
        let (session, result, events) = run_with(&config(), &connector).await;

        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.is_retriable(), "{err}");
        assert_eq!(session.state(), SessionState::Failed);
        assert!(events.is_empty());
        assert_eq!(connector.probe.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn join_reply_timeout() {
        let mut config = config();
        config.timing.join_timeout = Duration::from_secs(5);
        let connector = MockConnector::new(vec![]);
        let (_, result, _) = run_with(&config, &connector).await;

        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.to_string().contains("no join reply"), "{err}");
        assert!(err.is_retriable());
        assert_eq!(connector.probe.closes(), 1);
    }

    #[tokio::test]
    async fn undecodable_binary_frame_is_stream_error() {
        let connector = MockConnector::new(vec![
            text(OK_REPLY),
            Ok(Inbound::Binary(br#"{"n":1}"#.to_vec())),
            Ok(Inbound::Binary(vec![0xff, 0xfe])),
        ]);
        let (session, result, events) = run_with(&config(), &connector).await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Stream);
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(events[1], Event::Update(Update::new(r#"{"n":1}"#)));
        assert_eq!(events.len(), 2);
        assert_eq!(connector.probe.closes(), 1);
    }

    #[tokio::test]
    async fn transport_error_while_streaming_is_stream_error() {
        let connector = MockConnector::new(vec![text(OK_REPLY), Err("tls alert".into())]);
        let (_, result, _) = run_with(&config(), &connector).await;

        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Stream);
        assert!(err.to_string().contains("tls alert"), "{err}");
        assert_eq!(connector.probe.closes(), 1);
    }

    #[tokio::test]
    async fn connect_failure_never_closes() {
        let connector = MockConnector::refusing();
        let (session, result, events) = run_with(&config(), &connector).await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Connection);
        assert_eq!(session.state(), SessionState::Failed);
        assert!(events.is_empty());
        assert_eq!(connector.probe.closes(), 0);
    }

    #[tokio::test]
    async fn cancel_mid_receive_tears_down() {
        let connector = MockConnector::new(vec![text(OK_REPLY), text("u1")]);
        let mut session = SubscriptionSession::new(&config());
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        let token = AccessToken::new("abc123");
        let (result, ()) = tokio::join!(session.run(&connector, &token, &tx, &cancel), async {
            // Joined, then the single update; the next receive blocks forever.
            assert!(matches!(rx.recv().await, Some(Event::Joined(_))));
            assert_eq!(rx.recv().await, Some(Event::Update(Update::new("u1"))));
            cancel.cancel();
        });

        assert_eq!(result.unwrap(), SessionEnd::Cancelled);
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(connector.probe.closes(), 1);
    }

    #[tokio::test]
    async fn cancel_before_connect_skips_transport() {
        let connector = MockConnector::new(vec![]);
        let mut session = SubscriptionSession::new(&config());
        let (tx, _rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = session
            .run(&connector, &AccessToken::new("t"), &tx, &cancel)
            .await;

        assert_eq!(result.unwrap(), SessionEnd::Cancelled);
        assert_eq!(connector.probe.connects.load(Ordering::SeqCst), 0);
        assert_eq!(connector.probe.closes(), 0);
    }

    #[tokio::test]
    async fn dropped_consumer_ends_session() {
        let connector = MockConnector::new(vec![text(OK_REPLY), text("u1")]);
        let mut session = SubscriptionSession::new(&config());
        let (tx, rx) = mpsc::channel(8);
        drop(rx);

        let result = session
            .run(&connector, &AccessToken::new("t"), &tx, &CancellationToken::new())
            .await;

        assert_eq!(result.unwrap(), SessionEnd::ConsumerGone);
        assert_eq!(connector.probe.sent_events(), vec!["phx_join"]);
        assert_eq!(connector.probe.closes(), 1);
    }

    #[tokio::test]
    async fn session_cannot_be_reused() {
        let connector = MockConnector::new(vec![text(OK_REPLY), closed()]);
        let mut session = SubscriptionSession::new(&config());
        let (tx, _rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let token = AccessToken::new("t");

        session.run(&connector, &token, &tx, &cancel).await.unwrap();
        let err = session.run(&connector, &token, &tx, &cancel).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(connector.probe.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeats_sent_and_replies_consumed() {
        let mut config = config();
        config.timing.heartbeat_interval = Some(Duration::from_secs(1));
        let hb_reply = r#"{"topic":"phoenix","event":"phx_reply","payload":{"status":"ok","response":{}},"ref":"1"}"#;
        let connector = MockConnector::new(vec![text(OK_REPLY), text(hb_reply), text("u1")]);
        let mut session = SubscriptionSession::new(&config);
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let token = AccessToken::new("t");

        let (result, ()) = tokio::join!(session.run(&connector, &token, &tx, &cancel), async {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            cancel.cancel();
        });

        assert_eq!(result.unwrap(), SessionEnd::Cancelled);
        assert!(matches!(rx.recv().await, Some(Event::Joined(_))));
        assert_eq!(rx.recv().await, Some(Event::Update(Update::new("u1"))));
        let sent = connector.probe.sent();
        assert_eq!(
            connector.probe.sent_events(),
            vec!["phx_join", "subscribe", "heartbeat", "heartbeat"]
        );
        assert_eq!(sent[2]["topic"], "phoenix");
        assert_eq!(sent[3]["ref"], "2");
    }

    #[test]
    fn terminal_states() {
        assert!(SessionState::Closed.is_terminal());
        assert!(SessionState::Failed.is_terminal());
        assert!(!SessionState::Streaming.is_terminal());
    }
}
