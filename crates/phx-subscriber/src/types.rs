//! Public types for the phx-subscriber crate.

use crate::protocol::JoinAck;

/// A boxed error type used as the underlying cause of session failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One update frame received after the subscription was accepted.
///
/// The payload is passed through verbatim; use [`Update::json`] to parse it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    /// Raw frame text as received from the server.
    pub raw: String,
}

impl Update {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Parse the frame as JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.raw)
    }
}

/// Events emitted by a running session, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The server answered the channel join. Emitted exactly once per session,
    /// before any [`Event::Update`].
    Joined(JoinAck),
    /// An update frame on the subscribed channel.
    Update(Update),
}

/// How a session ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server closed the connection (gracefully or abruptly).
    Closed { reason: Option<String> },
    /// The session was cancelled from outside.
    Cancelled,
    /// The event receiver was dropped.
    ConsumerGone,
}

/// Coarse classification of [`Error`], matching the failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Authentication,
    Connection,
    Protocol,
    Stream,
}

/// Errors returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("authentication failed: {message}")]
    Authentication {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("connection failed: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("protocol error: {0}")]
    Protocol(String),

    /// The join handshake was cut short (closed or timed out) before any
    /// reply. Classified as [`ErrorKind::Protocol`] but worth retrying.
    #[error("protocol error: {0}")]
    Handshake(String),

    #[error("stream error: {message}")]
    Stream {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::Authentication { .. } => ErrorKind::Authentication,
            Error::Connection { .. } => ErrorKind::Connection,
            Error::Protocol(_) | Error::Handshake(_) => ErrorKind::Protocol,
            Error::Stream { .. } => ErrorKind::Stream,
        }
    }

    /// Whether a fresh session could plausibly succeed after this error.
    ///
    /// Authentication failures are retriable only when caused by the network
    /// or a malformed body; an explicit rejection from the token service is not.
    /// A rejected join is final, an interrupted one is not.
    pub fn is_retriable(&self) -> bool {
        match self {
            Error::Configuration(_) | Error::Protocol(_) => false,
            Error::Authentication { source, .. } => source.is_some(),
            Error::Connection { .. } | Error::Stream { .. } | Error::Handshake(_) => true,
        }
    }

    pub(crate) fn authentication(message: impl Into<String>) -> Self {
        Error::Authentication {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn connection(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Connection {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub(crate) fn stream(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Stream {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}
