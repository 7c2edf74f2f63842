//! Transport seam between the session and the websocket.
//!
//! The session only ever talks to [`Connector`] and [`Transport`], so tests
//! can swap the websocket for an in-memory fake.

use std::io::ErrorKind as IoErrorKind;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{self, Message};

use crate::Error;
use crate::types::BoxError;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A frame as seen by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Binary(Vec<u8>),
    /// The peer closed the connection, gracefully or not.
    Closed { reason: Option<String> },
}

/// An established, exclusively owned connection.
#[async_trait]
pub trait Transport: Send {
    async fn send_text(&mut self, text: String) -> Result<(), BoxError>;

    /// Wait for the next frame. Control frames are handled internally.
    async fn recv(&mut self) -> Result<Inbound, BoxError>;

    /// Release the connection. Errors while closing are ignored.
    async fn close(&mut self);
}

/// Opens transports.
#[async_trait]
pub trait Connector: Send + Sync {
    type Transport: Transport;

    async fn connect(&self, url: &str) -> Result<Self::Transport, Error>;
}

// ---------------------------------------------------------------------------
// WebSocket implementation
// ---------------------------------------------------------------------------

/// Connects with tokio-tungstenite (`ws://` and `wss://`).
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn connect(&self, url: &str) -> Result<WsTransport, Error> {
        let (ws, _resp) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| Error::connection(format!("connect to {url}: {e}"), e))?;
        Ok(WsTransport { ws })
    }
}

pub struct WsTransport {
    ws: WsStream,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<(), BoxError> {
        self.ws.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Inbound, BoxError> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Inbound::Text(text.as_str().to_owned())),
                Some(Ok(Message::Binary(data))) => return Ok(Inbound::Binary(data.to_vec())),
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.as_str().to_owned())
                        .filter(|r| !r.is_empty());
                    return Ok(Inbound::Closed { reason });
                }
                Some(Ok(_)) => {
                    // Ping, pong, raw frames
                }
                Some(Err(e)) if is_abrupt_close(&e) => {
                    return Ok(Inbound::Closed {
                        reason: Some(e.to_string()),
                    });
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(Inbound::Closed { reason: None }),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.ws.close(None).await {
            tracing::debug!("websocket close: {e}");
        }
    }
}

/// Errors that mean the peer went away rather than that something broke.
fn is_abrupt_close(e: &tungstenite::Error) -> bool {
    match e {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => true,
        tungstenite::Error::Protocol(
            tungstenite::error::ProtocolError::ResetWithoutClosingHandshake,
        ) => true,
        tungstenite::Error::Io(io) => matches!(
            io.kind(),
            IoErrorKind::ConnectionReset | IoErrorKind::BrokenPipe | IoErrorKind::UnexpectedEof
        ),
        _ => false,
    }
}
