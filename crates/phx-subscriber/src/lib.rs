//! Subscribe-only client for Phoenix-style channel servers.
//!
//! Implements the handshake needed to receive topic updates over a
//! WebSocket with JSON text frames.
//!
//! # Features
//! - Access token exchange with the token service (`GET /api/token/?api_key=`)
//! - Two-phase channel handshake: `phx_join`, wait for the reply, then `subscribe`
//! - Ordered, lossless delivery of update frames to the consumer
//! - Cancellation with guaranteed connection teardown
//! - Optional heartbeats and an opt-in reconnect loop with backoff
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), phx_subscriber::Error> {
//! use phx_subscriber::{Event, SubscriberConfig};
//!
//! let config = SubscriberConfig::from_env()?;
//! let mut sub = phx_subscriber::subscribe(config).await?;
//! while let Some(event) = sub.next().await {
//!     match event {
//!         Event::Joined(ack) => println!("joined: {ack:?}"),
//!         Event::Update(update) => println!("{}", update.raw),
//!     }
//! }
//! let end = sub.finish().await?;
//! println!("session ended: {end:?}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod protocol;
pub mod reconnect;
mod session;
mod subscribe;
mod token;
pub mod transport;
mod types;

pub use config::{SubscriberConfig, TimingConfig};
pub use protocol::JoinAck;
pub use reconnect::{ReconnectPolicy, run_with_reconnect};
pub use session::{SessionState, SubscriptionSession};
pub use subscribe::{Subscription, subscribe, subscribe_with};
pub use token::{AccessToken, TokenProvider};
pub use transport::{Connector, Inbound, Transport, WsConnector};
pub use types::{BoxError, Error, ErrorKind, Event, SessionEnd, Update};
