//! Transport seam: what the client needs from a message-oriented,
//! full-duplex connection.
//!
//! Connection setup, framing, keep-alive and TLS belong to the
//! implementation. The client only sends complete text frames and reads
//! complete inbound frames from a channel.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

pub mod channel;

pub use channel::{ChannelConnector, ChannelServer, ServerEvent};

/// Close reason sent when a client shuts down.
pub const CLOSE_REASON: &str = "Client closed";

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,
    #[error("failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },
    #[error("send failed: {0}")]
    Send(String),
}

/// Outbound half of a connection.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one complete frame. Failure is reported to the caller, never retried.
    async fn send(&self, frame: String) -> Result<(), TransportError>;

    /// Graceful shutdown signal.
    async fn close(&self, reason: &str) -> Result<(), TransportError>;
}

/// An established connection: the outbound half and the stream of
/// complete inbound frames.
pub struct Connection {
    pub transport: Arc<dyn Transport>,
    pub inbound: mpsc::Receiver<String>,
}

/// Opens connections to configured endpoints.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<Connection, TransportError>;
}
