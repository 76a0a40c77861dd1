//! In-process transport over tokio channels.
//!
//! Each registered endpoint gets a [`ChannelServer`] holding the other
//! ends of the channels. Whoever owns it plays the server: it reads the
//! frames the client sends and pushes response frames back. Dropping it
//! makes further client sends fail.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;

use super::{Connection, Connector, Transport, TransportError};

/// Bound on response frames queued for the dispatcher.
const INBOUND_CAPACITY: usize = 256;

/// What the server end observes from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Text(String),
    Close(String),
}

/// Server end of one in-process connection.
pub struct ChannelServer {
    pub requests: mpsc::UnboundedReceiver<ServerEvent>,
    pub responses: mpsc::Sender<String>,
}

impl ChannelServer {
    /// Next event from the client, or `None` once the client is gone.
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        self.requests.recv().await
    }

    /// Deliver one frame to the client.
    pub async fn respond(&self, frame: String) -> Result<(), TransportError> {
        self.responses
            .send(frame)
            .await
            .map_err(|_| TransportError::Closed)
    }
}

struct ChannelTransport {
    requests: mpsc::UnboundedSender<ServerEvent>,
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, frame: String) -> Result<(), TransportError> {
        self.requests
            .send(ServerEvent::Text(frame))
            .map_err(|_| TransportError::Closed)
    }

    async fn close(&self, reason: &str) -> Result<(), TransportError> {
        self.requests
            .send(ServerEvent::Close(reason.to_string()))
            .map_err(|_| TransportError::Closed)
    }
}

/// Hands out pre-registered in-process connections, one per endpoint.
#[derive(Clone, Default)]
pub struct ChannelConnector {
    pending: Arc<DashMap<String, Connection>>,
}

impl ChannelConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the connection for `endpoint` and return its server end.
    /// A later registration for the same endpoint replaces an unclaimed one.
    pub fn register(&self, endpoint: &str) -> ChannelServer {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::channel(INBOUND_CAPACITY);

        let connection = Connection {
            transport: Arc::new(ChannelTransport {
                requests: request_tx,
            }),
            inbound: response_rx,
        };
        self.pending.insert(endpoint.to_string(), connection);

        ChannelServer {
            requests: request_rx,
            responses: response_tx,
        }
    }
}

#[async_trait]
impl Connector for ChannelConnector {
    async fn connect(&self, endpoint: &str) -> Result<Connection, TransportError> {
        self.pending
            .remove(endpoint)
            .map(|(_, connection)| connection)
            .ok_or_else(|| TransportError::Connect {
                endpoint: endpoint.to_string(),
                reason: "no server registered".to_string(),
            })
    }
}
