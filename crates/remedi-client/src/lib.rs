//! remedi-client: asynchronous client for the REMEDI translation servers.
//!
//! Requests go out over a [`Transport`]; responses come back on a
//! separate inbound stream, are routed into a [`CorrelationStore`] by the
//! [`InboundDispatcher`], and are picked up by the caller's poller.

pub mod client;
pub mod dispatch;
pub mod error;
pub mod poll;
pub mod store;
pub mod transport;

pub use client::{ClientBuilder, Pipeline, RemediClient};
pub use dispatch::{Dispatched, InboundDispatcher};
pub use error::{ClientError, Stage};
pub use poll::{await_response, Backoff, BackoffPolicy};
pub use store::{CorrelationStore, CorrelationTable, ResponseSlot};
pub use transport::{
    ChannelConnector, ChannelServer, Connection, Connector, ServerEvent, Transport,
    TransportError, CLOSE_REASON,
};
