//! Routes inbound frames into the correlation store by message kind.

use tokio::sync::{broadcast, mpsc};

use remedi_core::wire;
use remedi_core::{token_group, Message, MessageKind, ProtocolError};

use crate::store::CorrelationStore;

/// What happened to one inbound frame that decoded without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// A response, now waiting in the store for its poller.
    Stored(MessageKind),
    /// A kind this client does not consume.
    Ignored(MessageKind),
}

/// Consumes every frame arriving on one connection.
#[derive(Clone)]
pub struct InboundDispatcher {
    store: CorrelationStore,
    /// Endpoint label for log fields.
    endpoint: String,
}

impl InboundDispatcher {
    pub fn new(store: CorrelationStore, endpoint: impl Into<String>) -> Self {
        Self {
            store,
            endpoint: endpoint.into(),
        }
    }

    /// Decode one frame and store it under its correlation key.
    ///
    /// Unknown kinds are warned about and ignored. Frames that cannot be
    /// read at all are returned as errors; the caller decides how loudly
    /// to report them.
    pub fn dispatch(&self, raw: &str) -> Result<Dispatched, ProtocolError> {
        let message = match wire::decode(raw) {
            Ok(message) => message,
            Err(ProtocolError::UndefinedKind { code }) => {
                tracing::warn!(
                    endpoint = %self.endpoint,
                    msg_type = code,
                    "unrecognized message type, ignoring"
                );
                return Ok(Dispatched::Ignored(MessageKind::Undefined));
            }
            Err(e) => return Err(e),
        };

        let kind = message.kind();
        if !kind.is_response() {
            tracing::warn!(
                endpoint = %self.endpoint,
                kind = %kind,
                "unexpected request from server, ignoring"
            );
            return Ok(Dispatched::Ignored(kind));
        }

        match message {
            Message::LanguageResponse(response) => {
                tracing::info!(
                    endpoint = %self.endpoint,
                    sources = response.languages.len(),
                    "supported languages stored"
                );
                self.store.store_languages(response);
            }
            Message::TranslationResponse(response) => {
                let job_id = response.job_id;
                if self.store.store_translation(response).is_some() {
                    tracing::warn!(job_id, "replaced unread translation response");
                }
                tracing::info!(endpoint = %self.endpoint, job_id, "translation response stored");
            }
            Message::PreResponse(response) => {
                let group = token_group(&response.job_token).to_string();
                tracing::info!(endpoint = %self.endpoint, token = %group, "pre-processing response stored");
                self.store.store_pre_processing(group, response);
            }
            Message::PostResponse(response) => {
                let group = token_group(&response.job_token).to_string();
                tracing::info!(endpoint = %self.endpoint, token = %group, "post-processing response stored");
                self.store.store_post_processing(group, response);
            }
            // Requests returned above.
            _ => return Ok(Dispatched::Ignored(kind)),
        }
        Ok(Dispatched::Stored(kind))
    }

    /// Dispatch frames until the connection closes or shutdown fires.
    pub async fn run(
        self,
        mut inbound: mpsc::Receiver<String>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                frame = inbound.recv() => {
                    let Some(frame) = frame else {
                        tracing::debug!(endpoint = %self.endpoint, "inbound stream closed");
                        break;
                    };
                    if let Err(e) = self.dispatch(&frame) {
                        tracing::error!(
                            endpoint = %self.endpoint,
                            error = %e,
                            "failed to parse inbound message, discarding"
                        );
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!(endpoint = %self.endpoint, "dispatcher shutting down");
                    break;
                }
            }
        }
    }
}
