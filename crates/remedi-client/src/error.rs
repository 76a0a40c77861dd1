use std::fmt;
use std::time::Duration;

use remedi_core::{ConfigError, ProtocolError, StatusCode};

use crate::transport::TransportError;

/// One of the three server roles a request can be sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    PreProcessing,
    Translation,
    PostProcessing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PreProcessing => "pre-processing",
            Self::Translation => "translation",
            Self::PostProcessing => "post-processing",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never left the client. Not retried.
    #[error("failed to send {stage} request: {source}")]
    Send {
        stage: Stage,
        #[source]
        source: TransportError,
    },
    #[error("no {0} endpoint is configured")]
    StageUnconfigured(Stage),
    #[error("{stage} failed with status {status}: {}", message.as_deref().unwrap_or("no message"))]
    StageFailed {
        stage: Stage,
        status: StatusCode,
        message: Option<String>,
    },
    #[error("job id space exhausted")]
    JobIdsExhausted,
    #[error("no {stage} response after {waited:?}")]
    Timeout { stage: Stage, waited: Duration },
    #[error("failed to connect {stage} endpoint: {source}")]
    Connect {
        stage: Stage,
        #[source]
        source: TransportError,
    },
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
