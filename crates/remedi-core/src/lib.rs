//! remedi-core: protocol types, wire codec, correlation keys, and chunking.
//! The client crate depends on this one.

pub mod chunk;
pub mod config;
pub mod ids;
pub mod message;
pub mod segment;
pub mod wire;

pub use chunk::{reassemble, split, Chunk, CHUNK_PLACEHOLDER};
pub use config::{ClientConfig, ConfigError};
pub use ids::{job_token, token_group, JobIdGenerator};
pub use message::{
    LanguagePairs, Message, MessageKind, ProcessorRequest, ProcessorResponse, StatusCode,
    SupportedLanguageRequest, SupportedLanguageResponse, TargetData, TranslationRequest,
    TranslationResponse, INCOMPLETE_PLACEHOLDER, LANGUAGE_AUTO,
};
pub use segment::{IcuSentenceSegmenter, Segmenter};
pub use wire::ProtocolError;
