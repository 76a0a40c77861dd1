//! Wire codec: JSON framing for every protocol message.
//!
//! Field names are the interoperability contract with the servers and
//! must not change. Decoding reads the envelope (`prot_ver`, `msg_type`)
//! first and only then parses the body for that kind, so a frame with an
//! unknown kind is rejected before any body type is attempted.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::message::{Message, MessageKind, PROTOCOL_VERSION};

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("message is missing the msg_type field")]
    MissingKind,
    #[error("unable to parse message envelope: {0}")]
    Unparseable(#[source] serde_json::Error),
    #[error("unable to parse {kind} body: {source}")]
    Malformed {
        kind: MessageKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("can't parse messages of undefined type (msg_type {code})")]
    UndefinedKind { code: i64 },
    #[error("unsupported protocol version {found}")]
    UnsupportedVersion { found: i64 },
    #[error("failed to encode {kind}: {source}")]
    Encode {
        kind: MessageKind,
        #[source]
        source: serde_json::Error,
    },
}

impl ProtocolError {
    /// True when the frame itself was broken, as opposed to merely
    /// carrying a kind this client does not understand.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, Self::UndefinedKind { .. })
    }
}

// ── Envelope ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Envelope<'a, T> {
    prot_ver: u8,
    msg_type: MessageKind,
    #[serde(flatten)]
    body: &'a T,
}

#[derive(Deserialize)]
struct Header {
    #[serde(default)]
    prot_ver: i64,
    msg_type: Option<i64>,
}

fn to_frame<T: Serialize>(kind: MessageKind, body: &T) -> Result<String, ProtocolError> {
    let envelope = Envelope {
        prot_ver: PROTOCOL_VERSION,
        msg_type: kind,
        body,
    };
    serde_json::to_string(&envelope).map_err(|source| ProtocolError::Encode { kind, source })
}

fn body<T: DeserializeOwned>(kind: MessageKind, raw: &str) -> Result<T, ProtocolError> {
    serde_json::from_str(raw).map_err(|source| ProtocolError::Malformed { kind, source })
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Serialize a message into one text frame.
pub fn encode(message: &Message) -> Result<String, ProtocolError> {
    let kind = message.kind();
    match message {
        Message::LanguageRequest(m) => to_frame(kind, m),
        Message::LanguageResponse(m) => to_frame(kind, m),
        Message::TranslationRequest(m) => to_frame(kind, m),
        Message::TranslationResponse(m) => to_frame(kind, m),
        Message::PreRequest(m) | Message::PostRequest(m) => to_frame(kind, m),
        Message::PreResponse(m) | Message::PostResponse(m) => to_frame(kind, m),
    }
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Read the envelope of a frame and return its kind.
///
/// Fails on broken JSON, a missing `msg_type`, or a foreign protocol
/// version. Unknown kind codes come back as `MessageKind::Undefined`.
pub fn peek_kind(raw: &str) -> Result<MessageKind, ProtocolError> {
    read_header(raw).map(|(kind, _)| kind)
}

fn read_header(raw: &str) -> Result<(MessageKind, i64), ProtocolError> {
    let header: Header = serde_json::from_str(raw).map_err(ProtocolError::Unparseable)?;
    let code = header.msg_type.ok_or(ProtocolError::MissingKind)?;
    if header.prot_ver != i64::from(PROTOCOL_VERSION) {
        return Err(ProtocolError::UnsupportedVersion {
            found: header.prot_ver,
        });
    }
    Ok((MessageKind::of(code), code))
}

/// Decode one text frame into a tagged message.
pub fn decode(raw: &str) -> Result<Message, ProtocolError> {
    let (kind, code) = read_header(raw)?;
    let message = match kind {
        MessageKind::Undefined => return Err(ProtocolError::UndefinedKind { code }),
        MessageKind::LanguageRequest => Message::LanguageRequest(body(kind, raw)?),
        MessageKind::LanguageResponse => Message::LanguageResponse(body(kind, raw)?),
        MessageKind::TranslationRequest => Message::TranslationRequest(body(kind, raw)?),
        MessageKind::TranslationResponse => Message::TranslationResponse(body(kind, raw)?),
        MessageKind::PreRequest => Message::PreRequest(body(kind, raw)?),
        MessageKind::PreResponse => Message::PreResponse(body(kind, raw)?),
        MessageKind::PostRequest => Message::PostRequest(body(kind, raw)?),
        MessageKind::PostResponse => Message::PostResponse(body(kind, raw)?),
    };
    Ok(message)
}
