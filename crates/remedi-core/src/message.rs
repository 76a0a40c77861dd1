//! Message schema for the translation protocol.
//!
//! Every message on the wire is a JSON object carrying `prot_ver` and
//! `msg_type` alongside a kind-specific body. The body types live here;
//! the envelope and the kind-first decoding live in [`crate::wire`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chunk::Chunk;
use crate::ids::job_token;
use crate::segment::Segmenter;

/// Protocol version carried by every message. Validated, never negotiated.
pub const PROTOCOL_VERSION: u8 = 0;

/// Language value asking the pre-processor to detect the source language.
pub const LANGUAGE_AUTO: &str = "auto";

/// Placeholder inserted for sentences the translation server did not translate.
pub const INCOMPLETE_PLACEHOLDER: &str = "<Incomplete Translation>";

// ── Discriminants ─────────────────────────────────────────────────────────────

/// Message kind discriminator (`msg_type` on the wire).
///
/// Unknown codes map to `Undefined` instead of failing the parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
#[repr(u8)]
pub enum MessageKind {
    Undefined = 0,
    LanguageRequest = 1,
    LanguageResponse = 2,
    TranslationRequest = 3,
    TranslationResponse = 4,
    PreRequest = 5,
    PreResponse = 6,
    PostRequest = 7,
    PostResponse = 8,
}

impl MessageKind {
    pub fn of(code: i64) -> Self {
        match code {
            1 => Self::LanguageRequest,
            2 => Self::LanguageResponse,
            3 => Self::TranslationRequest,
            4 => Self::TranslationResponse,
            5 => Self::PreRequest,
            6 => Self::PreResponse,
            7 => Self::PostRequest,
            8 => Self::PostResponse,
            _ => Self::Undefined,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// True for the kinds the servers send back to a client.
    pub fn is_response(self) -> bool {
        matches!(
            self,
            Self::LanguageResponse | Self::TranslationResponse | Self::PreResponse | Self::PostResponse
        )
    }
}

impl From<i64> for MessageKind {
    fn from(code: i64) -> Self {
        Self::of(code)
    }
}

impl From<MessageKind> for u8 {
    fn from(kind: MessageKind) -> Self {
        kind.code()
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Undefined => "undefined",
            Self::LanguageRequest => "supported-language request",
            Self::LanguageResponse => "supported-language response",
            Self::TranslationRequest => "translation request",
            Self::TranslationResponse => "translation response",
            Self::PreRequest => "pre-processor request",
            Self::PreResponse => "pre-processor response",
            Self::PostRequest => "post-processor request",
            Self::PostResponse => "post-processor response",
        };
        f.write_str(name)
    }
}

/// Result status reported by the servers (`stat_code` on the wire).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
#[repr(u8)]
pub enum StatusCode {
    #[default]
    Undefined = 0,
    Unknown = 1,
    /// The job was fully done.
    Ok = 2,
    /// Some sentences in the job were not processed.
    Partial = 3,
    /// The entire job was canceled.
    Canceled = 4,
    /// The entire job failed.
    Error = 5,
}

impl StatusCode {
    pub fn of(code: i64) -> Self {
        match code {
            1 => Self::Unknown,
            2 => Self::Ok,
            3 => Self::Partial,
            4 => Self::Canceled,
            5 => Self::Error,
            _ => Self::Undefined,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// True when the server gave up on the whole job.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Canceled | Self::Error)
    }
}

impl From<i64> for StatusCode {
    fn from(code: i64) -> Self {
        Self::of(code)
    }
}

impl From<StatusCode> for u8 {
    fn from(status: StatusCode) -> Self {
        status as u8
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Undefined => "undefined",
            Self::Unknown => "unknown",
            Self::Ok => "ok",
            Self::Partial => "partial",
            Self::Canceled => "canceled",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

// ── Supported languages ───────────────────────────────────────────────────────

/// Asks the translation server which language pairs it currently serves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedLanguageRequest {}

/// Source language → set of target languages.
pub type LanguagePairs = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedLanguageResponse {
    #[serde(rename = "langs", default)]
    pub languages: LanguagePairs,
}

impl SupportedLanguageResponse {
    pub fn add_language_pair(&mut self, source: &str, target: &str) {
        self.languages
            .entry(source.to_string())
            .or_default()
            .insert(target.to_string());
    }

    pub fn add_language_pairs<I, S>(&mut self, source: &str, targets: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages
            .entry(source.to_string())
            .or_default()
            .extend(targets.into_iter().map(Into::into));
    }

    /// Replace the targets recorded for `source`.
    pub fn set_language_pairs<I, S>(&mut self, source: &str, targets: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages.insert(
            source.to_string(),
            targets.into_iter().map(Into::into).collect(),
        );
    }

    pub fn supports_language_pair(&self, source: &str, target: &str) -> bool {
        self.languages
            .get(source)
            .is_some_and(|targets| targets.contains(target))
    }
}

// ── Translation ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRequest {
    /// Correlation key. Strictly positive, unique per process.
    pub job_id: u64,
    /// Greater is more important.
    #[serde(default)]
    pub priority: i32,
    #[serde(rename = "source_lang")]
    pub source_language: String,
    #[serde(rename = "target_lang")]
    pub target_language: String,
    /// Ask the server to report per-sentence load metrics.
    #[serde(rename = "is_trans_info", default)]
    pub translation_info: bool,
    #[serde(rename = "source_sent", default)]
    pub source_sentences: Vec<String>,
}

impl TranslationRequest {
    pub fn new(
        job_id: u64,
        source_language: &str,
        target_language: &str,
        source_sentences: Vec<String>,
    ) -> Self {
        Self {
            job_id,
            priority: 0,
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            translation_info: false,
            source_sentences,
        }
    }

    /// Build a request whose sentences come from segmenting `text`.
    pub fn from_text(
        job_id: u64,
        source_language: &str,
        target_language: &str,
        text: &str,
        segmenter: &dyn Segmenter,
    ) -> Self {
        Self::new(
            job_id,
            source_language,
            target_language,
            segmenter.segment(text),
        )
    }
}

/// Per-sentence result inside a [`TranslationResponse`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetData {
    #[serde(rename = "stat_code", default)]
    pub status: StatusCode,
    #[serde(rename = "stat_msg", default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    /// Present only when `status` is ok.
    #[serde(rename = "trans_text", default, skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
    /// Percentage load on each server thread. Only sent when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_load: Option<Vec<i32>>,
}

impl TargetData {
    pub fn ok(text: &str) -> Self {
        Self {
            status: StatusCode::Ok,
            translated_text: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn failed(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            status_message: Some(message.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResponse {
    pub job_id: u64,
    #[serde(rename = "stat_code", default)]
    pub status: StatusCode,
    #[serde(rename = "stat_msg", default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default)]
    pub target_data: Vec<TargetData>,
}

impl TranslationResponse {
    /// Join the translated sentences in order.
    ///
    /// Entries that are not ok (or are ok with no text) become
    /// [`INCOMPLETE_PLACEHOLDER`] when `placeholders` is set and are
    /// skipped otherwise.
    pub fn assemble_target_data(&self, delimiter: &str, placeholders: bool) -> String {
        let mut parts = Vec::with_capacity(self.target_data.len());
        for data in &self.target_data {
            match (&data.translated_text, data.status.is_ok()) {
                (Some(text), true) => parts.push(text.as_str()),
                _ if placeholders => parts.push(INCOMPLETE_PLACEHOLDER),
                _ => {}
            }
        }
        parts.join(delimiter)
    }
}

// ── Pre/post processing ───────────────────────────────────────────────────────

fn single_chunk() -> u32 {
    1
}

/// Request body shared by the pre- and post-processors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorRequest {
    /// Correlation key. Content-derived unless supplied by the caller.
    pub job_token: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(rename = "num_chs", default = "single_chunk")]
    pub number_of_chunks: u32,
    #[serde(rename = "ch_idx", default)]
    pub chunk_index: u32,
    #[serde(rename = "lang")]
    pub language: String,
    pub text: String,
}

impl ProcessorRequest {
    /// Single-chunk request with a token derived from `text`.
    pub fn new(language: &str, text: &str) -> Self {
        Self::with_token(language, text, &job_token(text))
    }

    pub fn with_token(language: &str, text: &str, token: &str) -> Self {
        Self {
            job_token: token.to_string(),
            priority: 0,
            number_of_chunks: 1,
            chunk_index: 0,
            language: language.to_string(),
            text: text.to_string(),
        }
    }

    /// One request per chunk, each addressed by its index and carrying
    /// the token of its own text.
    pub fn for_chunks(language: &str, chunks: &[Chunk]) -> Vec<Self> {
        chunks
            .iter()
            .map(|chunk| Self {
                number_of_chunks: chunk.total,
                chunk_index: chunk.index,
                ..Self::new(language, &chunk.text)
            })
            .collect()
    }
}

/// Response body shared by the pre- and post-processors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorResponse {
    #[serde(rename = "stat_code", default)]
    pub status: StatusCode,
    #[serde(rename = "stat_msg", default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    pub job_token: String,
    #[serde(rename = "num_chs", default = "single_chunk")]
    pub number_of_chunks: u32,
    #[serde(rename = "ch_idx", default)]
    pub chunk_index: u32,
    /// Detected or declared language of `text`.
    #[serde(rename = "lang", default)]
    pub language: String,
    #[serde(default)]
    pub text: String,
}

impl ProcessorResponse {
    /// Successful response echoing the addressing of `request`.
    pub fn ok_for(request: &ProcessorRequest, language: &str, text: &str) -> Self {
        Self {
            status: StatusCode::Ok,
            status_message: None,
            job_token: request.job_token.clone(),
            number_of_chunks: request.number_of_chunks,
            chunk_index: request.chunk_index,
            language: language.to_string(),
            text: text.to_string(),
        }
    }
}

// ── Tagged message ────────────────────────────────────────────────────────────

/// One protocol message, tagged by kind.
///
/// Pre- and post-processor messages share body types; the variant
/// carries which server they belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    LanguageRequest(SupportedLanguageRequest),
    LanguageResponse(SupportedLanguageResponse),
    TranslationRequest(TranslationRequest),
    TranslationResponse(TranslationResponse),
    PreRequest(ProcessorRequest),
    PreResponse(ProcessorResponse),
    PostRequest(ProcessorRequest),
    PostResponse(ProcessorResponse),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::LanguageRequest(_) => MessageKind::LanguageRequest,
            Self::LanguageResponse(_) => MessageKind::LanguageResponse,
            Self::TranslationRequest(_) => MessageKind::TranslationRequest,
            Self::TranslationResponse(_) => MessageKind::TranslationResponse,
            Self::PreRequest(_) => MessageKind::PreRequest,
            Self::PreResponse(_) => MessageKind::PreResponse,
            Self::PostRequest(_) => MessageKind::PostRequest,
            Self::PostResponse(_) => MessageKind::PostResponse,
        }
    }
}
