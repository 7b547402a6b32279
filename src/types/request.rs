//! Canonical request shape shared between extraction and parsers

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::message::Message;

/// Chat-completions view of an inbound request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionsRequest {
    pub messages: Vec<Message>,
}

/// Legacy completions view of an inbound request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionsRequest {
    pub prompt: Prompt,
}

/// `prompt` accepts either a single string or a batch of strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prompt {
    Single(String),
    Batch(Vec<String>),
}

/// Parser-specific representation of the body that will be forwarded.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedPayload {
    /// Generic JSON object, forwarded as-is.
    Json(Map<String, Value>),
    /// Serialized backend wire message.
    Binary(Bytes),
}

impl ParsedPayload {
    pub fn as_json(&self) -> Option<&Map<String, Value>> {
        match self {
            ParsedPayload::Json(map) => Some(map),
            ParsedPayload::Binary(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            ParsedPayload::Binary(bytes) => Some(bytes),
            ParsedPayload::Json(_) => None,
        }
    }
}

/// Typed view produced by the extraction step, before any parser has
/// attached its payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedRequest {
    pub model: Option<String>,
    pub chat_completions: Option<ChatCompletionsRequest>,
    pub completions: Option<CompletionsRequest>,
}

impl ExtractedRequest {
    /// Attach the owning parser's payload. Consuming `self` means a body
    /// receives its payload exactly once.
    pub fn with_payload(self, payload: ParsedPayload) -> CanonicalRequestBody {
        CanonicalRequestBody {
            model: self.model,
            chat_completions: self.chat_completions,
            completions: self.completions,
            payload,
        }
    }
}

/// Parser-agnostic view of an inbound request, used for scheduling, plus the
/// payload ready to forward to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRequestBody {
    pub model: Option<String>,
    pub chat_completions: Option<ChatCompletionsRequest>,
    pub completions: Option<CompletionsRequest>,
    pub payload: ParsedPayload,
}
