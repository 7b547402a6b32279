//! 载荷解析器 — 通过 trait 实现不同后端线格式的动态分发
//!
//! Payload parser abstraction. A parser owns one backend wire format: it
//! turns an inbound OpenAI-style request into the payload that backend
//! expects, and pulls token usage back out of that backend's responses.
//! `Box<dyn Parser>` / `Arc<dyn Parser>` is the unit the gateway selects per
//! route.
//!
//! | Parser | Forwarded payload | Response format |
//! |--------|-------------------|-----------------|
//! | [`OpenAiParser`] | the original JSON object | OpenAI JSON / SSE |
//! | [`VllmGrpcParser`] | serialized `GenerateRequest` | `GenerateResponse` protobuf |

pub mod openai;
pub mod sampling;
pub mod vllm_grpc;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::config::TranscodeConfig;
use crate::error::{Error, ErrorContext};
use crate::types::{CanonicalRequestBody, ParsedResponse};

pub use openai::{OpenAiParser, OPENAI_PARSER_NAME};
pub use vllm_grpc::{
    extract_combined_prompt, extract_request_id, VllmGrpcParser, VLLM_GRPC_PARSER_NAME,
};

/// Plugin type shared by every payload parser.
pub const PARSER_TYPE: &str = "parser";

/// Type and name tuple identifying a parser instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TypedName {
    #[serde(rename = "type")]
    pub plugin_type: String,
    pub name: String,
}

impl TypedName {
    pub fn parser(name: impl Into<String>) -> Self {
        Self {
            plugin_type: PARSER_TYPE.to_string(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TypedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.plugin_type, self.name)
    }
}

/// Core trait for backend-specific payload handling.
///
/// Implementations hold no mutable state, so one instance can serve any
/// number of concurrent requests. Every call is a pure in-memory transform.
pub trait Parser: Send + Sync + fmt::Debug {
    /// Type and name of this parser instance.
    fn typed_name(&self) -> &TypedName;

    /// Build the canonical request body and the payload to forward.
    fn parse_request(
        &self,
        headers: &HashMap<String, String>,
        body: &[u8],
    ) -> Result<CanonicalRequestBody, Error>;

    /// Extract usage from a unary backend response.
    fn parse_response(&self, body: &[u8]) -> Result<ParsedResponse, Error>;

    /// Extract usage from one chunk of a streamed backend response. Each
    /// chunk is evaluated on its own.
    fn parse_stream_response(&self, chunk: &[u8]) -> Result<ParsedResponse, Error>;
}

/// Parser variants selectable by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ParserKind {
    #[default]
    #[serde(rename = "openai-parser")]
    OpenAi,
    #[serde(rename = "vllm-grpc-parser")]
    VllmGrpc,
}

impl ParserKind {
    pub const ALL: [ParserKind; 2] = [ParserKind::OpenAi, ParserKind::VllmGrpc];

    pub fn name(&self) -> &'static str {
        match self {
            ParserKind::OpenAi => OPENAI_PARSER_NAME,
            ParserKind::VllmGrpc => VLLM_GRPC_PARSER_NAME,
        }
    }
}

impl FromStr for ParserKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParserKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| {
                Error::configuration(
                    format!("unknown parser '{}'", s),
                    ErrorContext::new()
                        .with_field_path("parser")
                        .with_details(format!(
                            "expected one of: {}, {}",
                            OPENAI_PARSER_NAME, VLLM_GRPC_PARSER_NAME
                        )),
                )
            })
    }
}

/// Factory function to create the parser for a configured kind.
pub fn create_parser(kind: ParserKind, config: &TranscodeConfig) -> Box<dyn Parser> {
    match kind {
        ParserKind::OpenAi => Box::new(OpenAiParser::new()),
        ParserKind::VllmGrpc => Box::new(VllmGrpcParser::with_config(config.clone())),
    }
}
