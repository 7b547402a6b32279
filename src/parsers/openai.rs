//! OpenAI 透传解析器 — 原样转发 JSON 请求体
//!
//! Pass-through parser for OpenAI-compatible backends. The request body is
//! kept as a generic JSON object with every field preserved, and usage is read
//! from the OpenAI response shape (unary JSON or SSE chunks).

use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::warn;

use crate::error::{Error, ErrorContext};
use crate::extract::extract_request_body;
use crate::extract::response::{extract_usage, extract_usage_streaming};
use crate::types::{CanonicalRequestBody, ParsedPayload, ParsedResponse};

use super::{Parser, TypedName};

pub const OPENAI_PARSER_NAME: &str = "openai-parser";

/// Parser for OpenAI-compatible HTTP backends.
#[derive(Debug, Clone)]
pub struct OpenAiParser {
    typed_name: TypedName,
}

impl Default for OpenAiParser {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAiParser {
    pub fn new() -> Self {
        Self {
            typed_name: TypedName::parser(OPENAI_PARSER_NAME),
        }
    }
}

impl Parser for OpenAiParser {
    fn typed_name(&self) -> &TypedName {
        &self.typed_name
    }

    fn parse_request(
        &self,
        headers: &HashMap<String, String>,
        body: &[u8],
    ) -> Result<CanonicalRequestBody, Error> {
        let body_map: Map<String, Value> = serde_json::from_slice(body).map_err(|e| {
            Error::malformed(
                "error unmarshalling the request body",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source(OPENAI_PARSER_NAME),
            )
        })?;
        let extracted = extract_request_body(body, headers)?;
        Ok(extracted.with_payload(ParsedPayload::Json(body_map)))
    }

    fn parse_response(&self, body: &[u8]) -> Result<ParsedResponse, Error> {
        match extract_usage(body)? {
            Some(usage) => Ok(ParsedResponse::new(usage)),
            None => {
                warn!(parser = OPENAI_PARSER_NAME, "response without usage");
                Err(Error::incomplete(
                    "response did not contain usage",
                    ErrorContext::new()
                        .with_field_path("usage")
                        .with_source(OPENAI_PARSER_NAME),
                ))
            }
        }
    }

    fn parse_stream_response(&self, chunk: &[u8]) -> Result<ParsedResponse, Error> {
        let chunk = String::from_utf8_lossy(chunk);
        extract_usage_streaming(&chunk)
            .map(ParsedResponse::new)
            .ok_or_else(|| {
                Error::incomplete(
                    "unable to parse usage from stream response",
                    ErrorContext::new()
                        .with_field_path("usage")
                        .with_source(OPENAI_PARSER_NAME),
                )
            })
    }
}
