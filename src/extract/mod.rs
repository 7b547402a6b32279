//! 请求提取模块：把原始 HTTP 请求体归类为规范请求视图。
//!
//! # Extraction
//!
//! Shared helpers every parser relies on:
//! - [`extract_request_body`] classifies a raw JSON body as chat-completions or
//!   completions and produces an [`ExtractedRequest`].
//! - [`header_value`] looks up a header case-insensitively.
//! - [`response`] pulls token usage out of OpenAI-shaped responses and SSE streams.

pub mod response;

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::{Error, ErrorContext};
use crate::types::{ChatCompletionsRequest, CompletionsRequest, ExtractedRequest, Message, Prompt};

/// Header carrying the caller-assigned request identifier.
pub const REQUEST_ID_HEADER_KEY: &str = "x-request-id";

const SOURCE: &str = "request_extractor";

/// Classify a raw request body.
///
/// A `messages` array makes it a chat-completions request; otherwise a
/// `prompt` makes it a completions request. A body with neither, or one that
/// is not a JSON object, is [`Error::MalformedInput`]. A repeated key keeps
/// its last value.
pub fn extract_request_body(
    body: &[u8],
    _headers: &HashMap<String, String>,
) -> Result<ExtractedRequest, Error> {
    let body: Map<String, Value> = serde_json::from_slice(body).map_err(|e| {
        Error::malformed(
            "request body is not a valid OpenAI request",
            ErrorContext::new()
                .with_field_path("request")
                .with_details(e.to_string())
                .with_source(SOURCE),
        )
    })?;

    let mut extracted = ExtractedRequest {
        model: field(&body, "model")?,
        ..Default::default()
    };

    if let Some(messages) = field::<Vec<Message>>(&body, "messages")? {
        extracted.chat_completions = Some(ChatCompletionsRequest { messages });
    } else if let Some(prompt) = field::<Prompt>(&body, "prompt")? {
        extracted.completions = Some(CompletionsRequest { prompt });
    } else {
        return Err(Error::malformed(
            "request has neither `messages` nor `prompt`",
            ErrorContext::new().with_source(SOURCE),
        ));
    }

    Ok(extracted)
}

fn field<'a, T: Deserialize<'a>>(
    body: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<T>, Error> {
    body.get(key)
        .map_or(Ok(None), Option::<T>::deserialize)
        .map_err(|e| {
            Error::malformed(
                "request body is not a valid OpenAI request",
                ErrorContext::new()
                    .with_field_path(key)
                    .with_details(e.to_string())
                    .with_source(SOURCE),
            )
        })
}

/// Case-insensitive header lookup. HTTP/2 lowercases names, but callers may
/// hand over headers from HTTP/1 clients unchanged.
pub fn header_value<'a>(headers: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    headers
        .get(key)
        .or_else(|| {
            headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
        .map(String::as_str)
}
