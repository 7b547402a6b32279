//! Usage extraction for OpenAI-shaped responses (unary JSON and SSE chunks)

use serde_json::Value;

use crate::error::{Error, ErrorContext};
use crate::types::Usage;

const STREAMING_RESP_PREFIX: &str = "data:";
const STREAMING_DONE_SIGNAL: &str = "[DONE]";

/// Extract usage from a unary response body.
///
/// Returns `Ok(None)` when the body is valid JSON but carries no `usage`
/// object (e.g. an error payload).
pub fn extract_usage(body: &[u8]) -> Result<Option<Usage>, Error> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        Error::malformed(
            "response body is not valid JSON",
            ErrorContext::new()
                .with_field_path("response")
                .with_details(e.to_string())
                .with_source("response_extractor"),
        )
    })?;
    Ok(usage_from_value(&value))
}

/// Extract usage from one chunk of an SSE stream.
///
/// A chunk may hold several `data:` frames; the last usage-bearing frame
/// wins. Comment lines, the `[DONE]` sentinel, and frames that are not JSON
/// are skipped.
pub fn extract_usage_streaming(chunk: &str) -> Option<Usage> {
    chunk
        .lines()
        .filter_map(|line| {
            let payload = line.trim().strip_prefix(STREAMING_RESP_PREFIX)?.trim();
            if payload.is_empty() || payload == STREAMING_DONE_SIGNAL {
                return None;
            }
            let value: Value = serde_json::from_str(payload).ok()?;
            usage_from_value(&value)
        })
        .last()
}

fn usage_from_value(value: &Value) -> Option<Usage> {
    let usage = value.get("usage")?.as_object()?;
    let prompt_tokens = usage.get("prompt_tokens").and_then(token_count);
    let completion_tokens = usage.get("completion_tokens").and_then(token_count);
    if prompt_tokens.is_none() && completion_tokens.is_none() {
        return None;
    }
    Some(Usage::new(
        prompt_tokens.unwrap_or(0),
        completion_tokens.unwrap_or(0),
    ))
}

// Some backends serialize counts as floats (`10.0`); those truncate.
fn token_count(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().map(|f| f as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unary_usage() {
        let body = br#"{
            "object": "chat.completion",
            "choices": [{"message": {"content": "Hi"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
        }"#;
        assert_eq!(extract_usage(body).unwrap(), Some(Usage::new(12, 4)));
    }

    #[test]
    fn test_float_token_counts() {
        let body = br#"{"usage": {"prompt_tokens": 10.0, "completion_tokens": 4.7}}"#;
        assert_eq!(extract_usage(body).unwrap(), Some(Usage::new(10, 4)));

        let chunk = "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":3.0,\"completion_tokens\":2}}\n\n";
        assert_eq!(extract_usage_streaming(chunk), Some(Usage::new(3, 2)));
    }

    #[test]
    fn test_unary_without_usage() {
        let body = br#"{"error": {"message": "overloaded"}}"#;
        assert_eq!(extract_usage(body).unwrap(), None);
        assert!(extract_usage(b"<html>").is_err());
    }

    #[test]
    fn test_streaming_usage_last_frame() {
        let chunk = concat!(
            "data: {\"object\":\"chat.completion.chunk\",\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n",
            ": keep-alive\n\n",
            "data: {\"object\":\"chat.completion.chunk\",\"choices\":[],\"usage\":{\"prompt_tokens\":5,\"completion_tokens\":9}}\n\n",
            "data: [DONE]\n\n",
        );
        assert_eq!(extract_usage_streaming(chunk), Some(Usage::new(5, 9)));
    }

    #[test]
    fn test_streaming_without_usage() {
        let chunk = "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}],\"usage\":null}\n\n";
        assert_eq!(extract_usage_streaming(chunk), None);
        assert_eq!(extract_usage_streaming("data: [DONE]"), None);
    }
}
