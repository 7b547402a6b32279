//! Sampling-parameter decoding for the vLLM generation request.
//!
//! Only the sampling subset of the OpenAI body is decoded here, independently
//! of message extraction. The result is built in two explicit steps: start
//! from [`default_sampling_params`], then override each field whose JSON key
//! is present and non-null. A value equal to its default is therefore
//! indistinguishable from an absent one.
//!
//! The body is read as a JSON object first, so a repeated key keeps its last
//! value the same way the pass-through parser does.
//!
//! JSON numbers are narrowed to the wire widths with plain `as` casts:
//! fractional values truncate toward zero and out-of-range integers wrap.
//! Range checking is left to the engine.

use serde::Deserialize;
use serde_json::{Map, Number, Value};

use crate::error::{Error, ErrorContext};
use crate::proto::vllm::SamplingParams;

/// Default `max_tokens` when the request leaves it unset.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

const SOURCE: &str = "sampling_params";

/// Sampling parameters used when the request sets none.
pub fn default_sampling_params(default_max_tokens: u32) -> SamplingParams {
    SamplingParams {
        max_tokens: Some(default_max_tokens),
        temperature: None,
        top_p: 1.0,
        frequency_penalty: 0.0,
        presence_penalty: 0.0,
        n: 1,
        seed: None,
        stop: Vec::new(),
    }
}

/// Decode sampling parameters and the `stream` flag from a request body.
pub fn parse_sampling_params(
    body: &[u8],
    default_max_tokens: u32,
) -> Result<(SamplingParams, bool), Error> {
    let body: Map<String, Value> = serde_json::from_slice(body).map_err(|e| {
        Error::malformed(
            "error decoding sampling params",
            ErrorContext::new()
                .with_details(e.to_string())
                .with_source(SOURCE),
        )
    })?;

    let mut sp = default_sampling_params(default_max_tokens);

    if let Some(v) = field::<Number>(&body, "max_tokens")? {
        sp.max_tokens = Some(narrow_int(&v) as u32);
    }
    if let Some(v) = field::<Number>(&body, "temperature")? {
        sp.temperature = Some(narrow_float(&v));
    }
    if let Some(v) = field::<Number>(&body, "top_p")? {
        sp.top_p = narrow_float(&v);
    }
    if let Some(v) = field::<Number>(&body, "frequency_penalty")? {
        sp.frequency_penalty = narrow_float(&v);
    }
    if let Some(v) = field::<Number>(&body, "presence_penalty")? {
        sp.presence_penalty = narrow_float(&v);
    }
    if let Some(v) = field::<Number>(&body, "n")? {
        sp.n = narrow_int(&v) as u32;
    }
    if let Some(v) = field::<Number>(&body, "seed")? {
        sp.seed = Some(narrow_int(&v) as i32);
    }
    if let Some(stop) = body.get("stop") {
        sp.stop = stop_sequences(stop);
    }

    let stream = field::<bool>(&body, "stream")?.unwrap_or(false);
    Ok((sp, stream))
}

/// Typed value of `key`; absent and `null` both read as `None`.
fn field<'a, T: Deserialize<'a>>(
    body: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<T>, Error> {
    body.get(key)
        .map_or(Ok(None), Option::<T>::deserialize)
        .map_err(|e| {
            Error::malformed(
                "error decoding sampling params",
                ErrorContext::new()
                    .with_field_path(key)
                    .with_details(e.to_string())
                    .with_source(SOURCE),
            )
        })
}

/// `stop` is either one string or an array; non-string array elements are dropped.
fn stop_sequences(stop: &Value) -> Vec<String> {
    match stop {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(String::from))
            .collect(),
        _ => Vec::new(),
    }
}

fn narrow_int(n: &Number) -> i64 {
    if let Some(i) = n.as_i64() {
        i
    } else if let Some(u) = n.as_u64() {
        u as i64
    } else {
        n.as_f64().unwrap_or_default() as i64
    }
}

fn narrow_float(n: &Number) -> f32 {
    n.as_f64().unwrap_or_default() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: Value) -> (SamplingParams, bool) {
        parse_sampling_params(body.to_string().as_bytes(), DEFAULT_MAX_TOKENS).unwrap()
    }

    #[test]
    fn test_defaults_when_only_messages() {
        let (sp, stream) = parse(json!({"messages": [{"role": "user", "content": "Hi"}]}));
        assert_eq!(sp, default_sampling_params(DEFAULT_MAX_TOKENS));
        assert_eq!(sp.max_tokens, Some(1024));
        assert_eq!(sp.top_p, 1.0);
        assert_eq!(sp.n, 1);
        assert!(sp.temperature.is_none());
        assert!(sp.seed.is_none());
        assert!(sp.stop.is_empty());
        assert!(!stream);
    }

    #[test]
    fn test_null_fields_keep_defaults() {
        let (sp, stream) = parse(json!({
            "max_tokens": null,
            "temperature": null,
            "top_p": null,
            "n": null,
            "seed": null,
            "stop": null,
            "stream": null
        }));
        assert_eq!(sp, default_sampling_params(DEFAULT_MAX_TOKENS));
        assert!(!stream);
    }

    #[test]
    fn test_explicit_default_values_match_absent() {
        let (explicit, _) = parse(json!({
            "max_tokens": 1024,
            "top_p": 1.0,
            "n": 1,
            "frequency_penalty": 0.0,
            "presence_penalty": 0
        }));
        let (absent, _) = parse(json!({}));
        assert_eq!(explicit, absent);
    }

    #[test]
    fn test_explicit_zero_is_not_defaulted() {
        let (sp, _) = parse(json!({"max_tokens": 0, "top_p": 0, "n": 0, "temperature": 0, "seed": 0}));
        assert_eq!(sp.max_tokens, Some(0));
        assert_eq!(sp.top_p, 0.0);
        assert_eq!(sp.n, 0);
        assert_eq!(sp.temperature, Some(0.0));
        assert_eq!(sp.seed, Some(0));
    }

    #[test]
    fn test_stop_polymorphism() {
        assert_eq!(parse(json!({"stop": "STOP"})).0.stop, vec!["STOP"]);
        assert_eq!(
            parse(json!({"stop": ["STOP", 5, "END"]})).0.stop,
            vec!["STOP", "END"]
        );
        assert!(parse(json!({})).0.stop.is_empty());
        assert!(parse(json!({"stop": 42})).0.stop.is_empty());
    }

    #[test]
    fn test_numeric_narrowing() {
        let (sp, _) = parse(json!({
            "max_tokens": 100.9,
            "n": 4294967298u64,
            "seed": -1,
            "temperature": 0.7
        }));
        assert_eq!(sp.max_tokens, Some(100));
        assert_eq!(sp.n, 2);
        assert_eq!(sp.seed, Some(-1));
        assert_eq!(sp.temperature, Some(0.7f32));
    }

    #[test]
    fn test_repeated_key_keeps_last_value() {
        let body = br#"{"messages":[{"role":"user","content":"Hi"}],"n":1,"n":2,"stop":"a","stop":["b"]}"#;
        let (sp, _) = parse_sampling_params(body, DEFAULT_MAX_TOKENS).unwrap();
        assert_eq!(sp.n, 2);
        assert_eq!(sp.stop, vec!["b"]);
    }

    #[test]
    fn test_stream_flag() {
        assert!(parse(json!({"stream": true})).1);
        assert!(!parse(json!({"stream": false})).1);
    }

    #[test]
    fn test_wrong_types_are_malformed() {
        for body in [
            json!({"max_tokens": "many"}),
            json!({"stream": "yes"}),
            json!("not an object"),
        ] {
            let err = parse_sampling_params(body.to_string().as_bytes(), DEFAULT_MAX_TOKENS)
                .unwrap_err();
            assert!(matches!(err, Error::MalformedInput { .. }), "{}", body);
        }
    }

    #[test]
    fn test_wrong_type_names_field() {
        let err = parse_sampling_params(br#"{"top_p":"high"}"#, DEFAULT_MAX_TOKENS).unwrap_err();
        let ctx = err.context().unwrap();
        assert_eq!(ctx.field_path.as_deref(), Some("top_p"));
        assert_eq!(ctx.source.as_deref(), Some("sampling_params"));
    }
}
