//! vLLM gRPC 解析器 — 把 OpenAI JSON 请求转码为 vLLM GenerateRequest
//!
//! vLLM gRPC parser. Transcodes an OpenAI chat-completions request into the
//! engine's `GenerateRequest` protobuf and reads usage back from
//! `GenerateResponse` messages:
//! - All messages are flattened into one text prompt, one line per message.
//! - Sampling fields get explicit defaults (see [`super::sampling`]).
//! - The request id comes from the `x-request-id` header, or a fresh UUID.
//! - Streaming requests are rejected; only unary generation is transcoded.

use bytes::BytesMut;
use prost::Message as _;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::TranscodeConfig;
use crate::error::{Error, ErrorContext};
use crate::extract::{extract_request_body, header_value};
use crate::proto::vllm::{
    generate_request, generate_response, GenerateComplete, GenerateRequest, GenerateResponse,
    GenerateStreamChunk,
};
use crate::types::{CanonicalRequestBody, ExtractedRequest, ParsedPayload, ParsedResponse, Usage};

use super::sampling::parse_sampling_params;
use super::{Parser, TypedName};

pub const VLLM_GRPC_PARSER_NAME: &str = "vllm-grpc-parser";

/// Parser for the vLLM gRPC generation service.
#[derive(Debug, Clone)]
pub struct VllmGrpcParser {
    typed_name: TypedName,
    config: TranscodeConfig,
}

impl Default for VllmGrpcParser {
    fn default() -> Self {
        Self::new()
    }
}

impl VllmGrpcParser {
    pub fn new() -> Self {
        Self::with_config(TranscodeConfig::default())
    }

    pub fn with_config(config: TranscodeConfig) -> Self {
        Self {
            typed_name: TypedName::parser(VLLM_GRPC_PARSER_NAME),
            config,
        }
    }

    pub fn config(&self) -> &TranscodeConfig {
        &self.config
    }

    /// Build the `GenerateRequest` for an already extracted request.
    ///
    /// Fallible steps run in order: prompt combination, sampling decode,
    /// then the streaming check, so a body that fails to decode reports
    /// `MalformedInput` before a `stream: true` can report
    /// `UnsupportedFeature`.
    pub fn transcode(
        &self,
        headers: &HashMap<String, String>,
        body: &[u8],
        extracted: &ExtractedRequest,
    ) -> Result<GenerateRequest, Error> {
        let prompt = extract_combined_prompt(extracted)?;
        let request_id = extract_request_id(headers, &self.config.request_id_header);

        let (sampling_params, stream) =
            parse_sampling_params(body, self.config.default_max_tokens)?;
        if stream {
            return Err(Error::unsupported_feature(
                "streaming is not yet implemented for vLLM gRPC",
                ErrorContext::new()
                    .with_field_path("stream")
                    .with_source(VLLM_GRPC_PARSER_NAME),
            ));
        }

        Ok(GenerateRequest {
            request_id,
            input: Some(generate_request::Input::Text(prompt)),
            sampling_params: Some(sampling_params),
            stream: false,
        })
    }

    fn decode(&self, bytes: &[u8], what: &str) -> Result<GenerateResponse, Error> {
        GenerateResponse::decode(bytes).map_err(|e| {
            Error::malformed(
                format!("error decoding gRPC GenerateResponse {}", what),
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source(VLLM_GRPC_PARSER_NAME),
            )
        })
    }
}

impl Parser for VllmGrpcParser {
    fn typed_name(&self) -> &TypedName {
        &self.typed_name
    }

    fn parse_request(
        &self,
        headers: &HashMap<String, String>,
        body: &[u8],
    ) -> Result<CanonicalRequestBody, Error> {
        let extracted = extract_request_body(body, headers)?;
        let request = self.transcode(headers, body, &extracted)?;

        let mut buf = BytesMut::with_capacity(request.encoded_len());
        request.encode(&mut buf)?;

        debug!(
            parser = VLLM_GRPC_PARSER_NAME,
            request_id = %request.request_id,
            payload_bytes = buf.len(),
            "transcoded chat completion to GenerateRequest"
        );

        Ok(extracted.with_payload(ParsedPayload::Binary(buf.freeze())))
    }

    fn parse_response(&self, body: &[u8]) -> Result<ParsedResponse, Error> {
        let resp = self.decode(body, "body")?;
        match resp.response {
            Some(generate_response::Response::Complete(complete)) => {
                Ok(complete_to_parsed(&complete))
            }
            _ => {
                warn!(parser = VLLM_GRPC_PARSER_NAME, "unary response without complete block");
                Err(Error::incomplete(
                    "unary response did not contain Complete block",
                    ErrorContext::new()
                        .with_field_path("response.complete")
                        .with_source(VLLM_GRPC_PARSER_NAME),
                ))
            }
        }
    }

    fn parse_stream_response(&self, chunk: &[u8]) -> Result<ParsedResponse, Error> {
        let resp = self.decode(chunk, "chunk")?;
        match resp.response {
            Some(generate_response::Response::Complete(complete)) => {
                Ok(complete_to_parsed(&complete))
            }
            Some(generate_response::Response::Chunk(chunk)) => Ok(chunk_to_parsed(&chunk)),
            None => {
                warn!(parser = VLLM_GRPC_PARSER_NAME, "stream chunk without usage");
                Err(Error::incomplete(
                    "unable to parse usage from stream chunk",
                    ErrorContext::new()
                        .with_field_path("response")
                        .with_source(VLLM_GRPC_PARSER_NAME),
                ))
            }
        }
    }
}

fn complete_to_parsed(complete: &GenerateComplete) -> ParsedResponse {
    let parsed = ParsedResponse::new(Usage::new(
        complete.prompt_tokens.into(),
        complete.completion_tokens.into(),
    ));
    if complete.finish_reason.is_empty() {
        parsed
    } else {
        parsed.with_finish_reason(complete.finish_reason.clone())
    }
}

fn chunk_to_parsed(chunk: &GenerateStreamChunk) -> ParsedResponse {
    ParsedResponse::new(Usage::new(
        chunk.prompt_tokens.into(),
        chunk.completion_tokens.into(),
    ))
}

/// Request id from `header_key` if present and non-empty, otherwise a new UUID v4.
pub fn extract_request_id(headers: &HashMap<String, String>, header_key: &str) -> String {
    match header_value(headers, header_key) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => uuid::Uuid::new_v4().to_string(),
    }
}

/// Concatenate every message's plain text, each followed by a newline.
pub fn extract_combined_prompt(extracted: &ExtractedRequest) -> Result<String, Error> {
    let chat = extracted.chat_completions.as_ref().ok_or_else(|| {
        Error::unsupported_input(
            "vLLM gRPC parser expects a chat completions request",
            ErrorContext::new().with_source(VLLM_GRPC_PARSER_NAME),
        )
    })?;

    let mut combined = String::new();
    for msg in &chat.messages {
        combined.push_str(&msg.content.plain_text());
        combined.push('\n');
    }
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::REQUEST_ID_HEADER_KEY;
    use crate::types::{
        ChatCompletionsRequest, CompletionsRequest, ContentPart, Message, MessageContent,
        MessageRole, Prompt,
    };
    use prost::Message as _;

    fn chat(messages: Vec<Message>) -> ExtractedRequest {
        ExtractedRequest {
            chat_completions: Some(ChatCompletionsRequest { messages }),
            ..Default::default()
        }
    }

    #[test]
    fn test_combined_prompt() {
        assert_eq!(
            extract_combined_prompt(&chat(vec![Message::user("Hello")])).unwrap(),
            "Hello\n"
        );
        assert_eq!(
            extract_combined_prompt(&chat(vec![
                Message::system("Be brief."),
                Message::user("Hello World!"),
            ]))
            .unwrap(),
            "Be brief.\nHello World!\n"
        );
        assert_eq!(extract_combined_prompt(&chat(vec![])).unwrap(), "");
    }

    #[test]
    fn test_combined_prompt_multi_turn_with_parts() {
        let prompt = extract_combined_prompt(&chat(vec![
            Message::user("What is in this picture?"),
            Message::assistant("A cat."),
            Message::with_content(
                MessageRole::User,
                MessageContent::parts(vec![
                    ContentPart::Text {
                        text: "And this".into(),
                    },
                    ContentPart::ImageUrl {
                        image_url: serde_json::json!({"url": "https://example.com/b.png"}),
                    },
                    ContentPart::Text { text: "one?".into() },
                ]),
            ),
        ]))
        .unwrap();
        assert_eq!(prompt, "What is in this picture?\nA cat.\nAnd this one?\n");
    }

    #[test]
    fn test_combined_prompt_requires_chat() {
        let completions = ExtractedRequest {
            completions: Some(CompletionsRequest {
                prompt: Prompt::Single("Hello".into()),
            }),
            ..Default::default()
        };
        let err = extract_combined_prompt(&completions).unwrap_err();
        assert!(matches!(err, Error::UnsupportedInput { .. }));
    }

    #[test]
    fn test_request_id_from_header_or_generated() {
        let mut headers = HashMap::new();
        headers.insert(REQUEST_ID_HEADER_KEY.to_string(), "req-42".to_string());
        assert_eq!(extract_request_id(&headers, REQUEST_ID_HEADER_KEY), "req-42");

        headers.insert(REQUEST_ID_HEADER_KEY.to_string(), String::new());
        let generated = extract_request_id(&headers, REQUEST_ID_HEADER_KEY);
        assert!(!generated.is_empty());

        let a = extract_request_id(&HashMap::new(), REQUEST_ID_HEADER_KEY);
        let b = extract_request_id(&HashMap::new(), REQUEST_ID_HEADER_KEY);
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn test_stream_chunk_precedence() {
        let parser = VllmGrpcParser::new();

        let complete = GenerateResponse {
            response: Some(generate_response::Response::Complete(GenerateComplete {
                prompt_tokens: 3,
                completion_tokens: 7,
                finish_reason: "length".into(),
                ..Default::default()
            })),
        };
        let parsed = parser
            .parse_stream_response(&complete.encode_to_vec())
            .unwrap();
        assert_eq!(parsed.usage, Usage::new(3, 7));
        assert_eq!(parsed.finish_reason.as_deref(), Some("length"));

        let chunk = GenerateResponse {
            response: Some(generate_response::Response::Chunk(GenerateStreamChunk {
                token_ids: vec![1, 2],
                prompt_tokens: 3,
                completion_tokens: 2,
                cached_tokens: 0,
            })),
        };
        let parsed = parser.parse_stream_response(&chunk.encode_to_vec()).unwrap();
        assert_eq!(parsed.usage, Usage::new(3, 2));
        assert!(parsed.finish_reason.is_none());

        let empty = GenerateResponse::default().encode_to_vec();
        let err = parser.parse_stream_response(&empty).unwrap_err();
        assert!(matches!(err, Error::IncompleteResponse { .. }));
    }

    #[test]
    fn test_undecodable_response_is_malformed() {
        let parser = VllmGrpcParser::new();
        // Truncated length-delimited field.
        let err = parser.parse_response(&[0x12, 0x05, 0x08]).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));
    }
}
