//! # ai-payload-rust
//!
//! 推理网关数据面的载荷转码库：把 OpenAI 风格请求转换为后端线格式，并从后端响应中提取用量。
//!
//! Payload transcoding for the data path of an inference gateway.
//!
//! ## Overview
//!
//! A gateway stage hands each inbound request body to a [`Parser`], which
//! extracts the fields used for scheduling and builds the payload the backend
//! expects. The backend's response bytes (or each chunk of a stream) go back
//! through the same parser, which returns the token [`Usage`] for accounting.
//!
//! | Parser | Backend | Payload |
//! |--------|---------|---------|
//! | [`OpenAiParser`] | OpenAI-compatible HTTP | original JSON, unchanged |
//! | [`VllmGrpcParser`] | vLLM gRPC `Generate` | `GenerateRequest` protobuf |
//!
//! ## Quick Start
//!
//! ```rust
//! use ai_payload_rust::{Parser, VllmGrpcParser};
//! use std::collections::HashMap;
//!
//! let parser = VllmGrpcParser::new();
//! let body = br#"{"model":"llama","messages":[{"role":"user","content":"Hello"}],"max_tokens":64}"#;
//! let request = parser.parse_request(&HashMap::new(), body)?;
//! assert!(request.payload.as_bytes().is_some());
//! # Ok::<(), ai_payload_rust::Error>(())
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`parsers`] | `Parser` trait and the built-in parsers |
//! | [`extract`] | Request classification and OpenAI usage extraction |
//! | [`proto`] | vLLM gRPC wire messages |
//! | [`types`] | Canonical request, payload, and usage types |
//! | [`config`] | Parser selection and transcoding defaults |
//! | [`registry`] | Name-to-parser registry |

pub mod config;
pub mod extract;
pub mod parsers;
pub mod proto;
pub mod registry;
pub mod types;

pub use config::{PayloadConfig, TranscodeConfig};
pub use parsers::{create_parser, OpenAiParser, Parser, ParserKind, TypedName, VllmGrpcParser};
pub use registry::{default_registry, ParserRegistry};
pub use types::{
    CanonicalRequestBody, ExtractedRequest, Message, MessageRole, ParsedPayload, ParsedResponse,
    Usage,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
