//! 类型系统模块：网关请求与用量统计的核心数据类型。
//!
//! # Types Module
//!
//! Core value types shared by the extraction step, the parsers, and the
//! accounting stage that consumes their output.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | Chat message with role and content |
//! | [`ExtractedRequest`] | Typed view of an inbound request, before a parser attaches a payload |
//! | [`CanonicalRequestBody`] | Typed view plus the payload to forward |
//! | [`ParsedPayload`] | JSON object or serialized backend message |
//! | [`Usage`] | Prompt / completion / total token counts |
//! | [`ParsedResponse`] | Usage extracted from a response or chunk |

pub mod message;
pub mod request;
pub mod usage;

pub use message::{ContentPart, Message, MessageContent, MessageRole};
pub use request::{
    CanonicalRequestBody, ChatCompletionsRequest, CompletionsRequest, ExtractedRequest,
    ParsedPayload, Prompt,
};
pub use usage::{ParsedResponse, Usage};
