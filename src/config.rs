//! Parser selection and transcoding defaults.
//!
//! ```yaml
//! parser: vllm-grpc-parser
//! transcode:
//!   default_max_tokens: 1024
//!   request_id_header: x-request-id
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, ErrorContext};
use crate::extract::REQUEST_ID_HEADER_KEY;
use crate::parsers::sampling::DEFAULT_MAX_TOKENS;
use crate::parsers::{create_parser, Parser, ParserKind};

pub const ENV_PARSER: &str = "AI_PAYLOAD_PARSER";
pub const ENV_DEFAULT_MAX_TOKENS: &str = "AI_PAYLOAD_DEFAULT_MAX_TOKENS";
pub const ENV_REQUEST_ID_HEADER: &str = "AI_PAYLOAD_REQUEST_ID_HEADER";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PayloadConfig {
    #[serde(default)]
    pub parser: ParserKind,
    #[serde(default)]
    pub transcode: TranscodeConfig,
}

/// Knobs of the transcoding parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranscodeConfig {
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,
    #[serde(default = "default_request_id_header")]
    pub request_id_header: String,
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_request_id_header() -> String {
    REQUEST_ID_HEADER_KEY.to_string()
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            default_max_tokens: default_max_tokens(),
            request_id_header: default_request_id_header(),
        }
    }
}

impl PayloadConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, Error> {
        serde_yaml::from_str(yaml).map_err(|e| {
            Error::configuration(
                "invalid payload configuration",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("config"),
            )
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(
                "cannot read payload configuration",
                ErrorContext::new()
                    .with_field_path(path.display().to_string())
                    .with_details(e.to_string())
                    .with_source("config"),
            )
        })?;
        Self::from_yaml_str(&content).map_err(|e| match e {
            Error::Configuration { message, context } => Error::Configuration {
                message,
                context: context.with_field_path(path.display().to_string()),
            },
            other => other,
        })
    }

    /// Defaults overridden by `AI_PAYLOAD_*` environment variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup, usually the process environment.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(parser) = lookup(ENV_PARSER) {
            self.parser = parser.trim().parse()?;
        }
        if let Some(max) = lookup(ENV_DEFAULT_MAX_TOKENS) {
            self.transcode.default_max_tokens = max.trim().parse().map_err(|_| {
                Error::configuration(
                    format!("{} must be an unsigned integer, got '{}'", ENV_DEFAULT_MAX_TOKENS, max),
                    ErrorContext::new().with_field_path(ENV_DEFAULT_MAX_TOKENS),
                )
            })?;
        }
        if let Some(header) = lookup(ENV_REQUEST_ID_HEADER) {
            let header = header.trim().to_ascii_lowercase();
            if header.is_empty() {
                return Err(Error::configuration(
                    "request id header must not be empty",
                    ErrorContext::new().with_field_path(ENV_REQUEST_ID_HEADER),
                ));
            }
            self.transcode.request_id_header = header;
        }
        Ok(self)
    }

    /// Build the configured parser.
    pub fn build_parser(&self) -> Box<dyn Parser> {
        create_parser(self.parser, &self.transcode)
    }
}
