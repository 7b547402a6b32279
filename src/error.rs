use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path that caused the error (e.g., "request.stop", "response.complete")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., the underlying decoder message)
    pub details: Option<String>,
    /// Component that raised the error (e.g., "vllm-grpc-parser", "request_extractor")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for payload parsing and transcoding.
///
/// The first four variants are the taxonomy the gateway acts on; the rest
/// cover configuration and encoding plumbing around them.
#[derive(Debug, Error)]
pub enum Error {
    /// The bytes do not parse as the expected wire shape at all.
    #[error("Malformed input: {message}{}", format_context(.context))]
    MalformedInput {
        message: String,
        context: ErrorContext,
    },

    /// Well-formed, but missing a shape this parser requires.
    #[error("Unsupported input: {message}{}", format_context(.context))]
    UnsupportedInput {
        message: String,
        context: ErrorContext,
    },

    /// Well-formed and understood, but asks for a capability that is not implemented.
    #[error("Unsupported feature: {message}{}", format_context(.context))]
    UnsupportedFeature {
        message: String,
        context: ErrorContext,
    },

    /// The backend response decoded, but carries no usage-bearing section.
    #[error("Incomplete response: {message}{}", format_context(.context))]
    IncompleteResponse {
        message: String,
        context: ErrorContext,
    },

    #[error("Encoding error: {0}")]
    Encode(#[from] prost::EncodeError),

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn malformed(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::MalformedInput {
            message: msg.into(),
            context,
        }
    }

    pub fn unsupported_input(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::UnsupportedInput {
            message: msg.into(),
            context,
        }
    }

    pub fn unsupported_feature(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::UnsupportedFeature {
            message: msg.into(),
            context,
        }
    }

    pub fn incomplete(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::IncompleteResponse {
            message: msg.into(),
            context,
        }
    }

    pub fn configuration(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::MalformedInput { context, .. }
            | Error::UnsupportedInput { context, .. }
            | Error::UnsupportedFeature { context, .. }
            | Error::IncompleteResponse { context, .. }
            | Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Stable snake_case class name, suitable for metric labels.
    pub fn class(&self) -> &'static str {
        match self {
            Error::MalformedInput { .. } => "malformed_input",
            Error::UnsupportedInput { .. } => "unsupported_input",
            Error::UnsupportedFeature { .. } => "unsupported_feature",
            Error::IncompleteResponse { .. } => "incomplete_response",
            Error::Encode(_) => "encode_error",
            Error::Configuration { .. } => "configuration",
        }
    }

    /// Whether the inbound request must be rejected rather than forwarded.
    pub fn is_request_rejection(&self) -> bool {
        matches!(
            self,
            Error::MalformedInput { .. }
                | Error::UnsupportedInput { .. }
                | Error::UnsupportedFeature { .. }
        )
    }

    /// A missing usage section is a per-response anomaly for accounting, not a failure.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::IncompleteResponse { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = Error::malformed(
            "body is not valid JSON",
            ErrorContext::new()
                .with_field_path("request")
                .with_source("request_extractor"),
        );
        assert_eq!(
            err.to_string(),
            "Malformed input: body is not valid JSON (field: request, source: request_extractor)"
        );
    }

    #[test]
    fn test_context_accessor() {
        let err = Error::unsupported_feature(
            "streaming",
            ErrorContext::new().with_field_path("stream"),
        );
        assert_eq!(err.context().unwrap().field_path.as_deref(), Some("stream"));
    }

    #[test]
    fn test_display_without_context() {
        let err = Error::incomplete("no complete section", ErrorContext::default());
        assert_eq!(err.to_string(), "Incomplete response: no complete section");
    }

    #[test]
    fn test_classification() {
        let rejected = [
            Error::malformed("x", ErrorContext::new()),
            Error::unsupported_input("x", ErrorContext::new()),
            Error::unsupported_feature("x", ErrorContext::new()),
        ];
        for err in &rejected {
            assert!(err.is_request_rejection(), "{} should reject", err.class());
            assert!(err.is_fatal());
        }

        let incomplete = Error::incomplete("x", ErrorContext::new());
        assert!(!incomplete.is_request_rejection());
        assert!(!incomplete.is_fatal());
        assert_eq!(incomplete.class(), "incomplete_response");
    }
}
