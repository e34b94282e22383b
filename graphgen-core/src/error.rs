//! graphgen-core error helpers
//!
//! Re-exports graphgen-error and provides core-specific conveniences.

pub use graphgen_error::{Error, ErrorKind, ErrorStatus, Result};

use crate::provider::ProviderError;

// =============================================================================
// Core-specific error constructors
// =============================================================================

/// Create an ExpressionInvalid error for equation text that does not parse
pub fn syntax_error(equation: &str, reason: impl Into<String>) -> Error {
    Error::expression_invalid(equation, reason).with_operation("evaluator::parse")
}

/// Create an EvaluationFailed error for one sample
pub fn evaluation_failed(equation: &str, x: f64, reason: impl Into<String>) -> Error {
    Error::evaluation_failed(reason)
        .with_operation("evaluator::eval_at")
        .with_context("equation", equation)
        .with_context("x", x.to_string())
}

/// Create a ClassificationFailed error for a reply that is not JSON
pub fn reply_not_json(reply: &str, source: serde_json::Error) -> Error {
    Error::classification_failed("oracle reply is not valid JSON")
        .with_operation("classifier::classify_reply")
        .with_context("reply", preview(reply, 200))
        .set_source(source)
}

/// Create an UnrecognizedShape error for JSON that is neither shape
pub fn unrecognized_shape(value: &serde_json::Value, reason: impl Into<String>) -> Error {
    Error::unrecognized_shape(reason)
        .with_operation("classifier::classify_reply")
        .with_context("reply", preview(&value.to_string(), 200))
}

/// Create a RenderFailed error
pub fn render_failed(reason: impl Into<String>) -> Error {
    Error::render_failed(reason).with_operation("renderer::draw")
}

/// Create a CacheFailed error
pub fn cache_failed(reason: impl Into<String>) -> Error {
    Error::cache_failed(reason).with_operation("cache")
}

/// Create an IoFailed error
pub fn io_error(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::IoFailed, message)
}

/// Create a SerializationFailed error
pub fn serialization_error(message: impl Into<String>) -> Error {
    Error::serialization_failed(message)
}

/// Wrap a provider failure, keeping the provider name for the log
pub fn provider_failed(provider: &str, err: ProviderError) -> Error {
    let kind = match &err {
        ProviderError::Network(_) => ErrorKind::NetworkFailed,
        ProviderError::RateLimited { .. } => ErrorKind::RateLimited,
        ProviderError::AuthenticationFailed => ErrorKind::AuthenticationFailed,
        ProviderError::Api { status, .. } if *status >= 500 => ErrorKind::ProviderUnavailable,
        _ => ErrorKind::InferenceFailed,
    };
    Error::new(kind, err.to_string())
        .with_operation("provider::complete")
        .with_context("provider", provider)
        .set_source(err)
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}…", head)
    }
}
