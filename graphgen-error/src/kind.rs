//! Error kinds for graphgen operations

use std::fmt;

/// The kind of error that occurred.
///
/// Callers match on ErrorKind to decide what to tell the user; the full error
/// (operation, context, source) goes to the diagnostic log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// The requested feature or operation is not supported
    Unsupported,

    /// Invalid configuration or parameters
    ConfigInvalid,

    /// Invalid argument passed to function
    InvalidArgument,

    // =========================================================================
    // Classification errors
    // =========================================================================
    /// The oracle reply could not be decoded as JSON
    ClassificationFailed,

    /// The decoded reply was neither a point list nor an equation
    UnrecognizedShape,

    // =========================================================================
    // Expression errors
    // =========================================================================
    /// The equation text does not parse
    ExpressionInvalid,

    /// The equation could not be evaluated at one or more samples
    EvaluationFailed,

    // =========================================================================
    // Rendering errors
    // =========================================================================
    /// Drawing the figure failed
    RenderFailed,

    // =========================================================================
    // Inference/LLM errors
    // =========================================================================
    /// LLM inference failed
    InferenceFailed,

    /// Provider not available
    ProviderUnavailable,

    /// Rate limit exceeded
    RateLimited,

    /// API key missing or rejected
    AuthenticationFailed,

    // =========================================================================
    // Storage errors
    // =========================================================================
    /// Result cache operation failed
    CacheFailed,

    /// Serialization/deserialization failed
    SerializationFailed,

    // =========================================================================
    // IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,

    /// Network error
    NetworkFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            // General
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::Unsupported => "Unsupported",
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::InvalidArgument => "InvalidArgument",

            // Classification
            ErrorKind::ClassificationFailed => "ClassificationFailed",
            ErrorKind::UnrecognizedShape => "UnrecognizedShape",

            // Expression
            ErrorKind::ExpressionInvalid => "ExpressionInvalid",
            ErrorKind::EvaluationFailed => "EvaluationFailed",

            // Rendering
            ErrorKind::RenderFailed => "RenderFailed",

            // Inference
            ErrorKind::InferenceFailed => "InferenceFailed",
            ErrorKind::ProviderUnavailable => "ProviderUnavailable",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::AuthenticationFailed => "AuthenticationFailed",

            // Storage
            ErrorKind::CacheFailed => "CacheFailed",
            ErrorKind::SerializationFailed => "SerializationFailed",

            // IO
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",
            ErrorKind::NetworkFailed => "NetworkFailed",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::InferenceFailed
                | ErrorKind::NetworkFailed
                | ErrorKind::RateLimited
                | ErrorKind::ProviderUnavailable
        )
    }

    /// The short, generic message shown to the user.
    ///
    /// Returns `None` for kinds whose own message is already user-facing.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            ErrorKind::ClassificationFailed => {
                Some("Unable to parse the model's response. Please check the format.")
            }
            ErrorKind::UnrecognizedShape => {
                Some("The model's response did not describe points or an equation.")
            }
            ErrorKind::ExpressionInvalid | ErrorKind::EvaluationFailed => {
                Some("Unable to evaluate the equation.")
            }
            ErrorKind::RenderFailed => Some("Unable to draw the graph."),
            ErrorKind::InferenceFailed
            | ErrorKind::NetworkFailed
            | ErrorKind::RateLimited
            | ErrorKind::ProviderUnavailable
            | ErrorKind::AuthenticationFailed => Some("Unable to reach the language model."),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::UnrecognizedShape.to_string(), "UnrecognizedShape");
        assert_eq!(ErrorKind::InferenceFailed.to_string(), "InferenceFailed");
    }

    #[test]
    fn test_is_retryable() {
        assert!(ErrorKind::NetworkFailed.is_retryable());
        assert!(ErrorKind::RateLimited.is_retryable());
        assert!(!ErrorKind::EvaluationFailed.is_retryable());
        assert!(!ErrorKind::ClassificationFailed.is_retryable());
    }

    #[test]
    fn test_user_message() {
        assert_eq!(
            ErrorKind::EvaluationFailed.user_message(),
            ErrorKind::ExpressionInvalid.user_message()
        );
        assert!(ErrorKind::ClassificationFailed
            .user_message()
            .unwrap()
            .contains("Unable to parse"));
        assert_eq!(ErrorKind::InvalidArgument.user_message(), None);
    }
}
