use thiserror::Error;

/// Failure of a call to the hosted chat provider.
///
/// Callers are not expected to branch on the variant: any of them means the
/// turn failed and the demo fallback applies. The variants exist for logging
/// and for picking an HTTP status.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("chat provider is not configured: {0}")]
    Configuration(String),

    #[error("request to chat provider failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("chat provider returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed response from chat provider: {0}")]
    MalformedResponse(String),
}

impl GenerationError {
    /// Text that is safe to show an end user. Never includes provider output
    /// or credentials.
    pub fn public_message(&self) -> &'static str {
        match self {
            GenerationError::Configuration(_) => "Chat service is not configured",
            GenerationError::Transport(_)
            | GenerationError::Status { .. }
            | GenerationError::MalformedResponse(_) => "Failed to get response from the language model",
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, GenerationError::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_message_hides_provider_detail() {
        let err = GenerationError::Status {
            status: 401,
            message: "invalid x-api-key sk-ant-secret".to_string(),
        };
        assert!(!err.public_message().contains("sk-ant"));
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn configuration_is_distinguished() {
        assert!(GenerationError::Configuration("missing key".into()).is_configuration());
        assert!(!GenerationError::MalformedResponse("no text".into()).is_configuration());
    }
}
