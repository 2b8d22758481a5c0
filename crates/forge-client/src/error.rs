use std::fmt;

use forge_core::SchemaError;

pub const RATE_LIMIT_MESSAGE: &str = "API Rate Limit Exceeded.\nYour API key may have reached its usage limit or is not configured for billing. Please check your Google AI Studio project settings and ensure billing is enabled.";
pub const MALFORMED_MESSAGE: &str =
    "Failed to parse the response from the AI. The data was not valid JSON. Please try again.";
pub const UNAVAILABLE_MESSAGE: &str =
    "Failed to generate invention from the Gemini API. The service may be temporarily unavailable.";

/// A failed call to the generative backend.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendError {
    /// HTTP status when the service answered at all.
    pub status: Option<u16>,
    pub message: String,
}

impl BackendError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        self.status == Some(429)
            || self.message.contains("429")
            || self.message.contains("RESOURCE_EXHAUSTED")
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "backend returned HTTP {status}: {}", self.message),
            None => write!(f, "backend request failed: {}", self.message),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

/// Recoverable failure of one generation or refinement request.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationError {
    RateLimited,
    MalformedResponse(SchemaError),
    /// Carries the underlying backend detail for logs.
    ServiceUnavailable(String),
}

impl GenerationError {
    /// Message shown to the user in place of the invention.
    pub fn user_message(&self) -> &'static str {
        match self {
            GenerationError::RateLimited => RATE_LIMIT_MESSAGE,
            GenerationError::MalformedResponse(_) => MALFORMED_MESSAGE,
            GenerationError::ServiceUnavailable(_) => UNAVAILABLE_MESSAGE,
        }
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.user_message())
    }
}

impl std::error::Error for GenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerationError::MalformedResponse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SchemaError> for GenerationError {
    fn from(e: SchemaError) -> Self {
        GenerationError::MalformedResponse(e)
    }
}

impl From<BackendError> for GenerationError {
    fn from(e: BackendError) -> Self {
        if e.is_rate_limit() {
            GenerationError::RateLimited
        } else {
            GenerationError::ServiceUnavailable(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_detection() {
        assert!(BackendError::new(Some(429), "slow down").is_rate_limit());
        assert!(BackendError::new(Some(400), "status RESOURCE_EXHAUSTED").is_rate_limit());
        assert!(BackendError::new(None, "got 429 from proxy").is_rate_limit());
        assert!(!BackendError::new(Some(503), "overloaded").is_rate_limit());
    }

    #[test]
    fn test_backend_error_classification() {
        let e: GenerationError = BackendError::new(Some(429), "quota").into();
        assert_eq!(e, GenerationError::RateLimited);
        assert!(e.to_string().contains("billing"));

        let e: GenerationError = BackendError::new(Some(500), "boom").into();
        assert!(matches!(e, GenerationError::ServiceUnavailable(ref d) if d.contains("500")));
        assert_eq!(e.user_message(), UNAVAILABLE_MESSAGE);
    }

    #[test]
    fn test_schema_error_is_malformed() {
        let e: GenerationError = SchemaError::MissingField("imagePrompt".into()).into();
        assert_eq!(e.user_message(), MALFORMED_MESSAGE);
        assert!(std::error::Error::source(&e).is_some());
    }
}
