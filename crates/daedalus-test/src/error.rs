//! Test error types.

use thiserror::Error;

/// Errors that can occur while reading a test response.
#[derive(Debug, Error)]
pub enum TestError {
    /// The body is not valid UTF-8.
    #[error("Body read error: {0}")]
    BodyRead(String),

    /// The body is not the expected JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let error = TestError::BodyRead("Invalid UTF-8".into());
        assert_eq!(error.to_string(), "Body read error: Invalid UTF-8");

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(TestError::from(json).to_string().starts_with("JSON error:"));
    }
}
