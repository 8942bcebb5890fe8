use thiserror::Error;

#[derive(Debug, Error)]
pub enum FillError {
    /// Completion or storage endpoint could not be reached
    #[error("HTTP request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Completion endpoint answered with a non-success status
    #[error("{endpoint} returned {status}: {body}")]
    ApiStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Completion endpoint answered with no usable text
    #[error("Empty completion from {0}")]
    EmptyCompletion(String),

    /// No completion-service credential configured
    #[error("No API key configured for {provider}")]
    MissingCredential { provider: String },

    /// JSON parsing failed (store file, completion response)
    #[error("JSON parse error ({context}): {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization failed (store file)
    #[error("JSON serialize error ({context}): {source}")]
    JsonSerialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Persistent store could not be read or written
    #[error("Storage error at '{path}': {source}")]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Selector text could not be parsed
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// Configuration could not be used as given
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FillError {
    /// Transport-class failures resolve to "not filled" without aborting a pass.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FillError::Http { .. } | FillError::ApiStatus { .. } | FillError::EmptyCompletion(_)
        )
    }
}
