use thiserror::Error;

/// Errors returned by the chat-completions gateway.
#[derive(Debug, Error)]
pub enum AiError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-2xx status.
    #[error("AI API returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The reply contained no `{...}` object.
    #[error("AI response does not contain a JSON object")]
    MissingJson,

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
