use thiserror::Error;

/// Errors returned by the Sheets client.
#[derive(Debug, Error)]
pub enum SheetsError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sheets API returned status {status} for {operation}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// No spreadsheet id is configured for the platform.
    #[error("no spreadsheet configured: set {0}")]
    NotConfigured(&'static str),

    #[error("sheet tab '{0}' not found in spreadsheet")]
    SheetNotFound(String),
}

impl SheetsError {
    /// Timeouts, connection failures, rate limiting (429) and 5xx are worth
    /// another attempt. Auth failures, bad requests, missing tabs and
    /// malformed responses are not.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            SheetsError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            SheetsError::Status { status, .. } => *status == 429 || (500..600).contains(status),
            SheetsError::Deserialize { .. }
            | SheetsError::NotConfigured(_)
            | SheetsError::SheetNotFound(_) => false,
        }
    }
}
