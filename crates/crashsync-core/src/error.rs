//! Error types for crashsync

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unresolved placeholder: environment variable {0} is not set")]
    UnresolvedPlaceholder(String),

    #[error("Invalid placeholder pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid target date: {0} (expected YYYYMMDD or YYYY-MM-DD)")]
    InvalidTargetDate(String),

    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} API returned {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Unexpected {service} response: {message}")]
    UnexpectedResponse {
        service: &'static str,
        message: String,
    },
}

impl Error {
    /// Build an `Api` error, keeping the response body short enough to log
    pub(crate) fn api(service: &'static str, status: u16, body: &str) -> Self {
        const MAX_BODY: usize = 512;
        let body = if body.chars().count() > MAX_BODY {
            let truncated: String = body.chars().take(MAX_BODY).collect();
            format!("{truncated}...")
        } else {
            body.to_string()
        };
        Error::Api {
            service,
            status,
            body,
        }
    }

    pub(crate) fn unexpected(service: &'static str, message: impl Into<String>) -> Self {
        Error::UnexpectedResponse {
            service,
            message: message.into(),
        }
    }
}
