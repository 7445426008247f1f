//! Error types for the dashboard API client.

use thiserror::Error;

/// Errors returned by [`DashboardApiClient`](crate::api_client::DashboardApiClient) methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The token is missing, expired, or invalid (HTTP 401).
    #[error("Not authenticated. Check the API token.")]
    NotAuthenticated,

    /// The server denied access (HTTP 403).
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// The requested resource was not found (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// A server error with status code and body.
    #[error("Server error ({status}): {body}")]
    ServerError { status: u16, body: String },

    /// A network, transport or decoding error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A configuration error (e.g. malformed base URL).
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Map a non-success HTTP status and body to an error.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => Self::NotAuthenticated,
            403 => Self::Forbidden(body),
            404 => Self::NotFound(body),
            _ => Self::ServerError { status, body },
        }
    }

    /// Whether retrying the same request could succeed.
    ///
    /// Transport failures, 5xx responses and 429 are transient; auth,
    /// missing resources and other client errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::ServerError { status, .. } => *status >= 500 || *status == 429,
            Self::NotAuthenticated | Self::Forbidden(_) | Self::NotFound(_) | Self::Config(_) => {
                false
            }
        }
    }
}
