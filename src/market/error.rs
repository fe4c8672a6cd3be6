//! Errors raised while talking to the marketplace.

use thiserror::Error;

/// Failure of a session, listing or detail request.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("market did not issue an XSRF-TOKEN cookie")]
    MissingToken,

    #[error("product not found: {0}")]
    ProductNotFound(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl CatalogError {
    /// Returns true for errors raised before any response was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, CatalogError::Transport(_))
    }
}
