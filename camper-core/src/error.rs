//! Error types for camper operations

use thiserror::Error;

/// Remote service errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Request to {endpoint} failed with status {status}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Transport failure talking to {endpoint}: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("Invalid response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("Account not configured: {account_id}")]
    UnknownAccount { account_id: String },
}

/// Cache layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Pool {key} has no data to mutate")]
    NotUsable { key: String },

    #[error("Pool {key} is registered with a different payload type")]
    TypeMismatch { key: String },

    #[error("No pool registered under {key}")]
    UnknownPool { key: String },
}

/// Master error type for all camper errors.
#[derive(Debug, Clone, Error)]
pub enum CamperError {
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// The operation was canceled by its owner. Never shown to the user.
    #[error("operation canceled")]
    Canceled,
}

impl CamperError {
    /// Returns true for the cancellation sentinel.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

/// Result type alias for camper operations.
pub type CamperResult<T> = Result<T, CamperError>;

// =============================================================================
// TESTS
// =============================================================================
