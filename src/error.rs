//! Error types shared across detection and metrics fetching.

use thiserror::Error;

/// Reasons a string is rejected as a token address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address length {0} outside 32..=44")]
    InvalidLength(usize),
    #[error("address contains non-base58 character {0:?}")]
    InvalidCharacter(char),
}

/// Failure of a single backend HTTP call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("backend returned HTTP {status} for {path}")]
    Status { status: u16, path: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Only a 502 is worth another attempt; every other failure is final.
    pub fn is_bad_gateway(&self) -> bool {
        matches!(self, ApiError::Status { status: 502, .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

/// Failure of a whole metrics fetch cycle. Raised only by the mandatory
/// token-detail call; auxiliary sections degrade silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("token detail request failed: {0}")]
    Core(#[from] ApiError),
    #[error("token detail payload invalid: {0}")]
    InvalidPayload(String),
}
