use std::time::Duration;
use thiserror::Error;

/// Why a credential refresh did not produce a usable session
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    #[error("Refresh rejected: {0}")]
    Rejected(String),

    #[error("Refresh timed out after {0:?}")]
    Timeout(Duration),

    #[error("Refresh transport error: {0}")]
    Transport(String),

    /// The caller performing the refresh went away before finishing
    #[error("Refresh abandoned before completion")]
    Abandoned,
}

/// Outcome of one authenticated call
#[derive(Debug, Error)]
pub enum CallError {
    /// Server rejected the access token; eligible for one refresh-and-replay
    #[error("Authorization expired")]
    AuthExpired,

    #[error("Session expired: {0}")]
    SessionExpired(#[from] RefreshError),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response body: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, CallError>;
