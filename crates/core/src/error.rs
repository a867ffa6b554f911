//! Error types for the Volition domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Volition operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Text generation errors ---
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    // --- Persistence errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Action catalog errors ---
    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    // --- Decision loop errors ---
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by backend, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Generator not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Empty response")]
    Empty,

    #[error("Malformed response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O failed for '{key}': {reason}")]
    Io { key: String, reason: String },

    #[error("Failed to encode '{key}': {reason}")]
    Encode { key: String, reason: String },

    #[error("Invalid store key: {0}")]
    InvalidKey(String),
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Unknown action: {0}")]
    Unknown(String),

    #[error("Action execution failed: {action}: {reason}")]
    ExecutionFailed { action: String, reason: String },

    #[error("Invalid action payload for {action}: {reason}")]
    InvalidPayload { action: String, reason: String },
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("No candidate actions supplied")]
    NoCandidates,

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
}
