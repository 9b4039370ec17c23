//! Error types for Loan Assist.

/// Top-level error type for the assistant.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Decision error: {0}")]
    Decision(#[from] DecisionError),

    #[error("Responder error: {0}")]
    Responder(#[from] ResponderError),
}

/// Configuration-related errors. Fatal at startup only.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Stale write for user {user_id}: stored version no longer {expected}")]
    VersionConflict { user_id: String, expected: u64 },
}

/// Messaging channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send {kind} to {user_id}: {reason}")]
    SendFailed {
        kind: &'static str,
        user_id: String,
        reason: String,
    },

    #[error("Invalid message payload: {0}")]
    InvalidMessage(String),
}

/// Per-field input validation failures.
///
/// These are recovered locally by re-prompting the same field; the cursor
/// never advances on a validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Name must not be empty")]
    EmptyName,

    #[error("Invalid date, expected DD-MM-YYYY")]
    InvalidDate,

    #[error("Age {age} outside the 18-75 range")]
    AgeOutOfRange { age: i32 },

    #[error("Invalid number")]
    InvalidNumber,

    #[error("Selection does not match an available option")]
    InvalidChoice,

    #[error("Bank details must be two lines: routing code, then account number")]
    InvalidBankDetails,

    #[error("Credit-check consent is required to proceed")]
    ConsentRequired,
}

/// Decision evaluator errors. Never recovered by fabricating an approval.
#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error("Decision evaluation unavailable: {0}")]
    Unavailable(String),
}

/// Generative support responder errors. The support handler degrades to the
/// static knowledge base when these occur.
#[derive(Debug, thiserror::Error)]
pub enum ResponderError {
    #[error("Responder request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid responder response: {0}")]
    InvalidResponse(String),
}

/// Result type alias for the assistant.
pub type Result<T> = std::result::Result<T, Error>;
