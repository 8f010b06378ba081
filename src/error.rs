//! Error types for the inquiry CRM.

use uuid::Uuid;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Contact store and persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Contact not found: {id}")]
    NotFound { id: Uuid },

    #[error("Contact {id} cannot be marked sent with an empty message")]
    EmptyMessage { id: Uuid },

    #[error("Contact name and phone must both be non-empty")]
    MissingField,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },
}

/// Draft pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("A product name is required before drafting messages")]
    MissingProduct,

    #[error("There are no contacts to draft messages for")]
    EmptyStore,

    #[error("Contact not found: {id}")]
    NotFound { id: Uuid },

    #[error("Drafting is already in progress{}", .id.map(|id| format!(" for contact {id}")).unwrap_or_default())]
    Busy { id: Option<Uuid> },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Campaign runner errors.
#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    #[error("A campaign run is already in progress")]
    AlreadyRunning,

    #[error("Contact {id} is busy drafting or sending")]
    Busy { id: Uuid },

    #[error("Invalid dispatch link: {0}")]
    InvalidLink(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
