//! Error types for StaySmart.
//!
//! Defines the main error enum used throughout the data-access layer.

use thiserror::Error;

/// Main error type for StaySmart operations.
#[derive(Error, Debug)]
pub enum StaySmartError {
    /// Store connection errors (file unreachable, pool exhausted, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors (syntax errors, constraint violations, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// Schema and storage errors (migrations, recovery, directories).
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration errors (invalid config file, bad database url, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Password hashing or verification failures.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A row addressed by primary key does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// The write would duplicate state that must stay unique.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A status change that the entity's transition table does not allow.
    #[error("Cannot move {entity} from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StaySmartError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a persistence error with the given message.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an authentication error with the given message.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Creates a not-found error for the given entity and key.
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// Creates a conflict error with the given message.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Creates a transition error from two displayable states.
    pub fn invalid_transition(
        entity: &'static str,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Persistence(_) => "Persistence Error",
            Self::Config(_) => "Configuration Error",
            Self::Auth(_) => "Authentication Error",
            Self::NotFound { .. } => "Not Found",
            Self::Conflict(_) => "Conflict",
            Self::InvalidTransition { .. } => "Invalid Transition",
            Self::Internal(_) => "Internal Error",
        }
    }
}

impl From<sqlx::Error> for StaySmartError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Connection(err.to_string())
            }
            other => Self::Query(other.to_string()),
        }
    }
}

/// Result type alias using StaySmartError.
pub type Result<T> = std::result::Result<T, StaySmartError>;
