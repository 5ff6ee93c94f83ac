//! Unified error hierarchy for the progression engine
//!
//! Read/write failures never block the completion of the current exercise;
//! they surface as explicit `Result` values the caller logs and survives,
//! and the next session simply falls back to first-week treatment.

use thiserror::Error;

/// Top-level error type for all progression operations
#[derive(Debug, Error)]
pub enum ProgressionError {
    /// Store read/write errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Malformed programmed-repetitions spec
    #[error("Invalid reps spec: {spec:?}")]
    InvalidRepsSpec { spec: String },

    /// Feedback submitted for an instance that is not marked complete
    #[error("Instance {id} has not been completed")]
    InstanceNotCompleted { id: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Store operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection failed
    #[error("Store connection failed: {reason}")]
    Connection { reason: String },

    /// Query execution failed
    #[error("Query failed: {reason}")]
    QueryFailed { reason: String },

    /// Write failed
    #[error("Write failed for {entity}.{id}: {reason}")]
    WriteFailed {
        entity: String,
        id: String,
        reason: String,
    },

    /// Record not found
    #[error("Record not found: {entity}.{id}")]
    NotFound { entity: String, id: String },
}

/// Result type alias for progression operations
pub type Result<T> = std::result::Result<T, ProgressionError>;

impl ProgressionError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProgressionError::Store(StoreError::Connection { .. }) | ProgressionError::Io(_)
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ProgressionError::Store(StoreError::NotFound { .. }) => ErrorSeverity::Warning,
            ProgressionError::InvalidRepsSpec { .. } => ErrorSeverity::Warning,
            ProgressionError::InstanceNotCompleted { .. } => ErrorSeverity::Warning,
            ProgressionError::Store(_) => ErrorSeverity::Error,
            ProgressionError::Configuration(_) => ErrorSeverity::Error,
            ProgressionError::Io(_) => ErrorSeverity::Error,
            ProgressionError::Internal(_) => ErrorSeverity::Critical,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            ProgressionError::Store(StoreError::Connection { .. }) => {
                "Unable to reach the workout store. Your completed exercise was still recorded."
                    .to_string()
            }
            ProgressionError::Store(StoreError::NotFound { entity, id }) => {
                format!("Could not find {} {}", entity, id)
            }
            ProgressionError::InvalidRepsSpec { spec } => {
                format!(
                    "The programmed repetitions \"{}\" could not be read. Expected a number or a min-max range.",
                    spec
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents the operation but the system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical | ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}
