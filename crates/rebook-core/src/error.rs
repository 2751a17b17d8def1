use thiserror::Error;
use uuid::Uuid;

use crate::models::SeriesStatus;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Serialization error")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A pattern or command argument is malformed. Nothing was persisted.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The command is not legal for the series in its current status. Nothing was mutated.
    #[error("Cannot {command} series {series_id} while it is {status}")]
    StateConflict {
        series_id: Uuid,
        status: SeriesStatus,
        command: &'static str,
    },

    #[error("Series counter invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Series {0} was modified concurrently, reload and retry")]
    ConcurrentModification(Uuid),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }
}
