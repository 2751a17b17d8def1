use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{Appointment, BookedInterval, PatternDefinition, Series, SeriesStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

// Domain modules
pub mod appointments;
pub mod bookings;
pub mod patterns;
pub mod series;

// Traits are defined in this module and implemented in respective domain modules

/// Domain-specific trait for pattern storage
#[async_trait]
pub trait PatternRepository {
    async fn insert_pattern(&self, pattern: &PatternDefinition) -> Result<(), CoreError>;
    async fn find_pattern_by_id(&self, id: Uuid) -> Result<Option<PatternDefinition>, CoreError>;
}

/// Domain-specific trait for the series aggregate
#[async_trait]
pub trait SeriesRepository {
    /// Stores a new series together with its appointments, atomically.
    async fn insert_series(
        &self,
        series: &Series,
        appointments: &[Appointment],
    ) -> Result<(), CoreError>;
    async fn find_series_by_id(&self, id: Uuid) -> Result<Option<Series>, CoreError>;
    async fn find_series_by_pattern(&self, pattern_id: Uuid) -> Result<Option<Series>, CoreError>;
    /// `None` lists every series.
    async fn find_series_by_status(
        &self,
        status: Option<SeriesStatus>,
    ) -> Result<Vec<Series>, CoreError>;
    /// Writes the series row and the given appointments in one transaction.
    ///
    /// The write only succeeds if the stored version still equals `series.version`;
    /// otherwise [`CoreError::ConcurrentModification`] is returned and nothing changes.
    /// Returns the series with its bumped version.
    async fn save_series(
        &self,
        series: &Series,
        appointments: &[Appointment],
    ) -> Result<Series, CoreError>;
}

/// Domain-specific trait for appointment rows
#[async_trait]
pub trait AppointmentRepository {
    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), CoreError>;
    async fn find_appointment_by_id(&self, id: Uuid) -> Result<Option<Appointment>, CoreError>;
    async fn find_appointments_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Appointment>, CoreError>;
    /// Sequence order.
    async fn find_appointments_for_series(
        &self,
        series_id: Uuid,
    ) -> Result<Vec<Appointment>, CoreError>;
}

/// Booking lookup used by conflict detection
#[async_trait]
pub trait BookingRepository {
    /// Non-cancelled appointments on `resource_id` whose padded interval touches the window.
    async fn bookings_for(
        &self,
        resource_id: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<BookedInterval>, CoreError>;
}

/// Main repository trait that composes all domain traits
pub trait Repository:
    PatternRepository + SeriesRepository + AppointmentRepository + BookingRepository + Send + Sync
{
}

/// SQLite implementation of the repository pattern
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: DbPool,
}

impl SqliteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the database pool for internal use across modules
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl Repository for SqliteRepository {}
