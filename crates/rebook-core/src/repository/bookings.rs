use crate::error::CoreError;
use crate::models::{AppointmentStatus, BookedInterval};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
impl super::BookingRepository for SqliteRepository {
    async fn bookings_for(
        &self,
        resource_id: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<BookedInterval>, CoreError> {
        // Coarse day-widened prefilter in SQL; the exact padded overlap test runs on
        // parsed values below
        let rows: Vec<BookedInterval> = sqlx::query_as(
            r#"SELECT id AS appointment_id, series_id, resource_id, start_at, end_at,
                buffer_before, buffer_after
            FROM appointments
            WHERE resource_id = ? AND status != ?
                AND julianday(end_at) + buffer_after / 1440.0 >= julianday(?) - 1
                AND julianday(start_at) - buffer_before / 1440.0 <= julianday(?) + 1"#,
        )
        .bind(resource_id)
        .bind(AppointmentStatus::Cancelled)
        .bind(window_start)
        .bind(window_end)
        .fetch_all(self.pool())
        .await?;

        let mut bookings: Vec<BookedInterval> = rows
            .into_iter()
            .filter(|booking| {
                let (start, end) = booking.padded();
                start < window_end && window_start < end
            })
            .collect();
        bookings.sort_by_key(|b| b.start_at);
        Ok(bookings)
    }
}
