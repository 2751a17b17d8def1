use crate::error::CoreError;
use crate::models::{Appointment, Series, SeriesStatus};
use crate::repository::appointments::{insert_appointment_row, update_appointment_row};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
impl super::SeriesRepository for SqliteRepository {
    async fn insert_series(
        &self,
        series: &Series,
        appointments: &[Appointment],
    ) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;

        // Check if a series already exists for this pattern
        let existing: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM series WHERE pattern_id = ?")
                .bind(series.pattern_id)
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_some() {
            return Err(CoreError::Validation(format!(
                "A series already exists for pattern {}",
                series.pattern_id
            )));
        }

        sqlx::query(
            r#"INSERT INTO series (id, pattern_id, resource_id, title, client_name, notes, status,
                total_planned, total_completed, total_cancelled, total_rescheduled,
                payment_type, payment_status, paid_amount_cents, total_series_price_cents,
                version, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(series.id)
        .bind(series.pattern_id)
        .bind(&series.resource_id)
        .bind(&series.title)
        .bind(&series.client_name)
        .bind(&series.notes)
        .bind(series.status)
        .bind(series.total_planned)
        .bind(series.total_completed)
        .bind(series.total_cancelled)
        .bind(series.total_rescheduled)
        .bind(series.payment_type)
        .bind(series.payment_status)
        .bind(series.paid_amount_cents)
        .bind(series.total_series_price_cents)
        .bind(series.version)
        .bind(series.created_at)
        .bind(series.updated_at)
        .execute(&mut *tx)
        .await?;

        for appointment in appointments {
            insert_appointment_row(&mut *tx, appointment).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_series_by_id(&self, id: Uuid) -> Result<Option<Series>, CoreError> {
        let series = sqlx::query_as("SELECT * FROM series WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(series)
    }

    async fn find_series_by_pattern(&self, pattern_id: Uuid) -> Result<Option<Series>, CoreError> {
        let series = sqlx::query_as("SELECT * FROM series WHERE pattern_id = ?")
            .bind(pattern_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(series)
    }

    async fn find_series_by_status(
        &self,
        status: Option<SeriesStatus>,
    ) -> Result<Vec<Series>, CoreError> {
        let series = match status {
            Some(status) => {
                sqlx::query_as("SELECT * FROM series WHERE status = ? ORDER BY created_at")
                    .bind(status)
                    .fetch_all(self.pool())
                    .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM series ORDER BY created_at")
                    .fetch_all(self.pool())
                    .await?
            }
        };
        Ok(series)
    }

    async fn save_series(
        &self,
        series: &Series,
        appointments: &[Appointment],
    ) -> Result<Series, CoreError> {
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query(
            r#"UPDATE series
            SET title = ?, client_name = ?, notes = ?, status = ?,
                total_completed = ?, total_cancelled = ?, total_rescheduled = ?,
                payment_type = ?, payment_status = ?, paid_amount_cents = ?,
                total_series_price_cents = ?, version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?"#,
        )
        .bind(&series.title)
        .bind(&series.client_name)
        .bind(&series.notes)
        .bind(series.status)
        .bind(series.total_completed)
        .bind(series.total_cancelled)
        .bind(series.total_rescheduled)
        .bind(series.payment_type)
        .bind(series.payment_status)
        .bind(series.paid_amount_cents)
        .bind(series.total_series_price_cents)
        .bind(series.updated_at)
        .bind(series.id)
        .bind(series.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM series WHERE id = ?")
                .bind(series.id)
                .fetch_optional(&mut *tx)
                .await?;
            return Err(match exists {
                Some(_) => CoreError::ConcurrentModification(series.id),
                None => CoreError::NotFound(format!("Series with id {} not found", series.id)),
            });
        }

        for appointment in appointments {
            update_appointment_row(&mut *tx, series.id, appointment).await?;
        }

        tx.commit().await?;

        let mut saved = series.clone();
        saved.version += 1;
        Ok(saved)
    }
}
