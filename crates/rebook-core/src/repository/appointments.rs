use crate::error::CoreError;
use crate::models::Appointment;
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use uuid::Uuid;

pub(crate) async fn insert_appointment_row(
    conn: &mut SqliteConnection,
    appointment: &Appointment,
) -> Result<(), CoreError> {
    sqlx::query(
        r#"INSERT INTO appointments (id, series_id, sequence, resource_id, start_at, end_at,
            buffer_before, buffer_after, status, original_scheduled_at, notes,
            created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(appointment.id)
    .bind(appointment.series_id)
    .bind(appointment.sequence)
    .bind(&appointment.resource_id)
    .bind(appointment.start_at)
    .bind(appointment.end_at)
    .bind(appointment.buffer_before)
    .bind(appointment.buffer_after)
    .bind(appointment.status)
    .bind(appointment.original_scheduled_at)
    .bind(&appointment.notes)
    .bind(appointment.created_at)
    .bind(appointment.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Writes the mutable columns of an appointment that belongs to `series_id`.
pub(crate) async fn update_appointment_row(
    conn: &mut SqliteConnection,
    series_id: Uuid,
    appointment: &Appointment,
) -> Result<(), CoreError> {
    let result = sqlx::query(
        r#"UPDATE appointments
        SET start_at = ?, end_at = ?, status = ?, original_scheduled_at = ?, notes = ?,
            updated_at = ?
        WHERE id = ? AND series_id = ?"#,
    )
    .bind(appointment.start_at)
    .bind(appointment.end_at)
    .bind(appointment.status)
    .bind(appointment.original_scheduled_at)
    .bind(&appointment.notes)
    .bind(appointment.updated_at)
    .bind(appointment.id)
    .bind(series_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::NotFound(format!(
            "appointment {} in series {}",
            appointment.id, series_id
        )));
    }
    Ok(())
}

#[async_trait]
impl super::AppointmentRepository for SqliteRepository {
    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), CoreError> {
        let mut conn = self.pool().acquire().await?;
        insert_appointment_row(&mut *conn, appointment).await
    }

    async fn find_appointment_by_id(&self, id: Uuid) -> Result<Option<Appointment>, CoreError> {
        let appointment = sqlx::query_as("SELECT * FROM appointments WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(appointment)
    }

    async fn find_appointments_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Appointment>, CoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM appointments WHERE id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let appointments = qb.build_query_as().fetch_all(self.pool()).await?;
        Ok(appointments)
    }

    async fn find_appointments_for_series(
        &self,
        series_id: Uuid,
    ) -> Result<Vec<Appointment>, CoreError> {
        let appointments =
            sqlx::query_as("SELECT * FROM appointments WHERE series_id = ? ORDER BY sequence")
                .bind(series_id)
                .fetch_all(self.pool())
                .await?;
        Ok(appointments)
    }
}
