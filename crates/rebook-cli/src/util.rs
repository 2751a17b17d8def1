use anyhow::{anyhow, Result};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use rebook_core::error::CoreError;
use rebook_core::holiday::HolidayCalendar;
use rebook_core::repository::Repository;
use rebook_core::scheduler::Scheduler;
use uuid::Uuid;

/// Resolves a full series id or a unique prefix of one.
pub async fn resolve_series_id<R: Repository, H: HolidayCalendar>(
    scheduler: &Scheduler<R, H>,
    short_id: &str,
) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(short_id) {
        return Ok(id);
    }
    if short_id.len() < 2 {
        return Err(anyhow!(CoreError::Validation(
            "Short ID must be at least 2 characters long.".to_string()
        )));
    }
    let prefix = short_id.to_lowercase();
    let matches: Vec<Uuid> = scheduler
        .list_series(None)
        .await?
        .into_iter()
        .map(|s| s.id)
        .filter(|id| id.to_string().starts_with(&prefix))
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(anyhow!(CoreError::NotFound(format!(
            "No series found with ID prefix '{}'",
            short_id
        )))),
        _ => Err(anyhow!(CoreError::Validation(format!(
            "Ambiguous series ID prefix '{}' matches {} series",
            short_id,
            matches.len()
        )))),
    }
}

pub fn parse_id(input: &str) -> Result<Uuid> {
    Uuid::parse_str(input.trim()).map_err(|_| anyhow!("Invalid ID '{}'", input))
}

pub fn today_in(tz: &Tz) -> NaiveDate {
    Utc::now().with_timezone(tz).date_naive()
}

pub fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}
