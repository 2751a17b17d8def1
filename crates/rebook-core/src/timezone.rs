use crate::error::CoreError;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

/// Parse an IANA timezone name
pub fn parse_timezone(timezone: &str) -> Result<Tz, CoreError> {
    Tz::from_str(timezone).map_err(|_| CoreError::InvalidTimezone(timezone.to_string()))
}

/// Convert a civil datetime in `tz` to an instant.
///
/// Ambiguous times (DST fall-back) resolve to the earliest instant. Times that do
/// not exist (DST spring-forward) move one hour later.
pub fn resolve_local(tz: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    if let Some(dt) = tz.from_local_datetime(&local).earliest() {
        return dt.with_timezone(&Utc);
    }
    let shifted = local + Duration::hours(1);
    match tz.from_local_datetime(&shifted).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&local),
    }
}

/// The civil date of an instant in `tz`
pub fn civil_date(tz: &Tz, at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(tz).date_naive()
}

/// First instant of the civil day after `date`, i.e. the exclusive end of `date`.
pub fn end_of_day(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    match date.succ_opt() {
        Some(next) => resolve_local(tz, next.and_time(NaiveTime::MIN)),
        None => DateTime::<Utc>::MAX_UTC,
    }
}

/// Format an instant in the given timezone for display
pub fn format_in_timezone(datetime: DateTime<Utc>, tz: &Tz, format: &str) -> String {
    datetime.with_timezone(tz).format(format).to_string()
}
