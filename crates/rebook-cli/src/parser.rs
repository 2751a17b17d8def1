use anyhow::{anyhow, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};

pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| anyhow!("Failed to parse date '{}' (expected YYYY-MM-DD): {}", input, e))
}

/// Accepts 24-hour ('14:30', '14:30:00') and 12-hour ('9:00 AM', '9:00pm') forms.
pub fn parse_time(input: &str) -> Result<NaiveTime> {
    let trimmed = input.trim();
    let upper = trimmed.to_uppercase();
    let compact = upper.replace(' ', "");
    ["%H:%M", "%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            ["%I:%M%p", "%I:%M:%S%p"]
                .iter()
                .find_map(|fmt| NaiveTime::parse_from_str(&compact, fmt).ok())
        })
        .ok_or_else(|| anyhow!("Failed to parse time '{}' (e.g. '14:30' or '2:30 PM')", input))
}

/// A local date and time such as '2030-03-05 10:00' or '2030-03-05T10:00'.
pub fn parse_datetime(input: &str) -> Result<NaiveDateTime> {
    let normalized = input.trim().replacen('T', " ", 1);
    let (date, time) = normalized
        .split_once(' ')
        .ok_or_else(|| anyhow!("Failed to parse '{}' (expected 'YYYY-MM-DD HH:MM')", input))?;
    Ok(parse_date(date)?.and_time(parse_time(time)?))
}

pub fn parse_weekday(input: &str) -> Result<Weekday> {
    input
        .trim()
        .parse::<Weekday>()
        .map_err(|_| {
            anyhow!(
                "Invalid weekday '{}'. Use mon, tue, wed, thu, fri, sat or sun",
                input
            )
        })
}

pub fn parse_weekdays(input: &str) -> Result<Vec<Weekday>> {
    input
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(parse_weekday)
        .collect()
}

/// Parses a decimal amount ('40', '40.5', '40.50') into cents.
pub fn parse_amount_cents(input: &str) -> Result<i64> {
    let trimmed = input.trim();
    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if whole.is_empty() || fraction.len() > 2 || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(anyhow!("Invalid amount '{}' (e.g. '40' or '40.50')", input));
    }
    let whole: i64 = whole
        .parse()
        .map_err(|_| anyhow!("Invalid amount '{}' (e.g. '40' or '40.50')", input))?;
    let cents: i64 = format!("{:0<2}", fraction).parse().unwrap_or(0);
    whole
        .checked_mul(100)
        .and_then(|v| v.checked_add(cents))
        .ok_or_else(|| anyhow!("Amount '{}' is too large", input))
}

pub fn parse_sequences(input: &str) -> Result<Vec<u32>> {
    input
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            part.trim()
                .parse::<u32>()
                .map_err(|_| anyhow!("Invalid occurrence number '{}'", part.trim()))
        })
        .collect()
}

pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, cents.abs() / 100, cents.abs() % 100)
}
