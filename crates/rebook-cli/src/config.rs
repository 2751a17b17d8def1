use chrono::NaiveDate;
use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use rebook_core::holiday::HolidaySet;
use rebook_core::models::EngineConfig;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Deserialize, Serialize, Debug)]
pub struct Config {
    /// Path of the SQLite database file
    pub database_path: String,
    /// Default tracing filter when RUST_LOG is unset
    pub log_level: String,
    /// Timezone used for new patterns, bookings and "today" (IANA format)
    pub default_timezone: String,
    /// Dates excluded by patterns with exclude_holidays set
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "rebook.db".to_string(),
            log_level: "warn".to_string(),
            default_timezone: detect_system_timezone(),
            holidays: Vec::new(),
            engine: EngineConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("rebook.toml"))
            .merge(Env::prefixed("REBOOK_"))
            .extract()
    }

    pub fn holiday_calendar(&self) -> HolidaySet {
        HolidaySet::new(self.holidays.iter().copied())
    }

    /// The configured default timezone, or UTC if it is not a valid IANA name.
    pub fn timezone(&self) -> Tz {
        Tz::from_str(&self.default_timezone).unwrap_or(Tz::UTC)
    }
}

/// Validates that a timezone string is a valid IANA timezone name
pub fn validate_timezone(timezone: &str) -> Result<Tz, String> {
    Tz::from_str(timezone).map_err(|_| {
        format!(
            "Invalid timezone: '{}'. Use IANA timezone names like 'America/New_York'",
            timezone
        )
    })
}

/// Detects the system timezone, falling back to UTC if detection fails
pub fn detect_system_timezone() -> String {
    if let Ok(tz) = std::env::var("TZ") {
        if !tz.is_empty() && validate_timezone(&tz).is_ok() {
            return tz;
        }
    }

    if let Ok(tz) = iana_time_zone::get_timezone() {
        if validate_timezone(&tz).is_ok() {
            return tz;
        }
    }

    "UTC".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_timezone() {
        assert!(validate_timezone("Europe/Berlin").is_ok());
        assert!(validate_timezone("UTC").is_ok());
        let err = validate_timezone("Mars/Olympus").unwrap_err();
        assert!(err.contains("Mars/Olympus"));
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database_path, "rebook.db");
        assert_eq!(config.engine, EngineConfig::default());
        assert!(config.holiday_calendar().is_empty());
    }
}
