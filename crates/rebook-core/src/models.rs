use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Recurrence Patterns
// ============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    #[default]
    Weekly,
    Biweekly,
    Monthly,
    Custom,
}

impl PatternType {
    /// Number of weeks between emitting weeks for week-based patterns.
    pub fn week_period(&self) -> Option<i64> {
        match self {
            PatternType::Weekly => Some(1),
            PatternType::Biweekly => Some(2),
            PatternType::Monthly | PatternType::Custom => None,
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternType::Weekly => write!(f, "weekly"),
            PatternType::Biweekly => write!(f, "biweekly"),
            PatternType::Monthly => write!(f, "monthly"),
            PatternType::Custom => write!(f, "custom"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid pattern type: {0}")]
pub struct ParsePatternTypeError(String);

impl FromStr for PatternType {
    type Err = ParsePatternTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weekly" => Ok(PatternType::Weekly),
            "biweekly" => Ok(PatternType::Biweekly),
            "monthly" => Ok(PatternType::Monthly),
            "custom" => Ok(PatternType::Custom),
            _ => Err(ParsePatternTypeError(s.to_string())),
        }
    }
}

/// A recurrence rule as submitted by a caller, before it is validated and stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewPattern {
    /// The barber, room or location the occurrences book
    pub resource_id: String,
    pub pattern_type: PatternType,
    pub preferred_time: NaiveTime,
    pub duration_minutes: u32,
    pub start_date: NaiveDate,
    /// Termination: exactly one of `end_date` / `occurrence_count`
    pub end_date: Option<NaiveDate>,
    pub occurrence_count: Option<u32>,
    /// Weekly and biweekly patterns
    #[serde(default)]
    pub days_of_week: Vec<Weekday>,
    /// Monthly by calendar day; clamped to the last day of short months
    pub day_of_month: Option<u32>,
    /// Monthly by ordinal weekday (e.g. 2nd Tuesday)
    pub week_of_month: Option<u32>,
    pub weekday_of_month: Option<Weekday>,
    /// Custom patterns
    pub interval_days: Option<u32>,
    pub anchor_date: Option<NaiveDate>,
    #[serde(default)]
    pub exclude_holidays: bool,
    #[serde(default)]
    pub exclude_weekends: bool,
    #[serde(default)]
    pub reschedule_on_conflict: bool,
    /// How far past the generation window start a single pass may reach.
    /// `None` falls back to the engine default.
    pub max_advance_days: Option<u32>,
    #[serde(default)]
    pub buffer_before: u32,
    #[serde(default)]
    pub buffer_after: u32,
    /// IANA timezone name the civil times are expressed in
    pub timezone: String,
}

/// A validated, stored recurrence rule. Immutable once a series has been confirmed from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatternDefinition {
    pub id: Uuid,
    pub resource_id: String,
    pub pattern_type: PatternType,
    pub preferred_time: NaiveTime,
    pub duration_minutes: u32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub occurrence_count: Option<u32>,
    pub days_of_week: Vec<Weekday>,
    pub day_of_month: Option<u32>,
    pub week_of_month: Option<u32>,
    pub weekday_of_month: Option<Weekday>,
    pub interval_days: Option<u32>,
    pub anchor_date: Option<NaiveDate>,
    pub exclude_holidays: bool,
    pub exclude_weekends: bool,
    pub reschedule_on_conflict: bool,
    pub max_advance_days: u32,
    pub buffer_before: u32,
    pub buffer_after: u32,
    pub timezone: String,
    pub created_at: DateTime<Utc>,
}

impl PatternDefinition {
    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn buffers(&self) -> Buffers {
        Buffers {
            before: self.buffer_before,
            after: self.buffer_after,
        }
    }
}

/// Minutes of required idle time around a booked interval.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Buffers {
    pub before: u32,
    pub after: u32,
}

impl Buffers {
    pub fn pad(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            start - Duration::minutes(i64::from(self.before)),
            end + Duration::minutes(i64::from(self.after)),
        )
    }
}

// ============================================================================
// Occurrences
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OccurrenceStatus {
    Available,
    Conflict,
    Excluded,
}

impl fmt::Display for OccurrenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OccurrenceStatus::Available => write!(f, "available"),
            OccurrenceStatus::Conflict => write!(f, "conflict"),
            OccurrenceStatus::Excluded => write!(f, "excluded"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    Weekend,
    Holiday,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::Weekend => write!(f, "weekend"),
            ExclusionReason::Holiday => write!(f, "holiday"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    DoubleBooking,
}

/// One overlapping booking found for a candidate slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConflictDescriptor {
    pub conflict_type: ConflictType,
    pub conflicting_appointment_id: Uuid,
    pub conflicting_start: DateTime<Utc>,
    pub conflicting_end: DateTime<Utc>,
    /// First open same-day slot, if any
    pub suggested_resolution: Option<DateTime<Utc>>,
}

/// A candidate occurrence produced by generation. Never persisted as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Occurrence {
    /// 1-based position in the series; `None` for excluded slots, which never become appointments
    pub sequence: Option<u32>,
    /// The civil date and time in the pattern's timezone
    pub scheduled_for: NaiveDateTime,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: OccurrenceStatus,
    pub exclusion: Option<ExclusionReason>,
    pub conflicts: Vec<ConflictDescriptor>,
}

impl Occurrence {
    pub fn is_bookable(&self) -> bool {
        self.status == OccurrenceStatus::Available
    }
}

// ============================================================================
// Series Aggregate
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SeriesStatus {
    Active,
    Paused,
    InProgress,
    Completed,
    Cancelled,
}

impl SeriesStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SeriesStatus::Completed | SeriesStatus::Cancelled)
    }

    /// `InProgress` is a reporting refinement of `Active`.
    pub fn is_running(&self) -> bool {
        matches!(self, SeriesStatus::Active | SeriesStatus::InProgress)
    }
}

impl fmt::Display for SeriesStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesStatus::Active => write!(f, "active"),
            SeriesStatus::Paused => write!(f, "paused"),
            SeriesStatus::InProgress => write!(f, "in_progress"),
            SeriesStatus::Completed => write!(f, "completed"),
            SeriesStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid series status: {0}")]
pub struct ParseSeriesStatusError(String);

impl FromStr for SeriesStatus {
    type Err = ParseSeriesStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(SeriesStatus::Active),
            "paused" => Ok(SeriesStatus::Paused),
            "in_progress" | "in-progress" => Ok(SeriesStatus::InProgress),
            "completed" => Ok(SeriesStatus::Completed),
            "cancelled" | "canceled" => Ok(SeriesStatus::Cancelled),
            _ => Err(ParseSeriesStatusError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    #[default]
    PerAppointment,
    SeriesUpfront,
    Subscription,
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentType::PerAppointment => write!(f, "per_appointment"),
            PaymentType::SeriesUpfront => write!(f, "series_upfront"),
            PaymentType::Subscription => write!(f, "subscription"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid payment type: {0}")]
pub struct ParsePaymentTypeError(String);

impl FromStr for PaymentType {
    type Err = ParsePaymentTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "per_appointment" => Ok(PaymentType::PerAppointment),
            "series_upfront" | "upfront" => Ok(PaymentType::SeriesUpfront),
            "subscription" => Ok(PaymentType::Subscription),
            _ => Err(ParsePaymentTypeError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Partial => write!(f, "partial"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

/// The persisted aggregate of accepted occurrences plus payment and lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Series {
    pub id: Uuid,
    pub pattern_id: Uuid,
    pub resource_id: String,
    pub title: String,
    pub client_name: Option<String>,
    pub notes: Option<String>,
    pub status: SeriesStatus,
    /// Fixed at confirmation from the accepted occurrence count
    pub total_planned: u32,
    pub total_completed: u32,
    pub total_cancelled: u32,
    pub total_rescheduled: u32,
    pub payment_type: PaymentType,
    pub payment_status: PaymentStatus,
    pub paid_amount_cents: i64,
    pub total_series_price_cents: Option<i64>,
    /// Optimistic concurrency token, bumped on every save
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied data attached to a series at confirmation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeriesMetadata {
    pub title: String,
    pub client_name: Option<String>,
    pub notes: Option<String>,
    pub payment_type: PaymentType,
    pub total_series_price_cents: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesCommand {
    Pause,
    Resume,
    Cancel,
}

impl fmt::Display for SeriesCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesCommand::Pause => write!(f, "pause"),
            SeriesCommand::Resume => write!(f, "resume"),
            SeriesCommand::Cancel => write!(f, "cancel"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid series command: {0}")]
pub struct ParseSeriesCommandError(String);

impl FromStr for SeriesCommand {
    type Err = ParseSeriesCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pause" => Ok(SeriesCommand::Pause),
            "resume" => Ok(SeriesCommand::Resume),
            "cancel" => Ok(SeriesCommand::Cancel),
            _ => Err(ParseSeriesCommandError(s.to_string())),
        }
    }
}

/// Read model summarising a series for reporting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesStatistics {
    pub series_id: Uuid,
    pub status: SeriesStatus,
    pub total_planned: u32,
    pub total_completed: u32,
    pub total_cancelled: u32,
    pub total_rescheduled: u32,
    pub outstanding: u32,
    pub completion_percentage: f64,
    pub payment_status: PaymentStatus,
    pub paid_amount_cents: i64,
    pub balance_due_cents: Option<i64>,
    pub next_appointment_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Appointments and Bookings
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
    Rescheduled,
}

impl AppointmentStatus {
    /// Still expected to happen: eligible for completion, cancellation and forward bulk edits.
    pub fn is_outstanding(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }

    /// Whether the appointment still occupies its slot for conflict purposes.
    pub fn occupies_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
            AppointmentStatus::Rescheduled => write!(f, "rescheduled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Appointment {
    pub id: Uuid,
    /// `None` for bookings made outside any series
    pub series_id: Option<Uuid>,
    pub sequence: Option<u32>,
    pub resource_id: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub buffer_before: u32,
    pub buffer_after: u32,
    pub status: AppointmentStatus,
    /// Set when the appointment is moved away from its generated slot
    pub original_scheduled_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn buffers(&self) -> Buffers {
        Buffers {
            before: self.buffer_before,
            after: self.buffer_after,
        }
    }

    pub fn as_booking(&self) -> BookedInterval {
        BookedInterval {
            appointment_id: self.id,
            series_id: self.series_id,
            resource_id: self.resource_id.clone(),
            start_at: self.start_at,
            end_at: self.end_at,
            buffer_before: self.buffer_before,
            buffer_after: self.buffer_after,
        }
    }
}

/// Data for a standalone booking that belongs to no series.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub resource_id: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub buffers: Buffers,
    pub notes: Option<String>,
}

/// An existing commitment on a resource, as seen by conflict detection.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct BookedInterval {
    pub appointment_id: Uuid,
    pub series_id: Option<Uuid>,
    pub resource_id: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub buffer_before: u32,
    pub buffer_after: u32,
}

impl BookedInterval {
    pub fn padded(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        Buffers {
            before: self.buffer_before,
            after: self.buffer_after,
        }
        .pad(self.start_at, self.end_at)
    }
}

// ============================================================================
// Bulk Actions
// ============================================================================

/// Where a rescheduled appointment should move to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescheduleTo {
    /// An exact civil date and time; only valid for a single target
    At(NaiveDateTime),
    /// Shift each target by whole days, optionally moving it to a new time of day
    Shift { days: i64, time: Option<NaiveTime> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    Reschedule(RescheduleTo),
    Cancel,
    Complete,
}

impl fmt::Display for BulkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulkAction::Reschedule(_) => write!(f, "reschedule"),
            BulkAction::Cancel => write!(f, "cancel"),
            BulkAction::Complete => write!(f, "complete"),
        }
    }
}

// ============================================================================
// Engine Configuration
// ============================================================================

/// Engine limits - core version.
/// This is separate from the CLI config to allow for type differences
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Default `max_count` for preview calls
    pub preview_cap: usize,
    /// Hard ceiling for any single generation pass
    pub max_generation_cap: usize,
    /// Used when a pattern does not set `max_advance_days`
    pub default_max_advance_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            preview_cap: 20,
            max_generation_cap: 500,
            default_max_advance_days: 365,
        }
    }
}
