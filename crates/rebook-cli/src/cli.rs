use clap::{Args, Parser, Subcommand};
use rebook_core::models::{PatternType, PaymentType, SeriesStatus};

/// Recurring appointment scheduling from the terminal
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Define and inspect recurrence patterns
    Pattern(PatternCommand),
    /// Preview the occurrences a pattern would generate
    Preview(PreviewCommand),
    /// Book previewed occurrences as a series
    Confirm(ConfirmCommand),
    /// Manage confirmed series
    Series(SeriesCommand),
    /// Complete, cancel or reschedule appointments
    Appointment(AppointmentCommand),
    /// Manage bookings that belong to no series
    Booking(BookingCommand),
}

// ============================================================================
// Patterns
// ============================================================================

#[derive(Parser, Debug, Clone)]
pub struct PatternCommand {
    #[command(subcommand)]
    pub command: PatternSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PatternSubcommand {
    /// Create a new pattern
    Create(CreatePatternCommand),
    /// Show a pattern and its RRULE equivalent
    Show(ShowPatternCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct CreatePatternCommand {
    /// The resource (barber, room, location) the appointments are booked on
    #[arg(long)]
    pub resource: String,
    /// weekly, biweekly, monthly or custom
    #[arg(long = "type", default_value = "weekly")]
    pub pattern_type: PatternType,
    /// Days of week for weekly patterns
    #[arg(long, help = "Days of week (mon,tue,wed,thu,fri,sat,sun)")]
    pub days: Option<String>,
    /// Time of day for each occurrence
    #[arg(long, help = "Time of day (e.g. '14:30', '9:00 AM')")]
    pub time: String,
    /// Length of each appointment in minutes
    #[arg(long, default_value_t = 60)]
    pub duration: u32,
    /// First date the pattern may produce (defaults to today)
    #[arg(long)]
    pub start: Option<String>,
    /// Last date the pattern may produce
    #[arg(long, conflicts_with = "count")]
    pub until: Option<String>,
    /// Number of occurrences
    #[arg(long)]
    pub count: Option<u32>,
    /// Day of month for monthly patterns (clamped to short months)
    #[arg(long, conflicts_with_all = ["week_of_month", "weekday"])]
    pub day_of_month: Option<u32>,
    /// Week of month (1-4) for monthly patterns
    #[arg(long, requires = "weekday")]
    pub week_of_month: Option<u32>,
    /// Weekday for monthly patterns by week of month
    #[arg(long, requires = "week_of_month")]
    pub weekday: Option<String>,
    /// Day interval for custom patterns
    #[arg(long)]
    pub interval: Option<u32>,
    /// Anchor date for custom patterns (defaults to the start date)
    #[arg(long)]
    pub anchor: Option<String>,
    #[arg(long)]
    pub exclude_holidays: bool,
    #[arg(long)]
    pub exclude_weekends: bool,
    /// Move conflicting occurrences to the next open slot instead of rejecting them
    #[arg(long)]
    pub reschedule_on_conflict: bool,
    /// How far ahead occurrences may be generated, in days
    #[arg(long)]
    pub max_advance: Option<u32>,
    /// Idle minutes required before each appointment
    #[arg(long, default_value_t = 0)]
    pub buffer_before: u32,
    /// Idle minutes required after each appointment
    #[arg(long, default_value_t = 0)]
    pub buffer_after: u32,
    #[arg(long, help = "IANA timezone (e.g. 'America/New_York')")]
    pub timezone: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ShowPatternCommand {
    /// The pattern ID
    pub id: String,
}

// ============================================================================
// Preview and confirmation
// ============================================================================

#[derive(Parser, Debug, Clone)]
pub struct PreviewCommand {
    /// The pattern ID
    pub pattern_id: String,
    /// Maximum number of occurrences to show
    #[arg(long)]
    pub max: Option<usize>,
    /// Generate from this date instead of today
    #[arg(long)]
    pub from: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ConfirmCommand {
    /// The pattern ID
    pub pattern_id: String,
    /// Title of the series
    #[arg(long)]
    pub title: String,
    /// Sequence numbers to book (e.g. '1,2,5'); every bookable occurrence when omitted
    #[arg(long)]
    pub accept: Option<String>,
    #[arg(long)]
    pub client: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    /// per_appointment, series_upfront or subscription
    #[arg(long, default_value = "per_appointment")]
    pub payment_type: PaymentType,
    /// Total price of the series (e.g. '120.00')
    #[arg(long)]
    pub price: Option<String>,
    /// Generation window start used for the preview
    #[arg(long)]
    pub from: Option<String>,
}

// ============================================================================
// Series
// ============================================================================

#[derive(Parser, Debug, Clone)]
pub struct SeriesCommand {
    #[command(subcommand)]
    pub command: SeriesSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SeriesSubcommand {
    /// List series
    List(ListSeriesCommand),
    /// Show a series and its appointments
    Show(SeriesIdArgs),
    /// Pause a series
    Pause(SeriesIdArgs),
    /// Resume a paused series
    Resume(SeriesIdArgs),
    /// Cancel a series and all of its outstanding appointments
    Cancel(ConfirmedSeriesArgs),
    /// Show counters, progress and payment state
    Stats(SeriesIdArgs),
    /// Recount the series counters from its appointments
    Reconcile(SeriesIdArgs),
    /// Record a payment against a series
    Pay(PayCommand),
    /// Refund everything paid for a series
    Refund(ConfirmedSeriesArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ListSeriesCommand {
    /// Only show series in this status
    #[arg(long)]
    pub status: Option<SeriesStatus>,
}

#[derive(Args, Debug, Clone)]
pub struct SeriesIdArgs {
    /// The series ID or a unique prefix of it
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct ConfirmedSeriesArgs {
    /// The series ID or a unique prefix of it
    pub id: String,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct PayCommand {
    /// The series ID or a unique prefix of it
    pub id: String,
    /// Amount paid (e.g. '40', '40.50')
    pub amount: String,
}

// ============================================================================
// Appointments and bookings
// ============================================================================

#[derive(Parser, Debug, Clone)]
pub struct AppointmentCommand {
    #[command(subcommand)]
    pub command: AppointmentSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AppointmentSubcommand {
    /// Mark appointments as completed
    Complete(TargetArgs),
    /// Cancel appointments
    Cancel(TargetArgs),
    /// Move appointments to a new time
    Reschedule(RescheduleCommand),
}

#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Appointment IDs
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<String>,
    /// Also apply to every later outstanding appointment of the same series
    #[arg(long)]
    pub remaining: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct RescheduleCommand {
    #[command(flatten)]
    pub targets: TargetArgs,
    /// Exact new local date and time (single appointment only)
    #[arg(long, conflicts_with_all = ["shift_days", "time"])]
    pub at: Option<String>,
    /// Move each appointment by this many days
    #[arg(long, allow_hyphen_values = true)]
    pub shift_days: Option<i64>,
    /// New time of day, used with --shift-days
    #[arg(long)]
    pub time: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct BookingCommand {
    #[command(subcommand)]
    pub command: BookingSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum BookingSubcommand {
    /// Add a standalone booking that blocks the resource
    Add(AddBookingCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct AddBookingCommand {
    #[arg(long)]
    pub resource: String,
    /// Local start date and time (e.g. '2030-03-05 10:00')
    #[arg(long)]
    pub start: String,
    /// Length in minutes
    #[arg(long, default_value_t = 60)]
    pub duration: u32,
    #[arg(long, default_value_t = 0)]
    pub buffer_before: u32,
    #[arg(long, default_value_t = 0)]
    pub buffer_after: u32,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long, help = "IANA timezone of --start")]
    pub timezone: Option<String>,
}
