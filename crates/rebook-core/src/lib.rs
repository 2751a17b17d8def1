//! # Rebook Core Library
//!
//! A recurring appointment engine: define a pattern, preview the occurrences it
//! generates, confirm them as a persisted series and then manage that series and its
//! appointments over their lifetime.
//!
//! ## Features
//!
//! - **Pattern Definitions**: Weekly, biweekly, monthly (by day or by weekday) and
//!   custom day intervals, with holiday and weekend exclusion
//! - **Bounded Generation**: Every expansion is capped by a count and an advance horizon
//! - **Conflict Detection**: Buffered overlap checks against a resource's bookings, with
//!   same-day alternative slots
//! - **Series Lifecycle**: Pause, resume, cancel and automatic completion with counters
//!   kept consistent with the appointment rows
//! - **Bulk Actions**: Complete, cancel or reschedule many appointments with a
//!   per-appointment report
//! - **Timezone Awareness**: Wall-clock times resolved in the pattern's IANA zone
//!
//! ## Core Modules
//!
//! - [`models`]: Core data structures and transfer objects
//! - [`pattern`]: Pattern validation
//! - [`recurrence`]: Occurrence generation and RRULE export
//! - [`conflict`]: Conflict detection and slot suggestion
//! - [`lifecycle`]: Series state machine and counters
//! - [`bulk`]: Bulk appointment actions
//! - [`scheduler`]: Request-level facade tying the pieces to storage
//! - [`repository`]: Data access layer with Repository pattern
//! - [`db`]: Database connection and migration management
//! - [`error`]: Error types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use chrono::{NaiveTime, Utc, Weekday};
//! use rebook_core::{
//!     db, holiday::NoHolidays, models::{EngineConfig, NewPattern, PatternType, SeriesMetadata},
//!     repository::SqliteRepository, scheduler::Scheduler,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = db::establish_connection("rebook.db").await?;
//!     let repo = SqliteRepository::new(pool);
//!     let scheduler = Scheduler::new(repo, NoHolidays, EngineConfig::default());
//!
//!     let today = Utc::now().date_naive();
//!     let pattern = scheduler
//!         .create_pattern(
//!             NewPattern {
//!                 resource_id: "room-1".to_string(),
//!                 pattern_type: PatternType::Weekly,
//!                 preferred_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
//!                 duration_minutes: 60,
//!                 start_date: today,
//!                 occurrence_count: Some(8),
//!                 days_of_week: vec![Weekday::Mon],
//!                 timezone: "UTC".to_string(),
//!                 ..Default::default()
//!             },
//!             today,
//!         )
//!         .await?;
//!
//!     let preview = scheduler.preview_occurrences(pattern.id, None, today).await?;
//!     let accepted: Vec<u32> = preview
//!         .iter()
//!         .filter(|o| o.is_bookable())
//!         .filter_map(|o| o.sequence)
//!         .collect();
//!     let metadata = SeriesMetadata {
//!         title: "Weekly sync".into(),
//!         ..Default::default()
//!     };
//!     let confirmation = scheduler
//!         .confirm_series(pattern.id, &accepted, metadata, today, Utc::now())
//!         .await?;
//!     println!("Booked {} appointments", confirmation.appointments.len());
//!     Ok(())
//! }
//! ```

pub mod bulk;
pub mod conflict;
pub mod db;
pub mod error;
pub mod holiday;
pub mod lifecycle;
pub mod locks;
pub mod models;
pub mod pattern;
pub mod recurrence;
pub mod repository;
pub mod scheduler;
pub mod timezone;

pub use error::CoreError;
pub use scheduler::{Confirmation, RejectedOccurrence, Scheduler};
