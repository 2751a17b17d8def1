use rebook_core::holiday::HolidaySet;
use rebook_core::repository::SqliteRepository;
use rebook_core::scheduler::Scheduler;

pub mod appointment;
pub mod booking;
pub mod pattern;
pub mod preview;
pub mod series;

/// The scheduler as wired by the binary.
pub type App = Scheduler<SqliteRepository, HolidaySet>;
