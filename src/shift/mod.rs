//! Shift-date and attendance-status resolution.
//!
//! Everything in here is pure: no clocks, no database, no ambient
//! configuration. Handlers fetch the schedule and the current instant,
//! call in, and persist whatever comes back. All wall-clock math goes
//! through IANA timezone rules via `chrono-tz`; a shift that crosses
//! midnight belongs to the calendar date it *started* on.

pub mod classifier;
pub mod resolver;
pub mod schedule;

pub use classifier::{AttendanceStatus, classify};
pub use resolver::{ShiftResolution, resolve_shift, scheduled_start};
pub use schedule::{Schedule, ScheduleError, TimeOfDay};
