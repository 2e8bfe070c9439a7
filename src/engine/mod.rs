pub mod calendar;
pub mod error;
pub mod events;
pub mod miss_detector;
pub mod schedule;
pub mod snapshot;
pub mod transfer;
