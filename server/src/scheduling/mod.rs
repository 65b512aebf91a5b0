//! Time arithmetic, booking conflict detection and availability calculation for room schedules.

pub mod availability;
pub mod conflict_guard;
pub mod time_interval;
