//! Core entity definitions for PitStop.
//!
//! This crate defines the data types shared by the store and the application
//! core: users, vehicles, maintenance records, odometer logs, and the static
//! maintenance type catalog.

mod maintenance;
mod maintenance_type;
mod user;
mod vehicle;
mod vehicle_log;

pub use maintenance::*;
pub use maintenance_type::*;
pub use user::*;
pub use vehicle::*;
pub use vehicle_log::*;
