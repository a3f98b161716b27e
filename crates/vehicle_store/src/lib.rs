//! Vehicle storage for PitStop
//!
//! This crate provides a storage abstraction for users, vehicles, maintenance
//! records and odometer logs. It ships an in-memory store (tests and ephemeral
//! sessions) and a SQLite store with a versioned schema.

mod error;
mod memory;
mod sqlite;
mod traits;

#[cfg(test)]
mod conformance;

pub use error::*;
pub use memory::*;
pub use sqlite::*;
pub use traits::*;
