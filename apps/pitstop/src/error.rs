//! Application error types.

use vehicle_store::StoreError;

use crate::{config::ConfigError, worker_pool::PoolError};

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No signed-in user.
    #[error("You need to sign in first")]
    Unauthenticated,

    /// Storage error.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Background worker error.
    #[error("Worker error: {0}")]
    Pool(#[from] PoolError),

    /// A record points at a vehicle the user does not own.
    #[error("Vehicle {vehicle_id} does not exist or belongs to another user")]
    InvalidReference { vehicle_id: i64 },

    /// An odometer reading was submitted with no vehicle selected.
    #[error("Select a vehicle before recording a reading")]
    NoCurrentVehicle,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for application operations.
pub type AppResult<T> = Result<T, AppError>;
