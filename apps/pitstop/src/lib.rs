//! PitStop application core
//!
//! Ties the vehicle store to the signed-in user: per-entity services that
//! queue writes on a keyed worker pool, observable queries driven by change
//! events, and distance-based maintenance reminders.

pub mod change_hub;
pub mod config;
pub mod error;
pub mod identity;
pub mod notification;
pub mod reminder;
pub mod services;
pub mod state;
pub mod worker_pool;

pub use change_hub::{ChangeEvent, ChangeHub, Subscription, Table};
pub use config::{AppConfig, ConfigError};
pub use error::{AppError, AppResult};
pub use identity::{Identity, IdentityProvider, SessionIdentity, StaticIdentity};
#[cfg(all(feature = "desktop-notify", target_os = "linux"))]
pub use notification::DesktopNotifier;
pub use notification::{LogNotifier, NotificationBoard, Notifier, ReminderNotification};
pub use reminder::ReminderEvaluator;
pub use services::{
    MaintenanceService, OdometerService, UserService, VehicleService, WriteHandle,
};
pub use state::AppState;
pub use worker_pool::{JobHandle, PoolError, WorkerPool};
