//! Application state

use std::sync::Arc;

use vehicle_store::{MemoryVehicleStore, SqliteVehicleStore, VehicleStore};

use crate::{
    change_hub::ChangeHub,
    config::AppConfig,
    error::AppResult,
    identity::IdentityProvider,
    notification::Notifier,
    reminder::ReminderEvaluator,
    services::{MaintenanceService, OdometerService, ServiceContext, UserService, VehicleService},
    worker_pool::WorkerPool,
};

/// Application state shared by every entry point
#[derive(Clone)]
pub struct AppState {
    /// Vehicle store
    pub store: Arc<dyn VehicleStore>,

    /// Background worker pool for writes and reminder checks
    pub pool: Arc<WorkerPool>,

    /// Change notifications for observers
    pub hub: Arc<ChangeHub>,

    /// Signed-in user
    pub identity: Arc<dyn IdentityProvider>,

    /// Reminder evaluator
    pub reminders: Arc<ReminderEvaluator>,

    /// Application configuration
    pub config: Arc<AppConfig>,

    pub users: UserService,
    pub vehicles: VehicleService,
    pub maintenance: MaintenanceService,
    pub odometer: OdometerService,
}

impl AppState {
    /// Opens the SQLite database named in `config` and wires up the app.
    pub async fn new(
        config: AppConfig,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> AppResult<Self> {
        config.validate()?;

        let store = SqliteVehicleStore::open(&config.database_path).await?;
        tracing::info!(path = %config.database_path.display(), "Opened database");

        Ok(Self::with_store(config, Arc::new(store), identity, notifier))
    }

    /// Wires up the app over an in-memory store.
    pub fn in_memory(
        config: AppConfig,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_store(
            config,
            Arc::new(MemoryVehicleStore::new()),
            identity,
            notifier,
        )
    }

    /// Wires up the app over an existing store.
    pub fn with_store(
        config: AppConfig,
        store: Arc<dyn VehicleStore>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let pool = Arc::new(WorkerPool::new(config.worker_count, config.queue_capacity));
        let hub = Arc::new(ChangeHub::new());
        let reminders = Arc::new(ReminderEvaluator::new(
            store.clone(),
            notifier,
            config.reminder_threshold_km,
        ));

        let ctx = ServiceContext {
            store: store.clone(),
            identity: identity.clone(),
            pool: pool.clone(),
            hub: hub.clone(),
        };

        Self {
            users: UserService::new(ctx.clone()),
            vehicles: VehicleService::new(ctx.clone()),
            maintenance: MaintenanceService::new(ctx.clone()),
            odometer: OdometerService::new(ctx, reminders.clone()),
            store,
            pool,
            hub,
            identity,
            reminders,
            config: Arc::new(config),
        }
    }

    /// Drains pending writes and stops the workers.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}
