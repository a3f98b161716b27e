use std::sync::Arc;

use entities::VehicleLog;

use super::{ServiceContext, WriteHandle};
use crate::{
    change_hub::{Subscription, Table},
    error::{AppError, AppResult},
    reminder::ReminderEvaluator,
    worker_pool::JobHandle,
};

/// Service for odometer readings.
#[derive(Clone)]
pub struct OdometerService {
    ctx: ServiceContext,
    reminders: Arc<ReminderEvaluator>,
}

impl OdometerService {
    pub fn new(ctx: ServiceContext, reminders: Arc<ReminderEvaluator>) -> Self {
        Self { ctx, reminders }
    }

    /// Logs a reading against the current vehicle, moves that vehicle's
    /// odometer to `km`, then queues a reminder check behind the write.
    pub async fn record_reading(
        &self,
        km: u32,
        photo_uri: Option<String>,
    ) -> AppResult<WriteHandle<VehicleLog>> {
        let uid = self.ctx.uid()?;
        let owner = uid.clone();

        let handle = self
            .ctx
            .write(
                &uid,
                &[Table::VehicleLogs, Table::Vehicles],
                move |store| async move {
                    let vehicle = store
                        .current_vehicle(&owner)
                        .await?
                        .ok_or(AppError::NoCurrentVehicle)?;

                    let mut log = VehicleLog::new(owner.as_str(), vehicle.id, km);
                    log.photo_uri = photo_uri;
                    let stored = store.insert_vehicle_log(&log).await?;
                    store.update_vehicle_km(&owner, vehicle.id, km).await?;

                    tracing::info!(vehicle_id = vehicle.id, km, "Recorded odometer reading");
                    Ok(stored)
                },
            )
            .await?;

        // Same key, so the check runs after the write; its result is not needed
        drop(self.check_reminders().await?);
        Ok(handle)
    }

    /// Queues a reminder check for the signed-in user.
    pub async fn check_reminders(&self) -> AppResult<JobHandle<usize>> {
        let uid = self.ctx.uid()?;
        let reminders = self.reminders.clone();
        let owner = uid.clone();

        Ok(self
            .ctx
            .pool
            .submit(&uid, async move { reminders.evaluate(&owner).await })
            .await?)
    }

    /// Newest reading, of one vehicle or across all of them.
    pub async fn latest(&self, vehicle_id: Option<i64>) -> AppResult<Option<VehicleLog>> {
        let uid = self.ctx.uid()?;
        Ok(self.ctx.store.latest_vehicle_log(&uid, vehicle_id).await?)
    }

    /// Readings, newest first.
    pub async fn history(&self, vehicle_id: Option<i64>) -> AppResult<Vec<VehicleLog>> {
        let uid = self.ctx.uid()?;
        Ok(self.ctx.store.list_vehicle_logs(&uid, vehicle_id).await?)
    }

    /// Odometer value of the current vehicle: its newest reading, else its
    /// stored value, else 0 when no vehicle is selected.
    pub async fn current_km(&self) -> AppResult<u32> {
        let uid = self.ctx.uid()?;
        let Some(vehicle) = self.ctx.store.current_vehicle(&uid).await? else {
            return Ok(0);
        };

        Ok(self
            .ctx
            .store
            .latest_vehicle_log(&uid, Some(vehicle.id))
            .await?
            .map_or(vehicle.current_km, |log| log.current_km))
    }

    pub async fn delete(&self, log_id: i64) -> AppResult<WriteHandle<()>> {
        let uid = self.ctx.uid()?;
        let owner = uid.clone();

        self.ctx
            .write(&uid, &[Table::VehicleLogs], move |store| async move {
                Ok(store.delete_vehicle_log(&owner, log_id).await?)
            })
            .await
    }

    pub fn observe_latest<C>(&self, vehicle_id: Option<i64>, callback: C) -> AppResult<Subscription>
    where
        C: Fn(Option<VehicleLog>) + Send + 'static,
    {
        let uid = self.ctx.uid()?;
        let store = self.ctx.store.clone();
        let owner = uid.clone();

        Ok(self.ctx.hub.observe(
            &uid,
            &[Table::VehicleLogs],
            move || {
                let store = store.clone();
                let owner = owner.clone();
                async move { Ok(store.latest_vehicle_log(&owner, vehicle_id).await?) }
            },
            callback,
        ))
    }
}
