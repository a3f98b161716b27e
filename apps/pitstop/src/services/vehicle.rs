use entities::Vehicle;

use super::{ServiceContext, WriteHandle};
use crate::{
    change_hub::{Subscription, Table},
    error::AppResult,
};

/// Service for the signed-in user's vehicles.
#[derive(Clone)]
pub struct VehicleService {
    ctx: ServiceContext,
}

impl VehicleService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Stores a vehicle for the signed-in user and returns it with its id.
    pub async fn add(&self, mut vehicle: Vehicle) -> AppResult<WriteHandle<Vehicle>> {
        let uid = self.ctx.uid()?;
        vehicle.user_uid = uid.clone();

        self.ctx
            .write(&uid, &[Table::Vehicles], move |store| async move {
                let stored = store.insert_vehicle(&vehicle).await?;
                tracing::debug!(vehicle_id = stored.id, "Stored vehicle");
                Ok(stored)
            })
            .await
    }

    pub async fn update(&self, mut vehicle: Vehicle) -> AppResult<WriteHandle<()>> {
        let uid = self.ctx.uid()?;
        vehicle.user_uid = uid.clone();

        self.ctx
            .write(&uid, &[Table::Vehicles], move |store| async move {
                Ok(store.update_vehicle(&vehicle).await?)
            })
            .await
    }

    /// Permanently removes a vehicle. Its maintenance and logs are kept.
    pub async fn delete(&self, vehicle_id: i64) -> AppResult<WriteHandle<()>> {
        let uid = self.ctx.uid()?;
        let owner = uid.clone();

        self.ctx
            .write(&uid, &[Table::Vehicles], move |store| async move {
                Ok(store.delete_vehicle(&owner, vehicle_id).await?)
            })
            .await
    }

    /// Hides a vehicle from listings and clears it as current.
    pub async fn deactivate(&self, vehicle_id: i64) -> AppResult<WriteHandle<()>> {
        let uid = self.ctx.uid()?;
        let owner = uid.clone();

        self.ctx
            .write(&uid, &[Table::Vehicles], move |store| async move {
                Ok(store.deactivate_vehicle(&owner, vehicle_id).await?)
            })
            .await
    }

    pub async fn update_km(&self, vehicle_id: i64, km: u32) -> AppResult<WriteHandle<()>> {
        let uid = self.ctx.uid()?;
        let owner = uid.clone();

        self.ctx
            .write(&uid, &[Table::Vehicles], move |store| async move {
                Ok(store.update_vehicle_km(&owner, vehicle_id, km).await?)
            })
            .await
    }

    /// Makes `vehicle_id` the current vehicle. Resolves to `false` when the
    /// vehicle is missing, inactive or not the user's.
    pub async fn set_current(&self, vehicle_id: i64) -> AppResult<WriteHandle<bool>> {
        let uid = self.ctx.uid()?;
        let owner = uid.clone();

        self.ctx
            .write(&uid, &[Table::Vehicles], move |store| async move {
                let selected = store.set_current_vehicle(&owner, vehicle_id).await?;
                if !selected {
                    tracing::warn!(vehicle_id, "Vehicle cannot be selected as current");
                }
                Ok(selected)
            })
            .await
    }

    pub async fn current(&self) -> AppResult<Option<Vehicle>> {
        let uid = self.ctx.uid()?;
        Ok(self.ctx.store.current_vehicle(&uid).await?)
    }

    pub async fn get(&self, vehicle_id: i64) -> AppResult<Option<Vehicle>> {
        let uid = self.ctx.uid()?;
        Ok(self.ctx.store.get_vehicle(&uid, vehicle_id).await?)
    }

    /// Active vehicles, newest first.
    pub async fn list(&self) -> AppResult<Vec<Vehicle>> {
        let uid = self.ctx.uid()?;
        Ok(self.ctx.store.list_vehicles(&uid).await?)
    }

    pub fn observe_list<C>(&self, callback: C) -> AppResult<Subscription>
    where
        C: Fn(Vec<Vehicle>) + Send + 'static,
    {
        let uid = self.ctx.uid()?;
        let store = self.ctx.store.clone();
        let owner = uid.clone();

        Ok(self.ctx.hub.observe(
            &uid,
            &[Table::Vehicles],
            move || {
                let store = store.clone();
                let owner = owner.clone();
                async move { Ok(store.list_vehicles(&owner).await?) }
            },
            callback,
        ))
    }

    pub fn observe_current<C>(&self, callback: C) -> AppResult<Subscription>
    where
        C: Fn(Option<Vehicle>) + Send + 'static,
    {
        let uid = self.ctx.uid()?;
        let store = self.ctx.store.clone();
        let owner = uid.clone();

        Ok(self.ctx.hub.observe(
            &uid,
            &[Table::Vehicles],
            move || {
                let store = store.clone();
                let owner = owner.clone();
                async move { Ok(store.current_vehicle(&owner).await?) }
            },
            callback,
        ))
    }
}
