use entities::Maintenance;
use vehicle_store::{MaintenanceFilter, MaintenanceOrder};

use super::{ServiceContext, WriteHandle};
use crate::{
    change_hub::{Subscription, Table},
    error::AppResult,
};

/// Service for the signed-in user's maintenance records.
#[derive(Clone)]
pub struct MaintenanceService {
    ctx: ServiceContext,
}

impl MaintenanceService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Stores a maintenance record. The referenced vehicle must belong to the
    /// signed-in user.
    pub async fn add(&self, mut maintenance: Maintenance) -> AppResult<WriteHandle<Maintenance>> {
        let uid = self.ctx.uid()?;
        maintenance.user_uid = uid.clone();

        self.ctx
            .write(&uid, &[Table::Maintenance], move |store| async move {
                ServiceContext::ensure_owned_vehicle(
                    store.as_ref(),
                    &maintenance.user_uid,
                    maintenance.vehicle_id,
                )
                .await?;
                let stored = store.insert_maintenance(&maintenance).await?;
                tracing::debug!(
                    maintenance_id = stored.id,
                    kind = %stored.kind,
                    "Stored maintenance"
                );
                Ok(stored)
            })
            .await
    }

    pub async fn update(&self, mut maintenance: Maintenance) -> AppResult<WriteHandle<()>> {
        let uid = self.ctx.uid()?;
        maintenance.user_uid = uid.clone();

        self.ctx
            .write(&uid, &[Table::Maintenance], move |store| async move {
                ServiceContext::ensure_owned_vehicle(
                    store.as_ref(),
                    &maintenance.user_uid,
                    maintenance.vehicle_id,
                )
                .await?;
                Ok(store.update_maintenance(&maintenance).await?)
            })
            .await
    }

    pub async fn delete(&self, maintenance_id: i64) -> AppResult<WriteHandle<()>> {
        let uid = self.ctx.uid()?;
        let owner = uid.clone();

        self.ctx
            .write(&uid, &[Table::Maintenance], move |store| async move {
                Ok(store.delete_maintenance(&owner, maintenance_id).await?)
            })
            .await
    }

    pub async fn delete_all(&self) -> AppResult<WriteHandle<()>> {
        let uid = self.ctx.uid()?;
        let owner = uid.clone();

        self.ctx
            .write(&uid, &[Table::Maintenance], move |store| async move {
                Ok(store.delete_all_maintenance(&owner).await?)
            })
            .await
    }

    /// Marks a maintenance as performed at the latest odometer reading.
    ///
    /// Prefers the newest reading of the maintenance's vehicle, falling back
    /// to the user's newest reading. Resolves to `None` (nothing changed)
    /// when the record is missing or there are no readings.
    pub async fn complete(
        &self,
        maintenance_id: i64,
    ) -> AppResult<WriteHandle<Option<Maintenance>>> {
        let uid = self.ctx.uid()?;
        let owner = uid.clone();

        self.ctx
            .write(&uid, &[Table::Maintenance], move |store| async move {
                let Some(mut maintenance) = store.get_maintenance(&owner, maintenance_id).await?
                else {
                    return Ok(None);
                };

                let reading = match store
                    .latest_vehicle_log(&owner, Some(maintenance.vehicle_id))
                    .await?
                {
                    Some(log) => Some(log),
                    None => store.latest_vehicle_log(&owner, None).await?,
                };
                let Some(reading) = reading else {
                    tracing::debug!(maintenance_id, "No odometer reading to complete against");
                    return Ok(None);
                };

                maintenance.executed_km = reading.current_km;
                store.update_maintenance(&maintenance).await?;
                tracing::info!(
                    maintenance_id,
                    executed_km = maintenance.executed_km,
                    "Completed maintenance"
                );
                Ok(Some(maintenance))
            })
            .await
    }

    pub async fn get(&self, maintenance_id: i64) -> AppResult<Option<Maintenance>> {
        let uid = self.ctx.uid()?;
        Ok(self.ctx.store.get_maintenance(&uid, maintenance_id).await?)
    }

    /// All records, newest first.
    pub async fn list(&self) -> AppResult<Vec<Maintenance>> {
        self.query(|filter| filter).await
    }

    pub async fn list_for_vehicle(&self, vehicle_id: i64) -> AppResult<Vec<Maintenance>> {
        self.query(|filter| filter.with_vehicle(vehicle_id)).await
    }

    /// Records whose type contains `query`, ignoring case.
    pub async fn search_by_type(&self, query: &str) -> AppResult<Vec<Maintenance>> {
        let query = query.to_string();
        self.query(move |filter| filter.with_kind_containing(query)).await
    }

    /// Records of exactly `kind`.
    pub async fn by_type(&self, kind: &str) -> AppResult<Vec<Maintenance>> {
        let kind = kind.to_string();
        self.query(move |filter| filter.with_kind(kind)).await
    }

    /// Records ordered by next-service distance, soonest first.
    pub async fn upcoming(&self) -> AppResult<Vec<Maintenance>> {
        self.query(|filter| filter.ordered_by(MaintenanceOrder::NextServiceAsc))
            .await
    }

    pub fn observe_list<C>(&self, callback: C) -> AppResult<Subscription>
    where
        C: Fn(Vec<Maintenance>) + Send + 'static,
    {
        self.observe(MaintenanceOrder::DateDesc, callback)
    }

    pub fn observe_upcoming<C>(&self, callback: C) -> AppResult<Subscription>
    where
        C: Fn(Vec<Maintenance>) + Send + 'static,
    {
        self.observe(MaintenanceOrder::NextServiceAsc, callback)
    }

    async fn query(
        &self,
        refine: impl FnOnce(MaintenanceFilter) -> MaintenanceFilter,
    ) -> AppResult<Vec<Maintenance>> {
        let uid = self.ctx.uid()?;
        let filter = refine(MaintenanceFilter::for_user(uid));
        Ok(self.ctx.store.list_maintenance(&filter).await?)
    }

    fn observe<C>(&self, order: MaintenanceOrder, callback: C) -> AppResult<Subscription>
    where
        C: Fn(Vec<Maintenance>) + Send + 'static,
    {
        let uid = self.ctx.uid()?;
        let store = self.ctx.store.clone();
        let filter = MaintenanceFilter::for_user(&uid).ordered_by(order);

        Ok(self.ctx.hub.observe(
            &uid,
            &[Table::Maintenance],
            move || {
                let store = store.clone();
                let filter = filter.clone();
                async move { Ok(store.list_maintenance(&filter).await?) }
            },
            callback,
        ))
    }
}
