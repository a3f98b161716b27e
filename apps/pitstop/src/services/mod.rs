//! User-scoped services.
//!
//! Services resolve the signed-in user, run writes on the worker pool keyed by
//! that user, and publish change events when a write succeeds. Reads go
//! straight to the store.

mod maintenance;
mod odometer;
mod user;
mod vehicle;

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

pub use maintenance::MaintenanceService;
pub use odometer::OdometerService;
pub use user::UserService;
pub use vehicle::VehicleService;
use vehicle_store::VehicleStore;

use crate::{
    change_hub::{ChangeHub, Table},
    error::{AppError, AppResult},
    identity::IdentityProvider,
    worker_pool::{JobHandle, WorkerPool},
};

/// Result of a queued write.
///
/// Await it to get the write's outcome; dropping it lets the write finish
/// in the background.
#[must_use = "dropping a WriteHandle discards the write's outcome"]
pub struct WriteHandle<T> {
    inner: JobHandle<AppResult<T>>,
}

impl<T> Future for WriteHandle<T> {
    type Output = AppResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner)
            .poll(cx)
            .map(|result| result.map_err(AppError::from).and_then(|inner| inner))
    }
}

/// Shared plumbing behind every service.
#[derive(Clone)]
pub struct ServiceContext {
    pub store: Arc<dyn VehicleStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub pool: Arc<WorkerPool>,
    pub hub: Arc<ChangeHub>,
}

impl ServiceContext {
    /// Uid of the signed-in user.
    pub fn uid(&self) -> AppResult<String> {
        Ok(self.identity.require()?.uid)
    }

    /// Queues `op` on the user's worker. When it succeeds, a change event is
    /// published for each of `tables`.
    pub async fn write<T, F, Fut>(
        &self,
        user_uid: &str,
        tables: &'static [Table],
        op: F,
    ) -> AppResult<WriteHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce(Arc<dyn VehicleStore>) -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        let store = self.store.clone();
        let hub = self.hub.clone();
        let uid = user_uid.to_string();

        let inner = self
            .pool
            .submit(user_uid, async move {
                let result = op(store).await;
                match &result {
                    Ok(_) => {
                        for table in tables {
                            hub.publish(*table, &uid);
                        }
                    }
                    Err(e) => tracing::warn!(uid = %uid, error = %e, "Write failed"),
                }
                result
            })
            .await?;

        Ok(WriteHandle { inner })
    }

    /// Checks that `vehicle_id` names a vehicle owned by `user_uid`.
    pub(crate) async fn ensure_owned_vehicle(
        store: &dyn VehicleStore,
        user_uid: &str,
        vehicle_id: i64,
    ) -> AppResult<()> {
        match store.get_vehicle(user_uid, vehicle_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::InvalidReference { vehicle_id }),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use vehicle_store::MemoryVehicleStore;

    use super::ServiceContext;
    use crate::{
        change_hub::ChangeHub,
        identity::{IdentityProvider, StaticIdentity},
        worker_pool::WorkerPool,
    };

    pub const UID: &str = "uid-1";

    pub fn context_with(identity: impl IdentityProvider + 'static) -> ServiceContext {
        ServiceContext {
            store: Arc::new(MemoryVehicleStore::new()),
            identity: Arc::new(identity),
            pool: Arc::new(WorkerPool::new(2, 16)),
            hub: Arc::new(ChangeHub::new()),
        }
    }

    /// Context signed in as [`UID`], with the user row already stored.
    pub async fn signed_in() -> ServiceContext {
        let ctx = context_with(StaticIdentity::new(UID, "driver@example.com"));
        super::UserService::new(ctx.clone())
            .ensure_user()
            .await
            .unwrap()
            .await
            .unwrap();
        ctx
    }
}
