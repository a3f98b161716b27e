//! Vehicle store trait definitions.

use async_trait::async_trait;
use entities::{Maintenance, User, Vehicle, VehicleLog};

use crate::StoreResult;

/// Ordering for maintenance listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaintenanceOrder {
    /// Most recent `date` first.
    #[default]
    DateDesc,
    /// Smallest `executed_km + periodicity_km` first ("upcoming" view).
    NextServiceAsc,
}

/// Filter options for listing maintenance records.
#[derive(Debug, Clone, Default)]
pub struct MaintenanceFilter {
    /// Owning user (always applied).
    pub user_uid: String,
    /// Filter by vehicle ID.
    pub vehicle_id: Option<i64>,
    /// Exact type match.
    pub kind: Option<String>,
    /// Case-insensitive substring type match.
    pub kind_contains: Option<String>,
    /// Result ordering.
    pub order: MaintenanceOrder,
}

impl MaintenanceFilter {
    /// Creates a filter matching every record of a user.
    pub fn for_user(user_uid: impl Into<String>) -> Self {
        Self {
            user_uid: user_uid.into(),
            ..Self::default()
        }
    }

    /// Filters by vehicle.
    pub fn with_vehicle(mut self, vehicle_id: i64) -> Self {
        self.vehicle_id = Some(vehicle_id);
        self
    }

    /// Filters by exact type.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Filters by types containing `query`.
    pub fn with_kind_containing(mut self, query: impl Into<String>) -> Self {
        self.kind_contains = Some(query.into());
        self
    }

    /// Sets the ordering.
    pub fn ordered_by(mut self, order: MaintenanceOrder) -> Self {
        self.order = order;
        self
    }

    /// Whether a record passes this filter.
    pub fn matches(&self, m: &Maintenance) -> bool {
        m.user_uid == self.user_uid
            && self.vehicle_id.is_none_or(|id| m.vehicle_id == id)
            && self.kind.as_ref().is_none_or(|k| &m.kind == k)
            && self
                .kind_contains
                .as_ref()
                .is_none_or(|q| m.kind.to_lowercase().contains(&q.to_lowercase()))
    }
}

/// Trait for vehicle storage operations.
///
/// Every read is scoped to a user. Inserts are upserts: a record whose id
/// already exists replaces the stored row. A record with id `0` gets a fresh
/// id, returned in the stored copy.
#[async_trait]
pub trait VehicleStore: Send + Sync {
    // ========== User Operations ==========

    /// Inserts or replaces a user (children are kept).
    async fn upsert_user(&self, user: &User) -> StoreResult<()>;

    /// Gets a user by uid.
    async fn get_user(&self, uid: &str) -> StoreResult<Option<User>>;

    /// Updates an existing user.
    async fn update_user(&self, user: &User) -> StoreResult<()>;

    /// Deletes a user together with all their vehicles, maintenance and logs.
    async fn delete_user(&self, uid: &str) -> StoreResult<()>;

    // ========== Vehicle Operations ==========

    /// Inserts or replaces a vehicle.
    ///
    /// New rows are never current and a replaced row keeps its current flag
    /// while it stays active. Fails with `NotFound` when `id` belongs to
    /// another user.
    async fn insert_vehicle(&self, vehicle: &Vehicle) -> StoreResult<Vehicle>;

    /// Updates an existing vehicle. The current flag is left as stored, or
    /// cleared when the vehicle becomes inactive.
    async fn update_vehicle(&self, vehicle: &Vehicle) -> StoreResult<()>;

    /// Hard-deletes a vehicle.
    async fn delete_vehicle(&self, user_uid: &str, id: i64) -> StoreResult<()>;

    /// Lists active vehicles, newest first.
    async fn list_vehicles(&self, user_uid: &str) -> StoreResult<Vec<Vehicle>>;

    /// Gets a vehicle by ID, active or not.
    async fn get_vehicle(&self, user_uid: &str, id: i64) -> StoreResult<Option<Vehicle>>;

    /// Gets the most recently created active vehicle.
    async fn latest_active_vehicle(&self, user_uid: &str) -> StoreResult<Option<Vehicle>>;

    /// Soft-deletes a vehicle.
    async fn deactivate_vehicle(&self, user_uid: &str, id: i64) -> StoreResult<()>;

    /// Updates a vehicle's odometer value.
    async fn update_vehicle_km(&self, user_uid: &str, id: i64, km: u32) -> StoreResult<()>;

    /// Clears the current flag on every vehicle of the user, then sets it on
    /// `id`, as one unit. Returns whether a vehicle was marked.
    async fn set_current_vehicle(&self, user_uid: &str, id: i64) -> StoreResult<bool>;

    /// Gets the active vehicle flagged as current.
    async fn current_vehicle(&self, user_uid: &str) -> StoreResult<Option<Vehicle>>;

    // ========== Maintenance Operations ==========

    /// Inserts or replaces a maintenance record. Fails with `NotFound` when
    /// `id` belongs to another user.
    async fn insert_maintenance(&self, maintenance: &Maintenance) -> StoreResult<Maintenance>;

    /// Updates an existing maintenance record.
    async fn update_maintenance(&self, maintenance: &Maintenance) -> StoreResult<()>;

    /// Deletes a maintenance record.
    async fn delete_maintenance(&self, user_uid: &str, id: i64) -> StoreResult<()>;

    /// Deletes every maintenance record of a user.
    async fn delete_all_maintenance(&self, user_uid: &str) -> StoreResult<()>;

    /// Lists maintenance records.
    async fn list_maintenance(&self, filter: &MaintenanceFilter) -> StoreResult<Vec<Maintenance>>;

    /// Gets a maintenance record by ID.
    async fn get_maintenance(&self, user_uid: &str, id: i64) -> StoreResult<Option<Maintenance>>;

    // ========== VehicleLog Operations ==========

    /// Inserts or replaces an odometer log. Fails with `NotFound` when `id`
    /// belongs to another user.
    async fn insert_vehicle_log(&self, log: &VehicleLog) -> StoreResult<VehicleLog>;

    /// Updates an existing odometer log.
    async fn update_vehicle_log(&self, log: &VehicleLog) -> StoreResult<()>;

    /// Deletes an odometer log.
    async fn delete_vehicle_log(&self, user_uid: &str, id: i64) -> StoreResult<()>;

    /// Deletes every odometer log of a user.
    async fn delete_all_vehicle_logs(&self, user_uid: &str) -> StoreResult<()>;

    /// Lists odometer logs, newest first, optionally for one vehicle.
    async fn list_vehicle_logs(
        &self,
        user_uid: &str,
        vehicle_id: Option<i64>,
    ) -> StoreResult<Vec<VehicleLog>>;

    /// Gets the newest odometer log, optionally for one vehicle.
    async fn latest_vehicle_log(
        &self,
        user_uid: &str,
        vehicle_id: Option<i64>,
    ) -> StoreResult<Option<VehicleLog>>;

    /// Gets an odometer log by ID.
    async fn get_vehicle_log(&self, user_uid: &str, id: i64) -> StoreResult<Option<VehicleLog>>;
}
