//! In-memory vehicle store implementation for testing.

use std::{
    cmp::Reverse,
    collections::{BTreeMap, HashMap},
};

use async_trait::async_trait;
use entities::{Maintenance, User, Vehicle, VehicleLog};
use tokio::sync::RwLock;

use crate::{MaintenanceFilter, MaintenanceOrder, StoreError, StoreResult, VehicleStore};

/// All tables behind one lock so cascades and current-vehicle selection are
/// atomic.
#[derive(Debug, Default)]
struct Tables {
    users: HashMap<String, User>,
    vehicles: BTreeMap<i64, Vehicle>,
    maintenance: BTreeMap<i64, Maintenance>,
    vehicle_logs: BTreeMap<i64, VehicleLog>,
    last_vehicle_id: i64,
    last_maintenance_id: i64,
    last_vehicle_log_id: i64,
}

impl Tables {
    fn ensure_user(&self, uid: &str) -> StoreResult<()> {
        if self.users.contains_key(uid) {
            Ok(())
        } else {
            Err(StoreError::unknown_user(uid))
        }
    }
}

/// Rejects an upsert whose id already belongs to another user's row.
fn ensure_claimable<'a, T>(
    existing: Option<&'a T>,
    owner: impl Fn(&T) -> &str,
    user_uid: &str,
    entity_type: &'static str,
    id: i64,
) -> StoreResult<Option<&'a T>> {
    match existing {
        Some(row) if owner(row) != user_uid => Err(StoreError::not_found(entity_type, id)),
        other => Ok(other),
    }
}

/// Picks the id a new row gets, keeping the counter ahead of explicit ids.
fn assign_id(requested: i64, last: &mut i64) -> i64 {
    if requested == 0 {
        *last += 1;
        *last
    } else {
        *last = (*last).max(requested);
        requested
    }
}

/// In-memory vehicle store.
#[derive(Debug, Default)]
pub struct MemoryVehicleStore {
    tables: RwLock<Tables>,
}

impl MemoryVehicleStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VehicleStore for MemoryVehicleStore {
    async fn upsert_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.users.insert(user.uid.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, uid: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(uid).cloned())
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&user.uid) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(StoreError::not_found("User", &user.uid)),
        }
    }

    async fn delete_user(&self, uid: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.users.remove(uid);
        tables.vehicles.retain(|_, v| v.user_uid != uid);
        tables.maintenance.retain(|_, m| m.user_uid != uid);
        tables.vehicle_logs.retain(|_, l| l.user_uid != uid);
        Ok(())
    }

    async fn insert_vehicle(&self, vehicle: &Vehicle) -> StoreResult<Vehicle> {
        let mut tables = self.tables.write().await;
        tables.ensure_user(&vehicle.user_uid)?;
        let existing = ensure_claimable(
            tables.vehicles.get(&vehicle.id),
            |v| v.user_uid.as_str(),
            &vehicle.user_uid,
            "Vehicle",
            vehicle.id,
        )?;

        // New rows are never current; a replaced row keeps its flag while active.
        let mut stored = vehicle.clone();
        stored.is_current = existing.is_some_and(|v| v.is_current) && vehicle.is_active;
        stored.id = assign_id(vehicle.id, &mut tables.last_vehicle_id);
        tables.vehicles.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_vehicle(&self, vehicle: &Vehicle) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.vehicles.get_mut(&vehicle.id) {
            Some(existing) if existing.user_uid == vehicle.user_uid => {
                let is_current = existing.is_current && vehicle.is_active;
                *existing = vehicle.clone();
                existing.is_current = is_current;
                Ok(())
            }
            _ => Err(StoreError::not_found("Vehicle", vehicle.id)),
        }
    }

    async fn delete_vehicle(&self, user_uid: &str, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.vehicles.get(&id).is_some_and(|v| v.user_uid == user_uid) {
            tables.vehicles.remove(&id);
        }
        Ok(())
    }

    async fn list_vehicles(&self, user_uid: &str) -> StoreResult<Vec<Vehicle>> {
        let tables = self.tables.read().await;
        let mut result: Vec<Vehicle> = tables
            .vehicles
            .values()
            .filter(|v| v.user_uid == user_uid && v.is_active)
            .cloned()
            .collect();
        result.sort_by_key(|v| Reverse((v.created_at, v.id)));
        Ok(result)
    }

    async fn get_vehicle(&self, user_uid: &str, id: i64) -> StoreResult<Option<Vehicle>> {
        let tables = self.tables.read().await;
        Ok(tables
            .vehicles
            .get(&id)
            .filter(|v| v.user_uid == user_uid)
            .cloned())
    }

    async fn latest_active_vehicle(&self, user_uid: &str) -> StoreResult<Option<Vehicle>> {
        Ok(self.list_vehicles(user_uid).await?.into_iter().next())
    }

    async fn deactivate_vehicle(&self, user_uid: &str, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(vehicle) = tables
            .vehicles
            .get_mut(&id)
            .filter(|v| v.user_uid == user_uid)
        {
            vehicle.is_active = false;
            vehicle.is_current = false;
        }
        Ok(())
    }

    async fn update_vehicle_km(&self, user_uid: &str, id: i64, km: u32) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(vehicle) = tables
            .vehicles
            .get_mut(&id)
            .filter(|v| v.user_uid == user_uid)
        {
            vehicle.current_km = km;
        }
        Ok(())
    }

    async fn set_current_vehicle(&self, user_uid: &str, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let selectable = tables
            .vehicles
            .get(&id)
            .is_some_and(|v| v.user_uid == user_uid && v.is_active);
        if !selectable {
            return Ok(false);
        }

        for vehicle in tables.vehicles.values_mut() {
            if vehicle.user_uid == user_uid {
                vehicle.is_current = vehicle.id == id;
            }
        }
        Ok(true)
    }

    async fn current_vehicle(&self, user_uid: &str) -> StoreResult<Option<Vehicle>> {
        let tables = self.tables.read().await;
        Ok(tables
            .vehicles
            .values()
            .find(|v| v.user_uid == user_uid && v.is_active && v.is_current)
            .cloned())
    }

    async fn insert_maintenance(&self, maintenance: &Maintenance) -> StoreResult<Maintenance> {
        let mut tables = self.tables.write().await;
        tables.ensure_user(&maintenance.user_uid)?;
        ensure_claimable(
            tables.maintenance.get(&maintenance.id),
            |m| m.user_uid.as_str(),
            &maintenance.user_uid,
            "Maintenance",
            maintenance.id,
        )?;
        let mut stored = maintenance.clone();
        stored.id = assign_id(maintenance.id, &mut tables.last_maintenance_id);
        tables.maintenance.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_maintenance(&self, maintenance: &Maintenance) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.maintenance.get_mut(&maintenance.id) {
            Some(existing) if existing.user_uid == maintenance.user_uid => {
                *existing = maintenance.clone();
                Ok(())
            }
            _ => Err(StoreError::not_found("Maintenance", maintenance.id)),
        }
    }

    async fn delete_maintenance(&self, user_uid: &str, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .maintenance
            .get(&id)
            .is_some_and(|m| m.user_uid == user_uid)
        {
            tables.maintenance.remove(&id);
        }
        Ok(())
    }

    async fn delete_all_maintenance(&self, user_uid: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.maintenance.retain(|_, m| m.user_uid != user_uid);
        Ok(())
    }

    async fn list_maintenance(&self, filter: &MaintenanceFilter) -> StoreResult<Vec<Maintenance>> {
        let tables = self.tables.read().await;
        let mut result: Vec<Maintenance> = tables
            .maintenance
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        match filter.order {
            MaintenanceOrder::DateDesc => result.sort_by_key(|m| Reverse((m.date, m.id))),
            MaintenanceOrder::NextServiceAsc => {
                result.sort_by_key(|m| {
                    (u64::from(m.executed_km) + u64::from(m.periodicity_km), m.id)
                })
            }
        }
        Ok(result)
    }

    async fn get_maintenance(&self, user_uid: &str, id: i64) -> StoreResult<Option<Maintenance>> {
        let tables = self.tables.read().await;
        Ok(tables
            .maintenance
            .get(&id)
            .filter(|m| m.user_uid == user_uid)
            .cloned())
    }

    async fn insert_vehicle_log(&self, log: &VehicleLog) -> StoreResult<VehicleLog> {
        let mut tables = self.tables.write().await;
        tables.ensure_user(&log.user_uid)?;
        ensure_claimable(
            tables.vehicle_logs.get(&log.id),
            |l| l.user_uid.as_str(),
            &log.user_uid,
            "VehicleLog",
            log.id,
        )?;
        let mut stored = log.clone();
        stored.id = assign_id(log.id, &mut tables.last_vehicle_log_id);
        tables.vehicle_logs.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_vehicle_log(&self, log: &VehicleLog) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.vehicle_logs.get_mut(&log.id) {
            Some(existing) if existing.user_uid == log.user_uid => {
                *existing = log.clone();
                Ok(())
            }
            _ => Err(StoreError::not_found("VehicleLog", log.id)),
        }
    }

    async fn delete_vehicle_log(&self, user_uid: &str, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .vehicle_logs
            .get(&id)
            .is_some_and(|l| l.user_uid == user_uid)
        {
            tables.vehicle_logs.remove(&id);
        }
        Ok(())
    }

    async fn delete_all_vehicle_logs(&self, user_uid: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.vehicle_logs.retain(|_, l| l.user_uid != user_uid);
        Ok(())
    }

    async fn list_vehicle_logs(
        &self,
        user_uid: &str,
        vehicle_id: Option<i64>,
    ) -> StoreResult<Vec<VehicleLog>> {
        let tables = self.tables.read().await;
        let mut result: Vec<VehicleLog> = tables
            .vehicle_logs
            .values()
            .filter(|l| l.user_uid == user_uid && vehicle_id.is_none_or(|id| l.vehicle_id == id))
            .cloned()
            .collect();
        result.sort_by_key(|l| Reverse((l.date, l.id)));
        Ok(result)
    }

    async fn latest_vehicle_log(
        &self,
        user_uid: &str,
        vehicle_id: Option<i64>,
    ) -> StoreResult<Option<VehicleLog>> {
        Ok(self
            .list_vehicle_logs(user_uid, vehicle_id)
            .await?
            .into_iter()
            .next())
    }

    async fn get_vehicle_log(&self, user_uid: &str, id: i64) -> StoreResult<Option<VehicleLog>> {
        let tables = self.tables.read().await;
        Ok(tables
            .vehicle_logs
            .get(&id)
            .filter(|l| l.user_uid == user_uid)
            .cloned())
    }
}
