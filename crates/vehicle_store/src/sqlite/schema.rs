use chrono::{DateTime, TimeZone, Utc};
use entities::{Maintenance, User, Vehicle, VehicleLog};
use sqlx::FromRow;

use crate::{StoreError, StoreResult};

/// Schema version written to `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 4;

/// The only version with an incremental migration to the current one.
pub const MIGRATABLE_VERSION: i64 = 3;

/// Full schema at [`SCHEMA_VERSION`].
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    uid TEXT PRIMARY KEY NOT NULL,
    email TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS vehicles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_uid TEXT NOT NULL REFERENCES users(uid) ON DELETE CASCADE,
    name TEXT NOT NULL DEFAULT '',
    brand TEXT NOT NULL,
    model TEXT NOT NULL,
    year INTEGER NOT NULL,
    color TEXT NOT NULL DEFAULT '',
    license_plate TEXT NOT NULL DEFAULT '',
    current_km INTEGER NOT NULL CHECK (current_km >= 0),
    created_at INTEGER NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    is_current INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_vehicles_user_uid ON vehicles(user_uid);

CREATE TABLE IF NOT EXISTS maintenance (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_uid TEXT NOT NULL REFERENCES users(uid) ON DELETE CASCADE,
    vehicle_id INTEGER NOT NULL,
    type TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    periodicity_km INTEGER NOT NULL CHECK (periodicity_km >= 0),
    executed_km INTEGER NOT NULL CHECK (executed_km >= 0),
    date INTEGER NOT NULL,
    cost REAL,
    notes TEXT
);
CREATE INDEX IF NOT EXISTS idx_maintenance_user_uid ON maintenance(user_uid);
CREATE INDEX IF NOT EXISTS idx_maintenance_vehicle_id ON maintenance(vehicle_id);

CREATE TABLE IF NOT EXISTS vehicle_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_uid TEXT NOT NULL REFERENCES users(uid) ON DELETE CASCADE,
    vehicle_id INTEGER NOT NULL,
    current_km INTEGER NOT NULL CHECK (current_km >= 0),
    date INTEGER NOT NULL,
    photo_uri TEXT
);
CREATE INDEX IF NOT EXISTS idx_vehicle_logs_user_uid ON vehicle_logs(user_uid);
CREATE INDEX IF NOT EXISTS idx_vehicle_logs_vehicle_id ON vehicle_logs(vehicle_id);
"#;

/// Migration from version 3: the current-vehicle flag.
pub const MIGRATION_3_TO_4_SQL: &str =
    "ALTER TABLE vehicles ADD COLUMN is_current INTEGER NOT NULL DEFAULT 0";

/// Drops every table; used when the stored version cannot be migrated.
pub const DROP_ALL_SQL: &str = r#"
DROP TABLE IF EXISTS vehicle_logs;
DROP TABLE IF EXISTS maintenance;
DROP TABLE IF EXISTS vehicles;
DROP TABLE IF EXISTS users;
"#;

pub(crate) fn to_millis(date: &DateTime<Utc>) -> i64 {
    date.timestamp_millis()
}

fn from_millis(field: &'static str, millis: i64) -> StoreResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| StoreError::InvalidData(format!("{field}: bad timestamp {millis}")))
}

fn to_km(field: &'static str, value: i64) -> StoreResult<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("{field}: distance out of range {value}")))
}

/// Binds an entity id, turning the "unassigned" id into NULL so SQLite
/// generates one.
pub(crate) fn id_param(id: i64) -> Option<i64> {
    (id != 0).then_some(id)
}

/// Database row for User
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub uid: String,
    pub email: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            uid: row.uid,
            email: row.email,
        }
    }
}

/// Database row for Vehicle
#[derive(Debug, FromRow)]
pub struct VehicleRow {
    pub id: i64,
    pub user_uid: String,
    pub name: String,
    pub brand: String,
    pub model: String,
    pub year: i64,
    pub color: String,
    pub license_plate: String,
    pub current_km: i64,
    pub created_at: i64,
    pub is_active: bool,
    pub is_current: bool,
}

impl TryFrom<VehicleRow> for Vehicle {
    type Error = StoreError;

    fn try_from(row: VehicleRow) -> StoreResult<Self> {
        Ok(Vehicle {
            id: row.id,
            user_uid: row.user_uid,
            name: row.name,
            brand: row.brand,
            model: row.model,
            year: u16::try_from(row.year)
                .map_err(|_| StoreError::InvalidData(format!("year: {}", row.year)))?,
            color: row.color,
            license_plate: row.license_plate,
            current_km: to_km("current_km", row.current_km)?,
            created_at: from_millis("created_at", row.created_at)?,
            is_active: row.is_active,
            is_current: row.is_current,
        })
    }
}

/// Database row for Maintenance
#[derive(Debug, FromRow)]
pub struct MaintenanceRow {
    pub id: i64,
    pub user_uid: String,
    pub vehicle_id: i64,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub description: String,
    pub periodicity_km: i64,
    pub executed_km: i64,
    pub date: i64,
    pub cost: Option<f64>,
    pub notes: Option<String>,
}

impl TryFrom<MaintenanceRow> for Maintenance {
    type Error = StoreError;

    fn try_from(row: MaintenanceRow) -> StoreResult<Self> {
        Ok(Maintenance {
            id: row.id,
            user_uid: row.user_uid,
            vehicle_id: row.vehicle_id,
            kind: row.kind,
            description: row.description,
            periodicity_km: to_km("periodicity_km", row.periodicity_km)?,
            executed_km: to_km("executed_km", row.executed_km)?,
            date: from_millis("date", row.date)?,
            cost: row.cost,
            notes: row.notes,
        })
    }
}

/// Database row for VehicleLog
#[derive(Debug, FromRow)]
pub struct VehicleLogRow {
    pub id: i64,
    pub user_uid: String,
    pub vehicle_id: i64,
    pub current_km: i64,
    pub date: i64,
    pub photo_uri: Option<String>,
}

impl TryFrom<VehicleLogRow> for VehicleLog {
    type Error = StoreError;

    fn try_from(row: VehicleLogRow) -> StoreResult<Self> {
        Ok(VehicleLog {
            id: row.id,
            user_uid: row.user_uid,
            vehicle_id: row.vehicle_id,
            current_km: to_km("current_km", row.current_km)?,
            date: from_millis("date", row.date)?,
            photo_uri: row.photo_uri,
        })
    }
}

/// Maps a list of rows, failing on the first bad one.
pub(crate) fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}
