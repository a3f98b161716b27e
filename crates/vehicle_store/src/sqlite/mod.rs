//! SQLite vehicle store.

mod schema;

use std::{path::Path, str::FromStr};

use async_trait::async_trait;
use entities::{Maintenance, User, Vehicle, VehicleLog};
pub use schema::{MIGRATABLE_VERSION, SCHEMA_VERSION};
use schema::*;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, QueryBuilder, Sqlite,
};

use crate::{MaintenanceFilter, MaintenanceOrder, StoreError, StoreResult, VehicleStore};

const VEHICLE_COLUMNS: &str = "id, user_uid, name, brand, model, year, color, license_plate, \
                               current_km, created_at, is_active, is_current";
const MAINTENANCE_COLUMNS: &str = "id, user_uid, vehicle_id, type, description, periodicity_km, \
                                   executed_km, date, cost, notes";
const VEHICLE_LOG_COLUMNS: &str = "id, user_uid, vehicle_id, current_km, date, photo_uri";

/// Maps driver errors, singling out foreign key violations.
fn db_err(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
            StoreError::ForeignKeyViolation(db.message().to_string())
        }
        other => StoreError::Database(other),
    }
}

fn ensure_affected(rows: u64, entity_type: &'static str, id: impl ToString) -> StoreResult<()> {
    if rows == 0 {
        Err(StoreError::not_found(entity_type, id))
    } else {
        Ok(())
    }
}

/// SQLite vehicle store backed by a connection pool.
#[derive(Clone)]
pub struct SqliteVehicleStore {
    pool: Pool<Sqlite>,
}

impl SqliteVehicleStore {
    /// Opens (creating if needed) the database file and brings its schema to
    /// the current version.
    pub async fn open(db_path: &Path) -> StoreResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Opens a private in-memory database.
    ///
    /// The pool is pinned to a single long-lived connection, since every
    /// SQLite in-memory connection is a separate database.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Wraps an existing pool and migrates it.
    pub async fn from_pool(pool: Pool<Sqlite>) -> StoreResult<Self> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Reads the stored schema version.
    pub async fn schema_version(&self) -> StoreResult<i64> {
        Ok(sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?)
    }

    /// Brings the schema to [`SCHEMA_VERSION`].
    ///
    /// Version 3 gets the additive `is_current` migration; any other
    /// non-current version is reset destructively.
    async fn run_migrations(&self) -> StoreResult<()> {
        let version = self.schema_version().await?;
        let migration = |e: sqlx::Error| StoreError::Migration(e.to_string());

        let mut tx = self.pool.begin().await.map_err(migration)?;

        match version {
            SCHEMA_VERSION => {
                tracing::debug!(version, "Schema is up to date");
            }
            0 if !Self::has_tables(&mut tx).await? => {
                tracing::info!(version = SCHEMA_VERSION, "Creating schema");
                sqlx::raw_sql(SCHEMA_SQL)
                    .execute(&mut *tx)
                    .await
                    .map_err(migration)?;
            }
            MIGRATABLE_VERSION => {
                tracing::info!(from = version, to = SCHEMA_VERSION, "Migrating schema");
                sqlx::query(MIGRATION_3_TO_4_SQL)
                    .execute(&mut *tx)
                    .await
                    .map_err(migration)?;
                // Indexes are idempotent; make sure older files have them.
                sqlx::raw_sql(SCHEMA_SQL)
                    .execute(&mut *tx)
                    .await
                    .map_err(migration)?;
            }
            other => {
                tracing::warn!(
                    from = other,
                    to = SCHEMA_VERSION,
                    "No migration path, resetting all data"
                );
                sqlx::raw_sql(DROP_ALL_SQL)
                    .execute(&mut *tx)
                    .await
                    .map_err(migration)?;
                sqlx::raw_sql(SCHEMA_SQL)
                    .execute(&mut *tx)
                    .await
                    .map_err(migration)?;
            }
        }

        if version != SCHEMA_VERSION {
            sqlx::raw_sql(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))
                .execute(&mut *tx)
                .await
                .map_err(migration)?;
        }

        tx.commit().await.map_err(migration)?;
        Ok(())
    }

    async fn has_tables(tx: &mut sqlx::Transaction<'_, Sqlite>) -> StoreResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
             ('users', 'vehicles', 'maintenance', 'vehicle_logs')",
        )
        .fetch_one(&mut **tx)
        .await?;
        Ok(count > 0)
    }
}

#[async_trait]
impl VehicleStore for SqliteVehicleStore {
    async fn upsert_user(&self, user: &User) -> StoreResult<()> {
        // ON CONFLICT DO UPDATE keeps the row, so children are not cascaded.
        sqlx::query(
            "INSERT INTO users (uid, email) VALUES (?, ?) \
             ON CONFLICT(uid) DO UPDATE SET email = excluded.email",
        )
        .bind(&user.uid)
        .bind(&user.email)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_user(&self, uid: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT uid, email FROM users WHERE uid = ?")
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET email = ? WHERE uid = ?")
            .bind(&user.email)
            .bind(&user.uid)
            .execute(&self.pool)
            .await?;
        ensure_affected(result.rows_affected(), "User", &user.uid)
    }

    async fn delete_user(&self, uid: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM users WHERE uid = ?")
            .bind(uid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_vehicle(&self, vehicle: &Vehicle) -> StoreResult<Vehicle> {
        // New rows are never current. A replaced row keeps its flag while it
        // stays active, and rows of other users are left alone.
        let row: Option<(i64, bool)> = sqlx::query_as(
            "INSERT INTO vehicles (id, user_uid, name, brand, model, year, color, license_plate, \
             current_km, created_at, is_active, is_current) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, \
             brand = excluded.brand, model = excluded.model, year = excluded.year, \
             color = excluded.color, license_plate = excluded.license_plate, \
             current_km = excluded.current_km, created_at = excluded.created_at, \
             is_active = excluded.is_active, \
             is_current = vehicles.is_current AND excluded.is_active \
             WHERE vehicles.user_uid = excluded.user_uid \
             RETURNING id, is_current",
        )
        .bind(id_param(vehicle.id))
        .bind(&vehicle.user_uid)
        .bind(&vehicle.name)
        .bind(&vehicle.brand)
        .bind(&vehicle.model)
        .bind(i64::from(vehicle.year))
        .bind(&vehicle.color)
        .bind(&vehicle.license_plate)
        .bind(i64::from(vehicle.current_km))
        .bind(to_millis(&vehicle.created_at))
        .bind(vehicle.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let (id, is_current) = row.ok_or_else(|| StoreError::not_found("Vehicle", vehicle.id))?;
        let mut stored = vehicle.clone();
        stored.id = id;
        stored.is_current = is_current;
        Ok(stored)
    }

    async fn update_vehicle(&self, vehicle: &Vehicle) -> StoreResult<()> {
        // The current flag is only moved by set_current_vehicle.
        let result = sqlx::query(
            "UPDATE vehicles SET name = ?, brand = ?, model = ?, year = ?, color = ?, \
             license_plate = ?, current_km = ?, created_at = ?, is_active = ?, \
             is_current = is_current AND ? \
             WHERE id = ? AND user_uid = ?",
        )
        .bind(&vehicle.name)
        .bind(&vehicle.brand)
        .bind(&vehicle.model)
        .bind(i64::from(vehicle.year))
        .bind(&vehicle.color)
        .bind(&vehicle.license_plate)
        .bind(i64::from(vehicle.current_km))
        .bind(to_millis(&vehicle.created_at))
        .bind(vehicle.is_active)
        .bind(vehicle.is_active)
        .bind(vehicle.id)
        .bind(&vehicle.user_uid)
        .execute(&self.pool)
        .await?;
        ensure_affected(result.rows_affected(), "Vehicle", vehicle.id)
    }

    async fn delete_vehicle(&self, user_uid: &str, id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM vehicles WHERE id = ? AND user_uid = ?")
            .bind(id)
            .bind(user_uid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_vehicles(&self, user_uid: &str) -> StoreResult<Vec<Vehicle>> {
        let rows: Vec<VehicleRow> = sqlx::query_as(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE user_uid = ? AND is_active = 1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_uid)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn get_vehicle(&self, user_uid: &str, id: i64) -> StoreResult<Option<Vehicle>> {
        let row: Option<VehicleRow> = sqlx::query_as(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = ? AND user_uid = ?"
        ))
        .bind(id)
        .bind(user_uid)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Vehicle::try_from).transpose()
    }

    async fn latest_active_vehicle(&self, user_uid: &str) -> StoreResult<Option<Vehicle>> {
        let row: Option<VehicleRow> = sqlx::query_as(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE user_uid = ? AND is_active = 1 \
             ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .bind(user_uid)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Vehicle::try_from).transpose()
    }

    async fn deactivate_vehicle(&self, user_uid: &str, id: i64) -> StoreResult<()> {
        sqlx::query(
            "UPDATE vehicles SET is_active = 0, is_current = 0 WHERE id = ? AND user_uid = ?",
        )
        .bind(id)
        .bind(user_uid)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_vehicle_km(&self, user_uid: &str, id: i64, km: u32) -> StoreResult<()> {
        sqlx::query("UPDATE vehicles SET current_km = ? WHERE id = ? AND user_uid = ?")
            .bind(i64::from(km))
            .bind(id)
            .bind(user_uid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_current_vehicle(&self, user_uid: &str, id: i64) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let selectable: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM vehicles WHERE id = ? AND user_uid = ? AND is_active = 1",
        )
        .bind(id)
        .bind(user_uid)
        .fetch_optional(&mut *tx)
        .await?;

        if selectable.is_none() {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE vehicles SET is_current = 0 WHERE user_uid = ?")
            .bind(user_uid)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE vehicles SET is_current = 1 WHERE id = ? AND user_uid = ?")
            .bind(id)
            .bind(user_uid)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn current_vehicle(&self, user_uid: &str) -> StoreResult<Option<Vehicle>> {
        let row: Option<VehicleRow> = sqlx::query_as(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles \
             WHERE user_uid = ? AND is_current = 1 AND is_active = 1 LIMIT 1"
        ))
        .bind(user_uid)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Vehicle::try_from).transpose()
    }

    async fn insert_maintenance(&self, maintenance: &Maintenance) -> StoreResult<Maintenance> {
        let id: Option<i64> = sqlx::query_scalar(
            "INSERT INTO maintenance (id, user_uid, vehicle_id, type, description, \
             periodicity_km, executed_km, date, cost, notes) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
             vehicle_id = excluded.vehicle_id, type = excluded.type, \
             description = excluded.description, periodicity_km = excluded.periodicity_km, \
             executed_km = excluded.executed_km, date = excluded.date, cost = excluded.cost, \
             notes = excluded.notes \
             WHERE maintenance.user_uid = excluded.user_uid \
             RETURNING id",
        )
        .bind(id_param(maintenance.id))
        .bind(&maintenance.user_uid)
        .bind(maintenance.vehicle_id)
        .bind(&maintenance.kind)
        .bind(&maintenance.description)
        .bind(i64::from(maintenance.periodicity_km))
        .bind(i64::from(maintenance.executed_km))
        .bind(to_millis(&maintenance.date))
        .bind(maintenance.cost)
        .bind(&maintenance.notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let mut stored = maintenance.clone();
        stored.id = id.ok_or_else(|| StoreError::not_found("Maintenance", maintenance.id))?;
        Ok(stored)
    }

    async fn update_maintenance(&self, maintenance: &Maintenance) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE maintenance SET vehicle_id = ?, type = ?, description = ?, \
             periodicity_km = ?, executed_km = ?, date = ?, cost = ?, notes = ? \
             WHERE id = ? AND user_uid = ?",
        )
        .bind(maintenance.vehicle_id)
        .bind(&maintenance.kind)
        .bind(&maintenance.description)
        .bind(i64::from(maintenance.periodicity_km))
        .bind(i64::from(maintenance.executed_km))
        .bind(to_millis(&maintenance.date))
        .bind(maintenance.cost)
        .bind(&maintenance.notes)
        .bind(maintenance.id)
        .bind(&maintenance.user_uid)
        .execute(&self.pool)
        .await?;
        ensure_affected(result.rows_affected(), "Maintenance", maintenance.id)
    }

    async fn delete_maintenance(&self, user_uid: &str, id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM maintenance WHERE id = ? AND user_uid = ?")
            .bind(id)
            .bind(user_uid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_all_maintenance(&self, user_uid: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM maintenance WHERE user_uid = ?")
            .bind(user_uid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_maintenance(&self, filter: &MaintenanceFilter) -> StoreResult<Vec<Maintenance>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {MAINTENANCE_COLUMNS} FROM maintenance WHERE user_uid = "
        ));
        query.push_bind(filter.user_uid.clone());

        if let Some(vehicle_id) = filter.vehicle_id {
            query.push(" AND vehicle_id = ").push_bind(vehicle_id);
        }
        if let Some(kind) = &filter.kind {
            query.push(" AND type = ").push_bind(kind.clone());
        }
        if let Some(needle) = &filter.kind_contains {
            query
                .push(" AND instr(lower(type), lower(")
                .push_bind(needle.clone())
                .push(")) > 0");
        }

        query.push(match filter.order {
            MaintenanceOrder::DateDesc => " ORDER BY date DESC, id DESC",
            MaintenanceOrder::NextServiceAsc => {
                " ORDER BY executed_km + periodicity_km ASC, id ASC"
            }
        });

        let rows: Vec<MaintenanceRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn get_maintenance(&self, user_uid: &str, id: i64) -> StoreResult<Option<Maintenance>> {
        let row: Option<MaintenanceRow> = sqlx::query_as(&format!(
            "SELECT {MAINTENANCE_COLUMNS} FROM maintenance WHERE id = ? AND user_uid = ?"
        ))
        .bind(id)
        .bind(user_uid)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Maintenance::try_from).transpose()
    }

    async fn insert_vehicle_log(&self, log: &VehicleLog) -> StoreResult<VehicleLog> {
        let id: Option<i64> = sqlx::query_scalar(
            "INSERT INTO vehicle_logs (id, user_uid, vehicle_id, current_km, date, photo_uri) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
             vehicle_id = excluded.vehicle_id, current_km = excluded.current_km, \
             date = excluded.date, photo_uri = excluded.photo_uri \
             WHERE vehicle_logs.user_uid = excluded.user_uid \
             RETURNING id",
        )
        .bind(id_param(log.id))
        .bind(&log.user_uid)
        .bind(log.vehicle_id)
        .bind(i64::from(log.current_km))
        .bind(to_millis(&log.date))
        .bind(&log.photo_uri)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let mut stored = log.clone();
        stored.id = id.ok_or_else(|| StoreError::not_found("VehicleLog", log.id))?;
        Ok(stored)
    }

    async fn update_vehicle_log(&self, log: &VehicleLog) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE vehicle_logs SET vehicle_id = ?, current_km = ?, date = ?, photo_uri = ? \
             WHERE id = ? AND user_uid = ?",
        )
        .bind(log.vehicle_id)
        .bind(i64::from(log.current_km))
        .bind(to_millis(&log.date))
        .bind(&log.photo_uri)
        .bind(log.id)
        .bind(&log.user_uid)
        .execute(&self.pool)
        .await?;
        ensure_affected(result.rows_affected(), "VehicleLog", log.id)
    }

    async fn delete_vehicle_log(&self, user_uid: &str, id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM vehicle_logs WHERE id = ? AND user_uid = ?")
            .bind(id)
            .bind(user_uid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_all_vehicle_logs(&self, user_uid: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM vehicle_logs WHERE user_uid = ?")
            .bind(user_uid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_vehicle_logs(
        &self,
        user_uid: &str,
        vehicle_id: Option<i64>,
    ) -> StoreResult<Vec<VehicleLog>> {
        let rows: Vec<VehicleLogRow> = sqlx::query_as(&format!(
            "SELECT {VEHICLE_LOG_COLUMNS} FROM vehicle_logs \
             WHERE user_uid = ? AND (? IS NULL OR vehicle_id = ?) \
             ORDER BY date DESC, id DESC"
        ))
        .bind(user_uid)
        .bind(vehicle_id)
        .bind(vehicle_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn latest_vehicle_log(
        &self,
        user_uid: &str,
        vehicle_id: Option<i64>,
    ) -> StoreResult<Option<VehicleLog>> {
        let row: Option<VehicleLogRow> = sqlx::query_as(&format!(
            "SELECT {VEHICLE_LOG_COLUMNS} FROM vehicle_logs \
             WHERE user_uid = ? AND (? IS NULL OR vehicle_id = ?) \
             ORDER BY date DESC, id DESC LIMIT 1"
        ))
        .bind(user_uid)
        .bind(vehicle_id)
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(VehicleLog::try_from).transpose()
    }

    async fn get_vehicle_log(&self, user_uid: &str, id: i64) -> StoreResult<Option<VehicleLog>> {
        let row: Option<VehicleLogRow> = sqlx::query_as(&format!(
            "SELECT {VEHICLE_LOG_COLUMNS} FROM vehicle_logs WHERE id = ? AND user_uid = ?"
        ))
        .bind(id)
        .bind(user_uid)
        .fetch_optional(&self.pool)
        .await?;
        row.map(VehicleLog::try_from).transpose()
    }
}
