//! Behavior every `VehicleStore` implementation must share.

use chrono::{DateTime, TimeZone, Utc};
use entities::{Maintenance, User, Vehicle, VehicleLog};

use crate::{MaintenanceFilter, MaintenanceOrder, StoreError, VehicleStore};

/// Millisecond-precision timestamp, so SQLite round-trips compare equal.
fn at(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

async fn seed_user<S: VehicleStore>(store: &S, uid: &str) {
    store
        .upsert_user(&User::new(uid, format!("{uid}@example.com")))
        .await
        .unwrap();
}

async fn seed_vehicle<S: VehicleStore>(store: &S, uid: &str, model: &str, created: i64) -> Vehicle {
    let mut vehicle = Vehicle::new(uid, "Toyota", model, 2020).with_current_km(1000);
    vehicle.created_at = at(created);
    store.insert_vehicle(&vehicle).await.unwrap()
}

pub async fn run_all<S: VehicleStore>(store: &S) {
    users(store).await;
    unknown_user_is_rejected(store).await;
    vehicle_listing_and_lookup(store).await;
    upsert_replaces_without_cascading(store).await;
    current_vehicle_is_exclusive(store).await;
    current_flag_ignores_written_values(store).await;
    upserts_keep_other_users_rows(store).await;
    maintenance_filters_and_ordering(store).await;
    vehicle_logs(store).await;
    updates_to_missing_rows(store).await;
    delete_user_cascades(store).await;
}

async fn users<S: VehicleStore>(store: &S) {
    seed_user(store, "users").await;
    assert_eq!(
        store.get_user("users").await.unwrap(),
        Some(User::new("users", "users@example.com"))
    );

    store
        .update_user(&User::new("users", "new@example.com"))
        .await
        .unwrap();
    assert_eq!(
        store.get_user("users").await.unwrap().unwrap().email,
        "new@example.com"
    );

    assert!(store.get_user("nobody").await.unwrap().is_none());
}

async fn unknown_user_is_rejected<S: VehicleStore>(store: &S) {
    let err = store
        .insert_vehicle(&Vehicle::new("ghost", "Kia", "Rio", 2019))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ForeignKeyViolation(_)), "{err:?}");

    let err = store
        .insert_vehicle_log(&VehicleLog::new("ghost", 1, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ForeignKeyViolation(_)), "{err:?}");
}

async fn vehicle_listing_and_lookup<S: VehicleStore>(store: &S) {
    seed_user(store, "list").await;
    let old = seed_vehicle(store, "list", "Corolla", 1_000).await;
    let new = seed_vehicle(store, "list", "Yaris", 2_000).await;
    let retired = seed_vehicle(store, "list", "Camry", 3_000).await;
    assert!(old.id > 0 && new.id > old.id && retired.id > new.id);

    store.deactivate_vehicle("list", retired.id).await.unwrap();

    let listed: Vec<i64> = store
        .list_vehicles("list")
        .await
        .unwrap()
        .iter()
        .map(|v| v.id)
        .collect();
    assert_eq!(listed, vec![new.id, old.id]);

    assert_eq!(
        store.latest_active_vehicle("list").await.unwrap().map(|v| v.id),
        Some(new.id)
    );

    // Inactive rows are still reachable by id.
    let fetched = store.get_vehicle("list", retired.id).await.unwrap().unwrap();
    assert!(!fetched.is_active);

    // Scoped by user.
    assert!(store.get_vehicle("other", old.id).await.unwrap().is_none());

    store.update_vehicle_km("list", old.id, 4_321).await.unwrap();
    assert_eq!(
        store.get_vehicle("list", old.id).await.unwrap().unwrap().current_km,
        4_321
    );

    store.delete_vehicle("list", old.id).await.unwrap();
    assert!(store.get_vehicle("list", old.id).await.unwrap().is_none());
}

async fn upsert_replaces_without_cascading<S: VehicleStore>(store: &S) {
    seed_user(store, "upsert").await;
    let vehicle = seed_vehicle(store, "upsert", "Prius", 1_000).await;
    let log = store
        .insert_vehicle_log(&VehicleLog::new("upsert", vehicle.id, 500).with_date(at(5_000)))
        .await
        .unwrap();

    let mut replacement = vehicle.clone();
    replacement.name = "Daily".to_string();
    replacement.current_km = 2_000;
    let stored = store.insert_vehicle(&replacement).await.unwrap();
    assert_eq!(stored.id, vehicle.id);

    let fetched = store.get_vehicle("upsert", vehicle.id).await.unwrap().unwrap();
    assert_eq!(fetched, replacement);
    assert_eq!(store.list_vehicles("upsert").await.unwrap().len(), 1);

    // Re-upserting the user keeps its children.
    store
        .upsert_user(&User::new("upsert", "changed@example.com"))
        .await
        .unwrap();
    assert_eq!(
        store.get_vehicle_log("upsert", log.id).await.unwrap(),
        Some(log)
    );
}

async fn current_vehicle_is_exclusive<S: VehicleStore>(store: &S) {
    seed_user(store, "current").await;
    seed_user(store, "neighbor").await;
    let first = seed_vehicle(store, "current", "Civic", 1_000).await;
    let second = seed_vehicle(store, "current", "Accord", 2_000).await;
    let theirs = seed_vehicle(store, "neighbor", "Fit", 3_000).await;

    assert!(store.current_vehicle("current").await.unwrap().is_none());

    assert!(store.set_current_vehicle("neighbor", theirs.id).await.unwrap());
    assert!(store.set_current_vehicle("current", first.id).await.unwrap());
    assert!(store.set_current_vehicle("current", second.id).await.unwrap());

    let current = store.current_vehicle("current").await.unwrap().unwrap();
    assert_eq!(current.id, second.id);
    let flagged = store
        .list_vehicles("current")
        .await
        .unwrap()
        .into_iter()
        .filter(|v| v.is_current)
        .count();
    assert_eq!(flagged, 1);

    // Another user's selection is untouched.
    assert_eq!(
        store.current_vehicle("neighbor").await.unwrap().map(|v| v.id),
        Some(theirs.id)
    );

    // Missing or foreign targets leave the selection alone.
    assert!(!store.set_current_vehicle("current", 9_999).await.unwrap());
    assert!(!store.set_current_vehicle("current", theirs.id).await.unwrap());
    assert_eq!(
        store.current_vehicle("current").await.unwrap().map(|v| v.id),
        Some(second.id)
    );

    // Deactivating the current vehicle clears the selection.
    store.deactivate_vehicle("current", second.id).await.unwrap();
    assert!(store.current_vehicle("current").await.unwrap().is_none());
    assert!(!store.set_current_vehicle("current", second.id).await.unwrap());
}

async fn current_flag_ignores_written_values<S: VehicleStore>(store: &S) {
    seed_user(store, "flag").await;
    let first = seed_vehicle(store, "flag", "Golf", 1_000).await;
    let second = seed_vehicle(store, "flag", "Polo", 2_000).await;

    assert!(store.set_current_vehicle("flag", first.id).await.unwrap());
    let stale = store.get_vehicle("flag", first.id).await.unwrap().unwrap();
    assert!(store.set_current_vehicle("flag", second.id).await.unwrap());

    // Saving an old snapshot does not bring the flag back.
    let mut edited = stale.clone();
    edited.name = "Weekend".to_string();
    store.update_vehicle(&edited).await.unwrap();
    store.insert_vehicle(&stale).await.unwrap();

    // Nor does adding a vehicle that claims to be current.
    let mut claimed = Vehicle::new("flag", "Seat", "Ibiza", 2021);
    claimed.is_current = true;
    let third = store.insert_vehicle(&claimed).await.unwrap();
    assert!(!third.is_current);

    let flagged: Vec<i64> = store
        .list_vehicles("flag")
        .await
        .unwrap()
        .into_iter()
        .filter(|v| v.is_current)
        .map(|v| v.id)
        .collect();
    assert_eq!(flagged, vec![second.id]);

    // Replacing the current vehicle keeps it selected while it stays active.
    let mut renamed = store.get_vehicle("flag", second.id).await.unwrap().unwrap();
    renamed.name = "Runabout".to_string();
    let stored = store.insert_vehicle(&renamed).await.unwrap();
    assert!(stored.is_current);
    assert_eq!(
        store.current_vehicle("flag").await.unwrap().map(|v| v.name),
        Some("Runabout".to_string())
    );

    renamed.is_active = false;
    store.update_vehicle(&renamed).await.unwrap();
    assert!(store.current_vehicle("flag").await.unwrap().is_none());
    assert!(!store.get_vehicle("flag", second.id).await.unwrap().unwrap().is_current);
}

async fn upserts_keep_other_users_rows<S: VehicleStore>(store: &S) {
    seed_user(store, "owner").await;
    seed_user(store, "intruder").await;
    let vehicle = seed_vehicle(store, "owner", "Yaris", 1_000).await;
    let maintenance = store
        .insert_maintenance(
            &Maintenance::new("owner", vehicle.id, "Oil change", 1_000, 0).with_date(at(2_000)),
        )
        .await
        .unwrap();
    let log = store
        .insert_vehicle_log(&VehicleLog::new("owner", vehicle.id, 1_200).with_date(at(3_000)))
        .await
        .unwrap();

    let mut taken = Vehicle::new("intruder", "Fiat", "Panda", 2010);
    taken.id = vehicle.id;
    let err = store.insert_vehicle(&taken).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }), "{err:?}");

    let mut taken = Maintenance::new("intruder", vehicle.id, "Brake check", 5, 0);
    taken.id = maintenance.id;
    let err = store.insert_maintenance(&taken).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }), "{err:?}");

    let mut taken = VehicleLog::new("intruder", vehicle.id, 1);
    taken.id = log.id;
    let err = store.insert_vehicle_log(&taken).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }), "{err:?}");

    assert_eq!(
        store.get_vehicle("owner", vehicle.id).await.unwrap(),
        Some(vehicle.clone())
    );
    assert_eq!(
        store.get_maintenance("owner", maintenance.id).await.unwrap(),
        Some(maintenance)
    );
    assert_eq!(store.get_vehicle_log("owner", log.id).await.unwrap(), Some(log));
    assert!(store.list_vehicles("intruder").await.unwrap().is_empty());
    assert!(store.get_vehicle("intruder", vehicle.id).await.unwrap().is_none());
}

async fn maintenance_filters_and_ordering<S: VehicleStore>(store: &S) {
    seed_user(store, "maint").await;
    let car = seed_vehicle(store, "maint", "Golf", 1_000).await;

    let oil = store
        .insert_maintenance(
            &Maintenance::new("maint", car.id, "Oil change", 1_000, 9_500)
                .with_date(at(3_000))
                .with_cost(49.9),
        )
        .await
        .unwrap();
    let tires = store
        .insert_maintenance(
            &Maintenance::new("maint", car.id, "Tire rotation", 5_000, 0).with_date(at(2_000)),
        )
        .await
        .unwrap();
    // References a vehicle id that does not exist; storage accepts it.
    let orphan = store
        .insert_maintenance(
            &Maintenance::new("maint", 424_242, "Tire change", 40_000, 10_000)
                .with_date(at(1_000))
                .with_notes("winter set"),
        )
        .await
        .unwrap();

    let by_date: Vec<i64> = store
        .list_maintenance(&MaintenanceFilter::for_user("maint"))
        .await
        .unwrap()
        .iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(by_date, vec![oil.id, tires.id, orphan.id]);

    let upcoming: Vec<i64> = store
        .list_maintenance(
            &MaintenanceFilter::for_user("maint").ordered_by(MaintenanceOrder::NextServiceAsc),
        )
        .await
        .unwrap()
        .iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(upcoming, vec![tires.id, oil.id, orphan.id]);

    let for_car = store
        .list_maintenance(&MaintenanceFilter::for_user("maint").with_vehicle(car.id))
        .await
        .unwrap();
    assert_eq!(for_car.len(), 2);

    let searched: Vec<i64> = store
        .list_maintenance(&MaintenanceFilter::for_user("maint").with_kind_containing("TIRE"))
        .await
        .unwrap()
        .iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(searched, vec![tires.id, orphan.id]);

    let exact = store
        .list_maintenance(&MaintenanceFilter::for_user("maint").with_kind("Oil change"))
        .await
        .unwrap();
    assert_eq!(exact, vec![oil.clone()]);

    assert!(store
        .list_maintenance(&MaintenanceFilter::for_user("someone-else"))
        .await
        .unwrap()
        .is_empty());

    let mut done = tires.clone();
    done.executed_km = 4_900;
    store.update_maintenance(&done).await.unwrap();
    assert_eq!(
        store.get_maintenance("maint", tires.id).await.unwrap(),
        Some(done)
    );

    store.delete_maintenance("maint", oil.id).await.unwrap();
    assert!(store.get_maintenance("maint", oil.id).await.unwrap().is_none());

    store.delete_all_maintenance("maint").await.unwrap();
    assert!(store
        .list_maintenance(&MaintenanceFilter::for_user("maint"))
        .await
        .unwrap()
        .is_empty());
}

async fn vehicle_logs<S: VehicleStore>(store: &S) {
    seed_user(store, "logs").await;
    let a = seed_vehicle(store, "logs", "Micra", 1_000).await;
    let b = seed_vehicle(store, "logs", "Note", 2_000).await;

    assert!(store.latest_vehicle_log("logs", None).await.unwrap().is_none());

    let first = store
        .insert_vehicle_log(&VehicleLog::new("logs", a.id, 10_000).with_date(at(1_000)))
        .await
        .unwrap();
    let on_b = store
        .insert_vehicle_log(&VehicleLog::new("logs", b.id, 300).with_date(at(3_000)))
        .await
        .unwrap();
    let second = store
        .insert_vehicle_log(
            &VehicleLog::new("logs", a.id, 10_600)
                .with_date(at(2_000))
                .with_photo("file:///odo.jpg"),
        )
        .await
        .unwrap();

    assert_eq!(
        store.latest_vehicle_log("logs", None).await.unwrap(),
        Some(on_b.clone())
    );
    assert_eq!(
        store.latest_vehicle_log("logs", Some(a.id)).await.unwrap(),
        Some(second.clone())
    );

    let history: Vec<i64> = store
        .list_vehicle_logs("logs", Some(a.id))
        .await
        .unwrap()
        .iter()
        .map(|l| l.id)
        .collect();
    assert_eq!(history, vec![second.id, first.id]);
    assert_eq!(store.list_vehicle_logs("logs", None).await.unwrap().len(), 3);

    let mut corrected = first.clone();
    corrected.current_km = 10_100;
    store.update_vehicle_log(&corrected).await.unwrap();
    assert_eq!(
        store.get_vehicle_log("logs", first.id).await.unwrap(),
        Some(corrected)
    );

    store.delete_vehicle_log("logs", on_b.id).await.unwrap();
    assert_eq!(
        store.latest_vehicle_log("logs", None).await.unwrap(),
        Some(second)
    );

    store.delete_all_vehicle_logs("logs").await.unwrap();
    assert!(store.list_vehicle_logs("logs", None).await.unwrap().is_empty());
}

async fn updates_to_missing_rows<S: VehicleStore>(store: &S) {
    seed_user(store, "missing").await;

    let err = store
        .update_user(&User::new("never-stored", "x@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }), "{err:?}");

    let mut vehicle = Vehicle::new("missing", "Mazda", "3", 2018);
    vehicle.id = 777_777;
    let err = store.update_vehicle(&vehicle).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }), "{err:?}");

    let mut maintenance = Maintenance::new("missing", 1, "Other", 1, 1);
    maintenance.id = 777_777;
    let err = store.update_maintenance(&maintenance).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }), "{err:?}");

    // Deletes of missing rows are no-ops.
    store.delete_vehicle("missing", 777_777).await.unwrap();
    store.delete_maintenance("missing", 777_777).await.unwrap();
    store.delete_vehicle_log("missing", 777_777).await.unwrap();
}

async fn delete_user_cascades<S: VehicleStore>(store: &S) {
    seed_user(store, "doomed").await;
    seed_user(store, "survivor").await;

    for uid in ["doomed", "survivor"] {
        let vehicle = seed_vehicle(store, uid, "Clio", 1_000).await;
        store
            .insert_maintenance(&Maintenance::new(uid, vehicle.id, "Oil change", 1_000, 500))
            .await
            .unwrap();
        store
            .insert_vehicle_log(&VehicleLog::new(uid, vehicle.id, 900))
            .await
            .unwrap();
    }

    store.delete_user("doomed").await.unwrap();

    assert!(store.get_user("doomed").await.unwrap().is_none());
    assert!(store.list_vehicles("doomed").await.unwrap().is_empty());
    assert!(store
        .list_maintenance(&MaintenanceFilter::for_user("doomed"))
        .await
        .unwrap()
        .is_empty());
    assert!(store.list_vehicle_logs("doomed", None).await.unwrap().is_empty());

    assert_eq!(store.list_vehicles("survivor").await.unwrap().len(), 1);
    assert_eq!(
        store
            .list_maintenance(&MaintenanceFilter::for_user("survivor"))
            .await
            .unwrap()
            .len(),
        1
    );
    assert!(store.latest_vehicle_log("survivor", None).await.unwrap().is_some());
}
