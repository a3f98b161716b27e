//! Distance-based maintenance reminders.

use std::sync::Arc;

use entities::Maintenance;
use vehicle_store::{MaintenanceFilter, StoreResult, VehicleStore};

use crate::notification::{reminder_key, Notifier, ReminderNotification};

pub const REMINDER_TITLE: &str = "Maintenance reminder";

/// Builds the reminder for `maintenance` at `current_km`, or `None` when it
/// is not due soon. Overdue maintenance gets no reminder.
pub fn reminder_for(
    maintenance: &Maintenance,
    current_km: u32,
    threshold_km: u32,
) -> Option<ReminderNotification> {
    if !maintenance.needs_reminder(current_km, threshold_km) {
        return None;
    }

    let Some(key) = reminder_key(maintenance.id) else {
        tracing::warn!(
            maintenance_id = maintenance.id,
            "Maintenance id has no notification key, skipping reminder"
        );
        return None;
    };

    let remaining = maintenance.remaining_km(current_km);
    Some(ReminderNotification {
        key,
        title: REMINDER_TITLE.to_string(),
        body: format!(
            "Your {} is due soon. {} km left until service.\nNext service: {} km",
            maintenance.kind,
            remaining,
            maintenance.next_service_km()
        ),
        maintenance_id: maintenance.id,
    })
}

/// Checks a user's maintenance against their latest odometer reading.
pub struct ReminderEvaluator {
    store: Arc<dyn VehicleStore>,
    notifier: Arc<dyn Notifier>,
    threshold_km: u32,
}

impl ReminderEvaluator {
    pub fn new(
        store: Arc<dyn VehicleStore>,
        notifier: Arc<dyn Notifier>,
        threshold_km: u32,
    ) -> Self {
        Self {
            store,
            notifier,
            threshold_km,
        }
    }

    pub fn threshold_km(&self) -> u32 {
        self.threshold_km
    }

    /// Emits one notification per due-soon maintenance and returns how many
    /// were emitted.
    ///
    /// Never fails: storage errors are logged and count as no reminders.
    pub async fn evaluate(&self, user_uid: &str) -> usize {
        match self.try_evaluate(user_uid).await {
            Ok(emitted) => emitted,
            Err(e) => {
                tracing::warn!(uid = %user_uid, error = %e, "Reminder check failed");
                0
            }
        }
    }

    async fn try_evaluate(&self, user_uid: &str) -> StoreResult<usize> {
        let Some(latest) = self.store.latest_vehicle_log(user_uid, None).await? else {
            tracing::debug!(uid = %user_uid, "No odometer readings, skipping reminders");
            return Ok(0);
        };

        let maintenance = self
            .store
            .list_maintenance(&MaintenanceFilter::for_user(user_uid))
            .await?;

        let mut emitted = 0;
        for record in &maintenance {
            if let Some(notification) = reminder_for(record, latest.current_km, self.threshold_km) {
                self.notifier.notify(notification);
                emitted += 1;
            }
        }

        tracing::debug!(
            uid = %user_uid,
            current_km = latest.current_km,
            checked = maintenance.len(),
            emitted,
            "Reminder check complete"
        );
        Ok(emitted)
    }
}
