//! Reminder notification delivery.

use std::{
    collections::BTreeMap,
    sync::{Mutex, PoisonError},
};

/// Notification keys are offset from the maintenance id so they never clash
/// with other notification ids.
pub const REMINDER_KEY_BASE: i64 = 1001;

/// Key under which the reminder for `maintenance_id` is shown, or `None` when
/// the id is too large to offset.
pub fn reminder_key(maintenance_id: i64) -> Option<i64> {
    REMINDER_KEY_BASE.checked_add(maintenance_id)
}

/// A reminder that a maintenance is due soon.
///
/// Showing a notification with a key that is already displayed replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderNotification {
    pub key: i64,
    pub title: String,
    pub body: String,
    pub maintenance_id: i64,
}

/// Delivers reminder notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: ReminderNotification);
}

/// Writes reminders to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: ReminderNotification) {
        tracing::info!(
            key = notification.key,
            maintenance_id = notification.maintenance_id,
            title = %notification.title,
            body = %notification.body,
            "Maintenance reminder"
        );
    }
}

/// Keeps the currently shown reminders in memory, one per key.
#[derive(Debug, Default)]
pub struct NotificationBoard {
    shown: Mutex<BTreeMap<i64, ReminderNotification>>,
}

impl NotificationBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn shown(&self) -> std::sync::MutexGuard<'_, BTreeMap<i64, ReminderNotification>> {
        self.shown.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The reminder shown under `key`, if any.
    pub fn get(&self, key: i64) -> Option<ReminderNotification> {
        self.shown().get(&key).cloned()
    }

    /// All shown reminders, by key.
    pub fn all(&self) -> Vec<ReminderNotification> {
        self.shown().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.shown().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shown().is_empty()
    }

    /// Removes the reminder shown under `key`.
    pub fn dismiss(&self, key: i64) -> Option<ReminderNotification> {
        self.shown().remove(&key)
    }

    pub fn clear(&self) {
        self.shown().clear();
    }
}

impl Notifier for NotificationBoard {
    fn notify(&self, notification: ReminderNotification) {
        self.shown().insert(notification.key, notification);
    }
}

/// Native desktop notifications through the session notification daemon.
#[cfg(all(feature = "desktop-notify", target_os = "linux"))]
#[derive(Debug, Default)]
pub struct DesktopNotifier;

#[cfg(all(feature = "desktop-notify", target_os = "linux"))]
impl Notifier for DesktopNotifier {
    fn notify(&self, notification: ReminderNotification) {
        use notify_rust::{Notification, Timeout};

        let Ok(id) = u32::try_from(notification.key) else {
            tracing::warn!(key = notification.key, "Notification key out of range");
            return;
        };

        // D-Bus calls block; keep them off the async workers
        std::thread::spawn(move || {
            let result = Notification::new()
                .appname("PitStop")
                .summary(&notification.title)
                .body(&notification.body)
                .id(id)
                .timeout(Timeout::Default)
                .show();

            if let Err(e) = result {
                tracing::warn!("Failed to show desktop notification: {}", e);
            }
        });
    }
}
