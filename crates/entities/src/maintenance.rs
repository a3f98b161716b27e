//! Maintenance entity definitions and due-date arithmetic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default distance window, in km, inside which a service counts as due soon.
pub const DEFAULT_REMINDER_THRESHOLD_KM: u32 = 1000;

/// A maintenance event, either already performed or planned.
///
/// `executed_km == 0` marks a planned maintenance: `periodicity_km` is then
/// the absolute odometer target rather than an interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Maintenance {
    /// Store-generated identifier (`0` until stored).
    pub id: i64,
    /// Owning user.
    pub user_uid: String,
    /// Vehicle this record refers to.
    pub vehicle_id: i64,
    /// Free-text type as entered, usually a catalog label.
    pub kind: String,
    /// Description of the work.
    pub description: String,
    /// Service interval, or target odometer value for planned maintenance.
    pub periodicity_km: u32,
    /// Odometer value when performed; zero when not yet performed.
    pub executed_km: u32,
    /// When the maintenance was performed or recorded.
    pub date: DateTime<Utc>,
    /// Optional cost.
    pub cost: Option<f64>,
    /// Optional notes.
    pub notes: Option<String>,
}

/// Where a maintenance stands relative to an odometer reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// The next-service distance has been reached or passed.
    Overdue,
    /// Within the reminder threshold.
    DueSoon,
    /// Further away than the threshold.
    Upcoming,
}

impl ServiceStatus {
    /// Converts the status to a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overdue => "overdue",
            Self::DueSoon => "due_soon",
            Self::Upcoming => "upcoming",
        }
    }

    /// Classifies a remaining distance against a threshold.
    pub fn classify(remaining_km: i64, threshold_km: u32) -> Self {
        if remaining_km <= 0 {
            Self::Overdue
        } else if remaining_km <= i64::from(threshold_km) {
            Self::DueSoon
        } else {
            Self::Upcoming
        }
    }
}

impl Maintenance {
    /// Creates a new, not-yet-stored maintenance record dated now.
    pub fn new(
        user_uid: impl Into<String>,
        vehicle_id: i64,
        kind: impl Into<String>,
        periodicity_km: u32,
        executed_km: u32,
    ) -> Self {
        Self {
            id: 0,
            user_uid: user_uid.into(),
            vehicle_id,
            kind: kind.into(),
            description: String::new(),
            periodicity_km,
            executed_km,
            date: Utc::now(),
            cost: None,
            notes: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the cost.
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Sets the notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Sets the date.
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    /// Whether the maintenance is planned but not yet performed.
    pub fn is_pending(&self) -> bool {
        self.executed_km == 0
    }

    /// Odometer value at which this maintenance is next due.
    pub fn next_service_km(&self) -> u64 {
        if self.is_pending() {
            u64::from(self.periodicity_km)
        } else {
            u64::from(self.executed_km) + u64::from(self.periodicity_km)
        }
    }

    /// Distance left until the next service; negative when overdue.
    pub fn remaining_km(&self, current_km: u32) -> i64 {
        self.next_service_km() as i64 - i64::from(current_km)
    }

    /// Classifies this maintenance against an odometer reading.
    pub fn status(&self, current_km: u32, threshold_km: u32) -> ServiceStatus {
        ServiceStatus::classify(self.remaining_km(current_km), threshold_km)
    }

    /// Whether a reminder should be raised for this reading.
    pub fn needs_reminder(&self, current_km: u32, threshold_km: u32) -> bool {
        self.status(current_km, threshold_km) == ServiceStatus::DueSoon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_service_for_performed_maintenance() {
        let m = Maintenance::new("uid-1", 1, "Oil change", 1000, 9500);

        assert!(!m.is_pending());
        assert_eq!(m.next_service_km(), 10_500);
        assert_eq!(m.remaining_km(10_000), 500);
        assert_eq!(m.remaining_km(10_600), -100);
    }

    #[test]
    fn test_next_service_for_planned_maintenance() {
        let m = Maintenance::new("uid-1", 1, "Tire rotation", 5000, 0);

        assert!(m.is_pending());
        assert_eq!(m.next_service_km(), 5000);
        assert_eq!(m.remaining_km(4800), 200);
    }

    #[test]
    fn test_next_service_is_sum_for_any_executed_value() {
        for (executed, periodicity) in [(1, 1), (9500, 1000), (u32::MAX, u32::MAX)] {
            let m = Maintenance::new("uid-1", 1, "Other", periodicity, executed);
            assert_eq!(
                m.next_service_km(),
                u64::from(executed) + u64::from(periodicity)
            );
        }
    }

    #[test]
    fn test_status_boundaries() {
        let m = Maintenance::new("uid-1", 1, "Brake check", 1000, 10_000);

        // next service at 11_000
        assert_eq!(m.status(11_000, 1000), ServiceStatus::Overdue);
        assert_eq!(m.status(10_999, 1000), ServiceStatus::DueSoon);
        assert_eq!(m.status(10_000, 1000), ServiceStatus::DueSoon);
        assert_eq!(m.status(9_999, 1000), ServiceStatus::Upcoming);

        assert!(m.needs_reminder(10_000, 1000));
        assert!(!m.needs_reminder(11_500, 1000));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ServiceStatus::DueSoon).unwrap();
        assert_eq!(json, "\"due_soon\"");
        assert_eq!(ServiceStatus::DueSoon.as_str(), "due_soon");
    }
}
