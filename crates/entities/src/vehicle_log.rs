//! Odometer log entity definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An odometer reading for a vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleLog {
    /// Store-generated identifier (`0` until stored).
    pub id: i64,
    /// Owning user.
    pub user_uid: String,
    /// Vehicle the reading was taken on.
    pub vehicle_id: i64,
    /// Odometer value.
    pub current_km: u32,
    /// When the reading was taken.
    pub date: DateTime<Utc>,
    /// Reference to a photo of the odometer, if one was taken.
    pub photo_uri: Option<String>,
}

impl VehicleLog {
    /// Creates a new reading dated now.
    pub fn new(user_uid: impl Into<String>, vehicle_id: i64, current_km: u32) -> Self {
        Self {
            id: 0,
            user_uid: user_uid.into(),
            vehicle_id,
            current_km,
            date: Utc::now(),
            photo_uri: None,
        }
    }

    /// Attaches a photo reference.
    pub fn with_photo(mut self, uri: impl Into<String>) -> Self {
        self.photo_uri = Some(uri.into());
        self
    }

    /// Sets the date.
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_log_creation() {
        let log = VehicleLog::new("uid-1", 7, 12_345).with_photo("file:///odo.jpg");

        assert_eq!(log.id, 0);
        assert_eq!(log.vehicle_id, 7);
        assert_eq!(log.current_km, 12_345);
        assert_eq!(log.photo_uri.as_deref(), Some("file:///odo.jpg"));
    }
}
