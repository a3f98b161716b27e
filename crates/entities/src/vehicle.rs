//! Vehicle entity definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A vehicle owned by a user.
///
/// An `id` of `0` marks a vehicle that has not been stored yet; the store
/// assigns the identifier on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Store-generated identifier.
    pub id: i64,
    /// Owning user.
    pub user_uid: String,
    /// Optional nickname.
    pub name: String,
    /// Manufacturer.
    pub brand: String,
    /// Model name.
    pub model: String,
    /// Model year.
    pub year: u16,
    /// Body color.
    pub color: String,
    /// License plate.
    pub license_plate: String,
    /// Last known odometer value.
    pub current_km: u32,
    /// When this record was created.
    pub created_at: DateTime<Utc>,
    /// Soft-delete flag; inactive vehicles are hidden from listings.
    pub is_active: bool,
    /// Whether this is the user's selected vehicle.
    pub is_current: bool,
}

impl Vehicle {
    /// Creates a new, active, not-yet-stored vehicle.
    pub fn new(
        user_uid: impl Into<String>,
        brand: impl Into<String>,
        model: impl Into<String>,
        year: u16,
    ) -> Self {
        Self {
            id: 0,
            user_uid: user_uid.into(),
            name: String::new(),
            brand: brand.into(),
            model: model.into(),
            year,
            color: String::new(),
            license_plate: String::new(),
            current_km: 0,
            created_at: Utc::now(),
            is_active: true,
            is_current: false,
        }
    }

    /// Sets the nickname.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Sets the license plate.
    pub fn with_license_plate(mut self, plate: impl Into<String>) -> Self {
        self.license_plate = plate.into();
        self
    }

    /// Sets the odometer value.
    pub fn with_current_km(mut self, km: u32) -> Self {
        self.current_km = km;
        self
    }

    /// Returns "brand model year".
    pub fn full_name(&self) -> String {
        format!("{} {} {}", self.brand, self.model, self.year)
    }

    /// Returns the nickname when set, otherwise the full name.
    pub fn display_name(&self) -> String {
        let name = self.name.trim();
        if name.is_empty() {
            self.full_name()
        } else {
            name.to_string()
        }
    }

    /// Whether the store has assigned an identifier yet.
    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }
}
