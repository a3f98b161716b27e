//! Static catalog of maintenance types.
//!
//! Maintenance rows store the type as free text. This table maps a stable
//! code to the label shown to users and the color used to tag it.

use serde::Serialize;

/// A catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MaintenanceTypeInfo {
    /// Stable code.
    pub code: &'static str,
    /// Display label.
    pub label: &'static str,
    /// `#RRGGBB` color.
    pub color: &'static str,
}

/// Code of the fallback entry.
pub const OTHER_MAINTENANCE_TYPE: &str = "other";

/// All known maintenance types, in display order.
pub const MAINTENANCE_TYPES: &[MaintenanceTypeInfo] = &[
    MaintenanceTypeInfo {
        code: "oil_change",
        label: "Oil change",
        color: "#FF6B6B",
    },
    MaintenanceTypeInfo {
        code: "tire_rotation",
        label: "Tire rotation",
        color: "#4ECDC4",
    },
    MaintenanceTypeInfo {
        code: "brake_check",
        label: "Brake check",
        color: "#45B7D1",
    },
    MaintenanceTypeInfo {
        code: "filter_change",
        label: "Filter change",
        color: "#96CEB4",
    },
    MaintenanceTypeInfo {
        code: "tire_change",
        label: "Tire change",
        color: "#FFEAA7",
    },
    MaintenanceTypeInfo {
        code: "engine_check",
        label: "Engine check",
        color: "#DDA0DD",
    },
    MaintenanceTypeInfo {
        code: "transmission",
        label: "Transmission",
        color: "#98D8C8",
    },
    MaintenanceTypeInfo {
        code: "cooling_system",
        label: "Cooling system",
        color: "#F7DC6F",
    },
    MaintenanceTypeInfo {
        code: "electrical",
        label: "Electrical system",
        color: "#BB8FCE",
    },
    MaintenanceTypeInfo {
        code: OTHER_MAINTENANCE_TYPE,
        label: "Other",
        color: "#85C1E9",
    },
];

/// Looks up a type by code.
pub fn maintenance_type(code: &str) -> Option<&'static MaintenanceTypeInfo> {
    MAINTENANCE_TYPES.iter().find(|t| t.code == code)
}

/// Looks up a type by display label, falling back to "other".
pub fn maintenance_type_for_label(label: &str) -> &'static MaintenanceTypeInfo {
    MAINTENANCE_TYPES
        .iter()
        .find(|t| t.label == label)
        .unwrap_or_else(other_maintenance_type)
}

fn other_maintenance_type() -> &'static MaintenanceTypeInfo {
    &MAINTENANCE_TYPES[MAINTENANCE_TYPES.len() - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_code() {
        let info = maintenance_type("brake_check").unwrap();
        assert_eq!(info.label, "Brake check");
        assert_eq!(info.color, "#45B7D1");

        assert!(maintenance_type("warp_drive").is_none());
    }

    #[test]
    fn test_lookup_by_label_falls_back_to_other() {
        assert_eq!(maintenance_type_for_label("Oil change").code, "oil_change");
        assert_eq!(
            maintenance_type_for_label("Something custom").code,
            OTHER_MAINTENANCE_TYPE
        );
    }

    #[test]
    fn test_codes_are_unique() {
        for (i, a) in MAINTENANCE_TYPES.iter().enumerate() {
            for b in &MAINTENANCE_TYPES[i + 1..] {
                assert_ne!(a.code, b.code);
            }
            assert!(a.color.starts_with('#') && a.color.len() == 7);
        }
    }
}
