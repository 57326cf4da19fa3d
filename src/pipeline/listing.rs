//! Core listing record and group taxonomy.

use serde::Serialize;

/// The two room categories retained for the core analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomCategory {
    EntirePlace,
    PrivateRoom,
}

impl RoomCategory {
    /// Both categories, in reporting order.
    pub const ALL: [RoomCategory; 2] = [RoomCategory::EntirePlace, RoomCategory::PrivateRoom];

    /// Map a raw free-text room type to a canonical category.
    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Entire home/apt" => Some(RoomCategory::EntirePlace),
            "Private room" => Some(RoomCategory::PrivateRoom),
            _ => None,
        }
    }

    /// Column-friendly label used in artifact tables.
    pub fn label(&self) -> &'static str {
        match self {
            RoomCategory::EntirePlace => "entire_place",
            RoomCategory::PrivateRoom => "private_room",
        }
    }

    /// Human-readable label for the console report.
    pub fn display(&self) -> &'static str {
        match self {
            RoomCategory::EntirePlace => "Entire place",
            RoomCategory::PrivateRoom => "Private room",
        }
    }
}

/// One of the four cells in the (superhost x room category) partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GroupKey {
    pub superhost: bool,
    pub room: RoomCategory,
}

impl GroupKey {
    /// All four groups, in reporting order.
    pub const ALL: [GroupKey; 4] = [
        GroupKey { superhost: false, room: RoomCategory::EntirePlace },
        GroupKey { superhost: true, room: RoomCategory::EntirePlace },
        GroupKey { superhost: false, room: RoomCategory::PrivateRoom },
        GroupKey { superhost: true, room: RoomCategory::PrivateRoom },
    ];

    pub fn host_label(&self) -> &'static str {
        if self.superhost {
            "superhost"
        } else {
            "regular"
        }
    }
}

/// Bucketed price band derived from the cleaned price distribution quartiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceBand {
    Budget,
    Moderate,
    Upscale,
    Luxury,
}

impl PriceBand {
    pub fn label(&self) -> &'static str {
        match self {
            PriceBand::Budget => "budget",
            PriceBand::Moderate => "moderate",
            PriceBand::Upscale => "upscale",
            PriceBand::Luxury => "luxury",
        }
    }
}

/// One cleaned accommodation listing.
///
/// Every field the engines touch is guaranteed non-missing by the cleaner;
/// `rating` is the one optional attribute, carried for descriptive output
/// only.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub id: i64,
    /// Nightly price, strictly positive, within the cleaning policy bounds
    pub price: f64,
    pub room: RoomCategory,
    pub superhost: bool,
    /// Review count, nulls normalized to 0 upstream
    pub reviews: u32,
    /// Days available per year, 0-365
    pub availability_365: i64,
    pub accommodates: i64,
    pub neighbourhood: String,
    pub rating: Option<f64>,
    /// Price band derived from the cleaned distribution
    pub price_band: PriceBand,
}

impl Listing {
    pub fn group(&self) -> GroupKey {
        GroupKey { superhost: self.superhost, room: self.room }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_room_type_mapping() {
        assert_eq!(RoomCategory::from_raw("Entire home/apt"), Some(RoomCategory::EntirePlace));
        assert_eq!(RoomCategory::from_raw("Private room"), Some(RoomCategory::PrivateRoom));
        assert_eq!(RoomCategory::from_raw("  Private room "), Some(RoomCategory::PrivateRoom));
        assert_eq!(RoomCategory::from_raw("Shared room"), None);
        assert_eq!(RoomCategory::from_raw("Hotel room"), None);
    }

    #[test]
    fn group_keys_partition_is_exhaustive() {
        // Every (superhost, room) combination appears exactly once
        for superhost in [false, true] {
            for room in RoomCategory::ALL {
                let matches = GroupKey::ALL
                    .iter()
                    .filter(|k| k.superhost == superhost && k.room == room)
                    .count();
                assert_eq!(matches, 1);
            }
        }
    }
}
