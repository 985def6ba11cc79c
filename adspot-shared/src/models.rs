use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Every sellable entity owns exactly this many advertising slots.
pub const SLOT_CAPACITY: usize = 8;

/// One of the 8 fixed advertising positions on a sellable entity.
///
/// Slots are never created or destroyed, only booked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlotName {
    #[serde(rename = "banner_1")]
    Banner1,
    #[serde(rename = "banner_2")]
    Banner2,
    #[serde(rename = "banner_3")]
    Banner3,
    #[serde(rename = "banner_4")]
    Banner4,
    #[serde(rename = "stamp_1")]
    Stamp1,
    #[serde(rename = "stamp_2")]
    Stamp2,
    #[serde(rename = "stamp_3")]
    Stamp3,
    #[serde(rename = "stamp_4")]
    Stamp4,
}

impl SlotName {
    /// All 8 slots, in display order.
    pub const ALL: [SlotName; SLOT_CAPACITY] = [
        SlotName::Banner1,
        SlotName::Banner2,
        SlotName::Banner3,
        SlotName::Banner4,
        SlotName::Stamp1,
        SlotName::Stamp2,
        SlotName::Stamp3,
        SlotName::Stamp4,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotName::Banner1 => "banner_1",
            SlotName::Banner2 => "banner_2",
            SlotName::Banner3 => "banner_3",
            SlotName::Banner4 => "banner_4",
            SlotName::Stamp1 => "stamp_1",
            SlotName::Stamp2 => "stamp_2",
            SlotName::Stamp3 => "stamp_3",
            SlotName::Stamp4 => "stamp_4",
        }
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SlotName::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| format!("unknown slot name: {s}"))
    }
}

/// Purchase unit for a booking: a full-price N-quarter package, not a
/// daily rate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DurationCategory {
    Quarterly,
    HalfYearly,
    Yearly,
}

impl DurationCategory {
    /// Billable calendar days covered by the full-price purchase.
    pub fn total_days(&self) -> i64 {
        match self {
            DurationCategory::Quarterly => 90,
            DurationCategory::HalfYearly => 180,
            DurationCategory::Yearly => 360,
        }
    }

    /// Number of quarter units the purchase represents.
    pub fn num_quarters(&self) -> u8 {
        match self {
            DurationCategory::Quarterly => 1,
            DurationCategory::HalfYearly => 2,
            DurationCategory::Yearly => 4,
        }
    }
}

impl fmt::Display for DurationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DurationCategory::Quarterly => "quarterly",
            DurationCategory::HalfYearly => "half_yearly",
            DurationCategory::Yearly => "yearly",
        };
        f.write_str(s)
    }
}

/// When the booking window should begin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StartPreference {
    /// Start immediately; the remainder of the current quarter is billed
    /// pro-rata on top of the full-duration price.
    Today,
    /// Start on the first day of an upcoming quarter; no pro-rata.
    NextQuarter,
}

/// Lifecycle status shared by a booking request and its duration records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Approved,
    Running,
    Rejected,
}

impl BookingStatus {
    /// Approved and running bookings both hold their slot for conflict
    /// purposes; pending and rejected do not.
    pub fn is_occupying(&self) -> bool {
        matches!(self, BookingStatus::Approved | BookingStatus::Running)
    }

    /// Only pending requests may be approved or rejected.
    pub fn is_terminal_or_committed(&self) -> bool {
        !matches!(self, BookingStatus::Pending)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Approved => "approved",
            BookingStatus::Running => "running",
            BookingStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Unit prices for one slot, one per duration category.
///
/// Each price is the complete charge for the category (integer currency
/// units). A missing entry means the tier has not configured that
/// combination and pricing must fail rather than guess.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotPrices {
    pub quarterly: Option<i64>,
    pub half_yearly: Option<i64>,
    pub yearly: Option<i64>,
}

impl SlotPrices {
    pub fn new(quarterly: i64, half_yearly: i64, yearly: i64) -> Self {
        Self {
            quarterly: Some(quarterly),
            half_yearly: Some(half_yearly),
            yearly: Some(yearly),
        }
    }

    pub fn price_for(&self, category: DurationCategory) -> Option<i64> {
        match category {
            DurationCategory::Quarterly => self.quarterly,
            DurationCategory::HalfYearly => self.half_yearly,
            DurationCategory::Yearly => self.yearly,
        }
    }
}

/// Per-tier price table: unit prices for each of the 8 slots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceTable {
    pub slots: HashMap<SlotName, SlotPrices>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slot(mut self, slot: SlotName, prices: SlotPrices) -> Self {
        self.slots.insert(slot, prices);
        self
    }

    pub fn get(&self, slot: SlotName) -> Option<&SlotPrices> {
        self.slots.get(&slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_name_round_trip() {
        for slot in SlotName::ALL {
            let parsed: SlotName = slot.as_str().parse().unwrap();
            assert_eq!(parsed, slot);
        }
        assert!("banner_5".parse::<SlotName>().is_err());
    }

    #[test]
    fn test_duration_category_units() {
        assert_eq!(DurationCategory::Quarterly.total_days(), 90);
        assert_eq!(DurationCategory::HalfYearly.total_days(), 180);
        assert_eq!(DurationCategory::Yearly.total_days(), 360);
        assert_eq!(DurationCategory::Yearly.num_quarters(), 4);
    }

    #[test]
    fn test_status_occupancy() {
        assert!(BookingStatus::Approved.is_occupying());
        assert!(BookingStatus::Running.is_occupying());
        assert!(!BookingStatus::Pending.is_occupying());
        assert!(!BookingStatus::Rejected.is_occupying());

        // Only pending requests remain open to approve/reject.
        assert!(!BookingStatus::Pending.is_terminal_or_committed());
        assert!(BookingStatus::Approved.is_terminal_or_committed());
        assert!(BookingStatus::Running.is_terminal_or_committed());
        assert!(BookingStatus::Rejected.is_terminal_or_committed());
    }

    #[test]
    fn test_price_table_lookup() {
        let table = PriceTable::new()
            .with_slot(SlotName::Banner1, SlotPrices::new(9000, 16000, 30000));

        let prices = table.get(SlotName::Banner1).unwrap();
        assert_eq!(prices.price_for(DurationCategory::Quarterly), Some(9000));
        assert!(table.get(SlotName::Stamp1).is_none());

        let partial = SlotPrices {
            quarterly: Some(1000),
            ..Default::default()
        };
        assert_eq!(partial.price_for(DurationCategory::Yearly), None);
    }

    #[test]
    fn test_serde_wire_names() {
        let json = serde_json::to_string(&SlotName::Stamp2).unwrap();
        assert_eq!(json, "\"stamp_2\"");
        let json = serde_json::to_string(&DurationCategory::HalfYearly).unwrap();
        assert_eq!(json, "\"half_yearly\"");
        let json = serde_json::to_string(&BookingStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
    }
}
