use crate::repository::{DurationRecordStore, StoreError};
use adspot_core::calendar::{next_quarters, QuarterLabel, QuarterWindow};
use adspot_shared::{SlotName, SLOT_CAPACITY};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Per-slot outcome of an availability check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotAvailability {
    pub slot: SlotName,
    pub available: bool,
    pub conflicting_quarters: Vec<QuarterLabel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub entity_id: Uuid,
    pub available: bool,
    pub slots: Vec<SlotAvailability>,
}

/// One dashboard row: a quarter and the slots already taken in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarterOccupancy {
    pub window: QuarterWindow,
    pub occupied: Vec<SlotName>,
}

/// Read-only conflict and capacity checks against committed bookings.
///
/// Pending requests never block here: two sellers may both hold pending
/// requests for the same slot/quarter, and the conflict only surfaces when
/// the second one is approved.
pub struct AvailabilityChecker {
    store: Arc<dyn DurationRecordStore>,
}

impl AvailabilityChecker {
    pub fn new(store: Arc<dyn DurationRecordStore>) -> Self {
        Self { store }
    }

    /// Quarters in `candidate` already held on `(entity_id, slot)` by a
    /// committed booking of a different request. Empty means available.
    pub async fn conflicting_quarters(
        &self,
        entity_id: Uuid,
        slot: SlotName,
        candidate: &[QuarterLabel],
        exclude_request: Option<Uuid>,
    ) -> Result<Vec<QuarterLabel>, StoreError> {
        let active = self.store.find_active_bookings(entity_id, slot).await?;

        let mut conflicts: Vec<QuarterLabel> = Vec::new();
        for booking in active {
            if Some(booking.request_id) == exclude_request {
                continue;
            }
            for quarter in &booking.quarters_covered {
                if candidate.contains(quarter) && !conflicts.contains(quarter) {
                    conflicts.push(*quarter);
                }
            }
        }
        conflicts.sort();
        Ok(conflicts)
    }

    pub async fn check_slot(
        &self,
        entity_id: Uuid,
        slot: SlotName,
        candidate: &[QuarterLabel],
    ) -> Result<SlotAvailability, StoreError> {
        let conflicting_quarters = self
            .conflicting_quarters(entity_id, slot, candidate, None)
            .await?;
        Ok(SlotAvailability {
            slot,
            available: conflicting_quarters.is_empty(),
            conflicting_quarters,
        })
    }

    /// Check a set of slots against one candidate quarter window.
    /// Read-only: calling it twice with no intervening writes yields
    /// identical results.
    pub async fn check_entity(
        &self,
        entity_id: Uuid,
        slots: &[SlotName],
        candidate: &[QuarterLabel],
    ) -> Result<AvailabilityReport, StoreError> {
        let mut per_slot = Vec::with_capacity(slots.len());
        for &slot in slots {
            per_slot.push(self.check_slot(entity_id, slot, candidate).await?);
        }
        Ok(AvailabilityReport {
            entity_id,
            available: per_slot.iter().all(|s| s.available),
            slots: per_slot,
        })
    }

    /// `Some(occupied)` when the entity has no free slot capacity left.
    /// The cap counts occupying duration records regardless of slot name.
    pub async fn at_capacity(&self, entity_id: Uuid) -> Result<Option<u32>, StoreError> {
        let occupied = self.store.count_occupied_slots(entity_id).await?;
        if occupied as usize >= SLOT_CAPACITY {
            Ok(Some(occupied))
        } else {
            Ok(None)
        }
    }

    /// Occupancy of all 8 slots over the next `n` quarters, for
    /// availability dashboards.
    pub async fn availability_calendar(
        &self,
        entity_id: Uuid,
        from: NaiveDate,
        n: usize,
    ) -> Result<Vec<QuarterOccupancy>, StoreError> {
        let windows = next_quarters(from, n);
        let mut rows: Vec<QuarterOccupancy> = windows
            .into_iter()
            .map(|window| QuarterOccupancy {
                window,
                occupied: Vec::new(),
            })
            .collect();

        for slot in SlotName::ALL {
            let active = self.store.find_active_bookings(entity_id, slot).await?;
            for row in &mut rows {
                let taken = active
                    .iter()
                    .any(|b| b.quarters_covered.contains(&row.window.label));
                if taken {
                    row.occupied.push(slot);
                }
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::ActiveBooking;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Fixed in-memory projection of committed bookings.
    struct FixtureStore {
        active: Mutex<HashMap<(Uuid, SlotName), Vec<ActiveBooking>>>,
        occupied: u32,
    }

    impl FixtureStore {
        fn new(occupied: u32) -> Self {
            Self {
                active: Mutex::new(HashMap::new()),
                occupied,
            }
        }

        fn with_booking(
            self,
            entity_id: Uuid,
            slot: SlotName,
            request_id: Uuid,
            quarters: &[&str],
        ) -> Self {
            let quarters_covered = quarters.iter().map(|q| q.parse().unwrap()).collect();
            self.active
                .lock()
                .unwrap()
                .entry((entity_id, slot))
                .or_default()
                .push(ActiveBooking {
                    request_id,
                    slot,
                    quarters_covered,
                });
            self
        }
    }

    #[async_trait]
    impl DurationRecordStore for FixtureStore {
        async fn find_active_bookings(
            &self,
            entity_id: Uuid,
            slot: SlotName,
        ) -> Result<Vec<ActiveBooking>, StoreError> {
            Ok(self
                .active
                .lock()
                .unwrap()
                .get(&(entity_id, slot))
                .cloned()
                .unwrap_or_default())
        }

        async fn count_occupied_slots(&self, _entity_id: Uuid) -> Result<u32, StoreError> {
            Ok(self.occupied)
        }

        async fn create_request_with_durations(
            &self,
            request: crate::models::BookingRequest,
        ) -> Result<Uuid, StoreError> {
            Ok(request.id)
        }

        async fn get_request(
            &self,
            _request_id: Uuid,
        ) -> Result<Option<crate::models::BookingRequest>, StoreError> {
            Ok(None)
        }

        async fn update_status(
            &self,
            _request_id: Uuid,
            _status: adspot_shared::BookingStatus,
            _update: crate::repository::StatusUpdate,
        ) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn labels(quarters: &[&str]) -> Vec<QuarterLabel> {
        quarters.iter().map(|q| q.parse().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_overlapping_quarter_conflicts() {
        let entity = Uuid::new_v4();
        let store = FixtureStore::new(1).with_booking(
            entity,
            SlotName::Banner1,
            Uuid::new_v4(),
            &["Q1 2025", "Q2 2025"],
        );
        let checker = AvailabilityChecker::new(Arc::new(store));

        let report = checker
            .check_entity(entity, &[SlotName::Banner1], &labels(&["Q2 2025", "Q3 2025"]))
            .await
            .unwrap();
        assert!(!report.available);
        assert_eq!(report.slots[0].conflicting_quarters, labels(&["Q2 2025"]));

        // Non-overlapping window on the same slot is fine
        let report = checker
            .check_entity(entity, &[SlotName::Banner1], &labels(&["Q3 2025", "Q4 2025"]))
            .await
            .unwrap();
        assert!(report.available);

        // Same window on a different slot is fine
        let report = checker
            .check_entity(entity, &[SlotName::Banner2], &labels(&["Q1 2025"]))
            .await
            .unwrap();
        assert!(report.available);
    }

    #[tokio::test]
    async fn test_own_request_is_excluded() {
        let entity = Uuid::new_v4();
        let request = Uuid::new_v4();
        let store = FixtureStore::new(1).with_booking(
            entity,
            SlotName::Stamp1,
            request,
            &["Q1 2025"],
        );
        let checker = AvailabilityChecker::new(Arc::new(store));

        let conflicts = checker
            .conflicting_quarters(entity, SlotName::Stamp1, &labels(&["Q1 2025"]), Some(request))
            .await
            .unwrap();
        assert!(conflicts.is_empty());
    }

    #[tokio::test]
    async fn test_check_is_idempotent() {
        let entity = Uuid::new_v4();
        let store = FixtureStore::new(2).with_booking(
            entity,
            SlotName::Banner3,
            Uuid::new_v4(),
            &["Q4 2025"],
        );
        let checker = AvailabilityChecker::new(Arc::new(store));

        let candidate = labels(&["Q4 2025"]);
        let first = checker
            .check_slot(entity, SlotName::Banner3, &candidate)
            .await
            .unwrap();
        let second = checker
            .check_slot(entity, SlotName::Banner3, &candidate)
            .await
            .unwrap();
        assert_eq!(first.available, second.available);
        assert_eq!(first.conflicting_quarters, second.conflicting_quarters);
    }

    #[tokio::test]
    async fn test_capacity_gate() {
        let entity = Uuid::new_v4();
        let checker = AvailabilityChecker::new(Arc::new(FixtureStore::new(7)));
        assert!(checker.at_capacity(entity).await.unwrap().is_none());

        let checker = AvailabilityChecker::new(Arc::new(FixtureStore::new(8)));
        assert_eq!(checker.at_capacity(entity).await.unwrap(), Some(8));
    }

    #[tokio::test]
    async fn test_availability_calendar_rows() {
        let entity = Uuid::new_v4();
        let store = FixtureStore::new(1).with_booking(
            entity,
            SlotName::Banner1,
            Uuid::new_v4(),
            &["Q2 2025", "Q3 2025"],
        );
        let checker = AvailabilityChecker::new(Arc::new(store));

        let from = NaiveDate::from_ymd_opt(2025, 2, 15).unwrap();
        let rows = checker.availability_calendar(entity, from, 4).await.unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows[0].occupied.is_empty()); // Q1 2025
        assert_eq!(rows[1].occupied, vec![SlotName::Banner1]); // Q2 2025
        assert_eq!(rows[2].occupied, vec![SlotName::Banner1]); // Q3 2025
        assert!(rows[3].occupied.is_empty()); // Q4 2025
    }
}
