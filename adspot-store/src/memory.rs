use adspot_booking::models::BookingRequest;
use adspot_booking::repository::{ActiveBooking, DurationRecordStore, StatusUpdate, StoreError};
use adspot_core::repository::{PriceTableProvider, TierResolver};
use adspot_shared::{BookingStatus, PriceTable, SlotName, SLOT_CAPACITY};
use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory entity-to-tier assignments.
#[derive(Default)]
pub struct InMemoryTierResolver {
    assignments: RwLock<HashMap<Uuid, Uuid>>,
}

impl InMemoryTierResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn assign(&self, entity_id: Uuid, tier_id: Uuid) {
        self.assignments.write().await.insert(entity_id, tier_id);
    }
}

#[async_trait]
impl TierResolver for InMemoryTierResolver {
    async fn resolve_tier(
        &self,
        entity_id: Uuid,
    ) -> Result<Option<Uuid>, Box<dyn Error + Send + Sync>> {
        Ok(self.assignments.read().await.get(&entity_id).copied())
    }
}

/// In-memory per-tier price tables.
#[derive(Default)]
pub struct InMemoryPriceTableProvider {
    tables: RwLock<HashMap<Uuid, PriceTable>>,
}

impl InMemoryPriceTableProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_table(&self, tier_id: Uuid, table: PriceTable) {
        self.tables.write().await.insert(tier_id, table);
    }
}

#[async_trait]
impl PriceTableProvider for InMemoryPriceTableProvider {
    async fn price_table(
        &self,
        tier_id: Uuid,
    ) -> Result<Option<PriceTable>, Box<dyn Error + Send + Sync>> {
        Ok(self.tables.read().await.get(&tier_id).cloned())
    }
}

/// In-memory booking request store.
///
/// One write lock covers the whole collection, so create and approve are
/// serializable: each re-verifies capacity and conflicts against
/// committed records before mutating, and a concurrent loser gets a
/// typed conflict instead of a double booking.
#[derive(Default)]
pub struct InMemoryDurationStore {
    requests: RwLock<HashMap<Uuid, BookingRequest>>,
}

impl InMemoryDurationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn occupied_count(requests: &HashMap<Uuid, BookingRequest>, entity_id: Uuid) -> u32 {
        requests
            .values()
            .filter(|r| r.entity_id == entity_id)
            .flat_map(|r| r.durations.iter())
            .filter(|d| d.status.is_occupying())
            .count() as u32
    }

    /// First committed quarter collision for the given request, if any.
    fn first_conflict(
        requests: &HashMap<Uuid, BookingRequest>,
        candidate: &BookingRequest,
    ) -> Option<StoreError> {
        for duration in &candidate.durations {
            for other in requests.values() {
                if other.id == candidate.id || other.entity_id != candidate.entity_id {
                    continue;
                }
                for committed in &other.durations {
                    if committed.slot != duration.slot || !committed.status.is_occupying() {
                        continue;
                    }
                    if let Some(quarter) = committed
                        .quarters_covered
                        .iter()
                        .find(|q| duration.quarters_covered.contains(q))
                    {
                        return Some(StoreError::SlotTaken {
                            slot: duration.slot,
                            quarter: *quarter,
                        });
                    }
                }
            }
        }
        None
    }
}

#[async_trait]
impl DurationRecordStore for InMemoryDurationStore {
    async fn find_active_bookings(
        &self,
        entity_id: Uuid,
        slot: SlotName,
    ) -> Result<Vec<ActiveBooking>, StoreError> {
        let requests = self.requests.read().await;
        Ok(requests
            .values()
            .filter(|r| r.entity_id == entity_id)
            .flat_map(|r| r.durations.iter())
            .filter(|d| d.slot == slot && d.status.is_occupying())
            .map(|d| ActiveBooking {
                request_id: d.request_id,
                slot: d.slot,
                quarters_covered: d.quarters_covered.clone(),
            })
            .collect())
    }

    async fn count_occupied_slots(&self, entity_id: Uuid) -> Result<u32, StoreError> {
        let requests = self.requests.read().await;
        Ok(Self::occupied_count(&requests, entity_id))
    }

    async fn create_request_with_durations(
        &self,
        request: BookingRequest,
    ) -> Result<Uuid, StoreError> {
        let mut requests = self.requests.write().await;

        // Re-verify under the write lock: the caller's checks may have
        // raced with another committed booking.
        let occupied = Self::occupied_count(&requests, request.entity_id);
        if occupied as usize >= SLOT_CAPACITY {
            return Err(StoreError::CapacityExhausted {
                entity_id: request.entity_id,
                occupied,
            });
        }
        if let Some(conflict) = Self::first_conflict(&requests, &request) {
            return Err(conflict);
        }

        let id = request.id;
        requests.insert(id, request);
        tracing::debug!(request_id = %id, "booking request persisted");
        Ok(id)
    }

    async fn get_request(&self, request_id: Uuid) -> Result<Option<BookingRequest>, StoreError> {
        Ok(self.requests.read().await.get(&request_id).cloned())
    }

    async fn update_status(
        &self,
        request_id: Uuid,
        status: BookingStatus,
        update: StatusUpdate,
    ) -> Result<(), StoreError> {
        let mut requests = self.requests.write().await;

        // Validate against a snapshot first; the stored request is only
        // mutated once the transition is known to be committable.
        let mut updated = requests
            .get(&request_id)
            .cloned()
            .ok_or(StoreError::RequestMissing(request_id))?;

        if let Some(durations) = update.durations {
            updated.durations = durations;
        }
        if update.approved_by.is_some() {
            updated.approved_by = update.approved_by;
        }
        if update.approved_at.is_some() {
            updated.approved_at = update.approved_at;
        }
        if update.rejection_reason.is_some() {
            updated.rejection_reason = update.rejection_reason;
        }

        if status == BookingStatus::Approved {
            let occupied = Self::occupied_count(&requests, updated.entity_id);
            if occupied as usize + updated.durations.len() > SLOT_CAPACITY {
                return Err(StoreError::CapacityExhausted {
                    entity_id: updated.entity_id,
                    occupied,
                });
            }
            if let Some(conflict) = Self::first_conflict(&requests, &updated) {
                return Err(conflict);
            }
        }

        updated.update_status(status);
        requests.insert(request_id, updated);
        tracing::debug!(request_id = %request_id, status = %status, "booking status updated");
        Ok(())
    }
}
