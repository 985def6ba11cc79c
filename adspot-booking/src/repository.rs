use crate::models::{BookingRequest, DurationRecord};
use adspot_core::calendar::QuarterLabel;
use adspot_shared::{BookingStatus, SlotName};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Projection of a committed (approved or running) duration record, as
/// much as conflict checking needs to know.
#[derive(Debug, Clone)]
pub struct ActiveBooking {
    pub request_id: Uuid,
    pub slot: SlotName,
    pub quarters_covered: Vec<QuarterLabel>,
}

/// Fields applied alongside a status transition.
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    /// Wholesale replacement of the duration records, used when approval
    /// re-anchors booking windows. `None` leaves windows untouched.
    pub durations: Option<Vec<DurationRecord>>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("slot {slot} already booked for {quarter}")]
    SlotTaken { slot: SlotName, quarter: QuarterLabel },

    #[error("entity {entity_id} already has {occupied} occupied slots")]
    CapacityExhausted { entity_id: Uuid, occupied: u32 },

    #[error("booking request not found: {0}")]
    RequestMissing(Uuid),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Persistence seam for booking requests and their duration records.
///
/// `create_request_with_durations` and the approve transition of
/// `update_status` must be serializable with respect to each other: two
/// concurrent writers for the same slot/quarter cannot both commit, and
/// the loser observes a typed conflict.
#[async_trait]
pub trait DurationRecordStore: Send + Sync {
    /// Committed duration records holding `slot` on `entity_id`.
    async fn find_active_bookings(
        &self,
        entity_id: Uuid,
        slot: SlotName,
    ) -> Result<Vec<ActiveBooking>, StoreError>;

    /// Number of duration records on the entity with an occupying status.
    async fn count_occupied_slots(&self, entity_id: Uuid) -> Result<u32, StoreError>;

    /// Persist the request and all its duration records as one atomic
    /// write; nothing is persisted on failure.
    async fn create_request_with_durations(
        &self,
        request: BookingRequest,
    ) -> Result<Uuid, StoreError>;

    async fn get_request(&self, request_id: Uuid) -> Result<Option<BookingRequest>, StoreError>;

    /// Transition the request and all its duration records, applying the
    /// accompanying fields. A failed transition leaves state unchanged.
    async fn update_status(
        &self,
        request_id: Uuid,
        status: BookingStatus,
        update: StatusUpdate,
    ) -> Result<(), StoreError>;
}
