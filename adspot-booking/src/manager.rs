use crate::availability::{AvailabilityChecker, AvailabilityReport, QuarterOccupancy};
use crate::models::{BookingRequest, DurationRecord};
use crate::repository::{DurationRecordStore, StatusUpdate, StoreError};
use adspot_core::calendar::{
    next_quarter_start, quarter_end, quarter_start, split_into_quarter_segments, CalendarError,
    QuarterLabel,
};
use adspot_core::repository::{PriceTableProvider, TierResolver};
use adspot_pricing::{PricingEngine, PricingError, StartPolicy};
use adspot_shared::{BookingStatus, DurationCategory, SlotName, StartPreference, SLOT_CAPACITY};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// A seller's proposal to book slots on one entity.
#[derive(Debug, Clone)]
pub struct ProposeBooking {
    pub entity_id: Uuid,
    pub requester_id: Uuid,
    pub slots: Vec<SlotName>,
    pub start_policy: StartPolicy,
    pub category: DurationCategory,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("entity not found: {0}")]
    EntityNotFound(Uuid),

    #[error("no price table for tier: {0}")]
    TierNotFound(Uuid),

    #[error("no {category} price configured for slot {slot}")]
    PricingNotConfigured {
        slot: SlotName,
        category: DurationCategory,
    },

    #[error("entity {entity_id} already has {occupied} occupied slots")]
    SlotCapExceeded { entity_id: Uuid, occupied: u32 },

    #[error("slot {slot} already booked for an overlapping quarter")]
    SlotConflict {
        slot: SlotName,
        quarters: Vec<QuarterLabel>,
    },

    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error("start date {0} is not the first day of a quarter")]
    InvalidStartDate(NaiveDate),

    #[error("no slots requested")]
    NoSlotsRequested,

    #[error("slot {0} requested more than once")]
    DuplicateSlot(SlotName),

    #[error("booking request not found: {0}")]
    RequestNotFound(Uuid),

    #[error("booking request {request_id} is {status}, not pending")]
    RequestNotPending {
        request_id: Uuid,
        status: BookingStatus,
    },

    #[error("storage error: {0}")]
    Store(StoreError),

    #[error("collaborator failure: {0}")]
    Collaborator(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SlotTaken { slot, quarter } => BookingError::SlotConflict {
                slot,
                quarters: vec![quarter],
            },
            StoreError::CapacityExhausted {
                entity_id,
                occupied,
            } => BookingError::SlotCapExceeded {
                entity_id,
                occupied,
            },
            StoreError::RequestMissing(id) => BookingError::RequestNotFound(id),
            other => BookingError::Store(other),
        }
    }
}

impl From<PricingError> for BookingError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::NotConfigured { slot, category } => {
                BookingError::PricingNotConfigured { slot, category }
            }
            PricingError::StartNotQuarterAligned(date) => BookingError::InvalidStartDate(date),
            PricingError::Calendar(e) => BookingError::InvalidDuration(e.to_string()),
        }
    }
}

impl From<CalendarError> for BookingError {
    fn from(err: CalendarError) -> Self {
        BookingError::InvalidDuration(err.to_string())
    }
}

/// Governs the booking request lifecycle: create in `pending`, then
/// approve or reject.
///
/// Proposal checks conflicts only against committed (approved/running)
/// bookings. Two pending requests for the same slot/quarter can coexist;
/// approval re-checks and fails the loser.
pub struct BookingManager {
    tiers: Arc<dyn TierResolver>,
    prices: Arc<dyn PriceTableProvider>,
    store: Arc<dyn DurationRecordStore>,
    engine: PricingEngine,
    checker: AvailabilityChecker,
    dashboard_window: usize,
}

impl BookingManager {
    pub fn new(
        tiers: Arc<dyn TierResolver>,
        prices: Arc<dyn PriceTableProvider>,
        store: Arc<dyn DurationRecordStore>,
    ) -> Self {
        let checker = AvailabilityChecker::new(store.clone());
        Self {
            tiers,
            prices,
            store,
            engine: PricingEngine::new(),
            checker,
            dashboard_window: 4,
        }
    }

    /// Number of quarters rendered by [`availability_calendar`].
    ///
    /// [`availability_calendar`]: BookingManager::availability_calendar
    pub fn with_dashboard_window(mut self, quarters: usize) -> Self {
        self.dashboard_window = quarters;
        self
    }

    /// Create a booking request with "today" taken from the wall clock.
    pub async fn propose_booking(
        &self,
        proposal: ProposeBooking,
    ) -> Result<BookingRequest, BookingError> {
        self.propose_booking_at(proposal, Utc::now().date_naive()).await
    }

    /// Create a booking request: validate, price every requested slot,
    /// and persist the request with its duration records atomically, all
    /// in `pending`.
    pub async fn propose_booking_at(
        &self,
        proposal: ProposeBooking,
        today: NaiveDate,
    ) -> Result<BookingRequest, BookingError> {
        if proposal.slots.is_empty() {
            return Err(BookingError::NoSlotsRequested);
        }
        for (i, slot) in proposal.slots.iter().enumerate() {
            if proposal.slots[..i].contains(slot) {
                return Err(BookingError::DuplicateSlot(*slot));
            }
        }

        let tier_id = self
            .tiers
            .resolve_tier(proposal.entity_id)
            .await?
            .ok_or(BookingError::EntityNotFound(proposal.entity_id))?;
        let table = self
            .prices
            .price_table(tier_id)
            .await?
            .ok_or(BookingError::TierNotFound(tier_id))?;

        // Global cap first, before any per-slot check.
        if let Some(occupied) = self.checker.at_capacity(proposal.entity_id).await? {
            tracing::warn!(
                entity_id = %proposal.entity_id,
                occupied,
                "booking rejected: slot capacity exhausted"
            );
            return Err(BookingError::SlotCapExceeded {
                entity_id: proposal.entity_id,
                occupied,
            });
        }

        let mut request = BookingRequest::new(
            proposal.requester_id,
            proposal.entity_id,
            tier_id,
        );
        for &slot in &proposal.slots {
            let quote = self.engine.quote(
                &table,
                slot,
                proposal.start_policy,
                proposal.category,
                today,
            )?;

            let conflicts = self
                .checker
                .conflicting_quarters(proposal.entity_id, slot, &quote.quarters_covered, None)
                .await?;
            if !conflicts.is_empty() {
                tracing::warn!(
                    entity_id = %proposal.entity_id,
                    slot = %slot,
                    "booking rejected: slot conflict"
                );
                return Err(BookingError::SlotConflict {
                    slot,
                    quarters: conflicts,
                });
            }

            request.add_duration(DurationRecord::from_quote(request.id, quote));
        }

        // The store re-verifies cap and conflicts under its own write
        // isolation; a concurrent committed booking surfaces as a typed
        // conflict here.
        self.store.create_request_with_durations(request.clone()).await?;

        tracing::info!(
            request_id = %request.id,
            entity_id = %request.entity_id,
            slots = request.durations.len(),
            total_price = request.total_price(),
            "booking request created"
        );
        Ok(request)
    }

    /// Read-only availability probe with "today" from the wall clock.
    pub async fn check_availability(
        &self,
        entity_id: Uuid,
        slots: &[SlotName],
        policy: StartPolicy,
        category: DurationCategory,
    ) -> Result<AvailabilityReport, BookingError> {
        self.check_availability_at(entity_id, slots, policy, category, Utc::now().date_naive())
            .await
    }

    /// Read-only availability probe for a candidate window.
    ///
    /// The window is derived exactly as [`propose_booking_at`] would
    /// derive it, pro-rata remainder included, so a positive answer here
    /// matches the conflict outcome of the equivalent proposal.
    ///
    /// [`propose_booking_at`]: BookingManager::propose_booking_at
    pub async fn check_availability_at(
        &self,
        entity_id: Uuid,
        slots: &[SlotName],
        policy: StartPolicy,
        category: DurationCategory,
        today: NaiveDate,
    ) -> Result<AvailabilityReport, BookingError> {
        let candidate = candidate_quarters(policy, category, today)?;
        Ok(self.checker.check_entity(entity_id, slots, &candidate).await?)
    }

    /// Slot occupancy per quarter over the configured dashboard window.
    pub async fn availability_calendar(
        &self,
        entity_id: Uuid,
        from: NaiveDate,
    ) -> Result<Vec<QuarterOccupancy>, BookingError> {
        Ok(self
            .checker
            .availability_calendar(entity_id, from, self.dashboard_window)
            .await?)
    }

    pub async fn approve_booking(
        &self,
        request_id: Uuid,
        approved_by: &str,
        start_date: Option<NaiveDate>,
    ) -> Result<BookingRequest, BookingError> {
        self.approve_booking_at(request_id, approved_by, start_date, Utc::now().date_naive())
            .await
    }

    /// Transition a pending request and all its duration records to
    /// `approved`, re-checking conflicts against committed state.
    ///
    /// An explicit `start_date` re-anchors the windows of next-quarter
    /// durations; it must be the first day of a quarter. Today-preference
    /// windows were priced against the proposal day and stay as they are.
    pub async fn approve_booking_at(
        &self,
        request_id: Uuid,
        approved_by: &str,
        start_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<BookingRequest, BookingError> {
        let mut request = self
            .store
            .get_request(request_id)
            .await?
            .ok_or(BookingError::RequestNotFound(request_id))?;
        if request.status.is_terminal_or_committed() {
            return Err(BookingError::RequestNotPending {
                request_id,
                status: request.status,
            });
        }

        if let Some(start) = start_date {
            if start != quarter_start(start) {
                return Err(BookingError::InvalidStartDate(start));
            }
            let table = self
                .prices
                .price_table(request.tier_id)
                .await?
                .ok_or(BookingError::TierNotFound(request.tier_id))?;
            for duration in &mut request.durations {
                if duration.start_preference == StartPreference::NextQuarter {
                    let quote = self.engine.quote(
                        &table,
                        duration.slot,
                        StartPolicy::NextQuarter { start: Some(start) },
                        duration.category,
                        today,
                    )?;
                    duration.apply_quote(quote);
                }
            }
        }

        // Approval is where optimistic pending requests collide: re-check
        // cap and conflicts against what is committed by now.
        let occupied = self.store.count_occupied_slots(request.entity_id).await?;
        if occupied as usize + request.durations.len() > SLOT_CAPACITY {
            return Err(BookingError::SlotCapExceeded {
                entity_id: request.entity_id,
                occupied,
            });
        }
        for duration in &request.durations {
            let conflicts = self
                .checker
                .conflicting_quarters(
                    request.entity_id,
                    duration.slot,
                    &duration.quarters_covered,
                    Some(request.id),
                )
                .await?;
            if !conflicts.is_empty() {
                tracing::warn!(
                    request_id = %request.id,
                    slot = %duration.slot,
                    "approval rejected: slot conflict with committed booking"
                );
                return Err(BookingError::SlotConflict {
                    slot: duration.slot,
                    quarters: conflicts,
                });
            }
        }

        request.approved_by = Some(approved_by.to_string());
        request.approved_at = Some(Utc::now());
        request.update_status(BookingStatus::Approved);

        self.store
            .update_status(
                request_id,
                BookingStatus::Approved,
                StatusUpdate {
                    approved_by: request.approved_by.clone(),
                    approved_at: request.approved_at,
                    rejection_reason: None,
                    durations: Some(request.durations.clone()),
                },
            )
            .await?;

        tracing::info!(
            request_id = %request.id,
            entity_id = %request.entity_id,
            approved_by,
            "booking request approved"
        );
        Ok(request)
    }

    /// Transition a pending request and all its duration records to
    /// `rejected`, releasing the slots for future bookings.
    pub async fn reject_booking(
        &self,
        request_id: Uuid,
        reason: &str,
    ) -> Result<BookingRequest, BookingError> {
        let mut request = self
            .store
            .get_request(request_id)
            .await?
            .ok_or(BookingError::RequestNotFound(request_id))?;
        if request.status.is_terminal_or_committed() {
            return Err(BookingError::RequestNotPending {
                request_id,
                status: request.status,
            });
        }

        request.rejection_reason = Some(reason.to_string());
        request.update_status(BookingStatus::Rejected);

        self.store
            .update_status(
                request_id,
                BookingStatus::Rejected,
                StatusUpdate {
                    rejection_reason: request.rejection_reason.clone(),
                    ..StatusUpdate::default()
                },
            )
            .await?;

        tracing::info!(request_id = %request.id, reason, "booking request rejected");
        Ok(request)
    }

    pub async fn booking(&self, request_id: Uuid) -> Result<BookingRequest, BookingError> {
        self.store
            .get_request(request_id)
            .await?
            .ok_or(BookingError::RequestNotFound(request_id))
    }
}

/// Distinct quarter labels a proposal with this policy and category would
/// cover, anchored the same way the pricing engine anchors it.
fn candidate_quarters(
    policy: StartPolicy,
    category: DurationCategory,
    today: NaiveDate,
) -> Result<Vec<QuarterLabel>, BookingError> {
    let (start, days) = match policy {
        StartPolicy::Today => {
            // Pro-rata remainder of the current quarter, then the full
            // purchase from the next quarter boundary; contiguous, so one
            // walk from today covers both.
            let remainder = (quarter_end(today) - today).num_days() + 1;
            (today, remainder + category.total_days())
        }
        StartPolicy::NextQuarter { start } => {
            let anchor = match start {
                Some(date) => {
                    if date != quarter_start(date) {
                        return Err(BookingError::InvalidStartDate(date));
                    }
                    date
                }
                None => next_quarter_start(today),
            };
            (anchor, category.total_days())
        }
    };

    let segments = split_into_quarter_segments(start, days)?;
    let mut quarters = Vec::new();
    for seg in segments {
        if quarters.last() != Some(&seg.label) {
            quarters.push(seg.label);
        }
    }
    Ok(quarters)
}
