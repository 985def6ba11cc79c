use adspot_core::calendar::QuarterLabel;
use adspot_pricing::{PriceQuote, PriceSegment};
use adspot_shared::{BookingStatus, DurationCategory, SlotName, StartPreference};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-slot booking window, status, and price breakdown within a booking
/// request.
///
/// Records are never deleted; rejection transitions the status and
/// thereby releases the slot while keeping the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationRecord {
    pub id: Uuid,
    pub request_id: Uuid,
    pub slot: SlotName,
    pub status: BookingStatus,
    pub start_preference: StartPreference,
    pub category: DurationCategory,
    /// Inclusive window, UTC midnight aligned.
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Distinct quarter labels the window touches, in order.
    pub quarters_covered: Vec<QuarterLabel>,
    pub pricing_breakdown: Vec<PriceSegment>,
    /// Authoritative billed amount for this slot.
    pub total_price: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DurationRecord {
    pub fn from_quote(request_id: Uuid, quote: PriceQuote) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            request_id,
            slot: quote.slot,
            status: BookingStatus::Pending,
            start_preference: quote.start_preference,
            category: quote.category,
            start_date: quote.start_date,
            end_date: quote.end_date,
            quarters_covered: quote.quarters_covered,
            pricing_breakdown: quote.segments,
            total_price: quote.total_price,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the window and breakdown with a fresh quote, keeping
    /// identity and status. Used when approval re-anchors the start date.
    pub fn apply_quote(&mut self, quote: PriceQuote) {
        self.start_preference = quote.start_preference;
        self.category = quote.category;
        self.start_date = quote.start_date;
        self.end_date = quote.end_date;
        self.quarters_covered = quote.quarters_covered;
        self.pricing_breakdown = quote.segments;
        self.total_price = quote.total_price;
        self.updated_at = Utc::now();
    }

    pub fn update_status(&mut self, status: BookingStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn window_contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Status as observed at `today`: an approved record whose window
    /// contains today reports running. Expiry past `end_date` is a
    /// read-time computation, never a persisted transition.
    pub fn effective_status(&self, today: NaiveDate) -> BookingStatus {
        if self.status == BookingStatus::Approved && self.window_contains(today) {
            BookingStatus::Running
        } else {
            self.status
        }
    }
}

/// One seller's request to advertise on one entity, covering one or more
/// slots. The aggregate root owning the duration records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub entity_id: Uuid,
    /// Resolved from the entity at creation time, immutable thereafter.
    pub tier_id: Uuid,
    pub status: BookingStatus,
    pub durations: Vec<DurationRecord>,
    pub rejection_reason: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingRequest {
    pub fn new(requester_id: Uuid, entity_id: Uuid, tier_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            requester_id,
            entity_id,
            tier_id,
            status: BookingStatus::Pending,
            durations: Vec::new(),
            rejection_reason: None,
            approved_by: None,
            approved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn add_duration(&mut self, duration: DurationRecord) {
        self.durations.push(duration);
        self.updated_at = Utc::now();
    }

    /// Sum of the durations' authoritative billed amounts.
    pub fn total_price(&self) -> i64 {
        self.durations.iter().map(|d| d.total_price).sum()
    }

    /// Transition the request and cascade to all duration records.
    pub fn update_status(&mut self, status: BookingStatus) {
        self.status = status;
        for duration in &mut self.durations {
            duration.update_status(status);
        }
        self.updated_at = Utc::now();
    }

    /// Status as observed at `today`: approved requests with at least one
    /// currently-running window report running.
    pub fn effective_status(&self, today: NaiveDate) -> BookingStatus {
        if self.status == BookingStatus::Approved
            && self.durations.iter().any(|d| d.window_contains(today))
        {
            BookingStatus::Running
        } else {
            self.status
        }
    }
}
