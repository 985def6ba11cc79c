use adspot_core::calendar::{
    days_in_quarter, next_quarter_start, quarter_end, quarter_label, quarter_start,
    split_into_quarter_segments, CalendarError, QuarterLabel,
};
use adspot_shared::{DurationCategory, PriceTable, SlotName, StartPreference};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// When a quoted booking window should begin.
///
/// An explicit anchor is only representable for the next-quarter policy,
/// so "explicit start with an immediate booking" cannot be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPolicy {
    /// Start on the quote date; the remainder of the current quarter is
    /// billed pro-rata on top of the full-duration price.
    Today,
    /// Start on the first day of a quarter: the given one, or the next
    /// quarter after the quote date when `start` is `None`.
    NextQuarter { start: Option<NaiveDate> },
}

impl StartPolicy {
    pub fn preference(&self) -> StartPreference {
        match self {
            StartPolicy::Today => StartPreference::Today,
            StartPolicy::NextQuarter { .. } => StartPreference::NextQuarter,
        }
    }
}

/// One line of a price breakdown: a date range within a single quarter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceSegment {
    pub quarter: QuarterLabel,
    pub seg_start: NaiveDate,
    pub seg_end: NaiveDate,
    pub day_count: i64,
    /// Informational daily rate, rounded to 2 decimal places.
    pub rate_per_day: f64,
    /// Informational amount. Segment subtotals may drift from
    /// `total_price` by a currency unit or two; `total_price` is the
    /// billed amount.
    pub subtotal: i64,
    pub pro_rata: bool,
}

/// Full price computation for one slot: window, covered quarters, and the
/// day-by-day-accurate breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceQuote {
    pub slot: SlotName,
    pub category: DurationCategory,
    pub start_preference: StartPreference,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub quarters_covered: Vec<QuarterLabel>,
    pub pro_rata_charge: Option<i64>,
    pub segments: Vec<PriceSegment>,
    /// Authoritative billed amount: pro-rata charge (if any) plus the
    /// duration category's full price.
    pub total_price: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("no {category} price configured for slot {slot}")]
    NotConfigured {
        slot: SlotName,
        category: DurationCategory,
    },

    #[error("start date {0} is not the first day of a quarter")]
    StartNotQuarterAligned(NaiveDate),

    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

/// Computes quarter-segmented price quotes from a tier's price table.
#[derive(Debug, Default)]
pub struct PricingEngine;

impl PricingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Quote with "today" resolved from the wall clock (UTC).
    pub fn quote_now(
        &self,
        table: &PriceTable,
        slot: SlotName,
        policy: StartPolicy,
        category: DurationCategory,
    ) -> Result<PriceQuote, PricingError> {
        self.quote(table, slot, policy, category, Utc::now().date_naive())
    }

    /// Compute the price quote for one slot.
    ///
    /// The duration category price is the complete N-quarter purchase
    /// price; it is never multiplied by segment count. Under the today
    /// policy the remainder of the current quarter is charged pro-rata
    /// against the quarterly price on top of that, regardless of whether
    /// `today` happens to be a quarter boundary.
    pub fn quote(
        &self,
        table: &PriceTable,
        slot: SlotName,
        policy: StartPolicy,
        category: DurationCategory,
        today: NaiveDate,
    ) -> Result<PriceQuote, PricingError> {
        let prices = table
            .get(slot)
            .ok_or(PricingError::NotConfigured { slot, category })?;
        let category_price = prices
            .price_for(category)
            .ok_or(PricingError::NotConfigured { slot, category })?;

        let mut segments = Vec::new();
        let mut pro_rata_charge = None;

        let full_start = match policy {
            StartPolicy::Today => {
                let anchor = today;
                let q_end = quarter_end(anchor);
                let pro_days = (q_end - anchor).num_days() + 1;
                let q_total = days_in_quarter(anchor);
                let quarterly_price =
                    prices
                        .price_for(DurationCategory::Quarterly)
                        .ok_or(PricingError::NotConfigured {
                            slot,
                            category: DurationCategory::Quarterly,
                        })?;

                let charge =
                    ((pro_days as f64 / q_total as f64) * quarterly_price as f64).round() as i64;

                segments.push(PriceSegment {
                    quarter: quarter_label(anchor),
                    seg_start: anchor,
                    seg_end: q_end,
                    day_count: pro_days,
                    rate_per_day: round2(charge as f64 / pro_days as f64),
                    // The already-rounded charge, not rate * days: avoids
                    // double rounding drift on the billed component.
                    subtotal: charge,
                    pro_rata: true,
                });
                pro_rata_charge = Some(charge);

                next_quarter_start(anchor)
            }
            StartPolicy::NextQuarter { start } => match start {
                Some(date) => {
                    if date != quarter_start(date) {
                        return Err(PricingError::StartNotQuarterAligned(date));
                    }
                    date
                }
                None => next_quarter_start(today),
            },
        };

        let total_days = category.total_days();
        let rate_per_day = round2(category_price as f64 / total_days as f64);
        for seg in split_into_quarter_segments(full_start, total_days)? {
            segments.push(PriceSegment {
                quarter: seg.label,
                seg_start: seg.seg_start,
                seg_end: seg.seg_end,
                day_count: seg.day_count,
                rate_per_day,
                subtotal: (rate_per_day * seg.day_count as f64).round() as i64,
                pro_rata: false,
            });
        }

        let start_date = segments.first().map(|s| s.seg_start).unwrap_or(full_start);
        let end_date = segments.last().map(|s| s.seg_end).unwrap_or(full_start);

        let mut quarters_covered: Vec<QuarterLabel> = Vec::new();
        for seg in &segments {
            if quarters_covered.last() != Some(&seg.quarter) {
                quarters_covered.push(seg.quarter);
            }
        }

        Ok(PriceQuote {
            slot,
            category,
            start_preference: policy.preference(),
            start_date,
            end_date,
            quarters_covered,
            pro_rata_charge,
            segments,
            total_price: pro_rata_charge.unwrap_or(0) + category_price,
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
