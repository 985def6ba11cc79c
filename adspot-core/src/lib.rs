pub mod calendar;
pub mod repository;

pub use calendar::{
    days_in_quarter, next_quarter_start, next_quarters, quarter_end, quarter_label,
    quarter_start, split_into_quarter_segments, CalendarError, QuarterLabel, QuarterSegment,
    QuarterWindow,
};
pub use repository::{PriceTableProvider, TierResolver};
