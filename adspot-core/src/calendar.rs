use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A calendar quarter identified by year and quarter number.
///
/// Serializes as its display form, e.g. `"Q1 2025"`. Ordering is
/// chronological (year first, then quarter).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(into = "String", try_from = "String")]
pub struct QuarterLabel {
    pub year: i32,
    pub quarter: u8,
}

impl fmt::Display for QuarterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{} {}", self.quarter, self.year)
    }
}

impl From<QuarterLabel> for String {
    fn from(label: QuarterLabel) -> Self {
        label.to_string()
    }
}

impl FromStr for QuarterLabel {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = || -> Option<QuarterLabel> {
            let rest = s.strip_prefix('Q')?;
            let (quarter, year) = rest.split_once(' ')?;
            let quarter: u8 = quarter.parse().ok()?;
            if !(1..=4).contains(&quarter) {
                return None;
            }
            let year: i32 = year.parse().ok()?;
            Some(QuarterLabel { year, quarter })
        };
        parse().ok_or_else(|| CalendarError::InvalidLabel(s.to_string()))
    }
}

impl TryFrom<String> for QuarterLabel {
    type Error = CalendarError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// One calendar quarter with its inclusive date range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuarterWindow {
    pub label: QuarterLabel,
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
}

/// A contiguous date range within a single calendar quarter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuarterSegment {
    pub label: QuarterLabel,
    pub seg_start: NaiveDate,
    pub seg_end: NaiveDate,
    pub day_count: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("day count must be at least 1, got {0}")]
    InvalidDayCount(i64),

    #[error("invalid quarter label: {0}")]
    InvalidLabel(String),
}

// Quarter boundary months and day 1 are always representable.
fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

/// The quarter containing `date`: Q1 = Jan-Mar .. Q4 = Oct-Dec.
pub fn quarter_label(date: NaiveDate) -> QuarterLabel {
    QuarterLabel {
        year: date.year(),
        quarter: (date.month0() / 3 + 1) as u8,
    }
}

/// First day of the quarter containing `date`.
pub fn quarter_start(date: NaiveDate) -> NaiveDate {
    let label = quarter_label(date);
    ymd(label.year, (label.quarter as u32 - 1) * 3 + 1, 1)
}

/// Last day of the quarter containing `date`.
///
/// The range is inclusive: the whole final day belongs to the quarter.
pub fn quarter_end(date: NaiveDate) -> NaiveDate {
    next_quarter_start(date) - Days::new(1)
}

/// First day of the quarter immediately after the one containing `date`.
pub fn next_quarter_start(date: NaiveDate) -> NaiveDate {
    let label = quarter_label(date);
    if label.quarter == 4 {
        ymd(label.year + 1, 1, 1)
    } else {
        ymd(label.year, label.quarter as u32 * 3 + 1, 1)
    }
}

/// Total day count of the quarter containing `date` (90..92).
pub fn days_in_quarter(date: NaiveDate) -> i64 {
    (next_quarter_start(date) - quarter_start(date)).num_days()
}

/// The next `n` quarters starting at the quarter containing `from`.
///
/// Used by availability dashboards to render a fixed forward window.
pub fn next_quarters(from: NaiveDate, n: usize) -> Vec<QuarterWindow> {
    let mut windows = Vec::with_capacity(n);
    let mut cursor = quarter_start(from);
    for _ in 0..n {
        windows.push(QuarterWindow {
            label: quarter_label(cursor),
            range_start: cursor,
            range_end: quarter_end(cursor),
        });
        cursor = next_quarter_start(cursor);
    }
    windows
}

/// Walks forward from `start` for `total_days` calendar days, cutting a
/// new segment each time a quarter boundary is crossed.
///
/// Segment day counts sum exactly to `total_days` and segments are
/// contiguous. The building block for both pricing breakdowns and
/// quarter-coverage computation.
pub fn split_into_quarter_segments(
    start: NaiveDate,
    total_days: i64,
) -> Result<Vec<QuarterSegment>, CalendarError> {
    if total_days < 1 {
        return Err(CalendarError::InvalidDayCount(total_days));
    }

    let mut segments = Vec::new();
    let mut cursor = start;
    let mut remaining = total_days;

    while remaining > 0 {
        let q_end = quarter_end(cursor);
        let days_left_in_quarter = (q_end - cursor).num_days() + 1;
        let take = remaining.min(days_left_in_quarter);
        let seg_end = cursor + Days::new(take as u64 - 1);

        segments.push(QuarterSegment {
            label: quarter_label(cursor),
            seg_start: cursor,
            seg_end,
            day_count: take,
        });

        remaining -= take;
        cursor = seg_end + Days::new(1);
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_quarter_labels() {
        assert_eq!(quarter_label(date(2025, 1, 1)).to_string(), "Q1 2025");
        assert_eq!(quarter_label(date(2025, 3, 31)).to_string(), "Q1 2025");
        assert_eq!(quarter_label(date(2025, 4, 1)).to_string(), "Q2 2025");
        assert_eq!(quarter_label(date(2025, 9, 30)).to_string(), "Q3 2025");
        assert_eq!(quarter_label(date(2025, 12, 31)).to_string(), "Q4 2025");
    }

    #[test]
    fn test_label_round_trip() {
        let label: QuarterLabel = "Q3 2026".parse().unwrap();
        assert_eq!(label, QuarterLabel { year: 2026, quarter: 3 });
        assert_eq!(label.to_string(), "Q3 2026");

        assert!("Q5 2026".parse::<QuarterLabel>().is_err());
        assert!("2026 Q3".parse::<QuarterLabel>().is_err());

        let json = serde_json::to_string(&label).unwrap();
        assert_eq!(json, "\"Q3 2026\"");
        let back: QuarterLabel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, label);
    }

    #[test]
    fn test_label_ordering_is_chronological() {
        let q4_2024: QuarterLabel = "Q4 2024".parse().unwrap();
        let q1_2025: QuarterLabel = "Q1 2025".parse().unwrap();
        assert!(q4_2024 < q1_2025);
    }

    #[test]
    fn test_quarter_boundaries() {
        let d = date(2025, 2, 15);
        assert_eq!(quarter_start(d), date(2025, 1, 1));
        assert_eq!(quarter_end(d), date(2025, 3, 31));
        assert_eq!(next_quarter_start(d), date(2025, 4, 1));
        assert_eq!(days_in_quarter(d), 90);

        // Year rollover
        let d = date(2025, 11, 3);
        assert_eq!(next_quarter_start(d), date(2026, 1, 1));
        assert_eq!(quarter_end(d), date(2025, 12, 31));
        assert_eq!(days_in_quarter(d), 92);

        // Leap year Q1
        assert_eq!(days_in_quarter(date(2024, 2, 1)), 91);

        // Date always falls inside its own quarter
        for d in [date(2025, 1, 1), date(2025, 6, 15), date(2025, 12, 31)] {
            assert!(quarter_start(d) <= d && d <= quarter_end(d));
        }
    }

    #[test]
    fn test_next_quarters_window() {
        let windows = next_quarters(date(2025, 2, 15), 4);
        let labels: Vec<String> = windows.iter().map(|w| w.label.to_string()).collect();
        assert_eq!(labels, ["Q1 2025", "Q2 2025", "Q3 2025", "Q4 2025"]);
        assert_eq!(windows[0].range_start, date(2025, 1, 1));
        assert_eq!(windows[3].range_end, date(2025, 12, 31));
    }

    #[test]
    fn test_split_single_quarter() {
        // 90 days from a quarter boundary stays within Q2 2025 (91 days)
        let segments = split_into_quarter_segments(date(2025, 4, 1), 90).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].label.to_string(), "Q2 2025");
        assert_eq!(segments[0].seg_start, date(2025, 4, 1));
        assert_eq!(segments[0].seg_end, date(2025, 6, 29));
        assert_eq!(segments[0].day_count, 90);
    }

    #[test]
    fn test_split_crosses_boundaries() {
        let segments = split_into_quarter_segments(date(2025, 4, 1), 360).unwrap();
        assert_eq!(segments.len(), 4);

        let labels: Vec<String> = segments.iter().map(|s| s.label.to_string()).collect();
        assert_eq!(labels, ["Q2 2025", "Q3 2025", "Q4 2025", "Q1 2026"]);

        // Day counts sum exactly and segments are contiguous
        let total: i64 = segments.iter().map(|s| s.day_count).sum();
        assert_eq!(total, 360);
        for pair in segments.windows(2) {
            assert_eq!(pair[0].seg_end + Days::new(1), pair[1].seg_start);
        }

        // Each segment's label matches its own start date
        for seg in &segments {
            assert_eq!(seg.label, quarter_label(seg.seg_start));
            assert_eq!((seg.seg_end - seg.seg_start).num_days() + 1, seg.day_count);
        }
    }

    #[test]
    fn test_split_mid_quarter_start() {
        let segments = split_into_quarter_segments(date(2025, 2, 15), 45).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].seg_end, date(2025, 3, 31));

        let segments = split_into_quarter_segments(date(2025, 2, 15), 46).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].seg_start, date(2025, 4, 1));
        assert_eq!(segments[1].day_count, 1);
    }

    #[test]
    fn test_split_rejects_non_positive_days() {
        assert!(matches!(
            split_into_quarter_segments(date(2025, 1, 1), 0),
            Err(CalendarError::InvalidDayCount(0))
        ));
        assert!(split_into_quarter_segments(date(2025, 1, 1), -7).is_err());
    }
}
