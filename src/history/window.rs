//! Time windows for revision history queries

use crate::models::YearMonth;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Half-open time range: `start` inclusive, `end` exclusive.
///
/// Either bound may be absent, meaning unrestricted on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// No restriction at all.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Everything from `days` days before `now` onwards.
    pub fn past_days(days: u32, now: DateTime<Utc>) -> Self {
        Self {
            start: Some(now - Duration::days(i64::from(days))),
            end: None,
        }
    }

    /// `[first instant of month, first instant of next month)`
    pub fn month(month: YearMonth) -> Self {
        Self::between(month.first_instant(), month.end_instant())
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| instant >= s) && self.end.map_or(true, |e| instant < e)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Months from `start` to `end`, both inclusive. Empty when `start > end`.
pub fn months_between(start: YearMonth, end: YearMonth) -> Vec<YearMonth> {
    let mut months = Vec::new();
    let mut current = Some(start);
    while let Some(month) = current.filter(|m| *m <= end) {
        months.push(month);
        current = month.next();
    }
    months
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    #[test]
    fn test_month_window_is_half_open() {
        let window = TimeWindow::month(ym("2021-10"));
        assert!(window.contains(Utc.with_ymd_and_hms(2021, 10, 1, 0, 0, 0).unwrap()));
        assert!(window.contains(Utc.with_ymd_and_hms(2021, 10, 31, 23, 59, 59).unwrap()));
        assert!(!window.contains(Utc.with_ymd_and_hms(2021, 11, 1, 0, 0, 0).unwrap()));
        assert!(!window.contains(Utc.with_ymd_and_hms(2021, 9, 30, 23, 59, 59).unwrap()));
    }

    #[test]
    fn test_months_between_spans_year_boundary() {
        let months = months_between(ym("2021-11"), ym("2022-02"));
        let rendered: Vec<String> = months.iter().map(|m| m.to_string()).collect();
        assert_eq!(rendered, vec!["2021-11", "2021-12", "2022-01", "2022-02"]);
        assert!(months_between(ym("2022-02"), ym("2021-11")).is_empty());
        assert_eq!(months_between(ym("2021-10"), ym("2021-10")).len(), 1);
    }

    #[test]
    fn test_months_between_stops_at_last_supported_month() {
        let months = months_between(ym("9999-11"), ym("9999-12"));
        assert_eq!(months, vec![ym("9999-11"), ym("9999-12")]);
        let window = TimeWindow::month(ym("9999-12"));
        assert_eq!(window.end, Some(Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_past_days() {
        let now = Utc.with_ymd_and_hms(2021, 10, 10, 0, 0, 0).unwrap();
        let window = TimeWindow::past_days(3, now);
        assert!(window.contains(Utc.with_ymd_and_hms(2021, 10, 7, 0, 0, 0).unwrap()));
        assert!(!window.contains(Utc.with_ymd_and_hms(2021, 10, 6, 23, 0, 0).unwrap()));
        assert!(window.contains(now));
        assert!(TimeWindow::unbounded().is_unbounded());
    }
}
