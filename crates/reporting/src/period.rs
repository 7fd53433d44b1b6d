//! Period window arithmetic and the change calculator every aggregator
//! leans on.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A `[start, end]` instant range over which records are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl PeriodWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Inclusive containment on both ends.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}

/// Derive the symmetric previous window: identical duration, ending
/// exactly 1ms before the current window begins.
pub fn previous_period(window: &PeriodWindow) -> PeriodWindow {
    let previous_end = window.start - Duration::milliseconds(1);
    let previous_start = previous_end - window.duration();
    PeriodWindow::new(previous_start, previous_end)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

/// Period-over-period delta. The magnitude is always reported as an
/// absolute value; direction is carried only in `trend`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub percentage: f64,
    pub trend: Trend,
}

pub fn calculate_change(current: f64, previous: f64) -> Change {
    if previous == 0.0 {
        return if current > 0.0 {
            Change {
                percentage: 100.0,
                trend: Trend::Up,
            }
        } else {
            Change {
                percentage: 0.0,
                trend: Trend::Neutral,
            }
        };
    }

    let signed = (current - previous) / previous * 100.0;
    let trend = if signed > 0.0 {
        Trend::Up
    } else if signed < 0.0 {
        Trend::Down
    } else {
        Trend::Neutral
    };

    Change {
        percentage: signed.abs(),
        trend,
    }
}

/// In-memory date post-filter for collections whose backend query could
/// not express the range predicate. Documents without the date field are
/// dropped.
pub fn filter_by_date_range<T, F>(documents: &[T], window: &PeriodWindow, date_of: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> Option<DateTime<Utc>>,
{
    documents
        .iter()
        .filter(|doc| date_of(doc).map_or(false, |t| window.contains(t)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn instant(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_previous_period_duration_and_gap() {
        let window = PeriodWindow::new(
            instant("2026-08-01T00:00:00Z"),
            instant("2026-08-31T00:00:00Z"),
        );
        let previous = previous_period(&window);

        assert_eq!(previous.duration(), window.duration());
        assert_eq!(window.start - previous.end, Duration::milliseconds(1));
    }

    #[test]
    fn test_previous_period_zero_length_window() {
        let at = Utc.with_ymd_and_hms(2026, 8, 23, 12, 0, 0).unwrap();
        let window = PeriodWindow::new(at, at);
        let previous = previous_period(&window);

        assert_eq!(previous.start, previous.end);
        assert_eq!(previous.end, at - Duration::milliseconds(1));
    }

    #[test]
    fn test_change_from_zero_previous() {
        let change = calculate_change(5.0, 0.0);
        assert_eq!(change.percentage, 100.0);
        assert_eq!(change.trend, Trend::Up);

        let flat = calculate_change(0.0, 0.0);
        assert_eq!(flat.percentage, 0.0);
        assert_eq!(flat.trend, Trend::Neutral);
    }

    #[test]
    fn test_change_equal_values_is_neutral() {
        let change = calculate_change(42.0, 42.0);
        assert_eq!(change.percentage, 0.0);
        assert_eq!(change.trend, Trend::Neutral);
    }

    #[test]
    fn test_change_magnitude_is_absolute_with_trend_carrying_sign() {
        let down = calculate_change(50.0, 100.0);
        assert_eq!(down.percentage, 50.0);
        assert_eq!(down.trend, Trend::Down);

        let up = calculate_change(150.0, 100.0);
        assert_eq!(up.percentage, 50.0);
        assert_eq!(up.trend, Trend::Up);
    }

    #[test]
    fn test_date_filter_is_inclusive_and_drops_undated() {
        let window = PeriodWindow::new(
            instant("2026-08-01T00:00:00Z"),
            instant("2026-08-31T00:00:00Z"),
        );
        let docs = vec![
            Some(instant("2026-08-01T00:00:00Z")),
            Some(instant("2026-08-31T00:00:00Z")),
            Some(instant("2026-07-31T23:59:59Z")),
            None,
        ];

        let kept = filter_by_date_range(&docs, &window, |d| *d);
        assert_eq!(kept.len(), 2);
    }
}
