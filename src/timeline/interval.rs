use super::TimelineError;
use crate::query::DateRange;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Most buckets a zoom change may produce.
pub const MAX_BUCKETS: i32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Month,
    Day,
    Hour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zoom {
    /// Towards `Hour`.
    In,
    /// Towards `Month`.
    Out,
}

impl Interval {
    /// Picks hours for spans up to five days, days up to four 30-day months,
    /// and months otherwise or when either bound is open.
    pub fn for_range(range: &DateRange) -> Interval {
        let interval = match range.span() {
            None => Interval::Month,
            Some(span) if span <= Duration::days(5) => Interval::Hour,
            Some(span) if span <= Duration::days(4 * 30) => Interval::Day,
            Some(_) => Interval::Month,
        };
        tracing::debug!(?range, ?interval, "chose timeline interval");
        interval
    }

    pub fn step(self, zoom: Zoom) -> Option<Interval> {
        match (self, zoom) {
            (Interval::Month, Zoom::In) => Some(Interval::Day),
            (Interval::Day, Zoom::In) => Some(Interval::Hour),
            (Interval::Day, Zoom::Out) => Some(Interval::Month),
            (Interval::Hour, Zoom::Out) => Some(Interval::Day),
            (Interval::Month, Zoom::Out) | (Interval::Hour, Zoom::In) => None,
        }
    }

    /// Nominal bucket width; months count as 30 days.
    pub fn unit(self) -> Duration {
        match self {
            Interval::Month => Duration::days(30),
            Interval::Day => Duration::days(1),
            Interval::Hour => Duration::hours(1),
        }
    }

    /// Whether bucketing `range` at this interval stays under [`MAX_BUCKETS`].
    /// Open ranges are only safe by month.
    pub fn is_safe_for(self, range: &DateRange) -> bool {
        match range.span() {
            None => self == Interval::Month,
            Some(span) => span <= self.unit() * MAX_BUCKETS,
        }
    }

    pub fn can_change(self, zoom: Zoom, range: &DateRange) -> bool {
        self.step(zoom)
            .is_some_and(|target| target.is_safe_for(range))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Month => "month",
            Interval::Day => "day",
            Interval::Hour => "hour",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = TimelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "month" => Ok(Interval::Month),
            "day" => Ok(Interval::Day),
            "hour" => Ok(Interval::Hour),
            _ => Err(TimelineError::UnknownInterval(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn range(span: Duration) -> DateRange {
        DateRange::new(start(), start() + span)
    }

    #[test]
    fn test_open_range_is_month() {
        assert_eq!(Interval::for_range(&DateRange::default()), Interval::Month);
        let half_open = DateRange {
            start: Some(start()),
            end: None,
        };
        assert_eq!(Interval::for_range(&half_open), Interval::Month);
    }

    #[test]
    fn test_hour_boundary() {
        assert_eq!(Interval::for_range(&range(Duration::days(5))), Interval::Hour);
        assert_eq!(
            Interval::for_range(&range(Duration::days(5) + Duration::seconds(1))),
            Interval::Day
        );
    }

    #[test]
    fn test_day_boundary() {
        assert_eq!(Interval::for_range(&range(Duration::days(120))), Interval::Day);
        assert_eq!(
            Interval::for_range(&range(Duration::days(120) + Duration::seconds(1))),
            Interval::Month
        );
    }

    #[test]
    fn test_step_limits() {
        assert_eq!(Interval::Month.step(Zoom::Out), None);
        assert_eq!(Interval::Hour.step(Zoom::In), None);
        assert_eq!(Interval::Month.step(Zoom::In), Some(Interval::Day));
        assert_eq!(Interval::Hour.step(Zoom::Out), Some(Interval::Day));
    }

    #[test]
    fn test_two_year_zoom() {
        let two_years = range(Duration::days(731));
        assert!(Interval::Month.can_change(Zoom::In, &two_years));
        assert!(!Interval::Day.can_change(Zoom::In, &two_years));
        assert!(Interval::Day.can_change(Zoom::Out, &two_years));

        let three_years = range(Duration::days(3 * 365));
        assert!(!Interval::Month.can_change(Zoom::In, &three_years));
    }

    #[test]
    fn test_open_range_only_month_safe() {
        let open = DateRange::default();
        assert!(!Interval::Month.can_change(Zoom::In, &open));
        assert!(Interval::Day.can_change(Zoom::Out, &open));
        assert!(!Interval::Month.can_change(Zoom::Out, &open));
    }

    #[test]
    fn test_hour_ceiling() {
        assert!(Interval::Day.can_change(Zoom::In, &range(Duration::hours(1000))));
        assert!(!Interval::Day.can_change(Zoom::In, &range(Duration::hours(1001))));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("Day".parse::<Interval>().unwrap(), Interval::Day);
        assert!("week".parse::<Interval>().is_err());
    }
}
