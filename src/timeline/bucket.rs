use super::interval::Interval;
use super::TimelineError;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Count of a gap-filled bucket the server returned nothing for.
pub const NO_DATA: i64 = -1;

/// A count for one month, day or hour. The shape follows which optional
/// fields are present, matching the server's rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBucket {
    pub year: i32,
    pub month: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,
    pub count: i64,
}

/// Either a bucket with explicit fields or a server row carrying an interval
/// label such as `2024-01-05 13`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BucketRecord {
    Fields(TimeBucket),
    Label { interval: String, count: i64 },
}

impl BucketRecord {
    pub fn into_bucket(self) -> Result<TimeBucket, TimelineError> {
        match self {
            BucketRecord::Fields(bucket) => Ok(bucket),
            BucketRecord::Label { interval, count } => TimeBucket::from_label(&interval, count),
        }
    }
}

/// Calendar position used for lookups and ordering. Missing fields default to
/// day 1, hour 0. Impossible dates like February 30 still order correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Coord {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
}

impl Coord {
    pub fn from_datetime(ts: NaiveDateTime) -> Coord {
        Coord {
            year: ts.year(),
            month: ts.month(),
            day: ts.day(),
            hour: ts.hour(),
        }
    }

    pub fn truncate(self, interval: Interval) -> Coord {
        match interval {
            Interval::Month => Coord {
                day: 1,
                hour: 0,
                ..self
            },
            Interval::Day => Coord { hour: 0, ..self },
            Interval::Hour => self,
        }
    }
}

impl TimeBucket {
    pub fn month(year: i32, month: u32, count: i64) -> Self {
        Self {
            year,
            month,
            day: None,
            hour: None,
            count,
        }
    }

    pub fn day(year: i32, month: u32, day: u32, count: i64) -> Self {
        Self {
            day: Some(day),
            ..Self::month(year, month, count)
        }
    }

    pub fn hour(year: i32, month: u32, day: u32, hour: u32, count: i64) -> Self {
        Self {
            hour: Some(hour),
            ..Self::day(year, month, day, count)
        }
    }

    pub(crate) fn gap(at: Coord, interval: Interval) -> Self {
        match interval {
            Interval::Month => Self::month(at.year, at.month, NO_DATA),
            Interval::Day => Self::day(at.year, at.month, at.day, NO_DATA),
            Interval::Hour => Self::hour(at.year, at.month, at.day, at.hour, NO_DATA),
        }
    }

    /// Parses `2024-01`, `2024-01-05` or `2024-01-05 13`.
    pub fn from_label(label: &str, count: i64) -> Result<Self, TimelineError> {
        let invalid = || TimelineError::InvalidLabel(label.to_string());

        let (date, hour) = match label.split_once(' ') {
            Some((date, hour)) => (date, Some(hour.parse::<u32>().map_err(|_| invalid())?)),
            None => (label, None),
        };

        let parts: Vec<&str> = date.split('-').collect();
        let (year, month, day) = match parts.as_slice() {
            [y, m] => (y, m, None),
            [y, m, d] => (y, m, Some(d.parse::<u32>().map_err(|_| invalid())?)),
            _ => return Err(invalid()),
        };
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;

        match (day, hour) {
            (None, None) => Ok(Self::month(year, month, count)),
            (Some(day), None) => Ok(Self::day(year, month, day, count)),
            (Some(day), Some(hour)) => Ok(Self::hour(year, month, day, hour, count)),
            (None, Some(_)) => Err(invalid()),
        }
    }

    pub fn is_gap(&self) -> bool {
        self.count == NO_DATA
    }

    /// Granularity implied by which fields are present.
    pub fn interval(&self) -> Interval {
        match (self.day, self.hour) {
            (_, Some(_)) => Interval::Hour,
            (Some(_), None) => Interval::Day,
            (None, None) => Interval::Month,
        }
    }

    pub(crate) fn position(&self) -> Coord {
        Coord {
            year: self.year,
            month: self.month,
            day: self.day.unwrap_or(1),
            hour: self.hour.unwrap_or(0),
        }
    }

    /// First instant covered by the bucket.
    pub fn start(&self) -> Result<NaiveDateTime, TimelineError> {
        let at = self.position();
        NaiveDate::from_ymd_opt(at.year, at.month, at.day)
            .and_then(|date| date.and_hms_opt(at.hour, 0, 0))
            .ok_or_else(|| TimelineError::ImpossibleDate(self.to_string()))
    }

    /// First instant after the bucket.
    pub fn end(&self) -> Result<NaiveDateTime, TimelineError> {
        let start = self.start()?;
        match self.interval() {
            Interval::Hour => Ok(start + Duration::hours(1)),
            Interval::Day => Ok(start + Duration::days(1)),
            Interval::Month => {
                let (year, month) = match self.month {
                    12 => (self.year + 1, 1),
                    month => (self.year, month + 1),
                };
                NaiveDate::from_ymd_opt(year, month, 1)
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .ok_or_else(|| TimelineError::ImpossibleDate(self.to_string()))
            }
        }
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)?;
        if let Some(day) = self.day {
            write!(f, "-{:02}", day)?;
        }
        if let Some(hour) = self.hour {
            write!(f, " {:02}", hour)?;
        }
        Ok(())
    }
}
