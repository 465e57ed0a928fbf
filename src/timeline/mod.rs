pub mod bucket;
pub mod fill;
pub mod interval;
pub mod locate;
pub mod request;
pub mod select;

use chrono::NaiveDateTime;
use thiserror::Error;

pub use bucket::{BucketRecord, TimeBucket, NO_DATA};
pub use fill::fill;
pub use interval::{Interval, Zoom, MAX_BUCKETS};
pub use locate::locate;
pub use request::{BucketRequest, Timeline};
pub use select::{preceding, select};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    /// Expected while buckets for a newer filter are still on their way.
    #[error("no bucket between {start} and {end}, data not loaded yet")]
    NotLoaded {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("bucket {0} is not a calendar date")]
    ImpossibleDate(String),

    #[error("cannot filter on hour bucket {0}, the media endpoint compares whole dates")]
    HourBound(String),

    #[error("invalid interval label '{0}'")]
    InvalidLabel(String),

    #[error("unknown interval '{0}', expected month, day or hour")]
    UnknownInterval(String),
}
