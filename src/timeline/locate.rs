use super::bucket::{Coord, TimeBucket};
use super::interval::Interval;
use super::TimelineError;
use chrono::NaiveDateTime;

/// Index range of the buckets covering `start..=end` once both ends are
/// truncated to `interval`.
///
/// Fails with [`TimelineError::NotLoaded`] when no bucket falls inside, which
/// usually means the buckets predate the current filter.
pub fn locate(
    start: NaiveDateTime,
    end: NaiveDateTime,
    interval: Interval,
    buckets: &[TimeBucket],
) -> Result<(usize, usize), TimelineError> {
    let from = Coord::from_datetime(start).truncate(interval);
    let to = Coord::from_datetime(end).truncate(interval);

    // Buckets are few and already ordered; a linear scan is enough.
    let mut first = None;
    let mut last = None;
    for (index, bucket) in buckets.iter().enumerate() {
        let at = bucket.position();
        if first.is_none() && at >= from {
            first = Some(index);
        }
        if at <= to {
            last = Some(index);
        }
    }

    match (first, last) {
        (Some(first), Some(last)) if first <= last => Ok((first, last)),
        _ => Err(TimelineError::NotLoaded { start, end }),
    }
}
