use super::bucket::TimeBucket;
use super::interval::Interval;
use super::TimelineError;
use crate::query::{Filter, Operator};

/// Date filters only carry whole days, so hour buckets have no bound.
fn date_bound(bucket: &TimeBucket) -> Result<(), TimelineError> {
    match bucket.interval() {
        Interval::Hour => Err(TimelineError::HourBound(bucket.to_string())),
        _ => Ok(()),
    }
}

/// Narrows `filter` on `key` to the buckets from `first` through `last`.
pub fn select(
    filter: &Filter,
    key: &str,
    first: &TimeBucket,
    last: &TimeBucket,
) -> Result<Filter, TimelineError> {
    date_bound(first)?;
    date_bound(last)?;
    let start = first.start()?;
    let end = last.end()?;
    Ok(filter
        .clone()
        .set(key, Operator::Ge, start)
        .set(key, Operator::Lt, end))
}

/// Everything `filter` matches before `bucket`. Its count, divided by the page
/// size, is the gallery page the bucket starts on.
pub fn preceding(filter: &Filter, key: &str, bucket: &TimeBucket) -> Result<Filter, TimelineError> {
    date_bound(bucket)?;
    Ok(filter.clone().add(key, Operator::Lt, bucket.start()?))
}
