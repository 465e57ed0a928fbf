use super::bucket::{Coord, TimeBucket};
use super::interval::Interval;
use crate::query::DateRange;
use std::collections::HashMap;

/// Expands sparse server counts into a dense run of buckets, inserting
/// [`NO_DATA`](super::NO_DATA) buckets for missing coordinates.
///
/// The run spans the raw buckets, or the range when both of its bounds are
/// set. Every month of every spanned year is emitted; for a single-year span
/// below month granularity the months are clipped to the span. Days always run
/// 1 to 31 unless the span sits in one month at hour granularity.
pub fn fill(raw: &[TimeBucket], interval: Interval, range: &DateRange) -> Vec<TimeBucket> {
    let positions = raw.iter().map(TimeBucket::position);
    let (Some(data_min), Some(data_max)) = (positions.clone().min(), positions.max()) else {
        return Vec::new();
    };

    let lookup: HashMap<Coord, &TimeBucket> = raw
        .iter()
        .map(|bucket| (bucket.position().truncate(interval), bucket))
        .collect();

    let (min, max) = match range.bounds() {
        Some((start, end)) => (Coord::from_datetime(start), Coord::from_datetime(end)),
        None => (data_min, data_max),
    };

    let same_year = min.year == max.year;
    let same_month = same_year && min.month == max.month;

    let mut filled = Vec::new();
    for year in min.year..=max.year {
        let months = if same_year && interval != Interval::Month {
            min.month..=max.month
        } else {
            1..=12
        };

        for month in months {
            if interval == Interval::Month {
                emit(&mut filled, &lookup, interval, Coord { year, month, day: 1, hour: 0 });
                continue;
            }

            let days = if same_month && interval == Interval::Hour {
                min.day..=max.day
            } else {
                1..=31
            };

            for day in days {
                if interval == Interval::Day {
                    emit(&mut filled, &lookup, interval, Coord { year, month, day, hour: 0 });
                    continue;
                }
                for hour in 0..24 {
                    emit(&mut filled, &lookup, interval, Coord { year, month, day, hour });
                }
            }
        }
    }

    tracing::debug!(raw = raw.len(), filled = filled.len(), %interval, "filled timeline");
    filled
}

fn emit(
    filled: &mut Vec<TimeBucket>,
    lookup: &HashMap<Coord, &TimeBucket>,
    interval: Interval,
    at: Coord,
) {
    let bucket = lookup
        .get(&at)
        .map_or_else(|| TimeBucket::gap(at, interval), |bucket| **bucket);
    filled.push(bucket);
}
