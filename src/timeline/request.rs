use super::bucket::TimeBucket;
use super::fill::fill;
use super::interval::Interval;
use super::locate::locate;
use super::TimelineError;
use crate::query::Filter;
use chrono::NaiveDateTime;

/// A bucket fetch for one filter at one interval. Only the latest request a
/// [`Timeline`] handed out may update it.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketRequest {
    generation: u64,
    filter: Filter,
    interval: Interval,
}

impl BucketRequest {
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Filter text to send along with the interval.
    pub fn query_text(&self) -> String {
        self.filter.to_string()
    }
}

/// Display state of a timeline: the request in flight and the last buckets
/// applied.
#[derive(Debug)]
pub struct Timeline {
    date_key: String,
    generation: u64,
    active: Option<BucketRequest>,
    shown: Option<Shown>,
}

#[derive(Debug)]
struct Shown {
    generation: u64,
    interval: Interval,
    buckets: Vec<TimeBucket>,
}

impl Timeline {
    pub fn new(date_key: impl Into<String>) -> Self {
        Self {
            date_key: date_key.into(),
            generation: 0,
            active: None,
            shown: None,
        }
    }

    pub fn date_key(&self) -> &str {
        &self.date_key
    }

    /// Supersedes any outstanding request. Asking again for the active
    /// filter and interval hands back the same request.
    pub fn request(&mut self, filter: &Filter, interval: Interval) -> BucketRequest {
        if let Some(active) = &self.active {
            if active.interval == interval && &active.filter == filter {
                return active.clone();
            }
        }

        self.generation += 1;
        let request = BucketRequest {
            generation: self.generation,
            filter: filter.clone(),
            interval,
        };
        tracing::debug!(generation = request.generation, %interval, filter = %filter, "timeline request");
        self.active = Some(request.clone());
        request
    }

    /// Requests at the interval the filter's own date range calls for.
    pub fn request_for(&mut self, filter: &Filter) -> BucketRequest {
        let interval = Interval::for_range(&filter.date_range(&self.date_key));
        self.request(filter, interval)
    }

    /// Fills and shows `raw` if `request` is still the active one. Stale
    /// responses are dropped and `false` is returned.
    pub fn apply(&mut self, request: &BucketRequest, raw: &[TimeBucket]) -> bool {
        let is_active = self
            .active
            .as_ref()
            .is_some_and(|active| active.generation == request.generation);
        if !is_active {
            tracing::debug!(generation = request.generation, "dropping stale timeline response");
            return false;
        }

        let range = request.filter.date_range(&self.date_key);
        let buckets = fill(raw, request.interval, &range);
        self.shown = Some(Shown {
            generation: request.generation,
            interval: request.interval,
            buckets,
        });
        true
    }

    pub fn buckets(&self) -> &[TimeBucket] {
        self.shown
            .as_ref()
            .map(|shown| shown.buckets.as_slice())
            .unwrap_or_default()
    }

    /// Interval of the buckets on display, which lags the active request
    /// until its response is applied.
    pub fn interval(&self) -> Option<Interval> {
        self.shown.as_ref().map(|shown| shown.interval)
    }

    /// Whether the active request has not been applied yet.
    pub fn is_pending(&self) -> bool {
        let shown = self.shown.as_ref().map(|shown| shown.generation);
        self.active
            .as_ref()
            .is_some_and(|active| Some(active.generation) != shown)
    }

    /// Indices of the shown buckets covering `start..=end`.
    pub fn locate(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<(usize, usize), TimelineError> {
        let interval = self.interval().unwrap_or(Interval::Month);
        locate(start, end, interval, self.buckets())
    }
}
