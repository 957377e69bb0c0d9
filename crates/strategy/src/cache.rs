//! Interval-based refresh cache.
//!
//! Holds a single value plus its fetch time, re-running the fetch closure
//! only when the value is older than the caller's interval. The clock is
//! passed in so freshness can be tested without sleeping.

use chrono::{DateTime, Duration, Utc};
use std::future::Future;

#[derive(Debug, Default)]
pub struct RefreshCache<T> {
    value: Option<T>,
    fetched_at: Option<DateTime<Utc>>,
}

impl<T: Clone> RefreshCache<T> {
    pub fn new() -> Self {
        Self {
            value: None,
            fetched_at: None,
        }
    }

    /// Return the cached value if fetched within `interval`, otherwise run
    /// `fetch` and cache its result.
    ///
    /// Whatever `fetch` returns is stored wholesale, including empty or
    /// degenerate results, and is served until the next expiry.
    pub async fn get_or_refresh<F, Fut>(
        &mut self,
        interval: Duration,
        now: DateTime<Utc>,
        fetch: F,
    ) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if let (Some(value), Some(fetched_at)) = (self.value.as_ref(), self.fetched_at) {
            if now - fetched_at < interval {
                return value.clone();
            }
        }

        let value = fetch().await;
        self.value = Some(value.clone());
        self.fetched_at = Some(now);
        value
    }
}
