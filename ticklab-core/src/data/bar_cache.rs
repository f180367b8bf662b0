//! Bar derivation and the per-timeframe bar cache.
//!
//! Bars are always derived from ticks, lazily, once per timeframe. The
//! cache may be shared by many concurrent simulation runs: lookups take a
//! shared lock, the first build of a timeframe takes the exclusive lock
//! and double-checks before inserting.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::data::TickStore;
use crate::domain::{Bar, Tick, Timeframe};

/// Derive the bar series for a timeframe from a tick sequence.
///
/// The first tick opens a bar; each later tick either folds into the
/// current bar or, once at least the timeframe duration has elapsed since
/// the bar opened, closes it and opens the next. The final open bar is
/// always emitted. Empty input yields an empty series.
pub fn calculate_bars(timeframe: Timeframe, ticks: &[Tick]) -> Vec<Bar> {
    let mut bars = Vec::new();
    let Some((first, rest)) = ticks.split_first() else {
        return bars;
    };

    let duration = timeframe.duration();
    let mut bar = Bar::open_from(first);
    for tick in rest {
        if tick.timestamp - bar.open_timestamp >= duration {
            bars.push(bar);
            bar = Bar::open_from(tick);
        } else {
            bar.fold(tick);
        }
    }

    bars.push(bar);
    bars
}

/// Read-only window into a cached bar series.
///
/// Holds a reference-counted handle to the whole series, so the view stays
/// valid after the cache lock is released and is cheap to clone.
#[derive(Debug, Clone)]
pub struct BarsView {
    series: Arc<Vec<Bar>>,
    start: usize,
    end: usize,
}

impl BarsView {
    pub fn as_slice(&self) -> &[Bar] {
        &self.series[self.start..self.end]
    }
}

impl Deref for BarsView {
    type Target = [Bar];

    fn deref(&self) -> &[Bar] {
        self.as_slice()
    }
}

/// Lazily derives and caches bar series per timeframe, serving range
/// queries against the shared tick store.
pub struct BarCache<'a> {
    ticks: &'a TickStore,
    series: RwLock<HashMap<Timeframe, Arc<Vec<Bar>>>>,
}

impl<'a> BarCache<'a> {
    pub fn new(ticks: &'a TickStore) -> Self {
        Self { ticks, series: RwLock::new(HashMap::new()) }
    }

    /// The last `count` bars whose `open_timestamp` is at or before
    /// `before`, in chronological order.
    ///
    /// Absent when `before` falls outside `(first_tick_time,
    /// last_tick_time]` or fewer than `count` qualifying bars exist. A bar
    /// whose interval straddles `before` is included if it opened at or
    /// before `before`.
    pub fn last_bars_before(
        &self,
        timeframe: Timeframe,
        before: DateTime<Utc>,
        count: usize,
    ) -> Option<BarsView> {
        let first_tick_time = self.ticks.first_timestamp()?;
        let last_tick_time = self.ticks.last_timestamp()?;
        if before <= first_tick_time || before > last_tick_time {
            return None;
        }

        let series = self.series_for(timeframe);

        // Index one past the last bar opening at or before `before`; a
        // strictly later open terminates the scan. At least one bar
        // qualifies because bars[0] opens at the first tick.
        let cut = series.partition_point(|bar| bar.open_timestamp <= before);
        let start = cut.checked_sub(count)?;

        Some(BarsView { series, start, end: cut })
    }

    /// Get or build the bar series for a timeframe.
    fn series_for(&self, timeframe: Timeframe) -> Arc<Vec<Bar>> {
        if let Some(series) = self
            .series
            .read()
            .expect("bar cache lock poisoned")
            .get(&timeframe)
        {
            return Arc::clone(series);
        }

        let mut cache = self.series.write().expect("bar cache lock poisoned");
        // Another run may have built the series while we waited.
        if let Some(series) = cache.get(&timeframe) {
            return Arc::clone(series);
        }

        let built = Arc::new(calculate_bars(timeframe, self.ticks.as_slice()));
        debug!(?timeframe, bars = built.len(), "derived bar series");
        cache.insert(timeframe, Arc::clone(&built));
        built
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TickFlag;
    use chrono::{Duration, TimeZone, Utc};

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
    }

    /// 20 ticks at 30-second spacing, all at (bid=1.0, ask=2.0).
    fn spaced_ticks() -> Vec<Tick> {
        (0..20)
            .map(|i| {
                Tick::new(
                    base_time() + Duration::seconds(30 * i),
                    1.0,
                    2.0,
                    1.0,
                    TickFlag::AskAndBid,
                )
            })
            .collect()
    }

    // ── calculate_bars ─────────────────────────────────────────────────

    #[test]
    fn empty_ticks_yield_empty_bars() {
        assert!(calculate_bars(Timeframe::Min1, &[]).is_empty());
    }

    #[test]
    fn thirty_second_ticks_bucket_into_minutes() {
        let ticks = spaced_ticks();
        assert_eq!(calculate_bars(Timeframe::Min1, &ticks).len(), 10);
        assert_eq!(calculate_bars(Timeframe::Min5, &ticks).len(), 2);
        assert_eq!(calculate_bars(Timeframe::Min15, &ticks).len(), 1);
    }

    #[test]
    fn bars_count_their_ticks() {
        let ticks = spaced_ticks();
        let bars = calculate_bars(Timeframe::Min1, &ticks);
        // 2 ticks per minute bucket.
        assert!(bars.iter().all(|bar| bar.tick_volume == 2));
        assert_eq!(
            bars.iter().map(|bar| bar.tick_volume).sum::<u64>(),
            ticks.len() as u64
        );
    }

    #[test]
    fn bar_buckets_are_disjoint_and_ordered() {
        let ticks = spaced_ticks();
        let bars = calculate_bars(Timeframe::Min5, &ticks);
        for pair in bars.windows(2) {
            assert!(
                pair[1].open_timestamp - pair[0].open_timestamp
                    >= Timeframe::Min5.duration()
            );
        }
    }

    #[test]
    fn single_tick_yields_single_bar() {
        let ticks = spaced_ticks();
        let bars = calculate_bars(Timeframe::Min1, &ticks[..1]);
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].open, 1.0);
        assert_eq!(bars[0].tick_volume, 1);
    }

    // ── BarCache window queries ────────────────────────────────────────

    #[test]
    fn window_before_first_tick_is_absent() {
        let store = TickStore::new(spaced_ticks());
        let cache = BarCache::new(&store);
        assert!(cache
            .last_bars_before(Timeframe::Min1, base_time(), 1)
            .is_none());
        assert!(cache
            .last_bars_before(Timeframe::Min1, base_time() - Duration::seconds(1), 1)
            .is_none());
    }

    #[test]
    fn window_after_last_tick_is_absent() {
        let store = TickStore::new(spaced_ticks());
        let cache = BarCache::new(&store);
        let after_last = base_time() + Duration::seconds(30 * 19 + 1);
        assert!(cache
            .last_bars_before(Timeframe::Min1, after_last, 1)
            .is_none());
    }

    #[test]
    fn window_with_too_few_bars_is_absent() {
        let store = TickStore::new(spaced_ticks());
        let cache = BarCache::new(&store);
        // Two minutes in, only two Min1 bars have opened.
        let before = base_time() + Duration::seconds(90);
        assert!(cache
            .last_bars_before(Timeframe::Min1, before, 3)
            .is_none());
        assert!(cache
            .last_bars_before(Timeframe::Min1, before, 2)
            .is_some());
    }

    #[test]
    fn window_ends_at_latest_qualifying_bar() {
        let store = TickStore::new(spaced_ticks());
        let cache = BarCache::new(&store);

        // Five minutes in: Min1 bars opened at 0,1,2,3,4,5 minutes; the
        // five-minute bar itself opened exactly at `before` and counts.
        let before = base_time() + Duration::minutes(5);
        let view = cache
            .last_bars_before(Timeframe::Min1, before, 3)
            .expect("window available");
        assert_eq!(view.len(), 3);
        assert_eq!(
            view.as_slice().last().unwrap().open_timestamp,
            base_time() + Duration::minutes(5)
        );
    }

    #[test]
    fn straddling_bar_is_included_by_open_timestamp() {
        let store = TickStore::new(spaced_ticks());
        let cache = BarCache::new(&store);

        // 30 seconds into the second minute bar: that bar opened before
        // `before`, so it terminates the window even though its interval
        // extends past it.
        let before = base_time() + Duration::seconds(90);
        let view = cache
            .last_bars_before(Timeframe::Min1, before, 1)
            .expect("window available");
        assert_eq!(
            view[0].open_timestamp,
            base_time() + Duration::minutes(1)
        );
    }

    #[test]
    fn series_is_built_once_and_shared() {
        let store = TickStore::new(spaced_ticks());
        let cache = BarCache::new(&store);
        let before = base_time() + Duration::minutes(5);

        let first = cache
            .last_bars_before(Timeframe::Min1, before, 1)
            .expect("window available");
        let second = cache
            .last_bars_before(Timeframe::Min1, before, 1)
            .expect("window available");
        assert!(Arc::ptr_eq(&first.series, &second.series));
    }

    #[test]
    fn empty_store_serves_nothing() {
        let store = TickStore::new(Vec::new());
        let cache = BarCache::new(&store);
        assert!(cache
            .last_bars_before(Timeframe::Min1, base_time(), 1)
            .is_none());
    }
}
