//! TickStore — the immutable tick sequence backing a set of simulation runs.

use chrono::{DateTime, Utc};

use crate::domain::Tick;

/// Read-only, random-access sequence of ticks, ordered by timestamp.
///
/// Created once before any simulation and borrowed by every downstream
/// component; nothing mutates it after construction.
#[derive(Debug, Clone)]
pub struct TickStore {
    ticks: Vec<Tick>,
}

impl TickStore {
    pub fn new(ticks: Vec<Tick>) -> Self {
        Self { ticks }
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Tick> {
        self.ticks.get(index)
    }

    pub fn first(&self) -> Option<&Tick> {
        self.ticks.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tick> {
        self.ticks.iter()
    }

    pub fn as_slice(&self) -> &[Tick] {
        &self.ticks
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.ticks.first().map(|tick| tick.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.ticks.last().map(|tick| tick.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TickFlag;
    use chrono::{Duration, Utc};

    #[test]
    fn timestamps_span_the_sequence() {
        let start = Utc::now();
        let ticks: Vec<Tick> = (0..5)
            .map(|i| {
                Tick::new(
                    start + Duration::seconds(i),
                    1.0,
                    1.0002,
                    1.0,
                    TickFlag::AskAndBid,
                )
            })
            .collect();

        let store = TickStore::new(ticks);
        assert_eq!(store.len(), 5);
        assert_eq!(store.first_timestamp(), Some(start));
        assert_eq!(store.last_timestamp(), Some(start + Duration::seconds(4)));
    }

    #[test]
    fn empty_store_has_no_timestamps() {
        let store = TickStore::new(Vec::new());
        assert!(store.is_empty());
        assert_eq!(store.first_timestamp(), None);
        assert_eq!(store.last_timestamp(), None);
    }
}
