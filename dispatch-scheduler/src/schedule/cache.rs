//! Caching layer for solved departure offsets.
//!
//! Solving a window is expensive and many windows of a day share the same
//! trips-per-hour combination, so results are memoized per graph. The key is
//! the working set as a sorted `(pattern, tph)` list; patterns with zero tph
//! are not part of it.

use std::collections::BTreeMap;
use std::sync::Arc;

use moka::sync::Cache as MokaCache;

use crate::domain::PatternId;
use crate::optimize::OptimizedTimetable;

/// Cache key: sorted `(pattern, tph)` pairs.
pub type OffsetKey = Vec<(PatternId, u32)>;

/// Cached timetable entry.
type OffsetEntry = Arc<OptimizedTimetable>;

/// Build the cache key for a trips map.
pub fn offset_key(trips: &BTreeMap<PatternId, u32>) -> OffsetKey {
    trips
        .iter()
        .filter(|(_, tph)| **tph > 0)
        .map(|(id, tph)| (id.clone(), *tph))
        .collect()
}

/// Memoized departure offsets for one scheduling graph.
pub struct DepartureOffsetCache {
    entries: MokaCache<OffsetKey, OffsetEntry>,
}

impl DepartureOffsetCache {
    /// Create a cache holding at most `max_capacity` timetables.
    pub fn new(max_capacity: u64) -> Self {
        let entries = MokaCache::builder().max_capacity(max_capacity).build();
        Self { entries }
    }

    pub fn get(&self, trips: &BTreeMap<PatternId, u32>) -> Option<OffsetEntry> {
        self.entries.get(&offset_key(trips))
    }

    pub fn insert(&self, trips: &BTreeMap<PatternId, u32>, entry: OffsetEntry) {
        self.entries.insert(offset_key(trips), entry);
    }

    /// Return the cached entry, or compute, cache and return it.
    ///
    /// Failures are not cached.
    pub fn get_or_try_insert<E>(
        &self,
        trips: &BTreeMap<PatternId, u32>,
        compute: impl FnOnce() -> Result<OptimizedTimetable, E>,
    ) -> Result<OffsetEntry, E> {
        if let Some(cached) = self.get(trips) {
            return Ok(cached);
        }
        let entry = Arc::new(compute()?);
        self.insert(trips, entry.clone());
        Ok(entry)
    }

    /// Get cache statistics (for monitoring).
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }
}

impl std::fmt::Debug for DepartureOffsetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DepartureOffsetCache")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}
