use crate::models::{GeoPoint, TransitMode, TravelTime};
use std::collections::HashMap;

/// Memoization key for one travel-time lookup
///
/// Coordinates are rounded to a fixed number of decimal places so that
/// candidates a few meters apart share an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey {
    origin: (i64, i64),
    destination: (i64, i64),
    mode: TransitMode,
}

impl CacheKey {
    pub fn new(origin: GeoPoint, destination: GeoPoint, mode: TransitMode, precision: u32) -> Self {
        Self {
            origin: round_point(origin, precision),
            destination: round_point(destination, precision),
            mode,
        }
    }
}

#[inline]
fn round_point(point: GeoPoint, precision: u32) -> (i64, i64) {
    let scale = 10f64.powi(precision as i32);
    ((point.lat * scale).round() as i64, (point.lng * scale).round() as i64)
}

/// Travel-time cache scoped to a single optimization run
///
/// Owned by one oracle and dropped with it; nothing is shared between
/// runs, so no locking is needed.
#[derive(Debug, Default)]
pub struct TravelTimeCache {
    entries: HashMap<CacheKey, TravelTime>,
    hits: u64,
    misses: u64,
}

impl TravelTimeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key, counting the hit or miss
    pub fn get(&mut self, key: &CacheKey) -> Option<TravelTime> {
        match self.entries.get(key) {
            Some(sample) => {
                self.hits += 1;
                tracing::trace!("Travel-time cache hit: {:?}", key);
                Some(*sample)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Look up a key without touching the counters
    pub fn peek(&self, key: &CacheKey) -> Option<TravelTime> {
        self.entries.get(key).copied()
    }

    pub fn insert(&mut self, key: CacheKey, sample: TravelTime) {
        self.entries.insert(key, sample);
    }

    pub fn stats(&self) -> CacheStats {
        let lookups = self.hits + self.misses;
        CacheStats {
            entries: self.entries.len(),
            hit_count: self.hits,
            miss_count: self.misses,
            hit_rate: if lookups > 0 {
                self.hits as f64 / lookups as f64
            } else {
                0.0
            },
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entries: usize,
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_rate: f64,
}
