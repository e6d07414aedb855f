//! Named cooldowns on the simulation clock

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone, Copy)]
struct Interval {
    duration_ms: f64,
    last_reset_ms: Option<f64>,
}

/// Per-key intervals. A key that was registered but never reset counts as over,
/// so the first check after spawn fires immediately.
#[derive(Debug, Clone)]
pub struct IntervalMap<K> {
    intervals: HashMap<K, Interval>,
}

impl<K: Eq + Hash> Default for IntervalMap<K> {
    fn default() -> Self {
        Self {
            intervals: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> IntervalMap<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: K, duration_ms: f64) {
        self.intervals.insert(
            key,
            Interval {
                duration_ms,
                last_reset_ms: None,
            },
        );
    }

    /// Unregistered keys are never over
    pub fn is_over(&self, key: &K, now_ms: f64) -> bool {
        match self.intervals.get(key) {
            Some(Interval {
                last_reset_ms: None, ..
            }) => true,
            Some(Interval {
                duration_ms,
                last_reset_ms: Some(last),
            }) => now_ms - last >= *duration_ms,
            None => false,
        }
    }

    pub fn reset(&mut self, key: &K, now_ms: f64) {
        if let Some(interval) = self.intervals.get_mut(key) {
            interval.last_reset_ms = Some(now_ms);
        }
    }

    /// Check and reset in one go; true if the interval had elapsed
    pub fn try_fire(&mut self, key: &K, now_ms: f64) -> bool {
        if self.is_over(key, now_ms) {
            self.reset(key, now_ms);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_fires_then_waits() {
        let mut timers = IntervalMap::new();
        timers.register("shoot", 250.0);

        assert!(timers.try_fire(&"shoot", 0.0));
        assert!(!timers.try_fire(&"shoot", 100.0));
        assert!(!timers.is_over(&"shoot", 249.0));
        assert!(timers.try_fire(&"shoot", 250.0));
        assert!(!timers.is_over(&"shoot", 300.0));
    }

    #[test]
    fn test_unregistered_never_over() {
        let timers: IntervalMap<&str> = IntervalMap::new();
        assert!(!timers.is_over(&"dash", 10_000.0));
    }
}
