// Copyright (c) 2026 sitewatch
// Licensed under the MIT License. See LICENSE file in the project root.

//! Detection model, retention buffer and running aggregate statistics

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Maximum detections kept in memory; oldest evicted first.
pub const RETENTION_CAPACITY: usize = 100;

/// Cap on the derived active-worker estimate.
const ACTIVE_WORKER_CAP: u64 = 15;

/// Pixel-space bounding box of a detected person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One observed person + PPE-state event.
///
/// Immutable after creation; owned by the retention buffer of whichever
/// backend produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    /// Time-derived unique identifier
    pub id: u64,
    /// Correlates repeated sightings of the same subject within a session
    pub track_id: u32,
    /// Whether the required protection (e.g. helmet) was present
    pub has_protection: bool,
    /// Detector confidence in [0, 1]
    pub confidence: f64,
    /// Pixel-space bounding box
    pub bounding_box: BoundingBox,
    /// Milliseconds since epoch, non-decreasing with insertion order
    pub timestamp: i64,
    /// Display label for the subject
    pub worker_id: String,
    /// Display label for where the sighting happened
    pub location: String,
}

/// Running counters derived from the detection stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub total_detections: u64,
    pub safe_detections: u64,
    pub violations: u64,
    /// Integer percentage in [0, 100]
    pub compliance_rate: u64,
    /// Derived estimate, capped at 15
    pub active_workers: u64,
}

impl AggregateStats {
    /// Fold one detection into the counters.
    pub fn record(&mut self, has_protection: bool) {
        self.total_detections += 1;
        if has_protection {
            self.safe_detections += 1;
        } else {
            self.violations += 1;
        }

        self.compliance_rate = ((100 * self.safe_detections) as f64
            / self.total_detections.max(1) as f64)
            .round() as u64;
        self.active_workers = ACTIVE_WORKER_CAP.min(self.total_detections.div_ceil(3));
    }

    /// Zero all counters (new session).
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Bounded FIFO retention buffer plus the stats derived from it.
#[derive(Debug, Default)]
pub struct FeedBuffer {
    detections: VecDeque<Detection>,
    stats: AggregateStats,
}

impl FeedBuffer {
    pub fn new() -> Self {
        Self {
            detections: VecDeque::with_capacity(RETENTION_CAPACITY),
            stats: AggregateStats::default(),
        }
    }

    /// Append a detection, evicting the oldest entry at capacity, and fold
    /// it into the running stats.
    pub fn push(&mut self, detection: Detection) {
        if self.detections.len() == RETENTION_CAPACITY {
            self.detections.pop_front();
        }
        self.stats.record(detection.has_protection);
        self.detections.push_back(detection);
    }

    /// The most recent `limit` detections, most-recent-last.
    pub fn recent(&self, limit: usize) -> Vec<Detection> {
        let skip = self.detections.len().saturating_sub(limit);
        self.detections.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn stats(&self) -> AggregateStats {
        self.stats
    }

    /// Drop all detections and zero the counters (session stop).
    pub fn clear(&mut self) {
        self.detections.clear();
        self.stats.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn detection(id: u64, has_protection: bool) -> Detection {
        Detection {
            id,
            track_id: 7,
            has_protection,
            confidence: 0.91,
            bounding_box: BoundingBox {
                x: 10,
                y: 20,
                width: 120,
                height: 150,
            },
            timestamp: id as i64,
            worker_id: "W1".to_string(),
            location: "Zone-1".to_string(),
        }
    }

    #[test]
    fn test_stats_invariant_after_every_increment() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut stats = AggregateStats::default();

        for _ in 0..500 {
            stats.record(rng.gen_bool(0.68));

            assert_eq!(
                stats.safe_detections + stats.violations,
                stats.total_detections
            );
            let expected = ((100 * stats.safe_detections) as f64
                / stats.total_detections.max(1) as f64)
                .round() as u64;
            assert_eq!(stats.compliance_rate, expected);
            assert!(stats.compliance_rate <= 100);
        }
    }

    #[test]
    fn test_compliance_rounding() {
        let mut stats = AggregateStats::default();
        stats.record(true);
        stats.record(true);
        stats.record(false);

        // 2/3 rounds to 67
        assert_eq!(stats.compliance_rate, 67);
    }

    #[test]
    fn test_active_workers_estimate() {
        let mut stats = AggregateStats::default();

        stats.record(true);
        assert_eq!(stats.active_workers, 1); // ceil(1/3)

        for _ in 0..3 {
            stats.record(true);
        }
        assert_eq!(stats.active_workers, 2); // ceil(4/3)

        for _ in 0..96 {
            stats.record(false);
        }
        assert_eq!(stats.active_workers, 15); // capped
    }

    #[test]
    fn test_reset_zeroes_counters() {
        let mut stats = AggregateStats::default();
        stats.record(true);
        stats.record(false);

        stats.reset();
        assert_eq!(stats, AggregateStats::default());
    }

    #[test]
    fn test_retention_bound() {
        let mut buffer = FeedBuffer::new();

        for id in 0..150 {
            buffer.push(detection(id, true));
        }

        assert_eq!(buffer.len(), RETENTION_CAPACITY);

        // The 100 most recent, in creation order
        let all = buffer.recent(RETENTION_CAPACITY);
        assert_eq!(all.first().unwrap().id, 50);
        assert_eq!(all.last().unwrap().id, 149);

        // Eviction does not touch the counters
        assert_eq!(buffer.stats().total_detections, 150);
    }

    #[test]
    fn test_recent_limit_and_order() {
        let mut buffer = FeedBuffer::new();
        for id in 0..20 {
            buffer.push(detection(id, id % 2 == 0));
        }

        let last = buffer.recent(5);
        assert_eq!(last.len(), 5);
        let ids: Vec<u64> = last.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![15, 16, 17, 18, 19]);

        // Limit larger than the buffer returns everything
        assert_eq!(buffer.recent(100).len(), 20);
    }

    #[test]
    fn test_clear_empties_buffer_and_stats() {
        let mut buffer = FeedBuffer::new();
        buffer.push(detection(1, true));
        buffer.push(detection(2, false));

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.stats(), AggregateStats::default());
    }
}
