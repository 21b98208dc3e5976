// Copyright (c) 2026 sitewatch
// Licensed under the MIT License. See LICENSE file in the project root.

//! Synthetic feed generator - simulates a live detection stream when no
//! real detector is present

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rand::prelude::*;
use tokio::sync::{broadcast, RwLock};
use tokio::time::{interval, Duration};
use tracing::{debug, info};

use crate::config::FeedConfig;

use super::stats::{BoundingBox, Detection, FeedBuffer};

/// Detections fabricated per tick, inclusive bounds.
const BATCH_MIN: u32 = 1;
const BATCH_MAX: u32 = 3;

/// Handle to a running synthetic feed. Cancelling is idempotent; dropping
/// the handle also stops the feed.
pub struct FeedGuard {
    shutdown: Option<broadcast::Sender<()>>,
}

impl FeedGuard {
    /// Stop the recurring tick. Safe to call more than once.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            // Receiver may already be gone if the task saw a stale epoch
            let _ = tx.send(());
        }
    }
}

impl Drop for FeedGuard {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Spawn the recurring fabrication task.
///
/// `epoch` is the session's activation counter: the task captures the value
/// current at spawn time and deactivates itself as soon as the live value
/// differs, so a tick already queued when the session stops can never mutate
/// the buffer (the session bumps the epoch before tearing down).
pub fn spawn(
    buffer: Arc<RwLock<FeedBuffer>>,
    epoch: Arc<AtomicU64>,
    config: FeedConfig,
) -> FeedGuard {
    let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
    let my_epoch = epoch.load(Ordering::SeqCst);

    info!(
        "Synthetic feed starting (tick every {} ms)",
        config.tick_interval_ms
    );

    tokio::spawn(async move {
        let mut rng = StdRng::from_entropy();
        let mut sequence: u64 = 0;
        let mut tick = interval(Duration::from_millis(config.tick_interval_ms.max(1)));
        // First tick of tokio's interval fires immediately; skip it so the
        // feed produces nothing before one full interval has elapsed.
        tick.tick().await;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if epoch.load(Ordering::SeqCst) != my_epoch {
                        debug!("Synthetic feed observed a new session epoch, deactivating");
                        break;
                    }

                    let batch = fabricate_batch(&mut rng, &config, &mut sequence);
                    let mut buf = buffer.write().await;
                    // Re-check under the lock: stop() bumps the epoch before
                    // clearing the buffer.
                    if epoch.load(Ordering::SeqCst) != my_epoch {
                        break;
                    }
                    for detection in batch {
                        debug!(
                            "Synthetic detection: track {} protected {} confidence {:.2}",
                            detection.track_id, detection.has_protection, detection.confidence
                        );
                        buf.push(detection);
                    }
                }
                _ = shutdown_rx.recv() => {
                    break;
                }
            }
        }

        info!("Synthetic feed stopped");
    });

    FeedGuard {
        shutdown: Some(shutdown_tx),
    }
}

/// Fabricate 1-3 detections for one tick.
fn fabricate_batch(rng: &mut StdRng, config: &FeedConfig, sequence: &mut u64) -> Vec<Detection> {
    let count = rng.gen_range(BATCH_MIN..=BATCH_MAX);
    (0..count)
        .map(|_| {
            *sequence += 1;
            fabricate_detection(rng, config.compliance_probability, *sequence)
        })
        .collect()
}

/// Fabricate a single plausible detection.
pub(crate) fn fabricate_detection(
    rng: &mut StdRng,
    compliance_probability: f64,
    sequence: u64,
) -> Detection {
    let timestamp = Utc::now().timestamp_millis();
    // Two-decimal confidence in [0.70, 1.00]
    let confidence = (rng.gen_range(0.70f64..=1.00) * 100.0).round() / 100.0;

    Detection {
        // Time-derived, disambiguated within a tick by the sequence number
        id: timestamp as u64 * 1000 + sequence % 1000,
        track_id: rng.gen_range(0..100),
        has_protection: rng.gen_bool(compliance_probability),
        confidence,
        bounding_box: BoundingBox {
            x: rng.gen_range(0..400),
            y: rng.gen_range(0..300),
            width: rng.gen_range(100..200),
            height: rng.gen_range(120..200),
        },
        timestamp,
        worker_id: format!("W{}", rng.gen_range(1..=50)),
        location: format!("Zone-{}", rng.gen_range(1..=5)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fabricated_detection_ranges() {
        let mut rng = StdRng::seed_from_u64(7);

        for seq in 0..300 {
            let d = fabricate_detection(&mut rng, 0.68, seq);

            assert!(d.track_id < 100);
            assert!((0.70..=1.00).contains(&d.confidence));
            // Two-decimal rounding
            assert!((d.confidence * 100.0 - (d.confidence * 100.0).round()).abs() < 1e-9);
            assert!(d.bounding_box.x < 400);
            assert!(d.bounding_box.y < 300);
            assert!((100..200).contains(&d.bounding_box.width));
            assert!((120..200).contains(&d.bounding_box.height));
            assert!(d.worker_id.starts_with('W'));
            assert!(d.location.starts_with("Zone-"));
        }
    }

    #[test]
    fn test_batch_size_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        let config = FeedConfig::default();
        let mut sequence = 0;

        for _ in 0..100 {
            let batch = fabricate_batch(&mut rng, &config, &mut sequence);
            assert!((1..=3).contains(&batch.len()));
        }
    }

    #[tokio::test]
    async fn test_feed_fills_buffer_until_cancelled() {
        let buffer = Arc::new(RwLock::new(FeedBuffer::new()));
        let epoch = Arc::new(AtomicU64::new(0));
        let config = FeedConfig {
            tick_interval_ms: 10,
            compliance_probability: 0.68,
        };

        let mut guard = spawn(buffer.clone(), epoch.clone(), config);

        // Wait until at least one tick landed
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if !buffer.read().await.is_empty() {
                break;
            }
        }
        assert!(!buffer.read().await.is_empty());

        guard.cancel();
        guard.cancel(); // double cancel is a no-op

        // Let any tick that was already past the select drain
        tokio::time::sleep(Duration::from_millis(30)).await;
        let len_after_cancel = buffer.read().await.len();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(buffer.read().await.len(), len_after_cancel);
    }

    #[tokio::test]
    async fn test_stale_epoch_stops_mutation() {
        let buffer = Arc::new(RwLock::new(FeedBuffer::new()));
        let epoch = Arc::new(AtomicU64::new(0));
        let config = FeedConfig {
            tick_interval_ms: 10,
            compliance_probability: 0.68,
        };

        let _guard = spawn(buffer.clone(), epoch.clone(), config);

        // Invalidate the activation without touching the guard
        epoch.fetch_add(1, Ordering::SeqCst);
        buffer.write().await.clear();

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(buffer.read().await.is_empty());
    }
}
