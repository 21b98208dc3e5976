// Copyright (c) 2026 sitewatch
// Licensed under the MIT License. See LICENSE file in the project root.

//! Detection session - lifecycle state machine and query facade
//!
//! A single [`Session`] owns the monitoring lifecycle: `start()` probes the
//! remote detector and falls back to the synthetic feed when it is
//! unreachable, `stop()` tears down whichever backend is active and always
//! succeeds. Reads (detections, stats, frame) never fail either; a remote
//! fetch failure degrades to the local buffer with a fallback marker.

mod feed;
pub(crate) mod stats;

pub use feed::FeedGuard;
pub use stats::{AggregateStats, BoundingBox, Detection, FeedBuffer, RETENTION_CAPACITY};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use base64::Engine;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::FeedConfig;
use crate::detector::DetectorBackend;

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Idle,
    Running,
}

/// Which backend serves a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    None,
    #[serde(rename = "detector")]
    Remote,
    Synthetic,
}

/// Source tag carried on every read response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    /// Proxied from the remote detector
    Detector,
    /// Served by the synthetic feed (or the idle local buffer)
    Synthetic,
    /// Remote fetch failed; local buffer served instead
    Fallback,
}

/// Result of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A backend was activated
    Started {
        /// Which backend ended up serving the session
        mode: FeedMode,
    },
    /// The session was already running; nothing changed
    AlreadyRunning,
}

enum ActiveBackend {
    None,
    Remote,
    Synthetic(FeedGuard),
}

impl ActiveBackend {
    fn kind(&self) -> BackendKind {
        match self {
            ActiveBackend::None => BackendKind::None,
            ActiveBackend::Remote => BackendKind::Remote,
            ActiveBackend::Synthetic(_) => BackendKind::Synthetic,
        }
    }
}

struct Inner {
    mode: SessionMode,
    backend: ActiveBackend,
}

/// The monitoring session. One per process, shared behind `Arc`.
pub struct Session {
    detector: Arc<dyn DetectorBackend>,
    feed_config: FeedConfig,
    buffer: Arc<RwLock<FeedBuffer>>,
    /// Bumped on every stop; in-flight ticks and responses from a previous
    /// activation observe the change and are discarded.
    epoch: Arc<AtomicU64>,
    inner: RwLock<Inner>,
}

impl Session {
    /// Create an idle session.
    pub fn new(detector: Arc<dyn DetectorBackend>, feed_config: FeedConfig) -> Self {
        Self {
            detector,
            feed_config,
            buffer: Arc::new(RwLock::new(FeedBuffer::new())),
            epoch: Arc::new(AtomicU64::new(0)),
            inner: RwLock::new(Inner {
                mode: SessionMode::Idle,
                backend: ActiveBackend::None,
            }),
        }
    }

    /// Begin monitoring.
    ///
    /// Prefers the remote detector; any failure reaching it (health probe or
    /// start call) transparently activates the synthetic feed. Holding the
    /// write lock across the probe serializes concurrent starts: the loser
    /// observes `Running` and gets [`StartOutcome::AlreadyRunning`].
    pub async fn start(&self) -> StartOutcome {
        let mut inner = self.inner.write().await;
        if inner.mode == SessionMode::Running {
            return StartOutcome::AlreadyRunning;
        }

        if self.detector.health().await {
            match self.detector.start().await {
                Ok(()) => {
                    info!("Monitoring started (remote detector)");
                    inner.backend = ActiveBackend::Remote;
                    inner.mode = SessionMode::Running;
                    return StartOutcome::Started {
                        mode: FeedMode::Detector,
                    };
                }
                Err(err) => {
                    warn!("Detector start failed, falling back to synthetic: {}", err);
                }
            }
        } else {
            info!("Detector not reachable, using synthetic feed");
        }

        let guard = feed::spawn(
            self.buffer.clone(),
            self.epoch.clone(),
            self.feed_config.clone(),
        );
        inner.backend = ActiveBackend::Synthetic(guard);
        inner.mode = SessionMode::Running;

        StartOutcome::Started {
            mode: FeedMode::Synthetic,
        }
    }

    /// End monitoring. Idempotent and infallible: teardown failures are
    /// logged and swallowed here, at the facade boundary, so the session
    /// always reaches a clean idle state.
    pub async fn stop(&self) {
        let mut inner = self.inner.write().await;

        // Invalidate in-flight ticks and remote responses first
        self.epoch.fetch_add(1, Ordering::SeqCst);

        match std::mem::replace(&mut inner.backend, ActiveBackend::None) {
            ActiveBackend::Remote => {
                if let Err(err) = self.detector.stop().await {
                    warn!("Detector stop failed (ignored): {}", err);
                }
            }
            ActiveBackend::Synthetic(mut guard) => guard.cancel(),
            ActiveBackend::None => {}
        }

        inner.mode = SessionMode::Idle;
        self.buffer.write().await.clear();

        info!("Monitoring stopped");
    }

    /// Whether the session is currently running.
    pub async fn is_monitoring(&self) -> bool {
        self.inner.read().await.mode == SessionMode::Running
    }

    /// The active backend kind.
    pub async fn backend(&self) -> BackendKind {
        self.inner.read().await.backend.kind()
    }

    /// The most recent `limit` detections, most-recent-last. Never fails.
    pub async fn detections(&self, limit: usize) -> DetectionsView {
        let (kind, monitoring, epoch) = self.snapshot().await;

        if kind == BackendKind::Remote {
            match self.detector.fetch_detections().await {
                Ok(mut list) if self.epoch.load(Ordering::SeqCst) == epoch => {
                    let skip = list.len().saturating_sub(limit);
                    list.drain(..skip);
                    return DetectionsView {
                        detections: list,
                        is_monitoring: monitoring,
                        mode: FeedMode::Detector,
                        timestamp: Utc::now().timestamp_millis(),
                    };
                }
                Ok(_) => {
                    // Session stopped while the request was in flight
                    return self.local_detections(limit).await;
                }
                Err(err) => {
                    warn!("Detector detections fetch failed, serving local: {}", err);
                    let mut view = self.local_detections(limit).await;
                    view.mode = FeedMode::Fallback;
                    return view;
                }
            }
        }

        self.local_detections(limit).await
    }

    /// Current aggregate statistics. Same fallback discipline as
    /// [`Session::detections`].
    pub async fn stats(&self) -> StatsView {
        let (kind, monitoring, epoch) = self.snapshot().await;

        if kind == BackendKind::Remote {
            match self.detector.fetch_stats().await {
                Ok(stats) if self.epoch.load(Ordering::SeqCst) == epoch => {
                    return StatsView {
                        stats,
                        is_monitoring: monitoring,
                        mode: FeedMode::Detector,
                        timestamp: Utc::now().timestamp_millis(),
                    };
                }
                Ok(_) => return self.local_stats().await,
                Err(err) => {
                    warn!("Detector stats fetch failed, serving local: {}", err);
                    let mut view = self.local_stats().await;
                    view.mode = FeedMode::Fallback;
                    return view;
                }
            }
        }

        self.local_stats().await
    }

    /// A displayable representation of the current frame, annotated with the
    /// running stats. Pure read.
    pub async fn current_frame(&self) -> FrameView {
        let (kind, monitoring, _) = self.snapshot().await;
        let stats = self.local_stats().await.stats;

        if kind == BackendKind::Remote {
            match self.detector.fetch_frame().await {
                Ok(bytes) => {
                    return FrameView {
                        frame: base64::engine::general_purpose::STANDARD.encode(bytes),
                        fps: 30,
                        resolution: "1920x1080".to_string(),
                        status: "active",
                        stats,
                        is_monitoring: monitoring,
                        mode: FeedMode::Detector,
                        timestamp: Utc::now().timestamp_millis(),
                    };
                }
                Err(err) => {
                    warn!("Detector frame fetch failed, serving placeholder: {}", err);
                    let mut view = Self::placeholder_frame(stats, monitoring);
                    view.mode = FeedMode::Fallback;
                    return view;
                }
            }
        }

        Self::placeholder_frame(stats, monitoring)
    }

    /// Availability flags for the camera/backend.
    pub async fn camera_status(&self) -> CameraStatusView {
        let (kind, monitoring, _) = self.snapshot().await;

        CameraStatusView {
            camera_available: self.detector.health().await,
            is_monitoring: monitoring,
            backend: kind,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    async fn snapshot(&self) -> (BackendKind, bool, u64) {
        let inner = self.inner.read().await;
        (
            inner.backend.kind(),
            inner.mode == SessionMode::Running,
            self.epoch.load(Ordering::SeqCst),
        )
    }

    async fn local_detections(&self, limit: usize) -> DetectionsView {
        let buffer = self.buffer.read().await;
        DetectionsView {
            detections: buffer.recent(limit),
            is_monitoring: self.is_monitoring().await,
            mode: FeedMode::Synthetic,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    async fn local_stats(&self) -> StatsView {
        let buffer = self.buffer.read().await;
        StatsView {
            stats: buffer.stats(),
            is_monitoring: self.is_monitoring().await,
            mode: FeedMode::Synthetic,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    fn placeholder_frame(stats: AggregateStats, monitoring: bool) -> FrameView {
        FrameView {
            frame: "synthetic://camera/stream".to_string(),
            fps: 30,
            resolution: "1920x1080".to_string(),
            status: if monitoring { "active" } else { "inactive" },
            stats,
            is_monitoring: monitoring,
            mode: FeedMode::Synthetic,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Payload for `GET /detections`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionsView {
    pub detections: Vec<Detection>,
    pub is_monitoring: bool,
    pub mode: FeedMode,
    pub timestamp: i64,
}

/// Payload for `GET /stats`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsView {
    pub stats: AggregateStats,
    pub is_monitoring: bool,
    pub mode: FeedMode,
    pub timestamp: i64,
}

/// Payload for `GET /camera/stream`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameView {
    pub frame: String,
    pub fps: u32,
    pub resolution: String,
    pub status: &'static str,
    pub stats: AggregateStats,
    pub is_monitoring: bool,
    pub mode: FeedMode,
    pub timestamp: i64,
}

/// Payload for `GET /camera/status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraStatusView {
    pub camera_available: bool,
    pub is_monitoring: bool,
    pub backend: BackendKind,
    pub timestamp: i64,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::detector::DetectorError;
    use async_trait::async_trait;

    /// In-process detector stand-in for session and API tests.
    pub(crate) struct StubDetector {
        healthy: bool,
        start_ok: bool,
        fetch_ok: bool,
    }

    impl StubDetector {
        pub(crate) fn down() -> Arc<Self> {
            Arc::new(Self {
                healthy: false,
                start_ok: false,
                fetch_ok: false,
            })
        }

        pub(crate) fn up() -> Arc<Self> {
            Arc::new(Self {
                healthy: true,
                start_ok: true,
                fetch_ok: true,
            })
        }

        pub(crate) fn flaky() -> Arc<Self> {
            // Healthy at start, failing on reads
            Arc::new(Self {
                healthy: true,
                start_ok: true,
                fetch_ok: false,
            })
        }
    }

    #[async_trait]
    impl DetectorBackend for StubDetector {
        async fn health(&self) -> bool {
            self.healthy
        }

        async fn start(&self) -> Result<(), DetectorError> {
            if self.start_ok {
                Ok(())
            } else {
                Err(DetectorError::Unavailable("stub".to_string()))
            }
        }

        async fn stop(&self) -> Result<(), DetectorError> {
            Ok(())
        }

        async fn fetch_detections(&self) -> Result<Vec<Detection>, DetectorError> {
            if self.fetch_ok {
                Ok(vec![])
            } else {
                Err(DetectorError::Unavailable("stub".to_string()))
            }
        }

        async fn fetch_stats(&self) -> Result<AggregateStats, DetectorError> {
            if self.fetch_ok {
                Ok(AggregateStats::default())
            } else {
                Err(DetectorError::Unavailable("stub".to_string()))
            }
        }

        async fn fetch_frame(&self) -> Result<Vec<u8>, DetectorError> {
            Err(DetectorError::Unavailable("stub".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::StubDetector;
    use super::*;
    use tokio::time::{sleep, Duration};

    fn fast_feed() -> FeedConfig {
        FeedConfig {
            tick_interval_ms: 10,
            compliance_probability: 0.68,
        }
    }

    async fn wait_for_detections(session: &Session, at_least: usize) {
        for _ in 0..200 {
            if session.detections(100).await.detections.len() >= at_least {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("synthetic feed produced no detections in time");
    }

    #[tokio::test]
    async fn test_fallback_to_synthetic_when_detector_down() {
        let session = Session::new(StubDetector::down(), fast_feed());

        let outcome = session.start().await;
        assert_eq!(
            outcome,
            StartOutcome::Started {
                mode: FeedMode::Synthetic
            }
        );
        assert!(session.is_monitoring().await);
        assert_eq!(session.backend().await, BackendKind::Synthetic);

        session.stop().await;
    }

    #[tokio::test]
    async fn test_remote_backend_chosen_when_healthy() {
        let session = Session::new(StubDetector::up(), fast_feed());

        let outcome = session.start().await;
        assert_eq!(
            outcome,
            StartOutcome::Started {
                mode: FeedMode::Detector
            }
        );
        assert_eq!(session.backend().await, BackendKind::Remote);

        session.stop().await;
    }

    #[tokio::test]
    async fn test_second_start_reports_already_running() {
        let session = Session::new(StubDetector::down(), fast_feed());

        assert!(matches!(session.start().await, StartOutcome::Started { .. }));
        assert_eq!(session.start().await, StartOutcome::AlreadyRunning);

        session.stop().await;
    }

    #[tokio::test]
    async fn test_concurrent_starts_single_activation() {
        let session = Arc::new(Session::new(StubDetector::down(), fast_feed()));

        let (a, b) = tokio::join!(session.start(), session.start());

        let started = [a, b]
            .iter()
            .filter(|o| matches!(o, StartOutcome::Started { .. }))
            .count();
        assert_eq!(started, 1);
        assert!([a, b].contains(&StartOutcome::AlreadyRunning));

        session.stop().await;
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let session = Session::new(StubDetector::down(), fast_feed());

        for _ in 0..3 {
            session.stop().await;
            assert!(!session.is_monitoring().await);
            assert_eq!(session.backend().await, BackendKind::None);
        }
    }

    #[tokio::test]
    async fn test_stop_clears_buffer_and_resets_stats() {
        let session = Session::new(StubDetector::down(), fast_feed());

        session.start().await;
        wait_for_detections(&session, 1).await;

        session.stop().await;

        let view = session.detections(10).await;
        assert!(view.detections.is_empty());
        assert!(!view.is_monitoring);

        let stats = session.stats().await.stats;
        assert_eq!(stats, AggregateStats::default());
    }

    #[tokio::test]
    async fn test_restart_does_not_leak_prior_aggregates() {
        let session = Session::new(StubDetector::down(), fast_feed());

        session.start().await;
        wait_for_detections(&session, 3).await;
        session.stop().await;

        session.start().await;
        wait_for_detections(&session, 1).await;

        let view = session.detections(100).await;
        let stats = session.stats().await.stats;
        assert_eq!(stats.total_detections, view.detections.len() as u64);
        assert_eq!(
            stats.safe_detections + stats.violations,
            stats.total_detections
        );

        session.stop().await;
    }

    #[tokio::test]
    async fn test_synthetic_end_to_end() {
        let session = Session::new(StubDetector::down(), fast_feed());

        let outcome = session.start().await;
        assert_eq!(
            outcome,
            StartOutcome::Started {
                mode: FeedMode::Synthetic
            }
        );

        // Two ticks produce between 2 and 6 detections
        wait_for_detections(&session, 2).await;

        let view = session.detections(10).await;
        assert!(view.is_monitoring);
        assert_eq!(view.mode, FeedMode::Synthetic);
        for d in &view.detections {
            assert!((0.0..=1.0).contains(&d.confidence));
            assert!(d.bounding_box.width > 0 && d.bounding_box.height > 0);
        }

        session.stop().await;
        assert!(session.detections(10).await.detections.is_empty());
    }

    #[tokio::test]
    async fn test_remote_read_failure_degrades_to_fallback() {
        let session = Session::new(StubDetector::flaky(), fast_feed());

        session.start().await;
        assert_eq!(session.backend().await, BackendKind::Remote);

        let view = session.detections(10).await;
        assert_eq!(view.mode, FeedMode::Fallback);
        assert!(view.detections.is_empty());

        let stats_view = session.stats().await;
        assert_eq!(stats_view.mode, FeedMode::Fallback);

        session.stop().await;
    }

    #[tokio::test]
    async fn test_idle_reads_never_fail() {
        let session = Session::new(StubDetector::down(), fast_feed());

        let view = session.detections(10).await;
        assert!(view.detections.is_empty());
        assert!(!view.is_monitoring);

        let frame = session.current_frame().await;
        assert_eq!(frame.status, "inactive");
        assert_eq!(frame.frame, "synthetic://camera/stream");
    }
}
