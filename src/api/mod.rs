// Copyright (c) 2026 sitewatch
// Licensed under the MIT License. See LICENSE file in the project root.

//! HTTP API - axum router, shared state, and the serve loop

mod monitoring;
mod reports;
mod workers;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header::CONTENT_TYPE, Method};
use axum::routing::{delete, get, post, put};
use axum::Router;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::detector::DetectorClient;
use crate::session::Session;
use crate::workers::WorkerStore;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Detection session and query façade.
    pub session: Arc<Session>,
    /// Worker roster store.
    pub workers: Arc<WorkerStore>,
}

/// Standard response envelope. `data` carries the payload; `message`
/// is only present on mutations and error-ish outcomes.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    pub fn ok_with(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }

    pub fn rejected(message: impl Into<String>, data: T) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data,
        }
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .allow_origin(Any)
        .max_age(Duration::from_secs(60 * 60));

    // Single dashboard router, mounted under /api/ppe like the frontend
    // expects. /start and /stop are short aliases for the monitoring pair.
    let dashboard = Router::new()
        // Detection session
        .route("/start-monitoring", post(monitoring::start))
        .route("/stop-monitoring", post(monitoring::stop))
        .route("/start", post(monitoring::start))
        .route("/stop", post(monitoring::stop))
        .route("/detections", get(monitoring::detections))
        .route("/stats", get(monitoring::stats))
        .route("/camera/stream", get(monitoring::camera_stream))
        .route("/camera/status", get(monitoring::camera_status))
        // Worker roster
        .route("/workers", get(workers::list).post(workers::create))
        .route("/workers/statistics", get(workers::statistics))
        .route("/workers/history", get(workers::history))
        .route("/workers/assign-ppe", post(workers::assign_ppe))
        .route(
            "/workers/:id",
            get(workers::get_one)
                .put(workers::update)
                .delete(workers::delete),
        )
        .route("/workers/:id/deactivate", put(workers::deactivate))
        .route("/workers/:id/ppe/:ppe_type", delete(workers::remove_ppe))
        // Reports and analytics
        .route("/statistics", get(reports::statistics))
        .route("/daily-stats", get(reports::daily_stats))
        .route("/weekly-stats", get(reports::weekly_stats))
        .route("/monthly-stats", get(reports::monthly_stats))
        .route("/realtime-stats", get(reports::realtime_stats))
        .route("/violations", get(reports::violations))
        .route("/violations/stats", get(reports::violation_stats))
        .route(
            "/violations/:id",
            put(reports::update_violation).delete(reports::delete_violation),
        )
        .route(
            "/settings",
            get(reports::settings).put(reports::update_settings),
        )
        .route("/settings/health", get(reports::settings_health))
        .route("/settings/reset", post(reports::reset_settings))
        .route("/settings/validate", post(reports::validate_settings))
        .route("/settings/history", get(reports::settings_history))
        .route(
            "/settings/:category",
            get(reports::settings_category).put(reports::update_settings_category),
        )
        .route("/departments", get(reports::departments))
        .route("/locations", get(reports::locations))
        .route("/messages", get(reports::messages))
        .route("/messages/send", post(reports::send_message))
        .route("/training", get(reports::training))
        .route("/training/schedule", post(reports::schedule_training))
        .route("/health", get(reports::health));

    Router::new()
        .nest("/api/ppe", dashboard)
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until Ctrl+C or SIGTERM.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let detector = DetectorClient::new(&config.detector)?;
    let session = Arc::new(Session::new(Arc::new(detector), config.feed.clone()));
    let workers = Arc::new(WorkerStore::open(config.database.path.as_path())?);

    let state = AppState { session, workers };
    let app = router(state);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&address).await?;
    info!("API listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let interrupt = async {
        if ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => tracing::error!("Failed to install signal handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }
}
