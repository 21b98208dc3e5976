// Copyright (c) 2026 sitewatch
// Licensed under the MIT License. See LICENSE file in the project root.

//! Detection session endpoints

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{AppState, Envelope};
use crate::session::StartOutcome;

#[derive(Debug, Deserialize)]
pub struct DetectionsQuery {
    limit: Option<usize>,
}

const DEFAULT_DETECTION_LIMIT: usize = 10;

/// POST /api/ppe/start
pub async fn start(State(state): State<AppState>) -> Json<Envelope<Value>> {
    match state.session.start().await {
        StartOutcome::Started { mode } => Json(Envelope::ok_with(
            "Detection started",
            json!({ "status": "running", "mode": mode }),
        )),
        StartOutcome::AlreadyRunning => Json(Envelope::rejected(
            "Detection is already running",
            json!({ "status": "already_running" }),
        )),
    }
}

/// POST /api/ppe/stop
pub async fn stop(State(state): State<AppState>) -> Json<Envelope<Value>> {
    state.session.stop().await;
    Json(Envelope::ok_with(
        "Detection stopped",
        json!({ "status": "stopped" }),
    ))
}

/// GET /api/ppe/detections?limit=N
pub async fn detections(
    State(state): State<AppState>,
    Query(query): Query<DetectionsQuery>,
) -> Json<Envelope<Value>> {
    let limit = query.limit.unwrap_or(DEFAULT_DETECTION_LIMIT);
    let view = state.session.detections(limit).await;
    Json(Envelope::ok(json!(view)))
}

/// GET /api/ppe/stats
pub async fn stats(State(state): State<AppState>) -> Json<Envelope<Value>> {
    let view = state.session.stats().await;
    Json(Envelope::ok(json!(view)))
}

/// GET /api/camera/stream
pub async fn camera_stream(State(state): State<AppState>) -> Json<Envelope<Value>> {
    let view = state.session.current_frame().await;
    Json(Envelope::ok(json!(view)))
}

/// GET /api/camera/status
pub async fn camera_status(State(state): State<AppState>) -> Json<Envelope<Value>> {
    let view = state.session.camera_status().await;
    Json(Envelope::ok(json!(view)))
}
