// Copyright (c) 2026 sitewatch
// Licensed under the MIT License. See LICENSE file in the project root.

//! Worker roster endpoints

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{AppState, Envelope};
use crate::error::ApiError;
use crate::workers::{NewWorker, WorkerUpdate};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    role: Option<String>,
}

/// GET /api/workers - full roster, or a manager-only view with
/// `?role=manager`.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let workers = state.workers.list()?;

    if query.role.as_deref() == Some("manager") {
        let managers: Vec<Value> = workers
            .iter()
            .filter(|w| {
                w.position
                    .as_deref()
                    .map(|p| p.to_lowercase().contains("manager"))
                    .unwrap_or(false)
            })
            .map(|w| json!({ "id": w.id, "name": w.name, "department": w.department }))
            .collect();
        return Ok(Json(Envelope::ok(json!(managers))));
    }

    Ok(Json(Envelope::ok(json!(workers))))
}

/// POST /api/workers
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<NewWorker>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let worker = state.workers.insert(payload)?;
    Ok(Json(Envelope::ok_with("Worker created", json!(worker))))
}

/// GET /api/workers/statistics
pub async fn statistics(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let stats = state.workers.statistics()?;
    Ok(Json(Envelope::ok(json!(stats))))
}

/// GET /api/workers/:id
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let worker = state.workers.get(&id)?;
    Ok(Json(Envelope::ok(json!(worker))))
}

/// PUT /api/workers/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<WorkerUpdate>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let worker = state.workers.update(&id, payload)?;
    Ok(Json(Envelope::ok_with("Worker updated", json!(worker))))
}

/// PUT /api/workers/:id/deactivate
pub async fn deactivate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    state.workers.deactivate(&id)?;
    Ok(Json(Envelope::ok_with(
        "Worker deactivated",
        json!({ "id": id, "status": "inactive" }),
    )))
}

/// Payload for a PPE assignment.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignPpe {
    pub worker_id: Option<String>,
    #[serde(default)]
    pub ppe_types: Vec<String>,
    pub assignment_date: Option<String>,
    pub notes: Option<String>,
}

/// POST /api/ppe/workers/assign-ppe
pub async fn assign_ppe(
    State(state): State<AppState>,
    Json(payload): Json<AssignPpe>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let worker_id = payload
        .worker_id
        .ok_or_else(|| ApiError::Validation("workerId is required".to_string()))?;
    if payload.ppe_types.is_empty() {
        return Err(ApiError::Validation("ppeTypes must not be empty".to_string()));
    }

    let worker = state.workers.assign_ppe(&worker_id, &payload.ppe_types)?;
    Ok(Json(Envelope::ok_with(
        "PPE assigned",
        json!({
            "workerId": worker.id,
            "assignedPpe": worker.assigned_ppe,
            "assignmentDate": payload.assignment_date,
        }),
    )))
}

/// DELETE /api/ppe/workers/:id/ppe/:ppeType
pub async fn remove_ppe(
    State(state): State<AppState>,
    Path((id, ppe_type)): Path<(String, String)>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let worker = state.workers.remove_ppe(&id, &ppe_type)?;
    Ok(Json(Envelope::ok_with(
        "PPE removed",
        json!({
            "workerId": worker.id,
            "ppeType": ppe_type,
            "assignedPpe": worker.assigned_ppe,
        }),
    )))
}

/// GET /api/ppe/workers/history - recent per-worker events.
pub async fn history() -> Json<Vec<Value>> {
    let now = chrono::Utc::now();
    Json(vec![
        json!({
            "id": 1,
            "type": "violation",
            "title": "PPE violation",
            "description": "Safety goggles not worn",
            "timestamp": (now - chrono::Duration::days(3)).to_rfc3339(),
            "details": { "location": "Main Production Line", "severity": "medium" },
        }),
        json!({
            "id": 2,
            "type": "training",
            "title": "Safety training completed",
            "description": "Basic occupational safety training passed",
            "timestamp": (now - chrono::Duration::days(7)).to_rfc3339(),
            "details": { "duration": "4h", "score": "95" },
        }),
        json!({
            "id": 3,
            "type": "ppe",
            "title": "PPE assigned",
            "description": "New work gloves assigned",
            "timestamp": (now - chrono::Duration::days(10)).to_rfc3339(),
            "details": { "type": "gloves", "condition": "new" },
        }),
    ])
}

/// DELETE /api/workers/:id
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    state.workers.delete(&id)?;
    Ok(Json(Envelope::ok_with(
        "Worker deleted",
        json!({ "id": id }),
    )))
}
