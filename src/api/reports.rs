// Copyright (c) 2026 sitewatch
// Licensed under the MIT License. See LICENSE file in the project root.

//! Reporting and analytics endpoints
//!
//! These serve fabricated but internally consistent data so the dashboard
//! has something to render before a real history store exists. Shapes are
//! stable; values are regenerated per request.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{AppState, Envelope};
use crate::error::ApiError;

const DEPARTMENTS: [&str; 6] = [
    "Production",
    "Quality Control",
    "Maintenance",
    "Warehouse",
    "Security",
    "Human Resources",
];

const LOCATIONS: [&str; 6] = [
    "Main Production Line",
    "Assembly Area",
    "Quality Laboratory",
    "Warehouse Areas",
    "Maintenance Workshop",
    "Office Areas",
];

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn compliance_pct(detections: u32, violations: u32) -> u32 {
    if detections == 0 {
        return 100;
    }
    (((detections - violations) as f64 / detections as f64) * 100.0).round() as u32
}

// ---------------------------------------------------------------------------
// Daily stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct HourRecord {
    hour: u32,
    time_label: String,
    detections: u32,
    violations: u32,
    active_workers: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct DayRecord {
    date: String,
    date_formatted: String,
    detections: u32,
    violations: u32,
    safe_detections: u32,
    compliance_rate: u32,
    working_hours: u32,
    active_workers: u32,
    average_confidence: f64,
    top_violation_type: String,
    hourly_breakdown: Vec<HourRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WeekGroup {
    week_number: usize,
    start_date: String,
    end_date: String,
    days: usize,
    total_detections: u32,
    total_violations: u32,
    average_compliance: u32,
    daily_average: u32,
}

fn fabricate_hourly(rng: &mut ThreadRng) -> Vec<HourRecord> {
    // Working hours 08:00-17:00
    (8..=17)
        .map(|hour| HourRecord {
            hour,
            time_label: format!("{:02}:00", hour),
            detections: rng.gen_range(2..10),
            violations: rng.gen_range(0..3),
            active_workers: rng.gen_range(15..25),
        })
        .collect()
}

fn fabricate_day(rng: &mut ThreadRng, date: DateTime<Utc>) -> DayRecord {
    let detections = rng.gen_range(10..60);
    let violations = rng.gen_range(1..9).min(detections);

    DayRecord {
        date: date.format("%Y-%m-%d").to_string(),
        date_formatted: date.format("%d/%m/%Y").to_string(),
        detections,
        violations,
        safe_detections: detections - violations,
        compliance_rate: compliance_pct(detections, violations),
        working_hours: 8,
        active_workers: rng.gen_range(25..40),
        average_confidence: round2(rng.gen_range(0.70..=1.00)),
        top_violation_type: if rng.gen_bool(0.5) {
            "Missing PPE".to_string()
        } else {
            "Wrong PPE".to_string()
        },
        hourly_breakdown: fabricate_hourly(rng),
    }
}

fn group_by_week(days: &[DayRecord]) -> Vec<WeekGroup> {
    let mut weeks = Vec::new();
    let mut current: Vec<&DayRecord> = Vec::new();

    for (index, day) in days.iter().enumerate() {
        current.push(day);

        let weekday = chrono::NaiveDate::parse_from_str(&day.date, "%Y-%m-%d")
            .map(|d| d.weekday())
            .unwrap_or(Weekday::Mon);
        if weekday == Weekday::Sun || index == days.len() - 1 {
            let detections: u32 = current.iter().map(|d| d.detections).sum();
            let violations: u32 = current.iter().map(|d| d.violations).sum();
            let compliance: u32 = current.iter().map(|d| d.compliance_rate).sum();

            weeks.push(WeekGroup {
                week_number: weeks.len() + 1,
                start_date: current[0].date.clone(),
                end_date: current[current.len() - 1].date.clone(),
                days: current.len(),
                total_detections: detections,
                total_violations: violations,
                average_compliance: (compliance as f64 / current.len() as f64).round() as u32,
                daily_average: (detections as f64 / current.len() as f64).round() as u32,
            });
            current.clear();
        }
    }

    weeks
}

fn analyze_weekdays(days: &[DayRecord]) -> Value {
    let (mut weekdays, mut weekends): (Vec<u32>, Vec<u32>) = (Vec::new(), Vec::new());

    for day in days {
        let weekday = chrono::NaiveDate::parse_from_str(&day.date, "%Y-%m-%d")
            .map(|d| d.weekday())
            .unwrap_or(Weekday::Mon);
        match weekday {
            Weekday::Sat | Weekday::Sun => weekends.push(day.compliance_rate),
            _ => weekdays.push(day.compliance_rate),
        }
    }

    let avg = |values: &[u32]| {
        if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<u32>() as f64 / values.len() as f64
        }
    };
    let weekday_avg = avg(&weekdays);
    let weekend_avg = avg(&weekends);

    json!({
        "weekdayAverage": round2(weekday_avg),
        "weekendAverage": round2(weekend_avg),
        "weekdayCount": weekdays.len(),
        "weekendCount": weekends.len(),
        "difference": round2(weekday_avg - weekend_avg),
    })
}

/// GET /api/daily-stats - last 30 days with hourly breakdown, summary,
/// trends, weekly grouping, and weekday analysis.
pub async fn daily_stats() -> Json<Value> {
    let mut rng = rand::thread_rng();
    let today = Utc::now();

    let days: Vec<DayRecord> = (0..30i64)
        .rev()
        .map(|i| fabricate_day(&mut rng, today - Duration::days(i)))
        .collect();

    let total_detections: u32 = days.iter().map(|d| d.detections).sum();
    let total_violations: u32 = days.iter().map(|d| d.violations).sum();
    let average_compliance = (days.iter().map(|d| d.compliance_rate).sum::<u32>() as f64
        / days.len() as f64)
        .round() as u32;

    let best_day = days
        .iter()
        .max_by_key(|d| d.compliance_rate)
        .cloned()
        .unwrap_or_else(|| days[0].clone());
    let worst_day = days
        .iter()
        .min_by_key(|d| d.compliance_rate)
        .cloned()
        .unwrap_or_else(|| days[0].clone());

    // Last 7 days vs the 7 before them
    let last_week_avg =
        days[23..].iter().map(|d| d.compliance_rate).sum::<u32>() as f64 / 7.0;
    let previous_week_avg =
        days[16..23].iter().map(|d| d.compliance_rate).sum::<u32>() as f64 / 7.0;
    let trend = if previous_week_avg > 0.0 {
        (last_week_avg - previous_week_avg) / previous_week_avg * 100.0
    } else {
        0.0
    };

    let mut by_violations = days.clone();
    by_violations.sort_by(|a, b| b.violations.cmp(&a.violations));
    let mut by_compliance = days.clone();
    by_compliance.sort_by(|a, b| b.compliance_rate.cmp(&a.compliance_rate));

    Json(json!({
        "success": true,
        "data": {
            "dailyData": days,
            "summary": {
                "totalDetections": total_detections,
                "totalViolations": total_violations,
                "totalSafeDetections": total_detections - total_violations,
                "averageCompliance": average_compliance,
                "bestDay": best_day,
                "worstDay": worst_day,
                "totalWorkingDays": days.len(),
                "averageDetectionsPerDay":
                    (total_detections as f64 / days.len() as f64).round() as u32,
            },
            "trends": {
                "complianceChange": round2(trend),
                "direction": if trend > 0.0 { "improving" }
                    else if trend < 0.0 { "declining" }
                    else { "stable" },
                "lastWeekAverage": round2(last_week_avg),
                "previousWeekAverage": round2(previous_week_avg),
            },
            "weeklyData": group_by_week(&days),
            "topViolationDays": &by_violations[..5],
            "topPerformanceDays": &by_compliance[..5],
            "weekdayAnalysis": analyze_weekdays(&days),
        },
        "timestamp": Utc::now().to_rfc3339(),
        "period": {
            "startDate": days[0].date,
            "endDate": days[days.len() - 1].date,
            "totalDays": days.len(),
        },
    }))
}

// ---------------------------------------------------------------------------
// Weekly / monthly / realtime stats
// ---------------------------------------------------------------------------

/// GET /api/weekly-stats - last 12 weeks, Monday through Sunday.
pub async fn weekly_stats() -> Json<Value> {
    let mut rng = rand::thread_rng();
    let today = Utc::now();

    let weeks: Vec<Value> = (0..12i64)
        .rev()
        .map(|i| {
            let anchor = today - Duration::weeks(i);
            let monday =
                anchor - Duration::days(anchor.weekday().num_days_from_monday() as i64);
            let sunday = monday + Duration::days(6);

            let detections: u32 = rng.gen_range(100..300);
            let violations: u32 = rng.gen_range(5..35);

            json!({
                "weekNumber": monday.iso_week().week(),
                "startDate": monday.format("%Y-%m-%d").to_string(),
                "endDate": sunday.format("%Y-%m-%d").to_string(),
                "detections": detections,
                "violations": violations,
                "complianceRate": compliance_pct(detections, violations),
                "activeWorkers": rng.gen_range(30..50),
                "workingDays": 5,
            })
        })
        .collect();

    Json(json!({
        "success": true,
        "data": weeks,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// GET /api/monthly-stats - last 12 calendar months.
pub async fn monthly_stats() -> Json<Value> {
    let mut rng = rand::thread_rng();
    let today = Utc::now();

    let months: Vec<Value> = (0..12)
        .rev()
        .map(|i| {
            let mut year = today.year();
            let mut month = today.month() as i32 - i;
            while month < 1 {
                month += 12;
                year -= 1;
            }
            let month_start = chrono::NaiveDate::from_ymd_opt(year, month as u32, 1)
                .unwrap_or_else(|| today.date_naive());

            let detections: u32 = rng.gen_range(400..1200);
            let violations: u32 = rng.gen_range(20..100);

            json!({
                "month": month,
                "year": year,
                "monthName": month_start.format("%B %Y").to_string(),
                "detections": detections,
                "violations": violations,
                "complianceRate": compliance_pct(detections, violations),
                "activeWorkers": rng.gen_range(35..60),
                "workingDays": 22,
                "averagePerDay": (detections as f64 / 22.0).round() as u32,
            })
        })
        .collect();

    Json(json!({
        "success": true,
        "data": months,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// GET /api/realtime-stats - hourly buckets for the last 24 hours.
pub async fn realtime_stats() -> Json<Value> {
    let mut rng = rand::thread_rng();
    let now = Utc::now();

    let hours: Vec<Value> = (0..24i64)
        .rev()
        .map(|i| {
            let bucket = now - Duration::hours(i);
            let detections: u32 = rng.gen_range(5..20);
            let violations: u32 = rng.gen_range(0..3);

            json!({
                "hour": bucket.hour(),
                "timestamp": bucket.to_rfc3339(),
                "timeLabel": bucket.format("%H:%M").to_string(),
                "detections": detections,
                "violations": violations,
                "complianceRate": compliance_pct(detections, violations),
                "activeWorkers": rng.gen_range(10..25),
            })
        })
        .collect();

    Json(json!({
        "success": true,
        "data": hours,
        "timestamp": now.to_rfc3339(),
        "nextUpdate": (now + Duration::seconds(60)).to_rfc3339(),
    }))
}

/// GET /api/ppe/statistics - summary card: live session counters plus a
/// short fabricated recent-day list.
pub async fn statistics(State(state): State<AppState>) -> Json<Value> {
    let stats = state.session.stats().await.stats;

    let mut rng = rand::thread_rng();
    let today = Utc::now();
    let daily: Vec<Value> = (1..=3i64)
        .map(|i| {
            let date = today - Duration::days(i);
            let detections: u32 = rng.gen_range(10..60);
            json!({
                "date": date.format("%Y-%m-%d").to_string(),
                "detections": detections,
                "violations": rng.gen_range(1..9).min(detections),
            })
        })
        .collect();

    Json(json!({
        "totalDetections": stats.total_detections,
        "safeDetections": stats.safe_detections,
        "violations": stats.violations,
        "complianceRate": stats.compliance_rate,
        "dailyStats": daily,
    }))
}

// ---------------------------------------------------------------------------
// Violations
// ---------------------------------------------------------------------------

/// One sample violation served to the dashboard roster.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationRecord {
    id: u32,
    worker_id: String,
    worker_name: String,
    violation_type: String,
    description: String,
    location: String,
    timestamp: i64,
    severity: String,
    status: String,
    image_url: Option<String>,
    confidence: f64,
}

const VIOLATION_WORKERS: [(&str, &str, &str); 5] = [
    ("EMP001", "Adam Clarke", "Main Production Line"),
    ("EMP002", "Maria Santos", "Quality Laboratory"),
    ("EMP003", "Derek Boone", "Maintenance Workshop"),
    ("EMP004", "Alice Carver", "Warehouse Areas"),
    ("EMP005", "Kenji Okada", "Assembly Area"),
];

const MISSING_ITEMS: [&str; 6] = [
    "Safety goggles not worn",
    "Hard hat not worn",
    "Safety vest not worn",
    "Work gloves not worn",
    "Respirator mask not worn",
    "Safety boots not worn",
];

const WRONG_ITEMS: [&str; 4] = [
    "Unsuitable gloves in use",
    "Unsuitable footwear",
    "Outdated safety goggles",
    "Damaged hard hat",
];

fn violation_roster() -> Vec<ViolationRecord> {
    let now = Utc::now().timestamp();
    let severities = ["medium", "high", "low"];
    let confidences = [0.92, 0.87, 0.78, 0.95, 0.89, 0.91, 0.86, 0.73];

    (0..15)
        .map(|i| {
            let (worker_id, worker_name, location) = VIOLATION_WORKERS[i % 5];
            // 2 in 3 are missing-PPE, the rest wrong-PPE
            let (violation_type, description) = if i % 3 == 1 {
                ("Wrong PPE", WRONG_ITEMS[i % WRONG_ITEMS.len()])
            } else {
                ("Missing PPE", MISSING_ITEMS[i % MISSING_ITEMS.len()])
            };

            ViolationRecord {
                id: (i + 1) as u32,
                worker_id: worker_id.to_string(),
                worker_name: worker_name.to_string(),
                violation_type: violation_type.to_string(),
                description: description.to_string(),
                location: location.to_string(),
                // One per hour, most recent first
                timestamp: now - ((i + 1) as i64) * 3600,
                severity: severities[i % 3].to_string(),
                status: if i % 2 == 0 { "open" } else { "resolved" }.to_string(),
                image_url: None,
                confidence: confidences[i % confidences.len()],
            }
        })
        .collect()
}

/// GET /api/violations - dashboard expects a bare array here.
pub async fn violations() -> Json<Vec<ViolationRecord>> {
    Json(violation_roster())
}

/// GET /api/violations/stats
pub async fn violation_stats() -> Json<Value> {
    let roster = violation_roster();
    let today_start = Utc::now().timestamp() - (Utc::now().timestamp() % 86_400);

    let mut by_type = Map::new();
    let mut by_severity = Map::new();
    let mut by_status = Map::new();
    let mut by_location = Map::new();
    let bump = |map: &mut Map<String, Value>, key: &str| {
        let count = map.get(key).and_then(Value::as_u64).unwrap_or(0);
        map.insert(key.to_string(), json!(count + 1));
    };
    for violation in &roster {
        bump(&mut by_type, &violation.violation_type);
        bump(&mut by_severity, &violation.severity);
        bump(&mut by_status, &violation.status);
        bump(&mut by_location, &violation.location);
    }

    let today = roster.iter().filter(|v| v.timestamp >= today_start).count();
    let mut workers: Vec<&str> = roster.iter().map(|v| v.worker_id.as_str()).collect();
    workers.sort_unstable();
    workers.dedup();

    Json(json!({
        "total": roster.len(),
        "today": today,
        "uniqueWorkers": workers.len(),
        "complianceRate": 87.5,
        "byType": by_type,
        "bySeverity": by_severity,
        "byStatus": by_status,
        "byLocation": by_location,
        "trend": { "thisWeek": 15, "lastWeek": 18, "change": -16.7 },
    }))
}

/// PUT /api/violations/:id - echoes the patch with an update stamp.
pub async fn update_violation(
    Path(id): Path<u32>,
    Json(patch): Json<Value>,
) -> Json<Value> {
    let mut updated = match patch {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    updated.insert("id".to_string(), json!(id));
    updated.insert("updatedAt".to_string(), json!(Utc::now().to_rfc3339()));
    Json(Value::Object(updated))
}

/// DELETE /api/violations/:id
pub async fn delete_violation(Path(id): Path<u32>) -> Json<Envelope<Value>> {
    Json(Envelope::ok_with("Violation deleted", json!({ "id": id })))
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

fn settings_document() -> Value {
    json!({
        "camera": {
            "url": "rtsp://192.168.1.100:554/stream",
            "fpsLimit": 30,
            "resolution": "1920x1080",
            "enabled": true,
            "recordingEnabled": false,
            "recordingPath": "/recordings",
            "streamQuality": "high",
        },
        "ai": {
            "modelPath": "model/best.pt",
            "confidenceThreshold": 0.5,
            "nmsThreshold": 0.4,
            "inputSize": 640,
            "batchSize": 1,
            "deviceType": "cpu",
            "enableGPU": false,
            "maxDetections": 100,
        },
        "notifications": {
            "emailEnabled": true,
            "smsEnabled": false,
            "pushEnabled": true,
            "emailRecipients": ["admin@example.com", "safety@example.com"],
            "smsRecipients": ["+15550100"],
            "violationNotifications": true,
            "dailyReports": true,
            "weeklyReports": true,
            "criticalAlerts": true,
        },
        "system": {
            "language": "en",
            "timezone": "UTC",
            "dateFormat": "YYYY-MM-DD",
            "timeFormat": "24h",
            "autoBackup": true,
            "backupInterval": "daily",
            "backupRetention": 30,
            "logLevel": "info",
            "maxLogSize": 100,
            "sessionTimeout": 30,
        },
        "security": {
            "passwordPolicy": {
                "minLength": 8,
                "requireUppercase": true,
                "requireLowercase": true,
                "requireNumbers": true,
                "requireSymbols": false,
                "expirationDays": 90,
            },
            "twoFactorAuth": false,
            "loginAttempts": 5,
            "lockoutDuration": 15,
            "sessionSecurity": "medium",
            "ipWhitelist": [],
            "auditLog": true,
        },
        "performance": {
            "cacheEnabled": true,
            "cacheSize": 256,
            "compressionEnabled": true,
            "optimizeImages": true,
            "lazyLoading": true,
            "maxConcurrentStreams": 4,
            "processingQueue": 10,
            "memoryLimit": 1024,
        },
        "integrations": {
            "database": {
                "host": "localhost",
                "port": 5432,
                "name": "sitewatch",
                "ssl": false,
                "poolSize": 10,
            },
            "api": {
                "rateLimit": 1000,
                "timeout": 30,
                "retryAttempts": 3,
                "enableCors": true,
            },
            "webhook": {
                "enabled": false,
                "url": "",
                "secret": "",
                "events": ["violation", "alert"],
            },
        },
    })
}

/// GET /api/settings
pub async fn settings() -> Json<Value> {
    Json(settings_document())
}

/// PUT /api/settings - no persistence yet; echoes an update stamp.
pub async fn update_settings(Json(patch): Json<Value>) -> Json<Value> {
    let mut updated = match patch {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    updated.insert("updatedAt".to_string(), json!(Utc::now().to_rfc3339()));
    updated.insert("updatedBy".to_string(), json!("admin"));

    Json(json!({
        "message": "Settings updated",
        "settings": Value::Object(updated),
    }))
}

/// GET /api/settings/:category
pub async fn settings_category(Path(category): Path<String>) -> Result<Json<Value>, ApiError> {
    let document = settings_document();
    document
        .get(&category)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("settings category {}", category)))
}

/// PUT /api/settings/:category
pub async fn update_settings_category(
    Path(category): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    if settings_document().get(&category).is_none() {
        return Err(ApiError::NotFound(format!("settings category {}", category)));
    }

    let mut updated = match patch {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    updated.insert("category".to_string(), json!(category));
    updated.insert("updatedAt".to_string(), json!(Utc::now().to_rfc3339()));

    Ok(Json(json!({
        "message": format!("{} settings updated", category),
        "settings": Value::Object(updated),
    })))
}

/// POST /api/settings/reset - resets one category, or everything.
pub async fn reset_settings(Json(body): Json<Value>) -> Json<Value> {
    let message = match body.get("category").and_then(Value::as_str) {
        Some(category) => format!("{} settings reset to defaults", category),
        None => "All settings reset to defaults".to_string(),
    };
    Json(json!({ "message": message }))
}

/// GET /api/settings/health - coarse service health document.
pub async fn settings_health(State(state): State<AppState>) -> Json<Value> {
    let camera = state.session.camera_status().await;

    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "services": {
            "database": { "status": "up" },
            "camera": { "status": if camera.camera_available { "up" } else { "down" } },
            "detection": {
                "status": if camera.is_monitoring { "running" } else { "idle" },
            },
        },
        "version": crate::VERSION,
        "environment": "production",
    }))
}

/// Payload for settings validation.
#[derive(Debug, Default, Deserialize)]
pub struct ValidateSettings {
    pub category: Option<String>,
    #[serde(default)]
    pub settings: Value,
}

/// POST /api/ppe/settings/validate - sanity checks on a proposed category
/// patch. Problems surface as warnings; nothing is rejected outright.
pub async fn validate_settings(Json(body): Json<ValidateSettings>) -> Json<Value> {
    let mut warnings: Vec<String> = Vec::new();
    let category = body.category.as_deref().unwrap_or("");

    if category == "camera" {
        let fps = body
            .settings
            .get("fpsLimit")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        if fps > 60 {
            warnings.push("High FPS limits can degrade performance".to_string());
        }
    }
    if category == "ai" {
        let threshold = body
            .settings
            .get("confidenceThreshold")
            .and_then(Value::as_f64)
            .unwrap_or(1.0);
        if threshold < 0.3 {
            warnings.push("Low confidence thresholds can produce false positives".to_string());
        }
    }

    Json(json!({
        "valid": true,
        "errors": [],
        "warnings": warnings,
    }))
}

/// GET /api/ppe/settings/history - recent configuration changes.
pub async fn settings_history() -> Json<Vec<Value>> {
    let now = Utc::now();
    Json(vec![
        json!({
            "id": 1,
            "category": "camera",
            "action": "update",
            "field": "fpsLimit",
            "oldValue": 25,
            "newValue": 30,
            "changedBy": "admin",
            "timestamp": (now - Duration::hours(2)).to_rfc3339(),
            "reason": "Performance tuning",
        }),
        json!({
            "id": 2,
            "category": "ai",
            "action": "update",
            "field": "confidenceThreshold",
            "oldValue": 0.6,
            "newValue": 0.5,
            "changedBy": "admin",
            "timestamp": (now - Duration::hours(5)).to_rfc3339(),
            "reason": "More sensitive detection",
        }),
        json!({
            "id": 3,
            "category": "notifications",
            "action": "update",
            "field": "emailEnabled",
            "oldValue": false,
            "newValue": true,
            "changedBy": "admin",
            "timestamp": (now - Duration::hours(24)).to_rfc3339(),
            "reason": "Enable email notifications",
        }),
    ])
}

// ---------------------------------------------------------------------------
// Reference data, messages, training
// ---------------------------------------------------------------------------

/// GET /api/departments
pub async fn departments() -> Json<Vec<&'static str>> {
    Json(DEPARTMENTS.to_vec())
}

/// GET /api/locations
pub async fn locations() -> Json<Vec<&'static str>> {
    Json(LOCATIONS.to_vec())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageQuery {
    worker_id: Option<String>,
    status: Option<String>,
    limit: Option<usize>,
}

fn message_roster() -> Vec<Value> {
    let now = Utc::now();
    vec![
        json!({
            "id": 1,
            "workerId": "EMP001",
            "workerName": "Adam Clarke",
            "subject": "Safety training reminder",
            "message": "Please attend the safety training session tomorrow at 14:00.",
            "priority": "high",
            "type": "reminder",
            "status": "read",
            "sentAt": (now - Duration::hours(2)).to_rfc3339(),
            "readAt": (now - Duration::hours(1)).to_rfc3339(),
        }),
        json!({
            "id": 2,
            "workerId": "EMP002",
            "workerName": "Maria Santos",
            "subject": "Missing PPE warning",
            "message": "You were detected without a hard hat today. Please take care.",
            "priority": "medium",
            "type": "warning",
            "status": "sent",
            "sentAt": (now - Duration::hours(4)).to_rfc3339(),
            "readAt": null,
        }),
    ]
}

/// GET /api/messages
pub async fn messages(Query(query): Query<MessageQuery>) -> Json<Vec<Value>> {
    let mut roster = message_roster();

    if let Some(worker_id) = &query.worker_id {
        roster.retain(|m| m["workerId"].as_str() == Some(worker_id.as_str()));
    }
    if let Some(status) = &query.status {
        roster.retain(|m| m["status"].as_str() == Some(status.as_str()));
    }
    roster.truncate(query.limit.unwrap_or(50));

    Json(roster)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    pub worker_id: Option<String>,
    pub worker_name: Option<String>,
    pub worker_email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// POST /api/messages/send
pub async fn send_message(
    Json(payload): Json<SendMessage>,
) -> Result<(StatusCode, Json<Envelope<Value>>), ApiError> {
    let worker_id = payload
        .worker_id
        .ok_or_else(|| ApiError::Validation("workerId is required".to_string()))?;
    let subject = payload
        .subject
        .ok_or_else(|| ApiError::Validation("subject is required".to_string()))?;
    let message = payload
        .message
        .ok_or_else(|| ApiError::Validation("message is required".to_string()))?;

    let data = json!({
        "id": uuid::Uuid::new_v4().to_string(),
        "workerId": worker_id,
        "workerName": payload.worker_name,
        "workerEmail": payload.worker_email,
        "subject": subject,
        "message": message,
        "priority": payload.priority,
        "type": payload.kind,
        "status": "sent",
        "sentAt": Utc::now().to_rfc3339(),
        "readAt": null,
    });

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok_with("Message sent", data)),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingQuery {
    worker_id: Option<String>,
    status: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    limit: Option<usize>,
}

fn training_roster() -> Vec<Value> {
    let now = Utc::now();
    vec![
        json!({
            "id": 1,
            "workerId": "EMP001",
            "workerName": "Adam Clarke",
            "title": "Basic Occupational Safety",
            "description": "Core safety rules and proper PPE use",
            "type": "safety",
            "duration": 120,
            "scheduledDate": (now + Duration::days(1)).format("%Y-%m-%d").to_string(),
            "location": "Training Room A",
            "instructor": "J. Whitfield",
            "mandatory": true,
            "status": "scheduled",
            "createdAt": (now - Duration::days(2)).to_rfc3339(),
        }),
        json!({
            "id": 2,
            "workerId": "EMP002",
            "workerName": "Maria Santos",
            "title": "Chemical Handling Safety",
            "description": "Chemical substance handling and precautions",
            "type": "chemical",
            "duration": 90,
            "scheduledDate": (now + Duration::days(3)).format("%Y-%m-%d").to_string(),
            "location": "Laboratory",
            "instructor": "Dr. R. Adeyemi",
            "mandatory": true,
            "status": "scheduled",
            "createdAt": (now - Duration::days(1)).to_rfc3339(),
        }),
    ]
}

/// GET /api/training
pub async fn training(Query(query): Query<TrainingQuery>) -> Json<Vec<Value>> {
    let mut roster = training_roster();

    if let Some(worker_id) = &query.worker_id {
        roster.retain(|t| t["workerId"].as_str() == Some(worker_id.as_str()));
    }
    if let Some(status) = &query.status {
        roster.retain(|t| t["status"].as_str() == Some(status.as_str()));
    }
    if let Some(kind) = &query.kind {
        roster.retain(|t| t["type"].as_str() == Some(kind.as_str()));
    }
    roster.truncate(query.limit.unwrap_or(50));

    Json(roster)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTraining {
    pub worker_id: Option<String>,
    pub worker_name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub duration: Option<u32>,
    pub scheduled_date: Option<String>,
    pub location: Option<String>,
    pub instructor: Option<String>,
    pub mandatory: Option<bool>,
}

/// POST /api/training/schedule
pub async fn schedule_training(
    Json(payload): Json<ScheduleTraining>,
) -> Result<(StatusCode, Json<Envelope<Value>>), ApiError> {
    let worker_id = payload
        .worker_id
        .ok_or_else(|| ApiError::Validation("workerId is required".to_string()))?;
    let title = payload
        .title
        .ok_or_else(|| ApiError::Validation("title is required".to_string()))?;
    let scheduled_date = payload
        .scheduled_date
        .ok_or_else(|| ApiError::Validation("scheduledDate is required".to_string()))?;

    let now = Utc::now().to_rfc3339();
    let data = json!({
        "id": uuid::Uuid::new_v4().to_string(),
        "workerId": worker_id,
        "workerName": payload.worker_name,
        "title": title,
        "description": payload.description,
        "type": payload.kind,
        "duration": payload.duration,
        "scheduledDate": scheduled_date,
        "location": payload.location,
        "instructor": payload.instructor,
        "mandatory": payload.mandatory,
        "status": "scheduled",
        "createdAt": now,
        "updatedAt": now,
        "completedAt": null,
        "score": null,
        "feedback": null,
    });

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok_with("Training scheduled", data)),
    ))
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let camera = state.session.camera_status().await;

    Json(json!({
        "status": "healthy",
        "service": crate::NAME,
        "version": crate::VERSION,
        "detectorReachable": camera.camera_available,
        "isMonitoring": camera.is_monitoring,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::state_with;
    use crate::session::test_support::StubDetector;

    #[tokio::test]
    async fn test_daily_stats_shape() {
        let response = daily_stats().await;
        let data = &response.0["data"];

        let days = data["dailyData"].as_array().unwrap();
        assert_eq!(days.len(), 30);
        for day in days {
            let rate = day["complianceRate"].as_u64().unwrap();
            assert!(rate <= 100);
            assert_eq!(
                day["detections"].as_u64().unwrap(),
                day["violations"].as_u64().unwrap() + day["safeDetections"].as_u64().unwrap()
            );
            assert_eq!(day["hourlyBreakdown"].as_array().unwrap().len(), 10);
        }

        assert_eq!(data["topViolationDays"].as_array().unwrap().len(), 5);
        assert_eq!(data["topPerformanceDays"].as_array().unwrap().len(), 5);
        assert_eq!(response.0["period"]["totalDays"], 30);
        assert!(data["summary"]["totalDetections"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_weekly_and_monthly_lengths() {
        let weekly = weekly_stats().await;
        assert_eq!(weekly.0["data"].as_array().unwrap().len(), 12);

        let monthly = monthly_stats().await;
        let months = monthly.0["data"].as_array().unwrap();
        assert_eq!(months.len(), 12);
        for month in months {
            let m = month["month"].as_u64().unwrap();
            assert!((1..=12).contains(&m));
        }
    }

    #[tokio::test]
    async fn test_realtime_covers_24_hours() {
        let response = realtime_stats().await;
        assert_eq!(response.0["data"].as_array().unwrap().len(), 24);
        assert!(response.0["nextUpdate"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_violation_roster_is_descending() {
        let roster = violations().await.0;
        assert_eq!(roster.len(), 15);
        for pair in roster.windows(2) {
            assert!(pair[0].timestamp > pair[1].timestamp);
        }
    }

    #[tokio::test]
    async fn test_violation_wire_keys_are_camel_case() {
        let roster = violations().await.0;
        let wire = serde_json::to_value(&roster[0]).unwrap();
        let keys = wire.as_object().unwrap();

        assert!(keys.contains_key("workerId"));
        assert!(keys.contains_key("workerName"));
        assert!(keys.contains_key("violationType"));
        assert!(keys.contains_key("imageUrl"));
        assert!(!keys.contains_key("worker_id"));
    }

    #[tokio::test]
    async fn test_statistics_mirrors_session_counters() {
        let state = state_with(StubDetector::down());

        let response = statistics(State(state)).await;
        assert_eq!(response.0["totalDetections"], 0);
        assert_eq!(response.0["complianceRate"], 0);
        assert_eq!(response.0["dailyStats"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_settings_validation_warnings() {
        let clean = validate_settings(Json(ValidateSettings {
            category: Some("camera".to_string()),
            settings: json!({ "fpsLimit": 30 }),
        }))
        .await;
        assert_eq!(clean.0["valid"], true);
        assert!(clean.0["warnings"].as_array().unwrap().is_empty());

        let high_fps = validate_settings(Json(ValidateSettings {
            category: Some("camera".to_string()),
            settings: json!({ "fpsLimit": 90 }),
        }))
        .await;
        assert_eq!(high_fps.0["warnings"].as_array().unwrap().len(), 1);

        let low_threshold = validate_settings(Json(ValidateSettings {
            category: Some("ai".to_string()),
            settings: json!({ "confidenceThreshold": 0.2 }),
        }))
        .await;
        assert_eq!(low_threshold.0["warnings"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_settings_history_entries() {
        let history = settings_history().await;
        assert_eq!(history.0.len(), 3);
        for entry in &history.0 {
            assert!(entry["category"].as_str().is_some());
            assert!(entry["changedBy"].as_str().is_some());
        }
    }

    #[tokio::test]
    async fn test_violation_stats_counts_match() {
        let stats = violation_stats().await.0;
        assert_eq!(stats["total"], 15);

        let by_type = stats["byType"].as_object().unwrap();
        let sum: u64 = by_type.values().map(|v| v.as_u64().unwrap()).sum();
        assert_eq!(sum, 15);
        assert_eq!(stats["uniqueWorkers"], 5);
    }

    #[tokio::test]
    async fn test_settings_category_lookup() {
        let camera = settings_category(Path("camera".to_string())).await.unwrap();
        assert_eq!(camera.0["fpsLimit"], 30);

        let unknown = settings_category(Path("nope".to_string())).await;
        assert!(matches!(unknown, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_send_message_validation() {
        let missing = send_message(Json(SendMessage {
            worker_id: Some("EMP001".to_string()),
            subject: Some("Hello".to_string()),
            ..Default::default()
        }))
        .await;
        assert!(matches!(missing, Err(ApiError::Validation(_))));

        let (status, sent) = send_message(Json(SendMessage {
            worker_id: Some("EMP001".to_string()),
            subject: Some("Hello".to_string()),
            message: Some("Body".to_string()),
            ..Default::default()
        }))
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert!(sent.0.success);
        assert_eq!(sent.0.data["status"], "sent");
    }

    #[tokio::test]
    async fn test_schedule_training_validation() {
        let missing = schedule_training(Json(ScheduleTraining {
            worker_id: Some("EMP001".to_string()),
            title: Some("Safety 101".to_string()),
            ..Default::default()
        }))
        .await;
        assert!(matches!(missing, Err(ApiError::Validation(_))));

        let (status, scheduled) = schedule_training(Json(ScheduleTraining {
            worker_id: Some("EMP001".to_string()),
            title: Some("Safety 101".to_string()),
            scheduled_date: Some("2026-09-15".to_string()),
            ..Default::default()
        }))
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(scheduled.0.data["status"], "scheduled");
    }

    #[tokio::test]
    async fn test_message_filters() {
        let all = messages(Query(MessageQuery {
            worker_id: None,
            status: None,
            limit: None,
        }))
        .await;
        assert_eq!(all.0.len(), 2);

        let filtered = messages(Query(MessageQuery {
            worker_id: Some("EMP001".to_string()),
            status: None,
            limit: None,
        }))
        .await;
        assert_eq!(filtered.0.len(), 1);
    }

    #[tokio::test]
    async fn test_health_reports_monitoring_state() {
        let state = state_with(StubDetector::down());

        let response = health(State(state.clone())).await;
        assert_eq!(response.0["isMonitoring"], false);
        assert_eq!(response.0["detectorReachable"], false);

        state.session.start().await;
        let response = health(State(state)).await;
        assert_eq!(response.0["isMonitoring"], true);
    }
}
