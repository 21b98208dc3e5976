// Copyright (c) 2026 sitewatch
// Licensed under the MIT License. See LICENSE file in the project root.

//! Detector client - thin HTTP wrapper around the external PPE detector
//! process

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::DetectorConfig;
use crate::session::stats::{AggregateStats, Detection};

/// Detector call failures.
///
/// Every variant means "backend unavailable" to the session layer; callers
/// must not retry here - retry/fallback is the session's responsibility.
#[derive(Error, Debug)]
pub enum DetectorError {
    /// Network failure or timeout reaching the detector
    #[error("detector unreachable: {0}")]
    Unavailable(String),

    /// Detector answered with a non-success status
    #[error("detector returned status {0}")]
    BadStatus(u16),
}

impl From<reqwest::Error> for DetectorError {
    fn from(err: reqwest::Error) -> Self {
        DetectorError::Unavailable(err.to_string())
    }
}

/// Seam between the session machine and the detection source.
#[async_trait]
pub trait DetectorBackend: Send + Sync {
    /// Probe the detector's `/health` endpoint. Never fails; unreachable
    /// means `false`.
    async fn health(&self) -> bool;

    /// Ask the detector to begin inference.
    async fn start(&self) -> Result<(), DetectorError>;

    /// Ask the detector to stop inference.
    async fn stop(&self) -> Result<(), DetectorError>;

    /// Fetch the detector's recent detections.
    async fn fetch_detections(&self) -> Result<Vec<Detection>, DetectorError>;

    /// Fetch the detector's aggregate statistics.
    async fn fetch_stats(&self) -> Result<AggregateStats, DetectorError>;

    /// Fetch the last captured camera frame, raw bytes.
    async fn fetch_frame(&self) -> Result<Vec<u8>, DetectorError>;
}

#[derive(Debug, Deserialize)]
struct DetectionsPayload {
    #[serde(default)]
    detections: Vec<Detection>,
}

#[derive(Debug, Deserialize)]
struct StatsPayload {
    #[serde(default)]
    stats: AggregateStats,
}

/// HTTP client for the external detector. Stateless: every call is a fresh
/// request with a bounded timeout, no caching, no retries.
pub struct DetectorClient {
    base_url: String,
    http: reqwest::Client,
}

impl DetectorClient {
    /// Build a client from configuration.
    pub fn new(config: &DetectorConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn check_status(response: &reqwest::Response) -> Result<(), DetectorError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DetectorError::BadStatus(status.as_u16()))
        }
    }
}

#[async_trait]
impl DetectorBackend for DetectorClient {
    async fn health(&self) -> bool {
        match self.http.get(self.url("/health")).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                debug!("Detector health probe failed: {}", err);
                false
            }
        }
    }

    async fn start(&self) -> Result<(), DetectorError> {
        let response = self.http.post(self.url("/ppe/start")).send().await?;
        Self::check_status(&response)
    }

    async fn stop(&self) -> Result<(), DetectorError> {
        let response = self.http.post(self.url("/ppe/stop")).send().await?;
        Self::check_status(&response)
    }

    async fn fetch_detections(&self) -> Result<Vec<Detection>, DetectorError> {
        let response = self.http.get(self.url("/ppe/detections")).send().await?;
        Self::check_status(&response)?;

        let payload: DetectionsPayload = response.json().await?;
        Ok(payload.detections)
    }

    async fn fetch_stats(&self) -> Result<AggregateStats, DetectorError> {
        let response = self.http.get(self.url("/ppe/stats")).send().await?;
        Self::check_status(&response)?;

        let payload: StatsPayload = response.json().await?;
        Ok(payload.stats)
    }

    async fn fetch_frame(&self) -> Result<Vec<u8>, DetectorError> {
        let response = self.http.get(self.url("/camera/stream")).send().await?;
        Self::check_status(&response)?;

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}
