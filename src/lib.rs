// Copyright (c) 2026 sitewatch
// Licensed under the MIT License. See LICENSE file in the project root.

//! SiteWatch - PPE Compliance Monitoring Backend
//!
//! REST backend for a personal-protective-equipment compliance dashboard:
//! - Detection session lifecycle (start/stop) with a pluggable backend
//! - Remote detector proxying with automatic synthetic fallback
//! - Bounded detection retention and running compliance statistics
//! - Worker records (SQLite) with compliance metrics
//! - Dashboard analytics (daily/weekly/monthly/realtime, violations, settings)
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                     HTTP API (axum)                       │
//! ├───────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌───────────────┐   ┌─────────────────┐   │
//! │  │ Session  │ → │ Detector      │   │ Worker Store    │   │
//! │  │ Machine  │   │ Client (HTTP) │   │ (SQLite)        │   │
//! │  └──────────┘   └───────────────┘   └─────────────────┘   │
//! │       ↓ fallback                                          │
//! │  ┌──────────────────┐   ┌──────────────────────────────┐  │
//! │  │ Synthetic Feed   │ → │ Retention Buffer + Stats     │  │
//! │  └──────────────────┘   └──────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![allow(dead_code)]

pub mod api;
pub mod config;
pub mod detector;
pub mod error;
pub mod session;
pub mod workers;

// Re-exports for convenience
pub use config::Config;
pub use detector::{DetectorBackend, DetectorClient, DetectorError};
pub use error::ApiError;
pub use session::{AggregateStats, Detection, FeedMode, Session, StartOutcome};
pub use workers::WorkerStore;

/// SiteWatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// SiteWatch name
pub const NAME: &str = "SiteWatch";
