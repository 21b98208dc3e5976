// Copyright (c) 2026 sitewatch
// Licensed under the MIT License. See LICENSE file in the project root.

//! SiteWatch - PPE Compliance Monitoring Backend
//!
//! HTTP backend for a workplace safety dashboard: proxies a remote PPE
//! detector when one is reachable, falls back to a synthetic detection
//! feed when it is not, and serves worker records plus reporting data.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use sitewatch::{Config, VERSION};

/// SiteWatch - PPE compliance monitoring backend
#[derive(Parser, Debug)]
#[command(name = "sitewatch")]
#[command(version = VERSION)]
#[command(about = "PPE compliance monitoring and reporting backend")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Remote detector base URL
    #[arg(long)]
    detector_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Data output directory
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("SiteWatch v{} - PPE compliance monitoring backend", VERSION);

    // Load or create configuration
    let config_path = args.config.unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Override with command line args
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(detector_url) = args.detector_url {
        config.detector.base_url = detector_url;
    }
    if let Some(data_dir) = args.data_dir {
        config.database.path = data_dir.join("sitewatch.db");
        config.data_dir = data_dir;
    }

    info!("Configuration loaded from {:?}", config_path);
    info!("Detector endpoint: {}", config.detector.base_url);

    sitewatch::api::serve(config).await
}
