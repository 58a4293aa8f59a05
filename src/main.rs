// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Survey Form Service
//!
//! Serves the survey form and records submissions.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (a `.env` file is
//! honoured):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `STORE_BACKEND`: `influx` or `memory` (default: influx)
//! - `INFLUX_URL`: InfluxDB base URL (default: http://127.0.0.1:8086)
//! - `INFLUX_DATABASE` / `INFLUX_MEASUREMENT`: target database and measurement (default: survey)
//! - `INFLUX_USERNAME` / `INFLUX_PASSWORD`: basic auth credentials
//! - `INFLUX_TIMEOUT_MS`: per-request timeout (default: 5000)
//! - `DEDUP_WINDOW_SECS`: one-entry-per-e-mail window (default: 86400)
//! - `COOKIE_MAX_AGE_SECS`: visitor cookie lifetime (default: 2592000)
//! - `METRICS_ENABLED`: expose `/metrics` (default: true)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use survey_form::{config::Config, handlers::router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::from_env();
    info!(
        bind_addr = %config.bind_addr,
        backend = ?config.store.backend,
        database = %config.store.database,
        dedup_window_secs = config.store.dedup_window_secs,
        "Starting survey form service"
    );

    let state = Arc::new(AppState::new(config.clone())?);

    // Spawn cleanup task
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            cleanup_state.recorder.cleanup().await;
        }
    });

    let app = router(state);

    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
