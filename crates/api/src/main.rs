//! `sls-api`: service binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (tracing + optional OTLP).
//! 3. Read the integration files from `CONFIG_DIR`.
//! 4. Build the state of every enabled integration.
//! 5. Spawn background tasks: access-file allow-list refresh.
//! 6. Build the Axum router and serve HTTP or HTTPS until shutdown.

mod accessfiles;
mod apidocs;
mod auth;
mod config;
mod db;
mod editions;
mod error;
mod filemaker;
mod oai;
mod server;
mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use accessfiles::{AccessFilesState, AllowList, SwiftClient};
use auth::{AuthState, SqlUserStore, TokenIssuer};
use config::{Config, Integrations};
use editions::EditionsState;
use filemaker::FileMakerState;
use oai::{OaiState, Repository, SqlMetadataStore};
use server::state::AppState;

fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    let mut runtime = tokio::runtime::Builder::new_multi_thread();
    runtime.enable_all();
    if let Some(threads) = cfg.worker_threads {
        runtime.worker_threads(threads);
    }
    let runtime = runtime.build().context("failed to build tokio runtime")?;

    runtime.block_on(run(cfg))
}

async fn run(cfg: Config) -> Result<()> {
    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %cfg.listen_socket(),
        tls = cfg.tls_paths().is_some(),
        "sls-api starting"
    );

    // -----------------------------------------------------------------------
    // 3. Integration files
    // -----------------------------------------------------------------------
    let integrations = Integrations::load(&cfg.config_dir)?;
    info!(
        config_dir = %cfg.config_dir.display(),
        enabled = ?integrations.enabled(),
        "integration files loaded"
    );

    // -----------------------------------------------------------------------
    // 4. Integration state
    // -----------------------------------------------------------------------
    let mut state = AppState {
        request_timeout_secs: cfg.request_timeout_secs,
        ..Default::default()
    };

    if let Some(oai_cfg) = &integrations.oai {
        let conn = db::connect("oai", &oai_cfg.database).await?;
        state.oai = Some(OaiState::new(
            Arc::new(SqlMetadataStore::new(conn)),
            Repository::from(oai_cfg),
            cfg.tls_paths().is_some(),
        ));
    }

    if let Some(swift_cfg) = &integrations.swift {
        let allowlist = AllowList::new();
        let entries = allowlist.load(&swift_cfg.allowlist_path).await?;
        info!(entries, path = %swift_cfg.allowlist_path.display(), "access-file allow-list loaded");

        // -------------------------------------------------------------------
        // 5. Background tasks
        // -------------------------------------------------------------------
        let _allowlist_refresh = accessfiles::allowlist::refresh_task(
            allowlist.clone(),
            swift_cfg.allowlist_path.clone(),
            Duration::from_secs(cfg.allowlist_refresh_interval_secs),
        );

        state.accessfiles = Some(AccessFilesState {
            allowlist,
            swift: Arc::new(SwiftClient::new(swift_cfg)?),
        });
    }

    if let Some(fm_cfg) = &integrations.filemaker {
        state.filemaker = Some(FileMakerState::new(fm_cfg)?);
    }

    if let Some(editions_cfg) = &integrations.editions {
        state.editions = Some(EditionsState::connect(editions_cfg).await?);
    }

    if let Some(auth_db) = &integrations.auth {
        let secret = cfg.require_jwt_secret()?;
        let conn = db::connect("auth", auth_db).await?;
        state.auth = Some(AuthState {
            users: Arc::new(SqlUserStore::new(conn)),
            tokens: Arc::new(TokenIssuer::new(
                secret,
                cfg.access_token_ttl_secs,
                cfg.refresh_token_ttl_secs,
            )),
        });
    }

    // -----------------------------------------------------------------------
    // 6. HTTP server
    // -----------------------------------------------------------------------
    let app = server::router::build(state);
    let addr = cfg.listen_socket();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "listening");

    match cfg.tls_paths() {
        Some((cert, key)) => {
            let tls = server::tls::load_server_config(cert, key)?;
            server::tls::serve(listener, tls, app, shutdown_signal()).await?;
        }
        None => {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("HTTP server failed")?;
        }
    }

    info!("sls-api stopped");
    telemetry::shutdown();
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl-C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
