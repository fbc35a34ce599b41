mod api;
mod config;
mod db;
mod error;
mod extract;
mod fetcher;
mod poller;
mod rtp;
mod state;
mod types;
mod wire;

use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::{broadcast, mpsc};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::api::routes::{self, AppState};
use crate::api::ws::ClientRegistry;
use crate::config::{Config, Pipeline, CHANNEL_CAPACITY, PUSH_BUFFER};
use crate::db::DbWriter;
use crate::fetcher::UpstreamClient;
use crate::poller::Poller;
use crate::rtp::{BayesianEngine, DeriveMetrics, DirectDisplayEngine};
use crate::state::SnapshotStore;

#[tokio::main]
async fn main() -> error::Result<()> {
    let cfg = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cfg.log_level.clone())),
        )
        .init();

    info!(pipeline = %cfg.pipeline, db = %cfg.db_path, "rtp monitor starting");

    let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", cfg.db_path)).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let store = SnapshotStore::new();
    let health = Arc::new(HealthState::default());
    let latency = Arc::new(LatencyStats::new());
    let registry = Arc::new(ClientRegistry::default());
    let (push_tx, _) = broadcast::channel::<String>(PUSH_BUFFER);
    let (db_tx, db_rx) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::spawn(DbWriter::new(pool.clone(), db_rx).run());

    let client = Arc::new(UpstreamClient::new(&cfg)?);
    let engine: Box<dyn DeriveMetrics> = match cfg.pipeline {
        Pipeline::Bayesian => Box::new(BayesianEngine::new(cfg.asset_base_url.clone())),
        Pipeline::Direct => Box::new(DirectDisplayEngine::new(cfg.asset_base_url.clone())),
    };
    tokio::spawn(
        Poller::new(
            &cfg,
            client,
            Arc::clone(&store),
            Arc::clone(&health),
            Arc::clone(&latency),
            push_tx.clone(),
            db_tx,
            engine,
        )
        .run(),
    );

    let app = routes::router(AppState {
        pool,
        store,
        health,
        latency,
        push_tx,
        registry,
        retention_days: cfg.retention_days,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.api_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "api listening");
    axum::serve(listener, app).await?;
    Ok(())
}
