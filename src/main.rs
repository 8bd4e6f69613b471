use std::sync::Arc;

use anyhow::{Context, Result};
use distgrid::{api, config, source, telemetry, upload, Network, SyncOptions, Synchronizer};
use config::Config;
use telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("reading .env");
        }
    }
    init_tracing();

    let cfg = Config::load()?;

    let source = source::connect(&cfg.source)
        .await
        .context("opening source dataset")?;
    let uploader = upload::from_config(&cfg.upload)?;
    let network = Network::new(cfg.length_metric());
    let synchronizer = Arc::new(Synchronizer::new(
        source,
        uploader,
        network,
        SyncOptions::from(&cfg.sync),
    ));

    if cfg.sync.run_on_startup {
        let report = synchronizer.run_all().await?;
        if !report.is_clean() {
            warn!(run_id = %report.run_id, aborted = report.aborted, "startup synchronization incomplete");
        }
    }

    let app = api::router(api::AppState::new(synchronizer), &cfg);
    let addr = cfg.server.socket_addr()?;

    if cfg.server.host == "0.0.0.0" {
        warn!("binding to 0.0.0.0, the API is reachable from the network");
    }

    info!(%addr, "starting distgrid");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
