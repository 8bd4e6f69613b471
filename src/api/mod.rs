pub mod error;
pub mod map;
pub mod sync;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::{config::Config, network::Network, sync::Synchronizer};

#[derive(Clone)]
pub struct AppState {
    pub network: Network,
    pub synchronizer: Arc<Synchronizer>,
}

impl AppState {
    pub fn new(synchronizer: Arc<Synchronizer>) -> Self {
        Self {
            network: synchronizer.network().clone(),
            synchronizer,
        }
    }
}

pub fn v1_router(state: AppState, request_timeout: Duration) -> Router {
    // Sync runs are not bounded by the request timeout; they answer with the
    // report once every pass has finished.
    let sync_routes = Router::new()
        .route("/sync", put(sync::run_full_sync))
        .route("/sync/:asset", put(sync::run_asset_sync));

    Router::new()
        .route("/mapdata", get(map::get_mapdata))
        .route("/ws/mapdata", get(map::mapdata_ws))
        .route("/substations/:name/status", post(map::set_substation_status))
        .route("/healthz", get(map::healthz))
        .layer(TimeoutLayer::new(request_timeout))
        .merge(sync_routes)
        .with_state(state)
}

pub fn router(state: AppState, cfg: &Config) -> Router {
    let request_timeout = Duration::from_secs(cfg.server.request_timeout_secs);
    let mut router = Router::new().nest("/api/v1", v1_router(state, request_timeout));

    if cfg.server.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE]);
        router = router.layer(cors);
    }

    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024)),
    )
}
