use std::future::Future;

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error::ApiError, AppState};
use crate::domain::AssetKind;
use crate::sync::{SyncError, SyncReport};

pub async fn run_full_sync(State(st): State<AppState>) -> Result<Json<SyncReport>, ApiError> {
    let synchronizer = st.synchronizer.clone();
    detached(async move { synchronizer.run_all().await }).await
}

pub async fn run_asset_sync(
    State(st): State<AppState>,
    Path(asset): Path<String>,
) -> Result<Json<SyncReport>, ApiError> {
    let asset: AssetKind = asset
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("unknown asset type `{asset}`")))?;
    let synchronizer = st.synchronizer.clone();
    detached(async move { synchronizer.run(asset).await }).await
}

/// Runs on its own task so a dropped request cannot stop a run between rows.
async fn detached<F>(run: F) -> Result<Json<SyncReport>, ApiError>
where
    F: Future<Output = Result<SyncReport, SyncError>> + Send + 'static,
{
    let report = tokio::spawn(run)
        .await
        .map_err(|e| ApiError::InternalError(format!("sync task failed: {e}")))??;
    Ok(Json(report))
}
