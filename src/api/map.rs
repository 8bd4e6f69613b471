use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use super::{error::ApiError, AppState};
use crate::network::Network;
use crate::snapshot::{MapSnapshot, StatusChange};

pub async fn get_mapdata(State(st): State<AppState>) -> Json<MapSnapshot> {
    Json(st.network.snapshot().await)
}

/// Sends the full map on connect and again after every status change.
pub async fn mapdata_ws(ws: WebSocketUpgrade, State(st): State<AppState>) -> Response {
    let network = st.network.clone();
    ws.on_upgrade(move |socket| stream_mapdata(socket, network))
}

async fn stream_mapdata(mut socket: WebSocket, network: Network) {
    let mut changes = network.subscribe();
    if send_snapshot(&mut socket, &network).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            change = changes.recv() => match change {
                Ok(_) | Err(RecvError::Lagged(_)) => {
                    if send_snapshot(&mut socket, &network).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            msg = socket.recv() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("map websocket closed");
}

async fn send_snapshot(socket: &mut WebSocket, network: &Network) -> anyhow::Result<()> {
    let text = serde_json::to_string(&network.snapshot().await)?;
    socket.send(Message::Text(text)).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub active: bool,
}

pub async fn set_substation_status(
    State(st): State<AppState>,
    Path(name): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<StatusChange>, ApiError> {
    let change = st
        .network
        .set_substation_active(&name, update.active)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("substation {name}")))?;
    info!(
        substation = %change.name,
        active = change.active,
        propagated = change.propagated.total(),
        "substation status updated"
    );
    Ok(Json(change))
}

pub async fn healthz() -> impl IntoResponse {
    axum::http::StatusCode::OK
}
