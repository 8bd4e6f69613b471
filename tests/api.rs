//! HTTP surface driven through the router without binding a socket.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use distgrid::api::{self, AppState};
use distgrid::config::Config;
use distgrid::domain::{GeoJson, LengthMetric};
use distgrid::source::{MemorySource, NodeRecord, PrimaryLineRecord, SourceDataset, SubstationRecord};
use distgrid::upload::{DisabledUploader, FileUploader, UploadError};
use distgrid::{Network, SyncOptions, Synchronizer};

fn app() -> Router {
    let dataset = SourceDataset {
        substations: vec![SubstationRecord {
            generator_id: Some("S1".to_string()),
            geom: Some(GeoJson::Point([0.0, 0.0]).into()),
            ..Default::default()
        }],
        nodes: vec![NodeRecord {
            bus_id: Some("B".to_string()),
            geom: Some(GeoJson::Point([1.0, 0.0]).into()),
            description: Some("Primary Bus".to_string()),
            ..Default::default()
        }],
        primary_lines: vec![PrimaryLineRecord {
            primary_line_id: Some("L1".to_string()),
            geom: Some(GeoJson::LineString(vec![[0.0, 0.0], [1.0, 0.0]]).into()),
            ..Default::default()
        }],
        ..Default::default()
    };
    let synchronizer = Arc::new(Synchronizer::new(
        Arc::new(MemorySource::new(dataset)),
        Arc::new(DisabledUploader),
        Network::new(LengthMetric::Planar),
        SyncOptions::default(),
    ));
    api::router(AppState::new(synchronizer), &Config::default())
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn put(uri: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn status_update(name: &str, active: bool) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/v1/substations/{name}/status"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::json!({ "active": active }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_sync_then_mapdata() {
    let app = app();

    let (status, report) = send(&app, put("/api/v1/sync")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["aborted"], false);
    assert_eq!(report["passes"].as_array().unwrap().len(), 8);

    let (status, map) = send(
        &app,
        Request::builder().uri("/api/v1/mapdata").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let line = &map["primary_lines"][0];
    assert_eq!(line["type"], "Feature");
    assert_eq!(line["geometry"]["type"], "LineString");
    assert_eq!(line["properties"]["from_node"], "S1");
    assert_eq!(line["properties"]["to_node"], "B");
    assert_eq!(map["substations"][0]["properties"]["voltage_rating"], 13.2);
}

#[tokio::test]
async fn test_status_update_propagates() {
    let app = app();
    send(&app, put("/api/v1/sync")).await;

    let (status, change) = send(&app, status_update("S1", false)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(change["active"], false);
    assert_eq!(change["propagated"]["primary_lines"], 1);
}

#[tokio::test]
async fn test_unknown_substation_is_not_found() {
    let (status, body) = send(&app(), status_update("nope", true)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
    assert!(body["message"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn test_single_asset_sync() {
    let app = app();
    let (status, report) = send(&app, put("/api/v1/sync/substation")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["passes"][0]["asset"], "substation");
    assert_eq!(report["passes"][0]["inserted"], 1);

    let (status, _) = send(&app, put("/api/v1/sync/feeder")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_healthz() {
    let (status, _) = send(
        &app(),
        Request::builder().uri("/api/v1/healthz").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

/// Takes longer per file than a short request timeout allows for a whole run.
struct SlowUploader;

#[async_trait]
impl FileUploader for SlowUploader {
    async fn upload(&self, _path: &Path, name: &str) -> Result<String, UploadError> {
        tokio::time::sleep(Duration::from_millis(700)).await;
        Ok(format!("https://cdn.example/{name}.jpg"))
    }
}

#[tokio::test]
async fn test_sync_outlives_request_timeout() {
    let substations = (1..=3)
        .map(|i| SubstationRecord {
            generator_id: Some(format!("S{i}")),
            geom: Some(GeoJson::Point([i as f64, 0.0]).into()),
            image: Some(format!("photos/s{i}.jpg")),
            ..Default::default()
        })
        .collect();
    let synchronizer = Arc::new(Synchronizer::new(
        Arc::new(MemorySource::new(SourceDataset {
            substations,
            ..Default::default()
        })),
        Arc::new(SlowUploader),
        Network::new(LengthMetric::Planar),
        SyncOptions::default(),
    ));
    let network = synchronizer.network().clone();
    let mut cfg = Config::default();
    cfg.server.request_timeout_secs = 1;
    let app = api::router(AppState::new(synchronizer), &cfg);

    let (status, report) = send(&app, put("/api/v1/sync/substation")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["passes"][0]["inserted"], 3);
    assert!(report["passes"][0]["failures"].as_array().unwrap().is_empty());
    let tables = network.store().dump().await;
    assert_eq!(tables.substations.len(), 3);
    assert_eq!(
        tables.substations.get_by_key("S3").unwrap().image.as_deref(),
        Some("https://cdn.example/S3.jpg")
    );
}
