//! Site photo uploads. Substations and transformers reference a local image
//! file in the source; the derived store keeps the public URL instead.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use thiserror::Error;
use tracing::debug;

use crate::config::UploadConfig;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("upload request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("storage rejected upload: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileUploader: Send + Sync {
    /// Uploads `path` under `name` and returns the URL to store.
    async fn upload(&self, path: &Path, name: &str) -> Result<String, UploadError>;
}

/// Object storage speaking the `PUT /object/{bucket}/{name}` convention.
#[derive(Clone)]
pub struct HttpUploader {
    base_url: String,
    bucket: String,
    client: reqwest::Client,
}

impl HttpUploader {
    pub fn new(base_url: &str, bucket: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("distgrid/0.1"));
        headers.insert("x-upsert", HeaderValue::from_static("true"));
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {key}"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            client,
        })
    }

    fn object_url(&self, name: &str) -> String {
        format!("{}/object/{}/{}", self.base_url, self.bucket, name)
    }

    pub fn public_url(&self, name: &str) -> String {
        format!("{}/object/public/{}/{}", self.base_url, self.bucket, name)
    }
}

#[async_trait]
impl FileUploader for HttpUploader {
    async fn upload(&self, path: &Path, name: &str) -> Result<String, UploadError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| UploadError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let resp = self
            .client
            .put(self.object_url(name))
            .header(CONTENT_TYPE, "image/*")
            .body(bytes)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(name, "uploaded image");
        Ok(self.public_url(name))
    }
}

/// Keeps the source path as the stored reference.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledUploader;

#[async_trait]
impl FileUploader for DisabledUploader {
    async fn upload(&self, path: &Path, _name: &str) -> Result<String, UploadError> {
        Ok(path.display().to_string())
    }
}

pub fn from_config(cfg: &UploadConfig) -> Result<Arc<dyn FileUploader>> {
    if !cfg.enabled {
        return Ok(Arc::new(DisabledUploader));
    }
    let uploader = HttpUploader::new(
        &cfg.base_url,
        &cfg.bucket,
        cfg.api_key.as_deref(),
        Duration::from_secs(cfg.timeout_secs),
    )?;
    Ok(Arc::new(uploader))
}
