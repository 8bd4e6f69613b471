use anyhow::Result;
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::domain::LengthMetric;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub enable_cors: bool,
}
impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}
impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, request_timeout_secs: 30, enable_cors: false }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    File,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// JSON dataset read by the file source.
    pub path: PathBuf,
    /// Connection string of the postgres source.
    pub url: Option<String>,
}
impl Default for SourceConfig {
    fn default() -> Self {
        Self { kind: SourceKind::File, path: PathBuf::from("data/source.json"), url: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub partition_concurrency: usize,
    pub max_convergence_rounds: usize,
    pub run_on_startup: bool,
    /// Unset picks the metric that matches the source's coordinates, see
    /// [`Config::length_metric`].
    pub length_metric: Option<LengthMetric>,
}
impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            partition_concurrency: 4,
            max_convergence_rounds: 100,
            run_on_startup: false,
            length_metric: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub enabled: bool,
    pub base_url: String,
    pub bucket: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}
impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: String::new(),
            bucket: "images".into(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file("config/default.toml"))
                .merge(Env::prefixed("DISTGRID__").split("__")),
        )
    }

    /// Postgres sources deliver EPSG:4326 lon/lat, which is measured in web
    /// mercator meters; file datasets are measured in their own units.
    pub fn length_metric(&self) -> LengthMetric {
        self.sync.length_metric.unwrap_or(match self.source.kind {
            SourceKind::Postgres => LengthMetric::WebMercator,
            SourceKind::File => LengthMetric::Planar,
        })
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let cfg: Config = figment.extract()?;
        if cfg.upload.enabled && cfg.upload.base_url.is_empty() {
            anyhow::bail!("upload.base_url must be set when uploads are enabled");
        }
        Ok(cfg)
    }
}
