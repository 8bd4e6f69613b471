//! Multi-pass synchronization from the source dataset into the derived store.
//!
//! Passes run in dependency order, each one resolving against what the
//! previous passes wrote: regions before the substations they contain,
//! substations before nodes, nodes before the lines between them, lines and
//! transformers before the bushings joining them.

pub mod converge;
pub mod report;

pub use converge::converge_primary_lines;
pub use report::{ConvergenceReport, PassReport, RowFailure, SyncError, SyncReport};

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::{stream, StreamExt};
use strum::IntoEnumIterator;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::domain::{AssetKind, ConductorType, Role, TransformerType};
use crate::network::Network;
use crate::source::SourceStore;
use crate::upload::{FileUploader, UploadError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub partition_concurrency: usize,
    pub max_convergence_rounds: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            partition_concurrency: 4,
            max_convergence_rounds: 100,
        }
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(cfg: &SyncConfig) -> Self {
        Self {
            partition_concurrency: cfg.partition_concurrency.max(1),
            max_convergence_rounds: cfg.max_convergence_rounds,
        }
    }
}

fn row_key(key: Option<&str>, index: usize) -> String {
    match key {
        Some(k) if !k.trim().is_empty() => k.to_string(),
        _ => format!("row {index}"),
    }
}

pub struct Synchronizer {
    source: Arc<dyn SourceStore>,
    uploader: Arc<dyn FileUploader>,
    network: Network,
    options: SyncOptions,
    running: Mutex<()>,
}

impl Synchronizer {
    pub fn new(
        source: Arc<dyn SourceStore>,
        uploader: Arc<dyn FileUploader>,
        network: Network,
        options: SyncOptions,
    ) -> Self {
        Self {
            source,
            uploader,
            network,
            options,
            running: Mutex::new(()),
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Every pass in dependency order. A pass that cannot read its source
    /// stops the run; row failures and convergence errors do not.
    pub async fn run_all(&self) -> Result<SyncReport, SyncError> {
        self.run_passes(AssetKind::iter().collect()).await
    }

    /// A single pass. The primary line pass includes its convergence rounds.
    pub async fn run(&self, asset: AssetKind) -> Result<SyncReport, SyncError> {
        self.run_passes(vec![asset]).await
    }

    async fn run_passes(&self, assets: Vec<AssetKind>) -> Result<SyncReport, SyncError> {
        let _guard = self.running.try_lock().map_err(|_| SyncError::AlreadyRunning)?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, passes = assets.len(), "synchronization started");

        let mut passes = Vec::with_capacity(assets.len());
        let mut aborted = false;
        for asset in assets {
            let pass = self.pass(asset).await;
            let failed = pass.error.is_some();
            passes.push(pass);
            if failed {
                aborted = true;
                break;
            }
        }

        let report = SyncReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            passes,
            aborted,
        };
        info!(%run_id, aborted, clean = report.is_clean(), "synchronization finished");
        Ok(report)
    }

    async fn pass(&self, asset: AssetKind) -> PassReport {
        let started = Instant::now();
        info!(%asset, "pass started");

        let result = match asset {
            AssetKind::Region => self.sync_regions().await,
            AssetKind::Substation => self.sync_substations().await,
            AssetKind::Node => self.sync_nodes().await,
            AssetKind::PrimaryLine => self.sync_primary_lines().await,
            AssetKind::TransformerType => self.sync_transformer_types().await,
            AssetKind::ConductorType => self.sync_conductor_types().await,
            AssetKind::Transformer => self.sync_transformers().await,
            AssetKind::LineBushing => self.sync_line_bushings().await,
        };

        let report = match result {
            Ok(report) => report,
            Err(err) => {
                warn!(%asset, error = %err, "pass aborted");
                PassReport::failed(asset, err)
            }
        };
        for failure in &report.failures {
            warn!(%asset, key = %failure.key, error = %failure.error, "row skipped");
        }
        info!(
            %asset,
            inserted = report.inserted,
            updated = report.updated,
            failed = report.failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pass finished"
        );
        report
    }

    async fn sync_regions(&self) -> Result<PassReport, SyncError> {
        let records = self
            .source
            .regions()
            .await
            .map_err(|e| SyncError::source(AssetKind::Region, e))?;

        let writer = self.network.writer();
        let report = self
            .network
            .store()
            .write(|tables| {
                let mut report = PassReport::new(AssetKind::Region);
                for (i, record) in records.into_iter().enumerate() {
                    let key = row_key(record.key(), i);
                    match record.into_row() {
                        Ok(row) => report.record(writer.write_region(tables, row)),
                        Err(e) => report.fail(key, e),
                    }
                }
                report
            })
            .await;
        Ok(report)
    }

    /// Rows go in one at a time so each upload completes before its write.
    async fn sync_substations(&self) -> Result<PassReport, SyncError> {
        let records = self
            .source
            .substations()
            .await
            .map_err(|e| SyncError::source(AssetKind::Substation, e))?;

        let mut report = PassReport::new(AssetKind::Substation);
        for (i, record) in records.into_iter().enumerate() {
            let key = row_key(record.key(), i);
            let mut row = match record.into_row() {
                Ok(row) => row,
                Err(e) => {
                    report.fail(key, e);
                    continue;
                }
            };
            match self.upload_image(row.image.take(), &row.name).await {
                Ok(url) => row.image = url,
                Err(e) => {
                    report.fail(key, e);
                    continue;
                }
            }
            let writer = self.network.writer();
            let outcome = self
                .network
                .store()
                .write(|tables| writer.write_substation(tables, row))
                .await;
            report.record(outcome);
        }
        Ok(report)
    }

    async fn sync_nodes(&self) -> Result<PassReport, SyncError> {
        let records = self
            .source
            .nodes()
            .await
            .map_err(|e| SyncError::source(AssetKind::Node, e))?;

        let writer = self.network.writer();
        let report = self
            .network
            .store()
            .write(|tables| {
                let mut report = PassReport::new(AssetKind::Node);
                for (i, record) in records.into_iter().enumerate() {
                    let key = row_key(record.key(), i);
                    match record.into_row() {
                        Ok(row) => report.record(writer.write_node(tables, row)),
                        Err(e) => report.fail(key, e),
                    }
                }
                report
            })
            .await;
        Ok(report)
    }

    /// Village partitions run concurrently, each as one atomic write, and the
    /// convergence rounds follow once every partition is in.
    async fn sync_primary_lines(&self) -> Result<PassReport, SyncError> {
        let villages = self
            .source
            .primary_line_villages()
            .await
            .map_err(|e| SyncError::source(AssetKind::PrimaryLine, e))?;

        let partitions: Vec<Result<PassReport, SyncError>> = stream::iter(villages)
            .map(|village| self.sync_primary_line_partition(village))
            .buffer_unordered(self.options.partition_concurrency.max(1))
            .collect()
            .await;

        let mut report = PassReport::new(AssetKind::PrimaryLine);
        for partition in partitions {
            report.absorb(partition?);
        }

        report.convergence =
            Some(converge_primary_lines(&self.network, self.options.max_convergence_rounds).await);
        if let Some(err) = report.convergence.as_ref().and_then(|c| c.error.as_ref()) {
            warn!(error = %err, "primary line convergence incomplete");
        }
        Ok(report)
    }

    async fn sync_primary_line_partition(&self, village: Option<String>) -> Result<PassReport, SyncError> {
        let records = self
            .source
            .primary_lines_in_village(village.as_deref())
            .await
            .map_err(|e| SyncError::source(AssetKind::PrimaryLine, e))?;

        let writer = self.network.writer();
        let report = self
            .network
            .store()
            .write(|tables| {
                let mut report = PassReport::new(AssetKind::PrimaryLine);
                for (i, record) in records.into_iter().enumerate() {
                    let key = row_key(record.key(), i);
                    match record.into_row() {
                        Ok(row) => report.record(writer.write_primary_line(tables, row)),
                        Err(e) => report.fail(key, e),
                    }
                }
                report
            })
            .await;
        Ok(report)
    }

    async fn sync_transformer_types(&self) -> Result<PassReport, SyncError> {
        let labels = self
            .source
            .transformer_type_labels()
            .await
            .map_err(|e| SyncError::source(AssetKind::TransformerType, e))?;

        let writer = self.network.writer();
        let report = self
            .network
            .store()
            .write(|tables| {
                let mut report = PassReport::new(AssetKind::TransformerType);
                for label in labels {
                    let row = TransformerType::from_label(&label);
                    report.record(writer.write_transformer_type(tables, row));
                }
                report
            })
            .await;
        Ok(report)
    }

    async fn sync_conductor_types(&self) -> Result<PassReport, SyncError> {
        let labels = self
            .source
            .conductor_type_labels()
            .await
            .map_err(|e| SyncError::source(AssetKind::ConductorType, e))?;

        let writer = self.network.writer();
        let report = self
            .network
            .store()
            .write(|tables| {
                let mut report = PassReport::new(AssetKind::ConductorType);
                for name in labels {
                    let row = ConductorType { id: 0, name };
                    report.record(writer.write_conductor_type(tables, row));
                }
                report
            })
            .await;
        Ok(report)
    }

    async fn sync_transformers(&self) -> Result<PassReport, SyncError> {
        let records = self
            .source
            .transformers()
            .await
            .map_err(|e| SyncError::source(AssetKind::Transformer, e))?;

        let mut report = PassReport::new(AssetKind::Transformer);
        for (i, record) in records.into_iter().enumerate() {
            let key = row_key(record.key(), i);
            let mut row = match record.into_row() {
                Ok(row) => row,
                Err(e) => {
                    report.fail(key, e);
                    continue;
                }
            };
            match self.upload_image(row.image.take(), &row.transformer_id).await {
                Ok(url) => row.image = url,
                Err(e) => {
                    report.fail(key, e);
                    continue;
                }
            }
            let writer = self.network.writer();
            let outcome = self
                .network
                .store()
                .write(|tables| writer.write_transformer(tables, row))
                .await;
            report.record(outcome);
        }
        Ok(report)
    }

    /// Primary bushings first: secondary bushings look up the primary bushing
    /// they continue from.
    async fn sync_line_bushings(&self) -> Result<PassReport, SyncError> {
        let mut report = PassReport::new(AssetKind::LineBushing);
        for role in [Role::Primary, Role::Secondary] {
            let records = self
                .source
                .line_bushings(role)
                .await
                .map_err(|e| SyncError::source(AssetKind::LineBushing, e))?;

            let writer = self.network.writer();
            let part = self
                .network
                .store()
                .write(|tables| {
                    let mut part = PassReport::new(AssetKind::LineBushing);
                    for (i, record) in records.into_iter().enumerate() {
                        let key = row_key(record.key(), i);
                        match record.into_row() {
                            Ok(row) => part.record(writer.write_line_bushing(tables, row)),
                            Err(e) => part.fail(key, e),
                        }
                    }
                    part
                })
                .await;
            report.absorb(part);
        }
        Ok(report)
    }

    async fn upload_image(&self, path: Option<String>, name: &str) -> Result<Option<String>, UploadError> {
        match path.filter(|p| !p.trim().is_empty()) {
            Some(path) => self.uploader.upload(Path::new(&path), name).await.map(Some),
            None => Ok(None),
        }
    }
}
