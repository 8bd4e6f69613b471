//! Authoritative source dataset the synchronizer copies from.

pub mod memory;
#[cfg(feature = "db")]
pub mod pg;
pub mod records;

pub use memory::{MemorySource, SourceDataset};
pub use records::{
    GeometryCell, LineBushingRecord, NodeRecord, PrimaryLineRecord, RegionRecord, RowError, SubstationRecord,
    TransformerRecord,
};

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use itertools::Itertools;

use crate::config::{SourceConfig, SourceKind};
use crate::domain::Role;

/// Per-type scans of the raw import tables.
#[async_trait]
pub trait SourceStore: Send + Sync {
    async fn regions(&self) -> Result<Vec<RegionRecord>>;
    async fn substations(&self) -> Result<Vec<SubstationRecord>>;
    async fn nodes(&self) -> Result<Vec<NodeRecord>>;

    /// Distinct partition values of the primary line table, `None` included
    /// when some lines carry no village.
    async fn primary_line_villages(&self) -> Result<Vec<Option<String>>>;
    async fn primary_lines_in_village(&self, village: Option<&str>) -> Result<Vec<PrimaryLineRecord>>;

    async fn transformers(&self) -> Result<Vec<TransformerRecord>>;

    /// Bushings of one role. Unclassified bushings are never returned by
    /// this scan.
    async fn line_bushings(&self, role: Role) -> Result<Vec<LineBushingRecord>>;

    /// Distinct non-empty transformer type labels.
    async fn transformer_type_labels(&self) -> Result<Vec<String>> {
        let transformers = self.transformers().await?;
        Ok(distinct_labels(
            transformers.into_iter().map(|t| t.transformer_type),
        ))
    }

    /// Distinct non-empty conductor labels across primary lines and bushings.
    async fn conductor_type_labels(&self) -> Result<Vec<String>> {
        let mut labels = Vec::new();
        for village in self.primary_line_villages().await? {
            let lines = self.primary_lines_in_village(village.as_deref()).await?;
            labels.extend(lines.into_iter().map(|l| l.conductor_type));
        }
        for role in [Role::Primary, Role::Secondary] {
            let bushings = self.line_bushings(role).await?;
            labels.extend(bushings.into_iter().map(|b| b.conductor_type));
        }
        Ok(distinct_labels(labels))
    }
}

/// Sorted, trimmed, non-empty and unique.
pub fn distinct_labels(labels: impl IntoIterator<Item = Option<String>>) -> Vec<String> {
    labels
        .into_iter()
        .flatten()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .sorted()
        .dedup()
        .collect()
}

/// Builds the configured source.
pub async fn connect(cfg: &SourceConfig) -> Result<Arc<dyn SourceStore>> {
    match cfg.kind {
        SourceKind::File => Ok(Arc::new(MemorySource::from_path(&cfg.path).await?)),
        #[cfg(feature = "db")]
        SourceKind::Postgres => {
            let url = cfg
                .url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("source.url is required for the postgres source"))?;
            Ok(Arc::new(pg::PgSource::connect(url).await?))
        }
        #[cfg(not(feature = "db"))]
        SourceKind::Postgres => {
            anyhow::bail!("postgres source requires building with the `db` feature")
        }
    }
}
