use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::records::{
    LineBushingRecord, NodeRecord, PrimaryLineRecord, RegionRecord, SubstationRecord,
    TransformerRecord,
};
use super::SourceStore;
use crate::domain::Role;

/// Whole source dataset as one JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceDataset {
    pub regions: Vec<RegionRecord>,
    pub substations: Vec<SubstationRecord>,
    pub nodes: Vec<NodeRecord>,
    pub primary_lines: Vec<PrimaryLineRecord>,
    pub transformers: Vec<TransformerRecord>,
    pub line_bushings: Vec<LineBushingRecord>,
}

/// Source held in memory, loaded from a JSON export or built in tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    dataset: SourceDataset,
}

impl MemorySource {
    pub fn new(dataset: SourceDataset) -> Self {
        Self { dataset }
    }

    pub async fn from_path(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading source dataset {}", path.display()))?;
        let dataset = serde_json::from_slice(&raw)
            .with_context(|| format!("parsing source dataset {}", path.display()))?;
        Ok(Self { dataset })
    }
}

#[async_trait]
impl SourceStore for MemorySource {
    async fn regions(&self) -> Result<Vec<RegionRecord>> {
        Ok(self.dataset.regions.clone())
    }

    async fn substations(&self) -> Result<Vec<SubstationRecord>> {
        Ok(self.dataset.substations.clone())
    }

    async fn nodes(&self) -> Result<Vec<NodeRecord>> {
        Ok(self.dataset.nodes.clone())
    }

    async fn primary_line_villages(&self) -> Result<Vec<Option<String>>> {
        Ok(self
            .dataset
            .primary_lines
            .iter()
            .map(|l| l.village.clone())
            .unique()
            .collect())
    }

    async fn primary_lines_in_village(&self, village: Option<&str>) -> Result<Vec<PrimaryLineRecord>> {
        Ok(self
            .dataset
            .primary_lines
            .iter()
            .filter(|l| l.village.as_deref() == village)
            .cloned()
            .collect())
    }

    async fn transformers(&self) -> Result<Vec<TransformerRecord>> {
        Ok(self.dataset.transformers.clone())
    }

    async fn line_bushings(&self, role: Role) -> Result<Vec<LineBushingRecord>> {
        if role == Role::Unclassified {
            return Ok(Vec::new());
        }
        Ok(self
            .dataset
            .line_bushings
            .iter()
            .filter(|b| b.role() == role)
            .cloned()
            .collect())
    }
}
