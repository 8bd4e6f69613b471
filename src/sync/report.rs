use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::AssetKind;
use crate::store::UpsertOutcome;

#[derive(Debug, Clone, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncError {
    #[error("reading {asset} rows from the source failed: {message}")]
    Source { asset: AssetKind, message: String },
    #[error("primary line resolution stalled after {rounds} rounds with {pending} lines pending")]
    NoProgress { rounds: usize, pending: usize },
    #[error("primary line resolution hit the {limit} round limit with {pending} lines pending")]
    ConvergenceLimit { limit: usize, pending: usize },
    #[error("a synchronization run is already in progress")]
    AlreadyRunning,
}

impl SyncError {
    pub fn source(asset: AssetKind, err: anyhow::Error) -> Self {
        SyncError::Source {
            asset,
            message: format!("{err:#}"),
        }
    }
}

/// A source row that could not be written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowFailure {
    pub key: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConvergenceReport {
    /// Re-resolution rounds that were run.
    pub rounds: usize,
    /// Lines that picked up an owning substation during those rounds.
    pub resolved: usize,
    pub error: Option<SyncError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassReport {
    pub asset: AssetKind,
    pub inserted: usize,
    pub updated: usize,
    pub failures: Vec<RowFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convergence: Option<ConvergenceReport>,
    /// Set when the pass could not read its source rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SyncError>,
}

impl PassReport {
    pub fn new(asset: AssetKind) -> Self {
        Self {
            asset,
            inserted: 0,
            updated: 0,
            failures: Vec::new(),
            convergence: None,
            error: None,
        }
    }

    pub fn failed(asset: AssetKind, error: SyncError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(asset)
        }
    }

    pub fn record(&mut self, outcome: UpsertOutcome) {
        if outcome.inserted {
            self.inserted += 1;
        } else {
            self.updated += 1;
        }
    }

    pub fn fail(&mut self, key: String, error: impl Display) {
        self.failures.push(RowFailure {
            key,
            error: error.to_string(),
        });
    }

    /// Folds another report of the same asset into this one.
    pub fn absorb(&mut self, other: PassReport) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.failures.extend(other.failures);
        if self.error.is_none() {
            self.error = other.error;
        }
    }

    pub fn written(&self) -> usize {
        self.inserted + self.updated
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub passes: Vec<PassReport>,
    /// A pass failed to read its source and the remaining passes were skipped.
    pub aborted: bool,
}

impl SyncReport {
    pub fn pass(&self, asset: AssetKind) -> Option<&PassReport> {
        self.passes.iter().find(|p| p.asset == asset)
    }

    /// No source errors, no row failures, and convergence completed.
    pub fn is_clean(&self) -> bool {
        !self.aborted
            && self.passes.iter().all(|p| {
                p.error.is_none()
                    && p.failures.is_empty()
                    && p.convergence.as_ref().map_or(true, |c| c.error.is_none())
            })
    }
}
