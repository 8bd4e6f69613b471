//! Derived store: the denormalized network model the synchronizer writes into.

pub mod table;
pub mod upsert;

pub use table::{Staged, Table, UpsertOutcome};
pub use upsert::Upsert;

use tokio::sync::RwLock;

use crate::domain::{
    ConductorType, LineBushing, Node, PrimaryLine, Region, Substation, Transformer, TransformerType,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tables {
    pub regions: Table<Region>,
    pub substations: Table<Substation>,
    pub nodes: Table<Node>,
    pub primary_lines: Table<PrimaryLine>,
    pub transformer_types: Table<TransformerType>,
    pub conductor_types: Table<ConductorType>,
    pub transformers: Table<Transformer>,
    pub line_bushings: Table<LineBushing>,
}

/// All tables behind one lock.
///
/// A row write, including the resolvers and cascades it triggers, runs inside a
/// single `write` call, so readers never see a half-applied write.
#[derive(Debug, Default)]
pub struct NetworkStore {
    tables: RwLock<Tables>,
}

impl NetworkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tables(tables: Tables) -> Self {
        Self {
            tables: RwLock::new(tables),
        }
    }

    pub async fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        let guard = self.tables.read().await;
        f(&guard)
    }

    pub async fn write<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
        let mut guard = self.tables.write().await;
        f(&mut guard)
    }

    /// Copy of the current state.
    pub async fn dump(&self) -> Tables {
        self.tables.read().await.clone()
    }
}
