//! Per-asset write path into the derived store.
//!
//! Every method takes the tables already locked for writing. A write stages the
//! incoming row against the stored one, fills the derived fields from the
//! resolvers, commits, and then runs whatever cascade the asset type has.

use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::{
    AssetId, ConductorType, LengthMetric, LineBushing, Node, PrimaryLine, Region, Substation,
    Transformer, TransformerType, LINE_BUSHING_LENGTH_M,
};
use crate::resolve::{ConnectivityResolver, NodePlacement, RegionResolver, StatusPropagator};
use crate::snapshot::StatusChange;
use crate::store::{Tables, UpsertOutcome};

#[derive(Debug, Clone, Default)]
pub struct AssetWriter {
    regions: RegionResolver,
    placement: NodePlacement,
    connectivity: ConnectivityResolver,
    status: StatusPropagator,
    length_metric: LengthMetric,
    notifier: Option<broadcast::Sender<StatusChange>>,
}

impl AssetWriter {
    pub fn new(length_metric: LengthMetric) -> Self {
        Self {
            length_metric,
            ..Self::default()
        }
    }

    /// Status changes made through this writer are sent on `tx`.
    pub fn with_notifier(mut self, tx: broadcast::Sender<StatusChange>) -> Self {
        self.notifier = Some(tx);
        self
    }

    pub fn write_region(&self, tables: &mut Tables, row: Region) -> UpsertOutcome {
        tables.regions.upsert(row)
    }

    /// Resolves the owning region, then pushes the active flag to owned assets.
    pub fn write_substation(&self, tables: &mut Tables, row: Substation) -> UpsertOutcome {
        let previous = tables.substations.get_by_key(&row.name).map(|s| s.active);
        let mut staged = tables.substations.stage(row);

        let attrs = self.regions.resolve(&tables.regions, &staged.row.geom);
        staged.row.region_id = attrs.region_id;
        staged.row.village = attrs.village;
        staged.row.municipality = attrs.municipality;

        let name = staged.row.name.clone();
        let active = staged.row.active;
        let outcome = tables.substations.commit(staged);
        let propagated = self.status.propagate(tables, outcome.id, active);

        if previous.is_some_and(|was| was != active) {
            self.notify(StatusChange {
                substation_id: outcome.id,
                name,
                active,
                propagated,
            });
        }
        outcome
    }

    pub fn write_node(&self, tables: &mut Tables, row: Node) -> UpsertOutcome {
        let mut staged = tables.nodes.stage(row);

        let attrs = self.regions.resolve(&tables.regions, &staged.row.geom);
        staged.row.village = attrs.village;
        staged.row.municipality = attrs.municipality;

        staged.row.substation_id = self.placement.owning_substation(&tables.substations, &staged.row);
        if let Some(active) = owner_active(tables, staged.row.substation_id) {
            staged.row.active = active;
        }

        tables.nodes.commit(staged)
    }

    /// Resolves both endpoints, measures the line, and hands the owning
    /// substation on to the node at the far end.
    pub fn write_primary_line(&self, tables: &mut Tables, row: PrimaryLine) -> UpsertOutcome {
        let mut staged = tables.primary_lines.stage(row);

        let ends = self
            .connectivity
            .resolve_primary_line(tables, &staged.row.geom);
        let line = &mut staged.row;
        line.substation_id = ends.substation_id;
        line.node_id = ends.node_id;
        line.from_node = ends.from_node;
        line.to_node = ends.to_node;
        if ends.village.is_some() {
            line.village = ends.village;
            line.municipality = ends.municipality;
        } else {
            // No primary node at the end point; fall back to the region the line runs through.
            let attrs = self.regions.resolve(&tables.regions, &line.geom);
            line.village = attrs.village;
            line.municipality = attrs.municipality;
        }
        line.length_m = self.length_metric.line_length(&line.geom);
        if let Some(active) = owner_active(tables, line.substation_id) {
            line.active = active;
        }

        let written = staged.row.clone();
        let outcome = tables.primary_lines.commit(staged);
        if let Some(node_id) = self.connectivity.after_primary_line(tables, &written) {
            debug!(line = %written.line_id, node_id, "pushed owning substation to end node");
        }
        outcome
    }

    pub fn write_transformer_type(&self, tables: &mut Tables, row: TransformerType) -> UpsertOutcome {
        tables.transformer_types.upsert(row)
    }

    pub fn write_conductor_type(&self, tables: &mut Tables, row: ConductorType) -> UpsertOutcome {
        tables.conductor_types.upsert(row)
    }

    /// Connectivity fields of an existing transformer are kept; they are owned
    /// by the line bushing cascade.
    pub fn write_transformer(&self, tables: &mut Tables, row: Transformer) -> UpsertOutcome {
        let mut staged = tables.transformers.stage(row);

        let attrs = self.regions.resolve(&tables.regions, &staged.row.geom);
        staged.row.village = attrs.village;
        staged.row.municipality = attrs.municipality;
        if let Some(active) = owner_active(tables, staged.row.substation_id) {
            staged.row.active = active;
        }

        tables.transformers.commit(staged)
    }

    /// Derived fields are rebuilt from scratch, then copied onto the
    /// transformer the bushing names.
    pub fn write_line_bushing(&self, tables: &mut Tables, row: LineBushing) -> UpsertOutcome {
        let mut staged = tables.line_bushings.stage(row);

        let links = self.connectivity.resolve_bushing(tables, &staged.row);
        let bushing = &mut staged.row;
        bushing.substation_id = links.substation_id;
        bushing.primary_line_id = links.primary_line_id;
        bushing.from_node = links.from_node;
        bushing.to_node = links.to_node;
        bushing.village = links.village;
        bushing.municipality = links.municipality;
        if let Some(label) = bushing.role.bushing_label() {
            bushing.description = Some(label.to_string());
        }
        bushing.length_m = LINE_BUSHING_LENGTH_M;

        let written = staged.row.clone();
        let outcome = tables.line_bushings.commit(staged);
        if let Some(transformer_id) = self.connectivity.after_bushing(tables, &written) {
            debug!(bushing = %written.name, transformer_id, "copied bushing links to transformer");
        }
        outcome
    }

    /// Sets a substation's active flag and propagates it. `None` when no
    /// substation has that name.
    pub fn set_substation_active(
        &self,
        tables: &mut Tables,
        name: &str,
        active: bool,
    ) -> Option<StatusChange> {
        let sub = tables.substations.get_by_key_mut(name)?;
        let changed = sub.active != active;
        sub.active = active;
        let substation_id = sub.id;
        let name = sub.name.clone();

        let propagated = self.status.propagate(tables, substation_id, active);
        let change = StatusChange {
            substation_id,
            name,
            active,
            propagated,
        };
        if changed {
            self.notify(change.clone());
        }
        Some(change)
    }

    fn notify(&self, change: StatusChange) {
        if let Some(tx) = &self.notifier {
            if tx.send(change).is_err() {
                debug!("no status subscribers");
            }
        }
    }
}

fn owner_active(tables: &Tables, substation_id: Option<AssetId>) -> Option<bool> {
    substation_id
        .and_then(|id| tables.substations.get(id))
        .map(|s| s.active)
}
