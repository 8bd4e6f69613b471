//! Endpoint rules for line-like assets.
//!
//! A primary line is attached through the primary nodes under its end points;
//! a line bushing is attached through the primary line or transformer under its
//! start point. Each attachment also has an after-write cascade that pushes the
//! result onto the asset at the far end.

use geo::{Intersects, LineString, Point};

use crate::domain::{end_point, start_point, AssetId, LineBushing, PrimaryLine, Role};
use crate::store::Tables;

/// Derived fields of a primary line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineEndpoints {
    pub substation_id: Option<AssetId>,
    pub from_node: Option<String>,
    pub to_node: Option<String>,
    pub node_id: Option<AssetId>,
    pub village: Option<String>,
    pub municipality: Option<String>,
}

/// Derived fields of a line bushing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BushingLinks {
    pub substation_id: Option<AssetId>,
    pub primary_line_id: Option<AssetId>,
    pub from_node: Option<String>,
    pub to_node: Option<String>,
    pub village: Option<String>,
    pub municipality: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectivityResolver;

impl ConnectivityResolver {
    /// Start point: the primary node there gives the owner and from-node. A
    /// line that starts directly on a substation is owned by it instead.
    /// End point: the primary node there gives to-node, village and municipality.
    pub fn resolve_primary_line(&self, tables: &Tables, geom: &LineString<f64>) -> LineEndpoints {
        let mut out = LineEndpoints::default();

        if let Some(start) = start_point(geom) {
            if let Some(node) = primary_node_at(tables, &start) {
                out.substation_id = node.substation_id;
                out.from_node = Some(node.name.clone());
            } else if let Some(sub) = tables.substations.first_match(|s| s.geom.intersects(&start)) {
                out.substation_id = Some(sub.id);
                out.from_node = Some(sub.name.clone());
            }
        }

        if let Some(end) = end_point(geom) {
            if let Some(node) = primary_node_at(tables, &end) {
                out.to_node = Some(node.name.clone());
                out.node_id = Some(node.id);
                out.village = node.village.clone();
                out.municipality = node.municipality.clone();
            }
        }

        out
    }

    /// Resolves a bushing according to its role. Unclassified bushings get
    /// nothing.
    pub fn resolve_bushing(&self, tables: &Tables, bushing: &LineBushing) -> BushingLinks {
        let (Some(start), Some(end)) = (start_point(&bushing.geom), end_point(&bushing.geom)) else {
            return BushingLinks::default();
        };
        match bushing.role {
            Role::Primary => self.primary_side(tables, &start, &end),
            Role::Secondary => self.secondary_side(tables, &bushing.name, &start, &end),
            Role::Unclassified => BushingLinks::default(),
        }
    }

    fn primary_side(&self, tables: &Tables, start: &Point<f64>, end: &Point<f64>) -> BushingLinks {
        let mut out = BushingLinks::default();
        let feeder = tables
            .primary_lines
            .first_match(|pl| end_point(&pl.geom).is_some_and(|e| e.intersects(start)));
        if let Some(line) = feeder {
            out.substation_id = line.substation_id;
            out.primary_line_id = Some(line.id);
            out.from_node = line.to_node.clone();
            out.village = line.village.clone();
            out.municipality = line.municipality.clone();
        }
        out.to_node = tables
            .transformers
            .first_match(|t| t.geom.intersects(end))
            .map(|t| t.transformer_id.clone());
        out
    }

    fn secondary_side(
        &self,
        tables: &Tables,
        name: &str,
        start: &Point<f64>,
        end: &Point<f64>,
    ) -> BushingLinks {
        let mut out = BushingLinks::default();
        if let Some(t) = tables.transformers.first_match(|t| t.geom.intersects(start)) {
            out.substation_id = t.substation_id;
            out.from_node = Some(t.transformer_id.clone());
            out.village = t.village.clone();
            out.municipality = t.municipality.clone();
        }
        out.primary_line_id = tables
            .line_bushings
            .first_match(|b| b.name != name && end_point(&b.geom).is_some_and(|e| e.intersects(start)))
            .and_then(|b| b.primary_line_id);
        out.to_node = tables
            .nodes
            .first_match(|n| n.geom.intersects(end))
            .map(|n| n.name.clone());
        out
    }

    /// Hands the line's owning substation to the primary node at its end point,
    /// so lines starting there can resolve on their next write. Returns the id
    /// of the node that was updated.
    pub fn after_primary_line(&self, tables: &mut Tables, line: &PrimaryLine) -> Option<AssetId> {
        let (Some(node_id), Some(substation_id)) = (line.node_id, line.substation_id) else {
            return None;
        };
        let active = tables.substations.get(substation_id).map(|s| s.active);
        let node = tables.nodes.get_mut(node_id).filter(|n| n.role == Role::Primary)?;
        node.substation_id = Some(substation_id);
        if let Some(active) = active {
            node.active = active;
        }
        Some(node_id)
    }

    /// Copies a resolved bushing onto the transformer it names. A primary
    /// bushing's to-node is the transformer; a secondary bushing's from-node is.
    /// The join is on the transformer's business key. Returns the id of the
    /// transformer that was updated.
    pub fn after_bushing(&self, tables: &mut Tables, bushing: &LineBushing) -> Option<AssetId> {
        match bushing.role {
            Role::Primary => {
                let key = bushing.to_node.as_deref()?;
                let active = bushing
                    .substation_id
                    .and_then(|id| tables.substations.get(id))
                    .map(|s| s.active);
                let t = tables.transformers.get_by_key_mut(key)?;
                t.substation_id = bushing.substation_id;
                t.line_bushing_id = Some(bushing.id);
                t.from_primary_node = bushing.from_node.clone();
                t.primary_phasing = bushing.phasing.clone();
                if bushing.village.is_some() {
                    t.village = bushing.village.clone();
                    t.municipality = bushing.municipality.clone();
                }
                if let Some(active) = active {
                    t.active = active;
                }
                Some(t.id)
            }
            Role::Secondary => {
                let key = bushing.from_node.as_deref()?;
                let t = tables.transformers.get_by_key_mut(key)?;
                t.to_secondary_node = bushing.to_node.clone();
                t.secondary_phasing = bushing.phasing.clone();
                Some(t.id)
            }
            Role::Unclassified => None,
        }
    }
}

fn primary_node_at<'a>(tables: &'a Tables, at: &Point<f64>) -> Option<&'a crate::domain::Node> {
    tables
        .nodes
        .first_match(|n| n.role == Role::Primary && n.geom.intersects(at))
}
