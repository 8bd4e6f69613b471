use geo::{Intersects, Polygon};

use crate::domain::{AssetId, Node, Region, Role, Substation};
use crate::store::Table;

/// Attributes an asset inherits from the region it lies in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionAttributes {
    pub region_id: Option<AssetId>,
    pub village: Option<String>,
    pub municipality: Option<String>,
}

/// Finds the franchise area containing an asset.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionResolver;

impl RegionResolver {
    /// Region whose polygon intersects `geom`, or all-unset when none does.
    ///
    /// Points are tested as is, lines and polygons as whole geometries. With
    /// overlapping regions the lowest region id wins.
    pub fn resolve<G>(&self, regions: &Table<Region>, geom: &G) -> RegionAttributes
    where
        Polygon<f64>: Intersects<G>,
    {
        regions
            .first_match(|r| r.geom.intersects(geom))
            .map(|r| RegionAttributes {
                region_id: Some(r.id),
                village: r.village.clone(),
                municipality: r.municipality.clone(),
            })
            .unwrap_or_default()
    }
}

/// Owning substation of a node that sits on a substation point.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodePlacement;

impl NodePlacement {
    /// When a substation point coincides with the node, primary nodes are owned
    /// by it and any other node is cleared. Nodes away from every substation
    /// keep what they have, which may have come from a primary line.
    pub fn owning_substation(&self, substations: &Table<Substation>, node: &Node) -> Option<AssetId> {
        match substations.first_match(|s| s.geom.intersects(&node.geom)) {
            Some(sub) if node.role == Role::Primary => Some(sub.id),
            Some(_) => None,
            None => node.substation_id,
        }
    }
}
