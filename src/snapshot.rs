//! Read model served to map clients.

use serde::Serialize;

use crate::domain::{AssetId, GeoJson};
use crate::resolve::PropagationCount;
use crate::store::Tables;

/// Voltage shown for substations that carry no rating.
pub const DEFAULT_SUBSTATION_VOLTAGE_KV: f64 = 13.2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature<P> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: AssetId,
    pub geometry: GeoJson,
    pub properties: P,
}

impl<P> Feature<P> {
    fn new(id: AssetId, geometry: GeoJson, properties: P) -> Self {
        Self {
            kind: "Feature",
            id,
            geometry,
            properties,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionProperties {
    pub key: String,
    pub village: Option<String>,
    pub municipality: Option<String>,
    pub power_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubstationProperties {
    pub substation_name: String,
    pub description: Option<String>,
    pub voltage_rating: f64,
    #[serde(rename = "isactive")]
    pub active: bool,
    pub village: Option<String>,
    pub municipality: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrimaryLineProperties {
    pub primary_line_id: String,
    pub from_node: Option<String>,
    pub to_node: Option<String>,
    #[serde(rename = "isactive")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformerProperties {
    pub transformer_id: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub transformer_type: Option<String>,
    pub village: Option<String>,
    pub municipality: Option<String>,
    pub image: Option<String>,
    #[serde(rename = "isactive")]
    pub active: bool,
}

/// Every map layer, each in ascending id order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapSnapshot {
    pub regions: Vec<Feature<RegionProperties>>,
    pub substations: Vec<Feature<SubstationProperties>>,
    pub primary_lines: Vec<Feature<PrimaryLineProperties>>,
    pub transformers: Vec<Feature<TransformerProperties>>,
}

impl MapSnapshot {
    pub fn from_tables(tables: &Tables) -> Self {
        let regions = tables
            .regions
            .iter()
            .map(|r| {
                Feature::new(
                    r.id,
                    GeoJson::from(&r.geom),
                    RegionProperties {
                        key: r.key.clone(),
                        village: r.village.clone(),
                        municipality: r.municipality.clone(),
                        power_status: r.power_status.clone(),
                    },
                )
            })
            .collect();

        let substations = tables
            .substations
            .iter()
            .map(|s| {
                Feature::new(
                    s.id,
                    GeoJson::from(&s.geom),
                    SubstationProperties {
                        substation_name: s.name.clone(),
                        description: s.description.clone(),
                        voltage_rating: s.voltage_rating_kv.unwrap_or(DEFAULT_SUBSTATION_VOLTAGE_KV),
                        active: s.active,
                        village: s.village.clone(),
                        municipality: s.municipality.clone(),
                        image: s.image.clone(),
                    },
                )
            })
            .collect();

        let primary_lines = tables
            .primary_lines
            .iter()
            .map(|l| {
                Feature::new(
                    l.id,
                    GeoJson::from(&l.geom),
                    PrimaryLineProperties {
                        primary_line_id: l.line_id.clone(),
                        from_node: l.from_node.clone(),
                        to_node: l.to_node.clone(),
                        active: l.active,
                    },
                )
            })
            .collect();

        let transformers = tables
            .transformers
            .iter()
            .map(|t| {
                Feature::new(
                    t.id,
                    GeoJson::from(&t.geom),
                    TransformerProperties {
                        transformer_id: t.transformer_id.clone(),
                        description: t.description.clone(),
                        transformer_type: t.transformer_type.clone(),
                        village: t.village.clone(),
                        municipality: t.municipality.clone(),
                        image: t.image.clone(),
                        active: t.active,
                    },
                )
            })
            .collect();

        Self {
            regions,
            substations,
            primary_lines,
            transformers,
        }
    }
}

/// Broadcast whenever a substation's active flag changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChange {
    pub substation_id: AssetId,
    pub name: String,
    pub active: bool,
    pub propagated: PropagationCount,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Substation;
    use geo::Point;

    #[test]
    fn test_substation_feature_defaults_voltage() {
        let mut tables = Tables::default();
        tables.substations.upsert(Substation {
            id: 0,
            name: "S1".to_string(),
            geom: Point::new(1.0, 2.0),
            region_id: None,
            phasing: None,
            description: None,
            voltage_rating_kv: None,
            village: Some("Alpha".to_string()),
            municipality: None,
            image: None,
            active: true,
        });

        let snapshot = MapSnapshot::from_tables(&tables);
        let json = serde_json::to_value(&snapshot).unwrap();
        let feature = &json["substations"][0];
        assert_eq!(feature["type"], "Feature");
        assert_eq!(feature["id"], 1);
        assert_eq!(feature["geometry"]["type"], "Point");
        assert_eq!(feature["properties"]["substation_name"], "S1");
        assert_eq!(feature["properties"]["voltage_rating"], 13.2);
        assert_eq!(feature["properties"]["isactive"], true);
        assert!(snapshot.primary_lines.is_empty());
    }
}
