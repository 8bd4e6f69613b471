//! Raw rows as the authoritative source delivers them.
//!
//! Nothing here is trusted: keys and geometry may be missing or malformed, and
//! the conversion into store rows is where a bad row is rejected.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::domain::{
    GeoJson, GeometryError, LineBushing, Node, PrimaryLine, Region, Role, Substation, Transformer,
};

#[derive(Debug, Error, PartialEq)]
pub enum RowError {
    #[error("row has no business key")]
    MissingKey,
    #[error("row has no geometry")]
    MissingGeometry,
    #[error("geometry could not be decoded: {0}")]
    MalformedGeometry(String),
    #[error("invalid geometry: {0}")]
    Geometry(#[from] GeometryError),
}

fn required<'a>(key: &'a Option<String>) -> Result<&'a str, RowError> {
    key.as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(RowError::MissingKey)
}

fn geometry(geom: &Option<GeometryCell>) -> Result<&GeoJson, RowError> {
    match geom {
        Some(GeometryCell::Decoded(geom)) => Ok(geom),
        Some(GeometryCell::Malformed(reason)) => Err(RowError::MalformedGeometry(reason.clone())),
        None => Err(RowError::MissingGeometry),
    }
}

/// Geometry column of a source row. Sources that hand over geometry as text
/// keep the decoder's message for cells they could not read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GeometryCell {
    Decoded(GeoJson),
    Malformed(String),
}

impl GeometryCell {
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(geom) => GeometryCell::Decoded(geom),
            Err(e) => GeometryCell::Malformed(e.to_string()),
        }
    }
}

impl From<GeoJson> for GeometryCell {
    fn from(geom: GeoJson) -> Self {
        GeometryCell::Decoded(geom)
    }
}

impl<'de> Deserialize<'de> for GeometryCell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        GeoJson::deserialize(deserializer).map(GeometryCell::Decoded)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionRecord {
    pub code: Option<String>,
    pub geom: Option<GeometryCell>,
    pub village: Option<String>,
    pub municipality: Option<String>,
    pub power_status: Option<String>,
}

impl RegionRecord {
    pub fn key(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn into_row(self) -> Result<Region, RowError> {
        let key = required(&self.code)?.to_string();
        let geom = geometry(&self.geom)?.to_polygon()?;
        Ok(Region {
            id: 0,
            key,
            geom,
            village: self.village,
            municipality: self.municipality,
            power_status: self.power_status,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubstationRecord {
    pub generator_id: Option<String>,
    pub geom: Option<GeometryCell>,
    pub phasing: Option<String>,
    pub description: Option<String>,
    pub voltage_rating_kv: Option<f64>,
    /// Local path of the site photo, uploaded during sync.
    pub image: Option<String>,
}

impl SubstationRecord {
    pub fn key(&self) -> Option<&str> {
        self.generator_id.as_deref()
    }

    /// The row's `image` still holds the source path; the synchronizer swaps
    /// in the uploaded URL.
    pub fn into_row(self) -> Result<Substation, RowError> {
        let name = required(&self.generator_id)?.to_string();
        let geom = geometry(&self.geom)?.to_point()?;
        Ok(Substation {
            id: 0,
            name,
            geom,
            region_id: None,
            phasing: self.phasing,
            description: self.description,
            voltage_rating_kv: self.voltage_rating_kv,
            village: None,
            municipality: None,
            image: self.image,
            active: true,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeRecord {
    pub bus_id: Option<String>,
    pub geom: Option<GeometryCell>,
    pub description: Option<String>,
    pub nominal_voltage_kv: Option<f64>,
    pub remarks: Option<String>,
}

impl NodeRecord {
    pub fn key(&self) -> Option<&str> {
        self.bus_id.as_deref()
    }

    pub fn into_row(self) -> Result<Node, RowError> {
        let name = required(&self.bus_id)?.to_string();
        let geom = geometry(&self.geom)?.to_point()?;
        Ok(Node {
            id: 0,
            name,
            geom,
            substation_id: None,
            role: Role::classify(self.description.as_deref()),
            description: self.description,
            nominal_voltage_kv: self.nominal_voltage_kv,
            village: None,
            municipality: None,
            remarks: self.remarks,
            active: true,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryLineRecord {
    pub primary_line_id: Option<String>,
    pub geom: Option<GeometryCell>,
    /// Partition the source groups lines by.
    pub village: Option<String>,
    pub phasing: Option<String>,
    pub description: Option<String>,
    pub configuration: Option<String>,
    pub system_grounding_type: Option<String>,
    pub conductor_type: Option<String>,
    pub neutral_wire_type: Option<String>,
    pub earth_resistivity: Option<i32>,
}

impl PrimaryLineRecord {
    pub fn key(&self) -> Option<&str> {
        self.primary_line_id.as_deref()
    }

    pub fn into_row(self) -> Result<PrimaryLine, RowError> {
        let line_id = required(&self.primary_line_id)?.to_string();
        let geom = geometry(&self.geom)?.to_line_string()?;
        Ok(PrimaryLine {
            id: 0,
            line_id,
            geom,
            substation_id: None,
            node_id: None,
            from_node: None,
            to_node: None,
            phasing: self.phasing,
            description: self.description,
            configuration: self.configuration,
            system_grounding_type: self.system_grounding_type,
            conductor_type: self.conductor_type,
            neutral_wire_type: self.neutral_wire_type,
            earth_resistivity: self.earth_resistivity,
            length_m: 0.0,
            village: None,
            municipality: None,
            active: true,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformerRecord {
    pub transformer_id: Option<String>,
    pub geom: Option<GeometryCell>,
    pub description: Option<String>,
    pub installation_type: Option<String>,
    pub connection_code: Option<i32>,
    pub transformer_type: Option<String>,
    pub primary_voltage_rating_kv: Option<f64>,
    pub secondary_voltage_rating_kv: Option<f64>,
    pub image: Option<String>,
}

impl TransformerRecord {
    pub fn key(&self) -> Option<&str> {
        self.transformer_id.as_deref()
    }

    pub fn into_row(self) -> Result<Transformer, RowError> {
        let transformer_id = required(&self.transformer_id)?.to_string();
        let geom = geometry(&self.geom)?.to_point()?;
        Ok(Transformer {
            id: 0,
            transformer_id,
            geom,
            substation_id: None,
            line_bushing_id: None,
            from_primary_node: None,
            to_secondary_node: None,
            primary_phasing: None,
            secondary_phasing: None,
            description: self.description,
            installation_type: self.installation_type,
            connection_code: self.connection_code,
            transformer_type: self.transformer_type,
            primary_voltage_rating_kv: self.primary_voltage_rating_kv,
            secondary_voltage_rating_kv: self.secondary_voltage_rating_kv,
            village: None,
            municipality: None,
            image: self.image,
            active: true,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineBushingRecord {
    pub line_bushing_id: Option<String>,
    pub geom: Option<GeometryCell>,
    pub description: Option<String>,
    pub phasing: Option<String>,
    pub conductor_type: Option<String>,
}

impl LineBushingRecord {
    pub fn key(&self) -> Option<&str> {
        self.line_bushing_id.as_deref()
    }

    pub fn role(&self) -> Role {
        Role::classify(self.description.as_deref())
    }

    pub fn into_row(self) -> Result<LineBushing, RowError> {
        let name = required(&self.line_bushing_id)?.to_string();
        let geom = geometry(&self.geom)?.to_line_string()?;
        Ok(LineBushing {
            id: 0,
            name,
            geom,
            role: self.role(),
            description: self.description,
            substation_id: None,
            primary_line_id: None,
            from_node: None,
            to_node: None,
            phasing: self.phasing,
            conductor_type: self.conductor_type,
            length_m: 0.0,
            village: None,
            municipality: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_role_is_classified_from_description() {
        let node = NodeRecord {
            bus_id: Some("N1".to_string()),
            geom: Some(GeoJson::Point([1.0, 2.0]).into()),
            description: Some("Primary Bus".to_string()),
            ..Default::default()
        }
        .into_row()
        .unwrap();
        assert_eq!(node.role, Role::Primary);
        assert_eq!(node.description.as_deref(), Some("Primary Bus"));
        assert!(node.active);
    }

    #[test]
    fn test_missing_or_blank_key_is_rejected() {
        let blank = NodeRecord {
            bus_id: Some("  ".to_string()),
            geom: Some(GeoJson::Point([1.0, 2.0]).into()),
            ..Default::default()
        };
        assert_eq!(blank.into_row().unwrap_err(), RowError::MissingKey);
        assert_eq!(
            TransformerRecord::default().into_row().unwrap_err(),
            RowError::MissingKey
        );
    }

    #[test]
    fn test_missing_geometry_is_rejected() {
        let record = PrimaryLineRecord {
            primary_line_id: Some("L1".to_string()),
            ..Default::default()
        };
        assert_eq!(record.into_row().unwrap_err(), RowError::MissingGeometry);
    }

    #[test]
    fn test_wrong_geometry_type_is_rejected() {
        let record = LineBushingRecord {
            line_bushing_id: Some("LB1".to_string()),
            geom: Some(GeoJson::Point([0.0, 0.0]).into()),
            ..Default::default()
        };
        assert!(matches!(record.into_row(), Err(RowError::Geometry(_))));
    }

    #[test]
    fn test_dataset_record_from_json() {
        let json = r#"{
            "generator_id": "S1",
            "geom": {"type": "Point", "coordinates": [0.0, 0.0]},
            "voltage_rating_kv": 13.8,
            "image": "photos/s1.jpg"
        }"#;
        let record: SubstationRecord = serde_json::from_str(json).unwrap();
        let row = record.into_row().unwrap();
        assert_eq!(row.name, "S1");
        assert_eq!(row.voltage_rating_kv, Some(13.8));
        assert_eq!(row.image.as_deref(), Some("photos/s1.jpg"));
        assert!(row.active);
    }

    #[test]
    fn test_undecodable_geometry_keeps_the_reason() {
        let record = PrimaryLineRecord {
            primary_line_id: Some("L1".to_string()),
            geom: Some(GeometryCell::parse(
                r#"{"type":"MultiLineString","coordinates":[[[0,0],[1,0]]]}"#,
            )),
            ..Default::default()
        };
        match record.into_row() {
            Err(RowError::MalformedGeometry(reason)) => assert!(reason.contains("MultiLineString")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_geometry_cell_parses_geojson_text() {
        assert_eq!(
            GeometryCell::parse(r#"{"type":"Point","coordinates":[1.5,2.0]}"#),
            GeometryCell::Decoded(GeoJson::Point([1.5, 2.0]))
        );
        assert!(matches!(GeometryCell::parse("not json"), GeometryCell::Malformed(_)));
    }
}
