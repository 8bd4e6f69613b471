use geo::{LineString, Point, Polygon};
use serde::{Deserialize, Serialize};

use super::Role;

/// Internal numeric id assigned by the derived store.
pub type AssetId = i64;

/// Asset types in synchronization dependency order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AssetKind {
    Region,
    Substation,
    Node,
    PrimaryLine,
    TransformerType,
    ConductorType,
    Transformer,
    LineBushing,
}

/// Franchise area polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: AssetId,
    pub key: String,
    pub geom: Polygon<f64>,
    pub village: Option<String>,
    pub municipality: Option<String>,
    pub power_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Substation {
    pub id: AssetId,
    /// Generator name, the business key.
    pub name: String,
    pub geom: Point<f64>,
    pub region_id: Option<AssetId>,
    pub phasing: Option<String>,
    pub description: Option<String>,
    pub voltage_rating_kv: Option<f64>,
    pub village: Option<String>,
    pub municipality: Option<String>,
    pub image: Option<String>,
    pub active: bool,
}

/// Bus or pole node where lines meet.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: AssetId,
    pub name: String,
    pub geom: Point<f64>,
    pub substation_id: Option<AssetId>,
    pub role: Role,
    pub description: Option<String>,
    pub nominal_voltage_kv: Option<f64>,
    pub village: Option<String>,
    pub municipality: Option<String>,
    pub remarks: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryLine {
    pub id: AssetId,
    pub line_id: String,
    pub geom: LineString<f64>,
    pub substation_id: Option<AssetId>,
    /// Internal id of the primary node at the end point.
    pub node_id: Option<AssetId>,
    pub from_node: Option<String>,
    pub to_node: Option<String>,
    pub phasing: Option<String>,
    pub description: Option<String>,
    pub configuration: Option<String>,
    pub system_grounding_type: Option<String>,
    pub conductor_type: Option<String>,
    pub neutral_wire_type: Option<String>,
    pub earth_resistivity: Option<i32>,
    pub length_m: f64,
    pub village: Option<String>,
    pub municipality: Option<String>,
    pub active: bool,
}

/// Distribution transformer.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformer {
    pub id: AssetId,
    pub transformer_id: String,
    pub geom: Point<f64>,
    pub substation_id: Option<AssetId>,
    pub line_bushing_id: Option<AssetId>,
    pub from_primary_node: Option<String>,
    pub to_secondary_node: Option<String>,
    pub primary_phasing: Option<String>,
    pub secondary_phasing: Option<String>,
    pub description: Option<String>,
    pub installation_type: Option<String>,
    pub connection_code: Option<i32>,
    /// Name of a `TransformerType` row.
    pub transformer_type: Option<String>,
    pub primary_voltage_rating_kv: Option<f64>,
    pub secondary_voltage_rating_kv: Option<f64>,
    pub village: Option<String>,
    pub municipality: Option<String>,
    pub image: Option<String>,
    pub active: bool,
}

/// Short conductor between a line and a transformer terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct LineBushing {
    pub id: AssetId,
    pub name: String,
    pub geom: LineString<f64>,
    pub role: Role,
    pub description: Option<String>,
    pub substation_id: Option<AssetId>,
    pub primary_line_id: Option<AssetId>,
    pub from_node: Option<String>,
    pub to_node: Option<String>,
    pub phasing: Option<String>,
    pub conductor_type: Option<String>,
    pub length_m: f64,
    pub village: Option<String>,
    pub municipality: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformerType {
    pub id: AssetId,
    pub name: String,
    pub kva_rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConductorType {
    pub id: AssetId,
    pub name: String,
}

impl TransformerType {
    /// Builds a lookup row, reading the kVA rating out of the label.
    pub fn from_label(label: &str) -> Self {
        Self {
            id: 0,
            name: label.to_string(),
            kva_rating: parse_kva_rating(label),
        }
    }
}

/// First decimal number inside the last whitespace-separated token,
/// e.g. `"Single Phase 37.5kVA"` gives `37.5`.
pub fn parse_kva_rating(label: &str) -> Option<f64> {
    static NUMBER: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let number = NUMBER.get_or_init(|| {
        regex::Regex::new(r"\d+\.?\d*").expect("static kVA pattern compiles")
    });
    let token = label.split_whitespace().last()?;
    number.find(token)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kva_rating() {
        assert_eq!(parse_kva_rating("Single Phase 25kVA"), Some(25.0));
        assert_eq!(parse_kva_rating("Pole Mounted 37.5"), Some(37.5));
        assert_eq!(parse_kva_rating("CSP-10"), Some(10.0));
        assert_eq!(parse_kva_rating("Pad 3 Phase"), None);
        assert_eq!(parse_kva_rating("   "), None);
    }

    #[test]
    fn test_transformer_type_from_label() {
        let t = TransformerType::from_label("Conventional 50kVA");
        assert_eq!(t.name, "Conventional 50kVA");
        assert_eq!(t.kva_rating, Some(50.0));
    }

    #[test]
    fn test_asset_kind_names() {
        assert_eq!(AssetKind::PrimaryLine.to_string(), "primary_line");
        assert_eq!("line_bushing".parse::<AssetKind>().unwrap(), AssetKind::LineBushing);
    }
}
