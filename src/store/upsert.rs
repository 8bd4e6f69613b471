//! Merge contract shared by every write into the derived store.
//!
//! A write locates the existing row by business key. When there is none the
//! incoming row is inserted under a fresh id. Otherwise only the attributes the
//! source owns are copied over: the id and the business key never change, and
//! derived fields are left for the writer to recompute.

use crate::domain::{
    AssetId, ConductorType, LineBushing, Node, PrimaryLine, Region, Substation, Transformer,
    TransformerType,
};

pub trait Upsert: Clone {
    fn id(&self) -> AssetId;
    fn set_id(&mut self, id: AssetId);
    fn business_key(&self) -> &str;
    /// Copies the source-owned attributes of `incoming` onto `self`.
    fn merge_from(&mut self, incoming: Self);
}

impl Upsert for Region {
    fn id(&self) -> AssetId {
        self.id
    }
    fn set_id(&mut self, id: AssetId) {
        self.id = id;
    }
    fn business_key(&self) -> &str {
        &self.key
    }
    fn merge_from(&mut self, incoming: Self) {
        self.geom = incoming.geom;
        self.village = incoming.village;
        self.municipality = incoming.municipality;
        self.power_status = incoming.power_status;
    }
}

impl Upsert for Substation {
    fn id(&self) -> AssetId {
        self.id
    }
    fn set_id(&mut self, id: AssetId) {
        self.id = id;
    }
    fn business_key(&self) -> &str {
        &self.name
    }
    fn merge_from(&mut self, incoming: Self) {
        self.geom = incoming.geom;
        self.phasing = incoming.phasing;
        self.description = incoming.description;
        self.voltage_rating_kv = incoming.voltage_rating_kv;
        self.image = incoming.image;
        self.active = incoming.active;
    }
}

impl Upsert for Node {
    fn id(&self) -> AssetId {
        self.id
    }
    fn set_id(&mut self, id: AssetId) {
        self.id = id;
    }
    fn business_key(&self) -> &str {
        &self.name
    }
    fn merge_from(&mut self, incoming: Self) {
        self.geom = incoming.geom;
        self.role = incoming.role;
        self.description = incoming.description;
        self.nominal_voltage_kv = incoming.nominal_voltage_kv;
        self.remarks = incoming.remarks;
        self.active = incoming.active;
    }
}

impl Upsert for PrimaryLine {
    fn id(&self) -> AssetId {
        self.id
    }
    fn set_id(&mut self, id: AssetId) {
        self.id = id;
    }
    fn business_key(&self) -> &str {
        &self.line_id
    }
    fn merge_from(&mut self, incoming: Self) {
        self.geom = incoming.geom;
        self.phasing = incoming.phasing;
        self.description = incoming.description;
        self.configuration = incoming.configuration;
        self.system_grounding_type = incoming.system_grounding_type;
        self.conductor_type = incoming.conductor_type;
        self.neutral_wire_type = incoming.neutral_wire_type;
        self.earth_resistivity = incoming.earth_resistivity;
        self.active = incoming.active;
    }
}

impl Upsert for Transformer {
    fn id(&self) -> AssetId {
        self.id
    }
    fn set_id(&mut self, id: AssetId) {
        self.id = id;
    }
    fn business_key(&self) -> &str {
        &self.transformer_id
    }
    // Connectivity fields and the active flag belong to the bushing cascade.
    fn merge_from(&mut self, incoming: Self) {
        self.geom = incoming.geom;
        self.description = incoming.description;
        self.installation_type = incoming.installation_type;
        self.connection_code = incoming.connection_code;
        self.transformer_type = incoming.transformer_type;
        self.primary_voltage_rating_kv = incoming.primary_voltage_rating_kv;
        self.secondary_voltage_rating_kv = incoming.secondary_voltage_rating_kv;
        self.image = incoming.image;
    }
}

impl Upsert for LineBushing {
    fn id(&self) -> AssetId {
        self.id
    }
    fn set_id(&mut self, id: AssetId) {
        self.id = id;
    }
    fn business_key(&self) -> &str {
        &self.name
    }
    fn merge_from(&mut self, incoming: Self) {
        self.geom = incoming.geom;
        self.role = incoming.role;
        self.description = incoming.description;
        self.phasing = incoming.phasing;
        self.conductor_type = incoming.conductor_type;
    }
}

impl Upsert for TransformerType {
    fn id(&self) -> AssetId {
        self.id
    }
    fn set_id(&mut self, id: AssetId) {
        self.id = id;
    }
    fn business_key(&self) -> &str {
        &self.name
    }
    fn merge_from(&mut self, incoming: Self) {
        self.kva_rating = incoming.kva_rating;
    }
}

impl Upsert for ConductorType {
    fn id(&self) -> AssetId {
        self.id
    }
    fn set_id(&mut self, id: AssetId) {
        self.id = id;
    }
    fn business_key(&self) -> &str {
        &self.name
    }
    fn merge_from(&mut self, _incoming: Self) {}
}
