use serde::Serialize;

use crate::domain::AssetId;
use crate::store::Tables;

/// Rows whose active flag actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PropagationCount {
    pub nodes: usize,
    pub primary_lines: usize,
    pub transformers: usize,
}

impl PropagationCount {
    pub fn total(&self) -> usize {
        self.nodes + self.primary_lines + self.transformers
    }
}

/// Fans a substation's active flag out to the assets it owns.
///
/// One level only: nodes, primary lines and transformers whose owning
/// substation is `substation_id`. Line bushings carry no active flag and are
/// left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusPropagator;

impl StatusPropagator {
    pub fn propagate(&self, tables: &mut Tables, substation_id: AssetId, active: bool) -> PropagationCount {
        PropagationCount {
            nodes: apply(
                tables.nodes.iter_mut().map(|n| (n.substation_id, &mut n.active)),
                substation_id,
                active,
            ),
            primary_lines: apply(
                tables.primary_lines.iter_mut().map(|l| (l.substation_id, &mut l.active)),
                substation_id,
                active,
            ),
            transformers: apply(
                tables.transformers.iter_mut().map(|t| (t.substation_id, &mut t.active)),
                substation_id,
                active,
            ),
        }
    }
}

fn apply<'a>(
    rows: impl Iterator<Item = (Option<AssetId>, &'a mut bool)>,
    substation_id: AssetId,
    active: bool,
) -> usize {
    let mut changed = 0;
    for (owner, flag) in rows {
        if owner == Some(substation_id) && *flag != active {
            *flag = active;
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Node, Role};
    use geo::Point;

    fn node(name: &str, substation_id: Option<AssetId>) -> Node {
        Node {
            id: 0,
            name: name.to_string(),
            geom: Point::new(0.0, 0.0),
            substation_id,
            role: Role::Primary,
            description: None,
            nominal_voltage_kv: None,
            village: None,
            municipality: None,
            remarks: None,
            active: true,
        }
    }

    #[test]
    fn test_propagates_only_to_owned_rows() {
        let mut tables = Tables::default();
        tables.nodes.upsert(node("owned", Some(1)));
        tables.nodes.upsert(node("other", Some(2)));
        tables.nodes.upsert(node("orphan", None));

        let count = StatusPropagator.propagate(&mut tables, 1, false);
        assert_eq!(count.nodes, 1);
        assert!(!tables.nodes.get_by_key("owned").unwrap().active);
        assert!(tables.nodes.get_by_key("other").unwrap().active);
        assert!(tables.nodes.get_by_key("orphan").unwrap().active);
    }

    #[test]
    fn test_propagation_is_idempotent() {
        let mut tables = Tables::default();
        tables.nodes.upsert(node("owned", Some(1)));

        assert_eq!(StatusPropagator.propagate(&mut tables, 1, false).total(), 1);
        let after_first = tables.clone();
        assert_eq!(StatusPropagator.propagate(&mut tables, 1, false).total(), 0);
        assert_eq!(tables, after_first);
    }
}
