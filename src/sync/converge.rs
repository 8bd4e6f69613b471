//! Fixed-point pass over primary lines.
//!
//! A line can only resolve its owning substation once the node at its start
//! point has been handed one by the line feeding it. Lines written before their
//! feeder are picked up here, one hop further out each round.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use super::report::{ConvergenceReport, SyncError};
use crate::network::Network;
use crate::store::Tables;

/// Unowned lines whose from-node is the to-node of an owned line.
pub fn candidates(tables: &Tables) -> BTreeSet<String> {
    let fed: HashSet<&str> = tables
        .primary_lines
        .iter()
        .filter(|l| l.substation_id.is_some())
        .filter_map(|l| l.to_node.as_deref())
        .collect();
    tables
        .primary_lines
        .iter()
        .filter(|l| l.substation_id.is_none())
        .filter(|l| l.from_node.as_deref().is_some_and(|from| fed.contains(from)))
        .map(|l| l.line_id.clone())
        .collect()
}

/// Re-writes candidates until none remain, the candidate set stops changing,
/// or `max_rounds` rounds have run.
pub async fn converge_primary_lines(network: &Network, max_rounds: usize) -> ConvergenceReport {
    let mut report = ConvergenceReport::default();
    let mut previous: Option<BTreeSet<String>> = None;

    loop {
        let pending = network.store().read(candidates).await;
        if pending.is_empty() {
            return report;
        }
        if previous.as_ref() == Some(&pending) {
            report.error = Some(SyncError::NoProgress {
                rounds: report.rounds,
                pending: pending.len(),
            });
            return report;
        }
        if report.rounds >= max_rounds {
            report.error = Some(SyncError::ConvergenceLimit {
                limit: max_rounds,
                pending: pending.len(),
            });
            return report;
        }

        report.rounds += 1;
        debug!(round = report.rounds, pending = pending.len(), "re-resolving primary lines");

        let writer = network.writer();
        report.resolved += network
            .store()
            .write(|tables| {
                let mut resolved = 0;
                for key in &pending {
                    let Some(line) = tables.primary_lines.get_by_key(key).cloned() else {
                        continue;
                    };
                    let outcome = writer.write_primary_line(tables, line);
                    if tables
                        .primary_lines
                        .get(outcome.id)
                        .is_some_and(|l| l.substation_id.is_some())
                    {
                        resolved += 1;
                    }
                }
                resolved
            })
            .await;

        previous = Some(pending);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LengthMetric, PrimaryLine};
    use geo::LineString;

    fn line(key: &str, from: &str, to: &str, substation_id: Option<i64>) -> PrimaryLine {
        PrimaryLine {
            id: 0,
            line_id: key.to_string(),
            geom: LineString::from(vec![(0.0, 0.0), (1.0, 0.0)]),
            substation_id,
            node_id: None,
            from_node: Some(from.to_string()),
            to_node: Some(to.to_string()),
            phasing: None,
            description: None,
            configuration: None,
            system_grounding_type: None,
            conductor_type: None,
            neutral_wire_type: None,
            earth_resistivity: None,
            length_m: 0.0,
            village: None,
            municipality: None,
            active: true,
        }
    }

    #[test]
    fn test_candidates_follow_owned_to_nodes() {
        let mut tables = Tables::default();
        tables.primary_lines.upsert(line("L1", "S", "A", Some(1)));
        tables.primary_lines.upsert(line("L2", "A", "B", None));
        tables.primary_lines.upsert(line("L3", "B", "C", None));
        tables.primary_lines.upsert(line("L4", "X", "Y", None));

        let found = candidates(&tables);
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec!["L2".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_store_converges_immediately() {
        let network = Network::new(LengthMetric::Planar);
        let report = converge_primary_lines(&network, 5).await;
        assert_eq!(report, ConvergenceReport::default());
    }
}
