use std::sync::Arc;

use tokio::sync::broadcast;

use crate::domain::LengthMetric;
use crate::snapshot::{MapSnapshot, StatusChange};
use crate::store::NetworkStore;
use crate::writer::AssetWriter;

const STATUS_CHANNEL_CAPACITY: usize = 64;

/// The derived store together with its write path and status notifications.
#[derive(Debug, Clone)]
pub struct Network {
    store: Arc<NetworkStore>,
    writer: Arc<AssetWriter>,
    events: broadcast::Sender<StatusChange>,
}

impl Network {
    pub fn new(length_metric: LengthMetric) -> Self {
        Self::with_store(NetworkStore::new(), length_metric)
    }

    pub fn with_store(store: NetworkStore, length_metric: LengthMetric) -> Self {
        let (events, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        let writer = AssetWriter::new(length_metric).with_notifier(events.clone());
        Self {
            store: Arc::new(store),
            writer: Arc::new(writer),
            events,
        }
    }

    pub fn store(&self) -> &NetworkStore {
        &self.store
    }

    pub fn writer(&self) -> &AssetWriter {
        &self.writer
    }

    pub async fn snapshot(&self) -> MapSnapshot {
        self.store.read(MapSnapshot::from_tables).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.events.subscribe()
    }

    /// `None` when no substation has that name.
    pub async fn set_substation_active(&self, name: &str, active: bool) -> Option<StatusChange> {
        let writer = Arc::clone(&self.writer);
        self.store
            .write(|tables| writer.set_substation_active(tables, name, active))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Node, Role, Substation};
    use geo::Point;

    #[tokio::test]
    async fn test_status_change_reaches_subscribers_and_snapshot() {
        let network = Network::new(LengthMetric::Planar);
        let mut rx = network.subscribe();
        network
            .store()
            .write(|tables| {
                network.writer().write_substation(
                    tables,
                    Substation {
                        id: 0,
                        name: "S1".to_string(),
                        geom: Point::new(0.0, 0.0),
                        region_id: None,
                        phasing: None,
                        description: None,
                        voltage_rating_kv: Some(34.5),
                        village: None,
                        municipality: None,
                        image: None,
                        active: true,
                    },
                );
                network.writer().write_node(
                    tables,
                    Node {
                        id: 0,
                        name: "N1".to_string(),
                        geom: Point::new(0.0, 0.0),
                        substation_id: None,
                        role: Role::Primary,
                        description: None,
                        nominal_voltage_kv: None,
                        village: None,
                        municipality: None,
                        remarks: None,
                        active: true,
                    },
                );
            })
            .await;

        let change = network.set_substation_active("S1", false).await.unwrap();
        assert_eq!(change.propagated.nodes, 1);
        assert_eq!(rx.recv().await.unwrap(), change);

        let snapshot = network.snapshot().await;
        assert!(!snapshot.substations[0].properties.active);
        assert_eq!(snapshot.substations[0].properties.voltage_rating, 34.5);

        assert!(network.set_substation_active("nope", true).await.is_none());
    }
}
