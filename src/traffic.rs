use std::collections::BTreeMap;

use crate::chains::CheckpointChains;
use crate::ident::normalize;
use crate::ingest::{IngestStats, NodeIndex};
use crate::raw::{EdgeKind, RawEdge, ResourceKind};

/// Distinct ports retained per flow for display.
pub const MAX_FLOW_PORTS: usize = 5;

/// Rough bytes-per-call divisor for the approximate API-call estimate.
const EST_BYTES_PER_CALL: u64 = 4096;

/// One aggregated traffic record per (compute, resource) pair. Direction
/// is always compute -> resource regardless of which endpoint originated
/// the raw observation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TrafficFlow {
    pub source_id: String,
    pub target_id: String,
    pub checkpoint_ids: Vec<String>,
    pub ports: Vec<u16>,
    pub protocol: Option<String>,
    pub bytes: u64,
    pub connections: u64,
}

impl TrafficFlow {
    /// Approximate API-call count inferred from traffic volume. The
    /// estimate never undercuts the observed connection count.
    pub fn estimated_calls(&self) -> u64 {
        (self.bytes / EST_BYTES_PER_CALL).max(self.connections)
    }
}

/// Fold traffic-observation edges into at most one flow per canonical
/// (source, target) pair. Byte and connection totals accumulate
/// commutatively, so input edge order never changes them; only the
/// retained port list and the protocol (latest edge wins) depend on
/// arrival order.
pub fn aggregate_flows(
    edges: &[RawEdge],
    index: &NodeIndex<'_>,
    chains: &CheckpointChains,
    stats: &mut IngestStats,
) -> Vec<TrafficFlow> {
    let mut flows: BTreeMap<(String, String), TrafficFlow> = BTreeMap::new();

    for edge in edges {
        let Some(kind) = EdgeKind::from_tag(&edge.edge_type) else {
            continue;
        };
        if !kind.is_traffic() {
            continue;
        }
        let (Some(source), Some(target)) =
            (index.resolve(&edge.source), index.resolve(&edge.target))
        else {
            stats.dropped_edges += 1;
            continue;
        };

        let mut source_kind = ResourceKind::classify(&source.node_type);
        let mut target_kind = ResourceKind::classify(&target.node_type);
        let mut source_id = normalize(&source.id);
        let mut target_id = normalize(&target.id);

        // Collectors report storage-originated observations with the
        // bucket on the source side; flows always read compute -> resource.
        if target_kind.is_compute() && source_kind.is_data() {
            std::mem::swap(&mut source_id, &mut target_id);
            std::mem::swap(&mut source_kind, &mut target_kind);
        }
        if !(source_kind.is_compute() && target_kind.is_data()) {
            stats.dropped_edges += 1;
            continue;
        }

        let flow = flows
            .entry((source_id.clone(), target_id.clone()))
            .or_insert_with(|| TrafficFlow {
                checkpoint_ids: chains.chain_for(&source_id),
                source_id,
                target_id,
                ports: Vec::new(),
                protocol: None,
                bytes: 0,
                connections: 0,
            });
        if let Some(port) = edge.port
            && !flow.ports.contains(&port)
            && flow.ports.len() < MAX_FLOW_PORTS
        {
            flow.ports.push(port);
        }
        if edge.protocol.is_some() {
            flow.protocol = edge.protocol.clone();
        }
        flow.bytes += edge.traffic_bytes.unwrap_or(0);
        flow.connections += 1;
    }

    flows.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawNode;

    fn node(id: &str, node_type: &str) -> RawNode {
        RawNode {
            id: id.to_string(),
            node_type: node_type.to_string(),
            name: id.to_string(),
            vpc_id: None,
            subnet_id: None,
        }
    }

    fn traffic(source: &str, target: &str, port: u16, bytes: u64) -> RawEdge {
        RawEdge {
            source: source.to_string(),
            target: target.to_string(),
            edge_type: "ACTUAL_TRAFFIC".to_string(),
            port: Some(port),
            protocol: Some("tcp".to_string()),
            traffic_bytes: Some(bytes),
        }
    }

    fn fixture() -> Vec<RawNode> {
        vec![
            node("i-0011223344556677", "EC2Instance"),
            node("orders-db", "RDSDatabase"),
            node("orders-archive", "S3Bucket"),
        ]
    }

    #[test]
    fn duplicate_pairs_fold_into_one_flow() {
        let nodes = fixture();
        let index = NodeIndex::build(&nodes);
        let chains = CheckpointChains::default();
        let mut stats = IngestStats::default();
        let edges = vec![
            traffic("i-0011223344556677", "orders-db", 5432, 100),
            traffic("i-0011223344556677", "orders-db", 5432, 250),
        ];
        let flows = aggregate_flows(&edges, &index, &chains, &mut stats);
        assert_eq!(flows.len(), 1);
        assert_eq!(flows[0].bytes, 350);
        assert_eq!(flows[0].connections, 2);
        assert_eq!(flows[0].ports, vec![5432]);
    }

    #[test]
    fn totals_are_order_independent() {
        let nodes = fixture();
        let index = NodeIndex::build(&nodes);
        let chains = CheckpointChains::default();
        let mut edges = vec![
            traffic("i-0011223344556677", "orders-db", 5432, 10),
            traffic("i-0011223344556677", "orders-archive", 443, 7),
            traffic("i-0011223344556677", "orders-db", 5433, 90),
        ];
        let mut stats = IngestStats::default();
        let forward = aggregate_flows(&edges, &index, &chains, &mut stats);
        edges.reverse();
        let mut stats = IngestStats::default();
        let reversed = aggregate_flows(&edges, &index, &chains, &mut stats);
        for flow in &forward {
            let twin = reversed
                .iter()
                .find(|f| f.source_id == flow.source_id && f.target_id == flow.target_id)
                .unwrap();
            assert_eq!(twin.bytes, flow.bytes);
            assert_eq!(twin.connections, flow.connections);
        }
    }

    #[test]
    fn storage_originated_observation_is_swapped() {
        let nodes = fixture();
        let index = NodeIndex::build(&nodes);
        let chains = CheckpointChains::default();
        let mut stats = IngestStats::default();
        let mut edge = traffic("orders-archive", "i-0011223344556677", 443, 10);
        edge.edge_type = "S3_OPERATION".to_string();
        let flows = aggregate_flows(&[edge], &index, &chains, &mut stats);
        assert_eq!(flows.len(), 1);
        assert_eq!(flows[0].source_id, "i-0011223344556677");
        assert_eq!(flows[0].target_id, "orders-archive");
    }

    #[test]
    fn non_compute_to_resource_pairs_are_discarded() {
        let nodes = fixture();
        let index = NodeIndex::build(&nodes);
        let chains = CheckpointChains::default();
        let mut stats = IngestStats::default();
        // db -> bucket never survives normalization.
        let flows = aggregate_flows(
            &[traffic("orders-db", "orders-archive", 443, 10)],
            &index,
            &chains,
            &mut stats,
        );
        assert!(flows.is_empty());
        assert_eq!(stats.dropped_edges, 1);
    }

    #[test]
    fn unresolvable_endpoint_drops_the_edge() {
        let nodes = fixture();
        let index = NodeIndex::build(&nodes);
        let chains = CheckpointChains::default();
        let mut stats = IngestStats::default();
        let flows = aggregate_flows(
            &[traffic("i-0011223344556677", "ghost-bucket", 443, 10)],
            &index,
            &chains,
            &mut stats,
        );
        assert!(flows.is_empty());
        assert_eq!(stats.dropped_edges, 1);
    }

    #[test]
    fn port_list_is_deduped_and_capped() {
        let nodes = fixture();
        let index = NodeIndex::build(&nodes);
        let chains = CheckpointChains::default();
        let mut stats = IngestStats::default();
        let edges: Vec<RawEdge> = (0..8u16)
            .map(|i| traffic("i-0011223344556677", "orders-db", 5000 + (i % 7), 1))
            .collect();
        let flows = aggregate_flows(&edges, &index, &chains, &mut stats);
        assert_eq!(flows[0].ports.len(), MAX_FLOW_PORTS);
        assert_eq!(flows[0].connections, 8);
    }

    #[test]
    fn estimated_calls_never_undercut_connections() {
        let flow = TrafficFlow {
            source_id: "a".into(),
            target_id: "b".into(),
            checkpoint_ids: Vec::new(),
            ports: Vec::new(),
            protocol: None,
            bytes: 1024,
            connections: 9,
        };
        assert_eq!(flow.estimated_calls(), 9);
    }
}
