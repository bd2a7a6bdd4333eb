use std::collections::HashSet;

use serde::Serialize;

use crate::model::SystemArchitecture;

/// Additions and removals between two successive architecture snapshots,
/// driving incremental-refresh badges in the host UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchitectureDiff {
    pub added_nodes: Vec<String>,
    pub removed_nodes: Vec<String>,
    pub added_edges: Vec<(String, String)>,
    pub removed_edges: Vec<(String, String)>,
}

impl ArchitectureDiff {
    pub fn is_empty(&self) -> bool {
        self.added_nodes.is_empty()
            && self.removed_nodes.is_empty()
            && self.added_edges.is_empty()
            && self.removed_edges.is_empty()
    }
}

fn node_ids(arch: &SystemArchitecture) -> HashSet<&str> {
    arch.service_nodes()
        .map(|node| node.id.as_str())
        .chain(arch.boundary_nodes.iter().map(|node| node.id.as_str()))
        .chain(arch.checkpoints().map(|cp| cp.id.as_str()))
        .collect()
}

fn edge_keys(arch: &SystemArchitecture) -> HashSet<(&str, &str)> {
    arch.flows
        .iter()
        .map(|flow| (flow.source_id.as_str(), flow.target_id.as_str()))
        .collect()
}

/// Pure set-difference diff on canonical node ids and (source, target)
/// flow keys. A `None` previous snapshot means first render: everything
/// counts as added.
pub fn diff(
    previous: Option<&SystemArchitecture>,
    current: &SystemArchitecture,
) -> ArchitectureDiff {
    let current_nodes = node_ids(current);
    let current_edges = edge_keys(current);
    let (previous_nodes, previous_edges) = match previous {
        Some(prev) => (node_ids(prev), edge_keys(prev)),
        None => (HashSet::new(), HashSet::new()),
    };

    let mut out = ArchitectureDiff {
        added_nodes: current_nodes
            .difference(&previous_nodes)
            .map(|id| id.to_string())
            .collect(),
        removed_nodes: previous_nodes
            .difference(&current_nodes)
            .map(|id| id.to_string())
            .collect(),
        added_edges: current_edges
            .difference(&previous_edges)
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect(),
        removed_edges: previous_edges
            .difference(&current_edges)
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect(),
    };
    // Stable report order for consumers and snapshots.
    out.added_nodes.sort();
    out.removed_nodes.sort();
    out.added_edges.sort();
    out.removed_edges.sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SystemArchitecture;

    fn snapshot(nodes: &[(&str, &str)], edges: &[(&str, &str)]) -> SystemArchitecture {
        let node_json: Vec<String> = nodes
            .iter()
            .map(|(id, ty)| format!(r#"{{"id": "{id}", "type": "{ty}", "name": "{id}"}}"#))
            .collect();
        let edge_json: Vec<String> = edges
            .iter()
            .map(|(from, to)| {
                format!(
                    r#"{{"source": "{from}", "target": "{to}", "edgeType": "ACTUAL_TRAFFIC", "trafficBytes": 1}}"#
                )
            })
            .collect();
        let payload = format!(
            r#"{{"nodes": [{}], "edges": [{}]}}"#,
            node_json.join(","),
            edge_json.join(",")
        );
        SystemArchitecture::from_json(&payload)
    }

    #[test]
    fn first_call_reports_everything_as_added() {
        let current = snapshot(
            &[("web", "EC2Instance"), ("orders-db", "RDSDatabase")],
            &[("web", "orders-db")],
        );
        let report = diff(None, &current);
        assert_eq!(report.added_nodes, vec!["orders-db", "web"]);
        assert!(report.removed_nodes.is_empty());
        assert_eq!(
            report.added_edges,
            vec![("web".to_string(), "orders-db".to_string())]
        );
    }

    #[test]
    fn reports_additions_and_removals_between_snapshots() {
        let previous = snapshot(
            &[
                ("web", "EC2Instance"),
                ("orders-db", "RDSDatabase"),
            ],
            &[("web", "orders-db")],
        );
        let current = snapshot(
            &[
                ("web", "EC2Instance"),
                ("events", "SQSQueue"),
            ],
            &[("web", "events")],
        );
        let report = diff(Some(&previous), &current);
        assert_eq!(report.added_nodes, vec!["events"]);
        assert_eq!(report.removed_nodes, vec!["orders-db"]);
        assert_eq!(
            report.added_edges,
            vec![("web".to_string(), "events".to_string())]
        );
        assert_eq!(
            report.removed_edges,
            vec![("web".to_string(), "orders-db".to_string())]
        );
    }

    #[test]
    fn identical_snapshots_diff_empty() {
        let previous = snapshot(&[("web", "EC2Instance")], &[]);
        let current = snapshot(&[("web", "EC2Instance")], &[]);
        assert!(diff(Some(&previous), &current).is_empty());
    }
}
