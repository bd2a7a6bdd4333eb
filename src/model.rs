use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::chains::CheckpointChains;
use crate::ident::{normalize, short_name};
use crate::ingest::{IngestStats, NodeIndex};
use crate::raw::{EdgeKind, RawGraph, ResourceKind};
use crate::traffic::{TrafficFlow, aggregate_flows};

#[derive(Debug, thiserror::Error)]
pub enum ArchmapError {
    #[error("invalid graph payload: {0}")]
    Payload(#[source] serde_json::Error),
    #[error("invalid rule-usage payload: {0}")]
    RuleUsage(#[source] serde_json::Error),
    #[error("invalid role-gap payload: {0}")]
    RoleGaps(#[source] serde_json::Error),
}

/// Display category consumed by the renderer: compute on the left,
/// everything it talks to on the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    Compute,
    Resource,
}

/// Display-ready node. Immutable once the builder has produced it.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceNode {
    pub id: String,
    pub name: String,
    pub short_name: String,
    pub category: NodeCategory,
    pub kind: ResourceKind,
    pub vpc_id: Option<String>,
    pub subnet_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointKind {
    SecurityGroup,
    NetworkAcl,
    IamRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    Used,
    Unused,
    Unobserved,
}

/// One rule from the rule-usage data source, fetched per checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointRule {
    pub direction: String,
    pub protocol: String,
    pub from_port: u16,
    pub to_port: u16,
    pub source: String,
    pub status: RuleStatus,
    #[serde(default)]
    pub flow_count: u64,
}

/// Unused-permission share buckets, mirroring the risk tiers the
/// least-privilege analysis reports per identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Moderate,
    None,
}

/// A security-control node mediating traffic: security group, network
/// ACL, or IAM role. `gap_count` is derived, never stored stale: every
/// mutation of usage data goes through [`SecurityCheckpoint::set_usage`].
#[derive(Debug, Clone, Serialize)]
pub struct SecurityCheckpoint {
    pub id: String,
    pub kind: CheckpointKind,
    pub name: String,
    pub used_count: u32,
    pub total_count: u32,
    pub gap_count: u32,
    pub rules: Vec<CheckpointRule>,
    pub synthetic: bool,
}

impl SecurityCheckpoint {
    fn named(id: String, kind: CheckpointKind, name: String) -> Self {
        Self {
            id,
            kind,
            name,
            used_count: 0,
            total_count: 0,
            gap_count: 0,
            rules: Vec::new(),
            synthetic: false,
        }
    }

    /// Placeholder for a checkpoint referenced by an edge but absent from
    /// the raw node set. Carries the id as its display name so the UI
    /// never shows a dangling reference.
    fn placeholder(id: String, kind: CheckpointKind) -> Self {
        Self {
            name: id.clone(),
            synthetic: true,
            ..Self::named(id, kind, String::new())
        }
    }

    pub fn set_usage(&mut self, used_count: u32, total_count: u32) {
        self.used_count = used_count.min(total_count);
        self.total_count = total_count;
        self.gap_count = total_count - self.used_count;
    }

    pub fn severity(&self) -> Severity {
        if self.total_count == 0 || self.gap_count == 0 {
            return Severity::None;
        }
        let share = self.gap_count as f64 / self.total_count as f64;
        if share >= 0.5 {
            Severity::Critical
        } else if share >= 0.25 {
            Severity::High
        } else {
            Severity::Moderate
        }
    }
}

/// Per-role gap summary from the least-privilege data source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleGapSummary {
    pub used_count: u32,
    pub total_count: u32,
    #[serde(default)]
    pub gap_count: u32,
}

/// Rollup counters over one architecture snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub compute_count: usize,
    pub resource_count: usize,
    pub checkpoint_count: usize,
    pub flow_count: usize,
    pub total_bytes: u64,
    pub total_connections: u64,
    pub gap_count: u64,
}

/// Aggregate root: the full architecture view for one ingestion cycle.
/// Each cycle constructs a fresh snapshot; superseded snapshots live only
/// as long as the change detector needs them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemArchitecture {
    pub compute_nodes: Vec<ServiceNode>,
    pub resource_nodes: Vec<ServiceNode>,
    pub boundary_nodes: Vec<ServiceNode>,
    pub security_groups: Vec<SecurityCheckpoint>,
    pub network_acls: Vec<SecurityCheckpoint>,
    pub iam_roles: Vec<SecurityCheckpoint>,
    pub flows: Vec<TrafficFlow>,
    pub totals: Totals,
    pub stats: IngestStats,
}

impl SystemArchitecture {
    /// Build a snapshot from the raw payload. Never fails: an empty or
    /// unusable payload yields an empty but structurally valid model.
    pub fn build(raw: &RawGraph) -> Self {
        if raw.is_empty() {
            return Self::default();
        }

        let index = NodeIndex::build(&raw.nodes);
        let chains = CheckpointChains::build(&raw.edges, &index);
        let mut stats = IngestStats {
            ignored_edge_tags: raw
                .edges
                .iter()
                .filter(|edge| EdgeKind::from_tag(&edge.edge_type).is_none())
                .count(),
            ..IngestStats::default()
        };

        let flows = aggregate_flows(&raw.edges, &index, &chains, &mut stats);

        let mut arch = Self {
            flows,
            stats,
            ..Self::default()
        };

        let mut seen: HashSet<String> = HashSet::new();
        for raw_node in index.nodes() {
            let id = normalize(&raw_node.id);
            if !seen.insert(id.clone()) {
                continue;
            }
            let kind = ResourceKind::classify(&raw_node.node_type);
            let name = if raw_node.name.trim().is_empty() {
                id.clone()
            } else {
                raw_node.name.trim().to_string()
            };
            match kind {
                ResourceKind::SecurityGroup => arch
                    .security_groups
                    .push(SecurityCheckpoint::named(id, CheckpointKind::SecurityGroup, name)),
                ResourceKind::NetworkAcl => arch
                    .network_acls
                    .push(SecurityCheckpoint::named(id, CheckpointKind::NetworkAcl, name)),
                ResourceKind::IamRole => arch
                    .iam_roles
                    .push(SecurityCheckpoint::named(id, CheckpointKind::IamRole, name)),
                _ => {
                    let category = if kind.is_compute() {
                        NodeCategory::Compute
                    } else {
                        NodeCategory::Resource
                    };
                    let node = ServiceNode {
                        short_name: short_name(&name),
                        id,
                        name,
                        category,
                        kind,
                        vpc_id: raw_node.vpc_id.as_deref().map(normalize),
                        subnet_id: raw_node.subnet_id.as_deref().map(normalize),
                    };
                    if kind.is_boundary() {
                        arch.boundary_nodes.push(node);
                    } else if kind.is_compute() {
                        arch.compute_nodes.push(node);
                    } else {
                        arch.resource_nodes.push(node);
                    }
                }
            }
        }

        arch.synthesize_missing_checkpoints(&chains);
        arch.recompute_totals();
        arch
    }

    /// Decode-then-build; a payload that fails to decode degrades to the
    /// empty model, matching the no-data semantics of a missing payload.
    pub fn from_json(text: &str) -> Self {
        match decode_graph(text) {
            Ok(raw) => Self::build(&raw),
            Err(_) => Self::default(),
        }
    }

    fn synthesize_missing_checkpoints(&mut self, chains: &CheckpointChains) {
        let referenced = chains.referenced();
        for id in &referenced.security_groups {
            if !self.security_groups.iter().any(|cp| &cp.id == id) {
                self.security_groups
                    .push(SecurityCheckpoint::placeholder(id.clone(), CheckpointKind::SecurityGroup));
            }
        }
        for id in &referenced.network_acls {
            if !self.network_acls.iter().any(|cp| &cp.id == id) {
                self.network_acls
                    .push(SecurityCheckpoint::placeholder(id.clone(), CheckpointKind::NetworkAcl));
            }
        }
        for id in &referenced.roles {
            if !self.iam_roles.iter().any(|cp| &cp.id == id) {
                self.iam_roles
                    .push(SecurityCheckpoint::placeholder(id.clone(), CheckpointKind::IamRole));
            }
        }
    }

    pub fn checkpoints(&self) -> impl Iterator<Item = &SecurityCheckpoint> {
        self.security_groups
            .iter()
            .chain(self.network_acls.iter())
            .chain(self.iam_roles.iter())
    }

    fn checkpoints_mut(&mut self) -> impl Iterator<Item = &mut SecurityCheckpoint> {
        self.security_groups
            .iter_mut()
            .chain(self.network_acls.iter_mut())
            .chain(self.iam_roles.iter_mut())
    }

    pub fn checkpoint(&self, id: &str) -> Option<&SecurityCheckpoint> {
        self.checkpoints().find(|cp| cp.id == id)
    }

    /// All display nodes, compute first, in builder order.
    pub fn service_nodes(&self) -> impl Iterator<Item = &ServiceNode> {
        self.compute_nodes
            .iter()
            .chain(self.resource_nodes.iter())
    }

    /// Apply rule-usage data for one checkpoint. Unknown ids are ignored
    /// (the rule source and the graph source drift independently).
    pub fn apply_rule_usage(&mut self, checkpoint_id: &str, rules: Vec<CheckpointRule>) {
        let Some(cp) = self.checkpoints_mut().find(|cp| cp.id == checkpoint_id) else {
            return;
        };
        let used = rules
            .iter()
            .filter(|rule| rule.status == RuleStatus::Used)
            .count() as u32;
        let total = rules.len() as u32;
        cp.rules = rules;
        cp.set_usage(used, total);
        self.recompute_totals();
    }

    /// Apply an IAM gap summary, keyed by role name (the gap source does
    /// not know graph ids). `gap_count` is re-derived from used/total so
    /// the invariant holds even when the source reports a stale value.
    pub fn apply_role_gaps(&mut self, role_name: &str, summary: RoleGapSummary) {
        let Some(role) = self
            .iam_roles
            .iter_mut()
            .find(|cp| cp.name == role_name || cp.id == role_name)
        else {
            return;
        };
        role.set_usage(summary.used_count, summary.total_count);
        self.recompute_totals();
    }

    /// Apply a whole rule-usage payload; entries for unknown checkpoints
    /// are skipped, so partial auxiliary data still lands.
    pub fn apply_rule_usage_payload(&mut self, payload: BTreeMap<String, Vec<CheckpointRule>>) {
        for (id, rules) in payload {
            self.apply_rule_usage(&id, rules);
        }
    }

    pub fn apply_role_gap_payload(&mut self, payload: BTreeMap<String, RoleGapSummary>) {
        for (name, summary) in payload {
            self.apply_role_gaps(&name, summary);
        }
    }

    /// Recompute rollups from scratch. Always a fresh sum; a cached total
    /// would go stale the moment auxiliary data lands.
    fn recompute_totals(&mut self) {
        self.totals = Totals {
            compute_count: self.compute_nodes.len(),
            resource_count: self.resource_nodes.len(),
            checkpoint_count: self.checkpoints().count(),
            flow_count: self.flows.len(),
            total_bytes: self.flows.iter().map(|flow| flow.bytes).sum(),
            total_connections: self.flows.iter().map(|flow| flow.connections).sum(),
            gap_count: self.checkpoints().map(|cp| cp.gap_count as u64).sum(),
        };
    }

    /// Checkpoint count per severity bucket, for the account-level
    /// exposure summary in the dump.
    pub fn exposure_summary(&self) -> BTreeMap<&'static str, usize> {
        let mut summary = BTreeMap::new();
        for cp in self.checkpoints() {
            let key = match cp.severity() {
                Severity::Critical => "critical",
                Severity::High => "high",
                Severity::Moderate => "moderate",
                Severity::None => "none",
            };
            *summary.entry(key).or_insert(0) += 1;
        }
        summary
    }
}

pub fn decode_graph(text: &str) -> Result<RawGraph, ArchmapError> {
    serde_json::from_str(text).map_err(ArchmapError::Payload)
}

pub fn decode_rule_usage(
    text: &str,
) -> Result<BTreeMap<String, Vec<CheckpointRule>>, ArchmapError> {
    serde_json::from_str(text).map_err(ArchmapError::RuleUsage)
}

pub fn decode_role_gaps(text: &str) -> Result<BTreeMap<String, RoleGapSummary>, ArchmapError> {
    serde_json::from_str(text).map_err(ArchmapError::RoleGaps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> &'static str {
        r#"{
            "nodes": [
                {"id": "i-0011223344556677", "type": "EC2Instance", "name": "web", "vpcId": "vpc-1", "subnetId": "subnet-1"},
                {"id": "orders-db", "type": "RDSDatabase", "name": "orders-db"},
                {"id": "sg-1", "type": "SecurityGroup", "name": "web-sg"},
                {"id": "subnet-1", "type": "Subnet", "name": "private-a"},
                {"id": "vpc-1", "type": "VPC", "name": "main"}
            ],
            "edges": [
                {"source": "i-0011223344556677", "target": "sg-1", "edgeType": "HAS_SECURITY_GROUP"},
                {"source": "i-0011223344556677", "target": "subnet-1", "edgeType": "IN_SUBNET"},
                {"source": "subnet-1", "target": "acl-ghost", "edgeType": "HAS_NACL"},
                {"source": "i-0011223344556677", "target": "app-role", "edgeType": "USES_ROLE"},
                {"source": "i-0011223344556677", "target": "orders-db", "edgeType": "ACTUAL_TRAFFIC", "port": 5432, "trafficBytes": 2048},
                {"source": "i-0011223344556677", "target": "orders-db", "edgeType": "SOMETHING_ODD"}
            ]
        }"#
    }

    #[test]
    fn builds_a_complete_snapshot() {
        let arch = SystemArchitecture::from_json(payload());
        assert_eq!(arch.compute_nodes.len(), 1);
        assert_eq!(arch.resource_nodes.len(), 1);
        assert_eq!(arch.boundary_nodes.len(), 2);
        assert_eq!(arch.flows.len(), 1);
        assert_eq!(arch.totals.flow_count, 1);
        assert_eq!(arch.totals.total_bytes, 2048);
        assert_eq!(arch.stats.ignored_edge_tags, 1);
    }

    #[test]
    fn referenced_but_missing_checkpoints_become_placeholders() {
        let arch = SystemArchitecture::from_json(payload());
        let acl = arch.checkpoint("acl-ghost").unwrap();
        assert!(acl.synthetic);
        assert_eq!(acl.name, "acl-ghost");
        let role = arch.checkpoint("app-role").unwrap();
        assert!(role.synthetic);
        // The named security group is real.
        assert!(!arch.checkpoint("sg-1").unwrap().synthetic);
    }

    #[test]
    fn flow_carries_the_full_checkpoint_chain_in_order() {
        let arch = SystemArchitecture::from_json(payload());
        assert_eq!(
            arch.flows[0].checkpoint_ids,
            vec!["sg-1", "acl-ghost", "app-role"]
        );
    }

    #[test]
    fn empty_and_malformed_payloads_yield_empty_models() {
        let empty = SystemArchitecture::from_json("{}");
        assert_eq!(empty.totals, Totals::default());
        let garbage = SystemArchitecture::from_json("not json at all");
        assert!(garbage.flows.is_empty());
        assert!(garbage.compute_nodes.is_empty());
    }

    #[test]
    fn gap_invariant_holds_after_every_update() {
        let mut arch = SystemArchitecture::from_json(payload());
        let rules = vec![
            CheckpointRule {
                direction: "ingress".into(),
                protocol: "tcp".into(),
                from_port: 443,
                to_port: 443,
                source: "0.0.0.0/0".into(),
                status: RuleStatus::Used,
                flow_count: 12,
            },
            CheckpointRule {
                direction: "ingress".into(),
                protocol: "tcp".into(),
                from_port: 22,
                to_port: 22,
                source: "0.0.0.0/0".into(),
                status: RuleStatus::Unused,
                flow_count: 0,
            },
            CheckpointRule {
                direction: "egress".into(),
                protocol: "udp".into(),
                from_port: 53,
                to_port: 53,
                source: "10.0.0.0/8".into(),
                status: RuleStatus::Unobserved,
                flow_count: 0,
            },
        ];
        arch.apply_rule_usage("sg-1", rules);
        let sg = arch.checkpoint("sg-1").unwrap();
        assert_eq!((sg.used_count, sg.total_count, sg.gap_count), (1, 3, 2));

        arch.apply_role_gaps(
            "app-role",
            RoleGapSummary {
                used_count: 4,
                total_count: 10,
                gap_count: 99,
            },
        );
        let expected: u64 = arch.checkpoints().map(|cp| cp.gap_count as u64).sum();
        assert_eq!(arch.totals.gap_count, expected);
        assert_eq!(arch.checkpoint("app-role").unwrap().gap_count, 6);
    }

    #[test]
    fn unknown_auxiliary_ids_are_skipped() {
        let mut arch = SystemArchitecture::from_json(payload());
        let before = arch.totals;
        arch.apply_rule_usage("sg-nonexistent", Vec::new());
        arch.apply_role_gaps(
            "never-heard-of-it",
            RoleGapSummary {
                used_count: 1,
                total_count: 2,
                gap_count: 1,
            },
        );
        assert_eq!(arch.totals, before);
    }

    #[test]
    fn severity_buckets_follow_the_unused_share() {
        let mut cp = SecurityCheckpoint::named(
            "sg-1".into(),
            CheckpointKind::SecurityGroup,
            "sg".into(),
        );
        assert_eq!(cp.severity(), Severity::None);
        cp.set_usage(1, 2);
        assert_eq!(cp.severity(), Severity::Critical);
        cp.set_usage(3, 4);
        assert_eq!(cp.severity(), Severity::High);
        cp.set_usage(9, 10);
        assert_eq!(cp.severity(), Severity::Moderate);
        cp.set_usage(10, 10);
        assert_eq!(cp.severity(), Severity::None);
    }
}
