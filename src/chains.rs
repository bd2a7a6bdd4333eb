use std::collections::{BTreeSet, HashMap};

use crate::ident::normalize;
use crate::ingest::NodeIndex;
use crate::raw::{EdgeKind, RawEdge};

/// Per-compute attachment maps for the three checkpoint kinds. The NACL
/// link is transitive: compute -> subnet (`IN_SUBNET`) and subnet -> NACL
/// (`HAS_NACL`) combine into compute -> NACL.
#[derive(Debug, Default)]
pub struct CheckpointChains {
    security_group: HashMap<String, String>,
    role: HashMap<String, String>,
    subnet: HashMap<String, String>,
    nacl_by_subnet: HashMap<String, String>,
}

/// Checkpoint ids referenced by at least one attachment edge, grouped by
/// kind. Ordered sets keep downstream model assembly deterministic.
#[derive(Debug, Default)]
pub struct ReferencedCheckpoints {
    pub security_groups: BTreeSet<String>,
    pub network_acls: BTreeSet<String>,
    pub roles: BTreeSet<String>,
}

impl CheckpointChains {
    /// The compute endpoint must resolve against the node index; the
    /// checkpoint endpoint only needs a stable canonical id, since a
    /// checkpoint referenced by an edge but absent from the node set is
    /// later synthesized as a placeholder rather than dropped.
    pub fn build(edges: &[RawEdge], index: &NodeIndex<'_>) -> Self {
        let mut chains = Self::default();
        for edge in edges {
            let Some(kind) = EdgeKind::from_tag(&edge.edge_type) else {
                continue;
            };
            match kind {
                EdgeKind::SecurityGroupAttachment => {
                    let Some(compute) = index.resolve_canonical(&edge.source) else {
                        continue;
                    };
                    let checkpoint = canonical_or_literal(index, &edge.target);
                    chains.security_group.entry(compute).or_insert(checkpoint);
                }
                EdgeKind::RoleAttachment => {
                    let Some(compute) = index.resolve_canonical(&edge.source) else {
                        continue;
                    };
                    let checkpoint = canonical_or_literal(index, &edge.target);
                    chains.role.entry(compute).or_insert(checkpoint);
                }
                EdgeKind::SubnetContainment => {
                    let Some(compute) = index.resolve_canonical(&edge.source) else {
                        continue;
                    };
                    let subnet = canonical_or_literal(index, &edge.target);
                    chains.subnet.entry(compute).or_insert(subnet);
                }
                EdgeKind::NaclAssociation => {
                    let subnet = canonical_or_literal(index, &edge.source);
                    let nacl = canonical_or_literal(index, &edge.target);
                    chains.nacl_by_subnet.entry(subnet).or_insert(nacl);
                }
                _ => {}
            }
        }
        chains
    }

    pub fn security_group_of(&self, compute_id: &str) -> Option<&str> {
        self.security_group.get(compute_id).map(String::as_str)
    }

    pub fn role_of(&self, compute_id: &str) -> Option<&str> {
        self.role.get(compute_id).map(String::as_str)
    }

    pub fn subnet_of(&self, compute_id: &str) -> Option<&str> {
        self.subnet.get(compute_id).map(String::as_str)
    }

    pub fn nacl_of(&self, compute_id: &str) -> Option<&str> {
        let subnet = self.subnet.get(compute_id)?;
        self.nacl_by_subnet.get(subnet).map(String::as_str)
    }

    /// Ordered checkpoint chain for one compute node. The order models
    /// the traversal of a real request: filtered at the instance boundary
    /// (security group), then at the subnet boundary (network ACL), then
    /// authorized by identity (IAM role). Absent links are omitted, never
    /// reordered and never padded.
    pub fn chain_for(&self, compute_id: &str) -> Vec<String> {
        let mut chain = Vec::with_capacity(3);
        if let Some(sg) = self.security_group_of(compute_id) {
            chain.push(sg.to_string());
        }
        if let Some(nacl) = self.nacl_of(compute_id) {
            chain.push(nacl.to_string());
        }
        if let Some(role) = self.role_of(compute_id) {
            chain.push(role.to_string());
        }
        chain
    }

    pub fn referenced(&self) -> ReferencedCheckpoints {
        let mut refs = ReferencedCheckpoints::default();
        refs.security_groups
            .extend(self.security_group.values().cloned());
        refs.network_acls.extend(self.nacl_by_subnet.values().cloned());
        refs.roles.extend(self.role.values().cloned());
        refs
    }
}

fn canonical_or_literal(index: &NodeIndex<'_>, endpoint: &str) -> String {
    index
        .resolve_canonical(endpoint)
        .unwrap_or_else(|| normalize(endpoint))
}
