use std::collections::HashMap;

use crate::ident::{instance_token, normalize};
use crate::raw::RawNode;

/// Lookup indices over the raw node set, keyed three ways: canonical id,
/// embedded instance token, and display name. Raw edges reference their
/// endpoints inconsistently depending on which collector emitted them, so
/// endpoint resolution walks the indices in that order.
pub struct NodeIndex<'a> {
    nodes: &'a [RawNode],
    by_canonical: HashMap<String, usize>,
    by_token: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
}

/// Counters for expected ingestion events. A dropped edge is not an
/// error; it is surfaced in the dump so operators can see collector skew.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct IngestStats {
    pub dropped_edges: usize,
    pub ignored_edge_tags: usize,
}

impl<'a> NodeIndex<'a> {
    pub fn build(nodes: &'a [RawNode]) -> Self {
        let mut by_canonical = HashMap::with_capacity(nodes.len());
        let mut by_token = HashMap::new();
        let mut by_name = HashMap::new();
        for (idx, node) in nodes.iter().enumerate() {
            // First occurrence wins so duplicate records keep resolving
            // to one canonical entry.
            by_canonical.entry(normalize(&node.id)).or_insert(idx);
            if let Some(token) = instance_token(&node.id) {
                by_token.entry(token.to_string()).or_insert(idx);
            }
            let name = node.name.trim();
            if !name.is_empty() {
                by_name.entry(name.to_string()).or_insert(idx);
            }
        }
        Self {
            nodes,
            by_canonical,
            by_token,
            by_name,
        }
    }

    /// Resolve an edge endpoint to its raw node: canonical match, then
    /// instance-token match, then display-name match. `None` means the
    /// edge should be dropped.
    pub fn resolve(&self, endpoint: &str) -> Option<&'a RawNode> {
        if let Some(&idx) = self.by_canonical.get(&normalize(endpoint)) {
            return Some(&self.nodes[idx]);
        }
        if let Some(token) = instance_token(endpoint)
            && let Some(&idx) = self.by_token.get(token)
        {
            return Some(&self.nodes[idx]);
        }
        if let Some(&idx) = self.by_name.get(endpoint.trim()) {
            return Some(&self.nodes[idx]);
        }
        None
    }

    /// Canonical id of a resolved endpoint, or `None` when unresolvable.
    pub fn resolve_canonical(&self, endpoint: &str) -> Option<String> {
        self.resolve(endpoint).map(|node| normalize(&node.id))
    }

    pub fn nodes(&self) -> &'a [RawNode] {
        self.nodes
    }
}
