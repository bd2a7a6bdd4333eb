use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::diff::ArchitectureDiff;
use crate::ingest::IngestStats;
use crate::layout::SceneLayout;
use crate::model::{NodeCategory, Severity, SystemArchitecture, Totals};
use crate::raw::ResourceKind;

/// Renderer-facing output: the architecture snapshot, per-node
/// coordinates from the selected strategy, and the incremental diff.
#[derive(Debug, Serialize)]
pub struct ArchitectureDump {
    pub strategy: String,
    pub width: f32,
    pub height: f32,
    pub totals: Totals,
    pub exposure: BTreeMap<&'static str, usize>,
    pub stats: IngestStats,
    pub nodes: Vec<NodeDump>,
    pub checkpoints: Vec<CheckpointDump>,
    pub flows: Vec<FlowDump>,
    pub containers: Vec<ContainerDump>,
    pub edges: Vec<EdgeDump>,
    pub diff: ArchitectureDiff,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub name: String,
    pub short_name: String,
    pub kind: ResourceKind,
    pub category: NodeCategory,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub container: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct CheckpointDump {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub used_count: u32,
    pub total_count: u32,
    pub gap_count: u32,
    pub severity: Severity,
    pub synthetic: bool,
    pub rule_count: usize,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Serialize)]
pub struct FlowDump {
    pub source: String,
    pub target: String,
    pub checkpoints: Vec<String>,
    pub ports: Vec<u16>,
    pub protocol: Option<String>,
    pub bytes: u64,
    pub connections: u64,
    pub estimated_calls: u64,
}

#[derive(Debug, Serialize)]
pub struct ContainerDump {
    pub id: String,
    pub label: String,
    pub parent: Option<usize>,
    pub nodes: Vec<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub from: String,
    pub to: String,
    pub points: Vec<[f32; 2]>,
}

impl ArchitectureDump {
    pub fn new(
        arch: &SystemArchitecture,
        layout: &SceneLayout,
        diff: ArchitectureDiff,
        strategy: &str,
    ) -> Self {
        let position = |id: &str| {
            layout
                .nodes
                .get(id)
                .map(|node| (node.x, node.y, node.width, node.height, node.container))
                .unwrap_or((0.0, 0.0, 0.0, 0.0, None))
        };

        let nodes = arch
            .service_nodes()
            .map(|node| {
                let (x, y, width, height, container) = position(&node.id);
                NodeDump {
                    id: node.id.clone(),
                    name: node.name.clone(),
                    short_name: node.short_name.clone(),
                    kind: node.kind,
                    category: node.category,
                    x,
                    y,
                    width,
                    height,
                    container,
                }
            })
            .collect();

        let checkpoints = arch
            .checkpoints()
            .map(|cp| {
                let (x, y, _, _, _) = position(&cp.id);
                CheckpointDump {
                    id: cp.id.clone(),
                    kind: format!("{:?}", cp.kind),
                    name: cp.name.clone(),
                    used_count: cp.used_count,
                    total_count: cp.total_count,
                    gap_count: cp.gap_count,
                    severity: cp.severity(),
                    synthetic: cp.synthetic,
                    rule_count: cp.rules.len(),
                    x,
                    y,
                }
            })
            .collect();

        let flows = arch
            .flows
            .iter()
            .map(|flow| FlowDump {
                source: flow.source_id.clone(),
                target: flow.target_id.clone(),
                checkpoints: flow.checkpoint_ids.clone(),
                ports: flow.ports.clone(),
                protocol: flow.protocol.clone(),
                bytes: flow.bytes,
                connections: flow.connections,
                estimated_calls: flow.estimated_calls(),
            })
            .collect();

        let containers = layout
            .containers
            .iter()
            .map(|container| ContainerDump {
                id: container.id.clone(),
                label: container.label.clone(),
                parent: container.parent,
                nodes: container.nodes.clone(),
                x: container.x,
                y: container.y,
                width: container.width,
                height: container.height,
            })
            .collect();

        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                from: edge.from.clone(),
                to: edge.to.clone(),
                points: edge.points.iter().map(|(x, y)| [*x, *y]).collect(),
            })
            .collect();

        ArchitectureDump {
            strategy: strategy.to_string(),
            width: layout.width,
            height: layout.height,
            totals: arch.totals,
            exposure: arch.exposure_summary(),
            stats: arch.stats,
            nodes,
            checkpoints,
            flows,
            containers,
            edges,
            diff,
        }
    }
}

pub fn write_dump(path: &Path, dump: &ArchitectureDump) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, dump)?;
    Ok(())
}
