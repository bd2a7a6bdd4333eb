use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::LayoutConfig;
use crate::model::{CheckpointKind, ServiceNode, SystemArchitecture};
use crate::raw::ResourceKind;

use super::{ContainerLayout, EdgeLayout, NodeLayout, SceneLayout, bounds};

/// Fixed left-to-right lane priority, modeling the order a network
/// request traverses the account: perimeter controls, then the subnet
/// filter, then the workload, then its identity, then the data it
/// reaches. Boundary kinds are containers, not lanes.
fn lane_priority(kind: ResourceKind) -> usize {
    match kind {
        ResourceKind::SecurityGroup => 0,
        ResourceKind::NetworkAcl => 1,
        ResourceKind::Compute => 2,
        ResourceKind::IamRole => 3,
        ResourceKind::Database => 4,
        ResourceKind::Storage => 5,
        ResourceKind::Queue => 6,
        ResourceKind::Topic => 7,
        ResourceKind::Vpc | ResourceKind::Subnet | ResourceKind::Unknown => 8,
    }
}

fn checkpoint_priority(kind: CheckpointKind) -> usize {
    match kind {
        CheckpointKind::SecurityGroup => 0,
        CheckpointKind::NetworkAcl => 1,
        CheckpointKind::IamRole => 3,
    }
}

enum Band<'a> {
    Subnet(&'a ServiceNode),
    VpcDirect(&'a ServiceNode),
    Free,
}

impl Band<'_> {
    fn is_container(&self) -> bool {
        !matches!(self, Band::Free)
    }
}

struct Item {
    id: String,
    priority: usize,
    band: usize,
}

/// Deterministic lane layout for the grouped structural view. Identical
/// input always yields byte-identical coordinates: every ordering below
/// derives from model order or an explicit sort, never from hash-map
/// iteration or random seeding.
pub(super) fn compute_lane_layout(
    arch: &SystemArchitecture,
    config: &LayoutConfig,
) -> SceneLayout {
    let lanes = &config.lanes;

    // Vertical bands: each subnet is a band, grouped under its VPC, with
    // a direct band per VPC for nodes outside any subnet, orphan subnets
    // after, and one free band for everything unbounded.
    let vpcs: Vec<&ServiceNode> = arch
        .boundary_nodes
        .iter()
        .filter(|node| node.kind == ResourceKind::Vpc)
        .collect();
    let subnets: Vec<&ServiceNode> = arch
        .boundary_nodes
        .iter()
        .filter(|node| node.kind == ResourceKind::Subnet)
        .collect();
    let vpc_ids: HashSet<&str> = vpcs.iter().map(|vpc| vpc.id.as_str()).collect();

    let mut bands: Vec<Band<'_>> = Vec::new();
    let mut band_of_subnet: HashMap<&str, usize> = HashMap::new();
    let mut band_of_vpc: HashMap<&str, usize> = HashMap::new();
    for vpc in &vpcs {
        for subnet in &subnets {
            if subnet.vpc_id.as_deref() == Some(vpc.id.as_str()) {
                band_of_subnet.insert(subnet.id.as_str(), bands.len());
                bands.push(Band::Subnet(subnet));
            }
        }
        band_of_vpc.insert(vpc.id.as_str(), bands.len());
        bands.push(Band::VpcDirect(vpc));
    }
    for subnet in &subnets {
        let orphan = match subnet.vpc_id.as_deref() {
            Some(vpc_id) => !vpc_ids.contains(vpc_id),
            None => true,
        };
        if orphan {
            band_of_subnet.insert(subnet.id.as_str(), bands.len());
            bands.push(Band::Subnet(subnet));
        }
    }
    let free_band = bands.len();
    bands.push(Band::Free);

    // Bucket nodes into (band, lane) cells in discovery order.
    let mut items: Vec<Item> = Vec::new();
    for node in arch.service_nodes() {
        let band = node
            .subnet_id
            .as_deref()
            .and_then(|subnet_id| band_of_subnet.get(subnet_id).copied())
            .or_else(|| {
                node.vpc_id
                    .as_deref()
                    .and_then(|vpc_id| band_of_vpc.get(vpc_id).copied())
            })
            .unwrap_or(free_band);
        items.push(Item {
            id: node.id.clone(),
            priority: lane_priority(node.kind),
            band,
        });
    }
    for cp in arch.checkpoints() {
        items.push(Item {
            id: cp.id.clone(),
            priority: checkpoint_priority(cp.kind),
            band: free_band,
        });
    }

    // Compact the used priorities into contiguous columns.
    let mut used: Vec<usize> = items.iter().map(|item| item.priority).collect();
    used.sort_unstable();
    used.dedup();
    let column: HashMap<usize, usize> = used
        .iter()
        .enumerate()
        .map(|(col, &priority)| (priority, col))
        .collect();
    let lane_x =
        |col: usize| lanes.margin + col as f32 * (lanes.node_width + lanes.lane_gap);

    // Row counts per band decide band heights up front.
    let mut cell_counts: Vec<HashMap<usize, usize>> = vec![HashMap::new(); bands.len()];
    for item in &items {
        *cell_counts[item.band].entry(item.priority).or_insert(0) += 1;
    }
    let rows_in_band: Vec<usize> = cell_counts
        .iter()
        .map(|cells| cells.values().copied().max().unwrap_or(0))
        .collect();

    let mut band_y = vec![0.0f32; bands.len()];
    let mut band_height = vec![0.0f32; bands.len()];
    let mut current_y = lanes.margin;
    for (idx, band) in bands.iter().enumerate() {
        let rows = rows_in_band[idx];
        band_y[idx] = current_y;
        if rows == 0 {
            continue;
        }
        let content =
            rows as f32 * lanes.node_height + (rows as f32 - 1.0) * lanes.node_gap;
        band_height[idx] = if band.is_container() {
            lanes.container_pad_top + content + lanes.container_pad_bottom
        } else {
            content
        };
        current_y += band_height[idx] + lanes.container_gap_y;
    }

    let mut nodes: BTreeMap<String, NodeLayout> = BTreeMap::new();
    let mut row_cursor: Vec<HashMap<usize, usize>> = vec![HashMap::new(); bands.len()];
    for item in &items {
        let row = {
            let cursor = row_cursor[item.band].entry(item.priority).or_insert(0);
            let row = *cursor;
            *cursor += 1;
            row
        };
        let content_y = if bands[item.band].is_container() {
            band_y[item.band] + lanes.container_pad_top
        } else {
            band_y[item.band]
        };
        nodes.insert(
            item.id.clone(),
            NodeLayout {
                id: item.id.clone(),
                x: lane_x(column[&item.priority]),
                y: content_y + row as f32 * (lanes.node_height + lanes.node_gap),
                width: lanes.node_width,
                height: lanes.node_height,
                container: None,
            },
        );
    }

    // Containers: VPC regions first so subnet parents can reference
    // them, rects filled once their children are known.
    let mut containers: Vec<ContainerLayout> = Vec::new();
    let mut container_of_vpc: HashMap<&str, usize> = HashMap::new();
    for vpc in &vpcs {
        container_of_vpc.insert(vpc.id.as_str(), containers.len());
        containers.push(ContainerLayout {
            id: vpc.id.clone(),
            label: vpc.name.clone(),
            nodes: Vec::new(),
            parent: None,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        });
    }

    let mut members_of_band: Vec<Vec<&str>> = vec![Vec::new(); bands.len()];
    for item in &items {
        members_of_band[item.band].push(item.id.as_str());
    }

    for (band_idx, band) in bands.iter().enumerate() {
        let Band::Subnet(subnet) = band else {
            continue;
        };
        let members = &members_of_band[band_idx];
        if members.is_empty() {
            continue;
        }
        let mut min_x = f32::MAX;
        let mut max_x = f32::MIN;
        for id in members {
            let node = &nodes[*id];
            min_x = min_x.min(node.x);
            max_x = max_x.max(node.x + node.width);
        }
        let parent = subnet
            .vpc_id
            .as_deref()
            .and_then(|vpc_id| container_of_vpc.get(vpc_id).copied());
        let container_idx = containers.len();
        containers.push(ContainerLayout {
            id: subnet.id.clone(),
            label: subnet.name.clone(),
            nodes: members.iter().map(|id| id.to_string()).collect(),
            parent,
            x: min_x - lanes.container_pad_x,
            y: band_y[band_idx],
            width: max_x - min_x + 2.0 * lanes.container_pad_x,
            height: band_height[band_idx],
        });
        for id in members {
            if let Some(node) = nodes.get_mut(*id) {
                node.container = Some(container_idx);
            }
        }
    }

    // Direct VPC members nest straight under the VPC region.
    for (band_idx, band) in bands.iter().enumerate() {
        let Band::VpcDirect(vpc) = band else {
            continue;
        };
        let Some(&container_idx) = container_of_vpc.get(vpc.id.as_str()) else {
            continue;
        };
        for id in &members_of_band[band_idx] {
            containers[container_idx].nodes.push(id.to_string());
            if let Some(node) = nodes.get_mut(*id) {
                node.container = Some(container_idx);
            }
        }
    }

    // VPC rects wrap their subnet regions plus direct members.
    let subnet_rects: Vec<(Option<usize>, f32, f32, f32, f32)> = containers
        .iter()
        .skip(vpcs.len())
        .map(|sub| (sub.parent, sub.x, sub.y, sub.width, sub.height))
        .collect();
    let mut empty_vpcs: Vec<usize> = Vec::new();
    for (vpc_idx, vpc) in vpcs.iter().enumerate() {
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for (parent, x, y, width, height) in &subnet_rects {
            if *parent != Some(vpc_idx) {
                continue;
            }
            min_x = min_x.min(*x);
            min_y = min_y.min(*y);
            max_x = max_x.max(x + width);
            max_y = max_y.max(y + height);
        }
        if let Some(&band_idx) = band_of_vpc.get(vpc.id.as_str()) {
            for id in &members_of_band[band_idx] {
                let node = &nodes[*id];
                min_x = min_x.min(node.x);
                min_y = min_y.min(node.y);
                max_x = max_x.max(node.x + node.width);
                max_y = max_y.max(node.y + node.height);
            }
        }
        if min_x == f32::MAX {
            empty_vpcs.push(vpc_idx);
            continue;
        }
        let region = &mut containers[vpc_idx];
        region.x = min_x - lanes.container_pad_x;
        region.y = min_y - lanes.container_pad_top;
        region.width = max_x - min_x + 2.0 * lanes.container_pad_x;
        region.height = max_y - min_y + lanes.container_pad_top + lanes.container_pad_bottom;
    }
    // Drop childless VPC regions, remapping indices held by children.
    if !empty_vpcs.is_empty() {
        let mut remap: Vec<Option<usize>> = Vec::with_capacity(containers.len());
        let mut next = 0usize;
        for idx in 0..containers.len() {
            if idx < vpcs.len() && empty_vpcs.contains(&idx) {
                remap.push(None);
            } else {
                remap.push(Some(next));
                next += 1;
            }
        }
        let mut kept = Vec::with_capacity(next);
        for (idx, mut container) in containers.into_iter().enumerate() {
            if remap[idx].is_none() {
                continue;
            }
            container.parent = container.parent.and_then(|parent| remap[parent]);
            kept.push(container);
        }
        containers = kept;
        for node in nodes.values_mut() {
            node.container = node.container.and_then(|idx| remap[idx]);
        }
    }

    // Shift the scene so the outermost region starts at the margin; VPC
    // padding can otherwise reach above it.
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    for node in nodes.values() {
        min_x = min_x.min(node.x);
        min_y = min_y.min(node.y);
    }
    for container in &containers {
        min_x = min_x.min(container.x);
        min_y = min_y.min(container.y);
    }
    if min_x != f32::MAX {
        let dx = lanes.margin - min_x;
        let dy = lanes.margin - min_y;
        if dx != 0.0 || dy != 0.0 {
            for node in nodes.values_mut() {
                node.x += dx;
                node.y += dy;
            }
            for container in &mut containers {
                container.x += dx;
                container.y += dy;
            }
        }
    }

    // Orthogonal edge routing through the inter-lane gutters: one edge
    // per flow plus one per compute-to-checkpoint attachment.
    let mut edges: Vec<EdgeLayout> = Vec::new();
    let mut seen_edges: HashSet<(String, String)> = HashSet::new();
    let mut route = |from_id: &str, to_id: &str, edges: &mut Vec<EdgeLayout>| {
        let (Some(from), Some(to)) = (nodes.get(from_id), nodes.get(to_id)) else {
            return;
        };
        if !seen_edges.insert((from_id.to_string(), to_id.to_string())) {
            return;
        }
        edges.push(EdgeLayout {
            from: from_id.to_string(),
            to: to_id.to_string(),
            points: orthogonal_route(from, to),
        });
    };
    for flow in &arch.flows {
        for checkpoint_id in &flow.checkpoint_ids {
            route(&flow.source_id, checkpoint_id, &mut edges);
        }
        route(&flow.source_id, &flow.target_id, &mut edges);
    }

    let (max_x, max_y) = bounds(&nodes, &containers);
    SceneLayout {
        nodes,
        edges,
        containers,
        width: (max_x + lanes.margin).max(200.0),
        height: (max_y + lanes.margin).max(200.0),
    }
}

/// Three-segment orthogonal polyline between lane columns; collapses to
/// a straight segment when the endpoints are already aligned.
fn orthogonal_route(from: &NodeLayout, to: &NodeLayout) -> Vec<(f32, f32)> {
    let forward = to.center().0 >= from.center().0;
    let (fx, fy) = if forward {
        (from.x + from.width, from.center().1)
    } else {
        (from.x, from.center().1)
    };
    let (tx, ty) = if forward {
        (to.x, to.center().1)
    } else {
        (to.x + to.width, to.center().1)
    };
    if (fy - ty).abs() < f32::EPSILON {
        return vec![(fx, fy), (tx, ty)];
    }
    let mid_x = (fx + tx) / 2.0;
    vec![(fx, fy), (mid_x, fy), (mid_x, ty), (tx, ty)]
}
