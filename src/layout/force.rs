use std::collections::{BTreeMap, HashMap};

use crate::config::LayoutConfig;
use crate::model::SystemArchitecture;

use super::{EdgeLayout, NodeLayout, SceneLayout};

const NODE_SIZE: f32 = 48.0;
// Golden angle in radians; spreads seeded positions evenly without RNG.
const SEED_ANGLE: f32 = 2.399_963;
const SEED_SPACING: f32 = 18.0;

/// One simulated body. Owned by the simulation only; positions are the
/// node center, copied out into a fresh [`SceneLayout`] at the end.
#[derive(Debug, Clone)]
pub struct SimNode {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

/// Fixed-budget force integrator for the exploratory "all resources"
/// view. `step` is a plain state transition with no scheduling baked in:
/// a frame callback, a timer, or the bundled [`run`](Self::run) loop can
/// all drive it. Always halts after exactly `max_ticks` steps.
#[derive(Debug, Clone)]
pub struct ForceSimulation {
    nodes: Vec<SimNode>,
    links: Vec<(usize, usize)>,
    drawn_links: Vec<(usize, usize)>,
    ticks_done: u32,
    config: LayoutConfig,
}

impl ForceSimulation {
    /// Seed a fresh simulation from a snapshot. Bodies are created for
    /// compute nodes, resource nodes, and checkpoints; spring links for
    /// every flow and for each compute-to-checkpoint attachment. Initial
    /// positions lie on a golden-angle spiral around the canvas center,
    /// so repeated runs over the same snapshot reproduce exactly.
    pub fn new(arch: &SystemArchitecture, config: &LayoutConfig) -> Self {
        let cx = config.canvas_width / 2.0;
        let cy = config.canvas_height / 2.0;

        let mut nodes = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let push = |id: &str, nodes: &mut Vec<SimNode>, index: &mut HashMap<String, usize>| {
            if index.contains_key(id) {
                return;
            }
            let i = nodes.len();
            let radius = SEED_SPACING * ((i + 1) as f32).sqrt();
            let angle = i as f32 * SEED_ANGLE;
            nodes.push(SimNode {
                id: id.to_string(),
                x: cx + radius * angle.cos(),
                y: cy + radius * angle.sin(),
                vx: 0.0,
                vy: 0.0,
            });
            index.insert(id.to_string(), i);
        };

        for node in arch.service_nodes() {
            push(&node.id, &mut nodes, &mut index);
        }
        for cp in arch.checkpoints() {
            push(&cp.id, &mut nodes, &mut index);
        }

        let mut links = Vec::new();
        let mut drawn_links = Vec::new();
        for flow in &arch.flows {
            let (Some(&a), Some(&b)) = (index.get(&flow.source_id), index.get(&flow.target_id))
            else {
                continue;
            };
            links.push((a, b));
            drawn_links.push((a, b));
            for checkpoint_id in &flow.checkpoint_ids {
                if let Some(&c) = index.get(checkpoint_id) {
                    // Invisible spring: clusters checkpoints near the
                    // compute node they guard.
                    links.push((a, c));
                }
            }
        }

        Self {
            nodes,
            links,
            drawn_links,
            ticks_done: 0,
            config: config.clone(),
        }
    }

    /// Annealing factor: decays linearly from 1 to 0 over the budget.
    pub fn alpha(&self) -> f32 {
        let max = self.config.force.max_ticks.max(1);
        1.0 - self.ticks_done as f32 / max as f32
    }

    pub fn is_finished(&self) -> bool {
        self.ticks_done >= self.config.force.max_ticks
    }

    pub fn ticks_done(&self) -> u32 {
        self.ticks_done
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    /// Advance one tick. Returns `false` once the budget is exhausted;
    /// there is no convergence-based early exit, so total work is bounded
    /// at `max_ticks * (n^2 + e)` regardless of input.
    pub fn step(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        let force = &self.config.force;
        let alpha = self.alpha();
        let cx = self.config.canvas_width / 2.0;
        let cy = self.config.canvas_height / 2.0;

        // Gravity toward the canvas center, annealed by alpha.
        for node in &mut self.nodes {
            node.vx += (cx - node.x) * force.gravity * alpha;
            node.vy += (cy - node.y) * force.gravity * alpha;
        }

        // Pairwise repulsion inside the minimum-distance threshold. The
        // distance floor keeps coincident bodies from dividing by zero.
        for i in 0..self.nodes.len() {
            for j in (i + 1)..self.nodes.len() {
                let dx = self.nodes[j].x - self.nodes[i].x;
                let dy = self.nodes[j].y - self.nodes[i].y;
                let dist = (dx * dx + dy * dy).sqrt().max(1.0);
                if dist >= force.min_distance {
                    continue;
                }
                let push = force.repulsion / (dist * dist);
                let fx = dx / dist * push;
                let fy = dy / dist * push;
                self.nodes[i].vx -= fx;
                self.nodes[i].vy -= fy;
                self.nodes[j].vx += fx;
                self.nodes[j].vy += fy;
            }
        }

        // Springs pull linked pairs toward the rest length.
        for &(a, b) in &self.links {
            let dx = self.nodes[b].x - self.nodes[a].x;
            let dy = self.nodes[b].y - self.nodes[a].y;
            let dist = (dx * dx + dy * dy).sqrt().max(1.0);
            let stretch = (dist - force.link_distance) * force.spring * alpha;
            let fx = dx / dist * stretch;
            let fy = dy / dist * stretch;
            self.nodes[a].vx += fx;
            self.nodes[a].vy += fy;
            self.nodes[b].vx -= fx;
            self.nodes[b].vy -= fy;
        }

        // Integrate with damping, clamp to the canvas minus margin.
        let min_x = force.margin;
        let min_y = force.margin;
        let max_x = (self.config.canvas_width - force.margin).max(min_x);
        let max_y = (self.config.canvas_height - force.margin).max(min_y);
        for node in &mut self.nodes {
            node.vx *= force.damping;
            node.vy *= force.damping;
            node.x = (node.x + node.vx).clamp(min_x, max_x);
            node.y = (node.y + node.vy).clamp(min_y, max_y);
        }

        self.ticks_done += 1;
        !self.is_finished()
    }

    /// Drive the simulation to its budget in a plain loop.
    pub fn run(&mut self) {
        while self.step() {}
    }

    /// Copy final positions into a scene. Flow links become straight
    /// center-to-center segments; attachment springs stay invisible.
    pub fn into_layout(self) -> SceneLayout {
        let mut nodes = BTreeMap::new();
        for sim in &self.nodes {
            nodes.insert(
                sim.id.clone(),
                NodeLayout {
                    id: sim.id.clone(),
                    x: sim.x - NODE_SIZE / 2.0,
                    y: sim.y - NODE_SIZE / 2.0,
                    width: NODE_SIZE,
                    height: NODE_SIZE,
                    container: None,
                },
            );
        }
        let edges = self
            .drawn_links
            .iter()
            .map(|&(a, b)| EdgeLayout {
                from: self.nodes[a].id.clone(),
                to: self.nodes[b].id.clone(),
                points: vec![
                    (self.nodes[a].x, self.nodes[a].y),
                    (self.nodes[b].x, self.nodes[b].y),
                ],
            })
            .collect();
        SceneLayout {
            nodes,
            edges,
            containers: Vec::new(),
            width: self.config.canvas_width,
            height: self.config.canvas_height,
        }
    }
}

pub(super) fn compute_force_layout(
    arch: &SystemArchitecture,
    config: &LayoutConfig,
) -> SceneLayout {
    let mut sim = ForceSimulation::new(arch, config);
    sim.run();
    sim.into_layout()
}
