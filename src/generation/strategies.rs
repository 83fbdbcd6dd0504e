//! Topology construction strategies.
//!
//! Each strategy places nodes, marks one Start and one or more Exit nodes, and
//! wires directed connections. Connectivity repair and special nodes are left
//! to the generator's post-processing pass.

use rand::seq::SliceRandom;
use rand::Rng;
use std::f32::consts::TAU;
use tracing::debug;

use super::node_types::{layer_node_type, pick_node_type};
use super::{GenerationConfig, TopologyType};
use crate::constants::*;
use crate::topology::{ConnectionKind, MapTopology, NodeId, NodeType, Position};

use super::generator::MapRng;

/// Build the requested layout into an empty topology.
/// Returns the strategy that actually ran.
pub fn build(
    topology_type: TopologyType,
    topology: &mut MapTopology,
    config: &GenerationConfig,
    rng: &mut MapRng,
) -> TopologyType {
    match topology_type {
        TopologyType::Linear => build_linear(topology, config, rng),
        TopologyType::Branching => build_branching(topology, config, rng),
        TopologyType::Grid => build_grid(topology, config, rng),
        TopologyType::Circular => build_circular(topology, config, rng),
        TopologyType::Tree => build_tree(topology, config, rng),
        TopologyType::Network => build_network(topology, config, rng),
        TopologyType::Maze => {
            debug!("maze topology generated as grid");
            build_grid(topology, config, rng);
            return TopologyType::Grid;
        }
        TopologyType::Spiral => build_spiral(topology, config, rng),
        TopologyType::Random => {
            let chosen = TopologyType::RANDOM_POOL
                .choose(rng)
                .copied()
                .unwrap_or(TopologyType::Linear);
            debug!(chosen = chosen.as_str(), "random topology resolved");
            return build(chosen, topology, config, rng);
        }
    }
    topology_type
}

/// Position of the `index`-th of `count` nodes on a layer, centred vertically
fn layer_position(config: &GenerationConfig, layer: usize, index: usize, count: usize) -> Position {
    let x = MAP_MARGIN + layer as f32 * config.layer_spacing;
    let offset = index as f32 - (count.saturating_sub(1)) as f32 / 2.0;
    let y = config.map_size.height / 2.0 + offset * config.node_spacing;
    Position::new(x, y)
}

/// Ring/spiral index mapped onto the configured layer count
fn layer_of(index: usize, count: usize, layers: usize) -> usize {
    if count == 0 {
        return 0;
    }
    index * layers / count
}

pub fn build_linear(topology: &mut MapTopology, config: &GenerationConfig, rng: &mut MapRng) {
    let layers = config.map_layers;
    let mut previous: Option<NodeId> = None;
    for layer in 0..layers {
        let node_type = layer_node_type(config.generation_rule, layer, layers, rng);
        let id = topology.add_node(node_type, layer_position(config, layer, 0, 1), layer);
        if let Some(prev) = previous {
            topology.connect(prev, id, ConnectionKind::Forward);
        }
        previous = Some(id);
    }
}

pub fn build_branching(topology: &mut MapTopology, config: &GenerationConfig, rng: &mut MapRng) {
    let layers = config.map_layers;
    let width = config.nodes_per_layer;
    let mut previous: Vec<NodeId> = Vec::new();

    for layer in 0..layers {
        let count = if layer == 0 || layer + 1 == layers {
            1
        } else {
            rng.gen_range(width.saturating_sub(1).max(1)..=width + 1)
        };

        let current: Vec<NodeId> = (0..count)
            .map(|index| {
                let node_type = layer_node_type(config.generation_rule, layer, layers, rng);
                topology.add_node(node_type, layer_position(config, layer, index, count), layer)
            })
            .collect();

        if !previous.is_empty() {
            let mut has_incoming = vec![false; current.len()];
            for &from in &previous {
                let fan_out = rng.gen_range(1..=2).min(current.len());
                let targets: Vec<usize> =
                    rand::seq::index::sample(rng, current.len(), fan_out).into_vec();
                for target in targets {
                    topology.connect(from, current[target], ConnectionKind::Forward);
                    has_incoming[target] = true;
                }
            }
            for (index, incoming) in has_incoming.iter().enumerate() {
                if !incoming {
                    if let Some(&from) = previous.choose(rng) {
                        topology.connect(from, current[index], ConnectionKind::Forward);
                    }
                }
            }
        }

        previous = current;
    }
}

pub fn build_grid(topology: &mut MapTopology, config: &GenerationConfig, rng: &mut MapRng) {
    let rows = config.map_layers;
    let cols = config.nodes_per_layer;
    let start_col = cols / 2;
    let mut grid: Vec<Vec<NodeId>> = Vec::with_capacity(rows);

    for row in 0..rows {
        let cells = (0..cols)
            .map(|col| {
                let node_type = if row == 0 && col == start_col {
                    NodeType::Start
                } else if row + 1 == rows {
                    NodeType::Exit
                } else {
                    pick_node_type(config.generation_rule, row, rows, rng)
                };
                topology.add_node(node_type, layer_position(config, row, col, cols), row)
            })
            .collect();
        grid.push(cells);
    }

    for row in 0..rows {
        for col in 0..cols {
            let here = grid[row][col];
            if row + 1 < rows {
                let next = &grid[row + 1];
                topology.connect(here, next[col], ConnectionKind::Forward);
                if col > 0 && rng.gen_bool(GRID_DIAGONAL_CHANCE) {
                    topology.connect(here, next[col - 1], ConnectionKind::Forward);
                }
                if col + 1 < cols && rng.gen_bool(GRID_DIAGONAL_CHANCE) {
                    topology.connect(here, next[col + 1], ConnectionKind::Forward);
                }
            }
            if col + 1 < cols {
                let right = grid[row][col + 1];
                topology.connect(here, right, ConnectionKind::Lateral);
                topology.connect(right, here, ConnectionKind::Lateral);
            }
        }
    }
}

pub fn build_circular(topology: &mut MapTopology, config: &GenerationConfig, rng: &mut MapRng) {
    let layers = config.map_layers;
    let count = (layers * 2).max(4);
    let center = Position::new(config.map_size.width / 2.0, config.map_size.height / 2.0);
    let radius = config.map_size.width.min(config.map_size.height) / 2.0 - MAP_MARGIN;

    let ids: Vec<NodeId> = (0..count)
        .map(|i| {
            let angle = i as f32 / count as f32 * TAU - TAU / 4.0;
            let position = Position::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            );
            let layer = layer_of(i, count, layers);
            let node_type = if i == 0 {
                NodeType::Start
            } else if i + 1 == count {
                NodeType::Exit
            } else {
                pick_node_type(config.generation_rule, layer, layers, rng)
            };
            topology.add_node(node_type, position, layer)
        })
        .collect();

    for i in 0..count - 1 {
        topology.connect(ids[i], ids[i + 1], ConnectionKind::Forward);
        if i + 2 < count && rng.gen_bool(CIRCULAR_SKIP_CHANCE) {
            topology.connect(ids[i], ids[i + 2], ConnectionKind::Skip);
        }
    }
}

/// Every non-leaf node gets 2-3 children; depth is
/// `map_layers` capped at [`TREE_MAX_DEPTH`].
pub fn build_tree(topology: &mut MapTopology, config: &GenerationConfig, rng: &mut MapRng) {
    let depth = config.map_layers.min(TREE_MAX_DEPTH);
    let root = topology.add_node(NodeType::Start, layer_position(config, 0, 0, 1), 0);
    let mut frontier = vec![root];

    for level in 1..depth {
        let child_counts: Vec<usize> = frontier.iter().map(|_| rng.gen_range(2..=3)).collect();
        let total: usize = child_counts.iter().sum();

        let mut next = Vec::with_capacity(total);
        let mut index = 0;
        for (&parent, &children) in frontier.iter().zip(&child_counts) {
            for _ in 0..children {
                let node_type = if level + 1 == depth {
                    NodeType::Exit
                } else {
                    pick_node_type(config.generation_rule, level, depth, rng)
                };
                let child =
                    topology.add_node(node_type, layer_position(config, level, index, total), level);
                topology.connect(parent, child, ConnectionKind::Forward);
                next.push(child);
                index += 1;
            }
        }
        frontier = next;
    }
}

pub fn build_network(topology: &mut MapTopology, config: &GenerationConfig, rng: &mut MapRng) {
    let layers = config.map_layers;
    let count = (layers * config.nodes_per_layer).max(4);
    let width = config.map_size.width;
    let height = config.map_size.height;
    let usable = width - 2.0 * MAP_MARGIN;
    let threshold = config.layer_spacing.max(config.node_spacing) * 1.75;

    let layer_at = |x: f32| -> usize {
        let fraction = ((x - MAP_MARGIN) / usable).clamp(0.0, 1.0);
        (fraction * (layers - 1) as f32).round() as usize
    };

    let mut ids = Vec::with_capacity(count);
    ids.push(topology.add_node(
        NodeType::Start,
        Position::new(MAP_MARGIN, height / 2.0),
        0,
    ));
    for _ in 1..count - 1 {
        let x = rng.gen_range(MAP_MARGIN + 1.0..width - MAP_MARGIN - 1.0);
        let y = rng.gen_range(MAP_MARGIN..height - MAP_MARGIN);
        let layer = layer_at(x).clamp(1, layers.saturating_sub(2).max(1));
        let node_type = pick_node_type(config.generation_rule, layer, layers, rng);
        ids.push(topology.add_node(node_type, Position::new(x, y), layer));
    }
    ids.push(topology.add_node(
        NodeType::Exit,
        Position::new(width - MAP_MARGIN, height / 2.0),
        layers - 1,
    ));

    let positions: Vec<Position> = topology.nodes.iter().map(|n| n.position).collect();
    let mut degree = vec![0usize; count];
    for i in 0..count {
        for j in (i + 1)..count {
            if positions[i].distance(&positions[j]) > threshold {
                continue;
            }
            if degree[i] >= NETWORK_MAX_DEGREE || degree[j] >= NETWORK_MAX_DEGREE {
                continue;
            }
            if !rng.gen_bool(NETWORK_EDGE_CHANCE) {
                continue;
            }
            // edges run left to right, so Start has no inbound and Exit no outbound
            let (from, to) = if positions[i].x <= positions[j].x {
                (i, j)
            } else {
                (j, i)
            };
            if topology.connect(ids[from], ids[to], ConnectionKind::Forward) {
                degree[i] += 1;
                degree[j] += 1;
            }
        }
    }
}

pub fn build_spiral(topology: &mut MapTopology, config: &GenerationConfig, rng: &mut MapRng) {
    let layers = config.map_layers;
    let count = (layers * 2).max(4);
    let center = Position::new(config.map_size.width / 2.0, config.map_size.height / 2.0);
    let max_radius = config.map_size.width.min(config.map_size.height) / 2.0 - MAP_MARGIN;
    let min_radius = max_radius * 0.1;

    let mut previous: Option<NodeId> = None;
    for i in 0..count {
        let t = i as f32 / (count - 1) as f32;
        let angle = i as f32 * 0.75;
        let radius = min_radius + (max_radius - min_radius) * t;
        let position = Position::new(
            center.x + radius * angle.cos(),
            center.y + radius * angle.sin(),
        );
        let layer = layer_of(i, count, layers);
        let node_type = if i == 0 {
            NodeType::Start
        } else if i + 1 == count {
            NodeType::Exit
        } else {
            pick_node_type(config.generation_rule, layer, layers, rng)
        };
        let id = topology.add_node(node_type, position, layer);
        if let Some(prev) = previous {
            topology.connect(prev, id, ConnectionKind::Forward);
        }
        previous = Some(id);
    }
}
