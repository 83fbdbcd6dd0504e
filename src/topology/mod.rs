//! Floor topology: the node graph generated for one floor of the tower.
//!
//! Nodes live in a contiguous arena indexed by [`NodeId`]. Connections are
//! directed; structural validation treats them as undirected for reachability.

pub mod node;

pub use node::{
    AccessState, Connection, ConnectionKind, MapNode, NodeContent, NodeId, NodeType, Position,
};

use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex, UnGraph};
use petgraph::visit::Bfs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::generation::{
    Difficulty, FloorType, GenerationConfig, GenerationRule, MapSize, TopologyType,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapTopology {
    pub map_id: String,
    pub floor_level: u32,
    pub floor_type: FloorType,
    pub topology_type: TopologyType,
    pub difficulty: Difficulty,
    pub generation_rule: GenerationRule,
    pub map_size: MapSize,
    pub max_layers: usize,
    pub nodes_per_layer: usize,
    pub layer_spacing: f32,
    pub node_spacing: f32,
    /// Seed that produced this topology
    pub seed: u64,
    pub nodes: Vec<MapNode>,
    pub start_node: NodeId,
    pub exit_nodes: Vec<NodeId>,
}

impl MapTopology {
    /// Empty topology carrying the metadata of a generation config
    pub fn empty(map_id: String, config: &GenerationConfig, seed: u64) -> Self {
        Self {
            map_id,
            floor_level: config.floor_level,
            floor_type: config.floor_type,
            topology_type: config.topology_type,
            difficulty: config.difficulty,
            generation_rule: config.generation_rule,
            map_size: config.map_size,
            max_layers: config.map_layers,
            nodes_per_layer: config.nodes_per_layer,
            layer_spacing: config.layer_spacing,
            node_spacing: config.node_spacing,
            seed,
            nodes: Vec::new(),
            start_node: NodeId(0),
            exit_nodes: Vec::new(),
        }
    }

    /// Append a node and return its id. Start/Exit types register themselves.
    pub fn add_node(&mut self, node_type: NodeType, position: Position, layer: usize) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let node = MapNode::new(
            id,
            node_type,
            position,
            layer,
            self.floor_level,
            self.floor_type,
        );
        self.nodes.push(node);
        match node_type {
            NodeType::Start => self.start_node = id,
            NodeType::Exit => self.exit_nodes.push(id),
            _ => {}
        }
        id
    }

    pub fn connect(&mut self, from: NodeId, to: NodeId, kind: ConnectionKind) -> bool {
        if to.index() >= self.nodes.len() {
            return false;
        }
        match self.nodes.get_mut(from.index()) {
            Some(node) => node.connect(to, kind),
            None => false,
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&MapNode> {
        self.nodes.get(id.index())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut MapNode> {
        self.nodes.get_mut(id.index())
    }

    pub fn start(&self) -> Option<&MapNode> {
        self.node(self.start_node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes_of_type(&self, node_type: NodeType) -> Vec<&MapNode> {
        self.nodes
            .iter()
            .filter(|n| n.node_type == node_type)
            .collect()
    }

    pub fn is_exit(&self, id: NodeId) -> bool {
        self.exit_nodes.contains(&id)
    }

    pub fn connection_count(&self) -> usize {
        self.nodes.iter().map(|n| n.connections.len()).sum()
    }

    pub fn stats(&self) -> TopologyStats {
        let mut by_type = BTreeMap::new();
        for node in &self.nodes {
            *by_type.entry(node.node_type).or_insert(0) += 1;
        }
        let connections = self.connection_count();
        let max_out_degree = self
            .nodes
            .iter()
            .map(|n| n.connections.len())
            .max()
            .unwrap_or(0);
        let average_out_degree = if self.nodes.is_empty() {
            0.0
        } else {
            connections as f32 / self.nodes.len() as f32
        };

        TopologyStats {
            node_count: self.nodes.len(),
            connection_count: connections,
            exit_count: self.exit_nodes.len(),
            nodes_by_type: by_type,
            average_out_degree,
            max_out_degree,
        }
    }

    fn undirected_graph(&self) -> UnGraph<(), ()> {
        let mut graph = UnGraph::with_capacity(self.nodes.len(), self.connection_count());
        for _ in &self.nodes {
            graph.add_node(());
        }
        for node in &self.nodes {
            for target in node.targets() {
                if target.index() < self.nodes.len() {
                    graph.add_edge(
                        NodeIndex::new(node.id.index()),
                        NodeIndex::new(target.index()),
                        (),
                    );
                }
            }
        }
        graph
    }

    fn directed_graph(&self) -> DiGraph<(), ()> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.connection_count());
        for _ in &self.nodes {
            graph.add_node(());
        }
        for node in &self.nodes {
            for target in node.targets() {
                if target.index() < self.nodes.len() {
                    graph.add_edge(
                        NodeIndex::new(node.id.index()),
                        NodeIndex::new(target.index()),
                        (),
                    );
                }
            }
        }
        graph
    }

    /// Per-node flag: reachable from the start node ignoring edge direction
    pub fn reachable_from_start(&self) -> Vec<bool> {
        let mut seen = vec![false; self.nodes.len()];
        if self.start_node.index() >= self.nodes.len() {
            return seen;
        }
        let graph = self.undirected_graph();
        let mut bfs = Bfs::new(&graph, NodeIndex::new(self.start_node.index()));
        while let Some(ix) = bfs.next(&graph) {
            seen[ix.index()] = true;
        }
        seen
    }

    /// Per-node flag: reachable from the start node following edge direction.
    /// These are the nodes a player can unlock by completing from start.
    pub fn unlockable_from_start(&self) -> Vec<bool> {
        let mut seen = vec![false; self.nodes.len()];
        if self.start_node.index() >= self.nodes.len() {
            return seen;
        }
        let graph = self.directed_graph();
        let mut bfs = Bfs::new(&graph, NodeIndex::new(self.start_node.index()));
        while let Some(ix) = bfs.next(&graph) {
            seen[ix.index()] = true;
        }
        seen
    }

    /// Structural invariant check: single start, exits, reachability, no dead
    /// ends, and a directed route from start to some exit
    pub fn validate(&self) -> ValidationReport {
        let start_count = self
            .nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Start)
            .count();
        let start_valid = self
            .start()
            .is_some_and(|n| n.node_type == NodeType::Start);
        let exits_valid = !self.exit_nodes.is_empty()
            && self
                .exit_nodes
                .iter()
                .all(|id| id.index() < self.nodes.len());

        let reachable = self.reachable_from_start();
        let unreachable = self
            .nodes
            .iter()
            .filter(|n| !reachable[n.id.index()])
            .map(|n| n.id)
            .collect();
        let dead_ends = self
            .nodes
            .iter()
            .filter(|n| n.node_type != NodeType::Exit && n.connections.is_empty())
            .map(|n| n.id)
            .collect();

        let exit_reachable = start_valid && exits_valid && {
            let graph = self.directed_graph();
            let start = NodeIndex::new(self.start_node.index());
            self.exit_nodes
                .iter()
                .any(|exit| has_path_connecting(&graph, start, NodeIndex::new(exit.index()), None))
        };

        ValidationReport {
            start_count,
            start_valid,
            exits_valid,
            unreachable,
            dead_ends,
            exit_reachable,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Aggregate statistics for UI and diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyStats {
    pub node_count: usize,
    pub connection_count: usize,
    pub exit_count: usize,
    pub nodes_by_type: BTreeMap<NodeType, usize>,
    pub average_out_degree: f32,
    pub max_out_degree: usize,
}

impl TopologyStats {
    pub fn count(&self, node_type: NodeType) -> usize {
        self.nodes_by_type.get(&node_type).copied().unwrap_or(0)
    }
}

/// Result of [`MapTopology::validate`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub start_count: usize,
    pub start_valid: bool,
    pub exits_valid: bool,
    pub unreachable: Vec<NodeId>,
    pub dead_ends: Vec<NodeId>,
    /// Some exit can be reached from start following edge direction
    pub exit_reachable: bool,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.start_count == 1
            && self.start_valid
            && self.exits_valid
            && self.unreachable.is_empty()
            && self.dead_ends.is_empty()
            && self.exit_reachable
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return write!(f, "valid");
        }
        let mut problems = Vec::new();
        if self.start_count != 1 || !self.start_valid {
            problems.push(format!("{} start nodes", self.start_count));
        }
        if !self.exits_valid {
            problems.push("missing exit".to_string());
        }
        if !self.unreachable.is_empty() {
            problems.push(format!("{} unreachable", self.unreachable.len()));
        }
        if !self.dead_ends.is_empty() {
            problems.push(format!("{} dead ends", self.dead_ends.len()));
        }
        if self.exits_valid && !self.exit_reachable {
            problems.push("no route to exit".to_string());
        }
        write!(f, "{}", problems.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(len: usize) -> MapTopology {
        let config = GenerationConfig::default();
        let mut topology = MapTopology::empty("test".into(), &config, 1);
        let mut prev = None;
        for i in 0..len {
            let ty = if i == 0 {
                NodeType::Start
            } else if i == len - 1 {
                NodeType::Exit
            } else {
                NodeType::NormalBattle
            };
            let id = topology.add_node(ty, Position::new(i as f32 * 10.0, 0.0), i);
            if let Some(p) = prev {
                topology.connect(p, id, ConnectionKind::Forward);
            }
            prev = Some(id);
        }
        topology
    }

    #[test]
    fn test_add_node_registers_start_and_exit() {
        let topology = chain(4);
        assert_eq!(topology.start_node, NodeId(0));
        assert_eq!(topology.exit_nodes, vec![NodeId(3)]);
        assert!(topology.is_exit(NodeId(3)));
        assert_eq!(topology.len(), 4);
    }

    #[test]
    fn test_chain_is_valid() {
        let report = chain(5).validate();
        assert!(report.is_valid(), "{report}");
        assert!(report.exit_reachable);
    }

    #[test]
    fn test_connect_rejects_unknown_target() {
        let mut topology = chain(2);
        assert!(!topology.connect(NodeId(0), NodeId(9), ConnectionKind::Forward));
        assert!(!topology.connect(NodeId(9), NodeId(0), ConnectionKind::Forward));
    }

    #[test]
    fn test_isolated_node_is_unreachable_and_dead_end() {
        let mut topology = chain(3);
        let lonely = topology.add_node(NodeType::Treasure, Position::new(500.0, 500.0), 1);
        let report = topology.validate();
        assert!(!report.is_valid());
        assert_eq!(report.unreachable, vec![lonely]);
        assert_eq!(report.dead_ends, vec![lonely]);
        assert!(report.to_string().contains("unreachable"));
    }

    #[test]
    fn test_backward_edge_counts_for_reachability() {
        let mut topology = chain(3);
        // only an edge *into* the chain
        let side = topology.add_node(NodeType::RestSite, Position::new(0.0, 50.0), 1);
        topology.connect(side, NodeId(1), ConnectionKind::Lateral);
        assert!(topology.reachable_from_start()[side.index()]);
        assert!(topology.validate().is_valid());
    }

    #[test]
    fn test_exit_behind_backward_edge_is_invalid() {
        let config = GenerationConfig::default();
        let mut topology = MapTopology::empty("t".into(), &config, 1);
        let start = topology.add_node(NodeType::Start, Position::default(), 0);
        let middle = topology.add_node(NodeType::NormalBattle, Position::new(10.0, 0.0), 1);
        let exit = topology.add_node(NodeType::Exit, Position::new(20.0, 0.0), 2);
        topology.connect(start, middle, ConnectionKind::Forward);
        topology.connect(middle, start, ConnectionKind::Lateral);
        // weakly connected, but the exit only points back into the graph
        topology.connect(exit, middle, ConnectionKind::Forward);

        assert!(topology.reachable_from_start().iter().all(|r| *r));
        assert!(!topology.unlockable_from_start()[exit.index()]);
        let report = topology.validate();
        assert!(!report.exit_reachable);
        assert!(!report.is_valid());
        assert!(report.to_string().contains("no route to exit"));
    }

    #[test]
    fn test_missing_exit_is_invalid() {
        let config = GenerationConfig::default();
        let mut topology = MapTopology::empty("t".into(), &config, 1);
        let a = topology.add_node(NodeType::Start, Position::default(), 0);
        let b = topology.add_node(NodeType::NormalBattle, Position::new(1.0, 0.0), 1);
        topology.connect(a, b, ConnectionKind::Forward);
        topology.connect(b, a, ConnectionKind::Forward);
        let report = topology.validate();
        assert!(!report.exits_valid);
        assert!(!report.exit_reachable);
        assert!(!report.is_valid());
    }

    #[test]
    fn test_topology_json_roundtrip() {
        let json = chain(3).to_json().unwrap();
        let back: MapTopology = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 3);
        assert_eq!(back.exit_nodes, vec![NodeId(2)]);
    }

    #[test]
    fn test_stats() {
        let stats = chain(5).stats();
        assert_eq!(stats.node_count, 5);
        assert_eq!(stats.connection_count, 4);
        assert_eq!(stats.exit_count, 1);
        assert_eq!(stats.count(NodeType::NormalBattle), 3);
        assert_eq!(stats.count(NodeType::Mystery), 0);
        assert_eq!(stats.max_out_degree, 1);
        assert!((stats.average_out_degree - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_nodes_of_type() {
        let topology = chain(5);
        assert_eq!(topology.nodes_of_type(NodeType::Start).len(), 1);
        assert_eq!(topology.nodes_of_type(NodeType::NormalBattle).len(), 3);
    }
}
