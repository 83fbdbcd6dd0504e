//! Map generator: strategy dispatch plus the shared post-processing pass.
//!
//! Post-processing always runs in this order:
//! 1. connectivity repair (dead ends, then nodes unreachable along edges)
//! 2. floor-type special node injection
//! 3. difficulty and initial access
//! 4. validation, handled per [`ValidationPolicy`]

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, error, warn};

use super::{strategies, GenerationConfig, TopologyType, ValidationPolicy};
use crate::constants::SPECIAL_NODE_CHANCE;
use crate::logging::TimingSpan;
use crate::topology::{ConnectionKind, MapTopology, NodeId, NodeType, ValidationReport};

pub(crate) type MapRng = Xoshiro256PlusPlus;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("topology for floor {floor} failed validation: {report}")]
    InvalidTopology {
        floor: u32,
        report: ValidationReport,
    },
}

/// Stateless per call; every `generate` seeds its own RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapGenerator;

impl MapGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate a topology. Never fails: a strict validation failure falls
    /// back to a linear layout built from the same configuration.
    pub fn generate(&self, config: &GenerationConfig) -> MapTopology {
        match self.try_generate(config) {
            Ok(topology) => topology,
            Err(err) => {
                error!(%err, "falling back to linear topology");
                let fallback = config.clone().with_topology(TopologyType::Linear);
                let (fallback, _) = fallback.sanitized();
                let seed = effective_seed(fallback.random_seed);
                self.build(&fallback, seed).0
            }
        }
    }

    /// Generate from `config`, or from the default configuration when absent
    pub fn generate_or_default(&self, config: Option<&GenerationConfig>) -> MapTopology {
        match config {
            Some(config) => self.generate(config),
            None => {
                warn!("no generation config supplied, using defaults");
                self.generate(&GenerationConfig::default())
            }
        }
    }

    /// Generate and validate. Only `ValidationPolicy::Strict` can return an error.
    pub fn try_generate(&self, config: &GenerationConfig) -> Result<MapTopology, GenerationError> {
        let _span = TimingSpan::new("generate_topology");

        let (config, changed) = config.sanitized();
        if changed {
            warn!(floor = config.floor_level, "generation config out of range, clamped");
        }
        let seed = effective_seed(config.random_seed);
        let (topology, report) = self.build(&config, seed);

        apply_policy(topology, report, config.validation)
    }

    fn build(&self, config: &GenerationConfig, seed: u64) -> (MapTopology, ValidationReport) {
        let mut rng = MapRng::seed_from_u64(seed);
        let map_id = format!("map_f{}_{:016x}", config.floor_level, rng.gen::<u64>());

        let mut topology = MapTopology::empty(map_id, config, seed);
        topology.topology_type =
            strategies::build(config.topology_type, &mut topology, config, &mut rng);

        post_process(&mut topology, config, &mut rng);
        let report = topology.validate();
        (topology, report)
    }
}

/// Keep, or reject, a topology according to the validation outcome
pub(crate) fn apply_policy(
    topology: MapTopology,
    report: ValidationReport,
    policy: ValidationPolicy,
) -> Result<MapTopology, GenerationError> {
    if report.is_valid() {
        debug!(
            floor = topology.floor_level,
            map = %topology.map_id,
            nodes = topology.len(),
            topology = topology.topology_type.as_str(),
            "topology generated"
        );
        return Ok(topology);
    }

    match policy {
        ValidationPolicy::Lenient => {
            error!(
                floor = topology.floor_level,
                map = %topology.map_id,
                %report,
                "topology failed validation, keeping it"
            );
            Ok(topology)
        }
        ValidationPolicy::Strict => Err(GenerationError::InvalidTopology {
            floor: topology.floor_level,
            report,
        }),
    }
}

fn post_process(topology: &mut MapTopology, config: &GenerationConfig, rng: &mut MapRng) {
    repair_dead_ends(topology);
    bridge_components(topology);
    inject_special_node(topology, rng);

    let multiplier = config.difficulty.multiplier();
    for node in &mut topology.nodes {
        node.difficulty_multiplier = multiplier;
    }
    let start = topology.start_node;
    if let Some(node) = topology.node_mut(start) {
        node.unlock();
    }
}

/// Connect every non-Exit node without outgoing edges to its nearest node
fn repair_dead_ends(topology: &mut MapTopology) {
    let dead_ends: Vec<NodeId> = topology
        .nodes
        .iter()
        .filter(|n| n.node_type != NodeType::Exit && n.connections.is_empty())
        .map(|n| n.id)
        .collect();

    for id in dead_ends {
        let Some(from) = topology.node(id) else {
            continue;
        };
        let nearest = topology
            .nodes
            .iter()
            .filter(|n| n.id != id)
            .min_by(|a, b| {
                from.position
                    .distance(&a.position)
                    .total_cmp(&from.position.distance(&b.position))
            })
            .map(|n| n.id);
        if let Some(target) = nearest {
            debug!(node = %id, target = %target, "repairing dead end");
            topology.connect(id, target, ConnectionKind::Forward);
        }
    }
}

/// Join every node the player cannot unlock from start (following edge
/// direction) through a Forward edge from the nearest unlockable non-Exit node.
/// Each pass adds at least one node to the unlockable set.
fn bridge_components(topology: &mut MapTopology) {
    loop {
        let unlockable = topology.unlockable_from_start();
        if unlockable.iter().all(|r| *r) {
            return;
        }

        let mut best: Option<(f32, NodeId, NodeId)> = None;
        let sources = topology
            .nodes
            .iter()
            .filter(|n| unlockable[n.id.index()] && n.node_type != NodeType::Exit);
        for from in sources {
            for to in topology.nodes.iter().filter(|n| !unlockable[n.id.index()]) {
                let distance = from.position.distance(&to.position);
                if best.map_or(true, |(d, _, _)| distance < d) {
                    best = Some((distance, from.id, to.id));
                }
            }
        }

        let Some((_, from, to)) = best else {
            return;
        };
        debug!(from = %from, to = %to, "bridging unreachable node");
        if !topology.connect(from, to, ConnectionKind::Forward) {
            // already connected yet unreachable means a broken start; stop
            return;
        }
    }
}

/// At most one floor-type special node per generation, retyped from a normal battle
fn inject_special_node(topology: &mut MapTopology, rng: &mut MapRng) {
    let Some(special) = topology.floor_type.special_node() else {
        return;
    };
    if !topology.nodes_of_type(special).is_empty() {
        return;
    }
    if !rng.gen_bool(SPECIAL_NODE_CHANCE) {
        return;
    }
    let candidates: Vec<NodeId> = topology
        .nodes_of_type(NodeType::NormalBattle)
        .iter()
        .map(|n| n.id)
        .collect();
    if let Some(&id) = candidates.choose(rng) {
        if let Some(node) = topology.node_mut(id) {
            debug!(node = %id, special = ?special, "injecting special node");
            node.retype(special);
        }
    }
}

/// Seed 0 asks for a fresh, time-derived seed
fn effective_seed(seed: u64) -> u64 {
    if seed != 0 {
        return seed;
    }
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    let bump = COUNTER
        .fetch_add(1, Ordering::Relaxed)
        .wrapping_mul(0x9E37_79B9_7F4A_7C15);
    (nanos ^ bump).max(1)
}
