//! Tower Climb - Procedural Core Library
//!
//! Deterministic map generation and climb progression for a 51-floor tower:
//! - Node-graph floor topologies (linear, branching, grid, circular, tree,
//!   network, spiral) with connectivity repair and validation
//! - Rule-weighted node content and floor-type special nodes
//! - Node traversal with lock/unlock propagation
//! - Floor gating, completion and the hidden floor
//! - Versioned progress persistence behind a pluggable store
//! - Bevy plugin for event forwarding, play time and autosave

pub mod constants;
pub mod engine;
pub mod generation;
pub mod logging;
pub mod player;
pub mod progress;
pub mod topology;
pub mod tower;

pub use engine::{TowerConfig, TowerPlugin};
pub use generation::{GenerationConfig, MapGenerator, TopologyType};
pub use progress::{ProgressStore, TowerProgress};
pub use topology::{MapNode, MapTopology, NodeId, NodeType};
pub use tower::{TowerEvent, TowerManager};
