//! Lifecycle notifications for the presentation layer.
//!
//! The manager queues these as state changes happen; the host drains the queue
//! (directly, or through `TowerPlugin` as bevy events). Fire-and-forget.

use bevy::prelude::Event;
use serde::{Deserialize, Serialize};

use crate::generation::TopologyType;
use crate::topology::{NodeId, NodeType};

#[derive(Event, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TowerEvent {
    MapGenerated {
        floor: u32,
        map_id: String,
        topology_type: TopologyType,
        node_count: usize,
    },
    NodeEntered {
        floor: u32,
        node: NodeId,
        node_type: NodeType,
    },
    NodeCompleted {
        floor: u32,
        node: NodeId,
        node_type: NodeType,
        success: bool,
    },
    FloorCompleted {
        floor: u32,
        /// Floor opened by this completion, if any
        unlocked: Option<u32>,
    },
    TowerProgressChanged {
        current_floor: u32,
        completed_floors: usize,
        unlocked_floors: usize,
    },
    MapStateChanged {
        floor: u32,
        current_node: Option<NodeId>,
        available: Vec<NodeId>,
    },
}

impl TowerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MapGenerated { .. } => "map_generated",
            Self::NodeEntered { .. } => "node_entered",
            Self::NodeCompleted { .. } => "node_completed",
            Self::FloorCompleted { .. } => "floor_completed",
            Self::TowerProgressChanged { .. } => "tower_progress_changed",
            Self::MapStateChanged { .. } => "map_state_changed",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
