//! Map nodes: a single encounter site inside a floor topology.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{BOSS_ENEMY_OFFSET, ELITE_ENEMY_OFFSET, NORMAL_ENEMY_OFFSET};
use crate::generation::FloorType;
use crate::player::{AccessPolicy, PlayerSnapshot};

/// Opaque node handle, an index into the owning topology's node arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeType {
    Start,
    Exit,
    NormalBattle,
    EliteBattle,
    BossBattle,
    RestSite,
    Treasure,
    RandomEvent,
    Mystery,
    CardConstruct,
    TechMarket,
    SpiritualCharge,
    TechFusion,
}

impl NodeType {
    pub fn is_battle(&self) -> bool {
        matches!(
            self,
            Self::NormalBattle | Self::EliteBattle | Self::BossBattle
        )
    }

    /// Enemy level offset over the floor level, `None` for non-battle nodes
    pub fn enemy_level_offset(&self) -> Option<u32> {
        match self {
            Self::NormalBattle => Some(NORMAL_ENEMY_OFFSET),
            Self::EliteBattle => Some(ELITE_ENEMY_OFFSET),
            Self::BossBattle => Some(BOSS_ENEMY_OFFSET),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionKind {
    Forward,
    Lateral,
    Skip,
}

/// Directed edge to another node of the same topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub target: NodeId,
    pub kind: ConnectionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessState {
    Locked,
    Available,
}

/// Layout coordinate, used for distance heuristics and presentation only
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Per-type tuning carried by a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeContent {
    Start,
    Exit,
    Battle {
        enemy_level: u32,
        elite: bool,
        boss: bool,
    },
    Rest {
        heal_percent: f32,
    },
    Treasure {
        tier: u32,
    },
    Event {
        pool: String,
    },
    Mystery {
        reveal_chance: f32,
    },
    CardConstruct {
        choices: u32,
    },
    TechMarket {
        stock: u32,
        price_multiplier: f32,
    },
    SpiritualCharge {
        charge: u32,
    },
    TechFusion {
        slots: u32,
    },
}

impl NodeContent {
    /// Derive the content for a node type on a given floor
    pub fn for_type(node_type: NodeType, floor_level: u32, floor_type: FloorType) -> Self {
        match node_type {
            NodeType::Start => Self::Start,
            NodeType::Exit => Self::Exit,
            NodeType::NormalBattle | NodeType::EliteBattle | NodeType::BossBattle => {
                Self::Battle {
                    enemy_level: floor_level + node_type.enemy_level_offset().unwrap_or(0),
                    elite: node_type == NodeType::EliteBattle,
                    boss: node_type == NodeType::BossBattle,
                }
            }
            NodeType::RestSite => Self::Rest { heal_percent: 0.3 },
            NodeType::Treasure => Self::Treasure {
                tier: 1 + floor_level / 17,
            },
            NodeType::RandomEvent => Self::Event {
                pool: floor_type.event_pool().to_string(),
            },
            NodeType::Mystery => Self::Mystery { reveal_chance: 0.5 },
            NodeType::CardConstruct => Self::CardConstruct { choices: 3 },
            NodeType::TechMarket => Self::TechMarket {
                stock: 6,
                price_multiplier: 1.0 + floor_level as f32 * 0.02,
            },
            NodeType::SpiritualCharge => Self::SpiritualCharge {
                charge: 10 + floor_level,
            },
            NodeType::TechFusion => Self::TechFusion { slots: 2 },
        }
    }

    pub fn enemy_level(&self) -> Option<u32> {
        match self {
            Self::Battle { enemy_level, .. } => Some(*enemy_level),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapNode {
    pub id: NodeId,
    pub node_type: NodeType,
    pub position: Position,
    /// Generation layer (ring index / depth for non-layered topologies)
    pub layer: usize,
    pub connections: Vec<Connection>,
    pub access: AccessState,
    pub visited: bool,
    pub completed: bool,
    pub floor_level: u32,
    pub floor_type: FloorType,
    pub difficulty_multiplier: f32,
    pub content: NodeContent,
}

impl MapNode {
    pub fn new(
        id: NodeId,
        node_type: NodeType,
        position: Position,
        layer: usize,
        floor_level: u32,
        floor_type: FloorType,
    ) -> Self {
        Self {
            id,
            node_type,
            position,
            layer,
            connections: Vec::new(),
            access: AccessState::Locked,
            visited: false,
            completed: false,
            floor_level,
            floor_type,
            difficulty_multiplier: 1.0,
            content: NodeContent::for_type(node_type, floor_level, floor_type),
        }
    }

    /// Change the node type and recompute its content
    pub fn retype(&mut self, node_type: NodeType) {
        self.node_type = node_type;
        self.content = NodeContent::for_type(node_type, self.floor_level, self.floor_type);
    }

    /// Add a directed connection. Self-loops and duplicate targets are ignored.
    pub fn connect(&mut self, target: NodeId, kind: ConnectionKind) -> bool {
        if target == self.id || self.is_connected_to(target) {
            return false;
        }
        self.connections.push(Connection { target, kind });
        true
    }

    pub fn is_connected_to(&self, target: NodeId) -> bool {
        self.connections.iter().any(|c| c.target == target)
    }

    pub fn targets(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.connections.iter().map(|c| c.target)
    }

    pub fn is_available(&self) -> bool {
        self.access == AccessState::Available
    }

    /// Node must be unlocked and the injected policy must accept the player
    pub fn can_access(&self, player: &PlayerSnapshot, policy: &dyn AccessPolicy) -> bool {
        self.is_available() && policy.allows(self, player)
    }

    pub fn unlock(&mut self) -> bool {
        if self.access == AccessState::Locked {
            self.access = AccessState::Available;
            true
        } else {
            false
        }
    }
}
