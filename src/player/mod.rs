//! Player-state boundary.
//!
//! The climb core does not own the player profile. A [`PlayerStateProvider`]
//! supplies level/experience/health, the manager adds its own tower counters,
//! and an injected [`AccessPolicy`] decides whether a node may be entered.

use serde::{Deserialize, Serialize};

use crate::topology::MapNode;

/// Profile fields owned by the host game
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub level: u32,
    pub experience: u64,
    pub health: f32,
    pub max_health: f32,
}

impl Default for PlayerProfile {
    fn default() -> Self {
        Self {
            level: 1,
            experience: 0,
            health: 100.0,
            max_health: 100.0,
        }
    }
}

/// Read-only view of the player, taken when a node access is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub current_floor: u32,
    pub completed_floor_count: usize,
    pub unlocked_floor_count: usize,
    pub total_play_time: f64,
    pub profile: PlayerProfile,
}

impl PlayerSnapshot {
    pub fn is_alive(&self) -> bool {
        self.profile.health > 0.0
    }
}

pub trait PlayerStateProvider: Send + Sync {
    fn profile(&self) -> PlayerProfile;
}

/// Provider returning a fixed profile
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticProfile(pub PlayerProfile);

impl PlayerStateProvider for StaticProfile {
    fn profile(&self) -> PlayerProfile {
        self.0
    }
}

/// Node access predicate, evaluated on top of the node's lock state
pub trait AccessPolicy: Send + Sync {
    fn allows(&self, node: &MapNode, player: &PlayerSnapshot) -> bool;
}

/// Every unlocked node may be entered
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAccess;

impl AccessPolicy for OpenAccess {
    fn allows(&self, _node: &MapNode, _player: &PlayerSnapshot) -> bool {
        true
    }
}

/// Living players whose level is at least the node's floor level minus `slack`
#[derive(Debug, Clone, Copy)]
pub struct MinimumLevel {
    pub slack: u32,
}

impl AccessPolicy for MinimumLevel {
    fn allows(&self, node: &MapNode, player: &PlayerSnapshot) -> bool {
        player.is_alive() && player.profile.level + self.slack >= node.floor_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::FloorType;
    use crate::topology::{NodeId, NodeType, Position};

    fn node_on_floor(floor: u32) -> MapNode {
        MapNode::new(
            NodeId(0),
            NodeType::NormalBattle,
            Position::default(),
            1,
            floor,
            FloorType::from_floor(floor),
        )
    }

    fn player(level: u32, health: f32) -> PlayerSnapshot {
        PlayerSnapshot {
            profile: PlayerProfile {
                level,
                health,
                ..PlayerProfile::default()
            },
            ..PlayerSnapshot::default()
        }
    }

    #[test]
    fn test_open_access() {
        assert!(OpenAccess.allows(&node_on_floor(40), &player(1, 1.0)));
    }

    #[test]
    fn test_minimum_level() {
        let policy = MinimumLevel { slack: 2 };
        assert!(policy.allows(&node_on_floor(10), &player(8, 50.0)));
        assert!(!policy.allows(&node_on_floor(10), &player(7, 50.0)));
        assert!(!policy.allows(&node_on_floor(1), &player(30, 0.0)));
    }

    #[test]
    fn test_static_profile() {
        let provider = StaticProfile(PlayerProfile {
            level: 12,
            ..PlayerProfile::default()
        });
        assert_eq!(provider.profile().level, 12);
    }
}
