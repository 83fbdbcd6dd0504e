//! Rule-weighted node type selection.

use rand::Rng;

use super::GenerationRule;
use crate::constants::MIDDLE_LAYER_BOSS_CHANCE;
use crate::topology::NodeType;

const BALANCED: &[(NodeType, f32)] = &[
    (NodeType::NormalBattle, 40.0),
    (NodeType::EliteBattle, 10.0),
    (NodeType::RestSite, 12.0),
    (NodeType::Treasure, 10.0),
    (NodeType::RandomEvent, 12.0),
    (NodeType::Mystery, 6.0),
    (NodeType::CardConstruct, 10.0),
];

const COMBAT_FOCUSED: &[(NodeType, f32)] = &[
    (NodeType::NormalBattle, 55.0),
    (NodeType::EliteBattle, 20.0),
    (NodeType::RestSite, 8.0),
    (NodeType::Treasure, 7.0),
    (NodeType::RandomEvent, 5.0),
    (NodeType::Mystery, 2.0),
    (NodeType::CardConstruct, 3.0),
];

const EXPLORATION_FOCUSED: &[(NodeType, f32)] = &[
    (NodeType::NormalBattle, 25.0),
    (NodeType::EliteBattle, 5.0),
    (NodeType::RestSite, 12.0),
    (NodeType::Treasure, 18.0),
    (NodeType::RandomEvent, 20.0),
    (NodeType::Mystery, 12.0),
    (NodeType::CardConstruct, 8.0),
];

const DEFAULT_MIX: &[(NodeType, f32)] = &[
    (NodeType::NormalBattle, 50.0),
    (NodeType::EliteBattle, 15.0),
    (NodeType::RestSite, 10.0),
    (NodeType::Treasure, 10.0),
    (NodeType::RandomEvent, 10.0),
    (NodeType::Mystery, 5.0),
];

pub fn weights_for(rule: GenerationRule) -> &'static [(NodeType, f32)] {
    match rule {
        GenerationRule::Balanced => BALANCED,
        GenerationRule::CombatFocused => COMBAT_FOCUSED,
        GenerationRule::ExplorationFocused => EXPLORATION_FOCUSED,
        GenerationRule::ResourceFocused | GenerationRule::Challenging => DEFAULT_MIX,
    }
}

/// Cumulative-weight scan over a uniform draw in [0, total)
pub fn weighted_pick<R: Rng>(table: &[(NodeType, f32)], rng: &mut R) -> NodeType {
    let total: f32 = table.iter().map(|(_, w)| *w).sum();
    if total <= 0.0 {
        return NodeType::NormalBattle;
    }
    let mut roll = rng.gen_range(0.0..total);
    for (node_type, weight) in table {
        if roll < *weight {
            return *node_type;
        }
        roll -= *weight;
    }
    table
        .last()
        .map(|(node_type, _)| *node_type)
        .unwrap_or(NodeType::NormalBattle)
}

/// Node type for an interior layer. The middle layer may be forced to a boss.
pub fn pick_node_type<R: Rng>(
    rule: GenerationRule,
    layer: usize,
    total_layers: usize,
    rng: &mut R,
) -> NodeType {
    if total_layers > 2 && layer == total_layers / 2 && rng.gen_bool(MIDDLE_LAYER_BOSS_CHANCE) {
        return NodeType::BossBattle;
    }
    weighted_pick(weights_for(rule), rng)
}

/// Start on the first layer, Exit on the last, rule-weighted in between
pub fn layer_node_type<R: Rng>(
    rule: GenerationRule,
    layer: usize,
    total_layers: usize,
    rng: &mut R,
) -> NodeType {
    if layer == 0 {
        NodeType::Start
    } else if layer + 1 >= total_layers {
        NodeType::Exit
    } else {
        pick_node_type(rule, layer, total_layers, rng)
    }
}
