//! Floor -> generation configuration business rule.
//!
//! Three bands of 17 floors plus the hidden floor. Band finales (17, 34, 51)
//! and the hidden floor are Challenging; other floors rotate through the
//! band's content-focused rules by floor number.

use crate::constants::*;
use crate::generation::{
    Difficulty, FloorType, GenerationConfig, GenerationRule, TopologyType, TowerSeed,
    ValidationPolicy,
};

const URBAN_RULES: [GenerationRule; 3] = [
    GenerationRule::Balanced,
    GenerationRule::ExplorationFocused,
    GenerationRule::CombatFocused,
];

const SPIRITUAL_RULES: [GenerationRule; 3] = [
    GenerationRule::ExplorationFocused,
    GenerationRule::Balanced,
    GenerationRule::ResourceFocused,
];

const TECH_RULES: [GenerationRule; 3] = [
    GenerationRule::CombatFocused,
    GenerationRule::ResourceFocused,
    GenerationRule::Balanced,
];

const LAYOUT_ROTATION: [TopologyType; 6] = [
    TopologyType::Branching,
    TopologyType::Grid,
    TopologyType::Tree,
    TopologyType::Circular,
    TopologyType::Network,
    TopologyType::Spiral,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FloorPlan {
    /// 0 leaves every floor unseeded
    pub tower_seed: u64,
    pub validation: ValidationPolicy,
}

impl FloorPlan {
    pub fn new(tower_seed: u64, validation: ValidationPolicy) -> Self {
        Self {
            tower_seed,
            validation,
        }
    }

    pub fn is_finale(floor: u32) -> bool {
        matches!(floor, BAND_ONE_LAST | BAND_TWO_LAST | BAND_THREE_LAST | HIDDEN_FLOOR)
    }

    /// Position of a floor inside its band, 1-based
    fn band_position(floor: u32) -> u32 {
        match floor {
            HIDDEN_FLOOR => BAND_ONE_LAST,
            1..=BAND_ONE_LAST => floor,
            f if f <= BAND_TWO_LAST => f - BAND_ONE_LAST,
            f => f - BAND_TWO_LAST,
        }
    }

    pub fn rule_for(floor: u32) -> GenerationRule {
        if Self::is_finale(floor) {
            return GenerationRule::Challenging;
        }
        let schedule = match FloorType::from_floor(floor) {
            FloorType::UrbanEnvironment => &URBAN_RULES,
            FloorType::SpiritualRealm => &SPIRITUAL_RULES,
            FloorType::TechFusion | FloorType::Hidden => &TECH_RULES,
        };
        schedule[(floor % 3) as usize]
    }

    pub fn topology_for(floor: u32) -> TopologyType {
        match floor {
            1 => TopologyType::Linear,
            HIDDEN_FLOOR => TopologyType::Random,
            f if Self::is_finale(f) => TopologyType::Branching,
            f => LAYOUT_ROTATION[(f % 6) as usize],
        }
    }

    pub fn difficulty_for(floor: u32) -> Difficulty {
        let base = match FloorType::from_floor(floor) {
            FloorType::UrbanEnvironment if floor <= 8 => Difficulty::Easy,
            FloorType::UrbanEnvironment => Difficulty::Normal,
            FloorType::SpiritualRealm => Difficulty::Hard,
            FloorType::TechFusion => Difficulty::Expert,
            FloorType::Hidden => return Difficulty::Master,
        };
        if Self::is_finale(floor) {
            base.harder()
        } else {
            base
        }
    }

    pub fn config_for(&self, floor: u32) -> GenerationConfig {
        let floor_type = FloorType::from_floor(floor);
        let map_layers = 5 + (Self::band_position(floor) / 4) as usize;
        let nodes_per_layer = match floor_type {
            FloorType::UrbanEnvironment | FloorType::SpiritualRealm => DEFAULT_NODES_PER_LAYER,
            FloorType::TechFusion | FloorType::Hidden => DEFAULT_NODES_PER_LAYER + 1,
        };
        let random_seed = if self.tower_seed == 0 {
            0
        } else {
            TowerSeed::new(self.tower_seed).floor_seed(floor)
        };

        GenerationConfig {
            topology_type: Self::topology_for(floor),
            difficulty: Self::difficulty_for(floor),
            generation_rule: Self::rule_for(floor),
            floor_level: floor,
            floor_type,
            map_layers,
            nodes_per_layer,
            random_seed,
            validation: self.validation,
            ..GenerationConfig::default()
        }
    }
}
