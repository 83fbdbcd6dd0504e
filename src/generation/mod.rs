pub mod generator;
pub mod node_types;
pub mod strategies;

pub use generator::{GenerationError, MapGenerator};

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use tracing::warn;

use crate::constants::*;
use crate::topology::NodeType;

/// Tower seed - root of per-floor generation seeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TowerSeed {
    pub seed: u64,
}

impl TowerSeed {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Deterministic floor seed from tower seed and floor number.
    /// Never returns 0, which would request a fresh random seed.
    pub fn floor_seed(&self, floor: u32) -> u64 {
        let mut hasher = Sha3_256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(floor.to_le_bytes());
        let result = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&result[0..8]);
        u64::from_le_bytes(bytes).max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TopologyType {
    Linear,
    Branching,
    Grid,
    Circular,
    Tree,
    Network,
    /// Generated as a grid
    Maze,
    Spiral,
    /// One of the six base layouts, picked per generation
    Random,
}

impl TopologyType {
    pub const ALL: [TopologyType; 9] = [
        Self::Linear,
        Self::Branching,
        Self::Grid,
        Self::Circular,
        Self::Tree,
        Self::Network,
        Self::Maze,
        Self::Spiral,
        Self::Random,
    ];

    /// Candidates for [`TopologyType::Random`]
    pub const RANDOM_POOL: [TopologyType; 6] = [
        Self::Linear,
        Self::Branching,
        Self::Grid,
        Self::Circular,
        Self::Tree,
        Self::Network,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Branching => "branching",
            Self::Grid => "grid",
            Self::Circular => "circular",
            Self::Tree => "tree",
            Self::Network => "network",
            Self::Maze => "maze",
            Self::Spiral => "spiral",
            Self::Random => "random",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Unknown names generate a linear floor
    pub fn parse_or_linear(name: &str) -> Self {
        Self::from_name(name).unwrap_or_else(|| {
            warn!(topology = name, "unknown topology type, using linear");
            Self::Linear
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Expert,
    Master,
}

impl Difficulty {
    pub fn multiplier(&self) -> f32 {
        match self {
            Self::Easy => EASY_MULT,
            Self::Normal => NORMAL_MULT,
            Self::Hard => HARD_MULT,
            Self::Expert => EXPERT_MULT,
            Self::Master => MASTER_MULT,
        }
    }

    /// One tier up, saturating at Master
    pub fn harder(&self) -> Self {
        match self {
            Self::Easy => Self::Normal,
            Self::Normal => Self::Hard,
            Self::Hard => Self::Expert,
            Self::Expert | Self::Master => Self::Master,
        }
    }
}

/// Content-mix weighting profile used during node-type selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenerationRule {
    Balanced,
    CombatFocused,
    ExplorationFocused,
    ResourceFocused,
    Challenging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloorType {
    UrbanEnvironment,
    SpiritualRealm,
    TechFusion,
    Hidden,
}

impl FloorType {
    pub fn from_floor(floor: u32) -> Self {
        match floor {
            HIDDEN_FLOOR => Self::Hidden,
            1..=BAND_ONE_LAST => Self::UrbanEnvironment,
            f if f <= BAND_TWO_LAST => Self::SpiritualRealm,
            _ => Self::TechFusion,
        }
    }

    /// Node type injected by post-processing on floors of this type
    pub fn special_node(&self) -> Option<NodeType> {
        match self {
            Self::UrbanEnvironment => Some(NodeType::TechMarket),
            Self::SpiritualRealm => Some(NodeType::SpiritualCharge),
            Self::TechFusion => Some(NodeType::TechFusion),
            Self::Hidden => None,
        }
    }

    pub fn event_pool(&self) -> &'static str {
        match self {
            Self::UrbanEnvironment => "urban",
            Self::SpiritualRealm => "spiritual",
            Self::TechFusion => "tech_fusion",
            Self::Hidden => "hidden",
        }
    }
}

/// What happens when post-generation validation fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValidationPolicy {
    /// Log the failure and keep the topology
    #[default]
    Lenient,
    /// Reject the topology
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapSize {
    pub width: f32,
    pub height: f32,
}

impl Default for MapSize {
    fn default() -> Self {
        Self {
            width: DEFAULT_MAP_WIDTH,
            height: DEFAULT_MAP_HEIGHT,
        }
    }
}

/// Per-floor generation descriptor. Immutable once handed to the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub topology_type: TopologyType,
    pub difficulty: Difficulty,
    pub generation_rule: GenerationRule,
    pub floor_level: u32,
    pub floor_type: FloorType,
    pub map_layers: usize,
    pub nodes_per_layer: usize,
    pub layer_spacing: f32,
    pub node_spacing: f32,
    pub map_size: MapSize,
    /// 0 draws a fresh seed; anything else makes generation reproducible
    pub random_seed: u64,
    pub validation: ValidationPolicy,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            topology_type: TopologyType::Branching,
            difficulty: Difficulty::Normal,
            generation_rule: GenerationRule::Balanced,
            floor_level: 1,
            floor_type: FloorType::UrbanEnvironment,
            map_layers: DEFAULT_MAP_LAYERS,
            nodes_per_layer: DEFAULT_NODES_PER_LAYER,
            layer_spacing: DEFAULT_LAYER_SPACING,
            node_spacing: DEFAULT_NODE_SPACING,
            map_size: MapSize::default(),
            random_seed: 0,
            validation: ValidationPolicy::Lenient,
        }
    }
}

impl GenerationConfig {
    pub fn with_topology(mut self, topology_type: TopologyType) -> Self {
        self.topology_type = topology_type;
        self
    }

    pub fn with_layers(mut self, map_layers: usize, nodes_per_layer: usize) -> Self {
        self.map_layers = map_layers;
        self.nodes_per_layer = nodes_per_layer;
        self
    }

    pub fn with_seed(mut self, random_seed: u64) -> Self {
        self.random_seed = random_seed;
        self
    }

    pub fn with_floor(mut self, floor_level: u32, floor_type: FloorType) -> Self {
        self.floor_level = floor_level;
        self.floor_type = floor_type;
        self
    }

    pub fn with_rule(mut self, generation_rule: GenerationRule) -> Self {
        self.generation_rule = generation_rule;
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_validation(mut self, validation: ValidationPolicy) -> Self {
        self.validation = validation;
        self
    }

    /// Clamp geometry to values every strategy can build.
    /// Returns the fixed config and whether anything changed.
    pub fn sanitized(&self) -> (Self, bool) {
        let mut fixed = self.clone();
        fixed.map_layers = fixed.map_layers.max(2);
        fixed.nodes_per_layer = fixed.nodes_per_layer.max(1);
        if !positive(fixed.layer_spacing) {
            fixed.layer_spacing = DEFAULT_LAYER_SPACING;
        }
        if !positive(fixed.node_spacing) {
            fixed.node_spacing = DEFAULT_NODE_SPACING;
        }
        let min_side = MAP_MARGIN * 4.0;
        if !positive(fixed.map_size.width - min_side) || !positive(fixed.map_size.height - min_side)
        {
            fixed.map_size = MapSize::default();
        }
        let changed = fixed != *self;
        (fixed, changed)
    }
}

fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}
