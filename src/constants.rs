//! Centralized constants for the tower climb core.
//!
//! Tower shape, generation probabilities and difficulty tuning live here so the
//! generator, the floor plan and the manager agree on a single source of truth.

// =====================================================
// Tower Shape
// =====================================================

/// Number of regular floors in the tower (floors 1..=TOTAL_FLOORS)
pub const TOTAL_FLOORS: u32 = 51;

/// Hidden bonus floor, unlocked by clearing the final regular floor
pub const HIDDEN_FLOOR: u32 = 0;

/// Last floor of the first band (urban environment)
pub const BAND_ONE_LAST: u32 = 17;

/// Last floor of the second band (spiritual realm)
pub const BAND_TWO_LAST: u32 = 34;

/// Last floor of the third band (tech fusion)
pub const BAND_THREE_LAST: u32 = TOTAL_FLOORS;

// =====================================================
// Generation Probabilities
// =====================================================

/// Chance that a middle-layer node is forced to a boss battle
pub const MIDDLE_LAYER_BOSS_CHANCE: f64 = 0.3;

/// Chance that post-processing injects the floor-type special node
pub const SPECIAL_NODE_CHANCE: f64 = 0.35;

/// Chance of each diagonal forward edge in a grid topology
pub const GRID_DIAGONAL_CHANCE: f64 = 0.5;

/// Chance of a skip edge (i -> i+2) on a circular topology
pub const CIRCULAR_SKIP_CHANCE: f64 = 0.2;

/// Chance that two nearby network nodes get an edge
pub const NETWORK_EDGE_CHANCE: f64 = 0.6;

/// Maximum degree (in + out) of a node in a network topology
pub const NETWORK_MAX_DEGREE: usize = 4;

/// Deepest level count a tree topology uses; 2-3 children per node
/// keeps it between 15 and 40 nodes
pub const TREE_MAX_DEPTH: usize = 4;

// =====================================================
// Difficulty
// =====================================================

pub const EASY_MULT: f32 = 0.8;
pub const NORMAL_MULT: f32 = 1.0;
pub const HARD_MULT: f32 = 1.3;
pub const EXPERT_MULT: f32 = 1.6;
pub const MASTER_MULT: f32 = 2.0;

/// Enemy level offset over the floor level for each battle kind
pub const NORMAL_ENEMY_OFFSET: u32 = 0;
pub const ELITE_ENEMY_OFFSET: u32 = 1;
pub const BOSS_ENEMY_OFFSET: u32 = 2;

// =====================================================
// Default Geometry
// =====================================================

pub const DEFAULT_MAP_LAYERS: usize = 8;
pub const DEFAULT_NODES_PER_LAYER: usize = 3;
pub const DEFAULT_LAYER_SPACING: f32 = 150.0;
pub const DEFAULT_NODE_SPACING: f32 = 100.0;
pub const DEFAULT_MAP_WIDTH: f32 = 1400.0;
pub const DEFAULT_MAP_HEIGHT: f32 = 800.0;

/// Margin kept between generated nodes and the canvas border
pub const MAP_MARGIN: f32 = 50.0;

// =====================================================
// Persistence
// =====================================================

/// Current save record format
pub const SAVE_FORMAT_VERSION: u32 = 1;

/// Default key of the progress record in the persistence store
pub const DEFAULT_SAVE_PATH: &str = "tower_progress.json";

/// Default autosave interval in seconds
pub const DEFAULT_AUTOSAVE_SECS: f32 = 60.0;
