//! Property-based tests using proptest
//!
//! Invariants that must hold for all inputs:
//! - Generation: any seed and shape yields a valid, connected topology
//! - Generation: a fixed seed is reproducible
//! - Progress: completion only grows and always unlocks the successor
//! - Traversal: completing nodes never locks anything
//! - Manager: no sequence of floor operations revokes a completed floor

use proptest::prelude::*;
use std::collections::BTreeSet;

use tower_climb::constants::{HIDDEN_FLOOR, TOTAL_FLOORS};
use tower_climb::generation::{
    Difficulty, FloorType, GenerationConfig, GenerationRule, MapGenerator, TopologyType,
};
use tower_climb::progress::{MemoryStore, TowerProgress};
use tower_climb::topology::{AccessState, NodeType};
use tower_climb::player::StaticProfile;
use tower_climb::tower::FailedNodePolicy;
use tower_climb::{TowerConfig, TowerManager};

fn topology_type() -> impl Strategy<Value = TopologyType> {
    prop::sample::select(TopologyType::ALL.to_vec())
}

fn rule() -> impl Strategy<Value = GenerationRule> {
    prop::sample::select(vec![
        GenerationRule::Balanced,
        GenerationRule::CombatFocused,
        GenerationRule::ExplorationFocused,
        GenerationRule::ResourceFocused,
        GenerationRule::Challenging,
    ])
}

fn difficulty() -> impl Strategy<Value = Difficulty> {
    prop::sample::select(vec![
        Difficulty::Easy,
        Difficulty::Normal,
        Difficulty::Hard,
        Difficulty::Expert,
        Difficulty::Master,
    ])
}

prop_compose! {
    fn generation_config()(
        topology in topology_type(),
        rule in rule(),
        difficulty in difficulty(),
        floor in 0u32..=TOTAL_FLOORS,
        layers in 2usize..=10,
        per_layer in 1usize..=5,
        seed in 1u64..,
    ) -> GenerationConfig {
        GenerationConfig::default()
            .with_topology(topology)
            .with_rule(rule)
            .with_difficulty(difficulty)
            .with_floor(floor, FloorType::from_floor(floor))
            .with_layers(layers, per_layer)
            .with_seed(seed)
    }
}

// ============================================================
// Generation Properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_generated_topology_is_valid(config in generation_config()) {
        let topology = MapGenerator::new().generate(&config);
        let report = topology.validate();
        prop_assert!(report.is_valid(), "{:?} seed={} -> {}", config.topology_type, config.random_seed, report);
        prop_assert_eq!(report.start_count, 1);
        prop_assert!(!topology.exit_nodes.is_empty());
        prop_assert!(topology.reachable_from_start().iter().all(|r| *r));
    }

    #[test]
    fn prop_every_node_unlockable_and_exit_reachable(config in generation_config()) {
        let topology = MapGenerator::new().generate(&config);
        let report = topology.validate();
        prop_assert!(report.exit_reachable, "{:?} seed={}", config.topology_type, config.random_seed);
        prop_assert!(topology.unlockable_from_start().iter().all(|r| *r));
    }

    #[test]
    fn prop_only_start_is_unlocked(config in generation_config()) {
        let topology = MapGenerator::new().generate(&config);
        for node in &topology.nodes {
            let expected = if node.id == topology.start_node {
                AccessState::Available
            } else {
                AccessState::Locked
            };
            prop_assert_eq!(node.access, expected);
            prop_assert!(!node.visited);
            prop_assert!(!node.completed);
        }
    }

    #[test]
    fn prop_difficulty_applied_everywhere(config in generation_config()) {
        let topology = MapGenerator::new().generate(&config);
        let multiplier = config.difficulty.multiplier();
        prop_assert!(topology.nodes.iter().all(|n| n.difficulty_multiplier == multiplier));
        prop_assert!(topology.nodes.iter().all(|n| n.floor_level == config.floor_level));
    }

    #[test]
    fn prop_at_most_one_special_node(config in generation_config()) {
        let topology = MapGenerator::new().generate(&config);
        if let Some(special) = config.floor_type.special_node() {
            prop_assert!(topology.nodes_of_type(special).len() <= 1);
        }
    }

    #[test]
    fn prop_seeded_generation_is_reproducible(config in generation_config()) {
        let generator = MapGenerator::new();
        let a = generator.generate(&config);
        let b = generator.generate(&config);
        prop_assert_eq!(a.seed, config.random_seed);
        prop_assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    }

    #[test]
    fn prop_connections_reference_existing_nodes(config in generation_config()) {
        let topology = MapGenerator::new().generate(&config);
        for node in &topology.nodes {
            for target in node.targets() {
                prop_assert!(target.index() < topology.len());
                prop_assert_ne!(target, node.id);
            }
        }
    }

    #[test]
    fn prop_topology_name_parse_never_panics(name in ".{0,16}") {
        let parsed = TopologyType::parse_or_linear(&name);
        if TopologyType::from_name(&name).is_none() {
            prop_assert_eq!(parsed, TopologyType::Linear);
        }
    }
}

// ============================================================
// Progress Properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_completion_unlocks_successor(floors in prop::collection::vec(0u32..=TOTAL_FLOORS, 0..60)) {
        let mut progress = TowerProgress::new();
        let mut completed_so_far = 0;
        for floor in floors {
            progress.complete_floor(floor);
            prop_assert!(progress.completed_floors.len() >= completed_so_far);
            completed_so_far = progress.completed_floors.len();
        }
        prop_assert!(progress.is_unlocked(1));
        for floor in &progress.completed_floors {
            if let Some(next) = TowerProgress::next_floor(*floor) {
                prop_assert!(progress.is_unlocked(next));
            }
        }
    }

    #[test]
    fn prop_gating_matches_predecessor(floor in 0u32..=TOTAL_FLOORS + 5, cleared in prop::collection::btree_set(0u32..=TOTAL_FLOORS, 0..20)) {
        let mut progress = TowerProgress::new();
        for f in &cleared {
            progress.complete_floor(*f);
        }
        let expected = match floor {
            1 => true,
            HIDDEN_FLOOR => cleared.contains(&TOTAL_FLOORS),
            f if f > TOTAL_FLOORS => false,
            f => cleared.contains(&(f - 1)),
        };
        prop_assert_eq!(progress.can_enter_floor(floor), expected);
    }

    #[test]
    fn prop_play_time_never_decreases(deltas in prop::collection::vec(-10.0f64..10.0, 0..50)) {
        let mut progress = TowerProgress::new();
        let mut last = 0.0;
        for delta in deltas {
            progress.add_play_time(delta);
            prop_assert!(progress.total_play_time >= last);
            last = progress.total_play_time;
        }
    }
}

// ============================================================
// Traversal Properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_random_walk_never_relocks(seed in 1u64.., choices in prop::collection::vec(0usize..4, 1..40)) {
        let config = TowerConfig { tower_seed: seed, ..TowerConfig::default() };
        let mut manager = TowerManager::new(
            config,
            Box::new(MemoryStore::default()),
            Box::new(StaticProfile::default()),
        );
        prop_assert!(manager.enter_floor(1));

        let mut unlocked_before = 0;
        for choice in choices {
            manager.complete_current_node(true);
            let available = manager.available_connections();
            let topology = manager.current_topology().unwrap();
            let unlocked = topology.nodes.iter().filter(|n| n.access == AccessState::Available).count();
            prop_assert!(unlocked >= unlocked_before);
            unlocked_before = unlocked;

            if available.is_empty() {
                break;
            }
            let next = available[choice % available.len()];
            prop_assert!(manager.enter_node(next));
        }

        manager.complete_current_node(true);
        let on_exit = manager.current_node().is_some_and(|n| n.node_type == NodeType::Exit);
        if on_exit {
            prop_assert!(manager.progress().is_completed(1));
        }
    }
}

// ============================================================
// Manager Gating Properties
// ============================================================

#[derive(Debug, Clone)]
enum FloorOp {
    Advance(usize),
    Fail,
    Reroll,
    Override(usize),
    Reenter(usize),
}

fn floor_op() -> impl Strategy<Value = FloorOp> {
    prop_oneof![
        6 => (0usize..4).prop_map(FloorOp::Advance),
        1 => Just(FloorOp::Fail),
        1 => Just(FloorOp::Reroll),
        1 => (2usize..5).prop_map(FloorOp::Override),
        1 => (0usize..8).prop_map(FloorOp::Reenter),
    ]
}

fn apply(manager: &mut TowerManager, op: &FloorOp) {
    let Some(floor) = manager.active_floor() else {
        manager.enter_floor(manager.progress().current_floor);
        return;
    };
    match op {
        FloorOp::Advance(choice) => {
            manager.complete_current_node(true);
            if manager.progress().is_completed(floor) {
                if let Some(next) = TowerProgress::next_floor(floor) {
                    if manager.enter_floor(next) {
                        return;
                    }
                }
            }
            let available = manager.available_connections();
            if !available.is_empty() {
                manager.enter_node(available[choice % available.len()]);
            }
        }
        FloorOp::Fail => {
            manager.complete_current_node(false);
        }
        FloorOp::Reroll => {
            manager.regenerate_current_floor(None);
        }
        FloorOp::Override(layers) => {
            let config = GenerationConfig::default()
                .with_topology(TopologyType::Linear)
                .with_layers(*layers, 1)
                .with_floor(floor, FloorType::from_floor(floor))
                .with_seed(floor as u64 + 1);
            manager.set_floor_config(floor, config);
            manager.enter_floor(floor);
        }
        FloorOp::Reenter(pick) => {
            let completed: Vec<u32> = manager.progress().completed_floors.iter().copied().collect();
            let target = match completed.get(pick % (completed.len() + 1)) {
                Some(f) => *f,
                None => 1,
            };
            manager.enter_floor(target);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_manager_never_revokes_completion(
        seed in 1u64..,
        regenerate_on_fail in any::<bool>(),
        ops in prop::collection::vec(floor_op(), 1..80),
    ) {
        let policy = if regenerate_on_fail {
            FailedNodePolicy::RegenerateFloor
        } else {
            FailedNodePolicy::Retry
        };
        let mut manager = TowerManager::new(
            TowerConfig { tower_seed: seed, failed_node_policy: policy, ..TowerConfig::default() },
            Box::new(MemoryStore::default()),
            Box::new(StaticProfile::default()),
        );
        prop_assert!(manager.enter_floor(1));

        let mut seen: BTreeSet<u32> = BTreeSet::new();
        for op in &ops {
            apply(&mut manager, op);
            for floor in &seen {
                prop_assert!(manager.progress().is_completed(*floor), "{:?} revoked floor {}", op, floor);
                if let Some(next) = TowerProgress::next_floor(*floor) {
                    prop_assert!(manager.can_enter_floor(next), "{:?} relocked floor {}", op, next);
                }
            }
            seen.extend(manager.progress().completed_floors.iter().copied());
        }
    }
}
