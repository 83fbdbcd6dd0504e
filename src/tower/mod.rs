//! Tower climb orchestration.
//!
//! [`TowerManager`] owns the progress record, the per-floor topology cache and
//! the position of the player inside the active floor. Every state change is
//! queued as a [`TowerEvent`] for the host to drain.

pub mod events;
pub mod floor_plan;

pub use events::TowerEvent;
pub use floor_plan::FloorPlan;

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

use crate::constants::TOTAL_FLOORS;
use crate::engine::TowerConfig;
use crate::generation::{FloorType, GenerationConfig, MapGenerator, TowerSeed};
use crate::player::{AccessPolicy, OpenAccess, PlayerSnapshot, PlayerStateProvider};
use crate::progress::{ProgressStore, TowerProgress};
use crate::topology::{AccessState, MapNode, MapTopology, NodeId};

/// What happens to the floor when a node is failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailedNodePolicy {
    /// The node stays current and incomplete; the player may try again
    #[default]
    Retry,
    /// The active floor is rebuilt and the player returns to its start
    RegenerateFloor,
}

#[derive(Resource)]
pub struct TowerManager {
    config: TowerConfig,
    plan: FloorPlan,
    generator: MapGenerator,
    store: Box<dyn ProgressStore>,
    player: Box<dyn PlayerStateProvider>,
    access: Box<dyn AccessPolicy>,
    progress: TowerProgress,
    floor_configs: HashMap<u32, GenerationConfig>,
    topologies: HashMap<u32, MapTopology>,
    rerolls: HashMap<u32, u32>,
    active_floor: Option<u32>,
    floor_type: Option<FloorType>,
    current_node: Option<NodeId>,
    events: Vec<TowerEvent>,
}

impl TowerManager {
    pub fn new(
        config: TowerConfig,
        store: Box<dyn ProgressStore>,
        player: Box<dyn PlayerStateProvider>,
    ) -> Self {
        let plan = FloorPlan::new(config.tower_seed, config.validation);
        Self {
            config,
            plan,
            generator: MapGenerator::new(),
            store,
            player,
            access: Box::new(OpenAccess),
            progress: TowerProgress::new(),
            floor_configs: HashMap::new(),
            topologies: HashMap::new(),
            rerolls: HashMap::new(),
            active_floor: None,
            floor_type: None,
            current_node: None,
            events: Vec::new(),
        }
    }

    pub fn with_access_policy(mut self, access: Box<dyn AccessPolicy>) -> Self {
        self.access = access;
        self
    }

    pub fn config(&self) -> &TowerConfig {
        &self.config
    }

    pub fn progress(&self) -> &TowerProgress {
        &self.progress
    }

    pub fn active_floor(&self) -> Option<u32> {
        self.active_floor
    }

    pub fn floor_type(&self) -> Option<FloorType> {
        self.floor_type
    }

    pub fn current_node_id(&self) -> Option<NodeId> {
        self.current_node
    }

    pub fn current_topology(&self) -> Option<&MapTopology> {
        self.active_floor.and_then(|floor| self.topologies.get(&floor))
    }

    pub fn current_node(&self) -> Option<&MapNode> {
        let id = self.current_node?;
        self.current_topology()?.node(id)
    }

    /// Cached topology of any generated floor
    pub fn topology(&self, floor: u32) -> Option<&MapTopology> {
        self.topologies.get(&floor)
    }

    /// Player view handed to access policies
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            current_floor: self.progress.current_floor,
            completed_floor_count: self.progress.completed_floors.len(),
            unlocked_floor_count: self.progress.unlocked_floors.len(),
            total_play_time: self.progress.total_play_time,
            profile: self.player.profile(),
        }
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Restore progress from the store. Missing or unreadable records start
    /// fresh; returns whether a saved record was restored.
    ///
    /// The active floor and every generated topology are dropped, since their
    /// node state belongs to the progress being replaced. Floor config
    /// overrides survive.
    pub fn load_progress(&mut self) -> bool {
        let path = self.config.save_path.as_str();
        let restored = match TowerProgress::load_from(self.store.as_ref(), path) {
            Ok(Some(progress)) => {
                info!(
                    path,
                    current_floor = progress.current_floor,
                    completed = progress.completed_floors.len(),
                    "progress restored"
                );
                self.progress = progress;
                true
            }
            Ok(None) => {
                info!(path, "no saved progress, starting fresh");
                self.progress = TowerProgress::new();
                false
            }
            Err(err) => {
                warn!(path, %err, "saved progress unreadable, starting fresh");
                self.progress = TowerProgress::new();
                false
            }
        };
        self.leave_floor();
        self.push_progress_changed();
        restored
    }

    fn leave_floor(&mut self) {
        if let Some(floor) = self.active_floor.take() {
            debug!(floor, "left floor on progress load");
        }
        self.floor_type = None;
        self.current_node = None;
        self.topologies.clear();
        self.rerolls.clear();
    }

    /// Write progress to the store. Failures are logged, never raised.
    pub fn save_progress(&self) -> bool {
        let path = self.config.save_path.as_str();
        match self.progress.save_to(self.store.as_ref(), path) {
            Ok(()) => {
                debug!(path, "progress saved");
                true
            }
            Err(err) => {
                error!(path, %err, "failed to save progress");
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Floors
    // ------------------------------------------------------------------

    pub fn can_enter_floor(&self, floor: u32) -> bool {
        floor <= TOTAL_FLOORS && self.progress.can_enter_floor(floor)
    }

    /// Generation config for a floor, derived once and then cached
    pub fn floor_config(&mut self, floor: u32) -> GenerationConfig {
        let plan = self.plan;
        self.floor_configs
            .entry(floor)
            .or_insert_with(|| plan.config_for(floor))
            .clone()
    }

    /// Override a floor's generation config. A cached topology for that floor
    /// is dropped so the next entry regenerates it.
    pub fn set_floor_config(&mut self, floor: u32, config: GenerationConfig) {
        self.floor_configs.insert(floor, config);
        if self.topologies.remove(&floor).is_some() {
            debug!(floor, "cached topology evicted by config override");
        }
    }

    pub fn enter_floor(&mut self, floor: u32) -> bool {
        if floor > TOTAL_FLOORS {
            debug!(floor, "floor outside tower");
            return false;
        }
        if !self.progress.can_enter_floor(floor) {
            debug!(floor, "floor locked");
            return false;
        }

        self.active_floor = Some(floor);
        self.floor_type = Some(FloorType::from_floor(floor));
        self.progress.set_current_floor(floor);
        if !self.topologies.contains_key(&floor) {
            let config = self.floor_config(floor);
            self.generate_floor(floor, &config);
        }
        self.move_to_start(floor);

        info!(floor, "entered floor");
        self.push_progress_changed();
        self.push_map_state();
        true
    }

    /// Rebuild the active floor and return to its start. With `config` the
    /// floor's stored config is replaced; otherwise the floor is rerolled with
    /// a fresh seed derived from the stored one.
    pub fn regenerate_current_floor(&mut self, config: Option<GenerationConfig>) -> bool {
        let Some(floor) = self.active_floor else {
            debug!("regenerate requested without an active floor");
            return false;
        };

        let config = match config {
            Some(config) => {
                self.floor_configs.insert(floor, config.clone());
                config
            }
            None => {
                let count = self.rerolls.entry(floor).or_insert(0);
                *count += 1;
                let count = *count;
                let mut config = self.floor_config(floor);
                if config.random_seed != 0 {
                    config.random_seed = TowerSeed::new(config.random_seed).floor_seed(count);
                }
                config
            }
        };

        self.generate_floor(floor, &config);
        self.move_to_start(floor);
        info!(floor, "floor regenerated");
        self.push_map_state();
        true
    }

    fn generate_floor(&mut self, floor: u32, config: &GenerationConfig) {
        let topology = self.generator.generate(config);
        self.events.push(TowerEvent::MapGenerated {
            floor,
            map_id: topology.map_id.clone(),
            topology_type: topology.topology_type,
            node_count: topology.len(),
        });
        self.topologies.insert(floor, topology);
    }

    fn move_to_start(&mut self, floor: u32) {
        self.current_node = None;
        let Some(topology) = self.topologies.get_mut(&floor) else {
            return;
        };
        let start = topology.start_node;
        if let Some(node) = topology.node_mut(start) {
            node.visited = true;
            self.current_node = Some(start);
        }
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    pub fn enter_node(&mut self, id: NodeId) -> bool {
        let Some(floor) = self.active_floor else {
            debug!(%id, "no active floor");
            return false;
        };
        let snapshot = self.snapshot();
        let Some(topology) = self.topologies.get_mut(&floor) else {
            debug!(floor, "active floor has no topology");
            return false;
        };
        let Some(node) = topology.node_mut(id) else {
            debug!(floor, %id, "unknown node");
            return false;
        };
        if !node.can_access(&snapshot, self.access.as_ref()) {
            debug!(floor, %id, access = ?node.access, "node not accessible");
            return false;
        }

        node.visited = true;
        let node_type = node.node_type;
        self.current_node = Some(id);
        self.events.push(TowerEvent::NodeEntered {
            floor,
            node: id,
            node_type,
        });
        self.push_map_state();
        true
    }

    /// Resolve the current node. Success completes it and unlocks its
    /// successors; failure follows the configured [`FailedNodePolicy`].
    /// Completing an already completed node changes nothing.
    pub fn complete_current_node(&mut self, success: bool) -> bool {
        let (Some(floor), Some(id)) = (self.active_floor, self.current_node) else {
            debug!("no current node to complete");
            return false;
        };
        let Some(topology) = self.topologies.get_mut(&floor) else {
            return false;
        };
        let Some(node) = topology.node_mut(id) else {
            return false;
        };
        let node_type = node.node_type;

        let mut regenerate = false;
        if success {
            if node.completed {
                debug!(floor, %id, "node already completed");
            } else {
                node.completed = true;
                let targets: Vec<NodeId> = node.targets().collect();
                for target in targets {
                    if let Some(next) = topology.node_mut(target) {
                        if next.unlock() {
                            debug!(floor, node = %target, "node unlocked");
                        }
                    }
                }
                self.events.push(TowerEvent::NodeCompleted {
                    floor,
                    node: id,
                    node_type,
                    success: true,
                });
            }
        } else {
            self.events.push(TowerEvent::NodeCompleted {
                floor,
                node: id,
                node_type,
                success: false,
            });
            regenerate = self.config.failed_node_policy == FailedNodePolicy::RegenerateFloor;
        }

        self.check_floor_completion(floor);
        if regenerate {
            self.regenerate_current_floor(None);
        } else {
            self.push_map_state();
        }
        true
    }

    fn check_floor_completion(&mut self, floor: u32) {
        let Some(topology) = self.topologies.get(&floor) else {
            return;
        };
        let exit_cleared = topology
            .exit_nodes
            .iter()
            .filter_map(|id| topology.node(*id))
            .any(|node| node.completed);
        if !exit_cleared || !self.progress.complete_floor(floor) {
            return;
        }

        let unlocked = TowerProgress::next_floor(floor);
        info!(floor, ?unlocked, "floor completed");
        self.events.push(TowerEvent::FloorCompleted { floor, unlocked });
        self.push_progress_changed();
    }

    /// Successors of the current node the player may enter now
    pub fn available_connections(&self) -> Vec<NodeId> {
        let (Some(topology), Some(node)) = (self.current_topology(), self.current_node()) else {
            return Vec::new();
        };
        let snapshot = self.snapshot();
        node.targets()
            .filter(|target| {
                topology
                    .node(*target)
                    .is_some_and(|next| next.can_access(&snapshot, self.access.as_ref()))
            })
            .collect()
    }

    /// Ids of every node on the active floor still locked
    pub fn locked_nodes(&self) -> Vec<NodeId> {
        self.current_topology()
            .map(|topology| {
                topology
                    .nodes
                    .iter()
                    .filter(|node| node.access == AccessState::Locked)
                    .map(|node| node.id)
                    .collect()
            })
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Time and events
    // ------------------------------------------------------------------

    pub fn tick(&mut self, delta_secs: f64) {
        self.progress.add_play_time(delta_secs);
    }

    pub fn pending_events(&self) -> &[TowerEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<TowerEvent> {
        std::mem::take(&mut self.events)
    }

    fn push_progress_changed(&mut self) {
        self.events.push(TowerEvent::TowerProgressChanged {
            current_floor: self.progress.current_floor,
            completed_floors: self.progress.completed_floors.len(),
            unlocked_floors: self.progress.unlocked_floors.len(),
        });
    }

    fn push_map_state(&mut self) {
        let Some(floor) = self.active_floor else {
            return;
        };
        let available = self.available_connections();
        self.events.push(TowerEvent::MapStateChanged {
            floor,
            current_node: self.current_node,
            available,
        });
    }
}
