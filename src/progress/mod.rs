//! Durable climb progress.
//!
//! Floor membership sets plus play time, serialized as a versioned JSON record
//! into a [`ProgressStore`]. Completion is never revoked once recorded.

pub mod store;

pub use store::{FileStore, MemoryStore, ProgressError, ProgressStore};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

use crate::constants::{HIDDEN_FLOOR, SAVE_FORMAT_VERSION, TOTAL_FLOORS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerProgress {
    pub current_floor: u32,
    pub completed_floors: BTreeSet<u32>,
    pub unlocked_floors: BTreeSet<u32>,
    /// Accumulated seconds
    pub total_play_time: f64,
}

impl Default for TowerProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl TowerProgress {
    /// Fresh progress: on floor 1, floor 1 unlocked
    pub fn new() -> Self {
        Self {
            current_floor: 1,
            completed_floors: BTreeSet::new(),
            unlocked_floors: BTreeSet::from([1]),
            total_play_time: 0.0,
        }
    }

    pub fn is_completed(&self, floor: u32) -> bool {
        self.completed_floors.contains(&floor)
    }

    pub fn is_unlocked(&self, floor: u32) -> bool {
        self.unlocked_floors.contains(&floor)
    }

    /// Floor 1 is always open, the hidden floor needs the final floor cleared,
    /// every other floor needs the one below it cleared.
    pub fn can_enter_floor(&self, floor: u32) -> bool {
        match floor {
            1 => true,
            HIDDEN_FLOOR => self.is_completed(TOTAL_FLOORS),
            f if f > TOTAL_FLOORS => false,
            f => self.is_completed(f - 1),
        }
    }

    /// Floor unlocked by clearing `floor`
    pub fn next_floor(floor: u32) -> Option<u32> {
        match floor {
            HIDDEN_FLOOR => None,
            TOTAL_FLOORS => Some(HIDDEN_FLOOR),
            f if f < TOTAL_FLOORS => Some(f + 1),
            _ => None,
        }
    }

    pub fn unlock(&mut self, floor: u32) -> bool {
        self.unlocked_floors.insert(floor)
    }

    /// Record a cleared floor and unlock its successor.
    /// Returns false when the floor was already cleared.
    pub fn complete_floor(&mut self, floor: u32) -> bool {
        if !self.completed_floors.insert(floor) {
            return false;
        }
        if let Some(next) = Self::next_floor(floor) {
            self.unlock(next);
        }
        true
    }

    pub fn set_current_floor(&mut self, floor: u32) {
        self.current_floor = floor;
        self.unlock(floor);
    }

    pub fn add_play_time(&mut self, seconds: f64) {
        if seconds.is_finite() && seconds > 0.0 {
            self.total_play_time += seconds;
        }
    }

    /// Restore the seed invariants: floor 1 and the current floor are unlocked
    pub fn repair(&mut self) -> bool {
        let mut repaired = self.unlock(1);
        repaired |= self.unlock(self.current_floor);
        if !self.total_play_time.is_finite() || self.total_play_time < 0.0 {
            self.total_play_time = 0.0;
            repaired = true;
        }
        repaired
    }

    pub fn to_record(&self) -> ProgressRecord {
        ProgressRecord {
            version: SAVE_FORMAT_VERSION,
            current_floor: self.current_floor,
            completed_floors: self.completed_floors.iter().copied().collect(),
            unlocked_floors: self.unlocked_floors.iter().copied().collect(),
            total_play_time: self.total_play_time,
            saved_at: unix_now(),
        }
    }

    pub fn from_record(record: ProgressRecord) -> Result<Self, ProgressError> {
        if record.version > SAVE_FORMAT_VERSION {
            return Err(ProgressError::Malformed(format!(
                "save version {} is newer than supported {}",
                record.version, SAVE_FORMAT_VERSION
            )));
        }
        if record.current_floor > TOTAL_FLOORS {
            return Err(ProgressError::Malformed(format!(
                "current floor {} outside tower",
                record.current_floor
            )));
        }

        let mut progress = Self {
            current_floor: record.current_floor,
            completed_floors: record.completed_floors.into_iter().collect(),
            unlocked_floors: record.unlocked_floors.into_iter().collect(),
            total_play_time: record.total_play_time,
        };
        if progress.repair() {
            warn!(
                current_floor = progress.current_floor,
                "progress record violated invariants, repaired"
            );
        }
        Ok(progress)
    }

    pub fn save_to(&self, store: &dyn ProgressStore, path: &str) -> Result<(), ProgressError> {
        let bytes = serde_json::to_vec_pretty(&self.to_record())?;
        store.write(path, &bytes)
    }

    /// `Ok(None)` when nothing has been saved yet
    pub fn load_from(store: &dyn ProgressStore, path: &str) -> Result<Option<Self>, ProgressError> {
        let Some(bytes) = store.read(path)? else {
            return Ok(None);
        };
        let record: ProgressRecord = serde_json::from_slice(&bytes)?;
        Self::from_record(record).map(Some)
    }
}

/// On-disk form of [`TowerProgress`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    #[serde(default = "legacy_version")]
    pub version: u32,
    pub current_floor: u32,
    pub completed_floors: Vec<u32>,
    pub unlocked_floors: Vec<u32>,
    pub total_play_time: f64,
    /// Unix seconds
    #[serde(default)]
    pub saved_at: u64,
}

fn legacy_version() -> u32 {
    1
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_progress() {
        let progress = TowerProgress::new();
        assert_eq!(progress.current_floor, 1);
        assert!(progress.is_unlocked(1));
        assert!(progress.completed_floors.is_empty());
        assert!(progress.can_enter_floor(1));
        assert!(!progress.can_enter_floor(2));
        assert!(!progress.can_enter_floor(0));
        assert!(!progress.can_enter_floor(52));
    }

    #[test]
    fn test_complete_floor_unlocks_next_once() {
        let mut progress = TowerProgress::new();
        assert!(progress.complete_floor(1));
        assert!(!progress.complete_floor(1));
        assert!(progress.is_unlocked(2));
        assert!(progress.can_enter_floor(2));
        assert_eq!(progress.completed_floors.len(), 1);
    }

    #[test]
    fn test_final_floor_unlocks_hidden() {
        let mut progress = TowerProgress::new();
        progress.complete_floor(TOTAL_FLOORS);
        assert!(progress.is_unlocked(HIDDEN_FLOOR));
        assert!(progress.can_enter_floor(HIDDEN_FLOOR));
    }

    #[test]
    fn test_hidden_floor_unlocks_nothing() {
        assert_eq!(TowerProgress::next_floor(HIDDEN_FLOOR), None);
        assert_eq!(TowerProgress::next_floor(TOTAL_FLOORS), Some(HIDDEN_FLOOR));
        assert_eq!(TowerProgress::next_floor(7), Some(8));
    }

    #[test]
    fn test_play_time_ignores_bad_values() {
        let mut progress = TowerProgress::new();
        progress.add_play_time(1.5);
        progress.add_play_time(-3.0);
        progress.add_play_time(f64::NAN);
        assert_eq!(progress.total_play_time, 1.5);
    }

    #[test]
    fn test_record_roundtrip() {
        let mut progress = TowerProgress::new();
        progress.complete_floor(1);
        progress.set_current_floor(2);
        progress.add_play_time(90.0);

        let record = progress.to_record();
        assert_eq!(record.version, SAVE_FORMAT_VERSION);
        assert_eq!(record.completed_floors, vec![1]);
        assert_eq!(record.unlocked_floors, vec![1, 2]);
        assert!(record.saved_at > 0);

        let restored = TowerProgress::from_record(record).unwrap();
        assert_eq!(restored, progress);
    }

    #[test]
    fn test_from_record_repairs_invariants() {
        let record = ProgressRecord {
            version: 1,
            current_floor: 5,
            completed_floors: vec![1, 2, 3, 4],
            unlocked_floors: vec![2, 3],
            total_play_time: 10.0,
            saved_at: 0,
        };
        let progress = TowerProgress::from_record(record).unwrap();
        assert!(progress.is_unlocked(1));
        assert!(progress.is_unlocked(5));
    }

    #[test]
    fn test_from_record_rejects_future_version() {
        let mut record = TowerProgress::new().to_record();
        record.version = SAVE_FORMAT_VERSION + 1;
        assert!(matches!(
            TowerProgress::from_record(record),
            Err(ProgressError::Malformed(_))
        ));
    }

    #[test]
    fn test_record_without_version_loads() {
        let json = r#"{"current_floor":3,"completed_floors":[1,2],"unlocked_floors":[1,2,3],"total_play_time":12.5}"#;
        let record: ProgressRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.version, 1);
        assert_eq!(record.saved_at, 0);
        let progress = TowerProgress::from_record(record).unwrap();
        assert_eq!(progress.current_floor, 3);
    }

    #[test]
    fn test_save_and_load_through_store() {
        let store = MemoryStore::default();
        assert_eq!(TowerProgress::load_from(&store, "p.json").unwrap(), None);

        let mut progress = TowerProgress::new();
        progress.complete_floor(1);
        progress.save_to(&store, "p.json").unwrap();

        let loaded = TowerProgress::load_from(&store, "p.json").unwrap().unwrap();
        assert_eq!(loaded, progress);
    }

    #[test]
    fn test_load_malformed_json_is_error() {
        let store = MemoryStore::default();
        store.write("p.json", b"{not json").unwrap();
        assert!(matches!(
            TowerProgress::load_from(&store, "p.json"),
            Err(ProgressError::Serialization(_))
        ));
    }
}
