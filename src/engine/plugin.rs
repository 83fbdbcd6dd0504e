use bevy::prelude::*;
use tracing::info;

use crate::tower::{TowerEvent, TowerManager};

/// Drives a host-inserted [`TowerManager`] resource: restores progress on
/// startup, accumulates play time, forwards queued [`TowerEvent`]s as bevy
/// events, autosaves on an interval and saves on `AppExit`.
pub struct TowerPlugin {
    pub load_on_startup: bool,
}

impl Default for TowerPlugin {
    fn default() -> Self {
        Self {
            load_on_startup: true,
        }
    }
}

impl Plugin for TowerPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<TowerEvent>()
            .init_resource::<AutosaveTimer>()
            .add_systems(Update, (track_play_time, forward_tower_events).chain())
            .add_systems(Last, save_on_exit);

        if self.load_on_startup {
            app.add_systems(Startup, load_progress_on_startup);
        }
    }
}

/// Seconds since the last autosave
#[derive(Resource, Debug, Default)]
pub struct AutosaveTimer {
    pub elapsed: f32,
    pub saves: u32,
}

fn load_progress_on_startup(manager: Option<ResMut<TowerManager>>) {
    if let Some(mut manager) = manager {
        manager.load_progress();
    }
}

fn track_play_time(
    time: Option<Res<Time>>,
    manager: Option<ResMut<TowerManager>>,
    mut autosave: ResMut<AutosaveTimer>,
) {
    let (Some(time), Some(mut manager)) = (time, manager) else {
        return;
    };
    manager.tick(time.delta_secs_f64());

    if !manager.config().autosave_enabled() {
        return;
    }
    autosave.elapsed += time.delta_secs();
    if autosave.elapsed >= manager.config().autosave_interval_secs {
        autosave.elapsed = 0.0;
        if manager.save_progress() {
            autosave.saves += 1;
        }
    }
}

fn forward_tower_events(manager: Option<ResMut<TowerManager>>, mut writer: EventWriter<TowerEvent>) {
    if let Some(mut manager) = manager {
        writer.send_batch(manager.drain_events());
    }
}

fn save_on_exit(mut exits: EventReader<AppExit>, manager: Option<Res<TowerManager>>) {
    if exits.is_empty() {
        return;
    }
    exits.clear();
    if let Some(manager) = manager {
        info!("app exiting, saving progress");
        manager.save_progress();
    }
}
