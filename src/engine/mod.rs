//! Host integration: session configuration and the bevy plugin.

pub mod config;
pub mod plugin;

pub use config::{ConfigError, TowerConfig};
pub use plugin::{AutosaveTimer, TowerPlugin};
