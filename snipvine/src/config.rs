use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::level::{LevelDescriptor, LevelError};
use crate::math::Vec2;

/// Geometry of a level, in scene units (points, y up, origin bottom-left).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneLayout {
    pub size: Vec2,
    /// The prize is lost once its center is at or below this height.
    pub water_line: f32,
    /// Height of the water sprite as a fraction of the scene height.
    pub water_height_ratio: f32,
    /// Unit coordinates of the prize's starting point.
    pub prize_position: Vec2,
    pub prize_size: Vec2,
    pub prize_density: f32,
    /// Unit coordinates of the crocodile.
    pub crocodile_position: Vec2,
    pub crocodile_size: Vec2,
    pub vine_segment_size: Vec2,
    pub vine_holder_size: Vec2,
}

impl Default for SceneLayout {
    fn default() -> Self {
        Self {
            size: Vec2::new(375.0, 667.0),
            water_line: 0.0,
            water_height_ratio: 0.2139,
            prize_position: Vec2::new(0.5, 0.7),
            prize_size: Vec2::new(52.0, 80.0),
            prize_density: 0.5,
            crocodile_position: Vec2::new(0.75, 0.312),
            crocodile_size: Vec2::new(140.0, 100.0),
            vine_segment_size: Vec2::new(6.0, 20.0),
            vine_holder_size: Vec2::new(20.0, 20.0),
        }
    }
}

impl SceneLayout {
    pub fn prize_origin(&self) -> Vec2 {
        self.prize_position.scale_by(self.size)
    }

    pub fn crocodile_origin(&self) -> Vec2 {
        self.crocodile_position.scale_by(self.size)
    }
}

/// Tunables of the game. Every field has a default, so a config file only
/// lists what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Whether one continuous swipe may sever more than one vine.
    pub allow_multiple_cuts_per_gesture: bool,
    /// Level descriptor to load instead of the bundled one.
    pub level_file: Option<PathBuf>,
    /// Directory holding sound files.
    pub asset_dir: PathBuf,
    /// Seconds between the end of a level and the next one.
    pub restart_delay: f32,
    /// Meters per second squared.
    pub gravity: Vec2,
    pub points_per_meter: f32,
    /// Velocity solver iterations per physics step.
    pub solver_iterations: usize,
    /// Linear and angular damping of the prize and vine segments.
    pub damping: f32,
    /// Seed for the crocodile's idle animation. Random when unset.
    pub rng_seed: Option<u64>,
    pub layout: SceneLayout,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            allow_multiple_cuts_per_gesture: false,
            level_file: None,
            asset_dir: PathBuf::from("assets"),
            restart_delay: 1.0,
            gravity: Vec2::new(0.0, -9.8),
            points_per_meter: 150.0,
            solver_iterations: 8,
            damping: 0.1,
            rng_seed: None,
            layout: SceneLayout::default(),
        }
    }
}

impl GameConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {:?}", path))?;
        Self::from_json(&json).with_context(|| format!("invalid config {:?}", path))
    }

    #[must_use]
    pub fn with_multiple_cuts(mut self, allow: bool) -> Self {
        self.allow_multiple_cuts_per_gesture = allow;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// The configured level file, or the bundled level.
    pub fn load_level(&self) -> Result<LevelDescriptor, LevelError> {
        match &self.level_file {
            Some(path) => LevelDescriptor::load(path),
            None => LevelDescriptor::bundled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = GameConfig::from_json(
            r#"{ "allow_multiple_cuts_per_gesture": true, "layout": { "water_line": 12.5 } }"#,
        )
        .unwrap();
        assert!(config.allow_multiple_cuts_per_gesture);
        assert_eq!(config.layout.water_line, 12.5);
        assert_eq!(config.layout.size, SceneLayout::default().size);
        assert_eq!(config.restart_delay, 1.0);
    }

    #[test]
    fn multi_cut_is_off_by_default() {
        assert!(!GameConfig::default().allow_multiple_cuts_per_gesture);
        assert!(GameConfig::default().with_multiple_cuts(true).allow_multiple_cuts_per_gesture);
    }

    #[test]
    fn default_config_uses_bundled_level() {
        assert_eq!(GameConfig::default().load_level().unwrap().vines().len(), 3);
    }
}
