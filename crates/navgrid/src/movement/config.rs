use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{MovementMode, MovementModeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MovementConfig {
    /// How far, in tile cost, the agent can move in one go.
    pub movement_range: f32,
    pub max_walk_speed: f32,
    pub max_climb_speed: f32,
    /// Degrees per second.
    pub max_rotation_speed: f32,
    /// Steepest slope, in degrees, the agent can walk up or down.
    pub max_walk_angle: f32,
    /// Tallest step the agent can climb up or down.
    pub max_climb_height: f32,
    pub available_movement_modes: MovementModeSet,
    pub lock_roll: bool,
    pub lock_pitch: bool,
    pub lock_yaw: bool,
    /// Take translation from the animation source while moving.
    pub use_animation_displacement: bool,
    /// Take translation and rotation from the animation source even while stationary.
    pub always_use_animation_displacement: bool,
    /// Stop this far short of the path end.
    pub stopping_distance: f32,
    /// Decelerate over this many seconds so the agent halts exactly at the path end.
    pub stopping_time: f32,
    /// Length of the Beginning zone and minimum length of the Ending zone.
    pub phase_buffer_distance: f32,
    pub string_pull_path: bool,
    /// Distance between the agent and where the shown path starts.
    pub visualization_offset: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            movement_range: 4.0,
            max_walk_speed: 450.0,
            max_climb_speed: 200.0,
            max_rotation_speed: 720.0,
            max_walk_angle: 45.0,
            max_climb_height: 300.0,
            available_movement_modes: MovementModeSet::all_moving(),
            lock_roll: true,
            lock_pitch: true,
            lock_yaw: false,
            use_animation_displacement: false,
            always_use_animation_displacement: false,
            stopping_distance: 0.0,
            stopping_time: 0.0,
            phase_buffer_distance: 25.0,
            string_pull_path: true,
            visualization_offset: 87.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: f32 },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },
    #[error("{field} must be within [{min}, {max}), got {value}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("available_movement_modes must contain at least one moving mode")]
    NoMovementModes,
    #[error("{field} must be positive while {mode} is available")]
    ZeroSpeed {
        field: &'static str,
        mode: MovementMode,
    },
    #[error("failed to read movement config {path}: {message}")]
    Read { path: PathBuf, message: String },
    #[error("failed to parse movement config at {path}: {message}")]
    Parse { path: String, message: String },
}

impl MovementConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("movement_range", self.movement_range),
            ("max_walk_speed", self.max_walk_speed),
            ("max_climb_speed", self.max_climb_speed),
            ("max_rotation_speed", self.max_rotation_speed),
            ("max_climb_height", self.max_climb_height),
            ("stopping_distance", self.stopping_distance),
            ("stopping_time", self.stopping_time),
            ("phase_buffer_distance", self.phase_buffer_distance),
            ("visualization_offset", self.visualization_offset),
        ];
        for (field, value) in non_negative {
            check_non_negative(field, value)?;
        }

        if !self.max_walk_angle.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "max_walk_angle",
                value: self.max_walk_angle,
            });
        }
        if !(0.0..90.0).contains(&self.max_walk_angle) {
            return Err(ConfigError::OutOfRange {
                field: "max_walk_angle",
                value: self.max_walk_angle,
                min: 0.0,
                max: 90.0,
            });
        }

        let moving = self
            .available_movement_modes
            .iter()
            .any(|mode| mode != MovementMode::Stationary);
        if !moving {
            return Err(ConfigError::NoMovementModes);
        }

        for mode in self.available_movement_modes.iter() {
            let field = match mode {
                MovementMode::Walking => "max_walk_speed",
                mode if mode.is_climbing() => "max_climb_speed",
                _ => continue,
            };
            if self.max_speed_for(mode) == 0.0 {
                return Err(ConfigError::ZeroSpeed { field, mode });
            }
        }
        Ok(())
    }

    /// Parses and validates a JSON document. Unknown fields are rejected, missing fields take
    /// their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let config = serde_path_to_error::deserialize::<_, MovementConfig>(&mut deserializer)
            .map_err(|error| {
                let path = error.path().to_string();
                ConfigError::Parse {
                    path,
                    message: error.into_inner().to_string(),
                }
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;
        Self::from_json_str(&raw)
    }

    pub fn max_speed_for(&self, mode: MovementMode) -> f32 {
        match mode {
            MovementMode::Walking => self.max_walk_speed,
            mode if mode.is_climbing() => self.max_climb_speed,
            _ => 0.0,
        }
    }
}

fn check_non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFinite { field, value });
    }
    if value < 0.0 {
        return Err(ConfigError::Negative { field, value });
    }
    Ok(())
}
