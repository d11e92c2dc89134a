use crate::math::{normalize_axis, shortest_delta, Rotator};

use super::config::MovementConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationLocks {
    pub roll: bool,
    pub pitch: bool,
    pub yaw: bool,
}

impl RotationLocks {
    pub fn from_config(config: &MovementConfig) -> Self {
        Self {
            roll: config.lock_roll,
            pitch: config.lock_pitch,
            yaw: config.lock_yaw,
        }
    }

    /// `requested` on unlocked axes, `current` on locked ones.
    pub fn apply(&self, current: Rotator, requested: Rotator) -> Rotator {
        Rotator {
            pitch: if self.pitch { current.pitch } else { requested.pitch },
            yaw: if self.yaw { current.yaw } else { requested.yaw },
            roll: if self.roll { current.roll } else { requested.roll },
        }
    }
}

/// Bounds how far a rotation may change in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationLimiter {
    /// Degrees per second.
    pub max_rotation_speed: f32,
    pub locks: RotationLocks,
}

impl RotationLimiter {
    pub fn new(max_rotation_speed: f32, locks: RotationLocks) -> Self {
        Self {
            max_rotation_speed,
            locks,
        }
    }

    pub fn from_config(config: &MovementConfig) -> Self {
        Self::new(config.max_rotation_speed, RotationLocks::from_config(config))
    }

    pub fn limit(&self, old_rotation: Rotator, new_rotation: Rotator, delta_seconds: f32) -> Rotator {
        let max_step = if delta_seconds.is_finite() {
            (self.max_rotation_speed * delta_seconds).max(0.0)
        } else {
            0.0
        };
        Rotator {
            pitch: limit_axis(old_rotation.pitch, new_rotation.pitch, max_step, self.locks.pitch),
            yaw: limit_axis(old_rotation.yaw, new_rotation.yaw, max_step, self.locks.yaw),
            roll: limit_axis(old_rotation.roll, new_rotation.roll, max_step, self.locks.roll),
        }
    }
}

fn limit_axis(old: f32, new: f32, max_step: f32, locked: bool) -> f32 {
    if locked {
        return old;
    }
    let delta = shortest_delta(old, new);
    if delta.abs() <= max_step {
        return normalize_axis(old + delta);
    }
    normalize_axis(old + max_step.copysign(delta))
}
