use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn horizontal_length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec3) -> f32 {
        (other - self).length()
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn lerp(self, other: Vec3, t: f32) -> Vec3 {
        self + (other - self) * t
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Euler rotation in degrees. Yaw turns around Z, pitch around Y, roll around X.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotator {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl Rotator {
    pub const ZERO: Rotator = Rotator {
        pitch: 0.0,
        yaw: 0.0,
        roll: 0.0,
    };

    pub fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }

    pub fn from_yaw(yaw: f32) -> Self {
        Self::new(0.0, normalize_axis(yaw), 0.0)
    }

    /// Facing along `direction`. A zero direction yields [`Rotator::ZERO`].
    pub fn from_direction(direction: Vec3) -> Self {
        let horizontal = direction.horizontal_length();
        if horizontal <= f32::EPSILON && direction.z.abs() <= f32::EPSILON {
            return Self::ZERO;
        }
        Self {
            pitch: direction.z.atan2(horizontal).to_degrees(),
            yaw: direction.y.atan2(direction.x).to_degrees(),
            roll: 0.0,
        }
    }

    pub fn normalized(self) -> Self {
        Self {
            pitch: normalize_axis(self.pitch),
            yaw: normalize_axis(self.yaw),
            roll: normalize_axis(self.roll),
        }
    }

    /// Largest per-axis shortest-path difference to `other`.
    pub fn max_axis_delta(self, other: Rotator) -> f32 {
        shortest_delta(self.pitch, other.pitch)
            .abs()
            .max(shortest_delta(self.yaw, other.yaw).abs())
            .max(shortest_delta(self.roll, other.roll).abs())
    }

    pub fn is_finite(self) -> bool {
        self.pitch.is_finite() && self.yaw.is_finite() && self.roll.is_finite()
    }
}

impl Add for Rotator {
    type Output = Rotator;

    fn add(self, rhs: Rotator) -> Rotator {
        Rotator::new(
            self.pitch + rhs.pitch,
            self.yaw + rhs.yaw,
            self.roll + rhs.roll,
        )
        .normalized()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub location: Vec3,
    pub rotation: Rotator,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        location: Vec3::ZERO,
        rotation: Rotator::ZERO,
    };

    pub fn new(location: Vec3, rotation: Rotator) -> Self {
        Self { location, rotation }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

/// Wraps an angle in degrees into `(-180, 180]`.
pub fn normalize_axis(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Signed delta that turns `from` onto `to` the short way round.
pub fn shortest_delta(from: f32, to: f32) -> f32 {
    normalize_axis(to - from)
}
