use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::TileCoord;
use crate::math::{Rotator, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementMode {
    Stationary,
    Walking,
    ClimbingUp,
    ClimbingDown,
    InPlaceTurn,
}

/// Order in which a mode is picked when a segment allows several and the current one is not
/// among them.
pub const MOVEMENT_MODE_PRIORITY: [MovementMode; 4] = [
    MovementMode::Walking,
    MovementMode::ClimbingUp,
    MovementMode::ClimbingDown,
    MovementMode::InPlaceTurn,
];

impl MovementMode {
    fn bit(self) -> u8 {
        match self {
            Self::Stationary => 1 << 0,
            Self::Walking => 1 << 1,
            Self::ClimbingUp => 1 << 2,
            Self::ClimbingDown => 1 << 3,
            Self::InPlaceTurn => 1 << 4,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Self::Stationary => "stationary",
            Self::Walking => "walking",
            Self::ClimbingUp => "climbing_up",
            Self::ClimbingDown => "climbing_down",
            Self::InPlaceTurn => "in_place_turn",
        }
    }

    pub fn is_climbing(self) -> bool {
        matches!(self, Self::ClimbingUp | Self::ClimbingDown)
    }
}

impl fmt::Display for MovementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MovementModeSet(u8);

impl MovementModeSet {
    pub const EMPTY: MovementModeSet = MovementModeSet(0);

    pub fn only(mode: MovementMode) -> Self {
        Self(mode.bit())
    }

    pub fn all_moving() -> Self {
        MOVEMENT_MODE_PRIORITY.into_iter().collect()
    }

    pub fn insert(&mut self, mode: MovementMode) {
        self.0 |= mode.bit();
    }

    pub fn contains(self, mode: MovementMode) -> bool {
        self.0 & mode.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn intersection(self, other: MovementModeSet) -> MovementModeSet {
        Self(self.0 & other.0)
    }

    /// Highest-priority member, `None` for an empty set.
    pub fn preferred(self) -> Option<MovementMode> {
        MOVEMENT_MODE_PRIORITY
            .into_iter()
            .find(|mode| self.contains(*mode))
            .or_else(|| self.contains(MovementMode::Stationary).then_some(MovementMode::Stationary))
    }

    pub fn iter(self) -> impl Iterator<Item = MovementMode> {
        [MovementMode::Stationary]
            .into_iter()
            .chain(MOVEMENT_MODE_PRIORITY)
            .filter(move |mode| self.contains(*mode))
    }
}

impl FromIterator<MovementMode> for MovementModeSet {
    fn from_iter<I: IntoIterator<Item = MovementMode>>(iter: I) -> Self {
        let mut set = MovementModeSet::EMPTY;
        for mode in iter {
            set.insert(mode);
        }
        set
    }
}

impl Serialize for MovementModeSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for MovementModeSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let modes = Vec::<MovementMode>::deserialize(deserializer)?;
        Ok(modes.into_iter().collect())
    }
}

/// Progress over the whole path. Ordered: a traversal only ever moves forward through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MovementPhase {
    Beginning,
    Middle,
    Ending,
    Done,
}

impl MovementPhase {
    pub fn as_token(self) -> &'static str {
        match self {
            Self::Beginning => "beginning",
            Self::Middle => "middle",
            Self::Ending => "ending",
            Self::Done => "done",
        }
    }

    /// The phase that follows this one. `Done` is terminal.
    pub fn next(self) -> Self {
        match self {
            Self::Beginning => Self::Middle,
            Self::Middle => Self::Ending,
            Self::Ending | Self::Done => Self::Done,
        }
    }
}

/// A stretch of the path curve, `[start, end)` in arc length, with the modes allowed on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSegment {
    movement_modes: MovementModeSet,
    start: f32,
    end: f32,
    rotation_hint: Rotator,
}

impl PathSegment {
    pub fn new(
        movement_modes: MovementModeSet,
        start: f32,
        end: f32,
        rotation_hint: Rotator,
    ) -> Result<Self, MovementError> {
        if movement_modes.is_empty() {
            return Err(MovementError::DegenerateSegment { start, end });
        }
        Ok(Self {
            movement_modes,
            start: start.min(end),
            end: start.max(end),
            rotation_hint,
        })
    }

    pub fn movement_modes(&self) -> MovementModeSet {
        self.movement_modes
    }

    pub fn start(&self) -> f32 {
        self.start
    }

    pub fn end(&self) -> f32 {
        self.end
    }

    pub fn length(&self) -> f32 {
        self.end - self.start
    }

    pub fn rotation_hint(&self) -> Rotator {
        self.rotation_hint
    }

    pub fn is_turn(&self) -> bool {
        self.movement_modes == MovementModeSet::only(MovementMode::InPlaceTurn)
    }

    pub(crate) fn turn(at: f32, facing: Rotator) -> Self {
        Self {
            movement_modes: MovementModeSet::only(MovementMode::InPlaceTurn),
            start: at,
            end: at,
            rotation_hint: facing,
        }
    }

    pub(crate) fn extend_to(&mut self, end: f32) {
        self.end = self.end.max(end);
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MovementError {
    #[error("no path from {from:?} to {to:?}")]
    NoPathFound { from: TileCoord, to: TileCoord },
    #[error("no tile at position ({}, {}, {})", .position.x, .position.y, .position.z)]
    NoTileAtPosition { position: Vec3 },
    #[error("path segment [{start}, {end}) has no legal movement mode")]
    DegenerateSegment { start: f32, end: f32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferred_mode_follows_priority_order() {
        let set: MovementModeSet = [MovementMode::InPlaceTurn, MovementMode::ClimbingDown]
            .into_iter()
            .collect();
        assert_eq!(set.preferred(), Some(MovementMode::ClimbingDown));
        assert_eq!(MovementModeSet::all_moving().preferred(), Some(MovementMode::Walking));
        assert_eq!(MovementModeSet::EMPTY.preferred(), None);
    }

    #[test]
    fn empty_mode_set_is_a_degenerate_segment() {
        let error = PathSegment::new(MovementModeSet::EMPTY, 0.0, 10.0, Rotator::ZERO)
            .expect_err("degenerate");
        assert_eq!(error, MovementError::DegenerateSegment { start: 0.0, end: 10.0 });
    }

    #[test]
    fn mode_set_deserializes_from_mode_names() {
        let set: MovementModeSet =
            serde_json::from_str(r#"["Walking", "ClimbingUp"]"#).expect("mode set");
        assert!(set.contains(MovementMode::Walking));
        assert!(set.contains(MovementMode::ClimbingUp));
        assert!(!set.contains(MovementMode::ClimbingDown));
        let encoded = serde_json::to_string(&set).expect("encode");
        assert_eq!(encoded, r#"["Walking","ClimbingUp"]"#);
    }

    #[test]
    fn phases_are_ordered() {
        assert!(MovementPhase::Beginning < MovementPhase::Middle);
        assert!(MovementPhase::Middle < MovementPhase::Ending);
        assert!(MovementPhase::Ending < MovementPhase::Done);
    }
}
