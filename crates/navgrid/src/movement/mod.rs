mod animation;
mod component;
mod config;
mod curve;
mod events;
mod rotation;
mod segmenter;
mod string_pull;
mod types;
mod visualization;

pub use animation::{AnimationSource, DisplacementFeed};
pub use component::{GridMovement, TURN_COMPLETE_TOLERANCE_DEGREES};
pub use config::{ConfigError, MovementConfig};
pub use curve::{PathCurve, PolylineCurve};
pub use events::{EventLog, MovementEvent, MovementObserver};
pub use rotation::{RotationLimiter, RotationLocks};
pub use segmenter::{
    build_segments, transition_modes, AgentGraph, TURN_IN_PLACE_THRESHOLD_DEGREES,
};
pub use string_pull::string_pull;
pub use types::{
    MovementError, MovementMode, MovementModeSet, MovementPhase, PathSegment,
    MOVEMENT_MODE_PRIORITY,
};
pub use visualization::{visible_segments, VisualizationSink};
