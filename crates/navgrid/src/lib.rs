pub mod grid;
pub mod math;
pub mod movement;

pub use grid::{
    reachable_tiles, AStarPathfinder, HeightGrid, HeightGridError, Pathfinder, TileCell,
    TileCoord, TileGraph, TileResolver,
};
pub use math::{Rotator, Transform, Vec3};
pub use movement::{
    AnimationSource, ConfigError, DisplacementFeed, EventLog, GridMovement, MovementConfig,
    MovementError, MovementEvent, MovementMode, MovementModeSet, MovementObserver, MovementPhase,
    PathCurve, PathSegment, PolylineCurve, RotationLimiter, RotationLocks, VisualizationSink,
};
