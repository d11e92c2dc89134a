use std::fs;
use std::path::{Path, PathBuf};

use navgrid::{
    ConfigError, HeightGrid, HeightGridError, MovementConfig, Rotator, TileCell, TileCoord,
    TileGraph, Transform, Vec3,
};
use serde::Deserialize;
use thiserror::Error;

/// Scenario used when no file is given on the command line: a walk up a ledge, a turn, and a
/// walk back down around a short wall.
pub(crate) const BUILTIN_SCENARIO_JSON: &str = r#"{
    "grid": {
        "width": 6,
        "height": 4,
        "tile_size": 100.0,
        "heights": [
            0.0, 0.0, 0.0, 100.0, 100.0, 100.0,
            0.0, 0.0, 0.0, 100.0, 100.0, 100.0,
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0
        ],
        "blocked": [[1, 1], [2, 1]]
    },
    "agent": { "tile": [0, 0], "yaw": 0.0 },
    "movement": {
        "movement_range": 12.0,
        "max_walk_angle": 30.0,
        "stopping_time": 0.25
    },
    "orders": [
        { "kind": "move_to", "tile": [5, 0] },
        { "kind": "turn_to", "yaw": 90.0 },
        { "kind": "move_to", "tile": [0, 3] }
    ]
}"#;

#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scenario at {path}: {message}")]
    Parse { path: String, message: String },
    #[error("invalid movement config: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid grid: {0}")]
    Grid(#[from] HeightGridError),
    #[error("{what} refers to tile ({x}, {y}) outside the {width}x{height} grid")]
    UnknownTile {
        what: &'static str,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    pub(crate) grid: GridSpec,
    pub(crate) agent: AgentSpec,
    #[serde(default)]
    pub(crate) movement: MovementConfig,
    #[serde(default)]
    pub(crate) orders: Vec<Order>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct GridSpec {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) tile_size: f32,
    #[serde(default)]
    pub(crate) origin: Vec3,
    /// Row-major, `y * width + x`.
    pub(crate) heights: Vec<f32>,
    #[serde(default)]
    pub(crate) blocked: Vec<[u32; 2]>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AgentSpec {
    pub(crate) tile: [u32; 2],
    #[serde(default)]
    pub(crate) yaw: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub(crate) enum Order {
    MoveTo { tile: [u32; 2] },
    TurnTo { yaw: f32 },
}

impl Scenario {
    pub(crate) fn builtin() -> Result<Self, ScenarioError> {
        Self::from_json_str(BUILTIN_SCENARIO_JSON)
    }

    pub(crate) fn load(path: &Path) -> Result<Self, ScenarioError> {
        let raw = fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub(crate) fn from_json_str(raw: &str) -> Result<Self, ScenarioError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let scenario = serde_path_to_error::deserialize::<_, Scenario>(&mut deserializer)
            .map_err(|error| {
                let path = error.path().to_string();
                ScenarioError::Parse {
                    path,
                    message: error.into_inner().to_string(),
                }
            })?;
        scenario.movement.validate()?;
        Ok(scenario)
    }

    pub(crate) fn build_grid(&self) -> Result<HeightGrid, ScenarioError> {
        let spec = &self.grid;
        let cells = spec.heights.iter().copied().map(TileCell::open).collect();
        let mut grid =
            HeightGrid::new(spec.width, spec.height, spec.origin, spec.tile_size, cells)?;
        for [x, y] in &spec.blocked {
            let tile = self.tile("blocked tile", [*x, *y])?;
            if let Some(cell) = grid.cell_mut(tile) {
                cell.blocked = true;
            }
        }
        Ok(grid)
    }

    /// Where the agent starts: standing on its tile, facing `agent.yaw`.
    pub(crate) fn agent_transform(&self, grid: &HeightGrid) -> Result<Transform, ScenarioError> {
        let tile = self.tile("agent", self.agent.tile)?;
        let location = grid
            .tile_location(tile)
            .ok_or_else(|| self.unknown_tile("agent", self.agent.tile))?;
        Ok(Transform::new(location, Rotator::from_yaw(self.agent.yaw)))
    }

    /// Checks every order target against the grid bounds.
    pub(crate) fn validate_orders(&self) -> Result<(), ScenarioError> {
        for order in &self.orders {
            if let Order::MoveTo { tile } = order {
                self.tile("move_to order", *tile)?;
            }
        }
        Ok(())
    }

    pub(crate) fn tile(
        &self,
        what: &'static str,
        [x, y]: [u32; 2],
    ) -> Result<TileCoord, ScenarioError> {
        if x >= self.grid.width || y >= self.grid.height {
            return Err(self.unknown_tile(what, [x, y]));
        }
        Ok(TileCoord::new(x, y))
    }

    fn unknown_tile(&self, what: &'static str, [x, y]: [u32; 2]) -> ScenarioError {
        ScenarioError::UnknownTile {
            what,
            x,
            y,
            width: self.grid.width,
            height: self.grid.height,
        }
    }
}
