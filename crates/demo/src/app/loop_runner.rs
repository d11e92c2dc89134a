use std::process::ExitCode;

use navgrid::{
    AStarPathfinder, ConfigError, EventLog, GridMovement, MovementEvent, Rotator, Transform,
};
use thiserror::Error;
use tracing::{error, info, warn};

use super::bootstrap::AppWiring;
use super::reporting::{LoggedPathPreview, LoggingObserver};
use super::scenario::{Order, Scenario, ScenarioError};

const AGENT_NAME: &str = "agent";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LoopConfig {
    pub(crate) target_tps: u32,
    /// Simulation gives up once this many ticks have run.
    pub(crate) max_ticks: u64,
    /// Ticks between two progress lines.
    pub(crate) progress_log_interval: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_ticks: 60 * 120,
            progress_log_interval: 30,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum DemoError {
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error("failed to create movement component: {0}")]
    Movement(#[from] ConfigError),
    #[error("orders still running after {max_ticks} ticks")]
    TickLimitReached { max_ticks: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RunSummary {
    pub(crate) ticks: u64,
    pub(crate) orders_completed: usize,
    pub(crate) orders_rejected: usize,
    pub(crate) final_transform: Transform,
    pub(crate) events: Vec<MovementEvent>,
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let scenario = match app.scenario_path.as_deref() {
        Some(path) => Scenario::load(path),
        None => Scenario::builtin(),
    };
    let result = scenario
        .map_err(DemoError::from)
        .and_then(|scenario| run_scenario(&scenario, &app.config));
    match result {
        Ok(summary) => {
            let location = summary.final_transform.location;
            info!(
                ticks = summary.ticks,
                orders_completed = summary.orders_completed,
                orders_rejected = summary.orders_rejected,
                events = summary.events.len(),
                x = location.x,
                y = location.y,
                z = location.z,
                yaw = summary.final_transform.rotation.yaw,
                "scenario_finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}

/// Runs every order of `scenario` to completion on a fixed timestep.
pub(crate) fn run_scenario(scenario: &Scenario, config: &LoopConfig) -> Result<RunSummary, DemoError> {
    let grid = scenario.build_grid()?;
    scenario.validate_orders()?;
    let start = scenario.agent_transform(&grid)?;

    let mut movement = GridMovement::new(scenario.movement.clone(), start)?;
    let events = EventLog::default();
    movement.add_observer(Box::new(events.clone()));
    movement.add_observer(Box::new(LoggingObserver::new(AGENT_NAME)));
    movement.set_visualization_sink(Box::new(LoggedPathPreview::new(AGENT_NAME)));

    let target_tps = config.target_tps.max(1);
    let fixed_dt = 1.0 / target_tps as f32;
    let progress_log_interval = config.progress_log_interval.max(1);
    info!(
        target_tps,
        max_ticks = config.max_ticks,
        width = scenario.grid.width,
        height = scenario.grid.height,
        orders = scenario.orders.len(),
        "loop_config"
    );

    let mut ticks = 0u64;
    let mut orders_completed = 0usize;
    let mut orders_rejected = 0usize;
    for (index, order) in scenario.orders.iter().enumerate() {
        match *order {
            Order::MoveTo { tile } => {
                let target = scenario.tile("move_to order", tile)?;
                if let Err(err) = movement.move_to(&grid, &AStarPathfinder, target) {
                    warn!(order = index, error = %err, "order_rejected");
                    orders_rejected += 1;
                    continue;
                }
                let reachable = movement.tiles_in_range(&grid).len();
                info!(order = index, reachable_tiles = reachable, "order_started");
            }
            Order::TurnTo { yaw } => {
                movement.turn_to(Rotator::from_yaw(yaw));
                info!(order = index, yaw, "order_started");
            }
        }

        while movement.is_moving() {
            if ticks >= config.max_ticks {
                return Err(DemoError::TickLimitReached {
                    max_ticks: config.max_ticks,
                });
            }
            let transform = movement.advance(fixed_dt);
            ticks += 1;
            if ticks % progress_log_interval == 0 {
                info!(
                    tick = ticks,
                    mode = %movement.mode(),
                    phase = movement.phase().as_token(),
                    remaining = movement.remaining_distance(),
                    x = transform.location.x,
                    y = transform.location.y,
                    z = transform.location.z,
                    "agent_progress"
                );
            }
        }
        movement.snap_to_grid(&grid);
        orders_completed += 1;
    }

    Ok(RunSummary {
        ticks,
        orders_completed,
        orders_rejected,
        final_transform: movement.transform(),
        events: events.snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use navgrid::{MovementMode, TileCoord, TileResolver};

    use super::*;

    fn scenario(raw: &str) -> Scenario {
        Scenario::from_json_str(raw).expect("scenario")
    }

    #[test]
    fn builtin_scenario_runs_every_order() {
        let scenario = Scenario::builtin().expect("builtin");
        let summary = run_scenario(&scenario, &LoopConfig::default()).expect("run");

        assert_eq!(summary.orders_completed, 3);
        assert_eq!(summary.orders_rejected, 0);
        let grid = scenario.build_grid().expect("grid");
        assert_eq!(
            grid.tile_at(summary.final_transform.location),
            Some(TileCoord::new(0, 3))
        );

        let ended = summary
            .events
            .iter()
            .filter(|event| matches!(event, MovementEvent::MovementEnded))
            .count();
        assert_eq!(ended, 3);
        assert!(summary.events.contains(&MovementEvent::ModeChanged {
            old: MovementMode::Walking,
            new: MovementMode::ClimbingUp,
        }));
        assert!(summary.events.contains(&MovementEvent::ModeChanged {
            old: MovementMode::Walking,
            new: MovementMode::ClimbingDown,
        }));
    }

    #[test]
    fn unreachable_order_is_skipped() {
        let scenario = scenario(
            r#"{
                "grid": { "width": 3, "height": 1, "tile_size": 100.0,
                          "heights": [0.0, 0.0, 0.0], "blocked": [[1, 0]] },
                "agent": { "tile": [0, 0] },
                "orders": [
                    { "kind": "move_to", "tile": [2, 0] },
                    { "kind": "turn_to", "yaw": 180.0 }
                ]
            }"#,
        );
        let summary = run_scenario(&scenario, &LoopConfig::default()).expect("run");
        assert_eq!(summary.orders_rejected, 1);
        assert_eq!(summary.orders_completed, 1);
        assert_eq!(summary.final_transform.rotation.yaw, 180.0);
    }

    #[test]
    fn tick_limit_stops_a_long_walk() {
        let scenario = scenario(
            r#"{
                "grid": { "width": 4, "height": 1, "tile_size": 100.0,
                          "heights": [0.0, 0.0, 0.0, 0.0] },
                "agent": { "tile": [0, 0] },
                "orders": [{ "kind": "move_to", "tile": [3, 0] }]
            }"#,
        );
        let config = LoopConfig {
            max_ticks: 5,
            ..LoopConfig::default()
        };
        let error = run_scenario(&scenario, &config).expect_err("tick limit");
        assert!(matches!(error, DemoError::TickLimitReached { max_ticks: 5 }));
    }

    #[test]
    fn empty_order_list_finishes_immediately() {
        let scenario = scenario(
            r#"{
                "grid": { "width": 1, "height": 1, "tile_size": 100.0, "heights": [0.0] },
                "agent": { "tile": [0, 0], "yaw": 45.0 }
            }"#,
        );
        let summary = run_scenario(&scenario, &LoopConfig::default()).expect("run");
        assert_eq!(summary.ticks, 0);
        assert!(summary.events.is_empty());
        assert_eq!(summary.final_transform.rotation.yaw, 45.0);
    }
}
