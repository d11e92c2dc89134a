use std::path::PathBuf;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::loop_runner::LoopConfig;

const TARGET_TPS_ENV_VAR: &str = "NAVGRID_TARGET_TPS";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scenario_path: Option<PathBuf>,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== navgrid demo startup ===");

    let scenario_path = std::env::args_os().nth(1).map(PathBuf::from);
    match &scenario_path {
        Some(path) => info!(path = %path.display(), "scenario_selected"),
        None => info!("scenario_builtin"),
    }

    let mut config = LoopConfig::default();
    if let Some(target_tps) = parse_target_tps_from_env() {
        config.target_tps = target_tps;
    }

    AppWiring {
        config,
        scenario_path,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn parse_target_tps_from_env() -> Option<u32> {
    let raw = std::env::var(TARGET_TPS_ENV_VAR).ok()?;
    parse_target_tps(&raw).or_else(|| {
        warn!(value = %raw, var = TARGET_TPS_ENV_VAR, "target_tps_ignored");
        None
    })
}

fn parse_target_tps(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|tps| *tps > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_tps_must_be_a_positive_integer() {
        assert_eq!(parse_target_tps(" 30 "), Some(30));
        assert_eq!(parse_target_tps("0"), None);
        assert_eq!(parse_target_tps("fast"), None);
    }
}
