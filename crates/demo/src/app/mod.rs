mod bootstrap;
mod loop_runner;
mod reporting;
mod scenario;

pub(crate) use bootstrap::build_app;
pub(crate) use loop_runner::run;
