use env_logger::Builder;
use log::LevelFilter;

use crate::config::Log;

/// Initialize the process logger from the configured level. Per-module
/// directives from `RUST_LOG` are still honored.
pub fn init_logging(config: &Log) {
    let level: LevelFilter = config.level.parse().unwrap_or(LevelFilter::Info);
    Builder::from_env(env_logger::Env::default())
        .filter(None, level)
        .init();
}
