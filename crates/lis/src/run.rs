use anyhow::Result;
use logger::Logger;
use planetconfig::LisConfig;
use renderer::Renderer;

use crate::paths;
use crate::settings::renderer_config;

/// Applies the logging section to `logger` and routes `tracing` events through it.
pub fn initialise_logging(logger: &Logger, config: &LisConfig) {
    let logging = &config.logging;
    logger.enable_console(logging.console);
    if let Some(dir) = &logging.dir {
        logger.set_log_dir(dir);
    }
    logger.enable_file(logging.overwrite, logging.file);

    if let Err(err) = logger::init_tracing(logger) {
        logger.error(format!("failed to install tracing subscriber: {err}"));
    }
}

pub fn run(config: LisConfig, logger: Logger) -> Result<()> {
    initialise_logging(&logger, &config);
    if let Some(path) = logger.file_path() {
        tracing::debug!(path = %path.display(), "writing log file");
    }

    let exe_dir = paths::executable_dir();
    let renderer_config = renderer_config(&config, exe_dir.as_deref());
    tracing::info!(
        "planet: {}x{} lines, radius {}",
        renderer_config.planet.lat_lines,
        renderer_config.planet.long_lines,
        renderer_config.planet.radius
    );
    tracing::info!("shaders: {}", renderer_config.shader_dir.display());

    Renderer::new(renderer_config).run(logger)
}
