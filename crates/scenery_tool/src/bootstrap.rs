use std::path::Path;

use scenery::SceneryConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Loads the settings and installs the subscriber. Settings come first so
/// `debugLogging` can pick the default filter.
pub(crate) fn bootstrap(settings: Option<&Path>) -> Result<SceneryConfig, String> {
    let config = SceneryConfig::load(settings).map_err(|error| error.to_string())?;
    init_tracing(config.debug_logging);
    info!(
        settings = %settings.map(|path| path.display().to_string()).unwrap_or_default(),
        debug = config.debug_logging,
        "=== scenery tool startup ==="
    );
    Ok(config)
}

fn init_tracing(debug_logging: bool) {
    let default_level = if debug_logging { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
