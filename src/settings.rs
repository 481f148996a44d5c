use std::path::Path;

use prerender_lib::{Config, PrerenderError};

use crate::cli::Cli;

/// Load config from a TOML file or return defaults, then validate it.
pub fn load_config(path: Option<&Path>) -> Result<Config, PrerenderError> {
    let cfg = Config::load(path).map_err(|e| {
        let loc = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "defaults".to_string());
        PrerenderError::config(format!("Failed to read config {}: {}", loc, detail(e)))
    })?;

    cfg.validate().map_err(|e| {
        let message = match path {
            Some(p) => format!("Invalid config ({}): {}", p.display(), detail(e)),
            None => format!("Invalid config: {}", detail(e)),
        };
        PrerenderError::config(message)
    })?;
    Ok(cfg)
}

/// Inner message of a config error, so rewrapping does not repeat the prefix.
fn detail(err: PrerenderError) -> String {
    match err {
        PrerenderError::Config(msg) => msg,
        other => other.to_string(),
    }
}

/// Apply CLI overrides on top of the loaded config.
pub fn resolve_settings(cli: &Cli, mut config: Config) -> Config {
    if let Some(chrome) = &cli.chrome {
        config.chrome = chrome.clone();
    }
    if let Some(listen) = &cli.listen {
        config.listen = listen.clone();
    }
    config
}

/// Format effective config as a single-line string.
pub fn format_effective_config(config: &Config, config_source: Option<&Path>) -> String {
    let source = config_source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    format!(
        "Effective config [{source}]: chrome={}, listen={}, cache: ttl={:?}, sweep={:?}, render: load-timeout={:?}, settle={:?}, command-timeout={:?}",
        config.chrome,
        config.listen,
        config.cache.ttl,
        config.cache.sweep_interval,
        config.render.load_timeout,
        config.render.settle_delay,
        config.render.command_timeout,
    )
}
