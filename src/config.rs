use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::browser::{
    RenderOptions, DEFAULT_COMMAND_TIMEOUT, DEFAULT_LOAD_TIMEOUT, DEFAULT_SETTLE_DELAY,
};
use crate::cache::{DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL};
use crate::error::{PrerenderError, Result};

pub const DEFAULT_CHROME_ENDPOINT: &str = "localhost:9222";
pub const DEFAULT_LISTEN_ADDR: &str = "localhost:9444";

/// Service configuration, optionally read from a TOML file.
///
/// ```toml
/// chrome = "localhost:9222"
/// listen = "0.0.0.0:9444"
///
/// [cache]
/// ttl = "5m"
///
/// [render]
/// load_timeout = "20s"
/// settle_delay = "250ms"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Chrome DevTools endpoint.
    pub chrome: String,
    /// Address the HTTP gateway binds to.
    pub listen: String,
    pub cache: CacheConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    #[serde(with = "humantime_serde")]
    pub load_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub command_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chrome: DEFAULT_CHROME_ENDPOINT.to_string(),
            listen: DEFAULT_LISTEN_ADDR.to_string(),
            cache: CacheConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

impl Config {
    /// Reads `path` when given, otherwise returns the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let raw = fs::read_to_string(path)?;
                Self::from_toml_str(&raw)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| PrerenderError::config(e.to_string()))
    }

    /// Addresses are passed through untouched; only durations are checked.
    pub fn validate(&self) -> Result<()> {
        let non_zero = [
            ("cache.ttl", self.cache.ttl),
            ("cache.sweep_interval", self.cache.sweep_interval),
            ("render.load_timeout", self.render.load_timeout),
            ("render.command_timeout", self.render.command_timeout),
        ];
        for (name, value) in non_zero {
            if value.is_zero() {
                return Err(PrerenderError::config(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            load_timeout: self.render.load_timeout,
            settle_delay: self.render.settle_delay,
            command_timeout: self.render.command_timeout,
        }
    }
}
