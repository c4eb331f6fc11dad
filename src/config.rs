//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. Built-in defaults
//! 2. Config file: `wikigraph.toml`, or the path given with `--config`
//! 3. Environment variables: `WIKIGRAPH_*`, with `__` separating sections
//!    (`WIKIGRAPH_SERVER__BIND=0.0.0.0:8080`)
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:3000"
//! frame_rate = 60
//! graph_url = "http://localhost:8000/api/graph"
//!
//! [layout]
//! backend = "forces"
//!
//! [layout.full]
//! link_distance = 180.0
//! ```

use std::ops::Deref;
use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::layout::{LayoutParams, PhysicsBackend};
use crate::models::ViewProfile;

pub const DEFAULT_CONFIG_FILE: &str = "wikigraph.toml";
pub const ENV_PREFIX: &str = "WIKIGRAPH_";

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub layout: LayoutConfig,
}

/// HTTP host settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,
    /// Frames per second pushed to graph sessions while a layout is moving.
    pub frame_rate: u32,
    /// Where `reload` fetches relation rows from. Reload is refused when unset.
    #[serde(default)]
    pub graph_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            frame_rate: 60,
            graph_url: None,
        }
    }
}

impl ServerConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.frame_rate.max(1)))
    }
}

/// Physics settings, per view profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub backend: PhysicsBackend,
    pub summary: LayoutParams,
    pub full: LayoutParams,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            backend: PhysicsBackend::default(),
            summary: LayoutParams::summary(),
            full: LayoutParams::full(),
        }
    }
}

impl LayoutConfig {
    pub fn params(&self, profile: ViewProfile) -> &LayoutParams {
        match profile {
            ViewProfile::Summary => &self.summary,
            ViewProfile::Full => &self.full,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    /// Load config with layered resolution (defaults → file → env).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::figment(path).extract().map_err(ConfigError::from)
    }

    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}
