//! Node configuration – read once from a TOML file at startup.
//!
//! ```toml
//! z_min = 1.5
//! z_max = 2.5
//! bridge_addr = "0.0.0.0:9090"
//!
//! [topics]
//! points = "/velodyne_points"
//! imu = "/xsens/data"
//! ```
//!
//! Every key is optional and falls back to its default.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use levelcloud_perception::RegionBounds;
use levelcloud_types::TopicNames;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "LEVELCLOUD_CONFIG";
/// Config file used when [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "levelcloud.toml";

/// Startup parameters of the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Descriptor support radius.  Reserved for keypoint extraction.
    #[serde(default = "default_usc_max_radius")]
    pub usc_max_radius: f64,

    /// Descriptor minimal radius.  Reserved for keypoint extraction.
    #[serde(default = "default_usc_min_radius")]
    pub usc_min_radius: f64,

    /// Descriptor point-density radius.  Reserved for keypoint extraction.
    #[serde(default = "default_usc_point_density_radius")]
    pub usc_point_density_radius: f64,

    /// Descriptor local-reference-frame radius.  Reserved for keypoint extraction.
    #[serde(default = "default_usc_local_radius")]
    pub usc_local_radius: f64,

    /// Lower Z keep-bound of the region filter.
    #[serde(default = "default_z_min")]
    pub z_min: f64,

    /// Upper Z keep-bound of the region filter.
    #[serde(default = "default_z_max")]
    pub z_max: f64,

    /// Listen address of the WebSocket bridge.
    #[serde(default = "default_bridge_addr")]
    pub bridge_addr: SocketAddr,

    #[serde(default)]
    pub topics: TopicNames,
}

fn default_usc_max_radius() -> f64 {
    1.0
}
fn default_usc_min_radius() -> f64 {
    0.05
}
fn default_usc_point_density_radius() -> f64 {
    0.5
}
fn default_usc_local_radius() -> f64 {
    0.5
}
fn default_z_min() -> f64 {
    2.0
}
fn default_z_max() -> f64 {
    2.0
}
fn default_bridge_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9090))
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            usc_max_radius: default_usc_max_radius(),
            usc_min_radius: default_usc_min_radius(),
            usc_point_density_radius: default_usc_point_density_radius(),
            usc_local_radius: default_usc_local_radius(),
            z_min: default_z_min(),
            z_max: default_z_max(),
            bridge_addr: default_bridge_addr(),
            topics: TopicNames::default(),
        }
    }
}

impl NodeConfig {
    /// Z slab for the region filter.
    pub fn region_bounds(&self) -> RegionBounds {
        RegionBounds {
            z_min: self.z_min as f32,
            z_max: self.z_max as f32,
        }
    }
}

/// Resolve the config path: `$LEVELCLOUD_CONFIG`, else `./levelcloud.toml`.
pub fn config_path() -> PathBuf {
    config_path_for(std::env::var(CONFIG_ENV).ok().as_deref())
}

pub(crate) fn config_path_for(env_value: Option<&str>) -> PathBuf {
    match env_value {
        Some(p) if !p.is_empty() => PathBuf::from(p),
        _ => PathBuf::from(DEFAULT_CONFIG_FILE),
    }
}

/// Load the config from [`config_path`] and apply environment overrides.
///
/// A missing file yields the defaults.
pub fn load() -> Result<NodeConfig, ConfigError> {
    let mut cfg = load_from(&config_path())?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load the config from a specific path.  Returns `None` if the file does not exist.
pub fn load_from(path: &Path) -> Result<Option<NodeConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(cfg))
}

/// Apply `LEVELCLOUD_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `LEVELCLOUD_Z_MIN` | `z_min` |
/// | `LEVELCLOUD_Z_MAX` | `z_max` |
/// | `LEVELCLOUD_BRIDGE_ADDR` | `bridge_addr` |
///
/// Values that fail to parse are ignored.
pub fn apply_env_overrides(cfg: &mut NodeConfig) {
    if let Ok(v) = std::env::var("LEVELCLOUD_Z_MIN")
        && let Ok(z) = v.parse::<f64>() {
            cfg.z_min = z;
        }
    if let Ok(v) = std::env::var("LEVELCLOUD_Z_MAX")
        && let Ok(z) = v.parse::<f64>() {
            cfg.z_max = z;
        }
    if let Ok(v) = std::env::var("LEVELCLOUD_BRIDGE_ADDR")
        && let Ok(addr) = v.parse::<SocketAddr>() {
            cfg.bridge_addr = addr;
        }
}
