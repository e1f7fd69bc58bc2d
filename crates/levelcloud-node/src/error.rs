use std::path::PathBuf;

use levelcloud_types::LevelError;
use thiserror::Error;

/// Failure loading the node configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Fatal node error.  Any of these ends the process.
#[derive(Error, Debug)]
pub enum NodeError {
    #[error(transparent)]
    Level(#[from] LevelError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("task failed: {0}")]
    Task(String),
}
