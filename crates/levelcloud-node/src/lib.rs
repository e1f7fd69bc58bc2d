//! `levelcloud-node` – the feature extraction node.
//!
//! Subscribes to an IMU stream and a LiDAR stream, levels each cloud with
//! the latest IMU attitude, restricts it to a fixed region, and republishes
//! it under the input's frame id.
//!
//! # Modules
//!
//! - [`node`] – [`FeatureNode`][node::FeatureNode]: the message-driven
//!   pipeline and its [`process_cloud`][node::process_cloud] core.
//! - [`config`] – [`NodeConfig`][config::NodeConfig]: TOML startup
//!   parameters with environment overrides.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: console/JSON
//!   logging with optional OTLP span export.
//! - [`error`] – [`NodeError`][error::NodeError] and
//!   [`ConfigError`][error::ConfigError].

pub mod config;
pub mod error;
pub mod node;
pub mod telemetry;

pub use config::NodeConfig;
pub use error::{ConfigError, NodeError};
pub use node::{process_cloud, FeatureNode, NodeState};
pub use telemetry::{init_tracing, TracerProviderGuard};
