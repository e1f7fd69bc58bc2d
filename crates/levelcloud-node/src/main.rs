//! `levelcloud` – process entry point.
//!
//! 1. Initialises tracing.
//! 2. Loads `levelcloud.toml` (or `$LEVELCLOUD_CONFIG`) and logs the parameters.
//! 3. Starts the node and the WebSocket bridge on a shared event bus.
//! 4. Runs until Ctrl-C or the first fatal error; exits non-zero on error.

use std::process::ExitCode;
use std::sync::Arc;

use levelcloud_middleware::{Bridge, EventBus};
use levelcloud_node::{config, init_tracing, FeatureNode, NodeConfig, NodeError};
use tokio::sync::Notify;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let _guard = init_tracing("levelcloud");

    let cfg = match config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "configuration error");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cfg)) {
        Ok(()) => {
            info!("levelcloud stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "levelcloud terminated");
            ExitCode::FAILURE
        }
    }
}

async fn run(cfg: NodeConfig) -> Result<(), NodeError> {
    let bus = Arc::new(EventBus::default());
    let shutdown = Arc::new(Notify::new());

    let on_ctrlc = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || on_ctrlc.notify_one()) {
        warn!(error = %e, "failed to install Ctrl-C handler");
    }

    let bridge = Bridge::new(bus.clone(), cfg.topics.clone());
    let bridge_addr = cfg.bridge_addr;

    let node = FeatureNode::from_config(cfg);
    node.print_parameters();
    let node_task = node.spawn(bus, shutdown);
    let bridge_task = tokio::spawn(bridge.run_ws_server(bridge_addr));

    tokio::select! {
        joined = node_task => joined.map_err(|e| NodeError::Task(e.to_string()))?,
        served = bridge_task => {
            served.map_err(|e| NodeError::Task(e.to_string()))??;
            Err(NodeError::Task("bridge stopped".into()))
        }
    }
}
