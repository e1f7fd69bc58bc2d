//! JSON/WebSocket transport bridge.
//!
//! [`Bridge`]:
//!
//! 1. **Ingests** IMU and point-cloud messages and publishes them onto the
//!    [`EventBus`] as [`Topic::Imu`] / [`Topic::Points`] events.
//!
//! 2. **Serves** a WebSocket endpoint speaking the rosbridge envelope
//!    `{"op": "publish", "topic": "<name>", "msg": {...}}`.  Inbound
//!    `publish` frames on the configured IMU or cloud topic are ingested;
//!    every [`Topic::FilteredPoints`] event is pushed to every client as a
//!    `publish` frame on the configured output topic.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use levelcloud_types::{Event, EventPayload, ImuMessage, LevelError, PointCloud2, TopicNames};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::bus::{EventBus, Topic};

/// Bridge between external clients and the internal [`EventBus`].
#[derive(Clone)]
pub struct Bridge {
    bus: Arc<EventBus>,
    topics: Arc<TopicNames>,
}

impl Bridge {
    /// Create a new bridge backed by `bus`, mapping external names via `topics`.
    pub fn new(bus: Arc<EventBus>, topics: TopicNames) -> Self {
        Self {
            bus,
            topics: Arc::new(topics),
        }
    }

    // -----------------------------------------------------------------------
    // Ingest helpers
    // -----------------------------------------------------------------------

    /// Publish an IMU message on [`Topic::Imu`].
    pub fn ingest_imu(&self, msg: ImuMessage) -> Result<usize, LevelError> {
        let event = Event::new("levelcloud-middleware::bridge/imu", EventPayload::Imu(msg));
        self.bus.publish_to(Topic::Imu, event)
    }

    /// Publish a raw cloud on [`Topic::Points`].
    pub fn ingest_cloud(&self, msg: PointCloud2) -> Result<usize, LevelError> {
        let event = Event::new(
            "levelcloud-middleware::bridge/points",
            EventPayload::PointCloud(msg),
        );
        self.bus.publish_to(Topic::Points, event)
    }

    // -----------------------------------------------------------------------
    // WebSocket server
    // -----------------------------------------------------------------------

    /// Bind `addr` and serve WebSocket clients until a fatal error.
    ///
    /// # Errors
    ///
    /// Returns [`LevelError::Io`] if the TCP listener cannot be bound.
    pub async fn run_ws_server(self, addr: SocketAddr) -> Result<(), LevelError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| LevelError::Io(format!("ws bind error on {addr}: {e}")))?;
        info!(%addr, "bridge listening");
        self.serve(listener).await
    }

    /// Accept clients from an already-bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), LevelError> {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let bridge = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = bridge.handle_ws_client(stream, peer).await {
                            error!(peer = %peer, error = %e, "ws client error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "ws accept error");
                }
            }
        }
    }

    async fn handle_ws_client(&self, stream: TcpStream, peer: SocketAddr) -> Result<(), LevelError> {
        let ws_stream = accept_async(stream)
            .await
            .map_err(|e| LevelError::Io(format!("ws handshake from {peer}: {e}")))?;
        debug!(peer = %peer, "ws client connected");

        let (mut ws_tx, mut ws_rx) = ws_stream.split();
        let mut rx = self.bus.subscribe_to(Topic::FilteredPoints);

        loop {
            tokio::select! {
                // Forward filtered clouds to the client.
                result = rx.recv() => {
                    match result {
                        Ok(Event { payload: EventPayload::PointCloud(cloud), .. }) => {
                            let frame = self.publish_frame(&cloud)?;
                            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!(peer = %peer, lagged_by = n, "ws client lagged");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
                // Handle incoming WebSocket frames.
                msg = ws_rx.next() => {
                    match msg {
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(_)) => break,
                        Some(Ok(Message::Text(text))) => {
                            if let Err(e) = self.handle_incoming_ws_message(text.as_str()) {
                                warn!(peer = %peer, error = %e, "dropping inbound frame");
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        debug!(peer = %peer, "ws client disconnected");
        Ok(())
    }

    /// Serialise a filtered cloud as a `publish` frame on the output topic.
    fn publish_frame(&self, cloud: &PointCloud2) -> Result<String, LevelError> {
        let msg = serde_json::to_value(cloud).map_err(|e| LevelError::Serialization(e.to_string()))?;
        let frame = json!({
            "op": "publish",
            "topic": self.topics.filtered,
            "msg": msg,
        });
        Ok(frame.to_string())
    }

    /// Parse one inbound text frame.
    ///
    /// `publish` frames on the IMU or cloud topic are decoded and ingested.
    /// Other ops and unknown topics are ignored.
    fn handle_incoming_ws_message(&self, text: &str) -> Result<(), LevelError> {
        let json: serde_json::Value =
            serde_json::from_str(text).map_err(|e| LevelError::Serialization(e.to_string()))?;

        let op = json.get("op").and_then(|o| o.as_str()).unwrap_or("");
        let topic = json.get("topic").and_then(|t| t.as_str()).unwrap_or("");
        if op != "publish" {
            debug!(op, topic, "ignoring non-publish frame");
            return Ok(());
        }
        let msg = json.get("msg").cloned().unwrap_or(serde_json::Value::Null);

        if topic == self.topics.imu {
            let imu: ImuMessage =
                serde_json::from_value(msg).map_err(|e| LevelError::Serialization(e.to_string()))?;
            self.ingest_imu(imu)?;
        } else if topic == self.topics.points {
            let cloud: PointCloud2 =
                serde_json::from_value(msg).map_err(|e| LevelError::Serialization(e.to_string()))?;
            self.ingest_cloud(cloud)?;
        } else {
            debug!(topic, "ignoring publish on unknown topic");
        }
        Ok(())
    }
}
