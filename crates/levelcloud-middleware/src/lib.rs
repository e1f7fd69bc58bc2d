//! `levelcloud-middleware` – message plumbing.
//!
//! Routes IMU and point-cloud traffic between the outside world and the
//! node without caring about the data's meaning.
//!
//! # Modules
//!
//! - [`bus`] – typed, topic-based publish/subscribe event bus built on Tokio
//!   broadcast channels.
//! - [`bridge`] – rosbridge-style JSON/WebSocket endpoint that feeds raw
//!   messages onto the bus and streams filtered clouds back out.

pub mod bridge;
pub mod bus;

pub use bridge::Bridge;
pub use bus::{EventBus, Topic, TopicReceiver};
