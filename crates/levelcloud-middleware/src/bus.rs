//! Typed, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the others.
//!
//! # Topics
//!
//! | Topic | Traffic |
//! |---|---|
//! | [`Topic::Imu`] | Raw inertial measurements |
//! | [`Topic::Points`] | Raw LiDAR clouds |
//! | [`Topic::FilteredPoints`] | Leveled, region-filtered clouds |
//! | [`Topic::Keypoints`] | Advertised for keypoint consumers; nothing publishes here |

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use levelcloud_types::{Event, LevelError};
use tokio::sync::broadcast;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Routing lanes on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Imu,
    Points,
    FilteredPoints,
    Keypoints,
}

/// Shared event bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    imu: broadcast::Sender<Event>,
    points: broadcast::Sender<Event>,
    filtered_points: broadcast::Sender<Event>,
    keypoints: broadcast::Sender<Event>,
    next_seq: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// The `capacity` is applied to every topic channel independently.
    pub fn new(capacity: usize) -> Self {
        let (imu, _) = broadcast::channel(capacity);
        let (points, _) = broadcast::channel(capacity);
        let (filtered_points, _) = broadcast::channel(capacity);
        let (keypoints, _) = broadcast::channel(capacity);
        Self {
            imu,
            points,
            filtered_points,
            keypoints,
            next_seq: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Publish `event` to the given [`Topic`] channel.
    ///
    /// Stamps [`Event::seq`] so subscribers of several topics can restore
    /// publish order.  Returns the number of active receivers that were handed
    /// the event, or [`LevelError::Channel`] when nobody is listening on the
    /// topic.
    pub fn publish_to(&self, topic: Topic, mut event: Event) -> Result<usize, LevelError> {
        event.seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.topic_sender(topic)
            .send(event)
            .map_err(|_| LevelError::Channel(format!("no subscribers for topic {topic:?}")))
    }

    /// Subscribe to a specific [`Topic`] channel.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Imu => &self.imu,
            Topic::Points => &self.points,
            Topic::FilteredPoints => &self.filtered_points,
            Topic::Keypoints => &self.keypoints,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// An async receiver bound to a single [`Topic`] channel.
///
/// Obtained via [`EventBus::subscribe_to`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// Returns:
    /// * `Ok(event)` – a successfully received event.
    /// * `Err(broadcast::error::RecvError::Lagged(n))` – the subscriber fell
    ///   behind and `n` messages were dropped.  The caller decides whether to
    ///   continue or abort.
    /// * `Err(broadcast::error::RecvError::Closed)` – the bus has shut down.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Non-blocking variant of [`recv`][Self::recv].
    pub fn try_recv(&mut self) -> Result<Event, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }

    /// The [`Topic`] this receiver is bound to.
    pub fn topic(&self) -> Topic {
        self.topic
    }
}
