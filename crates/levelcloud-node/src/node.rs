//! The feature extraction node.
//!
//! Wires the perception stages into a message-driven pipeline:
//!
//! ```text
//! Topic::Imu    ──► OrientationTracker::update
//! Topic::Points ──► from_msg ─► level(attitude) ─► RegionFilter ─► frame id ─► Topic::FilteredPoints
//! ```
//!
//! Both inputs are consumed by one task in publish order (see `Event::seq`),
//! so a cloud is leveled with the last IMU update published before it.  The
//! tracker is read once per cloud and the [`Attitude`] copy is passed into
//! [`process_cloud`].

use std::sync::Arc;

use levelcloud_middleware::{EventBus, Topic, TopicReceiver};
use levelcloud_perception::leveler::level_in_place;
use levelcloud_perception::{Attitude, OrientationTracker, PointCloud, RegionFilter};
use levelcloud_types::{Event, EventPayload, ImuMessage, LevelError, PointCloud2};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::NodeConfig;
use crate::error::NodeError;

const SOURCE: &str = "levelcloud-node::feature_extraction";

/// Processing state.  `Processing` only lasts for one cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Idle,
    Processing,
}

/// Level, restrict, and re-stamp one cloud.
///
/// The output carries the input message's frame id even though its points
/// have been rotated.
pub fn process_cloud(
    msg: &PointCloud2,
    attitude: Attitude,
    filter: &RegionFilter,
) -> Result<PointCloud2, LevelError> {
    let mut cloud = PointCloud::from_msg(msg)?;
    level_in_place(&mut cloud, attitude);
    filter.apply(&mut cloud);
    cloud.header.frame_id = msg.header.frame_id.clone();
    cloud.to_msg()
}

pub struct FeatureNode {
    config: NodeConfig,
    tracker: OrientationTracker,
    filter: RegionFilter,
    state: NodeState,
}

impl FeatureNode {
    pub fn from_config(config: NodeConfig) -> Self {
        if config.z_min > config.z_max {
            warn!(
                z_min = config.z_min,
                z_max = config.z_max,
                "z_min exceeds z_max; every cloud will be filtered to nothing"
            );
        }
        let filter = RegionFilter::new(config.region_bounds());
        Self {
            config,
            tracker: OrientationTracker::new(),
            filter,
            state: NodeState::Idle,
        }
    }

    /// Log the startup parameter dump.
    pub fn print_parameters(&self) {
        let c = &self.config;
        info!(
            usc_max_radius = c.usc_max_radius,
            usc_min_radius = c.usc_min_radius,
            usc_point_density_radius = c.usc_point_density_radius,
            usc_local_radius = c.usc_local_radius,
            "feature extraction parameters"
        );
        info!(z_min = c.z_min, z_max = c.z_max, "cloud filter parameters");
        info!(
            points = %c.topics.points,
            imu = %c.topics.imu,
            filtered = %c.topics.filtered,
            keypoints = %c.topics.keypoints,
            "topics"
        );
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Current roll/pitch snapshot.
    pub fn attitude(&self) -> Attitude {
        self.tracker.attitude()
    }

    /// Handle one IMU message.  Never publishes.
    pub fn handle_imu(&mut self, msg: &ImuMessage) {
        self.tracker.update(&msg.orientation);
    }

    /// Handle one raw cloud and return the cloud to publish.
    pub fn handle_cloud(&mut self, msg: &PointCloud2) -> Result<PointCloud2, LevelError> {
        self.state = NodeState::Processing;
        let result = process_cloud(msg, self.tracker.attitude(), &self.filter);
        self.state = NodeState::Idle;
        result
    }

    /// Subscribe to the input topics and drive the node on a new task.
    ///
    /// Subscriptions are made before this returns, so messages published
    /// afterwards are never missed.  The task ends with `Ok(())` when
    /// `shutdown` is notified (checked whenever both inputs are drained) or an
    /// input topic closes, and with `Err` on the first cloud that cannot be
    /// decoded.
    pub fn spawn(self, bus: Arc<EventBus>, shutdown: Arc<Notify>) -> JoinHandle<Result<(), NodeError>> {
        let imu_rx = bus.subscribe_to(Topic::Imu);
        let points_rx = bus.subscribe_to(Topic::Points);
        tokio::spawn(self.run(bus, imu_rx, points_rx, shutdown))
    }

    async fn run(
        mut self,
        bus: Arc<EventBus>,
        mut imu_rx: TopicReceiver,
        mut points_rx: TopicReceiver,
        shutdown: Arc<Notify>,
    ) -> Result<(), NodeError> {
        info!("feature extraction node running");
        let mut next_imu: Option<Event> = None;
        let mut next_cloud: Option<Event> = None;
        loop {
            if next_imu.is_none() && next_cloud.is_none() {
                tokio::select! {
                    biased;

                    _ = shutdown.notified() => {
                        info!("shutdown requested");
                        return Ok(());
                    }
                    result = imu_rx.recv() => {
                        if !stash(&mut next_imu, lane_from_recv(result, Topic::Imu)) {
                            return Ok(());
                        }
                    }
                    result = points_rx.recv() => {
                        if !stash(&mut next_cloud, lane_from_recv(result, Topic::Points)) {
                            return Ok(());
                        }
                    }
                }
            }

            // Peek at the other lane so the earlier of two pending events runs first.
            if next_imu.is_none() && !stash(&mut next_imu, poll_lane(&mut imu_rx)) {
                return Ok(());
            }
            if next_cloud.is_none() && !stash(&mut next_cloud, poll_lane(&mut points_rx)) {
                return Ok(());
            }

            let imu_first = match (&next_imu, &next_cloud) {
                (Some(imu), Some(cloud)) => imu.seq < cloud.seq,
                (imu, _) => imu.is_some(),
            };
            if imu_first {
                if let Some(event) = next_imu.take() {
                    self.on_imu_event(event);
                }
            } else if let Some(event) = next_cloud.take() {
                self.on_cloud_event(&bus, event)?;
            }
        }
    }

    fn on_imu_event(&mut self, event: Event) {
        match event.payload {
            EventPayload::Imu(msg) => self.handle_imu(&msg),
            _ => debug!(source = %event.source, "non-IMU payload on IMU topic"),
        }
    }

    fn on_cloud_event(&mut self, bus: &EventBus, event: Event) -> Result<(), NodeError> {
        let EventPayload::PointCloud(msg) = event.payload else {
            debug!(source = %event.source, "non-cloud payload on points topic");
            return Ok(());
        };
        let filtered = self.handle_cloud(&msg)?;
        debug!(
            frame_id = %filtered.header.frame_id,
            points_in = msg.point_count(),
            points_out = filtered.point_count(),
            "cloud filtered"
        );
        let event = Event::new(SOURCE, EventPayload::PointCloud(filtered));
        if let Err(e) = bus.publish_to(Topic::FilteredPoints, event) {
            debug!(error = %e, "filtered cloud dropped");
        }
        Ok(())
    }
}

/// Result of reading one input lane.
enum Lane {
    Ready(Event),
    Empty,
    Closed,
}

fn lane_from_recv(result: Result<Event, RecvError>, topic: Topic) -> Lane {
    match result {
        Ok(event) => Lane::Ready(event),
        Err(RecvError::Lagged(n)) => {
            warn!(?topic, lagged_by = n, "subscriber lagged");
            Lane::Empty
        }
        Err(RecvError::Closed) => Lane::Closed,
    }
}

/// Take the next queued event on `rx` without waiting.
fn poll_lane(rx: &mut TopicReceiver) -> Lane {
    loop {
        match rx.try_recv() {
            Ok(event) => return Lane::Ready(event),
            Err(TryRecvError::Empty) => return Lane::Empty,
            Err(TryRecvError::Lagged(n)) => warn!(topic = ?rx.topic(), lagged_by = n, "subscriber lagged"),
            Err(TryRecvError::Closed) => return Lane::Closed,
        }
    }
}

/// Store a ready event in `slot`.  Returns `false` once the lane has closed.
fn stash(slot: &mut Option<Event>, lane: Lane) -> bool {
    match lane {
        Lane::Ready(event) => {
            *slot = Some(event);
            true
        }
        Lane::Empty => true,
        Lane::Closed => false,
    }
}
