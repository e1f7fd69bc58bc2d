//! `levelcloud-perception` – geometry of the leveling pipeline.
//!
//! Turns a raw LiDAR cloud plus an IMU attitude into a gravity-aligned,
//! region-restricted cloud.
//!
//! # Modules
//!
//! - [`transform`] – [`Quaternion`][transform::Quaternion] roll/pitch/yaw
//!   decomposition and the [`Rotation3`][transform::Rotation3] matrix.
//! - [`orientation`] – [`OrientationTracker`][orientation::OrientationTracker]:
//!   keeps the latest roll/pitch pair and hands out
//!   [`Attitude`][orientation::Attitude] snapshots.
//! - [`cloud`] – [`PointCloud`][cloud::PointCloud] and its conversion to and
//!   from the `PointCloud2` wire format.
//! - [`leveler`] – rotates a cloud by `Ry(pitch) · Rx(roll)`.
//! - [`region_filter`] – [`RegionFilter`][region_filter::RegionFilter]: the
//!   three fixed-order pass-through tests.

pub mod cloud;
pub mod leveler;
pub mod orientation;
pub mod region_filter;
pub mod transform;

pub use cloud::PointCloud;
pub use orientation::{Attitude, OrientationTracker};
pub use region_filter::{RegionBounds, RegionFilter};
pub use transform::Point3;
