//! Orientation tracker.
//!
//! Reduces each incoming IMU orientation to the two angles the leveler needs.
//! Yaw is discarded and a fixed half-turn is subtracted from roll.
//!
//! The tracker is plain owned state: the node reads an [`Attitude`] snapshot
//! from it and hands that copy to the cloud path, so nothing is shared
//! between the IMU and cloud paths.
//!
//! # Example
//!
//! ```rust
//! use levelcloud_perception::orientation::OrientationTracker;
//! use levelcloud_types::QuaternionMsg;
//!
//! let mut tracker = OrientationTracker::new();
//! // Half-turn about X: raw roll = π, stored roll = 0.
//! tracker.update(&QuaternionMsg { x: 1.0, y: 0.0, z: 0.0, w: 0.0 });
//! assert!(tracker.attitude().roll.abs() < 1e-9);
//! ```

use std::f64::consts::PI;

use levelcloud_types::QuaternionMsg;
use tracing::trace;

use crate::transform::Quaternion;

/// Offset subtracted from the raw IMU roll before it is stored.
pub const ROLL_OFFSET_RAD: f64 = PI;

/// Roll and pitch used to level one cloud (radians).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Attitude {
    pub roll: f64,
    pub pitch: f64,
}

/// Holds the most recent roll/pitch pair.  Last writer wins.
#[derive(Debug, Default)]
pub struct OrientationTracker {
    attitude: Attitude,
}

impl OrientationTracker {
    /// Create a tracker reporting zero roll and pitch until the first update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored angles with those of `orientation`.
    ///
    /// The quaternion is not checked for unit length; malformed input
    /// produces meaningless (possibly NaN) angles.
    pub fn update(&mut self, orientation: &QuaternionMsg) {
        let rpy = Quaternion::from(*orientation).to_rpy();
        self.attitude = Attitude {
            roll: rpy.roll - ROLL_OFFSET_RAD,
            pitch: rpy.pitch,
        };
        trace!(
            roll_deg = self.attitude.roll.to_degrees(),
            pitch_deg = self.attitude.pitch.to_degrees(),
            "orientation updated"
        );
    }

    /// Copy of the current angles.
    pub fn attitude(&self) -> Attitude {
        self.attitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(q: Quaternion) -> QuaternionMsg {
        QuaternionMsg {
            x: q.x,
            y: q.y,
            z: q.z,
            w: q.w,
        }
    }

    #[test]
    fn initial_attitude_is_level() {
        let tracker = OrientationTracker::new();
        assert_eq!(tracker.attitude(), Attitude::default());
    }

    #[test]
    fn raw_roll_of_pi_is_stored_as_zero() {
        let mut tracker = OrientationTracker::new();
        tracker.update(&QuaternionMsg {
            x: 1.0,
            y: 0.0,
            z: 0.0,
            w: 0.0,
        });
        let a = tracker.attitude();
        assert!(a.roll.abs() < 1e-9, "roll={}", a.roll);
        assert!(a.pitch.abs() < 1e-9);
    }

    #[test]
    fn identity_orientation_stores_minus_pi_roll() {
        let mut tracker = OrientationTracker::new();
        tracker.update(&QuaternionMsg::default());
        assert!((tracker.attitude().roll + PI).abs() < 1e-9);
    }

    #[test]
    fn yaw_is_discarded() {
        let mut a = OrientationTracker::new();
        let mut b = OrientationTracker::new();
        a.update(&msg(Quaternion::from_rpy(0.2, 0.1, 0.0)));
        b.update(&msg(Quaternion::from_rpy(0.2, 0.1, 2.5)));
        assert!((a.attitude().roll - b.attitude().roll).abs() < 1e-9);
        assert!((a.attitude().pitch - b.attitude().pitch).abs() < 1e-9);
    }

    #[test]
    fn pitch_is_stored_without_offset() {
        let mut tracker = OrientationTracker::new();
        tracker.update(&msg(Quaternion::from_rpy(0.0, 0.25, 0.0)));
        assert!((tracker.attitude().pitch - 0.25).abs() < 1e-9);
    }

    #[test]
    fn update_replaces_previous_angles() {
        let mut tracker = OrientationTracker::new();
        tracker.update(&msg(Quaternion::from_rpy(0.0, 0.3, 0.0)));
        tracker.update(&msg(Quaternion::from_rpy(0.0, -0.1, 0.0)));
        assert!((tracker.attitude().pitch + 0.1).abs() < 1e-9);
    }

    #[test]
    fn zero_quaternion_propagates_nan() {
        let mut tracker = OrientationTracker::new();
        tracker.update(&QuaternionMsg {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 0.0,
        });
        assert!(tracker.attitude().roll.is_nan());
    }
}
