//! Region filter.
//!
//! Three axis-aligned pass-through tests run in a fixed order, each on the
//! output of the previous one:
//!
//! | # | axis | limits | mode |
//! |---|---|---|---|
//! | 1 | Z | `[z_min, z_max]` (configured) | keep inside |
//! | 2 | X | `[-131.0, 1.0]` | drop inside |
//! | 3 | Y | `[-1.0, 1.0]` | keep inside |
//!
//! Limits are inclusive.  A point whose tested coordinate is NaN or infinite
//! is dropped by every pass regardless of mode.
//!
//! # Example
//!
//! ```rust
//! use levelcloud_perception::cloud::PointCloud;
//! use levelcloud_perception::region_filter::{RegionBounds, RegionFilter};
//! use levelcloud_perception::transform::Point3;
//!
//! let filter = RegionFilter::new(RegionBounds::default());
//! let cloud = PointCloud::new(Default::default(), vec![
//!     Point3::new(5.0, 0.0, 2.0), // survives
//!     Point3::new(0.5, 0.0, 2.0), // inside the excluded X band
//! ]);
//! assert_eq!(filter.restrict(&cloud).len(), 1);
//! ```

use tracing::debug;

use crate::cloud::PointCloud;
use crate::transform::Point3;

/// Lower edge of the excluded X band.
pub const X_EXCLUDE_MIN: f32 = -131.0;
/// Upper edge of the excluded X band.
pub const X_EXCLUDE_MAX: f32 = 1.0;
/// Lower edge of the kept Y band.
pub const Y_KEEP_MIN: f32 = -1.0;
/// Upper edge of the kept Y band.
pub const Y_KEEP_MAX: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn of(self, p: &Point3) -> f32 {
        match self {
            Axis::X => p.x,
            Axis::Y => p.y,
            Axis::Z => p.z,
        }
    }
}

/// One keep/drop test on a single axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassThrough {
    pub axis: Axis,
    pub min: f32,
    pub max: f32,
    /// When set, points *inside* `[min, max]` are dropped instead of kept.
    pub negative: bool,
}

impl PassThrough {
    pub fn keep(axis: Axis, min: f32, max: f32) -> Self {
        Self {
            axis,
            min,
            max,
            negative: false,
        }
    }

    pub fn drop_inside(axis: Axis, min: f32, max: f32) -> Self {
        Self {
            axis,
            min,
            max,
            negative: true,
        }
    }

    /// Whether `p` survives this pass.
    pub fn accepts(&self, p: &Point3) -> bool {
        let v = self.axis.of(p);
        if !v.is_finite() {
            return false;
        }
        let inside = v >= self.min && v <= self.max;
        inside != self.negative
    }

    /// Remove every rejected point from `cloud`, keeping relative order.
    pub fn apply(&self, cloud: &mut PointCloud) {
        cloud.points.retain(|p| self.accepts(p));
    }
}

/// The configurable part of the region: the Z slab.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionBounds {
    pub z_min: f32,
    pub z_max: f32,
}

impl Default for RegionBounds {
    fn default() -> Self {
        Self {
            z_min: 2.0,
            z_max: 2.0,
        }
    }
}

/// The three passes, built once from [`RegionBounds`] and reused per cloud.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionFilter {
    passes: [PassThrough; 3],
}

impl RegionFilter {
    pub fn new(bounds: RegionBounds) -> Self {
        Self {
            passes: [
                PassThrough::keep(Axis::Z, bounds.z_min, bounds.z_max),
                PassThrough::drop_inside(Axis::X, X_EXCLUDE_MIN, X_EXCLUDE_MAX),
                PassThrough::keep(Axis::Y, Y_KEEP_MIN, Y_KEEP_MAX),
            ],
        }
    }

    /// Filter `cloud` in place.
    pub fn apply(&self, cloud: &mut PointCloud) {
        for pass in &self.passes {
            let before = cloud.len();
            pass.apply(cloud);
            debug!(axis = ?pass.axis, before, after = cloud.len(), "pass-through");
        }
    }

    /// Return a filtered copy of `cloud`.
    pub fn restrict(&self, cloud: &PointCloud) -> PointCloud {
        let mut out = cloud.clone();
        self.apply(&mut out);
        out
    }
}
