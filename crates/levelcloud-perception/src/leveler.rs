//! Cloud leveler.
//!
//! Rotates a cloud by `Ry(pitch) · Rx(roll)` with zero translation so that
//! the cloud is expressed in a gravity-aligned frame.  Roll is applied to
//! each point first, then pitch.  The header, and with it the frame id, is
//! left untouched.

use crate::cloud::PointCloud;
use crate::orientation::Attitude;
use crate::transform::Rotation3;

/// The leveling rotation for `attitude`.
pub fn leveling_rotation(attitude: Attitude) -> Rotation3 {
    Rotation3::about_y(attitude.pitch as f32).mul(&Rotation3::about_x(attitude.roll as f32))
}

/// Return a rotated copy of `cloud`.  Point count and order are preserved.
pub fn level(cloud: &PointCloud, attitude: Attitude) -> PointCloud {
    let mut out = cloud.clone();
    level_in_place(&mut out, attitude);
    out
}

/// Rotate every point of `cloud` in place.
pub fn level_in_place(cloud: &mut PointCloud, attitude: Attitude) {
    let rotation = leveling_rotation(attitude);
    for p in &mut cloud.points {
        *p = rotation.apply(*p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Point3;
    use levelcloud_types::Header;
    use std::f64::consts::FRAC_PI_2;

    fn cloud(points: Vec<Point3>) -> PointCloud {
        PointCloud::new(
            Header {
                frame_id: "velodyne".to_string(),
                ..Header::default()
            },
            points,
        )
    }

    fn assert_close(a: Point3, b: Point3) {
        assert!(
            (a.x - b.x).abs() < 1e-5 && (a.y - b.y).abs() < 1e-5 && (a.z - b.z).abs() < 1e-5,
            "expected {b:?}, got {a:?}"
        );
    }

    #[test]
    fn zero_attitude_is_identity() {
        let input = cloud(vec![Point3::new(1.0, -2.0, 3.5), Point3::new(-7.0, 0.0, 0.1)]);
        let out = level(&input, Attitude::default());
        for (a, b) in out.points.iter().zip(&input.points) {
            assert_close(*a, *b);
        }
    }

    #[test]
    fn preserves_count_order_and_header() {
        let input = cloud((0..50).map(|i| Point3::new(i as f32, 1.0, 2.0)).collect());
        let attitude = Attitude {
            roll: 0.3,
            pitch: -0.2,
        };
        let out = level(&input, attitude);
        assert_eq!(out.len(), input.len());
        assert_eq!(out.header, input.header);

        // Rotation preserves norms, so the i-th output must match the i-th input.
        for (a, b) in out.points.iter().zip(&input.points) {
            let na = (a.x * a.x + a.y * a.y + a.z * a.z).sqrt();
            let nb = (b.x * b.x + b.y * b.y + b.z * b.z).sqrt();
            assert!((na - nb).abs() < 1e-3);
        }
    }

    #[test]
    fn roll_rotates_about_x() {
        let attitude = Attitude {
            roll: FRAC_PI_2,
            pitch: 0.0,
        };
        let out = level(&cloud(vec![Point3::new(0.0, 1.0, 0.0)]), attitude);
        assert_close(out.points[0], Point3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn pitch_rotates_about_y() {
        let attitude = Attitude {
            roll: 0.0,
            pitch: FRAC_PI_2,
        };
        let out = level(&cloud(vec![Point3::new(0.0, 0.0, 1.0)]), attitude);
        assert_close(out.points[0], Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn roll_is_applied_before_pitch() {
        let attitude = Attitude {
            roll: FRAC_PI_2,
            pitch: FRAC_PI_2,
        };
        // Rx: +Y → +Z, then Ry: +Z → +X.
        let out = level(&cloud(vec![Point3::new(0.0, 1.0, 0.0)]), attitude);
        assert_close(out.points[0], Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn in_place_matches_copying_variant() {
        let attitude = Attitude {
            roll: 0.1,
            pitch: 0.4,
        };
        let input = cloud(vec![Point3::new(3.0, 2.0, 1.0)]);
        let mut in_place = input.clone();
        level_in_place(&mut in_place, attitude);
        assert_eq!(in_place, level(&input, attitude));
    }
}
