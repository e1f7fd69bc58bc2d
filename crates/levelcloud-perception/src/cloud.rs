//! In-memory point cloud and conversion to/from the [`PointCloud2`] wire format.
//!
//! Decoding only needs the `x`, `y` and `z` channels; any other fields in the
//! incoming record (intensity, ring, …) are skipped.  Encoding always produces
//! a dense, little-endian, 16-byte-per-point layout.

use levelcloud_types::{datatype, Header, LevelError, PointCloud2, PointField};

use crate::transform::Point3;

/// Byte length of one encoded point: three `f32` plus 4 bytes padding.
pub const POINT_STEP: u32 = 16;

/// An ordered list of points plus the header of the message it came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    pub header: Header,
    pub points: Vec<Point3>,
}

impl PointCloud {
    pub fn new(header: Header, points: Vec<Point3>) -> Self {
        Self { header, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Decode a wire cloud.
    ///
    /// Reads `width * height` records at `point_step` strides, one row every
    /// `row_step` bytes.  Non-finite coordinates are decoded as-is.
    ///
    /// # Errors
    ///
    /// * [`LevelError::MissingField`] – no `x`, `y` or `z` field.
    /// * [`LevelError::UnsupportedDatatype`] – a coordinate field is neither
    ///   `FLOAT32` nor `FLOAT64`.
    /// * [`LevelError::MalformedCloud`] – the layout does not fit the buffer.
    pub fn from_msg(msg: &PointCloud2) -> Result<Self, LevelError> {
        let readers = [
            CoordReader::for_field(msg, "x")?,
            CoordReader::for_field(msg, "y")?,
            CoordReader::for_field(msg, "z")?,
        ];

        let width = msg.width as usize;
        let height = msg.height as usize;
        let point_step = msg.point_step as usize;
        let row_step = msg.row_step as usize;

        if width * height == 0 {
            return Ok(Self::new(msg.header.clone(), Vec::new()));
        }
        if point_step == 0 {
            return Err(LevelError::MalformedCloud("point_step is zero".into()));
        }
        if let Some(r) = readers.iter().find(|r| r.offset + r.size() > point_step) {
            return Err(LevelError::MalformedCloud(format!(
                "field '{}' at offset {} does not fit in point_step {}",
                r.name,
                r.offset,
                point_step
            )));
        }
        if row_step < width * point_step {
            return Err(LevelError::MalformedCloud(format!(
                "row_step {row_step} is shorter than width {width} × point_step {point_step}"
            )));
        }
        if msg.data.len() < row_step * height {
            return Err(LevelError::MalformedCloud(format!(
                "data holds {} bytes, expected at least {}",
                msg.data.len(),
                row_step * height
            )));
        }

        let mut points = Vec::with_capacity(width * height);
        for row in msg.data.chunks(row_step).take(height) {
            for record in row.chunks(point_step).take(width) {
                let [x, y, z] = &readers;
                points.push(Point3::new(
                    x.read(record, msg.is_bigendian)?,
                    y.read(record, msg.is_bigendian)?,
                    z.read(record, msg.is_bigendian)?,
                ));
            }
        }

        Ok(Self::new(msg.header.clone(), points))
    }

    /// Encode into a dense single-row wire cloud.
    ///
    /// Fails when the encoded row would not fit the 32-bit `row_step`.
    pub fn to_msg(&self) -> Result<PointCloud2, LevelError> {
        let (width, row_step) = row_layout(self.points.len())?;

        let mut data = Vec::with_capacity(self.points.len() * POINT_STEP as usize);
        for p in &self.points {
            data.extend_from_slice(&p.x.to_le_bytes());
            data.extend_from_slice(&p.y.to_le_bytes());
            data.extend_from_slice(&p.z.to_le_bytes());
            data.extend_from_slice(&[0u8; 4]);
        }

        Ok(PointCloud2 {
            header: self.header.clone(),
            height: 1,
            width,
            fields: vec![
                PointField::new("x", 0, datatype::FLOAT32),
                PointField::new("y", 4, datatype::FLOAT32),
                PointField::new("z", 8, datatype::FLOAT32),
            ],
            is_bigendian: false,
            point_step: POINT_STEP,
            row_step,
            data,
            is_dense: self.points.iter().all(Point3::is_finite),
        })
    }
}

/// `(width, row_step)` of a single-row cloud holding `len` points.
fn row_layout(len: usize) -> Result<(u32, u32), LevelError> {
    let too_large = || LevelError::MalformedCloud(format!("{len} points exceed the wire size limit"));
    let width = u32::try_from(len).map_err(|_| too_large())?;
    let row_step = POINT_STEP.checked_mul(width).ok_or_else(too_large)?;
    Ok((width, row_step))
}

// ────────────────────────────────────────────────────────────────────────────
// Field decoding
// ────────────────────────────────────────────────────────────────────────────

struct CoordReader {
    name: &'static str,
    offset: usize,
    datatype: u8,
}

impl CoordReader {
    fn for_field(msg: &PointCloud2, name: &'static str) -> Result<Self, LevelError> {
        let field = msg
            .field(name)
            .ok_or_else(|| LevelError::MissingField(name.to_string()))?;
        match field.datatype {
            datatype::FLOAT32 | datatype::FLOAT64 => Ok(Self {
                name,
                offset: field.offset as usize,
                datatype: field.datatype,
            }),
            other => Err(LevelError::UnsupportedDatatype {
                field: name.to_string(),
                datatype: other,
            }),
        }
    }

    fn size(&self) -> usize {
        if self.datatype == datatype::FLOAT64 { 8 } else { 4 }
    }

    fn read(&self, record: &[u8], big_endian: bool) -> Result<f32, LevelError> {
        let bytes = record
            .get(self.offset..self.offset + self.size())
            .ok_or_else(|| {
                LevelError::MalformedCloud(format!("truncated record for field '{}'", self.name))
            })?;
        let value = if self.datatype == datatype::FLOAT64 {
            let mut b = [0u8; 8];
            b.copy_from_slice(bytes);
            (if big_endian { f64::from_be_bytes(b) } else { f64::from_le_bytes(b) }) as f32
        } else {
            let mut b = [0u8; 4];
            b.copy_from_slice(bytes);
            if big_endian { f32::from_be_bytes(b) } else { f32::from_le_bytes(b) }
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(frame: &str) -> Header {
        Header {
            seq: 7,
            frame_id: frame.to_string(),
            ..Header::default()
        }
    }

    /// XYZI cloud as a typical LiDAR driver emits it: 32-byte records.
    fn velodyne_style(points: &[(f32, f32, f32)]) -> PointCloud2 {
        let mut data = Vec::new();
        for &(x, y, z) in points {
            data.extend_from_slice(&x.to_le_bytes());
            data.extend_from_slice(&y.to_le_bytes());
            data.extend_from_slice(&z.to_le_bytes());
            data.extend_from_slice(&[0u8; 4]);
            data.extend_from_slice(&42.0f32.to_le_bytes());
            data.extend_from_slice(&[0u8; 12]);
        }
        PointCloud2 {
            header: header("velodyne"),
            height: 1,
            width: points.len() as u32,
            fields: vec![
                PointField::new("x", 0, datatype::FLOAT32),
                PointField::new("y", 4, datatype::FLOAT32),
                PointField::new("z", 8, datatype::FLOAT32),
                PointField::new("intensity", 16, datatype::FLOAT32),
            ],
            is_bigendian: false,
            point_step: 32,
            row_step: 32 * points.len() as u32,
            data,
            is_dense: true,
        }
    }

    #[test]
    fn decodes_xyz_and_skips_other_fields() {
        let msg = velodyne_style(&[(1.0, 2.0, 3.0), (-4.0, 5.5, 0.25)]);
        let cloud = PointCloud::from_msg(&msg).unwrap();
        assert_eq!(cloud.points, vec![Point3::new(1.0, 2.0, 3.0), Point3::new(-4.0, 5.5, 0.25)]);
        assert_eq!(cloud.header.frame_id, "velodyne");
        assert_eq!(cloud.header.seq, 7);
    }

    #[test]
    fn encoded_cloud_decodes_to_the_same_points() {
        let cloud = PointCloud::new(
            header("base_link"),
            vec![Point3::new(0.5, -1.5, 2.0), Point3::new(9.0, 8.0, 7.0)],
        );
        let msg = cloud.to_msg().unwrap();
        assert_eq!(msg.point_step, POINT_STEP);
        assert_eq!(msg.row_step, 32);
        assert_eq!(msg.data.len(), 32);
        assert!(msg.is_dense);
        assert_eq!(PointCloud::from_msg(&msg).unwrap(), cloud);
    }

    #[test]
    fn decodes_big_endian_float64_fields() {
        let mut data = Vec::new();
        for v in [1.5f64, -2.0, 3.25] {
            data.extend_from_slice(&v.to_be_bytes());
        }
        let msg = PointCloud2 {
            height: 1,
            width: 1,
            fields: vec![
                PointField::new("x", 0, datatype::FLOAT64),
                PointField::new("y", 8, datatype::FLOAT64),
                PointField::new("z", 16, datatype::FLOAT64),
            ],
            is_bigendian: true,
            point_step: 24,
            row_step: 24,
            data,
            ..PointCloud2::default()
        };
        let cloud = PointCloud::from_msg(&msg).unwrap();
        assert_eq!(cloud.points, vec![Point3::new(1.5, -2.0, 3.25)]);
    }

    #[test]
    fn organised_cloud_honours_row_padding() {
        // 2 rows × 1 point, 12-byte records, 16-byte rows.
        let mut data = Vec::new();
        for row in [[1.0f32, 1.0, 1.0], [2.0, 2.0, 2.0]] {
            for v in row {
                data.extend_from_slice(&v.to_le_bytes());
            }
            data.extend_from_slice(&[0xFFu8; 4]);
        }
        let msg = PointCloud2 {
            height: 2,
            width: 1,
            fields: vec![
                PointField::new("x", 0, datatype::FLOAT32),
                PointField::new("y", 4, datatype::FLOAT32),
                PointField::new("z", 8, datatype::FLOAT32),
            ],
            point_step: 12,
            row_step: 16,
            data,
            ..PointCloud2::default()
        };
        let cloud = PointCloud::from_msg(&msg).unwrap();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.points[1], Point3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn missing_z_field_is_an_error() {
        let mut msg = velodyne_style(&[(1.0, 2.0, 3.0)]);
        msg.fields.retain(|f| f.name != "z");
        assert_eq!(
            PointCloud::from_msg(&msg),
            Err(LevelError::MissingField("z".to_string()))
        );
    }

    #[test]
    fn integer_coordinate_field_is_rejected() {
        let mut msg = velodyne_style(&[(1.0, 2.0, 3.0)]);
        msg.fields[0].datatype = datatype::UINT16;
        assert!(matches!(
            PointCloud::from_msg(&msg),
            Err(LevelError::UnsupportedDatatype { datatype: 4, .. })
        ));
    }

    #[test]
    fn truncated_data_is_rejected() {
        let mut msg = velodyne_style(&[(1.0, 2.0, 3.0), (4.0, 5.0, 6.0)]);
        msg.data.truncate(40);
        assert!(matches!(
            PointCloud::from_msg(&msg),
            Err(LevelError::MalformedCloud(_))
        ));
    }

    #[test]
    fn field_beyond_point_step_is_rejected() {
        let mut msg = velodyne_style(&[(1.0, 2.0, 3.0)]);
        msg.fields[2].offset = 30;
        assert!(matches!(
            PointCloud::from_msg(&msg),
            Err(LevelError::MalformedCloud(_))
        ));
    }

    #[test]
    fn empty_cloud_decodes_to_no_points() {
        let msg = velodyne_style(&[]);
        let cloud = PointCloud::from_msg(&msg).unwrap();
        assert!(cloud.is_empty());
        assert_eq!(cloud.header.frame_id, "velodyne");
    }

    #[test]
    fn non_finite_points_clear_is_dense() {
        let cloud = PointCloud::new(Header::default(), vec![Point3::new(f32::NAN, 0.0, 0.0)]);
        assert!(!cloud.to_msg().unwrap().is_dense);
    }

    #[test]
    fn row_layout_rejects_clouds_past_u32_row_step() {
        assert_eq!(row_layout(3), Ok((3, 48)));
        let max = (u32::MAX / POINT_STEP) as usize;
        assert_eq!(row_layout(max), Ok((max as u32, max as u32 * POINT_STEP)));
        assert!(matches!(row_layout(max + 1), Err(LevelError::MalformedCloud(_))));
        assert!(matches!(row_layout(usize::MAX), Err(LevelError::MalformedCloud(_))));
    }
}
