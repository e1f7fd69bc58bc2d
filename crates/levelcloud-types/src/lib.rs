use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Message timestamp (seconds + nanoseconds since the epoch).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    pub sec: i32,
    pub nanosec: u32,
}

/// Standard message header carried by every sensor message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    #[serde(default)]
    pub seq: u32,
    #[serde(default)]
    pub stamp: Stamp,
    /// Coordinate frame the message's data is expressed in, e.g. "velodyne".
    #[serde(default)]
    pub frame_id: String,
}

/// Datatype codes used by [`PointField::datatype`].
pub mod datatype {
    pub const INT8: u8 = 1;
    pub const UINT8: u8 = 2;
    pub const INT16: u8 = 3;
    pub const UINT16: u8 = 4;
    pub const INT32: u8 = 5;
    pub const UINT32: u8 = 6;
    pub const FLOAT32: u8 = 7;
    pub const FLOAT64: u8 = 8;
}

/// Describes one named channel inside a [`PointCloud2`] point record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointField {
    pub name: String,
    /// Byte offset of the field from the start of the point record.
    pub offset: u32,
    /// One of the [`datatype`] codes.
    pub datatype: u8,
    pub count: u32,
}

impl PointField {
    pub fn new(name: impl Into<String>, offset: u32, datatype: u8) -> Self {
        Self {
            name: name.into(),
            offset,
            datatype,
            count: 1,
        }
    }
}

/// Wire-format point cloud: a packed byte buffer described by a field list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud2 {
    pub header: Header,
    pub height: u32,
    pub width: u32,
    pub fields: Vec<PointField>,
    pub is_bigendian: bool,
    /// Length of one point record in bytes.
    pub point_step: u32,
    /// Length of one row in bytes.
    pub row_step: u32,
    pub data: Vec<u8>,
    /// `true` when the cloud contains no non-finite coordinates.
    pub is_dense: bool,
}

impl PointCloud2 {
    /// Number of point records the header claims (`width * height`).
    pub fn point_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&PointField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Orientation quaternion as it appears on the wire (x, y, z, w order).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuaternionMsg {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for QuaternionMsg {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3Msg {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Inertial measurement.  Only `orientation` is consumed by the node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImuMessage {
    #[serde(default)]
    pub header: Header,
    pub orientation: QuaternionMsg,
    #[serde(default)]
    pub angular_velocity: Vector3Msg,
    #[serde(default)]
    pub linear_acceleration: Vector3Msg,
}

/// Unified event wrapper for the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Publish order across every topic of one bus.  Zero until published.
    #[serde(default)]
    pub seq: u64,
    /// e.g., "levelcloud-middleware::bridge/imu"
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Wrap `payload` in a fresh event stamped with the current time.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            seq: 0,
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data that can be routed over the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Imu(ImuMessage),
    PointCloud(PointCloud2),
}

/// External topic names the node subscribes and publishes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicNames {
    #[serde(default = "default_points_topic")]
    pub points: String,
    #[serde(default = "default_imu_topic")]
    pub imu: String,
    #[serde(default = "default_filtered_topic")]
    pub filtered: String,
    #[serde(default = "default_keypoints_topic")]
    pub keypoints: String,
}

fn default_points_topic() -> String {
    "/velodyne_points".to_string()
}
fn default_imu_topic() -> String {
    "/xsens/data".to_string()
}
fn default_filtered_topic() -> String {
    "/feature_extraction_node/cloud_filt".to_string()
}
fn default_keypoints_topic() -> String {
    "/feature_extraction_node/keypoints".to_string()
}

impl Default for TopicNames {
    fn default() -> Self {
        Self {
            points: default_points_topic(),
            imu: default_imu_topic(),
            filtered: default_filtered_topic(),
            keypoints: default_keypoints_topic(),
        }
    }
}

/// Error type shared by the conversion, filtering, and transport layers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LevelError {
    #[error("point cloud has no '{0}' field")]
    MissingField(String),

    #[error("field '{field}' has unsupported datatype {datatype}")]
    UnsupportedDatatype { field: String, datatype: u8 },

    #[error("malformed point cloud: {0}")]
    MalformedCloud(String),

    #[error("event bus channel error: {0}")]
    Channel(String),

    #[error("socket I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imu_message_deserializes_with_orientation_only() {
        let json = r#"{"orientation":{"x":0.0,"y":0.0,"z":0.0,"w":1.0}}"#;
        let msg: ImuMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.orientation, QuaternionMsg::default());
        assert_eq!(msg.header.frame_id, "");
        assert_eq!(msg.angular_velocity, Vector3Msg::default());
    }

    #[test]
    fn event_roundtrip() {
        let event = Event::new(
            "levelcloud-middleware::bridge/points",
            EventPayload::PointCloud(PointCloud2 {
                header: Header {
                    frame_id: "velodyne".to_string(),
                    ..Header::default()
                },
                ..PointCloud2::default()
            }),
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event.id, back.id);
        assert_eq!(event.source, back.source);
        match back.payload {
            EventPayload::PointCloud(c) => assert_eq!(c.header.frame_id, "velodyne"),
            _ => panic!("unexpected variant"),
        }
    }

    #[test]
    fn topic_names_fill_missing_fields_with_defaults() {
        let json = r#"{"points":"/lidar"}"#;
        let topics: TopicNames = serde_json::from_str(json).unwrap();
        assert_eq!(topics.points, "/lidar");
        assert_eq!(topics.imu, "/xsens/data");
        assert_eq!(topics.filtered, "/feature_extraction_node/cloud_filt");
    }

    #[test]
    fn point_cloud2_field_lookup() {
        let cloud = PointCloud2 {
            fields: vec![
                PointField::new("x", 0, datatype::FLOAT32),
                PointField::new("y", 4, datatype::FLOAT32),
            ],
            width: 3,
            height: 2,
            ..PointCloud2::default()
        };
        assert_eq!(cloud.field("y").map(|f| f.offset), Some(4));
        assert!(cloud.field("z").is_none());
        assert_eq!(cloud.point_count(), 6);
    }

    #[test]
    fn level_error_display() {
        let err = LevelError::MissingField("z".to_string());
        assert!(err.to_string().contains("'z'"));

        let err2 = LevelError::UnsupportedDatatype {
            field: "x".to_string(),
            datatype: 2,
        };
        assert!(err2.to_string().contains("datatype 2"));
    }
}
