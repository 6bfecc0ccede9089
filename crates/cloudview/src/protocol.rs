//! Newline-delimited JSON messages exchanged with the Qt controller.
//!
//! Inbound envelopes carry their body in `data`, normally as a string holding
//! another JSON document. Outbound messages are flat objects stamped with
//! unix seconds.

use crate::camera::CameraPose;
use crate::error::{Error, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Point cloud body of a `workpiece_data` message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PointCloudPayload {
    pub file_name: String,
    pub format: String,
    /// Count claimed by the sender; informational only.
    pub point_count: u64,
    pub file_size: u64,
    /// Flat `x, y, z` triples.
    pub points: Vec<f32>,
    /// Flat `r, g, b` triples in `[0, 1]`, parallel to `points`.
    pub colors: Vec<f32>,
    pub normals: Vec<f32>,
    pub bounding_box_min: Vec<f32>,
    pub bounding_box_max: Vec<f32>,
    pub sample_step: u32,
}

/// Camera instruction carried by a `camera_command` message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraCommand {
    Reset,
    Focus { point: Vec3, distance: Option<f32> },
    /// Re-frame the currently loaded bounds.
    FocusBounds,
    SetRotation { yaw: f32, pitch: f32 },
    SetDistance { distance: f32 },
    FocusNear,
    Overview,
}

impl CameraCommand {
    pub fn from_value(value: &Value) -> Result<Self> {
        let name = value
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::UnknownCommand(value.to_string()))?;

        let number = |key: &str| value.get(key).and_then(Value::as_f64).map(|v| v as f32);
        let required = |key: &str| {
            number(key).ok_or_else(|| Error::UnknownCommand(format!("{name} without {key}")))
        };

        let command = match name {
            "reset" => CameraCommand::Reset,
            "focus" => {
                let point = value
                    .get("point")
                    .and_then(Value::as_array)
                    .filter(|p| p.len() >= 3)
                    .and_then(|p| {
                        Some(Vec3::new(
                            p[0].as_f64()? as f32,
                            p[1].as_f64()? as f32,
                            p[2].as_f64()? as f32,
                        ))
                    })
                    .ok_or_else(|| Error::UnknownCommand("focus without point".into()))?;
                CameraCommand::Focus {
                    point,
                    distance: number("distance"),
                }
            }
            "focus_bounds" => CameraCommand::FocusBounds,
            "set_rotation" => CameraCommand::SetRotation {
                yaw: required("yaw")?,
                pitch: required("pitch")?,
            },
            "set_distance" => CameraCommand::SetDistance {
                distance: required("distance")?,
            },
            "focus_near" => CameraCommand::FocusNear,
            "overview" => CameraCommand::Overview,
            other => return Err(Error::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }
}

/// Decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    WorkpieceData(Box<PointCloudPayload>),
    TrajectoryData(String),
    SimulationCommand(String),
    CameraCommand(CameraCommand),
    ClearPointCloud,
    HeartbeatResponse,
    Unknown(String),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Body of an envelope: a JSON document embedded as a string, or inline.
fn body(data: Value) -> Result<Value> {
    match data {
        Value::String(text) if text.trim().is_empty() => Ok(Value::Null),
        Value::String(text) => Ok(serde_json::from_str(&text)?),
        other => Ok(other),
    }
}

fn raw_text(data: Value) -> String {
    match data {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl InboundMessage {
    /// Parses one line received from the controller.
    pub fn parse(line: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(line.trim())?;
        let message = match envelope.kind.as_str() {
            "workpiece_data" => {
                let payload = match body(envelope.data)? {
                    Value::Null => return Err(Error::EmptyPayload),
                    value => serde_json::from_value(value)?,
                };
                InboundMessage::WorkpieceData(Box::new(payload))
            }
            "trajectory_data" => InboundMessage::TrajectoryData(raw_text(envelope.data)),
            "simulation_command" => InboundMessage::SimulationCommand(raw_text(envelope.data)),
            "camera_command" => {
                InboundMessage::CameraCommand(CameraCommand::from_value(&body(envelope.data)?)?)
            }
            "clear_point_cloud" => InboundMessage::ClearPointCloud,
            "heartbeat_response" => InboundMessage::HeartbeatResponse,
            _ => InboundMessage::Unknown(envelope.kind),
        };
        Ok(message)
    }
}

/// Message sent back to the controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub timestamp: i64,
    pub data: Value,
}

impl OutboundMessage {
    fn new(kind: &'static str, data: Value) -> Self {
        Self {
            kind,
            timestamp: chrono::Utc::now().timestamp(),
            data,
        }
    }

    pub fn heartbeat() -> Self {
        Self::new("heartbeat", Value::Null)
    }

    pub fn workpiece_loaded(success: bool, message: impl Into<String>) -> Self {
        Self::new(
            "workpiece_loaded",
            json!({ "success": success, "message": message.into() }),
        )
    }

    pub fn trajectory_displayed(success: bool, message: impl Into<String>) -> Self {
        Self::new(
            "trajectory_displayed",
            json!({ "success": success, "message": message.into() }),
        )
    }

    pub fn camera_view_changed(pose: &CameraPose) -> Self {
        Self::new(
            "camera_view_changed",
            json!({
                "position": pose.position.to_array(),
                "pivot": pose.pivot.to_array(),
                "distance": pose.distance,
                "yaw": pose.yaw,
                "pitch": pose.pitch,
            }),
        )
    }

    pub fn point_cloud_cleared() -> Self {
        Self::new("point_cloud_cleared", Value::Null)
    }

    /// Serialises the message as one newline-terminated line.
    pub fn to_line(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"type":"{}","timestamp":{},"data":null}}"#, self.kind, self.timestamp)
        });
        line.push('\n');
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workpiece_data_in_string_body() {
        let line = r#"{"type":"workpiece_data","data":"{\"fileName\":\"part.ply\",\"pointCount\":2,\"points\":[0,0,0,1,2,3],\"boundingBoxMin\":[0,0,0],\"boundingBoxMax\":[1,2,3]}","timestamp":1700000000}"#;
        let InboundMessage::WorkpieceData(payload) = InboundMessage::parse(line).unwrap() else {
            panic!("expected workpiece data");
        };
        assert_eq!(payload.file_name, "part.ply");
        assert_eq!(payload.points.len(), 6);
        assert!(payload.colors.is_empty());
        assert_eq!(payload.bounding_box_max, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn workpiece_data_inline_object() {
        let line = r#"{"type":"workpiece_data","data":{"points":[1,1,1]}}"#;
        assert!(matches!(
            InboundMessage::parse(line).unwrap(),
            InboundMessage::WorkpieceData(_)
        ));
    }

    #[test]
    fn empty_workpiece_body_is_an_error() {
        let line = r#"{"type":"workpiece_data","data":""}"#;
        assert!(matches!(InboundMessage::parse(line), Err(Error::EmptyPayload)));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(InboundMessage::parse("{not json"), Err(Error::Json(_))));
        let line = r#"{"type":"workpiece_data","data":"{\"points\": [1,"}"#;
        assert!(matches!(InboundMessage::parse(line), Err(Error::Json(_))));
    }

    #[test]
    fn simple_messages() {
        assert_eq!(
            InboundMessage::parse(r#"{"type":"clear_point_cloud"}"#).unwrap(),
            InboundMessage::ClearPointCloud
        );
        assert_eq!(
            InboundMessage::parse(r#"{"type":"heartbeat_response","data":null}"#).unwrap(),
            InboundMessage::HeartbeatResponse
        );
        assert_eq!(
            InboundMessage::parse(r#"{"type":"simulation_command","data":"start"}"#).unwrap(),
            InboundMessage::SimulationCommand("start".into())
        );
        assert_eq!(
            InboundMessage::parse(r#"{"type":"robot_status","data":"x"}"#).unwrap(),
            InboundMessage::Unknown("robot_status".into())
        );
    }

    #[test]
    fn camera_commands() {
        let parse = |body: &str| {
            let line = json!({ "type": "camera_command", "data": body }).to_string();
            InboundMessage::parse(&line)
        };
        assert_eq!(
            parse(r#"{"command":"focus","point":[1,2,3],"distance":40}"#).unwrap(),
            InboundMessage::CameraCommand(CameraCommand::Focus {
                point: Vec3::new(1.0, 2.0, 3.0),
                distance: Some(40.0)
            })
        );
        assert_eq!(
            parse(r#"{"command":"set_rotation","yaw":90,"pitch":-10}"#).unwrap(),
            InboundMessage::CameraCommand(CameraCommand::SetRotation {
                yaw: 90.0,
                pitch: -10.0
            })
        );
        assert_eq!(
            parse(r#"{"command":"overview"}"#).unwrap(),
            InboundMessage::CameraCommand(CameraCommand::Overview)
        );
        assert!(matches!(
            parse(r#"{"command":"barrel_roll"}"#),
            Err(Error::UnknownCommand(name)) if name == "barrel_roll"
        ));
        assert!(matches!(
            parse(r#"{"command":"set_distance"}"#),
            Err(Error::UnknownCommand(_))
        ));
    }

    #[test]
    fn outbound_lines() {
        let line = OutboundMessage::workpiece_loaded(false, "no points").to_line();
        assert!(line.ends_with('\n'));
        let value: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["type"], "workpiece_loaded");
        assert_eq!(value["data"]["success"], false);
        assert_eq!(value["data"]["message"], "no points");
        assert!(value["timestamp"].as_i64().unwrap() > 1_600_000_000);

        let value: Value =
            serde_json::from_str(OutboundMessage::heartbeat().to_line().trim_end()).unwrap();
        assert_eq!(value["type"], "heartbeat");
        assert!(value["data"].is_null());
    }
}
