use cloudview::protocol::{InboundMessage, OutboundMessage};
use cloudview::{Error, InputFrame, Renderer, Viewer};

/// Load waiting for its layout to finish before it is acknowledged.
#[derive(Debug)]
struct PendingLoad {
    generation: u64,
    name: String,
    total_points: usize,
}

/// Routes controller messages into a [`Viewer`] and collects the replies.
pub struct Dispatcher {
    viewer: Viewer,
    pending: Option<PendingLoad>,
}

impl Dispatcher {
    pub fn new(viewer: Viewer) -> Self {
        Self {
            viewer,
            pending: None,
        }
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    /// Handles one inbound line and returns the immediate replies.
    pub fn handle_line(&mut self, line: &str) -> Vec<OutboundMessage> {
        let message = match InboundMessage::parse(line) {
            Ok(message) => message,
            Err(e) => return self.reject(line, e),
        };

        match message {
            InboundMessage::WorkpieceData(payload) => {
                let claimed = payload.point_count;
                match self.viewer.load_payload(*payload) {
                    Ok(summary) => {
                        tracing::info!(
                            name = %summary.name,
                            generation = summary.generation,
                            claimed,
                            total = summary.total_points,
                            displayed = summary.display_points,
                            dropped = summary.dropped,
                            bounds_recomputed = summary.bounds_recomputed,
                            "Workpiece loading"
                        );
                        self.pending = Some(PendingLoad {
                            generation: summary.generation,
                            name: summary.name,
                            total_points: summary.total_points,
                        });
                        Vec::new()
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Workpiece rejected");
                        vec![OutboundMessage::workpiece_loaded(false, e.to_string())]
                    }
                }
            }
            InboundMessage::TrajectoryData(data) => {
                tracing::info!(bytes = data.len(), "Trajectory received");
                vec![OutboundMessage::trajectory_displayed(true, "trajectory received")]
            }
            InboundMessage::CameraCommand(command) => {
                let pose = self.viewer.apply_camera_command(&command);
                tracing::debug!(?command, distance = pose.distance, "Camera command applied");
                vec![OutboundMessage::camera_view_changed(&pose)]
            }
            InboundMessage::ClearPointCloud => {
                self.pending = None;
                self.viewer.clear();
                vec![OutboundMessage::point_cloud_cleared()]
            }
            InboundMessage::SimulationCommand(command) => {
                tracing::info!(command = %command, "Simulation command ignored");
                Vec::new()
            }
            InboundMessage::HeartbeatResponse => {
                tracing::trace!("Heartbeat acknowledged");
                Vec::new()
            }
            InboundMessage::Unknown(kind) => {
                tracing::debug!(kind = %kind, "Unknown message type");
                Vec::new()
            }
        }
    }

    fn reject(&self, line: &str, error: Error) -> Vec<OutboundMessage> {
        let kind = serde_json::from_str::<serde_json::Value>(line)
            .ok()
            .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(str::to_owned));
        tracing::warn!(error = %error, kind = ?kind, "Malformed message");

        match kind.as_deref() {
            Some("workpiece_data") => {
                vec![OutboundMessage::workpiece_loaded(false, error.to_string())]
            }
            _ => Vec::new(),
        }
    }

    /// Advances the viewer one frame, draws into `renderer` and returns the
    /// acknowledgements that became due.
    pub fn tick<R: Renderer>(
        &mut self,
        input: &InputFrame,
        dt: f32,
        renderer: &mut R,
    ) -> Vec<OutboundMessage> {
        let frame = self.viewer.tick(input, dt);
        frame.apply(renderer, self.viewer.generation());

        let Some((generation, placed)) = frame.completed_layout() else {
            return Vec::new();
        };
        match self.pending.take() {
            Some(load) if load.generation == generation => {
                tracing::info!(name = %load.name, generation, placed, "Workpiece displayed");
                vec![OutboundMessage::workpiece_loaded(
                    true,
                    format!(
                        "loaded {}: displaying {} of {} points",
                        load.name, placed, load.total_points
                    ),
                )]
            }
            other => {
                self.pending = other;
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudview::{PointArena, ViewerConfig};
    use serde_json::{json, Value};

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Viewer::new(ViewerConfig::default()).unwrap())
    }

    fn workpiece_line(points: &[f32]) -> String {
        let body = json!({ "fileName": "part.ply", "pointCount": points.len() / 3, "points": points });
        json!({ "type": "workpiece_data", "data": body.to_string() }).to_string()
    }

    fn data(message: &OutboundMessage) -> &Value {
        &message.data
    }

    #[test]
    fn workpiece_is_acknowledged_when_layout_completes() {
        let mut dispatcher = dispatcher();
        let mut arena = PointArena::new();
        let points: Vec<f32> = (0..300).map(|i| i as f32).collect();

        assert!(dispatcher.handle_line(&workpiece_line(&points)).is_empty());

        let mut replies = Vec::new();
        for _ in 0..10 {
            replies.extend(dispatcher.tick(&InputFrame::idle(), 1.0 / 60.0, &mut arena));
        }
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].kind, "workpiece_loaded");
        assert_eq!(data(&replies[0])["success"], true);
        assert_eq!(arena.len(), 100);
    }

    #[test]
    fn bad_workpiece_is_rejected_immediately() {
        let mut dispatcher = dispatcher();
        let replies = dispatcher.handle_line(&workpiece_line(&[f32::NAN, 0.0, 0.0]));
        // NaN serialises as null and fails to decode as a float.
        assert_eq!(replies.len(), 1);
        assert_eq!(data(&replies[0])["success"], false);

        let empty = json!({ "type": "workpiece_data", "data": "" }).to_string();
        let replies = dispatcher.handle_line(&empty);
        assert_eq!(data(&replies[0])["success"], false);
        assert_eq!(data(&replies[0])["message"], "point cloud payload is empty");
    }

    #[test]
    fn clear_cancels_pending_acknowledgement() {
        let mut dispatcher = dispatcher();
        let mut arena = PointArena::new();
        let points: Vec<f32> = (0..30_000).map(|i| i as f32 * 0.001).collect();
        dispatcher.handle_line(&workpiece_line(&points));
        dispatcher.tick(&InputFrame::idle(), 0.016, &mut arena);

        let replies = dispatcher.handle_line(r#"{"type":"clear_point_cloud"}"#);
        assert_eq!(replies[0].kind, "point_cloud_cleared");
        for _ in 0..5 {
            assert!(dispatcher.tick(&InputFrame::idle(), 0.016, &mut arena).is_empty());
        }
        assert!(arena.is_empty());
    }

    #[test]
    fn camera_command_reports_new_view() {
        let mut dispatcher = dispatcher();
        let line = json!({
            "type": "camera_command",
            "data": json!({ "command": "set_distance", "distance": 1e9 }).to_string()
        })
        .to_string();
        let replies = dispatcher.handle_line(&line);
        assert_eq!(replies[0].kind, "camera_view_changed");
        assert_eq!(data(&replies[0])["distance"], 50_000.0);
        assert_eq!(dispatcher.viewer().camera().target_distance(), 50_000.0);

        let line = json!({
            "type": "camera_command",
            "data": json!({ "command": "focus", "point": [10.0, 0.0, 0.0] }).to_string()
        })
        .to_string();
        let replies = dispatcher.handle_line(&line);
        assert_eq!(data(&replies[0])["pivot"], json!([10.0, 0.0, 0.0]));
    }

    #[test]
    fn trajectory_and_passive_messages() {
        let mut dispatcher = dispatcher();
        let replies =
            dispatcher.handle_line(r#"{"type":"trajectory_data","data":"[[0,0,0],[1,1,1]]"}"#);
        assert_eq!(replies[0].kind, "trajectory_displayed");
        assert!(dispatcher
            .handle_line(r#"{"type":"heartbeat_response"}"#)
            .is_empty());
        assert!(dispatcher
            .handle_line(r#"{"type":"simulation_command","data":"start"}"#)
            .is_empty());
        assert!(dispatcher.handle_line("garbage").is_empty());
    }
}
