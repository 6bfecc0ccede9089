use crate::bounds::BoundingBox;
use crate::config::CameraConfig;
use crate::error::Result;
use crate::input::{DragMode, InputFrame, ViewerKey};
use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::Serialize;

/// Diagonal assumed by `focus_near`/`overview` before any bounds were framed.
const FALLBACK_FRAMING_DIAGONAL: f32 = 173.205_08; // |(100, 100, 100)|

/// Orbit parameters. Angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraState {
    /// The point the camera orbits around.
    pub pivot: Vec3,
    /// Distance from the camera to the pivot.
    pub distance: f32,
    /// Rotation around the world up axis.
    pub yaw: f32,
    /// Elevation; positive looks down onto the pivot.
    pub pitch: f32,
}

/// Camera transform produced each tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraPose {
    pub position: Vec3,
    pub rotation: Quat,
    pub pivot: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    /// Near clip plane sized to the orbit distance.
    pub near: f32,
    /// Far clip plane sized to the orbit distance.
    pub far: f32,
}

impl CameraPose {
    fn from_state(state: &CameraState) -> Self {
        let rotation = orbit_rotation(state.yaw, state.pitch);
        Self {
            position: state.pivot + back_axis(state.yaw, state.pitch) * state.distance,
            rotation,
            pivot: state.pivot,
            distance: state.distance,
            yaw: state.yaw,
            pitch: state.pitch,
            near: (state.distance * 0.01).max(0.1),
            far: (state.distance * 5.0).max(20_000.0),
        }
    }

    /// Unit vector from the camera towards the pivot.
    pub fn forward(&self) -> Vec3 {
        (self.pivot - self.position).normalize_or_zero()
    }

    /// Right-handed view matrix looking at the pivot.
    pub fn view_matrix(&self) -> Mat4 {
        // The orbit rotation's local up stays orthogonal to the view direction,
        // including at +-90 degrees of pitch.
        Mat4::look_at_rh(self.position, self.pivot, self.rotation * Vec3::Y)
    }
}

/// Rotation of the camera for the given yaw/pitch (degrees).
pub fn orbit_rotation(yaw: f32, pitch: f32) -> Quat {
    Quat::from_euler(EulerRot::YXZ, yaw.to_radians(), pitch.to_radians(), 0.0)
}

/// Unit vector from the pivot to the camera (the camera's back axis).
pub fn back_axis(yaw: f32, pitch: f32) -> Vec3 {
    let (sin_yaw, cos_yaw) = yaw.to_radians().sin_cos();
    let (sin_pitch, cos_pitch) = pitch.to_radians().sin_cos();
    Vec3::new(-sin_yaw * cos_pitch, sin_pitch, -cos_yaw * cos_pitch)
}

/// Orbit camera with adaptive zoom and critically damped retargeting.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    config: CameraConfig,

    // --- Current (smoothed) state ---
    current: CameraState,

    // --- Targets the current state is damped towards ---
    target_pivot: Vec3,
    target_distance: f32,
    velocity_pivot: Vec3,
    velocity_distance: f32,

    /// Captured at construction; restored by `reset`.
    initial: CameraState,
    /// Most recent box passed to `focus_on_bounds`.
    last_framed: Option<BoundingBox>,
}

impl OrbitCamera {
    pub fn new(config: CameraConfig) -> Result<Self> {
        config.validate()?;

        let initial = CameraState {
            pivot: config.initial_pivot,
            distance: config
                .initial_distance
                .clamp(config.min_distance, config.max_distance),
            yaw: wrap_degrees(config.initial_yaw),
            pitch: config.initial_pitch.clamp(config.min_pitch, config.max_pitch),
        };

        log::debug!(
            "orbit camera ready: distance={:.2} yaw={:.1} pitch={:.1} range=[{:.1}, {:.0}]",
            initial.distance,
            initial.yaw,
            initial.pitch,
            config.min_distance,
            config.max_distance
        );

        Ok(Self {
            config,
            current: initial,
            target_pivot: initial.pivot,
            target_distance: initial.distance,
            velocity_pivot: Vec3::ZERO,
            velocity_distance: 0.0,
            initial,
            last_framed: None,
        })
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn state(&self) -> CameraState {
        self.current
    }

    pub fn target_distance(&self) -> f32 {
        self.target_distance
    }

    pub fn target_pivot(&self) -> Vec3 {
        self.target_pivot
    }

    pub fn last_framed(&self) -> Option<BoundingBox> {
        self.last_framed
    }

    /// Pose for the current state without advancing anything.
    pub fn pose(&self) -> CameraPose {
        CameraPose::from_state(&self.current)
    }

    /// Pose the camera settles at once smoothing has caught up with its targets.
    pub fn target_pose(&self) -> CameraPose {
        CameraPose::from_state(&CameraState {
            pivot: self.target_pivot,
            distance: self.target_distance,
            ..self.current
        })
    }

    /// Applies one frame of input and advances smoothing by `dt` seconds.
    pub fn update(&mut self, input: &InputFrame, dt: f32) -> CameraPose {
        if input.pressed(ViewerKey::ResetCamera) {
            self.reset();
        }
        if input.pressed(ViewerKey::FocusNear) {
            self.focus_near();
        }
        if input.pressed(ViewerKey::Overview) {
            self.overview();
        }

        if input.scroll != 0.0 && input.scroll.is_finite() {
            self.handle_scroll(input.scroll);
        }

        if input.drag.is_finite() && input.drag != glam::Vec2::ZERO {
            match input.drag_mode {
                DragMode::Orbit => self.handle_orbit(input.drag.x, input.drag.y),
                DragMode::Pan => self.handle_pan(input.drag.x, input.drag.y),
                DragMode::None => {}
            }
        }

        self.advance(dt);
        self.pose()
    }

    /// Scroll step for the current distance; grows in tiers with distance.
    pub fn zoom_step(&self) -> f32 {
        let zoom = self.config.zoom_speed;
        if !self.config.adaptive_zoom {
            return zoom;
        }

        let d = self.current.distance;
        let step = if d < 50.0 {
            zoom * 0.1
        } else if d < 200.0 {
            zoom * 0.5
        } else if d < 1000.0 {
            zoom * (d / 100.0)
        } else if d < 5000.0 {
            zoom * (d / 20.0)
        } else {
            zoom * (d / 5.0)
        };
        step.clamp(zoom * 0.1, zoom * 500.0)
    }

    fn handle_scroll(&mut self, scroll: f32) {
        let requested = self.target_distance - scroll * self.zoom_step();
        self.target_distance = self.clamp_distance(requested);
        if requested != self.target_distance {
            log::debug!(
                "zoom target {:.1} clamped to {:.1}",
                requested,
                self.target_distance
            );
        }
    }

    fn handle_orbit(&mut self, dx: f32, dy: f32) {
        let speed = self.config.rotation_speed;
        self.current.yaw = wrap_degrees(self.current.yaw + dx * speed);
        self.current.pitch = self.clamp_pitch(self.current.pitch - dy * speed);
    }

    fn handle_pan(&mut self, dx: f32, dy: f32) {
        let scale = self.config.pan_speed * (self.current.distance / 10.0);
        let local = Vec3::new(-dx, -dy, 0.0) * scale;
        let world = orbit_rotation(self.current.yaw, self.current.pitch) * local;
        if world.is_finite() {
            self.target_pivot += world;
        }
    }

    fn advance(&mut self, dt: f32) {
        let snap = !self.config.smoothing
            || self.config.smooth_time <= 0.0
            || !(dt > 0.0 && dt.is_finite());
        if snap {
            self.current.distance = self.target_distance;
            self.current.pivot = self.target_pivot;
            self.velocity_distance = 0.0;
            self.velocity_pivot = Vec3::ZERO;
        } else {
            let smooth_time = self.config.smooth_time;
            self.current.distance = smooth_damp(
                self.current.distance,
                self.target_distance,
                &mut self.velocity_distance,
                smooth_time,
                dt,
            );
            self.current.pivot = smooth_damp_vec3(
                self.current.pivot,
                self.target_pivot,
                &mut self.velocity_pivot,
                smooth_time,
                dt,
            );
        }

        self.current.distance = self.clamp_distance(self.current.distance);
        self.current.pitch = self.clamp_pitch(self.current.pitch);
    }

    /// Retargets the pivot, and the distance when `distance` is positive.
    pub fn focus_on(&mut self, point: Vec3, distance: Option<f32>) {
        if !point.is_finite() {
            log::warn!("ignoring focus on non-finite point {point}");
            return;
        }
        self.target_pivot = point;
        if let Some(d) = distance.filter(|d| *d > 0.0 && d.is_finite()) {
            self.target_distance = self.clamp_distance(d);
        }
        log::debug!(
            "focus on ({:.2},{:.2},{:.2}) at distance {:.2}",
            point.x,
            point.y,
            point.z,
            self.target_distance
        );
    }

    /// Frames `bounds` from the canonical viewing angle, immediately.
    pub fn focus_on_bounds(&mut self, bounds: &BoundingBox) {
        let center = bounds.center();
        let diagonal = bounds.diagonal();
        if !center.is_finite() || !diagonal.is_finite() {
            log::warn!("ignoring focus on non-finite bounds {bounds:?}");
            return;
        }

        let framed = lenient_clamp(
            diagonal * self.config.framing_multiplier,
            diagonal * 1.5,
            self.config.max_distance,
        );
        let distance = self.clamp_distance(framed);

        self.current = CameraState {
            pivot: center,
            distance,
            yaw: wrap_degrees(self.config.focus_yaw),
            pitch: self.clamp_pitch(self.config.focus_pitch),
        };
        self.target_pivot = center;
        self.target_distance = distance;
        self.velocity_pivot = Vec3::ZERO;
        self.velocity_distance = 0.0;
        self.last_framed = Some(*bounds);

        log::info!(
            "framed bounds: center=({:.2},{:.2},{:.2}) size=({:.2},{:.2},{:.2}) distance={:.1}",
            center.x,
            center.y,
            center.z,
            bounds.size().x,
            bounds.size().y,
            bounds.size().z,
            distance
        );
    }

    /// Restores the pose captured at construction.
    pub fn reset(&mut self) {
        self.current = self.initial;
        self.target_pivot = self.initial.pivot;
        self.target_distance = self.initial.distance;
        self.velocity_pivot = Vec3::ZERO;
        self.velocity_distance = 0.0;
        log::debug!("camera reset to initial state");
    }

    pub fn set_rotation(&mut self, yaw: f32, pitch: f32) {
        if yaw.is_finite() {
            self.current.yaw = wrap_degrees(yaw);
        }
        if pitch.is_finite() {
            self.current.pitch = self.clamp_pitch(pitch);
        }
    }

    pub fn set_distance(&mut self, distance: f32) {
        if distance.is_finite() {
            self.target_distance = self.clamp_distance(distance);
        }
    }

    /// Pulls in to twice the diagonal of the last framed bounds.
    pub fn focus_near(&mut self) {
        self.target_distance = self.clamp_distance(self.framing_diagonal() * 2.0);
    }

    /// Backs off to five times the diagonal of the last framed bounds.
    pub fn overview(&mut self) {
        self.target_distance = self.clamp_distance(self.framing_diagonal() * 5.0);
    }

    fn framing_diagonal(&self) -> f32 {
        self.last_framed
            .map(|b| b.diagonal())
            .filter(|d| *d > 0.0)
            .unwrap_or(FALLBACK_FRAMING_DIAGONAL)
    }

    #[inline]
    fn clamp_distance(&self, distance: f32) -> f32 {
        if distance.is_nan() {
            return self.target_distance;
        }
        distance.clamp(self.config.min_distance, self.config.max_distance)
    }

    #[inline]
    fn clamp_pitch(&self, pitch: f32) -> f32 {
        if pitch.is_nan() {
            return 0.0_f32.clamp(self.config.min_pitch, self.config.max_pitch);
        }
        pitch.clamp(self.config.min_pitch, self.config.max_pitch)
    }
}

/// `value` raised to `min`, else lowered to `max`; tolerates `min > max`.
fn lenient_clamp(value: f32, min: f32, max: f32) -> f32 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // Tiny negative inputs round up to exactly 360.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Critically damped spring step towards `target` (no overshoot).
pub fn smooth_damp(current: f32, target: f32, velocity: &mut f32, smooth_time: f32, dt: f32) -> f32 {
    let omega = 2.0 / smooth_time.max(1e-4);
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let output = target + (change + temp) * decay;

    if (target - current > 0.0) == (output > target) {
        *velocity = 0.0;
        return target;
    }
    output
}

/// Vector form of [`smooth_damp`].
pub fn smooth_damp_vec3(
    current: Vec3,
    target: Vec3,
    velocity: &mut Vec3,
    smooth_time: f32,
    dt: f32,
) -> Vec3 {
    let omega = 2.0 / smooth_time.max(1e-4);
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let output = target + (change + temp) * decay;

    if (target - current).dot(output - target) > 0.0 || current == target {
        *velocity = Vec3::ZERO;
        return target;
    }
    output
}
