//! Perspective camera, its GPU uniform and damped orbit controls.

use cgmath::{InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

use crate::{config::{CameraConfig, ControlsConfig}, data_structures::scene_graph::Layers};

/// cgmath produces OpenGL clip space (z in -1..1), wgpu expects z in 0..1.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Clone, Debug)]
pub struct PerspectiveCamera {
    pub position: Point3<f32>,
    /// Point the camera looks at.
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view.
    pub fovy: Rad<f32>,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
    pub layers: Layers,
    projection: Matrix4<f32>,
}

impl PerspectiveCamera {
    pub fn new(fovy: impl Into<Rad<f32>>, aspect: f32, znear: f32, zfar: f32) -> Self {
        let mut camera = Self {
            position: Point3::new(0.0, 0.0, 0.0),
            target: Point3::new(0.0, 0.0, -1.0),
            up: Vector3::unit_y(),
            fovy: fovy.into(),
            aspect,
            znear,
            zfar,
            layers: Layers::DEFAULT,
            projection: Matrix4::identity(),
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        let mut camera = Self::new(cgmath::Deg(config.fov), aspect, config.near, config.far);
        camera.position = config.position.into();
        camera
    }

    /// Must be called after changing `fovy`, `aspect`, `znear` or `zfar`.
    pub fn update_projection_matrix(&mut self) {
        self.projection =
            OPENGL_TO_WGPU_MATRIX
                * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar);
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection * self.view_matrix()
    }

    pub fn to_uniform(&self) -> CameraUniform {
        CameraUniform::new(self.view_projection(), self.position)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_proj: [[f32; 4]; 4],
    /// Used by the background pass to turn pixels back into view directions.
    inv_view_proj: [[f32; 4]; 4],
    // vec4 for the 16 byte uniform alignment
    view_position: [f32; 4],
}

impl CameraUniform {
    pub fn new(view_proj: Matrix4<f32>, position: Point3<f32>) -> Self {
        let inv_view_proj = view_proj.invert().unwrap_or_else(|| {
            log::warn!("Camera view-projection is not invertible");
            Matrix4::identity()
        });
        Self {
            view_proj: view_proj.into(),
            inv_view_proj: inv_view_proj.into(),
            view_position: [position.x, position.y, position.z, 1.0],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Spherical {
    radius: f32,
    /// Polar angle from +Y.
    phi: f32,
    /// Azimuth around +Y, measured from +Z.
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius == 0.0 {
            return Self {
                radius,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum DragState {
    None,
    Rotate,
    Pan,
}

/**
 * Orbit-style camera controls around a target point.
 *
 * Input handlers only accumulate pending motion; [`update`](Self::update) applies it once
 * per frame. With damping enabled only a fraction of the pending motion is applied each
 * frame and the rest decays, which gives the camera its inertia.
 */
#[derive(Clone, Debug)]
pub struct OrbitControls {
    pub target: Point3<f32>,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    spherical_delta: Spherical,
    pan_offset: Vector3<f32>,
    scale: f32,
    drag: DragState,
    cursor: Option<(f64, f64)>,
    viewport_height: f32,
}

impl OrbitControls {
    /// Keeps the camera away from the poles where the orbit degenerates.
    const EPS: f32 = 1e-6;

    pub fn from_config(config: &ControlsConfig) -> Self {
        Self {
            target: config.target.into(),
            enable_damping: config.enable_damping,
            damping_factor: config.damping_factor,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            pan_speed: config.pan_speed,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            spherical_delta: Spherical {
                radius: 0.0,
                phi: 0.0,
                theta: 0.0,
            },
            pan_offset: Vector3::new(0.0, 0.0, 0.0),
            scale: 1.0,
            drag: DragState::None,
            cursor: None,
            viewport_height: 1.0,
        }
    }

    /// Height of the area the pointer moves over, in the units of cursor events.
    pub fn set_viewport_height(&mut self, height: f32) {
        self.viewport_height = height.max(1.0);
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.spherical_delta.theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.spherical_delta.phi -= angle;
    }

    /// Scales the orbit radius by `dolly_scale` (below 1 moves closer).
    pub fn dolly_in(&mut self, dolly_scale: f32) {
        self.scale *= dolly_scale;
    }

    pub fn dolly_out(&mut self, dolly_scale: f32) {
        self.scale /= dolly_scale;
    }

    /// Pans by a pointer delta in the units of cursor events.
    pub fn pan(&mut self, dx: f32, dy: f32, camera: &PerspectiveCamera) {
        let offset = camera.position - camera.target;
        // distance covered by half the viewport height at the target's depth
        let target_distance = offset.magnitude() * (camera.fovy.0 / 2.0).tan();
        let view = camera.view_matrix();
        // rows of the view rotation are the camera axes in world space
        let right = Vector3::new(view.x.x, view.y.x, view.z.x);
        let up = Vector3::new(view.x.y, view.y.y, view.z.y);
        let per_pixel = 2.0 * target_distance / self.viewport_height * self.pan_speed;
        self.pan_offset += right * (-dx * per_pixel) + up * (dy * per_pixel);
    }

    fn zoom_scale(&self) -> f32 {
        0.95f32.powf(self.zoom_speed)
    }

    /// Feeds winit window events into the controls. `camera` is needed for panning.
    pub fn handle_window_events(&mut self, event: &WindowEvent, camera: &PerspectiveCamera) {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                self.drag = match (state, button) {
                    (ElementState::Pressed, MouseButton::Left) => DragState::Rotate,
                    (ElementState::Pressed, MouseButton::Right) => DragState::Pan,
                    (ElementState::Pressed, MouseButton::Middle) => DragState::Pan,
                    (ElementState::Released, _) => DragState::None,
                    _ => self.drag,
                };
            }
            WindowEvent::CursorMoved { position, .. } => {
                let current = (position.x, position.y);
                if let Some((x, y)) = self.cursor {
                    let (dx, dy) = ((current.0 - x) as f32, (current.1 - y) as f32);
                    match self.drag {
                        DragState::Rotate => {
                            let full_turn = std::f32::consts::TAU / self.viewport_height;
                            self.rotate_left(full_turn * dx * self.rotate_speed);
                            self.rotate_up(full_turn * dy * self.rotate_speed);
                        }
                        DragState::Pan => self.pan(dx, dy, camera),
                        DragState::None => (),
                    }
                }
                self.cursor = Some(current);
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.drag = DragState::None;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let notches = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / 100.0) as f32,
                };
                if notches > 0.0 {
                    self.dolly_in(self.zoom_scale().powf(notches));
                } else if notches < 0.0 {
                    self.dolly_out(self.zoom_scale().powf(-notches));
                }
            }
            _ => (),
        }
    }

    /**
     * Applies pending motion to `camera` and makes it look at the target.
     *
     * Returns whether the camera moved noticeably.
     */
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let offset = camera.position - self.target;
        let mut spherical = Spherical::from_offset(offset);

        let apply = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        spherical.theta += self.spherical_delta.theta * apply;
        spherical.phi += self.spherical_delta.phi * apply;
        spherical.phi = spherical
            .phi
            .clamp(Self::EPS, std::f32::consts::PI - Self::EPS);
        spherical.radius =
            (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        self.target += self.pan_offset * apply;

        let old_position = camera.position;
        camera.position = self.target + spherical.to_offset();
        camera.target = self.target;

        if self.enable_damping {
            self.spherical_delta.theta *= 1.0 - self.damping_factor;
            self.spherical_delta.phi *= 1.0 - self.damping_factor;
            self.pan_offset *= 1.0 - self.damping_factor;
        } else {
            self.spherical_delta.theta = 0.0;
            self.spherical_delta.phi = 0.0;
            self.pan_offset = Vector3::new(0.0, 0.0, 0.0);
        }
        self.scale = 1.0;

        (camera.position - old_position).magnitude2() > Self::EPS
    }
}
