//! Dynamic reflection capture.
//!
//! A [`CubeCamera`] renders the reflection layer of the scene into the six faces
//! of its [`CubeRenderTarget`]. Every completed capture bumps the target's
//! generation and publishes it as the scene environment, which physically-lit
//! materials then sample for their ambient lighting.

use cgmath::{Deg, Matrix4, Point3, Vector3};

use crate::{
    camera::{CameraUniform, OPENGL_TO_WGPU_MATRIX},
    config::{ReflectionConfig, Tuning},
    data_structures::scene_graph::Layers,
    render::SceneRenderer,
    scene::{EnvironmentSlot, Scene},
};

/// Faces of a cube map in array-layer order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    /// Array layer of the face in the cube texture.
    pub fn layer(self) -> u32 {
        self as u32
    }

    pub fn direction(self) -> Vector3<f32> {
        match self {
            CubeFace::PositiveX => Vector3::unit_x(),
            CubeFace::NegativeX => -Vector3::unit_x(),
            CubeFace::PositiveY => Vector3::unit_y(),
            CubeFace::NegativeY => -Vector3::unit_y(),
            CubeFace::PositiveZ => Vector3::unit_z(),
            CubeFace::NegativeZ => -Vector3::unit_z(),
        }
    }

    /// Up vector that puts texel row 0 of the face at the top of the render.
    pub fn up(self) -> Vector3<f32> {
        match self {
            CubeFace::PositiveY => -Vector3::unit_z(),
            CubeFace::NegativeY => Vector3::unit_z(),
            _ => Vector3::unit_y(),
        }
    }
}

/// Bookkeeping of the capture texture. The texture itself is owned by the GPU renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CubeRenderTarget {
    pub resolution: u32,
    generation: u64,
}

impl CubeRenderTarget {
    pub fn new(resolution: u32) -> Self {
        Self {
            resolution: resolution.max(1),
            generation: 0,
        }
    }

    /// Number of completed captures. `0` means nothing was captured yet.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/**
 * Six 90° cameras sharing one position, rendering into a [`CubeRenderTarget`].
 *
 * The projection mirrors x: cube maps are addressed from the inside, so a right-handed
 * look-at camera would see every face flipped. Pipelines drawing through a capture
 * face have to swap their front face winding accordingly.
 */
#[derive(Clone, Debug)]
pub struct CubeCamera {
    pub position: Point3<f32>,
    pub near: f32,
    pub far: f32,
    pub layers: Layers,
    target: CubeRenderTarget,
}

impl CubeCamera {
    pub fn new(near: f32, far: f32, target: CubeRenderTarget) -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 0.0),
            near,
            far,
            layers: Layers::REFLECTION,
            target,
        }
    }

    pub fn from_config(config: &ReflectionConfig) -> Self {
        let mut camera = Self::new(
            config.near,
            config.far,
            CubeRenderTarget::new(config.resolution),
        );
        camera.position = config.position.into();
        camera
    }

    pub fn target(&self) -> &CubeRenderTarget {
        &self.target
    }

    pub fn projection(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX
            * Matrix4::from_nonuniform_scale(-1.0, 1.0, 1.0)
            * cgmath::perspective(Deg(90.0), 1.0, self.near, self.far)
    }

    pub fn face_view(&self, face: CubeFace) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.position + face.direction(), face.up())
    }

    pub fn face_view_proj(&self, face: CubeFace) -> Matrix4<f32> {
        self.projection() * self.face_view(face)
    }

    pub fn face_uniform(&self, face: CubeFace) -> CameraUniform {
        CameraUniform::new(self.face_view_proj(face), self.position)
    }

    /**
     * Re-captures the scene and publishes the result as its environment.
     *
     * On error the generation and the published environment stay untouched, so
     * materials keep reading the last complete capture.
     */
    pub fn update<R>(
        &mut self,
        renderer: &mut R,
        scene: &mut Scene,
        tuning: &Tuning,
    ) -> anyhow::Result<()>
    where
        R: SceneRenderer + ?Sized,
    {
        renderer.render_cube(scene, self, tuning)?;
        self.target.generation += 1;
        scene.environment = EnvironmentSlot::Captured {
            generation: self.target.generation,
        };
        log::debug!("Reflection capture {} published", self.target.generation);
        Ok(())
    }
}
