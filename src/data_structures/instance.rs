//! Transform data for scene nodes and its GPU representation.
//!
//! Every node carries a local [`Instance`] (position, rotation, scale). World
//! transforms are obtained by multiplying parent and child instances, and the
//! result is packed into an [`InstanceRaw`] vertex buffer so the shaders get
//! the model and normal matrices per draw.

use std::ops::Mul;

use cgmath::{Matrix, One, Rotation3, SquareMatrix};

use crate::data_structures::model;

/// Position, rotation (as quaternion) and scale of a node.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn with_position(mut self, position: impl Into<cgmath::Vector3<f32>>) -> Self {
        self.position = position.into();
        self
    }

    pub fn with_scale(mut self, scale: impl Into<cgmath::Vector3<f32>>) -> Self {
        self.scale = scale.into();
        self
    }

    pub fn with_rotation_y(mut self, angle: f32) -> Self {
        self.rotation = cgmath::Quaternion::from_angle_y(cgmath::Rad(angle));
        self
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    /// Inverse-transpose of the linear part of [`Instance::to_matrix`].
    ///
    /// Degenerate (zero) scales have no inverse and fall back to the rotation.
    pub fn normal_matrix(&self) -> cgmath::Matrix3<f32> {
        let m = self.to_matrix();
        let linear = cgmath::Matrix3::from_cols(m.x.truncate(), m.y.truncate(), m.z.truncate());
        linear
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or_else(|| cgmath::Matrix3::from(self.rotation))
    }

    pub fn to_raw(&self) -> InstanceRaw {
        let world_matrix = self.to_matrix();
        let handedness = world_matrix.determinant().signum();
        InstanceRaw {
            model: world_matrix.into(),
            normal: self.normal_matrix().into(),
            handedness,
        }
    }
}

impl<'a, 'b> Mul<&'b Instance> for &'a Instance {
    type Output = Instance;

    fn mul(self, rhs: &'b Instance) -> Self::Output {
        let new_rotation = self.rotation * rhs.rotation;

        let new_scale = cgmath::Vector3::new(
            self.scale.x * rhs.scale.x,
            self.scale.y * rhs.scale.y,
            self.scale.z * rhs.scale.z,
        );
        let scaled_rhs_pos = cgmath::Vector3::new(
            self.scale.x * rhs.position.x,
            self.scale.y * rhs.position.y,
            self.scale.z * rhs.position.z,
        );
        let new_position = self.position + (self.rotation * scaled_rhs_pos);

        Instance {
            position: new_position,
            rotation: new_rotation,
            scale: new_scale,
        }
    }
}

impl Mul<Instance> for Instance {
    type Output = Self;

    fn mul(self, rhs: Instance) -> Self::Output {
        &self * &rhs
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/**
 * The raw instance is the actual data stored on the GPU
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
    handedness: f32,
}

/**
 * As we store vertex data directly in the GPU memory we need to tell what the bytes refer to:
 *
 * offset: zero as we want to use the full space.
 * stride: length of an instance
 *
 * Stride layout here: position + rotation + scale as 4x4 matrix (hence the four 4d vectors),
 * followed by the 3x3 normal matrix and the handedness of the transform.
 */
impl model::Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            // The shaders only advance to the next element once a new instance starts
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                // A mat4 takes up 4 vertex slots as it is technically 4 vec4s.
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 19]>() as wgpu::BufferAddress,
                    shader_location: 10,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 22]>() as wgpu::BufferAddress,
                    shader_location: 11,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 25]>() as wgpu::BufferAddress,
                    shader_location: 12,
                    format: wgpu::VertexFormat::Float32,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn parent_scale_and_rotation_apply_to_child_position() {
        let parent = Instance::new()
            .with_position([1.0, 0.0, 0.0])
            .with_scale([2.0, 2.0, 2.0])
            .with_rotation_y(std::f32::consts::FRAC_PI_2);
        let child = Instance::new().with_position([1.0, 0.0, 0.0]);

        let world = &parent * &child;

        // (1,0,0) scaled to (2,0,0), turned a quarter about +Y to (0,0,-2)
        assert_relative_eq!(world.position.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(world.position.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(world.position.z, -2.0, epsilon = 1e-5);
        assert_relative_eq!(world.scale.x, 2.0);
    }

    #[test]
    fn normals_stay_perpendicular_under_nonuniform_scale() {
        use cgmath::InnerSpace;

        let raw = Instance::new()
            .with_scale([1.0, 4.0, 1.0])
            .with_rotation_y(0.3)
            .to_raw();
        let model = cgmath::Matrix4::from(raw.model);
        let normal_matrix = cgmath::Matrix3::from(raw.normal);

        // the plane x + y = 0
        let normal = normal_matrix * cgmath::Vector3::new(1.0, 1.0, 0.0).normalize();
        let tangent = (model * cgmath::Vector4::new(1.0, -1.0, 0.0, 0.0)).truncate();

        assert_relative_eq!(normal.dot(tangent), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn uniform_transforms_keep_the_rotation_as_normal_matrix() {
        let instance = Instance::new().with_rotation_y(1.2);
        let expected: [[f32; 3]; 3] = cgmath::Matrix3::from(instance.rotation).into();
        let actual: [[f32; 3]; 3] = instance.normal_matrix().into();
        for (column, expected) in actual.iter().zip(expected) {
            for (value, expected) in column.iter().zip(expected) {
                assert_relative_eq!(*value, expected, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn zero_scale_falls_back_to_the_rotation() {
        let instance = Instance::new().with_scale([0.0, 1.0, 1.0]);
        assert_eq!(instance.normal_matrix(), cgmath::Matrix3::from(instance.rotation));
    }

    #[test]
    fn mirrored_scale_flips_handedness() {
        let raw = Instance::new().with_scale([-1.0, 1.0, 1.0]).to_raw();
        assert_eq!(raw.handedness, -1.0);
        assert_eq!(Instance::new().to_raw().handedness, 1.0);
    }
}
