//! Procedural geometry for the built-in scene objects.
//!
//! Both shapes follow the parameterisation common to WebGL scene libraries so
//! that the same numbers produce the same shapes: a torus lying in the XY plane
//! around the Z axis and a (p, q) torus knot.

use std::f32::consts::TAU;

use cgmath::{InnerSpace, Vector3};

use crate::data_structures::model::{Geometry, ModelVertex};

/// Ring of `radius` around the Z axis with a tube of radius `tube`.
pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Geometry {
    let radial_segments = radial_segments.max(3);
    let tubular_segments = tubular_segments.max(3);
    let mut vertices =
        Vec::with_capacity(((radial_segments + 1) * (tubular_segments + 1)) as usize);

    for j in 0..=radial_segments {
        for i in 0..=tubular_segments {
            let u = i as f32 / tubular_segments as f32 * TAU;
            let v = j as f32 / radial_segments as f32 * TAU;

            let position = Vector3::new(
                (radius + tube * v.cos()) * u.cos(),
                (radius + tube * v.cos()) * u.sin(),
                tube * v.sin(),
            );
            let center = Vector3::new(radius * u.cos(), radius * u.sin(), 0.0);
            let normal = (position - center).normalize();

            vertices.push(ModelVertex {
                position: position.into(),
                tex_coords: [
                    i as f32 / tubular_segments as f32,
                    j as f32 / radial_segments as f32,
                ],
                normal: normal.into(),
            });
        }
    }

    let mut indices = Vec::with_capacity((radial_segments * tubular_segments * 6) as usize);
    for j in 1..=radial_segments {
        for i in 1..=tubular_segments {
            let a = (tubular_segments + 1) * j + i - 1;
            let b = (tubular_segments + 1) * (j - 1) + i - 1;
            let c = (tubular_segments + 1) * (j - 1) + i;
            let d = (tubular_segments + 1) * j + i;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    Geometry::new("torus", vertices, indices)
}

/// Point on the knot's centre curve at parameter `u`.
fn knot_curve(u: f32, p: f32, q: f32, radius: f32) -> Vector3<f32> {
    let qu_over_p = q / p * u;
    let cs = qu_over_p.cos();
    Vector3::new(
        radius * (2.0 + cs) * 0.5 * u.cos(),
        radius * (2.0 + cs) * u.sin() * 0.5,
        radius * qu_over_p.sin() * 0.5,
    )
}

/// Tube of radius `tube` swept along a (p, q) torus knot.
pub fn torus_knot(
    radius: f32,
    tube: f32,
    tubular_segments: u32,
    radial_segments: u32,
    p: u32,
    q: u32,
) -> Geometry {
    let tubular_segments = tubular_segments.max(3);
    let radial_segments = radial_segments.max(3);
    let (p, q) = (p.max(1) as f32, q as f32);
    let mut vertices =
        Vec::with_capacity(((radial_segments + 1) * (tubular_segments + 1)) as usize);

    for i in 0..=tubular_segments {
        let u = i as f32 / tubular_segments as f32 * p * TAU;
        let p1 = knot_curve(u, p, q, radius);
        let p2 = knot_curve(u + 0.01, p, q, radius);

        // Frenet-like frame: tangent, then binormal and normal around it
        let tangent = p2 - p1;
        let bitangent = tangent.cross(p2 + p1).normalize();
        let normal = bitangent.cross(tangent).normalize();

        for j in 0..=radial_segments {
            let v = j as f32 / radial_segments as f32 * TAU;
            let cx = -tube * v.cos();
            let cy = tube * v.sin();

            let position = p1 + normal * cx + bitangent * cy;
            vertices.push(ModelVertex {
                position: position.into(),
                tex_coords: [
                    i as f32 / tubular_segments as f32,
                    j as f32 / radial_segments as f32,
                ],
                normal: (position - p1).normalize().into(),
            });
        }
    }

    let mut indices = Vec::with_capacity((radial_segments * tubular_segments * 6) as usize);
    for j in 1..=tubular_segments {
        for i in 1..=radial_segments {
            let a = (radial_segments + 1) * (j - 1) + (i - 1);
            let b = (radial_segments + 1) * j + (i - 1);
            let c = (radial_segments + 1) * j + i;
            let d = (radial_segments + 1) * (j - 1) + i;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    Geometry::new("torus_knot", vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn torus_vertices_sit_on_the_tube() {
        let geometry = torus(8.0, 0.5, 12, 48);
        assert_eq!(geometry.vertices.len(), 13 * 49);
        assert_eq!(geometry.indices.len(), 12 * 48 * 6);

        for vertex in &geometry.vertices {
            let p = Vector3::from(vertex.position);
            let ring = Vector3::new(p.x, p.y, 0.0).normalize() * 8.0;
            assert_relative_eq!((p - ring).magnitude(), 0.5, epsilon = 1e-4);
            assert_relative_eq!(Vector3::from(vertex.normal).magnitude(), 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn torus_knot_indices_stay_in_range() {
        let geometry = torus_knot(1.0, 0.4, 100, 16, 2, 3);
        assert_eq!(geometry.vertices.len(), 101 * 17);
        assert_eq!(geometry.indices.len(), 100 * 16 * 6);
        let max = *geometry.indices.iter().max().unwrap() as usize;
        assert!(max < geometry.vertices.len());
    }

    #[test]
    fn torus_knot_normals_point_away_from_the_curve() {
        let geometry = torus_knot(1.0, 0.4, 64, 8, 2, 3);
        for vertex in &geometry.vertices {
            assert_relative_eq!(Vector3::from(vertex.normal).magnitude(), 1.0, epsilon = 1e-4);
        }
    }
}
