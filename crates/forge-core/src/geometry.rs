//! Unit-sized primitive meshes, one per component shape.

use std::f32::consts::{PI, TAU};

use crate::constants::CURVE_SEGMENTS;
use crate::invention::Shape;

/// Indexed triangle mesh, counter-clockwise front faces.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Box 1×1×1, sphere r=1, cylinder and cone r=0.5 h=1.
    pub fn for_shape(shape: Shape) -> Self {
        match shape {
            Shape::Box => Self::unit_box(),
            Shape::Sphere => Self::sphere(1.0, CURVE_SEGMENTS, CURVE_SEGMENTS),
            Shape::Cylinder => Self::cylinder(0.5, 0.5, 1.0, CURVE_SEGMENTS),
            Shape::Cone => Self::cylinder(0.0, 0.5, 1.0, CURVE_SEGMENTS),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned `(min, max)` of the positions.
    pub fn bounds(&self) -> ([f32; 3], [f32; 3]) {
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for p in &self.positions {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        if self.positions.is_empty() {
            return ([0.0; 3], [0.0; 3]);
        }
        (min, max)
    }

    fn unit_box() -> Self {
        // (normal, u axis, v axis) with u × v = normal
        const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ];
        const CORNERS: [(f32, f32); 4] = [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)];

        let mut mesh = Self::default();
        for (n, u, v) in FACES {
            let base = mesh.positions.len() as u32;
            for (cu, cv) in CORNERS {
                mesh.positions.push([
                    n[0] * 0.5 + u[0] * cu + v[0] * cv,
                    n[1] * 0.5 + u[1] * cu + v[1] * cv,
                    n[2] * 0.5 + u[2] * cu + v[2] * cv,
                ]);
                mesh.normals.push(n);
                mesh.uvs.push([cu + 0.5, 0.5 - cv]);
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }

    fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let mut mesh = Self::default();
        let row = width_segments + 1;

        for iy in 0..=height_segments {
            let v = iy as f32 / height_segments as f32;
            for ix in 0..=width_segments {
                let u = ix as f32 / width_segments as f32;
                let normal = [
                    -(u * TAU).cos() * (v * PI).sin(),
                    (v * PI).cos(),
                    (u * TAU).sin() * (v * PI).sin(),
                ];
                mesh.positions
                    .push([normal[0] * radius, normal[1] * radius, normal[2] * radius]);
                mesh.normals.push(normal);
                mesh.uvs.push([u, v]);
            }
        }

        for iy in 0..height_segments {
            for ix in 0..width_segments {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;
                // Poles collapse to a single ring point; skip the degenerate half.
                if iy != 0 {
                    mesh.indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height_segments - 1 {
                    mesh.indices.extend_from_slice(&[b, c, d]);
                }
            }
        }
        mesh
    }

    /// Open-ended tube plus caps. `radius_top = 0` yields a cone.
    fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, radial: u32) -> Self {
        let mut mesh = Self::default();
        let half = height / 2.0;
        let slope = (radius_bottom - radius_top) / height;
        let row = radial + 1;

        for y in 0..=1u32 {
            let v = y as f32;
            let radius = v * (radius_bottom - radius_top) + radius_top;
            for x in 0..=radial {
                let u = x as f32 / radial as f32;
                let (sin, cos) = (u * TAU).sin_cos();
                mesh.positions.push([radius * sin, half - v * height, radius * cos]);
                let len = (1.0 + slope * slope).sqrt();
                mesh.normals.push([sin / len, slope / len, cos / len]);
                mesh.uvs.push([u, v]);
            }
        }

        for x in 0..radial {
            let a = x;
            let b = row + x;
            let c = row + x + 1;
            let d = x + 1;
            if radius_top > 0.0 {
                mesh.indices.extend_from_slice(&[a, b, d]);
            }
            if radius_bottom > 0.0 {
                mesh.indices.extend_from_slice(&[b, c, d]);
            }
        }

        if radius_top > 0.0 {
            mesh.add_cap(radius_top, half, radial);
        }
        if radius_bottom > 0.0 {
            mesh.add_cap(radius_bottom, -half, radial);
        }
        mesh
    }

    fn add_cap(&mut self, radius: f32, y: f32, radial: u32) {
        let sign = if y > 0.0 { 1.0 } else { -1.0 };
        let center = self.positions.len() as u32;
        self.positions.push([0.0, y, 0.0]);
        self.normals.push([0.0, sign, 0.0]);
        self.uvs.push([0.5, 0.5]);

        for x in 0..=radial {
            let (sin, cos) = (x as f32 / radial as f32 * TAU).sin_cos();
            self.positions.push([radius * sin, y, radius * cos]);
            self.normals.push([0.0, sign, 0.0]);
            self.uvs.push([sin * 0.5 + 0.5, cos * 0.5 * sign + 0.5]);
        }

        for x in 0..radial {
            let i = center + 1 + x;
            if sign > 0.0 {
                self.indices.extend_from_slice(&[center, i, i + 1]);
            } else {
                self.indices.extend_from_slice(&[center, i + 1, i]);
            }
        }
    }
}
