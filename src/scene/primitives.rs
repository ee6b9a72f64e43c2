//! 程序化网格，均以原点为中心，法线朝外，从外部看为逆时针绕序

use crate::material_system::materials::Material;
use crate::scene::scene_object::{Mesh, Vertex};
use nalgebra::{Point3, Vector3};
use std::f32::consts::PI;

impl Mesh {
    /// xz 平面内边长为 `size` 的正方形，朝向 +y
    pub fn plane(size: f32, material: Material) -> Self {
        let h = size * 0.5;
        let n = Vector3::y();
        let vertices = vec![
            Vertex::new(Point3::new(-h, 0.0, -h), n),
            Vertex::new(Point3::new(h, 0.0, -h), n),
            Vertex::new(Point3::new(h, 0.0, h), n),
            Vertex::new(Point3::new(-h, 0.0, h), n),
        ];
        Mesh::new("plane", vertices, vec![0, 2, 1, 0, 3, 2], material)
    }

    /// 给定边长的轴对齐长方体，各面平直着色
    pub fn cuboid(size: Vector3<f32>, material: Material) -> Self {
        let half = size * 0.5;
        let axes: [Vector3<f32>; 6] = [
            Vector3::x(),
            -Vector3::x(),
            Vector3::y(),
            -Vector3::y(),
            Vector3::z(),
            -Vector3::z(),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for n in axes {
            let helper = if n.y.abs() < 0.9 { Vector3::y() } else { Vector3::z() };
            let u = helper.cross(&n);
            let v = n.cross(&u);

            let base = vertices.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let corner = (n + u * su + v * sv).component_mul(&half);
                vertices.push(Vertex::new(Point3::from(corner), n));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Mesh::new("cuboid", vertices, indices, material)
    }

    /// 经纬球，法线平滑
    pub fn uv_sphere(radius: f32, segments: u32, rings: u32, material: Material) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);

        let mut vertices = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);
        for i in 0..=rings {
            let theta = PI * i as f32 / rings as f32;
            // 两极精确收敛到同一点
            let (sin_theta, cos_theta) = match i {
                0 => (0.0, 1.0),
                i if i == rings => (0.0, -1.0),
                _ => theta.sin_cos(),
            };
            for j in 0..=segments {
                let phi = 2.0 * PI * j as f32 / segments as f32;
                let n = Vector3::new(sin_theta * phi.cos(), cos_theta, sin_theta * phi.sin());
                vertices.push(Vertex::new(Point3::from(n * radius), n));
            }
        }

        let stride = segments + 1;
        let mut indices = Vec::with_capacity((rings * segments * 6) as usize);
        for i in 0..rings {
            for j in 0..segments {
                let a = i * stride + j;
                let b = a + stride;
                indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
            }
        }

        Mesh::new("uv_sphere", vertices, indices, material)
    }
}
