use crate::geometry::transform::{TransformFactory, compute_normal_matrix};
use crate::geometry::triangle::Triangle3D;
use crate::material_system::color::RgbColor;
use crate::material_system::materials::Material;
use log::warn;
use nalgebra::{Matrix4, Point3, Vector3};

/// 光栅化器可绘制的物体：材质加世界空间三角形
pub trait SceneObject: Send + Sync {
    /// 世界空间三角形，顺序固定
    fn triangles(&self) -> Vec<Triangle3D>;

    fn material(&self) -> &Material;

    fn name(&self) -> &str {
        "object"
    }
}

/// 物体空间中的网格顶点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
    /// 与材质颜色相乘的色调
    pub color: RgbColor,
}

impl Vertex {
    pub fn new(position: Point3<f32>, normal: Vector3<f32>) -> Self {
        Self {
            position,
            normal,
            color: RgbColor::WHITE,
        }
    }
}

/// 带模型变换的索引三角形网格
#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    /// 每个三角形三个索引
    pub indices: Vec<u32>,
    pub material: Material,
    /// 物体到世界空间的矩阵
    pub transform: Matrix4<f32>,
    pub name: String,
}

impl Mesh {
    pub fn new(
        name: impl Into<String>,
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
        material: Material,
    ) -> Self {
        Self {
            vertices,
            indices,
            material,
            transform: Matrix4::identity(),
            name: name.into(),
        }
    }

    /// 先缩放，再依次绕局部 x、y、z 轴旋转，最后平移
    pub fn with_transform_components(
        mut self,
        position: Point3<f32>,
        euler_angles_rad: Vector3<f32>,
        scale: Vector3<f32>,
    ) -> Self {
        let s_matrix = TransformFactory::scaling_nonuniform(&scale);
        let rx_matrix = TransformFactory::rotation_x(euler_angles_rad.x);
        let ry_matrix = TransformFactory::rotation_y(euler_angles_rad.y);
        let rz_matrix = TransformFactory::rotation_z(euler_angles_rad.z);
        let t_matrix = TransformFactory::translation(&position.coords);

        self.transform = t_matrix * rz_matrix * ry_matrix * rx_matrix * s_matrix;
        self
    }

    /// 在当前变换之后绕经过物体原点的 `axis` 旋转
    pub fn rotated(mut self, axis: &Vector3<f32>, angle_rad: f32) -> Self {
        self.transform *= TransformFactory::rotation(axis, angle_rad);
        self
    }

    /// 将所有顶点设为同一色调
    pub fn with_vertex_color(mut self, color: RgbColor) -> Self {
        for v in &mut self.vertices {
            v.color = color;
        }
        self
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

impl SceneObject for Mesh {
    fn triangles(&self) -> Vec<Triangle3D> {
        let normal_matrix = compute_normal_matrix(&self.transform);
        let world: Vec<Vertex> = self
            .vertices
            .iter()
            .map(|v| Vertex {
                position: self.transform.transform_point(&v.position),
                normal: (normal_matrix * v.normal)
                    .try_normalize(1e-12)
                    .unwrap_or(v.normal),
                color: v.color,
            })
            .collect();

        let mut skipped = 0;
        let triangles: Vec<Triangle3D> = self
            .indices
            .chunks_exact(3)
            .filter_map(|idx| {
                let fetch = |i: u32| world.get(i as usize).copied();
                match (fetch(idx[0]), fetch(idx[1]), fetch(idx[2])) {
                    (Some(a), Some(b), Some(c)) => Some(
                        Triangle3D::new(
                            [a.position, b.position, c.position],
                            [a.normal, b.normal, c.normal],
                        )
                        .with_colors([a.color, b.color, c.color]),
                    ),
                    _ => {
                        skipped += 1;
                        None
                    }
                }
            })
            .collect();

        if skipped > 0 {
            warn!(
                "网格 '{}': 跳过 {} 个索引越界的三角形",
                self.name, skipped
            );
        }
        triangles
    }

    fn material(&self) -> &Material {
        &self.material
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 单个世界空间三角形
#[derive(Debug, Clone)]
pub struct TriangleObject {
    pub triangle: Triangle3D,
    pub material: Material,
}

impl TriangleObject {
    pub fn new(triangle: Triangle3D, material: Material) -> Self {
        Self { triangle, material }
    }
}

impl SceneObject for TriangleObject {
    fn triangles(&self) -> Vec<Triangle3D> {
        vec![self.triangle]
    }

    fn material(&self) -> &Material {
        &self.material
    }

    fn name(&self) -> &str {
        "triangle"
    }
}
