use crate::geometry::interpolation::{barycentric_coordinates_3d, normalize_weights};
use crate::geometry::triangle::{Triangle2D, Triangle3D};
use crate::material_system::color::RgbColor;
use crate::material_system::materials::Material;
use nalgebra::{Point2, Point3, Vector3};

/// 着色阶段读取的逐像素属性
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub position: Point3<f32>,
    pub color: RgbColor,
    pub diffuse: RgbColor,
    pub specular: RgbColor,
    pub normal: Vector3<f32>,
}

/// 在单个像素处插值 `triangle_world` 的属性
///
/// 权重取 `pixel_world` 在世界空间三角形中的重心坐标，即透视校正插值。
/// 世界空间三角形退化时退回到光栅空间的权重。
pub fn build_fragment(
    triangle_world: &Triangle3D,
    pixel_world: &Point3<f32>,
    triangle_raster: &Triangle2D,
    pixel_raster: &Point2<f32>,
    material: &Material,
) -> Fragment {
    let [v0, v1, v2] = &triangle_world.vertices;
    let weights = barycentric_coordinates_3d(pixel_world, v0, v1, v2)
        .or_else(|| triangle_raster.barycentric(pixel_raster))
        .map(normalize_weights)
        .unwrap_or_else(|| Vector3::repeat(1.0 / 3.0));

    let blend = |values: [Vector3<f32>; 3]| {
        values[0] * weights.x + values[1] * weights.y + values[2] * weights.z
    };

    let normal = blend(triangle_world.normals)
        .try_normalize(1e-6)
        .or_else(|| triangle_world.face_normal())
        .unwrap_or_else(Vector3::z);
    let tint = RgbColor::from_vector(&blend(triangle_world.colors.map(RgbColor::to_vector)));

    Fragment {
        position: *pixel_world,
        color: tint.component_mul(material.color),
        diffuse: tint.component_mul(material.diffuse),
        specular: material.specular,
        normal,
    }
}
