use crate::core::fragment::build_fragment;
use crate::core::frame_buffer::GeometryBand;
use crate::core::projector::{calculate_depth, unrasterize};
use crate::geometry::camera::Camera;
use crate::geometry::triangle::{BoundingBox2D, Triangle2D, Triangle3D};
use crate::material_system::materials::Material;
use nalgebra::Point2;

/// 通过投影与裁剪的世界空间三角形，等待扫描转换
#[derive(Debug, Clone, Copy)]
pub struct PreparedTriangle<'a> {
    pub world: Triangle3D,
    pub raster: Triangle2D,
    pub bbox: BoundingBox2D,
    pub material: &'a Material,
}

/// 按顺序在 `band` 所属的行上扫描每个三角形
///
/// 返回通过深度测试的片元数量
pub fn rasterize_band(
    band: &mut GeometryBand<'_>,
    triangles: &[PreparedTriangle<'_>],
    camera: &Camera,
) -> usize {
    if band.rows() == 0 {
        return 0;
    }
    let (first_row, last_row) = (band.first_row, band.last_row());

    triangles
        .iter()
        .filter_map(|triangle| {
            let bbox = triangle.bbox.clip_rows(first_row, last_row)?;
            Some(rasterize_triangle(band, triangle, &bbox, camera))
        })
        .sum()
}

/// 在包围盒内扫描单个三角形
///
/// 每个像素在中心采样。只有严格更近的片元才会替换已存储的片元，
/// 深度相同时保留先绘制的三角形。
fn rasterize_triangle(
    band: &mut GeometryBand<'_>,
    triangle: &PreparedTriangle<'_>,
    bbox: &BoundingBox2D,
    camera: &Camera,
) -> usize {
    let mut written = 0;

    for y in bbox.min.y..=bbox.max.y {
        for x in bbox.min.x..=bbox.max.x {
            let pixel = Point2::new(x as f32 + 0.5, y as f32 + 0.5);
            if !triangle.raster.contains(&pixel) {
                continue;
            }

            let Some(depth) = calculate_depth(camera, &triangle.raster, &pixel) else {
                continue;
            };
            if !camera.inside_frustum(&pixel, depth) {
                continue;
            }

            let (px, py) = (x as usize, y as usize);
            if !(depth < band.depth_at(px, py)) {
                continue;
            }

            let pixel_world = unrasterize(camera, &pixel, depth);
            let fragment = build_fragment(
                &triangle.world,
                &pixel_world,
                &triangle.raster,
                &pixel,
                triangle.material,
            );
            band.write(px, py, depth, &fragment);
            written += 1;
        }
    }

    written
}
