//! 三角形与像素在世界空间和光栅空间之间的映射

use crate::geometry::camera::Camera;
use crate::geometry::interpolation::interpolate_depth;
use crate::geometry::triangle::{Triangle2D, Triangle3D};
use nalgebra::{Point2, Point3};

/// 将世界空间三角形的三个顶点投影到光栅空间
pub fn rasterize(camera: &Camera, triangle_world: &Triangle3D) -> Triangle2D {
    let projected = triangle_world.vertices.map(|v| camera.project(&v));
    Triangle2D {
        vertices: projected.map(|p| Point2::new(p.x, p.y)),
        depths: projected.map(|p| p.z),
    }
}

/// 将深度为 `depth` 的光栅点映射回世界空间
#[inline]
pub fn unrasterize(camera: &Camera, pixel_raster: &Point2<f32>, depth: f32) -> Point3<f32> {
    camera.unproject(pixel_raster, depth)
}

/// 三角形表面在 `pixel_raster` 处的深度
pub fn calculate_depth(
    camera: &Camera,
    triangle_raster: &Triangle2D,
    pixel_raster: &Point2<f32>,
) -> Option<f32> {
    let bary = triangle_raster.barycentric(pixel_raster)?;
    interpolate_depth(bary, triangle_raster.depths, camera.is_perspective())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn camera() -> Camera {
        Camera::perspective(
            Point3::new(0.0, 0.0, 4.0),
            Point3::origin(),
            Vector3::y(),
            90.0,
            64,
            64,
            0.1,
            100.0,
        )
        .unwrap()
    }

    #[test]
    fn interpolated_depth_reconstructs_points_on_the_triangle_plane() {
        let camera = camera();
        // 倾斜三角形，透视校正深度才有意义
        let tri = Triangle3D::flat([
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(1.0, -1.0, -3.0),
            Point3::new(0.0, 1.0, -1.0),
        ]);
        let raster = rasterize(&camera, &tri);
        let normal = tri.face_normal().unwrap();
        let bbox = raster.bbox(camera.width(), camera.height()).unwrap();

        let mut checked = 0;
        for y in bbox.min.y..=bbox.max.y {
            for x in bbox.min.x..=bbox.max.x {
                let pixel = Point2::new(x as f32 + 0.5, y as f32 + 0.5);
                if !raster.contains(&pixel) {
                    continue;
                }
                let depth = calculate_depth(&camera, &raster, &pixel).unwrap();
                let world = unrasterize(&camera, &pixel, depth);
                let distance_to_plane = (world - tri.vertices[0]).dot(&normal);
                assert!(distance_to_plane.abs() < 1e-3, "pixel ({x}, {y})");
                checked += 1;
            }
        }
        assert!(checked > 50);
    }

    #[test]
    fn vertex_depths_are_view_distances() {
        let camera = camera();
        let tri = Triangle3D::flat([
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, -1.0),
            Point3::new(0.0, 1.0, 1.0),
        ]);
        let raster = rasterize(&camera, &tri);
        assert!((raster.depths[0] - 4.0).abs() < 1e-5);
        assert!((raster.depths[1] - 5.0).abs() < 1e-5);
        assert!((raster.depths[2] - 3.0).abs() < 1e-5);
    }

    #[test]
    fn triangle_behind_camera_yields_no_bbox() {
        let camera = camera();
        let behind = Triangle3D::flat([
            Point3::new(0.0, 0.0, 6.0),
            Point3::new(1.0, 0.0, 6.0),
            Point3::new(0.0, 1.0, 6.0),
        ]);
        let raster = rasterize(&camera, &behind);
        assert!(raster.bbox(camera.width(), camera.height()).is_none());
    }
}
