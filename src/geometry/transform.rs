use nalgebra::{Matrix3, Matrix4, Point2, Point3, Rotation3, Unit, Vector3};

/// 渲染器所需变换矩阵的工厂
pub struct TransformFactory;

impl TransformFactory {
    /// 绕任意轴旋转
    pub fn rotation(axis: &Vector3<f32>, angle_rad: f32) -> Matrix4<f32> {
        let axis_unit = Unit::new_normalize(*axis);
        Matrix4::from(Rotation3::from_axis_angle(&axis_unit, angle_rad))
    }

    pub fn rotation_x(angle_rad: f32) -> Matrix4<f32> {
        Matrix4::from_euler_angles(angle_rad, 0.0, 0.0)
    }

    pub fn rotation_y(angle_rad: f32) -> Matrix4<f32> {
        Matrix4::from_euler_angles(0.0, angle_rad, 0.0)
    }

    pub fn rotation_z(angle_rad: f32) -> Matrix4<f32> {
        Matrix4::from_euler_angles(0.0, 0.0, angle_rad)
    }

    pub fn translation(translation: &Vector3<f32>) -> Matrix4<f32> {
        Matrix4::new_translation(translation)
    }

    pub fn scaling_nonuniform(scale: &Vector3<f32>) -> Matrix4<f32> {
        Matrix4::new_nonuniform_scaling(scale)
    }

    /// 世界到视图空间的矩阵，右手系，相机朝向 `-z`
    pub fn view(eye: &Point3<f32>, target: &Point3<f32>, up: &Vector3<f32>) -> Matrix4<f32> {
        Matrix4::look_at_rh(eye, target, up)
    }

    pub fn orthographic(
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    ) -> Matrix4<f32> {
        Matrix4::new_orthographic(left, right, bottom, top, near, far)
    }
}

/// 对点应用齐次变换并除以 `w`
pub fn transform_point(point: &Point3<f32>, matrix: &Matrix4<f32>) -> Point3<f32> {
    let h = matrix * point.to_homogeneous();
    if h.w.abs() > 1e-8 {
        Point3::new(h.x / h.w, h.y / h.w, h.z / h.w)
    } else {
        Point3::new(h.x, h.y, h.z)
    }
}

/// 左上 3x3 块的逆转置矩阵，用于变换法线
pub fn compute_normal_matrix(matrix: &Matrix4<f32>) -> Matrix3<f32> {
    let linear: Matrix3<f32> = matrix.fixed_view::<3, 3>(0, 0).into_owned();
    linear
        .try_inverse()
        .map_or_else(Matrix3::identity, |inv| inv.transpose())
}

/// NDC（`[-1, 1]`，y 向上）转换为光栅坐标（`[0, size]`，y 向下）
#[inline]
pub fn ndc_to_pixel(ndc_x: f32, ndc_y: f32, width: f32, height: f32) -> Point2<f32> {
    Point2::new((ndc_x + 1.0) * 0.5 * width, (1.0 - ndc_y) * 0.5 * height)
}

/// [`ndc_to_pixel`] 的精确逆变换
#[inline]
pub fn pixel_to_ndc(pixel: &Point2<f32>, width: f32, height: f32) -> (f32, f32) {
    (pixel.x / width * 2.0 - 1.0, 1.0 - pixel.y / height * 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ndc_corners_map_to_raster_corners() {
        let top_left = ndc_to_pixel(-1.0, 1.0, 640.0, 480.0);
        let bottom_right = ndc_to_pixel(1.0, -1.0, 640.0, 480.0);
        assert_eq!(top_left, Point2::new(0.0, 0.0));
        assert_eq!(bottom_right, Point2::new(640.0, 480.0));
    }

    #[test]
    fn pixel_to_ndc_inverts_ndc_to_pixel() {
        let pixel = ndc_to_pixel(0.25, -0.75, 320.0, 200.0);
        let (x, y) = pixel_to_ndc(&pixel, 320.0, 200.0);
        assert!((x - 0.25).abs() < 1e-6);
        assert!((y + 0.75).abs() < 1e-6);
    }

    #[test]
    fn normal_matrix_keeps_normals_perpendicular_under_nonuniform_scale() {
        let scale = TransformFactory::scaling_nonuniform(&Vector3::new(2.0, 1.0, 1.0));
        let normal_matrix = compute_normal_matrix(&scale);
        // 平面 x = y 沿 x 缩放后变为 x = 2y，法线需随之变换
        let tangent = scale.transform_vector(&Vector3::new(1.0, 1.0, 0.0));
        let normal = normal_matrix * Vector3::new(1.0, -1.0, 0.0);
        assert!(normal.dot(&tangent).abs() < 1e-6);
    }
}
