use crate::error::{RenderError, Result};
use crate::geometry::transform::{TransformFactory, ndc_to_pixel, pixel_to_ndc};
use nalgebra::{Matrix4, Point2, Point3, Vector3};

/// 深度不大于该值视为位于视点处或视点之后
const EYE_EPSILON: f32 = 1e-6;

/// 相机投影类型
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// 垂直视场角（弧度）
    Perspective { fov_y: f32 },
    /// 视体高度（世界单位）
    Orthographic { view_height: f32 },
}

/// 固定光栅分辨率的透视或正交相机
///
/// 深度为沿观察方向（视图空间 `-z`）的正距离。光栅坐标从图像左上角
/// `(0, 0)` 到右下角 `(width, height)`，像素 `(x, y)` 覆盖 `[x, x + 1) × [y, y + 1)`。
#[derive(Debug, Clone)]
pub struct Camera {
    position: Point3<f32>,
    projection: Projection,
    width: usize,
    height: usize,
    near: f32,
    far: f32,
    view_matrix: Matrix4<f32>,
    inverse_view_matrix: Matrix4<f32>,
}

impl Camera {
    /// 透视相机，参数退化时返回错误
    #[allow(clippy::too_many_arguments)]
    pub fn perspective(
        position: Point3<f32>,
        target: Point3<f32>,
        up: Vector3<f32>,
        fov_y_degrees: f32,
        width: usize,
        height: usize,
        near: f32,
        far: f32,
    ) -> Result<Self> {
        if !(fov_y_degrees > 0.0 && fov_y_degrees < 180.0) {
            return Err(RenderError::InvalidCamera(format!(
                "field of view must be in (0, 180) degrees, got {fov_y_degrees}"
            )));
        }
        if !(near > 0.0) {
            return Err(RenderError::InvalidCamera(format!(
                "perspective near plane must be positive, got {near}"
            )));
        }
        let projection = Projection::Perspective {
            fov_y: fov_y_degrees.to_radians(),
        };
        Self::build(position, target, up, projection, width, height, near, far)
    }

    /// 正交相机，视体高度为 `view_height` 个世界单位
    #[allow(clippy::too_many_arguments)]
    pub fn orthographic(
        position: Point3<f32>,
        target: Point3<f32>,
        up: Vector3<f32>,
        view_height: f32,
        width: usize,
        height: usize,
        near: f32,
        far: f32,
    ) -> Result<Self> {
        if !(view_height > 0.0 && view_height.is_finite()) {
            return Err(RenderError::InvalidCamera(format!(
                "orthographic view height must be positive, got {view_height}"
            )));
        }
        if !(near >= 0.0) {
            return Err(RenderError::InvalidCamera(format!(
                "near plane must not be negative, got {near}"
            )));
        }
        let projection = Projection::Orthographic { view_height };
        Self::build(position, target, up, projection, width, height, near, far)
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        position: Point3<f32>,
        target: Point3<f32>,
        up: Vector3<f32>,
        projection: Projection,
        width: usize,
        height: usize,
        near: f32,
        far: f32,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidCamera(format!(
                "resolution must be non-zero, got {width}x{height}"
            )));
        }
        if !(far.is_finite() && near < far) {
            return Err(RenderError::InvalidCamera(format!(
                "expected near < far with finite far plane, got near={near} far={far}"
            )));
        }

        let forward = (target - position)
            .try_normalize(EYE_EPSILON)
            .ok_or_else(|| RenderError::InvalidCamera("position and target coincide".into()))?;
        let right = forward
            .cross(&up)
            .try_normalize(EYE_EPSILON)
            .ok_or_else(|| RenderError::InvalidCamera("up vector is parallel to the view direction".into()))?;
        let up = right.cross(&forward).normalize();

        let view_matrix = TransformFactory::view(&position, &target, &up);
        let inverse_view_matrix = view_matrix
            .try_inverse()
            .ok_or_else(|| RenderError::InvalidCamera("view matrix is not invertible".into()))?;

        Ok(Self {
            position,
            projection,
            width,
            height,
            near,
            far,
            view_matrix,
            inverse_view_matrix,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// 表示“此处未渲染任何内容”的深度
    pub fn far_plane(&self) -> f32 {
        self.far
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn is_perspective(&self) -> bool {
        matches!(self.projection, Projection::Perspective { .. })
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// `point` 沿观察方向到视点的距离
    pub fn view_depth(&self, point: &Point3<f32>) -> f32 {
        -self.view_matrix.transform_point(point).z
    }

    /// 深度 `depth` 处视体的半宽与半高
    fn half_extents(&self, depth: f32) -> (f32, f32) {
        let half_height = match self.projection {
            Projection::Perspective { fov_y } => (fov_y * 0.5).tan() * depth,
            Projection::Orthographic { view_height } => view_height * 0.5,
        };
        (half_height * self.aspect_ratio(), half_height)
    }

    /// 世界坐标点映射为 `(光栅 x, 光栅 y, 深度)`
    ///
    /// 透视投影下位于视点处或之后的点得到 NaN 光栅坐标，
    /// 后续的包围盒与包含测试会将其排除。
    pub fn project(&self, point: &Point3<f32>) -> Point3<f32> {
        let view = self.view_matrix.transform_point(point);
        let depth = -view.z;

        if self.is_perspective() && depth <= EYE_EPSILON {
            return Point3::new(f32::NAN, f32::NAN, depth);
        }

        let (half_width, half_height) = self.half_extents(depth);
        let pixel = ndc_to_pixel(
            view.x / half_width,
            view.y / half_height,
            self.width as f32,
            self.height as f32,
        );
        Point3::new(pixel.x, pixel.y, depth)
    }

    /// 光栅点加深度映射回世界空间，是 [`Camera::project`] 的逆变换
    pub fn unproject(&self, pixel: &Point2<f32>, depth: f32) -> Point3<f32> {
        let (ndc_x, ndc_y) = pixel_to_ndc(pixel, self.width as f32, self.height as f32);
        let (half_width, half_height) = self.half_extents(depth);
        let view = Point3::new(ndc_x * half_width, ndc_y * half_height, -depth);
        self.inverse_view_matrix.transform_point(&view)
    }

    /// 采样点位于图像内且 `near <= depth < far` 时为 true
    pub fn inside_frustum(&self, pixel: &Point2<f32>, depth: f32) -> bool {
        depth >= self.near
            && depth < self.far
            && pixel.x >= 0.0
            && pixel.y >= 0.0
            && pixel.x < self.width as f32
            && pixel.y < self.height as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn perspective() -> Camera {
        Camera::perspective(
            Point3::new(1.0, 2.0, 5.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::y(),
            60.0,
            160,
            120,
            0.1,
            50.0,
        )
        .unwrap()
    }

    fn orthographic() -> Camera {
        Camera::orthographic(
            Point3::new(0.0, 0.0, 5.0),
            Point3::origin(),
            Vector3::y(),
            4.0,
            100,
            50,
            0.0,
            20.0,
        )
        .unwrap()
    }

    #[test_case(perspective() ; "perspective")]
    #[test_case(orthographic() ; "orthographic")]
    fn unproject_then_project_round_trips(camera: Camera) {
        for &(x, y) in &[(0.5, 0.5), (17.25, 33.5), (80.0, 40.0), (99.5, 49.5)] {
            for &depth in &[0.5, 3.0, 12.75] {
                let pixel = Point2::new(x, y);
                let world = camera.unproject(&pixel, depth);
                let back = camera.project(&world);
                assert!((back.x - x).abs() < 1e-3, "x {x} -> {}", back.x);
                assert!((back.y - y).abs() < 1e-3, "y {y} -> {}", back.y);
                assert!((back.z - depth).abs() < 1e-4, "depth {depth} -> {}", back.z);
                assert!((camera.view_depth(&world) - depth).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn target_projects_to_image_center() {
        let camera = perspective();
        let center = camera.project(&Point3::origin());
        assert!((center.x - 80.0).abs() < 1e-3);
        assert!((center.y - 60.0).abs() < 1e-3);
    }

    #[test]
    fn up_is_up_on_screen() {
        let camera = orthographic();
        let above = camera.project(&Point3::new(0.0, 1.0, 0.0));
        let below = camera.project(&Point3::new(0.0, -1.0, 0.0));
        assert!(above.y < below.y);
    }

    #[test]
    fn points_behind_the_eye_do_not_project() {
        let camera = perspective();
        let behind = camera.project(&Point3::new(2.0, 4.0, 10.0));
        assert!(behind.x.is_nan() && behind.y.is_nan());
        assert!(behind.z < 0.0);
    }

    #[test]
    fn frustum_bounds() {
        let camera = perspective();
        let inside = Point2::new(10.5, 10.5);
        assert!(camera.inside_frustum(&inside, 1.0));
        assert!(!camera.inside_frustum(&inside, 0.05));
        assert!(!camera.inside_frustum(&inside, 50.0));
        assert!(!camera.inside_frustum(&Point2::new(160.0, 10.0), 1.0));
        assert!(!camera.inside_frustum(&Point2::new(-0.1, 10.0), 1.0));
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        let eye = Point3::new(0.0, 0.0, 5.0);
        let origin = Point3::origin();
        assert!(Camera::perspective(eye, origin, Vector3::y(), 60.0, 0, 10, 0.1, 10.0).is_err());
        assert!(Camera::perspective(eye, origin, Vector3::y(), 60.0, 10, 10, 5.0, 1.0).is_err());
        assert!(Camera::perspective(eye, eye, Vector3::y(), 60.0, 10, 10, 0.1, 10.0).is_err());
        assert!(Camera::perspective(eye, origin, Vector3::z(), 60.0, 10, 10, 0.1, 10.0).is_err());
        assert!(Camera::perspective(eye, origin, Vector3::y(), 180.0, 10, 10, 0.1, 10.0).is_err());
        assert!(Camera::orthographic(eye, origin, Vector3::y(), -1.0, 10, 10, 0.0, 10.0).is_err());
    }
}
