use crate::geometry::interpolation::barycentric_coordinates;
use crate::geometry::transform::{TransformFactory, transform_point};
use crate::geometry::triangle::Triangle3D;
use crate::material_system::color::RgbColor;
use crate::material_system::light::Light;
use log::debug;
use nalgebra::{Matrix4, Point2, Point3, Vector3};

/// 查询世界空间位置因阴影损失的光照
///
/// 延迟着色阶段从着色结果中减去该值
pub trait ShadowQuery: Send + Sync {
    fn shadow_factor(&self, position: &Point3<f32>) -> RgbColor;
}

/// 从单个方向光渲染的正交深度图
#[derive(Debug, Clone)]
pub struct ShadowMap {
    /// 光源空间 NDC 深度，按行存储，未绘制处为 `+∞`
    pub depth_buffer: Vec<f32>,
    pub size: usize,
    pub light_view_proj_matrix: Matrix4<f32>,
}

impl ShadowMap {
    /// 从沿 `direction` 照射的光源视角将 `triangles` 渲染为 `size × size` 深度图
    /// `scene_bounds` 为 (中心, 半径)
    pub fn generate(
        triangles: &[Triangle3D],
        direction: &Vector3<f32>,
        scene_bounds: (Point3<f32>, f32),
        size: usize,
    ) -> Self {
        let size = size.max(1);
        let light_view_proj_matrix = Self::light_matrix(direction, scene_bounds);
        let mut map = Self {
            depth_buffer: vec![f32::INFINITY; size * size],
            size,
            light_view_proj_matrix,
        };

        let drawn = triangles
            .iter()
            .filter(|tri| {
                let [v0, v1, v2] = tri
                    .vertices
                    .map(|v| transform_point(&v, &light_view_proj_matrix));
                map.rasterize_caster(v0, v1, v2)
            })
            .count();

        debug!(
            "阴影贴图生成完成: {}x{}，绘制 {} 个遮挡体，剔除 {} 个",
            size,
            size,
            drawn,
            triangles.len() - drawn
        );
        map
    }

    fn light_matrix(
        light_direction: &Vector3<f32>,
        (scene_center, scene_radius): (Point3<f32>, f32),
    ) -> Matrix4<f32> {
        let direction = light_direction
            .try_normalize(1e-6)
            .unwrap_or(-Vector3::y());
        let light_pos = scene_center - direction * scene_radius * 2.0;

        // 光线接近竖直时不能用 y 轴作为上方向
        let up = if direction.y.abs() > 0.9 {
            Vector3::x()
        } else {
            Vector3::y()
        };
        let light_view = TransformFactory::view(&light_pos, &scene_center, &up);

        let ortho_size = scene_radius * 1.2;
        let light_proj = TransformFactory::orthographic(
            -ortho_size,
            ortho_size,
            -ortho_size,
            ortho_size,
            0.1,
            scene_radius * 4.0,
        );

        light_proj * light_view
    }

    #[inline]
    fn ndc_to_map(&self, ndc: f32) -> f32 {
        (ndc + 1.0) * 0.5 * self.size as f32
    }

    /// 写入光源空间三角形的最近深度
    /// 三角形完全位于光源体积之外时返回 false
    fn rasterize_caster(&mut self, v0: Point3<f32>, v1: Point3<f32>, v2: Point3<f32>) -> bool {
        let vertices = [v0, v1, v2];
        let outside = |axis: usize, sign: f32| vertices.iter().all(|v| v[axis] * sign > 1.0);
        if (0..3).any(|axis| outside(axis, 1.0) || outside(axis, -1.0)) {
            return false;
        }

        let screen = vertices.map(|v| Point2::new(self.ndc_to_map(v.x), self.ndc_to_map(v.y)));
        let last = self.size as i32 - 1;
        let min_x = (screen.iter().map(|p| p.x).fold(f32::INFINITY, f32::min).floor() as i32).max(0);
        let max_x = (screen.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max).ceil() as i32).min(last);
        let min_y = (screen.iter().map(|p| p.y).fold(f32::INFINITY, f32::min).floor() as i32).max(0);
        let max_y = (screen.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max).ceil() as i32).min(last);
        if min_x > max_x || min_y > max_y {
            return false;
        }

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let texel = Point2::new(x as f32 + 0.5, y as f32 + 0.5);
                let Some(bary) = barycentric_coordinates(texel, screen[0], screen[1], screen[2])
                else {
                    continue;
                };
                if bary.x < 0.0 || bary.y < 0.0 || bary.z < 0.0 {
                    continue;
                }
                let depth = bary.x * v0.z + bary.y * v1.z + bary.z * v2.z;
                let index = y as usize * self.size + x as usize;
                if depth < self.depth_buffer[index] {
                    self.depth_buffer[index] = depth;
                }
            }
        }
        true
    }

    /// 纹理坐标 `(u, v)`（范围 `[0, 1]`）处存储的深度
    pub fn sample_depth(&self, u: f32, v: f32) -> f32 {
        if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
            return f32::INFINITY;
        }
        let last = self.size - 1;
        let x = ((u * self.size as f32) as usize).min(last);
        let y = ((v * self.size as f32) as usize).min(last);
        self.depth_buffer[y * self.size + x]
    }

    /// 有更靠近光源的物体遮挡 `world_pos` 时为 true
    pub fn is_occluded(&self, world_pos: &Point3<f32>, bias: f32) -> bool {
        let light_space = transform_point(world_pos, &self.light_view_proj_matrix);
        let u = (light_space.x + 1.0) * 0.5;
        let v = (light_space.y + 1.0) * 0.5;
        light_space.z - bias > self.sample_depth(u, v)
    }
}

/// 每个方向光对应一张 [`ShadowMap`]
#[derive(Debug, Clone)]
pub struct ShadowMaps {
    maps: Vec<ShadowMap>,
    strength: f32,
    bias: f32,
}

impl ShadowMaps {
    pub fn build(
        triangles: &[Triangle3D],
        lights: &[Light],
        size: usize,
        strength: f32,
        bias: f32,
    ) -> Self {
        let bounds = scene_bounds(triangles);
        let maps = lights
            .iter()
            .filter_map(|light| match light {
                Light::Directional { direction, .. } => {
                    Some(ShadowMap::generate(triangles, direction, bounds, size))
                }
                _ => None,
            })
            .collect();

        Self {
            maps,
            strength: strength.clamp(0.0, 1.0),
            bias,
        }
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

impl ShadowQuery for ShadowMaps {
    fn shadow_factor(&self, position: &Point3<f32>) -> RgbColor {
        self.maps
            .iter()
            .filter(|map| map.is_occluded(position, self.bias))
            .fold(RgbColor::BLACK, |acc, _| acc + RgbColor::gray(self.strength))
    }
}

/// 包围所有顶点的球的中心和半径
pub fn scene_bounds(triangles: &[Triangle3D]) -> (Point3<f32>, f32) {
    let mut min = Vector3::repeat(f32::INFINITY);
    let mut max = Vector3::repeat(f32::NEG_INFINITY);
    for v in triangles.iter().flat_map(|t| t.vertices.iter()) {
        min = min.inf(&v.coords);
        max = max.sup(&v.coords);
    }
    if triangles.is_empty() {
        return (Point3::origin(), 1.0);
    }
    let center = Point3::from((min + max) * 0.5);
    let radius = ((max - min).norm() * 0.5).max(1e-3);
    (center, radius)
}
