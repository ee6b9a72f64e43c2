use crate::core::fragment::Fragment;
use crate::geometry::camera::Camera;
use crate::material_system::color::RgbColor;
use crate::material_system::light::Light;
use nalgebra::Vector3;
use std::fmt::Debug;

/// 场景物体的表面材质
/// 几何阶段逐像素混合进 [`Fragment`]，之后不再读取
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// 基础颜色（反照率）
    pub color: RgbColor,
    /// 漫反射率，着色器中与基础颜色相乘
    pub diffuse: RgbColor,
    /// 镜面反射率
    pub specular: RgbColor,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: RgbColor::gray(0.8),
            diffuse: RgbColor::WHITE,
            specular: RgbColor::gray(0.5),
        }
    }
}

impl Material {
    /// 无高光的纯漫反射材质
    pub fn solid(color: RgbColor) -> Self {
        Self {
            color,
            diffuse: RgbColor::WHITE,
            specular: RgbColor::BLACK,
        }
    }

    pub fn with_diffuse(mut self, diffuse: RgbColor) -> Self {
        self.diffuse = diffuse;
        self
    }

    pub fn with_specular(mut self, specular: RgbColor) -> Self {
        self.specular = specular;
        self
    }
}

/// 延迟着色阶段对每个被覆盖像素调用一次的光照模型
pub trait Shader: Send + Sync + Debug {
    fn shade(&self, lights: &[Light], camera: &Camera, fragment: &Fragment) -> RgbColor;
}

/// 包含环境光、漫反射和镜面反射项的 Blinn-Phong 模型
///
/// 场景没有任何光源时不做光照，直接返回片元的基础颜色
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlinnPhongShader {
    pub shininess: f32,
}

impl Default for BlinnPhongShader {
    fn default() -> Self {
        Self { shininess: 32.0 }
    }
}

impl Shader for BlinnPhongShader {
    fn shade(&self, lights: &[Light], camera: &Camera, fragment: &Fragment) -> RgbColor {
        if lights.is_empty() {
            return fragment.color;
        }

        let position = fragment.position;
        let normal = fragment.normal.try_normalize(1e-6);
        let view_dir = (camera.position() - position)
            .try_normalize(1e-6)
            .unwrap_or_else(Vector3::z);
        let albedo = fragment.color.component_mul(fragment.diffuse);

        lights.iter().fold(RgbColor::BLACK, |acc, light| {
            let intensity = light.intensity_at(&position);
            let (Some(normal), Some(light_dir)) = (normal, light.direction_to_light(&position))
            else {
                return match light {
                    Light::Ambient { .. } => acc + fragment.color.component_mul(intensity),
                    _ => acc,
                };
            };

            let n_dot_l = normal.dot(&light_dir);
            if n_dot_l <= 0.0 {
                return acc;
            }

            let diffuse = albedo * n_dot_l;
            let halfway = (light_dir + view_dir)
                .try_normalize(1e-6)
                .unwrap_or(normal);
            let n_dot_h = normal.dot(&halfway).max(0.0);
            let specular = fragment.specular * n_dot_h.powf(self.shininess);

            acc + (diffuse + specular).component_mul(intensity)
        })
    }
}
