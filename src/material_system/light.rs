use crate::material_system::color::RgbColor;
use nalgebra::{Point3, Vector3};

/// 着色阶段支持的光源类型
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    /// 均匀叠加到所有可见表面的环境光
    Ambient { intensity: RgbColor },
    /// 平行光，`direction` 为光线传播方向
    Directional {
        direction: Vector3<f32>,
        intensity: RgbColor,
    },
    /// 点光源，按 (常数, 一次, 二次) 系数随距离衰减
    Point {
        position: Point3<f32>,
        intensity: RgbColor,
        attenuation: (f32, f32, f32),
    },
}

impl Light {
    pub fn ambient(intensity: RgbColor) -> Self {
        Light::Ambient { intensity }
    }

    pub fn directional(direction: Vector3<f32>, intensity: RgbColor) -> Self {
        Light::Directional {
            direction: direction.try_normalize(1e-6).unwrap_or(-Vector3::y()),
            intensity,
        }
    }

    pub fn point(
        position: Point3<f32>,
        intensity: RgbColor,
        attenuation: Option<(f32, f32, f32)>,
    ) -> Self {
        Light::Point {
            position,
            intensity,
            attenuation: attenuation.unwrap_or((1.0, 0.1, 0.01)),
        }
    }

    /// 从 `point` 指向光源的单位向量
    /// 环境光或 `point` 恰好位于点光源处时返回 None
    pub fn direction_to_light(&self, point: &Point3<f32>) -> Option<Vector3<f32>> {
        match self {
            Light::Ambient { .. } => None,
            Light::Directional { direction, .. } => Some(-direction),
            Light::Point { position, .. } => (position - point).try_normalize(1e-6),
        }
    }

    /// 到达 `point` 的光强，点光源会计算衰减
    pub fn intensity_at(&self, point: &Point3<f32>) -> RgbColor {
        match self {
            Light::Ambient { intensity } | Light::Directional { intensity, .. } => *intensity,
            Light::Point {
                position,
                intensity,
                attenuation,
            } => {
                let distance = (position - point).magnitude();
                let (constant, linear, quadratic) = *attenuation;
                let falloff = constant + linear * distance + quadratic * distance * distance;
                if falloff <= f32::EPSILON {
                    *intensity
                } else {
                    *intensity * (1.0 / falloff)
                }
            }
        }
    }
}
