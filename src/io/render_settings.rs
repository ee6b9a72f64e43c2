use crate::core::renderer::RasterizerOptions;
use crate::error::{RenderError, Result};
use crate::geometry::camera::Camera;
use crate::material_system::color::RgbColor;
use crate::material_system::light::Light;
use crate::material_system::materials::{BlinnPhongShader, Material};
use log::warn;
use nalgebra::{Point3, Vector3};
use std::path::Path;

/// 纯数据结构，保存所有可配置的渲染参数
///
/// 向量和颜色以 `"x,y,z"` 字符串保存，与 TOML 文件和命令行中的形式一致，使用时再解析
#[derive(Debug, Clone)]
pub struct RenderSettings {
    // ===== 文件路径设置 =====
    /// 输入 OBJ 文件路径，未设置时渲染内置演示场景
    pub obj: Option<String>,
    /// 最终图像文件名，保存为 `d_<output>`
    pub output: String,
    pub output_dir: String,

    // ===== 渲染基础设置 =====
    pub width: usize,
    pub height: usize,
    /// 投影类型："perspective" 或 "orthographic"
    pub projection: String,
    pub use_multithreading: bool,
    /// 启用光照着色，关闭时直接输出颜色缓冲区
    pub use_shade: bool,

    // ===== 相机参数 =====
    pub camera_from: String,
    pub camera_at: String,
    pub camera_up: String,
    /// 垂直视场角（度），用于透视投影
    pub camera_fov: f32,
    /// 视体高度（世界单位），用于正交投影
    pub ortho_height: f32,
    pub near: f32,
    pub far: f32,

    // ===== 材质参数 =====
    pub base_color: String,
    pub diffuse_color: String,
    pub specular_color: String,
    pub shininess: f32,

    // ===== 阴影设置 =====
    pub use_shadow_maps: bool,
    pub shadow_map_size: usize,
    pub shadow_bias: f32,
    pub shadow_strength: f32,

    // ===== 光源 =====
    pub lights: Vec<Light>,
}

/// 解析 `"x,y,z"`
pub fn parse_vec3(s: &str) -> Result<Vector3<f32>> {
    let parse_err = |reason: String| RenderError::Parse {
        input: s.to_string(),
        reason,
    };

    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        return Err(parse_err(format!(
            "expected 3 comma-separated values, got {}",
            parts.len()
        )));
    }

    let mut values = [0.0f32; 3];
    for (value, part) in values.iter_mut().zip(&parts) {
        *value = part
            .trim()
            .parse::<f32>()
            .map_err(|e| parse_err(format!("invalid number '{}': {}", part.trim(), e)))?;
    }
    Ok(Vector3::from(values))
}

pub fn parse_point3(s: &str) -> Result<Point3<f32>> {
    parse_vec3(s).map(Point3::from)
}

/// 解析 `"r,g,b"`，各通道截断到 `[0, 1]`
pub fn parse_color(s: &str) -> Result<RgbColor> {
    parse_vec3(s).map(|v| RgbColor::from_vector(&v))
}

/// 阴影贴图边长需为 64..=4096 内的 2 的幂
pub fn is_valid_shadow_map_size(size: usize) -> bool {
    (64..=4096).contains(&size) && size.is_power_of_two()
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            obj: None,
            output: "render.png".to_string(),
            output_dir: "output".to_string(),

            width: 800,
            height: 600,
            projection: "perspective".to_string(),
            use_multithreading: true,
            use_shade: true,

            camera_from: "0,2.5,6".to_string(),
            camera_at: "0,0.5,0".to_string(),
            camera_up: "0,1,0".to_string(),
            camera_fov: 45.0,
            ortho_height: 6.0,
            near: 0.1,
            far: 100.0,

            base_color: "0.8,0.8,0.8".to_string(),
            diffuse_color: "1,1,1".to_string(),
            specular_color: "0.5,0.5,0.5".to_string(),
            shininess: 32.0,

            use_shadow_maps: false,
            shadow_map_size: 1024,
            shadow_bias: 0.005,
            shadow_strength: 0.5,

            lights: Self::default_lights(),
        }
    }
}

impl RenderSettings {
    /// 较暗的环境光加一个从上方照射的白色主光源
    pub fn default_lights() -> Vec<Light> {
        vec![
            Light::ambient(RgbColor::gray(0.15)),
            Light::directional(Vector3::new(-1.0, -2.0, -1.0), RgbColor::gray(0.85)),
        ]
    }

    pub fn is_perspective(&self) -> bool {
        self.projection == "perspective"
    }

    pub fn build_camera(&self) -> Result<Camera> {
        let from = parse_point3(&self.camera_from)?;
        let at = parse_point3(&self.camera_at)?;
        let up = parse_vec3(&self.camera_up)?;

        if self.is_perspective() {
            Camera::perspective(
                from,
                at,
                up,
                self.camera_fov,
                self.width,
                self.height,
                self.near,
                self.far,
            )
        } else {
            Camera::orthographic(
                from,
                at,
                up,
                self.ortho_height,
                self.width,
                self.height,
                self.near,
                self.far,
            )
        }
    }

    pub fn material(&self) -> Result<Material> {
        Ok(Material {
            color: parse_color(&self.base_color)?,
            diffuse: parse_color(&self.diffuse_color)?,
            specular: parse_color(&self.specular_color)?,
        })
    }

    pub fn shader(&self) -> BlinnPhongShader {
        BlinnPhongShader {
            shininess: self.shininess,
        }
    }

    pub fn rasterizer_options(&self) -> RasterizerOptions {
        RasterizerOptions {
            use_multithreading: self.use_multithreading,
            shadow_map_size: self.shadow_map_size,
            shadow_bias: self.shadow_bias,
            shadow_strength: self.shadow_strength,
        }
    }

    /// 检查会导致渲染中途失败的参数
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::Config(format!(
                "image size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !matches!(self.projection.as_str(), "perspective" | "orthographic") {
            return Err(RenderError::Config(format!(
                "unknown projection '{}', expected perspective or orthographic",
                self.projection
            )));
        }
        if let Some(obj) = &self.obj {
            if !Path::new(obj).exists() {
                return Err(RenderError::Config(format!("OBJ file '{obj}' not found")));
            }
        }
        if self.output.trim().is_empty() {
            return Err(RenderError::Config("output name must not be empty".into()));
        }
        if Path::new(&self.output).extension().is_none() {
            warn!(
                "输出文件名 '{}' 没有扩展名，无法推断图像格式",
                self.output
            );
        }
        if self.output_dir.trim().is_empty() {
            return Err(RenderError::Config("output directory must not be empty".into()));
        }

        for s in [&self.camera_from, &self.camera_at, &self.camera_up] {
            parse_vec3(s)?;
        }
        for s in [&self.base_color, &self.diffuse_color, &self.specular_color] {
            parse_color(s)?;
        }
        Ok(())
    }
}
