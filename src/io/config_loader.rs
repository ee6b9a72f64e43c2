use crate::error::{RenderError, Result};
use crate::io::render_settings::{
    RenderSettings, is_valid_shadow_map_size, parse_color, parse_point3, parse_vec3,
};
use crate::material_system::light::Light;
use log::warn;
use std::path::Path;
use toml::Value;

/// 以 TOML 格式读写 [`RenderSettings`]
pub struct TomlConfigLoader;

impl TomlConfigLoader {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<RenderSettings> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::load_from_content(&content)
    }

    pub fn load_from_content(content: &str) -> Result<RenderSettings> {
        let toml_value: Value = toml::from_str(content)?;
        Self::parse_toml_to_settings(&toml_value)
    }

    pub fn save_to_file<P: AsRef<Path>>(settings: &RenderSettings, path: P) -> Result<()> {
        std::fs::write(path, Self::settings_to_toml(settings))?;
        Ok(())
    }

    /// 写出带注释的默认配置文件
    pub fn create_example_config<P: AsRef<Path>>(path: P) -> Result<()> {
        Self::save_to_file(&RenderSettings::default(), path)
    }

    // ===== TOML -> RenderSettings 转换 =====

    fn parse_toml_to_settings(toml: &Value) -> Result<RenderSettings> {
        let mut settings = RenderSettings::default();

        if let Some(files) = toml.get("files").and_then(|v| v.as_table()) {
            Self::parse_files_section(&mut settings, files);
        }
        if let Some(render) = toml.get("render").and_then(|v| v.as_table()) {
            Self::parse_render_section(&mut settings, render);
        }
        if let Some(camera) = toml.get("camera").and_then(|v| v.as_table()) {
            Self::parse_camera_section(&mut settings, camera);
        }
        if let Some(lights) = Self::parse_lights_array(toml)? {
            settings.lights = lights;
        }
        if let Some(material) = toml.get("material").and_then(|v| v.as_table()) {
            Self::parse_material_section(&mut settings, material);
        }
        if let Some(shadow) = toml.get("shadow").and_then(|v| v.as_table()) {
            Self::parse_shadow_section(&mut settings, shadow);
        }

        Ok(settings)
    }

    fn parse_files_section(settings: &mut RenderSettings, files: &toml::Table) {
        if let Some(obj) = files.get("obj").and_then(|v| v.as_str()) {
            settings.obj = Some(obj.to_string());
        }
        if let Some(output) = files.get("output").and_then(|v| v.as_str()) {
            settings.output = output.to_string();
        }
        if let Some(output_dir) = files.get("output_dir").and_then(|v| v.as_str()) {
            settings.output_dir = output_dir.to_string();
        }
    }

    fn parse_render_section(settings: &mut RenderSettings, render: &toml::Table) {
        if let Some(width) = positive_integer(render, "width") {
            settings.width = width;
        }
        if let Some(height) = positive_integer(render, "height") {
            settings.height = height;
        }
        if let Some(projection) = render.get("projection").and_then(|v| v.as_str()) {
            settings.projection = projection.to_string();
        }
        if let Some(use_multithreading) = render.get("use_multithreading").and_then(|v| v.as_bool())
        {
            settings.use_multithreading = use_multithreading;
        }
        if let Some(use_shade) = render.get("use_shade").and_then(|v| v.as_bool()) {
            settings.use_shade = use_shade;
        }
    }

    fn parse_camera_section(settings: &mut RenderSettings, camera: &toml::Table) {
        if let Some(from) = camera.get("from").and_then(|v| v.as_str()) {
            settings.camera_from = from.to_string();
        }
        if let Some(at) = camera.get("at").and_then(|v| v.as_str()) {
            settings.camera_at = at.to_string();
        }
        if let Some(up) = camera.get("up").and_then(|v| v.as_str()) {
            settings.camera_up = up.to_string();
        }
        if let Some(fov) = float(camera, "fov") {
            settings.camera_fov = fov;
        }
        if let Some(ortho_height) = float(camera, "ortho_height") {
            settings.ortho_height = ortho_height;
        }
        if let Some(near) = float(camera, "near") {
            settings.near = near;
        }
        if let Some(far) = float(camera, "far") {
            settings.far = far;
        }
    }

    /// 解析 `[[light]]` 数组
    /// 文件中没有光源数组时返回 None 并保留默认光源，空数组表示无光照场景
    fn parse_lights_array(toml: &Value) -> Result<Option<Vec<Light>>> {
        let Some(entries) = toml.get("light").and_then(|v| v.as_array()) else {
            return Ok(None);
        };

        let mut lights = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            let Some(table) = entry.as_table() else {
                warn!("光源 #{} 不是表，已忽略", i + 1);
                continue;
            };
            if !table.get("enabled").and_then(|v| v.as_bool()).unwrap_or(true) {
                continue;
            }
            let light = Self::parse_single_light(table)
                .map_err(|e| RenderError::Config(format!("light #{}: {}", i + 1, e)))?;
            lights.push(light);
        }
        Ok(Some(lights))
    }

    fn parse_single_light(table: &toml::Table) -> Result<Light> {
        let light_type = table
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RenderError::Config("missing 'type'".into()))?;

        let intensity = float(table, "intensity").unwrap_or(1.0);
        let color = parse_color(table.get("color").and_then(|v| v.as_str()).unwrap_or("1,1,1"))?;
        let radiance = color * intensity;

        let required_str = |key: &str| {
            table
                .get(key)
                .and_then(|v| v.as_str())
                .ok_or_else(|| RenderError::Config(format!("{light_type} light needs '{key}'")))
        };

        match light_type {
            "ambient" => Ok(Light::ambient(radiance)),
            "directional" => {
                let direction = parse_vec3(required_str("direction")?)?;
                Ok(Light::directional(direction, radiance))
            }
            "point" => {
                let position = parse_point3(required_str("position")?)?;
                let attenuation = (
                    float(table, "constant_attenuation").unwrap_or(1.0),
                    float(table, "linear_attenuation").unwrap_or(0.09),
                    float(table, "quadratic_attenuation").unwrap_or(0.032),
                );
                Ok(Light::point(position, radiance, Some(attenuation)))
            }
            other => Err(RenderError::Config(format!("unknown light type '{other}'"))),
        }
    }

    fn parse_material_section(settings: &mut RenderSettings, material: &toml::Table) {
        if let Some(base_color) = material.get("base_color").and_then(|v| v.as_str()) {
            settings.base_color = base_color.to_string();
        }
        if let Some(diffuse_color) = material.get("diffuse_color").and_then(|v| v.as_str()) {
            settings.diffuse_color = diffuse_color.to_string();
        }
        if let Some(specular_color) = material.get("specular_color").and_then(|v| v.as_str()) {
            settings.specular_color = specular_color.to_string();
        }
        if let Some(shininess) = float(material, "shininess") {
            if shininess > 0.0 {
                settings.shininess = shininess;
            } else {
                warn!("光泽度必须为正数，当前为 {}，保留 {}", shininess, settings.shininess);
            }
        }
    }

    fn parse_shadow_section(settings: &mut RenderSettings, shadow: &toml::Table) {
        if let Some(enable) = shadow.get("use_shadow_maps").and_then(|v| v.as_bool()) {
            settings.use_shadow_maps = enable;
        }
        if let Some(size) = shadow.get("shadow_map_size").and_then(|v| v.as_integer()) {
            let size = size.max(0) as usize;
            if is_valid_shadow_map_size(size) {
                settings.shadow_map_size = size;
            } else {
                warn!(
                    "阴影贴图尺寸 {} 无效，必须是 64..=4096 内的 2 的幂，保留 {}",
                    size, settings.shadow_map_size
                );
            }
        }
        if let Some(bias) = float(shadow, "shadow_bias") {
            settings.shadow_bias = bias.clamp(0.0001, 0.1);
        }
        if let Some(strength) = float(shadow, "shadow_strength") {
            settings.shadow_strength = strength.clamp(0.0, 1.0);
        }
    }

    // ===== RenderSettings -> TOML 转换 =====

    fn settings_to_toml(settings: &RenderSettings) -> String {
        let mut content = String::new();

        content.push_str("# deferred-rasterizer configuration\n");
        content.push_str("# Vectors and colors are \"x,y,z\" strings.\n\n");

        content.push_str("[files]\n");
        match &settings.obj {
            Some(obj) => content.push_str(&format!("obj = \"{}\"\n", obj)),
            None => content.push_str("# obj = \"path/to/model.obj\"  # demo scene when unset\n"),
        }
        content.push_str(&format!("output = \"{}\"\n", settings.output));
        content.push_str(&format!("output_dir = \"{}\"\n\n", settings.output_dir));

        content.push_str("[render]\n");
        content.push_str(&format!("width = {}\n", settings.width));
        content.push_str(&format!("height = {}\n", settings.height));
        content.push_str(&format!("projection = \"{}\"  # perspective | orthographic\n", settings.projection));
        content.push_str(&format!("use_multithreading = {}\n", settings.use_multithreading));
        content.push_str(&format!("use_shade = {}  # false writes raw base colors\n\n", settings.use_shade));

        content.push_str("[camera]\n");
        content.push_str(&format!("from = \"{}\"\n", settings.camera_from));
        content.push_str(&format!("at = \"{}\"\n", settings.camera_at));
        content.push_str(&format!("up = \"{}\"\n", settings.camera_up));
        content.push_str(&format!("fov = {:?}\n", settings.camera_fov));
        content.push_str(&format!("ortho_height = {:?}\n", settings.ortho_height));
        content.push_str(&format!("near = {:?}\n", settings.near));
        content.push_str(&format!("far = {:?}\n\n", settings.far));

        for light in &settings.lights {
            content.push_str("[[light]]\n");
            match light {
                Light::Ambient { intensity } => {
                    content.push_str("type = \"ambient\"\n");
                    content.push_str(&format!("color = \"{}\"\n", color_string(intensity)));
                }
                Light::Directional {
                    direction,
                    intensity,
                } => {
                    content.push_str("type = \"directional\"\n");
                    content.push_str(&format!(
                        "direction = \"{},{},{}\"\n",
                        direction.x, direction.y, direction.z
                    ));
                    content.push_str(&format!("color = \"{}\"\n", color_string(intensity)));
                }
                Light::Point {
                    position,
                    intensity,
                    attenuation: (constant, linear, quadratic),
                } => {
                    content.push_str("type = \"point\"\n");
                    content.push_str(&format!(
                        "position = \"{},{},{}\"\n",
                        position.x, position.y, position.z
                    ));
                    content.push_str(&format!("color = \"{}\"\n", color_string(intensity)));
                    content.push_str(&format!("constant_attenuation = {:?}\n", constant));
                    content.push_str(&format!("linear_attenuation = {:?}\n", linear));
                    content.push_str(&format!("quadratic_attenuation = {:?}\n", quadratic));
                }
            }
            content.push_str("intensity = 1.0\n\n");
        }

        content.push_str("[material]\n");
        content.push_str(&format!("base_color = \"{}\"\n", settings.base_color));
        content.push_str(&format!("diffuse_color = \"{}\"\n", settings.diffuse_color));
        content.push_str(&format!("specular_color = \"{}\"\n", settings.specular_color));
        content.push_str(&format!("shininess = {:?}\n\n", settings.shininess));

        content.push_str("[shadow]\n");
        content.push_str(&format!("use_shadow_maps = {}\n", settings.use_shadow_maps));
        content.push_str(&format!("shadow_map_size = {}  # power of two, 64..=4096\n", settings.shadow_map_size));
        content.push_str(&format!("shadow_bias = {:?}\n", settings.shadow_bias));
        content.push_str(&format!("shadow_strength = {:?}  # gray subtracted per occluding light\n", settings.shadow_strength));

        content
    }
}

fn float(table: &toml::Table, key: &str) -> Option<f32> {
    let value = table.get(key)?;
    value
        .as_float()
        .or_else(|| value.as_integer().map(|i| i as f64))
        .map(|f| f as f32)
}

fn positive_integer(table: &toml::Table, key: &str) -> Option<usize> {
    let value = table.get(key)?.as_integer()?;
    if value > 0 {
        Some(value as usize)
    } else {
        warn!("'{}' 必须为正数，当前为 {}，保留默认值", key, value);
        None
    }
}

fn color_string(color: &crate::material_system::color::RgbColor) -> String {
    format!("{},{},{}", color.r, color.g, color.b)
}
