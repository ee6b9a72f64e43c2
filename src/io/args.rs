use crate::error::Result;
use crate::io::config_loader::TomlConfigLoader;
use crate::io::render_settings::{RenderSettings, is_valid_shadow_map_size};
use clap::Parser;
use log::{info, warn};

/// 命令行参数，所有渲染选项均可选，给出时覆盖配置文件中的值
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "deferred-rasterizer", author, version, about = "CPU 延迟光栅化渲染器", long_about = None)]
pub struct Args {
    /// 配置文件路径（TOML格式）
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,

    /// 将示例配置写入 FILE 后退出
    #[arg(long, value_name = "FILE")]
    pub example_config: Option<String>,

    // ===== 文件路径设置 =====
    /// 要渲染的 OBJ 模型，替代演示场景
    #[arg(long)]
    pub obj: Option<String>,

    /// 最终图像文件名，保存为 d_<OUTPUT>
    #[arg(short, long)]
    pub output: Option<String>,

    /// 输出图像的目录
    #[arg(long)]
    pub output_dir: Option<String>,

    // ===== 渲染基础设置 =====
    #[arg(long)]
    pub width: Option<usize>,

    #[arg(long)]
    pub height: Option<usize>,

    /// 投影类型："perspective" 或 "orthographic"
    #[arg(long)]
    pub projection: Option<String>,

    /// 单线程光栅化与着色
    #[arg(long)]
    pub single_threaded: bool,

    /// 跳过光照着色，直接输出基础颜色
    #[arg(long)]
    pub no_shade: bool,

    // ===== 相机参数 =====
    /// 相机位置，格式为 "x,y,z"
    #[arg(long)]
    pub camera_from: Option<String>,

    /// 相机目标点，格式为 "x,y,z"
    #[arg(long)]
    pub camera_at: Option<String>,

    /// 相机上方向，格式为 "x,y,z"
    #[arg(long)]
    pub camera_up: Option<String>,

    /// 垂直视场角（度）
    #[arg(long)]
    pub camera_fov: Option<f32>,

    // ===== 阴影设置 =====
    /// 为方向光生成阴影贴图
    #[arg(long)]
    pub shadows: bool,

    /// 阴影贴图边长，64..=4096 内的 2 的幂
    #[arg(long)]
    pub shadow_map_size: Option<usize>,
}

impl Args {
    /// 依次应用默认值、配置文件和命令行参数
    pub fn load_settings(&self) -> Result<RenderSettings> {
        let mut settings = match &self.config {
            Some(path) => {
                info!("加载配置文件: {}", path);
                TomlConfigLoader::load_from_file(path)?
            }
            None => RenderSettings::default(),
        };
        self.apply_to(&mut settings);
        Ok(settings)
    }

    pub fn apply_to(&self, settings: &mut RenderSettings) {
        if let Some(obj) = &self.obj {
            settings.obj = Some(obj.clone());
        }
        if let Some(output) = &self.output {
            settings.output = output.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            settings.output_dir = output_dir.clone();
        }
        if let Some(width) = self.width {
            settings.width = width;
        }
        if let Some(height) = self.height {
            settings.height = height;
        }
        if let Some(projection) = &self.projection {
            settings.projection = projection.clone();
        }
        if self.single_threaded {
            settings.use_multithreading = false;
        }
        if self.no_shade {
            settings.use_shade = false;
        }
        if let Some(from) = &self.camera_from {
            settings.camera_from = from.clone();
        }
        if let Some(at) = &self.camera_at {
            settings.camera_at = at.clone();
        }
        if let Some(up) = &self.camera_up {
            settings.camera_up = up.clone();
        }
        if let Some(fov) = self.camera_fov {
            settings.camera_fov = fov;
        }
        if self.shadows {
            settings.use_shadow_maps = true;
        }
        if let Some(size) = self.shadow_map_size {
            if is_valid_shadow_map_size(size) {
                settings.shadow_map_size = size;
            } else {
                warn!(
                    "阴影贴图尺寸 {} 无效，必须是 64..=4096 内的 2 的幂，保留 {}",
                    size, settings.shadow_map_size
                );
            }
        }
    }
}
