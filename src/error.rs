use thiserror::Error;

/// 渲染器边界上的错误：相机、配置、模型加载与图像导出
/// 光栅化与着色阶段本身不会失败
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid camera: {0}")]
    InvalidCamera(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("cannot parse '{input}': {reason}")]
    Parse { input: String, reason: String },

    #[error("buffer holds {actual} pixels, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image export failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to load OBJ: {0}")]
    ObjLoad(#[from] tobj::LoadError),
}

pub type Result<T> = std::result::Result<T, RenderError>;
