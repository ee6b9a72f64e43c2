use crate::error::{RenderError, Result};
use crate::material_system::color::RgbColor;
use image::ColorType;
use log::debug;
use std::path::Path;

/// 缓冲区导出目标
pub trait ImageSink {
    fn write_image(&self, buffer: &[RgbColor], path: &Path, width: usize, height: usize) -> Result<()>;

    /// 深度不小于 `far_plane` 的像素视为背景
    fn write_depth(
        &self,
        depth: &[f32],
        far_plane: f32,
        path: &Path,
        width: usize,
        height: usize,
    ) -> Result<()>;
}

/// 通过 `image::save_buffer` 写文件，格式由扩展名决定
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageFileSink;

fn check_len(actual: usize, width: usize, height: usize) -> Result<()> {
    let expected = width * height;
    if actual != expected {
        return Err(RenderError::BufferSize { expected, actual });
    }
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// 按覆盖像素自身的最小/最大深度将其映射到 `[0, 1]`
/// 背景像素映射为 1（白色）
pub fn normalize_depth(depth: &[f32], far_plane: f32) -> Vec<f32> {
    let covered = || depth.iter().copied().filter(|d| d.is_finite() && *d < far_plane);

    let (min_depth, max_depth) = covered().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), d| {
        (lo.min(d), hi.max(d))
    });
    if min_depth > max_depth {
        return vec![1.0; depth.len()];
    }

    let range = max_depth - min_depth;
    let inv_range = if range > 1e-6 { 1.0 / range } else { 0.0 };
    debug!("深度范围 [{:.3}, {:.3}]", min_depth, max_depth);

    depth
        .iter()
        .map(|&d| {
            if d.is_finite() && d < far_plane {
                ((d - min_depth) * inv_range).clamp(0.0, 1.0)
            } else {
                1.0
            }
        })
        .collect()
}

impl ImageSink for ImageFileSink {
    fn write_image(&self, buffer: &[RgbColor], path: &Path, width: usize, height: usize) -> Result<()> {
        check_len(buffer.len(), width, height)?;
        ensure_parent(path)?;
        let bytes: Vec<u8> = buffer.iter().flat_map(|c| c.to_rgb8()).collect();
        image::save_buffer(path, &bytes, width as u32, height as u32, ColorType::Rgb8)?;
        debug!("已保存 {}", path.display());
        Ok(())
    }

    fn write_depth(
        &self,
        depth: &[f32],
        far_plane: f32,
        path: &Path,
        width: usize,
        height: usize,
    ) -> Result<()> {
        check_len(depth.len(), width, height)?;
        ensure_parent(path)?;
        let bytes: Vec<u8> = normalize_depth(depth, far_plane)
            .iter()
            .map(|d| (d * 255.0).round() as u8)
            .collect();
        image::save_buffer(path, &bytes, width as u32, height as u32, ColorType::L8)?;
        debug!("已保存 {}", path.display());
        Ok(())
    }
}
