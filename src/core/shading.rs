use crate::core::fragment::Fragment;
use crate::core::frame_buffer::BufferSet;
use crate::core::shadow_map::ShadowQuery;
use crate::geometry::camera::Camera;
use crate::material_system::color::{BACKGROUND_COLOR, RgbColor};
use crate::material_system::light::Light;
use crate::material_system::materials::Shader;
use nalgebra::Point2;
use rayon::prelude::*;

/// 延迟着色阶段除缓冲区外读取的全部数据
pub struct ShadingContext<'a> {
    pub camera: &'a Camera,
    pub lights: &'a [Light],
    pub shader: &'a dyn Shader,
    /// 本次渲染启用阴影时存在
    pub shadows: Option<&'a dyn ShadowQuery>,
    /// 为 `false` 时直接将颜色缓冲区拷贝到输出
    pub use_shade: bool,
}

/// 延迟着色：由几何缓冲区填充 `buffers.pixels`
///
/// 深度位于远平面的像素取背景色。其余像素各调用一次着色器，
/// 启用阴影时再查询一次阴影。返回被覆盖的像素数量。
pub fn resolve(buffers: &mut BufferSet, ctx: &ShadingContext<'_>, parallel: bool) -> usize {
    let BufferSet {
        width,
        far_plane,
        depth,
        normal,
        color,
        diffuse,
        specular,
        pixels,
        ..
    } = buffers;
    let (width, far_plane) = (*width, *far_plane);
    if width == 0 || pixels.is_empty() {
        return 0;
    }
    let (depth, normal, color, diffuse, specular) = (&*depth, &*normal, &*color, &*diffuse, &*specular);

    let shade_pixel = |i: usize, x: usize, y: usize| -> Option<RgbColor> {
        let d = depth[i];
        if !(d < far_plane) {
            return None;
        }
        if !ctx.use_shade {
            return Some(color[i]);
        }

        let pixel = Point2::new(x as f32 + 0.5, y as f32 + 0.5);
        let fragment = Fragment {
            position: ctx.camera.unproject(&pixel, d),
            color: color[i],
            diffuse: diffuse[i],
            specular: specular[i],
            normal: normal[i],
        };
        let lit = ctx.shader.shade(ctx.lights, ctx.camera, &fragment);
        Some(match ctx.shadows {
            Some(shadows) => lit - shadows.shadow_factor(&fragment.position),
            None => lit,
        })
    };

    let shade_row = |(y, row): (usize, &mut [RgbColor])| -> usize {
        let mut shaded = 0;
        for (x, out) in row.iter_mut().enumerate() {
            *out = match shade_pixel(y * width + x, x, y) {
                Some(c) => {
                    shaded += 1;
                    c
                }
                None => BACKGROUND_COLOR,
            };
        }
        shaded
    };

    if parallel {
        pixels.par_chunks_mut(width).enumerate().map(shade_row).sum()
    } else {
        pixels.chunks_mut(width).enumerate().map(shade_row).sum()
    }
}
