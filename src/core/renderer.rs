use crate::core::frame_buffer::BufferSet;
use crate::core::projector;
use crate::core::rasterizer::{PreparedTriangle, rasterize_band};
use crate::core::shading::{ShadingContext, resolve};
use crate::core::shadow_map::{ShadowMaps, ShadowQuery};
use crate::error::Result;
use crate::geometry::triangle::{Triangle2D, Triangle3D};
use crate::io::image_export::ImageSink;
use crate::material_system::color::{BACKGROUND_COLOR, RgbColor};
use crate::material_system::materials::{BlinnPhongShader, Material, Shader};
use crate::scene::world::World;
use log::{debug, info};
use nalgebra::{Point2, Point3};
use rayon::prelude::*;
use std::path::Path;
use std::time::{Duration, Instant};

/// 光栅化器自身的参数，与场景无关
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizerOptions {
    /// 几何阶段按行带并行，着色阶段按行并行
    pub use_multithreading: bool,
    /// 阴影贴图边长（纹素）
    pub shadow_map_size: usize,
    pub shadow_bias: f32,
    /// 每个遮挡光源减去的灰度
    pub shadow_strength: f32,
}

impl Default for RasterizerOptions {
    fn default() -> Self {
        Self {
            use_multithreading: true,
            shadow_map_size: 1024,
            shadow_bias: 0.005,
            shadow_strength: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderStats {
    pub triangles_submitted: usize,
    /// 投影失败或完全落在图像外的三角形
    pub triangles_culled: usize,
    /// 通过深度测试的片元数，包含被覆盖的片元
    pub fragments_written: usize,
    pub pixels_shaded: usize,
    pub geometry_time: Duration,
    pub shading_time: Duration,
}

/// 基于借用 [`World`] 的延迟光栅化器
///
/// `render` 先用每个像素的最近片元填充几何缓冲区，再对每个被覆盖的像素恰好着色一次
pub struct DeferredRasterizer<'w> {
    world: &'w World,
    options: RasterizerOptions,
    shader: Box<dyn Shader>,
    shadow_query: Option<Box<dyn ShadowQuery>>,
    buffers: BufferSet,
}

impl<'w> DeferredRasterizer<'w> {
    pub fn new(world: &'w World) -> Self {
        let camera = &world.camera;
        Self {
            world,
            options: RasterizerOptions::default(),
            shader: Box::new(BlinnPhongShader::default()),
            shadow_query: None,
            buffers: BufferSet::new(camera.width(), camera.height(), camera.far_plane()),
        }
    }

    pub fn with_options(mut self, options: RasterizerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_shader<S: Shader + 'static>(mut self, shader: S) -> Self {
        self.shader = Box::new(shader);
        self
    }

    /// 启用阴影时替代自动生成的阴影贴图
    pub fn with_shadow_query<Q: ShadowQuery + 'static>(mut self, query: Q) -> Self {
        self.shadow_query = Some(Box::new(query));
        self
    }

    pub fn buffers(&self) -> &BufferSet {
        &self.buffers
    }

    pub fn rasterize(&self, triangle_world: &Triangle3D) -> Triangle2D {
        projector::rasterize(&self.world.camera, triangle_world)
    }

    pub fn unrasterize(&self, pixel_raster: &Point2<f32>, depth: f32) -> Point3<f32> {
        projector::unrasterize(&self.world.camera, pixel_raster, depth)
    }

    fn collect_triangles(&self) -> Vec<(Triangle3D, &'w Material)> {
        self.world
            .objects
            .iter()
            .flat_map(|object| {
                let material = object.material();
                object.triangles().into_iter().map(move |t| (t, material))
            })
            .collect()
    }

    /// 将场景渲染到缓冲区
    pub fn render(&mut self, use_shade: bool, use_shadow_maps: bool) -> RenderStats {
        let world = self.world;
        let camera = &world.camera;
        let (width, height) = (camera.width(), camera.height());
        let parallel = self.options.use_multithreading;
        let mut stats = RenderStats::default();

        info!(
            "开始渲染 {}x{}（{} 个物体，{} 个光源，{}）",
            width,
            height,
            world.object_count(),
            world.lights.len(),
            if parallel { "并行" } else { "串行" }
        );

        self.buffers.reset(width, height, camera.far_plane());

        // ===== 几何阶段 =====
        let geometry_start = Instant::now();
        let triangles = self.collect_triangles();
        stats.triangles_submitted = triangles.len();

        let prepared: Vec<PreparedTriangle<'_>> = triangles
            .iter()
            .filter_map(|&(world_tri, material)| {
                let raster = projector::rasterize(camera, &world_tri);
                let bbox = raster.bbox(width, height)?;
                Some(PreparedTriangle {
                    world: world_tri,
                    raster,
                    bbox,
                    material,
                })
            })
            .collect();
        stats.triangles_culled = stats.triangles_submitted - prepared.len();
        debug!(
            "提交 {} 个三角形，扫描前剔除 {} 个",
            stats.triangles_submitted, stats.triangles_culled
        );

        let built_maps;
        let shadows: Option<&dyn ShadowQuery> = match (use_shadow_maps, &self.shadow_query) {
            (false, _) => None,
            (true, Some(query)) => Some(query.as_ref()),
            (true, None) => {
                let shadow_start = Instant::now();
                let world_triangles: Vec<Triangle3D> = triangles.iter().map(|(t, _)| *t).collect();
                built_maps = ShadowMaps::build(
                    &world_triangles,
                    &world.lights,
                    self.options.shadow_map_size,
                    self.options.shadow_strength,
                    self.options.shadow_bias,
                );
                debug!(
                    "生成 {} 张阴影贴图，耗时 {:?}",
                    built_maps.len(),
                    shadow_start.elapsed()
                );
                Some(&built_maps)
            }
        };

        let rows_per_band = if parallel {
            (height / (rayon::current_num_threads() * 4)).max(1)
        } else {
            height
        };
        let mut bands = self.buffers.bands(rows_per_band);
        stats.fragments_written = if parallel {
            bands
                .par_iter_mut()
                .map(|band| rasterize_band(band, &prepared, camera))
                .sum()
        } else {
            bands
                .iter_mut()
                .map(|band| rasterize_band(band, &prepared, camera))
                .sum()
        };
        drop(bands);
        stats.geometry_time = geometry_start.elapsed();
        info!(
            "几何阶段: {} 个片元，耗时 {:?}",
            stats.fragments_written, stats.geometry_time
        );

        // ===== 着色阶段 =====
        let shading_start = Instant::now();
        let ctx = ShadingContext {
            camera,
            lights: &world.lights,
            shader: self.shader.as_ref(),
            shadows,
            use_shade,
        };
        stats.pixels_shaded = resolve(&mut self.buffers, &ctx, parallel);
        stats.shading_time = shading_start.elapsed();
        info!(
            "着色阶段: {} 个像素，耗时 {:?}",
            stats.pixels_shaded, stats.shading_time
        );

        stats
    }

    /// 通过 `sink` 将所有缓冲区写入 `output_dir`
    /// 依次为深度、法线、颜色、漫反射和镜面反射，最后是 `d_<output_name>` 最终图像
    ///
    /// 未覆盖像素的法线图输出背景色
    pub fn export_output<P: AsRef<Path>>(
        &self,
        output_dir: P,
        output_name: &str,
        sink: &dyn ImageSink,
    ) -> Result<()> {
        let dir = output_dir.as_ref();
        let BufferSet {
            width,
            height,
            far_plane,
            ..
        } = self.buffers;

        sink.write_depth(&self.buffers.depth, far_plane, &dir.join("d_depth.bmp"), width, height)?;

        let normals: Vec<RgbColor> = self
            .buffers
            .normal
            .iter()
            .enumerate()
            .map(|(i, n)| {
                if self.buffers.is_covered(i) {
                    RgbColor::from_normal(n)
                } else {
                    BACKGROUND_COLOR
                }
            })
            .collect();
        sink.write_image(&normals, &dir.join("d_normals.bmp"), width, height)?;
        sink.write_image(&self.buffers.color, &dir.join("d_colors.bmp"), width, height)?;
        sink.write_image(&self.buffers.diffuse, &dir.join("d_diffuse.bmp"), width, height)?;
        sink.write_image(&self.buffers.specular, &dir.join("d_specular.bmp"), width, height)?;
        sink.write_image(
            &self.buffers.pixels,
            &dir.join(format!("d_{output_name}")),
            width,
            height,
        )?;

        info!("缓冲区已导出到 {}", dir.display());
        Ok(())
    }
}
