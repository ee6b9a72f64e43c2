use clap::Parser;
use deferred_rasterizer::core::renderer::DeferredRasterizer;
use deferred_rasterizer::error::RenderError;
use deferred_rasterizer::io::args::Args;
use deferred_rasterizer::io::config_loader::TomlConfigLoader;
use deferred_rasterizer::io::image_export::ImageFileSink;
use deferred_rasterizer::scene::scene_utils::build_world;
use log::info;
use std::fs;
use std::time::Instant;

fn main() -> Result<(), RenderError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if let Some(path) = &args.example_config {
        TomlConfigLoader::create_example_config(path)?;
        info!("示例配置已写入 {}", path);
        return Ok(());
    }

    let settings = args.load_settings()?;
    settings.validate()?;

    let start = Instant::now();
    let world = build_world(&settings)?;

    let mut rasterizer = DeferredRasterizer::new(&world)
        .with_shader(settings.shader())
        .with_options(settings.rasterizer_options());
    let stats = rasterizer.render(settings.use_shade, settings.use_shadow_maps);

    fs::create_dir_all(&settings.output_dir)?;
    rasterizer.export_output(&settings.output_dir, &settings.output, &ImageFileSink)?;

    info!(
        "渲染完成，耗时 {:?}: {} 个三角形（剔除 {} 个），{} 个片元，着色 {} 个像素",
        start.elapsed(),
        stats.triangles_submitted,
        stats.triangles_culled,
        stats.fragments_written,
        stats.pixels_shaded
    );
    Ok(())
}
