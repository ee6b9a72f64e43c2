use deferred_rasterizer::core::fragment::Fragment;
use deferred_rasterizer::core::renderer::{DeferredRasterizer, RasterizerOptions};
use deferred_rasterizer::core::shadow_map::ShadowQuery;
use deferred_rasterizer::error::Result;
use deferred_rasterizer::geometry::camera::Camera;
use deferred_rasterizer::geometry::triangle::Triangle3D;
use deferred_rasterizer::io::image_export::ImageSink;
use deferred_rasterizer::material_system::color::{BACKGROUND_COLOR, RgbColor};
use deferred_rasterizer::material_system::light::Light;
use deferred_rasterizer::material_system::materials::{Material, Shader};
use deferred_rasterizer::scene::scene_object::{Mesh, TriangleObject};
use deferred_rasterizer::scene::world::World;
use nalgebra::{Point3, Vector3};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use test_case::test_case;

const SIZE: usize = 16;
const FAR: f32 = 100.0;

const RED: RgbColor = RgbColor::new(0.9, 0.1, 0.1);
const BLUE: RgbColor = RgbColor::new(0.1, 0.2, 0.9);

/// 从 z = 10 沿 -z 方向观察，视体在 x 和 y 上覆盖 [-1, 1]
fn ortho_camera() -> Camera {
    Camera::orthographic(
        Point3::new(0.0, 0.0, 10.0),
        Point3::origin(),
        Vector3::y(),
        2.0,
        SIZE,
        SIZE,
        0.1,
        FAR,
    )
    .unwrap()
}

/// 在高度 `z` 处覆盖整个视野
fn full_screen(z: f32) -> Triangle3D {
    Triangle3D::flat([
        Point3::new(-10.0, -10.0, z),
        Point3::new(10.0, -10.0, z),
        Point3::new(0.0, 10.0, z),
    ])
}

/// 高度 `z` 处的左下角三角形，约覆盖一半视野
fn corner(z: f32) -> Triangle3D {
    Triangle3D::flat([
        Point3::new(-1.0, -1.0, z),
        Point3::new(1.0, -1.0, z),
        Point3::new(-1.0, 1.0, z),
    ])
}

fn object(triangle: Triangle3D, color: RgbColor) -> TriangleObject {
    TriangleObject::new(triangle, Material::solid(color))
}

fn serial() -> RasterizerOptions {
    RasterizerOptions {
        use_multithreading: false,
        shadow_map_size: 256,
        ..Default::default()
    }
}

fn assert_all_close(pixels: &[RgbColor], expected: RgbColor) {
    for (i, &c) in pixels.iter().enumerate() {
        assert!(
            c.max_channel_diff(expected) < 1e-5,
            "pixel {i}: {c:?} != {expected:?}"
        );
    }
}

#[derive(Debug, Clone, Default)]
struct CountingShader {
    calls: Arc<AtomicUsize>,
}

impl Shader for CountingShader {
    fn shade(&self, _: &[Light], _: &Camera, fragment: &Fragment) -> RgbColor {
        self.calls.fetch_add(1, Ordering::Relaxed);
        fragment.color
    }
}

#[derive(Debug, Clone, Default)]
struct CountingShadow {
    calls: Arc<AtomicUsize>,
}

impl ShadowQuery for CountingShadow {
    fn shadow_factor(&self, _: &Point3<f32>) -> RgbColor {
        self.calls.fetch_add(1, Ordering::Relaxed);
        RgbColor::gray(0.25)
    }
}

#[derive(Default)]
struct RecordingSink {
    written: RefCell<Vec<(PathBuf, usize)>>,
    images: RefCell<Vec<(PathBuf, Vec<RgbColor>)>>,
}

impl RecordingSink {
    fn image(&self, name: &str) -> Vec<RgbColor> {
        self.images
            .borrow()
            .iter()
            .find(|(p, _)| p.file_name().is_some_and(|f| f == name))
            .map(|(_, buffer)| buffer.clone())
            .unwrap_or_default()
    }
}

impl ImageSink for RecordingSink {
    fn write_image(&self, buffer: &[RgbColor], path: &Path, _: usize, _: usize) -> Result<()> {
        self.written.borrow_mut().push((path.to_path_buf(), buffer.len()));
        self.images.borrow_mut().push((path.to_path_buf(), buffer.to_vec()));
        Ok(())
    }

    fn write_depth(&self, depth: &[f32], _: f32, path: &Path, _: usize, _: usize) -> Result<()> {
        self.written.borrow_mut().push((path.to_path_buf(), depth.len()));
        Ok(())
    }
}

#[test_case(true ; "near first")]
#[test_case(false ; "far first")]
fn nearest_surface_wins_in_any_order(near_first: bool) {
    let mut world = World::new(ortho_camera());
    let near = object(full_screen(1.0), BLUE);
    let far = object(full_screen(0.0), RED);
    if near_first {
        world.add_object(near).add_object(far);
    } else {
        world.add_object(far).add_object(near);
    }

    let mut rasterizer = DeferredRasterizer::new(&world).with_options(serial());
    rasterizer.render(true, false);

    let buffers = rasterizer.buffers();
    assert_all_close(&buffers.pixels, BLUE);
    for &d in &buffers.depth {
        assert!((d - 9.0).abs() < 1e-4);
    }
}

#[test_case(false ; "serial")]
#[test_case(true ; "parallel")]
fn equal_depth_keeps_first_fragment(parallel: bool) {
    let mut world = World::new(ortho_camera());
    world
        .add_object(object(full_screen(0.0), RED))
        .add_object(object(full_screen(0.0), BLUE));

    let mut rasterizer = DeferredRasterizer::new(&world).with_options(RasterizerOptions {
        use_multithreading: parallel,
        ..Default::default()
    });
    let stats = rasterizer.render(true, false);

    assert_all_close(&rasterizer.buffers().pixels, RED);
    assert_eq!(stats.fragments_written, SIZE * SIZE);
}

#[test]
fn each_covered_pixel_is_shaded_once() {
    let mut world = World::new(ortho_camera());
    world.add_light(Light::ambient(RgbColor::WHITE));
    // 左下半部分大量重复绘制
    for z in [0.0, 0.5, 1.0, 1.5] {
        world.add_object(object(corner(z), RED));
    }

    let shader = CountingShader::default();
    let calls = Arc::clone(&shader.calls);
    let mut rasterizer = DeferredRasterizer::new(&world).with_shader(shader);
    let stats = rasterizer.render(true, false);

    let covered = rasterizer.buffers().covered_pixel_count();
    assert!(covered > 0 && covered < SIZE * SIZE);
    assert!(stats.fragments_written > covered);
    assert_eq!(calls.load(Ordering::Relaxed), covered);
    assert_eq!(stats.pixels_shaded, covered);
}

#[test]
fn uncovered_pixels_keep_background_and_far_depth() {
    let mut world = World::new(ortho_camera());
    world.add_object(object(corner(0.0), RED));

    let mut rasterizer = DeferredRasterizer::new(&world);
    rasterizer.render(true, false);

    let buffers = rasterizer.buffers();
    let mut background = 0;
    for i in 0..buffers.len() {
        if buffers.is_covered(i) {
            assert!(buffers.pixels[i].max_channel_diff(RED) < 1e-5);
        } else {
            background += 1;
            assert_eq!(buffers.depth[i], FAR);
            assert_eq!(buffers.pixels[i], BACKGROUND_COLOR);
            assert_eq!(buffers.normal[i], Vector3::zeros());
        }
    }
    assert!(background > 0);
}

#[test]
fn empty_world_renders_background() {
    let world = World::new(ortho_camera());
    let mut rasterizer = DeferredRasterizer::new(&world);
    let stats = rasterizer.render(true, true);

    assert_eq!(stats.triangles_submitted, 0);
    assert_eq!(stats.pixels_shaded, 0);
    let buffers = rasterizer.buffers();
    assert_eq!(buffers.len(), SIZE * SIZE);
    assert!(buffers.depth.iter().all(|&d| d == FAR));
    assert!(buffers.pixels.iter().all(|&c| c == BACKGROUND_COLOR));
}

#[test]
fn full_viewport_triangle_is_uniform_base_color() {
    let mut world = World::new(ortho_camera());
    world.add_object(object(full_screen(0.0), RED));

    let mut rasterizer = DeferredRasterizer::new(&world);
    rasterizer.render(true, false);

    assert_eq!(rasterizer.buffers().covered_pixel_count(), SIZE * SIZE);
    assert_all_close(&rasterizer.buffers().pixels, RED);
}

#[test]
fn nearer_triangle_hides_farther_one() {
    let mut world = World::new(ortho_camera());
    world
        .add_object(object(corner(0.0), RED))
        .add_object(object(full_screen(2.0), BLUE));

    let mut rasterizer = DeferredRasterizer::new(&world).with_options(serial());
    rasterizer.render(true, false);

    let buffers = rasterizer.buffers();
    assert!(buffers.pixels.iter().all(|c| c.max_channel_diff(RED) > 0.5));
    assert_all_close(&buffers.color, BLUE);
}

#[test]
fn shared_diagonal_is_rasterized_once() {
    let mut world = World::new(ortho_camera());
    // 先绘制远处一半，若采样被重复覆盖会写入两次
    let far = Triangle3D::flat([
        Point3::new(-1.0, -1.0, 0.0),
        Point3::new(1.0, -1.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
    ]);
    let near = Triangle3D::flat([
        Point3::new(-1.0, -1.0, 1.0),
        Point3::new(1.0, 1.0, 1.0),
        Point3::new(-1.0, 1.0, 1.0),
    ]);
    world
        .add_object(object(far, RED))
        .add_object(object(near, BLUE));

    let mut rasterizer = DeferredRasterizer::new(&world).with_options(serial());
    let stats = rasterizer.render(true, false);

    assert_eq!(rasterizer.buffers().covered_pixel_count(), SIZE * SIZE);
    assert_eq!(stats.fragments_written, SIZE * SIZE);
}

#[test]
fn unshaded_render_copies_color_buffer() {
    let mut world = World::new(ortho_camera());
    world
        .add_light(Light::directional(-Vector3::z(), RgbColor::gray(0.3)))
        .add_object(object(corner(0.0), RED));

    let shader = CountingShader::default();
    let calls = Arc::clone(&shader.calls);
    let shadow = CountingShadow::default();
    let shadow_calls = Arc::clone(&shadow.calls);
    let mut rasterizer = DeferredRasterizer::new(&world)
        .with_shader(shader)
        .with_shadow_query(shadow);
    let stats = rasterizer.render(false, true);

    let buffers = rasterizer.buffers();
    for i in 0..buffers.len() {
        let expected = if buffers.is_covered(i) {
            buffers.color[i]
        } else {
            BACKGROUND_COLOR
        };
        assert_eq!(buffers.pixels[i], expected);
    }
    assert_eq!(calls.load(Ordering::Relaxed), 0);
    assert_eq!(shadow_calls.load(Ordering::Relaxed), 0);
    assert_eq!(stats.pixels_shaded, buffers.covered_pixel_count());
}

#[test]
fn shadow_query_runs_once_per_covered_pixel_and_darkens() {
    let mut world = World::new(ortho_camera());
    world.add_object(object(corner(0.0), RED));

    let shadow = CountingShadow::default();
    let calls = Arc::clone(&shadow.calls);
    let mut rasterizer = DeferredRasterizer::new(&world)
        .with_shader(CountingShader::default())
        .with_shadow_query(shadow);

    rasterizer.render(true, false);
    assert_eq!(calls.load(Ordering::Relaxed), 0);

    rasterizer.render(true, true);
    let buffers = rasterizer.buffers();
    let covered = buffers.covered_pixel_count();
    assert_eq!(calls.load(Ordering::Relaxed), covered);
    for i in (0..buffers.len()).filter(|&i| buffers.is_covered(i)) {
        let expected = buffers.color[i] - RgbColor::gray(0.25);
        assert!(buffers.pixels[i].max_channel_diff(expected) < 1e-6);
    }
}

#[test]
fn parallel_and_serial_passes_match() {
    let camera = Camera::perspective(
        Point3::new(0.5, 2.0, 5.0),
        Point3::new(0.0, 0.3, 0.0),
        Vector3::y(),
        50.0,
        97,
        61,
        0.1,
        50.0,
    )
    .unwrap();
    let mut world = World::new(camera).with_lights(vec![
        Light::ambient(RgbColor::gray(0.1)),
        Light::directional(Vector3::new(-1.0, -2.0, -1.0), RgbColor::gray(0.8)),
        Light::point(Point3::new(0.0, 3.0, 2.0), RgbColor::gray(0.5), None),
    ]);
    world
        .add_object(Mesh::plane(6.0, Material::solid(RgbColor::gray(0.7))))
        .add_object(
            Mesh::cuboid(Vector3::repeat(1.0), Material::solid(RED))
                .rotated(&Vector3::y(), 0.6),
        )
        .add_object(Mesh::uv_sphere(0.6, 24, 12, Material::solid(BLUE)).with_transform_components(
            Point3::new(1.0, 0.6, 0.5),
            Vector3::zeros(),
            Vector3::repeat(1.0),
        ));

    let mut serial_rasterizer = DeferredRasterizer::new(&world).with_options(serial());
    let serial_stats = serial_rasterizer.render(true, true);
    let mut parallel_rasterizer = DeferredRasterizer::new(&world).with_options(RasterizerOptions {
        use_multithreading: true,
        ..serial()
    });
    let parallel_stats = parallel_rasterizer.render(true, true);

    let (a, b) = (serial_rasterizer.buffers(), parallel_rasterizer.buffers());
    assert!(a.covered_pixel_count() > 0);
    assert_eq!(a.depth, b.depth);
    assert_eq!(a.normal, b.normal);
    assert_eq!(a.color, b.color);
    assert_eq!(a.diffuse, b.diffuse);
    assert_eq!(a.specular, b.specular);
    assert_eq!(a.pixels, b.pixels);
    assert_eq!(serial_stats.fragments_written, parallel_stats.fragments_written);
}

#[test]
fn export_writes_every_buffer_in_order() {
    let mut world = World::new(ortho_camera());
    world.add_object(object(corner(0.0), RED));
    let mut rasterizer = DeferredRasterizer::new(&world);
    rasterizer.render(true, false);

    let sink = RecordingSink::default();
    rasterizer.export_output("out", "final.png", &sink).unwrap();

    let written = sink.written.into_inner();
    let names: Vec<String> = written
        .iter()
        .map(|(p, _)| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        [
            "d_depth.bmp",
            "d_normals.bmp",
            "d_colors.bmp",
            "d_diffuse.bmp",
            "d_specular.bmp",
            "d_final.png"
        ]
    );
    assert!(written.iter().all(|(p, len)| p.starts_with("out") && *len == SIZE * SIZE));
}

#[test]
fn exported_normals_are_background_where_uncovered() {
    let mut world = World::new(ortho_camera());
    world.add_object(object(corner(0.0), RED));
    let mut rasterizer = DeferredRasterizer::new(&world);
    rasterizer.render(true, false);

    let sink = RecordingSink::default();
    rasterizer.export_output("out", "final.png", &sink).unwrap();
    let normals = sink.image("d_normals.bmp");
    assert_eq!(normals.len(), SIZE * SIZE);

    let buffers = rasterizer.buffers();
    let facing = RgbColor::from_normal(&Vector3::z());
    let mut uncovered = 0;
    for (i, &c) in normals.iter().enumerate() {
        if buffers.is_covered(i) {
            assert!(c.max_channel_diff(facing) < 1e-5, "pixel {i}: {c:?}");
        } else {
            uncovered += 1;
            assert_eq!(c, BACKGROUND_COLOR, "pixel {i}");
        }
    }
    assert!(uncovered > 0);
}

#[test]
fn empty_world_exports_background_normals() {
    let world = World::new(ortho_camera());
    let mut rasterizer = DeferredRasterizer::new(&world);
    rasterizer.render(true, false);

    let sink = RecordingSink::default();
    rasterizer.export_output("out", "final.png", &sink).unwrap();
    let normals = sink.image("d_normals.bmp");
    assert_eq!(normals.len(), SIZE * SIZE);
    assert!(normals.iter().all(|&c| c == BACKGROUND_COLOR));
}
