use crate::error::Result;
use crate::io::obj_loader::load_obj_meshes;
use crate::io::render_settings::RenderSettings;
use crate::material_system::color::RgbColor;
use crate::material_system::materials::Material;
use crate::scene::scene_object::Mesh;
use crate::scene::world::World;
use log::{debug, info};
use nalgebra::{Point3, Vector3};

/// 根据设置构建相机、物体和光源
///
/// 设置了 `obj` 时场景只包含该文件中的网格，否则使用演示场景
pub fn build_world(settings: &RenderSettings) -> Result<World> {
    let camera = settings.build_camera()?;
    let material = settings.material()?;
    let mut world = World::new(camera).with_lights(settings.lights.clone());

    match &settings.obj {
        Some(path) => {
            for mesh in load_obj_meshes(path, &material)? {
                debug!("添加网格 '{}'（{} 个三角形）", mesh.name, mesh.triangle_count());
                world.add_object(mesh);
            }
        }
        None => add_demo_objects(&mut world, &material),
    }

    info!(
        "场景构建完成: {} 个物体，{} 个光源",
        world.object_count(),
        world.lights.len()
    );
    Ok(world)
}

/// 地面上放置一个立方体和一个球体
///
/// `base` 提供漫反射与镜面反射参数，每个物体使用各自的颜色
pub fn add_demo_objects(world: &mut World, base: &Material) {
    let tinted = |r: f32, g: f32, b: f32| Material {
        color: RgbColor::new(r, g, b),
        ..*base
    };

    world
        .add_object(Mesh::plane(8.0, tinted(0.55, 0.6, 0.55)))
        .add_object(
            Mesh::cuboid(Vector3::repeat(1.2), tinted(0.8, 0.3, 0.25)).with_transform_components(
                Point3::new(-1.2, 0.6, 0.0),
                Vector3::new(0.0, 35f32.to_radians(), 0.0),
                Vector3::repeat(1.0),
            ),
        )
        .add_object(
            Mesh::uv_sphere(0.7, 32, 16, tinted(0.25, 0.45, 0.85)).with_transform_components(
                Point3::new(1.2, 0.7, 0.3),
                Vector3::zeros(),
                Vector3::repeat(1.0),
            ),
        );
}
