use crate::error::{RenderError, Result};
use crate::material_system::color::RgbColor;
use crate::material_system::materials::Material;
use crate::scene::scene_object::{Mesh, Vertex};
use log::{debug, info, warn};
use nalgebra::{Point3, Vector3};
use std::path::Path;

/// 按面积加权平均面法线得到顶点法线
/// 不属于任何有效面的顶点取 +y
pub fn generate_smooth_vertex_normals(vertices: &[Point3<f32>], indices: &[u32]) -> Vec<Vector3<f32>> {
    let mut normals = vec![Vector3::zeros(); vertices.len()];

    for (face, idx) in indices.chunks_exact(3).enumerate() {
        let [i0, i1, i2] = [idx[0] as usize, idx[1] as usize, idx[2] as usize];
        if i0 >= vertices.len() || i1 >= vertices.len() || i2 >= vertices.len() {
            warn!("面 {} 包含越界的顶点索引，跳过", face);
            continue;
        }
        // 叉积长度为面积的两倍，面越大权重越高
        let face_normal = (vertices[i1] - vertices[i0]).cross(&(vertices[i2] - vertices[i0]));
        normals[i0] += face_normal;
        normals[i1] += face_normal;
        normals[i2] += face_normal;
    }

    let mut zero_count = 0;
    for normal in &mut normals {
        match normal.try_normalize(1e-12) {
            Some(n) => *normal = n,
            None => {
                *normal = Vector3::y();
                zero_count += 1;
            }
        }
    }
    if zero_count > 0 {
        debug!("{} 个顶点没有可用法线，设为 +y", zero_count);
    }
    normals
}

fn basename(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string())
}

/// 将 OBJ 文件中的每个模型加载为 [`Mesh`]
///
/// 面会被三角化。MTL 中的漫反射与镜面反射颜色按网格覆盖 `default_material`，
/// 顶点颜色作为顶点色调。
pub fn load_obj_meshes<P: AsRef<Path>>(obj_path: P, default_material: &Material) -> Result<Vec<Mesh>> {
    let obj_path = obj_path.as_ref();
    info!("加载 OBJ 文件: {:?}", obj_path);
    let obj_basename = basename(obj_path);

    let load_options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    };
    let (models, materials_result) = tobj::load_obj(obj_path, &load_options)?;

    let materials: Vec<Material> = match materials_result {
        Ok(mats) => {
            debug!("从 MTL 加载了 {} 个材质", mats.len());
            mats.iter()
                .map(|mat| Material {
                    color: mat.diffuse.map(RgbColor::from).unwrap_or(default_material.color),
                    diffuse: default_material.diffuse,
                    specular: mat.specular.map(RgbColor::from).unwrap_or(default_material.specular),
                })
                .collect()
        }
        Err(e) => {
            warn!("加载材质失败: {}", e);
            Vec::new()
        }
    };

    let mut meshes = Vec::with_capacity(models.len());
    for model in &models {
        let mesh = &model.mesh;
        let name = if model.name.is_empty() || model.name == "unnamed_object" {
            obj_basename.clone()
        } else {
            model.name.clone()
        };

        if mesh.indices.is_empty() {
            debug!("网格 '{}' 没有面，跳过", name);
            continue;
        }

        let positions: Vec<Point3<f32>> = mesh
            .positions
            .chunks_exact(3)
            .map(|p| Point3::new(p[0], p[1], p[2]))
            .collect();

        let normals: Vec<Vector3<f32>> = if mesh.normals.len() == mesh.positions.len() {
            mesh.normals
                .chunks_exact(3)
                .map(|n| {
                    Vector3::new(n[0], n[1], n[2])
                        .try_normalize(1e-12)
                        .unwrap_or_else(Vector3::y)
                })
                .collect()
        } else {
            debug!("网格 '{}' 没有法线，生成平滑法线", name);
            generate_smooth_vertex_normals(&positions, &mesh.indices)
        };

        let colors: Option<Vec<RgbColor>> = (mesh.vertex_color.len() == mesh.positions.len())
            .then(|| {
                mesh.vertex_color
                    .chunks_exact(3)
                    .map(|c| RgbColor::from([c[0], c[1], c[2]]))
                    .collect()
            });

        let vertices: Vec<Vertex> = positions
            .iter()
            .zip(&normals)
            .enumerate()
            .map(|(i, (&position, &normal))| Vertex {
                position,
                normal,
                color: colors.as_ref().map_or(RgbColor::WHITE, |c| c[i]),
            })
            .collect();

        let material = mesh
            .material_id
            .and_then(|id| materials.get(id))
            .copied()
            .unwrap_or(*default_material);

        debug!(
            "网格 '{}': {} 个顶点，{} 个三角形",
            name,
            vertices.len(),
            mesh.indices.len() / 3
        );
        meshes.push(Mesh::new(name, vertices, mesh.indices.clone(), material));
    }

    if meshes.is_empty() {
        return Err(RenderError::Config(format!(
            "OBJ file {:?} contains no triangles",
            obj_path
        )));
    }
    info!("从 '{}' 加载了 {} 个网格", obj_basename, meshes.len());
    Ok(meshes)
}
