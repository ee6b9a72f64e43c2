use crate::geometry::interpolation::barycentric_coordinates;
use crate::material_system::color::RgbColor;
use nalgebra::{Point2, Point3, Vector3};

const AREA_EPSILON: f32 = 1e-6;

/// 场景物体产生的世界空间三角形
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle3D {
    pub vertices: [Point3<f32>; 3],
    pub normals: [Vector3<f32>; 3],
    /// 逐顶点色调，与材质颜色相乘
    pub colors: [RgbColor; 3],
}

impl Triangle3D {
    pub fn new(vertices: [Point3<f32>; 3], normals: [Vector3<f32>; 3]) -> Self {
        Self {
            vertices,
            normals,
            colors: [RgbColor::WHITE; 3],
        }
    }

    /// 三个顶点法线均等于面法线的三角形
    pub fn flat(vertices: [Point3<f32>; 3]) -> Self {
        let normal = face_normal(&vertices).unwrap_or_else(Vector3::z);
        Self::new(vertices, [normal; 3])
    }

    pub fn with_colors(mut self, colors: [RgbColor; 3]) -> Self {
        self.colors = colors;
        self
    }

    /// 按逆时针绕序的单位法线，退化时返回 None
    pub fn face_normal(&self) -> Option<Vector3<f32>> {
        face_normal(&self.vertices)
    }
}

fn face_normal(vertices: &[Point3<f32>; 3]) -> Option<Vector3<f32>> {
    let e1 = vertices[1] - vertices[0];
    let e2 = vertices[2] - vertices[0];
    e1.cross(&e2).try_normalize(1e-12)
}

/// 光栅空间中的投影三角形（x 向右，y 向下）
/// 同时保存各顶点的视图深度用于深度插值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle2D {
    pub vertices: [Point2<f32>; 3],
    pub depths: [f32; 3],
}

/// 三角形包围盒覆盖的像素范围（闭区间）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox2D {
    pub min: Point2<i32>,
    pub max: Point2<i32>,
}

impl BoundingBox2D {
    /// 将包围盒限制在 `first_row..=last_row` 行内
    pub fn clip_rows(&self, first_row: usize, last_row: usize) -> Option<Self> {
        let min_y = self.min.y.max(first_row as i32);
        let max_y = self.max.y.min(last_row as i32);
        (min_y <= max_y).then(|| Self {
            min: Point2::new(self.min.x, min_y),
            max: Point2::new(self.max.x, max_y),
        })
    }
}

/// (a, b, p) 有向面积的两倍，在 y 向上的坐标系中 p 位于 a→b 左侧时为正
///
/// 总是从字典序较小的端点开始计算，共享边的两个三角形得到严格相反的值
#[inline]
fn edge_function(a: &Point2<f32>, b: &Point2<f32>, p: &Point2<f32>) -> f32 {
    let raw = |a: &Point2<f32>, b: &Point2<f32>| (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    if (a.x, a.y) <= (b.x, b.y) {
        raw(a, b)
    } else {
        -raw(b, a)
    }
}

/// 采样点恰好落在边上时的归属规则
/// 绕序一致时共享边在两个三角形中方向相反，只有其中一个拥有该边
#[inline]
fn owns_edge(a: &Point2<f32>, b: &Point2<f32>) -> bool {
    let d = b - a;
    d.y > 0.0 || (d.y == 0.0 && d.x < 0.0)
}

impl Triangle2D {
    pub fn is_finite(&self) -> bool {
        self.vertices
            .iter()
            .all(|v| v.x.is_finite() && v.y.is_finite())
    }

    pub fn signed_area_x2(&self) -> f32 {
        let [a, b, c] = &self.vertices;
        edge_function(a, b, c)
    }

    /// 点是否在三角形内，与绕序无关
    /// 边上的点由 [`owns_edge`] 判定，共享边只由一个三角形绘制
    pub fn contains(&self, p: &Point2<f32>) -> bool {
        let area = self.signed_area_x2();
        if !(area.abs() > AREA_EPSILON) {
            return false;
        }

        let [a, mut b, mut c] = self.vertices;
        if area < 0.0 {
            std::mem::swap(&mut b, &mut c);
        }

        [(a, b), (b, c), (c, a)].iter().all(|(from, to)| {
            let w = edge_function(from, to, p);
            w > 0.0 || (w == 0.0 && owns_edge(from, to))
        })
    }

    /// `p` 的屏幕空间重心坐标，按顶点顺序
    pub fn barycentric(&self, p: &Point2<f32>) -> Option<Vector3<f32>> {
        let [a, b, c] = self.vertices;
        barycentric_coordinates(*p, a, b, c)
    }

    /// 向外取整到像素并裁剪到图像范围的包围盒
    /// 三角形在屏幕外或顶点非有限时返回 None
    pub fn bbox(&self, width: usize, height: usize) -> Option<BoundingBox2D> {
        if !self.is_finite() || width == 0 || height == 0 {
            return None;
        }

        let xs = self.vertices.map(|v| v.x);
        let ys = self.vertices.map(|v| v.y);
        let min_x = xs.iter().copied().fold(f32::INFINITY, f32::min).floor();
        let max_x = xs.iter().copied().fold(f32::NEG_INFINITY, f32::max).ceil();
        let min_y = ys.iter().copied().fold(f32::INFINITY, f32::min).floor();
        let max_y = ys.iter().copied().fold(f32::NEG_INFINITY, f32::max).ceil();

        let min = Point2::new((min_x as i32).max(0), (min_y as i32).max(0));
        let max = Point2::new(
            (max_x as i32).min(width as i32 - 1),
            (max_y as i32).min(height as i32 - 1),
        );

        (min.x <= max.x && min.y <= max.y).then_some(BoundingBox2D { min, max })
    }
}
