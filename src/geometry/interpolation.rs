use nalgebra::{Point2, Point3, Vector3};

const EPSILON: f32 = 1e-5;

/// 计算点 p 相对于二维三角形 (v1, v2, v3) 的重心坐标 (alpha, beta, gamma)
/// 三角形退化时返回 None
pub fn barycentric_coordinates(
    p: Point2<f32>,
    v1: Point2<f32>,
    v2: Point2<f32>,
    v3: Point2<f32>,
) -> Option<Vector3<f32>> {
    let e1 = v2 - v1;
    let e2 = v3 - v1;
    let p_v1 = p - v1;

    let total_area_x2 = e1.x * e2.y - e1.y * e2.x;
    if !(total_area_x2.abs() >= EPSILON) {
        return None;
    }

    let inv_total_area_x2 = 1.0 / total_area_x2;
    let beta = (p_v1.x * e2.y - p_v1.y * e2.x) * inv_total_area_x2;
    let gamma = (e1.x * p_v1.y - e1.y * p_v1.x) * inv_total_area_x2;

    Some(Vector3::new(1.0 - beta - gamma, beta, gamma))
}

/// `p` 投影到三维三角形所在平面后的重心坐标
/// 面积为零的退化三角形返回 None
pub fn barycentric_coordinates_3d(
    p: &Point3<f32>,
    v1: &Point3<f32>,
    v2: &Point3<f32>,
    v3: &Point3<f32>,
) -> Option<Vector3<f32>> {
    let e1 = v2 - v1;
    let e2 = v3 - v1;
    let ep = p - v1;

    let d11 = e1.dot(&e1);
    let d12 = e1.dot(&e2);
    let d22 = e2.dot(&e2);
    let dp1 = ep.dot(&e1);
    let dp2 = ep.dot(&e2);

    let denom = d11 * d22 - d12 * d12;
    if !(denom.abs() > EPSILON * EPSILON) {
        return None;
    }

    let beta = (d22 * dp1 - d12 * dp2) / denom;
    let gamma = (d11 * dp2 - d12 * dp1) / denom;
    Some(Vector3::new(1.0 - beta - gamma, beta, gamma))
}

/// 由顶点深度插值视图深度
///
/// 透视投影插值 `1/z`，使结果位于三角形平面上；正交投影线性插值 `z`。
/// 插值结果不是有效正值时返回 None
pub fn interpolate_depth(bary: Vector3<f32>, depths: [f32; 3], is_perspective: bool) -> Option<f32> {
    let depth = if is_perspective {
        if depths.iter().any(|z| *z <= EPSILON) {
            return None;
        }
        let inv_z = bary.x / depths[0] + bary.y / depths[1] + bary.z / depths[2];
        if inv_z <= EPSILON * EPSILON {
            return None;
        }
        1.0 / inv_z
    } else {
        bary.x * depths[0] + bary.y * depths[1] + bary.z * depths[2]
    };

    depth.is_finite().then_some(depth)
}

/// 截断舍入产生的微小负权重，并重新归一化使其和为一
pub fn normalize_weights(bary: Vector3<f32>) -> Vector3<f32> {
    let clamped = bary.map(|w| w.max(0.0));
    let sum = clamped.sum();
    if sum > EPSILON {
        clamped / sum
    } else {
        Vector3::repeat(1.0 / 3.0)
    }
}
