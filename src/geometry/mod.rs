// geometry/mod.rs
// 相机、投影与三角形图元
pub mod camera;
pub mod interpolation;
pub mod transform;
pub mod triangle;
