// core/mod.rs
// 几何阶段、延迟着色以及两者之间的缓冲区
pub mod fragment;
pub mod frame_buffer;
pub mod projector;
pub mod rasterizer;
pub mod renderer;
pub mod shading;
pub mod shadow_map;
