pub mod core;
pub mod error;
pub mod geometry;
pub mod io;
pub mod material_system;
pub mod scene;

pub use crate::core::renderer::{DeferredRasterizer, RasterizerOptions, RenderStats};
pub use crate::error::{RenderError, Result};
pub use crate::scene::world::World;
