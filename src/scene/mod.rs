pub mod primitives;
pub mod scene_object;
pub mod scene_utils;
pub mod world;
