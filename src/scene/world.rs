use crate::geometry::camera::Camera;
use crate::material_system::light::Light;
use crate::scene::scene_object::SceneObject;

/// 一次渲染读取的全部场景数据：按绘制顺序排列的物体、光源和相机
pub struct World {
    pub objects: Vec<Box<dyn SceneObject>>,
    pub lights: Vec<Light>,
    pub camera: Camera,
}

impl World {
    pub fn new(camera: Camera) -> Self {
        Self {
            objects: Vec::new(),
            lights: Vec::new(),
            camera,
        }
    }

    pub fn add_object(&mut self, object: impl SceneObject + 'static) -> &mut Self {
        self.objects.push(Box::new(object));
        self
    }

    pub fn add_light(&mut self, light: Light) -> &mut Self {
        self.lights.push(light);
        self
    }

    pub fn with_lights(mut self, lights: Vec<Light>) -> Self {
        self.lights = lights;
        self
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.objects.iter().map(|o| o.name()).collect();
        f.debug_struct("World")
            .field("objects", &names)
            .field("lights", &self.lights)
            .field("camera", &self.camera)
            .finish()
    }
}
