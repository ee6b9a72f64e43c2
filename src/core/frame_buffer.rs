use crate::core::fragment::Fragment;
use crate::material_system::color::{BACKGROUND_COLOR, RgbColor};
use nalgebra::Vector3;

/// 一次渲染的几何缓冲区与最终像素缓冲区
///
/// 所有缓冲区按行存储，`index = y * width + x`。深度等于 `far_plane`
/// 表示该像素未被任何三角形写入，此时其余四个属性缓冲区只保存重置值。
#[derive(Debug, Clone, Default)]
pub struct BufferSet {
    pub width: usize,
    pub height: usize,
    pub far_plane: f32,
    pub depth: Vec<f32>,
    pub normal: Vec<Vector3<f32>>,
    pub color: Vec<RgbColor>,
    pub diffuse: Vec<RgbColor>,
    pub specular: Vec<RgbColor>,
    pub pixels: Vec<RgbColor>,
}

/// 几何缓冲区中一条水平带的可变视图
/// 各条带互不重叠，可由不同线程各自填充
pub struct GeometryBand<'a> {
    pub first_row: usize,
    pub width: usize,
    depth: &'a mut [f32],
    normal: &'a mut [Vector3<f32>],
    color: &'a mut [RgbColor],
    diffuse: &'a mut [RgbColor],
    specular: &'a mut [RgbColor],
}

impl BufferSet {
    pub fn new(width: usize, height: usize, far_plane: f32) -> Self {
        let mut buffers = Self::default();
        buffers.reset(width, height, far_plane);
        buffers
    }

    /// 按 `width × height` 重新分配所有缓冲区
    /// 深度置为 `far_plane`，颜色置为背景色，法线置零
    pub fn reset(&mut self, width: usize, height: usize, far_plane: f32) {
        let num_pixels = width * height;
        self.width = width;
        self.height = height;
        self.far_plane = far_plane;
        self.depth = vec![far_plane; num_pixels];
        self.normal = vec![Vector3::zeros(); num_pixels];
        self.color = vec![BACKGROUND_COLOR; num_pixels];
        self.diffuse = vec![BACKGROUND_COLOR; num_pixels];
        self.specular = vec![BACKGROUND_COLOR; num_pixels];
        self.pixels = vec![BACKGROUND_COLOR; num_pixels];
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn len(&self) -> usize {
        self.depth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depth.is_empty()
    }

    /// 像素 `index` 已被三角形写入时为 true
    #[inline]
    pub fn is_covered(&self, index: usize) -> bool {
        self.depth[index] < self.far_plane
    }

    pub fn covered_pixel_count(&self) -> usize {
        self.depth.iter().filter(|&&d| d < self.far_plane).count()
    }

    /// 将几何缓冲区按 `rows_per_band` 行切分为条带，最后一条可能较短
    pub fn bands(&mut self, rows_per_band: usize) -> Vec<GeometryBand<'_>> {
        let width = self.width;
        let rows_per_band = rows_per_band.max(1);
        let chunk = width * rows_per_band;
        if chunk == 0 {
            return Vec::new();
        }

        self.depth
            .chunks_mut(chunk)
            .zip(self.normal.chunks_mut(chunk))
            .zip(self.color.chunks_mut(chunk))
            .zip(self.diffuse.chunks_mut(chunk))
            .zip(self.specular.chunks_mut(chunk))
            .enumerate()
            .map(
                |(band, ((((depth, normal), color), diffuse), specular))| GeometryBand {
                    first_row: band * rows_per_band,
                    width,
                    depth,
                    normal,
                    color,
                    diffuse,
                    specular,
                },
            )
            .collect()
    }
}

impl GeometryBand<'_> {
    pub fn rows(&self) -> usize {
        self.depth.len() / self.width
    }

    pub fn last_row(&self) -> usize {
        self.first_row + self.rows() - 1
    }

    #[inline]
    fn local_index(&self, x: usize, y: usize) -> usize {
        (y - self.first_row) * self.width + x
    }

    /// 图像像素 `(x, y)` 当前的深度值
    #[inline]
    pub fn depth_at(&self, x: usize, y: usize) -> f32 {
        self.depth[self.local_index(x, y)]
    }

    /// 覆盖写入图像像素 `(x, y)` 处的五个几何缓冲区
    #[inline]
    pub fn write(&mut self, x: usize, y: usize, depth: f32, fragment: &Fragment) {
        let i = self.local_index(x, y);
        self.depth[i] = depth;
        self.normal[i] = fragment.normal;
        self.color[i] = fragment.color;
        self.diffuse[i] = fragment.diffuse;
        self.specular[i] = fragment.specular;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn reset_fills_sentinels() {
        let buffers = BufferSet::new(4, 3, 25.0);
        assert_eq!(buffers.len(), 12);
        assert!(buffers.depth.iter().all(|&d| d == 25.0));
        assert!(buffers.pixels.iter().all(|&c| c == BACKGROUND_COLOR));
        assert!(buffers.color.iter().all(|&c| c == BACKGROUND_COLOR));
        assert_eq!(buffers.covered_pixel_count(), 0);
    }

    #[test]
    fn reset_discards_previous_contents_and_resizes() {
        let mut buffers = BufferSet::new(2, 2, 10.0);
        buffers.depth[1] = 3.0;
        buffers.pixels[1] = RgbColor::WHITE;
        buffers.reset(3, 1, 8.0);
        assert_eq!(buffers.len(), 3);
        assert!(buffers.depth.iter().all(|&d| d == 8.0));
        assert!(buffers.pixels.iter().all(|&c| c == BACKGROUND_COLOR));
    }

    #[test]
    fn bands_cover_every_row_once() {
        let mut buffers = BufferSet::new(5, 7, 10.0);
        let bands = buffers.bands(3);
        let rows: Vec<_> = bands.iter().map(|b| (b.first_row, b.rows())).collect();
        assert_eq!(rows, vec![(0, 3), (3, 3), (6, 1)]);
        assert_eq!(bands[2].last_row(), 6);
    }

    #[test]
    fn band_writes_land_at_image_index() {
        let mut buffers = BufferSet::new(4, 4, 10.0);
        let fragment = Fragment {
            position: Point3::origin(),
            color: RgbColor::new(1.0, 0.0, 0.0),
            diffuse: RgbColor::WHITE,
            specular: RgbColor::gray(0.5),
            normal: Vector3::y(),
        };
        {
            let mut bands = buffers.bands(2);
            bands[1].write(3, 2, 1.5, &fragment);
            assert_eq!(bands[1].depth_at(3, 2), 1.5);
        }
        let i = buffers.index(3, 2);
        assert_eq!(i, 11);
        assert_eq!(buffers.depth[i], 1.5);
        assert_eq!(buffers.color[i], fragment.color);
        assert_eq!(buffers.normal[i], Vector3::y());
        assert!(buffers.is_covered(i));
        assert_eq!(buffers.covered_pixel_count(), 1);
    }
}
