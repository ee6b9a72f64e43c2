use nalgebra::Vector3;
use std::ops::{Add, Mul, Sub};

/// 未被光栅化的像素颜色
pub const BACKGROUND_COLOR: RgbColor = RgbColor::new(0.0, 0.0, 0.0);

/// 线性 RGB 颜色，各通道范围为 `[0, 1]`
///
/// 加减与缩放运算都会将各通道截断回 `[0, 1]`，`lit - shadow` 不会出现负值或溢出
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RgbColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor::new(0.0, 0.0, 0.0);
    pub const WHITE: RgbColor = RgbColor::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const fn gray(value: f32) -> Self {
        Self::new(value, value, value)
    }

    pub fn from_vector(v: &Vector3<f32>) -> Self {
        Self::new(v.x, v.y, v.z).clamped()
    }

    pub fn to_vector(self) -> Vector3<f32> {
        Vector3::new(self.r, self.g, self.b)
    }

    /// 将单位法线编码为颜色：各通道取 `(n + 1) / 2`
    pub fn from_normal(normal: &Vector3<f32>) -> Self {
        Self::from_vector(&((normal + Vector3::repeat(1.0)) * 0.5))
    }

    /// 将各通道截断到 `[0, 1]`，NaN 通道置为 0
    pub fn clamped(self) -> Self {
        let clamp = |c: f32| if c.is_nan() { 0.0 } else { c.clamp(0.0, 1.0) };
        Self::new(clamp(self.r), clamp(self.g), clamp(self.b))
    }

    /// 逐通道相乘
    pub fn component_mul(self, other: RgbColor) -> Self {
        Self::new(self.r * other.r, self.g * other.g, self.b * other.b).clamped()
    }

    pub fn to_rgb8(self) -> [u8; 3] {
        let c = self.clamped();
        let to_u8 = |v: f32| (v * 255.0).round() as u8;
        [to_u8(c.r), to_u8(c.g), to_u8(c.b)]
    }

    /// 各通道差的最大绝对值，用于容差比较
    pub fn max_channel_diff(self, other: RgbColor) -> f32 {
        (self.r - other.r)
            .abs()
            .max((self.g - other.g).abs())
            .max((self.b - other.b).abs())
    }
}

impl Add for RgbColor {
    type Output = RgbColor;

    fn add(self, rhs: RgbColor) -> RgbColor {
        RgbColor::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b).clamped()
    }
}

impl Sub for RgbColor {
    type Output = RgbColor;

    fn sub(self, rhs: RgbColor) -> RgbColor {
        RgbColor::new(self.r - rhs.r, self.g - rhs.g, self.b - rhs.b).clamped()
    }
}

impl Mul<f32> for RgbColor {
    type Output = RgbColor;

    fn mul(self, rhs: f32) -> RgbColor {
        RgbColor::new(self.r * rhs, self.g * rhs, self.b * rhs).clamped()
    }
}

impl From<[f32; 3]> for RgbColor {
    fn from(c: [f32; 3]) -> Self {
        RgbColor::new(c[0], c[1], c[2]).clamped()
    }
}
