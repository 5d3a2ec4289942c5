//! Brush footprint model - distance and stamp to blend strength

use glam::Vec2;
use image::{GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Radial falloff shape
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Falloff {
    /// Cubic Hermite ease from 1 at the center to 0 at the radius
    #[default]
    Smooth,
    Linear,
    /// 1 strictly inside the radius
    Hard,
}

impl Falloff {
    /// Strength at distance `d` for a brush of `radius`, in [0, 1].
    ///
    /// Zero at and beyond the radius; zero everywhere for `radius <= 0`.
    pub fn evaluate(self, d: f32, radius: f32) -> f32 {
        if radius <= 0.0 || d.is_nan() || d >= radius {
            return 0.0;
        }
        match self {
            Falloff::Smooth => smoothstep(radius, 0.0, d),
            Falloff::Linear => (1.0 - d / radius).clamp(0.0, 1.0),
            Falloff::Hard => 1.0,
        }
    }
}

/// GLSL-style smoothstep; `edge0 > edge1` gives a descending curve
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge0 == edge1 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Grayscale footprint image over the brush's local unit square
#[derive(Debug, Clone, PartialEq)]
pub struct Stamp {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl Stamp {
    /// Build a stamp from per-pixel intensities.
    ///
    /// Returns None if the dimensions are zero or do not match `values`.
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Option<Self> {
        if width == 0 || height == 0 || values.len() != (width as usize) * (height as usize) {
            return None;
        }
        let values = values
            .into_iter()
            .map(|v| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) })
            .collect();
        Some(Self {
            width,
            height,
            values,
        })
    }

    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> f32) -> Option<Self> {
        let values = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self::new(width, height, values)
    }

    pub fn from_luma(image: &GrayImage) -> Option<Self> {
        let values = image.pixels().map(|p| p[0] as f32 / 255.0).collect();
        Self::new(image.width(), image.height(), values)
    }

    /// Use the red channel as intensity
    pub fn from_rgba_red(image: &RgbaImage) -> Option<Self> {
        let values = image.pixels().map(|p| p[0] as f32 / 255.0).collect();
        Self::new(image.width(), image.height(), values)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    fn texel(&self, x: i64, y: i64) -> f32 {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.values[y * self.width as usize + x]
    }

    /// Bilinear sample at `uv` in [0, 1]^2, texel centers at (i + 0.5) / size
    pub fn sample(&self, uv: Vec2) -> f32 {
        let x = uv.x * self.width as f32 - 0.5;
        let y = uv.y * self.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = self.texel(x0, y0) * (1.0 - fx) + self.texel(x0 + 1, y0) * fx;
        let bottom = self.texel(x0, y0 + 1) * (1.0 - fx) + self.texel(x0 + 1, y0 + 1) * fx;
        top * (1.0 - fy) + bottom * fy
    }
}

/// Footprint of one paint event in capture-buffer pixel space
#[derive(Debug, Clone)]
pub struct BrushFootprint {
    pub center: Vec2,
    pub radius: f32,
    pub falloff: Falloff,
    pub opacity: f32,
    pub stamp: Option<Arc<Stamp>>,
}

impl BrushFootprint {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self {
            center,
            radius,
            falloff: Falloff::default(),
            opacity: 1.0,
            stamp: None,
        }
    }

    /// True when no sample can receive a non-zero strength
    pub fn is_empty(&self) -> bool {
        self.radius <= 0.0 || self.opacity <= 0.0
    }

    /// Blend strength at sample position `pos`, in [0, 1].
    ///
    /// With a stamp, samples outside the stamp's square are excluded and the
    /// stamp value scales the radial envelope rather than replacing it.
    pub fn strength(&self, pos: Vec2) -> f32 {
        if self.is_empty() {
            return 0.0;
        }

        let envelope = self.falloff.evaluate(pos.distance(self.center), self.radius);
        if envelope <= 0.0 {
            return 0.0;
        }

        let stamp_value = match &self.stamp {
            Some(stamp) => {
                let stamp_uv = (pos - (self.center - Vec2::splat(self.radius))) / (2.0 * self.radius);
                if !(0.0..=1.0).contains(&stamp_uv.x) || !(0.0..=1.0).contains(&stamp_uv.y) {
                    return 0.0;
                }
                stamp.sample(stamp_uv)
            }
            None => 1.0,
        };

        (stamp_value * envelope * self.opacity.clamp(0.0, 1.0)).clamp(0.0, 1.0)
    }
}
