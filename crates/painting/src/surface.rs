//! Persistent paint texture - linear RGBA f32 storage

use image::RgbaImage;

/// CPU copy of a surface's persistent color texture.
///
/// Pixels are stored as linear `[r, g, b, a]` floats in row-major order.
/// Every accessor bounds-checks, so no index outside
/// `[0, width) x [0, height)` is ever dereferenced.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuSurface {
    /// Surface dimensions
    pub width: u32,
    pub height: u32,
    pixels: Vec<[f32; 4]>,
}

impl CpuSurface {
    /// Create a new surface with the given dimensions, initialized to transparent black
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0.0, 0.0, 0.0, 0.0])
    }

    /// Create a new surface filled with a solid color
    pub fn filled(width: u32, height: u32, color: [f32; 4]) -> Self {
        let pixel_count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            pixels: vec![color; pixel_count],
        }
    }

    /// Build a surface from 8-bit sRGB pixels (e.g. a loaded or generated image)
    pub fn from_rgba8(image: &RgbaImage) -> Self {
        let pixels = image
            .pixels()
            .map(|p| {
                [
                    srgb_u8_to_linear(p[0]),
                    srgb_u8_to_linear(p[1]),
                    srgb_u8_to_linear(p[2]),
                    p[3] as f32 / 255.0,
                ]
            })
            .collect();
        Self {
            width: image.width(),
            height: image.height(),
            pixels,
        }
    }

    /// Encode the surface as 8-bit sRGB
    pub fn to_rgba8(&self) -> RgbaImage {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for pixel in &self.pixels {
            bytes.extend_from_slice(&pixel_to_rgba8(*pixel));
        }
        // Length always matches width * height * 4
        RgbaImage::from_raw(self.width, self.height, bytes)
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    /// Clear the surface to a solid color
    pub fn clear(&mut self, color: [f32; 4]) {
        self.pixels.fill(color);
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize) * (self.width as usize) + (x as usize))
    }

    /// Get a pixel at the given coordinates
    /// Returns None if coordinates are out of bounds
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Set a pixel at the given coordinates
    /// Does nothing if coordinates are out of bounds
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [f32; 4]) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    /// Move a pixel toward `color` by `strength` (linear interpolation).
    ///
    /// Repeated application converges on `color` and never overshoots it.
    /// Returns false if the coordinates are out of bounds.
    #[inline]
    pub fn lerp_pixel(&mut self, x: u32, y: u32, color: [f32; 4], strength: f32) -> bool {
        let Some(i) = self.index(x, y) else {
            return false;
        };
        self.pixels[i] = lerp_color(self.pixels[i], color, strength);
        true
    }

    /// Get raw pixel data for GPU upload
    /// Returns the pixel data as a byte slice suitable for an Rgba32Float texture upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Get the total number of pixels
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    /// Get direct access to pixel data
    #[inline]
    pub fn pixels(&self) -> &[[f32; 4]] {
        &self.pixels
    }
}

/// `dst + (src - dst) * strength`, with strength clamped to [0, 1]
#[inline]
pub fn lerp_color(dst: [f32; 4], src: [f32; 4], strength: f32) -> [f32; 4] {
    let s = strength.clamp(0.0, 1.0);
    [
        dst[0] + (src[0] - dst[0]) * s,
        dst[1] + (src[1] - dst[1]) * s,
        dst[2] + (src[2] - dst[2]) * s,
        dst[3] + (src[3] - dst[3]) * s,
    ]
}

/// Convert a linear RGBA float pixel to 8-bit sRGB with linear alpha
pub fn pixel_to_rgba8(pixel: [f32; 4]) -> [u8; 4] {
    [
        linear_to_srgb_u8(pixel[0]),
        linear_to_srgb_u8(pixel[1]),
        linear_to_srgb_u8(pixel[2]),
        (pixel[3].clamp(0.0, 1.0) * 255.0).round() as u8,
    ]
}

/// Convert linear float to sRGB u8.
#[inline]
pub fn linear_to_srgb_u8(linear: f32) -> u8 {
    let linear = linear.clamp(0.0, 1.0);
    let srgb = if linear <= 0.0031308 {
        linear * 12.92
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    };
    (srgb * 255.0).round() as u8
}

/// Convert an sRGB u8 to linear float.
#[inline]
pub fn srgb_u8_to_linear(srgb: u8) -> f32 {
    let s = srgb as f32 / 255.0;
    if s <= 0.04045 {
        s / 12.92
    } else {
        ((s + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_surface() {
        let surface = CpuSurface::new(100, 100);
        assert_eq!(surface.width, 100);
        assert_eq!(surface.height, 100);
        assert_eq!(surface.pixel_count(), 10000);
    }

    #[test]
    fn test_get_set_pixel() {
        let mut surface = CpuSurface::new(10, 10);
        let color = [1.0, 0.5, 0.25, 1.0];

        surface.set_pixel(5, 5, color);
        assert_eq!(surface.get_pixel(5, 5), Some(color));

        // Out of bounds should return None
        assert_eq!(surface.get_pixel(100, 100), None);
        assert_eq!(surface.get_pixel(10, 0), None);
    }

    #[test]
    fn test_lerp_pixel() {
        let mut surface = CpuSurface::filled(4, 4, [1.0, 1.0, 1.0, 1.0]);

        assert!(surface.lerp_pixel(1, 1, [1.0, 0.0, 0.0, 1.0], 0.5));

        let result = surface.get_pixel(1, 1).unwrap();
        assert!((result[0] - 1.0).abs() < 1e-6);
        assert!((result[1] - 0.5).abs() < 1e-6);
        assert!((result[2] - 0.5).abs() < 1e-6);
        assert!((result[3] - 1.0).abs() < 1e-6);

        assert!(!surface.lerp_pixel(4, 0, [1.0, 0.0, 0.0, 1.0], 1.0));
    }

    #[test]
    fn test_repeated_lerp_never_oversaturates() {
        let mut surface = CpuSurface::filled(1, 1, [0.0, 0.0, 0.0, 1.0]);
        for _ in 0..100 {
            surface.lerp_pixel(0, 0, [0.8, 0.2, 0.0, 1.0], 0.7);
        }
        let p = surface.get_pixel(0, 0).unwrap();
        assert!(p[0] <= 0.8 + 1e-6);
        assert!((p[0] - 0.8).abs() < 1e-4);
        assert!((p[1] - 0.2).abs() < 1e-4);
    }

    #[test]
    fn test_zero_strength_is_bit_identical() {
        let before = [0.123_456_7, 0.5, 0.987_654_3, 0.25];
        assert_eq!(lerp_color(before, [1.0, 0.0, 0.0, 1.0], 0.0), before);
    }

    #[test]
    fn test_rgba8_round_trip() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, image::Rgba([255, 128, 0, 255]));
        image.put_pixel(1, 0, image::Rgba([10, 20, 30, 40]));

        let surface = CpuSurface::from_rgba8(&image);
        assert_eq!(surface.to_rgba8(), image);
    }

    #[test]
    fn test_as_bytes() {
        let surface = CpuSurface::new(2, 2);
        let bytes = surface.as_bytes();
        // 4 pixels * 4 components * 4 bytes per f32 = 64 bytes
        assert_eq!(bytes.len(), 64);
    }
}
