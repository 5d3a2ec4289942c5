//! Gaussian resampling of the capture buffer.
//!
//! Raw per-pixel texture coordinates jump at seams and silhouettes. The
//! resampler replaces a pixel's coordinate with a Gaussian-weighted average
//! over a `(2k + 1)^2` neighborhood, weight `exp(-(dx^2 + dy^2) / (2k^2))`.
//! Taps are clamped to the buffer and uncovered taps contribute nothing.

use glam::Vec2;
use texpaint_config::MAX_RESAMPLE_RADIUS;

use crate::capture::CaptureBuffer;

/// Square Gaussian filter with precomputed tap weights
#[derive(Debug, Clone)]
pub struct Resampler {
    radius: u32,
    /// Row-major (2k + 1)^2 weights, center at (k, k)
    weights: Vec<f32>,
}

impl Resampler {
    /// Build the kernel for radius `k`, clamped to [`MAX_RESAMPLE_RADIUS`]
    pub fn new(radius: u32) -> Self {
        let radius = radius.min(MAX_RESAMPLE_RADIUS);
        let k = radius as i32;
        let side = (2 * k + 1) as usize;
        let mut weights = Vec::with_capacity(side * side);
        let two_k_sq = 2.0 * (radius as f32).powi(2);
        for dy in -k..=k {
            for dx in -k..=k {
                let weight = if two_k_sq > 0.0 {
                    let (fx, fy) = (dx as f32, dy as f32);
                    (-(fx * fx + fy * fy) / two_k_sq).exp()
                } else {
                    1.0
                };
                weights.push(weight);
            }
        }
        Self { radius, weights }
    }

    /// Neighborhood radius `k`
    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Smoothed texture coordinate at capture pixel (x, y).
    ///
    /// Returns None when the pixel itself is uncovered or out of range, so
    /// smoothing never grows coverage past the surface silhouette.
    pub fn sample(&self, capture: &CaptureBuffer, x: u32, y: u32) -> Option<Vec2> {
        let center = capture.get(x, y)?;
        if self.radius == 0 {
            return Some(center);
        }

        let k = self.radius as i64;
        let max = capture.size() as i64 - 1;
        let side = (2 * k + 1) as usize;

        let mut sum = Vec2::ZERO;
        let mut total = 0.0f32;
        for dy in -k..=k {
            let sy = (y as i64 + dy).clamp(0, max) as u32;
            let row = ((dy + k) as usize) * side;
            for dx in -k..=k {
                let sx = (x as i64 + dx).clamp(0, max) as u32;
                if let Some(uv) = capture.get(sx, sy) {
                    let weight = self.weights[row + (dx + k) as usize];
                    sum += uv * weight;
                    total += weight;
                }
            }
        }

        if total <= f32::EPSILON {
            return Some(center);
        }
        Some(sum / total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_capture(size: u32) -> CaptureBuffer {
        let mut capture = CaptureBuffer::new(size);
        for y in 0..size {
            for x in 0..size {
                capture.set(
                    x,
                    y,
                    Vec2::new(
                        (x as f32 + 0.5) / size as f32,
                        (y as f32 + 0.5) / size as f32,
                    ),
                );
            }
        }
        capture.mark_valid();
        capture
    }

    #[test]
    fn test_weights_are_gaussian() {
        let resampler = Resampler::new(2);
        assert_eq!(resampler.weights.len(), 25);
        assert!((resampler.weights[12] - 1.0).abs() < 1e-6);
        // (dx, dy) = (2, 2): exp(-8 / 8)
        assert!((resampler.weights[24] - (-1.0f32).exp()).abs() < 1e-6);
    }

    #[test]
    fn test_large_radius_is_clamped() {
        let resampler = Resampler::new(MAX_RESAMPLE_RADIUS);
        let side = (2 * MAX_RESAMPLE_RADIUS + 1) as usize;
        assert_eq!(resampler.weights.len(), side * side);
        assert!(resampler.weights.iter().all(|w| w.is_finite() && *w > 0.0));

        let huge = Resampler::new(u32::MAX);
        assert_eq!(huge.radius(), MAX_RESAMPLE_RADIUS);
        assert_eq!(huge.weights.len(), side * side);
    }

    #[test]
    fn test_linear_field_is_preserved_in_interior() {
        let capture = identity_capture(16);
        let resampler = Resampler::new(2);

        let uv = resampler.sample(&capture, 8, 8).unwrap();
        assert!((uv - capture.get(8, 8).unwrap()).length() < 1e-5);
    }

    #[test]
    fn test_zero_radius_returns_raw_sample() {
        let capture = identity_capture(4);
        let resampler = Resampler::new(0);
        assert_eq!(resampler.sample(&capture, 1, 2), capture.get(1, 2));
    }

    #[test]
    fn test_uncovered_center_is_none() {
        let mut capture = identity_capture(4);
        capture.clear();
        capture.set(0, 0, Vec2::new(0.5, 0.5));
        let resampler = Resampler::new(1);

        assert!(resampler.sample(&capture, 1, 1).is_none());
        assert!(resampler.sample(&capture, 9, 9).is_none());
    }

    #[test]
    fn test_uncovered_taps_are_skipped() {
        let mut capture = CaptureBuffer::new(3);
        capture.set(1, 1, Vec2::new(0.25, 0.75));
        let resampler = Resampler::new(1);

        // Every neighbor is uncovered, so the sentinel never pulls the estimate
        let uv = resampler.sample(&capture, 1, 1).unwrap();
        assert!((uv - Vec2::new(0.25, 0.75)).length() < 1e-6);
    }

    #[test]
    fn test_corner_taps_clamp_to_buffer() {
        let capture = identity_capture(8);
        let resampler = Resampler::new(3);

        for (x, y) in [(0, 0), (7, 7), (0, 7), (7, 0)] {
            let uv = resampler.sample(&capture, x, y).unwrap();
            assert!((0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y));
            // Clamped taps bias toward the interior by less than the kernel radius
            assert!((uv - capture.get(x, y).unwrap()).length() < 3.0 / 8.0);
        }
    }
}
