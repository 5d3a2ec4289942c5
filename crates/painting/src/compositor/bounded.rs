//! Bounded parallel compositing with per-texel gather
//!
//! Capture pixels in the brush bounding box are evaluated concurrently but
//! never write. Their contributions are sorted by destination texel and each
//! texel is blended once with the mean strength of the pixels that hit it,
//! so aliasing pixels cannot race and the result does not depend on thread
//! scheduling.

use glam::Vec2;
use rayon::prelude::*;
use tracing::debug;

use super::{contribution, CompositeJob, CompositeStats, TexelCompositor};
use crate::tiles::TiledSurface;

/// Half-open pixel rectangle `[x0, x1) x [y0, y1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelBounds {
    /// Box around a brush, each side rounded up to a multiple of
    /// `workgroup` and then clamped to a `size` x `size` buffer
    pub fn around_brush(center: Vec2, radius: f32, workgroup: u32, size: u32) -> Self {
        let workgroup = workgroup.max(1);
        let clamp = |v: f32| v.clamp(0.0, size as f32) as u32;

        let x0 = clamp((center.x - radius).floor());
        let y0 = clamp((center.y - radius).floor());
        let x_end = clamp((center.x + radius).ceil());
        let y_end = clamp((center.y + radius).ceil());

        let round_up = |extent: u32| extent.div_ceil(workgroup) * workgroup;
        Self {
            x0,
            y0,
            x1: (x0 + round_up(x_end.saturating_sub(x0))).min(size),
            y1: (y0 + round_up(y_end.saturating_sub(y0))).min(size),
        }
    }

    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    pub fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }
}

/// Parallel compositor restricted to the brush bounding box
#[derive(Debug, Clone, Copy)]
pub struct BoundedCompositor {
    workgroup: u32,
}

impl BoundedCompositor {
    pub fn new(workgroup: u32) -> Self {
        Self {
            workgroup: workgroup.max(1),
        }
    }
}

/// (texel index, capture pixel index, strength)
type Gathered = (usize, usize, f32);

impl TexelCompositor for BoundedCompositor {
    fn name(&self) -> &'static str {
        "bounded"
    }

    fn composite(&self, job: &CompositeJob<'_>, target: &mut TiledSurface) -> CompositeStats {
        let mut stats = CompositeStats::default();
        if job.footprint.is_empty() {
            return stats;
        }

        let size = job.capture.size();
        let texture = target.dimensions();
        let bounds = PixelBounds::around_brush(job.footprint.center, job.footprint.radius, self.workgroup, size);
        stats.visited = bounds.area();
        if stats.visited == 0 {
            return stats;
        }

        let rows: Vec<u32> = (bounds.y0..bounds.y1).collect();
        let mut gathered: Vec<Gathered> = rows
            .par_iter()
            .flat_map_iter(|&y| {
                (bounds.x0..bounds.x1).filter_map(move |x| {
                    contribution(job, x, y, texture).map(|c| {
                        let texel = c.texel.1 as usize * texture.0 as usize + c.texel.0 as usize;
                        let pixel = y as usize * size as usize + x as usize;
                        (texel, pixel, c.strength)
                    })
                })
            })
            .collect();
        stats.contributions = gathered.len();

        // Pixel index breaks ties so the summation order is fixed
        gathered.par_sort_unstable_by_key(|&(texel, pixel, _)| (texel, pixel));

        let width = texture.0 as usize;
        for group in gathered.chunk_by(|a, b| a.0 == b.0) {
            let texel = group[0].0;
            let strength = group.iter().map(|g| g.2).sum::<f32>() / group.len() as f32;
            let (x, y) = ((texel % width) as u32, (texel / width) as u32);
            if target.blend_texel(x, y, job.color, strength) {
                stats.blends += 1;
            }
        }

        debug!(
            x0 = bounds.x0,
            y0 = bounds.y0,
            width = bounds.width(),
            height = bounds.height(),
            contributions = stats.contributions,
            texels = stats.blends,
            "Bounded composite"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureBuffer;
    use crate::footprint::{BrushFootprint, Falloff};
    use crate::resample::Resampler;

    #[test]
    fn test_bounds_round_to_workgroup() {
        let bounds = PixelBounds::around_brush(Vec2::new(20.0, 20.0), 3.0, 8, 64);
        assert_eq!((bounds.x0, bounds.y0), (17, 17));
        assert_eq!((bounds.width(), bounds.height()), (8, 8));

        let bounds = PixelBounds::around_brush(Vec2::new(20.0, 20.0), 5.0, 8, 64);
        assert_eq!((bounds.width(), bounds.height()), (16, 16));
    }

    #[test]
    fn test_bounds_clamp_to_buffer() {
        let bounds = PixelBounds::around_brush(Vec2::new(1.0, 62.0), 10.0, 8, 64);
        assert_eq!(bounds.x0, 0);
        assert_eq!(bounds.y1, 64);
        assert!(bounds.x1 <= 64 && bounds.y0 < bounds.y1);

        let outside = PixelBounds::around_brush(Vec2::new(-50.0, -50.0), 10.0, 8, 64);
        assert_eq!(outside.area(), 0);
    }

    #[test]
    fn test_aliasing_pixels_blend_once_with_mean() {
        // Every capture pixel resolves to the same texel
        let mut capture = CaptureBuffer::new(8);
        for y in 0..8 {
            for x in 0..8 {
                capture.set(x, y, Vec2::new(0.3, 0.3));
            }
        }
        capture.mark_valid();
        let resampler = Resampler::new(1);
        let mut footprint = BrushFootprint::new(Vec2::splat(4.0), 3.0);
        footprint.falloff = Falloff::Hard;
        footprint.opacity = 0.5;

        let mut target = TiledSurface::new(2, 2, 2);
        let job = CompositeJob {
            capture: &capture,
            resampler: &resampler,
            footprint: &footprint,
            color: [1.0, 1.0, 1.0, 1.0],
        };
        let stats = BoundedCompositor::new(8).composite(&job, &mut target);

        assert!(stats.contributions > 1);
        assert_eq!(stats.blends, 1);
        let texel = target.surface().get_pixel(0, 0).unwrap();
        assert!((texel[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_gather_is_repeatable() {
        let mut capture = CaptureBuffer::new(32);
        for y in 0..32 {
            for x in 0..32 {
                // Four capture pixels per texel
                capture.set(x, y, Vec2::new((x / 2) as f32 / 16.0, (y / 2) as f32 / 16.0));
            }
        }
        capture.mark_valid();
        let resampler = Resampler::new(2);
        let footprint = BrushFootprint::new(Vec2::new(15.0, 17.0), 9.0);
        let job = CompositeJob {
            capture: &capture,
            resampler: &resampler,
            footprint: &footprint,
            color: [0.1, 0.7, 0.3, 1.0],
        };

        let mut first = TiledSurface::new(16, 16, 4);
        BoundedCompositor::new(8).composite(&job, &mut first);
        for _ in 0..4 {
            let mut again = TiledSurface::new(16, 16, 4);
            BoundedCompositor::new(8).composite(&job, &mut again);
            assert_eq!(first.surface(), again.surface());
        }
    }
}
