//! Full-buffer scan, one writer, blends in scan order

use tracing::debug;

use super::{contribution, CompositeJob, CompositeStats, TexelCompositor};
use crate::tiles::TiledSurface;

/// Visits every capture pixel row by row and blends each contribution
/// immediately. Cost scales with the capture resolution, not the brush.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialCompositor;

impl TexelCompositor for SequentialCompositor {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn composite(&self, job: &CompositeJob<'_>, target: &mut TiledSurface) -> CompositeStats {
        let size = job.capture.size();
        let texture = target.dimensions();
        let mut stats = CompositeStats::default();

        if job.footprint.is_empty() {
            return stats;
        }

        for y in 0..size {
            for x in 0..size {
                stats.visited += 1;
                let Some(c) = contribution(job, x, y, texture) else {
                    continue;
                };
                stats.contributions += 1;
                if target.blend_texel(c.texel.0, c.texel.1, job.color, c.strength) {
                    stats.blends += 1;
                }
            }
        }

        debug!(
            visited = stats.visited,
            contributions = stats.contributions,
            "Sequential composite"
        );
        stats
    }
}
