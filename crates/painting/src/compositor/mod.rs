//! Texel compositing - capture pixels to persistent texture writes
//!
//! Every capture pixel inside the brush radius contributes one
//! `(texel, strength)` pair: its resampled texture coordinate picks the
//! texel, the footprint model picks the strength. Compositors differ only in
//! which pixels they visit and how they resolve several pixels landing on
//! the same texel.
//!
//! - [`SequentialCompositor`] scans the whole buffer and blends each
//!   contribution as it is found.
//! - [`BoundedCompositor`] visits only the brush bounding box, evaluates
//!   contributions in parallel, then gathers them per destination texel and
//!   blends each texel once with the mean strength. The gather step keeps
//!   the result independent of worker scheduling.

mod bounded;
mod sequential;

pub use bounded::BoundedCompositor;
pub use sequential::SequentialCompositor;

use glam::Vec2;
use texpaint_config::{CompositeStrategy, PainterConfig};

use crate::capture::CaptureBuffer;
use crate::footprint::BrushFootprint;
use crate::resample::Resampler;
use crate::tiles::TiledSurface;

/// Inputs for compositing one paint event
#[derive(Debug, Clone, Copy)]
pub struct CompositeJob<'a> {
    pub capture: &'a CaptureBuffer,
    pub resampler: &'a Resampler,
    pub footprint: &'a BrushFootprint,
    /// Linear RGBA brush color
    pub color: [f32; 4],
}

/// Counters reported by a compositing pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompositeStats {
    /// Capture pixels visited
    pub visited: usize,
    /// Capture pixels that produced a non-zero contribution
    pub contributions: usize,
    /// Texel blend operations performed
    pub blends: usize,
}

/// Applies a paint event's footprint to the persistent texture
pub trait TexelCompositor: Send + Sync {
    fn name(&self) -> &'static str;

    fn composite(&self, job: &CompositeJob<'_>, target: &mut TiledSurface) -> CompositeStats;
}

/// Compositor selected by the configured strategy
pub fn compositor_for(config: &PainterConfig) -> Box<dyn TexelCompositor> {
    match config.composite {
        CompositeStrategy::Sequential => Box::new(SequentialCompositor),
        CompositeStrategy::BoundedParallel => Box::new(BoundedCompositor::new(config.workgroup_size)),
    }
}

/// Texel address for a texture coordinate, clamped into [0, W) x [0, H)
#[inline]
pub fn texel_address(uv: Vec2, width: u32, height: u32) -> (u32, u32) {
    (axis_address(uv.x, width), axis_address(uv.y, height))
}

#[inline]
fn axis_address(coord: f32, extent: u32) -> u32 {
    // `as` saturates, NaN becomes 0
    let scaled = (coord * extent as f32).floor().max(0.0) as u32;
    scaled.min(extent.saturating_sub(1))
}

/// A capture pixel's effect on one texel
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Contribution {
    pub texel: (u32, u32),
    pub strength: f32,
}

/// Contribution of capture pixel (x, y), if any
pub(crate) fn contribution(job: &CompositeJob<'_>, x: u32, y: u32, texture: (u32, u32)) -> Option<Contribution> {
    let pos = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
    if pos.distance(job.footprint.center) > job.footprint.radius {
        return None;
    }

    let uv = job.resampler.sample(job.capture, x, y)?;
    let strength = job.footprint.strength(pos);
    if strength <= 0.0 {
        return None;
    }

    Some(Contribution {
        texel: texel_address(uv, texture.0, texture.1),
        strength,
    })
}
