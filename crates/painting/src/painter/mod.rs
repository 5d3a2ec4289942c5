//! Painter orchestrator
//!
//! Connects the pieces of one paint event:
//! - the capture strategy positions the capture camera from the brush pose
//! - the surface index renderer fills the capture buffer
//! - the compositor resamples, weighs and blends into the persistent texture
//!
//! The host drives it explicitly: build with [`Painter::initialize`], feed
//! one [`Painter::on_input_sample`] per input sample, and release the
//! texture with [`Painter::shutdown`]. Each call runs the whole event to
//! completion before returning.

mod event;
mod undo;

use texpaint_config::{PainterConfig, QualityTier};
use tracing::info;

use crate::brush::{Brush, BrushCommandQueue, BrushControls};
use crate::camera::CapturePoseStrategy;
use crate::capture::CaptureBuffer;
use crate::compositor::{compositor_for, CompositeStats, TexelCompositor};
use crate::constants::DEFAULT_TILE_SIZE;
use crate::error::PaintError;
use crate::mesh::SurfaceMesh;
use crate::renderer::{SoftwareIndexRenderer, SurfaceIndexRenderer};
use crate::resample::Resampler;
use crate::surface::CpuSurface;
use crate::tiles::{DirtyRegion, TiledSurface};
use crate::types::{BrushPose, PaintPhase};

pub use undo::UndoEntry;

/// What an input sample did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintOutcome {
    /// Trigger not held and no stroke to finish
    Idle,
    /// Trigger released; `recorded` is true if the stroke produced an undo entry
    StrokeEnded { recorded: bool },
    /// Brush has not moved since the last event of this stroke
    Unmoved,
    /// Brush has zero radius or opacity; texture untouched
    Empty,
    /// Capture strategy found nothing under the brush
    NoTarget,
    /// Footprint composited into the texture
    Painted(CompositeStats),
}

/// Texture-space projection painter for one surface
pub struct Painter {
    pub(crate) config: PainterConfig,
    pub(crate) surface: Option<SurfaceMesh>,
    pub(crate) texture: Option<TiledSurface>,
    pub(crate) strategy: Option<Box<dyn CapturePoseStrategy>>,
    pub(crate) renderer: Box<dyn SurfaceIndexRenderer>,
    pub(crate) compositor: Box<dyn TexelCompositor>,
    pub(crate) resampler: Resampler,
    pub(crate) capture: CaptureBuffer,
    pub(crate) brush: Brush,
    pub(crate) commands: BrushCommandQueue,
    pub(crate) phase: PaintPhase,
    /// Pose of the last event that reached the capture step this stroke
    pub(crate) last_pose: Option<BrushPose>,
    pub(crate) stroke_active: bool,
    pub(crate) next_stroke_id: u64,
    /// Quality change requested mid-stroke, applied at the next stroke start
    pub(crate) pending_quality: Option<QualityTier>,
    /// Undo stack (most recent at end)
    pub(crate) undo_stack: Vec<UndoEntry>,
}

impl Painter {
    /// Create an unconfigured painter.
    ///
    /// It refuses to paint until a surface, texture and capture strategy
    /// have been set.
    pub fn new(config: PainterConfig) -> Result<Self, PaintError> {
        config.validate()?;
        let resolution = config.capture_resolution();

        Ok(Self {
            surface: None,
            texture: None,
            strategy: None,
            renderer: Box::new(SoftwareIndexRenderer::new()),
            compositor: compositor_for(&config),
            resampler: Resampler::new(config.resample_radius),
            capture: CaptureBuffer::new(resolution),
            brush: Brush::default(),
            commands: BrushCommandQueue::new(),
            phase: PaintPhase::Idle,
            last_pose: None,
            stroke_active: false,
            next_stroke_id: 1,
            pending_quality: None,
            undo_stack: Vec::new(),
            config,
        })
    }

    /// Create a fully configured painter
    pub fn initialize(
        config: PainterConfig,
        surface: SurfaceMesh,
        texture: CpuSurface,
        strategy: Box<dyn CapturePoseStrategy>,
    ) -> Result<Self, PaintError> {
        let mut painter = Self::new(config)?;
        painter.set_surface(surface);
        painter.set_texture(texture)?;
        painter.set_capture_strategy(strategy);
        painter.validate()?;

        info!(
            quality = %painter.config.quality,
            capture = painter.capture.size(),
            strategy = painter.strategy.as_ref().map(|s| s.name()).unwrap_or_default(),
            compositor = painter.compositor.name(),
            "Painter initialized"
        );
        Ok(painter)
    }

    /// Check that everything a paint event needs is present
    pub fn validate(&self) -> Result<(), PaintError> {
        if self.surface.is_none() {
            return Err(PaintError::MissingSurface);
        }
        if self.texture.is_none() {
            return Err(PaintError::MissingTexture);
        }
        if self.strategy.is_none() {
            return Err(PaintError::MissingCaptureStrategy);
        }
        Ok(())
    }

    pub fn set_surface(&mut self, surface: SurfaceMesh) {
        self.surface = Some(surface);
        self.last_pose = None;
    }

    /// Replace the persistent texture, dropping undo history for the old one
    pub fn set_texture(&mut self, texture: CpuSurface) -> Result<(), PaintError> {
        texpaint_config::validate_texture_size(texture.width, texture.height)?;
        let mut tiled = TiledSurface::from_surface(texture, DEFAULT_TILE_SIZE);
        tiled.mark_all_dirty();
        if self.stroke_active {
            tiled.begin_snapshot();
        }
        self.texture = Some(tiled);
        self.undo_stack.clear();
        self.last_pose = None;
        Ok(())
    }

    pub fn set_capture_strategy(&mut self, strategy: Box<dyn CapturePoseStrategy>) {
        info!("Capture strategy: {}", strategy.name());
        self.strategy = Some(strategy);
        self.last_pose = None;
    }

    pub fn set_renderer(&mut self, renderer: Box<dyn SurfaceIndexRenderer>) {
        self.renderer = renderer;
    }

    /// Change the capture quality tier.
    ///
    /// The capture buffer is recreated immediately when idle; during a stroke
    /// the change waits for the next stroke start.
    pub fn set_quality(&mut self, quality: QualityTier) {
        if self.stroke_active {
            info!("Quality change to {} deferred until the stroke ends", quality);
            self.pending_quality = Some(quality);
            return;
        }
        self.apply_quality(quality);
    }

    pub(crate) fn apply_quality(&mut self, quality: QualityTier) {
        self.pending_quality = None;
        if quality == self.config.quality && self.capture.size() == quality.resolution() {
            return;
        }
        self.config.quality = quality;
        self.capture = CaptureBuffer::new(quality.resolution());
        self.last_pose = None;
        info!("Capture buffer resized to {0}x{0} ({1})", quality.resolution(), quality);
    }

    /// New handle for publishing brush parameter updates
    pub fn controls(&self) -> BrushControls {
        self.commands.controls()
    }

    /// Current brush state (after the last drained commands)
    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    pub fn config(&self) -> &PainterConfig {
        &self.config
    }

    pub fn phase(&self) -> PaintPhase {
        self.phase
    }

    pub fn is_stroking(&self) -> bool {
        self.stroke_active
    }

    pub fn capture(&self) -> &CaptureBuffer {
        &self.capture
    }

    pub fn surface(&self) -> Option<&SurfaceMesh> {
        self.surface.as_ref()
    }

    pub fn texture(&self) -> Option<&TiledSurface> {
        self.texture.as_ref()
    }

    /// Tiles modified since the last call, as RGBA8 upload regions
    pub fn take_dirty_regions(&mut self) -> Vec<DirtyRegion> {
        self.texture
            .as_mut()
            .map(TiledSurface::take_dirty_regions)
            .unwrap_or_default()
    }

    /// Release the painter and hand back the persistent texture
    pub fn shutdown(mut self) -> Option<CpuSurface> {
        if self.stroke_active {
            self.end_stroke();
        }
        info!("Painter shut down");
        self.texture.take().map(TiledSurface::into_surface)
    }
}

impl std::fmt::Debug for Painter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Painter")
            .field("config", &self.config)
            .field("phase", &self.phase)
            .field("stroke_active", &self.stroke_active)
            .field("capture_size", &self.capture.size())
            .field("undo_levels", &self.undo_stack.len())
            .finish_non_exhaustive()
    }
}
