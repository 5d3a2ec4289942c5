//! Per-sample event handling: stroke lifecycle and the paint state machine

use tracing::{debug, info, warn};

use super::{PaintOutcome, Painter, UndoEntry};
use crate::camera::CaptureRequest;
use crate::compositor::CompositeJob;
use crate::error::{PaintError, RenderError};
use crate::types::{BrushPose, PaintPhase};

impl Painter {
    /// Handle one input sample.
    ///
    /// Queued brush commands are applied first. While `trigger` is held each
    /// sample runs one paint event `Idle -> CameraPositioned -> Rendered ->
    /// Composited -> Idle`; releasing it ends the stroke.
    ///
    /// # Errors
    /// Configuration errors if the painter is not fully set up (nothing is
    /// touched), or `PaintError::Render` if the capture render failed, in
    /// which case the event is dropped and the texture is unchanged.
    pub fn on_input_sample(&mut self, pose: &BrushPose, trigger: bool) -> Result<PaintOutcome, PaintError> {
        self.validate()?;
        self.commands.drain_into(&mut self.brush);

        if !trigger {
            if self.stroke_active {
                let recorded = self.end_stroke();
                return Ok(PaintOutcome::StrokeEnded { recorded });
            }
            return Ok(PaintOutcome::Idle);
        }

        let new_stroke = !self.stroke_active;
        if new_stroke {
            self.begin_stroke();
        }

        if !new_stroke
            && self
                .last_pose
                .is_some_and(|last| last.approx_eq(pose, self.config.move_epsilon))
        {
            return Ok(PaintOutcome::Unmoved);
        }
        self.last_pose = Some(*pose);

        self.paint_event(pose)
    }

    /// Run the capture, render and composite steps for one pose
    fn paint_event(&mut self, pose: &BrushPose) -> Result<PaintOutcome, PaintError> {
        if self.brush.size.radius() <= 0.0 || self.brush.opacity <= 0.0 {
            return Ok(PaintOutcome::Empty);
        }

        let Some(surface) = self.surface.as_ref() else {
            return Err(PaintError::MissingSurface);
        };
        let Some(texture) = self.texture.as_mut() else {
            return Err(PaintError::MissingTexture);
        };
        let Some(strategy) = self.strategy.as_ref() else {
            return Err(PaintError::MissingCaptureStrategy);
        };

        let request = CaptureRequest {
            pose,
            size: self.brush.size,
            surface,
            resolution: self.capture.size(),
        };
        let Some(setup) = strategy.capture_setup(&request) else {
            debug!("No capture target under brush");
            return Ok(PaintOutcome::NoTarget);
        };
        if setup.radius_px <= 0.0 {
            return Ok(PaintOutcome::Empty);
        }
        self.phase = PaintPhase::CameraPositioned;
        debug!(
            center_x = setup.center.x,
            center_y = setup.center.y,
            radius_px = setup.radius_px,
            "Capture camera positioned"
        );

        let rendered = self
            .renderer
            .render(&setup.camera, surface, &mut self.capture)
            .and_then(|()| {
                if self.capture.is_valid() {
                    Ok(())
                } else {
                    Err(RenderError::Incomplete("capture buffer was not completed".to_string()))
                }
            });
        if let Err(e) = rendered {
            self.capture.invalidate();
            self.phase = PaintPhase::Idle;
            self.last_pose = None;
            warn!("Paint event aborted: {}", e);
            return Err(e.into());
        }
        self.phase = PaintPhase::Rendered;
        debug!(covered = self.capture.covered_count(), "Capture rendered");

        let footprint = self.brush.footprint(setup.center, setup.radius_px);
        let job = CompositeJob {
            capture: &self.capture,
            resampler: &self.resampler,
            footprint: &footprint,
            color: self.brush.color,
        };
        let stats = self.compositor.composite(&job, texture);
        self.phase = PaintPhase::Composited;
        debug!(blends = stats.blends, "Composited");

        self.capture.invalidate();
        self.phase = PaintPhase::Idle;
        Ok(PaintOutcome::Painted(stats))
    }

    pub(crate) fn begin_stroke(&mut self) {
        if let Some(quality) = self.pending_quality {
            self.apply_quality(quality);
        }
        if let Some(texture) = self.texture.as_mut() {
            texture.begin_snapshot();
        }
        self.stroke_active = true;
        self.last_pose = None;
        info!("Stroke {} started", self.next_stroke_id);
    }

    /// Finish the active stroke; returns true if it produced an undo entry
    pub(crate) fn end_stroke(&mut self) -> bool {
        self.stroke_active = false;
        self.last_pose = None;

        let stroke_id = self.next_stroke_id;
        self.next_stroke_id += 1;

        let snapshot = self.texture.as_mut().and_then(|t| t.finish_snapshot());
        let recorded = match snapshot {
            Some(tiles) if !tiles.is_empty() => {
                info!("Stroke {} ended ({} tiles touched)", stroke_id, tiles.len());
                self.push_undo(UndoEntry { stroke_id, tiles });
                true
            }
            _ => {
                info!("Stroke {} ended without changes", stroke_id);
                false
            }
        };

        if let Some(quality) = self.pending_quality {
            self.apply_quality(quality);
        }
        recorded
    }
}
