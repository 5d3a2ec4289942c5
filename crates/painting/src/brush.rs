//! Brush parameters and the command queue that updates them
//!
//! UI layers publish [`BrushCommand`]s through cloned [`BrushControls`]
//! handles. The painter drains the queue at the start of every input sample
//! and applies the whole batch before painting, so a paint event never sees
//! half of an update.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use tracing::debug;

use crate::footprint::{BrushFootprint, Falloff, Stamp};

/// Brush radius and its unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BrushSize {
    /// World-space radius, converted to capture pixels by the capture strategy
    World(f32),
    /// Radius directly in capture-buffer pixels
    CapturePixels(f32),
}

impl BrushSize {
    /// Raw radius in whichever unit the variant uses
    pub fn radius(self) -> f32 {
        match self {
            BrushSize::World(r) | BrushSize::CapturePixels(r) => r,
        }
    }
}

impl Default for BrushSize {
    fn default() -> Self {
        BrushSize::World(0.05)
    }
}

/// Current brush state, mutable between paint events
#[derive(Debug, Clone)]
pub struct Brush {
    pub size: BrushSize,
    /// Linear RGBA
    pub color: [f32; 4],
    pub opacity: f32,
    pub falloff: Falloff,
    pub stamp: Option<Arc<Stamp>>,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            size: BrushSize::default(),
            color: [0.0, 0.0, 0.0, 1.0],
            opacity: 1.0,
            falloff: Falloff::Smooth,
            stamp: None,
        }
    }
}

impl Brush {
    /// Apply one parameter update
    pub fn apply(&mut self, command: BrushCommand) {
        match command {
            BrushCommand::SetSize(size) => self.size = size,
            BrushCommand::SetColor(color) => self.color = color,
            BrushCommand::SetOpacity(opacity) => self.opacity = opacity.clamp(0.0, 1.0),
            BrushCommand::SetStamp(stamp) => self.stamp = stamp,
            BrushCommand::SetFalloff(falloff) => self.falloff = falloff,
        }
    }

    /// Footprint for one event, once the capture strategy has placed the brush
    pub fn footprint(&self, center: glam::Vec2, radius_px: f32) -> BrushFootprint {
        BrushFootprint {
            center,
            radius: radius_px,
            falloff: self.falloff,
            opacity: self.opacity,
            stamp: self.stamp.clone(),
        }
    }
}

/// Brush parameter update published by a UI layer
#[derive(Debug, Clone)]
pub enum BrushCommand {
    SetSize(BrushSize),
    SetColor([f32; 4]),
    SetOpacity(f32),
    SetStamp(Option<Arc<Stamp>>),
    SetFalloff(Falloff),
}

/// Clonable publishing handle for brush commands
#[derive(Debug, Clone)]
pub struct BrushControls {
    sender: Sender<BrushCommand>,
}

impl BrushControls {
    /// Queue a command for the next input sample.
    ///
    /// Returns false if the painter has been shut down.
    pub fn send(&self, command: BrushCommand) -> bool {
        self.sender.send(command).is_ok()
    }

    pub fn set_size(&self, size: BrushSize) -> bool {
        self.send(BrushCommand::SetSize(size))
    }

    pub fn set_color(&self, color: [f32; 4]) -> bool {
        self.send(BrushCommand::SetColor(color))
    }

    pub fn set_opacity(&self, opacity: f32) -> bool {
        self.send(BrushCommand::SetOpacity(opacity))
    }

    pub fn set_stamp(&self, stamp: Option<Arc<Stamp>>) -> bool {
        self.send(BrushCommand::SetStamp(stamp))
    }

    pub fn set_falloff(&self, falloff: Falloff) -> bool {
        self.send(BrushCommand::SetFalloff(falloff))
    }
}

/// Receiving end of the brush command queue, owned by the painter
#[derive(Debug)]
pub struct BrushCommandQueue {
    sender: Sender<BrushCommand>,
    receiver: Receiver<BrushCommand>,
}

impl Default for BrushCommandQueue {
    fn default() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }
}

impl BrushCommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// New publishing handle
    pub fn controls(&self) -> BrushControls {
        BrushControls {
            sender: self.sender.clone(),
        }
    }

    /// Apply every queued command to `brush`, in send order.
    ///
    /// Returns the number of commands applied.
    pub fn drain_into(&self, brush: &mut Brush) -> usize {
        let mut applied = 0;
        for command in self.receiver.try_iter() {
            brush.apply(command);
            applied += 1;
        }
        if applied > 0 {
            debug!("Applied {} brush command(s)", applied);
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn test_commands_apply_in_order() {
        let queue = BrushCommandQueue::new();
        let controls = queue.controls();
        let mut brush = Brush::default();

        assert!(controls.set_color([1.0, 0.0, 0.0, 1.0]));
        assert!(controls.set_size(BrushSize::CapturePixels(12.0)));
        assert!(controls.set_color([0.0, 1.0, 0.0, 1.0]));

        assert_eq!(queue.drain_into(&mut brush), 3);
        assert_eq!(brush.color, [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(brush.size, BrushSize::CapturePixels(12.0));

        // Drained queue leaves the brush alone
        assert_eq!(queue.drain_into(&mut brush), 0);
    }

    #[test]
    fn test_cloned_controls_share_queue() {
        let queue = BrushCommandQueue::new();
        let a = queue.controls();
        let b = a.clone();
        let mut brush = Brush::default();

        a.set_falloff(Falloff::Hard);
        b.set_opacity(2.0);

        assert_eq!(queue.drain_into(&mut brush), 2);
        assert_eq!(brush.falloff, Falloff::Hard);
        assert_eq!(brush.opacity, 1.0);
    }

    #[test]
    fn test_controls_from_other_thread() {
        let queue = BrushCommandQueue::new();
        let controls = queue.controls();
        std::thread::spawn(move || {
            controls.set_opacity(0.25);
        })
        .join()
        .unwrap();

        let mut brush = Brush::default();
        queue.drain_into(&mut brush);
        assert_eq!(brush.opacity, 0.25);
    }

    #[test]
    fn test_footprint_carries_brush_state() {
        let mut brush = Brush::default();
        brush.apply(BrushCommand::SetFalloff(Falloff::Linear));
        brush.apply(BrushCommand::SetStamp(Stamp::new(1, 1, vec![1.0]).map(Arc::new)));

        let footprint = brush.footprint(Vec2::new(3.0, 4.0), 5.0);
        assert_eq!(footprint.falloff, Falloff::Linear);
        assert_eq!(footprint.radius, 5.0);
        assert!(footprint.stamp.is_some());
    }

    #[test]
    fn test_brush_size_radius() {
        assert_eq!(BrushSize::World(0.3).radius(), 0.3);
        assert_eq!(BrushSize::CapturePixels(7.0).radius(), 7.0);
    }
}
