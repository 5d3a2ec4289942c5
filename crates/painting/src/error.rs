//! Error types for the painting pipeline

use std::time::Duration;

use texpaint_config::ConfigError;
use thiserror::Error;

/// Failures of the capture render step.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderError {
    #[error("Capture readback timed out after {0:?}")]
    Timeout(Duration),
    #[error("Capture render pass did not complete: {0}")]
    Incomplete(String),
}

/// Errors reported by the painter.
///
/// Configuration errors mean the painter refuses to run at all; a render
/// error aborts only the current paint event.
#[derive(Debug, Error)]
pub enum PaintError {
    #[error("Painter has no surface mesh")]
    MissingSurface,
    #[error("Painter has no persistent texture")]
    MissingTexture,
    #[error("Painter has no capture strategy")]
    MissingCaptureStrategy,
    #[error("Invalid painter configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid surface mesh: {0}")]
    InvalidMesh(String),
    #[error("Paint event aborted: {0}")]
    Render(#[from] RenderError),
}

impl PaintError {
    /// True for errors that keep the painter disabled until it is reconfigured
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::Render(_))
    }
}
