//! Shared configuration for texpaint
//!
//! This crate provides the single source of truth for capture-buffer quality
//! tiers, compositing strategy selection and brush placement parameters used
//! by the painting core and the host driver.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Default Gaussian resample radius in capture pixels
pub const DEFAULT_RESAMPLE_RADIUS: u32 = 2;

/// Largest accepted resample radius; the kernel holds `(2k + 1)^2` weights
pub const MAX_RESAMPLE_RADIUS: u32 = 16;

/// Default parallel work-group edge length in capture pixels
pub const DEFAULT_WORKGROUP_SIZE: u32 = 8;

/// Default distance of the capture camera behind the brush tip (world units)
pub const DEFAULT_CAPTURE_OFFSET: f32 = 0.1;

/// Default fraction of the capture half-extent covered by the brush radius
pub const DEFAULT_COVERAGE_FRACTION: f32 = 1.0;

/// Default depth range of the capture frustum (world units)
pub const DEFAULT_CAPTURE_DEPTH: f32 = 10.0;

/// Default movement threshold below which a brush counts as stationary
pub const DEFAULT_MOVE_EPSILON: f32 = 1e-4;

/// Default number of strokes kept on the undo stack
pub const DEFAULT_MAX_UNDO_LEVELS: usize = 20;

/// Environment variable selecting the capture quality tier
pub const QUALITY_ENV: &str = "TEXPAINT_QUALITY";

/// Environment variable selecting the compositing strategy
pub const COMPOSITE_ENV: &str = "TEXPAINT_COMPOSITE";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Unknown quality tier: {0} (expected low, medium, high or ultra)")]
    UnknownQuality(String),
    #[error("Unknown composite strategy: {0} (expected sequential or bounded)")]
    UnknownStrategy(String),
    #[error("Work-group size must be non-zero")]
    ZeroWorkgroup,
    #[error("Capture offset must be positive, got {0}")]
    InvalidCaptureOffset(f32),
    #[error("Coverage fraction must be in (0, 1], got {0}")]
    InvalidCoverage(f32),
    #[error("Capture depth must be greater than the capture offset, got {0}")]
    InvalidCaptureDepth(f32),
    #[error("Resample radius must be at most {MAX_RESAMPLE_RADIUS}, got {0}")]
    ResampleRadiusTooLarge(u32),
    #[error("Move epsilon must be finite and non-negative, got {0}")]
    InvalidMoveEpsilon(f32),
    #[error("Texture dimensions must be non-zero, got {width}x{height}")]
    EmptyTexture { width: u32, height: u32 },
}

/// Capture buffer resolution tier.
///
/// Each tier maps to one fixed square power-of-two resolution. The tier is
/// applied at setup or on explicit reconfiguration, never mid-stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    #[default]
    Medium,
    High,
    Ultra,
}

impl QualityTier {
    pub const ALL: [QualityTier; 4] = [Self::Low, Self::Medium, Self::High, Self::Ultra];

    /// Edge length of the square capture buffer in pixels
    pub fn resolution(self) -> u32 {
        match self {
            Self::Low => 256,
            Self::Medium => 512,
            Self::High => 1024,
            Self::Ultra => 2048,
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Ultra => "ultra",
        };
        f.write_str(name)
    }
}

impl FromStr for QualityTier {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "ultra" => Ok(Self::Ultra),
            other => Err(ConfigError::UnknownQuality(other.to_string())),
        }
    }
}

/// How capture pixels are composited into the persistent texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompositeStrategy {
    /// Scan every capture pixel on one thread and blend as it goes
    Sequential,
    /// Restrict work to the brush bounding box and gather per destination
    /// texel across worker threads
    #[default]
    BoundedParallel,
}

impl FromStr for CompositeStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "bounded" | "bounded_parallel" | "parallel" => Ok(Self::BoundedParallel),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Painter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PainterConfig {
    /// Capture buffer quality tier
    pub quality: QualityTier,
    /// Resample neighborhood radius `k` ((2k+1)^2 taps)
    pub resample_radius: u32,
    /// Compositing strategy
    pub composite: CompositeStrategy,
    /// Parallel work-group edge length; the bounded region is rounded up to it
    pub workgroup_size: u32,
    /// Distance the capture camera trails behind the brush tip
    pub capture_offset: f32,
    /// Fraction of the capture half-extent the brush radius should cover
    pub coverage_fraction: f32,
    /// Far distance of the capture frustum measured from the camera
    pub capture_depth: f32,
    /// Movement below this distance does not trigger a new paint event
    pub move_epsilon: f32,
    /// Maximum number of strokes retained for undo
    pub max_undo_levels: usize,
}

impl Default for PainterConfig {
    fn default() -> Self {
        Self {
            quality: QualityTier::default(),
            resample_radius: DEFAULT_RESAMPLE_RADIUS,
            composite: CompositeStrategy::default(),
            workgroup_size: DEFAULT_WORKGROUP_SIZE,
            capture_offset: DEFAULT_CAPTURE_OFFSET,
            coverage_fraction: DEFAULT_COVERAGE_FRACTION,
            capture_depth: DEFAULT_CAPTURE_DEPTH,
            move_epsilon: DEFAULT_MOVE_EPSILON,
            max_undo_levels: DEFAULT_MAX_UNDO_LEVELS,
        }
    }
}

impl PainterConfig {
    /// Default configuration overlaid with `TEXPAINT_QUALITY` and
    /// `TEXPAINT_COMPOSITE` from the process environment.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values returned by `lookup` for the known environment keys.
    /// Unparseable values are logged and ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup(QUALITY_ENV) {
            match value.parse() {
                Ok(tier) => self.quality = tier,
                Err(e) => warn!("Ignoring {}: {}", QUALITY_ENV, e),
            }
        }
        if let Some(value) = lookup(COMPOSITE_ENV) {
            match value.parse() {
                Ok(strategy) => self.composite = strategy,
                Err(e) => warn!("Ignoring {}: {}", COMPOSITE_ENV, e),
            }
        }
        self
    }

    /// Capture buffer edge length for the configured tier
    pub fn capture_resolution(&self) -> u32 {
        self.quality.resolution()
    }

    /// Check that every value is usable by the painting pipeline
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workgroup_size == 0 {
            return Err(ConfigError::ZeroWorkgroup);
        }
        if !(self.capture_offset > 0.0) {
            return Err(ConfigError::InvalidCaptureOffset(self.capture_offset));
        }
        if !(self.coverage_fraction > 0.0 && self.coverage_fraction <= 1.0) {
            return Err(ConfigError::InvalidCoverage(self.coverage_fraction));
        }
        if !(self.capture_depth > self.capture_offset) {
            return Err(ConfigError::InvalidCaptureDepth(self.capture_depth));
        }
        if self.resample_radius > MAX_RESAMPLE_RADIUS {
            return Err(ConfigError::ResampleRadiusTooLarge(self.resample_radius));
        }
        if !(self.move_epsilon.is_finite() && self.move_epsilon >= 0.0) {
            return Err(ConfigError::InvalidMoveEpsilon(self.move_epsilon));
        }
        Ok(())
    }
}

/// Check persistent texture dimensions
pub fn validate_texture_size(width: u32, height: u32) -> Result<(), ConfigError> {
    if width == 0 || height == 0 {
        return Err(ConfigError::EmptyTexture { width, height });
    }
    Ok(())
}
