/// Default tile size for dirty tracking on the persistent texture.
pub const DEFAULT_TILE_SIZE: u32 = 64;

/// Capture-buffer value for pixels that do not cover the surface.
/// Lies outside [0, 1] so it can never be mistaken for a real coordinate.
pub const NO_COVERAGE: [f32; 2] = [-1.0, -1.0];

/// Smallest half field of view used for a trailing capture camera (radians).
pub const MIN_HALF_FOV: f32 = 1e-4;

/// Largest half field of view used for a trailing capture camera (radians).
pub const MAX_HALF_FOV: f32 = 1.5;

/// Near plane of a trailing capture camera as a fraction of its offset.
pub const NEAR_FRACTION: f32 = 0.05;

/// Half field of view used when the brush size is given in capture pixels.
pub const PIXEL_BRUSH_HALF_FOV: f32 = std::f32::consts::FRAC_PI_4;
