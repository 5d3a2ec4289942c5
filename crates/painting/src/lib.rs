//! Texture-space projection painting
//!
//! This crate paints a brush onto a surface's persistent color texture by
//! rendering the surface's own texture coordinates from a brush-aligned
//! camera and blending into the texels those coordinates address:
//! - [`camera`] - capture pose strategies (fixed, trailing, pointer ray)
//! - [`renderer`] - surface index map rendering into the [`capture`] buffer
//! - [`resample`] - Gaussian smoothing of captured texture coordinates
//! - [`footprint`] - falloff shapes and stamps to blend strength
//! - [`compositor`] - sequential and bounded parallel texel compositing
//! - [`tiles`] - persistent texture with dirty tracking and undo snapshots
//! - [`painter`] - the per-event orchestrator tying it together

pub mod brush;
pub mod camera;
pub mod capture;
pub mod compositor;
pub mod constants;
pub mod error;
pub mod footprint;
pub mod mesh;
pub mod painter;
pub mod raycast;
pub mod renderer;
pub mod resample;
pub mod surface;
pub mod tiles;
pub mod types;

pub use brush::*;
pub use camera::*;
pub use capture::*;
pub use compositor::{
    compositor_for, texel_address, BoundedCompositor, CompositeJob, CompositeStats, SequentialCompositor,
    TexelCompositor,
};
pub use constants::*;
pub use error::*;
pub use footprint::*;
pub use mesh::*;
pub use painter::*;
pub use raycast::*;
pub use renderer::*;
pub use resample::*;
pub use surface::*;
pub use tiles::*;
pub use types::*;

pub use texpaint_config as config;
