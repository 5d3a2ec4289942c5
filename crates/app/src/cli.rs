//! Command-line arguments and the stroke replay they drive
//!
//! Usage examples:
//!   texpaint --output painted.png
//!   texpaint --shape sphere --capture pointer-ray --color '#3080ff' -o sphere.png
//!   texpaint --texture base.png --stamp bristle.png --falloff linear -o out.png
//!   texpaint --generate-url http://127.0.0.1:7860/generate --prompt "mossy stone" -o out.png

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use glam::{Vec2, Vec3};
use painting::{
    BrushPose, BrushSize, CapturePoseStrategy, CpuSurface, Falloff, PaintError, PaintOutcome, Painter,
    PointerRayCapture, Stamp, SurfaceMesh, TrailingCapture,
};
use texpaint_config::{CompositeStrategy, PainterConfig, QualityTier};
use texpaint_diffusion::{GenerationBackend, GenerationError, GenerationRequest, RemoteGeneration};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Distance a pointer ray starts in front of the surface
const POINTER_DISTANCE: f32 = 2.0;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Painter error: {0}")]
    Paint(#[from] PaintError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Image error for {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid color '{0}': expected #rrggbb or #rrggbbaa")]
    InvalidColor(String),

    #[error("Stamp image {0} is empty")]
    EmptyStamp(PathBuf),

    #[error("Painter returned no texture")]
    NoTexture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shape {
    /// Unit quad in the XY plane facing +Z
    Quad,
    /// Unit sphere at the origin
    Sphere,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Capture {
    /// Camera trails behind a brush tip that touches the surface
    Trailing,
    /// Brush is a ray from a distance; the camera follows its hit point
    PointerRay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FalloffArg {
    Smooth,
    Linear,
    Hard,
}

impl From<FalloffArg> for Falloff {
    fn from(value: FalloffArg) -> Self {
        match value {
            FalloffArg::Smooth => Falloff::Smooth,
            FalloffArg::Linear => Falloff::Linear,
            FalloffArg::Hard => Falloff::Hard,
        }
    }
}

/// Replay a straight brush stroke across a textured surface and save the
/// painted texture.
#[derive(Parser, Debug)]
#[command(name = "texpaint", about = "Texture-space projection painting driver")]
pub struct CliArgs {
    /// Where to write the painted texture (PNG)
    #[arg(short, long, value_name = "FILE", default_value = "texpaint.png")]
    pub output: PathBuf,

    /// Initial texture image; a flat base color is used when omitted
    #[arg(short, long, value_name = "FILE")]
    pub texture: Option<PathBuf>,

    /// Generation service URL used to create the initial texture from --prompt
    #[arg(long, value_name = "URL", requires = "prompt")]
    pub generate_url: Option<String>,

    /// Prompt sent to the generation service
    #[arg(long)]
    pub prompt: Option<String>,

    /// Texture edge length when no image is supplied
    #[arg(long, default_value_t = 512)]
    pub size: u32,

    #[arg(long, value_enum, default_value_t = Shape::Quad)]
    pub shape: Shape,

    #[arg(long, value_enum, default_value_t = Capture::Trailing)]
    pub capture: Capture,

    /// Capture quality tier: low, medium, high, ultra
    #[arg(short, long)]
    pub quality: Option<QualityTier>,

    /// Compositing strategy: sequential or bounded
    #[arg(long)]
    pub composite: Option<CompositeStrategy>,

    /// Brush radius in world units
    #[arg(short, long, default_value_t = 0.05)]
    pub radius: f32,

    /// Brush color as sRGB hex
    #[arg(short, long, default_value = "#d03020")]
    pub color: String,

    #[arg(long, default_value_t = 1.0)]
    pub opacity: f32,

    #[arg(long, value_enum, default_value_t = FalloffArg::Smooth)]
    pub falloff: FalloffArg,

    /// Grayscale stamp image modulating the brush
    #[arg(long, value_name = "FILE")]
    pub stamp: Option<PathBuf>,

    /// Number of input samples along the stroke
    #[arg(long, default_value_t = 48)]
    pub samples: u32,

    /// Undo the stroke after painting it
    #[arg(long)]
    pub undo: bool,
}

/// Parse `#rrggbb` or `#rrggbbaa` into a linear color
pub fn parse_color(text: &str) -> Result<[f32; 4], AppError> {
    let hex = text.trim().trim_start_matches('#');
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return Err(AppError::InvalidColor(text.to_string()));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| AppError::InvalidColor(text.to_string()))
    };

    let alpha = if hex.len() == 8 { channel(3)? as f32 / 255.0 } else { 1.0 };
    Ok([
        painting::srgb_u8_to_linear(channel(0)?),
        painting::srgb_u8_to_linear(channel(1)?),
        painting::srgb_u8_to_linear(channel(2)?),
        alpha,
    ])
}

/// Brush poses for a straight stroke across the front of `shape`
pub fn stroke_poses(shape: Shape, capture: Capture, samples: u32) -> Vec<BrushPose> {
    let samples = samples.max(2);
    (0..samples)
        .map(|i| {
            let t = i as f32 / (samples - 1) as f32;
            let on_surface = match shape {
                Shape::Quad => Vec2::new(0.2 + 0.6 * t, 0.5).extend(0.0),
                Shape::Sphere => {
                    let x = -0.6 + 1.2 * t;
                    Vec3::new(x, 0.0, (1.0 - x * x).max(0.0).sqrt())
                }
            };
            let position = match capture {
                Capture::Trailing => on_surface,
                Capture::PointerRay => on_surface + Vec3::Z * POINTER_DISTANCE,
            };
            BrushPose::looking(position, Vec3::NEG_Z)
        })
        .collect()
}

async fn initial_texture(args: &CliArgs) -> Result<CpuSurface, AppError> {
    if let (Some(url), Some(prompt)) = (&args.generate_url, &args.prompt) {
        let mut backend = RemoteGeneration::new(url)?;
        let request = GenerationRequest::new(prompt.clone()).with_size(args.size, args.size);
        let image = backend.generate(request).await?;
        info!("Generated {}x{} initial texture", image.width(), image.height());
        return Ok(CpuSurface::from_rgba8(&image));
    }

    if let Some(path) = &args.texture {
        let image = image::open(path)
            .map_err(|source| AppError::Image {
                path: path.clone(),
                source,
            })?
            .to_rgba8();
        info!("Loaded {}x{} texture from {}", image.width(), image.height(), path.display());
        return Ok(CpuSurface::from_rgba8(&image));
    }

    Ok(CpuSurface::filled(args.size, args.size, [0.5, 0.5, 0.5, 1.0]))
}

fn load_stamp(path: &PathBuf) -> Result<Stamp, AppError> {
    let image = image::open(path)
        .map_err(|source| AppError::Image {
            path: path.clone(),
            source,
        })?
        .to_luma8();
    Stamp::from_luma(&image).ok_or_else(|| AppError::EmptyStamp(path.clone()))
}

pub async fn run(args: CliArgs) -> Result<(), AppError> {
    let mut config = PainterConfig::from_env();
    if let Some(quality) = args.quality {
        config.quality = quality;
    }
    if let Some(composite) = args.composite {
        config.composite = composite;
    }

    let surface = match args.shape {
        Shape::Quad => SurfaceMesh::unit_quad(),
        Shape::Sphere => SurfaceMesh::uv_sphere(48, 24),
    };
    let strategy: Box<dyn CapturePoseStrategy> = match args.capture {
        Capture::Trailing => Box::new(TrailingCapture::from_config(&config)),
        Capture::PointerRay => Box::new(PointerRayCapture::from_config(&config)),
    };
    let texture = initial_texture(&args).await?;

    let mut painter = Painter::initialize(config, surface, texture, strategy)?;

    let controls = painter.controls();
    controls.set_size(BrushSize::World(args.radius));
    controls.set_color(parse_color(&args.color)?);
    controls.set_opacity(args.opacity);
    controls.set_falloff(args.falloff.into());
    if let Some(path) = &args.stamp {
        controls.set_stamp(Some(Arc::new(load_stamp(path)?)));
    }

    let mut painted = 0usize;
    let mut blends = 0usize;
    for pose in stroke_poses(args.shape, args.capture, args.samples) {
        match painter.on_input_sample(&pose, true) {
            Ok(PaintOutcome::Painted(stats)) => {
                painted += 1;
                blends += stats.blends;
            }
            Ok(outcome) => debug!(?outcome, "Sample skipped"),
            Err(e) if e.is_configuration() => return Err(e.into()),
            Err(e) => warn!("Dropped sample: {}", e),
        }
    }
    let released = painter.on_input_sample(&BrushPose::looking(Vec3::ZERO, Vec3::NEG_Z), false)?;
    info!(painted, blends, ?released, "Stroke replayed");

    let dirty = painter.take_dirty_regions();
    info!("{} dirty regions to upload", dirty.len());

    if args.undo && painter.undo() {
        info!("Stroke undone");
    }

    let texture = painter.shutdown().ok_or(AppError::NoTexture)?;
    texture.to_rgba8().save(&args.output).map_err(|source| AppError::Image {
        path: args.output.clone(),
        source,
    })?;
    info!("Wrote {}", args.output.display());
    Ok(())
}
