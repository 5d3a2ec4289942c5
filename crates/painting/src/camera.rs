//! Capture camera placement.
//!
//! A paint event starts by deciding where the capture camera sits and where
//! the brush lands in capture-buffer pixels. Three interchangeable
//! [`CapturePoseStrategy`] implementations cover the placements in use:
//!
//! - [`FixedCapture`]: one external viewpoint shared by the whole surface;
//!   the brush position is projected through it.
//! - [`TrailingCapture`]: a per-event camera behind the brush tip along its
//!   forward axis, with the field of view sized so the brush radius covers a
//!   chosen fraction of the buffer: `half_fov = atan(radius / (offset * coverage))`.
//! - [`PointerRayCapture`]: casts the pose as a ray against the surface and
//!   trails a camera behind the hit point.

use glam::{Mat4, Vec2, Vec3, Vec4};
use texpaint_config::PainterConfig;

use crate::brush::BrushSize;
use crate::constants::{MAX_HALF_FOV, MIN_HALF_FOV, NEAR_FRACTION, PIXEL_BRUSH_HALF_FOV};
use crate::mesh::SurfaceMesh;
use crate::raycast::raycast_surface;
use crate::types::BrushPose;

/// View and projection used to render the capture buffer.
///
/// Projection matrices follow glam's right-handed convention with clip-space
/// depth in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureCamera {
    pub view: Mat4,
    pub projection: Mat4,
}

impl CaptureCamera {
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self { view, projection }
    }

    /// Perspective camera at `eye` looking along `forward`
    pub fn perspective(eye: Vec3, forward: Vec3, up: Vec3, fov_y: f32, near: f32, far: f32) -> Self {
        Self {
            view: Mat4::look_to_rh(eye, forward, up),
            projection: Mat4::perspective_rh(fov_y, 1.0, near, far),
        }
    }

    #[inline]
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// World-space right vector of the camera
    pub fn right(&self) -> Vec3 {
        self.view.inverse().x_axis.truncate().normalize_or_zero()
    }

    /// Project a world point to capture-buffer pixel coordinates.
    ///
    /// Returns None for points on or behind the camera plane.
    pub fn project_to_pixel(&self, world: Vec3, size: u32) -> Option<Vec2> {
        let clip = self.view_projection() * Vec4::new(world.x, world.y, world.z, 1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        Some(ndc_to_pixel(clip.truncate() / clip.w, size))
    }
}

/// Map normalized device coordinates to pixel coordinates (y down)
#[inline]
pub fn ndc_to_pixel(ndc: Vec3, size: u32) -> Vec2 {
    let s = size as f32;
    Vec2::new((ndc.x + 1.0) * 0.5 * s, (1.0 - ndc.y) * 0.5 * s)
}

/// Camera plus brush footprint location for one paint event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureSetup {
    pub camera: CaptureCamera,
    /// Brush center in capture-buffer pixels
    pub center: Vec2,
    /// Brush radius in capture-buffer pixels
    pub radius_px: f32,
}

/// Inputs a strategy may use to place the capture camera
#[derive(Debug, Clone, Copy)]
pub struct CaptureRequest<'a> {
    pub pose: &'a BrushPose,
    pub size: BrushSize,
    pub surface: &'a SurfaceMesh,
    /// Capture buffer edge length in pixels
    pub resolution: u32,
}

/// Decides the capture viewpoint and brush footprint for a paint event.
///
/// Returning None means the brush does not land on anything this event
/// (behind a fixed camera, or a pointer ray that misses the surface).
pub trait CapturePoseStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn capture_setup(&self, request: &CaptureRequest<'_>) -> Option<CaptureSetup>;
}

/// Fixed external viewpoint shared across the whole surface
#[derive(Debug, Clone, Copy)]
pub struct FixedCapture {
    pub camera: CaptureCamera,
}

impl FixedCapture {
    pub fn new(camera: CaptureCamera) -> Self {
        Self { camera }
    }
}

impl CapturePoseStrategy for FixedCapture {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn capture_setup(&self, request: &CaptureRequest<'_>) -> Option<CaptureSetup> {
        let center = self
            .camera
            .project_to_pixel(request.pose.position, request.resolution)?;

        let radius_px = match request.size {
            BrushSize::World(radius) if radius > 0.0 => {
                // Measure the projected radius along the camera's right axis
                let edge = request.pose.position + self.camera.right() * radius;
                self.camera
                    .project_to_pixel(edge, request.resolution)
                    .map(|p| p.distance(center))
                    .unwrap_or(0.0)
            }
            BrushSize::World(_) => 0.0,
            BrushSize::CapturePixels(radius) => radius.max(0.0),
        };

        Some(CaptureSetup {
            camera: self.camera,
            center,
            radius_px,
        })
    }
}

/// Per-event camera trailing the brush tip along its forward axis
#[derive(Debug, Clone, Copy)]
pub struct TrailingCapture {
    /// Distance behind the brush tip
    pub offset: f32,
    /// Fraction of the buffer half-extent the brush radius covers
    pub coverage: f32,
    /// Far plane distance from the camera
    pub depth: f32,
}

impl TrailingCapture {
    pub fn new(offset: f32, coverage: f32, depth: f32) -> Self {
        Self {
            offset,
            coverage,
            depth,
        }
    }

    pub fn from_config(config: &PainterConfig) -> Self {
        Self::new(config.capture_offset, config.coverage_fraction, config.capture_depth)
    }

    /// Half field of view and pixel radius for a brush size
    fn frustum(&self, size: BrushSize, resolution: u32) -> (f32, f32) {
        let half_extent = resolution as f32 * 0.5;
        match size {
            BrushSize::World(radius) => {
                let radius = radius.max(0.0);
                let half_fov = (radius / (self.offset * self.coverage))
                    .atan()
                    .clamp(MIN_HALF_FOV, MAX_HALF_FOV);
                // Equals coverage * half_extent unless the fov was clamped
                let radius_px = radius / (self.offset * half_fov.tan()) * half_extent;
                (half_fov, radius_px)
            }
            BrushSize::CapturePixels(radius) => (PIXEL_BRUSH_HALF_FOV, radius.max(0.0)),
        }
    }

    fn setup_at(&self, pose: &BrushPose, size: BrushSize, resolution: u32) -> CaptureSetup {
        let forward = pose.forward();
        let eye = pose.position - forward * self.offset;
        let (half_fov, radius_px) = self.frustum(size, resolution);

        let camera = CaptureCamera::perspective(
            eye,
            forward,
            pose.up(),
            half_fov * 2.0,
            self.offset * NEAR_FRACTION,
            self.depth,
        );

        CaptureSetup {
            camera,
            center: Vec2::splat(resolution as f32 * 0.5),
            radius_px,
        }
    }
}

impl CapturePoseStrategy for TrailingCapture {
    fn name(&self) -> &'static str {
        "trailing"
    }

    fn capture_setup(&self, request: &CaptureRequest<'_>) -> Option<CaptureSetup> {
        Some(self.setup_at(request.pose, request.size, request.resolution))
    }
}

/// Pointer ray placement: trail a camera behind wherever the ray hits
#[derive(Debug, Clone, Copy)]
pub struct PointerRayCapture {
    pub trailing: TrailingCapture,
}

impl PointerRayCapture {
    pub fn new(trailing: TrailingCapture) -> Self {
        Self { trailing }
    }

    pub fn from_config(config: &PainterConfig) -> Self {
        Self::new(TrailingCapture::from_config(config))
    }
}

impl CapturePoseStrategy for PointerRayCapture {
    fn name(&self) -> &'static str {
        "pointer_ray"
    }

    fn capture_setup(&self, request: &CaptureRequest<'_>) -> Option<CaptureSetup> {
        let hit = raycast_surface(request.pose.position, request.pose.forward(), request.surface)?;
        let at_hit = BrushPose::new(hit.position, request.pose.rotation);
        Some(self.trailing.setup_at(&at_hit, request.size, request.resolution))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(pose: &'a BrushPose, size: BrushSize, surface: &'a SurfaceMesh) -> CaptureRequest<'a> {
        CaptureRequest {
            pose,
            size,
            surface,
            resolution: 256,
        }
    }

    #[test]
    fn test_trailing_fov_matches_radius() {
        let quad = SurfaceMesh::unit_quad();
        let pose = BrushPose::looking(Vec3::new(0.5, 0.5, 0.1), Vec3::NEG_Z);
        let strategy = TrailingCapture::new(0.1, 1.0, 10.0);

        let setup = strategy
            .capture_setup(&request(&pose, BrushSize::World(0.05), &quad))
            .unwrap();

        assert!((setup.center - Vec2::splat(128.0)).length() < 1e-5);
        assert!((setup.radius_px - 128.0).abs() < 1e-2);

        // A point one brush radius to the side of the tip lands on the buffer edge
        let edge = setup
            .camera
            .project_to_pixel(pose.position + pose.right() * 0.05, 256)
            .unwrap();
        assert!((edge.x - 256.0).abs() < 0.5);
        assert!((edge.y - 128.0).abs() < 0.5);
    }

    #[test]
    fn test_trailing_coverage_fraction() {
        let quad = SurfaceMesh::unit_quad();
        let pose = BrushPose::looking(Vec3::new(0.5, 0.5, 0.1), Vec3::NEG_Z);
        let strategy = TrailingCapture::new(0.1, 0.5, 10.0);

        let setup = strategy
            .capture_setup(&request(&pose, BrushSize::World(0.05), &quad))
            .unwrap();
        assert!((setup.radius_px - 64.0).abs() < 1e-2);
    }

    #[test]
    fn test_trailing_zero_radius_is_finite() {
        let quad = SurfaceMesh::unit_quad();
        let pose = BrushPose::looking(Vec3::new(0.5, 0.5, 0.1), Vec3::NEG_Z);
        let strategy = TrailingCapture::new(0.1, 1.0, 10.0);

        let setup = strategy
            .capture_setup(&request(&pose, BrushSize::World(0.0), &quad))
            .unwrap();
        assert_eq!(setup.radius_px, 0.0);
        assert!(setup.camera.projection.is_finite());
    }

    #[test]
    fn test_fixed_projects_brush_center() {
        let quad = SurfaceMesh::unit_quad();
        let camera = CaptureCamera::new(
            Mat4::look_to_rh(Vec3::new(0.5, 0.5, 1.0), Vec3::NEG_Z, Vec3::Y),
            Mat4::orthographic_rh(-0.5, 0.5, -0.5, 0.5, 0.1, 10.0),
        );
        let strategy = FixedCapture::new(camera);
        let pose = BrushPose::looking(Vec3::new(0.75, 0.25, 0.0), Vec3::NEG_Z);

        let setup = strategy
            .capture_setup(&request(&pose, BrushSize::World(0.125), &quad))
            .unwrap();
        assert!((setup.center - Vec2::new(192.0, 192.0)).length() < 1e-3);
        assert!((setup.radius_px - 32.0).abs() < 1e-3);
    }

    #[test]
    fn test_fixed_behind_camera() {
        let quad = SurfaceMesh::unit_quad();
        let camera = CaptureCamera::perspective(Vec3::new(0.5, 0.5, 1.0), Vec3::NEG_Z, Vec3::Y, 1.0, 0.1, 10.0);
        let strategy = FixedCapture::new(camera);
        let pose = BrushPose::looking(Vec3::new(0.5, 0.5, 2.0), Vec3::NEG_Z);

        assert!(strategy
            .capture_setup(&request(&pose, BrushSize::World(0.1), &quad))
            .is_none());
    }

    #[test]
    fn test_pointer_ray_hit_and_miss() {
        let quad = SurfaceMesh::unit_quad();
        let strategy = PointerRayCapture::new(TrailingCapture::new(0.1, 1.0, 10.0));

        let pose = BrushPose::looking(Vec3::new(0.25, 0.75, 3.0), Vec3::NEG_Z);
        let setup = strategy
            .capture_setup(&request(&pose, BrushSize::World(0.05), &quad))
            .unwrap();
        // Camera sits `offset` in front of the hit point
        let eye = setup.camera.view.inverse().w_axis.truncate();
        assert!((eye - Vec3::new(0.25, 0.75, 0.1)).length() < 1e-4);

        let miss = BrushPose::looking(Vec3::new(5.0, 5.0, 3.0), Vec3::NEG_Z);
        assert!(strategy
            .capture_setup(&request(&miss, BrushSize::World(0.05), &quad))
            .is_none());
    }
}
