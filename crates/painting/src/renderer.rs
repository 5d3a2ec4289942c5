//! Surface index map rendering.
//!
//! The capture render draws the surface mesh from the capture camera and
//! writes, per pixel, the texture coordinate of the nearest visible surface
//! point. Pixels that see no surface keep the no-coverage sentinel.
//!
//! [`SoftwareIndexRenderer`] is a scanline-free edge-function rasterizer:
//! triangles are clipped against the near and far planes, fan-triangulated,
//! depth tested per pixel center and interpolated perspective-correctly.
//! Triangles are not backface culled so both sides of open meshes capture.

use glam::{Mat4, Vec2, Vec4};

use crate::camera::{ndc_to_pixel, CaptureCamera};
use crate::capture::CaptureBuffer;
use crate::error::RenderError;
use crate::mesh::SurfaceMesh;

/// Renders a surface index map into a capture buffer.
///
/// On success every pixel holds either the UV of the visible surface point
/// or the no-coverage sentinel, and the buffer is marked valid. On failure
/// the buffer must not be consumed.
pub trait SurfaceIndexRenderer: Send {
    fn render(
        &mut self,
        camera: &CaptureCamera,
        mesh: &SurfaceMesh,
        target: &mut CaptureBuffer,
    ) -> Result<(), RenderError>;
}

/// Vertex after the model-view-projection transform
#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    clip: Vec4,
    uv: Vec2,
}

impl ClipVertex {
    fn lerp(self, other: ClipVertex, t: f32) -> ClipVertex {
        ClipVertex {
            clip: self.clip.lerp(other.clip, t),
            uv: self.uv.lerp(other.uv, t),
        }
    }
}

/// Vertex in pixel space, carrying what perspective-correct interpolation needs
#[derive(Debug, Clone, Copy)]
struct ScreenVertex {
    pixel: Vec2,
    depth: f32,
    inv_w: f32,
    uv_over_w: Vec2,
}

/// CPU rasterizer for the surface index map
#[derive(Debug, Default)]
pub struct SoftwareIndexRenderer {
    depth: Vec<f32>,
}

impl SoftwareIndexRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn rasterize_triangle(&mut self, tri: [ScreenVertex; 3], target: &mut CaptureBuffer) {
        let size = target.size();
        let [a, b, c] = tri;

        let area = edge(a.pixel, b.pixel, c.pixel);
        if area.abs() < f32::EPSILON {
            return;
        }
        let inv_area = 1.0 / area;

        let min = a.pixel.min(b.pixel).min(c.pixel);
        let max = a.pixel.max(b.pixel).max(c.pixel);
        if max.x < 0.0 || max.y < 0.0 || min.x >= size as f32 || min.y >= size as f32 {
            return;
        }
        let x0 = (min.x.floor().max(0.0)) as u32;
        let y0 = (min.y.floor().max(0.0)) as u32;
        let x1 = (max.x.ceil() as u32).min(size - 1);
        let y1 = (max.y.ceil() as u32).min(size - 1);

        for y in y0..=y1 {
            for x in x0..=x1 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                // Dividing by the signed area makes both windings positive inside
                let w0 = edge(b.pixel, c.pixel, p) * inv_area;
                let w1 = edge(c.pixel, a.pixel, p) * inv_area;
                let w2 = edge(a.pixel, b.pixel, p) * inv_area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let depth = w0 * a.depth + w1 * b.depth + w2 * c.depth;
                let index = (y * size + x) as usize;
                if depth >= self.depth[index] {
                    continue;
                }

                let inv_w = w0 * a.inv_w + w1 * b.inv_w + w2 * c.inv_w;
                if inv_w <= 0.0 {
                    continue;
                }
                let uv = (a.uv_over_w * w0 + b.uv_over_w * w1 + c.uv_over_w * w2) / inv_w;

                self.depth[index] = depth;
                target.set(x, y, uv);
            }
        }
    }
}

impl SurfaceIndexRenderer for SoftwareIndexRenderer {
    fn render(
        &mut self,
        camera: &CaptureCamera,
        mesh: &SurfaceMesh,
        target: &mut CaptureBuffer,
    ) -> Result<(), RenderError> {
        target.clear();

        let mvp: Mat4 = camera.view_projection() * mesh.transform;
        if !mvp.is_finite() {
            return Err(RenderError::Incomplete(
                "capture camera transform is not finite".to_string(),
            ));
        }

        let size = target.size();
        let pixel_count = (size as usize) * (size as usize);
        self.depth.clear();
        self.depth.resize(pixel_count, f32::INFINITY);

        let mut polygon = Vec::with_capacity(6);
        let mut scratch = Vec::with_capacity(6);

        for tri in 0..mesh.triangle_count() {
            let positions = mesh.triangle_positions(tri);
            let uvs = mesh.triangle_uvs(tri);

            polygon.clear();
            for (p, uv) in positions.iter().zip(uvs) {
                polygon.push(ClipVertex {
                    clip: mvp * p.extend(1.0),
                    uv,
                });
            }

            // Near (z >= 0) then far (z <= w) in glam's 0..1 clip depth
            clip_polygon(&polygon, &mut scratch, |v| v.clip.z);
            clip_polygon(&scratch, &mut polygon, |v| v.clip.w - v.clip.z);
            if polygon.len() < 3 {
                continue;
            }

            let screen: Vec<ScreenVertex> = polygon
                .iter()
                .map(|v| {
                    let inv_w = 1.0 / v.clip.w;
                    let ndc = v.clip.truncate() * inv_w;
                    ScreenVertex {
                        pixel: ndc_to_pixel(ndc, size),
                        depth: ndc.z,
                        inv_w,
                        uv_over_w: v.uv * inv_w,
                    }
                })
                .collect();

            for i in 1..screen.len() - 1 {
                self.rasterize_triangle([screen[0], screen[i], screen[i + 1]], target);
            }
        }

        target.mark_valid();
        tracing::trace!(
            triangles = mesh.triangle_count(),
            covered = target.covered_count(),
            "Rendered surface index map"
        );
        Ok(())
    }
}

/// Signed doubled area of (a, b, p)
#[inline]
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Sutherland-Hodgman clip of a convex polygon against `distance >= 0`
fn clip_polygon(
    input: &[ClipVertex],
    output: &mut Vec<ClipVertex>,
    distance: impl Fn(&ClipVertex) -> f32,
) {
    output.clear();
    if input.is_empty() {
        return;
    }

    let mut prev = input[input.len() - 1];
    let mut prev_d = distance(&prev);
    for &current in input {
        let d = distance(&current);
        if d >= 0.0 {
            if prev_d < 0.0 {
                output.push(prev.lerp(current, prev_d / (prev_d - d)));
            }
            output.push(current);
        } else if prev_d >= 0.0 {
            output.push(prev.lerp(current, prev_d / (prev_d - d)));
        }
        prev = current;
        prev_d = d;
    }
}
