//! Paintable surface geometry
//!
//! A [`SurfaceMesh`] is the renderable half of a paintable surface: triangle
//! positions, the texture coordinates that address the persistent texture,
//! and a model transform placing it in the world. The painter only reads it.

use glam::{Mat4, Vec2, Vec3};

use crate::error::PaintError;

/// Triangle mesh with one texture coordinate per vertex.
#[derive(Debug, Clone)]
pub struct SurfaceMesh {
    positions: Vec<Vec3>,
    uvs: Vec<Vec2>,
    indices: Vec<u32>,
    /// Local-to-world transform
    pub transform: Mat4,
}

impl SurfaceMesh {
    /// Build a mesh, checking that attributes line up.
    ///
    /// # Errors
    /// `PaintError::InvalidMesh` if the uv count differs from the position
    /// count, the index count is not a multiple of three, or an index is out
    /// of range.
    pub fn new(positions: Vec<Vec3>, uvs: Vec<Vec2>, indices: Vec<u32>) -> Result<Self, PaintError> {
        if positions.len() != uvs.len() {
            return Err(PaintError::InvalidMesh(format!(
                "{} positions but {} texture coordinates",
                positions.len(),
                uvs.len()
            )));
        }
        if indices.len() % 3 != 0 {
            return Err(PaintError::InvalidMesh(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(PaintError::InvalidMesh(format!(
                "index {} out of range for {} vertices",
                bad,
                positions.len()
            )));
        }

        Ok(Self {
            positions,
            uvs,
            indices,
            transform: Mat4::IDENTITY,
        })
    }

    /// Set the local-to-world transform
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// Unit quad in the XY plane at z = 0, spanning (0,0)-(1,1), facing +Z.
    ///
    /// Texture coordinates equal the normalized position.
    pub fn unit_quad() -> Self {
        Self {
            positions: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            uvs: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            indices: vec![0, 1, 2, 0, 2, 3],
            transform: Mat4::IDENTITY,
        }
    }

    /// Unit-radius UV sphere centered at the origin.
    ///
    /// `segments` runs around the equator (u), `rings` from pole to pole (v).
    /// The u = 0 / u = 1 seam duplicates its vertices.
    pub fn uv_sphere(segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);

        let mut positions = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
        let mut uvs = Vec::with_capacity(positions.capacity());

        for ring in 0..=rings {
            let v = ring as f32 / rings as f32;
            let theta = v * std::f32::consts::PI;
            for segment in 0..=segments {
                let u = segment as f32 / segments as f32;
                let phi = u * std::f32::consts::TAU;
                positions.push(Vec3::new(
                    theta.sin() * phi.cos(),
                    theta.cos(),
                    theta.sin() * phi.sin(),
                ));
                uvs.push(Vec2::new(u, v));
            }
        }

        let stride = segments + 1;
        let mut indices = Vec::with_capacity((segments * rings * 6) as usize);
        for ring in 0..rings {
            for segment in 0..segments {
                let a = ring * stride + segment;
                let b = a + stride;
                indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }

        Self {
            positions,
            uvs,
            indices,
            transform: Mat4::IDENTITY,
        }
    }

    /// Get the number of triangles in the mesh
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the vertex indices for a triangle
    pub fn triangle_indices(&self, tri_index: usize) -> (usize, usize, usize) {
        let base = tri_index * 3;
        (
            self.indices[base] as usize,
            self.indices[base + 1] as usize,
            self.indices[base + 2] as usize,
        )
    }

    /// Local-space positions of a triangle's vertices
    pub fn triangle_positions(&self, tri_index: usize) -> [Vec3; 3] {
        let (i0, i1, i2) = self.triangle_indices(tri_index);
        [self.positions[i0], self.positions[i1], self.positions[i2]]
    }

    /// Texture coordinates of a triangle's vertices
    pub fn triangle_uvs(&self, tri_index: usize) -> [Vec2; 3] {
        let (i0, i1, i2) = self.triangle_indices(tri_index);
        [self.uvs[i0], self.uvs[i1], self.uvs[i2]]
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }
}
