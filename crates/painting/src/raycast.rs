//! Ray-mesh intersection for pointer-driven brush placement.
//!
//! This module provides ray-triangle intersection using the Moller-Trumbore algorithm,
//! with texture-coordinate interpolation at hit points.

use glam::{Vec2, Vec3};

use crate::mesh::SurfaceMesh;

/// Epsilon for floating point comparisons in ray intersection
const EPSILON: f32 = 1e-6;

/// Result of a ray-triangle intersection test
#[derive(Debug, Clone, Copy)]
pub struct TriangleHit {
    /// Distance along the ray to the intersection point
    pub t: f32,
    /// Barycentric coordinate u (weight for vertex 1)
    pub u: f32,
    /// Barycentric coordinate v (weight for vertex 2)
    pub v: f32,
}

/// Closest intersection of a world-space ray with a surface mesh
#[derive(Debug, Clone, Copy)]
pub struct SurfaceHit {
    /// World-space hit position
    pub position: Vec3,
    /// Distance from the ray origin in world units
    pub distance: f32,
    /// Interpolated texture coordinate at the hit
    pub uv: Vec2,
    /// Triangle index that was hit
    pub triangle: usize,
}

/// Moller-Trumbore ray-triangle intersection algorithm.
///
/// Returns the hit distance and barycentric coordinates if the ray intersects
/// the triangle (either winding).
pub fn ray_triangle_intersection(
    ray_origin: Vec3,
    ray_dir: Vec3,
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
) -> Option<TriangleHit> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let pvec = ray_dir.cross(edge2);
    let det = edge1.dot(pvec);

    // Ray lies in the triangle's plane or misses
    if det.abs() < EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let tvec = ray_origin - v0;

    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(edge1);

    let v = ray_dir.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(qvec) * inv_det;

    // Only accept hits in front of the ray
    if t < EPSILON {
        return None;
    }

    Some(TriangleHit { t, u, v })
}

/// Interpolate a Vec2 attribute (like UVs) using barycentric coordinates.
pub fn interpolate_vec2(v0: Vec2, v1: Vec2, v2: Vec2, u: f32, v: f32) -> Vec2 {
    let w = 1.0 - u - v;
    v0 * w + v1 * u + v2 * v
}

/// Cast a world-space ray against a surface mesh and return the closest hit.
///
/// The ray is moved into mesh local space through the inverse model
/// transform; the reported position and distance are back in world space.
pub fn raycast_surface(ray_origin: Vec3, ray_dir: Vec3, mesh: &SurfaceMesh) -> Option<SurfaceHit> {
    let inverse = mesh.transform.inverse();
    let local_origin = inverse.transform_point3(ray_origin);
    let local_dir = inverse.transform_vector3(ray_dir);
    if local_dir.length_squared() < EPSILON * EPSILON {
        return None;
    }

    let mut closest: Option<(TriangleHit, usize)> = None;

    // Brute force over all triangles
    for tri in 0..mesh.triangle_count() {
        let [v0, v1, v2] = mesh.triangle_positions(tri);
        if let Some(hit) = ray_triangle_intersection(local_origin, local_dir, v0, v1, v2) {
            let dominated = closest.is_some_and(|(prev, _)| hit.t >= prev.t);
            if !dominated {
                closest = Some((hit, tri));
            }
        }
    }

    closest.map(|(hit, tri)| {
        let [uv0, uv1, uv2] = mesh.triangle_uvs(tri);
        let position = mesh
            .transform
            .transform_point3(local_origin + local_dir * hit.t);
        SurfaceHit {
            position,
            distance: (position - ray_origin).length(),
            uv: interpolate_vec2(uv0, uv1, uv2, hit.u, hit.v),
            triangle: tri,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;

    #[test]
    fn test_ray_triangle_hit() {
        // Triangle in XY plane at z=0
        let v0 = Vec3::new(0.0, 0.0, 0.0);
        let v1 = Vec3::new(1.0, 0.0, 0.0);
        let v2 = Vec3::new(0.0, 1.0, 0.0);

        let origin = Vec3::new(0.25, 0.25, 1.0);
        let dir = Vec3::new(0.0, 0.0, -1.0);

        let hit = ray_triangle_intersection(origin, dir, v0, v1, v2).unwrap();
        assert!((hit.t - 1.0).abs() < EPSILON);
        assert!((hit.u - 0.25).abs() < EPSILON);
        assert!((hit.v - 0.25).abs() < EPSILON);
    }

    #[test]
    fn test_ray_triangle_miss() {
        let v0 = Vec3::new(0.0, 0.0, 0.0);
        let v1 = Vec3::new(1.0, 0.0, 0.0);
        let v2 = Vec3::new(0.0, 1.0, 0.0);

        let origin = Vec3::new(2.0, 2.0, 1.0);
        let dir = Vec3::new(0.0, 0.0, -1.0);

        assert!(ray_triangle_intersection(origin, dir, v0, v1, v2).is_none());
    }

    #[test]
    fn test_ray_triangle_behind() {
        let v0 = Vec3::new(0.0, 0.0, 0.0);
        let v1 = Vec3::new(1.0, 0.0, 0.0);
        let v2 = Vec3::new(0.0, 1.0, 0.0);

        // Ray pointing away from triangle
        let origin = Vec3::new(0.25, 0.25, 1.0);
        let dir = Vec3::new(0.0, 0.0, 1.0);

        assert!(ray_triangle_intersection(origin, dir, v0, v1, v2).is_none());
    }

    #[test]
    fn test_raycast_quad_uv() {
        let quad = SurfaceMesh::unit_quad();
        let hit = raycast_surface(Vec3::new(0.3, 0.7, 2.0), Vec3::NEG_Z, &quad).unwrap();

        assert!((hit.uv - Vec2::new(0.3, 0.7)).length() < 1e-5);
        assert!((hit.distance - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_raycast_respects_transform() {
        let quad = SurfaceMesh::unit_quad().with_transform(Mat4::from_translation(Vec3::new(10.0, 0.0, -1.0)));

        assert!(raycast_surface(Vec3::new(0.5, 0.5, 2.0), Vec3::NEG_Z, &quad).is_none());

        let hit = raycast_surface(Vec3::new(10.5, 0.25, 2.0), Vec3::NEG_Z, &quad).unwrap();
        assert!((hit.position - Vec3::new(10.5, 0.25, -1.0)).length() < 1e-5);
        assert!((hit.uv - Vec2::new(0.5, 0.25)).length() < 1e-5);
        assert!((hit.distance - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_interpolate_vec2() {
        let v0 = Vec2::new(0.0, 0.0);
        let v1 = Vec2::new(1.0, 0.0);
        let v2 = Vec2::new(0.0, 1.0);

        assert!((interpolate_vec2(v0, v1, v2, 0.0, 0.0) - v0).length() < EPSILON);
        assert!((interpolate_vec2(v0, v1, v2, 1.0, 0.0) - v1).length() < EPSILON);
        assert!((interpolate_vec2(v0, v1, v2, 0.0, 1.0) - v2).length() < EPSILON);

        let center = (v0 + v1 + v2) / 3.0;
        let result = interpolate_vec2(v0, v1, v2, 1.0 / 3.0, 1.0 / 3.0);
        assert!((result - center).length() < EPSILON);
    }
}
