//! Collision mesh representations
//!
//! Meshes are stored in model space and shared between blocks through
//! `Arc`; raycasts bring the segment into model space instead of moving
//! the triangles out.

use super::primitives::{IntersectionFlags, LineSegment, Triangle};
use crate::foundation::math::Vec3;

/// Nearest intersection of a segment with a mesh, in the mesh's own space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshHit {
    /// Segment parameter of the hit in `[0, 1]`
    pub t: f64,
    /// Intersection point
    pub point: Vec3,
    /// Normal of the intersected triangle
    pub normal: Vec3,
}

/// A collision mesh stored in MODEL SPACE (local coordinates)
#[derive(Debug, Clone)]
pub struct CollisionMesh {
    /// Triangles in model space
    pub triangles: Vec<Triangle>,
    /// Radius of a sphere about the model origin enclosing every vertex
    pub bounding_radius: f64,
}

impl CollisionMesh {
    /// Creates a new collision mesh from MODEL SPACE vertices and indices
    ///
    /// Indices are consumed in triples; a trailing partial triple or an
    /// out-of-range index drops that triangle.
    pub fn from_vertices(vertices: &[Vec3], indices: &[u32]) -> Self {
        let triangles = indices
            .chunks_exact(3)
            .filter_map(|chunk| {
                let v0 = *vertices.get(chunk[0] as usize)?;
                let v1 = *vertices.get(chunk[1] as usize)?;
                let v2 = *vertices.get(chunk[2] as usize)?;
                Some(Triangle::new(v0, v1, v2))
            })
            .collect();

        Self::from_triangles(triangles)
    }

    /// Creates a collision mesh from triangles already in model space
    pub fn from_triangles(triangles: Vec<Triangle>) -> Self {
        let max_distance_sq = triangles
            .iter()
            .flat_map(|tri| [tri.v0, tri.v1, tri.v2])
            .map(|vertex| vertex.magnitude_squared())
            .fold(0.0f64, f64::max);

        Self {
            triangles,
            bounding_radius: max_distance_sq.sqrt(),
        }
    }

    /// Axis-aligned box centred on the origin with outward-facing triangles
    pub fn cuboid(half_extents: Vec3) -> Self {
        // (normal, tangent1, tangent2) with tangent1 x tangent2 == normal
        let faces = [
            (Vec3::x(), Vec3::y(), Vec3::z()),
            (-Vec3::x(), Vec3::z(), Vec3::y()),
            (Vec3::y(), Vec3::z(), Vec3::x()),
            (-Vec3::y(), Vec3::x(), Vec3::z()),
            (Vec3::z(), Vec3::x(), Vec3::y()),
            (-Vec3::z(), Vec3::y(), Vec3::x()),
        ];

        let mut triangles = Vec::with_capacity(12);
        for (normal, t1, t2) in faces {
            let n = normal.component_mul(&half_extents);
            let a = t1.component_mul(&half_extents);
            let b = t2.component_mul(&half_extents);
            let c0 = n - a - b;
            let c1 = n + a - b;
            let c2 = n + a + b;
            let c3 = n - a + b;
            triangles.push(Triangle::new(c0, c1, c2));
            triangles.push(Triangle::new(c0, c2, c3));
        }

        Self::from_triangles(triangles)
    }

    /// Cube with edge length `size`
    pub fn cube(size: f64) -> Self {
        Self::cuboid(Vec3::repeat(size * 0.5))
    }

    /// Test a model-space segment against every triangle, returning the hit nearest its start
    pub fn intersect_segment(&self, segment: &LineSegment, flags: IntersectionFlags) -> Option<MeshHit> {
        if !self.segment_reaches_bounds(segment) {
            return None;
        }

        let mut closest: Option<MeshHit> = None;
        for triangle in &self.triangles {
            let Some(t) = triangle.intersect_segment(segment, flags) else {
                continue;
            };
            if closest.map_or(true, |hit| t < hit.t) {
                closest = Some(MeshHit {
                    t,
                    point: segment.point_at(t),
                    normal: triangle.normal(),
                });
            }
        }

        closest
    }

    // Cheap reject: distance from the origin to the segment exceeds the bounding radius
    fn segment_reaches_bounds(&self, segment: &LineSegment) -> bool {
        let delta = segment.delta();
        let length_sq = delta.magnitude_squared();
        let t = if length_sq > 0.0 {
            (-segment.from.dot(&delta) / length_sq).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let closest = segment.point_at(t);
        closest.magnitude_squared() <= self.bounding_radius * self.bounding_radius + 1e-9
    }
}
