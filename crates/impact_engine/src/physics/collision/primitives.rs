//! Primitive collision shapes and intersection algorithms
//!
//! Provides line segments and triangles with segment intersection testing
//! that honours front-face culling.

use bitflags::bitflags;

use crate::foundation::math::{self, Vec3};

bitflags! {
    /// Which triangles take part in an intersection test
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IntersectionFlags: u8 {
        /// Only triangles facing the segment origin
        const DIRECT_TRIANGLES = 1 << 0;
        /// Triangles facing away from the segment origin
        const BACKFACE_TRIANGLES = 1 << 1;
        /// Every triangle regardless of winding
        const ALL_TRIANGLES = Self::DIRECT_TRIANGLES.bits() | Self::BACKFACE_TRIANGLES.bits();
    }
}

/// A finite line segment used for raycasts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    /// Start of the segment
    pub from: Vec3,
    /// End of the segment
    pub to: Vec3,
}

impl LineSegment {
    /// Creates a new segment between two points
    pub fn new(from: Vec3, to: Vec3) -> Self {
        Self { from, to }
    }

    /// Unnormalised vector from `from` to `to`
    pub fn delta(&self) -> Vec3 {
        self.to - self.from
    }

    /// Unit direction, or zero for a degenerate segment
    pub fn direction(&self) -> Vec3 {
        math::try_normalize(self.delta()).unwrap_or_else(Vec3::zeros)
    }

    /// Point at parameter `t`, where 0 is `from` and 1 is `to`
    pub fn point_at(&self, t: f64) -> Vec3 {
        self.from + self.delta() * t
    }

    /// Transform both endpoints by an affine matrix
    pub fn transformed(&self, matrix: &math::Mat4) -> Self {
        Self {
            from: math::transform_point(matrix, self.from),
            to: math::transform_point(matrix, self.to),
        }
    }
}

/// A triangle for collision detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
}

impl Triangle {
    /// Creates a new triangle
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Calculates the normal of the triangle (right-hand rule)
    pub fn normal(&self) -> Vec3 {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        math::try_normalize(edge1.cross(&edge2)).unwrap_or_else(Vec3::zeros)
    }

    /// Möller-Trumbore segment-triangle intersection
    ///
    /// Returns the segment parameter `t` in `[0, 1]` of the hit. A triangle
    /// is front-facing when its winding is counter-clockwise as seen from
    /// the segment origin; `flags` decides which facings are accepted.
    pub fn intersect_segment(&self, segment: &LineSegment, flags: IntersectionFlags) -> Option<f64> {
        const EPSILON: f64 = 1e-12;

        let direction = segment.delta();
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = direction.cross(&edge2);
        let det = edge1.dot(&h);

        // det > 0 means the segment runs against the triangle normal
        let facing = if det > EPSILON {
            IntersectionFlags::DIRECT_TRIANGLES
        } else if det < -EPSILON {
            IntersectionFlags::BACKFACE_TRIANGLES
        } else {
            return None;
        };
        if !flags.contains(facing) {
            return None;
        }

        let f = 1.0 / det;
        let s = segment.from - self.v0;
        let u = f * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(&q);
        (0.0..=1.0).contains(&t).then_some(t)
    }
}
