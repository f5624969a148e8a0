//! Per-cell raycasting against block geometry
//!
//! Two selection policies coexist on purpose:
//! - composite blocks test the body, then each sub-part in registration
//!   order, and keep the **first** part that reports a hit;
//! - simple multi-part blocks test every part and keep the hit **nearest**
//!   to the ray origin.
//!
//! Geometry is read through [`Block::shape`], which hands back a snapshot.
//! The tick thread may still change a block between two snapshots taken by
//! a correction worker; that race is accepted and not detected here.

use crate::foundation::math::{self, Mat4, Vec3};
use crate::host::{Block, BlockShape, ShapePart, Structure};
use crate::physics::{IntersectionFlags, LineSegment, MeshHit};

/// Outcome of a successful cell raycast
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellHit {
    /// Geometry was hit; the contact was not computed
    Confirmed,
    /// Geometry was hit at a world-space point with a world-space normal
    Detailed {
        /// Intersection point
        point: Vec3,
        /// Normal of the intersected triangle
        normal: Vec3,
    },
}

impl CellHit {
    /// World-space hit point, if it was computed
    pub fn point(&self) -> Option<Vec3> {
        match self {
            Self::Confirmed => None,
            Self::Detailed { point, .. } => Some(*point),
        }
    }

    /// World-space normal, if it was computed
    pub fn normal(&self) -> Option<Vec3> {
        match self {
            Self::Confirmed => None,
            Self::Detailed { normal, .. } => Some(*normal),
        }
    }
}

/// Raycasts the solid geometry occupying a single cell
pub struct CellRaycaster;

impl CellRaycaster {
    /// Raycast one block of `structure` along a world-space segment
    ///
    /// With `want_detail == false` the hit is only confirmed and no
    /// world-space point or normal is produced.
    pub fn raycast(
        structure: &dyn Structure,
        block: &dyn Block,
        ray: &LineSegment,
        want_detail: bool,
        flags: IntersectionFlags,
    ) -> Option<CellHit> {
        let world = structure.world_matrix();

        match block.shape() {
            BlockShape::Composite { body, subparts } => {
                Self::first_hit(&world, std::iter::once(&body).chain(subparts.iter()), ray, want_detail, flags)
            }
            BlockShape::Parts(parts) => Self::nearest_hit(&world, &parts, ray, want_detail, flags),
        }
    }

    fn first_hit<'a>(
        world: &Mat4,
        mut parts: impl Iterator<Item = &'a ShapePart>,
        ray: &LineSegment,
        want_detail: bool,
        flags: IntersectionFlags,
    ) -> Option<CellHit> {
        parts.find_map(|part| {
            let matrix = world * part.local_matrix;
            cast_part(&matrix, part, ray, flags).map(|hit| detail(want_detail, &matrix, &hit))
        })
    }

    fn nearest_hit(
        world: &Mat4,
        parts: &[ShapePart],
        ray: &LineSegment,
        want_detail: bool,
        flags: IntersectionFlags,
    ) -> Option<CellHit> {
        let mut nearest: Option<(f64, CellHit)> = None;

        for part in parts {
            let matrix = world * part.local_matrix;
            let Some(hit) = cast_part(&matrix, part, ray, flags) else {
                continue;
            };

            // Each part has its own transform, so compare in world space
            let point = math::transform_point(&matrix, hit.point);
            let distance_sq = (point - ray.from).magnitude_squared();
            if nearest.map_or(true, |(best, _)| distance_sq < best) {
                nearest = Some((distance_sq, detail(want_detail, &matrix, &hit)));
            }
        }

        nearest.map(|(_, hit)| hit)
    }
}

fn cast_part(matrix: &Mat4, part: &ShapePart, ray: &LineSegment, flags: IntersectionFlags) -> Option<MeshHit> {
    let inverse = math::try_inverse_or_identity(matrix);
    part.model.intersect_segment(&ray.transformed(&inverse), flags)
}

fn detail(want_detail: bool, matrix: &Mat4, hit: &MeshHit) -> CellHit {
    if want_detail {
        CellHit::Detailed {
            point: math::transform_point(matrix, hit.point),
            normal: math::transform_normal(matrix, hit.normal),
        }
    } else {
        CellHit::Confirmed
    }
}
