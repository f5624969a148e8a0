//! Contact point correction against phasing
//!
//! A fast projectile can travel through a structure's surface within one
//! tick, leaving the host with a contact point somewhere inside the
//! geometry. The corrector searches for the real surface from outside the
//! structure inward:
//!
//! 1. take the offset from the naive contact to the projectile, collapsed
//!    onto the line of flight, and point it against the velocity;
//! 2. walk back along it to the structure's padded bounding corner, capped
//!    at the maximum search distance;
//! 3. traverse the cells from that origin to the naive contact and keep the
//!    first front-facing hit, nudged back by the back-movement distance.

use crate::config::{NoHitPolicy, PatchSettings};
use crate::foundation::math::{self, Vec3};
use crate::host::{Projectile, ProjectileId, Structure};
use crate::physics::{IntersectionFlags, LineSegment};

use super::raycaster::CellRaycaster;

/// Projectile state captured on the tick thread for a correction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionRequest {
    /// Projectile being corrected
    pub projectile: ProjectileId,
    /// Projectile position at contact
    pub position: Vec3,
    /// Projectile velocity at contact
    pub velocity: Vec3,
    /// Contact point reported by the host
    pub contact_point: Vec3,
    /// Contact normal reported by the host
    pub contact_normal: Vec3,
}

impl CorrectionRequest {
    /// Capture a request, or `None` when the host reported no contact point
    pub fn capture(projectile: &dyn Projectile) -> Option<Self> {
        Some(Self {
            projectile: projectile.id(),
            position: projectile.position(),
            velocity: projectile.velocity(),
            contact_point: projectile.contact_point()?,
            contact_normal: projectile.contact_normal(),
        })
    }
}

/// Where a corrected contact came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionSource {
    /// Raycast hit on block geometry
    SurfaceHit,
    /// No geometry was hit; the naive point collapsed onto the line of flight
    CollapsedFallback,
}

/// A corrected contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correction {
    /// World-space contact point
    pub point: Vec3,
    /// World-space contact normal
    pub normal: Vec3,
    /// How the point was obtained
    pub source: CorrectionSource,
}

/// Parameters the corrector reads from [`PatchSettings`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectorSettings {
    /// Distance the hit is moved back along the search ray
    pub back_movement: f64,
    /// Cap on how far the search origin sits from the contact
    pub max_search_distance: f64,
    /// Margin around the structure bounds, structure-local units
    pub bounds_padding: f64,
    /// Behaviour when nothing is hit
    pub no_hit_policy: NoHitPolicy,
}

impl From<&PatchSettings> for CorrectorSettings {
    fn from(settings: &PatchSettings) -> Self {
        Self {
            back_movement: settings.correction_back_movement(),
            max_search_distance: settings.max_search_distance,
            bounds_padding: settings.bounds_padding,
            no_hit_policy: settings.no_hit_policy,
        }
    }
}

/// Search direction derived from a request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchDirection {
    /// Unit vector pointing from the contact out of the structure
    pub outward: Vec3,
    /// Naive contact moved laterally onto the projectile's line of flight
    pub collapsed_point: Vec3,
}

/// Recomputes trustworthy contact points
#[derive(Debug, Clone)]
pub struct TrajectoryCorrector {
    settings: CorrectorSettings,
}

impl TrajectoryCorrector {
    /// Create a corrector with fixed parameters
    pub fn new(settings: CorrectorSettings) -> Self {
        Self { settings }
    }

    /// Run the full correction for one request
    ///
    /// `None` means "no correction": the direction was degenerate, or
    /// nothing was hit and the policy is [`NoHitPolicy::Skip`].
    pub fn correct(&self, request: &CorrectionRequest, structure: &dyn Structure) -> Option<Correction> {
        let Some(direction) = Self::search_direction(request) else {
            log::debug!("Projectile {:?}: degenerate search direction, skipping correction", request.projectile);
            return None;
        };

        let origin = self.search_origin(structure, request.contact_point, direction.outward);
        let ray = LineSegment::new(origin, request.contact_point);

        let surface = structure
            .raycast_cells(ray.from, ray.to)
            .into_iter()
            .filter_map(|cell| structure.block_at(cell))
            .find_map(|block| {
                CellRaycaster::raycast(structure, block.as_ref(), &ray, true, IntersectionFlags::DIRECT_TRIANGLES)
            })
            .and_then(|hit| Some((hit.point()?, hit.normal()?)));

        match surface {
            Some((point, normal)) => Some(Correction {
                point: point - ray.direction() * self.settings.back_movement,
                normal,
                source: CorrectionSource::SurfaceHit,
            }),
            None => {
                log::debug!("Projectile {:?}: search ray hit no geometry", request.projectile);
                match self.settings.no_hit_policy {
                    NoHitPolicy::Skip => None,
                    NoHitPolicy::CollapsedPoint => Some(Correction {
                        point: direction.collapsed_point,
                        normal: request.contact_normal,
                        source: CorrectionSource::CollapsedFallback,
                    }),
                }
            }
        }
    }

    /// Direction along which to search for the surface
    pub fn search_direction(request: &CorrectionRequest) -> Option<SearchDirection> {
        let heading = math::try_normalize(request.velocity);

        // Drop the lateral component; only travel along the line of flight matters
        let raw = request.position - request.contact_point;
        let collapsed = heading.map_or(raw, |heading| heading * raw.dot(&heading));
        let collapsed_point = request.position - collapsed;

        let mut offset = if raw.magnitude_squared() < math::DEGENERATE_LENGTH_SQUARED {
            heading?
        } else {
            collapsed
        };

        // Always search from outside, i.e. from where the projectile came from
        if heading.is_some_and(|heading| offset.dot(&heading) > 0.0) {
            offset = -offset;
        }

        Some(SearchDirection {
            outward: math::try_normalize(offset)?,
            collapsed_point,
        })
    }

    /// Point on `contact + outward * t` beyond the structure's padded bounding corner
    pub fn search_origin(&self, structure: &dyn Structure, contact: Vec3, outward: Vec3) -> Vec3 {
        let inverse = math::try_inverse_or_identity(&structure.world_matrix());
        let local_direction = inverse.transform_vector(&outward);
        let local_contact = math::transform_point(&inverse, contact);

        let cell_size = structure.cell_size();
        let half_cell = cell_size * 0.5;
        let (min_cell, max_cell) = structure.cell_bounds();
        let min = min_cell.cast::<f64>() * cell_size;
        let max = max_cell.cast::<f64>() * cell_size;

        let mut multiplier = 0.0f64;
        for axis in 0..3 {
            let component = local_direction[axis];
            if component.abs() < 1e-9 {
                continue;
            }
            let corner = if component > 0.0 {
                max[axis] + half_cell + self.settings.bounds_padding
            } else {
                min[axis] - half_cell - self.settings.bounds_padding
            };
            multiplier = multiplier.max((corner - local_contact[axis]) / component);
        }

        contact + outward * multiplier.min(self.settings.max_search_distance)
    }
}
