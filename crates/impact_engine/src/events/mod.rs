//! Projectile lifecycle events
//!
//! The host calls into the engine at three extension points:
//! - contact-start, when its narrow phase first reports a contact
//! - hit, immediately before it finalizes the collision outcome
//! - retirement, exactly once when the projectile is removed
//!
//! The handler answers each call with an [`EventResponse`]. A handled hit
//! means the engine already applied damage and the host must skip its own.

use std::fmt;
use std::sync::Arc;

use crate::damage::DamageReport;
use crate::foundation::math::Vec3;
use crate::host::{Projectile, ProjectileId, Structure};

/// What a projectile hit, as reported by the host's broad phase
#[derive(Clone)]
pub enum HitTargets {
    /// One destructible structure
    Single(Arc<dyn Structure>),
    /// Several structures overlapping the projectile's path
    Multiple(Vec<Arc<dyn Structure>>),
    /// Something that is not a destructible structure
    Other,
}

impl fmt::Debug for HitTargets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(structure) => f.debug_tuple("Single").field(&structure.id()).finish(),
            Self::Multiple(structures) => f
                .debug_tuple("Multiple")
                .field(&structures.iter().map(|s| s.id()).collect::<Vec<_>>())
                .finish(),
            Self::Other => f.write_str("Other"),
        }
    }
}

/// Event delivered by the host
pub enum ProjectileEvent<'a> {
    /// Narrow phase reported a first contact
    ContactStart {
        /// Projectile carrying the naive contact point and normal
        projectile: &'a dyn Projectile,
        /// Collided structure, `None` for anything else
        collided: Option<Arc<dyn Structure>>,
    },
    /// Collision outcome is about to be finalized
    Hit {
        /// Projectile being resolved
        projectile: &'a mut dyn Projectile,
        /// What was hit
        targets: HitTargets,
        /// Where the projectile would be next tick
        next_position: Vec3,
    },
    /// Projectile removed from the world
    Retired {
        /// Retired projectile
        projectile: ProjectileId,
    },
}

impl ProjectileEvent<'_> {
    /// Projectile the event concerns
    pub fn projectile_id(&self) -> ProjectileId {
        match self {
            Self::ContactStart { projectile, .. } => projectile.id(),
            Self::Hit { projectile, .. } => projectile.id(),
            Self::Retired { projectile } => *projectile,
        }
    }

    /// Short event name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::ContactStart { .. } => "contact_start",
            Self::Hit { .. } => "hit",
            Self::Retired { .. } => "retired",
        }
    }
}

/// Handler answer
#[derive(Debug, Clone, PartialEq)]
pub enum EventResponse {
    /// Damage was applied here; the host must skip its own damage step
    Handled(DamageReport),
    /// The host should run its stock behaviour
    Passed,
}

impl EventResponse {
    /// Whether the host's own behaviour is suppressed
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled(_))
    }
}

/// Receiver of projectile lifecycle events
pub trait ProjectileEventHandler {
    /// Handle one event
    fn on_event(&mut self, event: ProjectileEvent<'_>) -> EventResponse;
}
