//! # Impact Engine
//!
//! Projectile contact correction and damage propagation for destructible
//! block grids.
//!
//! ## Features
//!
//! - **Contact correction**: recomputes the surface contact of projectiles
//!   that tunnelled into a structure within one tick
//! - **Background workers**: corrections run off the tick thread and are
//!   joined at hit resolution
//! - **Armor-piercing damage**: a projectile's health pool is spent block by
//!   block along its path, across one or several structures
//! - **Hot configuration**: settings are shared live with the host and read
//!   on every event
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use impact_engine::prelude::*;
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), EngineError> {
//!     let settings = SettingsHandle::new(PatchSettings::default());
//!     let mut engine = PatchEngine::install(&HostManifest::complete(true), settings)?;
//!
//!     let wall = GridStructure::new(StructureId(1), 1.0, Transform::identity());
//!     wall.fill_cubes(CellCoord::new(0, -2, -2), CellCoord::new(3, 2, 2), 100.0);
//!     let wall: Arc<dyn Structure> = Arc::new(wall);
//!
//!     let mut bullet = SimProjectile::new(ProjectileId(1), Vec3::new(2.4, 0.1, 0.2), Vec3::new(800.0, 0.0, 0.0), 250.0)
//!         .with_contact(Vec3::new(2.0, 0.1, 0.2), Vec3::new(0.0, 1.0, 0.0));
//!
//!     engine.on_event(ProjectileEvent::ContactStart { projectile: &bullet, collided: Some(Arc::clone(&wall)) });
//!     let response = engine.on_event(ProjectileEvent::Hit {
//!         projectile: &mut bullet,
//!         targets: HitTargets::Single(wall),
//!         next_position: Vec3::new(4.0, 0.1, 0.2),
//!     });
//!     assert!(response.is_handled());
//!     engine.on_event(ProjectileEvent::Retired { projectile: ProjectileId(1) });
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::must_use_candidate,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

pub mod foundation;
pub mod config;
pub mod host;
pub mod physics;
pub mod correction;
pub mod damage;
pub mod events;
pub mod sim;

mod engine;

pub use engine::{EngineError, EngineStats, PatchEngine, CAPABILITY_CHECK_ENV};

#[cfg(test)]
mod tests;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{BackMovementTarget, Config, ConfigError, NoHitPolicy, PatchSettings, SettingsHandle},
        correction::{CellRaycaster, CorrectionScheduler, CorrectionState, TrajectoryCorrector, WorkerPool},
        damage::{DamagePropagator, DamageReport, StopReason},
        events::{EventResponse, HitTargets, ProjectileEvent, ProjectileEventHandler},
        foundation::math::{CellCoord, Mat4, Transform, Vec3},
        host::{Block, BlockId, HostManifest, Projectile, ProjectileId, Structure, StructureId},
        physics::{CollisionMesh, IntersectionFlags, LineSegment},
        sim::{GridBlock, GridStructure, SimProjectile},
        EngineError, EngineStats, PatchEngine,
    };
}
