//! Shared scene setup for the scenario tests

use std::sync::Arc;

use crate::config::{PatchSettings, SettingsHandle};
use crate::correction::WorkerPool;
use crate::foundation::math::{CellCoord, Transform, Vec3};
use crate::host::{HostManifest, ProjectileId, Structure, StructureId};
use crate::sim::{GridBlock, GridStructure, SimProjectile};
use crate::PatchEngine;

/// Wall of 100-integrity cubes, x in [-0.5, 3.5], y and z in [-2.5, 2.5]
pub fn wall(id: u64) -> (Arc<GridStructure>, Vec<Arc<GridBlock>>) {
    let structure = GridStructure::new(StructureId(id), 1.0, Transform::identity());
    let blocks = structure.fill_cubes(CellCoord::new(0, -2, -2), CellCoord::new(3, 2, 2), 100.0);
    (Arc::new(structure), blocks)
}

/// Block of `wall` at cell `(x, 0, 0)`
pub fn centre_block(blocks: &[Arc<GridBlock>], x: i32) -> Arc<GridBlock> {
    // fill_cubes iterates x, then y, then z over a 5x5 cross-section
    let index = usize::try_from(x * 25 + 2 * 5 + 2).unwrap_or_default();
    Arc::clone(&blocks[index])
}

pub fn as_structure(structure: &Arc<GridStructure>) -> Arc<dyn Structure> {
    Arc::clone(structure) as Arc<dyn Structure>
}

/// Fast projectile whose naive contact lies deep inside the wall
pub fn phased_bullet(id: u64, health: f32) -> SimProjectile {
    SimProjectile::new(ProjectileId(id), Vec3::new(2.4, 0.1, 0.2), Vec3::new(800.0, 0.0, 0.0), health)
        .with_contact(Vec3::new(2.0, 0.1, 0.2), Vec3::new(0.0, 1.0, 0.0))
        .with_launcher(7)
}

pub fn engine_with(settings: PatchSettings) -> PatchEngine {
    let pool = WorkerPool::new(2).expect("spawn workers");
    PatchEngine::install_with_pool(&HostManifest::complete(true), SettingsHandle::new(settings), pool)
        .expect("complete manifest installs")
}

pub fn engine() -> PatchEngine {
    engine_with(PatchSettings::default())
}
