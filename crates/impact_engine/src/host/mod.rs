//! Host capability surface
//!
//! The engine never reaches into host objects directly. Everything it reads
//! or writes goes through the narrow traits in this module, which the host
//! implements for its projectiles, structures and blocks.
//!
//! Structures and blocks are shared with correction workers as
//! `Arc<dyn Structure>` / `Arc<dyn Block>`, so both traits require
//! `Send + Sync`. Projectiles are only ever touched from the tick thread.

mod capabilities;

pub use capabilities::{HostManifest, REQUIRED_CAPABILITIES};

use std::sync::Arc;

use crate::foundation::math::{self, CellCoord, Mat4, Vec3};
use crate::physics::CollisionMesh;

/// Host identity of a projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectileId(pub u64);

/// Host identity of a structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructureId(pub u64);

/// Host identity of a block, unique across structures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u64);

/// Damage category passed to the host's damage primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DamageKind {
    /// Kinetic projectile impact
    Bullet,
}

/// Metadata accompanying a damage application
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitInfo {
    /// World-space contact position
    pub position: Vec3,
    /// World-space contact normal
    pub normal: Vec3,
    /// Projectile velocity at impact
    pub velocity: Vec3,
    /// Opaque shape key reported by the host's contact
    pub shape_key: u32,
}

/// One piece of block geometry, placed relative to the structure
#[derive(Debug, Clone)]
pub struct ShapePart {
    /// Model-to-structure transform
    pub local_matrix: Mat4,
    /// Model-space collision mesh
    pub model: Arc<CollisionMesh>,
}

impl ShapePart {
    /// Create a part from a transform and a shared mesh
    pub fn new(local_matrix: Mat4, model: Arc<CollisionMesh>) -> Self {
        Self { local_matrix, model }
    }
}

/// Geometry snapshot of a block
#[derive(Debug, Clone)]
pub enum BlockShape {
    /// One composite body, optionally with moving sub-parts
    Composite {
        /// Main body
        body: ShapePart,
        /// Sub-parts in registration order
        subparts: Vec<ShapePart>,
    },
    /// Simple block built from several parts
    Parts(Vec<ShapePart>),
}

/// Projectile capabilities used by the engine
pub trait Projectile {
    /// Host identity
    fn id(&self) -> ProjectileId;

    /// World position in the current tick
    fn position(&self) -> Vec3;

    /// Move the projectile
    fn set_position(&mut self, position: Vec3);

    /// Linear velocity
    fn velocity(&self) -> Vec3;

    /// Contact point reported by the host, if any
    fn contact_point(&self) -> Option<Vec3>;

    /// Overwrite the contact point
    fn set_contact_point(&mut self, point: Vec3);

    /// Contact normal reported by the host
    fn contact_normal(&self) -> Vec3;

    /// Overwrite the contact normal
    fn set_contact_normal(&mut self, normal: Vec3);

    /// Opaque shape key of the contact
    fn shape_key(&self) -> u32;

    /// Remaining damage budget
    fn health_pool(&self) -> f32;

    /// Overwrite the damage budget
    fn set_health_pool(&mut self, health: f32);

    /// Identity of whoever fired the projectile
    fn launcher_id(&self) -> i64;

    /// Detonate at the current position
    fn detonate(&mut self);
}

/// Destructible structure capabilities used by the engine
pub trait Structure: Send + Sync {
    /// Host identity
    fn id(&self) -> StructureId;

    /// Structure-to-world transform
    fn world_matrix(&self) -> Mat4;

    /// Smallest occupied cell coordinate on each axis
    fn min_cell(&self) -> CellCoord;

    /// Largest occupied cell coordinate on each axis
    fn max_cell(&self) -> CellCoord;

    /// `(min_cell, max_cell)` read from one consistent view of the occupancy
    fn cell_bounds(&self) -> (CellCoord, CellCoord) {
        (self.min_cell(), self.max_cell())
    }

    /// Edge length of a cell in structure-local units
    fn cell_size(&self) -> f64;

    /// Preview or blueprint structure
    fn is_preview(&self) -> bool;

    /// Structure is being built by a projector
    fn has_projector(&self) -> bool;

    /// Blocks on this structure may be destroyed
    fn destruction_enabled(&self) -> bool;

    /// Cells crossed by the world-space segment `from -> to`, in traversal order
    fn raycast_cells(&self, from: Vec3, to: Vec3) -> Vec<CellCoord>;

    /// Block occupying `cell`
    fn block_at(&self, cell: CellCoord) -> Option<Arc<dyn Block>>;
}

/// Destructible block capabilities used by the engine
pub trait Block: Send + Sync {
    /// Host identity
    fn id(&self) -> BlockId;

    /// Block centre in structure-local coordinates
    fn local_position(&self) -> Vec3;

    /// Damage still needed to destroy the block
    fn remaining_damage(&self) -> f32;

    /// Current integrity; zero or less once destroyed
    fn integrity(&self) -> f32;

    /// Destructible even when its structure has destruction disabled
    fn force_destructible(&self) -> bool;

    /// Geometry snapshot for raycasting
    fn shape(&self) -> BlockShape;

    /// Apply damage through the host's damage pipeline
    fn apply_damage(&self, amount: f32, kind: DamageKind, hit: &HitInfo, attacker: i64);
}

/// World-space centre of a block
pub fn block_world_position(structure: &dyn Structure, block: &dyn Block) -> Vec3 {
    math::transform_point(&structure.world_matrix(), block.local_position())
}

/// Whether a block may take damage on its structure
pub fn is_destructible(structure: &dyn Structure, block: &dyn Block) -> bool {
    structure.destruction_enabled() || block.force_destructible()
}
