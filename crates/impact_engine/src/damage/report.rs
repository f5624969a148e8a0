//! Outcome of one damage pass

use crate::foundation::math::Vec3;
use crate::host::{BlockId, StructureId};

/// Why propagation stopped at a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The health pool reached zero
    Exhausted,
    /// Damage was applied but the pool did not decrease
    Stalled,
    /// The block survived the hit
    Absorbed,
}

/// Damage dealt to one block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockDamage {
    /// Damaged block
    pub block: BlockId,
    /// Structure holding it
    pub structure: StructureId,
    /// Amount handed to the host
    pub applied: f32,
    /// Integrity read back after the hit
    pub integrity_after: f32,
}

/// Where the projectile was stopped
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detonation {
    /// Block the projectile stopped in
    pub block: BlockId,
    /// World position it was moved to
    pub position: Vec3,
    /// Stop condition that fired
    pub reason: StopReason,
}

/// Summary of a damage pass
#[derive(Debug, Clone, PartialEq)]
pub struct DamageReport {
    /// Health pool before the pass
    pub health_before: f32,
    /// Health pool after the pass
    pub health_after: f32,
    /// Blocks damaged, in application order
    pub blocks: Vec<BlockDamage>,
    /// Set when propagation stopped and the projectile detonated
    pub detonation: Option<Detonation>,
}

impl DamageReport {
    /// Report for a pass that did nothing
    pub fn untouched(health: f32) -> Self {
        Self {
            health_before: health,
            health_after: health,
            blocks: Vec::new(),
            detonation: None,
        }
    }

    /// Whether the projectile detonated
    pub fn detonated(&self) -> bool {
        self.detonation.is_some()
    }

    /// Whether any block was damaged
    pub fn hit_anything(&self) -> bool {
        !self.blocks.is_empty()
    }

    /// Total damage handed to the host
    pub fn total_applied(&self) -> f32 {
        self.blocks.iter().map(|b| b.applied).sum()
    }
}
