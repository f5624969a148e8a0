//! Armor-piercing damage along the corrected trajectory
//!
//! The damage ray runs from the contact point to the projectile's next-tick
//! position. Blocks along it take damage in order until the projectile's
//! health pool is spent, a block survives, or the pool stops shrinking.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::PatchSettings;
use crate::correction::CellRaycaster;
use crate::foundation::math::{self, Vec3};
use crate::host::{self, Block, BlockId, DamageKind, HitInfo, Projectile, Structure};
use crate::physics::{IntersectionFlags, LineSegment};

use super::report::{BlockDamage, DamageReport, Detonation, StopReason};

/// One block queued for damage
struct Candidate<'a> {
    structure: &'a dyn Structure,
    block: Arc<dyn Block>,
}

/// Applies a projectile's health pool to the blocks behind its contact
#[derive(Debug, Clone)]
pub struct DamagePropagator {
    back_movement: f64,
}

impl DamagePropagator {
    /// Propagator reading its back-movement from `settings`
    pub fn new(settings: &PatchSettings) -> Self {
        Self {
            back_movement: settings.damage_back_movement(),
        }
    }

    /// Damage the blocks of one structure, in the structure's traversal order
    pub fn hit_single(&self, projectile: &mut dyn Projectile, structure: &dyn Structure, next_position: Vec3) -> DamageReport {
        let Some(ray) = self.damage_ray(projectile, next_position) else {
            return DamageReport::untouched(projectile.health_pool());
        };

        let candidates = structure
            .raycast_cells(ray.from, ray.to)
            .into_iter()
            .filter_map(|cell| structure.block_at(cell))
            .map(|block| Candidate { structure, block });

        self.propagate(projectile, candidates, &ray, IntersectionFlags::ALL_TRIANGLES)
    }

    /// Damage the blocks of several overlapping structures, nearest block first
    ///
    /// Blocks at equal distance keep the order in which their structures
    /// were given.
    pub fn hit_multiple(
        &self,
        projectile: &mut dyn Projectile,
        structures: &[Arc<dyn Structure>],
        next_position: Vec3,
    ) -> DamageReport {
        if structures.is_empty() {
            return DamageReport::untouched(projectile.health_pool());
        }
        let Some(ray) = self.damage_ray(projectile, next_position) else {
            return DamageReport::untouched(projectile.health_pool());
        };

        let mut ordered: Vec<(f64, Candidate<'_>)> = Vec::new();
        for structure in structures {
            let structure = structure.as_ref();
            for cell in structure.raycast_cells(ray.from, ray.to) {
                if let Some(block) = structure.block_at(cell) {
                    let distance_sq = (host::block_world_position(structure, block.as_ref()) - ray.from).magnitude_squared();
                    ordered.push((distance_sq, Candidate { structure, block }));
                }
            }
        }
        ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

        self.propagate(
            projectile,
            ordered.into_iter().map(|(_, candidate)| candidate),
            &ray,
            IntersectionFlags::DIRECT_TRIANGLES,
        )
    }

    fn damage_ray(&self, projectile: &dyn Projectile, next_position: Vec3) -> Option<LineSegment> {
        let contact = projectile.contact_point()?;
        let origin = match math::try_normalize(next_position - contact) {
            Some(direction) => contact - direction * self.back_movement,
            None => contact,
        };
        Some(LineSegment::new(origin, next_position))
    }

    fn propagate<'a>(
        &self,
        projectile: &mut dyn Projectile,
        candidates: impl Iterator<Item = Candidate<'a>>,
        ray: &LineSegment,
        flags: IntersectionFlags,
    ) -> DamageReport {
        let mut report = DamageReport::untouched(projectile.health_pool());
        let Some(contact) = projectile.contact_point() else {
            return report;
        };
        let hit = HitInfo {
            position: contact,
            normal: projectile.contact_normal(),
            velocity: projectile.velocity(),
            shape_key: projectile.shape_key(),
        };
        let attacker = projectile.launcher_id();
        let mut visited: HashSet<BlockId> = HashSet::new();

        for Candidate { structure, block } in candidates {
            // Marked as seen before the destructibility check
            if !visited.insert(block.id()) || !host::is_destructible(structure, block.as_ref()) {
                continue;
            }
            if CellRaycaster::raycast(structure, block.as_ref(), ray, false, flags).is_none() {
                continue;
            }

            let starting_health = projectile.health_pool();
            let damage = block.remaining_damage().min(starting_health);
            block.apply_damage(damage, DamageKind::Bullet, &hit, attacker);

            let health = if damage.is_infinite() {
                0.0
            } else {
                (starting_health - damage).max(0.0)
            };
            projectile.set_health_pool(health);

            let integrity_after = block.integrity();
            log::debug!("Block {:?} took {damage} damage, integrity now {integrity_after}", block.id());
            report.blocks.push(BlockDamage {
                block: block.id(),
                structure: structure.id(),
                applied: damage,
                integrity_after,
            });

            let reason = if health <= 0.0 {
                Some(StopReason::Exhausted)
            } else if health == starting_health {
                Some(StopReason::Stalled)
            } else if integrity_after > 0.0 {
                Some(StopReason::Absorbed)
            } else {
                None
            };

            if let Some(reason) = reason {
                let position = host::block_world_position(structure, block.as_ref());
                projectile.set_position(position);
                projectile.detonate();
                log::info!(
                    "Projectile {:?} stopped in block {:?} ({reason:?}) after {} blocks",
                    projectile.id(),
                    block.id(),
                    report.blocks.len()
                );
                report.detonation = Some(Detonation {
                    block: block.id(),
                    position,
                    reason,
                });
                break;
            }
        }

        report.health_after = projectile.health_pool();
        report
    }
}
