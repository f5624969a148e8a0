//! Damage propagation after correction

use std::sync::Arc;

use super::fixtures::{as_structure, centre_block, engine, engine_with, phased_bullet, wall};
use crate::config::PatchSettings;
use crate::damage::StopReason;
use crate::events::{EventResponse, HitTargets, ProjectileEvent, ProjectileEventHandler};
use crate::foundation::math::{CellCoord, Transform, Vec3};
use crate::host::{Block, BlockId, ProjectileId, Structure, StructureId};
use crate::sim::{GridStructure, SimProjectile};

fn fire(engine: &mut crate::PatchEngine, bullet: &mut SimProjectile, structure: &Arc<dyn Structure>, next_position: Vec3) -> EventResponse {
    engine.on_event(ProjectileEvent::ContactStart {
        projectile: &*bullet,
        collided: Some(Arc::clone(structure)),
    });
    engine.on_event(ProjectileEvent::Hit {
        projectile: bullet,
        targets: HitTargets::Single(Arc::clone(structure)),
        next_position,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_corrected_contact_damages_from_surface() {
        let mut engine = engine();
        let (wall, blocks) = wall(1);
        let mut bullet = phased_bullet(1, 250.0);

        let response = fire(&mut engine, &mut bullet, &as_structure(&wall), Vec3::new(4.0, 0.1, 0.2));
        let EventResponse::Handled(report) = response else {
            panic!("damage pass expected");
        };

        // 100 + 100 spent on the first two blocks, the last 50 stops in the third
        assert!(centre_block(&blocks, 0).is_destroyed());
        assert!(centre_block(&blocks, 1).is_destroyed());
        assert_relative_eq!(centre_block(&blocks, 2).integrity(), 50.0);
        assert!(centre_block(&blocks, 3).damage_log().is_empty());

        assert_relative_eq!(bullet.health_pool, 0.0);
        assert_eq!(report.detonation.map(|d| d.reason), Some(StopReason::Exhausted));
        assert_relative_eq!(bullet.detonated_at.expect("detonated"), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(engine.stats().detonations, 1);
    }

    #[test]
    fn test_uncorrected_contact_skips_outer_blocks() {
        let mut engine = engine_with(PatchSettings::default().with_correction(false));
        let (wall, blocks) = wall(1);
        let mut bullet = phased_bullet(1, 250.0);

        fire(&mut engine, &mut bullet, &as_structure(&wall), Vec3::new(4.0, 0.1, 0.2));

        // Damage starts where the naive contact sits, inside the third block
        assert!(centre_block(&blocks, 0).damage_log().is_empty());
        assert!(centre_block(&blocks, 1).damage_log().is_empty());
        assert!(centre_block(&blocks, 2).is_destroyed());
        assert!(centre_block(&blocks, 3).is_destroyed());
        assert!(!bullet.has_detonated());
        assert_relative_eq!(bullet.health_pool, 50.0);
    }

    #[test]
    fn test_pierce_then_survive() {
        let mut engine = engine();
        let structure = GridStructure::new(StructureId(4), 1.0, Transform::identity());
        let a = structure.place_cube(CellCoord::new(0, 0, 0), 40.0);
        let b = structure.place_cube(CellCoord::new(1, 0, 0), 1000.0);
        let structure: Arc<dyn Structure> = Arc::new(structure);

        let mut bullet = SimProjectile::new(ProjectileId(5), Vec3::new(-2.0, 0.1, 0.2), Vec3::new(600.0, 0.0, 0.0), 100.0)
            .with_contact(Vec3::new(-0.52, 0.1, 0.2), Vec3::new(-1.0, 0.0, 0.0));
        engine.on_event(ProjectileEvent::Hit {
            projectile: &mut bullet,
            targets: HitTargets::Single(structure),
            next_position: Vec3::new(3.0, 0.1, 0.2),
        });

        assert!(a.is_destroyed());
        assert!(b.integrity() > 0.0);
        assert_relative_eq!(b.integrity(), 940.0);
        assert_relative_eq!(bullet.health_pool, 0.0);
        assert_relative_eq!(bullet.detonated_at.expect("detonated at B"), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_multiple_structures_in_distance_order() {
        let mut engine = engine();
        let place = |id: u64, x: f64| {
            let structure = GridStructure::new(StructureId(id), 1.0, Transform::from_position(Vec3::new(x, 0.0, 0.0)));
            let block = structure.place_cube(CellCoord::zeros(), 10.0);
            (Arc::new(structure) as Arc<dyn Structure>, block.id())
        };
        // Block centres 5, 2 and 8 units from the contact, enumerated in that order
        let (far, far_id) = place(1, 5.0);
        let (near, near_id) = place(2, 2.0);
        let (farthest, farthest_id) = place(3, 8.0);

        let mut bullet = SimProjectile::new(ProjectileId(6), Vec3::new(-1.0, 0.0, 0.0), Vec3::new(900.0, 0.0, 0.0), 1000.0)
            .with_contact(Vec3::new(0.0, 0.1, 0.2), Vec3::new(-1.0, 0.0, 0.0));
        let response = engine.on_event(ProjectileEvent::Hit {
            projectile: &mut bullet,
            targets: HitTargets::Multiple(vec![far, near, farthest]),
            next_position: Vec3::new(20.0, 0.1, 0.2),
        });

        let EventResponse::Handled(report) = response else {
            panic!("damage pass expected");
        };
        let order: Vec<BlockId> = report.blocks.iter().map(|b| b.block).collect();
        assert_eq!(order, vec![near_id, far_id, farthest_id]);
    }

    #[test]
    fn test_no_blocks_along_ray() {
        let mut engine = engine();
        let (wall, _) = wall(1);
        let structure = as_structure(&wall);

        // Passes well above the wall
        let mut bullet = SimProjectile::new(ProjectileId(8), Vec3::new(-3.0, 9.0, 0.0), Vec3::new(500.0, 0.0, 0.0), 100.0)
            .with_contact(Vec3::new(-1.0, 9.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        let response = engine.on_event(ProjectileEvent::Hit {
            projectile: &mut bullet,
            targets: HitTargets::Single(structure),
            next_position: Vec3::new(6.0, 9.0, 0.0),
        });

        let EventResponse::Handled(report) = response else {
            panic!("damage pass expected");
        };
        assert!(!report.hit_anything());
        assert!(!bullet.has_detonated());
        assert_relative_eq!(bullet.health_pool, 100.0);
    }

    #[test]
    fn test_disabled_damage_passes_to_host() {
        let mut engine = engine_with(PatchSettings::default().with_damage(false));
        let (wall, blocks) = wall(1);
        let mut bullet = phased_bullet(1, 250.0);

        let response = fire(&mut engine, &mut bullet, &as_structure(&wall), Vec3::new(4.0, 0.1, 0.2));
        assert_eq!(response, EventResponse::Passed);
        assert!(blocks.iter().all(|b| b.damage_log().is_empty()));
        assert_eq!(engine.stats().damage_passes, 0);
    }

    #[test]
    fn test_non_structure_target_passes() {
        let mut engine = engine();
        let mut bullet = phased_bullet(1, 250.0);
        let response = engine.on_event(ProjectileEvent::Hit {
            projectile: &mut bullet,
            targets: HitTargets::Other,
            next_position: Vec3::new(4.0, 0.1, 0.2),
        });
        assert_eq!(response, EventResponse::Passed);
        assert_relative_eq!(bullet.health_pool, 250.0);
    }

    #[test]
    fn test_consecutive_volley_wears_wall_down() {
        let mut engine = engine();
        let (wall, blocks) = wall(1);
        let structure = as_structure(&wall);

        for id in 1..=4 {
            let mut bullet = phased_bullet(id, 100.0);
            fire(&mut engine, &mut bullet, &structure, Vec3::new(4.0, 0.1, 0.2));
            engine.on_event(ProjectileEvent::Retired {
                projectile: ProjectileId(id),
            });
            wall.remove_destroyed();
        }

        assert!((0..4).all(|x| centre_block(&blocks, x).is_destroyed()));
        assert_eq!(engine.pending_corrections(), 0);
        // The last naive contact lies in front of the only block left, so there is nothing to correct
        assert_eq!(engine.stats().corrections_applied, 3);
        assert_eq!(engine.stats().corrections_skipped, 1);
    }
}
