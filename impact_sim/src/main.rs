//! Impact simulation demo
//!
//! Fires a volley of fast projectiles at a block wall backed by an armour
//! plate. Every projectile reports a naive contact point deep inside the
//! wall, the way a host's narrow phase does when a projectile tunnels
//! through the surface within one tick. The engine corrects each contact on
//! its worker pool and then spends the projectile's health pool block by
//! block.
//!
//! Usage: `impact_sim [settings.toml|settings.ron]`

use std::sync::Arc;

use impact_engine::config::ConfigError;
use impact_engine::foundation::logging;
use impact_engine::prelude::*;
use rand::Rng;
use slotmap::SlotMap;
use thiserror::Error;

slotmap::new_key_type! {
    /// Arena key for projectiles in flight
    struct ProjectileKey;
}

const VOLLEY_SIZE: usize = 24;
const TICK_SECONDS: f64 = 1.0 / 60.0;
const WALL_FRONT: f64 = 19.5;
const PLATE_OFFSET: f64 = 26.0;

#[derive(Error, Debug)]
enum SimError {
    #[error("Settings error: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

/// A projectile plus what the host's physics reported for it
struct Shot {
    projectile: SimProjectile,
    next_position: Vec3,
}

struct Scene {
    wall: Arc<GridStructure>,
    plate: Arc<GridStructure>,
}

impl Scene {
    fn build() -> Self {
        let wall = GridStructure::new(StructureId(1), 1.0, Transform::from_position(Vec3::new(WALL_FRONT + 0.5, 0.0, 0.0)));
        wall.fill_cubes(CellCoord::new(0, -4, -4), CellCoord::new(3, 4, 4), 120.0);

        let plate = GridStructure::new(StructureId(2), 1.0, Transform::from_position(Vec3::new(PLATE_OFFSET, 0.0, 0.0)));
        plate.fill_cubes(CellCoord::new(0, -4, -4), CellCoord::new(0, 4, 4), 400.0);

        log::info!(
            "Scene: wall with {} blocks, armour plate with {} blocks",
            wall.occupied_cells(),
            plate.occupied_cells()
        );
        Self {
            wall: Arc::new(wall),
            plate: Arc::new(plate),
        }
    }

    fn wall(&self) -> Arc<dyn Structure> {
        Arc::clone(&self.wall) as Arc<dyn Structure>
    }

    /// Broad-phase result for a damage segment ending at `next_position`
    fn targets(&self, next_position: Vec3) -> HitTargets {
        if next_position.x > PLATE_OFFSET - 0.5 {
            HitTargets::Multiple(vec![self.wall(), Arc::clone(&self.plate) as Arc<dyn Structure>])
        } else {
            HitTargets::Single(self.wall())
        }
    }
}

fn load_settings() -> Result<PatchSettings, SimError> {
    match std::env::args().nth(1) {
        Some(path) => {
            let settings = PatchSettings::load_from_file(&path)?;
            settings.validate()?;
            Ok(settings)
        }
        None => Ok(PatchSettings::default()),
    }
}

fn fire_volley(rng: &mut impl Rng) -> SlotMap<ProjectileKey, Shot> {
    let mut shots = SlotMap::with_key();
    for id in 0..VOLLEY_SIZE as u64 {
        let lateral = Vec3::new(0.0, rng.gen_range(-3.0..3.0), rng.gen_range(-3.0..3.0));
        let speed = rng.gen_range(900.0..1400.0);
        let velocity = Vec3::new(speed, 0.0, 0.0);

        // Where the narrow phase noticed the contact, somewhere inside the wall
        let contact = Vec3::new(WALL_FRONT + rng.gen_range(0.6..3.4), 0.0, 0.0) + lateral;
        let position = contact + Vec3::new(rng.gen_range(0.05..0.5), 0.0, 0.0);
        let normal = Vec3::new(0.0, 1.0, 0.0);

        let projectile = SimProjectile::new(ProjectileId(id), position, velocity, rng.gen_range(150.0..450.0))
            .with_contact(contact, normal)
            .with_launcher(1);
        shots.insert(Shot {
            projectile,
            next_position: position + velocity * TICK_SECONDS,
        });
    }
    shots
}

fn main() -> Result<(), SimError> {
    let settings = load_settings()?;
    logging::init_with_level(&settings.log_level);
    log::info!("Starting impact simulation");

    let mut engine = PatchEngine::install(&HostManifest::complete(true), SettingsHandle::new(settings))?;
    let scene = Scene::build();
    let mut shots = fire_volley(&mut rand::thread_rng());

    // Tick 1: narrow phase reports contacts, corrections start in the background
    for shot in shots.values() {
        engine.on_event(ProjectileEvent::ContactStart {
            projectile: &shot.projectile,
            collided: Some(scene.wall()),
        });
    }
    log::info!("{} corrections pending", engine.pending_corrections());

    // Tick 2: collision outcomes are finalized
    for (key, shot) in &mut shots {
        let naive = shot.projectile.contact_point;
        let targets = scene.targets(shot.next_position);
        let response = engine.on_event(ProjectileEvent::Hit {
            projectile: &mut shot.projectile,
            targets,
            next_position: shot.next_position,
        });

        if let (Some(before), Some(after)) = (naive, shot.projectile.contact_point) {
            log::debug!(
                "{key:?}: contact x {:.2} -> {:.2}, normal {:?}",
                before.x,
                after.x,
                shot.projectile.contact_normal.as_slice()
            );
        }
        match response {
            EventResponse::Handled(report) => log::info!(
                "{key:?}: {} blocks hit, health {:.0} -> {:.0}, {}",
                report.blocks.len(),
                report.health_before,
                report.health_after,
                report.detonation.map_or_else(
                    || "passed through".to_string(),
                    |d| format!("detonated ({:?})", d.reason)
                )
            ),
            EventResponse::Passed => log::info!("{key:?}: left to the host"),
        }
    }

    // Tick 3: projectiles are removed
    for (_, shot) in shots.drain() {
        engine.on_event(ProjectileEvent::Retired {
            projectile: shot.projectile.id,
        });
    }
    let cleared = scene.wall.remove_destroyed() + scene.plate.remove_destroyed();

    let stats = engine.stats();
    log::info!(
        "Done: {} corrections applied, {} skipped, {} detonations, {} blocks destroyed",
        stats.corrections_applied,
        stats.corrections_skipped,
        stats.detonations,
        cleared
    );
    Ok(())
}
