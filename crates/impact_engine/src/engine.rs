//! Engine façade installed into a host

use thiserror::Error;

use crate::config::{ConfigError, SettingsHandle};
use crate::correction::{CorrectionScheduler, CorrectionState, Resolution, ScheduleOutcome, WorkerPool};
use crate::damage::DamagePropagator;
use crate::events::{EventResponse, HitTargets, ProjectileEvent, ProjectileEventHandler};
use crate::host::{HostManifest, ProjectileId};

/// Environment variable that downgrades a failed capability check to a warning
pub const CAPABILITY_CHECK_ENV: &str = "IMPACT_DISABLE_CAPABILITY_CHECK";

/// Counters kept across events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Correction tasks started
    pub corrections_scheduled: u64,
    /// Contacts overwritten at hit resolution
    pub corrections_applied: u64,
    /// Resolutions that kept the naive contact
    pub corrections_skipped: u64,
    /// Damage passes run
    pub damage_passes: u64,
    /// Projectiles stopped by a damage pass
    pub detonations: u64,
}

/// Contact correction and damage propagation wired to host events
pub struct PatchEngine {
    settings: SettingsHandle,
    scheduler: CorrectionScheduler,
    stats: EngineStats,
}

impl PatchEngine {
    /// Verify the host and start the correction workers
    pub fn install(manifest: &HostManifest, settings: SettingsHandle) -> Result<Self, EngineError> {
        Self::verify(manifest, &settings)?;
        let pool = WorkerPool::with_default_size().map_err(EngineError::WorkerPool)?;
        Ok(Self::assemble(settings, pool))
    }

    /// Like [`install`](Self::install), with a caller-provided pool
    pub fn install_with_pool(manifest: &HostManifest, settings: SettingsHandle, pool: WorkerPool) -> Result<Self, EngineError> {
        Self::verify(manifest, &settings)?;
        Ok(Self::assemble(settings, pool))
    }

    fn assemble(settings: SettingsHandle, pool: WorkerPool) -> Self {
        let scheduler = CorrectionScheduler::new(pool);
        log::info!("Impact engine installed with {} correction workers", scheduler.worker_count());
        Self {
            settings,
            scheduler,
            stats: EngineStats::default(),
        }
    }

    fn verify(manifest: &HostManifest, settings: &SettingsHandle) -> Result<(), EngineError> {
        if !manifest.is_authority() {
            return Err(EngineError::NotAuthority);
        }

        let snapshot = settings.snapshot();
        snapshot.validate()?;

        if let Some(missing) = manifest.first_missing() {
            if snapshot.verify_capabilities && std::env::var_os(CAPABILITY_CHECK_ENV).is_none() {
                log::error!("Host is missing capability '{missing}', engine not installed");
                return Err(EngineError::MissingCapability(missing.to_string()));
            }
            log::warn!("Host is missing capability '{missing}', installing anyway");
        }
        Ok(())
    }

    /// Live settings shared with the host
    pub fn settings(&self) -> &SettingsHandle {
        &self.settings
    }

    /// Event counters
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Correction tasks not yet consumed
    pub fn pending_corrections(&self) -> usize {
        self.scheduler.pending_count()
    }

    /// Correction lifecycle state of a projectile
    pub fn correction_state(&self, projectile: ProjectileId) -> CorrectionState {
        self.scheduler.state(projectile)
    }

    fn drop_pending_if_disabled(&mut self, correction_enabled: bool) {
        if !correction_enabled && self.scheduler.pending_count() > 0 {
            let dropped = self.scheduler.clear_all();
            log::info!("Correction disabled, dropped {dropped} pending tasks");
        }
    }
}

impl ProjectileEventHandler for PatchEngine {
    fn on_event(&mut self, event: ProjectileEvent<'_>) -> EventResponse {
        log::trace!("Projectile {:?}: {} event", event.projectile_id(), event.name());
        let settings = self.settings.snapshot();

        match event {
            ProjectileEvent::ContactStart { projectile, collided } => {
                if !settings.enable_correction {
                    self.drop_pending_if_disabled(false);
                    return EventResponse::Passed;
                }
                if self.scheduler.contact_start(projectile, collided.as_ref(), &settings) == ScheduleOutcome::Scheduled {
                    self.stats.corrections_scheduled += 1;
                }
                EventResponse::Passed
            }
            ProjectileEvent::Hit {
                projectile,
                targets,
                next_position,
            } => {
                // A task started before correction was disabled is still consumed
                match self.scheduler.resolve(projectile) {
                    Resolution::Corrected(_) => self.stats.corrections_applied += 1,
                    Resolution::Uncorrected | Resolution::WorkerLost => self.stats.corrections_skipped += 1,
                    Resolution::NoTask => {}
                }
                self.drop_pending_if_disabled(settings.enable_correction);

                if !settings.enable_damage {
                    return EventResponse::Passed;
                }
                let propagator = DamagePropagator::new(&settings);
                let report = match &targets {
                    HitTargets::Single(structure) => propagator.hit_single(projectile, structure.as_ref(), next_position),
                    HitTargets::Multiple(structures) => propagator.hit_multiple(projectile, structures, next_position),
                    HitTargets::Other => return EventResponse::Passed,
                };

                self.stats.damage_passes += 1;
                if report.detonated() {
                    self.stats.detonations += 1;
                }
                EventResponse::Handled(report)
            }
            ProjectileEvent::Retired { projectile } => {
                self.scheduler.retire(projectile);
                EventResponse::Passed
            }
        }
    }
}

/// Installation errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// The host lacks a required capability
    #[error("Missing host capability: {0}")]
    MissingCapability(String),

    /// The host does not run the authoritative simulation
    #[error("Host is not authoritative")]
    NotAuthority,

    /// Settings failed validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker threads could not be started
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}
