//! Per-projectile correction registry
//!
//! Every projectile moves through
//! `Idle -> PendingCorrection -> Resolved`, and retirement clears it from
//! any state. The registry is only ever touched from the tick thread;
//! workers write nothing but their own one-shot result channel.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam::channel::{bounded, Receiver};

use crate::config::PatchSettings;
use crate::host::{Projectile, ProjectileId, Structure, StructureId};

use super::corrector::{Correction, CorrectionRequest, CorrectorSettings, TrajectoryCorrector};
use super::worker_pool::WorkerPool;

/// Where a projectile stands in the correction lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionState {
    /// No task has been started, or the projectile was retired
    Idle,
    /// A correction is running or waiting to be consumed
    PendingCorrection,
    /// The correction was consumed at hit resolution
    Resolved,
}

/// Result of a contact-start notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// A correction task was started
    Scheduled,
    /// A task is already pending for this projectile
    AlreadyPending,
    /// The host reported no contact point
    NoContactPoint,
    /// The collided entity is not a destructible structure
    NotStructure,
    /// Preview or blueprint structure
    Preview,
    /// Structure is attached to a projector
    Projector,
    /// The worker pool refused the job
    PoolUnavailable,
}

/// Result of resolving a projectile at hit time
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Nothing was pending
    NoTask,
    /// The contact point and normal were overwritten
    Corrected(Correction),
    /// The task finished without a correction
    Uncorrected,
    /// The task never reported back
    WorkerLost,
}

/// Handle to a running correction
pub struct CorrectionTask {
    structure: StructureId,
    result: Receiver<Option<Correction>>,
}

impl CorrectionTask {
    /// Structure the correction searches
    pub fn structure(&self) -> StructureId {
        self.structure
    }

    /// Block until the worker reports
    fn wait(self) -> Result<Option<Correction>, crossbeam::channel::RecvError> {
        self.result.recv()
    }
}

enum Slot {
    Pending(CorrectionTask),
    Resolved,
}

/// Coordinates background corrections with the tick loop
pub struct CorrectionScheduler {
    pool: WorkerPool,
    slots: HashMap<ProjectileId, Slot>,
}

impl CorrectionScheduler {
    /// Create a scheduler running corrections on `pool`
    pub fn new(pool: WorkerPool) -> Self {
        Self {
            pool,
            slots: HashMap::new(),
        }
    }

    /// Contact-start: start a correction if the projectile is eligible
    ///
    /// `collided` is `None` when the projectile hit something that is not a
    /// destructible structure. The settings snapshot is captured by the task.
    pub fn contact_start(
        &mut self,
        projectile: &dyn Projectile,
        collided: Option<&Arc<dyn Structure>>,
        settings: &PatchSettings,
    ) -> ScheduleOutcome {
        let id = projectile.id();
        if matches!(self.slots.get(&id), Some(Slot::Pending(_))) {
            return ScheduleOutcome::AlreadyPending;
        }
        let Some(request) = CorrectionRequest::capture(projectile) else {
            return ScheduleOutcome::NoContactPoint;
        };
        let Some(structure) = collided else {
            return ScheduleOutcome::NotStructure;
        };
        if structure.is_preview() {
            return ScheduleOutcome::Preview;
        }
        if structure.has_projector() {
            return ScheduleOutcome::Projector;
        }

        let corrector = TrajectoryCorrector::new(CorrectorSettings::from(settings));
        let shared = Arc::clone(structure);
        let (sender, result) = bounded(1);
        let queued = self.pool.execute(move || {
            // Receiver may be gone if the projectile retired first
            let _ = sender.send(corrector.correct(&request, shared.as_ref()));
        });
        if !queued {
            log::warn!("Correction pool unavailable, projectile {id:?} keeps its naive contact");
            return ScheduleOutcome::PoolUnavailable;
        }

        log::trace!("Projectile {id:?}: correction scheduled against structure {:?}", structure.id());
        self.slots.insert(
            id,
            Slot::Pending(CorrectionTask {
                structure: structure.id(),
                result,
            }),
        );
        ScheduleOutcome::Scheduled
    }

    /// Hit resolution: wait for the pending task and apply its result
    ///
    /// Blocks the calling thread until the worker reports. There is no
    /// timeout.
    pub fn resolve(&mut self, projectile: &mut dyn Projectile) -> Resolution {
        let id = projectile.id();
        let Some(Slot::Pending(task)) = self.slots.remove(&id) else {
            return Resolution::NoTask;
        };
        let structure = task.structure();
        self.slots.insert(id, Slot::Resolved);

        match task.wait() {
            Ok(Some(correction)) => {
                log::debug!(
                    "Projectile {id:?}: contact corrected on {structure:?} to ({:.3}, {:.3}, {:.3})",
                    correction.point.x,
                    correction.point.y,
                    correction.point.z
                );
                projectile.set_contact_point(correction.point);
                projectile.set_contact_normal(correction.normal);
                Resolution::Corrected(correction)
            }
            Ok(None) => Resolution::Uncorrected,
            Err(_) => {
                log::warn!("Projectile {id:?}: correction worker disconnected, keeping naive contact");
                Resolution::WorkerLost
            }
        }
    }

    /// Retirement: drop whatever is tracked for the projectile
    ///
    /// Idempotent. Returns whether an entry existed.
    pub fn retire(&mut self, projectile: ProjectileId) -> bool {
        self.slots.remove(&projectile).is_some()
    }

    /// Drop every pending task; their results are never consumed
    pub fn clear_all(&mut self) -> usize {
        let before = self.pending_count();
        self.slots.retain(|_, slot| !matches!(slot, Slot::Pending(_)));
        before
    }

    /// Number of tasks waiting to be consumed
    pub fn pending_count(&self) -> usize {
        self.slots.values().filter(|slot| matches!(slot, Slot::Pending(_))).count()
    }

    /// Lifecycle state of a projectile
    pub fn state(&self, projectile: ProjectileId) -> CorrectionState {
        match self.slots.get(&projectile) {
            None => CorrectionState::Idle,
            Some(Slot::Pending(_)) => CorrectionState::PendingCorrection,
            Some(Slot::Resolved) => CorrectionState::Resolved,
        }
    }

    /// Number of worker threads
    pub fn worker_count(&self) -> usize {
        self.pool.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{CellCoord, Transform, Vec3};
    use crate::sim::{GridStructure, SimProjectile};
    use approx::assert_relative_eq;

    fn scheduler() -> CorrectionScheduler {
        CorrectionScheduler::new(WorkerPool::new(2).expect("spawn workers"))
    }

    fn wall() -> GridStructure {
        let structure = GridStructure::new(StructureId(7), 1.0, Transform::identity());
        structure.fill_cubes(CellCoord::new(0, -1, -1), CellCoord::new(2, 1, 1), 100.0);
        structure
    }

    fn shared(structure: GridStructure) -> Arc<dyn Structure> {
        Arc::new(structure)
    }

    fn phased(id: u64) -> SimProjectile {
        SimProjectile::new(ProjectileId(id), Vec3::new(1.3, 0.1, 0.2), Vec3::new(400.0, 0.0, 0.0), 100.0)
            .with_contact(Vec3::new(1.0, 0.1, 0.2), Vec3::new(0.0, 1.0, 0.0))
    }

    #[test]
    fn test_full_lifecycle() {
        let mut scheduler = scheduler();
        let structure = shared(wall());
        let mut projectile = phased(1);
        let settings = PatchSettings::default();

        assert_eq!(scheduler.state(ProjectileId(1)), CorrectionState::Idle);
        assert_eq!(
            scheduler.contact_start(&projectile, Some(&structure), &settings),
            ScheduleOutcome::Scheduled
        );
        assert_eq!(scheduler.state(ProjectileId(1)), CorrectionState::PendingCorrection);

        let resolution = scheduler.resolve(&mut projectile);
        assert!(matches!(resolution, Resolution::Corrected(_)));
        assert_eq!(scheduler.state(ProjectileId(1)), CorrectionState::Resolved);
        assert_relative_eq!(
            projectile.contact_point.expect("contact kept"),
            Vec3::new(-0.52, 0.1, 0.2),
            epsilon = 1e-9
        );
        assert_relative_eq!(projectile.contact_normal, Vec3::new(-1.0, 0.0, 0.0), epsilon = 1e-9);

        assert!(scheduler.retire(ProjectileId(1)));
        assert_eq!(scheduler.state(ProjectileId(1)), CorrectionState::Idle);
    }

    #[test]
    fn test_duplicate_contact_start_is_noop() {
        let mut scheduler = scheduler();
        let structure = shared(wall());
        let projectile = phased(2);
        let settings = PatchSettings::default();

        scheduler.contact_start(&projectile, Some(&structure), &settings);
        assert_eq!(
            scheduler.contact_start(&projectile, Some(&structure), &settings),
            ScheduleOutcome::AlreadyPending
        );
        assert_eq!(scheduler.pending_count(), 1);
    }

    #[test]
    fn test_retire_is_idempotent() {
        let mut scheduler = scheduler();
        let structure = shared(wall());
        scheduler.contact_start(&phased(3), Some(&structure), &PatchSettings::default());

        assert!(scheduler.retire(ProjectileId(3)));
        assert!(!scheduler.retire(ProjectileId(3)));
        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(scheduler.state(ProjectileId(3)), CorrectionState::Idle);
    }

    #[test]
    fn test_retire_without_resolution_then_resolve_is_noop() {
        let mut scheduler = scheduler();
        let structure = shared(wall());
        let mut projectile = phased(4);
        scheduler.contact_start(&projectile, Some(&structure), &PatchSettings::default());
        scheduler.retire(ProjectileId(4));

        assert_eq!(scheduler.resolve(&mut projectile), Resolution::NoTask);
        assert_relative_eq!(projectile.contact_point.expect("untouched"), Vec3::new(1.0, 0.1, 0.2));
    }

    #[test]
    fn test_ineligible_contacts() {
        let mut scheduler = scheduler();
        let settings = PatchSettings::default();

        let preview = shared(wall().with_preview(true));
        assert_eq!(scheduler.contact_start(&phased(5), Some(&preview), &settings), ScheduleOutcome::Preview);

        let projected = shared(wall().with_projector(true));
        assert_eq!(scheduler.contact_start(&phased(5), Some(&projected), &settings), ScheduleOutcome::Projector);

        assert_eq!(scheduler.contact_start(&phased(5), None, &settings), ScheduleOutcome::NotStructure);

        let structure = shared(wall());
        let no_contact = SimProjectile::new(ProjectileId(5), Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0), 10.0);
        assert_eq!(
            scheduler.contact_start(&no_contact, Some(&structure), &settings),
            ScheduleOutcome::NoContactPoint
        );

        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(scheduler.state(ProjectileId(5)), CorrectionState::Idle);
    }

    #[test]
    fn test_uncorrected_keeps_naive_contact() {
        let mut scheduler = scheduler();
        let empty = shared(GridStructure::new(StructureId(8), 1.0, Transform::identity()));
        let mut projectile = phased(6);

        scheduler.contact_start(&projectile, Some(&empty), &PatchSettings::default());
        assert_eq!(scheduler.resolve(&mut projectile), Resolution::Uncorrected);
        assert_relative_eq!(projectile.contact_point.expect("untouched"), Vec3::new(1.0, 0.1, 0.2));
        assert_relative_eq!(projectile.contact_normal, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_clear_all_drops_pending_only() {
        let mut scheduler = scheduler();
        let structure = shared(wall());
        let settings = PatchSettings::default();
        let mut resolved = phased(10);

        scheduler.contact_start(&resolved, Some(&structure), &settings);
        scheduler.resolve(&mut resolved);
        scheduler.contact_start(&phased(11), Some(&structure), &settings);
        scheduler.contact_start(&phased(12), Some(&structure), &settings);

        assert_eq!(scheduler.clear_all(), 2);
        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(scheduler.state(ProjectileId(10)), CorrectionState::Resolved);
        assert_eq!(scheduler.state(ProjectileId(11)), CorrectionState::Idle);
    }

    #[test]
    fn test_contact_burst_while_workers_busy() {
        let pool = WorkerPool::new(1).expect("spawn worker");
        let (gate_tx, gate_rx) = bounded::<()>(0);
        pool.execute(move || {
            let _ = gate_rx.recv();
        });
        let mut scheduler = CorrectionScheduler::new(pool);
        let structure = shared(wall());
        let settings = PatchSettings::default();

        for id in 1..=600 {
            assert_eq!(
                scheduler.contact_start(&phased(id), Some(&structure), &settings),
                ScheduleOutcome::Scheduled
            );
        }
        assert_eq!(scheduler.pending_count(), 600);

        let _ = gate_tx.send(());
        let mut last = phased(600);
        assert!(matches!(scheduler.resolve(&mut last), Resolution::Corrected(_)));
        assert_eq!(scheduler.pending_count(), 599);
    }

    #[test]
    fn test_new_contact_after_resolution_schedules_again() {
        let mut scheduler = scheduler();
        let structure = shared(wall());
        let settings = PatchSettings::default();
        let mut projectile = phased(13);

        scheduler.contact_start(&projectile, Some(&structure), &settings);
        scheduler.resolve(&mut projectile);
        projectile.contact_point = Some(Vec3::new(1.0, 0.1, 0.2));
        assert_eq!(
            scheduler.contact_start(&projectile, Some(&structure), &settings),
            ScheduleOutcome::Scheduled
        );
    }
}
