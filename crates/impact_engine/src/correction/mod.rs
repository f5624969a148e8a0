//! Contact correction: raycasting, the corrector itself and the
//! background scheduling around it

mod corrector;
mod raycaster;
mod scheduler;
mod worker_pool;

pub use corrector::{Correction, CorrectionRequest, CorrectionSource, CorrectorSettings, SearchDirection, TrajectoryCorrector};
pub use raycaster::{CellHit, CellRaycaster};
pub use scheduler::{CorrectionScheduler, CorrectionState, CorrectionTask, Resolution, ScheduleOutcome};
pub use worker_pool::WorkerPool;
