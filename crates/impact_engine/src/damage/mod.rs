//! Damage propagation across destructible structures

mod propagator;
mod report;

pub use propagator::DamagePropagator;
pub use report::{BlockDamage, DamageReport, Detonation, StopReason};
