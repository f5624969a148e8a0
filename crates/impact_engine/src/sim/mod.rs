//! Reference host
//!
//! A small in-memory implementation of the host capability traits. Tests
//! and the `impact_sim` binary use it in place of a real game server.

mod grid;
mod projectile;

pub use grid::{cell_center, next_block_id, DamageRecord, GridBlock, GridStructure};
pub use projectile::SimProjectile;
