//! End-to-end scenarios driven through [`PatchEngine`](crate::PatchEngine)

mod fixtures;
mod damage_flow;
