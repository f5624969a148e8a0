//! Physics module
//!
//! Geometry used for narrow raycasts against block meshes. Broad-phase
//! detection belongs to the host; this crate only re-tests what the host
//! already reported.

pub mod collision;

pub use collision::{
    CollisionMesh,
    IntersectionFlags,
    LineSegment,
    MeshHit,
    Triangle,
};
