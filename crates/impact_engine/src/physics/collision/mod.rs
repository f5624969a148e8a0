//! Collision geometry
//!
//! # Module Organization
//!
//! - [`primitives`] - Segments, triangles and the intersection flags
//! - [`mesh`] - Model-space triangle meshes shared by blocks
//!
//! Shapes are stored in model space; raycasts move the segment into the
//! shape's frame rather than transforming triangles into the world.

pub mod primitives;
pub mod mesh;

// Re-export commonly used types
pub use primitives::{IntersectionFlags, LineSegment, Triangle};
pub use mesh::{CollisionMesh, MeshHit};
