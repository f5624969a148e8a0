//! Plain projectile record implementing [`Projectile`]

use crate::foundation::math::Vec3;
use crate::host::{Projectile, ProjectileId};

/// Projectile state as a host would keep it
#[derive(Debug, Clone, PartialEq)]
pub struct SimProjectile {
    /// Host identity
    pub id: ProjectileId,
    /// Current position
    pub position: Vec3,
    /// Linear velocity
    pub velocity: Vec3,
    /// Contact point reported by the narrow phase
    pub contact_point: Option<Vec3>,
    /// Contact normal reported by the narrow phase
    pub contact_normal: Vec3,
    /// Opaque contact shape key
    pub shape_key: u32,
    /// Remaining damage budget
    pub health_pool: f32,
    /// Who fired it
    pub launcher_id: i64,
    /// Position at which it detonated, once it has
    pub detonated_at: Option<Vec3>,
}

impl SimProjectile {
    /// Projectile in flight with no contact yet
    pub fn new(id: ProjectileId, position: Vec3, velocity: Vec3, health_pool: f32) -> Self {
        Self {
            id,
            position,
            velocity,
            contact_point: None,
            contact_normal: Vec3::zeros(),
            shape_key: 0,
            health_pool,
            launcher_id: 0,
            detonated_at: None,
        }
    }

    /// Attach a narrow-phase contact (builder pattern)
    pub fn with_contact(mut self, point: Vec3, normal: Vec3) -> Self {
        self.contact_point = Some(point);
        self.contact_normal = normal;
        self
    }

    /// Set the launcher identity (builder pattern)
    pub fn with_launcher(mut self, launcher_id: i64) -> Self {
        self.launcher_id = launcher_id;
        self
    }

    /// Whether the projectile has detonated
    pub fn has_detonated(&self) -> bool {
        self.detonated_at.is_some()
    }
}

impl Projectile for SimProjectile {
    fn id(&self) -> ProjectileId {
        self.id
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn contact_point(&self) -> Option<Vec3> {
        self.contact_point
    }

    fn set_contact_point(&mut self, point: Vec3) {
        self.contact_point = Some(point);
    }

    fn contact_normal(&self) -> Vec3 {
        self.contact_normal
    }

    fn set_contact_normal(&mut self, normal: Vec3) {
        self.contact_normal = normal;
    }

    fn shape_key(&self) -> u32 {
        self.shape_key
    }

    fn health_pool(&self) -> f32 {
        self.health_pool
    }

    fn set_health_pool(&mut self, health: f32) {
        self.health_pool = health;
    }

    fn launcher_id(&self) -> i64 {
        self.launcher_id
    }

    fn detonate(&mut self) {
        self.detonated_at = Some(self.position);
    }
}
