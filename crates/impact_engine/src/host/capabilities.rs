//! Host capability manifest
//!
//! The host advertises the capabilities it implements by name. A missing
//! entry means the host build changed underneath the engine, and installing
//! anyway would act on stale assumptions.

use std::collections::BTreeSet;

/// Every capability the engine relies on
pub const REQUIRED_CAPABILITIES: &[&str] = &[
    "projectile.position",
    "projectile.velocity",
    "projectile.contact_point",
    "projectile.contact_normal",
    "projectile.shape_key",
    "projectile.health_pool",
    "projectile.launcher",
    "projectile.detonate",
    "structure.transform",
    "structure.bounds",
    "structure.cell_lookup",
    "structure.raycast_cells",
    "structure.destruction_flags",
    "block.remaining_damage",
    "block.integrity",
    "block.apply_damage",
    "block.geometry",
    "event.contact_start",
    "event.hit",
    "event.retired",
];

/// Capabilities reported by a host
#[derive(Debug, Clone, Default)]
pub struct HostManifest {
    capabilities: BTreeSet<String>,
    is_authority: bool,
}

impl HostManifest {
    /// Empty manifest
    pub fn new(is_authority: bool) -> Self {
        Self {
            capabilities: BTreeSet::new(),
            is_authority,
        }
    }

    /// Manifest advertising every required capability
    pub fn complete(is_authority: bool) -> Self {
        REQUIRED_CAPABILITIES
            .iter()
            .fold(Self::new(is_authority), |manifest, name| manifest.with_capability(*name))
    }

    /// Add a capability (builder pattern)
    pub fn with_capability(mut self, name: impl Into<String>) -> Self {
        self.capabilities.insert(name.into());
        self
    }

    /// Remove a capability (builder pattern)
    pub fn without_capability(mut self, name: &str) -> Self {
        self.capabilities.remove(name);
        self
    }

    /// Whether the host runs the authoritative simulation
    pub fn is_authority(&self) -> bool {
        self.is_authority
    }

    /// Whether a capability is advertised
    pub fn provides(&self, name: &str) -> bool {
        self.capabilities.contains(name)
    }

    /// First required capability the host does not advertise
    pub fn first_missing(&self) -> Option<&'static str> {
        REQUIRED_CAPABILITIES.iter().copied().find(|name| !self.provides(name))
    }
}
