//! # Patch Settings
//!
//! Operator-facing switches for contact correction and damage propagation.
//! The engine never caches these: every event reads the current values
//! through a [`SettingsHandle`], so changes made by the host take effect on
//! the next tick.

use serde::{Serialize, Deserialize};
use std::sync::{Arc, PoisonError, RwLock};

use super::{Config, ConfigError};

/// What a correction reports when the search ray hits no geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoHitPolicy {
    /// Leave the host's contact point untouched
    #[default]
    Skip,
    /// Report the naive point collapsed onto the line of flight, keeping the original normal
    CollapsedPoint,
}

/// Which computed point receives the back-movement offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackMovementTarget {
    /// Offset the corrected contact point
    #[default]
    CorrectionPoint,
    /// Offset the origin of the damage ray instead
    DamagePoint,
}

/// Settings consumed by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchSettings {
    /// Run the contact correction on structure hits
    pub enable_correction: bool,
    /// Replace the host's damage application with ordered propagation
    pub enable_damage: bool,
    /// How far back (metres) a computed point is moved to avoid clipping
    pub back_movement: f64,
    /// Verify the host capability manifest before installing
    pub verify_capabilities: bool,
    /// Upper bound on how far outside the contact point the search ray starts
    pub max_search_distance: f64,
    /// Margin added around a structure's bounds, in structure-local units
    pub bounds_padding: f64,
    /// Behaviour when the correction search finds no geometry
    pub no_hit_policy: NoHitPolicy,
    /// Where the back-movement offset is applied
    pub back_movement_target: BackMovementTarget,
    /// Default log filter used by binaries
    pub log_level: String,
}

impl PatchSettings {
    /// Create settings with the shipped defaults
    pub fn new() -> Self {
        Self {
            enable_correction: true,
            enable_damage: true,
            back_movement: 0.02,
            verify_capabilities: true,
            max_search_distance: 250.0,
            bounds_padding: 1.0,
            no_hit_policy: NoHitPolicy::Skip,
            back_movement_target: BackMovementTarget::CorrectionPoint,
            log_level: "info".to_string(),
        }
    }

    /// Enable or disable contact correction
    pub fn with_correction(mut self, enabled: bool) -> Self {
        self.enable_correction = enabled;
        self
    }

    /// Enable or disable damage propagation
    pub fn with_damage(mut self, enabled: bool) -> Self {
        self.enable_damage = enabled;
        self
    }

    /// Set the back-movement distance
    pub fn with_back_movement(mut self, meters: f64) -> Self {
        self.back_movement = meters;
        self
    }

    /// Set the no-hit policy
    pub fn with_no_hit_policy(mut self, policy: NoHitPolicy) -> Self {
        self.no_hit_policy = policy;
        self
    }

    /// Set which point receives the back-movement offset
    pub fn with_back_movement_target(mut self, target: BackMovementTarget) -> Self {
        self.back_movement_target = target;
        self
    }

    /// Enable or disable capability verification
    pub fn with_capability_verification(mut self, enabled: bool) -> Self {
        self.verify_capabilities = enabled;
        self
    }

    /// Back-movement applied to corrected contact points
    pub fn correction_back_movement(&self) -> f64 {
        match self.back_movement_target {
            BackMovementTarget::CorrectionPoint => self.back_movement,
            BackMovementTarget::DamagePoint => 0.0,
        }
    }

    /// Back-movement applied to the origin of damage rays
    pub fn damage_back_movement(&self) -> f64 {
        match self.back_movement_target {
            BackMovementTarget::CorrectionPoint => 0.0,
            BackMovementTarget::DamagePoint => self.back_movement,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let distances = [
            ("back_movement", self.back_movement),
            ("max_search_distance", self.max_search_distance),
            ("bounds_padding", self.bounds_padding),
        ];
        for (name, value) in distances {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!("{name} must be a finite, non-negative distance (got {value})")));
            }
        }

        if self.max_search_distance == 0.0 {
            return Err(ConfigError::Invalid("max_search_distance must be positive".to_string()));
        }

        Ok(())
    }
}

impl Default for PatchSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for PatchSettings {}

/// Shared, live view of [`PatchSettings`]
///
/// Cloning the handle shares the same underlying settings.
#[derive(Debug, Clone, Default)]
pub struct SettingsHandle {
    inner: Arc<RwLock<PatchSettings>>,
}

impl SettingsHandle {
    /// Wrap settings in a new handle
    pub fn new(settings: PatchSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Copy of the current settings
    pub fn snapshot(&self) -> PatchSettings {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Edit the settings, committing the result only if it validates
    pub fn update(&self, change: impl FnOnce(&mut PatchSettings)) -> Result<(), ConfigError> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut edited = guard.clone();
        change(&mut edited);
        edited.validate()?;
        *guard = edited;
        Ok(())
    }

    /// Replace the settings wholesale after validating them
    pub fn replace(&self, settings: PatchSettings) -> Result<(), ConfigError> {
        settings.validate()?;
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = settings;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_shipped_values() {
        let settings = PatchSettings::default();
        assert!(settings.enable_correction);
        assert!(settings.enable_damage);
        assert_eq!(settings.back_movement, 0.02);
        assert_eq!(settings.max_search_distance, 250.0);
        assert_eq!(settings.no_hit_policy, NoHitPolicy::Skip);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_negative_back_movement_rejected() {
        let settings = PatchSettings::new().with_back_movement(-1.0);
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_back_movement_target_routes_offset() {
        let settings = PatchSettings::new()
            .with_back_movement(0.5)
            .with_back_movement_target(BackMovementTarget::DamagePoint);
        assert_eq!(settings.correction_back_movement(), 0.0);
        assert_eq!(settings.damage_back_movement(), 0.5);
    }

    #[test]
    fn test_handle_shares_updates_between_clones() {
        let handle = SettingsHandle::new(PatchSettings::default());
        let other = handle.clone();
        other.update(|s| s.enable_damage = false).expect("valid edit");
        assert!(!handle.snapshot().enable_damage);
    }

    #[test]
    fn test_invalid_update_leaves_settings_untouched() {
        let handle = SettingsHandle::new(PatchSettings::default());
        let result = handle.update(|s| {
            s.enable_damage = false;
            s.max_search_distance = -5.0;
        });
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        assert_eq!(handle.snapshot(), PatchSettings::default());

        assert!(handle.update(|s| s.back_movement = -0.1).is_err());
        assert_eq!(handle.snapshot().back_movement, 0.02);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: PatchSettings = toml::from_str("back_movement = 0.1\nno_hit_policy = \"collapsed_point\"\n")
            .expect("valid toml");
        assert_eq!(settings.back_movement, 0.1);
        assert_eq!(settings.no_hit_policy, NoHitPolicy::CollapsedPoint);
        assert!(settings.enable_correction);
    }

    #[test]
    fn test_toml_file_round_trip() {
        let path = std::env::temp_dir().join(format!("impact_settings_{}.toml", std::process::id()));
        let settings = PatchSettings::new().with_damage(false).with_back_movement(0.05);
        settings.save_to_file(&path).expect("save settings");
        let loaded = PatchSettings::load_from_file(&path).expect("load settings");
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_demo_settings_file_parses() {
        let settings: PatchSettings = toml::from_str(include_str!("../../../../impact_sim/settings.toml"))
            .expect("demo settings parse");
        assert_eq!(settings, PatchSettings::default());
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let result = PatchSettings::load_from_file("settings.yaml");
        assert!(result.is_err());
    }
}
