//! System configuration parameters
//!
//! All tunable parameters for the Barmatic pour engine.
//! Values can be overridden via a [`ConfigPort`](crate::ports::ConfigPort)
//! adapter (e.g. a JSON file on the controller's SD card).

use serde::{Deserialize, Serialize};

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarConfig {
    // --- Glass ---
    /// Capacity of the serving glass in mL. Pour sequences whose total
    /// volume exceeds this are rejected before any hardware is touched.
    pub glass_capacity_ml: f32,

    // --- Pour sequencing ---
    /// Pause between two components (milliseconds), letting the previous
    /// pour drip out before the next line opens.
    pub inter_step_settle_ms: u64,

    // --- Safety ---
    /// Largest single-component volume (mL) the rig will be asked for.
    /// Guards against a corrupt recipe commanding a runaway pour.
    pub max_step_volume_ml: f32,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            // Glass
            glass_capacity_ml: 350.0,

            // Pour sequencing
            inter_step_settle_ms: 250,

            // Safety
            max_step_volume_ml: 150.0,
        }
    }
}

impl BarConfig {
    /// Range-check every field. Adapters call this before persisting or
    /// applying a config received from the outside world.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(self.glass_capacity_ml > 0.0) {
            return Err("glass_capacity_ml must be positive");
        }
        if !(self.max_step_volume_ml > 0.0) {
            return Err("max_step_volume_ml must be positive");
        }
        if self.max_step_volume_ml > self.glass_capacity_ml {
            return Err("max_step_volume_ml cannot exceed glass_capacity_ml");
        }
        Ok(())
    }
}
