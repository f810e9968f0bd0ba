//! Simulated dispensing rig.
//!
//! Stands in for the physical pump/valve driver during host development
//! and demos: tracks reservoir levels in memory, reports progress in
//! fixed increments, and can optionally pace itself in real time so the
//! control surface behaves like a bench rig.
//!
//! ## Fault model
//!
//! - Requesting a component with no fitted line → `UnknownComponent`.
//! - A reservoir with less than the requested volume pours dry: the
//!   remainder is reported as progress, then the call fails with
//!   `ReservoirEmpty`.

use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use log::debug;

use crate::ports::{DispensePort, DriverFault};

/// Default progress granularity, roughly one flow-meter tick.
const DEFAULT_INCREMENT_ML: f32 = 5.0;

pub struct SimulatedRig {
    /// Fitted lines: component → reservoir remaining (mL).
    lines: BTreeMap<String, f32>,
    /// Progress report granularity (mL).
    increment_ml: f32,
    /// Simulated flow rate; `None` dispenses instantly.
    ml_per_sec: Option<f32>,
    /// Completed pours, in order.
    poured: Vec<(String, f32)>,
}

impl SimulatedRig {
    /// A rig with no lines fitted. Chain [`with_line`](Self::with_line).
    pub fn new() -> Self {
        Self {
            lines: BTreeMap::new(),
            increment_ml: DEFAULT_INCREMENT_ML,
            ml_per_sec: None,
            poured: Vec::new(),
        }
    }

    /// Fit a line for `component` with `reservoir_ml` available.
    pub fn with_line(mut self, component: impl Into<String>, reservoir_ml: f32) -> Self {
        self.lines.insert(component.into(), reservoir_ml);
        self
    }

    /// Override the progress report granularity.
    pub fn with_increment(mut self, increment_ml: f32) -> Self {
        self.increment_ml = increment_ml.max(0.1);
        self
    }

    /// Pace dispensing at `ml_per_sec` of wall-clock time instead of
    /// completing instantly.
    pub fn paced(mut self, ml_per_sec: f32) -> Self {
        self.ml_per_sec = Some(ml_per_sec.max(0.1));
        self
    }

    /// Reservoir remaining for `component`, if a line is fitted.
    pub fn remaining(&self, component: &str) -> Option<f32> {
        self.lines.get(component).copied()
    }

    /// Completed pours, in order.
    pub fn poured(&self) -> &[(String, f32)] {
        &self.poured
    }
}

impl Default for SimulatedRig {
    fn default() -> Self {
        Self::new()
    }
}

impl DispensePort for SimulatedRig {
    fn dispense(
        &mut self,
        component: &str,
        target_ml: f32,
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<(), DriverFault> {
        let increment = self.increment_ml;
        let rate = self.ml_per_sec;
        let Some(remaining) = self.lines.get_mut(component) else {
            return Err(DriverFault::UnknownComponent);
        };

        if *remaining < target_ml {
            // Pour what's left, then run dry.
            if *remaining > 0.0 {
                on_progress(*remaining);
            }
            *remaining = 0.0;
            return Err(DriverFault::ReservoirEmpty);
        }

        let mut done = 0.0;
        while done < target_ml {
            let shot = increment.min(target_ml - done);
            if let Some(rate) = rate {
                thread::sleep(Duration::from_secs_f32(shot / rate));
            }
            done += shot;
            on_progress(done);
        }

        *remaining -= target_ml;
        self.poured.push((component.to_string(), target_ml));
        debug!("sim rig: poured {target_ml:.0} mL of {component}");
        Ok(())
    }
}
