//! The pour-execution worker loop.
//!
//! [`Bartender::make_drink`] lands here after the `Idle → Making` guard:
//! for each component, check the cancellation flag, announce the component
//! (`Pouring`), then block on the rig's dispense primitive while relaying
//! its incremental volume reports (`PouringProgress`). After the last
//! component a final checkpoint runs before the machine moves to `Ready`.
//!
//! The pour cursor (current component index, cumulative dispensed volume)
//! lives only for the duration of the loop; a copy is mirrored into the
//! controller's [`PourStatus`] so other threads can render progress
//! without subscribing to callbacks.

use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use log::{info, warn};

use super::{Bartender, BartenderEvent, BartenderState, EventKind, lock};
use crate::error::{Error, PourError, Result};
use crate::fsm::TransitionError;
use crate::ports::DispensePort;
use crate::recipe::PourStep;

// ───────────────────────────────────────────────────────────────
// Progress snapshot
// ───────────────────────────────────────────────────────────────

/// A point-in-time snapshot of pour progress, readable from any thread.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PourStatus {
    /// 0-based index of the component currently being poured.
    pub step_index: usize,
    /// Number of components in the staged sequence (0 when idle).
    pub steps_total: usize,
    /// Cumulative volume dispensed for the current component (mL).
    pub step_done_ml: f32,
    /// Target volume for the current component (mL).
    pub step_target_ml: f32,
}

impl PourStatus {
    pub(crate) fn staged(steps_total: usize) -> Self {
        Self {
            steps_total,
            ..Self::default()
        }
    }

    /// Fractional completion of the current component, in [0, 1].
    pub fn step_fraction(&self) -> f32 {
        if self.step_target_ml > 0.0 {
            (self.step_done_ml / self.step_target_ml).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Overall sequence completion in [0, 1]:
    /// `(component index + fraction within it) / component count`.
    /// Advances smoothly across component boundaries instead of snapping
    /// back to zero on each new component.
    pub fn overall_fraction(&self) -> f32 {
        if self.steps_total == 0 {
            return 0.0;
        }
        ((self.step_index as f32 + self.step_fraction()) / self.steps_total as f32)
            .clamp(0.0, 1.0)
    }
}

// ───────────────────────────────────────────────────────────────
// Worker loop
// ───────────────────────────────────────────────────────────────

impl<D: DispensePort> Bartender<D> {
    /// Pour every step in order. Runs on the thread that called
    /// `make_drink`; the only blocking point is the rig's dispense call.
    pub(crate) fn run_sequence(&self, sequence: &[PourStep]) -> Result<()> {
        let total = sequence.len();
        for (index, step) in sequence.iter().enumerate() {
            self.checkpoint(index, total)?;

            {
                let mut status = lock(&self.status);
                status.step_index = index;
                status.steps_total = total;
                status.step_done_ml = 0.0;
                status.step_target_ml = step.volume_ml;
            }

            info!(
                "pouring {} ({}/{}): {:.0} mL",
                step.component,
                index + 1,
                total,
                step.volume_ml
            );
            self.machine
                .transition(BartenderEvent::PourStarted {
                    component: step.component.clone(),
                    index,
                    total,
                })
                .map_err(|e| self.pour_interrupted(e))?;

            let poured = {
                let mut rig = lock(&self.rig);
                rig.dispense(&step.component, step.volume_ml, &mut |done_ml| {
                    self.relay_progress(done_ml, step.volume_ml);
                })
            };
            if let Err(fault) = poured {
                warn!("dispense fault on {}: {fault}", step.component);
                // Rejected harmlessly when an abort already moved the
                // machine to Aborted.
                let _ = self.machine.transition(BartenderEvent::Fault { fault });
                return Err(fault.into());
            }

            if index + 1 < total && self.config.inter_step_settle_ms > 0 {
                thread::sleep(Duration::from_millis(self.config.inter_step_settle_ms));
            }
        }

        self.checkpoint(total, total)?;
        self.machine
            .transition(BartenderEvent::Finished)
            .map_err(|e| self.pour_interrupted(e))?;
        info!("drink ready");
        Ok(())
    }

    /// Forward one driver progress report as a `PouringProgress` entry.
    fn relay_progress(&self, done_ml: f32, target_ml: f32) {
        if self.cancel.load(Ordering::SeqCst) {
            // Cancellation armed: the component finishes physically but
            // observers hear nothing further from it.
            return;
        }
        lock(&self.status).step_done_ml = done_ml;
        // Rejected (not relayed) if an abort wins the race after the flag
        // check above.
        let _ = self
            .machine
            .transition(BartenderEvent::PourProgress { done_ml, target_ml });
    }

    /// Cancellation checkpoint. The flag is armed strictly after the
    /// machine reaches `Aborted`, so observing it here means `discard`
    /// is already legal for the caller. The state is cross-checked so a
    /// straggling flag store from a stale abort can never cancel a pour
    /// the machine considers healthy.
    fn checkpoint(&self, index: usize, total: usize) -> Result<()> {
        if self.cancel.load(Ordering::SeqCst)
            && self.machine.current() == BartenderState::Aborted
        {
            info!("pour cancelled at checkpoint ({index}/{total})");
            Err(PourError::Cancelled.into())
        } else {
            Ok(())
        }
    }

    /// Classify a transition the worker expected to be legal but that was
    /// rejected: the state moved underneath us. The only writer that can
    /// do that is `abort()`, so a rejection from `Aborted` is the
    /// cancellation signal.
    fn pour_interrupted(&self, err: TransitionError<BartenderState, EventKind>) -> Error {
        match err {
            TransitionError::Invalid {
                from: BartenderState::Aborted,
                ..
            } => PourError::Cancelled.into(),
            other => other.into(),
        }
    }
}
