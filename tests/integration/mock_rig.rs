//! Mock rig adapters for integration tests.
//!
//! Records every dispense call so tests can assert on the full pour
//! history without touching real pumps, plus a gated variant that
//! hand-shakes with the test thread so aborts can land deterministically
//! while a chosen component is mid-pour.

use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};

use barmatic::bartender::{Bartender, BartenderEvent, BartenderState};
use barmatic::ports::{DispensePort, DriverFault};

// ── Recording rig ─────────────────────────────────────────────

/// Dispenses instantly, reporting completion once per component, and
/// keeps the full call history. Optionally faults on a chosen component.
pub struct RecordingRig {
    pub calls: Vec<(String, f32)>,
    fault_on: Option<(String, DriverFault)>,
}

impl RecordingRig {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            fault_on: None,
        }
    }

    /// Fault with `fault` when asked to dispense `component`.
    pub fn with_fault_on(component: impl Into<String>, fault: DriverFault) -> Self {
        Self {
            calls: Vec::new(),
            fault_on: Some((component.into(), fault)),
        }
    }

    pub fn components(&self) -> Vec<String> {
        self.calls.iter().map(|(c, _)| c.clone()).collect()
    }
}

impl DispensePort for RecordingRig {
    fn dispense(
        &mut self,
        component: &str,
        target_ml: f32,
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<(), DriverFault> {
        if let Some((bad, fault)) = &self.fault_on {
            if bad == component {
                return Err(*fault);
            }
        }
        on_progress(target_ml);
        self.calls.push((component.to_string(), target_ml));
        Ok(())
    }
}

// ── Gated rig ─────────────────────────────────────────────────

/// Hand-shakes with the test thread: announces each component on
/// `started`, then blocks until the test sends on `release`. Progress is
/// reported (once, at completion) only after release, so the test can
/// issue an `abort()` that is guaranteed to land mid-component.
pub struct GatedRig {
    started_tx: Sender<String>,
    release_rx: Receiver<()>,
}

impl GatedRig {
    /// Returns the rig plus the test-side ends of both channels.
    pub fn new() -> (Self, Receiver<String>, Sender<()>) {
        let (started_tx, started_rx) = channel();
        let (release_tx, release_rx) = channel();
        (
            Self {
                started_tx,
                release_rx,
            },
            started_rx,
            release_tx,
        )
    }
}

impl DispensePort for GatedRig {
    fn dispense(
        &mut self,
        component: &str,
        target_ml: f32,
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<(), DriverFault> {
        self.started_tx
            .send(component.to_string())
            .expect("test dropped the started receiver");
        self.release_rx
            .recv()
            .expect("test dropped the release sender");
        on_progress(target_ml);
        Ok(())
    }
}

// ── Event log ─────────────────────────────────────────────────

/// Register observers for all six states, collecting one line per entry.
pub fn attach_event_log<D: DispensePort>(bartender: &Bartender<D>) -> Arc<Mutex<Vec<String>>> {
    let entries = Arc::new(Mutex::new(Vec::new()));

    let log = Arc::clone(&entries);
    bartender.on_transition(BartenderState::Idle, move |_| {
        log.lock().unwrap().push("IDLE".to_string());
    });
    let log = Arc::clone(&entries);
    bartender.on_transition(BartenderState::Making, move |_| {
        log.lock().unwrap().push("MAKING".to_string());
    });
    let log = Arc::clone(&entries);
    bartender.on_transition(BartenderState::Pouring, move |event| {
        if let BartenderEvent::PourStarted { component, .. } = event {
            log.lock().unwrap().push(format!("POURING {component}"));
        }
    });
    let log = Arc::clone(&entries);
    bartender.on_transition(BartenderState::PouringProgress, move |event| {
        if let BartenderEvent::PourProgress { done_ml, target_ml } = event {
            log.lock()
                .unwrap()
                .push(format!("PROGRESS {done_ml:.0}/{target_ml:.0}"));
        }
    });
    let log = Arc::clone(&entries);
    bartender.on_transition(BartenderState::Ready, move |_| {
        log.lock().unwrap().push("READY".to_string());
    });
    let log = Arc::clone(&entries);
    bartender.on_transition(BartenderState::Aborted, move |_| {
        log.lock().unwrap().push("ABORTED".to_string());
    });

    entries
}
