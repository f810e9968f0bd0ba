//! The dispense controller.
//!
//! [`Bartender`] owns the control state machine and drives the physical
//! rig through [`DispensePort`]. Its public operations are safe to call
//! from any thread; the long-running [`Bartender::make_drink`] runs the
//! pour on the calling thread, so callers that need a responsive surface
//! dispatch it onto a worker of their own.
//!
//! ```text
//!           make_drink                    serve
//!   IDLE ───────────────▶ MAKING   READY ──────▶ IDLE
//!                            │        ▲
//!                 PourStarted│        │Finished
//!                            ▼        │
//!                         POURING ────┘
//!                            │   ▲
//!                PourProgress│   │PourStarted (next component)
//!                            ▼   │
//!                    POURING_PROGRESS ──Finished──▶ READY
//!
//!   MAKING / POURING / POURING_PROGRESS ──abort / fault──▶ ABORTED
//!   ABORTED ──discard──▶ IDLE
//! ```
//!
//! Cancellation is cooperative: `abort()` moves the machine to `Aborted`
//! and arms a flag that the pour loop observes at its next checkpoint
//! (before each component, and again before declaring the drink ready).
//! An in-flight dispense finishes its component — instant hardware-level
//! interruption would need driver support and is out of this core's hands.

mod pour;

pub use pour::PourStatus;

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use log::info;

use crate::config::BarConfig;
use crate::error::Result;
use crate::fsm::{Event, StateMachine};
use crate::ports::{DispensePort, DriverFault};
use crate::recipe::{PourStep, RecipeError};

// ───────────────────────────────────────────────────────────────
// States and events
// ───────────────────────────────────────────────────────────────

/// The six observable controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BartenderState {
    /// Nothing staged; ready to accept `make_drink`.
    Idle,
    /// A sequence is staged and the pour loop is starting up.
    Making,
    /// A component's dispense has started.
    Pouring,
    /// The driver reported intra-component progress.
    PouringProgress,
    /// Every component poured; waiting for `serve`.
    Ready,
    /// Abort or fault observed; waiting for `discard`.
    Aborted,
}

/// Events driving the controller, with their payloads. Entry callbacks
/// registered via [`Bartender::on_transition`] receive these.
#[derive(Debug)]
pub enum BartenderEvent {
    /// A pour sequence was accepted.
    MakeDrink,
    /// The worker is starting component `index` (0-based) of `total`.
    PourStarted {
        component: String,
        index: usize,
        total: usize,
    },
    /// Cumulative progress within the current component.
    PourProgress { done_ml: f32, target_ml: f32 },
    /// Every component has been dispensed.
    Finished,
    /// Cancellation was requested.
    Abort,
    /// The dispensing hardware failed.
    Fault { fault: DriverFault },
    /// The finished drink was taken.
    Serve,
    /// The aborted glass was dumped.
    Discard,
}

/// Fieldless discriminant of [`BartenderEvent`], used as the transition
/// table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    MakeDrink,
    PourStarted,
    PourProgress,
    Finished,
    Abort,
    Fault,
    Serve,
    Discard,
}

impl Event for BartenderEvent {
    type Kind = EventKind;

    fn kind(&self) -> EventKind {
        match self {
            Self::MakeDrink => EventKind::MakeDrink,
            Self::PourStarted { .. } => EventKind::PourStarted,
            Self::PourProgress { .. } => EventKind::PourProgress,
            Self::Finished => EventKind::Finished,
            Self::Abort => EventKind::Abort,
            Self::Fault { .. } => EventKind::Fault,
            Self::Serve => EventKind::Serve,
            Self::Discard => EventKind::Discard,
        }
    }
}

/// The fixed transition table. Anything not listed here is rejected with
/// `TransitionError::Invalid` and leaves the state unchanged.
const TRANSITIONS: &[(BartenderState, EventKind, BartenderState)] = {
    use BartenderState::*;
    &[
        (Idle, EventKind::MakeDrink, Making),
        (Making, EventKind::PourStarted, Pouring),
        (Pouring, EventKind::PourProgress, PouringProgress),
        (PouringProgress, EventKind::PourProgress, PouringProgress),
        (PouringProgress, EventKind::PourStarted, Pouring),
        (Pouring, EventKind::Finished, Ready),
        (PouringProgress, EventKind::Finished, Ready),
        (Making, EventKind::Abort, Aborted),
        (Pouring, EventKind::Abort, Aborted),
        (PouringProgress, EventKind::Abort, Aborted),
        (Making, EventKind::Fault, Aborted),
        (Pouring, EventKind::Fault, Aborted),
        (PouringProgress, EventKind::Fault, Aborted),
        (Ready, EventKind::Serve, Idle),
        (Aborted, EventKind::Discard, Idle),
    ]
};

// ───────────────────────────────────────────────────────────────
// Bartender
// ───────────────────────────────────────────────────────────────

/// The dispense controller.
///
/// Generic over the rig driver `D` so the same controller runs against
/// real hardware, the simulated rig, or a recording mock.
pub struct Bartender<D: DispensePort> {
    machine: StateMachine<BartenderState, BartenderEvent>,
    rig: Mutex<D>,
    staged: Mutex<Option<Vec<PourStep>>>,
    status: Mutex<PourStatus>,
    cancel: AtomicBool,
    config: BarConfig,
}

impl<D: DispensePort> Bartender<D> {
    /// Construct a controller over `rig` with the given configuration.
    /// Starts in `Idle`.
    pub fn new(rig: D, config: BarConfig) -> Self {
        Self {
            machine: StateMachine::new(TRANSITIONS, BartenderState::Idle),
            rig: Mutex::new(rig),
            staged: Mutex::new(None),
            status: Mutex::new(PourStatus::default()),
            cancel: AtomicBool::new(false),
            config,
        }
    }

    // ── Observer registration ─────────────────────────────────

    /// Register `callback` to run on entry to `state`, replacing any
    /// previous registration for that state.
    ///
    /// Callbacks run synchronously on whichever thread performed the
    /// transition — for `Pouring`/`PouringProgress` that is the thread
    /// driving `make_drink`. Observers with thread-affinity requirements
    /// (a UI toolkit) marshal from inside the callback themselves.
    /// Callbacks must not call back into the controller's transition
    /// operations; such calls fail with a re-entrancy error.
    pub fn on_transition<F>(&self, state: BartenderState, callback: F)
    where
        F: FnMut(&BartenderEvent) + Send + 'static,
    {
        self.machine.on_enter(state, callback);
    }

    // ── Public operations ─────────────────────────────────────

    /// Pour `sequence`, component by component, blocking until the drink
    /// is ready, the pour is aborted, or the hardware faults.
    ///
    /// Valid only from `Idle`. The sequence is validated against the
    /// recipe invariants and the configured glass before any state
    /// changes. On success the controller is left in `Ready`; on
    /// [`PourError`](crate::error::PourError) it is left in `Aborted` and
    /// [`discard`](Self::discard) must follow.
    pub fn make_drink(&self, sequence: &[PourStep]) -> Result<()> {
        self.check_sequence(sequence)?;

        self.cancel.store(false, Ordering::SeqCst);
        self.machine.transition(BartenderEvent::MakeDrink)?;

        *lock(&self.staged) = Some(sequence.to_vec());
        *lock(&self.status) = PourStatus::staged(sequence.len());
        info!(
            "making drink: {} components, {:.0} mL total",
            sequence.len(),
            sequence.iter().map(|s| s.volume_ml).sum::<f32>()
        );

        self.run_sequence(sequence)
    }

    /// Request cancellation of the in-flight pour.
    ///
    /// Callable from any thread. Valid while `Making`, `Pouring` or
    /// `PouringProgress`; otherwise fails with a transition error and
    /// changes nothing. The unwind itself is asynchronous: the pour loop
    /// observes the request at its next checkpoint and `make_drink`
    /// returns `PourError::Cancelled` to whoever is driving it.
    pub fn abort(&self) -> Result<()> {
        self.machine.transition(BartenderEvent::Abort)?;
        // Armed strictly after the transition: once the loop sees the
        // flag, the machine is already in Aborted and discard() is legal.
        self.cancel.store(true, Ordering::SeqCst);
        info!("abort requested; pour stops at the next checkpoint");
        Ok(())
    }

    /// Hand over the finished drink. Valid only from `Ready`; returns the
    /// controller to `Idle` and clears the staged sequence.
    pub fn serve(&self) -> Result<()> {
        self.machine.transition(BartenderEvent::Serve)?;
        self.clear_staged();
        info!("drink served");
        Ok(())
    }

    /// Dump an aborted glass. Valid only from `Aborted`; releases the
    /// partially-dispensed state and returns the controller to `Idle`.
    /// Exactly one `discard` matches each abort or fault; a second call
    /// fails with a transition error.
    pub fn discard(&self) -> Result<()> {
        self.machine.transition(BartenderEvent::Discard)?;
        self.cancel.store(false, Ordering::SeqCst);
        self.clear_staged();
        info!("glass discarded");
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current controller state. Safe from any thread and from inside
    /// entry callbacks.
    pub fn state(&self) -> BartenderState {
        self.machine.current()
    }

    /// Snapshot of the in-flight pour's progress.
    pub fn status(&self) -> PourStatus {
        *lock(&self.status)
    }

    /// The currently staged sequence, if any.
    pub fn staged(&self) -> Option<Vec<PourStep>> {
        lock(&self.staged).clone()
    }

    /// The active configuration.
    pub fn config(&self) -> &BarConfig {
        &self.config
    }

    /// Access the rig for maintenance — reservoir queries, line priming,
    /// test inspection. Blocks while a component is mid-dispense.
    pub fn rig<R>(&self, f: impl FnOnce(&mut D) -> R) -> R {
        f(&mut lock(&self.rig))
    }

    // ── Internal ──────────────────────────────────────────────

    /// Reject a sequence that violates the recipe invariants or does not
    /// fit the configured glass. Runs before any state mutation.
    fn check_sequence(&self, sequence: &[PourStep]) -> Result<()> {
        if sequence.is_empty() {
            return Err(RecipeError::EmptySequence.into());
        }
        let mut total = 0.0f32;
        for step in sequence {
            if !(step.volume_ml > 0.0) {
                return Err(RecipeError::NonPositiveVolume.into());
            }
            if step.volume_ml > self.config.max_step_volume_ml {
                return Err(RecipeError::StepAboveLimit.into());
            }
            total += step.volume_ml;
        }
        if total > self.config.glass_capacity_ml {
            return Err(RecipeError::ExceedsGlassCapacity.into());
        }
        Ok(())
    }

    fn clear_staged(&self) {
        *lock(&self.staged) = None;
        *lock(&self.status) = PourStatus::default();
    }
}

/// Lock a mutex, recovering the guard if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
