//! Table-driven finite state machine engine.
//!
//! Classic transition-table pattern, reusable for any state/event pair:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │  Transition table (static)                            │
//! │  ┌───────────┬────────────┬───────────┐               │
//! │  │ from      │ event kind │ to        │               │
//! │  ├───────────┼────────────┼───────────┤               │
//! │  │ Idle      │ MakeDrink  │ Making    │               │
//! │  │ Making    │ PourStarted│ Pouring   │  ...          │
//! │  └───────────┴────────────┴───────────┘               │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! [`StateMachine::transition`] looks up `(current, event.kind())` in the
//! table. A missing row is a usage error: the call fails with
//! [`TransitionError::Invalid`] and the state is untouched. A matching row
//! swaps the state and then runs the single entry callback registered for
//! the new state, synchronously, on the thread that performed the
//! transition. The event itself (with its payload) is handed to the
//! callback.
//!
//! The machine is internally synchronized: all methods take `&self`, so a
//! controller can expose it to several threads at once. Transitions are
//! serialized end-to-end — observers see entry callbacks in exactly the
//! order the machine moved. Entry callbacks MUST NOT transition the
//! machine again: such a call fails fast with
//! [`TransitionError::Reentrant`] instead of deadlocking. Reading
//! [`StateMachine::current`] from a callback is fine.

use core::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use log::debug;

// ---------------------------------------------------------------------------
// Event trait
// ---------------------------------------------------------------------------

/// An event that can drive a [`StateMachine`].
///
/// Events may carry payload (a component name, a poured volume). The
/// transition table matches on the fieldless [`Event::Kind`] discriminant,
/// and the full event — payload included — is passed to the entry callback
/// of the state it leads to.
pub trait Event: fmt::Debug {
    /// Fieldless discriminant used as the table key.
    type Kind: Copy + Eq + fmt::Debug + Send + 'static;

    /// The discriminant of this event value.
    fn kind(&self) -> Self::Kind;
}

/// Entry callback slot: runs on the transitioning thread with the event
/// that caused entry.
pub type EnterCallback<E> = Box<dyn FnMut(&E) + Send>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A rejected transition attempt. The state is unchanged in either case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError<S, K> {
    /// `(current state, event)` has no row in the transition table —
    /// the caller attempted an action that is not valid right now.
    Invalid { from: S, event: K },
    /// `transition` was called from inside an entry callback on the
    /// dispatching thread. Re-entrant transitions are disallowed.
    Reentrant { event: K },
}

impl<S: fmt::Debug, K: fmt::Debug> fmt::Display for TransitionError<S, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { from, event } => {
                write!(f, "no transition for {event:?} from {from:?}")
            }
            Self::Reentrant { event } => {
                write!(f, "re-entrant transition on {event:?} from an entry callback")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// A table-driven state machine with per-state entry callbacks.
///
/// `S` is a small `Copy` state enum; `E` is the event type. The table is
/// borrowed for `'static` — in practice a `const` slice next to the state
/// enum definition.
pub struct StateMachine<S: 'static, E: Event> {
    table: &'static [(S, E::Kind, S)],
    current: Mutex<S>,
    callbacks: Mutex<Vec<(S, EnterCallback<E>)>>,
    /// Thread currently running an entry callback, if any.
    dispatching: Mutex<Option<ThreadId>>,
}

impl<S, E> StateMachine<S, E>
where
    S: Copy + Eq + fmt::Debug + Send + 'static,
    E: Event,
{
    /// Construct a machine over `table`, starting in `initial`.
    pub fn new(table: &'static [(S, E::Kind, S)], initial: S) -> Self {
        Self {
            table,
            current: Mutex::new(initial),
            callbacks: Mutex::new(Vec::new()),
            dispatching: Mutex::new(None),
        }
    }

    /// The current state.
    ///
    /// Safe to call from any thread, including from inside an entry
    /// callback.
    pub fn current(&self) -> S {
        *lock(&self.current)
    }

    /// Register `callback` to run on entry to `state`, replacing any
    /// callback previously registered for that state.
    ///
    /// Registration is expected at wiring time, before the machine is
    /// driven; registering from inside an entry callback is not supported.
    pub fn on_enter<F>(&self, state: S, callback: F)
    where
        F: FnMut(&E) + Send + 'static,
    {
        let mut callbacks = lock(&self.callbacks);
        match callbacks.iter_mut().find(|(s, _)| *s == state) {
            Some(slot) => slot.1 = Box::new(callback),
            None => callbacks.push((state, Box::new(callback))),
        }
    }

    /// Attempt a transition.
    ///
    /// On success the new state is returned after its entry callback (if
    /// any) has run on this thread. On failure the state is unchanged and
    /// no callback runs.
    pub fn transition(&self, event: E) -> Result<S, TransitionError<S, E::Kind>> {
        let caller = thread::current().id();
        if *lock(&self.dispatching) == Some(caller) {
            return Err(TransitionError::Reentrant {
                event: event.kind(),
            });
        }

        // Serialize the swap and the dispatch together: callbacks are
        // observed in exactly the order the machine moved.
        let mut callbacks = lock(&self.callbacks);

        let kind = event.kind();
        let entered = {
            let mut current = lock(&self.current);
            let from = *current;
            let Some(&(_, _, to)) = self.table.iter().find(|(f, k, _)| *f == from && *k == kind)
            else {
                return Err(TransitionError::Invalid { from, event: kind });
            };
            debug!("transition: {from:?} --{kind:?}--> {to:?}");
            *current = to;
            to
        };

        *lock(&self.dispatching) = Some(caller);
        let _guard = DispatchGuard {
            slot: &self.dispatching,
        };
        if let Some((_, cb)) = callbacks.iter_mut().find(|(s, _)| *s == entered) {
            cb(&event);
        }

        Ok(entered)
    }
}

/// Clears the dispatching marker even if the entry callback panics.
struct DispatchGuard<'a> {
    slot: &'a Mutex<Option<ThreadId>>,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        *lock(self.slot) = None;
    }
}

/// Lock a mutex, recovering the guard if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
