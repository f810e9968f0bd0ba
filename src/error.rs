//! Unified error types for the Barmatic core.
//!
//! A single `Error` enum that every subsystem can convert into, keeping
//! the callers' error handling uniform: state-machine violations are
//! programmer/usage errors reported synchronously, pour failures are
//! runtime outcomes of an in-flight drink, and recipe errors are rejected
//! before any hardware is touched.

use core::fmt;

use crate::bartender::{BartenderState, EventKind};
use crate::fsm::TransitionError;
use crate::ports::DriverFault;
use crate::recipe::RecipeError;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the core funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An operation was attempted that is not legal from the current
    /// controller state (e.g. `abort()` while idle).
    Transition(TransitionError<BartenderState, EventKind>),
    /// An in-flight pour ended early.
    Pour(PourError),
    /// A pour sequence violated the recipe invariants.
    Recipe(RecipeError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transition(e) => write!(f, "transition: {e}"),
            Self::Pour(e) => write!(f, "pour: {e}"),
            Self::Recipe(e) => write!(f, "recipe: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Pour failures
// ---------------------------------------------------------------------------

/// Why an in-flight pour stopped before reaching `Ready`.
///
/// Either way the controller lands in `Aborted` and the half-made drink
/// must be dumped via [`Bartender::discard`](crate::bartender::Bartender::discard)
/// before the next one can be made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PourError {
    /// Cancellation requested via `abort()` and observed by the pour loop
    /// at its next checkpoint.
    Cancelled,
    /// The dispensing hardware failed. Never retried: resuming a partially
    /// poured drink without operator confirmation is unsafe.
    Driver(DriverFault),
}

impl fmt::Display for PourError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled at checkpoint"),
            Self::Driver(e) => write!(f, "driver fault: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<TransitionError<BartenderState, EventKind>> for Error {
    fn from(e: TransitionError<BartenderState, EventKind>) -> Self {
        Self::Transition(e)
    }
}

impl From<PourError> for Error {
    fn from(e: PourError) -> Self {
        Self::Pour(e)
    }
}

impl From<DriverFault> for Error {
    fn from(e: DriverFault) -> Self {
        Self::Pour(PourError::Driver(e))
    }
}

impl From<RecipeError> for Error {
    fn from(e: RecipeError) -> Self {
        Self::Recipe(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
