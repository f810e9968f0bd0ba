//! Port traits — the hexagonal boundary between the pour engine and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Bartender (domain)
//! ```
//!
//! Driven adapters (the physical dispensing rig, configuration storage)
//! implement these traits. The [`Bartender`](crate::bartender::Bartender)
//! consumes them via generics, so the domain core never touches hardware
//! directly and the whole engine runs against mocks on the host.
//!
//! ## Safety notes
//!
//! - **DispensePort** implementations own the physical interlocks (prime,
//!   line flush, valve close on drop). The core only guarantees it never
//!   starts a new component after a fault or an observed abort.
//! - **ConfigPort** implementations MUST validate before persisting.
//! - All port errors are typed — callers must handle every variant explicitly.

use core::fmt;

use crate::config::BarConfig;

// ───────────────────────────────────────────────────────────────
// Dispense port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// The blocking hardware-dispense primitive.
///
/// One call pours one component. The call blocks until `target_ml` has
/// been dispensed or the hardware gives up with a [`DriverFault`].
/// Implementations report incremental progress through `on_progress`
/// (cumulative mL dispensed so far) at whatever cadence the metering
/// hardware supports, and at least once on completion.
pub trait DispensePort {
    fn dispense(
        &mut self,
        component: &str,
        target_ml: f32,
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<(), DriverFault>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the engine configuration.
///
/// Implementations MUST validate config values before persisting
/// ([`BarConfig::validate`]). Invalid ranges are rejected with
/// [`ConfigError::ValidationFailed`], not silently clamped — a corrupt or
/// tampered config file must not be able to disable the glass-capacity
/// guard.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`BarConfig::default`] if no stored config exists.
    fn load(&self) -> Result<BarConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &BarConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// A failure of the physical dispensing hardware.
///
/// Fatal to the current pour: the engine never retries a fault — a
/// half-dispensed component cannot be un-poured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverFault {
    /// No line on the rig is fitted for the requested component.
    UnknownComponent,
    /// The component's reservoir ran dry mid-pour.
    ReservoirEmpty,
    /// The flow meter reported no movement within the driver's deadline.
    Timeout,
    /// Any other hardware-level failure, with a short reason tag.
    Hardware(&'static str),
}

impl fmt::Display for DriverFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownComponent => write!(f, "no line fitted for component"),
            Self::ReservoirEmpty => write!(f, "reservoir empty"),
            Self::Timeout => write!(f, "dispense timed out"),
            Self::Hardware(reason) => write!(f, "hardware failure: {reason}"),
        }
    }
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
