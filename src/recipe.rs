//! Drink recipes.
//!
//! A [`Recipe`] is an immutable description of a drink: an ordered
//! sequence of (component, volume) pairs plus display metadata. Recipes
//! are built once at menu-load time and shared by reference afterwards;
//! construction enforces the invariants (non-empty sequence, positive
//! volumes) so downstream code never re-checks them.
//!
//! Alcoholic strength is a property of the component, not the recipe, so
//! [`Recipe::strength`] computes against an external [`AbvTable`] lookup.

use core::fmt;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Named recipes, as supplied by the menu loader at startup.
pub type Menu = BTreeMap<String, Recipe>;

// ---------------------------------------------------------------------------
// Pour step
// ---------------------------------------------------------------------------

/// One element of a pour sequence: dispense `volume_ml` of `component`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PourStep {
    /// Component identifier, matching a line fitted on the rig
    /// (e.g. `"Gin"`).
    pub component: String,
    /// Target volume in mL. Always positive for steps inside a [`Recipe`].
    pub volume_ml: f32,
}

impl PourStep {
    pub fn new(component: impl Into<String>, volume_ml: f32) -> Self {
        Self {
            component: component.into(),
            volume_ml,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A pour sequence that violates the recipe invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeError {
    /// The sequence has no components.
    EmptySequence,
    /// A step's volume is zero, negative, or not a number.
    NonPositiveVolume,
    /// A single step asks for more than the configured per-step limit.
    StepAboveLimit,
    /// The sequence total does not fit the configured glass.
    ExceedsGlassCapacity,
}

impl fmt::Display for RecipeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySequence => write!(f, "sequence is empty"),
            Self::NonPositiveVolume => write!(f, "step volume must be positive"),
            Self::StepAboveLimit => write!(f, "step volume above the per-step limit"),
            Self::ExceedsGlassCapacity => write!(f, "total volume exceeds glass capacity"),
        }
    }
}

// ---------------------------------------------------------------------------
// Recipe
// ---------------------------------------------------------------------------

/// An immutable drink description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RecipeDef")]
pub struct Recipe {
    name: String,
    sequence: Vec<PourStep>,
    image: Option<String>,
}

impl Recipe {
    /// Build a recipe, validating the sequence invariants.
    pub fn new(
        name: impl Into<String>,
        sequence: Vec<PourStep>,
        image: Option<String>,
    ) -> Result<Self, RecipeError> {
        if sequence.is_empty() {
            return Err(RecipeError::EmptySequence);
        }
        // `!(v > 0.0)` also catches NaN.
        if sequence.iter().any(|step| !(step.volume_ml > 0.0)) {
            return Err(RecipeError::NonPositiveVolume);
        }
        Ok(Self {
            name: name.into(),
            sequence,
            image,
        })
    }

    /// Display name of the drink.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ordered pour sequence.
    pub fn sequence(&self) -> &[PourStep] {
        &self.sequence
    }

    /// Optional image reference for the presentation layer.
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    /// Total poured volume in mL.
    pub fn total_volume_ml(&self) -> f32 {
        self.sequence.iter().map(|step| step.volume_ml).sum()
    }

    /// Volume-weighted alcoholic strength (% ABV), bounded to [0, 100].
    ///
    /// Components missing from `abv` count as non-alcoholic.
    pub fn strength(&self, abv: &AbvTable) -> f32 {
        let total = self.total_volume_ml();
        let alcohol: f32 = self
            .sequence
            .iter()
            .map(|step| step.volume_ml * abv.abv_of(&step.component))
            .sum();
        (alcohol / total).clamp(0.0, 100.0)
    }
}

/// Serde-facing shape of a recipe definition. Deserialization routes
/// through [`Recipe::new`], so a stored menu cannot smuggle in a sequence
/// that violates the invariants.
#[derive(Deserialize)]
struct RecipeDef {
    name: String,
    sequence: Vec<PourStep>,
    #[serde(default)]
    image: Option<String>,
}

impl TryFrom<RecipeDef> for Recipe {
    type Error = RecipeError;

    fn try_from(def: RecipeDef) -> Result<Self, RecipeError> {
        Recipe::new(def.name, def.sequence, def.image)
    }
}

// ---------------------------------------------------------------------------
// ABV lookup
// ---------------------------------------------------------------------------

/// Component → alcohol-by-volume mapping (% in [0, 100]).
///
/// Owned by the menu loader, not by recipes; the controller core never
/// consults it — it exists for the presentation layer's strength display.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AbvTable(BTreeMap<String, f32>);

impl AbvTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a component's ABV. Values are clamped to the physical
    /// [0, 100] range.
    pub fn set(&mut self, component: impl Into<String>, abv_percent: f32) {
        self.0.insert(component.into(), abv_percent.clamp(0.0, 100.0));
    }

    /// ABV of `component`, or 0.0 when unknown (mixers, juices).
    pub fn abv_of(&self, component: &str) -> f32 {
        self.0.get(component).copied().unwrap_or(0.0)
    }
}

impl<S: Into<String>> FromIterator<(S, f32)> for AbvTable {
    fn from_iter<I: IntoIterator<Item = (S, f32)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (component, abv) in iter {
            table.set(component, abv);
        }
        table
    }
}
