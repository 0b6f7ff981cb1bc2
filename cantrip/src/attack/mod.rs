//! Attacks
//!
//! Implements:
//! - [`AttackWizard`] - guided creation of an attack definition
//! - [`AttackResolutionFlow`] - attack roll, save, and damage for one use of an attack
//! - [`AttackStore`] - persistence of finished definitions

mod resolution;
mod store;
mod wizard;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::character::Ability;

pub use resolution::{AttackResolutionFlow, ResolutionEvent, ResolutionStep, BASE_DC};
pub use store::{AttackError, AttackStore};
pub use wizard::{AttackWizard, WizardEvent, WizardStep, MAX_FLAT_MODIFIER};

/// Kinds of roll an attack can call for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollType {
    AttackRoll,
    SavingThrow,
    Neither,
}

impl fmt::Display for RollType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RollType::AttackRoll => "Attack Roll",
            RollType::SavingThrow => "Saving Throw",
            RollType::Neither => "Neither",
        })
    }
}

/// The effective roll types after a selection; "Neither" wins over everything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RollTypes {
    pub attack_roll: bool,
    pub saving_throw: bool,
}

impl RollTypes {
    pub fn from_selection(selected: &[RollType]) -> Result<Self, InteractionError> {
        if selected.is_empty() {
            return Err(InteractionError::EmptySelection);
        }
        if selected.contains(&RollType::Neither) {
            return Ok(Self::default());
        }
        Ok(Self {
            attack_roll: selected.contains(&RollType::AttackRoll),
            saving_throw: selected.contains(&RollType::SavingThrow),
        })
    }

    /// True when no roll is needed beyond damage
    pub fn is_neither(&self) -> bool {
        !self.attack_roll && !self.saving_throw
    }
}

/// A saved attack belonging to a character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackDefinition {
    pub character_id: i64,
    pub name: String,
    pub requires_attack_roll: bool,
    pub requires_saving_throw: bool,
    /// Ability behind the attack bonus / save DC; `None` when no roll is needed
    pub attribute: Option<Ability>,
    /// Ability the target saves with
    pub save_target: Option<Ability>,
    pub proficient: bool,
    pub flat_modifier: i32,
    /// Dice batch rolled for damage, e.g. "1d8+3, 2d6"
    pub damage: String,
}

impl AttackDefinition {
    pub fn roll_types(&self) -> RollTypes {
        RollTypes {
            attack_roll: self.requires_attack_roll,
            saving_throw: self.requires_saving_throw,
        }
    }
}

/// Rejected interaction events. The interaction is left exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InteractionError {
    #[error("expected {expected} but got {got}")]
    UnexpectedEvent {
        expected: &'static str,
        got: &'static str,
    },

    #[error("invalid attack name: {0}")]
    InvalidName(String),

    #[error("select at least one roll type")]
    EmptySelection,

    #[error("{0} cannot be used as an attack attribute")]
    AttributeNotAllowed(Ability),

    #[error("invalid damage roll: {0}")]
    InvalidDamage(String),

    #[error("modifier {0} is outside -100..=100")]
    ModifierOutOfRange(i32),

    #[error("interaction {0} not found or expired")]
    NotFound(uuid::Uuid),

    #[error("interaction belongs to someone else")]
    NotOwner,
}
