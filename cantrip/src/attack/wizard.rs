//! Attack creation wizard
//!
//! A one-way walk through the choices that make up an attack:
//!
//! ```text
//! SelectRollTypes -> SelectAttribute -> SelectSavingThrowTarget -> SelectProficiency
//!        |                 |                                          ^
//!        |                 +---------- (no saving throw) -------------+
//!        +---------------------------- (neither) ---------------------+
//! SelectProficiency -> CollectModifiersAndDamage -> Complete
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AttackDefinition, InteractionError, RollType, RollTypes};
use crate::character::{Ability, MAX_TEXT_LEN};
use crate::dice::parse_dice_expressions;

/// Largest flat modifier, either sign, an attack may carry
pub const MAX_FLAT_MODIFIER: i32 = 100;

/// Wizard states, in walk order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    SelectRollTypes,
    SelectAttribute,
    SelectSavingThrowTarget,
    SelectProficiency,
    CollectModifiersAndDamage,
    Complete,
}

impl WizardStep {
    /// Question shown to the user at this step
    pub fn prompt(&self) -> &'static str {
        match self {
            WizardStep::SelectRollTypes => "What type of roll(s) does this attack use?",
            WizardStep::SelectAttribute => "Which ability does this attack use?",
            WizardStep::SelectSavingThrowTarget => "Which ability does the target save with?",
            WizardStep::SelectProficiency => "Are you proficient with this attack?",
            WizardStep::CollectModifiersAndDamage => "Enter any extra modifier and the damage roll",
            WizardStep::Complete => "Attack created!",
        }
    }

    /// The event kind this step accepts
    fn expects(&self) -> &'static str {
        match self {
            WizardStep::SelectRollTypes => "roll_types",
            WizardStep::SelectAttribute => "attribute",
            WizardStep::SelectSavingThrowTarget => "saving_throw_target",
            WizardStep::SelectProficiency => "proficiency",
            WizardStep::CollectModifiersAndDamage => "modifiers_and_damage",
            WizardStep::Complete => "nothing (wizard is complete)",
        }
    }
}

/// One user selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WizardEvent {
    RollTypes {
        selected: Vec<RollType>,
    },
    Attribute {
        ability: Ability,
    },
    SavingThrowTarget {
        ability: Ability,
    },
    Proficiency {
        proficient: bool,
    },
    ModifiersAndDamage {
        #[serde(default)]
        modifier: Option<i32>,
        damage: String,
    },
}

impl WizardEvent {
    fn kind(&self) -> &'static str {
        match self {
            WizardEvent::RollTypes { .. } => "roll_types",
            WizardEvent::Attribute { .. } => "attribute",
            WizardEvent::SavingThrowTarget { .. } => "saving_throw_target",
            WizardEvent::Proficiency { .. } => "proficiency",
            WizardEvent::ModifiersAndDamage { .. } => "modifiers_and_damage",
        }
    }
}

/// Collects an [`AttackDefinition`] one selection at a time
#[derive(Debug, Clone)]
pub struct AttackWizard {
    character_id: i64,
    name: String,
    step: WizardStep,
    visited: Vec<WizardStep>,
    roll_types: RollTypes,
    attribute: Option<Ability>,
    save_target: Option<Ability>,
    proficient: bool,
    definition: Option<AttackDefinition>,
}

impl AttackWizard {
    /// Start a wizard for a new attack named `name`
    pub fn start(character_id: i64, name: &str) -> Result<Self, InteractionError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_TEXT_LEN {
            return Err(InteractionError::InvalidName(format!(
                "must be 1 to {} characters",
                MAX_TEXT_LEN
            )));
        }

        Ok(Self {
            character_id,
            name: name.to_string(),
            step: WizardStep::SelectRollTypes,
            visited: vec![WizardStep::SelectRollTypes],
            roll_types: RollTypes::default(),
            attribute: None,
            save_target: None,
            proficient: false,
            definition: None,
        })
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    /// Steps entered so far, in order
    pub fn visited(&self) -> &[WizardStep] {
        &self.visited
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_complete(&self) -> bool {
        self.step == WizardStep::Complete
    }

    /// Whether the last step will ask for a modifier
    pub fn collects_modifier(&self) -> bool {
        !self.roll_types.is_neither()
    }

    /// The finished definition, once complete
    pub fn definition(&self) -> Option<&AttackDefinition> {
        self.definition.as_ref()
    }

    pub fn into_definition(self) -> Option<AttackDefinition> {
        self.definition
    }

    /// Step back from Complete to the last input step, dropping the
    /// definition. Used when the finished attack could not be saved.
    pub fn reopen(&mut self) {
        if self.step != WizardStep::Complete {
            return;
        }
        self.visited.pop();
        self.definition = None;
        self.step = WizardStep::CollectModifiersAndDamage;
        debug!("Attack wizard '{}': reopened", self.name);
    }

    /// Apply one selection. On error nothing changes.
    pub fn handle(&mut self, event: WizardEvent) -> Result<WizardStep, InteractionError> {
        let next = match (self.step, event) {
            (WizardStep::SelectRollTypes, WizardEvent::RollTypes { selected }) => {
                self.roll_types = RollTypes::from_selection(&selected)?;
                if self.roll_types.is_neither() {
                    WizardStep::SelectProficiency
                } else {
                    WizardStep::SelectAttribute
                }
            }
            (WizardStep::SelectAttribute, WizardEvent::Attribute { ability }) => {
                if !ability.is_attack_attribute() {
                    return Err(InteractionError::AttributeNotAllowed(ability));
                }
                self.attribute = Some(ability);
                if self.roll_types.saving_throw {
                    WizardStep::SelectSavingThrowTarget
                } else {
                    WizardStep::SelectProficiency
                }
            }
            (WizardStep::SelectSavingThrowTarget, WizardEvent::SavingThrowTarget { ability }) => {
                self.save_target = Some(ability);
                WizardStep::SelectProficiency
            }
            (WizardStep::SelectProficiency, WizardEvent::Proficiency { proficient }) => {
                self.proficient = proficient;
                WizardStep::CollectModifiersAndDamage
            }
            (
                WizardStep::CollectModifiersAndDamage,
                WizardEvent::ModifiersAndDamage { modifier, damage },
            ) => {
                // A no-roll attack never asks for a modifier
                let flat_modifier = if self.collects_modifier() {
                    modifier.unwrap_or(0)
                } else {
                    0
                };
                if !(-MAX_FLAT_MODIFIER..=MAX_FLAT_MODIFIER).contains(&flat_modifier) {
                    return Err(InteractionError::ModifierOutOfRange(flat_modifier));
                }

                let damage = damage.trim().to_string();
                if let Some(err) = parse_dice_expressions(&damage)
                    .into_iter()
                    .find_map(Result::err)
                {
                    return Err(InteractionError::InvalidDamage(err.to_string()));
                }

                self.definition = Some(AttackDefinition {
                    character_id: self.character_id,
                    name: self.name.clone(),
                    requires_attack_roll: self.roll_types.attack_roll,
                    requires_saving_throw: self.roll_types.saving_throw,
                    attribute: self.attribute,
                    save_target: self.save_target,
                    proficient: self.proficient,
                    flat_modifier,
                    damage,
                });
                WizardStep::Complete
            }
            (step, event) => {
                return Err(InteractionError::UnexpectedEvent {
                    expected: step.expects(),
                    got: event.kind(),
                })
            }
        };

        debug!("Attack wizard '{}': {:?} -> {:?}", self.name, self.step, next);
        self.step = next;
        self.visited.push(next);
        Ok(next)
    }
}
