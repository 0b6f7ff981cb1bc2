//! Attack resolution flow
//!
//! Walks one use of an [`AttackDefinition`]:
//! - optional attack roll, then the user confirms hit or miss
//! - optional saving throw, then the user confirms whether the target failed
//! - damage roll
//!
//! A miss ends the flow at `Failed` even when a saving throw is also required.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AttackDefinition, InteractionError};
use crate::character::CharacterAbilityBlock;
use crate::dice::{format_result, roll_batch, roll_spec, RollResult, RollSpec};

/// Save DC base: 8 + ability modifier + proficiency + modifiers
pub const BASE_DC: i32 = 8;

/// Resolution states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStep {
    Idle,
    AttackRollPrompt,
    SavingThrowPrompt,
    DamageRollPrompt,
    Failed,
    Complete,
}

impl ResolutionStep {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResolutionStep::Failed | ResolutionStep::Complete)
    }

    /// Question shown to the user at this step, if any
    pub fn prompt(&self) -> Option<&'static str> {
        match self {
            ResolutionStep::Idle => Some("Roll when ready."),
            ResolutionStep::AttackRollPrompt => Some("Did the attack hit?"),
            ResolutionStep::SavingThrowPrompt => Some("Did the target fail the saving throw?"),
            _ => None,
        }
    }

    fn expects(&self) -> &'static str {
        match self {
            ResolutionStep::Idle => "roll",
            ResolutionStep::AttackRollPrompt | ResolutionStep::SavingThrowPrompt => "confirm",
            ResolutionStep::DamageRollPrompt => "nothing (damage is being rolled)",
            ResolutionStep::Failed | ResolutionStep::Complete => "nothing (resolution is over)",
        }
    }
}

/// User input during a resolution
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolutionEvent {
    /// Start rolling
    Roll,
    /// Answer the pending yes/no question (hit? / target failed?)
    Confirm { yes: bool },
}

impl ResolutionEvent {
    fn kind(&self) -> &'static str {
        match self {
            ResolutionEvent::Roll => "roll",
            ResolutionEvent::Confirm { .. } => "confirm",
        }
    }
}

/// One use of an attack against the current ability scores
#[derive(Debug, Clone)]
pub struct AttackResolutionFlow {
    attack: AttackDefinition,
    abilities: CharacterAbilityBlock,
    step: ResolutionStep,
    visited: Vec<ResolutionStep>,
    transcript: Vec<String>,
    attack_roll: Option<RollResult>,
}

impl AttackResolutionFlow {
    pub fn new(attack: AttackDefinition, abilities: CharacterAbilityBlock) -> Self {
        Self {
            attack,
            abilities,
            step: ResolutionStep::Idle,
            visited: vec![ResolutionStep::Idle],
            transcript: Vec::new(),
            attack_roll: None,
        }
    }

    pub fn step(&self) -> ResolutionStep {
        self.step
    }

    /// Steps entered so far, in order
    pub fn visited(&self) -> &[ResolutionStep] {
        &self.visited
    }

    /// Display lines produced so far
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn attack(&self) -> &AttackDefinition {
        &self.attack
    }

    pub fn attack_roll(&self) -> Option<&RollResult> {
        self.attack_roll.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.step.is_terminal()
    }

    /// Ability modifier + proficiency (when proficient) + flat modifiers
    pub fn attack_bonus(&self) -> i32 {
        let ability = self
            .attack
            .attribute
            .map_or(0, |a| self.abilities.modifier(a));
        let proficiency = if self.attack.proficient {
            self.abilities.proficiency_bonus()
        } else {
            0
        };
        ability
            .saturating_add(proficiency)
            .saturating_add(self.attack.flat_modifier)
    }

    pub fn save_dc(&self) -> i32 {
        self.attack_bonus().saturating_add(BASE_DC)
    }

    /// Apply one event. On error nothing changes.
    pub fn handle<R: Rng>(
        &mut self,
        event: ResolutionEvent,
        rng: &mut R,
    ) -> Result<ResolutionStep, InteractionError> {
        match (self.step, event) {
            (ResolutionStep::Idle, ResolutionEvent::Roll) => {
                if self.attack.requires_attack_roll {
                    let spec = RollSpec::d20(self.attack_bonus());
                    let result = roll_spec(&spec, rng);
                    self.transcript
                        .push(format!("Attack roll: {}", format_result(&spec, &result)));
                    self.attack_roll = Some(result);
                    self.enter(ResolutionStep::AttackRollPrompt);
                } else {
                    self.after_attack_roll(rng);
                }
            }
            (ResolutionStep::AttackRollPrompt, ResolutionEvent::Confirm { yes: hit }) => {
                if hit {
                    self.after_attack_roll(rng);
                } else {
                    self.fail("The attack missed.");
                }
            }
            (ResolutionStep::SavingThrowPrompt, ResolutionEvent::Confirm { yes: target_failed }) => {
                if target_failed {
                    self.roll_damage(rng);
                } else {
                    self.fail("The target succeeded on its saving throw.");
                }
            }
            (step, event) => {
                return Err(InteractionError::UnexpectedEvent {
                    expected: step.expects(),
                    got: event.kind(),
                })
            }
        }
        Ok(self.step)
    }

    /// Reached with no attack roll, or a confirmed hit
    fn after_attack_roll<R: Rng>(&mut self, rng: &mut R) {
        if self.attack.requires_saving_throw {
            let target = self
                .attack
                .save_target
                .map_or_else(|| "saving throw".to_string(), |a| format!("{} saving throw", a));
            self.transcript
                .push(format!("Saving throw: DC {} {}", self.save_dc(), target));
            self.enter(ResolutionStep::SavingThrowPrompt);
        } else {
            self.roll_damage(rng);
        }
    }

    fn roll_damage<R: Rng>(&mut self, rng: &mut R) {
        self.enter(ResolutionStep::DamageRollPrompt);
        for outcome in roll_batch(&self.attack.damage, rng) {
            let line = match outcome {
                Ok(result) => result.to_string(),
                Err(err) => err.to_string(),
            };
            self.transcript.push(format!("Damage: {}", line));
        }
        self.enter(ResolutionStep::Complete);
    }

    fn fail(&mut self, notice: &str) {
        self.transcript.push(notice.to_string());
        self.enter(ResolutionStep::Failed);
    }

    fn enter(&mut self, step: ResolutionStep) {
        debug!("Attack '{}': {:?} -> {:?}", self.attack.name, self.step, step);
        self.step = step;
        self.visited.push(step);
    }
}
