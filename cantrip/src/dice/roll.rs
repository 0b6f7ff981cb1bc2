//! Rolling dice specs against a random source

use rand::Rng;
use serde::Serialize;

use super::parse::{parse_dice_expressions, DiceParseError, RollSpec};

/// The outcome of rolling one spec
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollResult {
    /// What was rolled
    pub spec: RollSpec,
    /// Individual die values, in draw order
    pub rolls: Vec<u32>,
    /// Sum of the rolls plus the modifier (never clamped, never overflows)
    pub total: i64,
}

impl RollResult {
    /// Sum of the dice without the modifier
    pub fn dice_sum(&self) -> i64 {
        self.rolls.iter().map(|&r| i64::from(r)).sum()
    }
}

/// Roll a spec, drawing exactly `spec.count` values from `rng`
pub fn roll_spec<R: Rng>(spec: &RollSpec, rng: &mut R) -> RollResult {
    let faces = spec.faces();
    let rolls: Vec<u32> = (0..spec.count)
        .map(|_| rng.random_range(1..=faces))
        .collect();

    let sum: i64 = rolls.iter().map(|&r| i64::from(r)).sum();

    RollResult {
        spec: *spec,
        rolls,
        total: sum + i64::from(spec.modifier),
    }
}

/// Parse and roll a comma-separated batch; failed entries stay in place
pub fn roll_batch<R: Rng>(
    text: &str,
    rng: &mut R,
) -> Vec<Result<RollResult, DiceParseError>> {
    parse_dice_expressions(text)
        .into_iter()
        .map(|outcome| outcome.map(|spec| roll_spec(&spec, rng)))
        .collect()
}
