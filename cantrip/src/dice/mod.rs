//! Dice module
//!
//! Parses dice batches ("2d6+2, d20-1"), rolls them against any
//! `rand::Rng`, and renders the results as chat lines.

mod format;
mod parse;
mod roll;

pub use format::{format_batch, format_result};
pub use parse::{
    parse_dice, parse_dice_expressions, DiceParseError, DieType, RollSpec, MAX_BATCH_LEN,
    MAX_DICE_COUNT, USAGE,
};
pub use roll::{roll_batch, roll_spec, RollResult};

/// Parse, roll, and render a batch in one call
pub fn roll_and_format<R: rand::Rng>(text: &str, rng: &mut R) -> String {
    format_batch(&roll_batch(text, rng))
}
