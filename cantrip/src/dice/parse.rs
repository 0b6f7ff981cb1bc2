//! Dice notation parsing
//!
//! Parses comma-separated batches like "2d6+2, d20-1" into roll specs.
//! Every entry is parsed on its own, so one bad entry never sinks the batch.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on dice in a single expression
pub const MAX_DICE_COUNT: u32 = 1000;

/// Upper bound on expressions in one comma-separated batch
pub const MAX_BATCH_LEN: usize = 25;

/// Usage hint shown with syntax errors
pub const USAGE: &str = "/roll <number of dice>d<dice type>[+/-<modifier>]";

/// count? d faces (sign digits)?  -- whitespace tolerated around `d` and the sign
static DICE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d*)\s*d\s*(\d+)(?:\s*([+-])\s*(\d+))?$").expect("dice regex is valid")
});

/// Die types a roll may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum DieType {
    D4,
    D6,
    D8,
    D10,
    D12,
    D20,
    D100,
}

impl DieType {
    /// All allowed die types, smallest first
    pub const ALL: [DieType; 7] = [
        DieType::D4,
        DieType::D6,
        DieType::D8,
        DieType::D10,
        DieType::D12,
        DieType::D20,
        DieType::D100,
    ];

    /// Number of faces on the die
    pub fn faces(self) -> u32 {
        match self {
            DieType::D4 => 4,
            DieType::D6 => 6,
            DieType::D8 => 8,
            DieType::D10 => 10,
            DieType::D12 => 12,
            DieType::D20 => 20,
            DieType::D100 => 100,
        }
    }

    /// Look up a die by face count
    pub fn from_faces(faces: u32) -> Option<DieType> {
        Self::ALL.into_iter().find(|d| d.faces() == faces)
    }
}

impl TryFrom<u32> for DieType {
    type Error = String;

    fn try_from(faces: u32) -> Result<Self, Self::Error> {
        DieType::from_faces(faces).ok_or_else(|| format!("d{} is not an allowed die", faces))
    }
}

impl From<DieType> for u32 {
    fn from(die: DieType) -> u32 {
        die.faces()
    }
}

impl fmt::Display for DieType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.faces())
    }
}

/// A validated dice roll specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollSpec {
    /// Number of dice, at least 1
    pub count: u32,
    /// Die to roll
    pub die: DieType,
    /// Flat modifier added to the sum
    pub modifier: i32,
}

impl RollSpec {
    /// Create a new roll spec
    pub fn new(count: u32, die: DieType, modifier: i32) -> Self {
        Self { count, die, modifier }
    }

    /// A single d20 with a bonus, as used for attack rolls
    pub fn d20(bonus: i32) -> Self {
        Self::new(1, DieType::D20, bonus)
    }

    /// Number of faces per die
    pub fn faces(&self) -> u32 {
        self.die.faces()
    }
}

impl fmt::Display for RollSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifier > 0 {
            write!(f, "{}{}+{}", self.count, self.die, self.modifier)
        } else if self.modifier < 0 {
            write!(f, "{}{}{}", self.count, self.die, self.modifier)
        } else {
            write!(f, "{}{}", self.count, self.die)
        }
    }
}

impl FromStr for RollSpec {
    type Err = DiceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_dice(s)
    }
}

/// Why a single dice expression was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiceParseError {
    /// The text does not look like dice notation at all
    #[error("Invalid dice specification `{text}`. Usage: /roll <number of dice>d<dice type>[+/-<modifier>]")]
    Syntax { text: String },

    /// Well-formed, but the die is not one we roll
    #[error("Invalid dice type `d{faces}` in `{text}`. Available types: 4, 6, 8, 10, 12, 20, 100")]
    InvalidDiceType { text: String, faces: u32 },

    /// Well-formed, but far too many dice
    #[error("Too many dice in `{text}` ({count}). At most 1000 can be rolled at once")]
    TooManyDice { text: String, count: u32 },

    /// Entries past the batch limit, reported once in place of all of them
    #[error("Too many dice expressions ({count} extra). At most 25 can be rolled at once")]
    TooManyExpressions { count: usize },
}

impl DiceParseError {
    /// The offending expression text, when the error is about one expression
    pub fn text(&self) -> Option<&str> {
        match self {
            DiceParseError::Syntax { text }
            | DiceParseError::InvalidDiceType { text, .. }
            | DiceParseError::TooManyDice { text, .. } => Some(text),
            DiceParseError::TooManyExpressions { .. } => None,
        }
    }
}

/// Parse a single dice expression like "2d6+3"
pub fn parse_dice(expression: &str) -> Result<RollSpec, DiceParseError> {
    let text = expression.trim();
    let syntax = || DiceParseError::Syntax {
        text: text.to_string(),
    };

    let caps = DICE_REGEX.captures(text).ok_or_else(syntax)?;

    // "d6" means "1d6"
    let count: u32 = match caps.get(1).map(|m| m.as_str()).unwrap_or("") {
        "" => 1,
        digits => digits.parse().map_err(|_| syntax())?,
    };
    if count == 0 {
        return Err(syntax());
    }

    let faces: u32 = caps[2].parse().map_err(|_| syntax())?;

    let modifier: i32 = match (caps.get(3), caps.get(4)) {
        (Some(sign), Some(digits)) => {
            // Sign and digits arrive separately; join them without the gap
            let normalized = format!("{}{}", sign.as_str(), digits.as_str());
            normalized.parse().map_err(|_| syntax())?
        }
        _ => 0,
    };

    let die = DieType::from_faces(faces).ok_or_else(|| DiceParseError::InvalidDiceType {
        text: text.to_string(),
        faces,
    })?;

    if count > MAX_DICE_COUNT {
        return Err(DiceParseError::TooManyDice {
            text: text.to_string(),
            count,
        });
    }

    Ok(RollSpec { count, die, modifier })
}

/// Parse a comma-separated batch, preserving input order.
/// Entries beyond [`MAX_BATCH_LEN`] become a single trailing error.
pub fn parse_dice_expressions(text: &str) -> Vec<Result<RollSpec, DiceParseError>> {
    let mut entries = text.split(',');
    let mut outcomes: Vec<_> = entries.by_ref().take(MAX_BATCH_LEN).map(parse_dice).collect();

    let extra = entries.count();
    if extra > 0 {
        outcomes.push(Err(DiceParseError::TooManyExpressions { count: extra }));
    }
    outcomes
}
