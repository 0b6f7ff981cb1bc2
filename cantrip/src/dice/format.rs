//! Rendering roll results as display lines

use super::parse::{DiceParseError, RollSpec};
use super::roll::RollResult;

/// Render one roll, e.g. "You rolled 2d6+2: [3, 5] + 2 = 10"
pub fn format_result(spec: &RollSpec, result: &RollResult) -> String {
    let rolls: Vec<String> = result.rolls.iter().map(|r| r.to_string()).collect();
    let operator = if spec.modifier < 0 { '-' } else { '+' };

    format!(
        "You rolled {}: [{}] {} {} = {}",
        spec,
        rolls.join(", "),
        operator,
        spec.modifier.unsigned_abs(),
        result.total
    )
}

/// Render a whole batch, one line per entry, errors as their message
pub fn format_batch(results: &[Result<RollResult, DiceParseError>]) -> String {
    results
        .iter()
        .map(|outcome| match outcome {
            Ok(result) => format_result(&result.spec, result),
            Err(err) => err.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl std::fmt::Display for RollResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_result(&self.spec, self))
    }
}
