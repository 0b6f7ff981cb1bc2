//! cantrip_roll - roll dice from the command line
//!
//! `cantrip_roll "2d6+2, d20"` prints one line per expression, exactly as
//! the chat command would.

use anyhow::Result;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Cantrip dice roller
#[derive(Parser, Debug)]
#[command(name = "cantrip_roll", version, about = "Roll dice in NdM+K notation")]
struct Args {
    /// Comma separated dice expressions, e.g. "2d6+2, d20"
    dice: String,

    /// Seed for reproducible rolls
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    if args.dice.trim().is_empty() {
        anyhow::bail!("no dice to roll");
    }

    println!("{}", cantrip::dice::roll_and_format(&args.dice, &mut rng));
    Ok(())
}
