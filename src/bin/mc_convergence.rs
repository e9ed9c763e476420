use std::path::PathBuf;

use anyhow::{Context, Result};

use quiniela_builder::classify::calibrate_and_classify;
use quiniela_builder::core_gen::base_outcomes;
use quiniela_builder::monte_carlo::estimate_hit_probability;
use quiniela_builder::tie_adjust::adjust_draws;
use quiniela_builder::{PipelineConfig, export, logging};

// Prints the base ticket's estimate at increasing trial counts; useful when tuning
// `QUINIELA_MC_TRIALS` against run time.
fn main() -> Result<()> {
    logging::init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/jornada.json"));
    let seed = std::env::args()
        .nth(2)
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(7);

    let cfg = PipelineConfig::from_env().context("load configuration")?;
    let matches = calibrate_and_classify(&export::read_matches(&path)?, &cfg)?;
    let mut outcomes = base_outcomes(&matches, &cfg);
    adjust_draws(&mut outcomes, &matches, &cfg, &[]);

    for trials in [250, 1_000, 5_000, 20_000, 100_000] {
        let p = estimate_hit_probability(&outcomes, &matches, trials, cfg.min_hits, seed);
        println!("{trials:>7} trials: Pr[>={}] = {:.4}", cfg.min_hits, p);
    }
    Ok(())
}
