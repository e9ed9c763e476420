use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tracing::info;

use quiniela_builder::export::{self, PortfolioRecord};
use quiniela_builder::{PipelineConfig, build_portfolio, logging};

fn main() -> Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let Some(input) = args.next().map(PathBuf::from) else {
        eprintln!("usage: quiniela <matches.json|matches.csv> [out_dir] [seed]");
        std::process::exit(2);
    };
    let out_dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("out"));
    let seed = match args.next().or_else(|| std::env::var("QUINIELA_SEED").ok()) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("seed `{raw}` is not an unsigned integer"))?,
        None => default_seed(),
    };

    let cfg = PipelineConfig::from_env().context("load configuration")?;
    let matches = export::read_matches(&input)?;
    info!(matches = matches.len(), seed, input = %input.display(), "loaded matches");

    let run = build_portfolio(&matches, &cfg, seed).context("build portfolio")?;

    export::write_tickets_table(&out_dir.join("portfolio.csv"), &run.tickets)?;
    export::write_workbook(&out_dir.join("portfolio.xlsx"), &run)?;
    let record = PortfolioRecord::new(run);
    export::write_record(&out_dir.join("portfolio.json"), &record)?;

    let run = &record.run;
    let m = &run.report.metrics;
    println!("Seed: {}", run.seed);
    for t in &run.tickets {
        println!(
            "{:>3} {:<9} {}  draws={} Pr={:.1}%",
            t.id,
            t.kind.label(),
            t.symbols(),
            t.draw_count,
            t.hit_probability * 100.0
        );
    }
    println!(
        "Portfolio Pr[>={}]: {:.1}% (joint {:.1}%)",
        run.config.min_hits,
        m.portfolio_hit_probability * 100.0,
        m.joint_hit_probability.unwrap_or(0.0) * 100.0
    );
    println!("Cost: {:.2}  Efficiency: {:.3}", m.total_cost, m.efficiency);
    println!("Valid: {}", run.report.is_valid);
    if run.is_degraded() {
        println!("Pivot: slot 1 fallback (no divisor matches)");
    }
    for e in &run.report.errors {
        println!("[ERROR] {e}");
    }
    for w in &run.report.warnings {
        println!("[WARN] {w}");
    }
    println!("Wrote {}", out_dir.display());
    Ok(())
}

fn default_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
