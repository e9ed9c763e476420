use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PipelineConfig;
use crate::model::{Outcome, Prob3, Ticket, outcome_shares};
use crate::monte_carlo::portfolio_probability;

/// Historical share ranges (inclusive) for home wins, draws and away wins.
pub const HOME_RANGE: (f64, f64) = (0.35, 0.41);
pub const DRAW_RANGE: (f64, f64) = (0.25, 0.33);
pub const AWAY_RANGE: (f64, f64) = (0.30, 0.36);

/// Deviation beyond a historical range above which a warning becomes an error.
pub const DISTRIBUTION_TOLERANCE: f64 = 0.03;
pub const DRAW_OFFENDER_SHARE: f64 = 0.10;
pub const INITIAL_SLOTS: usize = 3;
pub const MAX_CONCENTRATION_WARNINGS: usize = 3;
pub const MAX_WARNINGS: usize = 3;

// Absorbs float noise when a share sits exactly on a range boundary.
const EPS: f64 = 1e-9;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub distribution: Option<Prob3>,
    pub draw_mean: f64,
    pub draw_min: usize,
    pub draw_max: usize,
    pub hit_mean: f64,
    pub hit_min: f64,
    pub hit_max: f64,
    pub portfolio_hit_probability: f64,
    /// Shared-outcome estimate; filled by the pipeline when it runs one.
    #[serde(default)]
    pub joint_hit_probability: Option<f64>,
    pub total_cost: f64,
    pub efficiency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub metrics: ValidationMetrics,
}

pub fn validate(tickets: &[Ticket], cfg: &PipelineConfig) -> ValidationReport {
    if tickets.is_empty() {
        return ValidationReport {
            is_valid: false,
            warnings: Vec::new(),
            errors: vec!["portfolio is empty".to_string()],
            metrics: ValidationMetrics::default(),
        };
    }

    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    let distribution = global_distribution(tickets);
    check_distribution(&distribution, &mut warnings, &mut errors);
    check_draw_counts(tickets, cfg, &mut warnings, &mut errors);
    check_concentration(tickets, cfg, &mut warnings, &mut errors);

    let metrics = compute_metrics(tickets, distribution, cfg);
    let report = finish(warnings, errors, metrics);

    info!(
        tickets = tickets.len(),
        warnings = report.warnings.len(),
        errors = report.errors.len(),
        is_valid = report.is_valid,
        "portfolio validated"
    );
    report
}

/// Applies the warning budget: more than `MAX_WARNINGS` warnings is itself an error.
fn finish(
    warnings: Vec<String>,
    mut errors: Vec<String>,
    metrics: ValidationMetrics,
) -> ValidationReport {
    if warnings.len() > MAX_WARNINGS {
        errors.push(format!(
            "too many warnings: {} (max {MAX_WARNINGS})",
            warnings.len()
        ));
    }
    ValidationReport {
        is_valid: errors.is_empty(),
        warnings,
        errors,
        metrics,
    }
}

pub fn global_distribution(tickets: &[Ticket]) -> Prob3 {
    let all: Vec<Outcome> = tickets
        .iter()
        .flat_map(|t| t.outcomes.iter().copied())
        .collect();
    outcome_shares(&all)
}

/// Distance of `share` outside `[lo, hi]`, zero inside.
fn range_deviation(share: f64, (lo, hi): (f64, f64)) -> f64 {
    if share < lo - EPS {
        lo - share
    } else if share > hi + EPS {
        share - hi
    } else {
        0.0
    }
}

fn check_distribution(dist: &Prob3, warnings: &mut Vec<String>, errors: &mut Vec<String>) {
    for (label, share, range) in [
        ("home", dist.home, HOME_RANGE),
        ("draw", dist.draw, DRAW_RANGE),
        ("away", dist.away, AWAY_RANGE),
    ] {
        let deviation = range_deviation(share, range);
        if deviation <= 0.0 {
            continue;
        }
        let msg = format!(
            "{label} share {:.1}% outside historical range {:.0}%-{:.0}%",
            share * 100.0,
            range.0 * 100.0,
            range.1 * 100.0
        );
        if deviation > DISTRIBUTION_TOLERANCE + EPS {
            errors.push(msg);
        } else {
            warnings.push(msg);
        }
    }
}

fn check_draw_counts(
    tickets: &[Ticket],
    cfg: &PipelineConfig,
    warnings: &mut Vec<String>,
    errors: &mut Vec<String>,
) {
    let offenders: Vec<&Ticket> = tickets
        .iter()
        .filter(|t| t.draw_count < cfg.draw_min || t.draw_count > cfg.draw_max)
        .collect();
    if offenders.is_empty() {
        return;
    }
    if offenders.len() as f64 > DRAW_OFFENDER_SHARE * tickets.len() as f64 {
        let ids: Vec<String> = offenders.iter().map(|t| t.id.to_string()).collect();
        errors.push(format!(
            "{} tickets outside draw range {}-{}: {}",
            offenders.len(),
            cfg.draw_min,
            cfg.draw_max,
            ids.join(", ")
        ));
    } else {
        for t in offenders {
            warnings.push(format!(
                "ticket {} has {} draws (expected {}-{})",
                t.id, t.draw_count, cfg.draw_min, cfg.draw_max
            ));
        }
    }
}

/// Share of tickets agreeing on the most common outcome, per slot.
pub fn slot_concentration(tickets: &[Ticket]) -> Vec<f64> {
    let slots = tickets.iter().map(|t| t.outcomes.len()).min().unwrap_or(0);
    let n = tickets.len() as f64;
    (0..slots)
        .map(|slot| {
            let mut counts = [0usize; 3];
            for t in tickets {
                counts[t.outcomes[slot] as usize] += 1;
            }
            counts.iter().copied().max().unwrap_or(0) as f64 / n
        })
        .collect()
}

fn check_concentration(
    tickets: &[Ticket],
    cfg: &PipelineConfig,
    warnings: &mut Vec<String>,
    errors: &mut Vec<String>,
) {
    let violations: Vec<(usize, f64, f64)> = slot_concentration(tickets)
        .into_iter()
        .enumerate()
        .filter_map(|(slot, share)| {
            let limit = if slot < INITIAL_SLOTS {
                cfg.concentration_initial
            } else {
                cfg.concentration_general
            };
            (share > limit + EPS).then_some((slot, share, limit))
        })
        .collect();

    if violations.len() > MAX_CONCENTRATION_WARNINGS {
        let slots: Vec<String> = violations
            .iter()
            .map(|(slot, share, _)| format!("{} ({:.0}%)", slot + 1, share * 100.0))
            .collect();
        errors.push(format!(
            "concentration exceeded on {} slots: {}",
            violations.len(),
            slots.join(", ")
        ));
    } else {
        for (slot, share, limit) in violations {
            warnings.push(format!(
                "slot {} concentration {:.0}% above {:.0}%",
                slot + 1,
                share * 100.0,
                limit * 100.0
            ));
        }
    }
}

fn compute_metrics(
    tickets: &[Ticket],
    distribution: Prob3,
    cfg: &PipelineConfig,
) -> ValidationMetrics {
    let n = tickets.len() as f64;
    let draws: Vec<usize> = tickets.iter().map(|t| t.draw_count).collect();
    let hits: Vec<f64> = tickets.iter().map(|t| t.hit_probability).collect();

    let portfolio = portfolio_probability(&hits);
    let total_cost = n * cfg.ticket_price;

    ValidationMetrics {
        distribution: Some(distribution),
        draw_mean: draws.iter().sum::<usize>() as f64 / n,
        draw_min: draws.iter().copied().min().unwrap_or(0),
        draw_max: draws.iter().copied().max().unwrap_or(0),
        hit_mean: hits.iter().sum::<f64>() / n,
        hit_min: hits.iter().copied().fold(f64::INFINITY, f64::min),
        hit_max: hits.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        portfolio_hit_probability: portfolio,
        joint_hit_probability: None,
        total_cost,
        efficiency: portfolio / (total_cost / 1000.0),
    }
}
