use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use crate::classify::calibrate_and_classify;
use crate::config::PipelineConfig;
use crate::core_gen::generate_core;
use crate::error::Result;
use crate::model::{ClassifiedMatch, Match, Ticket};
use crate::monte_carlo::{estimate_tickets, joint_portfolio_probability, with_pool};
use crate::satellite::{PivotStatus, generate_satellites};
use crate::validate::{ValidationReport, validate};

// Keeps the estimator's streams apart from the generator's.
const MC_SEED_SALT: u64 = 0x6d63_5f73_6565_6421;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioRun {
    pub seed: u64,
    pub config: PipelineConfig,
    pub matches: Vec<ClassifiedMatch>,
    pub tickets: Vec<Ticket>,
    pub report: ValidationReport,
    pub pivot_status: PivotStatus,
}

impl PortfolioRun {
    pub fn is_degraded(&self) -> bool {
        self.pivot_status == PivotStatus::DegradedFallback
    }
}

/// Runs every stage in order. Only malformed input fails; constraint misses end up
/// in the report.
pub fn build_portfolio(raw: &[Match], cfg: &PipelineConfig, seed: u64) -> Result<PortfolioRun> {
    cfg.validate()?;
    let span = info_span!("portfolio", seed, tickets = cfg.num_tickets);
    let _enter = span.enter();

    let matches = calibrate_and_classify(raw, cfg)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut tickets = generate_core(&matches, cfg, &mut rng);
    tickets.truncate(cfg.core_count());

    let batch = generate_satellites(&matches, &tickets, cfg.satellite_count(), cfg, &mut rng);
    tickets.extend(batch.tickets);

    let mc_seed = seed ^ MC_SEED_SALT;
    estimate_tickets(&mut tickets, &matches, cfg, mc_seed);

    let mut report = validate(&tickets, cfg);
    let joint = with_pool(cfg.threads, || {
        joint_portfolio_probability(
            &tickets,
            &matches,
            cfg.monte_carlo_trials,
            cfg.min_hits,
            mc_seed,
        )
    });
    report.metrics.joint_hit_probability = Some(joint);

    info!(
        tickets = tickets.len(),
        valid = report.is_valid,
        portfolio = report.metrics.portfolio_hit_probability,
        joint,
        degraded = batch.pivot_status == PivotStatus::DegradedFallback,
        "portfolio built"
    );

    Ok(PortfolioRun {
        seed,
        config: cfg.clone(),
        matches,
        tickets,
        report,
        pivot_status: batch.pivot_status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TicketKind;

    fn jornada() -> Vec<Match> {
        [
            (0.55, 0.27, 0.18),
            (0.45, 0.30, 0.25),
            (0.33, 0.36, 0.31),
            (0.25, 0.28, 0.47),
            (0.66, 0.22, 0.12),
            (0.42, 0.29, 0.29),
            (0.31, 0.37, 0.32),
            (0.50, 0.27, 0.23),
            (0.20, 0.25, 0.55),
            (0.38, 0.30, 0.32),
            (0.44, 0.31, 0.25),
            (0.34, 0.35, 0.31),
            (0.15, 0.20, 0.65),
            (0.48, 0.26, 0.26),
        ]
        .iter()
        .enumerate()
        .map(|(i, (h, d, a))| Match::new(&format!("L{i}"), &format!("V{i}"), *h, *d, *a))
        .collect()
    }

    fn small_cfg(num_tickets: usize) -> PipelineConfig {
        PipelineConfig {
            num_tickets,
            monte_carlo_trials: 300,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn portfolio_has_configured_size_and_order() {
        let run = build_portfolio(&jornada(), &small_cfg(11), 17).unwrap();
        assert_eq!(run.tickets.len(), 11);
        assert!(run.tickets[..4].iter().all(|t| t.kind == TicketKind::Core));
        assert!(run.tickets[4..].iter().all(|t| t.kind == TicketKind::Satellite));
        let ids: Vec<usize> = run.tickets.iter().map(|t| t.id).collect();
        assert_eq!(ids, (1..=11).collect::<Vec<_>>());
        assert!(run.report.metrics.joint_hit_probability.is_some());
        assert!(!run.is_degraded());
    }

    #[test]
    fn fewer_tickets_than_core_truncates() {
        let run = build_portfolio(&jornada(), &small_cfg(2), 1).unwrap();
        assert_eq!(run.tickets.len(), 2);
        assert!(run.tickets.iter().all(|t| t.kind == TicketKind::Core));
    }

    #[test]
    fn same_seed_same_run() {
        let a = build_portfolio(&jornada(), &small_cfg(8), 99).unwrap();
        let b = build_portfolio(&jornada(), &small_cfg(8), 99).unwrap();
        assert_eq!(a.tickets, b.tickets);
        assert_eq!(a.report, b.report);
    }

    #[test]
    fn bad_input_aborts_before_generation() {
        let mut matches = jornada();
        matches[3].p_local = -0.5;
        assert!(build_portfolio(&matches, &small_cfg(6), 1).is_err());
        assert!(build_portfolio(&jornada()[..10], &small_cfg(6), 1).is_err());
    }
}
