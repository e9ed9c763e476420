use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::core_gen::base_outcomes;
use crate::model::{Category, ClassifiedMatch, Outcome, Ticket, TicketKind};
use crate::tie_adjust::adjust_draws;

const PAIR_DIVERGENCE: f64 = 0.3;
const SINGLETON_FLIP: f64 = 0.4;

/// Whether pair pivots could be taken from divisor matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PivotStatus {
    Ok,
    /// No divisor match exists; every pair pivots on slot 0.
    DegradedFallback,
}

#[derive(Debug, Clone)]
pub struct SatelliteBatch {
    pub tickets: Vec<Ticket>,
    pub pivot_status: PivotStatus,
    /// Pivot slot used by each pair, in pair order.
    pub pivots: Vec<usize>,
}

pub fn divisor_slots(matches: &[ClassifiedMatch]) -> Vec<usize> {
    matches
        .iter()
        .enumerate()
        .filter(|(_, m)| m.category == Category::Divisor)
        .map(|(idx, _)| idx)
        .collect()
}

/// Builds `count` satellites numbered after `core`.
pub fn generate_satellites(
    matches: &[ClassifiedMatch],
    core: &[Ticket],
    count: usize,
    cfg: &PipelineConfig,
    rng: &mut impl Rng,
) -> SatelliteBatch {
    let divisors = divisor_slots(matches);
    let pivot_status = if divisors.is_empty() {
        warn!("no divisor matches; satellite pairs pivot on slot 1");
        PivotStatus::DegradedFallback
    } else {
        PivotStatus::Ok
    };

    let mut next_id = core.len() + 1;
    let mut tickets = Vec::with_capacity(count);
    let mut pivots = Vec::with_capacity(count / 2);

    for pair_idx in 0..count / 2 {
        let pivot = if divisors.is_empty() {
            0
        } else {
            divisors[pair_idx % divisors.len()]
        };
        let (a, b) = build_pair(matches, pivot, cfg, rng);
        debug!(pair = pair_idx, pivot = pivot + 1, "satellite pair generated");
        tickets.push(Ticket::new(next_id, TicketKind::Satellite, a));
        tickets.push(Ticket::new(next_id + 1, TicketKind::Satellite, b));
        next_id += 2;
        pivots.push(pivot);
    }

    if count % 2 == 1 {
        let base = core
            .first()
            .map(|t| t.outcomes.clone())
            .unwrap_or_else(|| base_outcomes(matches, cfg));
        let single = build_singleton(matches, base, cfg, rng);
        tickets.push(Ticket::new(next_id, TicketKind::Satellite, single));
    }

    SatelliteBatch {
        tickets,
        pivot_status,
        pivots,
    }
}

/// Anti-correlated pair: forced divergence on the pivot, random divergence elsewhere,
/// anchors always shared. Pivot and anchor slots are locked during draw adjustment.
pub fn build_pair(
    matches: &[ClassifiedMatch],
    pivot: usize,
    cfg: &PipelineConfig,
    rng: &mut impl Rng,
) -> (Vec<Outcome>, Vec<Outcome>) {
    let mut a = Vec::with_capacity(matches.len());
    let mut b = Vec::with_capacity(matches.len());
    let mut locked = vec![pivot];

    for (slot, m) in matches.iter().enumerate() {
        if slot == pivot {
            a.push(m.suggested);
            b.push(m.alternative);
        } else if m.is_anchor() {
            a.push(m.suggested);
            b.push(m.suggested);
            locked.push(slot);
        } else if rng.gen_bool(PAIR_DIVERGENCE) {
            a.push(m.suggested);
            b.push(m.alternative);
        } else {
            a.push(m.suggested);
            b.push(m.suggested);
        }
    }

    adjust_draws(&mut a, matches, cfg, &locked);
    adjust_draws(&mut b, matches, cfg, &locked);
    (a, b)
}

pub fn build_singleton(
    matches: &[ClassifiedMatch],
    mut outcomes: Vec<Outcome>,
    cfg: &PipelineConfig,
    rng: &mut impl Rng,
) -> Vec<Outcome> {
    for (slot, m) in matches.iter().enumerate() {
        if !m.is_anchor() && rng.gen_bool(SINGLETON_FLIP) {
            outcomes[slot] = m.alternative;
        }
    }
    adjust_draws(&mut outcomes, matches, cfg, &[]);
    outcomes
}
