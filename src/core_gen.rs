use rand::Rng;
use rand::seq::index;
use tracing::debug;

use crate::config::PipelineConfig;
use crate::model::{Category, ClassifiedMatch, Outcome, Ticket, TicketKind};
use crate::tie_adjust::adjust_draws;

pub const CORE_TICKETS: usize = 4;

// Variant `i` (0-based) flips `BASE_VARIATIONS + i` undecided slots.
const BASE_VARIATIONS: usize = 2;

/// Deterministic baseline: favourites everywhere, draws forced on draw-leaning
/// matches while the running draw count is below `draw_max`.
pub fn base_outcomes(matches: &[ClassifiedMatch], cfg: &PipelineConfig) -> Vec<Outcome> {
    let mut draws = 0usize;
    let mut out = Vec::with_capacity(matches.len());
    for m in matches {
        let pick = match m.category {
            Category::Anchor => m.suggested,
            Category::DrawLeaning if draws < cfg.draw_max => Outcome::Draw,
            _ => m.suggested,
        };
        if pick == Outcome::Draw {
            draws += 1;
        }
        out.push(pick);
    }
    out
}

pub fn non_anchor_slots(matches: &[ClassifiedMatch]) -> Vec<usize> {
    matches
        .iter()
        .enumerate()
        .filter(|(_, m)| !m.is_anchor())
        .map(|(idx, _)| idx)
        .collect()
}

/// Flips `amount` randomly chosen non-anchor slots to their alternative outcome.
pub fn apply_variation(
    outcomes: &mut [Outcome],
    matches: &[ClassifiedMatch],
    amount: usize,
    rng: &mut impl Rng,
) {
    let pool = non_anchor_slots(matches);
    let amount = amount.min(pool.len());
    for pick in index::sample(rng, pool.len(), amount) {
        let slot = pool[pick];
        outcomes[slot] = matches[slot].alternative;
    }
}

pub fn generate_core(
    matches: &[ClassifiedMatch],
    cfg: &PipelineConfig,
    rng: &mut impl Rng,
) -> Vec<Ticket> {
    let mut tickets = Vec::with_capacity(CORE_TICKETS);
    for idx in 0..CORE_TICKETS {
        let mut outcomes = base_outcomes(matches, cfg);
        if idx > 0 {
            apply_variation(&mut outcomes, matches, BASE_VARIATIONS + idx - 1, rng);
        }
        let draws = adjust_draws(&mut outcomes, matches, cfg, &[]);
        debug!(ticket = idx + 1, draws, "core ticket generated");
        tickets.push(Ticket::new(idx + 1, TicketKind::Core, outcomes));
    }
    tickets
}
