use crate::config::PipelineConfig;
use crate::model::{ClassifiedMatch, Outcome, count_draws};

/// Only matches with at least this much draw mass may be pushed to a draw.
pub const DRAW_CANDIDATE_MIN: f64 = 0.20;

/// Forces the ticket's draw count into `[draw_min, draw_max]` where candidates allow.
///
/// Slots listed in `locked` are never touched. Returns the resulting draw count, which
/// can remain outside the range when too few candidates exist; validation reports that.
pub fn adjust_draws(
    outcomes: &mut [Outcome],
    matches: &[ClassifiedMatch],
    cfg: &PipelineConfig,
    locked: &[usize],
) -> usize {
    let draws = count_draws(outcomes);

    if draws < cfg.draw_min {
        let mut candidates: Vec<usize> = outcomes
            .iter()
            .enumerate()
            .filter(|(idx, o)| **o != Outcome::Draw && !locked.contains(idx))
            .filter(|(idx, _)| matches[*idx].probs.draw > DRAW_CANDIDATE_MIN)
            .map(|(idx, _)| idx)
            .collect();
        candidates.sort_by(|a, b| matches[*b].probs.draw.total_cmp(&matches[*a].probs.draw));
        for idx in candidates.into_iter().take(cfg.draw_min - draws) {
            outcomes[idx] = Outcome::Draw;
        }
    } else if draws > cfg.draw_max {
        let mut candidates: Vec<usize> = outcomes
            .iter()
            .enumerate()
            .filter(|(idx, o)| **o == Outcome::Draw && !locked.contains(idx))
            .map(|(idx, _)| idx)
            .collect();
        candidates.sort_by(|a, b| matches[*a].probs.draw.total_cmp(&matches[*b].probs.draw));
        for idx in candidates.into_iter().take(draws - cfg.draw_max) {
            outcomes[idx] = revert_outcome(&matches[idx]);
        }
    }

    count_draws(outcomes)
}

// The suggested pick, unless that is the draw being removed.
fn revert_outcome(m: &ClassifiedMatch) -> Outcome {
    if m.suggested != Outcome::Draw {
        m.suggested
    } else if m.probs.home >= m.probs.away {
        Outcome::Home
    } else {
        Outcome::Away
    }
}
