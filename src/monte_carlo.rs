use once_cell::sync::OnceCell;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::model::{ClassifiedMatch, Outcome, Prob3, Ticket};

/// Trials per independently seeded unit of work.
pub const TRIALS_PER_CHUNK: usize = 256;

static POOL: OnceCell<Option<rayon::ThreadPool>> = OnceCell::new();

/// Runs `action` on the estimator pool, sized on first use by `threads`
/// (falling back to rayon's global pool).
pub fn with_pool<T>(threads: Option<usize>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    let pool = POOL.get_or_init(|| {
        threads.and_then(|n| rayon::ThreadPoolBuilder::new().num_threads(n).build().ok())
    });
    let active = pool.as_ref().map(|p| p.current_num_threads());
    if pool_size_mismatch(threads, active) {
        debug!(
            requested = threads,
            active,
            "estimator pool already built; requested size ignored"
        );
    }
    if let Some(pool) = pool.as_ref() {
        pool.install(action)
    } else {
        action()
    }
}

// `active` is `None` when the estimator runs on rayon's global pool.
fn pool_size_mismatch(requested: Option<usize>, active: Option<usize>) -> bool {
    requested.is_some() && requested != active
}

// Chunk RNGs depend only on (seed, salt, chunk), never on scheduling.
fn chunk_rng(seed: u64, salt: u64, chunk: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ salt.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    rng.set_stream(chunk as u64);
    rng
}

fn chunk_sizes(trials: usize) -> impl ParallelIterator<Item = (usize, usize)> {
    let chunks = trials.div_ceil(TRIALS_PER_CHUNK);
    (0..chunks).into_par_iter().map(move |chunk| {
        let start = chunk * TRIALS_PER_CHUNK;
        (chunk, TRIALS_PER_CHUNK.min(trials - start))
    })
}

/// Pr[hits >= min_hits] for one ticket, where each slot hits independently
/// with the calibrated probability of the chosen outcome.
pub fn estimate_hit_probability(
    outcomes: &[Outcome],
    matches: &[ClassifiedMatch],
    trials: usize,
    min_hits: usize,
    seed: u64,
) -> f64 {
    estimate_salted(outcomes, matches, trials, min_hits, seed, 0)
}

fn estimate_salted(
    outcomes: &[Outcome],
    matches: &[ClassifiedMatch],
    trials: usize,
    min_hits: usize,
    seed: u64,
    salt: u64,
) -> f64 {
    if trials == 0 {
        return 0.0;
    }
    let pick_probs: Vec<f64> = outcomes
        .iter()
        .zip(matches)
        .map(|(o, m)| m.probs.get(*o))
        .collect();

    let successes: usize = chunk_sizes(trials)
        .map(|(chunk, len)| {
            let mut rng = chunk_rng(seed, salt, chunk);
            let mut ok = 0usize;
            for _ in 0..len {
                let hits = pick_probs
                    .iter()
                    .filter(|p| rng.gen_range(0.0..1.0) < **p)
                    .count();
                if hits >= min_hits {
                    ok += 1;
                }
            }
            ok
        })
        .sum();

    successes as f64 / trials as f64
}

/// Fills `hit_probability` on every ticket. Each ticket gets its own RNG streams,
/// so the result does not depend on ticket order or thread count.
pub fn estimate_tickets(
    tickets: &mut [Ticket],
    matches: &[ClassifiedMatch],
    cfg: &PipelineConfig,
    seed: u64,
) {
    let trials = cfg.monte_carlo_trials;
    let min_hits = cfg.min_hits;
    with_pool(cfg.threads, || {
        tickets.par_iter_mut().for_each(|t| {
            t.hit_probability =
                estimate_salted(&t.outcomes, matches, trials, min_hits, seed, t.id as u64);
        });
    });
    debug!(tickets = tickets.len(), trials, "per-ticket estimates done");
}

/// `1 - Π(1 - p_i)`: treats tickets as independent, which overstates coverage
/// because every ticket plays the same matches.
pub fn portfolio_probability(ticket_probs: &[f64]) -> f64 {
    1.0 - ticket_probs
        .iter()
        .fold(1.0, |acc, p| acc * (1.0 - p.clamp(0.0, 1.0)))
}

fn sample_outcome(probs: &Prob3, u: f64) -> Outcome {
    if u < probs.home {
        Outcome::Home
    } else if u < probs.home + probs.draw {
        Outcome::Draw
    } else {
        Outcome::Away
    }
}

/// Pr[at least one ticket reaches `min_hits`] with every ticket scored against the
/// same sampled results per trial.
pub fn joint_portfolio_probability(
    tickets: &[Ticket],
    matches: &[ClassifiedMatch],
    trials: usize,
    min_hits: usize,
    seed: u64,
) -> f64 {
    if trials == 0 || tickets.is_empty() {
        return 0.0;
    }
    let successes: usize = chunk_sizes(trials)
        .map(|(chunk, len)| {
            let mut rng = chunk_rng(seed, u64::MAX, chunk);
            let mut results = vec![Outcome::Home; matches.len()];
            let mut ok = 0usize;
            for _ in 0..len {
                for (slot, m) in matches.iter().enumerate() {
                    results[slot] = sample_outcome(&m.probs, rng.gen_range(0.0..1.0));
                }
                let covered = tickets.iter().any(|t| {
                    t.outcomes
                        .iter()
                        .zip(&results)
                        .filter(|(pick, actual)| pick == actual)
                        .count()
                        >= min_hits
                });
                if covered {
                    ok += 1;
                }
            }
            ok
        })
        .sum();

    let p = successes as f64 / trials as f64;
    info!(trials, joint = p, "joint portfolio estimate done");
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify_match;
    use crate::model::{Match, TicketKind};

    fn sure_slate(p: f64) -> Vec<ClassifiedMatch> {
        let cfg = PipelineConfig::default();
        let rest = (1.0 - p) / 2.0;
        (0..14)
            .map(|_| classify_match(&Match::new("L", "V", p, rest, rest), &cfg).unwrap())
            .collect()
    }

    #[test]
    fn certain_picks_always_hit() {
        let matches = sure_slate(1.0);
        let outcomes = vec![Outcome::Home; 14];
        assert_eq!(estimate_hit_probability(&outcomes, &matches, 500, 11, 7), 1.0);
        let wrong = vec![Outcome::Away; 14];
        assert_eq!(estimate_hit_probability(&wrong, &matches, 500, 11, 7), 0.0);
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let matches = sure_slate(0.8);
        let outcomes = vec![Outcome::Home; 14];
        let a = estimate_hit_probability(&outcomes, &matches, 3000, 11, 42);
        let b = estimate_hit_probability(&outcomes, &matches, 3000, 11, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn resizing_an_existing_pool_is_detected() {
        assert!(!pool_size_mismatch(None, Some(4)));
        assert!(!pool_size_mismatch(None, None));
        assert!(!pool_size_mismatch(Some(4), Some(4)));
        assert!(pool_size_mismatch(Some(8), Some(4)));
        assert!(pool_size_mismatch(Some(2), None));
    }

    #[test]
    fn portfolio_of_one_is_the_ticket() {
        assert!((portfolio_probability(&[0.37]) - 0.37).abs() < 1e-12);
        assert_eq!(portfolio_probability(&[]), 0.0);
    }

    #[test]
    fn portfolio_of_identical_tickets() {
        let p: f64 = 0.12;
        for k in 1..=10 {
            let probs = vec![p; k];
            let expected = 1.0 - (1.0 - p).powi(k as i32);
            assert!((portfolio_probability(&probs) - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn joint_estimate_never_exceeds_independent_bound_by_much() {
        let matches = sure_slate(0.8);
        let tickets: Vec<Ticket> = (1..=4)
            .map(|id| Ticket::new(id, TicketKind::Core, vec![Outcome::Home; 14]))
            .collect();
        let single = estimate_hit_probability(&tickets[0].outcomes, &matches, 4000, 11, 1);
        let joint = joint_portfolio_probability(&tickets, &matches, 4000, 11, 1);
        // Identical tickets cover nothing extra.
        assert!((joint - single).abs() < 0.05);
        assert!(joint < portfolio_probability(&[single; 4]));
    }
}
