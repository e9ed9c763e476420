use crate::error::{QuinielaError, Result};
use crate::model::{Match, Prob3};

const K_FORM: f64 = 0.15;
const K_INJURY: f64 = 0.10;
const K_DECIDER: f64 = 0.20;

// Floor for the visitor divisor so a strongly negative factor cannot blow up.
const MIN_VISITOR_DIVISOR: f64 = 0.1;

const DRAW_PARITY_GAP: f64 = 0.08;
const DRAW_BOOST: f64 = 0.06;
const DRAW_CAP: f64 = 0.95;

/// Contextual adjustment applied to the home side and inverted for the visitor.
pub fn adjustment_factor(m: &Match) -> f64 {
    1.0 + K_FORM * m.form_diff as f64
        + K_INJURY * m.injury_impact as f64
        + K_DECIDER * if m.is_decider { 1.0 } else { 0.0 }
}

pub fn calibrate(m: &Match) -> Result<Prob3> {
    let raw = m.raw_probs();
    for value in [raw.home, raw.draw, raw.away] {
        if !value.is_finite() || value < 0.0 {
            return Err(invalid(m, format!("{value} is not a probability")));
        }
    }
    if raw.sum() <= 0.0 {
        return Err(invalid(m, "probabilities sum to zero".to_string()));
    }

    let f = adjustment_factor(m);
    let p_local = (raw.home * f).max(0.0);
    let p_visitor = raw.away / f.max(MIN_VISITOR_DIVISOR);
    let mut p_draw = raw.draw;

    // Near-even matches draw more often than independent-outcome models predict.
    if (p_local - p_visitor).abs() < DRAW_PARITY_GAP && p_draw > p_local && p_draw > p_visitor {
        p_draw = (p_draw + DRAW_BOOST).min(DRAW_CAP);
    }

    let sum = p_local + p_draw + p_visitor;
    if sum <= 0.0 || !sum.is_finite() {
        return Err(invalid(m, "adjusted probabilities collapse to zero".to_string()));
    }
    Ok(Prob3 {
        home: p_local / sum,
        draw: p_draw / sum,
        away: p_visitor / sum,
    })
}

fn invalid(m: &Match, reason: String) -> QuinielaError {
    QuinielaError::InvalidProbabilities {
        local: m.local.clone(),
        visitor: m.visitor.clone(),
        reason,
    }
}
