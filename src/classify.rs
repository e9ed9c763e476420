use tracing::{debug, warn};

use crate::calibration::calibrate;
use crate::config::PipelineConfig;
use crate::error::{QuinielaError, Result};
use crate::model::{Category, ClassifiedMatch, Match, Prob3};

/// Rule order is the tie-break: the first rule that fires wins.
pub fn classify(probs: &Prob3, cfg: &PipelineConfig) -> Category {
    let max = probs.max();
    if max > cfg.anchor_threshold {
        Category::Anchor
    } else if probs.draw > cfg.draw_threshold
        && probs.draw >= probs.home
        && probs.draw >= probs.away
    {
        Category::DrawLeaning
    } else if max >= cfg.divisor_low && max < cfg.divisor_high {
        Category::Divisor
    } else {
        Category::Neutral
    }
}

pub fn classify_match(raw: &Match, cfg: &PipelineConfig) -> Result<ClassifiedMatch> {
    let probs = calibrate(raw)?;
    let [top, second, _] = probs.ranked();
    let confidence = (probs.get(top) - probs.get(second)).max(0.0);
    Ok(ClassifiedMatch {
        raw: raw.clone(),
        probs,
        category: classify(&probs, cfg),
        suggested: probs.argmax(),
        alternative: second,
        confidence,
    })
}

pub fn calibrate_and_classify(
    raw_matches: &[Match],
    cfg: &PipelineConfig,
) -> Result<Vec<ClassifiedMatch>> {
    let expected = cfg.matches_per_ticket;
    if raw_matches.len() < expected {
        return Err(QuinielaError::InsufficientMatches {
            expected,
            found: raw_matches.len(),
        });
    }
    if raw_matches.len() > expected {
        warn!(
            provided = raw_matches.len(),
            expected, "ignoring matches beyond the ticket length"
        );
    }

    let classified = raw_matches
        .iter()
        .take(expected)
        .map(|m| classify_match(m, cfg))
        .collect::<Result<Vec<_>>>()?;

    for (idx, m) in classified.iter().enumerate() {
        debug!(
            slot = idx + 1,
            local = %m.raw.local,
            visitor = %m.raw.visitor,
            category = ?m.category,
            suggested = ?m.suggested,
            confidence = m.confidence,
            "classified match"
        );
    }
    Ok(classified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Outcome;

    #[test]
    fn anchor_wins_over_draw_rule() {
        let cfg = PipelineConfig::default();
        assert_eq!(classify(&Prob3::new(0.65, 0.20, 0.15), &cfg), Category::Anchor);
        assert_eq!(classify(&Prob3::new(0.10, 0.62, 0.28), &cfg), Category::Anchor);
    }

    #[test]
    fn draw_leaning_needs_threshold_and_lead() {
        let cfg = PipelineConfig::default();
        assert_eq!(
            classify(&Prob3::new(0.33, 0.34, 0.33), &cfg),
            Category::DrawLeaning
        );
        // Draw ties the lead: still leaning.
        assert_eq!(
            classify(&Prob3::new(0.35, 0.35, 0.30), &cfg),
            Category::DrawLeaning
        );
        // Draw does not lead: falls through to the divisor band.
        assert_eq!(
            classify(&Prob3::new(0.45, 0.31, 0.24), &cfg),
            Category::Divisor
        );
    }

    #[test]
    fn divisor_band_is_half_open() {
        let cfg = PipelineConfig::default();
        assert_eq!(classify(&Prob3::new(0.40, 0.25, 0.35), &cfg), Category::Divisor);
        assert_eq!(classify(&Prob3::new(0.60, 0.25, 0.15), &cfg), Category::Neutral);
        assert_eq!(classify(&Prob3::new(0.38, 0.30, 0.32), &cfg), Category::Neutral);
    }

    #[test]
    fn classification_is_total_over_a_grid() {
        let cfg = PipelineConfig::default();
        for h in 0..=20 {
            for d in 0..=(20 - h) {
                let a = 20 - h - d;
                let p = Prob3::new(h as f64 / 20.0, d as f64 / 20.0, a as f64 / 20.0);
                let first = classify(&p, &cfg);
                assert_eq!(first, classify(&p, &cfg));
            }
        }
    }

    #[test]
    fn classified_match_carries_alternative_and_confidence() {
        let cfg = PipelineConfig::default();
        let m = Match::new("A", "B", 0.50, 0.30, 0.20);
        let c = classify_match(&m, &cfg).unwrap();
        assert_eq!(c.suggested, Outcome::Home);
        assert_eq!(c.alternative, Outcome::Draw);
        assert!((c.confidence - 0.20).abs() < 1e-9);
        assert_eq!(c.category, Category::Divisor);
    }

    #[test]
    fn too_few_matches_is_an_input_error() {
        let cfg = PipelineConfig::default();
        let matches = vec![Match::new("A", "B", 0.5, 0.3, 0.2); 13];
        assert_eq!(
            calibrate_and_classify(&matches, &cfg).unwrap_err(),
            QuinielaError::InsufficientMatches {
                expected: 14,
                found: 13
            }
        );
    }

    #[test]
    fn extra_matches_are_ignored() {
        let cfg = PipelineConfig::default();
        let matches = vec![Match::new("A", "B", 0.5, 0.3, 0.2); 15];
        assert_eq!(calibrate_and_classify(&matches, &cfg).unwrap().len(), 14);
    }
}
