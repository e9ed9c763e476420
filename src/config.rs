use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{QuinielaError, Result};

/// Everything a pipeline run can tune. Threaded explicitly through every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub num_tickets: usize,
    pub matches_per_ticket: usize,
    pub min_hits: usize,
    pub draw_min: usize,
    pub draw_max: usize,
    pub anchor_threshold: f64,
    pub divisor_low: f64,
    pub divisor_high: f64,
    pub draw_threshold: f64,
    pub concentration_general: f64,
    pub concentration_initial: f64,
    pub monte_carlo_trials: usize,
    pub ticket_price: f64,
    #[serde(default)]
    pub threads: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_tickets: 30,
            matches_per_ticket: 14,
            min_hits: 11,
            draw_min: 4,
            draw_max: 6,
            anchor_threshold: 0.60,
            divisor_low: 0.40,
            divisor_high: 0.60,
            draw_threshold: 0.30,
            concentration_general: 0.70,
            concentration_initial: 0.60,
            monte_carlo_trials: 1000,
            ticket_price: 15.0,
            threads: None,
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `QUINIELA_*` variables (`.env.local` and `.env` are read first).
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(raw) = lookup("QUINIELA_NUM_TICKETS") {
            let count = parse_var::<i64>("num_tickets", &raw)?;
            if count < 1 {
                return Err(QuinielaError::InvalidCount { count });
            }
            cfg.num_tickets = count as usize;
        }
        if let Some(raw) = lookup("QUINIELA_MATCHES") {
            cfg.matches_per_ticket = parse_var("matches_per_ticket", &raw)?;
        }
        if let Some(raw) = lookup("QUINIELA_MIN_HITS") {
            cfg.min_hits = parse_var("min_hits", &raw)?;
        }
        if let Some(raw) = lookup("QUINIELA_DRAW_MIN") {
            cfg.draw_min = parse_var("draw_min", &raw)?;
        }
        if let Some(raw) = lookup("QUINIELA_DRAW_MAX") {
            cfg.draw_max = parse_var("draw_max", &raw)?;
        }
        if let Some(raw) = lookup("QUINIELA_CONCENTRATION_GENERAL") {
            cfg.concentration_general = parse_var("concentration_general", &raw)?;
        }
        if let Some(raw) = lookup("QUINIELA_CONCENTRATION_INITIAL") {
            cfg.concentration_initial = parse_var("concentration_initial", &raw)?;
        }
        if let Some(raw) = lookup("QUINIELA_MC_TRIALS") {
            cfg.monte_carlo_trials = parse_var("monte_carlo_trials", &raw)?;
        }
        if let Some(raw) = lookup("QUINIELA_TICKET_PRICE") {
            cfg.ticket_price = parse_var("ticket_price", &raw)?;
        }
        if let Some(raw) = lookup("QUINIELA_THREADS") {
            let threads: usize = parse_var("threads", &raw)?;
            cfg.threads = Some(threads.clamp(1, 64));
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_tickets < 1 {
            return Err(QuinielaError::InvalidCount {
                count: self.num_tickets as i64,
            });
        }
        if self.matches_per_ticket == 0 {
            return Err(invalid("matches_per_ticket", "must be at least 1"));
        }
        if self.min_hits == 0 || self.min_hits > self.matches_per_ticket {
            return Err(invalid(
                "min_hits",
                format!("must be in 1..={}", self.matches_per_ticket),
            ));
        }
        if self.draw_min > self.draw_max {
            return Err(invalid(
                "draw_min",
                format!("{} exceeds draw_max {}", self.draw_min, self.draw_max),
            ));
        }
        if self.draw_max > self.matches_per_ticket {
            return Err(invalid(
                "draw_max",
                format!("exceeds matches per ticket ({})", self.matches_per_ticket),
            ));
        }
        for (field, value) in [
            ("concentration_general", self.concentration_general),
            ("concentration_initial", self.concentration_initial),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(invalid(field, format!("{value} is outside (0, 1]")));
            }
        }
        if self.monte_carlo_trials < 1 {
            return Err(invalid("monte_carlo_trials", "must be at least 1"));
        }
        if !(self.divisor_low <= self.divisor_high && self.divisor_high <= self.anchor_threshold) {
            return Err(invalid(
                "divisor_low",
                "expected divisor_low <= divisor_high <= anchor_threshold",
            ));
        }
        if !(self.ticket_price.is_finite() && self.ticket_price > 0.0) {
            return Err(invalid("ticket_price", "must be positive"));
        }
        Ok(())
    }

    pub fn core_count(&self) -> usize {
        self.num_tickets.min(crate::core_gen::CORE_TICKETS)
    }

    pub fn satellite_count(&self) -> usize {
        self.num_tickets.saturating_sub(crate::core_gen::CORE_TICKETS)
    }
}

fn parse_var<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| invalid(field, format!("cannot parse `{}`", raw.trim())))
}

fn invalid(field: &'static str, reason: impl Into<String>) -> QuinielaError {
    QuinielaError::InvalidConfig {
        field,
        reason: reason.into(),
    }
}
