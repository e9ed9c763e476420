use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "1")]
    Home,
    #[serde(rename = "X")]
    Draw,
    #[serde(rename = "2")]
    Away,
}

impl Outcome {
    /// Enumeration order doubles as the tie-break order for arg-max.
    pub const ALL: [Outcome; 3] = [Outcome::Home, Outcome::Draw, Outcome::Away];

    pub fn symbol(self) -> char {
        match self {
            Outcome::Home => '1',
            Outcome::Draw => 'X',
            Outcome::Away => '2',
        }
    }

    pub fn from_symbol(raw: &str) -> Option<Self> {
        match raw.trim() {
            "1" | "L" | "l" => Some(Outcome::Home),
            "X" | "x" | "E" | "e" => Some(Outcome::Draw),
            "2" | "V" | "v" => Some(Outcome::Away),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prob3 {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl Prob3 {
    pub fn new(home: f64, draw: f64, away: f64) -> Self {
        Self { home, draw, away }
    }

    pub fn uniform() -> Self {
        Self {
            home: 1.0 / 3.0,
            draw: 1.0 / 3.0,
            away: 1.0 / 3.0,
        }
    }

    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    pub fn sum(&self) -> f64 {
        self.home + self.draw + self.away
    }

    pub fn max(&self) -> f64 {
        self.home.max(self.draw).max(self.away)
    }

    /// Outcomes ordered by descending probability; equal values keep Home, Draw, Away order.
    pub fn ranked(&self) -> [Outcome; 3] {
        let mut ranked = Outcome::ALL;
        ranked.sort_by(|a, b| self.get(*b).total_cmp(&self.get(*a)));
        ranked
    }

    pub fn argmax(&self) -> Outcome {
        if self.home >= self.draw && self.home >= self.away {
            Outcome::Home
        } else if self.draw >= self.away {
            Outcome::Draw
        } else {
            Outcome::Away
        }
    }
}

/// One fixture slot as provided by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub local: String,
    pub visitor: String,
    pub p_local: f64,
    pub p_draw: f64,
    pub p_visitor: f64,
    #[serde(default)]
    pub form_diff: i32,
    #[serde(default)]
    pub injury_impact: i32,
    #[serde(default)]
    pub is_decider: bool,
}

impl Match {
    pub fn new(local: &str, visitor: &str, p_local: f64, p_draw: f64, p_visitor: f64) -> Self {
        Self {
            local: local.to_string(),
            visitor: visitor.to_string(),
            p_local,
            p_draw,
            p_visitor,
            form_diff: 0,
            injury_impact: 0,
            is_decider: false,
        }
    }

    pub fn raw_probs(&self) -> Prob3 {
        Prob3::new(self.p_local, self.p_draw, self.p_visitor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Anchor,
    Divisor,
    DrawLeaning,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedMatch {
    pub raw: Match,
    pub probs: Prob3,
    pub category: Category,
    pub suggested: Outcome,
    pub alternative: Outcome,
    pub confidence: f64,
}

impl ClassifiedMatch {
    pub fn is_anchor(&self) -> bool {
        self.category == Category::Anchor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketKind {
    Core,
    Satellite,
}

impl TicketKind {
    pub fn label(self) -> &'static str {
        match self {
            TicketKind::Core => "Core",
            TicketKind::Satellite => "Satellite",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "core" => Some(TicketKind::Core),
            "satellite" => Some(TicketKind::Satellite),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: usize,
    pub kind: TicketKind,
    pub outcomes: Vec<Outcome>,
    pub draw_count: usize,
    pub hit_probability: f64,
    pub shares: Prob3,
}

impl Ticket {
    pub fn new(id: usize, kind: TicketKind, outcomes: Vec<Outcome>) -> Self {
        let draw_count = count_draws(&outcomes);
        let shares = outcome_shares(&outcomes);
        Self {
            id,
            kind,
            outcomes,
            draw_count,
            hit_probability: 0.0,
            shares,
        }
    }

    pub fn symbols(&self) -> String {
        self.outcomes.iter().map(|o| o.symbol()).collect()
    }
}

pub fn count_draws(outcomes: &[Outcome]) -> usize {
    outcomes.iter().filter(|o| **o == Outcome::Draw).count()
}

pub fn outcome_shares(outcomes: &[Outcome]) -> Prob3 {
    if outcomes.is_empty() {
        return Prob3::new(0.0, 0.0, 0.0);
    }
    let mut home = 0usize;
    let mut draw = 0usize;
    let mut away = 0usize;
    for outcome in outcomes {
        match outcome {
            Outcome::Home => home += 1,
            Outcome::Draw => draw += 1,
            Outcome::Away => away += 1,
        }
    }
    let n = outcomes.len() as f64;
    Prob3 {
        home: home as f64 / n,
        draw: draw as f64 / n,
        away: away as f64 / n,
    }
}
