use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuinielaError {
    #[error("insufficient matches: expected {expected}, found {found}")]
    InsufficientMatches { expected: usize, found: usize },

    #[error("invalid probabilities for {local} vs {visitor}: {reason}")]
    InvalidProbabilities {
        local: String,
        visitor: String,
        reason: String,
    },

    #[error("invalid ticket count: {count}")]
    InvalidCount { count: i64 },

    #[error("invalid configuration `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("parse error on line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, QuinielaError>;
