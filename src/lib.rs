pub mod calibration;
pub mod classify;
pub mod config;
pub mod core_gen;
pub mod error;
pub mod export;
pub mod logging;
pub mod model;
pub mod monte_carlo;
pub mod pipeline;
pub mod satellite;
pub mod tie_adjust;
pub mod validate;

pub use config::PipelineConfig;
pub use error::QuinielaError;
pub use pipeline::{PortfolioRun, build_portfolio};
