use thiserror::Error;

use crate::packer::pow2::Pow2Warning;

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid atlas dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("No feasible packing found within budget ({trials} trials)")]
    InfeasiblePacking { trials: usize },
    #[error("Power-of-two precondition violated: {}", summarize(.0))]
    PreconditionViolated(Vec<Pow2Warning>),
    #[error("Region too large or out of space for the atlas")]
    OutOfSpace,
}

fn summarize(warnings: &[Pow2Warning]) -> String {
    warnings
        .iter()
        .map(|w| w.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, AtlasError>;
