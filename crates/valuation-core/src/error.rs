use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValuationError {
    #[error("Invalid discount parameters: WACC {wacc} must exceed terminal growth {terminal_growth}")]
    InvalidDiscountParameters { wacc: f64, terminal_growth: f64 },

    #[error("Invalid shares outstanding: {0}")]
    InvalidShares(f64),

    #[error("Projection series is empty")]
    EmptyProjection,

    #[error("Non-finite result: {0}")]
    NonFiniteResult(String),

    #[error("Invalid component key: {0}")]
    InvalidKey(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type ValuationResult<T> = Result<T, ValuationError>;
