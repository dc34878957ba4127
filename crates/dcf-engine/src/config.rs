use serde::{Deserialize, Serialize};
use valuation_core::{ValuationError, ValuationResult};

/// Projection horizon settings for [`crate::DcfEngine`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Calendar year of the first projected year
    pub start_year: i32,

    /// Number of explicitly projected years before the terminal value
    pub years_to_project: usize,

    /// FCF margin used for any year the base schedule does not cover
    pub fallback_fcf_margin: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            start_year: 2026,
            years_to_project: 10,
            fallback_fcf_margin: 0.27,
        }
    }
}

impl EngineConfig {
    pub fn new(
        start_year: i32,
        years_to_project: usize,
        fallback_fcf_margin: f64,
    ) -> ValuationResult<Self> {
        if years_to_project == 0 {
            return Err(ValuationError::InvalidConfig(
                "years_to_project must be at least 1".to_string(),
            ));
        }
        if !fallback_fcf_margin.is_finite() || fallback_fcf_margin <= -1.0 || fallback_fcf_margin > 1.0 {
            return Err(ValuationError::InvalidConfig(format!(
                "fallback_fcf_margin must be a fraction in (-1, 1], got {}",
                fallback_fcf_margin
            )));
        }

        Ok(Self {
            start_year,
            years_to_project,
            fallback_fcf_margin,
        })
    }

    pub fn final_year(&self) -> i32 {
        self.start_year + self.years_to_project as i32 - 1
    }
}
