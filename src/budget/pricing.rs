//! Token-to-EUR conversion.

use crate::config::BudgetConfig;

const TOKENS_PER_MILLION: f64 = 1_000_000.0;

/// Per-million-token rates used to price a metered agent call.
///
/// Rates are fixed for the lifetime of the process. Costs are computed when a
/// usage record is written, so changing the rates never alters stored rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub input_per_million_eur: f64,
    pub output_per_million_eur: f64,
}

impl Pricing {
    pub const fn new(input_per_million_eur: f64, output_per_million_eur: f64) -> Self {
        Self {
            input_per_million_eur,
            output_per_million_eur,
        }
    }

    /// Cost in EUR of the given token counts.
    pub fn calculate_cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        let input_cost = (f64::from(input_tokens) / TOKENS_PER_MILLION) * self.input_per_million_eur;
        let output_cost =
            (f64::from(output_tokens) / TOKENS_PER_MILLION) * self.output_per_million_eur;
        input_cost + output_cost
    }
}

impl From<&BudgetConfig> for Pricing {
    fn from(config: &BudgetConfig) -> Self {
        Self::new(
            config.input_price_per_million_eur,
            config.output_price_per_million_eur,
        )
    }
}
