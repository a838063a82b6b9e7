//! The stock metrics shown under the scraped rows.
//!
//! These are configuration: the engine itself knows nothing about CAPM.

use crate::metrics::MetricEngine;

pub const BETA: &str = "Beta (5Y Monthly)";
pub const MARKET_CAP: &str = "Market Cap (intraday)";
pub const SHARES_OUTSTANDING: &str = "Implied Shares Outstanding 6";
pub const REVENUE_GROWTH: &str = "Quarterly Revenue Growth (yoy)";
pub const EARNINGS_GROWTH: &str = "Quarterly Earnings Growth (yoy)";

pub const CAPM: &str = "CAPM";
pub const IMPLIED_PRICE: &str = "Implied Price";
pub const REVENUE_GROWTH_TO_CAPM: &str = "Revenue Growth / CAPM";
pub const EARNINGS_GROWTH_TO_CAPM: &str = "Earnings Growth / CAPM";

/// Constants of the capital asset pricing model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FormulaConfig {
    pub risk_free: f64,
    pub market_rate: f64,
}

impl Default for FormulaConfig {
    fn default() -> Self {
        FormulaConfig {
            risk_free: 0.04,
            market_rate: 0.092,
        }
    }
}

impl FormulaConfig {
    /// Expected return for a given beta.
    pub fn capm(&self, beta: f64) -> f64 {
        self.risk_free + beta * (self.market_rate - self.risk_free)
    }
}

/// Registers CAPM, implied price and the growth-to-CAPM ratios.
pub fn register_defaults(engine: &mut MetricEngine, config: FormulaConfig) {
    engine.define_metric(CAPM, &[BETA], move |args| config.capm(args[0]));

    engine.define_metric(IMPLIED_PRICE, &[MARKET_CAP, SHARES_OUTSTANDING], |args| {
        args[0] / args[1]
    });

    // Metrics depend on attributes only, so the ratios recompute CAPM from
    // Beta instead of reading the CAPM row.
    engine.define_metric(REVENUE_GROWTH_TO_CAPM, &[REVENUE_GROWTH, BETA], move |args| {
        args[0] / config.capm(args[1])
    });

    engine.define_metric(EARNINGS_GROWTH_TO_CAPM, &[EARNINGS_GROWTH, BETA], move |args| {
        args[0] / config.capm(args[1])
    });
}
