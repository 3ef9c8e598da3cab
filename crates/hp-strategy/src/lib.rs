#![deny(warnings)]

//! Strategic scorecard: blends IRR with non-financial factors.

use hp_econ::{FinancialResult, IrrStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Carbon saving (kg/yr) that earns the full carbon score.
pub const FULL_CARBON_SCORE_KG: f64 = 10_000.0;

/// Thresholds for the recommendation table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// IRR must exceed this percentage.
    pub hurdle_rate_pct: f64,
    /// Composite score at or above this counts as strategically viable.
    pub viability_threshold: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            hurdle_rate_pct: 12.0,
            viability_threshold: 6.0,
        }
    }
}

/// Analyst-entered scores, each 0 to 10.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualitativeScores {
    pub water: f64,
    pub reliability: f64,
    pub innovation: f64,
}

fn score_0_10(x: f64) -> f64 {
    if x.is_finite() {
        x.clamp(0.0, 10.0)
    } else {
        0.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrategicScore {
    pub carbon: f64,
    pub energy: f64,
    pub water: f64,
    pub reliability: f64,
    pub innovation: f64,
}

impl StrategicScore {
    /// Arithmetic mean of the five sub-scores.
    pub fn composite(&self) -> f64 {
        (self.carbon + self.energy + self.water + self.reliability + self.innovation) / 5.0
    }

    /// 1 + composite/20, bounded to [1.0, 1.5].
    pub fn multiplier(&self) -> f64 {
        (1.0 + self.composite() / 20.0).clamp(1.0, 1.5)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Approve,
    ConditionalApprove,
    StrategicConsideration,
    NotRecommended,
}

/// Fixed decision table. A positive NPV is required for every outcome other
/// than `NotRecommended`.
pub fn recommend(positive_npv: bool, meets_hurdle: bool, viable: bool) -> Recommendation {
    match (positive_npv, meets_hurdle, viable) {
        (true, true, true) => Recommendation::Approve,
        (true, true, false) => Recommendation::ConditionalApprove,
        (true, false, true) => Recommendation::StrategicConsideration,
        (true, false, false) | (false, _, _) => Recommendation::NotRecommended,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrategicAssessment {
    pub scores: StrategicScore,
    pub composite: f64,
    pub multiplier: f64,
    pub strategic_roi_pct: f64,
    pub positive_npv: bool,
    pub meets_hurdle_rate: bool,
    pub strategically_viable: bool,
    pub recommendation: Recommendation,
}

/// Score a financial result against carbon, energy and qualitative factors.
///
/// `savings_ratio` is (baseline − proposed)/baseline; `None` scores zero.
/// An undefined IRR counts as 0% and never meets the hurdle.
pub fn score(
    financial: &FinancialResult,
    carbon_saved_kg: f64,
    savings_ratio: Option<f64>,
    qualitative: &QualitativeScores,
    config: &StrategyConfig,
) -> StrategicAssessment {
    let scores = StrategicScore {
        carbon: score_0_10(carbon_saved_kg / FULL_CARBON_SCORE_KG * 10.0),
        energy: score_0_10(savings_ratio.unwrap_or(0.0) * 10.0),
        water: score_0_10(qualitative.water),
        reliability: score_0_10(qualitative.reliability),
        innovation: score_0_10(qualitative.innovation),
    };
    let composite = scores.composite();
    let multiplier = scores.multiplier();
    let irr_pct = match financial.irr.status {
        IrrStatus::Undefined => 0.0,
        _ => financial.irr.rate_pct,
    };
    let positive_npv = financial.npv > Decimal::ZERO;
    let meets_hurdle_rate =
        financial.irr.status != IrrStatus::Undefined && irr_pct > config.hurdle_rate_pct;
    let strategically_viable = composite >= config.viability_threshold;
    let recommendation = recommend(positive_npv, meets_hurdle_rate, strategically_viable);
    debug!(composite, multiplier, ?recommendation, "strategic assessment");
    StrategicAssessment {
        scores,
        composite,
        multiplier,
        strategic_roi_pct: irr_pct * multiplier,
        positive_npv,
        meets_hurdle_rate,
        strategically_viable,
        recommendation,
    }
}
