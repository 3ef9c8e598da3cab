//! Engine tuning knobs, read from the `config:` section of a scenario.

use hp_catalog::DEFAULT_MAX_UNITS;
use hp_strategy::StrategyConfig;
use hp_thermal::{LoadModel, AIR_HEAT_CAPACITY_J_M3K, DEFAULT_SAFETY_FACTOR};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Applied once to building totals.
    pub safety_factor: f64,
    /// Units above this count make a candidate inadequate.
    pub max_units: u32,
    pub hurdle_rate_pct: f64,
    pub viability_threshold: f64,
    /// Volumetric heat capacity of air, J/(m³·K).
    pub air_heat_capacity_j_m3k: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let strategy = StrategyConfig::default();
        Self {
            safety_factor: DEFAULT_SAFETY_FACTOR,
            max_units: DEFAULT_MAX_UNITS,
            hurdle_rate_pct: strategy.hurdle_rate_pct,
            viability_threshold: strategy.viability_threshold,
            air_heat_capacity_j_m3k: AIR_HEAT_CAPACITY_J_M3K,
        }
    }
}

impl EngineConfig {
    pub fn load_model(&self) -> LoadModel {
        LoadModel {
            safety_factor: self.safety_factor,
            air_heat_capacity_j_m3k: self.air_heat_capacity_j_m3k,
        }
    }

    pub fn strategy(&self) -> StrategyConfig {
        StrategyConfig {
            hurdle_rate_pct: self.hurdle_rate_pct,
            viability_threshold: self.viability_threshold,
        }
    }
}
