//! Scenario input: everything needed for one evaluation apart from the catalog.

use hp_catalog::{EquipmentClass, PriceField, RefrigerantFilter, SelectionMode};
use hp_core::{
    ClimateCondition, CurrencyCode, Duty, Envelope, InsulationTier, RegionSettings,
    ValidationError, Zone,
};
use hp_energy::{BaselineSystem, ProposedSystem};
use hp_strategy::QualitativeScores;
use hp_thermal::{HotWaterDemand, OperatingProfile, Ventilation};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{EngineConfig, EngineError};

/// Envelope as entered: a preset tier, or a custom tier with explicit values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeInput {
    pub tier: InsulationTier,
    #[serde(default)]
    pub glazing_ratio: f64,
    #[serde(default)]
    pub wall_u: Option<f64>,
    #[serde(default)]
    pub roof_u: Option<f64>,
    #[serde(default)]
    pub glass_u: Option<f64>,
    #[serde(default)]
    pub air_changes_per_hour: Option<f64>,
}

impl EnvelopeInput {
    /// Preset tiers ignore explicit U-values; custom requires all of them.
    pub fn build(&self) -> Result<Envelope, ValidationError> {
        match self.tier {
            InsulationTier::Custom => match (
                self.wall_u,
                self.roof_u,
                self.glass_u,
                self.air_changes_per_hour,
            ) {
                (Some(w), Some(r), Some(g), Some(ach)) => {
                    Envelope::custom(w, r, g, self.glazing_ratio, ach)
                }
                _ => Err(ValidationError::CustomTierWithoutValues),
            },
            tier => Envelope::from_tier(tier, self.glazing_ratio),
        }
    }
}

/// What the equipment is sized for.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingInput {
    /// Defaults to the dominant season.
    pub duty: Option<Duty>,
    pub class: EquipmentClass,
    /// Refrigerant name, or "any".
    pub refrigerant: Option<String>,
    pub price_field: PriceField,
    pub mode: Option<SelectionMode>,
}

impl SizingInput {
    pub fn refrigerant_filter(&self) -> RefrigerantFilter {
        self.refrigerant
            .as_deref()
            .map(RefrigerantFilter::parse)
            .unwrap_or_default()
    }
}

/// Installation labour and materials.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Installation {
    Fixed(Decimal),
    PercentOfEquipment(f64),
}

impl Default for Installation {
    fn default() -> Self {
        Installation::Fixed(Decimal::ZERO)
    }
}

/// Landed-cost adders for imported equipment.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportCosts {
    /// Duty as a percentage of the converted equipment cost.
    pub duty_pct: f64,
    pub freight: Decimal,
    pub clearance: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpgradeInput {
    pub label: String,
    pub amount: Decimal,
}

/// Capital cost inputs. Amounts are in the region currency except catalog
/// prices, which are in `catalog_currency`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapexInput {
    pub catalog_currency: CurrencyCode,
    #[serde(default)]
    pub installation: Installation,
    #[serde(default)]
    pub import: Option<ImportCosts>,
    #[serde(default)]
    pub storage: Decimal,
    #[serde(default)]
    pub upgrades: Vec<UpgradeInput>,
}

impl Default for CapexInput {
    fn default() -> Self {
        Self {
            catalog_currency: CurrencyCode::Gbp,
            installation: Installation::default(),
            import: None,
            storage: Decimal::ZERO,
            upgrades: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinanceInput {
    pub discount_rate_pct: f64,
    pub lifespan_years: u32,
    #[serde(default)]
    pub delay_months: u32,
}

impl Default for FinanceInput {
    fn default() -> Self {
        Self {
            discount_rate_pct: 8.0,
            lifespan_years: 15,
            delay_months: 0,
        }
    }
}

fn default_operating() -> OperatingProfile {
    OperatingProfile {
        hours_per_day: 10.0,
        days_per_year: 200.0,
        load_factor: 0.5,
    }
}

/// A building or process to size and appraise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub region: RegionSettings,
    pub zones: Vec<Zone>,
    pub envelope: EnvelopeInput,
    pub climate: ClimateCondition,
    #[serde(default)]
    pub ventilation: Ventilation,
    #[serde(default)]
    pub internal_gain_w_per_m2: f64,
    #[serde(default)]
    pub hot_water: Option<HotWaterDemand>,
    #[serde(default)]
    pub sizing: SizingInput,
    /// Equivalent full-load operation of the sized duty.
    #[serde(default = "default_operating")]
    pub operating: OperatingProfile,
    /// Metered annual demand; replaces the operating-profile estimate.
    #[serde(default)]
    pub annual_thermal_kwh: Option<f64>,
    pub baseline: BaselineSystem,
    pub proposed: ProposedSystem,
    #[serde(default)]
    pub capex: CapexInput,
    #[serde(default)]
    pub finance: FinanceInput,
    /// Enables the strategic assessment.
    #[serde(default)]
    pub qualitative: Option<QualitativeScores>,
    #[serde(default)]
    pub config: EngineConfig,
}

impl Scenario {
    pub fn from_yaml_str(text: &str) -> Result<Self, EngineError> {
        serde_yaml::from_str(text).map_err(|e| EngineError::InvalidScenario(e.to_string()))
    }

    pub fn to_yaml_string(&self) -> Result<String, EngineError> {
        serde_yaml::to_string(self).map_err(|e| EngineError::InvalidScenario(e.to_string()))
    }
}
