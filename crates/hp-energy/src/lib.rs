#![deny(warnings)]

//! Annual energy, running cost and CO₂ for the incumbent and proposed systems.
//!
//! Thermal demand is converted to delivered energy through an efficiency or
//! COP, then priced against a flat or time-of-use blended tariff. Blends and
//! solar offsets are plain weighted averages; no load-duration curve is
//! modeled.

use hp_core::{non_negative, RegionProfile};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors produced by the energy model.
#[derive(Debug, Error, PartialEq)]
pub enum EnergyError {
    /// Efficiency or COP must be finite and > 0.
    #[error("invalid efficiency or COP: {0}")]
    InvalidEfficiency(f64),
    /// Fractions must be within [0, 1].
    #[error("{0} must be within [0,1]")]
    FractionOutOfRange(&'static str),
    /// Numeric conversion to decimal failed.
    #[error("non-finite numeric conversion")]
    NonFinite,
}

/// What the system draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergySource {
    Fuel,
    Grid,
}

/// Incumbent technologies with seasonal efficiency presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineTechnology {
    GasBoiler,
    OilBoiler,
    LpgBoiler,
    ElectricResistance,
}

impl BaselineTechnology {
    pub fn default_efficiency(self) -> f64 {
        match self {
            BaselineTechnology::GasBoiler => 0.90,
            BaselineTechnology::OilBoiler => 0.85,
            BaselineTechnology::LpgBoiler => 0.88,
            BaselineTechnology::ElectricResistance => 1.00,
        }
    }

    pub fn source(self) -> EnergySource {
        match self {
            BaselineTechnology::ElectricResistance => EnergySource::Grid,
            _ => EnergySource::Fuel,
        }
    }
}

/// Unit rate per kWh plus a fixed annual charge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tariff {
    pub unit_rate: Decimal,
    pub standing_charge: Decimal,
}

/// One system's year.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnualEnergy {
    pub thermal_kwh: f64,
    /// Delivered energy after efficiency/COP.
    pub consumed_kwh: f64,
    /// Delivered energy that is billed (after solar offset).
    pub chargeable_kwh: f64,
    pub cost: Decimal,
    pub co2_kg: f64,
}

fn to_decimal(x: f64) -> Result<Decimal, EnergyError> {
    Decimal::from_f64(x).ok_or(EnergyError::NonFinite)
}

fn check_fraction(x: f64, name: &'static str) -> Result<f64, EnergyError> {
    if x.is_finite() && (0.0..=1.0).contains(&x) {
        Ok(x)
    } else {
        Err(EnergyError::FractionOutOfRange(name))
    }
}

/// Energy, cost and CO₂ for a thermal demand.
pub fn annualize(
    thermal_kwh: f64,
    efficiency: f64,
    tariff: &Tariff,
    emission_factor: f64,
) -> Result<AnnualEnergy, EnergyError> {
    annualize_with_offset(thermal_kwh, efficiency, tariff, emission_factor, 0.0)
}

/// Like [`annualize`], with a fraction of delivered energy supplied free
/// (on-site solar). Emissions follow billed energy only.
pub fn annualize_with_offset(
    thermal_kwh: f64,
    efficiency: f64,
    tariff: &Tariff,
    emission_factor: f64,
    free_fraction: f64,
) -> Result<AnnualEnergy, EnergyError> {
    if !(efficiency.is_finite() && efficiency > 0.0) {
        return Err(EnergyError::InvalidEfficiency(efficiency));
    }
    let free = check_fraction(free_fraction, "solar_fraction")?;
    let thermal_kwh = non_negative(thermal_kwh);
    let consumed_kwh = thermal_kwh / efficiency;
    let chargeable_kwh = consumed_kwh * (1.0 - free);
    let cost = (to_decimal(chargeable_kwh)? * tariff.unit_rate + tariff.standing_charge).round_dp(2);
    Ok(AnnualEnergy {
        thermal_kwh,
        consumed_kwh,
        chargeable_kwh,
        cost,
        co2_kg: chargeable_kwh * non_negative(emission_factor),
    })
}

/// Incumbent system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaselineSystem {
    pub technology: BaselineTechnology,
    /// Overrides the technology preset.
    #[serde(default)]
    pub efficiency: Option<f64>,
    #[serde(default)]
    pub annual_maintenance: Decimal,
}

impl BaselineSystem {
    pub fn new(technology: BaselineTechnology) -> Self {
        Self {
            technology,
            efficiency: None,
            annual_maintenance: Decimal::ZERO,
        }
    }

    pub fn efficiency(&self) -> f64 {
        self.efficiency
            .unwrap_or_else(|| self.technology.default_efficiency())
    }

    /// Fuel price and standing charge, or the peak grid rate for electric.
    pub fn tariff(&self, profile: &RegionProfile) -> Tariff {
        match self.technology.source() {
            EnergySource::Fuel => Tariff {
                unit_rate: profile.fuel_price,
                standing_charge: profile.fuel_standing_charge,
            },
            EnergySource::Grid => Tariff {
                unit_rate: profile.grid_tariff_peak,
                standing_charge: Decimal::ZERO,
            },
        }
    }

    pub fn emission_factor(&self, profile: &RegionProfile) -> f64 {
        match self.technology.source() {
            EnergySource::Fuel => profile.co2_factor_fuel,
            EnergySource::Grid => profile.co2_factor_grid,
        }
    }

    pub fn annual(&self, thermal_kwh: f64, profile: &RegionProfile) -> Result<AnnualEnergy, EnergyError> {
        annualize(
            thermal_kwh,
            self.efficiency(),
            &self.tariff(profile),
            self.emission_factor(profile),
        )
    }
}

/// Time-of-use load shifting: share of consumption billed off-peak.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SmartStrategy {
    pub off_peak_share: f64,
}

impl Default for SmartStrategy {
    fn default() -> Self {
        Self { off_peak_share: 0.9 }
    }
}

/// Proposed heat-pump system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProposedSystem {
    /// Seasonal COP.
    pub cop: f64,
    #[serde(default)]
    pub smart_strategy: Option<SmartStrategy>,
    /// Fraction of consumption covered by on-site solar.
    #[serde(default)]
    pub solar_fraction: f64,
    /// Keep paying the baseline connection's standing charge.
    #[serde(default)]
    pub retain_standing_charge: bool,
    #[serde(default)]
    pub annual_maintenance: Decimal,
}

impl ProposedSystem {
    pub fn new(cop: f64) -> Self {
        Self {
            cop,
            smart_strategy: None,
            solar_fraction: 0.0,
            retain_standing_charge: false,
            annual_maintenance: Decimal::ZERO,
        }
    }

    /// Peak rate, or the weighted off-peak/peak blend under a smart strategy.
    pub fn blended_rate(&self, profile: &RegionProfile) -> Result<Decimal, EnergyError> {
        match &self.smart_strategy {
            None => Ok(profile.grid_tariff_peak),
            Some(s) => {
                let share = to_decimal(check_fraction(s.off_peak_share, "off_peak_share")?)?;
                Ok(profile.grid_tariff_off_peak * share
                    + profile.grid_tariff_peak * (Decimal::ONE - share))
            }
        }
    }

    pub fn annual(
        &self,
        thermal_kwh: f64,
        profile: &RegionProfile,
        baseline: &BaselineSystem,
    ) -> Result<AnnualEnergy, EnergyError> {
        let standing_charge = if self.retain_standing_charge {
            baseline.tariff(profile).standing_charge
        } else {
            Decimal::ZERO
        };
        let tariff = Tariff {
            unit_rate: self.blended_rate(profile)?,
            standing_charge,
        };
        annualize_with_offset(
            thermal_kwh,
            self.cop,
            &tariff,
            profile.co2_factor_grid,
            self.solar_fraction,
        )
    }
}

/// Side-by-side annual running costs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnergyComparison {
    pub baseline: AnnualEnergy,
    pub proposed: AnnualEnergy,
    /// Energy cost plus maintenance.
    pub baseline_opex: Decimal,
    pub proposed_opex: Decimal,
    pub annual_savings: Decimal,
    pub co2_saved_kg: f64,
    /// Savings as a share of baseline opex; `None` when the baseline costs
    /// nothing.
    pub savings_ratio: Option<f64>,
}

/// Run both systems over the same thermal demand.
pub fn compare(
    thermal_kwh: f64,
    baseline: &BaselineSystem,
    proposed: &ProposedSystem,
    profile: &RegionProfile,
) -> Result<EnergyComparison, EnergyError> {
    let b = baseline.annual(thermal_kwh, profile)?;
    let p = proposed.annual(thermal_kwh, profile, baseline)?;
    let baseline_opex = b.cost + baseline.annual_maintenance;
    let proposed_opex = p.cost + proposed.annual_maintenance;
    let annual_savings = baseline_opex - proposed_opex;
    let savings_ratio = if baseline_opex > Decimal::ZERO {
        use rust_decimal::prelude::ToPrimitive;
        (annual_savings / baseline_opex).to_f64()
    } else {
        None
    };
    debug!(
        thermal_kwh,
        baseline_cost = %b.cost,
        proposed_cost = %p.cost,
        savings = %annual_savings,
        "annual energy comparison"
    );
    Ok(EnergyComparison {
        co2_saved_kg: b.co2_kg - p.co2_kg,
        baseline: b,
        proposed: p,
        baseline_opex,
        proposed_opex,
        annual_savings,
        savings_ratio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hp_core::RegionCode;
    use proptest::prelude::*;

    #[test]
    fn baseline_gas_boiler() {
        let uk = RegionCode::Uk.profile();
        let b = BaselineSystem::new(BaselineTechnology::GasBoiler);
        let e = b.annual(9000.0, &uk).unwrap();
        // 10,000 kWh of gas at 0.062 + 110 standing
        assert!((e.consumed_kwh - 10_000.0).abs() < 1e-6);
        assert_eq!(e.cost, Decimal::new(730, 0));
        assert!((e.co2_kg - 1830.0).abs() < 1e-6);
    }

    #[test]
    fn region_defaults_round_trip_to_peak_rate() {
        for code in RegionCode::ALL {
            let p = code.profile();
            let proposed = ProposedSystem::new(1.0);
            let baseline = BaselineSystem::new(BaselineTechnology::ElectricResistance);
            let e = proposed.annual(12_345.0, &p, &baseline).unwrap();
            let grid_only = annualize(
                12_345.0,
                1.0,
                &Tariff {
                    unit_rate: p.grid_tariff_peak,
                    standing_charge: Decimal::ZERO,
                },
                p.co2_factor_grid,
            )
            .unwrap();
            assert_eq!(e, grid_only);
            assert_eq!(e.cost, (Decimal::new(12_345, 0) * p.grid_tariff_peak).round_dp(2));
        }
    }

    #[test]
    fn smart_strategy_blends_rates() {
        let uk = RegionCode::Uk.profile();
        let mut proposed = ProposedSystem::new(3.0);
        proposed.smart_strategy = Some(SmartStrategy::default());
        // 0.9 * 0.085 + 0.1 * 0.245 = 0.101
        assert_eq!(proposed.blended_rate(&uk).unwrap(), Decimal::new(101, 3));
    }

    #[test]
    fn solar_offset_before_rate() {
        let uk = RegionCode::Uk.profile();
        let mut proposed = ProposedSystem::new(2.0);
        proposed.solar_fraction = 0.25;
        let e = proposed
            .annual(8000.0, &uk, &BaselineSystem::new(BaselineTechnology::GasBoiler))
            .unwrap();
        assert_eq!(e.consumed_kwh, 4000.0);
        assert_eq!(e.chargeable_kwh, 3000.0);
        assert_eq!(e.cost, Decimal::new(735, 0));
        assert!((e.co2_kg - 621.0).abs() < 1e-6);
    }

    #[test]
    fn retained_standing_charge_follows_baseline() {
        let uk = RegionCode::Uk.profile();
        let mut proposed = ProposedSystem::new(3.0);
        proposed.retain_standing_charge = true;
        let gas = BaselineSystem::new(BaselineTechnology::GasBoiler);
        let elec = BaselineSystem::new(BaselineTechnology::ElectricResistance);
        let with_gas = proposed.annual(3000.0, &uk, &gas).unwrap();
        let with_elec = proposed.annual(3000.0, &uk, &elec).unwrap();
        assert_eq!(with_gas.cost - with_elec.cost, Decimal::new(110, 0));
    }

    #[test]
    fn invalid_inputs_rejected() {
        let t = Tariff {
            unit_rate: Decimal::ONE,
            standing_charge: Decimal::ZERO,
        };
        assert_eq!(annualize(1.0, 0.0, &t, 0.2), Err(EnergyError::InvalidEfficiency(0.0)));
        assert!(annualize_with_offset(1.0, 1.0, &t, 0.2, 1.5).is_err());
    }

    #[test]
    fn comparison_and_zero_baseline_ratio() {
        let uk = RegionCode::Uk.profile();
        let mut baseline = BaselineSystem::new(BaselineTechnology::OilBoiler);
        baseline.annual_maintenance = Decimal::new(200, 0);
        let proposed = ProposedSystem::new(3.2);
        let c = compare(20_000.0, &baseline, &proposed, &uk).unwrap();
        assert_eq!(c.annual_savings, c.baseline_opex - c.proposed_opex);
        assert!(c.savings_ratio.unwrap() > 0.0);
        assert!(c.co2_saved_kg > 0.0);

        let mut free = uk.clone();
        free.fuel_price = Decimal::ZERO;
        free.fuel_standing_charge = Decimal::ZERO;
        let c = compare(0.0, &BaselineSystem::new(BaselineTechnology::GasBoiler), &proposed, &free).unwrap();
        assert_eq!(c.savings_ratio, None);
        assert_eq!(c.annual_savings, Decimal::ZERO);
    }

    proptest! {
        #[test]
        fn higher_cop_never_costs_more(kwh in 0.0f64..1e6, cop in 1.0f64..6.0) {
            let uk = RegionCode::Uk.profile();
            let b = BaselineSystem::new(BaselineTechnology::GasBoiler);
            let lo = ProposedSystem::new(cop).annual(kwh, &uk, &b).unwrap();
            let hi = ProposedSystem::new(cop + 0.5).annual(kwh, &uk, &b).unwrap();
            prop_assert!(hi.cost <= lo.cost);
            prop_assert!(hi.co2_kg <= lo.co2_kg);
        }
    }
}
