//! Evaluation output.

use std::fmt;

use hp_catalog::{CapacitySource, SelectionOutcome, SelectionResult};
use hp_core::{Duty, RegionProfile};
use hp_econ::{CapexItem, FinancialResult, IrrStatus, Payback};
use hp_energy::EnergyComparison;
use hp_strategy::StrategicAssessment;
use hp_thermal::{HotWaterLoad, LoadResult};
use serde::{Deserialize, Serialize};

/// A degraded path taken during evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    FallbackEquipment { item_id: String, shortfall_kw: f64 },
    NoEquipment { rejected: usize },
    ParsedCapacity { item_id: String },
    DefaultedPrice { item_id: String },
    PaybackNever,
    IrrNotConverged { iterations: u32 },
    IrrUndefined,
    SavingsRatioUnavailable,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::FallbackEquipment {
                item_id,
                shortfall_kw,
            } => write!(
                f,
                "no adequate equipment; fell back to largest unit {item_id} ({shortfall_kw:.2} kW short)"
            ),
            Warning::NoEquipment { rejected } => {
                write!(f, "no equipment selected ({rejected} items rejected)")
            }
            Warning::ParsedCapacity { item_id } => {
                write!(f, "capacity of {item_id} was parsed from its name")
            }
            Warning::DefaultedPrice { item_id } => {
                write!(f, "trade price of {item_id} missing; list price used")
            }
            Warning::PaybackNever => write!(f, "no positive savings; payback never reached"),
            Warning::IrrNotConverged { iterations } => {
                write!(f, "IRR did not converge after {iterations} iterations")
            }
            Warning::IrrUndefined => write!(f, "IRR undefined for this cash flow"),
            Warning::SavingsRatioUnavailable => write!(f, "baseline costs nothing; savings ratio N/A"),
        }
    }
}

/// Warnings implied by a selection.
pub fn selection_warnings(selection: &SelectionResult) -> Vec<Warning> {
    let mut out = Vec::new();
    match (&selection.outcome, &selection.selected) {
        (SelectionOutcome::NoMatch, _) | (_, None) => out.push(Warning::NoEquipment {
            rejected: selection.rejected.len(),
        }),
        (outcome, Some(c)) => {
            if *outcome == SelectionOutcome::FallbackLargest {
                out.push(Warning::FallbackEquipment {
                    item_id: c.item_id.clone(),
                    shortfall_kw: selection.shortfall_kw,
                });
            }
            if c.capacity_source == CapacitySource::ParsedFromName {
                out.push(Warning::ParsedCapacity {
                    item_id: c.item_id.clone(),
                });
            }
            if c.price_defaulted {
                out.push(Warning::DefaultedPrice {
                    item_id: c.item_id.clone(),
                });
            }
        }
    }
    out
}

/// Warnings implied by the financial result.
pub fn financial_warnings(financial: &FinancialResult) -> Vec<Warning> {
    let mut out = Vec::new();
    if financial.payback == Payback::Never {
        out.push(Warning::PaybackNever);
    }
    match financial.irr.status {
        IrrStatus::Converged => {}
        IrrStatus::NotConverged => out.push(Warning::IrrNotConverged {
            iterations: financial.irr.iterations,
        }),
        IrrStatus::Undefined => out.push(Warning::IrrUndefined),
    }
    out
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub scenario: String,
    pub region: RegionProfile,
    pub loads: LoadResult,
    pub hot_water: Option<HotWaterLoad>,
    pub duty: Duty,
    pub required_kw: f64,
    pub annual_thermal_kwh: f64,
    pub selection: SelectionResult,
    /// In the region currency.
    pub capex: Vec<CapexItem>,
    pub energy: EnergyComparison,
    pub financial: FinancialResult,
    pub strategic: Option<StrategicAssessment>,
    pub warnings: Vec<Warning>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cur = &self.region.currency_symbol;
        writeln!(f, "Scenario: {} ({:?})", self.scenario, self.region.region)?;
        writeln!(
            f,
            "Loads: heat {:.2} kW, cool {:.2} kW, peak {:.2} kW ({:?})",
            self.loads.total_heat_kw,
            self.loads.total_cool_kw,
            self.loads.peak_kw,
            self.loads.dominant_season
        )?;
        if let Some(hw) = &self.hot_water {
            writeln!(
                f,
                "Hot water: {:.2} kWh/day, {:.2} kW",
                hw.daily_kwh, hw.required_kw
            )?;
        }
        writeln!(f, "Sizing: {:?} {:.2} kW", self.duty, self.required_kw)?;
        match &self.selection.selected {
            Some(c) => writeln!(
                f,
                "Equipment: {} x {} ({:.2} kW total)",
                self.selection.units_required, c.name, self.selection.total_capacity_kw
            )?,
            None => writeln!(f, "Equipment: none")?,
        }
        for line in &self.capex {
            writeln!(f, "  {:<24} {}{}", line.label, cur, line.amount)?;
        }
        writeln!(f, "Capex total: {}{}", cur, self.financial.total_capex)?;
        writeln!(
            f,
            "Opex: baseline {}{} -> proposed {}{} (saving {}{}/yr)",
            cur,
            self.energy.baseline_opex,
            cur,
            self.energy.proposed_opex,
            cur,
            self.energy.annual_savings
        )?;
        writeln!(f, "CO2 saved: {:.0} kg/yr", self.energy.co2_saved_kg)?;
        let payback = match self.financial.payback {
            Payback::Immediate => "immediate".to_string(),
            Payback::Years(y) => format!("{y:.1} years"),
            Payback::Never => "never".to_string(),
        };
        writeln!(f, "Payback: {payback}")?;
        writeln!(f, "NPV: {}{}", cur, self.financial.npv)?;
        match self.financial.irr.status {
            IrrStatus::Undefined => writeln!(f, "IRR: n/a")?,
            _ => writeln!(f, "IRR: {:.2}%", self.financial.irr.rate_pct)?,
        }
        if let Some(s) = &self.strategic {
            writeln!(
                f,
                "Strategic ROI: {:.2}% (composite {:.1}, x{:.2}) -> {:?}",
                s.strategic_roi_pct, s.composite, s.multiplier, s.recommendation
            )?;
        }
        for w in &self.warnings {
            writeln!(f, "warning: {w}")?;
        }
        Ok(())
    }
}
