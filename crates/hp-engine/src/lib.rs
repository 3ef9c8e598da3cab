#![deny(warnings)]

//! End-to-end evaluation: loads, equipment selection, running costs,
//! financials and the optional strategic assessment for one scenario.
//!
//! [`evaluate`] is a pure function of the scenario and a catalog snapshot.
//! Degraded paths (fallback equipment, sentinel paybacks, unsolved IRR) never
//! fail the evaluation; they are collected as [`Warning`]s on the report.

mod config;
mod report;
mod scenario;

pub use config::EngineConfig;
pub use report::{financial_warnings, selection_warnings, Report, Warning};
pub use scenario::{
    CapexInput, EnvelopeInput, FinanceInput, ImportCosts, Installation, Scenario, SizingInput,
    UpgradeInput,
};

use hp_catalog::{select_equipment, CatalogItem, MatchRequest, SelectionResult};
use hp_core::region::validate_profile;
use hp_core::{
    non_negative, validate_climate, validate_fraction, validate_zones, Duty, RegionProfile,
    ValidationError,
};
use hp_econ::{CapexItem, CapexKind, EconError};
use hp_energy::{compare, EnergyError};
use hp_thermal::Season;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that stop an evaluation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("energy model: {0}")]
    Energy(#[from] EnergyError),
    #[error("financial model: {0}")]
    Econ(#[from] EconError),
    #[error("hot-water duty requested without a usable hot-water demand")]
    MissingHotWater,
    #[error("percentage must be finite and >= 0, got {0}")]
    InvalidPercentage(f64),
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),
}

fn percent_of(amount: Decimal, pct: f64) -> Result<Decimal, EngineError> {
    if !(pct.is_finite() && pct >= 0.0) {
        return Err(EngineError::InvalidPercentage(pct));
    }
    let p = Decimal::from_f64(pct).ok_or(EngineError::InvalidPercentage(pct))?;
    Ok((amount * p / Decimal::ONE_HUNDRED).round_dp(2))
}

fn non_negative_money(amount: Decimal) -> Result<Decimal, ValidationError> {
    if amount < Decimal::ZERO {
        Err(ValidationError::NegativeMoney)
    } else {
        Ok(amount)
    }
}

/// Capex lines in the region currency.
///
/// Catalog prices are converted from `catalog_currency`; duty is charged on
/// the converted equipment cost. Zero-valued adders are omitted apart from
/// the equipment line.
pub fn assemble_capex(
    selection: &SelectionResult,
    input: &CapexInput,
    profile: &RegionProfile,
) -> Result<Vec<CapexItem>, EngineError> {
    let equipment = profile
        .convert_from(selection.total_cost, input.catalog_currency)
        .round_dp(2);
    let label = match &selection.selected {
        Some(c) => format!("{} x{}", c.name, selection.units_required),
        None => "no equipment selected".to_string(),
    };
    let mut lines = vec![CapexItem::new(CapexKind::Equipment, label, equipment)];

    let installation = match &input.installation {
        Installation::Fixed(amount) => non_negative_money(*amount)?,
        Installation::PercentOfEquipment(pct) => percent_of(equipment, *pct)?,
    };
    let mut push = |kind, label: &str, amount: Decimal| -> Result<(), EngineError> {
        let amount = non_negative_money(amount)?;
        if amount > Decimal::ZERO {
            lines.push(CapexItem::new(kind, label, amount));
        }
        Ok(())
    };
    push(CapexKind::Installation, "installation", installation)?;
    if let Some(import) = &input.import {
        push(
            CapexKind::ImportDuty,
            "import duty",
            percent_of(equipment, import.duty_pct)?,
        )?;
        push(CapexKind::Freight, "freight", import.freight)?;
        push(CapexKind::Clearance, "customs clearance", import.clearance)?;
    }
    push(CapexKind::Storage, "storage", input.storage)?;
    for u in &input.upgrades {
        push(CapexKind::Upgrade, &u.label, u.amount)?;
    }
    Ok(lines)
}

fn sizing_duty(scenario: &Scenario, dominant: Season) -> Duty {
    scenario.sizing.duty.unwrap_or(match dominant {
        Season::Heating => Duty::Heating,
        Season::Cooling => Duty::Cooling,
    })
}

/// Run the whole pipeline for one scenario against a catalog snapshot.
pub fn evaluate(scenario: &Scenario, catalog: &[CatalogItem]) -> Result<Report, EngineError> {
    let config = &scenario.config;
    let profile = scenario.region.effective();
    validate_profile(&profile)?;
    validate_zones(&scenario.zones)?;
    let envelope = scenario.envelope.build()?;
    validate_climate(&scenario.climate)?;
    validate_fraction(scenario.ventilation.heat_recovery, "heat_recovery")?;

    let loads = config.load_model().compute(
        &scenario.zones,
        &envelope,
        &scenario.climate,
        &scenario.ventilation,
        scenario.internal_gain_w_per_m2,
    );
    let hot_water = scenario
        .hot_water
        .as_ref()
        .and_then(|hw| hw.load(profile.ambient_temp_c));

    let duty = sizing_duty(scenario, loads.dominant_season);
    // equipment is sized with the margin; energy is billed on the load itself
    let season_demand = |season: Season| {
        (
            loads.season_kw(season),
            scenario.operating.annual_kwh(loads.unfactored_kw(season)),
        )
    };
    let (required_kw, modeled_kwh) = match duty {
        Duty::Heating => season_demand(Season::Heating),
        Duty::Cooling => season_demand(Season::Cooling),
        Duty::HotWater => {
            let hw = hot_water.as_ref().ok_or(EngineError::MissingHotWater)?;
            let days = non_negative(scenario.operating.days_per_year).min(366.0);
            (hw.required_kw, hw.daily_kwh * days)
        }
    };
    let annual_thermal_kwh = scenario
        .annual_thermal_kwh
        .map(non_negative)
        .unwrap_or(modeled_kwh);
    debug!(?duty, required_kw, annual_thermal_kwh, "sizing requirement");

    let request = MatchRequest {
        required_kw,
        duty,
        class: scenario.sizing.class,
        refrigerant: scenario.sizing.refrigerant_filter(),
        price_field: scenario.sizing.price_field,
        mode: scenario.sizing.mode,
        max_units: config.max_units,
    };
    let selection = select_equipment(catalog, &request);
    let mut warnings = selection_warnings(&selection);

    let capex = assemble_capex(&selection, &scenario.capex, &profile)?;
    let energy = compare(
        annual_thermal_kwh,
        &scenario.baseline,
        &scenario.proposed,
        &profile,
    )?;
    if energy.savings_ratio.is_none() {
        warnings.push(Warning::SavingsRatioUnavailable);
    }

    let finance = &scenario.finance;
    let financial = hp_econ::evaluate(
        &capex,
        energy.annual_savings,
        finance.discount_rate_pct,
        finance.lifespan_years,
        finance.delay_months,
    )?;
    warnings.extend(financial_warnings(&financial));

    let strategy = config.strategy();
    let strategic = scenario.qualitative.as_ref().map(|q| {
        hp_strategy::score(
            &financial,
            energy.co2_saved_kg,
            energy.savings_ratio,
            q,
            &strategy,
        )
    });

    for w in &warnings {
        warn!(scenario = %scenario.name, warning = %w, "degraded evaluation path");
    }
    info!(
        scenario = %scenario.name,
        required_kw,
        total_capex = %financial.total_capex,
        npv = %financial.npv,
        irr_pct = financial.irr.rate_pct,
        "evaluation complete"
    );

    Ok(Report {
        scenario: scenario.name.clone(),
        region: profile,
        loads,
        hot_water,
        duty,
        required_kw,
        annual_thermal_kwh,
        selection,
        capex,
        energy,
        financial,
        strategic,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hp_catalog::{PriceField, SelectionOutcome};
    use hp_core::{CurrencyCode, RegionCode};
    use hp_econ::IrrStatus;
    use hp_strategy::QualitativeScores;
    use hp_thermal::HotWaterDemand;
    use proptest::prelude::*;

    const SCENARIO: &str = r#"
name: depot
region:
  region: UK
zones:
  - id: hall
    area_m2: 69
    ceiling_height_m: 6
    perimeter_m: 35
envelope:
  tier: custom
  glazing_ratio: 0.0
  wall_u: 0.4
  roof_u: 0.4
  glass_u: 0.4
  air_changes_per_hour: 1.0
climate:
  design_high_c: 25
  design_low_c: -7
  inside_setpoint_c: 20
sizing:
  duty: heating
operating:
  hours_per_day: 12
  days_per_year: 220
  load_factor: 0.5
baseline:
  technology: gas_boiler
proposed:
  cop: 3.0
  smart_strategy:
    off_peak_share: 0.9
capex:
  catalog_currency: GBP
  installation:
    kind: fixed
    value: 2000
finance:
  discount_rate_pct: 8
  lifespan_years: 15
"#;

    fn item(id: &str, kw: f64, price: i64) -> CatalogItem {
        CatalogItem {
            id: id.into(),
            name: format!("Air source heat pump {kw}kW"),
            category: "Heat Pump".into(),
            tags: Vec::new(),
            refrigerant: Some("R290".into()),
            capacity_heating_kw: Some(kw),
            capacity_cooling_kw: None,
            capacity_hot_water_kw: None,
            list_price: Some(Decimal::new(price, 0)),
            trade_price: None,
        }
    }

    fn scenario() -> Scenario {
        Scenario::from_yaml_str(SCENARIO).unwrap()
    }

    #[test]
    fn hall_scenario_end_to_end() {
        let catalog = vec![item("a", 5.0, 3000), item("b", 9.0, 4500), item("c", 12.0, 6000)];
        let r = evaluate(&scenario(), &catalog).unwrap();
        assert!((r.required_kw - r.loads.total_heat_kw).abs() < 1e-12);
        assert_eq!(r.duty, Duty::Heating);
        assert_eq!(r.selection.outcome, SelectionOutcome::Matched);
        let picked = r.selection.selected.as_ref().unwrap();
        assert!(r.selection.total_capacity_kw >= r.required_kw);
        assert_eq!(r.capex[0].kind, CapexKind::Equipment);
        assert_eq!(r.capex[0].amount, r.selection.total_cost);
        assert_eq!(
            r.financial.total_capex,
            r.selection.total_cost + Decimal::new(2000, 0)
        );
        assert!(picked.unit_price > Decimal::ZERO);
        assert!(r.energy.annual_savings > Decimal::ZERO);
        assert!(r.strategic.is_none());
    }

    #[test]
    fn empty_catalog_still_reports() {
        let r = evaluate(&scenario(), &[]).unwrap();
        assert!(r.selection.selected.is_none());
        assert_eq!(r.capex[0].amount, Decimal::ZERO);
        assert!(r
            .warnings
            .contains(&Warning::NoEquipment { rejected: 1 }));
    }

    #[test]
    fn undersized_catalog_falls_back_with_warning() {
        let mut s = scenario();
        s.config.max_units = 1;
        let r = evaluate(&s, &[item("tiny", 1.0, 800)]).unwrap();
        assert!(r.selection.is_fallback());
        assert!(r.warnings.iter().any(|w| matches!(
            w,
            Warning::FallbackEquipment { item_id, .. } if item_id == "tiny"
        )));
    }

    #[test]
    fn trade_price_default_is_flagged() {
        let mut s = scenario();
        s.sizing.price_field = PriceField::Trade;
        let r = evaluate(&s, &[item("a", 20.0, 5000)]).unwrap();
        assert!(r.warnings.contains(&Warning::DefaultedPrice { item_id: "a".into() }));
    }

    #[test]
    fn foreign_catalog_prices_are_converted() {
        let mut s = scenario();
        s.capex.catalog_currency = CurrencyCode::Eur;
        let r = evaluate(&s, &[item("a", 20.0, 1000)]).unwrap();
        let expected = s
            .region
            .effective()
            .convert_from(Decimal::new(1000, 0), CurrencyCode::Eur)
            .round_dp(2);
        assert_eq!(r.capex[0].amount, expected);
        assert!(r.capex[0].amount < Decimal::new(1000, 0));
    }

    #[test]
    fn capex_adders_are_itemized() {
        let mut s = scenario();
        s.capex.installation = Installation::PercentOfEquipment(25.0);
        s.capex.import = Some(ImportCosts {
            duty_pct: 10.0,
            freight: Decimal::new(300, 0),
            clearance: Decimal::ZERO,
        });
        s.capex.storage = Decimal::new(150, 0);
        s.capex.upgrades = vec![UpgradeInput {
            label: "radiators".into(),
            amount: Decimal::new(1200, 0),
        }];
        let r = evaluate(&s, &[item("a", 20.0, 4000)]).unwrap();
        let kinds: Vec<CapexKind> = r.capex.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CapexKind::Equipment,
                CapexKind::Installation,
                CapexKind::ImportDuty,
                CapexKind::Freight,
                CapexKind::Storage,
                CapexKind::Upgrade,
            ]
        );
        assert_eq!(r.capex[1].amount, Decimal::new(1000, 0));
        assert_eq!(r.capex[2].amount, Decimal::new(400, 0));
        assert_eq!(r.financial.total_capex, Decimal::new(7050, 0));
    }

    #[test]
    fn negative_adder_is_rejected() {
        let mut s = scenario();
        s.capex.storage = Decimal::new(-1, 0);
        let err = evaluate(&s, &[item("a", 20.0, 4000)]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::NegativeMoney)
        ));
    }

    #[test]
    fn hot_water_duty_requires_demand() {
        let mut s = scenario();
        s.sizing.duty = Some(Duty::HotWater);
        assert!(matches!(
            evaluate(&s, &[]),
            Err(EngineError::MissingHotWater)
        ));
        s.hot_water = Some(HotWaterDemand {
            litres_per_day: 2000.0,
            inlet_temp_c: Some(10.0),
            target_temp_c: 60.0,
            reheat_hours: 4.0,
        });
        let r = evaluate(&s, &[]).unwrap();
        let hw = r.hot_water.unwrap();
        assert!((r.required_kw - hw.required_kw).abs() < 1e-12);
        assert!((r.annual_thermal_kwh - hw.daily_kwh * 220.0).abs() < 1e-9);
    }

    #[test]
    fn hot_water_inlet_follows_region_ambient() {
        let mut s = scenario();
        s.hot_water = Some(HotWaterDemand {
            litres_per_day: 500.0,
            inlet_temp_c: None,
            target_temp_c: 60.0,
            reheat_hours: 5.0,
        });
        let uk = evaluate(&s, &[]).unwrap().hot_water.unwrap();
        s.region.select_region(RegionCode::Au);
        let au = evaluate(&s, &[]).unwrap().hot_water.unwrap();
        let uk_ambient = RegionCode::Uk.profile().ambient_temp_c;
        let au_ambient = RegionCode::Au.profile().ambient_temp_c;
        assert!((uk.daily_kwh - 500.0 * 4.186 * (60.0 - uk_ambient) / 3600.0).abs() < 1e-9);
        assert!((au.daily_kwh - 500.0 * 4.186 * (60.0 - au_ambient) / 3600.0).abs() < 1e-9);
        assert!(au.daily_kwh < uk.daily_kwh);
    }

    #[test]
    fn annual_energy_excludes_sizing_margin() {
        let r = evaluate(&scenario(), &[]).unwrap();
        let raw_kw = r.loads.total_heat_kw / r.loads.safety_factor;
        // 12 h x 220 d x 0.5
        assert!((r.annual_thermal_kwh - raw_kw * 1320.0).abs() < 1e-6);
        assert!((r.required_kw - r.loads.total_heat_kw).abs() < 1e-12);
    }

    #[test]
    fn zone_ids_are_validated() {
        let mut s = scenario();
        s.zones.push(s.zones[0].clone());
        assert!(matches!(
            evaluate(&s, &[]),
            Err(EngineError::Validation(ValidationError::DuplicateId(id))) if id == "hall"
        ));
        s.zones.truncate(1);
        s.zones[0].id = "  ".into();
        assert!(matches!(
            evaluate(&s, &[]),
            Err(EngineError::Validation(ValidationError::EmptyId))
        ));
    }

    #[test]
    fn runaway_negative_rate_is_invalid_input() {
        let mut s = scenario();
        s.finance.discount_rate_pct = -50.0;
        s.finance.lifespan_years = 100;
        assert!(matches!(
            evaluate(&s, &[item("a", 20.0, 4000)]),
            Err(EngineError::Econ(EconError::InvalidRate(r))) if r == -50.0
        ));
    }

    #[test]
    fn metered_demand_overrides_model() {
        let mut s = scenario();
        s.annual_thermal_kwh = Some(40_000.0);
        let r = evaluate(&s, &[]).unwrap();
        assert_eq!(r.annual_thermal_kwh, 40_000.0);
        assert_eq!(r.energy.baseline.thermal_kwh, 40_000.0);
    }

    #[test]
    fn zero_demand_yields_sentinels_not_nan() {
        let mut s = scenario();
        s.annual_thermal_kwh = Some(0.0);
        s.proposed.retain_standing_charge = true;
        let r = evaluate(&s, &[item("a", 20.0, 4000)]).unwrap();
        assert_eq!(r.financial.irr.status, IrrStatus::Undefined);
        assert!(r.warnings.contains(&Warning::IrrUndefined));
        assert!(r.warnings.contains(&Warning::PaybackNever));
        assert!(r.financial.irr.rate_pct.is_finite());
    }

    #[test]
    fn qualitative_scores_enable_strategy() {
        let mut s = scenario();
        s.qualitative = Some(QualitativeScores {
            water: 5.0,
            reliability: 7.0,
            innovation: 6.0,
        });
        let r = evaluate(&s, &[item("a", 20.0, 4000)]).unwrap();
        let a = r.strategic.unwrap();
        assert!((1.0..=1.5).contains(&a.multiplier));
    }

    #[test]
    fn region_overrides_flow_into_costs() {
        let mut s = scenario();
        let base = evaluate(&s, &[]).unwrap();
        s.region.overrides.fuel_price = Some(Decimal::new(12, 2));
        let pricier = evaluate(&s, &[]).unwrap();
        assert!(pricier.energy.baseline.cost > base.energy.baseline.cost);
        s.region.select_region(RegionCode::De);
        assert!(s.region.overrides.is_empty());
        let de = evaluate(&s, &[]).unwrap();
        assert_eq!(de.region.currency, CurrencyCode::Eur);
    }

    #[test]
    fn report_renders_text() {
        let r = evaluate(&scenario(), &[item("a", 20.0, 4000)]).unwrap();
        let text = r.to_string();
        assert!(text.contains("Scenario: depot"));
        assert!(text.contains("Payback:"));
    }

    proptest! {
        #[test]
        fn evaluation_never_produces_nan(area in 0.0f64..2000.0, cop in 1.0f64..6.0, price in 100i64..50_000) {
            let mut s = scenario();
            s.zones[0].area_m2 = area;
            s.zones[0].perimeter_m = None;
            s.proposed.cop = cop;
            let r = evaluate(&s, &[item("a", 15.0, price)]).unwrap();
            prop_assert!(r.loads.total_heat_kw.is_finite());
            prop_assert!(r.financial.irr.rate_pct.is_finite());
            prop_assert!(r.energy.co2_saved_kg.is_finite());
            if !r.selection.is_fallback() && r.selection.selected.is_some() {
                prop_assert!(r.selection.total_capacity_kw >= r.required_kw);
            }
        }
    }
}
