#![deny(warnings)]

//! Steady-state design loads for heating, cooling and hot water.
//!
//! The model is a single-node conduction + ventilation balance per zone:
//! - fabric loss/gain through opaque wall, roof and glazing at design ΔT
//! - ventilation loss/gain from air changes per hour
//! - internal gains added to cooling only
//!
//! A single safety factor is applied to the building totals, never per zone.

use hp_core::{non_negative, units, ClimateCondition, Envelope, Zone};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default oversizing applied to totals.
pub const DEFAULT_SAFETY_FACTOR: f64 = 1.15;
/// Volumetric heat capacity of air in J/(m³·K).
pub const AIR_HEAT_CAPACITY_J_M3K: f64 = 1200.0;
/// Specific heat of water in kJ/(kg·K); one litre is taken as one kilogram.
pub const WATER_HEAT_CAPACITY_KJ_KGK: f64 = 4.186;

/// Ventilation parameters on top of the envelope's infiltration rate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ventilation {
    /// Replaces the envelope's air changes per hour when set.
    pub ach_override: Option<f64>,
    /// Fraction of ventilation load recovered by MVHR, in [0, 1].
    pub heat_recovery: f64,
}

impl Default for Ventilation {
    fn default() -> Self {
        Self {
            ach_override: None,
            heat_recovery: 0.0,
        }
    }
}

/// Season that drives equipment sizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Heating,
    Cooling,
}

/// Derived surfaces of one zone.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoneGeometry {
    pub perimeter_m: f64,
    pub wall_area_m2: f64,
    pub glass_area_m2: f64,
    pub opaque_wall_area_m2: f64,
    pub roof_area_m2: f64,
    pub volume_m3: f64,
}

impl ZoneGeometry {
    /// Geometry with a square-footprint perimeter unless one is given.
    pub fn of(zone: &Zone, glazing_ratio: f64) -> Self {
        let area = non_negative(zone.area_m2);
        let height = non_negative(zone.ceiling_height_m);
        if area == 0.0 {
            return Self {
                perimeter_m: 0.0,
                wall_area_m2: 0.0,
                glass_area_m2: 0.0,
                opaque_wall_area_m2: 0.0,
                roof_area_m2: 0.0,
                volume_m3: 0.0,
            };
        }
        let perimeter = match zone.perimeter_m {
            Some(p) => non_negative(p),
            None => 4.0 * area.sqrt(),
        };
        let wall = perimeter * height;
        let glass = wall * non_negative(glazing_ratio).min(1.0);
        Self {
            perimeter_m: perimeter,
            wall_area_m2: wall,
            glass_area_m2: glass,
            opaque_wall_area_m2: wall - glass,
            roof_area_m2: area,
            volume_m3: area * height,
        }
    }
}

/// Raw (pre safety factor) loads of one zone in watts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneLoad {
    pub id: String,
    pub heat_w: f64,
    pub cool_w: f64,
}

/// Building design loads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoadResult {
    pub per_zone: Vec<ZoneLoad>,
    pub total_heat_kw: f64,
    pub total_cool_kw: f64,
    pub peak_kw: f64,
    /// Larger of the two seasons. Equal loads resolve to cooling; this is an
    /// arbitrary tie-break, not a physical rule.
    pub dominant_season: Season,
    pub safety_factor: f64,
}

impl LoadResult {
    /// Design kW for a season.
    pub fn season_kw(&self, season: Season) -> f64 {
        match season {
            Season::Heating => self.total_heat_kw,
            Season::Cooling => self.total_cool_kw,
        }
    }

    /// Season load without the sizing margin, for annual energy.
    pub fn unfactored_kw(&self, season: Season) -> f64 {
        if self.safety_factor.is_finite() && self.safety_factor > 0.0 {
            self.season_kw(season) / self.safety_factor
        } else {
            self.season_kw(season)
        }
    }
}

/// Load model configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadModel {
    pub safety_factor: f64,
    pub air_heat_capacity_j_m3k: f64,
}

impl Default for LoadModel {
    fn default() -> Self {
        Self {
            safety_factor: DEFAULT_SAFETY_FACTOR,
            air_heat_capacity_j_m3k: AIR_HEAT_CAPACITY_J_M3K,
        }
    }
}

impl LoadModel {
    /// Fabric conduction in W at a given ΔT.
    pub fn conduction_w(&self, geo: &ZoneGeometry, envelope: &Envelope, delta_t: f64) -> f64 {
        let ua = geo.opaque_wall_area_m2 * non_negative(envelope.wall_u)
            + geo.roof_area_m2 * non_negative(envelope.roof_u)
            + geo.glass_area_m2 * non_negative(envelope.glass_u);
        ua * non_negative(delta_t)
    }

    /// Ventilation load in W at a given ΔT.
    pub fn ventilation_w(&self, geo: &ZoneGeometry, ach: f64, recovery: f64, delta_t: f64) -> f64 {
        let flow_m3_s = geo.volume_m3 * non_negative(ach) / 3600.0;
        let retained = 1.0 - non_negative(recovery).min(1.0);
        flow_m3_s * non_negative(self.air_heat_capacity_j_m3k) * non_negative(delta_t) * retained
    }

    /// Heating and cooling loads for every zone and the building.
    pub fn compute(
        &self,
        zones: &[Zone],
        envelope: &Envelope,
        climate: &ClimateCondition,
        ventilation: &Ventilation,
        internal_gain_w_per_m2: f64,
    ) -> LoadResult {
        let dt_heat = climate.heating_delta();
        let dt_cool = climate.cooling_delta();
        let ach = ventilation
            .ach_override
            .unwrap_or(envelope.air_changes_per_hour);
        let gain = non_negative(internal_gain_w_per_m2);

        let per_zone: Vec<ZoneLoad> = zones
            .iter()
            .map(|z| {
                let geo = ZoneGeometry::of(z, envelope.glazing_ratio);
                let heat_w = self.conduction_w(&geo, envelope, dt_heat)
                    + self.ventilation_w(&geo, ach, ventilation.heat_recovery, dt_heat);
                let cool_w = self.conduction_w(&geo, envelope, dt_cool)
                    + self.ventilation_w(&geo, ach, ventilation.heat_recovery, dt_cool)
                    + geo.roof_area_m2 * gain;
                ZoneLoad {
                    id: z.id.clone(),
                    heat_w,
                    cool_w,
                }
            })
            .collect();

        let factor = if self.safety_factor.is_finite() && self.safety_factor > 0.0 {
            self.safety_factor
        } else {
            1.0
        };
        let heat_w: f64 = per_zone.iter().map(|z| z.heat_w).sum();
        let cool_w: f64 = per_zone.iter().map(|z| z.cool_w).sum();
        let total_heat_kw = units::w_to_kw(heat_w) * factor;
        let total_cool_kw = units::w_to_kw(cool_w) * factor;
        let dominant_season = if total_heat_kw > total_cool_kw {
            Season::Heating
        } else {
            Season::Cooling
        };
        debug!(
            zones = zones.len(),
            total_heat_kw, total_cool_kw, "computed design loads"
        );
        LoadResult {
            per_zone,
            total_heat_kw,
            total_cool_kw,
            peak_kw: total_heat_kw.max(total_cool_kw),
            dominant_season,
            safety_factor: factor,
        }
    }
}

/// Design loads with the default model.
pub fn compute_loads(
    zones: &[Zone],
    envelope: &Envelope,
    climate: &ClimateCondition,
    ventilation: &Ventilation,
    internal_gain_w_per_m2: f64,
) -> LoadResult {
    LoadModel::default().compute(zones, envelope, climate, ventilation, internal_gain_w_per_m2)
}

/// Daily hot-water or process-water heating requirement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HotWaterDemand {
    pub litres_per_day: f64,
    /// Mains or groundwater inlet; defaults to the regional ambient.
    #[serde(default)]
    pub inlet_temp_c: Option<f64>,
    pub target_temp_c: f64,
    /// Window over which the daily volume must be reheated.
    pub reheat_hours: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HotWaterLoad {
    pub daily_kwh: f64,
    pub required_kw: f64,
}

impl HotWaterDemand {
    /// Energy and heating rate needed, heating from `ambient_c` unless an
    /// inlet temperature is given. A non-positive reheat window yields
    /// `None` rather than an infinite rate.
    pub fn load(&self, ambient_c: f64) -> Option<HotWaterLoad> {
        if !(self.reheat_hours.is_finite() && self.reheat_hours > 0.0) {
            return None;
        }
        let inlet = self.inlet_temp_c.unwrap_or(ambient_c);
        let dt = non_negative(self.target_temp_c - inlet);
        let daily_kwh =
            non_negative(self.litres_per_day) * WATER_HEAT_CAPACITY_KJ_KGK * dt / 3600.0;
        Some(HotWaterLoad {
            daily_kwh,
            required_kw: daily_kwh / self.reheat_hours,
        })
    }

    /// Daily volume in US gallons, for imperial-market quotes.
    pub fn us_gallons_per_day(&self) -> f64 {
        units::litres_to_us_gallons(non_negative(self.litres_per_day))
    }
}

/// Equivalent full-load operation used to annualize a design load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperatingProfile {
    pub hours_per_day: f64,
    pub days_per_year: f64,
    /// Average fraction of design load over operating hours, in [0, 1].
    pub load_factor: f64,
}

impl OperatingProfile {
    /// Annual thermal kWh delivered at `design_kw`.
    pub fn annual_kwh(&self, design_kw: f64) -> f64 {
        let hours = non_negative(self.hours_per_day).min(24.0);
        let days = non_negative(self.days_per_year).min(366.0);
        let lf = non_negative(self.load_factor).min(1.0);
        non_negative(design_kw) * hours * days * lf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hp_core::InsulationTier;
    use proptest::prelude::*;

    fn flat_envelope(u: f64, ach: f64) -> Envelope {
        Envelope::custom(u, u, u, 0.0, ach).unwrap()
    }

    fn climate(low: f64, high: f64, inside: f64) -> ClimateCondition {
        ClimateCondition {
            design_high_c: high,
            design_low_c: low,
            inside_setpoint_c: inside,
        }
    }

    #[test]
    fn hall_matches_hand_calculation() {
        // 11.5 m x 6 m floor, 6 m ceiling, U 0.40 everywhere, ΔT 27 K, 1 ACH
        let zone = Zone::new("hall", 11.5 * 6.0, 6.0);
        let env = flat_envelope(0.40, 1.0);
        let c = climate(-6.0, 21.0, 21.0);
        let r = compute_loads(&[zone], &env, &c, &Ventilation::default(), 0.0);

        let area: f64 = 69.0;
        let wall = 4.0 * area.sqrt() * 6.0;
        let conduction = (wall + area) * 0.40 * 27.0;
        let vent = area * 6.0 / 3600.0 * 1200.0 * 27.0;
        let expected_kw = (conduction + vent) * 1.15 / 1000.0;

        assert!((r.total_heat_kw - expected_kw).abs() < 0.1);
        assert!((r.total_heat_kw - 7.62).abs() < 0.1);
        assert_eq!(r.total_cool_kw, 0.0);
        assert_eq!(r.peak_kw, r.total_heat_kw);
        assert_eq!(r.dominant_season, Season::Heating);
    }

    #[test]
    fn empty_zones_are_all_zero() {
        let env = Envelope::from_tier(InsulationTier::Average, 0.2).unwrap();
        let r = compute_loads(&[], &env, &climate(-5.0, 32.0, 21.0), &Ventilation::default(), 10.0);
        assert!(r.per_zone.is_empty());
        assert_eq!(r.total_heat_kw, 0.0);
        assert_eq!(r.total_cool_kw, 0.0);
        assert_eq!(r.peak_kw, 0.0);
        // tie-break
        assert_eq!(r.dominant_season, Season::Cooling);
    }

    #[test]
    fn zero_area_with_explicit_perimeter_is_still_zero() {
        let env = Envelope::from_tier(InsulationTier::Poor, 0.4).unwrap();
        let z = Zone::new("void", 0.0, 3.0).with_perimeter(40.0);
        let r = compute_loads(&[z], &env, &climate(-10.0, 35.0, 20.0), &Ventilation::default(), 25.0);
        assert_eq!(r.per_zone[0].heat_w, 0.0);
        assert_eq!(r.per_zone[0].cool_w, 0.0);
    }

    #[test]
    fn internal_gains_only_affect_cooling() {
        let env = flat_envelope(0.3, 0.5);
        let c = climate(21.0, 21.0, 21.0);
        let r = compute_loads(&[Zone::new("office", 100.0, 3.0)], &env, &c, &Ventilation::default(), 20.0);
        assert_eq!(r.per_zone[0].heat_w, 0.0);
        assert_eq!(r.per_zone[0].cool_w, 2000.0);
        assert!((r.total_cool_kw - 2.3).abs() < 1e-9);
    }

    #[test]
    fn heat_recovery_reduces_ventilation_only() {
        let env = flat_envelope(0.3, 1.0);
        let c = climate(0.0, 20.0, 20.0);
        let zones = [Zone::new("z", 50.0, 3.0)];
        let plain = compute_loads(&zones, &env, &c, &Ventilation::default(), 0.0);
        let mvhr = compute_loads(
            &zones,
            &env,
            &c,
            &Ventilation {
                ach_override: None,
                heat_recovery: 1.0,
            },
            0.0,
        );
        let model = LoadModel::default();
        let geo = ZoneGeometry::of(&zones[0], 0.0);
        let conduction_kw = model.conduction_w(&geo, &env, 20.0) / 1000.0 * 1.15;
        assert!((mvhr.total_heat_kw - conduction_kw).abs() < 1e-9);
        assert!(plain.total_heat_kw > mvhr.total_heat_kw);
    }

    #[test]
    fn safety_factor_applied_once() {
        let env = flat_envelope(0.5, 1.0);
        let c = climate(-3.0, 30.0, 20.0);
        let zones = [Zone::new("a", 40.0, 2.5), Zone::new("b", 60.0, 2.5)];
        let r = compute_loads(&zones, &env, &c, &Ventilation::default(), 5.0);
        let raw: f64 = r.per_zone.iter().map(|z| z.heat_w).sum();
        assert!((r.total_heat_kw - raw * 1.15 / 1000.0).abs() < 1e-9);
        assert!((r.unfactored_kw(Season::Heating) - raw / 1000.0).abs() < 1e-9);
    }

    #[test]
    fn hot_water_load() {
        let d = HotWaterDemand {
            litres_per_day: 1000.0,
            inlet_temp_c: Some(10.0),
            target_temp_c: 60.0,
            reheat_hours: 4.0,
        };
        let l = d.load(18.0).unwrap();
        // 1000 * 4.186 * 50 / 3600 = 58.14 kWh
        assert!((l.daily_kwh - 58.139).abs() < 0.01);
        assert!((l.required_kw - 14.535).abs() < 0.01);
        let bad = HotWaterDemand { reheat_hours: 0.0, ..d };
        assert!(bad.load(10.0).is_none());
    }

    #[test]
    fn hot_water_inlet_defaults_to_ambient() {
        let d = HotWaterDemand {
            litres_per_day: 1000.0,
            inlet_temp_c: None,
            target_temp_c: 60.0,
            reheat_hours: 4.0,
        };
        let cold = d.load(10.0).unwrap();
        let warm = d.load(18.0).unwrap();
        assert!((cold.daily_kwh - 58.139).abs() < 0.01);
        assert!((warm.daily_kwh - 1000.0 * 4.186 * 42.0 / 3600.0).abs() < 1e-9);
        assert!(d.load(70.0).unwrap().daily_kwh == 0.0);
    }

    #[test]
    fn annual_kwh_clamps_inputs() {
        let p = OperatingProfile {
            hours_per_day: 30.0,
            days_per_year: 400.0,
            load_factor: 2.0,
        };
        assert_eq!(p.annual_kwh(1.0), 24.0 * 366.0);
        assert_eq!(p.annual_kwh(f64::NAN), 0.0);
    }

    proptest! {
        #[test]
        fn zero_area_contributes_nothing(height in 0.1f64..20.0, low in -40.0f64..10.0, high in 25.0f64..50.0) {
            let env = Envelope::from_tier(InsulationTier::Average, 0.3).unwrap();
            let r = compute_loads(&[Zone::new("z", 0.0, height)], &env, &climate(low, high, 21.0), &Ventilation::default(), 15.0);
            prop_assert_eq!(r.total_heat_kw, 0.0);
            prop_assert_eq!(r.total_cool_kw, 0.0);
        }

        #[test]
        fn wrong_direction_delta_is_zero(area in 1.0f64..2000.0, inside in 15.0f64..25.0, offset in 0.0f64..20.0) {
            let env = Envelope::from_tier(InsulationTier::Good, 0.2).unwrap();
            // ambient above setpoint on the design low side: no heating
            let c = climate(inside + offset, inside + offset, inside);
            let model = LoadModel::default();
            let r = model.compute(&[Zone::new("z", area, 3.0)], &env, &c, &Ventilation::default(), 0.0);
            prop_assert_eq!(r.total_heat_kw, 0.0);
            let geo = ZoneGeometry::of(&Zone::new("z", area, 3.0), 0.2);
            prop_assert_eq!(model.conduction_w(&geo, &env, -offset), 0.0);
            prop_assert_eq!(model.ventilation_w(&geo, 1.0, 0.0, -offset), 0.0);
        }
    }
}
