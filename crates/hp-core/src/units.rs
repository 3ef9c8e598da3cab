//! Unit conversions used across the engine.
//!
//! All helpers are pure `f64 -> f64` functions. Non-finite inputs pass
//! through unchanged; callers validate before converting.

/// Square feet in one square metre.
pub const FT2_PER_M2: f64 = 10.763_910_416_709_722;
/// Litres in one US gallon.
pub const LITRES_PER_US_GALLON: f64 = 3.785_411_784;
/// BTU/h in one kW.
pub const BTU_H_PER_KW: f64 = 3_412.141_633;
/// Nominal HVAC trade rating: one "HP" of refrigeration plant is sold as
/// 9,000 BTU/h of thermal output (not mechanical horsepower).
pub const BTU_H_PER_NOMINAL_HP: f64 = 9_000.0;

/// Degrees Celsius to degrees Fahrenheit.
pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

/// Degrees Fahrenheit to degrees Celsius.
pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

/// A temperature difference in K (°C) expressed in °F. No offset applies.
pub fn delta_c_to_delta_f(dt: f64) -> f64 {
    dt * 9.0 / 5.0
}

pub fn m2_to_ft2(m2: f64) -> f64 {
    m2 * FT2_PER_M2
}

pub fn ft2_to_m2(ft2: f64) -> f64 {
    ft2 / FT2_PER_M2
}

pub fn litres_to_us_gallons(l: f64) -> f64 {
    l / LITRES_PER_US_GALLON
}

pub fn us_gallons_to_litres(gal: f64) -> f64 {
    gal * LITRES_PER_US_GALLON
}

pub fn kw_to_btu_per_hour(kw: f64) -> f64 {
    kw * BTU_H_PER_KW
}

pub fn btu_per_hour_to_kw(btu_h: f64) -> f64 {
    btu_h / BTU_H_PER_KW
}

pub fn w_to_kw(w: f64) -> f64 {
    w / 1000.0
}

pub fn kw_to_w(kw: f64) -> f64 {
    kw * 1000.0
}

/// Thermal kW represented by a nominal trade "HP" rating.
pub fn nominal_hp_to_kw(hp: f64) -> f64 {
    btu_per_hour_to_kw(hp * BTU_H_PER_NOMINAL_HP)
}
