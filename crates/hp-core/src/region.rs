//! Region and currency defaults.
//!
//! Profiles are a closed table keyed by [`RegionCode`]. User edits live in
//! [`RegionOverrides`] and are merged on read; the table itself is never
//! mutated.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::ValidationError;

/// Supported currencies. Base currency for FX is GBP.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyCode {
    Gbp,
    Eur,
    Usd,
    Aud,
    Nzd,
}

impl CurrencyCode {
    /// Value of one unit of this currency in the base currency.
    pub fn fx_to_base(self) -> Decimal {
        match self {
            CurrencyCode::Gbp => Decimal::ONE,
            CurrencyCode::Eur => Decimal::new(85, 2),
            CurrencyCode::Usd => Decimal::new(79, 2),
            CurrencyCode::Aud => Decimal::new(52, 2),
            CurrencyCode::Nzd => Decimal::new(48, 2),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CurrencyCode::Gbp => "£",
            CurrencyCode::Eur => "€",
            CurrencyCode::Usd => "$",
            CurrencyCode::Aud => "A$",
            CurrencyCode::Nzd => "NZ$",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CurrencyCode::Gbp => "GBP",
            CurrencyCode::Eur => "EUR",
            CurrencyCode::Usd => "USD",
            CurrencyCode::Aud => "AUD",
            CurrencyCode::Nzd => "NZD",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GBP" => Ok(CurrencyCode::Gbp),
            "EUR" => Ok(CurrencyCode::Eur),
            "USD" => Ok(CurrencyCode::Usd),
            "AUD" => Ok(CurrencyCode::Aud),
            "NZD" => Ok(CurrencyCode::Nzd),
            _ => Err(ValidationError::UnknownCode(s.to_string())),
        }
    }
}

/// Sales regions with their own tariff defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RegionCode {
    Uk,
    Ie,
    De,
    Us,
    Au,
    Nz,
}

impl RegionCode {
    pub const ALL: [RegionCode; 6] = [
        RegionCode::Uk,
        RegionCode::Ie,
        RegionCode::De,
        RegionCode::Us,
        RegionCode::Au,
        RegionCode::Nz,
    ];

    /// Default profile for the region.
    pub fn profile(self) -> RegionProfile {
        // (currency, peak, off-peak, fuel, fuel standing/yr, ambient, co2 grid, co2 fuel)
        let (currency, peak, off_peak, fuel, standing, ambient, grid_co2, fuel_co2) = match self {
            RegionCode::Uk => (
                CurrencyCode::Gbp,
                Decimal::new(245, 3),
                Decimal::new(85, 3),
                Decimal::new(62, 3),
                Decimal::new(110, 0),
                10.0,
                0.207,
                0.183,
            ),
            RegionCode::Ie => (
                CurrencyCode::Eur,
                Decimal::new(350, 3),
                Decimal::new(160, 3),
                Decimal::new(110, 3),
                Decimal::new(150, 0),
                10.5,
                0.296,
                0.204,
            ),
            RegionCode::De => (
                CurrencyCode::Eur,
                Decimal::new(400, 3),
                Decimal::new(280, 3),
                Decimal::new(120, 3),
                Decimal::new(180, 0),
                10.0,
                0.380,
                0.201,
            ),
            RegionCode::Us => (
                CurrencyCode::Usd,
                Decimal::new(170, 3),
                Decimal::new(90, 3),
                Decimal::new(45, 3),
                Decimal::new(120, 0),
                13.0,
                0.367,
                0.181,
            ),
            RegionCode::Au => (
                CurrencyCode::Aud,
                Decimal::new(330, 3),
                Decimal::new(170, 3),
                Decimal::new(110, 3),
                Decimal::new(300, 0),
                18.0,
                0.680,
                0.185,
            ),
            RegionCode::Nz => (
                CurrencyCode::Nzd,
                Decimal::new(300, 3),
                Decimal::new(180, 3),
                Decimal::new(140, 3),
                Decimal::new(400, 0),
                12.0,
                0.110,
                0.190,
            ),
        };
        RegionProfile {
            region: self,
            currency,
            currency_symbol: currency.symbol().to_string(),
            fx_rate_to_base: currency.fx_to_base(),
            grid_tariff_peak: peak,
            grid_tariff_off_peak: off_peak,
            fuel_price: fuel,
            fuel_standing_charge: standing,
            ambient_temp_c: ambient,
            co2_factor_grid: grid_co2,
            co2_factor_fuel: fuel_co2,
        }
    }
}

impl FromStr for RegionCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UK" | "GB" => Ok(RegionCode::Uk),
            "IE" => Ok(RegionCode::Ie),
            "DE" => Ok(RegionCode::De),
            "US" => Ok(RegionCode::Us),
            "AU" => Ok(RegionCode::Au),
            "NZ" => Ok(RegionCode::Nz),
            _ => Err(ValidationError::UnknownCode(s.to_string())),
        }
    }
}

/// Tariff, emission and currency defaults for one region.
///
/// Prices are per kWh in the region currency; the standing charge is per
/// year. Emission factors are kg CO₂ per kWh of delivered energy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionProfile {
    pub region: RegionCode,
    pub currency: CurrencyCode,
    pub currency_symbol: String,
    /// Value of one unit of `currency` in the base currency.
    pub fx_rate_to_base: Decimal,
    pub grid_tariff_peak: Decimal,
    pub grid_tariff_off_peak: Decimal,
    pub fuel_price: Decimal,
    pub fuel_standing_charge: Decimal,
    /// Groundwater or mean ambient temperature in °C.
    pub ambient_temp_c: f64,
    pub co2_factor_grid: f64,
    pub co2_factor_fuel: f64,
}

impl RegionProfile {
    /// Convert an amount priced in `from` into this profile's currency.
    ///
    /// The source side uses the table rate; the target side uses this
    /// profile's (possibly overridden) rate.
    pub fn convert_from(&self, amount: Decimal, from: CurrencyCode) -> Decimal {
        if from == self.currency || self.fx_rate_to_base <= Decimal::ZERO {
            return amount;
        }
        amount * from.fx_to_base() / self.fx_rate_to_base
    }
}

/// Per-field user overrides on top of a region profile.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionOverrides {
    pub fx_rate_to_base: Option<Decimal>,
    pub grid_tariff_peak: Option<Decimal>,
    pub grid_tariff_off_peak: Option<Decimal>,
    pub fuel_price: Option<Decimal>,
    pub fuel_standing_charge: Option<Decimal>,
    pub ambient_temp_c: Option<f64>,
    pub co2_factor_grid: Option<f64>,
    pub co2_factor_fuel: Option<f64>,
}

impl RegionOverrides {
    pub fn is_empty(&self) -> bool {
        *self == RegionOverrides::default()
    }
}

/// Selected region plus the user's overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionSettings {
    pub region: RegionCode,
    #[serde(default)]
    pub overrides: RegionOverrides,
}

impl RegionSettings {
    pub fn new(region: RegionCode) -> Self {
        Self {
            region,
            overrides: RegionOverrides::default(),
        }
    }

    /// Switch region. Overrides survive re-selecting the same region and are
    /// cleared on an actual change.
    pub fn select_region(&mut self, region: RegionCode) {
        if region != self.region {
            debug!(from = ?self.region, to = ?region, "region changed, clearing overrides");
            self.region = region;
            self.overrides = RegionOverrides::default();
        }
    }

    /// Table defaults with overrides applied.
    pub fn effective(&self) -> RegionProfile {
        let o = &self.overrides;
        let mut p = self.region.profile();
        if let Some(v) = o.fx_rate_to_base {
            p.fx_rate_to_base = v;
        }
        if let Some(v) = o.grid_tariff_peak {
            p.grid_tariff_peak = v;
        }
        if let Some(v) = o.grid_tariff_off_peak {
            p.grid_tariff_off_peak = v;
        }
        if let Some(v) = o.fuel_price {
            p.fuel_price = v;
        }
        if let Some(v) = o.fuel_standing_charge {
            p.fuel_standing_charge = v;
        }
        if let Some(v) = o.ambient_temp_c {
            p.ambient_temp_c = v;
        }
        if let Some(v) = o.co2_factor_grid {
            p.co2_factor_grid = v;
        }
        if let Some(v) = o.co2_factor_fuel {
            p.co2_factor_fuel = v;
        }
        p
    }
}

/// Validate a (possibly overridden) profile before use.
pub fn validate_profile(p: &RegionProfile) -> Result<(), ValidationError> {
    if p.fx_rate_to_base <= Decimal::ZERO {
        return Err(ValidationError::NonPositive("fx_rate_to_base"));
    }
    if p.grid_tariff_peak < Decimal::ZERO
        || p.grid_tariff_off_peak < Decimal::ZERO
        || p.fuel_price < Decimal::ZERO
        || p.fuel_standing_charge < Decimal::ZERO
    {
        return Err(ValidationError::NegativeMoney);
    }
    if !(p.ambient_temp_c.is_finite() && p.co2_factor_grid.is_finite() && p.co2_factor_fuel.is_finite()) {
        return Err(ValidationError::NonFinite);
    }
    if p.co2_factor_grid < 0.0 || p.co2_factor_fuel < 0.0 {
        return Err(ValidationError::NonPositive("co2 factor"));
    }
    Ok(())
}
