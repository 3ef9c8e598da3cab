#![deny(warnings)]

//! Core domain models and invariants for the heat-pump sizing engine.
//!
//! This crate defines serializable building, climate and region types shared
//! by the load, catalog, energy and finance crates, with validation helpers
//! that guard their basic invariants.

pub mod region;
pub mod units;

pub use region::{CurrencyCode, RegionCode, RegionOverrides, RegionProfile, RegionSettings};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Numeric field must be finite.
    #[error("non-finite numeric value encountered")]
    NonFinite,
    /// Field must be strictly positive.
    #[error("{0} must be > 0")]
    NonPositive(&'static str),
    /// Fraction outside [0, 1].
    #[error("{0} must be within [0,1]")]
    FractionOutOfRange(&'static str),
    /// Price or cost must be non-negative.
    #[error("negative monetary value is invalid")]
    NegativeMoney,
    /// Custom tier built through the preset path.
    #[error("custom insulation tier requires explicit U-values")]
    CustomTierWithoutValues,
    /// Climate design temperatures are inverted.
    #[error("design low {low} is above design high {high}")]
    InvertedClimate { low: f64, high: f64 },
    /// Unrecognized region or currency code.
    #[error("unknown code: {0}")]
    UnknownCode(String),
    /// Empty identifier.
    #[error("identifier must not be empty")]
    EmptyId,
    /// Identifier used twice.
    #[error("duplicate identifier: {0}")]
    DuplicateId(String),
}

/// Envelope quality presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsulationTier {
    Poor,
    Average,
    Good,
    HighPerformance,
    Custom,
}

impl InsulationTier {
    /// Preset `(wall U, roof U, glass U, air changes per hour)`.
    /// `None` for [`InsulationTier::Custom`].
    pub fn preset(self) -> Option<(f64, f64, f64, f64)> {
        match self {
            InsulationTier::Poor => Some((1.60, 1.50, 5.00, 1.5)),
            InsulationTier::Average => Some((0.60, 0.40, 2.80, 1.0)),
            InsulationTier::Good => Some((0.30, 0.20, 1.60, 0.6)),
            InsulationTier::HighPerformance => Some((0.15, 0.12, 0.80, 0.3)),
            InsulationTier::Custom => None,
        }
    }
}

/// Building envelope: U-values in W/(m²·K), glazing as a fraction of wall.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub tier: InsulationTier,
    pub wall_u: f64,
    pub roof_u: f64,
    pub glass_u: f64,
    pub glazing_ratio: f64,
    pub air_changes_per_hour: f64,
}

impl Envelope {
    /// Envelope from a preset tier.
    pub fn from_tier(tier: InsulationTier, glazing_ratio: f64) -> Result<Self, ValidationError> {
        let (wall_u, roof_u, glass_u, ach) =
            tier.preset().ok_or(ValidationError::CustomTierWithoutValues)?;
        let env = Envelope {
            tier,
            wall_u,
            roof_u,
            glass_u,
            glazing_ratio,
            air_changes_per_hour: ach,
        };
        validate_envelope(&env)?;
        Ok(env)
    }

    /// Envelope with explicit values.
    pub fn custom(
        wall_u: f64,
        roof_u: f64,
        glass_u: f64,
        glazing_ratio: f64,
        air_changes_per_hour: f64,
    ) -> Result<Self, ValidationError> {
        let env = Envelope {
            tier: InsulationTier::Custom,
            wall_u,
            roof_u,
            glass_u,
            glazing_ratio,
            air_changes_per_hour,
        };
        validate_envelope(&env)?;
        Ok(env)
    }
}

/// Design-day climate in °C.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClimateCondition {
    pub design_high_c: f64,
    pub design_low_c: f64,
    pub inside_setpoint_c: f64,
}

impl ClimateCondition {
    /// Heating ΔT, never negative.
    pub fn heating_delta(&self) -> f64 {
        non_negative(self.inside_setpoint_c - self.design_low_c)
    }

    /// Cooling ΔT, never negative.
    pub fn cooling_delta(&self) -> f64 {
        non_negative(self.design_high_c - self.inside_setpoint_c)
    }
}

/// A conditioned zone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub area_m2: f64,
    pub ceiling_height_m: f64,
    /// Measured perimeter; when absent a square footprint is assumed.
    #[serde(default)]
    pub perimeter_m: Option<f64>,
}

impl Zone {
    pub fn new(id: impl Into<String>, area_m2: f64, ceiling_height_m: f64) -> Self {
        Self {
            id: id.into(),
            area_m2,
            ceiling_height_m,
            perimeter_m: None,
        }
    }

    pub fn with_perimeter(mut self, perimeter_m: f64) -> Self {
        self.perimeter_m = Some(perimeter_m);
        self
    }
}

/// Thermal duty an equipment item is sized against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Duty {
    Heating,
    Cooling,
    HotWater,
}

/// Coerce NaN, infinities and negatives to zero.
///
/// The load model applies this to geometry and ΔT so that a bad field
/// contributes nothing instead of poisoning totals.
pub fn non_negative(x: f64) -> f64 {
    if x.is_finite() && x > 0.0 {
        x
    } else {
        0.0
    }
}

fn check_fraction(x: f64, name: &'static str) -> Result<(), ValidationError> {
    if !x.is_finite() {
        return Err(ValidationError::NonFinite);
    }
    if !(0.0..=1.0).contains(&x) {
        return Err(ValidationError::FractionOutOfRange(name));
    }
    Ok(())
}

/// Validate an envelope.
pub fn validate_envelope(e: &Envelope) -> Result<(), ValidationError> {
    for (v, name) in [
        (e.wall_u, "wall_u"),
        (e.roof_u, "roof_u"),
        (e.glass_u, "glass_u"),
    ] {
        if !v.is_finite() {
            return Err(ValidationError::NonFinite);
        }
        if v <= 0.0 {
            return Err(ValidationError::NonPositive(name));
        }
    }
    check_fraction(e.glazing_ratio, "glazing_ratio")?;
    if !e.air_changes_per_hour.is_finite() {
        return Err(ValidationError::NonFinite);
    }
    if e.air_changes_per_hour < 0.0 {
        return Err(ValidationError::NonPositive("air_changes_per_hour"));
    }
    Ok(())
}

/// Validate design temperatures.
pub fn validate_climate(c: &ClimateCondition) -> Result<(), ValidationError> {
    if !(c.design_high_c.is_finite() && c.design_low_c.is_finite() && c.inside_setpoint_c.is_finite())
    {
        return Err(ValidationError::NonFinite);
    }
    if c.design_low_c > c.design_high_c {
        return Err(ValidationError::InvertedClimate {
            low: c.design_low_c,
            high: c.design_high_c,
        });
    }
    Ok(())
}

/// Validate a zone's identity. Geometry is not checked here: non-finite or
/// negative dimensions are coerced to zero by the load model.
pub fn validate_zone(z: &Zone) -> Result<(), ValidationError> {
    if z.id.trim().is_empty() {
        return Err(ValidationError::EmptyId);
    }
    Ok(())
}

/// Validate every zone and require distinct ids.
pub fn validate_zones(zones: &[Zone]) -> Result<(), ValidationError> {
    for (i, z) in zones.iter().enumerate() {
        validate_zone(z)?;
        if zones[..i].iter().any(|prev| prev.id.trim() == z.id.trim()) {
            return Err(ValidationError::DuplicateId(z.id.clone()));
        }
    }
    Ok(())
}

/// Validate a fraction such as solar share or heat-recovery efficiency.
pub fn validate_fraction(x: f64, name: &'static str) -> Result<(), ValidationError> {
    check_fraction(x, name)
}
