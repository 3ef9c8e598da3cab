#![deny(warnings)]

//! Financial evaluation of a heat-pump retrofit.
//!
//! This module provides validated utilities for:
//! - Capex aggregation over typed line items
//! - Simple payback as an explicit tri-state
//! - Discounted-cashflow NPV of a level annual savings stream
//! - IRR via Newton–Raphson with an analytic derivative
//! - Cost of delaying the whole cash-flow stream

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Starting guess for the IRR solver (10%).
pub const IRR_INITIAL_GUESS: f64 = 0.10;
/// Solver stops once |NPV| falls below this.
pub const IRR_TOLERANCE: f64 = 1e-4;
pub const IRR_MAX_ITERATIONS: u32 = 100;
/// Rates are kept above -99% so discount factors stay finite.
const MIN_RATE: f64 = -0.99;
const MIN_DERIVATIVE: f64 = 1e-12;
/// Longest project life accepted.
pub const MAX_LIFESPAN_YEARS: u32 = 100;
/// Cap on how far a negative rate may inflate savings over the project life
/// and delay, keeping NPV within the decimal range.
const MAX_COMPOUNDING: f64 = 1e9;

/// Errors produced by financial helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Discount rate must be finite and above -100%.
    #[error("invalid discount rate: {0}%")]
    InvalidRate(f64),
    /// Project life beyond [`MAX_LIFESPAN_YEARS`].
    #[error("invalid lifespan: {0} years")]
    InvalidLifespan(u32),
    /// Numeric conversion between decimal and floating point failed.
    #[error("non-finite numeric conversion")]
    NonFinite,
}

/// Capex line categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapexKind {
    Equipment,
    Installation,
    ImportDuty,
    Freight,
    Clearance,
    Storage,
    Upgrade,
    Other,
}

/// One capex line in the report currency.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapexItem {
    pub kind: CapexKind,
    pub label: String,
    pub amount: Decimal,
}

impl CapexItem {
    pub fn new(kind: CapexKind, label: impl Into<String>, amount: Decimal) -> Self {
        Self {
            kind,
            label: label.into(),
            amount,
        }
    }
}

/// Sum of all capex lines.
pub fn total_capex(items: &[CapexItem]) -> Decimal {
    items.iter().map(|i| i.amount).sum()
}

/// Simple payback.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "years")]
pub enum Payback {
    /// Net capex is zero or negative.
    Immediate,
    Years(f64),
    /// Capex is positive but the project saves nothing.
    Never,
}

impl Payback {
    /// Numeric view: both sentinels read as 0.
    pub fn years_or_zero(&self) -> f64 {
        match self {
            Payback::Years(y) => *y,
            Payback::Immediate | Payback::Never => 0.0,
        }
    }
}

/// Simple payback from capex and level annual savings.
pub fn simple_payback(total_capex: Decimal, annual_savings: Decimal) -> Result<Payback, EconError> {
    if total_capex <= Decimal::ZERO {
        return Ok(Payback::Immediate);
    }
    if annual_savings <= Decimal::ZERO {
        return Ok(Payback::Never);
    }
    let years = (total_capex / annual_savings)
        .to_f64()
        .ok_or(EconError::NonFinite)?;
    Ok(Payback::Years(years))
}

/// NPV of `years` level savings at `rate` (fraction) less upfront capex.
pub fn npv_at(rate: f64, annual_savings: f64, capex: f64, years: u32) -> f64 {
    let one_plus_r = 1.0 + rate;
    let mut discount = 1.0;
    let mut pv = 0.0;
    for _ in 0..years {
        discount *= one_plus_r;
        pv += annual_savings / discount;
    }
    pv - capex
}

/// d(NPV)/d(rate) = Σ −t·S/(1+r)^(t+1).
fn npv_derivative(rate: f64, annual_savings: f64, years: u32) -> f64 {
    let one_plus_r = 1.0 + rate;
    let mut discount = one_plus_r;
    let mut d = 0.0;
    for t in 1..=years {
        discount *= one_plus_r;
        d -= t as f64 * annual_savings / discount;
    }
    d
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrrStatus {
    Converged,
    /// Iteration budget exhausted or derivative stalled; rate is the last
    /// estimate.
    NotConverged,
    /// No sign change possible (no capex, no savings or no years).
    Undefined,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IrrEstimate {
    /// Percent. Zero when undefined.
    pub rate_pct: f64,
    pub status: IrrStatus,
    pub iterations: u32,
}

impl IrrEstimate {
    pub fn is_converged(&self) -> bool {
        self.status == IrrStatus::Converged
    }
}

/// IRR of `-capex` now followed by `years` level savings.
pub fn solve_irr(capex: f64, annual_savings: f64, years: u32) -> IrrEstimate {
    let usable = capex.is_finite() && annual_savings.is_finite();
    if !usable || capex <= 0.0 || annual_savings <= 0.0 || years == 0 {
        return IrrEstimate {
            rate_pct: 0.0,
            status: IrrStatus::Undefined,
            iterations: 0,
        };
    }
    let mut rate = IRR_INITIAL_GUESS;
    for i in 1..=IRR_MAX_ITERATIONS {
        let npv = npv_at(rate, annual_savings, capex, years);
        if npv.abs() < IRR_TOLERANCE {
            return IrrEstimate {
                rate_pct: rate * 100.0,
                status: IrrStatus::Converged,
                iterations: i,
            };
        }
        let d = npv_derivative(rate, annual_savings, years);
        if !d.is_finite() || d.abs() < MIN_DERIVATIVE {
            warn!(rate, iterations = i, "IRR derivative stalled");
            return IrrEstimate {
                rate_pct: rate * 100.0,
                status: IrrStatus::NotConverged,
                iterations: i,
            };
        }
        let next = rate - npv / d;
        rate = if next.is_finite() { next.max(MIN_RATE) } else { MIN_RATE };
    }
    warn!(rate, "IRR did not converge");
    IrrEstimate {
        rate_pct: rate * 100.0,
        status: IrrStatus::NotConverged,
        iterations: IRR_MAX_ITERATIONS,
    }
}

/// NPV lost by shifting the whole stream back `delay_months` at `rate`.
pub fn cost_of_delay(npv: f64, rate: f64, delay_months: u32) -> f64 {
    if delay_months == 0 {
        return 0.0;
    }
    let delayed = npv * (1.0 + rate).powf(-(delay_months as f64) / 12.0);
    npv - delayed
}

/// Financial parameters of one comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinancialInputs {
    pub capex: Vec<CapexItem>,
    pub annual_opex_baseline: Decimal,
    pub annual_opex_proposed: Decimal,
    pub discount_rate_pct: f64,
    pub lifespan_years: u32,
    #[serde(default)]
    pub delay_months: u32,
}

impl FinancialInputs {
    pub fn annual_savings(&self) -> Decimal {
        self.annual_opex_baseline - self.annual_opex_proposed
    }

    pub fn evaluate(&self) -> Result<FinancialResult, EconError> {
        evaluate(
            &self.capex,
            self.annual_savings(),
            self.discount_rate_pct,
            self.lifespan_years,
            self.delay_months,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinancialResult {
    pub total_capex: Decimal,
    pub annual_savings: Decimal,
    pub payback: Payback,
    pub npv: Decimal,
    pub irr: IrrEstimate,
    pub cost_of_delay: Decimal,
    pub discount_rate_pct: f64,
    pub lifespan_years: u32,
}

impl FinancialResult {
    /// Payback in years with sentinels read as 0.
    pub fn simple_payback_years(&self) -> f64 {
        self.payback.years_or_zero()
    }
}

fn money(x: f64) -> Result<Decimal, EconError> {
    Decimal::from_f64(x)
        .map(|d| d.round_dp(2))
        .ok_or(EconError::NonFinite)
}

/// Evaluate capex against a level annual savings stream.
///
/// Zero or negative savings and zero capex are valid inputs: their results
/// carry sentinels (`Payback::Never`, `Payback::Immediate`,
/// `IrrStatus::Undefined`) instead of NaN or infinities.
pub fn evaluate(
    capex: &[CapexItem],
    annual_savings: Decimal,
    discount_rate_pct: f64,
    lifespan_years: u32,
    delay_months: u32,
) -> Result<FinancialResult, EconError> {
    if !discount_rate_pct.is_finite() || discount_rate_pct <= -100.0 {
        return Err(EconError::InvalidRate(discount_rate_pct));
    }
    if lifespan_years > MAX_LIFESPAN_YEARS {
        return Err(EconError::InvalidLifespan(lifespan_years));
    }
    let rate = discount_rate_pct / 100.0;
    let horizon_years = lifespan_years as f64 + delay_months as f64 / 12.0;
    let compounding = (1.0 + rate).powf(-horizon_years);
    if !(compounding.is_finite() && compounding <= MAX_COMPOUNDING) {
        return Err(EconError::InvalidRate(discount_rate_pct));
    }
    let total = total_capex(capex);
    let capex_f = total.to_f64().ok_or(EconError::NonFinite)?;
    let savings_f = annual_savings.to_f64().ok_or(EconError::NonFinite)?;

    let payback = simple_payback(total, annual_savings)?;
    let npv_f = npv_at(rate, savings_f, capex_f, lifespan_years);
    let irr = solve_irr(capex_f, savings_f, lifespan_years);
    let delay_f = cost_of_delay(npv_f, rate, delay_months);
    debug!(
        total_capex = %total,
        annual_savings = %annual_savings,
        npv = npv_f,
        irr_pct = irr.rate_pct,
        "financial evaluation"
    );
    Ok(FinancialResult {
        total_capex: total,
        annual_savings,
        payback,
        npv: money(npv_f)?,
        irr,
        cost_of_delay: money(delay_f)?,
        discount_rate_pct,
        lifespan_years,
    })
}
