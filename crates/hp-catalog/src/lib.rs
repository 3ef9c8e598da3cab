#![deny(warnings)]

//! Catalog-driven equipment selection.
//!
//! Given a capacity requirement and optional technology constraints, the
//! matcher filters a caller-supplied catalog snapshot and picks either the
//! cheapest or the smallest adequate product. It never fails: an empty or
//! fully-rejected catalog yields a `NoMatch` result with reasons, and a
//! catalog with nothing big enough yields a flagged fallback.

use hp_core::{non_negative, units, Duty};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default cap on identical units installed in cascade.
pub const DEFAULT_MAX_UNITS: u32 = 8;

/// One product record from the live catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub refrigerant: Option<String>,
    #[serde(default)]
    pub capacity_heating_kw: Option<f64>,
    #[serde(default)]
    pub capacity_cooling_kw: Option<f64>,
    #[serde(default)]
    pub capacity_hot_water_kw: Option<f64>,
    /// Unit list price in the catalog currency.
    #[serde(default)]
    pub list_price: Option<Decimal>,
    /// Unit trade price in the catalog currency.
    #[serde(default)]
    pub trade_price: Option<Decimal>,
}

/// Equipment class the selection must belong to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentClass {
    Any,
    #[default]
    HeatPump,
    Chiller,
    WaterHeater,
}

impl EquipmentClass {
    fn keywords(self) -> &'static [&'static str] {
        match self {
            EquipmentClass::Any => &[],
            EquipmentClass::HeatPump => &["heat pump", "heatpump", "ashp", "gshp", "wshp"],
            EquipmentClass::Chiller => &["chiller"],
            EquipmentClass::WaterHeater => &["water heater", "hot water", "dhw"],
        }
    }

    /// Whether category, name or any tag carries one of the class keywords.
    pub fn matches(self, item: &CatalogItem) -> bool {
        if self == EquipmentClass::Any {
            return true;
        }
        let hay = std::iter::once(&item.category)
            .chain(std::iter::once(&item.name))
            .chain(item.tags.iter())
            .map(|s| s.to_lowercase())
            .collect::<Vec<_>>();
        self.keywords()
            .iter()
            .any(|k| hay.iter().any(|h| h.contains(k)))
    }
}

static DASHED_R: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bR-(\d)").expect("static regex"));
static KW_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+(?:[.,]\d+)?)\s*-?\s*kw\b").expect("static regex"));
static HP_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*-?\s*hp\b").expect("static regex"));
static BTU_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,3}(?:,\d{3})+|\d+(?:\.\d+)?)\s*(k)?\s*btu").expect("static regex")
});

/// Upper-case alphanumeric tokens with "R-290" folded to "R290" and "CO₂" to "CO2".
fn refrigerant_tokens(s: &str) -> Vec<String> {
    let upper = s.to_uppercase().replace('₂', "2");
    let folded = DASHED_R.replace_all(&upper, "R$1");
    folded
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Refrigerant constraint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefrigerantFilter {
    #[default]
    Any,
    Only(String),
}

impl RefrigerantFilter {
    /// "any" or blank means no constraint.
    pub fn parse(s: &str) -> Self {
        let t = s.trim();
        if t.is_empty() || t.eq_ignore_ascii_case("any") {
            RefrigerantFilter::Any
        } else {
            RefrigerantFilter::Only(t.to_string())
        }
    }

    fn aliases(&self) -> Vec<String> {
        match self {
            RefrigerantFilter::Any => Vec::new(),
            RefrigerantFilter::Only(r) => {
                let tokens = refrigerant_tokens(r);
                if tokens.iter().any(|t| t == "CO2" || t == "R744") {
                    vec!["CO2".to_string(), "R744".to_string()]
                } else {
                    tokens
                }
            }
        }
    }

    /// Declared refrigerant first, then any whole token in the name.
    pub fn matches(&self, item: &CatalogItem) -> bool {
        let aliases = self.aliases();
        if aliases.is_empty() {
            return true;
        }
        let hit = |s: &str| refrigerant_tokens(s).iter().any(|t| aliases.contains(t));
        item.refrigerant.as_deref().map(hit).unwrap_or(false) || hit(&item.name)
    }
}

/// Which catalog price to charge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    #[default]
    List,
    Trade,
}

/// Ranking policy among adequate candidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Lowest total installed cost.
    BestPrice,
    /// Smallest single unit that covers the requirement; when none does,
    /// the fewest units, then the smallest of those.
    SmallestAdequate,
}

/// Where a candidate's capacity came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacitySource {
    Explicit,
    ParsedFromName,
}

/// Parse a capacity in kW from a free-text product name.
///
/// The last "kW" token wins, then "HP" (nominal trade rating), then "BTU".
pub fn parse_capacity_kw(name: &str) -> Option<f64> {
    let last = |re: &Regex| -> Option<f64> {
        re.captures_iter(name)
            .last()
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().replace(',', ".").parse::<f64>().ok())
    };
    if let Some(kw) = last(&KW_TOKEN) {
        return Some(kw).filter(|v| *v > 0.0);
    }
    if let Some(hp) = last(&HP_TOKEN) {
        return Some(units::nominal_hp_to_kw(hp)).filter(|v| *v > 0.0);
    }
    let btu = BTU_TOKEN.captures_iter(name).last().and_then(|c| {
        let digits = c.get(1)?.as_str().replace(',', "");
        let v = digits.parse::<f64>().ok()?;
        Some(if c.get(2).is_some() { v * 1000.0 } else { v })
    })?;
    Some(units::btu_per_hour_to_kw(btu)).filter(|v| *v > 0.0)
}

/// Usable capacity for the duty: explicit field first, then the name.
pub fn resolve_capacity(item: &CatalogItem, duty: Duty) -> Option<(f64, CapacitySource)> {
    let explicit = match duty {
        Duty::Heating => item.capacity_heating_kw,
        Duty::Cooling => item.capacity_cooling_kw,
        Duty::HotWater => item.capacity_hot_water_kw.or(item.capacity_heating_kw),
    };
    if let Some(kw) = explicit.filter(|v| v.is_finite() && *v > 0.0) {
        return Some((kw, CapacitySource::Explicit));
    }
    parse_capacity_kw(&item.name).map(|kw| (kw, CapacitySource::ParsedFromName))
}

/// Unit price for the requested field; `true` when trade fell back to list.
pub fn resolve_price(item: &CatalogItem, field: PriceField) -> Option<(Decimal, bool)> {
    let list = item.list_price.filter(|p| *p >= Decimal::ZERO);
    match field {
        PriceField::List => list.map(|p| (p, false)),
        PriceField::Trade => match item.trade_price.filter(|p| *p >= Decimal::ZERO) {
            Some(p) => Some((p, false)),
            None => list.map(|p| (p, true)),
        },
    }
}

/// Units of `capacity_kw` needed to cover `required_kw`, at least one.
pub fn units_required(required_kw: f64, capacity_kw: f64) -> u32 {
    if capacity_kw <= 0.0 || required_kw <= 0.0 {
        return 1;
    }
    let n = (required_kw / capacity_kw).ceil();
    if n >= u32::MAX as f64 {
        return u32::MAX;
    }
    let mut n = (n as u32).max(1);
    // the quotient can round either way; settle on the product
    if n < u32::MAX && (n as f64) * capacity_kw < required_kw {
        n += 1;
    }
    // 1.1 / 0.1 rounds up to 12, but 11 units already cover 1.1 kW
    if n > 1 && (n - 1) as f64 * capacity_kw >= required_kw {
        n - 1
    } else {
        n
    }
}

/// Selection request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchRequest {
    pub required_kw: f64,
    pub duty: Duty,
    #[serde(default)]
    pub class: EquipmentClass,
    #[serde(default)]
    pub refrigerant: RefrigerantFilter,
    #[serde(default)]
    pub price_field: PriceField,
    /// Explicit ranking policy; derived from the refrigerant filter if unset.
    #[serde(default)]
    pub mode: Option<SelectionMode>,
    #[serde(default = "default_max_units")]
    pub max_units: u32,
}

fn default_max_units() -> u32 {
    DEFAULT_MAX_UNITS
}

impl MatchRequest {
    pub fn new(required_kw: f64, duty: Duty) -> Self {
        Self {
            required_kw,
            duty,
            class: EquipmentClass::default(),
            refrigerant: RefrigerantFilter::Any,
            price_field: PriceField::List,
            mode: None,
            max_units: DEFAULT_MAX_UNITS,
        }
    }

    /// Fixed refrigerant means "specific constraint" mode.
    pub fn effective_mode(&self) -> SelectionMode {
        self.mode.unwrap_or(match self.refrigerant {
            RefrigerantFilter::Any => SelectionMode::BestPrice,
            RefrigerantFilter::Only(_) => SelectionMode::SmallestAdequate,
        })
    }
}

/// A catalog item priced and sized against the request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub item_id: String,
    pub name: String,
    pub capacity_kw: f64,
    pub capacity_source: CapacitySource,
    pub unit_price: Decimal,
    pub price_defaulted: bool,
    pub units_required: u32,
    pub total_capacity_kw: f64,
    pub total_cost: Decimal,
}

impl Candidate {
    fn with_units(mut self, units: u32) -> Self {
        self.units_required = units;
        self.total_capacity_kw = self.capacity_kw * units as f64;
        self.total_cost = self.unit_price * Decimal::from(units);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    EmptyCatalog,
    WrongEquipmentClass,
    RefrigerantMismatch,
    NoDerivableCapacity,
    NoUsablePrice,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    /// `None` for catalog-level reasons.
    pub item_id: Option<String>,
    pub reason: RejectionReason,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOutcome {
    /// A candidate covers the requirement.
    Matched,
    /// Nothing was adequate; the largest candidate was taken at the unit cap.
    FallbackLargest,
    /// No usable candidate at all.
    NoMatch,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub outcome: SelectionOutcome,
    pub mode: SelectionMode,
    pub selected: Option<Candidate>,
    pub units_required: u32,
    pub total_capacity_kw: f64,
    /// In the catalog currency. Zero when nothing is selected.
    pub total_cost: Decimal,
    pub candidates_considered: usize,
    pub rejected: Vec<Rejection>,
    /// Uncovered kW on the fallback path, otherwise zero.
    pub shortfall_kw: f64,
}

impl SelectionResult {
    fn no_match(mode: SelectionMode, considered: usize, rejected: Vec<Rejection>) -> Self {
        Self {
            outcome: SelectionOutcome::NoMatch,
            mode,
            selected: None,
            units_required: 0,
            total_capacity_kw: 0.0,
            total_cost: Decimal::ZERO,
            candidates_considered: considered,
            rejected,
            shortfall_kw: 0.0,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.outcome == SelectionOutcome::FallbackLargest
    }
}

/// Filter, size and rank catalog items for the request.
///
/// Ties (equal cost or equal capacity) go to the first item in catalog order.
pub fn select_equipment(catalog: &[CatalogItem], req: &MatchRequest) -> SelectionResult {
    let mode = req.effective_mode();
    if catalog.is_empty() {
        warn!("empty catalog, no equipment selected");
        return SelectionResult::no_match(
            mode,
            0,
            vec![Rejection {
                item_id: None,
                reason: RejectionReason::EmptyCatalog,
            }],
        );
    }

    let required = non_negative(req.required_kw);
    let max_units = req.max_units.max(1);
    let mut rejected = Vec::new();
    let mut candidates = Vec::new();

    for item in catalog {
        let reject = |reason| Rejection {
            item_id: Some(item.id.clone()),
            reason,
        };
        if !req.class.matches(item) {
            rejected.push(reject(RejectionReason::WrongEquipmentClass));
            continue;
        }
        if !req.refrigerant.matches(item) {
            rejected.push(reject(RejectionReason::RefrigerantMismatch));
            continue;
        }
        let Some((capacity_kw, capacity_source)) = resolve_capacity(item, req.duty) else {
            rejected.push(reject(RejectionReason::NoDerivableCapacity));
            continue;
        };
        let Some((unit_price, price_defaulted)) = resolve_price(item, req.price_field) else {
            rejected.push(reject(RejectionReason::NoUsablePrice));
            continue;
        };
        let candidate = Candidate {
            item_id: item.id.clone(),
            name: item.name.clone(),
            capacity_kw,
            capacity_source,
            unit_price,
            price_defaulted,
            units_required: 0,
            total_capacity_kw: 0.0,
            total_cost: Decimal::ZERO,
        }
        .with_units(units_required(required, capacity_kw));
        candidates.push(candidate);
    }
    debug!(
        considered = catalog.len(),
        usable = candidates.len(),
        rejected = rejected.len(),
        "catalog filtered"
    );

    if candidates.is_empty() {
        warn!(required_kw = required, "no catalog item passed the filters");
        return SelectionResult::no_match(mode, catalog.len(), rejected);
    }

    let mut best: Option<&Candidate> = None;
    for c in candidates.iter().filter(|c| c.units_required <= max_units) {
        let better = match best {
            None => true,
            Some(b) => match mode {
                SelectionMode::BestPrice => c.total_cost < b.total_cost,
                // a single unit that fits beats any cascade
                SelectionMode::SmallestAdequate => {
                    c.units_required < b.units_required
                        || (c.units_required == b.units_required && c.capacity_kw < b.capacity_kw)
                }
            },
        };
        if better {
            best = Some(c);
        }
    }

    let (outcome, chosen) = match best {
        Some(c) => (SelectionOutcome::Matched, c.clone()),
        None => {
            let mut largest = &candidates[0];
            for c in &candidates[1..] {
                if c.capacity_kw > largest.capacity_kw {
                    largest = c;
                }
            }
            warn!(
                required_kw = required,
                item = %largest.item_id,
                max_units,
                "no adequate equipment, falling back to largest"
            );
            (
                SelectionOutcome::FallbackLargest,
                largest.clone().with_units(max_units),
            )
        }
    };

    let shortfall_kw = if outcome == SelectionOutcome::FallbackLargest {
        non_negative(required - chosen.total_capacity_kw)
    } else {
        0.0
    };
    SelectionResult {
        outcome,
        mode,
        units_required: chosen.units_required,
        total_capacity_kw: chosen.total_capacity_kw,
        total_cost: chosen.total_cost,
        selected: Some(chosen),
        candidates_considered: catalog.len(),
        rejected,
        shortfall_kw,
    }
}
