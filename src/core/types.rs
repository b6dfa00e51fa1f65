use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::error::EngineError;
use super::params::ParamKey;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum ScenarioKey {
    #[serde(rename = "new4yr")]
    New4yr,
    #[serde(rename = "new10yr")]
    New10yr,
    #[serde(rename = "newForever")]
    NewForever,
    #[serde(rename = "cheapUsed")]
    CheapUsed,
    #[serde(rename = "fourYrUsed")]
    FourYrUsed,
}

impl ScenarioKey {
    pub const ALL: [ScenarioKey; 5] = [
        ScenarioKey::New4yr,
        ScenarioKey::New10yr,
        ScenarioKey::NewForever,
        ScenarioKey::CheapUsed,
        ScenarioKey::FourYrUsed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioKey::New4yr => "new4yr",
            ScenarioKey::New10yr => "new10yr",
            ScenarioKey::NewForever => "newForever",
            ScenarioKey::CheapUsed => "cheapUsed",
            ScenarioKey::FourYrUsed => "fourYrUsed",
        }
    }
}

impl fmt::Display for ScenarioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioKey {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ScenarioKey::ALL
            .into_iter()
            .find(|key| key.as_str() == value)
            .ok_or_else(|| EngineError::UnknownScenario(value.to_string()))
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReplaceCycle {
    Finite(u32),
    Never,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FuelPenaltyMode {
    /// Used-vehicle scenarios: `share` of the max penalty from day one.
    Flat { share: f64 },
    /// Zero until `fuelPenaltyStart`, then linear over `fuelPenaltyRamp` years.
    Ramped,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScenarioConfig {
    pub key: ScenarioKey,
    pub label: &'static str,
    pub base_purchase_key: ParamKey,
    pub replace_cycle: ReplaceCycle,
    pub resale_key: Option<ParamKey>,
    pub insurance_key: ParamKey,
    pub maint_key: ParamKey,
    pub loan_term_key: ParamKey,
    pub interest_rate_key: ParamKey,
    pub start_age: u32,
    pub fuel_penalty: FuelPenaltyMode,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    Cash,
    Finance,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Cumulative,
    Annual,
}

/// One simulated year. Every money field is rounded to whole units; the
/// running totals behind `cumulative` are kept unrounded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRecord {
    pub year: u32,
    pub annual: f64,
    pub cumulative: f64,
    pub insurance: f64,
    pub maintenance: f64,
    pub fuel: f64,
    pub purchase: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioProjection {
    pub cash: Vec<YearRecord>,
    pub finance: Vec<YearRecord>,
}

impl ScenarioProjection {
    pub fn records(&self, mode: PaymentMode) -> &[YearRecord] {
        match mode {
            PaymentMode::Cash => &self.cash,
            PaymentMode::Finance => &self.finance,
        }
    }

    pub fn total_cost(&self, mode: PaymentMode) -> f64 {
        self.records(mode)
            .last()
            .map(|record| record.cumulative)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSummary {
    pub scenario: ScenarioKey,
    pub label: &'static str,
    pub rank: usize,
    pub total_cost: f64,
    pub avg_annual: f64,
    pub diff_from_cheapest: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRow {
    pub year: u32,
    pub values: Vec<ChartValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartValue {
    pub scenario: ScenarioKey,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub mode: PaymentMode,
    pub years: u32,
    pub ranking: Vec<ScenarioSummary>,
}
