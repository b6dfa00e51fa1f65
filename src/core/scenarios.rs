use super::params::ParamKey;
use super::types::{FuelPenaltyMode, ReplaceCycle, ScenarioConfig, ScenarioKey};

const NEW_4YR: ScenarioConfig = ScenarioConfig {
    key: ScenarioKey::New4yr,
    label: "New Every 4yr",
    base_purchase_key: ParamKey::NewCarPrice,
    replace_cycle: ReplaceCycle::Finite(4),
    resale_key: Some(ParamKey::NewResalePercent),
    insurance_key: ParamKey::InsuranceNew,
    maint_key: ParamKey::MaintNewBase,
    loan_term_key: ParamKey::LoanTermYears,
    interest_rate_key: ParamKey::InterestRate,
    start_age: 0,
    fuel_penalty: FuelPenaltyMode::Ramped,
};

const NEW_10YR: ScenarioConfig = ScenarioConfig {
    key: ScenarioKey::New10yr,
    label: "New Every 10yr",
    base_purchase_key: ParamKey::NewCarPrice,
    replace_cycle: ReplaceCycle::Finite(10),
    resale_key: Some(ParamKey::NewResale10Percent),
    insurance_key: ParamKey::InsuranceNew,
    maint_key: ParamKey::MaintNewBase,
    loan_term_key: ParamKey::LoanTermYears,
    interest_rate_key: ParamKey::InterestRate,
    start_age: 0,
    fuel_penalty: FuelPenaltyMode::Ramped,
};

const NEW_FOREVER: ScenarioConfig = ScenarioConfig {
    key: ScenarioKey::NewForever,
    label: "New — Keep Forever",
    base_purchase_key: ParamKey::NewCarPrice,
    replace_cycle: ReplaceCycle::Never,
    resale_key: None,
    insurance_key: ParamKey::InsuranceNew,
    maint_key: ParamKey::MaintNewBase,
    loan_term_key: ParamKey::LoanTermYears,
    interest_rate_key: ParamKey::InterestRate,
    start_age: 0,
    fuel_penalty: FuelPenaltyMode::Ramped,
};

const CHEAP_USED: ScenarioConfig = ScenarioConfig {
    key: ScenarioKey::CheapUsed,
    label: "Cheap Used / 10yr",
    base_purchase_key: ParamKey::CheapUsedPrice,
    replace_cycle: ReplaceCycle::Finite(10),
    resale_key: Some(ParamKey::UsedResalePercent),
    insurance_key: ParamKey::InsuranceCheapUsed,
    maint_key: ParamKey::MaintCheapUsedBase,
    loan_term_key: ParamKey::UsedLoanTerm,
    interest_rate_key: ParamKey::UsedInterestRate,
    start_age: 8,
    fuel_penalty: FuelPenaltyMode::Flat { share: 1.0 },
};

const FOUR_YR_USED: ScenarioConfig = ScenarioConfig {
    key: ScenarioKey::FourYrUsed,
    label: "4yr Used / 10yr",
    base_purchase_key: ParamKey::FourYrUsedPrice,
    replace_cycle: ReplaceCycle::Finite(10),
    resale_key: Some(ParamKey::UsedResalePercent),
    insurance_key: ParamKey::Insurance4yrUsed,
    maint_key: ParamKey::Maint4yrUsedBase,
    loan_term_key: ParamKey::UsedLoanTerm,
    interest_rate_key: ParamKey::UsedInterestRate,
    start_age: 4,
    fuel_penalty: FuelPenaltyMode::Flat { share: 0.5 },
};

pub const SCENARIO_CONFIGS: [ScenarioConfig; 5] =
    [NEW_4YR, NEW_10YR, NEW_FOREVER, CHEAP_USED, FOUR_YR_USED];

pub fn scenario_config(key: ScenarioKey) -> &'static ScenarioConfig {
    match key {
        ScenarioKey::New4yr => &SCENARIO_CONFIGS[0],
        ScenarioKey::New10yr => &SCENARIO_CONFIGS[1],
        ScenarioKey::NewForever => &SCENARIO_CONFIGS[2],
        ScenarioKey::CheapUsed => &SCENARIO_CONFIGS[3],
        ScenarioKey::FourYrUsed => &SCENARIO_CONFIGS[4],
    }
}
