use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::EngineError;

/// Longest horizon a projection accepts.
pub const MAX_YEARS: u32 = 1_000;

/// Economic and vehicle inputs shared by every scenario. Percentages are
/// stored as 0-100 numbers, prices in nominal year-one currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSet {
    pub new_car_price: f64,
    pub cheap_used_price: f64,
    pub four_yr_used_price: f64,
    pub sales_tax: f64,
    pub reg_fees: f64,
    pub new_resale_percent: f64,
    pub new_resale10_percent: f64,
    pub used_resale_percent: f64,

    pub insurance_new: f64,
    pub insurance_cheap_used: f64,
    pub insurance4yr_used: f64,
    pub maint_new_base: f64,
    pub maint_cheap_used_base: f64,
    pub maint4yr_used_base: f64,
    pub maint_increase_rate: f64,
    pub maint_cap_mult: f64,
    pub fuel_cost_year: f64,
    pub fuel_penalty_old: f64,
    pub fuel_penalty_start: f64,
    pub fuel_penalty_ramp: f64,
    pub annual_reg_rate: f64,
    pub ins_age_factor1: f64,
    pub ins_age_factor2: f64,
    pub ins_age_factor3: f64,

    pub down_payment_pct: f64,
    pub loan_term_years: f64,
    pub interest_rate: f64,
    pub used_loan_term: f64,
    pub used_interest_rate: f64,
    pub inflation: f64,
    pub discount_rate: f64,
    #[serde(
        serialize_with = "serialize_flag",
        deserialize_with = "deserialize_flag"
    )]
    pub include_terminal_value: bool,
    pub years: u32,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            new_car_price: 38_000.0,
            cheap_used_price: 8_000.0,
            four_yr_used_price: 22_000.0,
            sales_tax: 7.0,
            reg_fees: 500.0,
            new_resale_percent: 45.0,
            new_resale10_percent: 20.0,
            used_resale_percent: 15.0,

            insurance_new: 2_000.0,
            insurance_cheap_used: 900.0,
            insurance4yr_used: 1_400.0,
            maint_new_base: 400.0,
            maint_cheap_used_base: 1_200.0,
            maint4yr_used_base: 800.0,
            maint_increase_rate: 8.0,
            maint_cap_mult: 8.0,
            fuel_cost_year: 2_000.0,
            fuel_penalty_old: 15.0,
            fuel_penalty_start: 10.0,
            fuel_penalty_ramp: 10.0,
            annual_reg_rate: 30.0,
            ins_age_factor1: 85.0,
            ins_age_factor2: 70.0,
            ins_age_factor3: 60.0,

            down_payment_pct: 20.0,
            loan_term_years: 5.0,
            interest_rate: 6.5,
            used_loan_term: 4.0,
            used_interest_rate: 8.5,
            inflation: 3.0,
            discount_rate: 5.0,
            include_terminal_value: true,
            years: 40,
        }
    }
}

impl ParameterSet {
    pub fn get(&self, key: ParamKey) -> f64 {
        match key {
            ParamKey::NewCarPrice => self.new_car_price,
            ParamKey::CheapUsedPrice => self.cheap_used_price,
            ParamKey::FourYrUsedPrice => self.four_yr_used_price,
            ParamKey::SalesTax => self.sales_tax,
            ParamKey::RegFees => self.reg_fees,
            ParamKey::NewResalePercent => self.new_resale_percent,
            ParamKey::NewResale10Percent => self.new_resale10_percent,
            ParamKey::UsedResalePercent => self.used_resale_percent,
            ParamKey::InsuranceNew => self.insurance_new,
            ParamKey::InsuranceCheapUsed => self.insurance_cheap_used,
            ParamKey::Insurance4yrUsed => self.insurance4yr_used,
            ParamKey::MaintNewBase => self.maint_new_base,
            ParamKey::MaintCheapUsedBase => self.maint_cheap_used_base,
            ParamKey::Maint4yrUsedBase => self.maint4yr_used_base,
            ParamKey::MaintIncreaseRate => self.maint_increase_rate,
            ParamKey::MaintCapMult => self.maint_cap_mult,
            ParamKey::FuelCostYear => self.fuel_cost_year,
            ParamKey::FuelPenaltyOld => self.fuel_penalty_old,
            ParamKey::FuelPenaltyStart => self.fuel_penalty_start,
            ParamKey::FuelPenaltyRamp => self.fuel_penalty_ramp,
            ParamKey::AnnualRegRate => self.annual_reg_rate,
            ParamKey::InsAgeFactor1 => self.ins_age_factor1,
            ParamKey::InsAgeFactor2 => self.ins_age_factor2,
            ParamKey::InsAgeFactor3 => self.ins_age_factor3,
            ParamKey::DownPaymentPct => self.down_payment_pct,
            ParamKey::LoanTermYears => self.loan_term_years,
            ParamKey::InterestRate => self.interest_rate,
            ParamKey::UsedLoanTerm => self.used_loan_term,
            ParamKey::UsedInterestRate => self.used_interest_rate,
            ParamKey::Inflation => self.inflation,
            ParamKey::DiscountRate => self.discount_rate,
            ParamKey::IncludeTerminalValue => {
                if self.include_terminal_value {
                    1.0
                } else {
                    0.0
                }
            }
            ParamKey::Years => self.years as f64,
        }
    }

    /// Assigns one numeric input. `years` must be a whole non-negative
    /// number and `includeTerminalValue` must be 0 or 1.
    pub fn set(&mut self, key: ParamKey, value: f64) -> Result<(), EngineError> {
        if !value.is_finite() {
            return Err(invalid(key, "must be a finite number"));
        }

        let slot = match key {
            ParamKey::NewCarPrice => &mut self.new_car_price,
            ParamKey::CheapUsedPrice => &mut self.cheap_used_price,
            ParamKey::FourYrUsedPrice => &mut self.four_yr_used_price,
            ParamKey::SalesTax => &mut self.sales_tax,
            ParamKey::RegFees => &mut self.reg_fees,
            ParamKey::NewResalePercent => &mut self.new_resale_percent,
            ParamKey::NewResale10Percent => &mut self.new_resale10_percent,
            ParamKey::UsedResalePercent => &mut self.used_resale_percent,
            ParamKey::InsuranceNew => &mut self.insurance_new,
            ParamKey::InsuranceCheapUsed => &mut self.insurance_cheap_used,
            ParamKey::Insurance4yrUsed => &mut self.insurance4yr_used,
            ParamKey::MaintNewBase => &mut self.maint_new_base,
            ParamKey::MaintCheapUsedBase => &mut self.maint_cheap_used_base,
            ParamKey::Maint4yrUsedBase => &mut self.maint4yr_used_base,
            ParamKey::MaintIncreaseRate => &mut self.maint_increase_rate,
            ParamKey::MaintCapMult => &mut self.maint_cap_mult,
            ParamKey::FuelCostYear => &mut self.fuel_cost_year,
            ParamKey::FuelPenaltyOld => &mut self.fuel_penalty_old,
            ParamKey::FuelPenaltyStart => &mut self.fuel_penalty_start,
            ParamKey::FuelPenaltyRamp => &mut self.fuel_penalty_ramp,
            ParamKey::AnnualRegRate => &mut self.annual_reg_rate,
            ParamKey::InsAgeFactor1 => &mut self.ins_age_factor1,
            ParamKey::InsAgeFactor2 => &mut self.ins_age_factor2,
            ParamKey::InsAgeFactor3 => &mut self.ins_age_factor3,
            ParamKey::DownPaymentPct => &mut self.down_payment_pct,
            ParamKey::LoanTermYears => &mut self.loan_term_years,
            ParamKey::InterestRate => &mut self.interest_rate,
            ParamKey::UsedLoanTerm => &mut self.used_loan_term,
            ParamKey::UsedInterestRate => &mut self.used_interest_rate,
            ParamKey::Inflation => &mut self.inflation,
            ParamKey::DiscountRate => &mut self.discount_rate,
            ParamKey::IncludeTerminalValue => {
                self.include_terminal_value = match value {
                    v if v == 0.0 => false,
                    v if v == 1.0 => true,
                    _ => return Err(invalid(key, "must be 0 or 1")),
                };
                return Ok(());
            }
            ParamKey::Years => {
                if value < 0.0 || value.fract() != 0.0 {
                    return Err(invalid(key, "must be a whole number of years"));
                }
                if value > f64::from(MAX_YEARS) {
                    return Err(years_too_long());
                }
                self.years = value as u32;
                return Ok(());
            }
        };
        *slot = value;
        Ok(())
    }

    /// Rejects inputs the engine would otherwise turn into NaN.
    pub fn validate(&self) -> Result<(), EngineError> {
        for key in ParamKey::ALL {
            if !self.get(key).is_finite() {
                return Err(invalid(key, "must be a finite number"));
            }
        }
        if self.years > MAX_YEARS {
            return Err(years_too_long());
        }
        Ok(())
    }
}

fn years_too_long() -> EngineError {
    invalid(ParamKey::Years, &format!("must be at most {MAX_YEARS}"))
}

fn invalid(key: ParamKey, reason: &str) -> EngineError {
    EngineError::InvalidParameter {
        key: key.name(),
        reason: reason.to_string(),
    }
}

fn serialize_flag<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}

fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(f64),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(v) => Ok(v),
        Flag::Number(v) if v == 0.0 => Ok(false),
        Flag::Number(v) if v == 1.0 => Ok(true),
        Flag::Number(v) => Err(serde::de::Error::custom(format!(
            "includeTerminalValue must be 0 or 1, got {v}"
        ))),
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ParamKey {
    NewCarPrice,
    CheapUsedPrice,
    FourYrUsedPrice,
    SalesTax,
    RegFees,
    NewResalePercent,
    NewResale10Percent,
    UsedResalePercent,
    InsuranceNew,
    InsuranceCheapUsed,
    Insurance4yrUsed,
    MaintNewBase,
    MaintCheapUsedBase,
    Maint4yrUsedBase,
    MaintIncreaseRate,
    MaintCapMult,
    FuelCostYear,
    FuelPenaltyOld,
    FuelPenaltyStart,
    FuelPenaltyRamp,
    AnnualRegRate,
    InsAgeFactor1,
    InsAgeFactor2,
    InsAgeFactor3,
    DownPaymentPct,
    LoanTermYears,
    InterestRate,
    UsedLoanTerm,
    UsedInterestRate,
    Inflation,
    DiscountRate,
    IncludeTerminalValue,
    Years,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamGroup {
    Purchase,
    Operating,
    Finance,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamFormat {
    Currency,
    Percent,
    Multiplier,
    Age,
    Years,
    Boolean,
}

/// Slider metadata for one input. Informational only: the engine does not
/// clamp values to these bounds.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct ParamSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub format: ParamFormat,
    pub group: ParamGroup,
}

impl ParamKey {
    pub const ALL: [ParamKey; 33] = [
        ParamKey::NewCarPrice,
        ParamKey::CheapUsedPrice,
        ParamKey::FourYrUsedPrice,
        ParamKey::SalesTax,
        ParamKey::RegFees,
        ParamKey::NewResalePercent,
        ParamKey::NewResale10Percent,
        ParamKey::UsedResalePercent,
        ParamKey::InsuranceNew,
        ParamKey::InsuranceCheapUsed,
        ParamKey::Insurance4yrUsed,
        ParamKey::MaintNewBase,
        ParamKey::MaintCheapUsedBase,
        ParamKey::Maint4yrUsedBase,
        ParamKey::MaintIncreaseRate,
        ParamKey::MaintCapMult,
        ParamKey::FuelCostYear,
        ParamKey::FuelPenaltyOld,
        ParamKey::FuelPenaltyStart,
        ParamKey::FuelPenaltyRamp,
        ParamKey::AnnualRegRate,
        ParamKey::InsAgeFactor1,
        ParamKey::InsAgeFactor2,
        ParamKey::InsAgeFactor3,
        ParamKey::DownPaymentPct,
        ParamKey::LoanTermYears,
        ParamKey::InterestRate,
        ParamKey::UsedLoanTerm,
        ParamKey::UsedInterestRate,
        ParamKey::Inflation,
        ParamKey::DiscountRate,
        ParamKey::IncludeTerminalValue,
        ParamKey::Years,
    ];

    pub fn name(self) -> &'static str {
        self.spec().key
    }

    pub fn from_name(name: &str) -> Option<ParamKey> {
        ParamKey::ALL.into_iter().find(|key| key.name() == name)
    }

    #[rustfmt::skip]
    pub fn spec(self) -> ParamSpec {
        use ParamFormat::{Age, Boolean, Currency, Multiplier, Percent, Years};
        use ParamGroup::{Finance, Operating, Purchase};

        let (key, label, min, max, step, format, group) = match self {
            ParamKey::NewCarPrice => ("newCarPrice", "New Car Price", 20_000.0, 80_000.0, 1_000.0, Currency, Purchase),
            ParamKey::CheapUsedPrice => ("cheapUsedPrice", "Cheap Used Car Price", 3_000.0, 20_000.0, 500.0, Currency, Purchase),
            ParamKey::FourYrUsedPrice => ("fourYrUsedPrice", "4-Year Used Car Price", 10_000.0, 50_000.0, 1_000.0, Currency, Purchase),
            ParamKey::SalesTax => ("salesTax", "Sales Tax", 0.0, 12.0, 0.5, Percent, Purchase),
            ParamKey::RegFees => ("regFees", "Registration / Fees", 100.0, 2_000.0, 50.0, Currency, Purchase),
            ParamKey::NewResalePercent => ("newResalePercent", "New Car Resale @ 4yr", 10.0, 70.0, 5.0, Percent, Purchase),
            ParamKey::NewResale10Percent => ("newResale10Percent", "New Car Resale @ 10yr", 5.0, 40.0, 5.0, Percent, Purchase),
            ParamKey::UsedResalePercent => ("usedResalePercent", "Used Car Resale @ 10yr", 0.0, 40.0, 5.0, Percent, Purchase),
            ParamKey::InsuranceNew => ("insuranceNew", "Insurance - New Car", 800.0, 5_000.0, 100.0, Currency, Operating),
            ParamKey::InsuranceCheapUsed => ("insuranceCheapUsed", "Insurance - Cheap Used", 400.0, 3_000.0, 100.0, Currency, Operating),
            ParamKey::Insurance4yrUsed => ("insurance4yrUsed", "Insurance - 4yr Used", 600.0, 4_000.0, 100.0, Currency, Operating),
            ParamKey::MaintNewBase => ("maintNewBase", "Maint - New (base)", 100.0, 2_000.0, 50.0, Currency, Operating),
            ParamKey::MaintCheapUsedBase => ("maintCheapUsedBase", "Maint - Cheap Used (base)", 300.0, 4_000.0, 100.0, Currency, Operating),
            ParamKey::Maint4yrUsedBase => ("maint4yrUsedBase", "Maint - 4yr Used (base)", 200.0, 3_000.0, 100.0, Currency, Operating),
            ParamKey::MaintIncreaseRate => ("maintIncreaseRate", "Maint Increase/Year", 0.0, 20.0, 1.0, Percent, Operating),
            ParamKey::MaintCapMult => ("maintCapMult", "Maint Cap", 2.0, 15.0, 0.5, Multiplier, Operating),
            ParamKey::FuelCostYear => ("fuelCostYear", "Annual Fuel Cost", 500.0, 5_000.0, 100.0, Currency, Operating),
            ParamKey::FuelPenaltyOld => ("fuelPenaltyOld", "Fuel Penalty (old)", 0.0, 40.0, 5.0, Percent, Operating),
            ParamKey::FuelPenaltyStart => ("fuelPenaltyStart", "Penalty Start Age", 5.0, 20.0, 1.0, Age, Operating),
            ParamKey::FuelPenaltyRamp => ("fuelPenaltyRamp", "Penalty Ramp Years", 1.0, 20.0, 1.0, Years, Operating),
            ParamKey::AnnualRegRate => ("annualRegRate", "Annual Reg. Rate", 5.0, 100.0, 5.0, Percent, Operating),
            ParamKey::InsAgeFactor1 => ("insAgeFactor1", "Ins. Factor (Age 6-10)", 50.0, 120.0, 5.0, Percent, Operating),
            ParamKey::InsAgeFactor2 => ("insAgeFactor2", "Ins. Factor (Age 11-15)", 40.0, 120.0, 5.0, Percent, Operating),
            ParamKey::InsAgeFactor3 => ("insAgeFactor3", "Ins. Factor (Age 16+)", 30.0, 120.0, 5.0, Percent, Operating),
            ParamKey::DownPaymentPct => ("downPaymentPct", "Down Payment", 0.0, 100.0, 5.0, Percent, Finance),
            ParamKey::LoanTermYears => ("loanTermYears", "Loan Term (New)", 2.0, 8.0, 1.0, Years, Finance),
            ParamKey::InterestRate => ("interestRate", "Interest Rate (New)", 0.0, 15.0, 0.5, Percent, Finance),
            ParamKey::UsedLoanTerm => ("usedLoanTerm", "Loan Term (Used)", 2.0, 7.0, 1.0, Years, Finance),
            ParamKey::UsedInterestRate => ("usedInterestRate", "Interest Rate (Used)", 0.0, 20.0, 0.5, Percent, Finance),
            ParamKey::Inflation => ("inflation", "Inflation Rate", 0.0, 8.0, 0.5, Percent, Finance),
            ParamKey::DiscountRate => ("discountRate", "Discount Rate", 0.0, 10.0, 0.5, Percent, Finance),
            ParamKey::IncludeTerminalValue => ("includeTerminalValue", "Include Terminal Value", 0.0, 1.0, 1.0, Boolean, Finance),
            ParamKey::Years => ("years", "Time Horizon", 10.0, 40.0, 5.0, Years, Finance),
        };

        ParamSpec {
            key,
            label,
            min,
            max,
            step,
            format,
            group,
        }
    }
}

pub fn param_specs() -> Vec<ParamSpec> {
    ParamKey::ALL.into_iter().map(ParamKey::spec).collect()
}
