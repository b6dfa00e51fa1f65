use serde::Serialize;
use tracing::{debug, trace};

use super::error::EngineError;
use super::params::ParameterSet;
use super::scenarios::scenario_config;
use super::types::{
    FuelPenaltyMode, ReplaceCycle, ScenarioConfig, ScenarioKey, ScenarioProjection, YearRecord,
};

#[derive(Debug, Default, Clone, Copy)]
struct LoanState {
    balance: f64,
    scheduled_annual_payment: f64,
}

impl LoanState {
    fn originate(amount_financed: f64, annual_rate: f64, term_years: f64) -> Self {
        Self {
            balance: amount_financed,
            scheduled_annual_payment: scheduled_annual_payment(
                amount_financed,
                annual_rate,
                term_years,
            ),
        }
    }

    fn pay_year(&mut self, annual_rate: f64) -> LoanYearPayment {
        if self.balance <= 0.0 {
            return LoanYearPayment::default();
        }

        let interest = self.balance * annual_rate / 100.0;
        let due = self.balance + interest;
        if self.scheduled_annual_payment >= due {
            // Final payment settles the loan; no overpayment.
            self.balance = 0.0;
            return LoanYearPayment {
                payment: due,
                interest,
            };
        }

        let principal = self.scheduled_annual_payment - interest;
        self.balance = (self.balance - principal).max(0.0);

        LoanYearPayment {
            payment: self.scheduled_annual_payment,
            interest,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct LoanYearPayment {
    payment: f64,
    interest: f64,
}

#[derive(Debug, Clone, Copy)]
struct OperatingCosts {
    insurance: f64,
    maintenance: f64,
    fuel: f64,
    registration: f64,
}

impl OperatingCosts {
    fn total(self) -> f64 {
        self.insurance + self.maintenance + self.fuel + self.registration
    }
}

#[derive(Debug, Clone, Copy)]
struct PurchaseYear {
    cash_cost: f64,
    finance_direct_cost: f64,
}

/// End-of-year loan position for the finance-mode series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanTracePoint {
    pub year: u32,
    pub payment: f64,
    pub interest: f64,
    pub end_balance: f64,
}

pub fn project(params: &ParameterSet, scenario: &str) -> Result<ScenarioProjection, EngineError> {
    let key = scenario.parse::<ScenarioKey>()?;
    project_scenario(params, key)
}

pub fn project_scenario(
    params: &ParameterSet,
    key: ScenarioKey,
) -> Result<ScenarioProjection, EngineError> {
    run_projection(params, scenario_config(key), None)
}

pub fn run_loan_trace(
    params: &ParameterSet,
    key: ScenarioKey,
) -> Result<Vec<LoanTracePoint>, EngineError> {
    let mut trace = Vec::with_capacity(params.years as usize);
    run_projection(params, scenario_config(key), Some(&mut trace))?;
    Ok(trace)
}

fn run_projection(
    params: &ParameterSet,
    config: &ScenarioConfig,
    mut trace: Option<&mut Vec<LoanTracePoint>>,
) -> Result<ScenarioProjection, EngineError> {
    check_inputs(params, config)?;
    debug!(scenario = %config.key, years = params.years, "projecting scenario");

    let mut cash = Vec::with_capacity(params.years as usize);
    let mut finance = Vec::with_capacity(params.years as usize);
    let mut cash_cumulative = 0.0;
    let mut finance_cumulative = 0.0;
    let mut loan = LoanState::default();
    let interest_rate = params.get(config.interest_rate_key);

    for year in 1..=params.years {
        let infl_mult = inflation_multiplier(params, year);
        let (vehicle_age, cycle_age) = vehicle_age(config, year);
        let is_replacement_year = year == 1 || cycle_age == Some(0);

        let purchase = if is_replacement_year {
            Some(buy_vehicle(params, config, year, infl_mult, &mut loan))
        } else {
            None
        };
        let cash_purchase = purchase.map(|p| p.cash_cost).unwrap_or(0.0);
        let finance_direct = purchase.map(|p| p.finance_direct_cost).unwrap_or(0.0);

        let loan_year = loan.pay_year(interest_rate);
        let operating = operating_costs(params, config, vehicle_age, infl_mult);

        let cash_annual = cash_purchase + operating.total();
        let finance_annual = finance_direct + loan_year.payment + operating.total();
        cash_cumulative += cash_annual;
        finance_cumulative += finance_annual;

        cash.push(year_record(
            year,
            cash_annual,
            cash_cumulative,
            operating,
            cash_purchase,
        ));
        finance.push(year_record(
            year,
            finance_annual,
            finance_cumulative,
            operating,
            finance_direct + loan_year.payment,
        ));

        if let Some(points) = trace.as_deref_mut() {
            points.push(LoanTracePoint {
                year,
                payment: loan_year.payment,
                interest: loan_year.interest,
                end_balance: loan.balance,
            });
        }
    }

    if params.include_terminal_value {
        let residual = round_money(terminal_value(params, config));
        for records in [&mut cash, &mut finance] {
            if let Some(last) = records.last_mut() {
                last.cumulative -= residual;
            }
        }
    }

    Ok(ScenarioProjection { cash, finance })
}

fn check_inputs(params: &ParameterSet, config: &ScenarioConfig) -> Result<(), EngineError> {
    params.validate()?;

    if params.down_payment_pct < 100.0 && params.get(config.loan_term_key) <= 0.0 {
        return Err(EngineError::InvalidParameter {
            key: config.loan_term_key.name(),
            reason: "loan term must be > 0 when financing".to_string(),
        });
    }

    Ok(())
}

fn inflation_multiplier(params: &ParameterSet, year: u32) -> f64 {
    (1.0 + params.inflation / 100.0).powi(year as i32 - 1)
}

/// Returns the vehicle's age and, for finite cycles, its position in the
/// current cycle.
fn vehicle_age(config: &ScenarioConfig, year: u32) -> (u32, Option<u32>) {
    match config.replace_cycle {
        ReplaceCycle::Never => (config.start_age + year - 1, None),
        ReplaceCycle::Finite(cycle) => {
            let cycle_age = (year - 1) % cycle;
            (config.start_age + cycle_age, Some(cycle_age))
        }
    }
}

fn buy_vehicle(
    params: &ParameterSet,
    config: &ScenarioConfig,
    year: u32,
    infl_mult: f64,
    loan: &mut LoanState,
) -> PurchaseYear {
    let base_price = params.get(config.base_purchase_key);
    let purchase_price = base_price * infl_mult;
    let total_purchase =
        purchase_price * (1.0 + params.sales_tax / 100.0) + params.reg_fees * infl_mult;
    let resale_income = previous_vehicle_resale(params, config, year);

    let net_equity = resale_income - loan.balance;
    *loan = LoanState::default();

    let finance_direct_cost = if params.down_payment_pct >= 100.0 {
        total_purchase - net_equity
    } else {
        let down_payment = total_purchase * params.down_payment_pct / 100.0;
        *loan = LoanState::originate(
            total_purchase - down_payment,
            params.get(config.interest_rate_key),
            params.get(config.loan_term_key),
        );
        down_payment - net_equity
    };

    trace!(
        scenario = %config.key,
        year,
        total_purchase,
        resale_income,
        net_equity,
        "vehicle purchase"
    );

    PurchaseYear {
        cash_cost: total_purchase - resale_income,
        finance_direct_cost,
    }
}

fn previous_vehicle_resale(params: &ParameterSet, config: &ScenarioConfig, year: u32) -> f64 {
    let (ReplaceCycle::Finite(cycle), Some(resale_key)) = (config.replace_cycle, config.resale_key)
    else {
        return 0.0;
    };
    if year <= cycle {
        return 0.0;
    }

    let previous_purchase_year = year - cycle;
    params.get(config.base_purchase_key)
        * inflation_multiplier(params, previous_purchase_year)
        * params.get(resale_key)
        / 100.0
}

/// Level annual payment for a loan quoted at `annual_rate` percent and
/// repaid monthly over `term_years`.
fn scheduled_annual_payment(amount_financed: f64, annual_rate: f64, term_years: f64) -> f64 {
    let monthly_rate = annual_rate / 100.0 / 12.0;
    let payments = term_years * 12.0;

    if monthly_rate > 0.0 {
        let growth = (1.0 + monthly_rate).powf(payments);
        let monthly_payment = amount_financed * monthly_rate * growth / (growth - 1.0);
        monthly_payment * 12.0
    } else {
        amount_financed / term_years
    }
}

fn operating_costs(
    params: &ParameterSet,
    config: &ScenarioConfig,
    vehicle_age: u32,
    infl_mult: f64,
) -> OperatingCosts {
    let insurance =
        params.get(config.insurance_key) * infl_mult * insurance_age_factor(params, vehicle_age);

    let maint_mult = (1.0 + params.maint_increase_rate / 100.0)
        .powi(vehicle_age as i32)
        .min(params.maint_cap_mult);
    let maintenance = params.get(config.maint_key) * infl_mult * maint_mult;

    let fuel =
        params.fuel_cost_year * infl_mult * fuel_penalty(params, config.fuel_penalty, vehicle_age);
    let registration = params.reg_fees * params.annual_reg_rate / 100.0 * infl_mult;

    OperatingCosts {
        insurance,
        maintenance,
        fuel,
        registration,
    }
}

fn insurance_age_factor(params: &ParameterSet, vehicle_age: u32) -> f64 {
    if vehicle_age >= 16 {
        params.ins_age_factor3 / 100.0
    } else if vehicle_age >= 11 {
        params.ins_age_factor2 / 100.0
    } else if vehicle_age >= 6 {
        params.ins_age_factor1 / 100.0
    } else {
        1.0
    }
}

fn fuel_penalty(params: &ParameterSet, mode: FuelPenaltyMode, vehicle_age: u32) -> f64 {
    let penalty_max = params.fuel_penalty_old / 100.0;
    match mode {
        FuelPenaltyMode::Flat { share } => 1.0 + penalty_max * share,
        FuelPenaltyMode::Ramped => {
            let years_over = vehicle_age as f64 - params.fuel_penalty_start;
            if years_over > 0.0 {
                1.0 + penalty_max * (years_over / params.fuel_penalty_ramp).min(1.0)
            } else {
                1.0
            }
        }
    }
}

/// Value of the vehicle still owned at the end of the horizon, by linear
/// depreciation from the inflated purchase price towards its resale value.
fn terminal_value(params: &ParameterSet, config: &ScenarioConfig) -> f64 {
    let ReplaceCycle::Finite(cycle) = config.replace_cycle else {
        return 0.0;
    };
    if params.years == 0 {
        return 0.0;
    }

    let final_year = params.years;
    let purchase_value =
        params.get(config.base_purchase_key) * inflation_multiplier(params, final_year);
    let resale_pct = config
        .resale_key
        .map(|key| params.get(key) / 100.0)
        .unwrap_or(0.0);
    let resale_value = purchase_value * resale_pct;
    let age_at_end = (final_year - 1) % cycle + 1;

    purchase_value - (purchase_value - resale_value) * (age_at_end as f64 / cycle as f64)
}

fn year_record(
    year: u32,
    annual: f64,
    cumulative: f64,
    operating: OperatingCosts,
    purchase: f64,
) -> YearRecord {
    YearRecord {
        year,
        annual: round_money(annual),
        cumulative: round_money(cumulative),
        insurance: round_money(operating.insurance),
        maintenance: round_money(operating.maintenance),
        fuel: round_money(operating.fuel),
        purchase: round_money(purchase),
    }
}

/// Rounds half-way cases towards positive infinity.
fn round_money(value: f64) -> f64 {
    (value + 0.5).floor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::params::ParamKey;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn flat_params() -> ParameterSet {
        ParameterSet {
            inflation: 0.0,
            include_terminal_value: false,
            years: 12,
            ..ParameterSet::default()
        }
    }

    fn assert_cumulative_consistent(records: &[YearRecord]) {
        let mut running = 0.0;
        for record in records {
            running += record.annual;
            assert_approx_tol(record.cumulative, running, records.len() as f64);
        }
    }

    #[test]
    fn unknown_scenario_is_rejected() {
        let err = project(&ParameterSet::default(), "leaseForever").expect_err("must fail");
        assert_eq!(err, EngineError::UnknownScenario("leaseForever".to_string()));
    }

    #[test]
    fn invalid_parameter_fails_before_any_record() {
        let mut params = ParameterSet::default();
        params.fuel_cost_year = f64::NAN;
        let err = project(&params, "new4yr").expect_err("must fail");
        assert!(matches!(
            err,
            EngineError::InvalidParameter {
                key: "fuelCostYear",
                ..
            }
        ));
    }

    #[test]
    fn zero_loan_term_is_rejected_only_when_financing() {
        let mut params = flat_params();
        params.used_loan_term = 0.0;
        let err = project_scenario(&params, ScenarioKey::CheapUsed).expect_err("must fail");
        assert!(matches!(
            err,
            EngineError::InvalidParameter {
                key: "usedLoanTerm",
                ..
            }
        ));

        params.down_payment_pct = 100.0;
        project_scenario(&params, ScenarioKey::CheapUsed).expect("cash purchase needs no term");
        project_scenario(&ParameterSet::default(), ScenarioKey::New4yr).expect("defaults");
    }

    #[test]
    fn keep_forever_single_year_purchase_component() {
        let params = ParameterSet {
            years: 1,
            inflation: 0.0,
            new_car_price: 38_000.0,
            sales_tax: 7.0,
            reg_fees: 500.0,
            include_terminal_value: true,
            ..ParameterSet::default()
        };
        let result = project(&params, "newForever").expect("valid scenario");

        assert_eq!(result.cash.len(), 1);
        let year = &result.cash[0];
        assert_approx(year.purchase, 41_160.0);
        assert_approx(year.insurance, 2_000.0);
        assert_approx(year.maintenance, 400.0);
        assert_approx(year.fuel, 2_000.0);
        // 41160 purchase + 2000 + 400 + 2000 + 150 registration
        assert_approx(year.annual, 45_710.0);
        assert_approx(year.cumulative, year.annual);
    }

    #[test]
    fn zero_interest_loan_splits_principal_evenly() {
        assert_approx(scheduled_annual_payment(20_000.0, 0.0, 5.0), 4_000.0);

        let params = ParameterSet {
            new_car_price: 25_000.0,
            sales_tax: 0.0,
            reg_fees: 0.0,
            interest_rate: 0.0,
            down_payment_pct: 20.0,
            ..flat_params()
        };
        let trace = run_loan_trace(&params, ScenarioKey::NewForever).expect("valid");
        for point in &trace[..5] {
            assert_approx(point.payment, 4_000.0);
            assert_approx(point.interest, 0.0);
        }
        assert_approx(trace[4].end_balance, 0.0);
        assert_approx(trace[5].payment, 0.0);

        let result = project_scenario(&params, ScenarioKey::NewForever).expect("valid");
        assert_approx(result.finance[0].purchase, 9_000.0);
        assert_approx(result.finance[1].purchase, 4_000.0);
        assert_approx(result.finance[5].purchase, 0.0);
    }

    #[test]
    fn amortized_payment_matches_standard_formula() {
        // 30k at 6.5% over 60 months is 586.98 per month.
        let annual = scheduled_annual_payment(30_000.0, 6.5, 5.0);
        assert_approx_tol(annual / 12.0, 586.98, 0.01);
    }

    #[test]
    fn full_down_payment_mirrors_cash_mode() {
        let params = ParameterSet {
            down_payment_pct: 100.0,
            years: 25,
            ..ParameterSet::default()
        };
        for key in ScenarioKey::ALL {
            let result = project_scenario(&params, key).expect("valid");
            assert_eq!(result.cash, result.finance, "{key} diverged");
            let trace = run_loan_trace(&params, key).expect("valid");
            assert!(trace.iter().all(|p| p.payment == 0.0 && p.end_balance == 0.0));
        }
    }

    #[test]
    fn replacement_years_follow_cycle() {
        let params = flat_params();
        let result = project_scenario(&params, ScenarioKey::New4yr).expect("valid");
        let purchase_years = result
            .cash
            .iter()
            .filter(|r| r.purchase != 0.0)
            .map(|r| r.year)
            .collect::<Vec<_>>();
        assert_eq!(purchase_years, vec![1, 5, 9]);

        let forever = project_scenario(&params, ScenarioKey::NewForever).expect("valid");
        assert!(forever.cash[1..].iter().all(|r| r.purchase == 0.0));
    }

    #[test]
    fn resale_income_offsets_replacement_purchase() {
        let params = flat_params();
        let result = project_scenario(&params, ScenarioKey::New4yr).expect("valid");
        let total_purchase: f64 = 38_000.0 * 1.07 + 500.0;
        let resale = 38_000.0 * 0.45;
        assert_approx(result.cash[0].purchase, total_purchase.round());
        assert_approx(result.cash[4].purchase, (total_purchase - resale).round());
    }

    #[test]
    fn resale_uses_inflation_at_previous_purchase() {
        let params = ParameterSet {
            inflation: 3.0,
            include_terminal_value: false,
            years: 11,
            ..ParameterSet::default()
        };
        let result = project_scenario(&params, ScenarioKey::CheapUsed).expect("valid");
        let infl_year_11 = 1.03_f64.powi(10);
        let total_purchase = 8_000.0 * infl_year_11 * 1.07 + 500.0 * infl_year_11;
        let resale = 8_000.0 * 0.15;
        assert_approx(result.cash[10].purchase, round_money(total_purchase - resale));
    }

    #[test]
    fn finance_replacement_clears_outstanding_balance_from_equity() {
        // 5 year loan on a 4 year cycle leaves a balance at trade-in.
        let params = flat_params();
        let trace = run_loan_trace(&params, ScenarioKey::New4yr).expect("valid");
        let owed_at_trade_in = trace[3].end_balance;
        assert!(owed_at_trade_in > 0.0);

        let result = project_scenario(&params, ScenarioKey::New4yr).expect("valid");
        let total_purchase: f64 = 38_000.0 * 1.07 + 500.0;
        let down_payment = total_purchase * 0.20;
        let resale = 38_000.0 * 0.45;
        let expected_direct = down_payment - (resale - owed_at_trade_in);
        let expected = expected_direct + trace[4].payment;
        assert_approx_tol(result.finance[4].purchase, expected, 0.5 + EPS);
    }

    #[test]
    fn loan_balance_never_negative_and_clears_before_next_purchase() {
        let params = ParameterSet {
            years: 30,
            ..ParameterSet::default()
        };
        for key in [ScenarioKey::New10yr, ScenarioKey::CheapUsed, ScenarioKey::FourYrUsed] {
            let trace = run_loan_trace(&params, key).expect("valid");
            assert!(trace.iter().all(|p| p.end_balance >= 0.0));
            for year_before_replacement in [9_usize, 19, 29] {
                assert_eq!(
                    trace[year_before_replacement - 1].end_balance,
                    0.0,
                    "{key} still owes in year {year_before_replacement}"
                );
            }
        }
    }

    #[test]
    fn final_loan_payment_is_capped() {
        let params = ParameterSet {
            years: 10,
            ..flat_params()
        };
        let trace = run_loan_trace(&params, ScenarioKey::New10yr).expect("valid");
        let scheduled = trace[0].payment;
        let last_paying = trace
            .iter()
            .rev()
            .find(|p| p.payment > 0.0)
            .expect("loan has payments");
        assert!(last_paying.payment < scheduled);
        assert_eq!(last_paying.end_balance, 0.0);
    }

    #[test]
    fn insurance_steps_with_vehicle_age() {
        let params = ParameterSet {
            years: 20,
            ..flat_params()
        };
        let result = project_scenario(&params, ScenarioKey::NewForever).expect("valid");
        // Keep-forever vehicle age is year - 1.
        assert_approx(result.cash[5].insurance, 2_000.0);
        assert_approx(result.cash[6].insurance, 1_700.0);
        assert_approx(result.cash[10].insurance, 1_700.0);
        assert_approx(result.cash[11].insurance, 1_400.0);
        assert_approx(result.cash[15].insurance, 1_400.0);
        assert_approx(result.cash[16].insurance, 1_200.0);
        assert_approx(result.cash[19].insurance, 1_200.0);
    }

    #[test]
    fn maintenance_compounds_until_cap() {
        let params = ParameterSet {
            years: 40,
            ..flat_params()
        };
        let result = project_scenario(&params, ScenarioKey::NewForever).expect("valid");
        assert_approx(result.cash[1].maintenance, round_money(400.0 * 1.08));
        // 1.08^28 > 8, so the cap holds from there on.
        assert_approx(result.cash[39].maintenance, 400.0 * 8.0);
        assert_approx(result.cash[30].maintenance, 400.0 * 8.0);
    }

    #[test]
    fn fuel_penalty_modes() {
        let params = ParameterSet {
            years: 25,
            ..flat_params()
        };
        let cheap = project_scenario(&params, ScenarioKey::CheapUsed).expect("valid");
        assert_approx(cheap.cash[0].fuel, 2_000.0 * 1.15);
        let four = project_scenario(&params, ScenarioKey::FourYrUsed).expect("valid");
        assert_approx(four.cash[0].fuel, 2_000.0 * 1.075);

        let forever = project_scenario(&params, ScenarioKey::NewForever).expect("valid");
        // Age 10 is the start age: no penalty yet.
        assert_approx(forever.cash[10].fuel, 2_000.0);
        // Age 15: half way through a ten year ramp.
        assert_approx(forever.cash[15].fuel, 2_000.0 * 1.075);
        // Age 20 and beyond: capped at the full penalty.
        assert_approx(forever.cash[20].fuel, 2_000.0 * 1.15);
        assert_approx(forever.cash[24].fuel, 2_000.0 * 1.15);
    }

    #[test]
    fn terminal_value_at_cycle_boundary_equals_resale_value() {
        let mut params = ParameterSet {
            years: 8,
            inflation: 3.0,
            include_terminal_value: false,
            ..ParameterSet::default()
        };
        let without = project_scenario(&params, ScenarioKey::New4yr).expect("valid");
        params.include_terminal_value = true;
        let with = project_scenario(&params, ScenarioKey::New4yr).expect("valid");

        let resale = round_money(38_000.0 * 1.03_f64.powi(7) * 0.45);
        assert_approx(with.cash[7].cumulative, without.cash[7].cumulative - resale);
        assert_approx(
            with.finance[7].cumulative,
            without.finance[7].cumulative - resale,
        );
        assert_eq!(with.cash[..7], without.cash[..7]);
        assert_approx(with.cash[7].annual, without.cash[7].annual);
    }

    #[test]
    fn terminal_value_interpolates_mid_cycle() {
        let mut params = ParameterSet {
            years: 6,
            ..flat_params()
        };
        let without = project_scenario(&params, ScenarioKey::New4yr).expect("valid");
        params.include_terminal_value = true;
        let with = project_scenario(&params, ScenarioKey::New4yr).expect("valid");

        // Year 6 ends the second year of the second car.
        let residual = 38_000.0 - (38_000.0 - 17_100.0) * 0.5;
        assert_approx(with.cash[5].cumulative, without.cash[5].cumulative - residual);
    }

    #[test]
    fn keep_forever_has_no_terminal_credit() {
        let mut params = flat_params();
        let without = project_scenario(&params, ScenarioKey::NewForever).expect("valid");
        params.include_terminal_value = true;
        let with = project_scenario(&params, ScenarioKey::NewForever).expect("valid");
        assert_eq!(with, without);
    }

    #[test]
    fn zero_year_horizon_is_empty() {
        let params = ParameterSet {
            years: 0,
            ..ParameterSet::default()
        };
        let result = project_scenario(&params, ScenarioKey::New4yr).expect("valid");
        assert!(result.cash.is_empty());
        assert!(result.finance.is_empty());
    }

    #[test]
    fn cumulative_uses_unrounded_running_total() {
        let params = ParameterSet {
            new_car_price: 38_000.3,
            fuel_cost_year: 2_000.3,
            include_terminal_value: false,
            years: 10,
            ..ParameterSet::default()
        };
        let result = project_scenario(&params, ScenarioKey::NewForever).expect("valid");
        let mut unrounded = 0.0;
        for year in 1..=params.years {
            let infl = inflation_multiplier(&params, year);
            let (age, _) = vehicle_age(scenario_config(ScenarioKey::NewForever), year);
            let operating =
                operating_costs(&params, scenario_config(ScenarioKey::NewForever), age, infl);
            unrounded += operating.total();
            if year == 1 {
                unrounded += 38_000.3 * 1.07 + 500.0;
            }
        }
        assert_approx(result.cash[9].cumulative, round_money(unrounded));
    }

    #[test]
    fn round_money_rounds_halves_up() {
        assert_approx(round_money(2.5), 3.0);
        assert_approx(round_money(-2.5), -2.0);
        assert_approx(round_money(-2.6), -3.0);
    }

    #[test]
    fn set_through_param_key_feeds_engine() {
        let mut params = flat_params();
        params.set(ParamKey::InsuranceCheapUsed, 1_000.0).expect("valid");
        let result = project_scenario(&params, ScenarioKey::CheapUsed).expect("valid");
        // Cheap used cars start at age 8.
        assert_approx(result.cash[0].insurance, 850.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_projection_shape_and_determinism(
            scenario_idx in 0usize..5,
            years in 0u32..45,
            inflation_bp in 0u32..800,
            down_payment in 0u32..=100,
            interest_bp in 0u32..1500,
            term in 1u32..9,
            include_terminal in proptest::bool::ANY,
        ) {
            let params = ParameterSet {
                years,
                inflation: inflation_bp as f64 / 100.0,
                down_payment_pct: down_payment as f64,
                interest_rate: interest_bp as f64 / 100.0,
                used_interest_rate: interest_bp as f64 / 100.0,
                loan_term_years: term as f64,
                used_loan_term: term as f64,
                include_terminal_value: include_terminal,
                ..ParameterSet::default()
            };
            let key = ScenarioKey::ALL[scenario_idx];
            let first = project_scenario(&params, key).expect("valid");
            let second = project_scenario(&params, key).expect("valid");
            prop_assert_eq!(&first, &second);

            for records in [&first.cash, &first.finance] {
                prop_assert_eq!(records.len(), years as usize);
                for (idx, record) in records.iter().enumerate() {
                    prop_assert_eq!(record.year, idx as u32 + 1);
                    prop_assert!(record.annual.is_finite());
                    prop_assert!(record.cumulative.is_finite());
                }
            }
        }

        #[test]
        fn prop_cumulative_tracks_annual_before_terminal_adjustment(
            scenario_idx in 0usize..5,
            years in 1u32..41,
            inflation_bp in 0u32..800,
            down_payment in 0u32..=100,
        ) {
            let params = ParameterSet {
                years,
                inflation: inflation_bp as f64 / 100.0,
                down_payment_pct: down_payment as f64,
                include_terminal_value: false,
                ..ParameterSet::default()
            };
            let result = project_scenario(&params, ScenarioKey::ALL[scenario_idx]).expect("valid");
            assert_cumulative_consistent(&result.cash);
            assert_cumulative_consistent(&result.finance);
        }

        #[test]
        fn prop_loan_balance_stays_non_negative(
            scenario_idx in 0usize..5,
            years in 1u32..41,
            down_payment in 0u32..100,
            interest_bp in 0u32..2000,
            term in 1u32..9,
        ) {
            let params = ParameterSet {
                years,
                down_payment_pct: down_payment as f64,
                interest_rate: interest_bp as f64 / 100.0,
                used_interest_rate: interest_bp as f64 / 100.0,
                loan_term_years: term as f64,
                used_loan_term: term as f64,
                ..ParameterSet::default()
            };
            let key = ScenarioKey::ALL[scenario_idx];
            let trace = run_loan_trace(&params, key).expect("valid");
            prop_assert_eq!(trace.len(), years as usize);
            for point in &trace {
                prop_assert!(point.end_balance >= 0.0);
                prop_assert!(point.payment >= 0.0);
            }
        }
    }
}
