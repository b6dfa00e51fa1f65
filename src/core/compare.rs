use super::engine::project_scenario;
use super::error::EngineError;
use super::params::ParameterSet;
use super::scenarios::scenario_config;
use super::types::{
    ChartKind, ChartRow, ChartValue, Comparison, PaymentMode, ScenarioKey, ScenarioProjection,
    ScenarioSummary,
};

pub fn project_all(
    params: &ParameterSet,
) -> Result<Vec<(ScenarioKey, ScenarioProjection)>, EngineError> {
    ScenarioKey::ALL
        .into_iter()
        .map(|key| project_scenario(params, key).map(|projection| (key, projection)))
        .collect()
}

pub fn compare(params: &ParameterSet, mode: PaymentMode) -> Result<Comparison, EngineError> {
    let projections = project_all(params)?;
    Ok(Comparison {
        mode,
        years: params.years,
        ranking: rank_scenarios(&projections, mode, params.years),
    })
}

/// Orders scenarios from cheapest to most expensive lifetime cost. Ties keep
/// the canonical scenario order.
pub fn rank_scenarios(
    projections: &[(ScenarioKey, ScenarioProjection)],
    mode: PaymentMode,
    years: u32,
) -> Vec<ScenarioSummary> {
    let mut totals = projections
        .iter()
        .map(|(key, projection)| (*key, projection.total_cost(mode)))
        .collect::<Vec<_>>();
    totals.sort_by(|a, b| a.1.total_cmp(&b.1));

    let cheapest = totals.first().map(|(_, total)| *total).unwrap_or(0.0);
    totals
        .into_iter()
        .enumerate()
        .map(|(idx, (key, total_cost))| ScenarioSummary {
            scenario: key,
            label: scenario_config(key).label,
            rank: idx + 1,
            total_cost,
            avg_annual: if years == 0 {
                0.0
            } else {
                total_cost / years as f64
            },
            diff_from_cheapest: total_cost - cheapest,
        })
        .collect()
}

pub fn chart_rows(
    projections: &[(ScenarioKey, ScenarioProjection)],
    mode: PaymentMode,
    kind: ChartKind,
) -> Vec<ChartRow> {
    let year_count = projections
        .iter()
        .map(|(_, projection)| projection.records(mode).len())
        .min()
        .unwrap_or(0);

    (0..year_count)
        .map(|idx| ChartRow {
            year: idx as u32 + 1,
            values: projections
                .iter()
                .map(|(key, projection)| {
                    let record = &projection.records(mode)[idx];
                    ChartValue {
                        scenario: *key,
                        value: match kind {
                            ChartKind::Cumulative => record.cumulative,
                            ChartKind::Annual => record.annual,
                        },
                    }
                })
                .collect(),
        })
        .collect()
}
