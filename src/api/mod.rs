use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::{AppConfig, ConfigError};
use crate::core::{
    ChartKind, ChartRow, EngineError, LoanTracePoint, ParamKey, ParamSpec, ParameterSet,
    PaymentMode, ScenarioKey, ScenarioSummary, SnapshotError, YearRecord, apply_overrides,
    chart_rows, load_snapshot_file, param_specs, project_all, project_scenario, rank_scenarios,
    run_loan_trace, save_snapshot_file, scenario_config,
};
use crate::telemetry::{self, TelemetryError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("{0}")]
    Usage(String),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliPaymentMode {
    Cash,
    Finance,
}

impl From<CliPaymentMode> for PaymentMode {
    fn from(value: CliPaymentMode) -> Self {
        match value {
            CliPaymentMode::Cash => PaymentMode::Cash,
            CliPaymentMode::Finance => PaymentMode::Finance,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiPaymentMode {
    #[serde(alias = "CASH")]
    Cash,
    #[serde(alias = "financed", alias = "loan")]
    Finance,
}

impl From<ApiPaymentMode> for PaymentMode {
    fn from(value: ApiPaymentMode) -> Self {
        match value {
            ApiPaymentMode::Cash => PaymentMode::Cash,
            ApiPaymentMode::Finance => PaymentMode::Finance,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "carcost",
    about = "Vehicle lifetime cost projection across five acquisition strategies",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP API (default command)
    Serve(ServeArgs),
    /// Print the year-by-year projection for one scenario
    Project(ProjectArgs),
    /// Rank all scenarios by lifetime cost
    Compare(CompareArgs),
    /// Write the default parameter snapshot as JSON
    ExportDefaults {
        #[arg(long, help = "Write to this file instead of stdout")]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    #[arg(long, help = "Override CARCOST_HOST")]
    host: Option<String>,
    #[arg(long, help = "Override CARCOST_PORT")]
    port: Option<u16>,
}

#[derive(Args, Debug, Default, Clone)]
struct ParamArgs {
    #[arg(long, help = "Parameter snapshot (JSON) merged over the defaults")]
    config: Option<PathBuf>,
    #[arg(
        long = "set",
        value_name = "KEY=VALUE",
        help = "Override a single parameter, e.g. --set inflation=2.5"
    )]
    overrides: Vec<String>,
}

#[derive(Args, Debug)]
struct ProjectArgs {
    #[arg(long, help = "One of new4yr, new10yr, newForever, cheapUsed, fourYrUsed")]
    scenario: String,
    #[arg(long, value_enum, default_value_t = CliPaymentMode::Cash)]
    mode: CliPaymentMode,
    #[arg(long, help = "Print JSON instead of a table")]
    json: bool,
    #[command(flatten)]
    params: ParamArgs,
}

#[derive(Args, Debug)]
struct CompareArgs {
    #[arg(long, value_enum, default_value_t = CliPaymentMode::Cash)]
    mode: CliPaymentMode,
    #[arg(long, help = "Print JSON instead of a table")]
    json: bool,
    #[command(flatten)]
    params: ParamArgs,
}

pub async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match cli.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => serve(config, args).await,
        Command::Project(args) => run_project_command(args),
        Command::Compare(args) => run_compare_command(args),
        Command::ExportDefaults { output } => {
            let defaults = ParameterSet::default();
            match output {
                Some(path) => save_snapshot_file(&defaults, &path)?,
                None => println!("{}", crate::core::export_snapshot(&defaults)?),
            }
            Ok(())
        }
    }
}

fn build_params(args: &ParamArgs) -> Result<ParameterSet, AppError> {
    let mut params = ParameterSet::default();
    if let Some(path) = &args.config {
        load_snapshot_file(&mut params, path)?;
    }
    apply_cli_overrides(&mut params, &args.overrides).map_err(AppError::Usage)?;
    params.validate()?;
    Ok(params)
}

fn apply_cli_overrides(params: &mut ParameterSet, overrides: &[String]) -> Result<(), String> {
    for raw in overrides {
        let Some((name, value)) = raw.split_once('=') else {
            return Err(format!("--set expects KEY=VALUE, got '{raw}'"));
        };
        let name = name.trim();
        let Some(key) = ParamKey::from_name(name) else {
            return Err(format!("--set: unknown parameter '{name}'"));
        };
        let value = value
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("--set {name} must be numeric, got '{}'", value.trim()))?;
        params.set(key, value).map_err(|e| e.to_string())?;
    }
    Ok(())
}

fn run_project_command(args: ProjectArgs) -> Result<(), AppError> {
    let params = build_params(&args.params)?;
    let key = args.scenario.parse::<ScenarioKey>()?;
    let response = build_project_response(&params, key)?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&response).map_err(SnapshotError::from)?
        );
        return Ok(());
    }

    let records = match PaymentMode::from(args.mode) {
        PaymentMode::Cash => &response.cash,
        PaymentMode::Finance => &response.finance,
    };
    println!("{} ({:?})", response.label, args.mode);
    println!(
        "{:>4} {:>10} {:>12} {:>9} {:>11} {:>8} {:>10}",
        "year", "annual", "cumulative", "insurance", "maintenance", "fuel", "purchase"
    );
    for r in records {
        println!(
            "{:>4} {:>10} {:>12} {:>9} {:>11} {:>8} {:>10}",
            r.year, r.annual, r.cumulative, r.insurance, r.maintenance, r.fuel, r.purchase
        );
    }
    Ok(())
}

fn run_compare_command(args: CompareArgs) -> Result<(), AppError> {
    let params = build_params(&args.params)?;
    let response = build_compare_response(&params, args.mode.into())?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&response).map_err(SnapshotError::from)?
        );
        return Ok(());
    }

    println!("{} years, {:?}", response.years, args.mode);
    for s in &response.ranking {
        println!(
            "#{} {:<20} total {:>10} avg/yr {:>8} +{}",
            s.rank,
            s.label,
            s.total_cost,
            s.avg_annual.round(),
            s.diff_from_cheapest
        );
    }
    Ok(())
}

#[derive(Debug)]
struct ProjectRequest {
    params: ParameterSet,
    scenario: ScenarioKey,
}

#[derive(Debug)]
struct CompareRequest {
    params: ParameterSet,
    mode: PaymentMode,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    scenario: ScenarioKey,
    label: &'static str,
    cash: Vec<YearRecord>,
    finance: Vec<YearRecord>,
    loan: Vec<LoanTracePoint>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompareResponse {
    mode: PaymentMode,
    years: u32,
    ranking: Vec<ScenarioSummary>,
    cumulative: Vec<ChartRow>,
    annual: Vec<ChartRow>,
}

#[derive(Debug, Serialize)]
struct ScenarioInfo {
    key: ScenarioKey,
    label: &'static str,
}

#[derive(Debug, Serialize)]
struct ParamsResponse {
    defaults: ParameterSet,
    params: Vec<ParamSpec>,
    scenarios: Vec<ScenarioInfo>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router() -> Router {
    Router::new()
        .route("/api/params", get(params_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route(
            "/api/compare",
            get(compare_get_handler).post(compare_post_handler),
        )
        .fallback(not_found_handler)
}

async fn serve(mut config: AppConfig, args: ServeArgs) -> Result<(), AppError> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    run_http_server(&config).await
}

pub async fn run_http_server(config: &AppConfig) -> Result<(), AppError> {
    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "car cost API listening");

    axum::serve(listener, router()).await?;
    Ok(())
}

async fn params_handler() -> Response {
    let response = ParamsResponse {
        defaults: ParameterSet::default(),
        params: param_specs(),
        scenarios: ScenarioKey::ALL
            .into_iter()
            .map(|key| ScenarioInfo {
                key,
                label: scenario_config(key).label,
            })
            .collect(),
    };
    json_response(StatusCode::OK, response)
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Response {
    match query {
        Ok(Query(query)) => project_handler_impl(query_to_object(query)),
        Err(rejection) => rejected_payload(rejection.body_text()),
    }
}

async fn project_post_handler(
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => project_handler_impl(payload),
        Err(rejection) => rejected_payload(rejection.body_text()),
    }
}

async fn compare_get_handler(
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Response {
    match query {
        Ok(Query(query)) => compare_handler_impl(query_to_object(query)),
        Err(rejection) => rejected_payload(rejection.body_text()),
    }
}

async fn compare_post_handler(
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => compare_handler_impl(payload),
        Err(rejection) => rejected_payload(rejection.body_text()),
    }
}

fn rejected_payload(msg: String) -> Response {
    warn!(error = %msg, "rejected malformed request");
    error_response(StatusCode::BAD_REQUEST, &msg)
}

fn project_handler_impl(payload: Map<String, Value>) -> Response {
    let request = match project_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            warn!(error = %msg, "rejected projection request");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    match build_project_response(&request.params, request.scenario) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    }
}

fn compare_handler_impl(payload: Map<String, Value>) -> Response {
    let request = match compare_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            warn!(error = %msg, "rejected comparison request");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    match build_compare_response(&request.params, request.mode) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

/// Query strings carry every value as text; numeric-looking values become
/// JSON numbers so both verbs share one request builder.
fn query_to_object(query: HashMap<String, String>) -> Map<String, Value> {
    query
        .into_iter()
        .map(|(key, raw)| {
            let value = match raw.trim() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                trimmed => match trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                {
                    Some(number) => Value::Number(number),
                    None => Value::String(raw.clone()),
                },
            };
            (key, value)
        })
        .collect()
}

fn params_from_payload(payload: &Map<String, Value>) -> Result<ParameterSet, String> {
    let mut params = ParameterSet::default();
    apply_overrides(&mut params, payload).map_err(|e| e.to_string())?;
    params.validate().map_err(|e| e.to_string())?;
    Ok(params)
}

fn project_request_from_payload(payload: Map<String, Value>) -> Result<ProjectRequest, String> {
    let scenario = match payload.get("scenario") {
        Some(Value::String(name)) => name.parse::<ScenarioKey>().map_err(|e| e.to_string())?,
        Some(other) => return Err(format!("scenario must be a string, got {other}")),
        None => return Err("scenario is required".to_string()),
    };
    let params = params_from_payload(&payload)?;
    Ok(ProjectRequest { params, scenario })
}

fn compare_request_from_payload(payload: Map<String, Value>) -> Result<CompareRequest, String> {
    let mode = match payload.get("mode") {
        Some(value) => serde_json::from_value::<ApiPaymentMode>(value.clone())
            .map_err(|_| format!("mode must be 'cash' or 'finance', got {value}"))?
            .into(),
        None => PaymentMode::Cash,
    };
    let params = params_from_payload(&payload)?;
    Ok(CompareRequest { params, mode })
}

fn build_project_response(
    params: &ParameterSet,
    scenario: ScenarioKey,
) -> Result<ProjectResponse, EngineError> {
    let projection = project_scenario(params, scenario)?;
    let loan = run_loan_trace(params, scenario)?;
    Ok(ProjectResponse {
        scenario,
        label: scenario_config(scenario).label,
        cash: projection.cash,
        finance: projection.finance,
        loan,
    })
}

fn build_compare_response(
    params: &ParameterSet,
    mode: PaymentMode,
) -> Result<CompareResponse, EngineError> {
    let projections = project_all(params)?;
    Ok(CompareResponse {
        mode,
        years: params.years,
        ranking: rank_scenarios(&projections, mode, params.years),
        cumulative: chart_rows(&projections, mode, ChartKind::Cumulative),
        annual: chart_rows(&projections, mode, ChartKind::Annual),
    })
}
