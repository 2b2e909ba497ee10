use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Datelike, Local, NaiveDate};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    Asset, DEFAULT_THRESHOLDS, DividendRecord, DoublingMode, DoublingTimeSummary, FireMetrics,
    NetWorthPoint, PlannedFireMetrics, ProjectionResult, Scenario, ScenarioSet, YieldMetrics,
    analyze_doubling_time, calculate_current_yield_metrics, calculate_fire_metrics,
    calculate_fire_projection, calculate_planned_fire_metrics, calculate_yoc_metrics,
    default_scenarios,
};

pub const MAX_HORIZON_YEARS: i64 = 100;

#[derive(Args, Debug, Clone)]
pub struct MetricsArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub net_worth: f64,
    #[arg(long)]
    pub annual_expenses: f64,
    #[arg(long, default_value_t = 4.0, help = "Safe withdrawal rate in percent")]
    pub withdrawal_rate: f64,
    #[arg(long, help = "Planned annual expenses once retired")]
    pub planned_expenses: Option<f64>,
}

#[derive(Args, Debug, Clone)]
pub struct ProjectionArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub net_worth: f64,
    #[arg(long)]
    pub annual_expenses: f64,
    #[arg(long)]
    pub annual_savings: f64,
    #[arg(long, default_value_t = 4.0, help = "Safe withdrawal rate in percent")]
    pub withdrawal_rate: f64,
    #[arg(long, default_value_t = 50, allow_negative_numbers = true)]
    pub horizon_years: i64,
    #[arg(long, allow_negative_numbers = true, help = "Bear scenario growth in percent")]
    pub bear_growth: Option<f64>,
    #[arg(long, help = "Bear scenario inflation in percent")]
    pub bear_inflation: Option<f64>,
    #[arg(long, help = "Base scenario growth in percent")]
    pub base_growth: Option<f64>,
    #[arg(long, help = "Base scenario inflation in percent")]
    pub base_inflation: Option<f64>,
    #[arg(long, help = "Bull scenario growth in percent")]
    pub bull_growth: Option<f64>,
    #[arg(long, help = "Bull scenario inflation in percent")]
    pub bull_inflation: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct MetricsPayload {
    net_worth: Option<f64>,
    annual_expenses: Option<f64>,
    withdrawal_rate: Option<f64>,
    planned_expenses: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectionPayload {
    net_worth: Option<f64>,
    annual_expenses: Option<f64>,
    annual_savings: Option<f64>,
    withdrawal_rate: Option<f64>,
    horizon_years: Option<i64>,
    scenarios: Option<Vec<Scenario>>,
    bear_growth: Option<f64>,
    bear_inflation: Option<f64>,
    base_growth: Option<f64>,
    base_inflation: Option<f64>,
    bull_growth: Option<f64>,
    bull_inflation: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct YieldPayload {
    dividends: Vec<DividendRecord>,
    assets: Vec<Asset>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    number_of_months: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DoublingPayload {
    snapshots: Vec<NetWorthPoint>,
    mode: Option<DoublingMode>,
    thresholds: Option<Vec<f64>>,
}

#[derive(Debug)]
struct ProjectionRequest {
    net_worth: f64,
    annual_expenses: f64,
    annual_savings: f64,
    withdrawal_rate: f64,
    horizon_years: u32,
    scenarios: ScenarioSet,
}

#[derive(Debug, PartialEq)]
struct ReportingWindow {
    start_date: NaiveDate,
    end_date: NaiveDate,
    number_of_months: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    metrics: FireMetrics,
    planned: Option<PlannedFireMetrics>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct YieldResponse {
    yield_on_cost: YieldMetrics,
    current_yield: YieldMetrics,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn default_metrics_args() -> MetricsArgs {
    MetricsArgs {
        net_worth: 100_000.0,
        annual_expenses: 30_000.0,
        withdrawal_rate: 4.0,
        planned_expenses: None,
    }
}

fn default_projection_args() -> ProjectionArgs {
    ProjectionArgs {
        net_worth: 100_000.0,
        annual_expenses: 30_000.0,
        annual_savings: 20_000.0,
        withdrawal_rate: 4.0,
        horizon_years: 50,
        bear_growth: None,
        bear_inflation: None,
        base_growth: None,
        base_inflation: None,
        bull_growth: None,
        bull_inflation: None,
    }
}

fn ensure_finite(name: &str, value: f64) -> Result<(), String> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(format!("{name} must be a finite number"))
    }
}

pub fn run_metrics(args: MetricsArgs) -> Result<MetricsResponse, String> {
    ensure_finite("--net-worth", args.net_worth)?;
    ensure_finite("--annual-expenses", args.annual_expenses)?;
    ensure_finite("--withdrawal-rate", args.withdrawal_rate)?;
    if args.annual_expenses < 0.0 {
        return Err("--annual-expenses must be >= 0".to_string());
    }
    if !(0.0..=100.0).contains(&args.withdrawal_rate) {
        return Err("--withdrawal-rate must be between 0 and 100".to_string());
    }
    if let Some(planned) = args.planned_expenses {
        ensure_finite("--planned-expenses", planned)?;
        if planned < 0.0 {
            return Err("--planned-expenses must be >= 0".to_string());
        }
    }

    Ok(MetricsResponse {
        metrics: calculate_fire_metrics(args.net_worth, args.annual_expenses, args.withdrawal_rate),
        planned: args.planned_expenses.map(|planned| {
            calculate_planned_fire_metrics(args.net_worth, planned, args.withdrawal_rate)
        }),
    })
}

pub fn run_projection(args: ProjectionArgs) -> Result<ProjectionResult, String> {
    let request = build_projection_request(args, None)?;
    project(&request)
}

fn project(request: &ProjectionRequest) -> Result<ProjectionResult, String> {
    calculate_fire_projection(
        request.net_worth,
        request.annual_expenses,
        request.annual_savings,
        request.withdrawal_rate,
        &request.scenarios,
        request.horizon_years,
    )
    .map_err(|e| e.to_string())
}

fn scenario_set_from_list(list: Vec<Scenario>) -> Result<ScenarioSet, String> {
    if list.len() != 3 {
        return Err(format!(
            "scenarios must contain exactly three entries (bear, base, bull), got {}",
            list.len()
        ));
    }

    let mut bear = None;
    let mut base = None;
    let mut bull = None;
    for scenario in list {
        let slot = match scenario.name.to_ascii_lowercase().as_str() {
            "bear" => &mut bear,
            "base" => &mut base,
            "bull" => &mut bull,
            other => return Err(format!("unknown scenario name '{other}'")),
        };
        if slot.is_some() {
            return Err(format!("duplicate scenario '{}'", scenario.name));
        }
        *slot = Some(scenario);
    }

    match (bear, base, bull) {
        (Some(bear), Some(base), Some(bull)) => Ok(ScenarioSet { bear, base, bull }),
        _ => Err("scenarios must be named bear, base and bull".to_string()),
    }
}

fn build_projection_request(
    args: ProjectionArgs,
    scenarios: Option<Vec<Scenario>>,
) -> Result<ProjectionRequest, String> {
    ensure_finite("--net-worth", args.net_worth)?;
    ensure_finite("--annual-expenses", args.annual_expenses)?;
    ensure_finite("--annual-savings", args.annual_savings)?;
    ensure_finite("--withdrawal-rate", args.withdrawal_rate)?;

    if args.annual_expenses < 0.0 {
        return Err("--annual-expenses must be >= 0".to_string());
    }
    if !(0.0..=100.0).contains(&args.withdrawal_rate) {
        return Err("--withdrawal-rate must be between 0 and 100".to_string());
    }
    if args.horizon_years < 0 {
        return Err("--horizon-years must be >= 0".to_string());
    }
    if args.horizon_years > MAX_HORIZON_YEARS {
        return Err(format!("--horizon-years must be <= {MAX_HORIZON_YEARS}"));
    }

    let mut set = match scenarios {
        Some(list) => scenario_set_from_list(list)?,
        None => default_scenarios(),
    };
    for (target, value) in [
        (&mut set.bear.growth_rate, args.bear_growth),
        (&mut set.bear.inflation_rate, args.bear_inflation),
        (&mut set.base.growth_rate, args.base_growth),
        (&mut set.base.inflation_rate, args.base_inflation),
        (&mut set.bull.growth_rate, args.bull_growth),
        (&mut set.bull.inflation_rate, args.bull_inflation),
    ] {
        if let Some(v) = value {
            *target = v;
        }
    }
    for scenario in set.iter() {
        ensure_finite(&format!("{} growth rate", scenario.name), scenario.growth_rate)?;
        ensure_finite(&format!("{} inflation rate", scenario.name), scenario.inflation_rate)?;
        if scenario.growth_rate <= -100.0 || scenario.inflation_rate <= -100.0 {
            return Err(format!("{} rates must be > -100", scenario.name));
        }
    }
    if !set.is_ordered() {
        warn!(?set, "scenario overrides break bear < base < bull ordering");
    }

    Ok(ProjectionRequest {
        net_worth: args.net_worth,
        annual_expenses: args.annual_expenses,
        annual_savings: args.annual_savings,
        withdrawal_rate: args.withdrawal_rate,
        horizon_years: args.horizon_years as u32,
        scenarios: set,
    })
}

fn metrics_args_from_payload(payload: MetricsPayload) -> MetricsArgs {
    let mut args = default_metrics_args();
    if let Some(v) = payload.net_worth {
        args.net_worth = v;
    }
    if let Some(v) = payload.annual_expenses {
        args.annual_expenses = v;
    }
    if let Some(v) = payload.withdrawal_rate {
        args.withdrawal_rate = v;
    }
    if let Some(v) = payload.planned_expenses {
        args.planned_expenses = Some(v);
    }
    args
}

fn projection_request_from_payload(
    payload: ProjectionPayload,
) -> Result<ProjectionRequest, String> {
    let mut args = default_projection_args();
    if let Some(v) = payload.net_worth {
        args.net_worth = v;
    }
    if let Some(v) = payload.annual_expenses {
        args.annual_expenses = v;
    }
    if let Some(v) = payload.annual_savings {
        args.annual_savings = v;
    }
    if let Some(v) = payload.withdrawal_rate {
        args.withdrawal_rate = v;
    }
    if let Some(v) = payload.horizon_years {
        args.horizon_years = v;
    }
    args.bear_growth = payload.bear_growth;
    args.bear_inflation = payload.bear_inflation;
    args.base_growth = payload.base_growth;
    args.base_inflation = payload.base_inflation;
    args.bull_growth = payload.bull_growth;
    args.bull_inflation = payload.bull_inflation;

    build_projection_request(args, payload.scenarios)
}

fn month_span_inclusive(start: NaiveDate, end: NaiveDate) -> i64 {
    let start_index = i64::from(start.year()) * 12 + i64::from(start.month0());
    let end_index = i64::from(end.year()) * 12 + i64::from(end.month0());
    end_index - start_index + 1
}

/// Caps the window at `today` and derives the annualization months when the caller gave none.
fn resolve_window(
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    number_of_months: Option<u32>,
    today: NaiveDate,
) -> Result<ReportingWindow, String> {
    let end_date = end_date.unwrap_or(today).min(today);
    let start_date = match start_date {
        Some(date) => date,
        None => NaiveDate::from_ymd_opt(end_date.year(), 1, 1)
            .ok_or_else(|| "could not resolve start of year".to_string())?,
    };
    if start_date > end_date {
        return Err(format!(
            "startDate {start_date} must not be after endDate {end_date}"
        ));
    }

    let number_of_months = match number_of_months {
        Some(0) => return Err("numberOfMonths must be > 0".to_string()),
        Some(months) => months,
        None => u32::try_from(month_span_inclusive(start_date, end_date).max(1))
            .map_err(|_| "reporting window is too long".to_string())?,
    };

    Ok(ReportingWindow {
        start_date,
        end_date,
        number_of_months,
    })
}

fn compute_yields(payload: YieldPayload, today: NaiveDate) -> Result<YieldResponse, String> {
    let window = resolve_window(
        payload.start_date,
        payload.end_date,
        payload.number_of_months,
        today,
    )?;
    let yield_on_cost = calculate_yoc_metrics(
        &payload.dividends,
        &payload.assets,
        window.start_date,
        window.end_date,
        window.number_of_months,
    )
    .map_err(|e| e.to_string())?;
    let current_yield = calculate_current_yield_metrics(
        &payload.dividends,
        &payload.assets,
        window.start_date,
        window.end_date,
        window.number_of_months,
    )
    .map_err(|e| e.to_string())?;

    Ok(YieldResponse {
        yield_on_cost,
        current_yield,
    })
}

fn compute_doubling(payload: DoublingPayload) -> Result<DoublingTimeSummary, String> {
    let mode = payload.mode.unwrap_or_default();
    let thresholds = payload
        .thresholds
        .unwrap_or_else(|| DEFAULT_THRESHOLDS.to_vec());
    analyze_doubling_time(&payload.snapshots, mode, &thresholds).map_err(|e| e.to_string())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/metrics",
            get(metrics_get_handler).post(metrics_post_handler),
        )
        .route(
            "/api/projection",
            get(projection_get_handler).post(projection_post_handler),
        )
        .route("/api/scenarios/default", get(default_scenarios_handler))
        .route("/api/performance/yield", post(yield_handler))
        .route("/api/history/doubling-time", post(doubling_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "FIRE tracker HTTP API listening");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn default_scenarios_handler() -> Response {
    json_response(StatusCode::OK, default_scenarios())
}

async fn metrics_get_handler(Query(payload): Query<MetricsPayload>) -> Response {
    metrics_handler_impl(payload)
}

async fn metrics_post_handler(Json(payload): Json<MetricsPayload>) -> Response {
    metrics_handler_impl(payload)
}

fn metrics_handler_impl(payload: MetricsPayload) -> Response {
    let args = metrics_args_from_payload(payload);
    info!(
        net_worth = args.net_worth,
        annual_expenses = args.annual_expenses,
        withdrawal_rate = args.withdrawal_rate,
        "fire metrics requested"
    );
    match run_metrics(args) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => bad_request(&msg),
    }
}

async fn projection_get_handler(Query(payload): Query<ProjectionPayload>) -> Response {
    projection_handler_impl(payload)
}

async fn projection_post_handler(Json(payload): Json<ProjectionPayload>) -> Response {
    projection_handler_impl(payload)
}

fn projection_handler_impl(payload: ProjectionPayload) -> Response {
    let request = match projection_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return bad_request(&msg),
    };
    info!(
        net_worth = request.net_worth,
        annual_savings = request.annual_savings,
        horizon_years = request.horizon_years,
        "fire projection requested"
    );
    match project(&request) {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(msg) => bad_request(&msg),
    }
}

async fn yield_handler(Json(payload): Json<YieldPayload>) -> Response {
    info!(
        dividends = payload.dividends.len(),
        assets = payload.assets.len(),
        "yield metrics requested"
    );
    let today = Local::now().date_naive();
    match compute_yields(payload, today) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => bad_request(&msg),
    }
}

async fn doubling_handler(Json(payload): Json<DoublingPayload>) -> Response {
    info!(
        snapshots = payload.snapshots.len(),
        mode = ?payload.mode,
        "doubling time requested"
    );
    match compute_doubling(payload) {
        Ok(summary) => json_response(StatusCode::OK, summary),
        Err(msg) => bad_request(&msg),
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

fn bad_request(msg: &str) -> Response {
    warn!(error = msg, "rejected request");
    error_response(StatusCode::BAD_REQUEST, msg)
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
