use axum::{
    Router,
    extract::{Json, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::time::Instant;
use tokio::net::TcpListener;

use crate::core::{
    BaselineProfile, EngineConfig, GoalFundingInput, GoalFundingResult, MonteCarloRequest,
    MonteCarloResult, RunSimulationInput, SimResult, clamp_trials, run_monte_carlo,
    run_simulation, simulate_goal_funding,
};
use crate::error::{Error, Result};

/// Body of `POST /api/simulate`: a scenario plus an optional household
/// baseline replacing the built-in one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulatePayload {
    #[serde(flatten)]
    pub input: RunSimulationInput,
    pub baseline: Option<BaselineProfile>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloPayload {
    #[serde(flatten)]
    pub request: MonteCarloRequest,
    #[serde(default)]
    pub baseline: Option<BaselineProfile>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/simulate", post(simulate_handler))
        .route("/api/monte-carlo", post(monte_carlo_handler))
        .route("/api/goal-funding", post(goal_funding_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(host: IpAddr, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::new(host, port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("scenario API listening on http://{addr}");

    axum::serve(listener, router()).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    Error::NotFound("no such route".to_string()).into_response()
}

async fn simulate_handler(
    payload: std::result::Result<Json<SimulatePayload>, JsonRejection>,
) -> Result<Response> {
    let Json(payload) = payload?;
    let result = simulate(payload)?;
    tracing::info!(
        months = result.points.len(),
        runway = result.runway_months,
        risk = result.risk_score,
        "simulated scenario"
    );
    Ok(json_response(StatusCode::OK, result))
}

async fn monte_carlo_handler(
    payload: std::result::Result<Json<MonteCarloPayload>, JsonRejection>,
) -> Result<Response> {
    let Json(payload) = payload?;
    let started = Instant::now();
    let trials = clamp_trials(payload.request.trials);
    let result = tokio::task::spawn_blocking(move || monte_carlo(payload))
        .await
        .map_err(|e| Error::Task(e.to_string()))??;
    tracing::info!(
        trials,
        deficit_probability = result.deficit_probability,
        "monte carlo finished"
    );
    tracing::debug!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "monte carlo timing"
    );
    Ok(json_response(StatusCode::OK, result))
}

async fn goal_funding_handler(
    input: std::result::Result<Json<GoalFundingInput>, JsonRejection>,
) -> Result<Response> {
    let Json(input) = input?;
    let result = goal_funding(input)?;
    tracing::info!(months_to_target = ?result.months_to_target, "projected goal funding");
    Ok(json_response(StatusCode::OK, result))
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

pub fn simulate(payload: SimulatePayload) -> Result<SimResult> {
    validate_input(&payload.input)?;
    let config = engine_config(payload.baseline)?;
    let result = run_simulation(&payload.input, &config);
    ensure_finite_output(
        result
            .points
            .iter()
            .flat_map(|p| [p.balance, p.income, p.expenses]),
    )?;
    Ok(result)
}

pub fn monte_carlo(payload: MonteCarloPayload) -> Result<MonteCarloResult> {
    let request = &payload.request;
    validate_input(&request.input)?;
    ensure_non_negative("volatility.incomePct", request.volatility.income_pct)?;
    ensure_non_negative("volatility.expensePct", request.volatility.expense_pct)?;
    let config = engine_config(payload.baseline)?;
    let result = run_monte_carlo(request, &config);
    ensure_finite_output(
        result
            .percentiles
            .iter()
            .flat_map(|b| [b.p10, b.p25, b.p50, b.p75, b.p90])
            .chain(result.histogram.iter().map(|b| b.bucket_start)),
    )?;
    Ok(result)
}

pub fn goal_funding(input: GoalFundingInput) -> Result<GoalFundingResult> {
    ensure_finite("currentAmount", input.current_amount)?;
    ensure_finite("targetAmount", input.target_amount)?;
    ensure_finite("weeklyContribution", input.weekly_contribution)?;
    ensure_finite("incomeChangePct", input.income_change_pct)?;
    let result = simulate_goal_funding(&input);
    ensure_finite_output(
        std::iter::once(result.monthly_contribution)
            .chain(result.points.iter().map(|p| p.balance)),
    )?;
    Ok(result)
}

fn engine_config(baseline: Option<BaselineProfile>) -> Result<EngineConfig> {
    let Some(baseline) = baseline else {
        return Ok(EngineConfig::default());
    };

    ensure_finite("baseline.income", baseline.income)?;
    ensure_finite("baseline.expenses", baseline.expenses)?;
    ensure_finite("baseline.rent", baseline.rent)?;
    ensure_finite("baseline.discretionary", baseline.discretionary)?;
    ensure_finite("baseline.startingBalance", baseline.starting_balance)?;
    Ok(EngineConfig::with_baseline(baseline))
}

/// Only rejects values the arithmetic cannot carry. Odd but finite inputs,
/// such as a negative travel budget, pass through untouched.
fn validate_input(input: &RunSimulationInput) -> Result<()> {
    let params = &input.parameters;
    ensure_finite("parameters.incomeDeltaPct", params.income_delta_pct)?;
    ensure_finite("parameters.rentDeltaPct", params.rent_delta_pct)?;
    ensure_finite(
        "parameters.discretionaryDeltaPct",
        params.discretionary_delta_pct,
    )?;
    ensure_finite("parameters.travelBudget", params.travel_budget)?;
    ensure_finite("parameters.extraDebtPayment", params.extra_debt_payment)?;

    if let Some(assumptions) = &input.assumptions {
        ensure_finite("assumptions.inflationPct", assumptions.inflation_pct)?;
        ensure_finite("assumptions.returnPct", assumptions.return_pct)?;
        ensure_finite("assumptions.savingsRatePct", assumptions.savings_rate_pct)?;
    }

    for (idx, shock) in input.shocks.iter().enumerate() {
        ensure_finite(&format!("shocks[{idx}].magnitude"), shock.magnitude)?;
    }

    Ok(())
}

fn ensure_finite(field: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::validation(field, "must be a finite number"))
    }
}

/// Finite inputs can still overflow once compounded; JSON has no encoding
/// for the resulting infinities, so such results are refused.
fn ensure_finite_output(mut values: impl Iterator<Item = f64>) -> Result<()> {
    if values.all(f64::is_finite) {
        Ok(())
    } else {
        Err(Error::validation(
            "parameters",
            "inputs overflow the projection to a non-finite value",
        ))
    }
}

fn ensure_non_negative(field: &str, value: f64) -> Result<()> {
    ensure_finite(field, value)?;
    if value < 0.0 {
        return Err(Error::validation(field, "must be >= 0"));
    }
    Ok(())
}
