mod config;
mod engine;
mod goal_funding;
mod monte_carlo;
mod rng;
mod types;

pub use config::{BaselineProfile, EngineConfig, GoalTarget, canonical_goals};
pub use engine::{
    MAX_HORIZON_MONTHS, MIN_HORIZON_MONTHS, clamp_horizon, compute_risk_score, month_date,
    project_goal_etas, resolve_baseline_date, run_simulation,
};
pub use goal_funding::simulate_goal_funding;
pub use monte_carlo::{
    DEFAULT_SEED, MAX_TRIALS, MIN_TRIALS, clamp_trials, deficit_probability, percentile_bands,
    run_monte_carlo, run_simulation_with_noise, terminal_histogram, trial_seeds,
};
pub use rng::Lehmer;
pub use types::{
    GoalEta, GoalFundingInput, GoalFundingPoint, GoalFundingResult, HistogramBin,
    MonteCarloRequest, MonteCarloResult, PercentileBand, RunSimulationInput, ScenarioAssumptions,
    ScenarioParameters, ShockEvent, ShockKind, SimResult, SimResultPoint, TravelRecurrence,
    Volatility,
};
