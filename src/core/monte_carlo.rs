use std::collections::BTreeMap;

use jiff::civil::Date;

use super::config::EngineConfig;
use super::engine::{month_date, resolve_baseline_date, run_simulation};
use super::rng::Lehmer;
use super::types::{
    HistogramBin, MonteCarloRequest, MonteCarloResult, PercentileBand, RunSimulationInput,
    SimResult, Volatility,
};

pub const MIN_TRIALS: u32 = 10;
pub const MAX_TRIALS: u32 = 2_000;
pub const DEFAULT_SEED: i64 = 42;

const TRIAL_SEED_SCALE: f64 = 1_000_000.0;
const HISTOGRAM_BUCKETS: f64 = 12.0;
const MIN_BUCKET_WIDTH: f64 = 100.0;

pub fn clamp_trials(trials: u32) -> u32 {
    trials.clamp(MIN_TRIALS, MAX_TRIALS)
}

/// Runs one projection with the income, discretionary and rent deltas each
/// shifted by a uniform amount in `[-amplitude, amplitude)`. Rent moves with
/// half the expense amplitude. Draws are taken in that order.
pub fn run_simulation_with_noise(
    input: &RunSimulationInput,
    config: &EngineConfig,
    volatility: Volatility,
    mut draw: impl FnMut() -> f64,
) -> SimResult {
    let mut perturbed = input.clone();
    let params = &mut perturbed.parameters;
    params.income_delta_pct += jitter(draw(), volatility.income_pct);
    params.discretionary_delta_pct += jitter(draw(), volatility.expense_pct);
    params.rent_delta_pct += jitter(draw(), volatility.expense_pct / 2.0);
    run_simulation(&perturbed, config)
}

fn jitter(draw: f64, amplitude: f64) -> f64 {
    2.0 * (draw - 0.5) * amplitude
}

/// Seeds for every trial, drawn in trial order from one master stream.
pub fn trial_seeds(master_seed: i64, trials: u32) -> Vec<i64> {
    let mut master = Lehmer::new(master_seed);
    (0..trials)
        .map(|_| (master.next_f64() * TRIAL_SEED_SCALE).floor() as i64)
        .collect()
}

pub fn run_monte_carlo(request: &MonteCarloRequest, config: &EngineConfig) -> MonteCarloResult {
    let trials = clamp_trials(request.trials);
    let master_seed = request.seed.unwrap_or(DEFAULT_SEED);
    let baseline_date = resolve_baseline_date(&request.input);

    // Pin the date so every trial shares one calendar.
    let mut input = request.input.clone();
    input.baseline_date = Some(baseline_date);

    tracing::debug!(
        trials,
        requested = request.trials,
        master_seed,
        "running monte carlo"
    );

    let seeds = trial_seeds(master_seed, trials);
    let results = run_trials(&input, config, request.volatility, &seeds);

    MonteCarloResult {
        percentiles: percentile_bands(&results, baseline_date),
        histogram: terminal_histogram(&results),
        deficit_probability: deficit_probability(&results),
    }
}

fn run_trial(
    input: &RunSimulationInput,
    config: &EngineConfig,
    volatility: Volatility,
    seed: i64,
) -> SimResult {
    let mut rng = Lehmer::new(seed);
    run_simulation_with_noise(input, config, volatility, || rng.next_f64())
}

#[cfg(feature = "parallel")]
fn run_trials(
    input: &RunSimulationInput,
    config: &EngineConfig,
    volatility: Volatility,
    seeds: &[i64],
) -> Vec<SimResult> {
    use rayon::prelude::*;

    seeds
        .par_iter()
        .map(|&seed| run_trial(input, config, volatility, seed))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn run_trials(
    input: &RunSimulationInput,
    config: &EngineConfig,
    volatility: Volatility,
    seeds: &[i64],
) -> Vec<SimResult> {
    seeds
        .iter()
        .map(|&seed| run_trial(input, config, volatility, seed))
        .collect()
}

/// Cross-trial balance percentiles per month. Trials shorter than the longest
/// path contribute their last balance to the missing months.
pub fn percentile_bands(trials: &[SimResult], baseline_date: Date) -> Vec<PercentileBand> {
    let horizon = trials.iter().map(|t| t.points.len()).max().unwrap_or(0);
    let mut column = Vec::with_capacity(trials.len());
    let mut bands = Vec::with_capacity(horizon);

    for month in 0..horizon {
        column.clear();
        column.extend(
            trials
                .iter()
                .filter_map(|t| t.points.get(month).or(t.points.last()))
                .map(|p| p.balance),
        );
        column.sort_by(|a, b| a.total_cmp(b));

        bands.push(PercentileBand {
            date: month_date(baseline_date, month as u32),
            p10: percentile(&column, 10.0),
            p25: percentile(&column, 25.0),
            p50: percentile(&column, 50.0),
            p75: percentile(&column, 75.0),
            p90: percentile(&column, 90.0),
        });
    }

    bands
}

/// Nearest-rank lookup into an ascending slice; no interpolation.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let rank = ((p / 100.0) * (sorted.len() as f64 - 1.0)).floor() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

pub fn terminal_histogram(trials: &[SimResult]) -> Vec<HistogramBin> {
    let terminal = trials
        .iter()
        .filter_map(SimResult::terminal_balance)
        .collect::<Vec<_>>();
    if terminal.is_empty() {
        return Vec::new();
    }

    let min = terminal.iter().copied().fold(f64::INFINITY, f64::min);
    let max = terminal.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = ((max - min) / HISTOGRAM_BUCKETS).round().max(MIN_BUCKET_WIDTH);

    let mut counts = BTreeMap::<i64, u32>::new();
    for value in terminal {
        let bucket = ((value - min) / width).floor() as i64;
        *counts.entry(bucket).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(bucket, count)| HistogramBin {
            bucket_start: min + bucket as f64 * width,
            count,
        })
        .collect()
}

/// Share of trials whose balance went negative in any month.
pub fn deficit_probability(trials: &[SimResult]) -> f64 {
    if trials.is_empty() {
        return 0.0;
    }

    let deficits = trials.iter().filter(|t| t.went_negative()).count();
    deficits as f64 / trials.len() as f64
}
