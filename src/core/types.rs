use jiff::civil::Date;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TravelRecurrence {
    #[default]
    #[serde(alias = "oneOff", alias = "one_off")]
    OneOff,
    Monthly,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShockKind {
    Bonus,
    #[serde(alias = "jobLoss", alias = "job_loss")]
    JobLoss,
    #[serde(alias = "unexpectedExpense", alias = "unexpected_expense")]
    UnexpectedExpense,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScenarioParameters {
    pub horizon_months: u32,
    pub income_delta_pct: f64,
    pub rent_delta_pct: f64,
    pub discretionary_delta_pct: f64,
    pub travel_budget: f64,
    pub travel_recurrence: TravelRecurrence,
    pub extra_debt_payment: f64,
    pub start_date: Option<Date>,
}

impl Default for ScenarioParameters {
    fn default() -> Self {
        Self {
            horizon_months: 12,
            income_delta_pct: 0.0,
            rent_delta_pct: 0.0,
            discretionary_delta_pct: 0.0,
            travel_budget: 0.0,
            travel_recurrence: TravelRecurrence::OneOff,
            extra_debt_payment: 0.0,
            start_date: None,
        }
    }
}

/// Annual rates, all in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScenarioAssumptions {
    pub inflation_pct: f64,
    pub return_pct: f64,
    pub savings_rate_pct: f64,
}

impl Default for ScenarioAssumptions {
    fn default() -> Self {
        Self {
            inflation_pct: 3.0,
            return_pct: 2.0,
            savings_rate_pct: 12.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShockEvent {
    pub month_offset: u32,
    pub kind: ShockKind,
    pub magnitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunSimulationInput {
    pub parameters: ScenarioParameters,
    pub shocks: Vec<ShockEvent>,
    pub assumptions: Option<ScenarioAssumptions>,
    pub baseline_date: Option<Date>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimResultPoint {
    pub date: Date,
    pub balance: f64,
    pub income: f64,
    pub expenses: f64,
    pub goal_progress: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalEta {
    pub goal_id: String,
    pub eta_date: Date,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimResult {
    pub points: Vec<SimResultPoint>,
    pub runway_months: u32,
    pub break_even_date: Option<Date>,
    pub goal_etas: Vec<GoalEta>,
    pub risk_score: u8,
}

impl SimResult {
    pub fn terminal_balance(&self) -> Option<f64> {
        self.points.last().map(|p| p.balance)
    }

    pub fn went_negative(&self) -> bool {
        self.points.iter().any(|p| p.balance < 0.0)
    }
}

/// Perturbation amplitudes, in percentage points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Volatility {
    pub income_pct: f64,
    pub expense_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloRequest {
    #[serde(flatten)]
    pub input: RunSimulationInput,
    #[serde(default = "default_trials")]
    pub trials: u32,
    #[serde(default)]
    pub volatility: Volatility,
    #[serde(default)]
    pub seed: Option<i64>,
}

fn default_trials() -> u32 {
    500
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentileBand {
    pub date: Date,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramBin {
    pub bucket_start: f64,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloResult {
    pub percentiles: Vec<PercentileBand>,
    pub histogram: Vec<HistogramBin>,
    pub deficit_probability: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GoalFundingInput {
    pub current_amount: f64,
    pub target_amount: f64,
    pub weekly_contribution: f64,
    pub income_change_pct: f64,
    pub start_date: Option<Date>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalFundingPoint {
    pub date: Date,
    pub balance: f64,
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalFundingResult {
    pub monthly_contribution: f64,
    pub points: Vec<GoalFundingPoint>,
    pub months_to_target: Option<u32>,
    pub eta_date: Option<Date>,
}
