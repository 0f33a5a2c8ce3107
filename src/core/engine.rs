use jiff::ToSpan;
use jiff::civil::Date;

use super::config::{EngineConfig, GoalTarget};
use super::types::{
    GoalEta, RunSimulationInput, ShockEvent, ShockKind, SimResult, SimResultPoint,
    TravelRecurrence,
};

pub const MIN_HORIZON_MONTHS: u32 = 6;
pub const MAX_HORIZON_MONTHS: u32 = 60;

const PROGRESS_FLOOR: f64 = 5_000.0;
const PROGRESS_WINDOW: f64 = 15_000.0;

const VOLATILITY_SCALE: f64 = 5_000.0;
const MIN_DEFICIT_PENALTY: f64 = 0.2;
const SAFETY_SCALE: f64 = 20_000.0;
const MAX_SAFETY_BOOST: f64 = 0.4;
const NEGATIVE_BALANCE_PENALTY: f64 = -0.3;

pub fn clamp_horizon(months: u32) -> u32 {
    months.clamp(MIN_HORIZON_MONTHS, MAX_HORIZON_MONTHS)
}

/// Explicit baseline date, else the scenario start date, else today.
pub fn resolve_baseline_date(input: &RunSimulationInput) -> Date {
    input
        .baseline_date
        .or(input.parameters.start_date)
        .unwrap_or_else(today)
}

pub(crate) fn today() -> Date {
    jiff::Zoned::now().date()
}

/// Day-of-month is clamped, so Jan 31 + 1 month is the last day of February.
pub fn month_date(baseline: Date, month_index: u32) -> Date {
    baseline.saturating_add(i64::from(month_index).months())
}

pub(crate) fn pct_factor(pct: f64) -> f64 {
    1.0 + pct / 100.0
}

pub fn run_simulation(input: &RunSimulationInput, config: &EngineConfig) -> SimResult {
    let params = &input.parameters;
    let assumptions = input.assumptions.unwrap_or_default();
    let profile = &config.baseline;
    let baseline_date = resolve_baseline_date(input);
    let horizon = clamp_horizon(params.horizon_months);

    let base_income = profile.income * pct_factor(params.income_delta_pct);
    let core_expenses = profile.discretionary * pct_factor(params.discretionary_delta_pct)
        + profile.rent * pct_factor(params.rent_delta_pct)
        + profile.fixed_expenses();
    let monthly_inflation = assumptions.inflation_pct / 100.0 / 12.0;
    let monthly_return = assumptions.return_pct / 100.0 / 12.0;

    let mut balance = profile.starting_balance;
    let mut runway_index = None;
    let mut points = Vec::with_capacity(horizon as usize);

    for month in 0..horizon {
        let mut expenses = core_expenses;
        if params.travel_recurrence == TravelRecurrence::Monthly || month == 0 {
            expenses += params.travel_budget;
        }
        expenses += params.extra_debt_payment;

        let price_index = (1.0 + monthly_inflation).powi(month as i32);
        let mut income = base_income * price_index;
        expenses *= price_index;

        for shock in input.shocks.iter().filter(|s| s.month_offset == month) {
            apply_shock(shock, &mut income, &mut expenses);
        }

        balance = balance * (1.0 + monthly_return) + income - expenses;
        if balance < 0.0 && runway_index.is_none() {
            runway_index = Some(month);
        }

        points.push(SimResultPoint {
            date: month_date(baseline_date, month),
            balance,
            income,
            expenses,
            goal_progress: goal_progress(balance),
        });
    }

    let break_even_date = points
        .iter()
        .find(|p| p.income > p.expenses)
        .map(|p| p.date);
    let goal_etas = project_goal_etas(&points, assumptions.savings_rate_pct, &config.goals);
    let risk_score = compute_risk_score(&points);

    SimResult {
        points,
        runway_months: runway_index.unwrap_or(horizon),
        break_even_date,
        goal_etas,
        risk_score,
    }
}

fn apply_shock(shock: &ShockEvent, income: &mut f64, expenses: &mut f64) {
    match shock.kind {
        ShockKind::Bonus => *income += shock.magnitude,
        ShockKind::JobLoss | ShockKind::UnexpectedExpense => *expenses += shock.magnitude.abs(),
    }
}

fn goal_progress(balance: f64) -> f64 {
    ((balance - PROGRESS_FLOOR) / PROGRESS_WINDOW).clamp(0.0, 1.0)
}

fn first_deficit_index(points: &[SimResultPoint]) -> Option<usize> {
    points.iter().position(|p| p.balance < 0.0)
}

/// Scores a projected path from 0 (fragile) to 100 (comfortable).
///
/// Penalises month-to-month cashflow volatility and how early the balance
/// first goes negative; rewards a positive closing balance.
pub fn compute_risk_score(points: &[SimResultPoint]) -> u8 {
    let Some(last) = points.last() else {
        return 0;
    };

    let n = points.len() as f64;
    let flows = points
        .iter()
        .map(|p| p.income - p.expenses)
        .collect::<Vec<_>>();
    let mean = flows.iter().sum::<f64>() / n;
    let variance = if flows.len() > 1 {
        flows.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / (n - 1.0)
    } else {
        0.0
    };

    let volatility_penalty = (variance.sqrt() / VOLATILITY_SCALE).min(1.0);
    let deficit_penalty = match first_deficit_index(points) {
        Some(index) => (1.0 - index as f64 / n).max(MIN_DEFICIT_PENALTY),
        None => 0.0,
    };
    let safety_boost = if last.balance > 0.0 {
        (last.balance / SAFETY_SCALE).min(MAX_SAFETY_BOOST)
    } else {
        NEGATIVE_BALANCE_PENALTY
    };

    let raw = 1.0 - volatility_penalty - deficit_penalty + safety_boost;
    (raw * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Dates at which a savings pot fed by `savings_rate_pct` of each month's
/// surplus first covers each goal. The pot is separate from the balance path.
/// Goals never reached within the path are left out.
pub fn project_goal_etas(
    points: &[SimResultPoint],
    savings_rate_pct: f64,
    goals: &[GoalTarget],
) -> Vec<GoalEta> {
    let mut saved = 0.0;
    let mut reached: Vec<Option<Date>> = vec![None; goals.len()];

    for point in points {
        saved += (point.income - point.expenses).max(0.0) * savings_rate_pct / 100.0;
        for (goal, eta) in goals.iter().zip(reached.iter_mut()) {
            if eta.is_none() && saved >= goal.target {
                *eta = Some(point.date);
            }
        }
    }

    goals
        .iter()
        .zip(reached)
        .filter_map(|(goal, eta)| {
            eta.map(|eta_date| GoalEta {
                goal_id: goal.id.clone(),
                eta_date,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::BaselineProfile;
    use crate::core::types::{ScenarioAssumptions, ScenarioParameters};
    use jiff::civil::date;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn baseline_input(horizon_months: u32) -> RunSimulationInput {
        RunSimulationInput {
            parameters: ScenarioParameters {
                horizon_months,
                ..ScenarioParameters::default()
            },
            shocks: Vec::new(),
            assumptions: None,
            baseline_date: Some(date(2025, 1, 15)),
        }
    }

    fn shock(month_offset: u32, kind: ShockKind, magnitude: f64) -> ShockEvent {
        ShockEvent {
            month_offset,
            kind,
            magnitude,
        }
    }

    fn point(balance: f64, income: f64, expenses: f64) -> SimResultPoint {
        SimResultPoint {
            date: date(2025, 1, 1),
            balance,
            income,
            expenses,
            goal_progress: 0.0,
        }
    }

    #[test]
    fn baseline_first_month_applies_return_then_net_flow() {
        let result = run_simulation(&baseline_input(12), &EngineConfig::default());
        let first = result.points[0];
        assert_approx(first.income, 6_800.0);
        assert_approx(first.expenses, 5_200.0);
        assert_approx(first.balance, 13_620.0);
        assert_approx(first.goal_progress, (13_620.0 - 5_000.0) / 15_000.0);
        assert_eq!(first.date, date(2025, 1, 15));
    }

    #[test]
    fn baseline_second_month_is_inflated() {
        let result = run_simulation(&baseline_input(12), &EngineConfig::default());
        let second = result.points[1];
        assert_approx(second.income, 6_800.0 * 1.0025);
        assert_approx(second.expenses, 5_200.0 * 1.0025);
        assert_approx(
            second.balance,
            13_620.0 * (1.0 + 0.02 / 12.0) + 1_600.0 * 1.0025,
        );
        assert_eq!(second.date, date(2025, 2, 15));
    }

    #[test]
    fn baseline_scenario_is_healthy() {
        let result = run_simulation(&baseline_input(12), &EngineConfig::default());
        assert_eq!(result.points.len(), 12);
        assert_eq!(result.runway_months, 12);
        assert_eq!(result.break_even_date, Some(date(2025, 1, 15)));
        assert_eq!(result.risk_score, 100);
        assert!(result.goal_etas.is_empty());
    }

    #[test]
    fn horizon_is_clamped_not_rejected() {
        let config = EngineConfig::default();
        assert_eq!(run_simulation(&baseline_input(3), &config).points.len(), 6);
        assert_eq!(run_simulation(&baseline_input(0), &config).points.len(), 6);
        assert_eq!(run_simulation(&baseline_input(1000), &config).points.len(), 60);
        assert_eq!(run_simulation(&baseline_input(1000), &config).runway_months, 60);
    }

    #[test]
    fn total_income_loss_sets_runway_at_first_negative_month() {
        let mut input = baseline_input(12);
        input.parameters.income_delta_pct = -100.0;
        let result = run_simulation(&input, &EngineConfig::default());

        assert_eq!(result.runway_months, 2);
        let runway = result.runway_months as usize;
        assert!(result.points[runway].balance < 0.0);
        assert!(result.points[..runway].iter().all(|p| p.balance >= 0.0));
        assert_eq!(result.risk_score, 0);
    }

    #[test]
    fn runway_is_not_overwritten_by_later_deficits() {
        let mut input = baseline_input(12);
        input.shocks = vec![
            shock(1, ShockKind::UnexpectedExpense, 20_000.0),
            shock(6, ShockKind::JobLoss, 50_000.0),
        ];
        let result = run_simulation(&input, &EngineConfig::default());
        assert_eq!(result.runway_months, 1);
    }

    #[test]
    fn break_even_is_absent_when_expenses_always_exceed_income() {
        let mut input = baseline_input(24);
        input.parameters.income_delta_pct = -50.0;
        let result = run_simulation(&input, &EngineConfig::default());
        assert_eq!(result.break_even_date, None);
    }

    #[test]
    fn break_even_compares_flows_not_balance() {
        let mut input = baseline_input(12);
        input.parameters.travel_budget = 3_000.0;
        let result = run_simulation(&input, &EngineConfig::default());
        assert!(result.points[0].income < result.points[0].expenses);
        assert!(result.points[0].balance > 0.0);
        assert_eq!(result.break_even_date, Some(date(2025, 2, 15)));
    }

    #[test]
    fn bonus_goes_to_income_and_other_shocks_to_expenses() {
        let mut input = baseline_input(12);
        input.shocks = vec![
            shock(0, ShockKind::Bonus, 1_000.0),
            shock(0, ShockKind::JobLoss, -3_000.0),
            shock(0, ShockKind::UnexpectedExpense, 500.0),
        ];
        let result = run_simulation(&input, &EngineConfig::default());
        let first = result.points[0];
        assert_approx(first.income, 7_800.0);
        assert_approx(first.expenses, 8_700.0);
        assert_approx(first.balance, 12_020.0 + 7_800.0 - 8_700.0);
    }

    #[test]
    fn shocks_are_not_inflated() {
        let mut input = baseline_input(12);
        input.shocks = vec![shock(3, ShockKind::Bonus, 1_000.0)];
        let result = run_simulation(&input, &EngineConfig::default());
        assert_approx(
            result.points[3].income,
            6_800.0 * 1.0025_f64.powi(3) + 1_000.0,
        );
    }

    #[test]
    fn one_off_travel_only_hits_first_month() {
        let mut input = baseline_input(12);
        input.parameters.travel_budget = 1_200.0;
        let result = run_simulation(&input, &EngineConfig::default());
        assert_approx(result.points[0].expenses, 6_400.0);
        assert_approx(result.points[1].expenses, 5_200.0 * 1.0025);
    }

    #[test]
    fn monthly_travel_and_debt_payment_recur_and_inflate() {
        let mut input = baseline_input(12);
        input.parameters.travel_budget = 1_200.0;
        input.parameters.travel_recurrence = TravelRecurrence::Monthly;
        input.parameters.extra_debt_payment = 300.0;
        let result = run_simulation(&input, &EngineConfig::default());
        assert_approx(result.points[0].expenses, 6_700.0);
        assert_approx(result.points[1].expenses, 6_700.0 * 1.0025);
    }

    #[test]
    fn deltas_scale_their_own_components() {
        let mut input = baseline_input(12);
        input.parameters.income_delta_pct = 10.0;
        input.parameters.rent_delta_pct = 50.0;
        input.parameters.discretionary_delta_pct = -50.0;
        let result = run_simulation(&input, &EngineConfig::default());
        assert_approx(result.points[0].income, 7_480.0);
        assert_approx(result.points[0].expenses, 700.0 + 3_150.0 + 1_700.0);
    }

    #[test]
    fn baseline_profile_can_be_substituted() {
        let config = EngineConfig::with_baseline(BaselineProfile {
            income: 1_000.0,
            expenses: 1_500.0,
            rent: 500.0,
            discretionary: 500.0,
            starting_balance: 0.0,
        });
        let mut input = baseline_input(6);
        input.assumptions = Some(ScenarioAssumptions {
            inflation_pct: 0.0,
            return_pct: 0.0,
            savings_rate_pct: 12.0,
        });
        let result = run_simulation(&input, &config);
        assert_approx(result.points[0].balance, -500.0);
        assert_approx(result.points[5].balance, -3_000.0);
        assert_eq!(result.runway_months, 0);
    }

    #[test]
    fn baseline_date_falls_back_to_scenario_start() {
        let mut input = baseline_input(6);
        input.baseline_date = None;
        input.parameters.start_date = Some(date(2024, 1, 31));
        let result = run_simulation(&input, &EngineConfig::default());
        assert_eq!(result.points[0].date, date(2024, 1, 31));
        assert_eq!(result.points[1].date, date(2024, 2, 29));
        assert_eq!(result.points[2].date, date(2024, 3, 31));
    }

    #[test]
    fn goal_etas_follow_cumulative_savings() {
        let mut input = baseline_input(12);
        input.assumptions = Some(ScenarioAssumptions {
            savings_rate_pct: 100.0,
            ..ScenarioAssumptions::default()
        });
        let result = run_simulation(&input, &EngineConfig::default());
        let etas = result
            .goal_etas
            .iter()
            .map(|g| (g.goal_id.as_str(), g.eta_date))
            .collect::<Vec<_>>();
        assert_eq!(
            etas,
            vec![
                ("emergency", date(2025, 4, 15)),
                ("education", date(2025, 5, 15)),
                ("travel", date(2025, 7, 15)),
            ]
        );
    }

    #[test]
    fn goal_etas_use_injected_goal_list() {
        let goals = vec![GoalTarget::new("laptop", 150.0), GoalTarget::new("house", 1e9)];
        let points = vec![point(0.0, 1_000.0, 0.0), point(0.0, 1_000.0, 0.0)];
        let etas = project_goal_etas(&points, 10.0, &goals);
        assert_eq!(etas.len(), 1);
        assert_eq!(etas[0].goal_id, "laptop");
    }

    #[test]
    fn goal_etas_ignore_deficit_months() {
        let goals = vec![GoalTarget::new("pot", 100.0)];
        let points = vec![point(0.0, 0.0, 5_000.0), point(0.0, 100.0, 0.0)];
        let etas = project_goal_etas(&points, 100.0, &goals);
        assert_eq!(etas.len(), 1);
    }

    #[test]
    fn goal_progress_is_clamped() {
        assert_approx(goal_progress(-10_000.0), 0.0);
        assert_approx(goal_progress(5_000.0), 0.0);
        assert_approx(goal_progress(12_500.0), 0.5);
        assert_approx(goal_progress(50_000.0), 1.0);
    }

    #[test]
    fn risk_score_combines_penalties_and_boost() {
        // Flat flows, no deficit, closing balance 10k: 1 - 0 - 0 + 0.5 capped at 0.4.
        let steady = vec![point(10_000.0, 1_000.0, 500.0); 6];
        assert_eq!(compute_risk_score(&steady), 100);

        // Flat flows, deficit from month 3 of 6, negative close: 1 - 0.5 - 0.3.
        let mut failing = vec![point(1_000.0, 500.0, 1_000.0); 6];
        for p in &mut failing[3..] {
            p.balance = -1_000.0;
        }
        assert_eq!(compute_risk_score(&failing), 20);

        // Late deficit still costs at least 0.2; small positive close: 1 - 0.2 + 0.05.
        let mut late = vec![point(1_000.0, 500.0, 500.0); 12];
        late[10].balance = -1.0;
        assert_eq!(compute_risk_score(&late), 85);
    }

    #[test]
    fn risk_score_volatility_penalty_uses_sample_stdev() {
        // Flows alternate +-5000: mean 0, sample variance 5000^2 * 6/5.
        let mut swinging = Vec::new();
        for i in 0..6 {
            let (income, expenses) = if i % 2 == 0 {
                (5_000.0, 0.0)
            } else {
                (0.0, 5_000.0)
            };
            swinging.push(point(8_000.0, income, expenses));
        }
        // Penalty saturates at 1; boost 0.4.
        assert_eq!(compute_risk_score(&swinging), 40);
    }

    #[test]
    fn risk_score_of_empty_path_is_zero() {
        assert_eq!(compute_risk_score(&[]), 0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_projection_is_deterministic(
            horizon in 0u32..120,
            income_delta in -100.0f64..100.0,
            rent_delta in -100.0f64..100.0,
            discretionary_delta in -100.0f64..100.0,
            travel in 0.0f64..5_000.0,
            monthly_travel in proptest::bool::ANY,
            debt in 0.0f64..2_000.0,
            shock_month in 0u32..60,
            shock_size in 0.0f64..20_000.0,
            inflation in 0.0f64..15.0,
            ret in -5.0f64..15.0,
        ) {
            let input = RunSimulationInput {
                parameters: ScenarioParameters {
                    horizon_months: horizon,
                    income_delta_pct: income_delta,
                    rent_delta_pct: rent_delta,
                    discretionary_delta_pct: discretionary_delta,
                    travel_budget: travel,
                    travel_recurrence: if monthly_travel {
                        TravelRecurrence::Monthly
                    } else {
                        TravelRecurrence::OneOff
                    },
                    extra_debt_payment: debt,
                    start_date: None,
                },
                shocks: vec![shock(shock_month, ShockKind::JobLoss, shock_size)],
                assumptions: Some(ScenarioAssumptions {
                    inflation_pct: inflation,
                    return_pct: ret,
                    savings_rate_pct: 12.0,
                }),
                baseline_date: Some(date(2025, 6, 1)),
            };
            let config = EngineConfig::default();
            let a = run_simulation(&input, &config);
            let b = run_simulation(&input, &config);
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.points.len(), clamp_horizon(horizon) as usize);
            prop_assert!(a.risk_score <= 100);
            prop_assert!(a.points.iter().all(|p| (0.0..=1.0).contains(&p.goal_progress)));
            if (a.runway_months as usize) < a.points.len() {
                let runway = a.runway_months as usize;
                prop_assert!(a.points[runway].balance < 0.0);
                prop_assert!(a.points[..runway].iter().all(|p| p.balance >= 0.0));
            } else {
                prop_assert!(a.points.iter().all(|p| p.balance >= 0.0));
            }
        }

        #[test]
        fn prop_higher_savings_rate_never_delays_goal_etas(
            income_delta in -20.0f64..80.0,
            low_rate in 0.0f64..60.0,
            extra_rate in 0.0f64..40.0,
        ) {
            let mut input = baseline_input(60);
            input.parameters.income_delta_pct = income_delta;
            let config = EngineConfig::default();

            input.assumptions = Some(ScenarioAssumptions {
                savings_rate_pct: low_rate,
                ..ScenarioAssumptions::default()
            });
            let low = run_simulation(&input, &config);
            input.assumptions = Some(ScenarioAssumptions {
                savings_rate_pct: low_rate + extra_rate,
                ..ScenarioAssumptions::default()
            });
            let high = run_simulation(&input, &config);

            for eta in &low.goal_etas {
                let faster = high.goal_etas.iter().find(|g| g.goal_id == eta.goal_id);
                prop_assert!(faster.is_some());
                if let Some(faster) = faster {
                    prop_assert!(faster.eta_date <= eta.eta_date);
                }
            }
        }
    }
}
