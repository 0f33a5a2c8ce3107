use super::engine::{MAX_HORIZON_MONTHS, month_date, pct_factor, today};
use super::types::{GoalFundingInput, GoalFundingPoint, GoalFundingResult};

const WEEKS_PER_MONTH: f64 = 52.0 / 12.0;

/// Steps a single savings goal forward one month at a time, the same way the
/// scenario projector walks its horizon, until the target is met or the
/// horizon cap runs out.
pub fn simulate_goal_funding(input: &GoalFundingInput) -> GoalFundingResult {
    let baseline_date = input.start_date.unwrap_or_else(today);
    let monthly_contribution =
        input.weekly_contribution * WEEKS_PER_MONTH * pct_factor(input.income_change_pct);
    let target = input.target_amount;

    let mut result = GoalFundingResult {
        monthly_contribution,
        points: Vec::new(),
        months_to_target: None,
        eta_date: None,
    };

    let mut balance = input.current_amount;
    if target <= 0.0 || balance >= target {
        result.months_to_target = Some(0);
        result.eta_date = Some(baseline_date);
        return result;
    }

    for month in 0..MAX_HORIZON_MONTHS {
        balance += monthly_contribution;
        let date = month_date(baseline_date, month);
        result.points.push(GoalFundingPoint {
            date,
            balance,
            progress: (balance / target).clamp(0.0, 1.0),
        });

        if balance >= target {
            result.months_to_target = Some(month + 1);
            result.eta_date = Some(date);
            break;
        }
    }

    result
}
