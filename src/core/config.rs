use serde::{Deserialize, Serialize};

/// Household figures the scenario deltas are applied to.
///
/// `rent` and `discretionary` are components of `expenses`; whatever is left
/// over is treated as fixed spending that no scenario lever touches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BaselineProfile {
    pub income: f64,
    pub expenses: f64,
    pub rent: f64,
    pub discretionary: f64,
    pub starting_balance: f64,
}

impl BaselineProfile {
    pub fn fixed_expenses(&self) -> f64 {
        self.expenses - self.rent - self.discretionary
    }
}

impl Default for BaselineProfile {
    fn default() -> Self {
        Self {
            income: 6_800.0,
            expenses: 5_200.0,
            rent: 2_100.0,
            discretionary: 1_400.0,
            starting_balance: 12_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalTarget {
    pub id: String,
    pub target: f64,
}

impl GoalTarget {
    pub fn new(id: impl Into<String>, target: f64) -> Self {
        Self {
            id: id.into(),
            target,
        }
    }
}

pub fn canonical_goals() -> Vec<GoalTarget> {
    vec![
        GoalTarget::new("emergency", 5_000.0),
        GoalTarget::new("education", 7_500.0),
        GoalTarget::new("travel", 10_000.0),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub baseline: BaselineProfile,
    pub goals: Vec<GoalTarget>,
}

impl EngineConfig {
    pub fn with_baseline(baseline: BaselineProfile) -> Self {
        Self {
            baseline,
            ..Self::default()
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            baseline: BaselineProfile::default(),
            goals: canonical_goals(),
        }
    }
}
