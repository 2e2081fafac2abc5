//! Budget status of the selected controls. Derived on demand, never stored.

use rq_common::model::Budget;
use rq_config::BudgetThresholds;
use rq_math::{finite_or_zero, safe_ratio};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    /// No positive budget has been entered.
    Unset,
    Within,
    NearLimit,
    Over,
}

impl BudgetStatus {
    pub fn is_over(self) -> bool {
        matches!(self, BudgetStatus::Over)
    }
}

impl std::fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BudgetStatus::Unset => write!(f, "unset"),
            BudgetStatus::Within => write!(f, "within budget"),
            BudgetStatus::NearLimit => write!(f, "near limit"),
            BudgetStatus::Over => write!(f, "over budget"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    pub budget: f64,
    pub total_cost: f64,
    pub remaining: f64,
    pub utilization_pct: f64,
    pub status: BudgetStatus,
}

pub fn summarize(budget: f64, selected_cost: f64, thresholds: &BudgetThresholds) -> BudgetSummary {
    let budget = finite_or_zero(budget);
    let cost = finite_or_zero(selected_cost);
    let utilization_pct = safe_ratio(cost, budget) * 100.0;

    let status = if budget <= 0.0 {
        BudgetStatus::Unset
    } else if utilization_pct > 100.0 {
        BudgetStatus::Over
    } else if utilization_pct >= thresholds.near_limit_pct {
        BudgetStatus::NearLimit
    } else {
        BudgetStatus::Within
    };

    BudgetSummary {
        budget,
        total_cost: cost,
        remaining: budget - cost,
        utilization_pct,
        status,
    }
}

/// Summary for an optional budget record.
pub fn summarize_record(
    record: Option<&Budget>,
    selected_cost: f64,
    thresholds: &BudgetThresholds,
) -> BudgetSummary {
    summarize(
        record.map(|b| b.total_budget).unwrap_or(0.0),
        selected_cost,
        thresholds,
    )
}
