//! NRR, cost and ROSI of controls.

use rq_common::model::{Control, ControlCosts};
use rq_common::ControlName;
use rq_math::{finite_or_zero, safe_ratio};
use serde::Serialize;

use super::interaction::InteractionMatrix;

/// `TotalRisk × Rd − Pnew × Rnew`. Negative values are kept.
pub fn net_risk_reduction(total_risk: f64, control: &Control) -> f64 {
    finite_or_zero(total_risk) * finite_or_zero(control.risk_reduction)
        - finite_or_zero(control.residual_probability) * finite_or_zero(control.residual_risk)
}

/// Sum of the four cost categories.
pub fn total_cost(costs: &ControlCosts) -> f64 {
    [costs.purchase, costs.operational, costs.training, costs.manpower]
        .into_iter()
        .map(finite_or_zero)
        .sum()
}

/// `(NRR − cost) / cost`, `0.0` when the cost is zero.
pub fn rosi(nrr: f64, cost: f64) -> f64 {
    safe_ratio(nrr - cost, cost)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlEvaluation {
    pub name: ControlName,
    pub selected: bool,
    pub total_cost: f64,
    pub net_risk_reduction: f64,
    pub rosi: f64,
}

pub fn evaluate_control(total_risk: f64, control: &Control) -> ControlEvaluation {
    let cost = total_cost(&control.costs);
    let nrr = net_risk_reduction(total_risk, control);
    ControlEvaluation {
        name: control.name.clone(),
        selected: control.included.is_selected(),
        total_cost: cost,
        net_risk_reduction: nrr,
        rosi: rosi(nrr, cost),
    }
}

/// Economics of the selected controls.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioEvaluation {
    /// Selected controls, best ROSI first.
    pub controls: Vec<ControlEvaluation>,
    pub total_cost: f64,
    pub total_net_risk_reduction: f64,
    pub portfolio_rosi: f64,
    pub synergy: f64,
}

impl PortfolioEvaluation {
    pub fn selected_names(&self) -> Vec<ControlName> {
        self.controls.iter().map(|c| c.name.clone()).collect()
    }
}

pub fn evaluate_portfolio(
    total_risk: f64,
    controls: &[Control],
    matrix: &InteractionMatrix,
) -> PortfolioEvaluation {
    let mut evaluations: Vec<ControlEvaluation> = controls
        .iter()
        .filter(|c| c.included.is_selected())
        .map(|c| evaluate_control(total_risk, c))
        .collect();
    evaluations.sort_by(|a, b| b.rosi.total_cmp(&a.rosi));

    let cost: f64 = evaluations.iter().map(|e| e.total_cost).sum();
    let nrr: f64 = evaluations.iter().map(|e| e.net_risk_reduction).sum();
    let names: Vec<ControlName> = evaluations.iter().map(|e| e.name.clone()).collect();
    let synergy = matrix.synergy(&names);

    tracing::debug!(
        event = crate::logging::event_names::CONTROLS_EVALUATED,
        selected = evaluations.len(),
        total_cost = cost,
        total_nrr = nrr,
        synergy,
        "evaluated control portfolio"
    );

    PortfolioEvaluation {
        controls: evaluations,
        total_cost: cost,
        total_net_risk_reduction: nrr,
        portfolio_rosi: rosi(nrr, cost),
        synergy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rq_common::model::Inclusion;

    fn control(name: &str, cost: f64, rd: f64, included: bool) -> Control {
        Control {
            name: name.into(),
            costs: ControlCosts {
                purchase: cost,
                ..ControlCosts::default()
            },
            included: included.into(),
            risk_reduction: rd,
            residual_probability: 0.0,
            residual_risk: 0.0,
        }
    }

    #[test]
    fn nrr_may_be_negative() {
        let mut c = control("x", 1.0, 0.1, true);
        c.residual_probability = 0.5;
        c.residual_risk = 4.0;
        assert!((net_risk_reduction(10.0, &c) - (1.0 - 2.0)).abs() < 1e-12);
    }

    #[test]
    fn cost_sums_categories() {
        let costs = ControlCosts {
            purchase: 1.0,
            operational: 0.5,
            training: 0.25,
            manpower: 0.25,
        };
        assert_eq!(total_cost(&costs), 2.0);
    }

    #[test]
    fn rosi_zero_cost_is_zero() {
        assert_eq!(rosi(5.0, 0.0), 0.0);
        assert!(rosi(5.0, 0.0).is_finite());
        assert_eq!(rosi(3.0, 1.0), 2.0);
    }

    #[test]
    fn portfolio_sorted_by_rosi_and_excludes_unselected() {
        let controls = vec![
            control("low", 2.0, 0.1, true),
            control("high", 1.0, 0.5, true),
            control("skip", 1.0, 0.9, false),
        ];
        let mut matrix = InteractionMatrix::new(controls.iter().map(|c| c.name.clone()));
        matrix.set(&"low".into(), &"high".into(), 0.4).unwrap();
        matrix.set(&"skip".into(), &"high".into(), 0.9).unwrap();

        let p = evaluate_portfolio(10.0, &controls, &matrix);
        assert_eq!(p.selected_names(), vec![ControlName::from("high"), "low".into()]);
        assert_eq!(p.total_cost, 3.0);
        assert!((p.synergy - 0.4).abs() < 1e-12);
        assert_eq!(controls[2].included, Inclusion::No);
    }
}
