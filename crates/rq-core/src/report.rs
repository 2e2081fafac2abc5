//! Evaluation report and its renderings.

use chrono::{DateTime, Utc};
use rq_common::OrganizationId;
use rq_config::ConfigSnapshot;
use serde::Serialize;
use std::fmt::Write as _;

use crate::budget::BudgetSummary;
use crate::controls::{MatrixRow, PortfolioEvaluation};
use crate::risk::RiskAssessment;
use crate::scoring::TefBreakdown;
use crate::session::DerivedSnapshot;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskReport {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub run_id: String,
    pub organization_id: OrganizationId,
    /// `None` when the scenario lists no threat actors.
    pub threat: Option<TefBreakdown>,
    pub risk: RiskAssessment,
    pub portfolio: PortfolioEvaluation,
    pub interaction_matrix: Vec<MatrixRow>,
    pub budget: BudgetSummary,
    pub derived: DerivedSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigSnapshot>,
}

impl RiskReport {
    pub fn with_config(mut self, snapshot: ConfigSnapshot) -> Self {
        self.config = Some(snapshot);
        self
    }

    /// One line for quick status checks.
    pub fn summary_line(&self) -> String {
        let actor = self
            .threat
            .as_ref()
            .map(|t| t.threat_actor_id.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{}: actor={} TEF={:.4} TotalLEF={:.4} TotalRisk={:.2} controls={} cost={:.2} budget={}",
            self.organization_id,
            actor,
            self.derived.tef,
            self.derived.total_lef,
            self.derived.total_risk,
            self.portfolio.controls.len(),
            self.portfolio.total_cost,
            self.budget.status,
        )
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let _ = writeln!(md, "# Risk report: {}\n", self.organization_id);
        let _ = writeln!(md, "Generated {} (run `{}`)\n", self.generated_at.to_rfc3339(), self.run_id);

        let _ = writeln!(md, "## Threat\n");
        match &self.threat {
            Some(t) => {
                let _ = writeln!(md, "| Factor | Value |\n|---|---|");
                let _ = writeln!(md, "| Threat actor | {} ({}) |", t.threat_actor_name, t.threat_actor_id);
                let _ = writeln!(md, "| Threat ability | {:.4} |", t.factors.threat_ability);
                let _ = writeln!(md, "| Motivation | {:.4} |", t.factors.motivation_score);
                let _ = writeln!(md, "| Goal | {:.4} |", t.factors.goal_score);
                let _ = writeln!(md, "| Location match | {} |", t.factors.location_match);
                let _ = writeln!(md, "| Sector match | {} |", t.factors.sector_match);
                let _ = writeln!(md, "| **TEF** | **{:.4}** |\n", t.tef);
            }
            None => {
                let _ = writeln!(md, "No threat actor selected.\n");
            }
        }

        let _ = writeln!(md, "## Loss\n");
        let _ = writeln!(md, "| Asset | Value | Criticality | PLM | SLM |\n|---|---|---|---|---|");
        for a in &self.risk.assets {
            let _ = writeln!(
                md,
                "| {} | {:.2} | {:.2} | {:.2} | {:.2} |",
                a.name, a.value, a.criticality, a.primary_loss, a.secondary_loss
            );
        }
        let _ = writeln!(
            md,
            "\nTotal LEF {:.4}, PLM {:.2}, SLM {:.2}, **Total risk {:.2}**\n",
            self.risk.total_lef,
            self.risk.primary_loss_magnitude,
            self.risk.secondary_loss_magnitude,
            self.risk.total_risk
        );

        let _ = writeln!(md, "## Controls\n");
        if self.portfolio.controls.is_empty() {
            let _ = writeln!(md, "No controls selected.\n");
        } else {
            let _ = writeln!(md, "| Control | Cost | NRR | ROSI |\n|---|---|---|---|");
            for c in &self.portfolio.controls {
                let _ = writeln!(
                    md,
                    "| {} | {:.2} | {:.2} | {:.2} |",
                    c.name, c.total_cost, c.net_risk_reduction, c.rosi
                );
            }
            let _ = writeln!(md, "\nSynergy {:.2}\n", self.portfolio.synergy);
        }

        let _ = writeln!(md, "## Budget\n");
        let _ = writeln!(
            md,
            "Budget {:.2}, selected cost {:.2}, remaining {:.2} ({:.1}% used, {})",
            self.budget.budget,
            self.budget.total_cost,
            self.budget.remaining,
            self.budget.utilization_pct,
            self.budget.status
        );
        md
    }
}
