//! Total risk.

use rq_common::model::{Asset, UserPreference};
use rq_common::AssetId;
use rq_math::finite_or_zero;
use serde::Serialize;

use crate::loss::{
    criticality, matched_vulnerabilities, primary_loss_magnitude, total_lef, LossLedger,
    VulnerabilityLef,
};

/// `TotalLEF × PLM + SLM`.
pub fn total_risk(total_lef: f64, plm: f64, slm: f64) -> f64 {
    finite_or_zero(total_lef) * finite_or_zero(plm) + finite_or_zero(slm)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetLoss {
    pub asset_id: AssetId,
    pub name: String,
    pub value: f64,
    pub criticality: f64,
    pub primary_loss: f64,
    pub secondary_loss: f64,
}

/// Organization-wide risk roll-up.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub tef: f64,
    pub assets: Vec<AssetLoss>,
    pub vulnerabilities: Vec<VulnerabilityLef>,
    pub primary_loss_magnitude: f64,
    pub secondary_loss_magnitude: f64,
    pub total_lef: f64,
    pub total_risk: f64,
}

/// Roll PLM and SLM up over the assets and combine them with the LEF of
/// every vulnerability the user levelled.
pub fn assess(
    assets: &[Asset],
    ledger: &LossLedger,
    vulnerability_levels: &UserPreference,
    tef: f64,
) -> RiskAssessment {
    let rows: Vec<AssetLoss> = assets
        .iter()
        .map(|a| AssetLoss {
            asset_id: a.id.clone(),
            name: a.name.clone(),
            value: a.value,
            criticality: criticality(a),
            primary_loss: primary_loss_magnitude(a),
            secondary_loss: ledger.secondary_loss_magnitude(&a.id),
        })
        .collect();

    let plm: f64 = rows.iter().map(|r| r.primary_loss).sum();
    let slm: f64 = rows.iter().map(|r| r.secondary_loss).sum();
    let vulnerabilities = matched_vulnerabilities(assets, vulnerability_levels, tef);
    let lef = total_lef(vulnerabilities.iter().map(|v| v.lef));
    let risk = total_risk(lef, plm, slm);

    tracing::debug!(
        event = crate::logging::event_names::RISK_TOTAL,
        stage = %crate::logging::Stage::Risk,
        plm,
        slm,
        total_lef = lef,
        total_risk = risk,
        matched = vulnerabilities.len(),
        "computed total risk"
    );

    RiskAssessment {
        tef,
        assets: rows,
        vulnerabilities,
        primary_loss_magnitude: plm,
        secondary_loss_magnitude: slm,
        total_lef: lef,
        total_risk: risk,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rq_common::model::Vulnerability;
    use rq_common::{PreferenceKey, RelevanceLevel};
    use rq_config::RiskQuantConfig;

    #[test]
    fn total_risk_formula() {
        assert!((total_risk(0.25, 10.0, 3.0) - 5.5).abs() < 1e-12);
        assert_eq!(total_risk(0.0, 10.0, 3.0), 3.0);
    }

    #[test]
    fn assess_rolls_up_assets() {
        let assets = vec![
            Asset {
                id: "db".into(),
                name: "DB".into(),
                value: 2.0,
                organization_id: None,
                vulnerabilities: vec![
                    Vulnerability {
                        id: "v1".into(),
                        name: String::new(),
                        cvss: 8.0,
                    },
                    Vulnerability {
                        id: "v2".into(),
                        name: String::new(),
                        cvss: 4.0,
                    },
                ],
            },
            Asset {
                id: "web".into(),
                name: "Web".into(),
                value: 1.0,
                organization_id: None,
                vulnerabilities: vec![],
            },
        ];
        let mut ledger = LossLedger::from_defaults(&RiskQuantConfig::default().loss_types);
        ledger.set_amount(&"web".into(), &"response".into(), 3.0).unwrap();

        let mut pref =
            UserPreference::new(PreferenceKey::organization_assets("u".into(), "org".into()));
        pref.set_vulnerability_level("v1".into(), Some(RelevanceLevel::VeryHigh));
        pref.set_vulnerability_level("v2".into(), Some(RelevanceLevel::VeryHigh));

        let r = assess(&assets, &ledger, &pref, 0.25);
        assert_eq!(r.primary_loss_magnitude, 12.0);
        assert_eq!(r.secondary_loss_magnitude, 3.0);
        // (0.25 + 0.25) / 2
        assert!((r.total_lef - 0.25).abs() < 1e-12);
        assert!((r.total_risk - 6.0).abs() < 1e-12);
        assert_eq!(r.assets.len(), 2);
    }
}
