//! Loss event frequency.

use rq_common::levels::score_or_zero;
use rq_common::model::{Asset, UserPreference};
use rq_common::{AssetId, RelevanceLevel, VulnerabilityId};
use rq_math::finite_or_zero;
use serde::Serialize;

/// Fixed divisor applied to the summed per-vulnerability LEF.
///
/// Internal and external likelihood estimates are elicited separately and
/// both feed the sum.
pub const LEF_NORMALIZER: f64 = 2.0;

/// `VL × TEF`, with VL taken from the relevance table.
pub fn vulnerability_lef(level: Option<RelevanceLevel>, tef: f64) -> f64 {
    score_or_zero(level) * finite_or_zero(tef)
}

/// `Σ LEF / 2`.
pub fn total_lef<I>(lefs: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    lefs.into_iter().map(finite_or_zero).sum::<f64>() / LEF_NORMALIZER
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VulnerabilityLef {
    pub asset_id: AssetId,
    pub vulnerability_id: VulnerabilityId,
    pub level: Option<RelevanceLevel>,
    pub likelihood: f64,
    pub lef: f64,
}

/// LEF of every asset vulnerability the user has assigned a level to.
///
/// Vulnerabilities without a level are not matched and contribute nothing.
pub fn matched_vulnerabilities(
    assets: &[Asset],
    preference: &UserPreference,
    tef: f64,
) -> Vec<VulnerabilityLef> {
    assets
        .iter()
        .flat_map(|asset| {
            asset.vulnerabilities.iter().filter_map(move |v| {
                let level = preference.vulnerability_level(&v.id)?;
                Some(VulnerabilityLef {
                    asset_id: asset.id.clone(),
                    vulnerability_id: v.id.clone(),
                    level: Some(level),
                    likelihood: score_or_zero(Some(level)),
                    lef: vulnerability_lef(Some(level), tef),
                })
            })
        })
        .collect()
}
