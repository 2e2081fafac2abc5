//! User preferences over threat actors and organization assets.
//!
//! Motivations and goals arrive in two shapes: as fields of the threat actor
//! and as override records in the user's preference. `canonical_factors`
//! merges both into plain `WeightedFactor`s so scoring only sees one shape.

use rq_common::model::{
    FactorOverride, SophisticationResourceWeights, ThreatActor, UserPreference, WeightedFactor,
};
use rq_common::{FactorId, PreferenceKey, RelevanceLevel, VulnerabilityId};
use rq_math::WeightError;
use serde::{Deserialize, Serialize};

use crate::repository::{PreferenceRepository, RepositoryError};
use crate::scoring::{aggregate, complementary_weights};
use crate::sync::{SaveError, SaveState, SaveTracker};

/// Apply overrides to stored factors.
///
/// Weight and relevance are overridden independently. Overrides for ids the
/// actor does not have are ignored and factor order is kept.
pub fn canonical_factors(
    stored: &[WeightedFactor],
    overrides: &[FactorOverride],
) -> Vec<WeightedFactor> {
    stored
        .iter()
        .map(|factor| {
            let found = overrides.iter().find(|o| o.target() == Some(&factor.id));
            match found {
                Some(o) => WeightedFactor {
                    id: factor.id.clone(),
                    name: factor.name.clone(),
                    relevance_level: o.relevance_level.or(factor.relevance_level),
                    weight: o
                        .weight
                        .filter(|w| w.is_finite())
                        .unwrap_or(factor.weight),
                },
                None => factor.clone(),
            }
        })
        .collect()
}

/// The user's sophistication/resource split, or the configured default.
pub fn ability_weights(
    preference: Option<&UserPreference>,
    default: SophisticationResourceWeights,
) -> SophisticationResourceWeights {
    preference
        .and_then(|p| p.sophistication_resource_weights)
        .unwrap_or(default)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    Motivation,
    Goal,
}

/// Editable motivations or goals of one actor, weights kept summing to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorSet {
    kind: FactorKind,
    factors: Vec<WeightedFactor>,
}

impl FactorSet {
    pub fn new(kind: FactorKind, factors: Vec<WeightedFactor>) -> Self {
        FactorSet { kind, factors }
    }

    /// Actor factors with the preference's overrides applied.
    pub fn from_actor(
        actor: &ThreatActor,
        kind: FactorKind,
        preference: Option<&UserPreference>,
    ) -> Self {
        let (stored, overrides) = match kind {
            FactorKind::Motivation => (
                &actor.motivations,
                preference.map(|p| p.motivation_analysis.as_slice()),
            ),
            FactorKind::Goal => (&actor.goals, preference.map(|p| p.goals_analysis.as_slice())),
        };
        FactorSet::new(kind, canonical_factors(stored, overrides.unwrap_or_default()))
    }

    pub fn kind(&self) -> FactorKind {
        self.kind
    }

    pub fn factors(&self) -> &[WeightedFactor] {
        &self.factors
    }

    pub fn get(&self, id: &FactorId) -> Option<&WeightedFactor> {
        self.factors.iter().find(|f| &f.id == id)
    }

    /// Set one weight and redistribute the difference over the others.
    pub fn set_weight(&mut self, id: &FactorId, weight: f64) -> Result<(), WeightError> {
        let mut weights: Vec<(FactorId, f64)> = self
            .factors
            .iter()
            .map(|f| (f.id.clone(), f.weight))
            .collect();
        rq_math::redistribute(&mut weights, id, weight)?;
        for (factor, (_, w)) in self.factors.iter_mut().zip(weights) {
            factor.weight = w;
        }
        Ok(())
    }

    pub fn set_relevance(
        &mut self,
        id: &FactorId,
        level: Option<RelevanceLevel>,
    ) -> Result<(), WeightError> {
        let factor = self
            .factors
            .iter_mut()
            .find(|f| &f.id == id)
            .ok_or_else(|| WeightError::UnknownKey(id.to_string()))?;
        factor.relevance_level = level;
        Ok(())
    }

    pub fn score(&self) -> f64 {
        aggregate(&self.factors)
    }

    /// One override per factor, ready to persist.
    pub fn overrides(&self) -> Vec<FactorOverride> {
        self.factors
            .iter()
            .map(|f| FactorOverride::new(f.id.clone(), f.relevance_level, Some(f.weight)))
            .collect()
    }

    /// Replace the matching override list of a preference.
    pub fn apply_to(&self, preference: &mut UserPreference) {
        let overrides = self.overrides();
        match self.kind {
            FactorKind::Motivation => preference.motivation_analysis = overrides,
            FactorKind::Goal => preference.goals_analysis = overrides,
        }
    }
}

/// Local editing session over one preference record.
///
/// `confirmed` is the last state the repository acknowledged; edits go to
/// `working`. A failed save restores `working` from `confirmed`.
#[derive(Debug, Clone)]
pub struct PreferenceEditor {
    confirmed: UserPreference,
    working: UserPreference,
    tracker: SaveTracker,
}

impl PreferenceEditor {
    pub fn new(confirmed: UserPreference) -> Self {
        PreferenceEditor {
            working: confirmed.clone(),
            confirmed,
            tracker: SaveTracker::new(),
        }
    }

    /// Read the stored record, or start an empty one that will be created on
    /// first save.
    pub fn load<R>(repo: &R, key: PreferenceKey) -> Result<Self, RepositoryError>
    where
        R: PreferenceRepository + ?Sized,
    {
        let confirmed = repo
            .get(&key)?
            .unwrap_or_else(|| UserPreference::new(key));
        Ok(Self::new(confirmed))
    }

    pub fn working(&self) -> &UserPreference {
        &self.working
    }

    pub fn confirmed(&self) -> &UserPreference {
        &self.confirmed
    }

    pub fn save_state(&self) -> &SaveState {
        self.tracker.state()
    }

    pub fn is_dirty(&self) -> bool {
        self.working != self.confirmed
    }

    /// Set `w1` and its complement `w2 = 1 - w1`.
    pub fn set_sophistication_weight(&mut self, w1: f64) -> Result<(), WeightError> {
        if !w1.is_finite() {
            return Err(WeightError::NonFinite(w1));
        }
        self.working.sophistication_resource_weights = Some(complementary_weights(w1));
        Ok(())
    }

    /// Edit an actor's motivations or goals and store the result as overrides.
    pub fn edit_factors<F>(
        &mut self,
        actor: &ThreatActor,
        kind: FactorKind,
        edit: F,
    ) -> Result<FactorSet, WeightError>
    where
        F: FnOnce(&mut FactorSet) -> Result<(), WeightError>,
    {
        let mut set = FactorSet::from_actor(actor, kind, Some(&self.working));
        edit(&mut set)?;
        set.apply_to(&mut self.working);
        Ok(set)
    }

    pub fn set_vulnerability_level(&mut self, id: VulnerabilityId, level: Option<RelevanceLevel>) {
        self.working.set_vulnerability_level(id, level);
    }

    /// Enter `Saving` and hand out the record to send.
    pub fn begin_save(&mut self) -> Result<UserPreference, SaveError> {
        self.tracker.begin()?;
        Ok(self.working.clone())
    }

    /// Settle a save started with `begin_save`.
    ///
    /// Without a save in flight nothing is touched and `SaveInFlight` is
    /// returned.
    pub fn finish_save(
        &mut self,
        outcome: Result<UserPreference, RepositoryError>,
    ) -> rq_common::Result<&UserPreference> {
        match outcome {
            Ok(stored) => {
                self.tracker.commit()?;
                self.confirmed = stored.clone();
                self.working = stored;
                Ok(&self.confirmed)
            }
            Err(e) => {
                self.tracker.fail(e.to_string())?;
                tracing::warn!(key = %self.confirmed.key, error = %e, "preference save failed, reverting");
                self.working = self.confirmed.clone();
                Err(e.into())
            }
        }
    }

    pub fn save_with<R>(&mut self, repo: &mut R) -> rq_common::Result<&UserPreference>
    where
        R: PreferenceRepository + ?Sized,
    {
        let pending = self.begin_save()?;
        let outcome = repo.save(&pending);
        self.finish_save(outcome)
    }

    /// Offer a freshly fetched record. Ignored while a save is in flight.
    pub fn apply_reload(&mut self, fetched: UserPreference) -> bool {
        if !self.tracker.can_accept_reload() {
            tracing::debug!(key = %fetched.key, "reload ignored while saving");
            return false;
        }
        self.confirmed = fetched.clone();
        self.working = fetched;
        true
    }
}
