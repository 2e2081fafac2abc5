//! Editing sessions against the in-memory repository: preference saves,
//! interaction cell edits and loss ledger writes, including rollback when
//! the repository refuses a write.

use rq_common::{ControlName, OrganizationId, RelevanceLevel, ResourceLevel, SophisticationLevel};
use rq_config::RiskQuantConfig;
use rq_core::controls::{CellEditState, EditError, EditOutcome, MatrixEditor};
use rq_core::loss::LossLedger;
use rq_core::preference::{FactorKind, PreferenceEditor};
use rq_core::repository::{
    upsert_interaction, InteractionRepository, LossRepository, MemoryRepository,
    PreferenceRepository,
};
use rq_core::scoring::score_threat_actor;
use rq_core::sync::SaveState;
use rq_core::test_utils::{actor_key, interaction, organization, ActorBuilder, TEST_ORG};
use rq_core::{assert_approx_eq, assert_ok};

fn n(s: &str) -> ControlName {
    ControlName::from(s)
}

fn org() -> OrganizationId {
    OrganizationId::from(TEST_ORG)
}

mod preferences {
    use super::*;

    fn actor() -> rq_common::model::ThreatActor {
        ActorBuilder::new("apt-1")
            .levels(SophisticationLevel::Expert, ResourceLevel::Organization)
            .located("US", "Finance")
            .motivation("m-1", RelevanceLevel::High, 0.5)
            .motivation("m-2", RelevanceLevel::Low, 0.3)
            .motivation("m-3", RelevanceLevel::Moderate, 0.2)
            .goal("g-1", RelevanceLevel::VeryHigh, 1.0)
            .build()
    }

    #[test]
    fn first_save_creates_the_record() {
        let mut repo = MemoryRepository::new();
        let mut editor = assert_ok!(PreferenceEditor::load(&repo, actor_key("apt-1")));
        assert!(!editor.is_dirty());

        assert_ok!(editor.set_sophistication_weight(0.7));
        assert!(editor.is_dirty());
        let saved = assert_ok!(editor.save_with(&mut repo)).clone();

        assert_eq!(editor.save_state(), &SaveState::Saved);
        assert!(!editor.is_dirty());
        assert!(saved.created_at.is_some());
        let stored = assert_ok!(repo.get(&actor_key("apt-1"))).unwrap();
        let weights = stored.sophistication_resource_weights.unwrap();
        assert_approx_eq!(weights.sophistication, 0.7);
        assert_approx_eq!(weights.resource, 0.3);
    }

    #[test]
    fn failed_save_reverts_working_copy() {
        let mut repo = MemoryRepository::new();
        let mut editor = assert_ok!(PreferenceEditor::load(&repo, actor_key("apt-1")));
        assert_ok!(editor.set_sophistication_weight(0.6));
        assert_ok!(editor.save_with(&mut repo));

        repo.set_offline(true);
        assert_ok!(editor.set_sophistication_weight(0.9));
        let err = editor.save_with(&mut repo).unwrap_err();
        assert_eq!(err.code(), 40);

        assert!(matches!(editor.save_state(), SaveState::Failed { .. }));
        let weights = editor.working().sophistication_resource_weights.unwrap();
        assert_approx_eq!(weights.sophistication, 0.6);
        assert!(!editor.is_dirty());
    }

    #[test]
    fn reload_is_ignored_while_saving() {
        let repo = MemoryRepository::new();
        let mut editor = assert_ok!(PreferenceEditor::load(&repo, actor_key("apt-1")));
        assert_ok!(editor.set_sophistication_weight(0.4));
        let pending = assert_ok!(editor.begin_save());

        let stale = rq_common::model::UserPreference::new(actor_key("apt-1"));
        assert!(!editor.apply_reload(stale.clone()));
        assert!(editor.begin_save().is_err());

        assert_ok!(editor.finish_save(Ok(pending)));
        assert!(editor.apply_reload(stale));
        assert!(editor.working().sophistication_resource_weights.is_none());
    }

    #[test]
    fn weight_edit_redistributes_and_changes_tef() {
        let actor = actor();
        let org = organization("US", "Finance");
        let mut repo = MemoryRepository::new();
        let mut editor = assert_ok!(PreferenceEditor::load(&repo, actor_key("apt-1")));

        let before = score_threat_actor(&actor, &org, None, Default::default()).tef;
        let set = assert_ok!(editor.edit_factors(&actor, FactorKind::Motivation, |set| {
            set.set_weight(&"m-1".into(), 0.8)
        }));

        let total: f64 = set.factors().iter().map(|f| f.weight).sum();
        assert_approx_eq!(total, 1.0);
        assert_approx_eq!(set.get(&"m-1".into()).unwrap().weight, 0.8);
        // The others keep their 3:2 ratio.
        assert_approx_eq!(set.get(&"m-2".into()).unwrap().weight, 0.12);
        assert_approx_eq!(set.get(&"m-3".into()).unwrap().weight, 0.08);

        assert_ok!(editor.save_with(&mut repo));
        let stored = assert_ok!(repo.get(&actor_key("apt-1"))).unwrap();
        let after = score_threat_actor(&actor, &org, Some(&stored), Default::default()).tef;
        assert!(after > before, "more weight on a High motivation raises TEF");
    }

    #[test]
    fn unknown_factor_edit_leaves_preference_untouched() {
        let actor = actor();
        let repo = MemoryRepository::new();
        let mut editor = assert_ok!(PreferenceEditor::load(&repo, actor_key("apt-1")));
        let result = editor.edit_factors(&actor, FactorKind::Goal, |set| {
            set.set_weight(&"nope".into(), 0.5)
        });
        assert!(result.is_err());
        assert!(editor.working().goals_analysis.is_empty());
    }
}

mod interaction_matrix {
    use super::*;

    fn editor(repo: &MemoryRepository) -> MatrixEditor {
        assert_ok!(MatrixEditor::load(repo, org(), [n("mfa"), n("edr"), n("waf")]))
    }

    #[test]
    fn loads_symmetric_values() {
        let repo = MemoryRepository::new().with_interaction(interaction("mfa", "edr", 0.3));
        let ed = editor(&repo);
        assert_eq!(ed.matrix().get(&n("mfa"), &n("edr")), Some(0.3));
        assert_eq!(ed.matrix().get(&n("edr"), &n("mfa")), Some(0.3));
        assert_eq!(ed.matrix().get(&n("mfa"), &n("mfa")), None);
    }

    #[test]
    fn commit_persists_under_canonical_pair() {
        let mut repo = MemoryRepository::new();
        let mut ed = editor(&repo);
        assert_ok!(ed.begin_edit(&n("waf"), &n("edr")));
        assert_ok!(ed.set_draft(0.4));
        let outcome = assert_ok!(ed.commit(&mut repo));

        assert_eq!(
            outcome,
            EditOutcome::Saved {
                previous: None,
                value: 0.4
            }
        );
        assert_eq!(ed.state(), &CellEditState::Idle);
        let stored = assert_ok!(repo.find(&org(), &n("waf"), &n("edr"))).unwrap();
        assert_eq!(stored.control_a, n("edr"));
        assert_eq!(stored.control_b, n("waf"));
    }

    #[test]
    fn second_commit_updates_existing_record() {
        let mut repo = MemoryRepository::new().with_interaction(interaction("edr", "mfa", 0.2));
        let mut ed = editor(&repo);
        assert_ok!(ed.begin_edit(&n("mfa"), &n("edr")));
        assert_ok!(ed.set_draft(0.6));
        assert_ok!(ed.commit(&mut repo));

        let records = assert_ok!(repo.list(&org()));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].interaction_effect, Some(0.6));
    }

    #[test]
    fn failed_commit_restores_original() {
        let mut repo = MemoryRepository::new().with_interaction(interaction("edr", "mfa", 0.2));
        let mut ed = editor(&repo);
        repo.set_offline(true);

        assert_ok!(ed.begin_edit(&n("mfa"), &n("edr")));
        assert_ok!(ed.set_draft(0.9));
        let err = ed.commit(&mut repo).unwrap_err();

        assert!(matches!(err, EditError::SaveFailed(_)));
        assert_eq!(ed.matrix().get(&n("mfa"), &n("edr")), Some(0.2));
        assert_eq!(ed.matrix().get(&n("edr"), &n("mfa")), Some(0.2));
        assert_eq!(ed.state(), &CellEditState::Idle);
    }

    #[test]
    fn failed_first_commit_clears_the_cell() {
        let mut repo = MemoryRepository::new();
        let mut ed = editor(&repo);
        repo.set_offline(true);

        assert_ok!(ed.begin_edit(&n("mfa"), &n("waf")));
        assert_ok!(ed.set_draft(0.5));
        assert!(ed.commit(&mut repo).is_err());
        assert_eq!(ed.matrix().get(&n("mfa"), &n("waf")), None);
    }

    #[test]
    fn diagonal_and_range_are_rejected() {
        let repo = MemoryRepository::new();
        let mut ed = editor(&repo);
        assert!(matches!(
            ed.begin_edit(&n("mfa"), &n("mfa")),
            Err(EditError::Diagonal(_))
        ));

        assert_ok!(ed.begin_edit(&n("mfa"), &n("edr")));
        assert!(matches!(ed.set_draft(1.5), Err(EditError::OutOfRange(_))));
        assert!(matches!(
            ed.begin_edit(&n("mfa"), &n("waf")),
            Err(EditError::Busy)
        ));
        ed.cancel();
        assert_eq!(ed.state(), &CellEditState::Idle);
        assert_eq!(ed.matrix().get(&n("mfa"), &n("edr")), None);
    }

    #[test]
    fn commit_without_draft_is_unchanged() {
        let mut repo = MemoryRepository::new();
        let mut ed = editor(&repo);
        assert_ok!(ed.begin_edit(&n("mfa"), &n("edr")));
        assert_eq!(assert_ok!(ed.commit(&mut repo)), EditOutcome::Unchanged);
        assert_eq!(repo.writes(), 0);
    }

    #[test]
    fn stale_reload_during_save_is_ignored() {
        let mut repo = MemoryRepository::new().with_interaction(interaction("edr", "mfa", 0.2));
        let mut ed = editor(&repo);
        let stale = assert_ok!(repo.list(&org()));

        assert_ok!(ed.begin_edit(&n("mfa"), &n("edr")));
        assert_ok!(ed.set_draft(0.7));
        let record = assert_ok!(ed.begin_commit()).unwrap();
        assert_eq!(ed.save_state(), &SaveState::Saving);
        assert!(!ed.apply_reload(&stale));
        assert_eq!(ed.matrix().get(&n("edr"), &n("mfa")), Some(0.7));

        let result = upsert_interaction(&mut repo, &record);
        assert_ok!(ed.finish_commit(result));
        assert_eq!(ed.state(), &CellEditState::Idle);

        let fresh = assert_ok!(repo.list(&org()));
        assert!(ed.apply_reload(&fresh));
        assert_eq!(ed.matrix().get(&n("mfa"), &n("edr")), Some(0.7));
    }
}

mod loss_ledger {
    use super::*;

    fn ledger(repo: &MemoryRepository) -> LossLedger {
        assert_ok!(LossLedger::load(
            repo,
            &org(),
            &RiskQuantConfig::default().loss_types
        ))
    }

    #[test]
    fn custom_type_is_persisted() {
        let mut repo = MemoryRepository::new();
        let mut ledger = ledger(&repo);
        let created = assert_ok!(ledger.create_custom(&mut repo, &org(), "Legal fees", None));

        assert!(created.is_custom);
        assert!(created.id.as_str().starts_with("custom-"));
        let reloaded = self::ledger(&repo);
        assert!(reloaded.contains(&created.id));
        assert_eq!(reloaded.custom_types().count(), 1);
    }

    #[test]
    fn duplicate_label_is_rejected_case_insensitively() {
        let repo = MemoryRepository::new();
        let mut ledger = ledger(&repo);
        assert!(ledger.add_custom("reputation", None).is_err());
        assert!(ledger.add_custom("  ", None).is_err());
    }

    #[test]
    fn failed_amount_save_restores_previous() {
        let mut repo = MemoryRepository::new();
        let mut ledger = ledger(&repo);
        let asset = "db".into();
        let fines = "fines".into();
        assert_ok!(ledger.save_amount(&mut repo, &org(), &asset, &fines, 1_000.0));

        repo.set_offline(true);
        assert!(ledger
            .save_amount(&mut repo, &org(), &asset, &fines, 9_000.0)
            .is_err());
        assert_approx_eq!(ledger.amount(&asset, &fines), 1_000.0);
        assert_approx_eq!(ledger.secondary_loss_magnitude(&asset), 1_000.0);
        assert_eq!(assert_ok!(repo.amounts(&org())).len(), 1);
    }

    #[test]
    fn amount_for_unknown_type_is_rejected() {
        let repo = MemoryRepository::new();
        let mut ledger = ledger(&repo);
        assert!(ledger
            .set_amount(&"db".into(), &"no-such-type".into(), 5.0)
            .is_err());
    }
}
