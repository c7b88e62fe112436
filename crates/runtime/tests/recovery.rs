//! Persistence and restart recovery against the file-backed store.

use std::fs;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use combat_core::{
    CombatConfig, CombatSession, RosterEntry, SessionStatus, StatusEffect, StatusEffectKind,
    VictoryCondition,
};
use combat_runtime::{
    CombatRuntime, FileSessionRepository, HistorySummary, RepositoryError, SessionRecord,
    SessionRepository, StartCombat, TurnSubmission,
};
use tempfile::TempDir;

const CAMPAIGN: &str = "saltmarsh";

fn roster() -> Vec<RosterEntry> {
    vec![
        RosterEntry::player("hero", "Hero", 20, 20).with_initiative(15),
        RosterEntry::player("cleric", "Cleric", 16, 16).with_initiative(12),
        RosterEntry::npc("sahuagin", "Sahuagin", true, 22, 22).with_initiative(9),
    ]
}

fn file_runtime(dir: &TempDir) -> CombatRuntime {
    let repository = FileSessionRepository::new(dir.path()).expect("repository");
    CombatRuntime::builder().repository(repository).build()
}

fn session(id: &str) -> CombatSession {
    let config = CombatConfig::default();
    let now = chrono::Utc::now();
    let mut session = CombatSession::from_roster(
        id,
        "reef",
        roster(),
        VictoryCondition::default(),
        &config,
        now,
    )
    .unwrap();
    session.begin(&config, now).unwrap();
    session
}

#[tokio::test]
async fn restart_resumes_at_persisted_turn() {
    let dir = TempDir::new().unwrap();

    let (turn_order, turn_index, round) = {
        let runtime = file_runtime(&dir);
        runtime
            .start_combat(CAMPAIGN, StartCombat::new("reef", roster()).with_session_id("s-1"))
            .await
            .unwrap();
        runtime
            .submit_turn(CAMPAIGN, "s-1", TurnSubmission::end_turn("hero"))
            .await
            .unwrap();
        let outcome = runtime
            .submit_turn(CAMPAIGN, "s-1", TurnSubmission::end_turn("cleric"))
            .await
            .unwrap();
        assert!(outcome.persisted);

        let live = runtime.session(CAMPAIGN, "s-1").await.unwrap().unwrap();
        (live.turn_order, live.current_turn_index, live.round_number)
    };

    // Fresh process: nothing in memory.
    let runtime = file_runtime(&dir);
    assert_eq!(runtime.recover().await.unwrap(), 1);

    let resumed = runtime.session(CAMPAIGN, "s-1").await.unwrap().unwrap();
    assert_eq!(resumed.turn_order, turn_order);
    assert_eq!(resumed.current_turn_index, turn_index);
    assert_eq!(resumed.round_number, round);

    let outcome = runtime
        .submit_turn(CAMPAIGN, "s-1", TurnSubmission::end_turn("sahuagin"))
        .await
        .unwrap();
    assert!(outcome.transition.new_round);
}

#[tokio::test]
async fn stored_sessions_load_lazily_without_recover() {
    let dir = TempDir::new().unwrap();
    file_runtime(&dir)
        .start_combat(CAMPAIGN, StartCombat::new("reef", roster()).with_session_id("s-1"))
        .await
        .unwrap();

    let runtime = file_runtime(&dir);
    let outcome = runtime
        .submit_turn(CAMPAIGN, "s-1", TurnSubmission::end_turn("hero"))
        .await
        .unwrap();
    assert_eq!(outcome.turn_info.active_combatant.as_deref(), Some("Cleric"));
}

#[test]
fn save_and_load_round_trip_every_field() {
    let dir = TempDir::new().unwrap();
    let repo = FileSessionRepository::new(dir.path()).unwrap();
    let mut original = session("s-1");
    original
        .combatant_mut(&"sahuagin".into())
        .unwrap()
        .status_effects
        .apply(StatusEffect::new(StatusEffectKind::Frightened).with_duration(3));

    repo.save(CAMPAIGN, &original).unwrap();
    let path = dir.path().join(CAMPAIGN).join("active").join("combat_s-1.json");
    assert!(path.exists());

    let loaded = repo.load_by_id(CAMPAIGN, "s-1").unwrap().unwrap();
    assert_eq!(loaded, original);
}

#[test]
fn archive_moves_record_to_history() {
    let dir = TempDir::new().unwrap();
    let repo = FileSessionRepository::new(dir.path()).unwrap();
    let mut s = session("s-1");
    repo.save(CAMPAIGN, &s).unwrap();

    s.abort(chrono::Utc::now()).unwrap();
    let summary: HistorySummary = repo.archive(CAMPAIGN, &s).unwrap();
    assert_eq!(summary.status, SessionStatus::Aborted);

    assert!(repo.load_active(CAMPAIGN).unwrap().is_none());
    assert!(repo.list_active(CAMPAIGN).unwrap().is_empty());
    let history = repo.list_history(CAMPAIGN).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].session_id, "s-1");

    let record = repo.load_history(CAMPAIGN, "s-1").unwrap().unwrap();
    assert!(record.archived_at.is_some());
    assert!(record.duration_seconds.is_some());

    let files: Vec<_> = fs::read_dir(dir.path().join(CAMPAIGN).join("history"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("Z_s-1.json"));
}

#[test]
fn load_active_picks_most_recent_record() {
    let dir = TempDir::new().unwrap();
    let repo = FileSessionRepository::new(dir.path()).unwrap();
    repo.save(CAMPAIGN, &session("older")).unwrap();
    repo.save(CAMPAIGN, &session("newer")).unwrap();

    let older = repo.active_path(CAMPAIGN, "older").unwrap();
    let file = fs::OpenOptions::new().write(true).open(&older).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(3600))
        .unwrap();

    let active = repo.load_active(CAMPAIGN).unwrap().unwrap();
    assert_eq!(active.session_id, "newer");
}

#[test]
fn unknown_status_effect_in_stored_record_is_dropped() {
    let dir = TempDir::new().unwrap();
    let repo = FileSessionRepository::new(dir.path()).unwrap();
    let mut original = session("s-1");
    original
        .combatant_mut(&"hero".into())
        .unwrap()
        .status_effects
        .apply(StatusEffect::new(StatusEffectKind::Blessed).with_duration(2));
    repo.save(CAMPAIGN, &original).unwrap();

    // A newer build wrote an effect type this one does not know.
    let path = repo.active_path(CAMPAIGN, "s-1").unwrap();
    let mut raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    raw["combatants"]["hero"]["status_effects"]
        .as_array_mut()
        .unwrap()
        .push(serde_json::json!({"type": "time_stopped", "duration_rounds": 1}));
    fs::write(&path, raw.to_string()).unwrap();

    let loaded = repo.load_by_id(CAMPAIGN, "s-1").unwrap().unwrap();
    assert_eq!(loaded, original);
}

#[test]
fn recover_all_skips_unreadable_records() {
    let dir = TempDir::new().unwrap();
    let repo = FileSessionRepository::new(dir.path()).unwrap();
    repo.save(CAMPAIGN, &session("good")).unwrap();
    repo.save("other", &session("also-good")).unwrap();
    fs::write(repo.active_path(CAMPAIGN, "broken").unwrap(), "{ not json").unwrap();
    fs::write(
        repo.active_path(CAMPAIGN, "anonymous").unwrap(),
        r#"{"scene_id": "no id here"}"#,
    )
    .unwrap();

    let recovered = repo.recover_all().unwrap();
    let mut ids: Vec<_> = recovered.iter().map(|(_, s)| s.session_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["also-good", "good"]);

    assert!(matches!(
        repo.load_by_id(CAMPAIGN, "anonymous"),
        Err(RepositoryError::CorruptedData(_))
    ));
}

#[test]
fn stored_log_is_trimmed_to_tail() {
    let dir = TempDir::new().unwrap();
    let repo = FileSessionRepository::new(dir.path())
        .unwrap()
        .with_log_tail_limit(2);
    let mut s = session("s-1");
    for round in 1..=5 {
        s.record_action(
            combat_core::CombatAction::new("hero", combat_core::ActionType::Dodge, round, s.created_at),
            s.created_at,
        )
        .unwrap();
    }
    repo.save(CAMPAIGN, &s).unwrap();

    assert_eq!(s.combat_log.len(), 5);
    let loaded = repo.load_by_id(CAMPAIGN, "s-1").unwrap().unwrap();
    assert_eq!(loaded.combat_log.len(), 2);
    assert_eq!(loaded.combat_log[0].round_number, 4);
}

#[test]
fn path_escaping_ids_are_rejected() {
    let dir = TempDir::new().unwrap();
    let repo = FileSessionRepository::new(dir.path()).unwrap();

    assert!(matches!(
        repo.save("..", &session("s-1")),
        Err(RepositoryError::InvalidKey { .. })
    ));
    assert!(matches!(
        repo.load_by_id(CAMPAIGN, "../../etc"),
        Err(RepositoryError::InvalidKey { .. })
    ));
}

/// Repository whose writes always fail.
struct ReadOnlyRepo(FileSessionRepository);

impl SessionRepository for ReadOnlyRepo {
    fn save(&self, _campaign_id: &str, _session: &CombatSession) -> Result<(), RepositoryError> {
        Err(RepositoryError::Io(std::io::Error::other("disk full")))
    }
    fn load_active(&self, campaign_id: &str) -> Result<Option<CombatSession>, RepositoryError> {
        self.0.load_active(campaign_id)
    }
    fn load_by_id(
        &self,
        campaign_id: &str,
        session_id: &str,
    ) -> Result<Option<CombatSession>, RepositoryError> {
        self.0.load_by_id(campaign_id, session_id)
    }
    fn load_history(
        &self,
        campaign_id: &str,
        session_id: &str,
    ) -> Result<Option<SessionRecord>, RepositoryError> {
        self.0.load_history(campaign_id, session_id)
    }
    fn archive(
        &self,
        _campaign_id: &str,
        _session: &CombatSession,
    ) -> Result<HistorySummary, RepositoryError> {
        Err(RepositoryError::Io(std::io::Error::other("disk full")))
    }
    fn list_active(&self, campaign_id: &str) -> Result<Vec<String>, RepositoryError> {
        self.0.list_active(campaign_id)
    }
    fn list_history(&self, campaign_id: &str) -> Result<Vec<HistorySummary>, RepositoryError> {
        self.0.list_history(campaign_id)
    }
    fn delete_active(&self, campaign_id: &str, session_id: &str) -> Result<bool, RepositoryError> {
        self.0.delete_active(campaign_id, session_id)
    }
    fn list_campaigns(&self) -> Result<Vec<String>, RepositoryError> {
        self.0.list_campaigns()
    }
}

#[tokio::test]
async fn persistence_failure_reports_false_and_keeps_state() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(ReadOnlyRepo(FileSessionRepository::new(dir.path()).unwrap()));
    let runtime = CombatRuntime::builder().shared_repository(repo).build();

    let started = runtime
        .start_combat(CAMPAIGN, StartCombat::new("reef", roster()).with_session_id("s-1"))
        .await
        .unwrap();
    assert!(!started.persisted);

    let outcome = runtime
        .submit_turn(CAMPAIGN, "s-1", TurnSubmission::end_turn("hero"))
        .await
        .unwrap();
    assert!(!outcome.persisted);
    assert_eq!(outcome.turn_info.active_combatant.as_deref(), Some("Cleric"));

    // Archive failure keeps the finished session reachable.
    let ended = runtime.abort_combat(CAMPAIGN, "s-1").await.unwrap();
    assert!(ended.archived.is_none());
    let live = runtime.session(CAMPAIGN, "s-1").await.unwrap().unwrap();
    assert_eq!(live.status, SessionStatus::Aborted);
}

#[tokio::test]
async fn recover_archives_finished_sessions_left_active() {
    let dir = TempDir::new().unwrap();
    let repo = FileSessionRepository::new(dir.path()).unwrap();
    let mut finished = session("done");
    finished
        .finish(combat_core::CombatOutcome::Victory, chrono::Utc::now())
        .unwrap();
    repo.save(CAMPAIGN, &finished).unwrap();
    repo.save(CAMPAIGN, &session("live")).unwrap();

    let runtime = file_runtime(&dir);
    assert_eq!(runtime.recover().await.unwrap(), 1);

    let history = runtime.history(CAMPAIGN).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].session_id, "done");
    assert_eq!(
        runtime.repository().list_active(CAMPAIGN).unwrap(),
        vec!["live".to_string()]
    );
}

#[test]
fn delete_active_and_list_campaigns() {
    let dir = TempDir::new().unwrap();
    let repo = FileSessionRepository::new(dir.path()).unwrap();
    repo.save("b-campaign", &session("s-1")).unwrap();
    repo.save("a-campaign", &session("s-2")).unwrap();

    assert_eq!(repo.list_campaigns().unwrap(), vec!["a-campaign", "b-campaign"]);
    assert!(repo.delete_active("b-campaign", "s-1").unwrap());
    assert!(!repo.delete_active("b-campaign", "s-1").unwrap());
    assert!(repo.load_active("b-campaign").unwrap().is_none());
    assert!(!repo.exists("b-campaign", "s-1").unwrap());
}
