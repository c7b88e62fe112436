//! High-level combat orchestrator.
//!
//! [`CombatRuntime`] owns the in-memory sessions of every campaign, the
//! session repository and the event bus. Each campaign has its own async
//! mutex held across "validate → reconcile → resolve → persist", so requests
//! for one campaign are strictly sequential while campaigns proceed in
//! parallel.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use combat_core::{
    CampaignId, CombatConfig, CombatOutcome, CombatSession, CombatantId, MechanicsContext,
    MechanicsReconciler, ReconciliationContext, RosterEntry, SessionError, SessionId, StatusMap,
    TerminationReason, TurnError, TurnInfo,
};
use tokio::sync::{Mutex, broadcast};

use crate::api::{
    CombatEnded, CombatStarted, Result, RuntimeError, StartCombat, TurnOutcome, TurnProvider,
    TurnSubmission,
};
use crate::config::RuntimeConfig;
use crate::events::{CombatEvent, EventBus, Topic};
use crate::repository::{
    FileSessionRepository, HistorySummary, InMemorySessionRepo, SessionRepository,
};

/// Live sessions of one campaign.
#[derive(Default)]
struct CampaignState {
    sessions: HashMap<SessionId, CombatSession>,
}

struct Inner {
    config: CombatConfig,
    repository: Arc<dyn SessionRepository>,
    campaigns: Mutex<HashMap<CampaignId, Arc<Mutex<CampaignState>>>>,
    events: EventBus,
}

/// Combat orchestrator. Cloning is cheap and shares all state.
#[derive(Clone)]
pub struct CombatRuntime {
    inner: Arc<Inner>,
}

impl CombatRuntime {
    /// Create a new runtime builder
    pub fn builder() -> CombatRuntimeBuilder {
        CombatRuntimeBuilder::new()
    }

    /// File-backed runtime from resolved configuration.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self> {
        let repository = FileSessionRepository::new(config.data_dir())?
            .with_log_tail_limit(config.combat.log_tail_limit);
        Ok(Self::builder()
            .config(config.combat.clone())
            .event_buffer_size(config.event_buffer_size)
            .repository(repository)
            .build())
    }

    pub fn config(&self) -> &CombatConfig {
        &self.inner.config
    }

    pub fn repository(&self) -> &Arc<dyn SessionRepository> {
        &self.inner.repository
    }

    /// Subscribe to combat events on one topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<CombatEvent> {
        self.inner.events.subscribe(topic)
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    async fn campaign(&self, campaign_id: &str) -> Arc<Mutex<CampaignState>> {
        let mut campaigns = self.inner.campaigns.lock().await;
        Arc::clone(campaigns.entry(campaign_id.to_string()).or_default())
    }

    /// Opens an encounter and persists it.
    pub async fn start_combat(&self, campaign_id: &str, request: StartCombat) -> Result<CombatStarted> {
        let campaign = self.campaign(campaign_id).await;
        let mut state = campaign.lock().await;

        let session_id = request
            .session_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        if state.sessions.contains_key(&session_id)
            || self.inner.repository.exists(campaign_id, &session_id)?
        {
            return Err(RuntimeError::DuplicateSession {
                campaign_id: campaign_id.to_string(),
                session_id,
            });
        }

        let now = Utc::now();
        let mut session = CombatSession::from_roster(
            session_id.clone(),
            request.scene_id,
            request.roster,
            request.victory_condition,
            &self.inner.config,
            now,
        )?;
        session.begin(&self.inner.config, now)?;

        let persisted = self.persist(campaign_id, &session);
        self.warn_shared_names(&session, None);
        let turn_info = self.reconciler().turn_info(&session);

        tracing::info!(
            "Started combat {} in campaign {} with {} combatants",
            session_id,
            campaign_id,
            session.combatants.len()
        );
        self.inner.events.publish(CombatEvent::CombatStarted {
            campaign_id: campaign_id.to_string(),
            session_id: session_id.clone(),
            scene_id: session.scene_id.clone(),
            turn_order: session.turn_order.clone(),
            first_actor: session.current_actor().cloned(),
        });

        state.sessions.insert(session_id, session.clone());
        Ok(CombatStarted {
            session,
            turn_info,
            persisted,
        })
    }

    /// Applies one step of the current actor's turn.
    ///
    /// The whole step runs on a copy under the campaign lock; a rejected
    /// submission leaves the live session untouched.
    pub async fn submit_turn(
        &self,
        campaign_id: &str,
        session_id: &str,
        submission: TurnSubmission,
    ) -> Result<TurnOutcome> {
        let campaign = self.campaign(campaign_id).await;
        let mut state = campaign.lock().await;
        let config = &self.inner.config;

        let live = self.live_session(&mut state, campaign_id, session_id)?;
        if !live.is_active() {
            return Err(SessionError::AlreadyEnded {
                status: live.status,
            }
            .into());
        }
        let expected = live
            .current_actor()
            .cloned()
            .ok_or(SessionError::Turn(TurnError::EmptyTurnOrder))?;
        if expected != submission.actor {
            return Err(RuntimeError::InvalidActor {
                expected,
                provided: submission.actor,
            });
        }

        let mut working = live.clone();
        let now = Utc::now();

        if let Some(action) = submission.action {
            if action.actor_id != submission.actor {
                return Err(RuntimeError::InvalidActor {
                    expected: submission.actor,
                    provided: action.actor_id,
                });
            }
            working.record_action(action, now)?;
        }
        apply_authoritative(&mut working, &submission.context);

        let statuses = self
            .reconciler()
            .status_map(&working, &submission.context);

        let reason = submission.reason.unwrap_or_else(|| {
            let remaining = working
                .combatant(&submission.actor)
                .map(|c| c.action_points.current)
                .unwrap_or(0);
            TerminationReason::from_outcome(false, remaining)
        });
        let transition = working.resolve(config, reason)?;
        working.apply_transition(&transition, now)?;

        let outcome = working.victory_condition.evaluate(&working, config);
        if let Some(outcome) = outcome {
            working.finish(outcome, now)?;
        }

        // Commit: everything below is bookkeeping on an accepted step.
        let persisted = self.persist(campaign_id, &working);
        self.publish_transition(campaign_id, &working, &transition);

        let turn_info = self.reconciler().turn_info(&working);
        let archived = if working.status.is_terminal() {
            self.close(&mut state, campaign_id, working.clone())
        } else {
            state.sessions.insert(working.session_id.clone(), working.clone());
            None
        };

        Ok(TurnOutcome {
            session_id: working.session_id,
            transition,
            statuses,
            turn_info,
            status: working.status,
            outcome: working.outcome,
            persisted,
            archived,
        })
    }

    /// Asks `provider` for the current actor's submission and applies it.
    ///
    /// The provider runs without the campaign lock held; the submission is
    /// validated again when applied.
    pub async fn drive_turn(
        &self,
        campaign_id: &str,
        session_id: &str,
        provider: &dyn TurnProvider,
    ) -> Result<TurnOutcome> {
        let snapshot = self.require_session(campaign_id, session_id).await?;
        let submission = provider.provide_turn(campaign_id, &snapshot).await?;
        self.submit_turn(campaign_id, session_id, submission).await
    }

    /// Reconciled statuses for a hypothetical context. Nothing is mutated.
    pub async fn preview(
        &self,
        campaign_id: &str,
        session_id: &str,
        context: &MechanicsContext,
    ) -> Result<StatusMap> {
        let session = self.require_session(campaign_id, session_id).await?;
        Ok(self.reconciler().status_map(&session, context))
    }

    /// Ends an encounter with an explicit outcome and archives it.
    pub async fn end_combat(
        &self,
        campaign_id: &str,
        session_id: &str,
        outcome: CombatOutcome,
    ) -> Result<CombatEnded> {
        self.terminate(campaign_id, session_id, |session, now| {
            session.finish(outcome, now)
        })
        .await
    }

    /// Aborts an encounter without an outcome and archives it.
    pub async fn abort_combat(&self, campaign_id: &str, session_id: &str) -> Result<CombatEnded> {
        self.terminate(campaign_id, session_id, |session, now| session.abort(now))
            .await
    }

    async fn terminate<F>(&self, campaign_id: &str, session_id: &str, end: F) -> Result<CombatEnded>
    where
        F: FnOnce(&mut CombatSession, chrono::DateTime<Utc>) -> std::result::Result<(), SessionError>,
    {
        let campaign = self.campaign(campaign_id).await;
        let mut state = campaign.lock().await;

        let mut working = self.live_session(&mut state, campaign_id, session_id)?.clone();
        end(&mut working, Utc::now())?;

        self.persist(campaign_id, &working);
        let archived = self.close(&mut state, campaign_id, working.clone());
        Ok(CombatEnded {
            session: working,
            archived,
        })
    }

    /// Adds a combatant at the end of the turn order.
    pub async fn add_combatant(
        &self,
        campaign_id: &str,
        session_id: &str,
        entry: RosterEntry,
    ) -> Result<TurnInfo> {
        let campaign = self.campaign(campaign_id).await;
        let mut state = campaign.lock().await;

        let mut working = self.live_session(&mut state, campaign_id, session_id)?.clone();
        let combatant_id = entry.character_id.clone();
        working.add_combatant(entry, &self.inner.config, Utc::now())?;

        self.persist(campaign_id, &working);
        self.warn_shared_names(&working, Some(&combatant_id));
        self.inner.events.publish(CombatEvent::CombatantJoined {
            campaign_id: campaign_id.to_string(),
            session_id: working.session_id.clone(),
            combatant_id,
        });

        let info = self.reconciler().turn_info(&working);
        state.sessions.insert(working.session_id.clone(), working);
        Ok(info)
    }

    /// Live or stored active session by id.
    pub async fn session(&self, campaign_id: &str, session_id: &str) -> Result<Option<CombatSession>> {
        let campaign = self.campaign(campaign_id).await;
        let state = campaign.lock().await;
        if let Some(session) = state.sessions.get(session_id) {
            return Ok(Some(session.clone()));
        }
        Ok(self.inner.repository.load_by_id(campaign_id, session_id)?)
    }

    /// The campaign's active encounter, if any.
    pub async fn active_session(&self, campaign_id: &str) -> Result<Option<CombatSession>> {
        let campaign = self.campaign(campaign_id).await;
        let state = campaign.lock().await;
        let live = state
            .sessions
            .values()
            .filter(|s| s.is_active())
            .max_by_key(|s| s.updated_at);
        if let Some(session) = live {
            return Ok(Some(session.clone()));
        }
        Ok(self.inner.repository.load_active(campaign_id)?)
    }

    pub async fn turn_info(&self, campaign_id: &str, session_id: &str) -> Result<TurnInfo> {
        let session = self.require_session(campaign_id, session_id).await?;
        Ok(self.reconciler().turn_info(&session))
    }

    /// Finished encounters of a campaign, newest first.
    pub async fn history(&self, campaign_id: &str) -> Result<Vec<HistorySummary>> {
        Ok(self.inner.repository.list_history(campaign_id)?)
    }

    /// Reloads every persisted active session into memory.
    ///
    /// Sessions already live are kept as they are. Terminal sessions left in
    /// the active tier by an interrupted archive are archived now. Returns
    /// the number of sessions resumed.
    pub async fn recover(&self) -> Result<usize> {
        let mut resumed = 0;

        for (campaign_id, session) in self.inner.repository.recover_all()? {
            let campaign = self.campaign(&campaign_id).await;
            let mut state = campaign.lock().await;

            if state.sessions.contains_key(&session.session_id) {
                continue;
            }
            if session.status.is_terminal() {
                tracing::info!(
                    "Archiving finished session {} left in campaign {}",
                    session.session_id,
                    campaign_id
                );
                self.close(&mut state, &campaign_id, session);
                continue;
            }

            tracing::info!(
                "Recovered session {} in campaign {} at round {}",
                session.session_id,
                campaign_id,
                session.round_number
            );
            self.inner.events.publish(CombatEvent::SessionRecovered {
                campaign_id: campaign_id.clone(),
                session_id: session.session_id.clone(),
                round_number: session.round_number,
                current_actor: session.current_actor().cloned(),
            });
            state.sessions.insert(session.session_id.clone(), session);
            resumed += 1;
        }

        Ok(resumed)
    }

    fn reconciler(&self) -> MechanicsReconciler<'_> {
        MechanicsReconciler::new(&self.inner.config)
    }

    /// Warns about combatants whose display name is already taken, limited
    /// to `only` when given.
    fn warn_shared_names(&self, session: &CombatSession, only: Option<&CombatantId>) {
        for (combatant, label) in self.reconciler().labels(session) {
            if label == combatant.name || only.is_some_and(|id| *id != combatant.character_id) {
                continue;
            }
            tracing::warn!(
                "Session {}: combatant {} shares the name {:?}; shown as {:?}",
                session.session_id,
                combatant.character_id,
                combatant.name,
                label
            );
        }
    }

    async fn require_session(&self, campaign_id: &str, session_id: &str) -> Result<CombatSession> {
        self.session(campaign_id, session_id)
            .await?
            .ok_or_else(|| RuntimeError::SessionNotFound {
                campaign_id: campaign_id.to_string(),
                session_id: session_id.to_string(),
            })
    }

    /// Live session, loading it from the active tier on first touch.
    fn live_session<'s>(
        &self,
        state: &'s mut CampaignState,
        campaign_id: &str,
        session_id: &str,
    ) -> Result<&'s CombatSession> {
        if !state.sessions.contains_key(session_id) {
            let stored = self
                .inner
                .repository
                .load_by_id(campaign_id, session_id)?
                .ok_or_else(|| RuntimeError::SessionNotFound {
                    campaign_id: campaign_id.to_string(),
                    session_id: session_id.to_string(),
                })?;
            state.sessions.insert(session_id.to_string(), stored);
        }
        state
            .sessions
            .get(session_id)
            .ok_or_else(|| RuntimeError::SessionNotFound {
                campaign_id: campaign_id.to_string(),
                session_id: session_id.to_string(),
            })
    }

    /// Writes the active record. Failures are logged, never raised.
    fn persist(&self, campaign_id: &str, session: &CombatSession) -> bool {
        match self.inner.repository.save(campaign_id, session) {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(
                    "Failed to persist session {} in campaign {}: {}",
                    session.session_id,
                    campaign_id,
                    err
                );
                false
            }
        }
    }

    /// Archives a finished session and drops it from memory on success.
    ///
    /// On failure the finished session stays live (and in the active tier),
    /// and the next [`recover`](Self::recover) retries the archive.
    fn close(
        &self,
        state: &mut CampaignState,
        campaign_id: &str,
        session: CombatSession,
    ) -> Option<HistorySummary> {
        let archived = match self.inner.repository.archive(campaign_id, &session) {
            Ok(summary) => {
                state.sessions.remove(&session.session_id);
                Some(summary)
            }
            Err(err) => {
                tracing::error!(
                    "Failed to archive session {} in campaign {}: {}",
                    session.session_id,
                    campaign_id,
                    err
                );
                state.sessions.insert(session.session_id.clone(), session.clone());
                None
            }
        };

        tracing::info!(
            "Combat {} ended with status {} ({})",
            session.session_id,
            session.status,
            session
                .outcome
                .map(|o| o.to_string())
                .unwrap_or_else(|| "no outcome".to_string())
        );
        self.inner.events.publish(CombatEvent::CombatEnded {
            campaign_id: campaign_id.to_string(),
            session_id: session.session_id.clone(),
            status: session.status,
            outcome: session.outcome,
            archived: archived.is_some(),
        });
        archived
    }

    fn publish_transition(
        &self,
        campaign_id: &str,
        session: &CombatSession,
        transition: &combat_core::TurnTransitionResult,
    ) {
        if transition.is_continuation() {
            return;
        }
        if transition.new_round {
            tracing::debug!(
                "Session {} entered round {}",
                session.session_id,
                transition.round_number
            );
            self.inner.events.publish(CombatEvent::RoundStarted {
                campaign_id: campaign_id.to_string(),
                session_id: session.session_id.clone(),
                round_number: transition.round_number,
            });
        }
        self.inner.events.publish(CombatEvent::TurnAdvanced {
            campaign_id: campaign_id.to_string(),
            session_id: session.session_id.clone(),
            from: transition.current_actor.clone(),
            to: transition.next_combatant.clone(),
            reason: transition.reason,
            round_number: transition.round_number,
        });
    }
}

/// Writes the context's authoritative hp/ap onto the ledger, clamped.
///
/// Ids the session does not know are ignored.
fn apply_authoritative(session: &mut CombatSession, context: &MechanicsContext) {
    let touched: Vec<_> = context.touched().cloned().collect();
    for id in touched {
        let Some(combatant) = session.combatant_mut(&id) else {
            tracing::warn!(
                "Ignoring authoritative values for {} (not in session {})",
                id,
                session.session_id
            );
            continue;
        };
        if let Some(hp) = context.authoritative_hp(&id) {
            combatant.set_hp_snapshot(hp);
        }
        if let Some(ap) = context.authoritative_ap(&id) {
            combatant.set_ap_snapshot(ap);
        }
    }
}

/// Builder for [`CombatRuntime`].
pub struct CombatRuntimeBuilder {
    config: CombatConfig,
    repository: Option<Arc<dyn SessionRepository>>,
    event_buffer_size: usize,
}

impl CombatRuntimeBuilder {
    fn new() -> Self {
        Self {
            config: CombatConfig::default(),
            repository: None,
            event_buffer_size: 100,
        }
    }

    /// Override combat rules configuration
    pub fn config(mut self, config: CombatConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the session repository (default: in-memory)
    pub fn repository(mut self, repository: impl SessionRepository + 'static) -> Self {
        self.repository = Some(Arc::new(repository));
        self
    }

    /// Share an existing repository
    pub fn shared_repository(mut self, repository: Arc<dyn SessionRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }

    /// Build the runtime
    pub fn build(self) -> CombatRuntime {
        let repository = self.repository.unwrap_or_else(|| {
            Arc::new(
                InMemorySessionRepo::new().with_log_tail_limit(self.config.log_tail_limit),
            )
        });

        CombatRuntime {
            inner: Arc::new(Inner {
                config: self.config,
                repository,
                campaigns: Mutex::new(HashMap::new()),
                events: EventBus::with_capacity(self.event_buffer_size),
            }),
        }
    }
}
