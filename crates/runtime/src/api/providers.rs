//! Asynchronous abstraction for sourcing turn submissions.
//!
//! Runtime users plug in [`TurnProvider`] implementations so encounters can be
//! driven by the narrative step, scripted fixtures or simple defaults.

use std::collections::VecDeque;

use async_trait::async_trait;
use combat_core::{CombatSession, SessionError, TurnError};
use tokio::sync::Mutex;

use super::errors::{Result, RuntimeError};
use super::types::TurnSubmission;

/// Trait for producing the current actor's next submission.
#[async_trait]
pub trait TurnProvider: Send + Sync {
    /// Provide a submission for the session's current actor.
    ///
    /// `session` is a read-only snapshot; the runtime re-validates the actor
    /// when the submission is applied.
    async fn provide_turn(&self, campaign_id: &str, session: &CombatSession)
    -> Result<TurnSubmission>;
}

/// Ends every turn immediately. Useful for tests or as a fallback.
pub struct EndTurnProvider;

#[async_trait]
impl TurnProvider for EndTurnProvider {
    async fn provide_turn(
        &self,
        _campaign_id: &str,
        session: &CombatSession,
    ) -> Result<TurnSubmission> {
        let actor = session
            .current_actor()
            .cloned()
            .ok_or(SessionError::Turn(TurnError::EmptyTurnOrder))?;
        Ok(TurnSubmission::end_turn(actor))
    }
}

/// Replays queued submissions in order.
#[derive(Default)]
pub struct ScriptedTurnProvider {
    queue: Mutex<VecDeque<TurnSubmission>>,
}

impl ScriptedTurnProvider {
    pub fn new(submissions: impl IntoIterator<Item = TurnSubmission>) -> Self {
        Self {
            queue: Mutex::new(submissions.into_iter().collect()),
        }
    }

    pub async fn push(&self, submission: TurnSubmission) {
        self.queue.lock().await.push_back(submission);
    }

    pub async fn remaining(&self) -> usize {
        self.queue.lock().await.len()
    }
}

#[async_trait]
impl TurnProvider for ScriptedTurnProvider {
    async fn provide_turn(
        &self,
        _campaign_id: &str,
        session: &CombatSession,
    ) -> Result<TurnSubmission> {
        self.queue.lock().await.pop_front().ok_or_else(|| {
            RuntimeError::ProviderExhausted {
                actor: session.current_actor().cloned().unwrap_or_default(),
            }
        })
    }
}
