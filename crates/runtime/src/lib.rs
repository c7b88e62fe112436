//! Runtime orchestration for turn-based combat.
//!
//! This crate wires the pure `combat-core` rules to persistence, per-campaign
//! locking and an event bus. Consumers embed [`CombatRuntime`] to start
//! encounters, submit turns and recover sessions after a restart.
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`api`] exposes the request/response types and turn providers
//! - [`events`] provides a topic-based event bus
//! - [`repository`] stores sessions in active and history tiers
//! - [`config`] and [`logging`] bootstrap binaries embedding the runtime
pub mod api;
pub mod config;
pub mod events;
pub mod logging;
pub mod repository;
pub mod runtime;

pub use api::{
    CombatEnded, CombatStarted, EndTurnProvider, Result, RuntimeError, ScriptedTurnProvider,
    StartCombat, TurnOutcome, TurnProvider, TurnSubmission,
};
pub use config::{LoggingConfig, RuntimeConfig, default_data_dir};
pub use events::{CombatEvent, EventBus, Topic};
pub use logging::init_logging;
pub use repository::{
    FileSessionRepository, HistorySummary, InMemorySessionRepo, RepositoryError, SCHEMA_VERSION,
    SessionRecord, SessionRepository,
};
pub use runtime::{CombatRuntime, CombatRuntimeBuilder};
