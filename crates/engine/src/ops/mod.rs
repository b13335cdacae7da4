use std::{fmt, sync::Arc};

use chrono::{Duration, Utc};

use crate::{
    EngineError, MemberDirectory, MemberId, MoneyCents, ResultEngine, Session, SessionContext,
    Trip, TripId, TripStore, split::DEFAULT_SPLIT_TOLERANCE,
};

mod expenses;
mod ledger;
mod members;
mod settlement;
mod trips;

pub use expenses::ExpenseDraft;
pub use ledger::{LedgerLine, LedgerView};
pub use trips::TripCreated;

/// Tunables of the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Accepted gap between the sum of an expense split and its amount.
    pub split_tolerance: MoneyCents,
    /// Lifetime of sessions opened with [`Engine::open_session`].
    pub session_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            split_tolerance: DEFAULT_SPLIT_TOLERANCE,
            session_ttl: Duration::hours(1),
        }
    }
}

pub struct Engine {
    store: Arc<dyn TripStore>,
    directory: Arc<dyn MemberDirectory>,
    config: EngineConfig,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The signed-in session, or [`EngineError::Unauthenticated`].
    fn signed_in<'a>(&self, ctx: &'a SessionContext) -> ResultEngine<&'a Session> {
        ctx.require(Utc::now())
    }

    async fn load_trip(&self, trip_id: TripId) -> ResultEngine<Trip> {
        self.store
            .fetch_trip(trip_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("trip {trip_id}")))
    }
}

fn require_member(trip: &Trip, member_id: &MemberId) -> ResultEngine<()> {
    if !trip.is_member(member_id) {
        tracing::warn!("member {member_id} is not part of trip {}", trip.id);
        return Err(EngineError::Forbidden(format!(
            "you are not a member of trip \"{}\"",
            trip.name
        )));
    }
    Ok(())
}

fn require_creator(trip: &Trip, member_id: &MemberId) -> ResultEngine<()> {
    if !trip.is_creator(member_id) {
        tracing::warn!("member {member_id} is not the creator of trip {}", trip.id);
        return Err(EngineError::Forbidden(format!(
            "only the creator can close trip \"{}\"",
            trip.name
        )));
    }
    Ok(())
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    store: Option<Arc<dyn TripStore>>,
    directory: Option<Arc<dyn MemberDirectory>>,
    config: EngineConfig,
}

impl EngineBuilder {
    /// Pass the required trip store
    pub fn store(mut self, store: Arc<dyn TripStore>) -> EngineBuilder {
        self.store = Some(store);
        self
    }

    /// Pass the required member directory
    pub fn directory(mut self, directory: Arc<dyn MemberDirectory>) -> EngineBuilder {
        self.directory = Some(directory);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> EngineBuilder {
        self.config = config;
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> ResultEngine<Engine> {
        let store = self
            .store
            .ok_or_else(|| EngineError::Validation("a trip store is required".to_string()))?;
        let directory = self
            .directory
            .ok_or_else(|| EngineError::Validation("a member directory is required".to_string()))?;
        if self.config.split_tolerance.is_negative() {
            return Err(EngineError::Validation(
                "split tolerance must not be negative".to_string(),
            ));
        }
        Ok(Engine {
            store,
            directory,
            config: self.config,
        })
    }
}
