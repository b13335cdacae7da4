//! Storage seams of the engine.
//!
//! The engine never talks to the document database directly: it goes through
//! [`TripStore`] for trips, expenses and ledgers, and through
//! [`MemberDirectory`] for member registration and email lookups. Both are
//! injected into [`Engine`](crate::Engine) at build time.
use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    EngineError, Expense, ExpenseId, GlobalLedger, LedgerPatch, MemberId, MoneyCents,
    ResultEngine, Trip, TripBalances, TripId, TripStatus,
};

pub mod memory;

pub use memory::{MemoryStore, StoreOp};

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by a store implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("write rejected: {0}")]
    Conflict(String),
    #[error("stored data cannot be merged: {0}")]
    Invalid(String),
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        EngineError::store(value)
    }
}

/// Trips, expenses and the per-member ledgers.
#[async_trait]
pub trait TripStore: Send + Sync {
    /// Reads a whole trip document.
    async fn fetch_trip(&self, trip_id: TripId) -> StoreResult<Option<Trip>>;

    /// Reads the expenses of a trip.
    async fn fetch_expenses(&self, trip_id: TripId) -> StoreResult<BTreeMap<ExpenseId, Expense>>;

    /// Writes a new trip and adds it to the trip index of each member.
    async fn put_trip(&self, trip: &Trip) -> StoreResult<()>;

    /// Writes one expense under its trip.
    async fn put_expense(
        &self,
        trip_id: TripId,
        expense_id: ExpenseId,
        expense: &Expense,
    ) -> StoreResult<()>;

    /// Updates the trip status and its frozen balances.
    ///
    /// Conditional write: fails with [`StoreError::Conflict`] unless the trip
    /// is still active and holds exactly the `expected` expenses.
    async fn patch_trip_status(
        &self,
        trip_id: TripId,
        status: TripStatus,
        balances: &TripBalances,
        expected: &BTreeSet<ExpenseId>,
    ) -> StoreResult<()>;

    /// Adds `patch` to the member ledgers and marks the trip ledger as
    /// applied, in one atomic write.
    async fn patch_ledger(&self, trip_id: TripId, patch: &LedgerPatch) -> StoreResult<()>;

    /// Reads the global ledger of a member; empty if the member has none.
    async fn fetch_ledger(&self, member_id: &MemberId) -> StoreResult<GlobalLedger>;

    /// Ids of the trips a member belongs to.
    async fn trips_for_member(&self, member_id: &MemberId) -> StoreResult<Vec<TripId>>;
}

/// Member registration and indexed email lookup.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Stores the email of a member. `email` is already normalized.
    async fn register_member(&self, member_id: &MemberId, email: &str) -> StoreResult<()>;

    /// Looks up a member by normalized email.
    async fn member_by_email(&self, email: &str) -> StoreResult<Option<MemberId>>;

    async fn member_email(&self, member_id: &MemberId) -> StoreResult<Option<String>>;
}

/// A member document, laid out like the `users/{id}` node of the database.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    pub email: String,
    #[serde(default)]
    pub trips: BTreeMap<TripId, bool>,
    #[serde(default)]
    pub total_owed_to_me: BTreeMap<MemberId, MoneyCents>,
    #[serde(default)]
    pub total_i_owe: BTreeMap<MemberId, MoneyCents>,
}

impl UserDocument {
    pub fn ledger(&self) -> GlobalLedger {
        GlobalLedger {
            owed_to_me: self.total_owed_to_me.clone(),
            i_owe: self.total_i_owe.clone(),
        }
    }

    /// Adds `delta` to the stored totals; unchanged on overflow.
    pub fn merge_ledger(&mut self, delta: &GlobalLedger) -> ResultEngine<()> {
        let mut ledger = self.ledger();
        ledger.merge(delta)?;
        self.total_owed_to_me = ledger.owed_to_me;
        self.total_i_owe = ledger.i_owe;
        Ok(())
    }
}

/// Whole database content: `{ users: {...}, trips: {...} }`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub users: BTreeMap<MemberId, UserDocument>,
    #[serde(default)]
    pub trips: BTreeMap<TripId, Trip>,
}
