//! In-memory store.
//!
//! Keeps the whole database in a [`StoreSnapshot`] behind a `RwLock`, plus an
//! email index for member lookups. Used by tests and by the command line,
//! which loads and saves the snapshot as JSON.
//!
//! Failures can be injected per operation with [`MemoryStore::fail_next`].
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use super::{
    MemberDirectory, StoreError, StoreResult, StoreSnapshot, TripStore, UserDocument,
};
use crate::{
    Expense, ExpenseId, GlobalLedger, LedgerPatch, MemberId, Trip, TripBalances, TripId,
    TripStatus, util::normalize_email,
};

/// Store operations, used to target injected failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    FetchTrip,
    FetchExpenses,
    PutTrip,
    PutExpense,
    PatchTripStatus,
    PatchLedger,
    FetchLedger,
    TripsForMember,
    RegisterMember,
    MemberByEmail,
    MemberEmail,
}

#[derive(Debug, Default)]
struct State {
    data: StoreSnapshot,
    email_index: HashMap<String, MemberId>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    failures: Mutex<HashMap<StoreOp, usize>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a database snapshot, indexing member emails.
    pub fn from_snapshot(data: StoreSnapshot) -> Self {
        let email_index = data
            .users
            .iter()
            .map(|(id, user)| (normalize_email(&user.email), id.clone()))
            .collect();
        Self {
            state: RwLock::new(State { data, email_index }),
            ..Self::default()
        }
    }

    /// Copy of the whole database.
    pub async fn snapshot(&self) -> StoreSnapshot {
        self.state.read().await.data.clone()
    }

    /// Makes the next `op` call fail with [`StoreError::Unavailable`].
    pub async fn fail_next(&self, op: StoreOp) {
        *self.failures.lock().await.entry(op).or_default() += 1;
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    async fn check(&self, op: StoreOp) -> StoreResult<()> {
        let mut failures = self.failures.lock().await;
        match failures.get_mut(&op) {
            Some(pending) if *pending > 0 => {
                *pending -= 1;
                Err(StoreError::Unavailable(format!("injected failure on {op:?}")))
            }
            _ => Ok(()),
        }
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn missing_trip(trip_id: TripId) -> StoreError {
    StoreError::NotFound(format!("trips/{trip_id}"))
}

#[async_trait]
impl TripStore for MemoryStore {
    async fn fetch_trip(&self, trip_id: TripId) -> StoreResult<Option<Trip>> {
        self.check(StoreOp::FetchTrip).await?;
        Ok(self.state.read().await.data.trips.get(&trip_id).cloned())
    }

    async fn fetch_expenses(&self, trip_id: TripId) -> StoreResult<BTreeMap<ExpenseId, Expense>> {
        self.check(StoreOp::FetchExpenses).await?;
        self.state
            .read()
            .await
            .data
            .trips
            .get(&trip_id)
            .map(|trip| trip.expenses.clone())
            .ok_or_else(|| missing_trip(trip_id))
    }

    async fn put_trip(&self, trip: &Trip) -> StoreResult<()> {
        self.check(StoreOp::PutTrip).await?;
        let mut state = self.state.write().await;
        if state.data.trips.contains_key(&trip.id) {
            return Err(StoreError::Conflict(format!("trips/{} exists", trip.id)));
        }
        for (member_id, member) in &trip.members {
            state
                .data
                .users
                .entry(member_id.clone())
                .or_insert_with(|| UserDocument {
                    email: member.email.clone(),
                    ..UserDocument::default()
                })
                .trips
                .insert(trip.id, true);
        }
        state.data.trips.insert(trip.id, trip.clone());
        self.wrote();
        Ok(())
    }

    async fn put_expense(
        &self,
        trip_id: TripId,
        expense_id: ExpenseId,
        expense: &Expense,
    ) -> StoreResult<()> {
        self.check(StoreOp::PutExpense).await?;
        let mut state = self.state.write().await;
        let trip = state
            .data
            .trips
            .get_mut(&trip_id)
            .ok_or_else(|| missing_trip(trip_id))?;
        if trip.status.is_completed() {
            return Err(StoreError::Conflict(format!("trips/{trip_id} is completed")));
        }
        trip.expenses.insert(expense_id, expense.clone());
        self.wrote();
        Ok(())
    }

    async fn patch_trip_status(
        &self,
        trip_id: TripId,
        status: TripStatus,
        balances: &TripBalances,
        expected: &BTreeSet<ExpenseId>,
    ) -> StoreResult<()> {
        self.check(StoreOp::PatchTripStatus).await?;
        let mut state = self.state.write().await;
        let trip = state
            .data
            .trips
            .get_mut(&trip_id)
            .ok_or_else(|| missing_trip(trip_id))?;
        if trip.status.is_completed() {
            return Err(StoreError::Conflict(format!("trips/{trip_id} is completed")));
        }
        if !trip.expenses.keys().eq(expected.iter()) {
            return Err(StoreError::Conflict(format!(
                "expenses of trips/{trip_id} changed"
            )));
        }
        trip.status = status;
        trip.balances = Some(balances.clone());
        self.wrote();
        Ok(())
    }

    async fn patch_ledger(&self, trip_id: TripId, patch: &LedgerPatch) -> StoreResult<()> {
        self.check(StoreOp::PatchLedger).await?;
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let trip = state
            .data
            .trips
            .get_mut(&trip_id)
            .ok_or_else(|| missing_trip(trip_id))?;
        if trip.ledger_applied {
            return Err(StoreError::Conflict(format!(
                "ledger of trips/{trip_id} already applied"
            )));
        }
        let mut merged = Vec::new();
        for (member_id, delta) in patch.iter() {
            let mut user = state.data.users.get(member_id).cloned().unwrap_or_default();
            user.merge_ledger(delta)
                .map_err(|err| StoreError::Invalid(err.to_string()))?;
            merged.push((member_id.clone(), user));
        }
        state.data.users.extend(merged);
        trip.ledger_applied = true;
        self.wrote();
        Ok(())
    }

    async fn fetch_ledger(&self, member_id: &MemberId) -> StoreResult<GlobalLedger> {
        self.check(StoreOp::FetchLedger).await?;
        Ok(self
            .state
            .read()
            .await
            .data
            .users
            .get(member_id)
            .map(UserDocument::ledger)
            .unwrap_or_default())
    }

    async fn trips_for_member(&self, member_id: &MemberId) -> StoreResult<Vec<TripId>> {
        self.check(StoreOp::TripsForMember).await?;
        Ok(self
            .state
            .read()
            .await
            .data
            .users
            .get(member_id)
            .map(|user| user.trips.keys().copied().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl MemberDirectory for MemoryStore {
    async fn register_member(&self, member_id: &MemberId, email: &str) -> StoreResult<()> {
        self.check(StoreOp::RegisterMember).await?;
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        if let Some(owner) = state.email_index.get(email)
            && owner != member_id
        {
            return Err(StoreError::Conflict(format!("email {email} already taken")));
        }
        let user = state.data.users.entry(member_id.clone()).or_default();
        let previous = std::mem::replace(&mut user.email, email.to_string());
        if !previous.is_empty() {
            state.email_index.remove(&normalize_email(&previous));
        }
        state
            .email_index
            .insert(email.to_string(), member_id.clone());
        self.wrote();
        Ok(())
    }

    async fn member_by_email(&self, email: &str) -> StoreResult<Option<MemberId>> {
        self.check(StoreOp::MemberByEmail).await?;
        Ok(self.state.read().await.email_index.get(email).cloned())
    }

    async fn member_email(&self, member_id: &MemberId) -> StoreResult<Option<String>> {
        self.check(StoreOp::MemberEmail).await?;
        Ok(self
            .state
            .read()
            .await
            .data
            .users
            .get(member_id)
            .map(|user| user.email.clone())
            .filter(|email| !email.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Member, MoneyCents};

    fn trip(members: &[(&str, &str)]) -> Trip {
        let members = members
            .iter()
            .map(|(id, email)| {
                (
                    MemberId::new(*id),
                    Member {
                        email: email.to_string(),
                    },
                )
            })
            .collect();
        Trip::new(
            TripId::new_v4(),
            "Mazury".to_string(),
            MemberId::new("alice"),
            members,
        )
    }

    #[tokio::test]
    async fn put_trip_indexes_members() {
        let store = MemoryStore::new();
        let trip = trip(&[("alice", "alice@example.com"), ("bob", "bob@example.com")]);
        store.put_trip(&trip).await.unwrap();

        assert_eq!(
            store.trips_for_member(&MemberId::new("bob")).await.unwrap(),
            vec![trip.id]
        );
        assert!(store.put_trip(&trip).await.is_err());
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn injected_failure_hits_once() {
        let store = MemoryStore::new();
        store.fail_next(StoreOp::FetchTrip).await;

        let id = TripId::new_v4();
        assert!(matches!(
            store.fetch_trip(id).await,
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(store.fetch_trip(id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn ledger_patch_applies_once_per_trip() {
        let store = MemoryStore::new();
        let trip = trip(&[("alice", "alice@example.com"), ("bob", "bob@example.com")]);
        store.put_trip(&trip).await.unwrap();

        let balances = TripBalances::from([
            (MemberId::new("alice"), MoneyCents::new(500)),
            (MemberId::new("bob"), MoneyCents::new(-500)),
        ]);
        let patch = LedgerPatch::from_balances(&balances).unwrap();
        store.patch_ledger(trip.id, &patch).await.unwrap();
        assert!(matches!(
            store.patch_ledger(trip.id, &patch).await,
            Err(StoreError::Conflict(_))
        ));

        let ledger = store.fetch_ledger(&MemberId::new("bob")).await.unwrap();
        assert_eq!(ledger.i_owe[&MemberId::new("alice")], MoneyCents::new(1000));
    }

    #[tokio::test]
    async fn status_write_requires_an_unchanged_active_trip() {
        let store = MemoryStore::new();
        let trip = trip(&[("alice", "alice@example.com"), ("bob", "bob@example.com")]);
        store.put_trip(&trip).await.unwrap();
        let balances = TripBalances::new();

        let stale = BTreeSet::from([ExpenseId::new_v4()]);
        assert!(matches!(
            store
                .patch_trip_status(trip.id, TripStatus::Completed, &balances, &stale)
                .await,
            Err(StoreError::Conflict(_))
        ));

        let none = BTreeSet::new();
        store
            .patch_trip_status(trip.id, TripStatus::Completed, &balances, &none)
            .await
            .unwrap();
        assert!(matches!(
            store
                .patch_trip_status(trip.id, TripStatus::Completed, &balances, &none)
                .await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn overflowing_ledger_patch_writes_nothing() {
        let alice = MemberId::new("alice");
        let bob = MemberId::new("bob");
        let mut snapshot = StoreSnapshot::default();
        snapshot.users.insert(
            bob.clone(),
            UserDocument {
                email: "bob@example.com".to_string(),
                total_i_owe: BTreeMap::from([(alice.clone(), MoneyCents::new(i64::MAX))]),
                ..UserDocument::default()
            },
        );
        let store = MemoryStore::from_snapshot(snapshot);
        let trip = trip(&[("alice", "alice@example.com"), ("bob", "bob@example.com")]);
        store.put_trip(&trip).await.unwrap();
        let before = store.snapshot().await;

        let balances = TripBalances::from([
            (alice.clone(), MoneyCents::new(500)),
            (bob.clone(), MoneyCents::new(-500)),
        ]);
        let patch = LedgerPatch::from_balances(&balances).unwrap();
        assert!(matches!(
            store.patch_ledger(trip.id, &patch).await,
            Err(StoreError::Invalid(_))
        ));
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn directory_lookup_uses_index() {
        let store = MemoryStore::new();
        let alice = MemberId::new("alice");
        store
            .register_member(&alice, "alice@example.com")
            .await
            .unwrap();

        assert_eq!(
            store.member_by_email("alice@example.com").await.unwrap(),
            Some(alice.clone())
        );
        assert!(
            store
                .register_member(&MemberId::new("mallory"), "alice@example.com")
                .await
                .is_err()
        );

        let restored = MemoryStore::from_snapshot(store.snapshot().await);
        assert_eq!(
            restored.member_by_email("alice@example.com").await.unwrap(),
            Some(alice)
        );
    }
}
