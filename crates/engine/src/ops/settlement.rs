use std::collections::BTreeSet;

use crate::{
    EngineError, ExpenseId, LedgerPatch, ResultEngine, SessionContext, StoreError, TripBalances,
    TripId, TripStatus, trip_balances,
};

use super::{Engine, require_creator};

impl Engine {
    /// Closes a trip and settles it.
    ///
    /// Only the creator may complete a trip, and only once. The balances are
    /// computed from the current expenses, stored on the trip together with
    /// the `completed` status, and then merged into the global ledger of every
    /// member.
    ///
    /// The status write only succeeds if the trip is still active and its
    /// expenses are the ones the balances were computed from. A concurrent
    /// completion is reported as [`EngineError::AlreadyCompleted`]; an expense
    /// added in the meantime as [`EngineError::Consistency`], with the trip
    /// left active.
    ///
    /// When the ledger write fails after the status write succeeded the
    /// error is [`EngineError::LedgerPatchPending`]: the trip stays completed
    /// and [`Engine::retry_ledger_patch`] finishes the job.
    pub async fn complete_trip(
        &self,
        ctx: &SessionContext,
        trip_id: TripId,
    ) -> ResultEngine<TripBalances> {
        let session = self.signed_in(ctx)?;
        let mut trip = self.load_trip(trip_id).await?;
        require_creator(&trip, session.member_id())?;
        if let Err(err) = trip.ensure_active() {
            tracing::warn!("trip {trip_id} completed twice by {}", session.member_id());
            return Err(err);
        }

        let expenses = self.store.fetch_expenses(trip_id).await?;
        let balances = trip_balances(trip.members.keys(), expenses.values())?;
        let patch = LedgerPatch::from_balances(&balances)?;
        trip.complete(balances.clone())?;

        let expected: BTreeSet<ExpenseId> = expenses.keys().copied().collect();
        match self
            .store
            .patch_trip_status(trip_id, TripStatus::Completed, &balances, &expected)
            .await
        {
            Ok(()) => {}
            Err(StoreError::Conflict(reason)) => {
                return Err(self.completion_conflict(trip_id, &reason).await);
            }
            Err(err) => return Err(err.into()),
        }

        self.apply_ledger_patch(trip_id, &patch).await?;

        tracing::info!(
            "trip {trip_id} completed with {} expenses",
            expenses.len()
        );
        Ok(balances)
    }

    /// Applies the ledger deltas of a completed trip whose ledger update
    /// failed.
    ///
    /// The deltas come from the balances frozen at completion; expenses are
    /// not read again.
    pub async fn retry_ledger_patch(&self, ctx: &SessionContext, trip_id: TripId) -> ResultEngine<()> {
        let session = self.signed_in(ctx)?;
        let trip = self.load_trip(trip_id).await?;
        require_creator(&trip, session.member_id())?;

        if !trip.status.is_completed() {
            return Err(EngineError::Consistency(format!(
                "trip {trip_id} is not completed yet"
            )));
        }
        if trip.ledger_applied {
            return Err(EngineError::LedgerAlreadyApplied(trip_id));
        }
        let balances = trip.balances.as_ref().ok_or_else(|| {
            EngineError::Consistency(format!("completed trip {trip_id} has no balances"))
        })?;

        let patch = LedgerPatch::from_balances(balances)?;
        self.apply_ledger_patch(trip_id, &patch).await?;
        tracing::info!("ledger of trip {trip_id} applied on retry");
        Ok(())
    }

    /// Explains a rejected status write by looking at the trip again.
    async fn completion_conflict(&self, trip_id: TripId, reason: &str) -> EngineError {
        tracing::warn!("completion of trip {trip_id} rejected by the store: {reason}");
        match self.load_trip(trip_id).await {
            Ok(trip) if trip.status.is_completed() => EngineError::AlreadyCompleted(trip_id),
            Ok(_) => EngineError::Consistency(format!(
                "trip {trip_id} changed while it was being completed, please try again"
            )),
            Err(err) => err,
        }
    }

    async fn apply_ledger_patch(&self, trip_id: TripId, patch: &LedgerPatch) -> ResultEngine<()> {
        match self.store.patch_ledger(trip_id, patch).await {
            Ok(()) => Ok(()),
            Err(StoreError::Conflict(reason)) => {
                tracing::warn!("ledger of trip {trip_id} not applied: {reason}");
                Err(EngineError::LedgerAlreadyApplied(trip_id))
            }
            Err(StoreError::Invalid(reason)) => {
                tracing::error!("ledger of trip {trip_id} cannot be merged: {reason}");
                Err(EngineError::Consistency(reason))
            }
            Err(err) => {
                tracing::error!("ledger update of trip {trip_id} failed: {err}");
                Err(EngineError::LedgerPatchPending {
                    trip_id,
                    source: Box::new(err),
                })
            }
        }
    }
}
