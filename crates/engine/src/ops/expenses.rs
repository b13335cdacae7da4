use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};

use crate::{
    EngineError, Expense, ExpenseId, MemberId, MoneyCents, ResultEngine, SessionContext, TripId,
    split::validate_split, util::normalize_required_text,
};

use super::{Engine, require_member};

/// Expense as entered by a member, before validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpenseDraft {
    pub description: String,
    pub amount: MoneyCents,
    pub paid_by: MemberId,
    /// Defaults to today (UTC).
    pub date: Option<NaiveDate>,
    /// Share of every participating member, payer included.
    pub shares: BTreeMap<MemberId, MoneyCents>,
}

impl Engine {
    /// Validates `draft` and appends it to an active trip.
    ///
    /// Nothing is written when validation fails.
    pub async fn add_expense(
        &self,
        ctx: &SessionContext,
        trip_id: TripId,
        draft: ExpenseDraft,
    ) -> ResultEngine<ExpenseId> {
        let session = self.signed_in(ctx)?;
        let mut trip = self.load_trip(trip_id).await?;
        require_member(&trip, session.member_id())?;
        trip.ensure_active()?;

        let description = normalize_required_text(&draft.description, "description")?;
        if !trip.is_member(&draft.paid_by) {
            return Err(EngineError::Validation(format!(
                "{} is not a member of this trip",
                draft.paid_by
            )));
        }
        if let Some(outsider) = draft.shares.keys().find(|member| !trip.is_member(member)) {
            return Err(EngineError::Validation(format!(
                "{outsider} is not a member of this trip"
            )));
        }

        let split = validate_split(
            draft.amount,
            &draft.paid_by,
            &draft.shares,
            self.config.split_tolerance,
        )
        .inspect_err(|err| tracing::warn!("rejected expense on trip {trip_id}: {err}"))?;

        let expense = Expense::new(
            description,
            draft.amount,
            draft.paid_by,
            draft.date.unwrap_or_else(|| Utc::now().date_naive()),
            split,
        );
        let expense_id = ExpenseId::new_v4();
        trip.add_expense(expense_id, expense.clone())?;
        self.store.put_expense(trip_id, expense_id, &expense).await?;

        tracing::info!(
            "expense {expense_id} of {} added to trip {trip_id} by {}",
            expense.amount,
            session.member_id()
        );
        Ok(expense_id)
    }
}
