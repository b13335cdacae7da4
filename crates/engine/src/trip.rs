//! The module contains the representation of a trip and its expenses.
//!
//! A trip is a small state machine: it is created [`Active`], collects
//! expenses, and is moved to [`Completed`] exactly once by its creator. The
//! completion freezes the per-trip balance map.
//!
//! [`Active`]: TripStatus::Active
//! [`Completed`]: TripStatus::Completed
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, ExpenseId, MemberId, MoneyCents, ResultEngine, TripBalances, TripId,
    split::ValidatedSplit,
};

/// A trip member as stored in the trip document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub email: String,
}

/// A single expense of a trip.
///
/// `participants` is the full intended split, payer's own share included.
/// `owed_amounts` is the same split without the payer: what every other
/// participant owes the payer for this expense.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub description: String,
    pub amount: MoneyCents,
    pub paid_by: MemberId,
    pub date: NaiveDate,
    #[serde(default)]
    pub participants: BTreeMap<MemberId, MoneyCents>,
    #[serde(default)]
    pub owed_amounts: BTreeMap<MemberId, MoneyCents>,
}

impl Expense {
    /// Builds an expense from a split that already passed validation.
    pub fn new(
        description: String,
        amount: MoneyCents,
        paid_by: MemberId,
        date: NaiveDate,
        split: ValidatedSplit,
    ) -> Self {
        Self {
            description,
            amount,
            paid_by,
            date,
            participants: split.participants,
            owed_amounts: split.owed_amounts,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    #[default]
    Active,
    Completed,
}

impl TripStatus {
    pub fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// A trip document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: TripId,
    pub name: String,
    pub creator_id: MemberId,
    #[serde(default)]
    pub status: TripStatus,
    pub members: BTreeMap<MemberId, Member>,
    #[serde(default)]
    pub expenses: BTreeMap<ExpenseId, Expense>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balances: Option<TripBalances>,
    /// Set once the completion deltas were merged into the global ledgers.
    #[serde(default)]
    pub ledger_applied: bool,
}

impl Trip {
    /// Creates a new active trip without expenses.
    pub fn new(
        id: TripId,
        name: String,
        creator_id: MemberId,
        members: BTreeMap<MemberId, Member>,
    ) -> Self {
        Self {
            id,
            name,
            creator_id,
            status: TripStatus::Active,
            members,
            expenses: BTreeMap::new(),
            balances: None,
            ledger_applied: false,
        }
    }

    pub fn is_member(&self, member_id: &MemberId) -> bool {
        self.members.contains_key(member_id)
    }

    pub fn is_creator(&self, member_id: &MemberId) -> bool {
        &self.creator_id == member_id
    }

    /// Fails with [`EngineError::AlreadyCompleted`] unless the trip is active.
    pub fn ensure_active(&self) -> ResultEngine<()> {
        match self.status {
            TripStatus::Active => Ok(()),
            TripStatus::Completed => Err(EngineError::AlreadyCompleted(self.id)),
        }
    }

    /// Appends an expense. Only active trips accept expenses.
    pub fn add_expense(&mut self, expense_id: ExpenseId, expense: Expense) -> ResultEngine<()> {
        self.ensure_active()?;
        if self.expenses.contains_key(&expense_id) {
            return Err(EngineError::Consistency(format!(
                "expense {expense_id} already exists in trip {}",
                self.id
            )));
        }
        self.expenses.insert(expense_id, expense);
        Ok(())
    }

    /// One-way `active -> completed` transition freezing `balances`.
    pub fn complete(&mut self, balances: TripBalances) -> ResultEngine<()> {
        self.ensure_active()?;
        self.status = TripStatus::Completed;
        self.balances = Some(balances);
        Ok(())
    }
}
