//! Global pairwise ledgers.
//!
//! Every member carries a running ledger across all of their completed trips:
//! who owes them (`owedToMe`) and whom they owe (`iOwe`). Completing a trip
//! produces a [`LedgerPatch`] which is merged additively into the stored
//! ledgers.
//!
//! The attribution is a replication, not a proportional split: a member's
//! whole per-trip deficit (or surplus) is recorded against every other member
//! of the trip, on both sides of the pair. With more than two members this
//! inflates the aggregate figures. The two sides always agree:
//! `x.owedToMe[y] == y.iOwe[x]`.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{EngineError, MemberId, MoneyCents, ResultEngine, TripBalances};

/// Running debts of one member towards the others.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalLedger {
    #[serde(default)]
    pub owed_to_me: BTreeMap<MemberId, MoneyCents>,
    #[serde(default)]
    pub i_owe: BTreeMap<MemberId, MoneyCents>,
}

impl GlobalLedger {
    pub fn is_empty(&self) -> bool {
        self.owed_to_me.is_empty() && self.i_owe.is_empty()
    }

    /// Adds `delta` entry by entry. Existing values are never overwritten.
    ///
    /// On overflow nothing is changed and a [`EngineError::Consistency`] is
    /// returned.
    pub fn merge(&mut self, delta: &GlobalLedger) -> ResultEngine<()> {
        let mut merged = self.clone();
        add_entries(&mut merged.owed_to_me, &delta.owed_to_me)?;
        add_entries(&mut merged.i_owe, &delta.i_owe)?;
        *self = merged;
        Ok(())
    }
}

fn add_entries(
    target: &mut BTreeMap<MemberId, MoneyCents>,
    delta: &BTreeMap<MemberId, MoneyCents>,
) -> ResultEngine<()> {
    for (other, amount) in delta {
        add_to(target, other, *amount)?;
    }
    Ok(())
}

fn add_to(
    target: &mut BTreeMap<MemberId, MoneyCents>,
    other: &MemberId,
    amount: MoneyCents,
) -> ResultEngine<()> {
    let entry = target.entry(other.clone()).or_default();
    *entry = entry
        .checked_add(amount)
        .ok_or_else(|| EngineError::Consistency(format!("ledger entry for {other} overflows")))?;
    Ok(())
}

/// Ledger deltas of one trip completion, keyed by the member they belong to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerPatch(BTreeMap<MemberId, GlobalLedger>);

impl LedgerPatch {
    /// Builds the pairwise deltas out of a frozen trip balance map.
    ///
    /// For every ordered pair `(a, b)` of distinct members:
    /// - `a` in deficit: `|balance(a)|` is added to `a.iOwe[b]` and to
    ///   `b.owedToMe[a]`;
    /// - `a` in surplus: `balance(a)` is added to `a.owedToMe[b]` and to
    ///   `b.iOwe[a]`.
    ///
    /// Members with a zero balance contribute nothing.
    pub fn from_balances(balances: &TripBalances) -> ResultEngine<Self> {
        let mut deltas: BTreeMap<MemberId, GlobalLedger> = BTreeMap::new();

        for (member, balance) in balances {
            if balance.is_zero() {
                continue;
            }
            let amount = balance.abs();
            for other in balances.keys().filter(|other| *other != member) {
                if balance.is_negative() {
                    add_to(&mut deltas.entry(member.clone()).or_default().i_owe, other, amount)?;
                    add_to(&mut deltas.entry(other.clone()).or_default().owed_to_me, member, amount)?;
                } else {
                    add_to(&mut deltas.entry(member.clone()).or_default().owed_to_me, other, amount)?;
                    add_to(&mut deltas.entry(other.clone()).or_default().i_owe, member, amount)?;
                }
            }
        }

        tracing::debug!("ledger deltas: {deltas:?}");
        Ok(Self(deltas))
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(GlobalLedger::is_empty)
    }

    /// Delta for a single member, if any.
    pub fn get(&self, member: &MemberId) -> Option<&GlobalLedger> {
        self.0.get(member)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MemberId, &GlobalLedger)> {
        self.0.iter()
    }

    /// Merges every delta into the matching ledger, creating missing ones.
    ///
    /// All or nothing: on overflow `ledgers` is left untouched.
    pub fn apply_to(&self, ledgers: &mut BTreeMap<MemberId, GlobalLedger>) -> ResultEngine<()> {
        let mut merged = BTreeMap::new();
        for (member, delta) in &self.0 {
            let mut ledger = ledgers.get(member).cloned().unwrap_or_default();
            ledger.merge(delta)?;
            merged.insert(member.clone(), ledger);
        }
        ledgers.extend(merged);
        Ok(())
    }
}
