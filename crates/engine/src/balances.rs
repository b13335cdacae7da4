//! Per-trip net balances.
use std::collections::BTreeMap;

use crate::{EngineError, Expense, MemberId, MoneyCents, ResultEngine};

/// Signed net balance of every trip member.
///
/// Positive: the group owes the member. Negative: the member owes the group.
pub type TripBalances = BTreeMap<MemberId, MoneyCents>;

/// Folds the expenses of a trip into per-member net balances.
///
/// Every member starts at zero. For each expense the payer is credited with
/// what the other participants owe them, and each of those participants is
/// debited their owed amount; the payer's own share cancels out. The result
/// does not depend on expense order and always sums to zero.
///
/// Payers or debtors outside `members` are reported as
/// [`EngineError::Consistency`].
pub fn trip_balances<'a, M, E>(members: M, expenses: E) -> ResultEngine<TripBalances>
where
    M: IntoIterator<Item = &'a MemberId>,
    E: IntoIterator<Item = &'a Expense>,
{
    let mut balances: TripBalances = members
        .into_iter()
        .map(|member| (member.clone(), MoneyCents::ZERO))
        .collect();

    for expense in expenses {
        let mut credited = MoneyCents::ZERO;
        for (debtor, owed) in &expense.owed_amounts {
            let balance = balances.get_mut(debtor).ok_or_else(|| {
                EngineError::Consistency(format!(
                    "expense \"{}\" is owed by {debtor}, who is not a trip member",
                    expense.description
                ))
            })?;
            *balance = balance
                .checked_sub(*owed)
                .ok_or_else(|| EngineError::Consistency("balance overflow".to_string()))?;
            credited = credited
                .checked_add(*owed)
                .ok_or_else(|| EngineError::Consistency("balance overflow".to_string()))?;
        }

        let payer = balances.get_mut(&expense.paid_by).ok_or_else(|| {
            EngineError::Consistency(format!(
                "expense \"{}\" was paid by {}, who is not a trip member",
                expense.description, expense.paid_by
            ))
        })?;
        *payer = payer
            .checked_add(credited)
            .ok_or_else(|| EngineError::Consistency("balance overflow".to_string()))?;
    }

    debug_assert!(balances.values().sum::<MoneyCents>().is_zero());
    tracing::debug!("computed trip balances: {balances:?}");
    Ok(balances)
}
