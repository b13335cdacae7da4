//! Expense split validation.
//!
//! A split maps every participating member to the share of the expense they
//! are responsible for. The shares must add up to the expense amount, within
//! a small tolerance that covers rounding done on the client side.
use std::collections::{BTreeMap, BTreeSet};

use crate::{EngineError, MemberId, MoneyCents, ResultEngine};

/// Default tolerance between the split sum and the expense amount: one cent.
pub const DEFAULT_SPLIT_TOLERANCE: MoneyCents = MoneyCents::new(1);

/// Output of [`validate_split`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedSplit {
    /// Full split, payer included.
    pub participants: BTreeMap<MemberId, MoneyCents>,
    /// Split without the payer: what each participant owes the payer.
    pub owed_amounts: BTreeMap<MemberId, MoneyCents>,
}

/// Checks a participant split against the expense amount and derives the
/// owed amounts.
///
/// Rejects a non positive amount, an empty split, negative shares and a split
/// whose sum differs from `amount` by more than `tolerance`.
pub fn validate_split(
    amount: MoneyCents,
    paid_by: &MemberId,
    shares: &BTreeMap<MemberId, MoneyCents>,
    tolerance: MoneyCents,
) -> ResultEngine<ValidatedSplit> {
    if !amount.is_positive() {
        return Err(EngineError::Validation(
            "expense amount must be positive".to_string(),
        ));
    }
    if shares.is_empty() {
        return Err(EngineError::Validation(
            "select at least one participant".to_string(),
        ));
    }
    if let Some((member, share)) = shares.iter().find(|(_, share)| share.is_negative()) {
        return Err(EngineError::Validation(format!(
            "share of {member} must not be negative (got {share})"
        )));
    }

    let total = shares
        .values()
        .try_fold(MoneyCents::ZERO, |acc, share| acc.checked_add(*share))
        .ok_or_else(|| EngineError::Validation("split sum overflows".to_string()))?;
    let diff = total
        .checked_sub(amount)
        .ok_or_else(|| EngineError::Validation("split sum overflows".to_string()))?;
    if diff.abs() > tolerance {
        return Err(EngineError::Validation(format!(
            "participant shares add up to {total}, expense amount is {amount}"
        )));
    }

    let owed_amounts = shares
        .iter()
        .filter(|(member, _)| *member != paid_by)
        .map(|(member, share)| (member.clone(), *share))
        .collect();

    Ok(ValidatedSplit {
        participants: shares.clone(),
        owed_amounts,
    })
}

/// Splits `amount` evenly across `participants`.
///
/// Every participant gets `amount / count` whole cents; the leftover cents go
/// one each to the first participants, in order. The shares always add up to
/// `amount` exactly.
pub fn split_evenly(
    amount: MoneyCents,
    participants: &[MemberId],
) -> ResultEngine<BTreeMap<MemberId, MoneyCents>> {
    if !amount.is_positive() {
        return Err(EngineError::Validation(
            "expense amount must be positive".to_string(),
        ));
    }
    if participants.is_empty() {
        return Err(EngineError::Validation(
            "select at least one participant".to_string(),
        ));
    }
    let unique: BTreeSet<&MemberId> = participants.iter().collect();
    if unique.len() != participants.len() {
        return Err(EngineError::Validation(
            "participants must not repeat".to_string(),
        ));
    }

    let count = participants.len() as i64;
    let base = amount.cents() / count;
    let remainder = amount.cents() % count;

    Ok(participants
        .iter()
        .enumerate()
        .map(|(idx, member)| {
            let extra = i64::from((idx as i64) < remainder);
            (member.clone(), MoneyCents::new(base + extra))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> MemberId {
        MemberId::new(value)
    }

    fn shares(entries: &[(&str, i64)]) -> BTreeMap<MemberId, MoneyCents> {
        entries
            .iter()
            .map(|(member, cents)| (id(member), MoneyCents::new(*cents)))
            .collect()
    }

    #[test]
    fn owed_amounts_exclude_payer() {
        let split = validate_split(
            MoneyCents::new(9000),
            &id("a"),
            &shares(&[("a", 3000), ("b", 3000), ("c", 3000)]),
            DEFAULT_SPLIT_TOLERANCE,
        )
        .unwrap();

        assert_eq!(split.owed_amounts, shares(&[("b", 3000), ("c", 3000)]));
        assert_eq!(split.participants.len(), 3);
    }

    #[test]
    fn owed_plus_payer_share_matches_amount() {
        let amount = MoneyCents::new(10_000);
        let split = validate_split(
            amount,
            &id("b"),
            &shares(&[("a", 3334), ("b", 3333), ("c", 3333)]),
            DEFAULT_SPLIT_TOLERANCE,
        )
        .unwrap();

        let owed: MoneyCents = split.owed_amounts.values().sum();
        let payer_share = split.participants[&id("b")];
        assert!((owed + payer_share - amount).abs() <= DEFAULT_SPLIT_TOLERANCE);
    }

    #[test]
    fn payer_outside_split_is_owed_everything() {
        let split = validate_split(
            MoneyCents::new(5000),
            &id("a"),
            &shares(&[("b", 5000)]),
            DEFAULT_SPLIT_TOLERANCE,
        )
        .unwrap();
        assert_eq!(split.owed_amounts, shares(&[("b", 5000)]));
    }

    #[test]
    fn unbalanced_split_is_rejected() {
        let err = validate_split(
            MoneyCents::new(10_000),
            &id("a"),
            &shares(&[("a", 4000), ("b", 4000)]),
            DEFAULT_SPLIT_TOLERANCE,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn one_cent_rounding_is_tolerated() {
        assert!(
            validate_split(
                MoneyCents::new(10_000),
                &id("a"),
                &shares(&[("a", 3333), ("b", 3333), ("c", 3333)]),
                DEFAULT_SPLIT_TOLERANCE,
            )
            .is_ok()
        );
        assert!(
            validate_split(
                MoneyCents::new(10_000),
                &id("a"),
                &shares(&[("a", 3333), ("b", 3333), ("c", 3332)]),
                DEFAULT_SPLIT_TOLERANCE,
            )
            .is_err()
        );
    }

    #[test]
    fn negative_share_and_empty_split_are_rejected() {
        let negative = validate_split(
            MoneyCents::new(1000),
            &id("a"),
            &shares(&[("a", 1500), ("b", -500)]),
            DEFAULT_SPLIT_TOLERANCE,
        );
        assert!(matches!(negative, Err(EngineError::Validation(_))));

        let empty = validate_split(
            MoneyCents::new(1000),
            &id("a"),
            &BTreeMap::new(),
            DEFAULT_SPLIT_TOLERANCE,
        );
        assert!(matches!(empty, Err(EngineError::Validation(_))));

        let zero_amount = validate_split(
            MoneyCents::ZERO,
            &id("a"),
            &shares(&[("a", 0)]),
            DEFAULT_SPLIT_TOLERANCE,
        );
        assert!(matches!(zero_amount, Err(EngineError::Validation(_))));
    }

    #[test]
    fn even_split_hands_out_remainder_cents() {
        let split = split_evenly(MoneyCents::new(10_000), &[id("a"), id("b"), id("c")]).unwrap();

        assert_eq!(split, shares(&[("a", 3334), ("b", 3333), ("c", 3333)]));
        assert_eq!(split.values().sum::<MoneyCents>(), MoneyCents::new(10_000));
        assert!(
            validate_split(
                MoneyCents::new(10_000),
                &id("a"),
                &split,
                MoneyCents::ZERO
            )
            .is_ok()
        );
    }

    #[test]
    fn even_split_rejects_empty_and_repeated_participants() {
        assert!(split_evenly(MoneyCents::new(100), &[]).is_err());
        assert!(split_evenly(MoneyCents::new(100), &[id("a"), id("a")]).is_err());
    }
}
