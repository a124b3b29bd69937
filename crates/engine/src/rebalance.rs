//! Pure rebalancing policy.
//!
//! Two decisions live here, free of any storage concern:
//!
//! 1. how an account's aggregate balance is derived from its buckets, given
//!    how many accounts the user holds and where this one sits
//!    chronologically;
//! 2. what happens to the bucket layout when a new account is added.
//!
//! The executors in [`crate::ops`] take the plans produced here and apply
//! them inside one database transaction.

use std::collections::HashMap;

use crate::{AllocationKind, EngineError, Money};

/// Bucket balances of a single account, missing kinds counting as zero.
pub type BucketAmounts = HashMap<AllocationKind, Money>;

/// Where an account sits in the user's chronological account list
/// (`ORDER BY created_at, id`; the id breaks timestamp ties).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountPosition {
    /// The user's only account.
    Single,
    /// The older of exactly two accounts ("Bank A").
    FirstOfTwo,
    /// The newer of exactly two accounts ("Bank B").
    SecondOfTwo,
    /// Any account of a user holding three or more.
    ThreePlus,
}

impl AccountPosition {
    /// Classifies the account at 0-based `ordinal` among `total_accounts`.
    #[must_use]
    pub fn classify(total_accounts: usize, ordinal: usize) -> Self {
        debug_assert!(ordinal < total_accounts.max(1));
        match total_accounts {
            0 | 1 => Self::Single,
            2 if ordinal == 0 => Self::FirstOfTwo,
            2 => Self::SecondOfTwo,
            _ => Self::ThreePlus,
        }
    }
}

/// Derives an account's aggregate `current_balance` from its buckets.
///
/// - one account: Kebutuhan + Tabungan (Darurat deliberately excluded)
/// - two accounts: the older account counts Kebutuhan only; the newer one
///   Tabungan + Darurat
/// - three or more: the plain sum of the account's own buckets
#[must_use]
pub fn aggregate_balance(position: AccountPosition, amounts: &BucketAmounts) -> Money {
    let of = |kind: AllocationKind| amounts.get(&kind).copied().unwrap_or(Money::ZERO);
    match position {
        AccountPosition::Single => of(AllocationKind::Kebutuhan) + of(AllocationKind::Tabungan),
        AccountPosition::FirstOfTwo => of(AllocationKind::Kebutuhan),
        AccountPosition::SecondOfTwo => of(AllocationKind::Tabungan) + of(AllocationKind::Darurat),
        AccountPosition::ThreePlus => AllocationKind::ALL
            .into_iter()
            .fold(Money::ZERO, |acc, kind| acc + of(kind)),
    }
}

/// The plain sum of an account's buckets, ignoring the count-sensitive
/// exclusions. This is the recompute rule used after a manual kind swap.
#[must_use]
pub fn plain_sum(amounts: &BucketAmounts) -> Money {
    amounts.values().fold(Money::ZERO, |acc, v| acc + *v)
}

/// One allocation the transition creates on the new account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlannedAllocation {
    pub kind: AllocationKind,
    /// `true`: the caller-requested balance; `false`: created at zero.
    pub funded: bool,
}

/// What adding one account does to the user's bucket layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionPlan {
    /// Kinds to delete from an existing account, addressed by its 0-based
    /// chronological ordinal.
    pub strip: Option<(usize, Vec<AllocationKind>)>,
    /// Allocations to create on the new account, in order.
    pub create: Vec<PlannedAllocation>,
}

/// Decides the bucket redistribution for an account-creation request.
///
/// `previous_count` is the number of accounts the user held before this
/// request. Rejections are [`EngineError::PolicyViolation`]; the caller must
/// not have written anything yet.
pub fn transition_plan(
    previous_count: usize,
    requested: AllocationKind,
) -> Result<TransitionPlan, EngineError> {
    let funded = |kind| PlannedAllocation { kind, funded: true };
    let zeroed = |kind| PlannedAllocation { kind, funded: false };

    match previous_count {
        // First account: all three buckets exist from day one, unfunded.
        // Balances arrive later through balance updates.
        0 => Ok(TransitionPlan {
            strip: None,
            create: AllocationKind::ALL.into_iter().map(zeroed).collect(),
        }),
        1 => {
            let counterpart = requested.savings_counterpart().ok_or_else(|| {
                EngineError::PolicyViolation(
                    "a second account must take Tabungan or Darurat; Kebutuhan stays on the first"
                        .to_string(),
                )
            })?;
            Ok(TransitionPlan {
                strip: Some((0, vec![AllocationKind::Tabungan, AllocationKind::Darurat])),
                create: vec![funded(requested), zeroed(counterpart)],
            })
        }
        2 => {
            if requested != AllocationKind::Darurat {
                return Err(EngineError::PolicyViolation(
                    "a third account must take Darurat".to_string(),
                ));
            }
            Ok(TransitionPlan {
                strip: Some((1, vec![AllocationKind::Darurat])),
                create: vec![funded(requested)],
            })
        }
        _ => Ok(TransitionPlan {
            strip: None,
            create: vec![funded(requested)],
        }),
    }
}

/// Advisory one-liner for the caller, keyed on the account count right after
/// the creation. Informational only, never persisted.
#[must_use]
pub fn advisory_message(total_accounts: usize) -> &'static str {
    match total_accounts {
        0 | 1 => "Good start! Adding a second account keeps needs and savings apart.",
        2 => "Nice! A third account gives your emergency fund its own home.",
        _ => "Great, your buckets each have their own account.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amounts(kebutuhan: i64, tabungan: i64, darurat: i64) -> BucketAmounts {
        let mut map = BucketAmounts::new();
        map.insert(AllocationKind::Kebutuhan, Money::new(kebutuhan));
        map.insert(AllocationKind::Tabungan, Money::new(tabungan));
        map.insert(AllocationKind::Darurat, Money::new(darurat));
        map
    }

    #[test]
    fn classify_positions() {
        assert_eq!(AccountPosition::classify(1, 0), AccountPosition::Single);
        assert_eq!(AccountPosition::classify(2, 0), AccountPosition::FirstOfTwo);
        assert_eq!(AccountPosition::classify(2, 1), AccountPosition::SecondOfTwo);
        assert_eq!(AccountPosition::classify(3, 0), AccountPosition::ThreePlus);
        assert_eq!(AccountPosition::classify(5, 4), AccountPosition::ThreePlus);
    }

    #[test]
    fn single_account_excludes_darurat() {
        let balance = aggregate_balance(AccountPosition::Single, &amounts(100, 50, 30));
        assert_eq!(balance, Money::new(150));
    }

    #[test]
    fn two_accounts_split_needs_from_savings() {
        let amounts = amounts(100, 50, 30);
        assert_eq!(
            aggregate_balance(AccountPosition::FirstOfTwo, &amounts),
            Money::new(100)
        );
        assert_eq!(
            aggregate_balance(AccountPosition::SecondOfTwo, &amounts),
            Money::new(80)
        );
    }

    #[test]
    fn three_plus_sums_everything() {
        let balance = aggregate_balance(AccountPosition::ThreePlus, &amounts(100, 50, 30));
        assert_eq!(balance, Money::new(180));
    }

    #[test]
    fn missing_buckets_count_as_zero() {
        let mut only_darurat = BucketAmounts::new();
        only_darurat.insert(AllocationKind::Darurat, Money::new(70));
        assert_eq!(
            aggregate_balance(AccountPosition::Single, &only_darurat),
            Money::ZERO
        );
        assert_eq!(
            aggregate_balance(AccountPosition::ThreePlus, &only_darurat),
            Money::new(70)
        );
    }

    #[test]
    fn first_account_creates_all_three_unfunded() {
        let plan = transition_plan(0, AllocationKind::Kebutuhan).unwrap();
        assert!(plan.strip.is_none());
        assert_eq!(plan.create.len(), 3);
        assert!(plan.create.iter().all(|p| !p.funded));
    }

    #[test]
    fn second_account_strips_savings_from_first() {
        let plan = transition_plan(1, AllocationKind::Tabungan).unwrap();
        assert_eq!(
            plan.strip,
            Some((0, vec![AllocationKind::Tabungan, AllocationKind::Darurat]))
        );
        assert_eq!(
            plan.create,
            vec![
                PlannedAllocation {
                    kind: AllocationKind::Tabungan,
                    funded: true
                },
                PlannedAllocation {
                    kind: AllocationKind::Darurat,
                    funded: false
                },
            ]
        );
    }

    #[test]
    fn second_account_rejects_kebutuhan() {
        let err = transition_plan(1, AllocationKind::Kebutuhan).unwrap_err();
        assert!(matches!(err, EngineError::PolicyViolation(_)));
    }

    #[test]
    fn third_account_takes_darurat_only() {
        let plan = transition_plan(2, AllocationKind::Darurat).unwrap();
        assert_eq!(plan.strip, Some((1, vec![AllocationKind::Darurat])));
        assert_eq!(plan.create.len(), 1);

        assert!(matches!(
            transition_plan(2, AllocationKind::Tabungan),
            Err(EngineError::PolicyViolation(_))
        ));
        assert!(matches!(
            transition_plan(2, AllocationKind::Kebutuhan),
            Err(EngineError::PolicyViolation(_))
        ));
    }

    #[test]
    fn later_accounts_are_unrestricted() {
        for kind in AllocationKind::ALL {
            let plan = transition_plan(3, kind).unwrap();
            assert!(plan.strip.is_none());
            assert_eq!(plan.create.len(), 1);
            assert_eq!(plan.create[0].kind, kind);
        }
    }
}
