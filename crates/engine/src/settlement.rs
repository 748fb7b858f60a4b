//! Balance computation and transfer matching.
//!
//! [`compute_summary`] is the one pure function of the engine: given the
//! member roster and the signed ledger of a group it derives each member's
//! net balance and a short list of peer-to-peer transfers that clears all
//! balances. It has no side effects, touches no database, and always returns
//! either a complete [`Summary`] or an error.
//!
//! The matching is the standard greedy approximation: pair the largest debt
//! against the largest credit until one side runs out. It minimizes the
//! transfer count in the common case but is not a globally optimal
//! min-cash-flow solver.

use std::collections::BTreeMap;

use crate::{EngineError, MoneyCents, entries::Entry};

/// Settlement tolerance: balances within one cent of zero count as settled
/// and never produce a transfer.
pub const EPSILON: MoneyCents = MoneyCents::new(1);

/// A ledger amount attributed to one member, reduced to what the settlement
/// math needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedEntry {
    pub member_id: String,
    pub amount: MoneyCents,
    /// Settlement halves move money between members' `paid` totals but must
    /// not change the shared expense pool.
    pub is_settlement: bool,
}

impl From<&Entry> for SignedEntry {
    fn from(entry: &Entry) -> Self {
        Self {
            member_id: entry.user_id.clone(),
            amount: entry.amount,
            is_settlement: entry.is_settlement,
        }
    }
}

/// Derived per-member position. Sign convention: positive balance = the
/// group owes this member money; negative = this member owes the group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberBalance {
    pub member_id: String,
    pub paid: MoneyCents,
    pub owed: MoneyCents,
    pub balance: MoneyCents,
}

/// "`from` should pay `to` this amount." A recommendation, never persisted;
/// executing one is a separate act (recording a settlement pair).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferSuggestion {
    pub from: String,
    pub to: String,
    pub amount: MoneyCents,
}

/// Complete settlement picture for one group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Summary {
    pub total_pool: MoneyCents,
    pub split_per_head: MoneyCents,
    pub balances: Vec<MemberBalance>,
    pub transfers: Vec<TransferSuggestion>,
}

/// Even split of the expense pool, rounded half-away-from-zero to whole
/// cents. Applied once; downstream math never re-rounds.
fn split_per_head(total_pool: MoneyCents, member_count: i64) -> MoneyCents {
    let pool = total_pool.cents();
    // Pool is non-negative (expense entries are validated positive), so
    // half-away-from-zero is plain half-up.
    MoneyCents::new((2 * pool + member_count) / (2 * member_count))
}

/// Computes per-member balances and a transfer plan for one group.
///
/// `members` must be non-empty and every entry must be attributed to one of
/// them; violations surface as [`EngineError::EmptyGroup`] and
/// [`EngineError::Integrity`] rather than a miscomputed result.
///
/// Balances are reported for every member, sorted by member id. Transfers
/// are matched greedily, largest debt against largest credit, with ties
/// broken by member id so identical inputs always produce identical output.
pub fn compute_summary(
    members: &[String],
    entries: &[SignedEntry],
) -> Result<Summary, EngineError> {
    if members.is_empty() {
        return Err(EngineError::EmptyGroup(
            "cannot split expenses in a group with no members".to_string(),
        ));
    }

    let mut paid: BTreeMap<&str, MoneyCents> = members
        .iter()
        .map(|member| (member.as_str(), MoneyCents::ZERO))
        .collect();
    let mut total_pool = MoneyCents::ZERO;

    for entry in entries {
        let slot = paid.get_mut(entry.member_id.as_str()).ok_or_else(|| {
            EngineError::Integrity(format!(
                "ledger entry attributed to unknown member \"{}\"",
                entry.member_id
            ))
        })?;
        *slot += entry.amount;
        if !entry.is_settlement {
            total_pool += entry.amount;
        }
    }

    let member_count = paid.len() as i64;
    let split = split_per_head(total_pool, member_count);

    // BTreeMap iteration keeps the output ordered by member id.
    let balances: Vec<MemberBalance> = paid
        .into_iter()
        .map(|(member_id, paid)| MemberBalance {
            member_id: member_id.to_string(),
            paid,
            owed: split,
            balance: paid - split,
        })
        .collect();

    let mut debtors: Vec<(&str, MoneyCents)> = balances
        .iter()
        .filter(|b| b.balance < -EPSILON)
        .map(|b| (b.member_id.as_str(), b.balance))
        .collect();
    let mut creditors: Vec<(&str, MoneyCents)> = balances
        .iter()
        .filter(|b| b.balance > EPSILON)
        .map(|b| (b.member_id.as_str(), b.balance))
        .collect();

    // Largest debt first, largest credit first.
    debtors.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    creditors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let mut transfers = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < debtors.len() && j < creditors.len() {
        let debt = -debtors[i].1;
        let credit = creditors[j].1;
        let amount = debt.min(credit);

        if amount > EPSILON {
            transfers.push(TransferSuggestion {
                from: debtors[i].0.to_string(),
                to: creditors[j].0.to_string(),
                amount,
            });
            debtors[i].1 += amount;
            creditors[j].1 -= amount;
        }

        // Both advances are checked every round: one transfer can exhaust
        // debtor and creditor at the same time.
        if -debtors[i].1 <= EPSILON {
            i += 1;
        }
        if j < creditors.len() && creditors[j].1 <= EPSILON {
            j += 1;
        }
    }

    // A closed ledger leaves nothing unmatched beyond the once-rounded
    // per-head share, which can carry up to one cent of residue per member.
    let residual = debtors[i..]
        .iter()
        .chain(creditors[j..].iter())
        .fold(MoneyCents::ZERO, |acc, (_, balance)| acc + *balance);
    if residual.abs() > MoneyCents::new(member_count) {
        return Err(EngineError::NotReconciled(format!(
            "unmatched balance of {residual} left after transfer matching"
        )));
    }

    Ok(Summary {
        total_pool,
        split_per_head: split,
        balances,
        transfers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn expense(member: &str, cents: i64) -> SignedEntry {
        SignedEntry {
            member_id: member.to_string(),
            amount: MoneyCents::new(cents),
            is_settlement: false,
        }
    }

    fn settlement_pair(from: &str, to: &str, cents: i64) -> [SignedEntry; 2] {
        [
            SignedEntry {
                member_id: from.to_string(),
                amount: MoneyCents::new(cents),
                is_settlement: true,
            },
            SignedEntry {
                member_id: to.to_string(),
                amount: MoneyCents::new(-cents),
                is_settlement: true,
            },
        ]
    }

    fn balance_of<'a>(summary: &'a Summary, member: &str) -> &'a MemberBalance {
        summary
            .balances
            .iter()
            .find(|b| b.member_id == member)
            .unwrap()
    }

    #[test]
    fn empty_group_is_an_error_not_a_crash() {
        let err = compute_summary(&[], &[]).unwrap_err();
        assert!(matches!(err, EngineError::EmptyGroup(_)));
    }

    #[test]
    fn unknown_member_entry_is_an_integrity_error() {
        let err = compute_summary(&members(&["alice"]), &[expense("mallory", 100)]).unwrap_err();
        assert!(matches!(err, EngineError::Integrity(_)));
    }

    #[test]
    fn empty_ledger_yields_zero_everything() {
        let summary = compute_summary(&members(&["alice", "bob"]), &[]).unwrap();
        assert_eq!(summary.total_pool, MoneyCents::ZERO);
        assert_eq!(summary.split_per_head, MoneyCents::ZERO);
        assert!(summary.transfers.is_empty());
        for balance in &summary.balances {
            assert_eq!(balance.balance, MoneyCents::ZERO);
        }
    }

    #[test]
    fn single_debtor_single_creditor() {
        let summary =
            compute_summary(&members(&["alice", "bob"]), &[expense("alice", 100_00)]).unwrap();

        assert_eq!(summary.split_per_head, MoneyCents::new(50_00));
        assert_eq!(balance_of(&summary, "alice").balance, MoneyCents::new(50_00));
        assert_eq!(balance_of(&summary, "bob").balance, MoneyCents::new(-50_00));
        assert_eq!(
            summary.transfers,
            vec![TransferSuggestion {
                from: "bob".to_string(),
                to: "alice".to_string(),
                amount: MoneyCents::new(50_00),
            }]
        );
    }

    #[test]
    fn three_member_uneven_matches_largest_debt_first() {
        let summary = compute_summary(
            &members(&["alice", "bob", "carol"]),
            &[expense("alice", 90_00), expense("bob", 30_00)],
        )
        .unwrap();

        assert_eq!(summary.total_pool, MoneyCents::new(120_00));
        assert_eq!(summary.split_per_head, MoneyCents::new(40_00));
        assert_eq!(balance_of(&summary, "alice").balance, MoneyCents::new(50_00));
        assert_eq!(balance_of(&summary, "bob").balance, MoneyCents::new(-10_00));
        assert_eq!(balance_of(&summary, "carol").balance, MoneyCents::new(-40_00));

        // Carol's larger debt is matched before Bob's.
        assert_eq!(
            summary.transfers,
            vec![
                TransferSuggestion {
                    from: "carol".to_string(),
                    to: "alice".to_string(),
                    amount: MoneyCents::new(40_00),
                },
                TransferSuggestion {
                    from: "bob".to_string(),
                    to: "alice".to_string(),
                    amount: MoneyCents::new(10_00),
                },
            ]
        );
    }

    #[test]
    fn one_cent_apart_is_settled_two_cents_is_not() {
        // Pool of 2 cents: balances are +1/-1, inside the tolerance.
        let summary = compute_summary(&members(&["alice", "bob"]), &[expense("alice", 2)]).unwrap();
        assert!(summary.transfers.is_empty());

        // Pool of 4 cents: balances are +2/-2, a transfer is due.
        let summary = compute_summary(&members(&["alice", "bob"]), &[expense("alice", 4)]).unwrap();
        assert_eq!(summary.transfers.len(), 1);
        assert_eq!(summary.transfers[0].amount, MoneyCents::new(2));
    }

    #[test]
    fn settlement_pair_moves_balances_but_not_the_pool() {
        let roster = members(&["alice", "bob"]);
        let ledger = vec![expense("alice", 100_00)];
        let before = compute_summary(&roster, &ledger).unwrap();
        assert_eq!(balance_of(&before, "bob").balance, MoneyCents::new(-50_00));

        // Bob pays Alice exactly what he owes.
        let mut ledger = ledger;
        ledger.extend(settlement_pair("bob", "alice", 50_00));
        let after = compute_summary(&roster, &ledger).unwrap();

        assert_eq!(after.total_pool, before.total_pool);
        assert_eq!(after.split_per_head, before.split_per_head);
        assert_eq!(balance_of(&after, "alice").balance, MoneyCents::ZERO);
        assert_eq!(balance_of(&after, "bob").balance, MoneyCents::ZERO);
        assert!(after.transfers.is_empty());
    }

    #[test]
    fn conservation_and_transfer_soundness() {
        let roster = members(&["alice", "bob", "carol", "dave"]);
        let ledger = vec![
            expense("alice", 123_45),
            expense("bob", 67_89),
            expense("alice", 10_00),
            expense("dave", 200_11),
        ];
        let summary = compute_summary(&roster, &ledger).unwrap();

        // Conservation: balances sum to (at most) the rounding residue.
        let total: MoneyCents = summary
            .balances
            .iter()
            .fold(MoneyCents::ZERO, |acc, b| acc + b.balance);
        assert!(total.abs() <= MoneyCents::new(roster.len() as i64));

        // Soundness: applying every transfer drives all balances to within
        // the tolerance of zero.
        let mut residual: BTreeMap<&str, MoneyCents> = summary
            .balances
            .iter()
            .map(|b| (b.member_id.as_str(), b.balance))
            .collect();
        for transfer in &summary.transfers {
            *residual.get_mut(transfer.from.as_str()).unwrap() += transfer.amount;
            *residual.get_mut(transfer.to.as_str()).unwrap() -= transfer.amount;
        }
        for (member, balance) in residual {
            assert!(
                balance.abs() <= MoneyCents::new(roster.len() as i64),
                "{member} left with {balance}"
            );
        }
    }

    #[test]
    fn identical_input_yields_identical_output() {
        let roster = members(&["alice", "bob", "carol"]);
        let ledger = vec![expense("alice", 90_00), expense("bob", 30_00)];
        let first = compute_summary(&roster, &ledger).unwrap();
        let second = compute_summary(&roster, &ledger).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn equal_balances_tie_break_by_member_id() {
        // Bob and Carol owe the same; Bob must be matched first.
        let summary = compute_summary(
            &members(&["alice", "bob", "carol"]),
            &[expense("alice", 90_00)],
        )
        .unwrap();

        assert_eq!(summary.transfers.len(), 2);
        assert_eq!(summary.transfers[0].from, "bob");
        assert_eq!(summary.transfers[1].from, "carol");
    }

    #[test]
    fn uneven_split_rounds_half_away_from_zero_once() {
        // 100.00 across 3 heads: 33.333... rounds to 33.33.
        let summary = compute_summary(
            &members(&["alice", "bob", "carol"]),
            &[expense("alice", 100_00)],
        )
        .unwrap();
        assert_eq!(summary.split_per_head, MoneyCents::new(33_33));

        // 100.01 across 2 heads: 50.005 rounds up to 50.01.
        let summary =
            compute_summary(&members(&["alice", "bob"]), &[expense("alice", 100_01)]).unwrap();
        assert_eq!(summary.split_per_head, MoneyCents::new(50_01));
    }

    #[test]
    fn one_transfer_can_exhaust_both_cursors() {
        // Two debtors owing 30 each against two creditors owed 30 each: the
        // first transfer closes one debtor and one creditor simultaneously.
        let summary = compute_summary(
            &members(&["alice", "bob", "carol", "dave"]),
            &[expense("alice", 60_00), expense("bob", 60_00)],
        )
        .unwrap();

        assert_eq!(summary.transfers.len(), 2);
        for transfer in &summary.transfers {
            assert_eq!(transfer.amount, MoneyCents::new(30_00));
        }
    }
}
