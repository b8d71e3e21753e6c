use tracing::warn;

use crate::model::{MemberBalance, Settlement};
use crate::{Amount, PositiveAmount};

/// One side of the netting: a member and what is still outstanding for them.
struct Position<'a> {
    name: &'a str,
    remaining: Amount,
}

/// Partition balances into `(creditors, debtors)`, each largest first.
///
/// Debts are stored as positive amounts. The sort is stable, so equal
/// amounts keep their input order.
fn positions(balances: &[MemberBalance]) -> (Vec<Position<'_>>, Vec<Position<'_>>) {
    let (mut creditors, mut debtors): (Vec<_>, Vec<_>) = balances
        .iter()
        .filter(|b| !b.balance.is_zero())
        .map(|b| Position {
            name: &b.member_name,
            remaining: b.balance,
        })
        .partition(|p| p.remaining.is_positive());

    for debtor in &mut debtors {
        debtor.remaining = -debtor.remaining;
    }

    creditors.sort_by(|a, b| b.remaining.cmp(&a.remaining));
    debtors.sort_by(|a, b| b.remaining.cmp(&a.remaining));

    (creditors, debtors)
}

/// Produce the transfers that bring every balance to zero.
///
/// Greedy netting: the largest remaining debtor pays the largest remaining
/// creditor as much as both allow, then whichever side reached zero moves on.
/// This yields at most `creditors + debtors - 1` transfers. It is not always
/// the theoretical minimum number of transfers (finding that is NP-hard in
/// general), but matches it for the usual few-payers case.
///
/// Balances are expected to sum to zero, as produced by
/// [`calculate_member_balances`](super::calculate_member_balances). When they
/// don't, netting stops once either side runs out and the leftover is logged.
pub fn calculate_minimal_settlements(balances: &[MemberBalance]) -> Vec<Settlement> {
    let (mut creditors, mut debtors) = positions(balances);
    let mut settlements = Vec::with_capacity((creditors.len() + debtors.len()).saturating_sub(1));

    let (mut c, mut d) = (0, 0);
    while c < creditors.len() && d < debtors.len() {
        let creditor = &mut creditors[c];
        let debtor = &mut debtors[d];
        let transfer = creditor.remaining.min(debtor.remaining);

        // both sides are strictly positive while their cursor points at them
        if let Ok(amount) = PositiveAmount::try_from(transfer) {
            settlements.push(Settlement {
                from: debtor.name.to_string(),
                to: creditor.name.to_string(),
                amount,
            });
        }

        creditor.remaining -= transfer;
        debtor.remaining -= transfer;

        if creditor.remaining.is_zero() {
            c += 1;
        }
        if debtor.remaining.is_zero() {
            d += 1;
        }
    }

    if c < creditors.len() || d < debtors.len() {
        let unsettled: Amount = creditors[c..]
            .iter()
            .chain(&debtors[d..])
            .map(|p| p.remaining)
            .sum();
        warn!(%unsettled, "balances do not sum to zero, plan is partial");
    }

    settlements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BalanceStatus, MemberId};

    fn balance(name: &str, value: i64) -> MemberBalance {
        let balance = Amount::new(value);
        MemberBalance {
            member_id: MemberId::generate(),
            member_name: name.to_string(),
            balance,
            status: BalanceStatus::of(balance),
        }
    }

    fn transfers(settlements: &[Settlement]) -> Vec<(&str, &str, i64)> {
        settlements
            .iter()
            .map(|s| (s.from.as_str(), s.to.as_str(), s.amount.get()))
            .collect()
    }

    #[test]
    fn empty_input_needs_no_transfers() {
        assert!(calculate_minimal_settlements(&[]).is_empty());
    }

    #[test]
    fn settled_balances_need_no_transfers() {
        let balances = vec![balance("A", 0), balance("B", 0)];
        assert!(calculate_minimal_settlements(&balances).is_empty());
    }

    #[test]
    fn single_creditor_collects_from_everyone() {
        let balances = vec![
            balance("A", 75),
            balance("B", -25),
            balance("C", -25),
            balance("D", -25),
        ];
        assert_eq!(
            transfers(&calculate_minimal_settlements(&balances)),
            vec![("B", "A", 25), ("C", "A", 25), ("D", "A", 25)]
        );
    }

    #[test]
    fn largest_debtor_pays_largest_creditor_first() {
        let balances = vec![
            balance("A", 30),
            balance("B", -100),
            balance("C", 70),
        ];
        assert_eq!(
            transfers(&calculate_minimal_settlements(&balances)),
            vec![("B", "C", 70), ("B", "A", 30)]
        );
    }

    #[test]
    fn partial_transfers_carry_over() {
        let balances = vec![
            balance("A", 50),
            balance("B", 50),
            balance("C", -60),
            balance("D", -40),
        ];
        assert_eq!(
            transfers(&calculate_minimal_settlements(&balances)),
            vec![("C", "A", 50), ("C", "B", 10), ("D", "B", 40)]
        );
    }

    #[test]
    fn ties_keep_input_order() {
        let balances = vec![
            balance("X", -10),
            balance("A", 10),
            balance("Y", -10),
            balance("B", 10),
        ];
        assert_eq!(
            transfers(&calculate_minimal_settlements(&balances)),
            vec![("X", "A", 10), ("Y", "B", 10)]
        );
    }

    #[test]
    fn unbalanced_input_yields_a_partial_plan() {
        assert!(calculate_minimal_settlements(&[balance("A", 10)]).is_empty());

        let balances = vec![balance("A", 30), balance("B", -20)];
        assert_eq!(
            transfers(&calculate_minimal_settlements(&balances)),
            vec![("B", "A", 20)]
        );
    }

    #[test]
    fn transfer_count_is_bounded() {
        let balances = vec![
            balance("A", 13),
            balance("B", 29),
            balance("C", -7),
            balance("D", -11),
            balance("E", -24),
        ];
        let settlements = calculate_minimal_settlements(&balances);
        assert!(settlements.len() <= 2 + 3 - 1);
        assert!(settlements.iter().all(|s| s.from != s.to));
    }
}
