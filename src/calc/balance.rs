use std::collections::HashMap;

use tracing::warn;

use crate::Amount;
use crate::calc::split::distribute;
use crate::model::{BalanceStatus, Member, MemberBalance, MemberId, Payment};

/// Compute every member's balance: what they paid minus their fair share.
///
/// - The total of all payments is divided evenly; the leftover units go to
///   the first members in collection order.
/// - Balances always sum to zero.
/// - Payments whose payer is not a member are left out of both the total
///   and the paid sums, and logged.
///
/// Returns one entry per member, in member order. No members, no balances.
pub fn calculate_member_balances(members: &[Member], payments: &[Payment]) -> Vec<MemberBalance> {
    if members.is_empty() {
        return Vec::new();
    }

    let mut paid: HashMap<&MemberId, Amount> = members
        .iter()
        .map(|member| (&member.id, Amount::ZERO))
        .collect();

    let mut total = Amount::ZERO;
    for payment in payments {
        let Some(sum) = paid.get_mut(&payment.payer_id) else {
            warn!(
                payment = %payment.id,
                payer = %payment.payer_id,
                amount = %payment.amount,
                "ignoring payment from unknown member"
            );
            continue;
        };
        *sum += payment.amount.amount();
        total += payment.amount.amount();
    }

    let shares = distribute(total, members.len());

    members
        .iter()
        .zip(shares)
        .map(|(member, share)| {
            let balance = paid[&member.id] - share;
            MemberBalance {
                member_id: member.id.clone(),
                member_name: member.name.clone(),
                balance,
                status: BalanceStatus::of(balance),
            }
        })
        .collect()
}
