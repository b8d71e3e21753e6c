//! Settlement computation.
//!
//! Members + payments → [`calculate_member_balances`] → balances →
//! [`calculate_minimal_settlements`] → transfers. All functions are pure and
//! assume validated input.

use crate::Amount;
use crate::model::{Member, Payment};

mod balance;
mod cache;
mod settlement;
mod split;

pub use balance::calculate_member_balances;
pub use cache::CalculationCache;
pub use settlement::calculate_minimal_settlements;
pub use split::calculate_payment_split;

/// Headline figures for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalculationSummary {
    pub total_amount: Amount,
    /// Fair share before the remainder is handed out.
    pub per_person: Amount,
    pub payment_count: usize,
    pub member_count: usize,
    pub settlements_count: usize,
}

pub fn calculate_summary(
    members: &[Member],
    payments: &[Payment],
    settlements_count: usize,
) -> CalculationSummary {
    let total_amount: Amount = payments.iter().map(|p| p.amount.amount()).sum();
    let per_person = match members.len() {
        0 => Amount::ZERO,
        n => Amount::new(total_amount.value() / n as i64),
    };

    CalculationSummary {
        total_amount,
        per_person,
        payment_count: payments.len(),
        member_count: members.len(),
        settlements_count,
    }
}
