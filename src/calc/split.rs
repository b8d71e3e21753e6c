use crate::Amount;

/// Divide `total` into `count` integer parts that differ by at most one.
///
/// The first `total mod count` parts carry the extra unit, so the order of
/// the recipients decides who absorbs the remainder.
pub(crate) fn distribute(total: Amount, count: usize) -> Vec<Amount> {
    if count == 0 {
        return Vec::new();
    }

    let n = count as i64;
    let base = total.value().div_euclid(n);
    let remainder = total.value() - base * n;

    (0..n)
        .map(|idx| Amount::new(base + i64::from(idx < remainder)))
        .collect()
}

/// Split one expense among `payee_count` payees.
///
/// Returns one share per payee, summing exactly to `total_amount`. Returns
/// an empty vector when there are no payees.
pub fn calculate_payment_split(total_amount: Amount, payee_count: usize) -> Vec<Amount> {
    distribute(total_amount, payee_count)
}
