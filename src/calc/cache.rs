//! Memoization of balance and settlement results.
//!
//! Entries are keyed by the calculation-relevant content of the inputs
//! (member ids and names in order, payers and amounts in order), so a hit
//! always returns exactly what a fresh computation would. The cache holds at
//! most `capacity` entries and evicts the least recently used one.

use std::collections::HashMap;

use crate::PositiveAmount;
use crate::calc::{calculate_member_balances, calculate_minimal_settlements};
use crate::model::{Member, MemberBalance, MemberId, Payment, Settlement};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Fingerprint {
    members: Vec<(MemberId, String)>,
    payments: Vec<(MemberId, PositiveAmount)>,
}

impl Fingerprint {
    fn of(members: &[Member], payments: &[Payment]) -> Self {
        Self {
            members: members.iter().map(|m| (m.id.clone(), m.name.clone())).collect(),
            payments: payments.iter().map(|p| (p.payer_id.clone(), p.amount)).collect(),
        }
    }
}

#[derive(Debug)]
struct Entry {
    balances: Vec<MemberBalance>,
    settlements: Option<Vec<Settlement>>,
    last_used: u64,
}

/// Bounded least-recently-used cache of calculation results.
///
/// A capacity of zero disables caching: every call recomputes.
#[derive(Debug)]
pub struct CalculationCache {
    capacity: usize,
    entries: HashMap<Fingerprint, Entry>,
    clock: u64,
}

impl CalculationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            clock: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn balances(&mut self, members: &[Member], payments: &[Payment]) -> Vec<MemberBalance> {
        if self.capacity == 0 {
            return calculate_member_balances(members, payments);
        }
        self.entry(members, payments).balances.clone()
    }

    pub fn settlements(&mut self, members: &[Member], payments: &[Payment]) -> Vec<Settlement> {
        if self.capacity == 0 {
            return calculate_minimal_settlements(&calculate_member_balances(members, payments));
        }
        let Entry {
            balances,
            settlements,
            ..
        } = self.entry(members, payments);
        settlements
            .get_or_insert_with(|| calculate_minimal_settlements(balances))
            .clone()
    }

    fn entry(&mut self, members: &[Member], payments: &[Payment]) -> &mut Entry {
        self.clock += 1;
        let key = Fingerprint::of(members, payments);

        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_least_recent();
        }

        let entry = self.entries.entry(key).or_insert_with(|| Entry {
            balances: calculate_member_balances(members, payments),
            settlements: None,
            last_used: 0,
        });
        entry.last_used = self.clock;
        entry
    }

    fn evict_least_recent(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

impl Default for CalculationCache {
    fn default() -> Self {
        Self::new(32)
    }
}
