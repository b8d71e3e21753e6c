use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::Amount;
use crate::engine::InvariantViolation;
use crate::model::{Member, MemberId, Payment};
use crate::validation::{self, Field, Limits};

/// The aggregate root: one event with its members and payments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarikanState {
    pub event_name: String,
    pub members: Vec<Member>,
    pub payments: Vec<Payment>,
}

impl WarikanState {
    pub fn is_empty(&self) -> bool {
        self.event_name.is_empty() && self.members.is_empty() && self.payments.is_empty()
    }

    pub fn member(&self, id: &MemberId) -> Option<&Member> {
        self.members.iter().find(|member| &member.id == id)
    }

    /// Case-insensitive lookup, ignoring surrounding whitespace.
    pub fn member_by_name(&self, name: &str) -> Option<&Member> {
        let wanted = name.trim().to_lowercase();
        self.members
            .iter()
            .find(|member| member.name.to_lowercase() == wanted)
    }

    /// Check every rule the actions enforce incrementally:
    /// - an event name, if set, fits the limit
    /// - member ids are unique and names are valid and unique
    /// - payment ids are unique, amounts are within the limit
    /// - every payment's payer is a member
    pub fn check_invariants(&self, limits: &Limits) -> Result<(), InvariantViolation> {
        if !self.event_name.is_empty() {
            let normalized = validation::validate_event_name(&self.event_name, limits)
                .map_err(InvariantViolation::EventName)?;
            if normalized != self.event_name {
                return Err(InvariantViolation::Untrimmed {
                    field: Field::EventName,
                    value: self.event_name.clone(),
                });
            }
        }

        let mut member_ids = HashSet::with_capacity(self.members.len());
        for (idx, member) in self.members.iter().enumerate() {
            if !member_ids.insert(&member.id) {
                return Err(InvariantViolation::DuplicateMemberId(member.id.clone()));
            }
            let normalized =
                validation::validate_member_name(&member.name, &self.members[..idx], None, limits)
                    .map_err(|reason| InvariantViolation::InvalidMember {
                        id: member.id.clone(),
                        reason,
                    })?;
            if normalized != member.name {
                return Err(InvariantViolation::Untrimmed {
                    field: Field::MemberName,
                    value: member.name.clone(),
                });
            }
        }

        let mut payment_ids = HashSet::with_capacity(self.payments.len());
        for payment in &self.payments {
            if !payment_ids.insert(&payment.id) {
                return Err(InvariantViolation::DuplicatePaymentId(payment.id.clone()));
            }
            if !member_ids.contains(&payment.payer_id) {
                return Err(InvariantViolation::OrphanedPayment {
                    payment: payment.id.clone(),
                    payer: payment.payer_id.clone(),
                });
            }
            validation::validate_amount_value(payment.amount.get(), limits).map_err(|reason| {
                InvariantViolation::InvalidPayment {
                    payment: payment.id.clone(),
                    reason,
                }
            })?;
        }

        if self.total_amount().is_none() {
            return Err(InvariantViolation::TotalOverflow);
        }

        Ok(())
    }

    /// Sum of every payment, `None` if it does not fit in an [`Amount`].
    pub fn total_amount(&self) -> Option<Amount> {
        self.payments
            .iter()
            .try_fold(Amount::ZERO, |total, p| total.checked_add(p.amount.amount()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PositiveAmount;
    use crate::validation::ValidationError;

    fn state() -> WarikanState {
        let members = vec![Member::new("Alice"), Member::new("Bob")];
        let payments = vec![Payment::new(
            members[0].id.clone(),
            PositiveAmount::new(1200).unwrap(),
            Some("lunch".to_string()),
        )];
        WarikanState {
            event_name: "Trip".to_string(),
            members,
            payments,
        }
    }

    #[test]
    fn default_state_is_empty_and_valid() {
        let state = WarikanState::default();
        assert!(state.is_empty());
        assert_eq!(state.check_invariants(&Limits::default()), Ok(()));
    }

    #[test]
    fn consistent_state_passes() {
        assert_eq!(state().check_invariants(&Limits::default()), Ok(()));
    }

    #[test]
    fn member_lookup_by_name_is_case_insensitive() {
        let state = state();
        assert_eq!(state.member_by_name(" alice ").map(|m| m.name.as_str()), Some("Alice"));
        assert!(state.member_by_name("Carol").is_none());
    }

    #[test]
    fn orphaned_payment_is_a_violation() {
        let mut state = state();
        let ghost = MemberId::generate();
        state.payments[0].payer_id = ghost.clone();

        assert_eq!(
            state.check_invariants(&Limits::default()),
            Err(InvariantViolation::OrphanedPayment {
                payment: state.payments[0].id.clone(),
                payer: ghost,
            })
        );
    }

    #[test]
    fn duplicate_names_are_a_violation() {
        let mut state = state();
        state.members[1].name = "ALICE".to_string();
        assert!(matches!(
            state.check_invariants(&Limits::default()),
            Err(InvariantViolation::InvalidMember {
                reason: ValidationError::DuplicateValue(_),
                ..
            })
        ));
    }

    #[test]
    fn duplicate_ids_are_a_violation() {
        let mut state = state();
        state.members[1].id = state.members[0].id.clone();
        assert!(matches!(
            state.check_invariants(&Limits::default()),
            Err(InvariantViolation::DuplicateMemberId(_))
        ));

        let mut state = self::state();
        let copy = state.payments[0].clone();
        state.payments.push(copy);
        assert!(matches!(
            state.check_invariants(&Limits::default()),
            Err(InvariantViolation::DuplicatePaymentId(_))
        ));
    }

    #[test]
    fn untrimmed_names_are_a_violation() {
        let mut state = state();
        state.event_name = "   Trip   ".to_string();
        assert_eq!(
            state.check_invariants(&Limits::default()),
            Err(InvariantViolation::Untrimmed {
                field: Field::EventName,
                value: "   Trip   ".to_string(),
            })
        );

        let mut state = self::state();
        state.members[0].name = "  Alice  ".to_string();
        assert_eq!(
            state.check_invariants(&Limits::default()),
            Err(InvariantViolation::Untrimmed {
                field: Field::MemberName,
                value: "  Alice  ".to_string(),
            })
        );
    }

    #[test]
    fn overflowing_total_is_a_violation() {
        let limits = Limits {
            max_amount: i64::MAX,
            ..Limits::default()
        };
        let mut state = state();
        let payer = state.members[0].id.clone();
        for _ in 0..2 {
            state.payments.push(Payment::new(
                payer.clone(),
                PositiveAmount::new(9_000_000_000_000_000_000).unwrap(),
                None,
            ));
        }

        assert_eq!(state.total_amount(), None);
        assert_eq!(state.check_invariants(&limits), Err(InvariantViolation::TotalOverflow));
    }

    #[test]
    fn amount_over_the_limit_is_a_violation() {
        let limits = Limits {
            max_amount: 1000,
            ..Limits::default()
        };
        assert!(matches!(
            state().check_invariants(&limits),
            Err(InvariantViolation::InvalidPayment { .. })
        ));
    }
}
