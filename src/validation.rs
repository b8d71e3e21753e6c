//! Input validation.
//!
//! Every validator is pure and returns the normalized value on success.
//! Nothing that fails here ever reaches the calculators.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::PositiveAmount;
use crate::model::{Member, MemberId};

/// Policy ceilings applied by the validators.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_member_name_len: usize,
    pub max_event_name_len: usize,
    /// Upper bound for a single payment. A policy choice, not a currency limit.
    pub max_amount: i64,
    pub min_members: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_member_name_len: 20,
            max_event_name_len: 50,
            max_amount: 1_000_000,
            min_members: 2,
        }
    }
}

impl Limits {
    /// Reject limits that no input could satisfy.
    pub fn check(&self) -> Result<(), InvalidLimits> {
        if self.max_amount <= 0 {
            return Err(InvalidLimits::MaxAmount(self.max_amount));
        }
        if self.max_member_name_len == 0 {
            return Err(InvalidLimits::ZeroLength("max_member_name_len"));
        }
        if self.max_event_name_len == 0 {
            return Err(InvalidLimits::ZeroLength("max_event_name_len"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidLimits {
    #[error("max_amount must be positive, got {0}")]
    MaxAmount(i64),
    #[error("{0} must be at least 1")]
    ZeroLength(&'static str),
}

/// The input a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    MemberName,
    EventName,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::MemberName => f.write_str("member name"),
            Field::EventName => f.write_str("event name"),
        }
    }
}

/// Why an amount was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountProblem {
    #[error("enter a valid number")]
    NotANumber,
    #[error("amount must be a positive number")]
    NotPositive,
    #[error("amount must be a whole number")]
    NotWhole,
    #[error("amount must be at most {0}")]
    TooLarge(i64),
    #[error("payment total would exceed the supported range")]
    TotalTooLarge,
    #[error("amount {amount} is too small to split among {payees} members")]
    TooSmallToSplit { amount: i64, payees: usize },
}

/// Why a member selection was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Selection {
    #[error("select who paid")]
    PayerRequired,
    #[error("select at least one member to split with")]
    PayeesRequired,
    #[error("no member named \"{0}\"")]
    UnknownName(String),
    #[error("member {0} does not exist")]
    UnknownMember(MemberId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    RequiredField(Field),

    #[error("{field} must be at most {max} characters")]
    InvalidLength { field: Field, max: usize },

    #[error("a member named \"{0}\" already exists")]
    DuplicateValue(String),

    #[error("{0}")]
    InvalidAmount(AmountProblem),

    #[error("at least {0} members are required")]
    InsufficientMembers(usize),

    #[error("{0}")]
    InvalidSelection(Selection),
}

/// One or more validation failures, reported together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn contains(&self, predicate: impl Fn(&ValidationError) -> bool) -> bool {
        self.0.iter().any(predicate)
    }

    /// `Ok(())` when nothing was collected.
    pub(crate) fn check(errors: Vec<ValidationError>) -> Result<(), ValidationErrors> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(errors))
        }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        ValidationErrors(vec![error])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, error) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Trim and check a required string against a maximum length in characters.
fn validate_text(value: &str, field: Field, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField(field));
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::InvalidLength { field, max });
    }
    Ok(trimmed.to_string())
}

/// Validate a member name against the current members.
///
/// `editing` excludes the member being renamed from the duplicate check.
pub fn validate_member_name(
    name: &str,
    existing: &[Member],
    editing: Option<&MemberId>,
    limits: &Limits,
) -> Result<String, ValidationError> {
    let name = validate_text(name, Field::MemberName, limits.max_member_name_len)?;
    let lowered = name.to_lowercase();

    let duplicate = existing
        .iter()
        .filter(|member| Some(&member.id) != editing)
        .any(|member| member.name.to_lowercase() == lowered);
    if duplicate {
        return Err(ValidationError::DuplicateValue(name));
    }

    Ok(name)
}

pub fn validate_event_name(name: &str, limits: &Limits) -> Result<String, ValidationError> {
    validate_text(name, Field::EventName, limits.max_event_name_len)
}

/// Parse and validate raw amount input.
pub fn validate_amount(input: &str, limits: &Limits) -> Result<PositiveAmount, ValidationError> {
    let value: f64 = input
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidAmount(AmountProblem::NotANumber))?;

    if !value.is_finite() {
        return Err(ValidationError::InvalidAmount(AmountProblem::NotANumber));
    }
    if value <= 0.0 {
        return Err(ValidationError::InvalidAmount(AmountProblem::NotPositive));
    }
    if value > limits.max_amount as f64 {
        return Err(ValidationError::InvalidAmount(AmountProblem::TooLarge(
            limits.max_amount,
        )));
    }
    if value.fract() != 0.0 {
        return Err(ValidationError::InvalidAmount(AmountProblem::NotWhole));
    }

    validate_amount_value(value as i64, limits)
}

/// Validate an already numeric amount.
pub fn validate_amount_value(value: i64, limits: &Limits) -> Result<PositiveAmount, ValidationError> {
    if value > limits.max_amount {
        return Err(ValidationError::InvalidAmount(AmountProblem::TooLarge(
            limits.max_amount,
        )));
    }
    PositiveAmount::new(value).map_err(|_| ValidationError::InvalidAmount(AmountProblem::NotPositive))
}

/// Gate for leaving the setup step: a valid event name and enough members.
///
/// Returns the normalized event name.
pub fn validate_setup_completion(
    event_name: &str,
    members: &[Member],
    limits: &Limits,
) -> Result<String, ValidationErrors> {
    let mut errors = Vec::new();

    let event_name = validate_event_name(event_name, limits).map_err(|e| errors.push(e)).ok();

    if members.len() < limits.min_members {
        errors.push(ValidationError::InsufficientMembers(limits.min_members));
    }

    ValidationErrors::check(errors)?;
    Ok(event_name.unwrap_or_default())
}

/// A validated request to split one expense among several members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentInput {
    pub payer: MemberId,
    pub amount: PositiveAmount,
    /// Never contains the payer or the same member twice.
    pub payees: Vec<MemberId>,
}

/// Validate a split-payment entry. All problems are reported at once.
pub fn validate_payment_input(
    payer: Option<&MemberId>,
    amount: &str,
    payees: &[MemberId],
    members: &[Member],
    limits: &Limits,
) -> Result<PaymentInput, ValidationErrors> {
    let mut errors = Vec::new();
    let is_member = |id: &MemberId| members.iter().any(|member| &member.id == id);

    match payer {
        None => errors.push(ValidationError::InvalidSelection(Selection::PayerRequired)),
        Some(id) if !is_member(id) => errors.push(ValidationError::InvalidSelection(
            Selection::UnknownMember(id.clone()),
        )),
        Some(_) => {}
    }

    let amount = validate_amount(amount, limits).map_err(|e| errors.push(e)).ok();

    let mut unique: Vec<MemberId> = Vec::with_capacity(payees.len());
    for id in payees {
        if Some(id) != payer && !unique.contains(id) {
            unique.push(id.clone());
        }
    }
    let payees = unique;
    if payees.is_empty() {
        errors.push(ValidationError::InvalidSelection(Selection::PayeesRequired));
    }
    for id in payees.iter().filter(|id| !is_member(*id)) {
        errors.push(ValidationError::InvalidSelection(Selection::UnknownMember(
            id.clone(),
        )));
    }

    if let Some(amount) = amount
        && !payees.is_empty()
        && (amount.get() as u64) < payees.len() as u64
    {
        errors.push(ValidationError::InvalidAmount(AmountProblem::TooSmallToSplit {
            amount: amount.get(),
            payees: payees.len(),
        }));
    }

    ValidationErrors::check(errors)?;

    match (payer, amount) {
        (Some(payer), Some(amount)) => Ok(PaymentInput {
            payer: payer.clone(),
            amount,
            payees,
        }),
        // a missing payer or amount has already been recorded as an error
        _ => Err(ValidationError::InvalidSelection(Selection::PayerRequired).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str) -> Member {
        Member::new(name)
    }

    fn limits() -> Limits {
        Limits::default()
    }

    #[test]
    fn default_limits_are_usable() {
        assert_eq!(limits().check(), Ok(()));
    }

    #[test]
    fn unusable_limits_are_rejected() {
        let negative = Limits {
            max_amount: -1,
            ..limits()
        };
        assert_eq!(negative.check(), Err(InvalidLimits::MaxAmount(-1)));

        let no_names = Limits {
            max_member_name_len: 0,
            ..limits()
        };
        assert_eq!(
            no_names.check(),
            Err(InvalidLimits::ZeroLength("max_member_name_len"))
        );
    }

    // Member names

    #[test]
    fn member_name_is_trimmed() {
        assert_eq!(
            validate_member_name("  Alice ", &[], None, &limits()),
            Ok("Alice".to_string())
        );
    }

    #[test]
    fn blank_member_name_is_required() {
        assert_eq!(
            validate_member_name("   ", &[], None, &limits()),
            Err(ValidationError::RequiredField(Field::MemberName))
        );
    }

    #[test]
    fn member_name_length_counts_characters() {
        let twenty = "あ".repeat(20);
        assert!(validate_member_name(&twenty, &[], None, &limits()).is_ok());

        let twenty_one = "a".repeat(21);
        assert_eq!(
            validate_member_name(&twenty_one, &[], None, &limits()),
            Err(ValidationError::InvalidLength {
                field: Field::MemberName,
                max: 20
            })
        );
    }

    #[test]
    fn duplicate_member_name_is_case_insensitive() {
        let existing = vec![member("Alice")];
        assert_eq!(
            validate_member_name("alice", &existing, None, &limits()),
            Err(ValidationError::DuplicateValue("alice".to_string()))
        );
    }

    #[test]
    fn renaming_ignores_the_member_itself() {
        let existing = vec![member("Alice"), member("Bob")];
        let alice = existing[0].id.clone();
        assert_eq!(
            validate_member_name("ALICE", &existing, Some(&alice), &limits()),
            Ok("ALICE".to_string())
        );
        assert!(matches!(
            validate_member_name("bob", &existing, Some(&alice), &limits()),
            Err(ValidationError::DuplicateValue(_))
        ));
    }

    // Event names

    #[test]
    fn event_name_rules() {
        assert_eq!(validate_event_name(" Trip ", &limits()), Ok("Trip".to_string()));
        assert_eq!(
            validate_event_name("", &limits()),
            Err(ValidationError::RequiredField(Field::EventName))
        );
        assert_eq!(
            validate_event_name(&"x".repeat(51), &limits()),
            Err(ValidationError::InvalidLength {
                field: Field::EventName,
                max: 50
            })
        );
    }

    // Amounts

    #[test]
    fn amount_parses_whole_numbers() {
        assert_eq!(validate_amount(" 1500 ", &limits()).map(PositiveAmount::get), Ok(1500));
        assert_eq!(validate_amount("1000000", &limits()).map(PositiveAmount::get), Ok(1_000_000));
        assert_eq!(validate_amount("3e2", &limits()).map(PositiveAmount::get), Ok(300));
    }

    #[test]
    fn amount_rejects_bad_input() {
        let invalid = |p| Err(ValidationError::InvalidAmount(p));
        assert_eq!(validate_amount("abc", &limits()), invalid(AmountProblem::NotANumber));
        assert_eq!(validate_amount("", &limits()), invalid(AmountProblem::NotANumber));
        assert_eq!(validate_amount("NaN", &limits()), invalid(AmountProblem::NotANumber));
        assert_eq!(validate_amount("inf", &limits()), invalid(AmountProblem::NotANumber));
        assert_eq!(validate_amount("0", &limits()), invalid(AmountProblem::NotPositive));
        assert_eq!(validate_amount("-10", &limits()), invalid(AmountProblem::NotPositive));
        assert_eq!(validate_amount("12.5", &limits()), invalid(AmountProblem::NotWhole));
        assert_eq!(
            validate_amount("1000001", &limits()),
            invalid(AmountProblem::TooLarge(1_000_000))
        );
    }

    #[test]
    fn amount_ceiling_is_configurable() {
        let limits = Limits {
            max_amount: 100,
            ..Limits::default()
        };
        assert!(validate_amount("100", &limits).is_ok());
        assert!(validate_amount("101", &limits).is_err());
        assert!(validate_amount_value(101, &limits).is_err());
    }

    // Setup gate

    #[test]
    fn setup_requires_two_members() {
        let one = vec![member("A")];
        let result = validate_setup_completion("Trip", &one, &limits());
        assert_eq!(
            result,
            Err(ValidationErrors::from(ValidationError::InsufficientMembers(2)))
        );

        let two = vec![member("A"), member("B")];
        assert_eq!(validate_setup_completion(" Trip ", &two, &limits()), Ok("Trip".to_string()));
    }

    #[test]
    fn setup_aggregates_every_problem() {
        let errors = validate_setup_completion("", &[], &limits()).unwrap_err();
        assert_eq!(errors.errors().len(), 2);
        assert_eq!(
            errors.to_string(),
            "event name is required; at least 2 members are required"
        );
    }

    // Payment input

    #[test]
    fn payment_input_drops_payer_from_payees() {
        let members = vec![member("A"), member("B"), member("C")];
        let ids: Vec<MemberId> = members.iter().map(|m| m.id.clone()).collect();

        let input = validate_payment_input(Some(&ids[0]), "300", &ids, &members, &limits()).unwrap();
        assert_eq!(input.payer, ids[0]);
        assert_eq!(input.amount.get(), 300);
        assert_eq!(input.payees, vec![ids[1].clone(), ids[2].clone()]);
    }

    #[test]
    fn payment_input_keeps_each_payee_once() {
        let members = vec![member("A"), member("B"), member("C")];
        let ids: Vec<MemberId> = members.iter().map(|m| m.id.clone()).collect();
        let payees = [ids[2].clone(), ids[1].clone(), ids[2].clone(), ids[1].clone()];

        let input = validate_payment_input(Some(&ids[0]), "300", &payees, &members, &limits()).unwrap();
        assert_eq!(input.payees, vec![ids[2].clone(), ids[1].clone()]);
    }

    #[test]
    fn payment_input_reports_all_problems() {
        let members = vec![member("A"), member("B")];
        let errors = validate_payment_input(None, "-1", &[], &members, &limits()).unwrap_err();
        assert!(errors.contains(|e| *e == ValidationError::InvalidSelection(Selection::PayerRequired)));
        assert!(errors.contains(|e| *e == ValidationError::InvalidSelection(Selection::PayeesRequired)));
        assert!(errors.contains(|e| *e == ValidationError::InvalidAmount(AmountProblem::NotPositive)));
    }

    #[test]
    fn payment_input_rejects_only_self_as_payee() {
        let members = vec![member("A"), member("B")];
        let payer = members[0].id.clone();
        let errors =
            validate_payment_input(Some(&payer), "100", &[payer.clone()], &members, &limits()).unwrap_err();
        assert_eq!(
            errors.errors(),
            &[ValidationError::InvalidSelection(Selection::PayeesRequired)]
        );
    }

    #[test]
    fn payment_input_rejects_unknown_members() {
        let members = vec![member("A"), member("B")];
        let ghost = MemberId::generate();
        let errors =
            validate_payment_input(Some(&ghost), "100", &[members[1].id.clone()], &members, &limits())
                .unwrap_err();
        assert_eq!(
            errors.errors(),
            &[ValidationError::InvalidSelection(Selection::UnknownMember(ghost))]
        );
    }

    #[test]
    fn payment_input_rejects_amount_smaller_than_payee_count() {
        let members = vec![member("A"), member("B"), member("C")];
        let ids: Vec<MemberId> = members.iter().map(|m| m.id.clone()).collect();
        let errors = validate_payment_input(Some(&ids[0]), "1", &ids[1..], &members, &limits()).unwrap_err();
        assert_eq!(
            errors.errors(),
            &[ValidationError::InvalidAmount(AmountProblem::TooSmallToSplit {
                amount: 1,
                payees: 2
            })]
        );
    }
}
