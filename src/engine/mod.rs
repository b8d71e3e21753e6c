//! Event store.
//!
//! [`Warikan`] owns the event state and is the only way to change it. Every
//! action is validated first; a rejected action leaves the state untouched.
//! Successful mutations invalidate the calculation cache and schedule a
//! snapshot save. Also supports an async stream of [`Action`]s.

use std::cell::RefCell;

use chrono::Utc;
use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};

use crate::{Amount, PositiveAmount};
use crate::calc::{self, CalculationCache, CalculationSummary};
use crate::model::{Action, Member, MemberBalance, MemberId, Payment, PaymentId, Settlement};
use crate::snapshot::SaverHandle;
use crate::validation::{self, AmountProblem, Limits, Selection, ValidationError, ValidationErrors};

mod state;
pub use state::WarikanState;

mod error;
pub use error::{ActionError, InvariantViolation};

/// Fields to change on an existing payment. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentUpdate {
    pub payer: Option<MemberId>,
    /// Raw amount input.
    pub amount: Option<String>,
    /// `Some(None)` removes the memo.
    pub memo: Option<Option<String>>,
}

/// The bill-splitting store.
pub struct Warikan {
    state: WarikanState,
    limits: Limits,
    cache: RefCell<CalculationCache>,
    saver: Option<SaverHandle>,
}

/// Public API
impl Warikan {
    pub fn new(limits: Limits) -> Self {
        Self {
            state: WarikanState::default(),
            limits,
            cache: RefCell::new(CalculationCache::default()),
            saver: None,
        }
    }

    /// Start from a previously saved state.
    ///
    /// A state that breaks any invariant is discarded in favour of an empty
    /// one rather than being fed to the calculators.
    pub fn from_state(state: WarikanState, limits: Limits) -> Self {
        let mut store = Self::new(limits);
        match state.check_invariants(&store.limits) {
            Ok(()) => store.state = state,
            Err(violation) => warn!(reason = %violation, "discarding inconsistent state"),
        }
        store
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = RefCell::new(CalculationCache::new(capacity));
        self
    }

    /// Save the state through `saver` after every mutation.
    pub fn with_saver(mut self, saver: SaverHandle) -> Self {
        self.saver = Some(saver);
        self
    }

    pub fn state(&self) -> &WarikanState {
        &self.state
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn member_by_name(&self, name: &str) -> Option<&Member> {
        self.state.member_by_name(name)
    }

    /// Run the store with the given action stream
    pub async fn run(&mut self, mut stream: impl Stream<Item = Action> + Unpin) {
        while let Some(action) = stream.next().await {
            // a rejected action is logged and must not stop the stream
            let _ = self.apply(action);
        }
    }

    /// Apply a single action on top of the current state
    pub fn apply(&mut self, action: Action) -> Result<(), ActionError> {
        let kind = action.kind();
        let subject = match &action {
            Action::SetEventName(name) | Action::AddMember(name) | Action::RemoveMember(name) => {
                name.clone()
            }
            Action::RenameMember { from, .. } => from.clone(),
            Action::AddPayment { payer, .. } => payer.clone(),
            Action::Reset => String::new(),
        };

        let result = self.apply_action(action);
        Self::log_result(kind, &subject, &result);
        result
    }

    pub fn set_event_name(&mut self, name: &str) -> Result<(), ActionError> {
        self.state.event_name = validation::validate_event_name(name, &self.limits)?;
        self.changed();
        Ok(())
    }

    pub fn add_member(&mut self, name: &str) -> Result<MemberId, ActionError> {
        let name = validation::validate_member_name(name, &self.state.members, None, &self.limits)?;
        let member = Member::new(name);
        let id = member.id.clone();
        self.state.members.push(member);
        self.changed();
        Ok(id)
    }

    /// Rename a member. The new name must not clash with any other member.
    pub fn rename_member(&mut self, id: &MemberId, name: &str) -> Result<(), ActionError> {
        let idx = self
            .state
            .members
            .iter()
            .position(|member| &member.id == id)
            .ok_or_else(|| ActionError::MemberNotFound(id.clone()))?;
        let name =
            validation::validate_member_name(name, &self.state.members, Some(id), &self.limits)?;
        self.state.members[idx].name = name;
        self.changed();
        Ok(())
    }

    /// Remove a member and every payment they made.
    ///
    /// Returns the number of payments removed with them.
    pub fn remove_member(&mut self, id: &MemberId) -> Result<usize, ActionError> {
        let idx = self
            .state
            .members
            .iter()
            .position(|member| &member.id == id)
            .ok_or_else(|| ActionError::MemberNotFound(id.clone()))?;
        self.state.members.remove(idx);

        let before = self.state.payments.len();
        self.state.payments.retain(|payment| &payment.payer_id != id);
        let removed = before - self.state.payments.len();

        self.changed();
        Ok(removed)
    }

    /// Record a payment shared by every member.
    pub fn add_payment(
        &mut self,
        payer: &MemberId,
        amount: &str,
        memo: Option<&str>,
    ) -> Result<PaymentId, ActionError> {
        self.ensure_member(payer)?;
        let amount = validation::validate_amount(amount, &self.limits)?;
        self.ensure_total_fits(amount, None)?;

        let payment = Payment::new(payer.clone(), amount, normalize_memo(memo));
        let id = payment.id.clone();
        self.state.payments.push(payment);
        self.changed();
        Ok(id)
    }

    /// Split one expense among `payees` and record one payment per payee.
    ///
    /// The payer is dropped from `payees`. Each record is paid by `payer`, carries
    /// that payee's share (remainder first, in `payees` order) and the memo
    /// `"[<payee name>] <memo>"`.
    pub fn add_split_payment(
        &mut self,
        payer: &MemberId,
        amount: &str,
        payees: &[MemberId],
        memo: Option<&str>,
    ) -> Result<Vec<PaymentId>, ActionError> {
        let input = validation::validate_payment_input(
            Some(payer),
            amount,
            payees,
            &self.state.members,
            &self.limits,
        )?;
        self.ensure_total_fits(input.amount, None)?;
        let memo = normalize_memo(memo);
        let shares = calc::calculate_payment_split(input.amount.amount(), input.payees.len());

        let mut records = Vec::with_capacity(shares.len());
        for (payee, share) in input.payees.iter().zip(shares) {
            let name = self.state.member(payee).map_or("?", |member| member.name.as_str());
            let memo = match &memo {
                Some(memo) => format!("[{name}] {memo}"),
                None => format!("[{name}]"),
            };
            // validation guarantees every share is at least one unit
            let amount = PositiveAmount::try_from(share)
                .map_err(|_| ValidationError::InvalidAmount(AmountProblem::NotPositive))?;
            records.push(Payment::new(input.payer.clone(), amount, Some(memo)));
        }

        let ids = records.iter().map(|payment| payment.id.clone()).collect();
        self.state.payments.extend(records);
        self.changed();
        Ok(ids)
    }

    /// Change the payer, amount and/or memo of a payment.
    ///
    /// Each given field is validated before anything is written.
    pub fn edit_payment(&mut self, id: &PaymentId, update: PaymentUpdate) -> Result<(), ActionError> {
        let idx = self
            .state
            .payments
            .iter()
            .position(|payment| &payment.id == id)
            .ok_or_else(|| ActionError::PaymentNotFound(id.clone()))?;

        let mut errors = Vec::new();
        if let Some(payer) = &update.payer
            && let Err(e) = self.ensure_member(payer)
        {
            errors.push(e);
        }
        let amount = match &update.amount {
            Some(raw) => validation::validate_amount(raw, &self.limits)
                .map_err(|e| errors.push(e))
                .ok(),
            None => None,
        };
        if let Some(amount) = amount
            && let Err(e) = self.ensure_total_fits(amount, Some(self.state.payments[idx].amount))
        {
            errors.push(e);
        }
        ValidationErrors::check(errors)?;

        let payment = &mut self.state.payments[idx];
        if let Some(payer) = update.payer {
            payment.payer_id = payer;
        }
        if let Some(amount) = amount {
            payment.amount = amount;
        }
        if let Some(memo) = update.memo {
            payment.memo = normalize_memo(memo.as_deref());
        }
        payment.updated_at = Some(Utc::now());

        self.changed();
        Ok(())
    }

    pub fn remove_payment(&mut self, id: &PaymentId) -> Result<(), ActionError> {
        let idx = self
            .state
            .payments
            .iter()
            .position(|payment| &payment.id == id)
            .ok_or_else(|| ActionError::PaymentNotFound(id.clone()))?;
        self.state.payments.remove(idx);
        self.changed();
        Ok(())
    }

    /// Forget everything: event, members, payments, cached results and the
    /// saved snapshot.
    pub fn reset(&mut self) {
        self.state = WarikanState::default();
        self.cache.get_mut().invalidate();
        if let Some(saver) = &self.saver {
            saver.clear();
        }
    }

    /// Gate for leaving setup: valid event name and enough members.
    pub fn check_setup(&self) -> Result<String, ValidationErrors> {
        validation::validate_setup_completion(&self.state.event_name, &self.state.members, &self.limits)
    }

    pub fn balances(&self) -> Vec<MemberBalance> {
        self.cache
            .borrow_mut()
            .balances(&self.state.members, &self.state.payments)
    }

    pub fn settlements(&self) -> Vec<Settlement> {
        self.cache
            .borrow_mut()
            .settlements(&self.state.members, &self.state.payments)
    }

    pub fn summary(&self) -> CalculationSummary {
        calc::calculate_summary(
            &self.state.members,
            &self.state.payments,
            self.settlements().len(),
        )
    }

    pub fn total_amount(&self) -> Amount {
        self.state.payments.iter().map(|p| p.amount.amount()).sum()
    }
}

/// Private API
impl Warikan {
    /// Small helper to log `apply` results
    fn log_result(kind: &str, subject: &str, result: &Result<(), ActionError>) {
        match result {
            Ok(()) => info!(action = kind, subject, "{kind} applied"),
            Err(e) => info!(action = kind, subject, reason = %e, "{kind} skipped"),
        }
    }

    fn apply_action(&mut self, action: Action) -> Result<(), ActionError> {
        match action {
            Action::SetEventName(name) => self.set_event_name(&name),
            Action::AddMember(name) => self.add_member(&name).map(drop),
            Action::RenameMember { from, to } => {
                let id = self.resolve(&from)?;
                self.rename_member(&id, &to)
            }
            Action::RemoveMember(name) => {
                let id = self.resolve(&name)?;
                self.remove_member(&id).map(drop)
            }
            Action::AddPayment {
                payer,
                amount,
                payees,
                memo,
            } => {
                let payer = self.resolve(&payer)?;
                if payees.is_empty() {
                    return self.add_payment(&payer, &amount, memo.as_deref()).map(drop);
                }
                let payees = payees
                    .iter()
                    .map(|name| self.resolve(name))
                    .collect::<Result<Vec<_>, _>>()?;
                self.add_split_payment(&payer, &amount, &payees, memo.as_deref())
                    .map(drop)
            }
            Action::Reset => {
                self.reset();
                Ok(())
            }
        }
    }

    fn resolve(&self, name: &str) -> Result<MemberId, ValidationError> {
        self.state
            .member_by_name(name)
            .map(|member| member.id.clone())
            .ok_or_else(|| ValidationError::InvalidSelection(Selection::UnknownName(name.to_string())))
    }

    fn ensure_member(&self, id: &MemberId) -> Result<(), ValidationError> {
        match self.state.member(id) {
            Some(_) => Ok(()),
            None => Err(ValidationError::InvalidSelection(Selection::UnknownMember(
                id.clone(),
            ))),
        }
    }

    /// Reject an amount that would push the payment total out of range.
    ///
    /// `replaced` is the amount of the payment being edited, if any.
    fn ensure_total_fits(
        &self,
        added: PositiveAmount,
        replaced: Option<PositiveAmount>,
    ) -> Result<(), ValidationError> {
        let total = self
            .state
            .total_amount()
            .and_then(|total| match replaced {
                Some(old) => total.checked_sub(old.amount()),
                None => Some(total),
            })
            .and_then(|total| total.checked_add(added.amount()));

        match total {
            Some(_) => Ok(()),
            None => Err(ValidationError::InvalidAmount(AmountProblem::TotalTooLarge)),
        }
    }

    /// Called after every successful mutation.
    fn changed(&mut self) {
        self.cache.get_mut().invalidate();
        if let Some(saver) = &self.saver {
            saver.schedule(self.state.clone());
        }
    }
}

impl Default for Warikan {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

fn normalize_memo(memo: Option<&str>) -> Option<String> {
    memo.map(str::trim)
        .filter(|memo| !memo.is_empty())
        .map(str::to_string)
}
