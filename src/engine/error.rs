//! Error types for store actions and reloaded state.

use thiserror::Error;

use crate::model::{MemberId, PaymentId};
use crate::validation::{Field, ValidationError, ValidationErrors};

/// Error returned by the mutating [`Warikan`](super::Warikan) actions.
///
/// A rejected action never changes the state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("member {0} not found")]
    MemberNotFound(MemberId),

    #[error("payment {0} not found")]
    PaymentNotFound(PaymentId),
}

impl From<ValidationError> for ActionError {
    fn from(error: ValidationError) -> Self {
        ActionError::Validation(error.into())
    }
}

/// Why a [`WarikanState`](super::WarikanState) cannot be used as is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("event name: {0}")]
    EventName(ValidationError),

    #[error("{field} \"{value}\" has surrounding whitespace")]
    Untrimmed { field: Field, value: String },

    #[error("duplicate member id {0}")]
    DuplicateMemberId(MemberId),

    #[error("member {id}: {reason}")]
    InvalidMember { id: MemberId, reason: ValidationError },

    #[error("duplicate payment id {0}")]
    DuplicatePaymentId(PaymentId),

    #[error("payment {payment} references unknown member {payer}")]
    OrphanedPayment { payment: PaymentId, payer: MemberId },

    #[error("payment {payment}: {reason}")]
    InvalidPayment {
        payment: PaymentId,
        reason: ValidationError,
    },

    #[error("payment total exceeds the representable range")]
    TotalOverflow,
}
